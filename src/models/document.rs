use serde::{Deserialize, Serialize};

/// 远程服务上的文档
///
/// 上传成功后由服务端分配 `document_id`，此后不再变化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "documentId")]
    pub document_id: String,
    /// 页数（仅展示）
    #[serde(default)]
    pub pages: u32,
    /// 字节数（仅展示）
    #[serde(default)]
    pub size: u64,
    /// 上传时使用的本地文件名，服务端不返回
    #[serde(skip)]
    pub file_name: String,
}

impl Document {
    /// 附加本地文件名
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }
}
