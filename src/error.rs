use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 网络或非成功响应
    #[error("传输错误: {0}")]
    Transport(#[from] TransportError),
    /// 响应格式正确但语义无效
    #[error("协议错误: {0}")]
    Protocol(#[from] ProtocolError),
    /// 当前状态不允许该操作
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 传输错误
///
/// 四个远程调用中任意一个失败（网络失败、非 2xx 响应、响应体无法解析）
#[derive(Debug, Error)]
pub enum TransportError {
    /// 请求未能完成
    #[error("请求 {endpoint} 失败: {source}")]
    RequestFailed {
        endpoint: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务返回非成功状态码
    #[error("{endpoint} 返回状态码 {status}{}", .detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default())]
    BadStatus {
        endpoint: &'static str,
        status: u16,
        detail: Option<String>,
    },
    /// 响应体不是预期的 JSON
    #[error("{endpoint} 响应体解析失败: {source}")]
    MalformedBody {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    /// 非成功响应对应的 HTTP 状态码
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::BadStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 协议错误
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// 未知的任务状态值
    #[error("{endpoint} 返回未知的任务状态: {value:?}")]
    UnknownJobState { endpoint: &'static str, value: String },
}

/// 校验错误
///
/// 在发起任何网络请求之前同步拒绝
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("尚未上传文档")]
    NoDocument,
    #[error("已有任务正在执行 (文档 {document_id})")]
    JobAlreadyActive { document_id: String },
    #[error("任务已结束，请先重置")]
    JobFinished,
    #[error("文档正在上传")]
    UploadInProgress,
    #[error("操作已被重置取消")]
    Superseded,
    #[error("文件为空")]
    EmptyFile,
    #[error("文件不是 PDF")]
    NotPdf,
    #[error("文件大小 {size} 字节超过上限 {limit} 字节")]
    FileTooLarge { size: usize, limit: usize },
    #[error("灵敏度 {value} 超出范围 [{min}, {max}]")]
    SensitivityOutOfRange { value: u8, min: u8, max: u8 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 服务地址无效
    #[error("服务地址无效 '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建请求失败错误
    pub fn request_failed(
        endpoint: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Transport(TransportError::RequestFailed {
            endpoint,
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 错误分类（用于展示层）
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Transport(_) => ErrorKind::Transport,
            AppError::Protocol(_) => ErrorKind::Protocol,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Config(_) | AppError::File(_) => ErrorKind::Local,
        }
    }
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Validation,
    /// 远程服务报告任务失败
    JobFailed,
    /// 本地配置或文件错误
    Local,
}

/// 暴露给展示层的错误快照
///
/// `AppError` 持有不可克隆的底层错误，快照里只保留分类和文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&AppError> for ErrorReport {
    fn from(err: &AppError) -> Self {
        ErrorReport::new(err.kind(), err.to_string())
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_status_message_includes_detail() {
        let err = TransportError::BadStatus {
            endpoint: "/upload",
            status: 400,
            detail: Some("PDF exceeds 100 MB limit".to_string()),
        };
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("PDF exceeds 100 MB limit"));

        let bare = TransportError::BadStatus {
            endpoint: "/poll",
            status: 502,
            detail: None,
        };
        assert!(bare.to_string().ends_with("502"));
    }

    #[test]
    fn test_error_report_keeps_kind() {
        let err: AppError = ValidationError::NoDocument.into();
        let report = ErrorReport::from(&err);
        assert_eq!(report.kind, ErrorKind::Validation);
        assert!(report.message.contains("尚未上传文档"));
    }
}
