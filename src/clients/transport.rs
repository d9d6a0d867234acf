//! 远程服务传输层
//!
//! 四个远程操作的抽象，编排层只依赖这个 trait

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Document, JobStatusReport, PreparationConfig};

/// 下载得到的结果文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// 服务端在 `Content-Disposition` 中给出的文件名
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// 表单处理服务的传输接口
///
/// 实现必须是无状态的，可以通过 `Arc` 自由共享。
/// 所有调用都不做内部重试，重试策略由编排层决定
#[async_trait]
pub trait Transport: Send + Sync {
    /// 上传文档
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<Document>;

    /// 提交处理任务，返回的状态可能已经是终态
    async fn submit_job(
        &self,
        document_id: &str,
        config: &PreparationConfig,
    ) -> AppResult<JobStatusReport>;

    /// 查询任务状态
    async fn poll_job(&self, document_id: &str) -> AppResult<JobStatusReport>;

    /// 结果文件地址，纯函数，不发起请求
    fn result_url(&self, document_id: &str) -> String;

    /// 下载结果文件
    async fn download(&self, document_id: &str) -> AppResult<Artifact>;
}
