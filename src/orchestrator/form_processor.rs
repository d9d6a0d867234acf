//! 单文档处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、HTTP 客户端、任务编排器
//! 2. **驱动流程**：读文件 → 上传 → 提交 → 等待终态
//! 3. **结果落盘**：任务成功后下载结果并写入输出目录
//! 4. **统计输出**：终端摘要 + 日志文件摘要
//!
//! 不做状态判断，状态全部由 `JobOrchestrator` 维护

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clients::{FormPrepClient, Transport};
use crate::config::Config;
use crate::error::AppError;
use crate::services::{fillable_file_name, ArtifactWriter};
use crate::utils::logging::{
    append_log_line, init_log_file, job_summary, log_startup, print_final_stats,
};
use crate::workflow::{JobOrchestrator, JobPhase, OrchestratorSnapshot, PollPolicy};

/// 应用主结构
pub struct App {
    config: Config,
    client: Arc<FormPrepClient>,
    orchestrator: JobOrchestrator,
    writer: ArtifactWriter,
}

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub snapshot: OrchestratorSnapshot,
    /// 结果文件路径，仅在成功时存在
    pub saved_to: Option<PathBuf>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.snapshot.phase == JobPhase::Success && self.saved_to.is_some()
    }
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        let client = Arc::new(FormPrepClient::new(&config)?);
        let transport: Arc<dyn Transport> = client.clone();
        let orchestrator = JobOrchestrator::new(transport, PollPolicy::from_config(&config));
        let writer = ArtifactWriter::new(&config.output_dir);

        orchestrator.on_success(|completed| {
            info!(
                "[文档 {}] 🎉 结果已就绪: {}",
                completed.document_id, completed.result_url
            );
        });

        Ok(Self {
            config,
            client,
            orchestrator,
            writer,
        })
    }

    /// 处理一个 PDF 文件
    ///
    /// Ctrl-C 会重置编排器并返回错误
    pub async fn run(&self, path: &Path) -> Result<RunReport> {
        let outcome = tokio::select! {
            outcome = self.process(path) => outcome,
            _ = tokio::signal::ctrl_c() => {
                warn!("⚠️ 收到中断信号，放弃当前任务");
                self.orchestrator.reset();
                Err(anyhow!("用户中断"))
            }
        };

        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                error!("❌ 处理失败: {:#}", e);
                self.record_summary(&self.orchestrator.snapshot());
                return Err(e);
            }
        };

        self.record_summary(&report.snapshot);
        print_final_stats(
            &report.snapshot,
            report.saved_to.as_deref().and_then(Path::to_str),
            &self.config.output_log_file,
        );
        Ok(report)
    }

    async fn process(&self, path: &Path) -> Result<RunReport> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.orchestrator.upload(&file_name, bytes).await?;
        self.orchestrator
            .start_job(self.config.preparation.clone())
            .await?;

        let snapshot = self.orchestrator.wait_until_settled().await;
        if snapshot.phase != JobPhase::Success {
            return Ok(RunReport {
                snapshot,
                saved_to: None,
            });
        }

        let saved_to = self.save_result(&snapshot).await?;
        Ok(RunReport {
            snapshot,
            saved_to: Some(saved_to),
        })
    }

    /// 下载结果并写入输出目录
    async fn save_result(&self, snapshot: &OrchestratorSnapshot) -> Result<PathBuf> {
        let document = snapshot
            .document
            .as_ref()
            .ok_or_else(|| anyhow!("任务成功但文档信息缺失"))?;

        info!("[文档 {}] 📥 正在下载结果...", document.document_id);
        let artifact = self
            .client
            .download(&document.document_id)
            .await
            .with_context(|| format!("下载结果失败 (文档 {})", document.document_id))?;

        let file_name = artifact
            .file_name
            .unwrap_or_else(|| fillable_file_name(&document.file_name));
        let path = self.writer.write(&file_name, &artifact.bytes).await?;
        info!("[文档 {}] ✓ 结果已保存: {}", document.document_id, path.display());
        Ok(path)
    }

    fn record_summary(&self, snapshot: &OrchestratorSnapshot) {
        if let Err(e) = append_log_line(&self.config.output_log_file, &job_summary(snapshot)) {
            warn!("⚠️ 写入日志文件失败: {}", e);
        }
    }
}
