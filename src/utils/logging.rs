//! 日志工具模块
//!
//! 终端日志走 tracing，运行记录另外写一份纯文本日志文件

use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::workflow::OrchestratorSnapshot;

/// 初始化 tracing
///
/// `RUST_LOG` 优先；否则默认 `form_prep=info`，开启详细日志时为 `debug`
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "warn,form_prep=debug"
    } else {
        "warn,form_prep=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_target(false)
        .try_init();
}

/// 初始化日志文件（覆盖旧内容）
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n表单处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))
}

/// 向日志文件追加一行
pub fn append_log_line(log_file_path: &str, line: &str) -> AppResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )
    .map_err(|e| AppError::file_write_failed(log_file_path, e))
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 表单字段检测");
    info!("🌐 服务地址: {}", config.api_base_url);
    info!(
        "⚙️ 模型 {} / 灵敏度 {} / 签名字段 {} / 保留已有字段 {}",
        config.preparation.model,
        config.preparation.sensitivity,
        config.preparation.use_signature_fields,
        config.preparation.keep_existing_fields
    );
    info!(
        "⏱️ 轮询间隔 {}ms, 允许连续失败 {} 次",
        config.poll_interval_ms, config.max_poll_failures
    );
    info!("{}", "=".repeat(60));
}

/// 生成一行任务摘要，同时用于终端和日志文件
pub fn job_summary(snapshot: &OrchestratorSnapshot) -> String {
    let mut summary = format!(
        "文档 {} | 状态 {}",
        snapshot.document_id().unwrap_or("-"),
        snapshot.phase
    );
    if let Some(job) = &snapshot.job {
        if let Some(run_time) = job.run_time {
            summary.push_str(&format!(" | 运行 {:.1}s", run_time));
        }
        if let Some(queue_time) = job.queue_time {
            summary.push_str(&format!(" | 排队 {:.1}s", queue_time));
        }
    }
    if let Some(error) = &snapshot.error {
        summary.push_str(&format!(" | 错误 {}", error.message));
    }
    summary
}

/// 打印最终统计信息
pub fn print_final_stats(snapshot: &OrchestratorSnapshot, saved_to: Option<&str>, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 处理完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("{}", job_summary(snapshot));
    match saved_to {
        Some(path) => info!("✅ 结果文件: {}", path),
        None => info!("❌ 未生成结果文件"),
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ErrorReport};
    use crate::models::{Job, JobState, JobStatusReport, PreparationConfig};
    use crate::workflow::JobPhase;

    #[test]
    fn test_log_file_header_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        append_log_line(path, "文档 doc-1 | 状态 success").unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with(&"=".repeat(60)));
        assert!(content.contains("表单处理日志"));
        assert!(content.trim_end().ends_with("文档 doc-1 | 状态 success"));
    }

    #[test]
    fn test_job_summary() {
        let mut job = Job::new("doc-1", PreparationConfig::default());
        job.record(&JobStatusReport {
            state: JobState::Failure,
            run_time: Some(2.0),
            queue_time: None,
        });
        let snapshot = OrchestratorSnapshot {
            phase: JobPhase::Failure,
            job: Some(job),
            error: Some(ErrorReport::new(ErrorKind::JobFailed, "远程任务执行失败")),
            ..OrchestratorSnapshot::idle()
        };

        assert_eq!(
            job_summary(&snapshot),
            "文档 - | 状态 failure | 运行 2.0s | 错误 远程任务执行失败"
        );
    }
}
