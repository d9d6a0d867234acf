//! 编排器对外可见的状态
//!
//! 展示层只通过这里的类型读取状态

use std::fmt::Display;

use crate::error::ErrorReport;
use crate::models::{Document, Job, JobState};

/// 编排器阶段
///
/// 由 (Document, Job) 推导，任何时刻都只可能是这六种之一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    /// 尚未上传文档
    Idle,
    /// 文档已上传，尚未提交任务
    DocumentReady,
    Enqueued,
    Running,
    Success,
    Failure,
}

impl JobPhase {
    pub(crate) fn derive(document: Option<&Document>, job: Option<&Job>) -> Self {
        match (job, document) {
            (Some(job), _) => job.state.into(),
            (None, Some(_)) => JobPhase::DocumentReady,
            (None, None) => JobPhase::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Success | JobPhase::Failure)
    }

    /// 任务是否在远程执行中（需要轮询）
    pub fn is_active(self) -> bool {
        matches!(self, JobPhase::Enqueued | JobPhase::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::Idle => "idle",
            JobPhase::DocumentReady => "document_ready",
            JobPhase::Enqueued => "enqueued",
            JobPhase::Running => "running",
            JobPhase::Success => "success",
            JobPhase::Failure => "failure",
        }
    }
}

impl From<JobState> for JobPhase {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Enqueued => JobPhase::Enqueued,
            JobState::Running => JobPhase::Running,
            JobState::Success => JobPhase::Success,
            JobState::Failure => JobPhase::Failure,
        }
    }
}

impl Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 成功完成的任务（交给终态回调）
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedJob {
    pub document_id: String,
    /// 原始文件名，用于生成结果文件名
    pub file_name: String,
    pub result_url: String,
    pub run_time: Option<f64>,
    pub queue_time: Option<f64>,
}

/// 编排器状态快照
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSnapshot {
    pub phase: JobPhase,
    pub document: Option<Document>,
    pub job: Option<Job>,
    pub error: Option<ErrorReport>,
    /// 仅在 success 时存在
    pub result_url: Option<String>,
    pub polling: bool,
}

impl OrchestratorSnapshot {
    pub fn idle() -> Self {
        Self {
            phase: JobPhase::Idle,
            document: None,
            job: None,
            error: None,
            result_url: None,
            polling: false,
        }
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.document_id.as_str())
    }
}

impl Display for OrchestratorSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文档 {} 状态 {}]",
            self.document_id().unwrap_or("-"),
            self.phase
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PreparationConfig;

    fn document() -> Document {
        Document {
            document_id: "doc-1".to_string(),
            pages: 1,
            size: 10,
            file_name: "form.pdf".to_string(),
        }
    }

    #[test]
    fn test_derive_phase() {
        let doc = document();
        assert_eq!(JobPhase::derive(None, None), JobPhase::Idle);
        assert_eq!(JobPhase::derive(Some(&doc), None), JobPhase::DocumentReady);

        let mut job = Job::new("doc-1", PreparationConfig::default());
        assert_eq!(JobPhase::derive(Some(&doc), Some(&job)), JobPhase::Enqueued);
        job.state = JobState::Failure;
        assert_eq!(JobPhase::derive(Some(&doc), Some(&job)), JobPhase::Failure);
    }

    #[test]
    fn test_phase_flags() {
        assert!(JobPhase::Success.is_terminal());
        assert!(!JobPhase::Running.is_terminal());
        assert!(JobPhase::Enqueued.is_active());
        assert!(!JobPhase::DocumentReady.is_active());
    }

    #[test]
    fn test_snapshot_display() {
        let mut snapshot = OrchestratorSnapshot::idle();
        assert_eq!(snapshot.to_string(), "[文档 - 状态 idle]");
        snapshot.document = Some(document());
        snapshot.phase = JobPhase::DocumentReady;
        assert_eq!(snapshot.to_string(), "[文档 doc-1 状态 document_ready]");
    }
}
