use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::PreparationConfig;

/// 远程任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Enqueued,
    Running,
    Success,
    Failure,
}

impl JobState {
    /// 解析线上状态值，未知值返回 None（由调用方转成协议错误）
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "enqueued" => Some(JobState::Enqueued),
            "running" => Some(JobState::Running),
            "success" => Some(JobState::Success),
            "failure" => Some(JobState::Failure),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Enqueued => "enqueued",
            JobState::Running => "running",
            JobState::Success => "success",
            JobState::Failure => "failure",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }

    /// 状态顺序，用于保证只前进不后退
    fn rank(self) -> u8 {
        match self {
            JobState::Enqueued => 0,
            JobState::Running => 1,
            JobState::Success | JobState::Failure => 2,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `/detect` 与 `/poll` 返回的状态报告
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobStatusReport {
    pub state: JobState,
    /// 运行耗时（秒）
    pub run_time: Option<f64>,
    /// 排队耗时（秒）
    pub queue_time: Option<f64>,
}

impl JobStatusReport {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            run_time: None,
            queue_time: None,
        }
    }
}

/// 一次异步处理任务
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub document_id: String,
    pub config: PreparationConfig,
    pub state: JobState,
    pub run_time: Option<f64>,
    pub queue_time: Option<f64>,
}

impl Job {
    /// 提交时创建，初始状态为排队
    pub fn new(document_id: impl Into<String>, config: PreparationConfig) -> Self {
        Self {
            document_id: document_id.into(),
            config,
            state: JobState::Enqueued,
            run_time: None,
            queue_time: None,
        }
    }

    /// 记录一次状态报告
    ///
    /// 终态之后不再变化；非终态只前进，不会从 running 回到 enqueued。
    /// 返回记录后的状态
    pub fn record(&mut self, report: &JobStatusReport) -> JobState {
        if self.state.is_terminal() {
            return self.state;
        }
        if report.state.rank() >= self.state.rank() {
            self.state = report.state;
        }
        if report.run_time.is_some() {
            self.run_time = report.run_time;
        }
        if report.queue_time.is_some() {
            self.queue_time = report.queue_time;
        }
        self.state
    }

    /// 标记失败（本地判定，例如轮询出错）
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = JobState::Failure;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(state: JobState) -> JobStatusReport {
        JobStatusReport::new(state)
    }

    #[test]
    fn test_from_wire() {
        assert_eq!(JobState::from_wire("running"), Some(JobState::Running));
        assert_eq!(JobState::from_wire("Running"), None);
        assert_eq!(JobState::from_wire("cancelled"), None);
    }

    #[test]
    fn test_record_is_monotonic() {
        let mut job = Job::new("doc-1", PreparationConfig::default());
        assert_eq!(job.record(&report(JobState::Running)), JobState::Running);
        // 服务端偶尔仍报告 enqueued，不回退
        assert_eq!(job.record(&report(JobState::Enqueued)), JobState::Running);
        assert_eq!(job.record(&report(JobState::Success)), JobState::Success);
        assert_eq!(job.record(&report(JobState::Failure)), JobState::Success);
        assert_eq!(job.record(&report(JobState::Running)), JobState::Success);
    }

    #[test]
    fn test_record_keeps_timings() {
        let mut job = Job::new("doc-1", PreparationConfig::default());
        job.record(&JobStatusReport {
            state: JobState::Running,
            run_time: Some(1.5),
            queue_time: Some(0.25),
        });
        job.record(&report(JobState::Running));
        assert_eq!(job.run_time, Some(1.5));
        assert_eq!(job.queue_time, Some(0.25));
    }

    #[test]
    fn test_fail_does_not_override_success() {
        let mut job = Job::new("doc-1", PreparationConfig::default());
        job.record(&report(JobState::Success));
        job.fail();
        assert_eq!(job.state, JobState::Success);
    }
}
