#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use form_prep::clients::{Artifact, Transport};
use form_prep::error::{AppResult, ProtocolError, TransportError};
use form_prep::models::{Document, JobState, JobStatusReport, PreparationConfig};
use form_prep::workflow::{JobOrchestrator, PollPolicy};

pub const INTERVAL: Duration = Duration::from_millis(1500);

/// 脚本化的一次远程响应
#[derive(Clone)]
pub enum Reply {
    Status(JobStatusReport),
    /// 非 2xx 响应
    Fail(u16),
    /// 未知的任务状态值
    Unknown(&'static str),
    /// 等待通知后再返回
    Gated(Arc<Notify>, JobStatusReport),
    /// 延迟返回
    Delayed(Duration, JobStatusReport),
}

pub fn status(state: JobState) -> Reply {
    Reply::Status(JobStatusReport::new(state))
}

/// 按脚本返回结果的假传输层
///
/// 轮询脚本用完后一直返回最后一个响应
pub struct ScriptedTransport {
    upload_failure: Option<u16>,
    upload_gate: Option<Arc<Notify>>,
    submit: Reply,
    polls: Mutex<VecDeque<Reply>>,
    last_poll: Mutex<Option<Reply>>,
    pub upload_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            upload_failure: None,
            upload_gate: None,
            submit: status(JobState::Enqueued),
            polls: Mutex::new(VecDeque::new()),
            last_poll: Mutex::new(None),
            upload_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_upload_failure(mut self, status: u16) -> Self {
        self.upload_failure = Some(status);
        self
    }

    /// 上传请求在通知之前一直挂起
    pub fn with_upload_gate(mut self, gate: Arc<Notify>) -> Self {
        self.upload_gate = Some(gate);
        self
    }

    pub fn with_submit(mut self, reply: Reply) -> Self {
        self.submit = reply;
        self
    }

    pub fn with_polls(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.polls.lock().extend(replies);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn uploads(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    fn next_poll(&self) -> Reply {
        let next = self.polls.lock().pop_front();
        let mut last = self.last_poll.lock();
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or_else(|| status(JobState::Running)),
        }
    }
}

async fn resolve(endpoint: &'static str, reply: Reply) -> AppResult<JobStatusReport> {
    match reply {
        Reply::Status(report) => Ok(report),
        Reply::Fail(status) => Err(TransportError::BadStatus {
            endpoint,
            status,
            detail: None,
        }
        .into()),
        Reply::Unknown(value) => Err(ProtocolError::UnknownJobState {
            endpoint,
            value: value.to_string(),
        }
        .into()),
        Reply::Gated(gate, report) => {
            gate.notified().await;
            Ok(report)
        }
        Reply::Delayed(delay, report) => {
            tokio::time::sleep(delay).await;
            Ok(report)
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<Document> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.upload_gate {
            gate.notified().await;
        }
        if let Some(status) = self.upload_failure {
            return Err(TransportError::BadStatus {
                endpoint: "/upload",
                status,
                detail: Some("upload rejected".to_string()),
            }
            .into());
        }
        Ok(Document {
            document_id: "doc-1".to_string(),
            pages: 1,
            size: bytes.len() as u64,
            file_name: file_name.to_string(),
        })
    }

    async fn submit_job(
        &self,
        _document_id: &str,
        _config: &PreparationConfig,
    ) -> AppResult<JobStatusReport> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        resolve("/detect", self.submit.clone()).await
    }

    async fn poll_job(&self, _document_id: &str) -> AppResult<JobStatusReport> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = resolve("/poll", self.next_poll()).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn result_url(&self, document_id: &str) -> String {
        format!("http://fake/download?documentId={}", document_id)
    }

    async fn download(&self, _document_id: &str) -> AppResult<Artifact> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Artifact {
            file_name: None,
            bytes: pdf_bytes(),
        })
    }
}

pub fn orchestrator(transport: &Arc<ScriptedTransport>, max_consecutive_failures: u32) -> JobOrchestrator {
    let transport: Arc<dyn Transport> = transport.clone();
    JobOrchestrator::new(
        transport,
        PollPolicy {
            interval: INTERVAL,
            max_consecutive_failures,
        },
    )
}

pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF\n".to_vec()
}

/// 让出执行权，直到已就绪的任务都跑完
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
