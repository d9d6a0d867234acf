//! 任务编排器 - 状态机层
//!
//! 职责：
//! - 持有当前文档、任务、错误，以及唯一的轮询调度器
//! - 上传、提交、轮询三类远程结果只在"仍属于当前任务"时才生效
//! - 通过 watch 通道向展示层广播状态快照
//!
//! 状态锁是同步锁，任何 `.await` 之前都必须释放

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clients::Transport;
use crate::config::Config;
use crate::error::{AppError, AppResult, ErrorKind, ErrorReport, ValidationError};
use crate::infrastructure::{PollControl, PollScheduler};
use crate::models::{Document, Job, JobState, JobStatusReport, PreparationConfig};
use crate::services::{sanitize_file_name, validate_upload};
use crate::workflow::job_snapshot::{CompletedJob, JobPhase, OrchestratorSnapshot};

/// 任务成功时的回调
pub type SuccessHook = Arc<dyn Fn(&CompletedJob) + Send + Sync>;

/// 轮询策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// 允许连续失败的轮询次数，超过后任务判定为失败
    pub max_consecutive_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            max_consecutive_failures: 0,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            max_consecutive_failures: config.max_poll_failures,
        }
    }
}

/// 任务编排器
///
/// 克隆得到的是同一个编排器的句柄
#[derive(Clone)]
pub struct JobOrchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    policy: PollPolicy,
    state: Mutex<Inner>,
    snapshots: watch::Sender<OrchestratorSnapshot>,
}

struct Inner {
    document: Option<Document>,
    job: Option<Job>,
    error: Option<ErrorReport>,
    result_url: Option<String>,
    /// 每次提交任务或重置时递增，用来识别过期的远程结果
    epoch: u64,
    upload_pending: bool,
    poll_failures: u32,
    scheduler: PollScheduler,
    on_success: Option<SuccessHook>,
}

/// 需要在锁外触发的成功回调
type Notification = (SuccessHook, CompletedJob);

impl JobOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, policy: PollPolicy) -> Self {
        let inner = Inner {
            document: None,
            job: None,
            error: None,
            result_url: None,
            epoch: 0,
            upload_pending: false,
            poll_failures: 0,
            scheduler: PollScheduler::new(policy.interval),
            on_success: None,
        };
        let (snapshots, _) = watch::channel(inner.snapshot());

        Self {
            shared: Arc::new(Shared {
                transport,
                policy,
                state: Mutex::new(inner),
                snapshots,
            }),
        }
    }

    // ========== 观察接口 ==========

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        self.shared.state.lock().snapshot()
    }

    pub fn phase(&self) -> JobPhase {
        self.shared.state.lock().phase()
    }

    pub fn error(&self) -> Option<ErrorReport> {
        self.shared.state.lock().error.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.shared.state.lock().scheduler.is_active()
    }

    /// 订阅状态快照，每次状态变化都会推送
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// 等待任务离开 enqueued/running
    pub async fn wait_until_settled(&self) -> OrchestratorSnapshot {
        let mut receiver = self.subscribe();
        let settled = receiver
            .wait_for(|snapshot| !snapshot.phase.is_active())
            .await
            .map(|snapshot| snapshot.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    /// 注册任务成功回调（替换已有回调）
    ///
    /// 回调在状态锁之外执行，可以再调用编排器的方法
    pub fn on_success(&self, hook: impl Fn(&CompletedJob) + Send + Sync + 'static) {
        self.shared.state.lock().on_success = Some(Arc::new(hook));
    }

    // ========== 动作 ==========

    /// 上传文档
    ///
    /// 只允许在 idle 或 document_ready 阶段调用，后者会替换已有文档。
    /// 失败时保留原有状态并记录错误
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<Document> {
        let file_name = sanitize_file_name(file_name);

        let epoch = {
            let mut inner = self.shared.state.lock();
            inner.admit_upload()?;
            validate_upload(&bytes)?;
            inner.upload_pending = true;
            inner.error = None;
            self.shared.publish(&inner);
            inner.epoch
        };

        info!("[文档 {}] 📤 正在上传 ({} 字节)...", file_name, bytes.len());
        let result = self.shared.transport.upload(&file_name, bytes).await;

        let mut inner = self.shared.state.lock();
        if inner.epoch != epoch {
            debug!("[文档 {}] 上传完成时编排器已重置，丢弃结果", file_name);
            return Err(ValidationError::Superseded.into());
        }
        inner.upload_pending = false;

        match result {
            Ok(document) => {
                let document = document.with_file_name(file_name);
                info!(
                    "[文档 {}] ✓ 上传成功，共 {} 页",
                    document.document_id, document.pages
                );
                inner.document = Some(document.clone());
                self.shared.publish(&inner);
                Ok(document)
            }
            Err(err) => {
                error!("[文档 {}] 上传失败: {}", file_name, err);
                inner.error = Some(ErrorReport::from(&err));
                self.shared.publish(&inner);
                Err(err)
            }
        }
    }

    /// 提交处理任务
    ///
    /// 返回提交响应处理之后的阶段。任务已在执行时直接拒绝，不改变状态也不发请求
    pub async fn start_job(&self, config: PreparationConfig) -> AppResult<JobPhase> {
        let (document_id, epoch) = {
            let mut inner = self.shared.state.lock();
            let document_id = inner.admit_job()?;
            config.validate()?;

            inner.epoch += 1;
            inner.job = Some(Job::new(document_id.clone(), config.clone()));
            inner.error = None;
            inner.result_url = None;
            inner.poll_failures = 0;
            self.shared.publish(&inner);
            (document_id, inner.epoch)
        };

        info!(
            "[文档 {}] 🚀 提交任务 (模型 {}, 灵敏度 {})",
            document_id, config.model, config.sensitivity
        );
        let result = self.shared.transport.submit_job(&document_id, &config).await;

        let (phase, notification) = {
            let mut inner = self.shared.state.lock();
            if inner.epoch != epoch {
                debug!("[文档 {}] 提交完成时编排器已重置，丢弃结果", document_id);
                return Err(ValidationError::Superseded.into());
            }

            let notification = match result {
                Ok(report) => self.shared.apply_submit(&mut inner, epoch, &report),
                Err(err) => {
                    error!("[文档 {}] 提交失败: {}", document_id, err);
                    if let Some(job) = inner.job.as_mut() {
                        job.fail();
                    }
                    inner.error = Some(ErrorReport::from(&err));
                    self.shared.publish(&inner);
                    return Err(err);
                }
            };
            self.shared.publish(&inner);
            (inner.phase(), notification)
        };

        notify(notification);
        Ok(phase)
    }

    /// 丢弃文档和任务，回到 idle
    ///
    /// 任何阶段都可以调用；在途的远程结果到达后会被丢弃
    pub fn reset(&self) {
        let mut inner = self.shared.state.lock();
        inner.scheduler.stop();
        inner.epoch += 1;
        inner.document = None;
        inner.job = None;
        inner.error = None;
        inner.result_url = None;
        inner.upload_pending = false;
        inner.poll_failures = 0;
        self.shared.publish(&inner);
        info!("🔄 编排器已重置");
    }
}

impl Shared {
    fn publish(&self, inner: &Inner) {
        self.snapshots.send_replace(inner.snapshot());
    }

    /// 处理提交响应：终态直接收尾，否则开始轮询
    fn apply_submit(
        self: &Arc<Self>,
        inner: &mut Inner,
        epoch: u64,
        report: &JobStatusReport,
    ) -> Option<Notification> {
        let state = inner.job.as_mut().map(|job| job.record(report))?;
        if state.is_terminal() {
            info!("提交响应已是终态 {}，无需轮询", state);
            return inner.settle(self.transport.as_ref());
        }

        let shared: Weak<Shared> = Arc::downgrade(self);
        inner.scheduler.start(move || {
            let shared = shared.clone();
            async move {
                match shared.upgrade() {
                    Some(shared) => shared.poll_once(epoch).await,
                    None => PollControl::Stop,
                }
            }
        });
        debug!("轮询已启动，间隔 {:?}", self.policy.interval);
        None
    }

    /// 一次轮询
    async fn poll_once(&self, epoch: u64) -> PollControl {
        let document_id = {
            let inner = self.state.lock();
            match inner.current_job(epoch) {
                Some(job) => job.document_id.clone(),
                None => return PollControl::Stop,
            }
        };

        let result = self.transport.poll_job(&document_id).await;

        let (control, notification) = {
            let mut inner = self.state.lock();
            let outcome = self.apply_poll(&mut inner, epoch, result);
            self.publish(&inner);
            outcome
        };

        notify(notification);
        control
    }

    fn apply_poll(
        &self,
        inner: &mut Inner,
        epoch: u64,
        result: AppResult<JobStatusReport>,
    ) -> (PollControl, Option<Notification>) {
        if inner.current_job(epoch).is_none() {
            debug!("丢弃过期的轮询结果");
            return (PollControl::Stop, None);
        }
        let Some(job) = inner.job.as_mut() else {
            return (PollControl::Stop, None);
        };

        match result {
            Ok(report) => {
                inner.poll_failures = 0;
                let state = job.record(&report);
                if state.is_terminal() {
                    return (PollControl::Stop, inner.settle(self.transport.as_ref()));
                }
                debug!("[文档 {}] 任务状态: {}", job.document_id, state);
                (PollControl::Continue, None)
            }
            Err(err) => {
                inner.poll_failures += 1;
                let retryable = matches!(err, AppError::Transport(_));
                if retryable && inner.poll_failures <= self.policy.max_consecutive_failures {
                    warn!(
                        "[文档 {}] ⚠️ 轮询失败 ({}/{})，下次继续: {}",
                        job.document_id,
                        inner.poll_failures,
                        self.policy.max_consecutive_failures,
                        err
                    );
                    return (PollControl::Continue, None);
                }

                error!("[文档 {}] 轮询失败，任务终止: {}", job.document_id, err);
                job.fail();
                inner.error = Some(ErrorReport::from(&err));
                (PollControl::Stop, inner.settle(self.transport.as_ref()))
            }
        }
    }
}

impl Inner {
    fn phase(&self) -> JobPhase {
        JobPhase::derive(self.document.as_ref(), self.job.as_ref())
    }

    fn snapshot(&self) -> OrchestratorSnapshot {
        OrchestratorSnapshot {
            phase: self.phase(),
            document: self.document.clone(),
            job: self.job.clone(),
            error: self.error.clone(),
            result_url: self.result_url.clone(),
            polling: self.scheduler.is_active(),
        }
    }

    /// epoch 仍然有效且未进入终态的任务
    fn current_job(&self, epoch: u64) -> Option<&Job> {
        if self.epoch != epoch {
            return None;
        }
        self.job.as_ref().filter(|job| !job.state.is_terminal())
    }

    fn admit_upload(&self) -> Result<(), ValidationError> {
        if self.upload_pending {
            return Err(ValidationError::UploadInProgress);
        }
        match &self.job {
            Some(job) if job.state.is_terminal() => Err(ValidationError::JobFinished),
            Some(job) => Err(ValidationError::JobAlreadyActive {
                document_id: job.document_id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// 检查能否提交任务，返回文档 ID
    fn admit_job(&self) -> Result<String, ValidationError> {
        if self.upload_pending {
            return Err(ValidationError::UploadInProgress);
        }
        match (&self.document, &self.job) {
            (None, _) => Err(ValidationError::NoDocument),
            (Some(_), Some(job)) if !job.state.is_terminal() => {
                Err(ValidationError::JobAlreadyActive {
                    document_id: job.document_id.clone(),
                })
            }
            (Some(_), Some(_)) => Err(ValidationError::JobFinished),
            (Some(document), None) => Ok(document.document_id.clone()),
        }
    }

    /// 进入终态后的收尾：停止轮询，成功时生成结果地址
    fn settle(&mut self, transport: &dyn Transport) -> Option<Notification> {
        self.scheduler.stop();
        let job = self.job.as_ref()?;

        match job.state {
            JobState::Success => {
                let result_url = transport.result_url(&job.document_id);
                info!(
                    "[文档 {}] ✓ 任务完成 (运行 {:.1}s, 排队 {:.1}s)",
                    job.document_id,
                    job.run_time.unwrap_or_default(),
                    job.queue_time.unwrap_or_default()
                );
                let completed = CompletedJob {
                    document_id: job.document_id.clone(),
                    file_name: self
                        .document
                        .as_ref()
                        .map(|d| d.file_name.clone())
                        .unwrap_or_default(),
                    result_url: result_url.clone(),
                    run_time: job.run_time,
                    queue_time: job.queue_time,
                };
                self.result_url = Some(result_url);
                self.on_success.clone().map(|hook| (hook, completed))
            }
            JobState::Failure => {
                warn!("[文档 {}] ❌ 任务失败", job.document_id);
                if self.error.is_none() {
                    self.error = Some(ErrorReport::new(ErrorKind::JobFailed, "远程任务执行失败"));
                }
                None
            }
            JobState::Enqueued | JobState::Running => None,
        }
    }
}

fn notify(notification: Option<Notification>) {
    if let Some((hook, completed)) = notification {
        hook(&completed);
    }
}
