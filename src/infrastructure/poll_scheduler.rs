//! 轮询调度器 - 基础设施层
//!
//! 持有唯一的定时器任务，只暴露"按固定间隔执行一步"的能力

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// 单步执行后的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    /// 继续下一次轮询
    Continue,
    /// 结束轮询
    Stop,
}

/// 轮询调度器
///
/// 保证：
/// - 启动后立即执行第一次
/// - 同一时间最多一个在途调用，与在途调用重叠的 tick 直接跳过
/// - `stop()` 之后不再执行，在途调用被丢弃
/// - `stop()` 幂等，可以在 step 内部调用
pub struct PollScheduler {
    period: Duration,
    active: Option<ActiveLoop>,
}

struct ActiveLoop {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PollScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            active: None,
        }
    }

    /// 启动轮询，已有的轮询会先被停止
    ///
    /// 必须在 tokio 运行时内调用
    pub fn start<F, Fut>(&mut self, mut step: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = PollControl> + Send + 'static,
    {
        self.stop();

        let (cancel, mut cancelled) = watch::channel(false);
        let period = self.period;
        let mut deadline = Instant::now();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.changed() => break,
                    _ = sleep_until(deadline) => {}
                }

                let control = tokio::select! {
                    biased;
                    _ = cancelled.changed() => {
                        debug!("轮询已停止，丢弃在途请求");
                        break;
                    }
                    control = step() => control,
                };

                // step 内部可能已经调用了 stop()
                if *cancelled.borrow() || control == PollControl::Stop {
                    break;
                }

                // 与在途请求重叠的 tick 直接跳过，不排队
                let now = Instant::now();
                deadline += period;
                let mut skipped = 0u32;
                while deadline <= now {
                    deadline += period;
                    skipped += 1;
                }
                if skipped > 0 {
                    debug!("上一次轮询耗时过长，跳过 {} 个 tick", skipped);
                }
            }
        });

        self.active = Some(ActiveLoop { cancel, handle });
    }

    /// 停止轮询
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            // 不 abort：stop() 可能正在轮询任务内部执行
            let _ = active.cancel.send(true);
            debug!("轮询调度器已停止");
        }
    }

    /// 是否仍在轮询
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .map_or(false, |active| !active.handle.is_finished())
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
