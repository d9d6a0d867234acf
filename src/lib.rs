//! # Form Prep
//!
//! 表单字段检测服务的异步任务客户端：上传 PDF、提交检测任务、轮询到终态、取回结果
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有唯一的定时器任务，只暴露能力
//! - `PollScheduler` - 固定间隔、单飞、可取消的轮询
//!
//! ### ② 业务能力层（Clients / Services）
//! - `clients/` - `Transport` 四个远程操作及其 HTTP 实现 `FormPrepClient`
//! - `services/` - 上传校验、结果文件命名、结果落盘
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个任务"的完整状态机
//! - `JobOrchestrator` - 上传 → 提交 → 轮询 → 终态
//! - `OrchestratorSnapshot` - 展示层可见的状态
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/form_processor` - 命令行展示层，处理一个文件并保存结果
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{Artifact, FormPrepClient, Transport};
pub use config::Config;
pub use error::{AppError, AppResult, ErrorKind, ErrorReport};
pub use infrastructure::{PollControl, PollScheduler};
pub use models::{Document, Job, JobState, JobStatusReport, ModelSize, PreparationConfig};
pub use orchestrator::{App, RunReport};
pub use workflow::{CompletedJob, JobOrchestrator, JobPhase, OrchestratorSnapshot, PollPolicy};
