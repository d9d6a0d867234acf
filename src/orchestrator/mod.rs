//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 命令行的展示层：驱动一次完整的文档处理，并把结果落盘。
//!
//! ## 层次关系
//!
//! ```text
//! form_processor (处理一个 PDF 文件)
//!     ↓
//! workflow::JobOrchestrator (状态机)
//!     ↓
//! clients::Transport (四个远程操作) / services (校验、命名、落盘)
//!     ↓
//! infrastructure::PollScheduler (轮询定时器)
//! ```
//!
//! 编排层只读状态快照，不自己判断任务状态

pub mod form_processor;

pub use form_processor::{App, RunReport};
