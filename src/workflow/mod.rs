pub mod job_orchestrator;
pub mod job_snapshot;

pub use job_orchestrator::{JobOrchestrator, PollPolicy, SuccessHook};
pub use job_snapshot::{CompletedJob, JobPhase, OrchestratorSnapshot};
