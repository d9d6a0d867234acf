pub mod document;
pub mod job;
pub mod preparation;

pub use document::Document;
pub use job::{Job, JobState, JobStatusReport};
pub use preparation::{ModelSize, PreparationConfig, MAX_SENSITIVITY, MIN_SENSITIVITY};
