pub mod artifact_writer;
pub mod naming;
pub mod pdf_validator;

pub use artifact_writer::ArtifactWriter;
pub use naming::{fillable_file_name, sanitize_file_name};
pub use pdf_validator::{validate_upload, MAX_UPLOAD_BYTES};
