pub mod form_client;
pub mod transport;

pub use form_client::FormPrepClient;
pub use transport::{Artifact, Transport};
