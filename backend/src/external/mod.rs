//! External API integrations

pub mod ml_detection;
pub mod object_storage;

pub use ml_detection::{ImagePayload, MlDetectionClient};
pub use object_storage::ObjectStorageClient;
