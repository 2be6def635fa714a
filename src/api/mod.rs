// Platform API client module
//
// REST collaborators consumed by the upload orchestration:
// storage configuration, content submission (multipart), upload-job status,
// job cancellation, content metadata and hosted-URL assignment.

pub mod auth;
pub mod client;
pub mod error;
pub mod platform;
pub mod types;
pub mod upload;

pub use platform::{HttpPlatform, PlatformApi};
