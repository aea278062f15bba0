//! Boundary to the hospital REST backend.
//!
//! The query engine and the submission workflow only ever talk to
//! [`HospitalBackend`], so both can be exercised against in-memory fakes.

pub mod http;

use async_trait::async_trait;

use crate::directory::domain::{Hospital, HospitalId, HospitalSummary};
use crate::submission::domain::{CreatedHospital, ImageFile, NewHospital, StoredImage};

pub use http::HttpHospitalBackend;

#[async_trait]
pub trait HospitalBackend: Send + Sync {
    /// `GET /hospitals`, or `GET /hospitals?city=..` when a city scope is given.
    /// Matching is decided by the backend.
    async fn list_hospitals(&self, city: Option<&str>)
        -> Result<Vec<HospitalSummary>, BackendError>;

    /// `GET /hospitals/{id}`.
    async fn fetch_hospital(&self, id: &HospitalId) -> Result<Hospital, BackendError>;

    /// `POST /upload` as multipart with the file under the `image` field.
    async fn upload_image(&self, image: &ImageFile) -> Result<StoredImage, BackendError>;

    /// `POST /hospitals/create` with the JSON record payload.
    async fn create_hospital(&self, hospital: &NewHospital)
        -> Result<CreatedHospital, BackendError>;
}

/// Failure categories of a backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend did not respond in time")]
    Timeout,
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}
