//! Hospital directory client core.
//!
//! [`directory::DirectoryQueryEngine`] keeps the hospital listing in sync with
//! the backend, and [`submission::SubmissionWorkflow`] registers new hospitals
//! through the two-step upload-then-create mutation. Both reach the backend
//! only through [`backend::HospitalBackend`].

pub mod backend;
pub mod config;
pub mod directory;
pub mod error;
pub mod submission;
pub mod telemetry;
