//! Hospital listing: remote city search, local speciality filter.

pub mod domain;
mod engine;
pub mod filter;


pub use domain::{Hospital, HospitalId, HospitalSummary, ImageRef};
pub use engine::{DirectoryError, DirectoryQueryEngine, DirectorySnapshot, QueryOutcome};
pub use filter::filter_by_speciality;
