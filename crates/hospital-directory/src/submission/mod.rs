//! Hospital registration: local validation followed by image upload and
//! record creation.

pub mod domain;
pub mod validation;
mod workflow;


pub use domain::{
    CreatedHospital, HospitalDraft, HospitalFields, ImageFile, NewHospital, StoredImage,
    SPECIALITY_OPTIONS,
};
pub use validation::{DraftField, FieldError, ValidatedDraft, ValidationErrors, ValidationRules};
pub use workflow::{SubmissionError, SubmissionState, SubmissionStatusView, SubmissionWorkflow};
