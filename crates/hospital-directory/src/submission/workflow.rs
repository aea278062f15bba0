use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{HospitalDraft, HospitalFields};
use super::validation::{ValidationErrors, ValidationRules};
use crate::backend::{BackendError, HospitalBackend};
use crate::directory::domain::HospitalId;

/// Where a submission attempt currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Validating,
    UploadingImage,
    CreatingRecord { image_path: String },
    Succeeded { id: HospitalId },
    Failed(SubmissionError),
}

impl SubmissionState {
    pub const fn label(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Validating => "validating",
            SubmissionState::UploadingImage => "uploading_image",
            SubmissionState::CreatingRecord { .. } => "creating_record",
            SubmissionState::Succeeded { .. } => "succeeded",
            SubmissionState::Failed(_) => "failed",
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SubmissionState::Validating
                | SubmissionState::UploadingImage
                | SubmissionState::CreatingRecord { .. }
        )
    }

    pub fn failure(&self) -> Option<&SubmissionError> {
        match self {
            SubmissionState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn created_id(&self) -> Option<&HospitalId> {
        match self {
            SubmissionState::Succeeded { id } => Some(id),
            _ => None,
        }
    }

    /// Field-level report when the attempt stopped in local validation.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            SubmissionState::Failed(SubmissionError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }

    /// General message for a failure raised by a remote step.
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            SubmissionState::Failed(error) if !matches!(error, SubmissionError::Validation(_)) => {
                Some(error.user_message())
            }
            _ => None,
        }
    }
}

/// Failure of a submission attempt.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("image upload failed: {0}")]
    Upload(#[source] BackendError),
    #[error("record creation failed; uploaded image {orphaned_image} has no hospital record: {source}")]
    Create {
        orphaned_image: String,
        source: BackendError,
    },
    #[error("submission was dropped before it finished")]
    Interrupted,
    #[error("a submission is already in progress")]
    InFlight,
    #[error("no failed record creation to retry")]
    NothingToRetry,
}

impl SubmissionError {
    pub const fn user_message(&self) -> &'static str {
        match self {
            SubmissionError::Validation(_) => "Please correct the highlighted fields",
            SubmissionError::Upload(_) => "Failed to upload hospital image",
            SubmissionError::Create { .. } => {
                "Image was uploaded but the hospital could not be created"
            }
            SubmissionError::Interrupted => "Submission was interrupted",
            SubmissionError::InFlight => "A submission is already in progress",
            SubmissionError::NothingToRetry => "There is no failed submission to retry",
        }
    }

    /// Image left on the backend without a record, if any.
    pub fn orphaned_image(&self) -> Option<&str> {
        match self {
            SubmissionError::Create { orphaned_image, .. } => Some(orphaned_image),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            SubmissionError::Upload(source) | SubmissionError::Create { source, .. } => {
                source.is_timeout()
            }
            _ => false,
        }
    }
}

/// Serializable view of the workflow for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionStatusView {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_id: Option<HospitalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<ValidationErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphaned_image: Option<String>,
}

/// Two-phase hospital creation: upload the image, then create the record
/// that references it.
///
/// Only one attempt may be in flight at a time. Every attempt ends in
/// `Succeeded` or `Failed`; nothing is retried automatically.
pub struct SubmissionWorkflow<B> {
    backend: Arc<B>,
    rules: ValidationRules,
    state: Mutex<SubmissionState>,
}

impl<B> SubmissionWorkflow<B>
where
    B: HospitalBackend + 'static,
{
    pub fn new(backend: Arc<B>, rules: ValidationRules) -> Self {
        Self {
            backend,
            rules,
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.lock().clone()
    }

    pub fn status_view(&self) -> SubmissionStatusView {
        let state = self.lock();
        let (error, orphaned_image) = match &*state {
            SubmissionState::Failed(err) => (
                state.error_message(),
                err.orphaned_image().map(str::to_string),
            ),
            _ => (None, None),
        };
        SubmissionStatusView {
            state: state.label(),
            hospital_id: state.created_id().cloned(),
            field_errors: state.field_errors().cloned(),
            error,
            orphaned_image,
        }
    }

    /// Returns the workflow to `Idle`. Refused while an attempt is in flight.
    pub fn reset(&self) -> bool {
        let mut state = self.lock();
        if state.is_in_flight() {
            return false;
        }
        *state = SubmissionState::Idle;
        true
    }

    /// Runs a full attempt from `Idle`: validate, upload, create.
    ///
    /// Validation failures never reach the backend. The draft is only
    /// borrowed, so its image survives a failed attempt.
    pub async fn submit(&self, draft: &HospitalDraft) -> Result<HospitalId, SubmissionError> {
        let (attempt, ()) = self.begin(|_| Some(()))?;

        let validated = match self.rules.validate(draft) {
            Ok(validated) => validated,
            Err(errors) => return Err(attempt.fail(SubmissionError::Validation(errors))),
        };

        attempt.set(SubmissionState::UploadingImage);
        let stored = match self.backend.upload_image(validated.image).await {
            Ok(stored) => stored,
            Err(source) => {
                warn!(error = %source, "hospital image upload failed");
                return Err(attempt.fail(SubmissionError::Upload(source)));
            }
        };

        self.create(attempt, validated.fields, stored.file_path).await
    }

    /// Re-runs only the create step against the image uploaded by the last
    /// attempt, which must have failed while creating the record.
    ///
    /// The draft's image is not checked since nothing is uploaded. If the
    /// edited fields are invalid the field errors are returned and the
    /// workflow stays in the previous create failure, so the orphaned image
    /// can still be retried once the draft is fixed.
    pub async fn retry_create(&self, draft: &HospitalDraft) -> Result<HospitalId, SubmissionError> {
        let (attempt, previous) = self.begin(|state| {
            state
                .failure()
                .filter(|failure| failure.orphaned_image().is_some())
                .cloned()
        })?;
        let image_path = previous.orphaned_image().unwrap_or_default().to_string();

        let fields = match self.rules.validate_fields(draft) {
            Ok(fields) => fields,
            Err(errors) => {
                attempt.set(SubmissionState::Failed(previous));
                return Err(SubmissionError::Validation(errors));
            }
        };

        self.create(attempt, fields, image_path).await
    }

    async fn create(
        &self,
        attempt: Attempt<'_>,
        fields: HospitalFields,
        image_path: String,
    ) -> Result<HospitalId, SubmissionError> {
        attempt.set(SubmissionState::CreatingRecord {
            image_path: image_path.clone(),
        });

        let payload = fields.into_payload(image_path.clone());
        match self.backend.create_hospital(&payload).await {
            Ok(created) => {
                info!(id = %created.id, name = %payload.name, "hospital created");
                attempt.set(SubmissionState::Succeeded {
                    id: created.id.clone(),
                });
                Ok(created.id)
            }
            Err(source) => {
                warn!(
                    error = %source,
                    orphaned_image = %image_path,
                    "hospital record creation failed after image upload"
                );
                Err(attempt.fail(SubmissionError::Create {
                    orphaned_image: image_path,
                    source,
                }))
            }
        }
    }

    /// Claims the workflow for a new attempt. `claim` inspects the previous
    /// state and refuses it by returning `None`; an in-flight state is always
    /// refused.
    fn begin<T, F>(&self, claim: F) -> Result<(Attempt<'_>, T), SubmissionError>
    where
        F: FnOnce(&SubmissionState) -> Option<T>,
    {
        let mut state = self.lock();
        if state.is_in_flight() {
            return Err(SubmissionError::InFlight);
        }
        let claimed = claim(&state).ok_or(SubmissionError::NothingToRetry)?;
        *state = SubmissionState::Validating;
        Ok((
            Attempt {
                state: &self.state,
            },
            claimed,
        ))
    }

    fn lock(&self) -> MutexGuard<'_, SubmissionState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<SubmissionState>) -> MutexGuard<'_, SubmissionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ownership of the in-flight state for one attempt. If the attempt's future
/// is dropped mid-flight the state falls back to `Failed(Interrupted)`.
struct Attempt<'a> {
    state: &'a Mutex<SubmissionState>,
}

impl Attempt<'_> {
    fn set(&self, next: SubmissionState) {
        *lock_state(self.state) = next;
    }

    fn fail(&self, error: SubmissionError) -> SubmissionError {
        self.set(SubmissionState::Failed(error.clone()));
        error
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        let mut state = lock_state(self.state);
        if state.is_in_flight() {
            *state = SubmissionState::Failed(SubmissionError::Interrupted);
        }
    }
}
