use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::backend::{BackendError, HospitalBackend};
use crate::directory::domain::{Hospital, HospitalId, HospitalSummary};
use crate::submission::domain::{
    CreatedHospital, HospitalDraft, ImageFile, NewHospital, StoredImage,
};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum BackendCall {
    Upload { file_name: String },
    Create(NewHospital),
}

/// Replays scripted upload and create results in order and records each call.
#[derive(Default)]
pub(super) struct ScriptedBackend {
    uploads: Mutex<VecDeque<Result<StoredImage, BackendError>>>,
    creates: Mutex<VecDeque<Result<CreatedHospital, BackendError>>>,
    calls: Mutex<Vec<BackendCall>>,
    upload_gate: Mutex<Option<Hold>>,
    create_gate: Mutex<Option<Hold>>,
}

/// Signals that a call started, then waits for the test to release it.
type Hold = (oneshot::Sender<()>, oneshot::Receiver<()>);

fn hold() -> (Hold, oneshot::Receiver<()>, oneshot::Sender<()>) {
    let (started_tx, started_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    ((started_tx, release_rx), started_rx, release_tx)
}

async fn wait_on(gate: &Mutex<Option<Hold>>) {
    let held = gate.lock().expect("gate mutex").take();
    if let Some((started, release)) = held {
        let _ = started.send(());
        let _ = release.await;
    }
}

impl ScriptedBackend {
    pub(super) fn upload_returns(&self, result: Result<StoredImage, BackendError>) {
        self.uploads.lock().expect("uploads mutex").push_back(result);
    }

    pub(super) fn create_returns(&self, result: Result<CreatedHospital, BackendError>) {
        self.creates.lock().expect("creates mutex").push_back(result);
    }

    /// Holds the next upload until released. Returns a receiver that fires
    /// once the upload has started and the sender that releases it.
    pub(super) fn hold_next_upload(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (gate, started, release) = hold();
        *self.upload_gate.lock().expect("gate mutex") = Some(gate);
        (started, release)
    }

    /// Same as [`Self::hold_next_upload`] for the create call.
    pub(super) fn hold_next_create(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (gate, started, release) = hold();
        *self.create_gate.lock().expect("gate mutex") = Some(gate);
        (started, release)
    }

    pub(super) fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub(super) fn upload_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, BackendCall::Upload { .. }))
            .count()
    }

    pub(super) fn created(&self) -> Vec<NewHospital> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Create(hospital) => Some(hospital),
                BackendCall::Upload { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl HospitalBackend for ScriptedBackend {
    async fn list_hospitals(
        &self,
        _city: Option<&str>,
    ) -> Result<Vec<HospitalSummary>, BackendError> {
        unreachable!("submission never lists hospitals")
    }

    async fn fetch_hospital(&self, _id: &HospitalId) -> Result<Hospital, BackendError> {
        unreachable!("submission never fetches details")
    }

    async fn upload_image(&self, image: &ImageFile) -> Result<StoredImage, BackendError> {
        self.calls
            .lock()
            .expect("calls mutex")
            .push(BackendCall::Upload {
                file_name: image.file_name.clone(),
            });

        wait_on(&self.upload_gate).await;

        self.uploads
            .lock()
            .expect("uploads mutex")
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Transport("no scripted upload".to_string())))
    }

    async fn create_hospital(
        &self,
        hospital: &NewHospital,
    ) -> Result<CreatedHospital, BackendError> {
        self.calls
            .lock()
            .expect("calls mutex")
            .push(BackendCall::Create(hospital.clone()));
        wait_on(&self.create_gate).await;
        self.creates
            .lock()
            .expect("creates mutex")
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Transport("no scripted create".to_string())))
    }
}

pub(super) fn stored(path: &str) -> Result<StoredImage, BackendError> {
    Ok(StoredImage {
        file_path: path.to_string(),
    })
}

pub(super) fn created(id: &str) -> Result<CreatedHospital, BackendError> {
    Ok(CreatedHospital {
        id: HospitalId::from(id),
    })
}

pub(super) fn st_mary_draft() -> HospitalDraft {
    let mut draft = HospitalDraft::new();
    draft.name = "St. Mary".to_string();
    draft.city = "Springfield".to_string();
    draft.rating = Some(4.5);
    draft.description = "Teaching hospital".to_string();
    draft.number_of_doctors = Some(12);
    draft.number_of_departments = Some(5);
    draft.select_speciality("Cardiology");
    draft.attach_image(ImageFile::new("x.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]));
    draft
}
