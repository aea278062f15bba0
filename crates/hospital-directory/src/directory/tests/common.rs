use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::backend::{BackendError, HospitalBackend};
use crate::directory::domain::{Hospital, HospitalId, HospitalSummary, ImageRef};
use crate::submission::domain::{CreatedHospital, ImageFile, NewHospital, StoredImage};

type ListResult = Result<Vec<HospitalSummary>, BackendError>;

pub(super) fn hospital(id: &str, city: &str, specialities: &[&str]) -> HospitalSummary {
    HospitalSummary {
        id: HospitalId::from(id),
        name: format!("{city} Hospital {id}"),
        city: city.to_string(),
        image_ref: ImageRef(format!("/uploads/{id}.png")),
        specialities: specialities.iter().map(|s| s.to_string()).collect(),
        rating: 4.2,
        doctor_count: 25,
        department_count: 6,
    }
}

pub(super) fn ids(hospitals: &[HospitalSummary]) -> Vec<String> {
    hospitals.iter().map(|h| h.id.0.clone()).collect()
}

/// Answers list requests immediately from a queue and records every scope.
#[derive(Default)]
pub(super) struct QueuedBackend {
    responses: Mutex<VecDeque<ListResult>>,
    requested: Mutex<Vec<Option<String>>>,
    details: Mutex<Vec<Hospital>>,
}

impl QueuedBackend {
    pub(super) fn respond(&self, result: ListResult) {
        self.responses
            .lock()
            .expect("responses mutex")
            .push_back(result);
    }

    pub(super) fn add_detail(&self, hospital: Hospital) {
        self.details.lock().expect("details mutex").push(hospital);
    }

    pub(super) fn requested(&self) -> Vec<Option<String>> {
        self.requested.lock().expect("requested mutex").clone()
    }
}

#[async_trait]
impl HospitalBackend for QueuedBackend {
    async fn list_hospitals(&self, city: Option<&str>) -> ListResult {
        self.requested
            .lock()
            .expect("requested mutex")
            .push(city.map(str::to_string));
        self.responses
            .lock()
            .expect("responses mutex")
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Transport("no scripted response".to_string())))
    }

    async fn fetch_hospital(&self, id: &HospitalId) -> Result<Hospital, BackendError> {
        self.details
            .lock()
            .expect("details mutex")
            .iter()
            .find(|hospital| &hospital.summary.id == id)
            .cloned()
            .ok_or(BackendError::Status {
                status: 404,
                message: "Hospital not found".to_string(),
            })
    }

    async fn upload_image(&self, _image: &ImageFile) -> Result<StoredImage, BackendError> {
        unreachable!("the directory never uploads")
    }

    async fn create_hospital(
        &self,
        _hospital: &NewHospital,
    ) -> Result<CreatedHospital, BackendError> {
        unreachable!("the directory never creates records")
    }
}

/// Holds every list request until the test releases its gate, so tests
/// control the order in which responses resolve.
pub(super) struct GatedBackend {
    issued: mpsc::UnboundedSender<Option<String>>,
    gates: Mutex<VecDeque<oneshot::Receiver<ListResult>>>,
}

impl GatedBackend {
    pub(super) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Option<String>>) {
        let (issued, issued_rx) = mpsc::unbounded_channel();
        let backend = Arc::new(Self {
            issued,
            gates: Mutex::new(VecDeque::new()),
        });
        (backend, issued_rx)
    }

    /// Gate for the next list request, in call order.
    pub(super) fn gate(&self) -> oneshot::Sender<ListResult> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().expect("gates mutex").push_back(rx);
        tx
    }
}

#[async_trait]
impl HospitalBackend for GatedBackend {
    async fn list_hospitals(&self, city: Option<&str>) -> ListResult {
        let gate = self.gates.lock().expect("gates mutex").pop_front();
        let _ = self.issued.send(city.map(str::to_string));
        match gate {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(BackendError::Transport("gate dropped".to_string()))),
            None => Err(BackendError::Transport("no gate registered".to_string())),
        }
    }

    async fn fetch_hospital(&self, _id: &HospitalId) -> Result<Hospital, BackendError> {
        unreachable!("gated backend only serves listings")
    }

    async fn upload_image(&self, _image: &ImageFile) -> Result<StoredImage, BackendError> {
        unreachable!("the directory never uploads")
    }

    async fn create_hospital(
        &self,
        _hospital: &NewHospital,
    ) -> Result<CreatedHospital, BackendError> {
        unreachable!("the directory never creates records")
    }
}
