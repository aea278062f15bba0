use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{Hospital, HospitalId, HospitalSummary};
use super::filter::filter_by_speciality;
use crate::backend::{BackendError, HospitalBackend};

/// Result of a remote fetch as seen by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The response was the latest issued and now backs the directory.
    Applied { hospitals: usize },
    /// A newer request was issued meanwhile; this response was discarded.
    Superseded,
}

/// Everything the listing view renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectorySnapshot {
    pub authoritative: Vec<HospitalSummary>,
    pub visible: Vec<HospitalSummary>,
    pub city_query: String,
    pub speciality_query: String,
    pub is_loading: bool,
}

#[derive(Debug, Default)]
struct DirectoryState {
    snapshot: DirectorySnapshot,
    /// Sequence number of the most recently issued fetch.
    latest_request: u64,
    /// City scope of the fetch that produced the authoritative set.
    applied_city: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to fetch hospitals: {source}")]
    Fetch {
        city: Option<String>,
        source: BackendError,
    },
    #[error("failed to fetch hospital {id}: {source}")]
    Detail { id: HospitalId, source: BackendError },
}

impl DirectoryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DirectoryError::Fetch { city: None, .. } => "Failed to fetch hospitals",
            DirectoryError::Fetch { city: Some(_), .. } => "Failed to search hospitals",
            DirectoryError::Detail { .. } => "Failed to fetch hospital details",
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            DirectoryError::Fetch { source, .. } | DirectoryError::Detail { source, .. } => {
                source.is_timeout()
            }
        }
    }
}

/// Hospital listing state with a two-tier filter: the city filter is
/// resolved by the backend and replaces the fetched set, the speciality
/// filter narrows the fetched set locally.
///
/// Fetches are sequenced; only the response to the most recently issued
/// request is ever applied.
pub struct DirectoryQueryEngine<B> {
    backend: Arc<B>,
    state: Mutex<DirectoryState>,
}

impl<B> DirectoryQueryEngine<B>
where
    B: HospitalBackend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: Mutex::new(DirectoryState::default()),
        }
    }

    /// Fetches the whole collection with no filter parameters.
    pub async fn load_all(&self) -> Result<QueryOutcome, DirectoryError> {
        self.fetch(None).await
    }

    /// Fetches the collection scoped to `city`. An empty city means no scope.
    pub async fn search_by_city(&self, city: &str) -> Result<QueryOutcome, DirectoryError> {
        let scope = (!city.is_empty()).then(|| city.to_string());
        self.fetch(scope).await
    }

    /// Narrows the visible set to hospitals offering `query`. Never calls the
    /// backend and never touches the fetched set. Returns the visible count.
    pub fn apply_speciality_filter(&self, query: &str) -> usize {
        let mut state = self.lock();
        let snapshot = &mut state.snapshot;
        snapshot.speciality_query = query.to_string();
        snapshot.visible = filter_by_speciality(&snapshot.authoritative, query);
        snapshot.visible.len()
    }

    /// Clears both filter inputs and shows the whole fetched set again.
    pub fn reset(&self) {
        let mut state = self.lock();
        let snapshot = &mut state.snapshot;
        snapshot.city_query.clear();
        snapshot.speciality_query.clear();
        snapshot.visible = snapshot.authoritative.clone();
    }

    /// Looks up a single hospital without touching the listing state.
    pub async fn hospital(&self, id: &HospitalId) -> Result<Hospital, DirectoryError> {
        self.backend
            .fetch_hospital(id)
            .await
            .map_err(|source| DirectoryError::Detail {
                id: id.clone(),
                source,
            })
    }

    pub fn snapshot(&self) -> DirectorySnapshot {
        self.lock().snapshot.clone()
    }

    pub fn authoritative_set(&self) -> Vec<HospitalSummary> {
        self.lock().snapshot.authoritative.clone()
    }

    pub fn visible_set(&self) -> Vec<HospitalSummary> {
        self.lock().snapshot.visible.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().snapshot.is_loading
    }

    async fn fetch(&self, city: Option<String>) -> Result<QueryOutcome, DirectoryError> {
        let request = {
            let mut state = self.lock();
            state.latest_request += 1;
            state.snapshot.is_loading = true;
            state.snapshot.city_query = city.clone().unwrap_or_default();
            state.latest_request
        };
        let _pending = PendingFetch {
            state: &self.state,
            request,
        };

        debug!(request, city = city.as_deref().unwrap_or(""), "fetching hospitals");
        let result = self.backend.list_hospitals(city.as_deref()).await;
        self.settle(request, city, result)
    }

    fn settle(
        &self,
        request: u64,
        city: Option<String>,
        result: Result<Vec<HospitalSummary>, BackendError>,
    ) -> Result<QueryOutcome, DirectoryError> {
        let mut state = self.lock();
        if state.latest_request != request {
            debug!(
                request,
                latest = state.latest_request,
                "discarding response to superseded request"
            );
            return Ok(QueryOutcome::Superseded);
        }

        state.snapshot.is_loading = false;
        match result {
            Ok(hospitals) => {
                state.applied_city = state.snapshot.city_query.clone();
                let snapshot = &mut state.snapshot;
                snapshot.speciality_query.clear();
                snapshot.visible = hospitals.clone();
                snapshot.authoritative = hospitals;
                info!(
                    request,
                    city = city.as_deref().unwrap_or(""),
                    hospitals = snapshot.authoritative.len(),
                    "hospital directory refreshed"
                );
                Ok(QueryOutcome::Applied {
                    hospitals: snapshot.authoritative.len(),
                })
            }
            Err(source) => {
                warn!(request, error = %source, "hospital fetch failed");
                state.snapshot.city_query = state.applied_city.clone();
                Err(DirectoryError::Fetch { city, source })
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, DirectoryState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<DirectoryState>) -> MutexGuard<'_, DirectoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Undoes an unsettled fetch that is dropped while it is still the latest
/// request: loading stops and the city query reverts to the one the sets
/// reflect.
struct PendingFetch<'a> {
    state: &'a Mutex<DirectoryState>,
    request: u64,
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        let mut state = lock_state(self.state);
        if state.latest_request == self.request && state.snapshot.is_loading {
            state.snapshot.is_loading = false;
            state.snapshot.city_query = state.applied_city.clone();
        }
    }
}
