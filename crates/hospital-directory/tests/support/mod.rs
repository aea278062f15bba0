//! In-process stand-in for the hospital REST API.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hospital_directory::backend::HttpHospitalBackend;
use hospital_directory::config::BackendConfig;
use serde_json::{json, Value};
use url::Url;

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct Recorded {
    pub city_queries: Mutex<Vec<Option<String>>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub creates: Mutex<Vec<Value>>,
    hospitals: Mutex<Vec<Value>>,
}

impl Recorded {
    pub fn created(&self) -> Vec<Value> {
        self.creates.lock().expect("creates mutex").clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().expect("uploads mutex").clone()
    }

    pub fn city_queries(&self) -> Vec<Option<String>> {
        self.city_queries.lock().expect("queries mutex").clone()
    }
}

pub struct StubApi {
    pub addr: SocketAddr,
    pub recorded: Arc<Recorded>,
}

impl StubApi {
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/v1", self.addr)).expect("stub url parses")
    }

    pub fn backend(&self) -> HttpHospitalBackend {
        self.backend_with_timeout(Duration::from_secs(5))
    }

    pub fn backend_with_timeout(&self, timeout: Duration) -> HttpHospitalBackend {
        let mut config = BackendConfig::new(self.base_url());
        config.timeout = timeout;
        HttpHospitalBackend::new(config).expect("client builds")
    }
}

pub fn seeded_hospitals() -> Vec<Value> {
    vec![
        json!({
            "_id": "h1",
            "name": "St. Mary",
            "city": "Springfield",
            "image": "/uploads/st-mary.png",
            "speciality": ["Cardiology", "Neurology"],
            "rating": 4.5,
            "numberOfDoctors": 12,
            "numberOfDepartments": 5,
            "description": "Teaching hospital",
            "createdAt": "2024-03-01T09:30:00Z"
        }),
        json!({
            "_id": "h2",
            "name": "Shelbyville General",
            "city": "Shelbyville",
            "image": "https://cdn.example.com/general.jpg",
            "speciality": ["Oncology"],
            "rating": 3.9,
            "numberOfDoctors": 40,
            "numberOfDepartments": 11
        }),
    ]
}

pub async fn spawn_stub() -> StubApi {
    let recorded = Arc::new(Recorded::default());
    *recorded.hospitals.lock().expect("hospitals mutex") = seeded_hospitals();

    let app = Router::new()
        .route("/api/v1/hospitals", get(list_hospitals))
        .route("/api/v1/hospitals/create", post(create_hospital))
        .route("/api/v1/hospitals/:id", get(fetch_hospital))
        .route("/api/v1/upload", post(upload_image))
        .with_state(Arc::clone(&recorded));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub binds");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub serves");
    });

    StubApi { addr, recorded }
}

async fn list_hospitals(
    State(recorded): State<Arc<Recorded>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let city = params.get("city").cloned();
    recorded
        .city_queries
        .lock()
        .expect("queries mutex")
        .push(city.clone());

    match city.as_deref() {
        Some("Slowville") => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "data": [] })).into_response()
        }
        Some("Garbled") => (
            [(header::CONTENT_TYPE, "application/json")],
            "<html>not json</html>",
        )
            .into_response(),
        _ => {
            let hospitals = recorded.hospitals.lock().expect("hospitals mutex").clone();
            let data: Vec<Value> = hospitals
                .into_iter()
                .filter(|hospital| match &city {
                    Some(city) => hospital["city"]
                        .as_str()
                        .is_some_and(|c| c.eq_ignore_ascii_case(city)),
                    None => true,
                })
                .collect();
            Json(json!({ "data": data })).into_response()
        }
    }
}

async fn fetch_hospital(
    State(recorded): State<Arc<Recorded>>,
    Path(id): Path<String>,
) -> Response {
    let hospitals = recorded.hospitals.lock().expect("hospitals mutex").clone();
    match hospitals.into_iter().find(|h| h["_id"] == id.as_str()) {
        Some(hospital) => Json(json!({ "data": hospital })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Hospital not found" })),
        )
            .into_response(),
    }
}

async fn upload_image(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let mut uploads = recorded.uploads.lock().expect("uploads mutex");
    uploads.push(RecordedUpload {
        content_type,
        body: body.to_vec(),
    });
    let path = format!("/uploads/hospital-{}.png", uploads.len());
    Json(json!({ "filePath": path })).into_response()
}

async fn create_hospital(
    State(recorded): State<Arc<Recorded>>,
    Json(payload): Json<Value>,
) -> Response {
    recorded
        .creates
        .lock()
        .expect("creates mutex")
        .push(payload.clone());

    if payload["name"] == "Broken Hospital" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "database unavailable" })),
        )
            .into_response();
    }

    let mut hospitals = recorded.hospitals.lock().expect("hospitals mutex");
    let mut record = payload;
    record["_id"] = json!(format!("new-{}", hospitals.len() + 1));
    hospitals.push(record.clone());
    Json(json!({ "data": record })).into_response()
}
