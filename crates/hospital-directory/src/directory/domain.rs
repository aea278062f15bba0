use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned hospital identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HospitalId(pub String);

impl fmt::Display for HospitalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HospitalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Image location exactly as the backend reported it.
///
/// Either an absolute URL or a path relative to the backend origin. The raw
/// value is never rewritten; callers decide how to render it through
/// [`ImageRef::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn is_absolute(&self) -> bool {
        let lower = self.0.trim_start().to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Renderable URL: absolute references pass through, relative ones are
    /// prefixed with `origin` (scheme, host and port of the backend).
    pub fn resolve(&self, origin: &str) -> String {
        if self.is_absolute() {
            return self.0.clone();
        }

        let origin = origin.trim_end_matches('/');
        if self.0.starts_with('/') {
            format!("{origin}{}", self.0)
        } else {
            format!("{origin}/{}", self.0)
        }
    }
}

/// Identifier keys a backend record may carry. Mongo-style backends send
/// `_id` and may mirror it as an `id` virtual; `_id` wins when both exist.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecordKeys {
    #[serde(rename = "_id", default)]
    mongo_id: Option<HospitalId>,
    #[serde(default)]
    id: Option<HospitalId>,
}

impl RecordKeys {
    pub(crate) fn into_id(self) -> Result<HospitalId, &'static str> {
        self.mongo_id
            .or(self.id)
            .ok_or("record has neither `_id` nor `id`")
    }
}

/// Listing entry returned by `GET /hospitals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSummary")]
pub struct HospitalSummary {
    #[serde(rename = "_id")]
    pub id: HospitalId,
    pub name: String,
    pub city: String,
    #[serde(rename = "image")]
    pub image_ref: ImageRef,
    #[serde(rename = "speciality", default)]
    pub specialities: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(rename = "numberOfDoctors", default)]
    pub doctor_count: u32,
    #[serde(rename = "numberOfDepartments", default)]
    pub department_count: u32,
}

#[derive(Deserialize)]
struct RawSummary {
    #[serde(flatten)]
    keys: RecordKeys,
    name: String,
    city: String,
    image: ImageRef,
    #[serde(default)]
    speciality: Vec<String>,
    #[serde(default)]
    rating: f64,
    #[serde(rename = "numberOfDoctors", default)]
    number_of_doctors: u32,
    #[serde(rename = "numberOfDepartments", default)]
    number_of_departments: u32,
}

impl TryFrom<RawSummary> for HospitalSummary {
    type Error = &'static str;

    fn try_from(raw: RawSummary) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.keys.into_id()?,
            name: raw.name,
            city: raw.city,
            image_ref: raw.image,
            specialities: raw.speciality,
            rating: raw.rating,
            doctor_count: raw.number_of_doctors,
            department_count: raw.number_of_departments,
        })
    }
}

impl HospitalSummary {
    /// True when any speciality contains `needle`, ignoring case.
    pub fn offers_speciality(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.specialities
            .iter()
            .any(|speciality| speciality.to_lowercase().contains(&needle))
    }
}

/// Full record returned by `GET /hospitals/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    #[serde(flatten)]
    pub summary: HospitalSummary,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}
