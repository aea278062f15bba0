use serde::{Deserialize, Serialize};

use crate::directory::domain::{HospitalId, RecordKeys};

/// Specialities offered by the hospital creation form.
pub const SPECIALITY_OPTIONS: [&str; 15] = [
    "Cardiology",
    "Neurology",
    "Orthopedics",
    "Pediatrics",
    "Oncology",
    "Gynecology",
    "Dermatology",
    "Ophthalmology",
    "Psychiatry",
    "Urology",
    "Endocrinology",
    "Gastroenterology",
    "Pulmonology",
    "Nephrology",
    "Rheumatology",
];

/// Image selected locally and not yet uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Hospital as entered in the creation form, before validation.
///
/// Numeric fields hold raw form input and may be missing. The image stays
/// attached to the draft across failed attempts so a retry does not require
/// selecting it again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HospitalDraft {
    pub name: String,
    pub city: String,
    pub rating: Option<f64>,
    pub description: String,
    pub number_of_doctors: Option<i64>,
    pub number_of_departments: Option<i64>,
    pub image: Option<ImageFile>,
    selected_specialities: Vec<String>,
}

impl HospitalDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection in the order specialities were picked, without duplicates.
    pub fn selected_specialities(&self) -> &[String] {
        &self.selected_specialities
    }

    pub fn is_selected(&self, speciality: &str) -> bool {
        self.selected_specialities.iter().any(|s| s == speciality)
    }

    /// Adds the speciality unless it is already selected.
    pub fn select_speciality(&mut self, speciality: impl Into<String>) {
        let speciality = speciality.into();
        if !self.is_selected(&speciality) {
            self.selected_specialities.push(speciality);
        }
    }

    /// Flips the selection state and returns whether it is now selected.
    pub fn toggle_speciality(&mut self, speciality: &str) -> bool {
        if self.is_selected(speciality) {
            self.selected_specialities.retain(|s| s != speciality);
            false
        } else {
            self.selected_specialities.push(speciality.to_string());
            true
        }
    }

    pub fn attach_image(&mut self, image: ImageFile) {
        self.image = Some(image);
    }

    pub fn remove_image(&mut self) -> Option<ImageFile> {
        self.image.take()
    }
}

/// Draft fields after validation, still waiting for an uploaded image path.
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalFields {
    pub name: String,
    pub city: String,
    pub specialities: Vec<String>,
    pub rating: f64,
    pub description: String,
    pub number_of_doctors: u32,
    pub number_of_departments: u32,
}

impl HospitalFields {
    pub fn into_payload(self, image_path: impl Into<String>) -> NewHospital {
        NewHospital {
            name: self.name,
            city: self.city,
            specialities: self.specialities,
            rating: self.rating,
            description: self.description,
            number_of_doctors: self.number_of_doctors,
            number_of_departments: self.number_of_departments,
            image: image_path.into(),
        }
    }
}

/// Body of `POST /hospitals/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHospital {
    pub name: String,
    pub city: String,
    #[serde(rename = "speciality")]
    pub specialities: Vec<String>,
    pub rating: f64,
    pub description: String,
    #[serde(rename = "numberOfDoctors")]
    pub number_of_doctors: u32,
    #[serde(rename = "numberOfDepartments")]
    pub number_of_departments: u32,
    pub image: String,
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    #[serde(rename = "filePath")]
    pub file_path: String,
}

/// The part of the create response the workflow relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordKeys")]
pub struct CreatedHospital {
    #[serde(rename = "_id")]
    pub id: HospitalId,
}

impl TryFrom<RecordKeys> for CreatedHospital {
    type Error = &'static str;

    fn try_from(keys: RecordKeys) -> Result<Self, Self::Error> {
        Ok(Self {
            id: keys.into_id()?,
        })
    }
}
