use std::fmt;

use serde::Serialize;

use super::domain::{HospitalDraft, HospitalFields, ImageFile};
use crate::config::SubmissionConfig;

const MIN_RATING: f64 = 1.0;
const MAX_RATING: f64 = 5.0;

/// Form fields a validation error can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    Name,
    City,
    Rating,
    Description,
    NumberOfDoctors,
    NumberOfDepartments,
    Speciality,
    Image,
}

impl DraftField {
    pub const fn label(self) -> &'static str {
        match self {
            DraftField::Name => "name",
            DraftField::City => "city",
            DraftField::Rating => "rating",
            DraftField::Description => "description",
            DraftField::NumberOfDoctors => "numberOfDoctors",
            DraftField::NumberOfDepartments => "numberOfDepartments",
            DraftField::Speciality => "speciality",
            DraftField::Image => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: DraftField,
    pub message: String,
}

/// Every field-level problem found in a draft. Never empty when returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("hospital draft is invalid: {}", summarize(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: DraftField, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn for_field(&self, field: DraftField) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.field == field)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.field.label(), error.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Draft that passed every local check, borrowing the image still held by the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft<'a> {
    pub fields: HospitalFields,
    pub image: &'a ImageFile,
}

/// Local rules applied before any remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub max_image_bytes: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self::from(&SubmissionConfig::default())
    }
}

impl From<&SubmissionConfig> for ValidationRules {
    fn from(config: &SubmissionConfig) -> Self {
        Self {
            max_image_bytes: config.max_image_bytes,
        }
    }
}

impl ValidationRules {
    pub fn validate<'a>(
        &self,
        draft: &'a HospitalDraft,
    ) -> Result<ValidatedDraft<'a>, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let fields = check_fields(draft, &mut errors);
        let image = self.check_image(draft.image.as_ref(), &mut errors);

        match image {
            Some(image) if errors.is_empty() => Ok(ValidatedDraft { fields, image }),
            _ => Err(errors),
        }
    }

    /// Checks every field except the image, for drafts whose image is
    /// already stored on the backend.
    pub fn validate_fields(&self, draft: &HospitalDraft) -> Result<HospitalFields, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let fields = check_fields(draft, &mut errors);
        if errors.is_empty() {
            Ok(fields)
        } else {
            Err(errors)
        }
    }

    fn check_image<'a>(
        &self,
        image: Option<&'a ImageFile>,
        errors: &mut ValidationErrors,
    ) -> Option<&'a ImageFile> {
        let Some(image) = image else {
            errors.push(DraftField::Image, "Please upload a hospital image");
            return None;
        };

        if image.is_empty() {
            errors.push(DraftField::Image, "Image file is empty");
        } else if image.len() > self.max_image_bytes {
            errors.push(
                DraftField::Image,
                format!("Image exceeds the {} limit", HumanBytes(self.max_image_bytes)),
            );
        }

        let is_image = image
            .content_type
            .parse::<mime::Mime>()
            .map(|parsed| parsed.type_() == mime::IMAGE)
            .unwrap_or(false);
        if !is_image {
            errors.push(DraftField::Image, "File must be an image");
        }

        Some(image)
    }
}

fn check_fields(draft: &HospitalDraft, errors: &mut ValidationErrors) -> HospitalFields {
    let name = required_text(&draft.name, DraftField::Name, "Hospital name is required", errors);
    let city = required_text(&draft.city, DraftField::City, "City is required", errors);

    let rating = match draft.rating {
        Some(rating) if rating.is_finite() => {
            if rating < MIN_RATING {
                errors.push(DraftField::Rating, "Rating must be at least 1");
            } else if rating > MAX_RATING {
                errors.push(DraftField::Rating, "Rating cannot exceed 5");
            }
            rating
        }
        _ => {
            errors.push(DraftField::Rating, "Rating is required");
            0.0
        }
    };

    let description = required_text(
        &draft.description,
        DraftField::Description,
        "Description is required",
        errors,
    );

    let number_of_doctors = count(
        draft.number_of_doctors,
        DraftField::NumberOfDoctors,
        "Number of doctors is required",
        errors,
    );
    let number_of_departments = count(
        draft.number_of_departments,
        DraftField::NumberOfDepartments,
        "Number of departments is required",
        errors,
    );

    if draft.selected_specialities().is_empty() {
        errors.push(DraftField::Speciality, "Please select at least one speciality");
    }

    HospitalFields {
        name,
        city,
        specialities: draft.selected_specialities().to_vec(),
        rating,
        description,
        number_of_doctors,
        number_of_departments,
    }
}

fn required_text(
    value: &str,
    field: DraftField,
    message: &str,
    errors: &mut ValidationErrors,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, message);
    }
    trimmed.to_string()
}

fn count(
    value: Option<i64>,
    field: DraftField,
    missing: &str,
    errors: &mut ValidationErrors,
) -> u32 {
    match value {
        None => {
            errors.push(field, missing);
            0
        }
        Some(value) if value < 0 => {
            errors.push(field, "Cannot be negative");
            0
        }
        Some(value) => u32::try_from(value).unwrap_or_else(|_| {
            errors.push(field, "Number is too large");
            0
        }),
    }
}

struct HumanBytes(usize);

impl fmt::Display for HumanBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MIB: usize = 1024 * 1024;
        const KIB: usize = 1024;
        if self.0 >= MIB && self.0 % MIB == 0 {
            write!(f, "{}MB", self.0 / MIB)
        } else if self.0 >= KIB && self.0 % KIB == 0 {
            write!(f, "{}KB", self.0 / KIB)
        } else {
            write!(f, "{} bytes", self.0)
        }
    }
}
