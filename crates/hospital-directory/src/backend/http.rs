use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{BackendError, HospitalBackend};
use crate::config::BackendConfig;
use crate::directory::domain::{Hospital, HospitalId, HospitalSummary};
use crate::submission::domain::{CreatedHospital, ImageFile, NewHospital, StoredImage};

/// Multipart field the upload endpoint reads the file from.
const IMAGE_FIELD: &str = "image";

/// Every collection and record response is wrapped as `{ "data": ... }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// reqwest-backed client for the hospital REST API.
#[derive(Debug, Clone)]
pub struct HttpHospitalBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpHospitalBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BackendError::Transport(format!(
                    "{} cannot be used as an API base URL",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl HospitalBackend for HttpHospitalBackend {
    async fn list_hospitals(
        &self,
        city: Option<&str>,
    ) -> Result<Vec<HospitalSummary>, BackendError> {
        let url = self.endpoint(&["hospitals"])?;
        let mut request = self.client.get(url);
        if let Some(city) = city {
            request = request.query(&[("city", city)]);
        }

        debug!(city = city.unwrap_or(""), "requesting hospital collection");
        let envelope: Envelope<Vec<HospitalSummary>> = decode(request.send().await?).await?;
        Ok(envelope.data)
    }

    async fn fetch_hospital(&self, id: &HospitalId) -> Result<Hospital, BackendError> {
        let url = self.endpoint(&["hospitals", id.0.as_str()])?;
        debug!(%id, "requesting hospital record");
        let envelope: Envelope<Hospital> = decode(self.client.get(url).send().await?).await?;
        Ok(envelope.data)
    }

    async fn upload_image(&self, image: &ImageFile) -> Result<StoredImage, BackendError> {
        let url = self.endpoint(&["upload"])?;
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        let form = Form::new().part(IMAGE_FIELD, part);

        debug!(
            file = %image.file_name,
            bytes = image.bytes.len(),
            "uploading hospital image"
        );
        decode(self.client.post(url).multipart(form).send().await?).await
    }

    async fn create_hospital(
        &self,
        hospital: &NewHospital,
    ) -> Result<CreatedHospital, BackendError> {
        let url = self.endpoint(&["hospitals", "create"])?;
        debug!(name = %hospital.name, image = %hospital.image, "creating hospital record");
        let envelope: Envelope<CreatedHospital> =
            decode(self.client.post(url).json(hospital).send().await?).await?;
        Ok(envelope.data)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| BackendError::Decode(err.to_string()))
}
