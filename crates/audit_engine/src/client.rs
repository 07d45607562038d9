use std::time::Duration;

use async_trait::async_trait;
use audit_core::{ReportData, ReportFormat, SubmittedFile, Tier};
use serde::Deserialize;

use crate::{JobHandle, ServiceError, StatusSnapshot};

/// Connection parameters for the analysis service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Request/response boundary of the remote analysis service. Stateless:
/// nothing here touches application state beyond the network call itself.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload a document for analysis at the given tier.
    async fn submit(&self, file: &SubmittedFile, tier: Tier) -> Result<JobHandle, ServiceError>;

    /// Ask the service where the job stands.
    async fn poll_status(&self, job_id: &str) -> Result<StatusSnapshot, ServiceError>;

    /// Render the report in the requested format and return the raw bytes.
    async fn fetch_rendered(
        &self,
        report: &ReportData,
        format: ReportFormat,
    ) -> Result<Vec<u8>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    result: Option<ReportData>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestAnalysisService {
    settings: ServiceSettings,
    client: reqwest::Client,
}

impl ReqwestAnalysisService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ServiceError::transport(err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl AnalysisService for ReqwestAnalysisService {
    async fn submit(&self, file: &SubmittedFile, tier: Tier) -> Result<JobHandle, ServiceError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.media_type)
            .map_err(|err| ServiceError::validation(err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload/"))
            .query(&[("analysis_level", tier.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_client_error() {
            let message = error_detail(response)
                .await
                .unwrap_or_else(|| "the service rejected the uploaded file".to_string());
            return Err(ServiceError::validation(message));
        }
        if !status.is_success() {
            return Err(ServiceError::transport(format!(
                "upload failed with status {status}"
            )));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|err| ServiceError::transport(format!("malformed upload response: {err}")))?;
        Ok(JobHandle {
            job_id: body.job_id,
        })
    }

    async fn poll_status(&self, job_id: &str) -> Result<StatusSnapshot, ServiceError> {
        let response = self
            .client
            .get(self.endpoint(&format!("analysis/{job_id}")))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = error_detail(response)
                .await
                .unwrap_or_else(|| format!("status poll failed with status {status}"));
            return Err(ServiceError::transport(message));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|err| ServiceError::transport(format!("malformed status response: {err}")))?;
        match body.status.as_str() {
            "PENDING" => Ok(StatusSnapshot::Pending),
            "STARTED" => Ok(StatusSnapshot::Running),
            "SUCCESS" => match body.result {
                Some(report) => Ok(StatusSnapshot::Succeeded(Box::new(report))),
                None => Err(ServiceError::transport(
                    "success status without a report payload".to_string(),
                )),
            },
            "FAILURE" => Ok(StatusSnapshot::Failed(
                body.error_message
                    .unwrap_or_else(|| "analysis failed".to_string()),
            )),
            other => Err(ServiceError::transport(format!(
                "unknown job status: {other}"
            ))),
        }
    }

    async fn fetch_rendered(
        &self,
        report: &ReportData,
        format: ReportFormat,
    ) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .client
            .post(self.endpoint(&format!("download-report/{}", format.as_str())))
            .json(report)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = error_detail(response)
                .await
                .unwrap_or_else(|| format!("report download failed with status {status}"));
            return Err(ServiceError::transport(message));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(bytes.to_vec())
    }
}

/// Pull the service's own message out of an error body. The wire uses both
/// `{"detail": "..."}` and `{"detail": {"message": "..."}}`.
async fn error_detail(response: reqwest::Response) -> Option<String> {
    let body: serde_json::Value = response.json().await.ok()?;
    match body.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Object(detail) => detail
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(ToOwned::to_owned),
        _ => None,
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        return ServiceError::transport(format!("request timed out: {err}"));
    }
    ServiceError::transport(err.to_string())
}
