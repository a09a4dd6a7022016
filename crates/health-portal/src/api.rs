//! Remote portal API
//!
//! [`PortalApi`] is the seam between the core and the backend. The
//! production implementation, [`HttpPortalApi`], speaks JSON over HTTPS with
//! `reqwest`; tests substitute an in-memory implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::PortalConfig;
use crate::error::{PortalError, Result};
use crate::profile::PatientProfile;

/// Which read endpoint a profile view loads from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileView {
    /// Read-only dashboard
    Home,
    /// Editable settings page
    Settings,
}

impl ProfileView {
    pub fn path(&self) -> &'static str {
        match self {
            ProfileView::Home => "/patient/home",
            ProfileView::Settings => "/patient/settings",
        }
    }
}

/// Body of `POST /patient/register`, in the API's field names
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub nic: String,
    pub password: String,
    pub phone_number: String,
    pub address: String,
    pub date_of_birth: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Error body the API sends with a failure status
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Operations the core needs from the backend.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// `POST /patient/register`
    async fn register(&self, request: &RegisterRequest) -> Result<()>;

    /// `GET /patient/home` or `GET /patient/settings`
    async fn fetch_profile(&self, view: ProfileView) -> Result<PatientProfile>;

    /// `PUT /patient/settings` with the full snapshot
    async fn update_settings(&self, profile: &PatientProfile) -> Result<()>;
}

/// `reqwest`-backed API client
#[derive(Debug, Clone)]
pub struct HttpPortalApi {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpPortalApi {
    pub fn new(cfg: &PortalConfig) -> Result<Self> {
        let base_url = cfg.api_base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PortalError::Config(config::ConfigError::Message(format!(
                "api_base_url must use http or https, got '{}'",
                base_url
            ))));
        }

        // the session rides on cookies set by the login page
        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = cfg.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(HttpPortalApi {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into [`PortalError::Rejected`], keeping the
    /// server's `message` when it sent one.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);
        warn!(status = status.as_u16(), ?message, "request rejected");

        Err(PortalError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    #[instrument(skip_all)]
    async fn register(&self, request: &RegisterRequest) -> Result<()> {
        debug!("submitting registration");
        let response = self
            .http_client
            .post(self.url("/patient/register"))
            .json(request)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        debug!(status = %response.status(), "registered");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_profile(&self, view: ProfileView) -> Result<PatientProfile> {
        debug!(path = view.path(), "fetching profile");
        let response = self.http_client.get(self.url(view.path())).send().await?;
        let response = Self::check_status(response).await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(PatientProfile::default());
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(PatientProfile::default());
        }
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip_all, fields(patient_id = %profile.patient_id))]
    async fn update_settings(&self, profile: &PatientProfile) -> Result<()> {
        debug!("saving settings");
        let response = self
            .http_client
            .put(self.url(ProfileView::Settings.path()))
            .json(profile)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }
}
