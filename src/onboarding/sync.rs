//! Progress sync client — the backend's profile-update and
//! description-generation endpoints.
//!
//! Two call disciplines, kept as distinct signatures:
//! - awaited: [`ProgressSync::save_progress`] returns a result the caller
//!   must handle;
//! - fire-and-forget / best-effort: [`ProgressSync::request_description_generation`]
//!   and [`ProgressSync::save_progress_best_effort`] return nothing; failures
//!   are logged and dropped after one attempt. [`ProgressSync::flush`]
//!   waits for the ones still on the wire.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{ConfigError, SyncError};

use super::answers::AnswerSet;
use super::state::SaveMarker;

const GENERATE_DESCRIPTION_PATH: &str = "/api/generate-description";
const UPDATE_PROFILE_PATH: &str = "/api/update-profile";

/// Host-issued identity token. Never printed.
#[derive(Debug, Clone)]
pub struct IdentityToken(SecretString);

impl IdentityToken {
    /// Wrap a raw token. Blank tokens count as absent.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(SecretString::from(raw)))
    }

    fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Successful description-generation response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedDescription {
    pub description: String,
}

#[derive(Debug, Serialize)]
struct UpdateProfileBody {
    step: SaveMarker,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Backend operations used by the wizard controller.
///
/// Every operation takes an [`IdentityToken`]; callers resolve the token
/// first and report `Unauthenticated` without dispatching anything when the
/// host has none.
#[async_trait]
pub trait ProgressSync: Send + Sync {
    /// Fire-and-forget: dispatch description generation for the profile
    /// answers. The outcome never reaches the caller.
    fn request_description_generation(&self, token: &IdentityToken, answers: &AnswerSet);

    /// Awaited save. The caller decides what a failure means.
    async fn save_progress(
        &self,
        token: &IdentityToken,
        marker: SaveMarker,
    ) -> Result<(), SyncError>;

    /// Best-effort save: one attempt, failures swallowed, never retried.
    fn save_progress_best_effort(&self, token: &IdentityToken, marker: SaveMarker);

    /// Wait for fire-and-forget and best-effort sends already dispatched.
    /// Implementations that send inline have nothing to wait for.
    async fn flush(&self) {}
}

/// reqwest-backed [`ProgressSync`].
///
/// The fire-and-forget operations spawn onto the ambient tokio runtime and
/// are tracked until [`ProgressSync::flush`]. Outside a runtime they are
/// logged and dropped.
#[derive(Debug, Clone)]
pub struct HttpProgressSync {
    client: reqwest::Client,
    base_url: String,
    background: TaskTracker,
}

impl HttpProgressSync {
    pub fn new(config: &SyncConfig) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            background: TaskTracker::new(),
        })
    }

    /// Number of background sends not yet finished.
    pub fn pending(&self) -> usize {
        self.background.len()
    }

    fn spawn_background<F>(&self, what: &'static str, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(handle) => {
                self.background.spawn_on(task, &handle);
            }
            Err(_) => error!(what, "No async runtime, background send dropped"),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Awaited description generation, surfacing the terminal result.
    pub async fn generate_description(
        &self,
        token: &IdentityToken,
        answers: &AnswerSet,
    ) -> Result<GeneratedDescription, SyncError> {
        let resp = self
            .post(GENERATE_DESCRIPTION_PATH, token, &answers.to_payload())
            .await?;
        let status = resp.status().as_u16();
        resp.json::<GeneratedDescription>()
            .await
            .map_err(|e| {
                warn!(status, error = %e, "Undecodable description response");
                SyncError::ServerUnavailable { status }
            })
    }

    async fn update_profile(
        &self,
        token: &IdentityToken,
        marker: SaveMarker,
    ) -> Result<(), SyncError> {
        self.post(UPDATE_PROFILE_PATH, token, &UpdateProfileBody { step: marker })
            .await?;
        Ok(())
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: &IdentityToken,
        body: &B,
    ) -> Result<reqwest::Response, SyncError> {
        let resp = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(token.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::NetworkFailure(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        Err(decode_failure(status.as_u16(), &text))
    }
}

/// Map a non-2xx response body onto the failure taxonomy.
fn decode_failure(status: u16, body: &str) -> SyncError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => SyncError::ServerRejected { status, detail },
        Ok(ErrorBody {
            detail: serde_json::Value::Null,
        })
        | Err(_) => SyncError::ServerUnavailable { status },
        // FastAPI validation errors carry a list of problems
        Ok(ErrorBody { detail }) => SyncError::ServerRejected {
            status,
            detail: detail.to_string(),
        },
    }
}

#[async_trait]
impl ProgressSync for HttpProgressSync {
    fn request_description_generation(&self, token: &IdentityToken, answers: &AnswerSet) {
        let this = self.clone();
        let token = token.clone();
        let answers = answers.clone();
        self.spawn_background("generate_description", async move {
            match this.generate_description(&token, &answers).await {
                Ok(generated) => debug!(
                    chars = generated.description.chars().count(),
                    "Description generated"
                ),
                Err(e) => warn!(error = %e, "Description generation failed"),
            }
        });
    }

    async fn save_progress(
        &self,
        token: &IdentityToken,
        marker: SaveMarker,
    ) -> Result<(), SyncError> {
        self.update_profile(token, marker).await?;
        info!(marker = %marker, "Progress saved");
        Ok(())
    }

    fn save_progress_best_effort(&self, token: &IdentityToken, marker: SaveMarker) {
        let this = self.clone();
        let token = token.clone();
        self.spawn_background("update_profile", async move {
            match this.update_profile(&token, marker).await {
                Ok(()) => debug!(marker = %marker, "Best-effort save delivered"),
                Err(e) => warn!(marker = %marker, error = %e, "Best-effort save dropped"),
            }
        });
    }

    async fn flush(&self) {
        let pending = self.background.len();
        if pending == 0 {
            return;
        }
        debug!(pending, "Waiting for background sends");
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }
}
