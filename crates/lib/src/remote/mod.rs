//! Remote backend client.
//!
//! All backend communication goes through [`RemoteClient`]: a reqwest client
//! with a cookie store (the backend authenticates via session cookies), a
//! base URL, and a bounded per-request timeout so a degraded mobile link can
//! never stall a caller indefinitely. On timeout an operation resolves to
//! its failure value; there is no caller-initiated cancellation, a retried
//! action simply starts a new call.

pub mod errors;

pub use errors::RemoteError;

use std::{sync::RwLock, time::Duration};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    Result,
    model::{ContentSnapshot, Course, Department, PremiumUser, SyncInfo, Topic},
};

const LOGIN_PATH: &str = "auth/login/";
const LOGOUT_PATH: &str = "auth/logout/";
const ME_PATH: &str = "auth/me/";
const BULK_DOWNLOAD_PATH: &str = "api/admin/bulk-download/";
const UPLOAD_USERS_PATH: &str = "admin/upload-users/";

/// Response to `POST /auth/login/`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response to `GET /auth/me/`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub authenticated: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub is_admin: bool,
}

/// Response to `GET /api/admin/bulk-download/`: the whole content snapshot
/// in one payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDownload {
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub premium_users: Vec<PremiumUser>,
    pub sync_timestamp: String,
    #[serde(default)]
    pub total_topics: u64,
    #[serde(default)]
    pub total_users: u64,
}

impl BulkDownload {
    /// Repackage the wire payload as the locally stored snapshot.
    pub fn into_snapshot(self) -> ContentSnapshot {
        ContentSnapshot {
            departments: self.departments,
            courses: self.courses,
            topics: self.topics,
            premium_users: self.premium_users,
            sync_info: Some(SyncInfo {
                timestamp: self.sync_timestamp,
                total_topics: self.total_topics,
                total_users: self.total_users,
            }),
        }
    }
}

/// One registration as sent to `POST /admin/upload-users/`.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationPayload {
    pub name: String,
    pub code: String,
    pub department_id: Option<u64>,
}

/// Response to `POST /admin/upload-users/`. Per-record validation errors
/// come back as messages and do not abort the rest of the batch.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub duplicates: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct UploadBody<'a> {
    users: &'a [RegistrationPayload],
}

/// HTTP client for the remote backend.
#[derive(Debug)]
pub struct RemoteClient {
    http: RwLock<reqwest::Client>,
    base: Url,
    timeout: Duration,
}

impl RemoteClient {
    /// Build a client for the given backend base URL with the given bounded
    /// per-request timeout.
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        let mut base = base;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            http: RwLock::new(Self::build_http(timeout)?),
            base,
            timeout,
        })
    }

    fn build_http(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RemoteError::ClientBuild {
                    reason: e.to_string(),
                }
                .into()
            })
    }

    /// Drop any ambient credentials (session cookies) by rebuilding the
    /// underlying client with a fresh cookie store.
    pub fn reset_credentials(&self) -> Result<()> {
        let fresh = Self::build_http(self.timeout)?;
        *self.http.write().unwrap() = fresh;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| {
            RemoteError::InvalidResponse {
                endpoint: path.to_string(),
                reason: format!("invalid endpoint URL: {e}"),
            }
            .into()
        })
    }

    fn map_send_error(&self, endpoint: &Url, e: reqwest::Error) -> crate::Error {
        if e.is_timeout() {
            RemoteError::Timeout {
                endpoint: endpoint.to_string(),
                seconds: self.timeout.as_secs(),
            }
            .into()
        } else {
            RemoteError::Network {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
            .into()
        }
    }

    /// Shared response handling: authorization rejections become
    /// `Unauthorized`, other non-2xx responses become `Rejected` carrying
    /// the backend's message when one was present.
    async fn decode_response<R: DeserializeOwned>(
        endpoint: &Url,
        response: reqwest::Response,
    ) -> Result<R> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(RemoteError::Unauthorized.into());
        }
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or_else(|| format!("backend returned {status}"));
            return Err(RemoteError::Rejected { message }.into());
        }
        response.json::<R>().await.map_err(|e| {
            RemoteError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let endpoint = self.endpoint(path)?;
        let request = self.http.read().unwrap().get(endpoint.clone());
        let response = request
            .send()
            .await
            .map_err(|e| self.map_send_error(&endpoint, e))?;
        Self::decode_response(&endpoint, response).await
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let endpoint = self.endpoint(path)?;
        let request = self.http.read().unwrap().post(endpoint.clone()).json(body);
        let response = request
            .send()
            .await
            .map_err(|e| self.map_send_error(&endpoint, e))?;
        Self::decode_response(&endpoint, response).await
    }

    /// `POST /auth/login/`.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        self.post_json(LOGIN_PATH, &LoginBody { username, password })
            .await
    }

    /// `POST /auth/logout/`. The response body is ignored.
    pub async fn logout(&self) -> Result<()> {
        let endpoint = self.endpoint(LOGOUT_PATH)?;
        let request = self.http.read().unwrap().post(endpoint.clone());
        let response = request
            .send()
            .await
            .map_err(|e| self.map_send_error(&endpoint, e))?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(RemoteError::Unauthorized.into());
        }
        Ok(())
    }

    /// `GET /auth/me/`.
    pub async fn me(&self) -> Result<MeResponse> {
        self.get_json(ME_PATH).await
    }

    /// `GET /api/admin/bulk-download/`.
    pub async fn bulk_download(&self) -> Result<BulkDownload> {
        self.get_json(BULK_DOWNLOAD_PATH).await
    }

    /// `POST /admin/upload-users/` with all pending registrations in one
    /// bulk call.
    pub async fn upload_users(&self, users: &[RegistrationPayload]) -> Result<UploadResponse> {
        self.post_json(UPLOAD_USERS_PATH, &UploadBody { users })
            .await
    }
}
