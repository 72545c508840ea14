//! DigitalOcean API v2 implementation of the snapshot service: droplet
//! snapshots are created through the droplet actions endpoint, listed per
//! droplet, and deleted through the account-wide snapshots endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

use super::traits::{Snapshot, SnapshotId, SnapshotService};

const DEFAULT_BASE_URL: &str = "https://api.digitalocean.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY_CHARS: usize = 200;

pub struct DigitalOceanClient {
    /// Pre-computed auth header value: `Bearer <token>`.
    cached_auth: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ActionRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ActionEnvelope {
    action: Action,
}

#[derive(Debug, Deserialize)]
struct Action {
    id: RawId,
}

#[derive(Debug, Deserialize)]
struct SnapshotPage {
    #[serde(default)]
    snapshots: Vec<SnapshotRecord>,
}

#[derive(Debug, Deserialize)]
struct SnapshotRecord {
    id: RawId,
    name: String,
}

/// Droplet snapshot and action ids arrive as numbers, volume snapshot ids as
/// strings; both collapse to the opaque string form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl From<RawId> for SnapshotId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => SnapshotId::new(n.to_string()),
            RawId::Text(s) => SnapshotId::new(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: String,
}

impl DigitalOceanClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(token, None)
    }

    /// Point the client at a different endpoint (mock servers, proxies).
    pub fn with_base_url(token: &str, base_url: Option<&str>) -> Self {
        let base_url = base_url
            .map_or(DEFAULT_BASE_URL, |u| u.trim_end_matches('/'))
            .to_string();
        Self {
            cached_auth: format!("Bearer {}", token.trim()),
            base_url,
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl SnapshotService for DigitalOceanClient {
    async fn create_snapshot(
        &self,
        resource_id: &str,
        name: &str,
    ) -> Result<SnapshotId, ServiceError> {
        let url = format!("{}/v2/droplets/{resource_id}/actions", self.base_url);
        let request = ActionRequest {
            kind: "snapshot",
            name,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.cached_auth)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;

        let envelope: ActionEnvelope = response.json().await.map_err(transport_error)?;
        Ok(envelope.action.id.into())
    }

    async fn list_snapshots(
        &self,
        resource_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Snapshot>, ServiceError> {
        let url = format!("{}/v2/droplets/{resource_id}/snapshots", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("page", page), ("per_page", per_page)])
            .header("Authorization", &self.cached_auth)
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;

        let listing: SnapshotPage = response.json().await.map_err(transport_error)?;
        Ok(listing
            .snapshots
            .into_iter()
            .map(|record| Snapshot {
                id: record.id.into(),
                name: record.name,
            })
            .collect())
    }

    async fn delete_snapshot(&self, id: &SnapshotId) -> Result<(), ServiceError> {
        let url = format!("{}/v2/snapshots/{id}", self.base_url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", &self.cached_auth)
            .send()
            .await
            .map_err(transport_error)?;
        error_for_status(response).await?;

        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_decode() {
        ServiceError::Decode(err.to_string())
    } else {
        ServiceError::Transport(err.to_string())
    }
}

/// Passes successful responses through; turns anything else into
/// [`ServiceError::Api`], preferring the service's own `message` field over
/// raw body text.
async fn error_for_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

fn api_error(status: StatusCode, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            let mut raw: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
            if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
                raw.push_str("...");
            }
            raw
        });
    ServiceError::Api {
        status: status.as_u16(),
        message,
    }
}
