//! HTTP client for the feedback backend.
//!
//! Reads (`GET /spikes`, `/spikes/:id`, `/prospects`) carry the token as a
//! `?token=` query parameter; share management uses it as a bearer token.
//! Non-2xx responses are mapped onto [`BackendError`] from their status and
//! the `{error, code}` body the backend sends.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::log_debug;
use crate::models::{Rating, Spike};

const ENABLE_LOGS: bool = true;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("request rejected: {0}")]
    Malformed(String),

    #[error("unauthorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("quota exceeded (HTTP {status}, {code})")]
    QuotaExceeded { status: u16, code: String },

    #[error("not found")]
    NotFound,

    #[error("server error: HTTP {status} - {message}")]
    Server { status: u16, message: String },
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Map a non-success response onto the error taxonomy.
pub fn classify(status: StatusCode, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error
        .clone()
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::Unauthorized(status.as_u16())
        }
        StatusCode::NOT_FOUND => BackendError::NotFound,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYLOAD_TOO_LARGE => {
            BackendError::QuotaExceeded {
                status: status.as_u16(),
                code: parsed.code.unwrap_or_else(|| "QUOTA".into()),
            }
        }
        status if status.is_client_error() => BackendError::Malformed(message),
        status => BackendError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

/// `{ok, id}` returned by `POST /spikes`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmitReceipt {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospect {
    pub email: String,
    pub first_seen: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub id: String,
    pub slug: String,
    pub url: String,
    pub spike_count: u64,
    pub created_at: String,
}

/// Server-side filters for `GET /spikes`. Page and reviewer match as
/// substrings on the backend; rating and project exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpikeQuery {
    pub page: Option<String>,
    pub reviewer: Option<String>,
    pub rating: Option<Rating>,
    pub project: Option<String>,
}

impl SpikeQuery {
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = &self.page {
            pairs.push(("page", page.clone()));
        }
        if let Some(reviewer) = &self.reviewer {
            pairs.push(("reviewer", reviewer.clone()));
        }
        if let Some(rating) = self.rating {
            pairs.push(("rating", rating.as_str().to_string()));
        }
        if let Some(project) = &self.project {
            pairs.push(("project", project.clone()));
        }
        pairs
    }
}

pub fn http_client() -> Result<Client, BackendError> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(classify(status, &body));
    }
    Ok(serde_json::from_str(&body)?)
}

/// POST one spike to a full submission URL.
pub async fn post_spike(client: &Client, url: &str, spike: &Spike) -> Result<SubmitReceipt, BackendError> {
    let url = Url::parse(url).map_err(|err| BackendError::InvalidEndpoint(format!("{url}: {err}")))?;
    log_debug!("Submitting spike {} to {}", spike.id, url.path());
    let response = client.post(url).json(spike).send().await?;
    read_json(response).await
}

pub struct BackendClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, BackendError> {
        let base = Url::parse(endpoint)
            .map_err(|err| BackendError::InvalidEndpoint(format!("{endpoint}: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            client: http_client()?,
            base,
            token: token.filter(|token| !token.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    /// `base` + path segments (each percent-encoded) + optional query.
    fn url(&self, segments: &[&str], query: &[(&'static str, String)]) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| BackendError::InvalidEndpoint(self.base.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }

        if !query.is_empty() || self.token.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if let Some(token) = &self.token {
                pairs.append_pair("token", token);
            }
        }

        Ok(url)
    }

    fn bearer(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn submit_spike(&self, spike: &Spike) -> Result<SubmitReceipt, BackendError> {
        let url = self.url(&["spikes"], &[])?;
        post_spike(&self.client, url.as_str(), spike).await
    }

    pub async fn list_spikes(&self, query: &SpikeQuery) -> Result<Vec<Spike>, BackendError> {
        let url = self.url(&["spikes"], &query.pairs())?;
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    pub async fn get_spike(&self, id: &str) -> Result<Spike, BackendError> {
        let url = self.url(&["spikes", id], &[])?;
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    pub async fn list_prospects(&self) -> Result<Vec<Prospect>, BackendError> {
        let url = self.url(&["prospects"], &[])?;
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    pub async fn list_shares(&self) -> Result<Vec<Share>, BackendError> {
        let mut url = self.url(&["shares"], &[])?;
        url.set_query(None);
        let response = self.bearer(self.client.get(url)).send().await?;
        read_json(response).await
    }

    pub async fn delete_share(&self, id: &str) -> Result<(), BackendError> {
        let mut url = self.url(&["shares", id], &[])?;
        url.set_query(None);
        let response = self.bearer(self.client.delete(url)).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        Err(classify(status, &body))
    }
}
