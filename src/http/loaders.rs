//! REST pass-through loaders.
//!
//! # Responsibilities
//! - Fetch deployment and container listings from the backend API
//! - Validate them against the typed schemas
//! - Return them to the dashboard unchanged
//!
//! # Design Decisions
//! - Backend URL and token are read from the live config per request
//! - Independent of the relay; no shared state besides the HTTP client

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::StatusCode as BackendStatus;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::http::schema::{ApiResponse, ContainerStateResponse, Deployment, ServiceContainerState};
use crate::http::server::AppState;

/// Why a loader could not produce data.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("backend API URL is not configured")]
    NotConfigured,

    #[error("not found")]
    NotFound,

    #[error("backend request failed: {0}")]
    Upstream(String),

    #[error("backend response did not match schema: {0}")]
    Schema(String),

    #[error("backend reported an error: {0}")]
    Backend(String),
}

impl LoaderError {
    pub fn status(&self) -> StatusCode {
        match self {
            LoaderError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            LoaderError::NotFound => StatusCode::NOT_FOUND,
            LoaderError::Upstream(_) | LoaderError::Schema(_) | LoaderError::Backend(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for LoaderError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Loader failed");
        }
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

/// HTTP client for the backend REST API.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// GET `{base}/{path}` and unwrap the `ApiResponse` envelope.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        base: Option<&str>,
        token: Option<&str>,
        path: &str,
    ) -> Result<T, LoaderError> {
        let url = endpoint(base.ok_or(LoaderError::NotConfigured)?, path)?;
        tracing::debug!(url = %url, "Loading from backend");

        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LoaderError::Upstream(e.to_string()))?;

        match response.status() {
            BackendStatus::NOT_FOUND => return Err(LoaderError::NotFound),
            status if !status.is_success() => {
                return Err(LoaderError::Upstream(format!("backend returned {}", status)))
            }
            _ => {}
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| LoaderError::Schema(e.to_string()))?;
        envelope.into_data().map_err(LoaderError::Backend)
    }
}

fn endpoint(base: &str, path: &str) -> Result<Url, LoaderError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| LoaderError::Upstream(format!("invalid backend URL '{}': {}", joined, e)))
}

async fn load<T: DeserializeOwned>(state: &AppState, path: &str) -> Result<T, LoaderError> {
    let config = state.config.load_full();
    state
        .backend
        .fetch(
            config.upstream.api_url.as_deref(),
            config.upstream.api_token.as_deref(),
            path,
        )
        .await
}

pub async fn list_deployments(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Deployment>>>, LoaderError> {
    let deployments = load(&state, "deployments").await?;
    Ok(Json(ApiResponse::success(deployments)))
}

pub async fn get_deployment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Deployment>>, LoaderError> {
    let deployment = load(&state, &format!("deployments/{}", id)).await?;
    Ok(Json(ApiResponse::success(deployment)))
}

pub async fn list_containers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ContainerStateResponse>>, LoaderError> {
    let containers = load(&state, "container/state").await?;
    Ok(Json(ApiResponse::success(containers)))
}

pub async fn get_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ContainerStateResponse>>, LoaderError> {
    check_segments(&[&id])?;
    let containers = load(&state, &format!("container/state/{}", id)).await?;
    Ok(Json(ApiResponse::success(containers)))
}

/// `GET /api/deployments/{project}/{service}`
pub async fn service_deployments(
    State(state): State<AppState>,
    Path((project, service)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<Deployment>>>, LoaderError> {
    check_segments(&[&project, &service])?;
    let deployments = load(&state, &format!("deployments/{}/{}", project, service)).await?;
    Ok(Json(ApiResponse::success(deployments)))
}

/// `GET /api/containers/{hostname}/{project}/{service}`
pub async fn service_containers(
    State(state): State<AppState>,
    Path((hostname, project, service)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse<ServiceContainerState>>, LoaderError> {
    check_segments(&[&hostname, &project, &service])?;
    let containers = load(
        &state,
        &format!("container/state/{}/{}/{}", hostname, project, service),
    )
    .await?;
    Ok(Json(ApiResponse::success(containers)))
}

/// Path segments are forwarded into the backend URL, so only plain names pass.
fn check_segments(segments: &[&str]) -> Result<(), LoaderError> {
    let plain = |segment: &str| {
        !segment.is_empty()
            && segment != "."
            && segment != ".."
            && segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    };
    if segments.iter().all(|segment| plain(segment)) {
        Ok(())
    } else {
        Err(LoaderError::NotFound)
    }
}
