//! Typed shapes of the backend REST API.
//!
//! Responses are decoded into these types at the boundary and re-serialised
//! unchanged, so a malformed backend response is rejected instead of being
//! passed through.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope used by every backend endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// The payload of a successful response, or the backend's error text.
    pub fn into_data(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err("response marked successful but carried no data".to_string()),
            (false, _) => Err(self.error.unwrap_or_else(|| "unspecified backend error".to_string())),
        }
    }
}

/// Deployment lifecycle as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum DeploymentStatus {
    Pending,
    Started,
    Success,
    RollbackFinished,
    NoUpdate,
    Failed,
    TestMessage,
}

/// One deployment record. Fields beyond the typed core (service and project
/// names on newer controllers) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Deployment {
    pub id: i64,
    pub digest: String,
    pub status: DeploymentStatus,
    pub created_at: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One `docker inspect` document. Only the identifying fields are typed;
/// everything else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContainerInspection {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Image", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContainerStateResponse {
    pub container_inspections: Vec<ContainerInspection>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Container state of one service on one host.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceContainerState {
    pub hostname: String,
    pub project_name: String,
    pub service_name: String,
    pub container_inspections: ContainerInspection,
    pub last_updated: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}
