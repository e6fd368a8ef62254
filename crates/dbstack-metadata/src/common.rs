//! Records shared by both cluster kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Topology key value that disables anti-affinity.
pub const AFFINITY_OFF: &str = "none";

/// Application state reported by the operator for a cluster or one of its
/// subcomponents.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Unknown,
    Initializing,
    Ready,
    Error,
}

impl Default for AppState {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Initializing => write!(f, "initializing"),
            Self::Ready => write!(f, "ready"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Readiness of one subcomponent as observed by the operator.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppStatus {
    pub size: i32,
    pub ready: i32,
    pub status: AppState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One entry of the operator-maintained condition log.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Pod anti-affinity policy for a subcomponent.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PodAffinity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology_key: Option<String>,
}

impl PodAffinity {
    /// Anti-affinity disabled, the default for new clusters.
    pub fn off() -> Self {
        Self {
            topology_key: Some(AFFINITY_OFF.to_owned()),
        }
    }
}

/// Desired state of one cluster subcomponent.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentSpec {
    pub enabled: bool,
    pub size: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// storage request per node, e.g. `1Gi`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<PodAffinity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_address: Option<String>,
}

/// Metrics sidecar configuration.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsSpec {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Compute resources requested for a subcomponent.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceClaim {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}
