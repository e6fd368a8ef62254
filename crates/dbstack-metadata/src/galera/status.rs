use serde::{Deserialize, Serialize};

use crate::common::{AppState, AppStatus, ClusterCondition};

/// State of a Galera cluster as observed by the operator. Possibly stale:
/// it reflects the operator's last reconciliation, not the live pods.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GaleraClusterStatus {
    pub db: AppStatus,
    pub proxy: AppStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    pub state: AppState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ClusterCondition>,
    pub observed_generation: i64,
}
