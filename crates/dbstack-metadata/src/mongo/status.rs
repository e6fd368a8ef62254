use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::{AppState, AppStatus, ClusterCondition};

/// State of a replica set cluster as observed by the operator, keyed by
/// replica set name.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MongoReplicaSetStatus {
    pub state: AppState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub replsets: BTreeMap<String, AppStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ClusterCondition>,
    pub observed_generation: i64,
}
