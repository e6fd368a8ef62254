use serde::{Deserialize, Serialize};

use crate::common::{MetricsSpec, PodAffinity, ResourceClaim};

/// Desired state of a document-store replica set.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MongoReplicaSetSpec {
    /// custom-resource API version the operator reconciles against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cr_version: Option<String>,

    /// secret holding the generated cluster credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets_name: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replsets: Vec<ReplsetSpec>,

    pub metrics: MetricsSpec,
}

/// One replica set of the cluster. The first entry is the primary data
/// bearing set; additional entries are for sharded layouts.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplsetSpec {
    pub name: String,
    pub size: i32,
    /// storage request per member, e.g. `1Gi`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<PodAffinity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceClaim>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceClaim>,
}
