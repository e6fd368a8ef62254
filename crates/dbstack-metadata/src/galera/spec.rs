use serde::{Deserialize, Serialize};

use crate::common::{ComponentSpec, MetricsSpec};

/// Desired state of a Galera cluster: a multi-primary SQL tier (`db`) and
/// a proxy tier routing client traffic to it.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GaleraClusterSpec {
    /// custom-resource API version the operator reconciles against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cr_version: Option<String>,

    /// secret holding the generated cluster credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets_name: Option<String>,

    /// permit single-node and other non-production layouts
    #[serde(rename = "allowUnsafeConfigurations")]
    pub allow_unsafe_config: bool,

    pub db: ComponentSpec,
    pub proxy: ComponentSpec,
    pub metrics: MetricsSpec,
}
