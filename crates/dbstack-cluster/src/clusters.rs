//! CRUD facade over the gateway for both cluster kinds.

use std::fmt;

use k8_types::K8Obj;
use tracing::{debug, instrument};

use dbstack_metadata::galera::GaleraClusterSpec;
use dbstack_metadata::mongo::MongoReplicaSetSpec;

use crate::error::ClusterError;
use crate::gateway::ClusterGateway;
use crate::inventory::{self, ClusterInfo};
use crate::logs::{self, LogStream};
use crate::manifest::{self, ClusterConfig};

/// The managed cluster kinds.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ClusterKind {
    Galera,
    MongoReplicaSet,
}

impl ClusterKind {
    /// CRD kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Galera => "GaleraCluster",
            Self::MongoReplicaSet => "MongoReplicaSet",
        }
    }

    /// Deployment name of the operator reconciling this kind.
    pub fn operator_deployment(&self) -> &'static str {
        match self {
            Self::Galera => "galera-operator",
            Self::MongoReplicaSet => "mongo-operator",
        }
    }

    /// Map a pod's component-name label to a kind. Unrecognized values
    /// belong to workloads this service does not manage.
    pub(crate) fn from_component(label: &str) -> Option<Self> {
        match label {
            "galera-cluster" => Some(Self::Galera),
            "mongo-replicaset" => Some(Self::MongoReplicaSet),
            _ => None,
        }
    }
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Entry point for cluster lifecycle operations.
///
/// Every method is a synchronous round trip on behalf of the caller; there
/// is no background reconciliation. Callers needing exclusivity for
/// concurrent writes to the same cluster must serialize themselves.
pub struct ClusterManager {
    gateway: ClusterGateway,
}

impl ClusterManager {
    pub fn new(gateway: ClusterGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &ClusterGateway {
        &self.gateway
    }

    /// Create a cluster from the given parameters. Validation happens
    /// before any transport call.
    #[instrument(skip(self, config), fields(name = %config.name))]
    pub async fn create_cluster(
        &self,
        kind: ClusterKind,
        config: &ClusterConfig,
    ) -> Result<(), ClusterError> {
        match kind {
            ClusterKind::Galera => self.gateway.apply(&manifest::galera_cluster(config)?).await,
            ClusterKind::MongoReplicaSet => {
                self.gateway
                    .apply(&manifest::mongo_replica_set(config)?)
                    .await
            }
        }
    }

    /// Resize a cluster. Size is the only mutable field: the current
    /// document is fetched, every data-bearing tier is set to `size`, and
    /// the whole document is re-applied.
    #[instrument(skip(self))]
    pub async fn update_cluster(
        &self,
        kind: ClusterKind,
        name: &str,
        size: i32,
    ) -> Result<(), ClusterError> {
        if size <= 0 {
            return Err(ClusterError::InvalidParameter(format!(
                "cluster size must be positive, got {size}"
            )));
        }

        match kind {
            ClusterKind::Galera => {
                let mut cluster: K8Obj<GaleraClusterSpec> =
                    self.gateway.retrieve_item(name).await?;
                cluster.spec.db.size = size;
                cluster.spec.proxy.size = size;
                self.gateway.apply(&cluster).await
            }
            ClusterKind::MongoReplicaSet => {
                let mut cluster: K8Obj<MongoReplicaSetSpec> =
                    self.gateway.retrieve_item(name).await?;
                for replset in &mut cluster.spec.replsets {
                    replset.size = size;
                }
                self.gateway.apply(&cluster).await
            }
        }
    }

    /// Request deletion of a cluster. The resource disappears promptly but
    /// its pods terminate later; until then the cluster shows up in the
    /// inventory as `deleting`. A [`ClusterError::NotFound`] may be treated
    /// as success by the caller.
    #[instrument(skip(self))]
    pub async fn delete_cluster(&self, kind: ClusterKind, name: &str) -> Result<(), ClusterError> {
        debug!(%kind, name, "requesting cluster deletion");
        match kind {
            ClusterKind::Galera => self.gateway.delete_item::<GaleraClusterSpec>(name).await,
            ClusterKind::MongoReplicaSet => {
                self.gateway.delete_item::<MongoReplicaSetSpec>(name).await
            }
        }
    }

    /// Point-in-time inventory of every managed cluster, including those
    /// inferred to be mid-deletion.
    pub async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, ClusterError> {
        inventory::list_clusters(&self.gateway).await
    }

    /// Recent logs from every container of the cluster, trimmed to
    /// `line_budget` total lines.
    pub async fn logs(
        &self,
        cluster_name: &str,
        line_budget: usize,
    ) -> Result<Vec<LogStream>, ClusterError> {
        logs::collect_logs(&self.gateway, cluster_name, line_budget).await
    }
}
