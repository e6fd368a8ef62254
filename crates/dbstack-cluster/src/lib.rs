//! Lifecycle management for dbstack database clusters on Kubernetes.
//!
//! Clusters of both kinds live as custom resources reconciled by external
//! operators; this crate builds their manifests, applies them through a
//! kubectl command transport, assembles a merged inventory (including
//! clusters inferred to be mid-deletion from orphaned pods), upgrades the
//! operators themselves, and collects logs under a fair total-volume cap.
//!
//! # Example
//!
//! ```no_run
//! use dbstack_cluster::{ClusterConfig, ClusterGateway, ClusterKind, ClusterManager};
//! use dbstack_cluster::{KubeCtl, KubeCtlConfig};
//! # async fn example() -> Result<(), dbstack_cluster::ClusterError> {
//! let kubectl = KubeCtl::from_config(KubeCtlConfig::default())?;
//! let manager = ClusterManager::new(ClusterGateway::new(kubectl));
//!
//! let config = ClusterConfig::builder()
//!     .name("primary")
//!     .size(3)
//!     .build()
//!     .expect("config");
//! manager.create_cluster(ClusterKind::Galera, &config).await?;
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

mod clusters;
mod error;
mod gateway;
mod inventory;
mod kubectl;
mod logs;
mod manifest;
pub mod memory;
mod operator;

pub use clusters::{ClusterKind, ClusterManager};
pub use error::ClusterError;
pub use gateway::ClusterGateway;
pub use inventory::ClusterInfo;
pub use kubectl::{KubeCommand, KubeCtl, KubeCtlConfig, KubeCtlConfigBuilder};
pub use logs::{LogStream, fair_share, limit_lines};
pub use manifest::{ClusterConfig, ClusterConfigBuilder, galera_cluster, mongo_replica_set};
pub use operator::{DEFAULT_MANIFEST_URL_TEMPLATE, OperatorInstaller};

pub(crate) const DEFAULT_NAMESPACE: &str = "default";
