//! Manifest construction for new clusters.
//!
//! Pure transformation from high-level parameters to fully defaulted
//! resource documents; nothing here touches the control plane.

use derive_builder::Builder;
use k8_types::{InputK8Obj, K8Obj, Spec};

use dbstack_metadata::common::{ComponentSpec, MetricsSpec, PodAffinity, ResourceClaim};
use dbstack_metadata::galera::GaleraClusterSpec;
use dbstack_metadata::mongo::{MongoReplicaSetSpec, ReplsetSpec};

use crate::error::ClusterError;

const GALERA_IMAGE: &str = "dbstack/galera:8.0.36";
const GALERA_PROXY_IMAGE: &str = "dbstack/galera-proxy:2.6.0";
const MONGOD_IMAGE: &str = "dbstack/mongod:6.0.4";

const DEFAULT_STORAGE: &str = "1Gi";
const DEFAULT_SECRETS_NAME: &str = "dbstack-cluster-secrets";
const DEFAULT_REPLSET_NAME: &str = "rs0";

/// Parameters for creating a cluster of either kind.
#[derive(Builder, Debug, Clone)]
pub struct ClusterConfig {
    /// resource name of the cluster
    #[builder(setter(into))]
    pub name: String,

    /// node count for every data-bearing component
    pub size: i32,

    /// storage request per node; defaults to 1Gi
    #[builder(setter(into, strip_option), default)]
    pub storage: Option<String>,

    /// public address to expose; also enables the metrics sidecar
    #[builder(setter(into, strip_option), default)]
    pub public_address: Option<String>,

    /// custom-resource API version the operator should reconcile against
    #[builder(setter(into, strip_option), default)]
    pub cr_version: Option<String>,
}

impl ClusterConfig {
    pub fn builder() -> ClusterConfigBuilder {
        ClusterConfigBuilder::default()
    }
}

/// Build a fully defaulted Galera cluster document: `size` SQL nodes and
/// an equally sized proxy tier.
pub fn galera_cluster(config: &ClusterConfig) -> Result<InputK8Obj<GaleraClusterSpec>, ClusterError> {
    validate(config)?;
    let storage = storage(config);

    let spec = GaleraClusterSpec {
        cr_version: config.cr_version.clone(),
        secrets_name: Some(DEFAULT_SECRETS_NAME.to_owned()),
        allow_unsafe_config: true,
        db: ComponentSpec {
            enabled: true,
            size: config.size,
            image: Some(GALERA_IMAGE.to_owned()),
            storage: Some(storage.clone()),
            affinity: Some(PodAffinity::off()),
            public_address: None,
        },
        proxy: ComponentSpec {
            enabled: true,
            size: config.size,
            image: Some(GALERA_PROXY_IMAGE.to_owned()),
            storage: Some(storage),
            affinity: Some(PodAffinity::off()),
            public_address: config.public_address.clone(),
        },
        metrics: metrics(config),
    };

    Ok(input_doc(&config.name, spec))
}

/// Build a fully defaulted replica set document with a single data-bearing
/// replset of `size` members.
pub fn mongo_replica_set(
    config: &ClusterConfig,
) -> Result<InputK8Obj<MongoReplicaSetSpec>, ClusterError> {
    validate(config)?;

    let spec = MongoReplicaSetSpec {
        cr_version: config.cr_version.clone(),
        secrets_name: Some(DEFAULT_SECRETS_NAME.to_owned()),
        replsets: vec![ReplsetSpec {
            name: DEFAULT_REPLSET_NAME.to_owned(),
            size: config.size,
            storage: Some(storage(config)),
            affinity: Some(PodAffinity::off()),
            requests: Some(ResourceClaim {
                cpu: Some("100m".to_owned()),
                memory: Some("0.1G".to_owned()),
            }),
            limits: Some(ResourceClaim {
                cpu: Some("500m".to_owned()),
                memory: Some("0.5G".to_owned()),
            }),
        }],
        metrics: metrics(config),
    };

    Ok(input_doc(&config.name, spec))
}

fn storage(config: &ClusterConfig) -> String {
    config
        .storage
        .clone()
        .unwrap_or_else(|| DEFAULT_STORAGE.to_owned())
}

fn metrics(config: &ClusterConfig) -> MetricsSpec {
    MetricsSpec {
        enabled: config.public_address.is_some(),
        address: config.public_address.clone(),
    }
}

fn input_doc<S: Spec>(name: &str, spec: S) -> InputK8Obj<S> {
    K8Obj::new(name.to_owned(), spec).as_input()
}

fn validate(config: &ClusterConfig) -> Result<(), ClusterError> {
    if !valid_resource_name(&config.name) {
        return Err(ClusterError::InvalidParameter(format!(
            "cluster name {:?} is not a valid resource name",
            config.name
        )));
    }
    if config.size <= 0 {
        return Err(ClusterError::InvalidParameter(format!(
            "cluster size must be positive, got {}",
            config.size
        )));
    }
    Ok(())
}

/// RFC 1123 label: lowercase alphanumeric or '-', alphanumeric at both
/// ends, at most 63 characters.
fn valid_resource_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

#[cfg(test)]
mod test {

    use super::*;

    fn config(name: &str, size: i32) -> ClusterConfig {
        ClusterConfig::builder()
            .name(name)
            .size(size)
            .build()
            .expect("should build")
    }

    #[test]
    fn test_galera_defaults() {
        let doc = galera_cluster(&config("primary", 3)).expect("should build manifest");
        assert_eq!(doc.metadata.name, "primary");
        assert_eq!(doc.spec.db.size, 3);
        assert_eq!(doc.spec.proxy.size, 3);
        assert_eq!(doc.spec.db.storage.as_deref(), Some("1Gi"));
        assert!(!doc.spec.metrics.enabled);
        assert_eq!(
            doc.spec.db.affinity.as_ref().and_then(|a| a.topology_key.as_deref()),
            Some("none")
        );
    }

    #[test]
    fn test_mongo_defaults() {
        let doc = mongo_replica_set(&config("documents", 5)).expect("should build manifest");
        assert_eq!(doc.spec.replsets.len(), 1);
        assert_eq!(doc.spec.replsets[0].name, "rs0");
        assert_eq!(doc.spec.replsets[0].size, 5);
    }

    #[test]
    fn test_public_address_enables_metrics() {
        let config = ClusterConfig::builder()
            .name("edge")
            .size(3)
            .public_address("db.example.com")
            .build()
            .expect("should build");
        let doc = galera_cluster(&config).expect("should build manifest");
        assert!(doc.spec.metrics.enabled);
        assert_eq!(doc.spec.metrics.address.as_deref(), Some("db.example.com"));
    }

    #[test]
    fn test_rejects_zero_size() {
        let err = galera_cluster(&config("primary", 0)).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidParameter(_)));
    }

    #[test]
    fn test_rejects_bad_names() {
        for name in ["", "Primary", "has_underscore", "-edge", "edge-"] {
            let err = mongo_replica_set(&config(name, 3)).unwrap_err();
            assert!(matches!(err, ClusterError::InvalidParameter(_)), "{name:?}");
        }
    }
}
