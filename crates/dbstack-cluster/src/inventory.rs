//! On-demand cluster inventory.
//!
//! Merges the live custom resources with pod-level evidence: a cluster
//! whose resource is already gone but whose pods are still terminating is
//! reported as `deleting`. Resources and pods are fetched in two separate,
//! non-atomic calls; the read skew between them is tolerated as transient
//! inaccuracy. Nothing is cached — every call recomputes from scratch.

use std::collections::HashSet;

use k8_types::K8Obj;
use k8_types::core::pod::PodSpec;
use tracing::{debug, instrument};

use dbstack_metadata::galera::GaleraClusterSpec;
use dbstack_metadata::mongo::MongoReplicaSetSpec;

use crate::clusters::ClusterKind;
use crate::error::ClusterError;
use crate::gateway::ClusterGateway;

/// pod label carrying the owning cluster name
pub(crate) const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";

/// pod label carrying the component name, mapped to a cluster kind
pub(crate) const COMPONENT_LABEL: &str = "app.kubernetes.io/name";

const DELETING_STATUS: &str = "deleting";

/// One inventory entry. Valid only for the duration of the list call that
/// produced it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClusterInfo {
    pub name: String,
    pub kind: ClusterKind,
    pub size: i32,
    pub status: String,
}

/// List every managed cluster: Galera entries first, then replica sets,
/// then synthesized `deleting` entries. A live resource's status always
/// wins over pod-inferred state for the same name.
#[instrument(skip(gateway))]
pub(crate) async fn list_clusters(
    gateway: &ClusterGateway,
) -> Result<Vec<ClusterInfo>, ClusterError> {
    let mut clusters = galera_clusters(gateway).await?;
    clusters.extend(mongo_clusters(gateway).await?);

    let pods = gateway.retrieve_items::<PodSpec>().await?;
    let mut covered: HashSet<String> = clusters.iter().map(|c| c.name.clone()).collect();
    clusters.extend(deleting_clusters(pods.items, &mut covered));

    debug!(total = clusters.len(), "assembled inventory");
    Ok(clusters)
}

async fn galera_clusters(gateway: &ClusterGateway) -> Result<Vec<ClusterInfo>, ClusterError> {
    let list = gateway.retrieve_items::<GaleraClusterSpec>().await?;
    Ok(list
        .items
        .into_iter()
        .map(|cluster| ClusterInfo {
            name: cluster.metadata.name.clone(),
            kind: ClusterKind::Galera,
            size: cluster.spec.db.size,
            status: cluster.status.state.to_string(),
        })
        .collect())
}

async fn mongo_clusters(gateway: &ClusterGateway) -> Result<Vec<ClusterInfo>, ClusterError> {
    let list = gateway.retrieve_items::<MongoReplicaSetSpec>().await?;
    Ok(list
        .items
        .into_iter()
        .map(|cluster| ClusterInfo {
            name: cluster.metadata.name.clone(),
            kind: ClusterKind::MongoReplicaSet,
            size: cluster
                .spec
                .replsets
                .first()
                .map(|replset| replset.size)
                .unwrap_or_default(),
            status: cluster.status.state.to_string(),
        })
        .collect())
}

/// Synthesize one `deleting` entry per cluster identity found only on
/// pods. Known limitation: a deleted cluster whose remaining pods carry no
/// recognized component label is dropped from the inventory entirely —
/// such pods are assumed to belong to unmanaged workloads.
pub(crate) fn deleting_clusters(
    pods: Vec<K8Obj<PodSpec>>,
    covered: &mut HashSet<String>,
) -> Vec<ClusterInfo> {
    let mut deleting = Vec::new();
    for pod in pods {
        let labels = &pod.metadata.labels;
        let Some(name) = labels.get(INSTANCE_LABEL) else {
            continue;
        };
        if covered.contains(name) {
            continue;
        }
        let Some(kind) = labels
            .get(COMPONENT_LABEL)
            .and_then(|component| ClusterKind::from_component(component))
        else {
            continue;
        };

        deleting.push(ClusterInfo {
            name: name.clone(),
            kind,
            size: 0,
            status: DELETING_STATUS.to_owned(),
        });
        covered.insert(name.clone());
    }
    deleting
}

#[cfg(test)]
mod test {

    use super::*;

    fn pod(name: &str, labels: &[(&str, &str)]) -> K8Obj<PodSpec> {
        let mut pod = K8Obj::new(name.to_owned(), PodSpec::default());
        pod.metadata.labels = labels
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        pod
    }

    #[test]
    fn test_orphaned_pods_become_one_deleting_entry() {
        let pods = vec![
            pod("gone-db-0", &[(INSTANCE_LABEL, "gone"), (COMPONENT_LABEL, "galera-cluster")]),
            pod("gone-db-1", &[(INSTANCE_LABEL, "gone"), (COMPONENT_LABEL, "galera-cluster")]),
        ];
        let mut covered = HashSet::new();

        let deleting = deleting_clusters(pods, &mut covered);
        assert_eq!(deleting.len(), 1);
        assert_eq!(deleting[0].name, "gone");
        assert_eq!(deleting[0].kind, ClusterKind::Galera);
        assert_eq!(deleting[0].status, "deleting");
    }

    #[test]
    fn test_live_resource_wins_over_pod_evidence() {
        let pods = vec![pod(
            "primary-db-0",
            &[(INSTANCE_LABEL, "primary"), (COMPONENT_LABEL, "galera-cluster")],
        )];
        let mut covered = HashSet::from(["primary".to_owned()]);

        assert!(deleting_clusters(pods, &mut covered).is_empty());
    }

    #[test]
    fn test_unrecognized_component_is_skipped() {
        let pods = vec![
            pod("other-0", &[(INSTANCE_LABEL, "other"), (COMPONENT_LABEL, "redis")]),
            pod("bare-0", &[(INSTANCE_LABEL, "bare")]),
            pod("unlabeled-0", &[]),
        ];
        let mut covered = HashSet::new();

        assert!(deleting_clusters(pods, &mut covered).is_empty());
    }

    #[test]
    fn test_mixed_kinds_keep_pod_order() {
        let pods = vec![
            pod("docs-rs0-0", &[(INSTANCE_LABEL, "docs"), (COMPONENT_LABEL, "mongo-replicaset")]),
            pod("sql-db-0", &[(INSTANCE_LABEL, "sql"), (COMPONENT_LABEL, "galera-cluster")]),
        ];
        let mut covered = HashSet::new();

        let deleting = deleting_clusters(pods, &mut covered);
        assert_eq!(deleting.len(), 2);
        assert_eq!(deleting[0].kind, ClusterKind::MongoReplicaSet);
        assert_eq!(deleting[1].kind, ClusterKind::Galera);
    }
}
