//! Typed gateway over the command transport.
//!
//! Serializes and deserializes resource documents for a [`KubeCommand`]
//! transport. Holds no cache: every call is a fresh round trip, and
//! concurrent calls for different names need no coordination.

use std::fmt::Debug;
use std::sync::Arc;

use k8_types::{K8List, K8Obj, Spec};
use serde::Serialize;
use tracing::debug;

use crate::error::ClusterError;
use crate::kubectl::KubeCommand;

/// kubectl resource argument for a spec: `plural.group`, bare plural for
/// core-group kinds.
fn resource_arg<S: Spec>() -> String {
    let crd = S::metadata();
    match crd.group {
        "" | "core" => crd.names.plural.to_owned(),
        group => format!("{}.{}", crd.names.plural, group),
    }
}

/// Control-plane access for resource documents of any registered kind.
#[derive(Clone)]
pub struct ClusterGateway {
    kube: Arc<dyn KubeCommand>,
}

impl ClusterGateway {
    pub fn new(kube: impl KubeCommand + 'static) -> Self {
        Self {
            kube: Arc::new(kube),
        }
    }

    /// Create-or-update a resource document. Idempotent; concurrent calls
    /// for the same name are resolved by the control plane.
    pub async fn apply<O>(&self, doc: &O) -> Result<(), ClusterError>
    where
        O: Serialize + Debug,
    {
        let bytes =
            serde_json::to_vec(doc).map_err(ClusterError::encoding("encode resource document"))?;
        self.kube.apply(bytes).await
    }

    /// Apply manifests from a remote location, e.g. an operator bundle.
    pub async fn apply_manifest_url(&self, url: &str) -> Result<(), ClusterError> {
        self.kube.apply_url(url).await
    }

    /// Fetch one object by name.
    pub async fn retrieve_item<S: Spec>(&self, name: &str) -> Result<K8Obj<S>, ClusterError> {
        let resource = resource_arg::<S>();
        let bytes = self.kube.get(&resource, name).await?;
        serde_json::from_slice(&bytes)
            .map_err(ClusterError::encoding(format!("decode {resource} {name:?}")))
    }

    /// Fetch every object of a kind. An empty list is not an error.
    pub async fn retrieve_items<S: Spec>(&self) -> Result<K8List<S>, ClusterError> {
        let resource = resource_arg::<S>();
        let bytes = self.kube.get(&resource, "").await?;
        let list: K8List<S> = serde_json::from_slice(&bytes)
            .map_err(ClusterError::encoding(format!("decode {resource} list")))?;
        debug!(resource, items = list.items.len(), "retrieved items");
        Ok(list)
    }

    /// Request deletion of one object. Success means the request was
    /// accepted, not that the object and its pods are gone.
    pub async fn delete_item<S: Spec>(&self, name: &str) -> Result<(), ClusterError> {
        self.kube.delete(&resource_arg::<S>(), name).await
    }

    /// Merge-patch one object.
    pub async fn patch<S: Spec>(
        &self,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), ClusterError> {
        let resource = resource_arg::<S>();
        let bytes = serde_json::to_vec(patch)
            .map_err(ClusterError::encoding(format!("encode {resource} patch")))?;
        self.kube.patch(&resource, name, bytes).await
    }

    /// Full available log output of one container.
    pub async fn pod_logs(&self, pod: &str, container: &str) -> Result<String, ClusterError> {
        self.kube.logs(pod, container).await
    }
}

#[cfg(test)]
mod test {

    use dbstack_metadata::galera::GaleraClusterSpec;
    use k8_types::core::pod::PodSpec;

    use super::*;

    #[test]
    fn test_resource_arg_custom_kind() {
        assert_eq!(
            resource_arg::<GaleraClusterSpec>(),
            "galeraclusters.dbs.dbstack.io"
        );
    }

    #[test]
    fn test_resource_arg_core_kind() {
        assert_eq!(resource_arg::<PodSpec>(), "pods");
    }
}
