//! Operator installation and upgrade.
//!
//! Applies an operator's bundle manifests and, on upgrade over an existing
//! install, points every custom resource of that kind at the new version.
//! Steps are not transactional; each one is idempotent, so a failed call
//! is recovered by re-invoking the whole operation.

use k8_types::K8Obj;
use k8_types::app::deployment::DeploymentSpec;
use semver::Version;
use serde_json::json;
use tracing::{debug, info, instrument};

use dbstack_metadata::galera::GaleraClusterSpec;
use dbstack_metadata::mongo::MongoReplicaSetSpec;

use crate::clusters::ClusterKind;
use crate::error::ClusterError;
use crate::gateway::ClusterGateway;

/// Default bundle location; `{operator}` and `{version}` are substituted.
pub const DEFAULT_MANIFEST_URL_TEMPLATE: &str =
    "https://manifests.dbstack.io/{operator}/v{version}/bundle.yaml";

/// Installs or upgrades the operator for a cluster kind.
pub struct OperatorInstaller {
    gateway: ClusterGateway,
    manifest_url_template: String,
}

impl OperatorInstaller {
    pub fn new(gateway: ClusterGateway) -> Self {
        Self {
            gateway,
            manifest_url_template: DEFAULT_MANIFEST_URL_TEMPLATE.to_owned(),
        }
    }

    /// Override the bundle location template.
    pub fn with_manifest_url_template(mut self, template: impl Into<String>) -> Self {
        self.manifest_url_template = template.into();
        self
    }

    /// Install the operator for `kind`, or upgrade it to `version`.
    ///
    /// The first failing step aborts the rest and is surfaced verbatim. A
    /// failure between manifest apply and cluster patching leaves a
    /// recoverable state: retrying the same call completes the upgrade.
    #[instrument(skip(self))]
    pub async fn install_or_upgrade(
        &self,
        kind: ClusterKind,
        version: &Version,
    ) -> Result<(), ClusterError> {
        let installed = self.installed_version(kind).await?;

        self.gateway
            .apply_manifest_url(&self.bundle_url(kind, version))
            .await?;

        if let Some(previous) = installed {
            info!(%previous, %version, operator = kind.operator_deployment(), "patching existing clusters");
            self.patch_clusters(kind, version).await?;
        }
        Ok(())
    }

    /// Version of the currently installed operator, read from its
    /// deployment's image tag. `None` on a fresh control plane.
    async fn installed_version(&self, kind: ClusterKind) -> Result<Option<Version>, ClusterError> {
        let deployment: K8Obj<DeploymentSpec> = match self
            .gateway
            .retrieve_item(kind.operator_deployment())
            .await
        {
            Ok(deployment) => deployment,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        let version = operator_image_version(&deployment.spec);
        debug!(?version, operator = kind.operator_deployment(), "detected installed operator");
        Ok(version)
    }

    /// Point every existing custom resource of `kind` at `version`. A
    /// no-op when none exist.
    async fn patch_clusters(&self, kind: ClusterKind, version: &Version) -> Result<(), ClusterError> {
        let patch = json!({ "spec": { "crVersion": version.to_string() } });
        match kind {
            ClusterKind::Galera => {
                let list = self.gateway.retrieve_items::<GaleraClusterSpec>().await?;
                for cluster in list.items {
                    self.gateway
                        .patch::<GaleraClusterSpec>(&cluster.metadata.name, &patch)
                        .await?;
                }
            }
            ClusterKind::MongoReplicaSet => {
                let list = self.gateway.retrieve_items::<MongoReplicaSetSpec>().await?;
                for cluster in list.items {
                    self.gateway
                        .patch::<MongoReplicaSetSpec>(&cluster.metadata.name, &patch)
                        .await?;
                }
            }
        }
        Ok(())
    }

    fn bundle_url(&self, kind: ClusterKind, version: &Version) -> String {
        self.manifest_url_template
            .replace("{operator}", kind.operator_deployment())
            .replace("{version}", &version.to_string())
    }
}

/// Image tag of the operator container, parsed as semver.
fn operator_image_version(spec: &DeploymentSpec) -> Option<Version> {
    let image = spec.template.spec.containers.first()?.image.as_ref()?;
    let (_, tag) = image.rsplit_once(':')?;
    Version::parse(tag.trim_start_matches('v')).ok()
}

#[cfg(test)]
mod test {

    use k8_types::app::deployment::DeploymentSpec;
    use k8_types::core::pod::ContainerSpec;

    use crate::manifest::{self, ClusterConfig};
    use crate::memory::MemoryKube;

    use super::*;

    fn deployment_with_image(image: &str) -> DeploymentSpec {
        let mut spec = DeploymentSpec::default();
        spec.template.spec.containers = vec![ContainerSpec {
            name: "operator".to_owned(),
            image: Some(image.to_owned()),
            ..Default::default()
        }];
        spec
    }

    #[test]
    fn test_operator_image_version() {
        let spec = deployment_with_image("dbstack/galera-operator:1.4.0");
        assert_eq!(
            operator_image_version(&spec),
            Some(Version::new(1, 4, 0))
        );

        let spec = deployment_with_image("registry.dbstack.io/mongo-operator:v2.0.1");
        assert_eq!(
            operator_image_version(&spec),
            Some(Version::new(2, 0, 1))
        );
    }

    #[test]
    fn test_operator_image_version_unparseable() {
        assert_eq!(
            operator_image_version(&deployment_with_image("dbstack/galera-operator:latest")),
            None
        );
        assert_eq!(
            operator_image_version(&deployment_with_image("dbstack/galera-operator")),
            None
        );
        assert_eq!(operator_image_version(&DeploymentSpec::default()), None);
    }

    const GALERA_RESOURCE: &str = "galeraclusters.dbs.dbstack.io";
    const DEPLOYMENT_RESOURCE: &str = "deployments.apps";

    fn seed_operator(memory: &MemoryKube, name: &str, image: &str) {
        let deployment = K8Obj::new(name.to_owned(), deployment_with_image(image));
        memory.insert(
            DEPLOYMENT_RESOURCE,
            name,
            serde_json::to_value(&deployment).expect("deployment serializes"),
        );
    }

    #[fluvio_future::test]
    async fn test_fresh_install_patches_nothing() {
        let memory = MemoryKube::new();
        let installer = OperatorInstaller::new(ClusterGateway::new(memory.clone()));

        installer
            .install_or_upgrade(ClusterKind::Galera, &Version::new(1, 4, 0))
            .await
            .expect("install");

        let calls = memory.calls();
        assert!(calls.iter().any(|call| call.starts_with("apply-url")));
        assert!(calls.iter().all(|call| !call.starts_with("patch")));
    }

    #[fluvio_future::test]
    async fn test_upgrade_twice_reaches_the_same_state() {
        let memory = MemoryKube::new();
        let gateway = ClusterGateway::new(memory.clone());
        let installer = OperatorInstaller::new(gateway.clone());

        seed_operator(&memory, "galera-operator", "dbstack/galera-operator:1.4.0");
        let config = ClusterConfig::builder()
            .name("primary")
            .size(3)
            .build()
            .expect("config");
        gateway
            .apply(&manifest::galera_cluster(&config).expect("manifest"))
            .await
            .expect("apply");

        let target = Version::new(1, 5, 0);
        installer
            .install_or_upgrade(ClusterKind::Galera, &target)
            .await
            .expect("upgrade");
        let doc = memory.stored(GALERA_RESOURCE, "primary").expect("stored");
        assert_eq!(doc["spec"]["crVersion"], "1.5.0");

        installer
            .install_or_upgrade(ClusterKind::Galera, &target)
            .await
            .expect("second upgrade");
        let doc = memory.stored(GALERA_RESOURCE, "primary").expect("stored");
        assert_eq!(doc["spec"]["crVersion"], "1.5.0");
    }
}
