use crate::k8_types::{Crd, CrdNames, DefaultHeader, Spec, Status};
use crate::{GROUP, V1};

use super::GaleraClusterSpec;
use super::GaleraClusterStatus;

const GALERA_CLUSTER_API: Crd = Crd {
    group: GROUP,
    version: V1,
    names: CrdNames {
        kind: "GaleraCluster",
        plural: "galeraclusters",
        singular: "galeracluster",
    },
};

impl Spec for GaleraClusterSpec {
    type Status = GaleraClusterStatus;
    type Header = DefaultHeader;

    fn metadata() -> &'static Crd {
        &GALERA_CLUSTER_API
    }
}

impl Status for GaleraClusterStatus {}
