use crate::k8_types::{Crd, CrdNames, DefaultHeader, Spec, Status};
use crate::{GROUP, V1};

use super::MongoReplicaSetSpec;
use super::MongoReplicaSetStatus;

const MONGO_REPLICA_SET_API: Crd = Crd {
    group: GROUP,
    version: V1,
    names: CrdNames {
        kind: "MongoReplicaSet",
        plural: "mongoreplicasets",
        singular: "mongoreplicaset",
    },
};

impl Spec for MongoReplicaSetSpec {
    type Status = MongoReplicaSetStatus;
    type Header = DefaultHeader;

    fn metadata() -> &'static Crd {
        &MONGO_REPLICA_SET_API
    }
}

impl Status for MongoReplicaSetStatus {}
