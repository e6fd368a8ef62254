//! Data model for the custom resources managed by dbstack.
//!
//! Two cluster kinds live in the `dbs.dbstack.io` API group:
//! [`GaleraCluster`](galera::GaleraClusterSpec), a multi-primary relational
//! engine fronted by a SQL proxy tier, and
//! [`MongoReplicaSet`](mongo::MongoReplicaSetSpec), a document store
//! replica set. The upstream operators own the full CRD schemas; this crate
//! models only the fields the control service reads and writes, as flat
//! records with explicit per-field optionality.

pub mod common;
pub mod galera;
pub mod mongo;

pub use k8_types;

/// API group shared by both cluster kinds.
pub const GROUP: &str = "dbs.dbstack.io";

/// CRD API version.
pub const V1: &str = "v1";
