use std::io::Error as IoError;

/// The types of errors that can occur during cluster management.
///
/// Every operation surfaces the first error it encounters and aborts the
/// rest of its work. Transport failures are safe to retry wholesale since
/// all writes are idempotent; encoding failures are not.
#[derive(thiserror::Error, Debug)]
pub enum ClusterError {
    /// Caller supplied malformed input; reported before any transport call
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The requested object does not exist on the control plane
    #[error("{resource} {name:?} was not found")]
    NotFound { resource: String, name: String },
    /// Failed to reach the control plane
    #[error("failed to {op}")]
    Transport {
        op: String,
        #[source]
        source: IoError,
    },
    /// Malformed resource document on read or write
    #[error("failed to {op}")]
    Encoding {
        op: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClusterError {
    pub(crate) fn not_found(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            name: name.into(),
        }
    }

    pub(crate) fn transport(op: impl Into<String>) -> impl FnOnce(IoError) -> Self {
        let op = op.into();
        move |source| Self::Transport { op, source }
    }

    pub(crate) fn encoding(op: impl Into<String>) -> impl FnOnce(serde_json::Error) -> Self {
        let op = op.into();
        move |source| Self::Encoding { op, source }
    }

    /// Whether this error reports an absent object. Delete callers treat
    /// this as success, list callers as empty.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
