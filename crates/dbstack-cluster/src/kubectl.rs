//! Command transport to the control plane.
//!
//! All reads and writes go through `kubectl`; this module owns locating the
//! binary, argument plumbing and failure classification. Everything above
//! it works in terms of the [`KubeCommand`] trait so tests can substitute
//! an in-memory transport.

use std::io::{Error as IoError, ErrorKind, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use derive_builder::Builder;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};
use which::which;

use crate::DEFAULT_NAMESPACE;
use crate::error::ClusterError;

/// marker kubectl prints when the API server reports an absent object
const NOT_FOUND_MARKER: &str = "(NotFound)";

/// Operations the control plane transport must support.
///
/// One call is one process invocation; the transport holds no mutable
/// state, so concurrent calls are independent. Calls on the same resource
/// name race at the control plane, not here.
#[async_trait]
pub trait KubeCommand: Send + Sync {
    /// Fetch one object as JSON, or every object of the resource when
    /// `name` is empty.
    async fn get(&self, resource: &str, name: &str) -> Result<Vec<u8>, ClusterError>;

    /// Create-or-update from a serialized resource document.
    async fn apply(&self, doc: Vec<u8>) -> Result<(), ClusterError>;

    /// Apply manifests from a remote location.
    async fn apply_url(&self, url: &str) -> Result<(), ClusterError>;

    /// Request deletion. Returns once the request is accepted; dependent
    /// objects disappear later, on the operator's schedule.
    async fn delete(&self, resource: &str, name: &str) -> Result<(), ClusterError>;

    /// Merge-patch one object.
    async fn patch(&self, resource: &str, name: &str, patch: Vec<u8>) -> Result<(), ClusterError>;

    /// Full available log output of one container.
    async fn logs(&self, pod: &str, container: &str) -> Result<String, ClusterError>;
}

/// Configuration for the kubectl transport.
#[derive(Builder, Debug, Clone)]
pub struct KubeCtlConfig {
    /// namespace holding the managed clusters
    #[builder(setter(into), default = "DEFAULT_NAMESPACE.to_string()")]
    pub namespace: String,

    /// explicit kubeconfig path handed to kubectl
    #[builder(setter(into, strip_option), default)]
    pub kubeconfig: Option<PathBuf>,
}

impl KubeCtlConfig {
    pub fn builder() -> KubeCtlConfigBuilder {
        KubeCtlConfigBuilder::default()
    }
}

impl Default for KubeCtlConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            kubeconfig: None,
        }
    }
}

/// kubectl-backed [`KubeCommand`] implementation.
#[derive(Debug)]
pub struct KubeCtl {
    config: KubeCtlConfig,
    binary: PathBuf,
    // keeps an inline kubeconfig alive for the lifetime of the transport
    _inline_kubeconfig: Option<NamedTempFile>,
}

enum RunFailure {
    NotFound,
    Io(IoError),
}

impl KubeCtl {
    /// Locate kubectl and build a transport from the given config.
    pub fn from_config(config: KubeCtlConfig) -> Result<Self, ClusterError> {
        let binary = which("kubectl").map_err(|err| ClusterError::Transport {
            op: "locate kubectl".to_owned(),
            source: IoError::new(ErrorKind::NotFound, err),
        })?;
        debug!(binary = %binary.display(), "found kubectl");
        Ok(Self {
            config,
            binary,
            _inline_kubeconfig: None,
        })
    }

    /// Build a transport around kubeconfig content supplied by the caller,
    /// persisted to a temporary file for kubectl's `--kubeconfig`.
    pub fn with_inline_kubeconfig(
        content: &str,
        namespace: impl Into<String>,
    ) -> Result<Self, ClusterError> {
        let mut file = NamedTempFile::new().map_err(ClusterError::transport("stage kubeconfig"))?;
        file.write_all(content.as_bytes())
            .map_err(ClusterError::transport("stage kubeconfig"))?;

        let config = KubeCtlConfig {
            namespace: namespace.into(),
            kubeconfig: Some(file.path().to_path_buf()),
        };
        let mut kubectl = Self::from_config(config)?;
        kubectl._inline_kubeconfig = Some(file);
        Ok(kubectl)
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec!["--namespace".to_owned(), self.config.namespace.clone()];
        if let Some(kubeconfig) = &self.config.kubeconfig {
            args.push("--kubeconfig".to_owned());
            args.push(kubeconfig.display().to_string());
        }
        args
    }

    fn run(&self, mut args: Vec<String>, stdin: Option<Vec<u8>>) -> Result<Vec<u8>, RunFailure> {
        args.extend(self.base_args());
        debug!(?args, "invoking kubectl");

        let mut expression = duct::cmd(self.binary.as_path(), args)
            .stdout_capture()
            .stderr_capture()
            .unchecked();
        if let Some(input) = stdin {
            expression = expression.stdin_bytes(input);
        }

        let output = expression.run().map_err(RunFailure::Io)?;
        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains(NOT_FOUND_MARKER) {
            return Err(RunFailure::NotFound);
        }
        Err(RunFailure::Io(IoError::other(format!(
            "kubectl exited with {}: {}",
            output.status,
            stderr.trim()
        ))))
    }
}

#[async_trait]
impl KubeCommand for KubeCtl {
    #[instrument(skip(self))]
    async fn get(&self, resource: &str, name: &str) -> Result<Vec<u8>, ClusterError> {
        let mut args = vec!["get".to_owned(), resource.to_owned()];
        if !name.is_empty() {
            args.push(name.to_owned());
        }
        args.push("-o".to_owned());
        args.push("json".to_owned());

        self.run(args, None).map_err(|failure| match failure {
            RunFailure::NotFound => ClusterError::not_found(resource, name),
            RunFailure::Io(source) => ClusterError::transport(format!("get {resource}"))(source),
        })
    }

    #[instrument(skip(self, doc))]
    async fn apply(&self, doc: Vec<u8>) -> Result<(), ClusterError> {
        let args = vec!["apply".to_owned(), "-f".to_owned(), "-".to_owned()];
        self.run(args, Some(doc))
            .map_err(|failure| match failure {
                RunFailure::NotFound => ClusterError::not_found("resource document", ""),
                RunFailure::Io(source) => ClusterError::transport("apply resource document")(source),
            })
            .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn apply_url(&self, url: &str) -> Result<(), ClusterError> {
        let args = vec!["apply".to_owned(), "-f".to_owned(), url.to_owned()];
        self.run(args, None)
            .map_err(|failure| match failure {
                RunFailure::NotFound => ClusterError::not_found("manifest", url),
                RunFailure::Io(source) => {
                    ClusterError::transport(format!("apply manifests from {url}"))(source)
                }
            })
            .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn delete(&self, resource: &str, name: &str) -> Result<(), ClusterError> {
        // deletion is asynchronous by contract: do not wait for the object
        // to disappear, only for the request to be accepted
        let args = vec![
            "delete".to_owned(),
            resource.to_owned(),
            name.to_owned(),
            "--wait=false".to_owned(),
        ];
        self.run(args, None)
            .map_err(|failure| match failure {
                RunFailure::NotFound => ClusterError::not_found(resource, name),
                RunFailure::Io(source) => {
                    ClusterError::transport(format!("delete {resource}"))(source)
                }
            })
            .map(|_| ())
    }

    #[instrument(skip(self, patch))]
    async fn patch(&self, resource: &str, name: &str, patch: Vec<u8>) -> Result<(), ClusterError> {
        let patch = String::from_utf8(patch).map_err(|err| ClusterError::Transport {
            op: format!("patch {resource}"),
            source: IoError::new(ErrorKind::InvalidData, err),
        })?;
        let args = vec![
            "patch".to_owned(),
            resource.to_owned(),
            name.to_owned(),
            "--type=merge".to_owned(),
            "-p".to_owned(),
            patch,
        ];
        self.run(args, None)
            .map_err(|failure| match failure {
                RunFailure::NotFound => ClusterError::not_found(resource, name),
                RunFailure::Io(source) => {
                    ClusterError::transport(format!("patch {resource}"))(source)
                }
            })
            .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn logs(&self, pod: &str, container: &str) -> Result<String, ClusterError> {
        let args = vec![
            "logs".to_owned(),
            pod.to_owned(),
            "-c".to_owned(),
            container.to_owned(),
        ];
        let stdout = self.run(args, None).map_err(|failure| match failure {
            RunFailure::NotFound => ClusterError::not_found("pod", pod),
            RunFailure::Io(source) => {
                ClusterError::transport(format!("fetch logs of pod {pod}"))(source)
            }
        })?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = KubeCtlConfig::builder().build().expect("should build");
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert!(config.kubeconfig.is_none());
    }

    #[test]
    fn test_config_override() {
        let config = KubeCtlConfig::builder()
            .namespace("databases")
            .kubeconfig("/tmp/kubeconfig")
            .build()
            .expect("should build");
        assert_eq!(config.namespace, "databases");
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
    }
}
