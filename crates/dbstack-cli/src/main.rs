use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use fluvio_future::task::run_block_on;
use semver::Version;
use tracing::debug;

use dbstack_cluster::{
    ClusterConfig, ClusterGateway, ClusterKind, ClusterManager, KubeCtl, KubeCtlConfig,
    OperatorInstaller,
};

fn main() -> Result<()> {
    fluvio_future::subscriber::init_tracer(None);
    let root = Root::parse();
    run_block_on(root.process())
}

/// Manage dbstack database clusters on Kubernetes
#[derive(Debug, Parser)]
#[command(name = "dbstack", version)]
struct Root {
    /// Kubernetes namespace holding the clusters
    #[arg(long, default_value = "default")]
    namespace: String,

    /// Explicit kubeconfig path handed to kubectl
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Parser)]
enum Cmd {
    /// Create a new database cluster
    Create(CreateOpt),

    /// Change the size of an existing cluster
    Update(UpdateOpt),

    /// Request deletion of a cluster
    Delete(DeleteOpt),

    /// List managed clusters, including those still deleting
    List,

    /// Print recent logs from every container of a cluster
    Logs(LogsOpt),

    /// Install or upgrade the operator for a cluster kind
    Operator(OperatorOpt),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Galera,
    Mongo,
}

impl From<KindArg> for ClusterKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Galera => ClusterKind::Galera,
            KindArg::Mongo => ClusterKind::MongoReplicaSet,
        }
    }
}

#[derive(Debug, Parser)]
struct CreateOpt {
    /// Cluster kind
    #[arg(value_enum)]
    kind: KindArg,

    /// Cluster name
    name: String,

    /// Node count for every data-bearing component
    #[arg(long, default_value_t = 3)]
    size: i32,

    /// Storage request per node, e.g. 10Gi
    #[arg(long)]
    storage: Option<String>,

    /// Public address to expose; also enables the metrics sidecar
    #[arg(long)]
    public_address: Option<String>,
}

#[derive(Debug, Parser)]
struct UpdateOpt {
    #[arg(value_enum)]
    kind: KindArg,
    name: String,

    /// New node count
    #[arg(long)]
    size: i32,
}

#[derive(Debug, Parser)]
struct DeleteOpt {
    #[arg(value_enum)]
    kind: KindArg,
    name: String,
}

#[derive(Debug, Parser)]
struct LogsOpt {
    /// Cluster name
    name: String,

    /// Cap on the total number of returned lines
    #[arg(long, default_value_t = 1000)]
    lines: usize,
}

#[derive(Debug, Parser)]
struct OperatorOpt {
    #[arg(value_enum)]
    kind: KindArg,

    /// Operator version to install or upgrade to
    version: Version,

    /// Override the operator bundle URL template
    #[arg(long)]
    manifest_url_template: Option<String>,
}

impl Root {
    async fn process(self) -> Result<()> {
        let mut config = KubeCtlConfig::builder();
        config.namespace(&self.namespace);
        if let Some(kubeconfig) = &self.kubeconfig {
            config.kubeconfig(kubeconfig.clone());
        }
        let kubectl = KubeCtl::from_config(config.build()?)?;
        let gateway = ClusterGateway::new(kubectl);
        let manager = ClusterManager::new(gateway.clone());

        match self.cmd {
            Cmd::Create(opt) => {
                let kind: ClusterKind = opt.kind.into();
                let mut config = ClusterConfig::builder();
                config.name(&opt.name).size(opt.size);
                if let Some(storage) = &opt.storage {
                    config.storage(storage);
                }
                if let Some(address) = &opt.public_address {
                    config.public_address(address);
                }
                manager.create_cluster(kind, &config.build()?).await?;
                println!("created {kind} {:?}", opt.name);
            }
            Cmd::Update(opt) => {
                let kind: ClusterKind = opt.kind.into();
                manager.update_cluster(kind, &opt.name, opt.size).await?;
                println!("updated {kind} {:?} to size {}", opt.name, opt.size);
            }
            Cmd::Delete(opt) => {
                let kind: ClusterKind = opt.kind.into();
                match manager.delete_cluster(kind, &opt.name).await {
                    Ok(()) => println!("deletion of {kind} {:?} requested", opt.name),
                    Err(err) if err.is_not_found() => {
                        debug!(%err, "nothing to delete");
                        println!("{kind} {:?} not found, nothing to delete", opt.name);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Cmd::List => {
                let clusters = manager.list_clusters().await?;
                println!("{:<24} {:<16} {:>5}  {}", "NAME", "KIND", "SIZE", "STATUS");
                for cluster in clusters {
                    println!(
                        "{:<24} {:<16} {:>5}  {}",
                        cluster.name, cluster.kind, cluster.size, cluster.status
                    );
                }
            }
            Cmd::Logs(opt) => {
                let streams = manager.logs(&opt.name, opt.lines).await?;
                for stream in streams {
                    println!("==> {}/{} <==", stream.pod, stream.container);
                    for line in stream.lines {
                        println!("{line}");
                    }
                }
            }
            Cmd::Operator(opt) => {
                let kind: ClusterKind = opt.kind.into();
                let mut installer = OperatorInstaller::new(gateway);
                if let Some(template) = opt.manifest_url_template {
                    installer = installer.with_manifest_url_template(template);
                }
                installer.install_or_upgrade(kind, &opt.version).await?;
                println!("operator for {kind} is at version {}", opt.version);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {

    use clap::Parser;

    use super::Root;

    fn parse_succeeds(command: &str) -> bool {
        Root::try_parse_from(command.split_whitespace()).is_ok()
    }

    #[test]
    fn test_command_parsing() {
        let should_succeed = [
            "dbstack list",
            "dbstack create galera primary --size 3",
            "dbstack create mongo documents --storage 10Gi",
            "dbstack update galera primary --size 5",
            "dbstack delete mongo documents",
            "dbstack logs primary --lines 200",
            "dbstack operator galera 1.4.0",
            "dbstack --namespace databases list",
        ];
        for command in should_succeed {
            assert!(parse_succeeds(command), "{command}");
        }

        let should_fail = [
            "dbstack",
            "dbstack create primary",
            "dbstack create redis primary",
            "dbstack operator galera not-a-version",
            "dbstack update galera primary",
        ];
        for command in should_fail {
            assert!(!parse_succeeds(command), "{command}");
        }
    }
}
