/*!

`memberctl` creates an EKS member cluster with eksctl and, optionally,
opens network reachability between it and a pre-existing reference
cluster that shares its VPC.

!*/

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{warn, LevelFilter};
use provision::aws::{self, AwsClients};
use provision::cluster::{self, SubnetClass, SubnetRef};
use provision::{config, eksctl, security_group};

/// The CIDR block used for the cluster's VPC when the caller does not
/// provide one.
const DEFAULT_CIDR_BLOCK: &str = "192.168.0.0/16";

/// Create an EKS member cluster, optionally reusing a reference cluster's VPC.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,

    /// Name of the member cluster to create.
    #[clap(long)]
    name: String,

    /// Region for the member cluster. Defaults to the ambient AWS region.
    #[clap(long)]
    region: Option<String>,

    /// Name of a reference cluster. The member cluster is created in the
    /// reference cluster's VPC.
    #[clap(long = "ref")]
    reference: Option<String>,

    /// CIDR block for the member cluster's VPC.
    #[clap(long)]
    cidr: Option<String>,

    /// Print the generated cluster config instead of creating anything.
    #[clap(long)]
    test: bool,

    /// Open security-group ingress to the member cluster's node group
    /// from the private and public subnets.
    #[clap(long = "open-sg")]
    open_sg: bool,

    /// Path to a public ssh key. If provided, ssh access to the nodes is
    /// enabled with this key.
    #[clap(long = "public-key-path")]
    public_key_path: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let region = aws::resolve_region(args.region.clone())
        .await
        .context("Unable to determine a region for the cluster")?;
    let cidr = args
        .cidr
        .clone()
        .unwrap_or_else(|| DEFAULT_CIDR_BLOCK.to_string());

    let clients = AwsClients::new(&region).await;
    let mut private_subnets: Vec<SubnetRef> = Vec::new();
    let mut public_subnets: Vec<SubnetRef> = Vec::new();
    let mut vpc_id = None;
    if let Some(reference) = &args.reference {
        private_subnets = cluster::cluster_subnets(&clients, reference, SubnetClass::Private)
            .await
            .context(format!(
                "Unable to look up private subnets of reference cluster '{}'",
                reference
            ))?;
        public_subnets = cluster::cluster_subnets(&clients, reference, SubnetClass::Public)
            .await
            .context(format!(
                "Unable to look up public subnets of reference cluster '{}'",
                reference
            ))?;
        vpc_id = Some(
            cluster::cluster_vpc_id(&clients, reference)
                .await
                .context(format!(
                    "Unable to look up the VPC of reference cluster '{}'",
                    reference
                ))?,
        );
        if private_subnets.is_empty() || public_subnets.is_empty() {
            warn!(
                "Reference cluster '{}' is missing private or public subnets; \
                 '{}' will get a dedicated VPC instead of reusing '{}'",
                reference,
                args.name,
                vpc_id.as_deref().unwrap_or_default()
            );
        }
    }

    let config = config::cluster_config(
        &args.name,
        &region,
        &cidr,
        vpc_id.as_deref(),
        &private_subnets,
        &public_subnets,
        args.public_key_path.as_deref(),
    );

    if args.test {
        println!(
            "{}",
            config
                .to_yaml()
                .context("Unable to render the cluster config")?
        );
        return Ok(());
    }

    eksctl::create_cluster(&config)
        .context(format!("Unable to create cluster '{}'", args.name))?;

    if args.reference.is_none() {
        // Without a reference cluster, the freshly created cluster's own
        // subnets feed the ingress rules.
        private_subnets = cluster::cluster_subnets(&clients, &args.name, SubnetClass::Private)
            .await
            .context(format!(
                "Unable to look up private subnets of cluster '{}'",
                args.name
            ))?;
        public_subnets = cluster::cluster_subnets(&clients, &args.name, SubnetClass::Public)
            .await
            .context(format!(
                "Unable to look up public subnets of cluster '{}'",
                args.name
            ))?;
    }

    if args.open_sg {
        security_group::open_security_groups(
            &clients,
            &args.name,
            &cluster::subnet_cidrs(&private_subnets),
            &cluster::subnet_cidrs(&public_subnets),
        )
        .await
        .context(format!(
            "Unable to open security groups for cluster '{}'",
            args.name
        ))?;
    }

    Ok(())
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for our crates only.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("provision"), level)
                .init();
        }
    }
}
