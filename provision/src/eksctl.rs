use crate::config::ClusterConfig;
use crate::error::{self, Result};
use log::info;
use snafu::{ensure, OptionExt, ResultExt};
use std::io::Write;
use std::process::{Command, Stdio};

/// Submit the cluster config to `eksctl create cluster` over stdin and
/// wait for it to finish. eksctl's own output goes straight to our
/// stdout/stderr. A non-zero exit is fatal; nothing downstream of
/// cluster creation should run after this fails.
pub fn create_cluster(config: &ClusterConfig) -> Result<()> {
    let document = config.to_yaml()?;

    info!("Creating cluster '{}' with eksctl", config.metadata.name);
    let mut child = Command::new("eksctl")
        .args(["create", "cluster", "-f", "-"])
        .stdin(Stdio::piped())
        .spawn()
        .context(error::EksctlSpawnSnafu)?;

    // Take stdin so it is dropped (EOF) before we wait on the child.
    child
        .stdin
        .take()
        .context(error::MissingSnafu {
            what: "stdin handle",
            from: "the eksctl child process",
        })?
        .write_all(document.as_bytes())
        .context(error::EksctlStdinSnafu)?;

    let status = child.wait().context(error::EksctlWaitSnafu)?;
    ensure!(
        status.success(),
        error::CreateClusterSnafu {
            code: status.code().unwrap_or(-1)
        }
    );

    info!("Done creating cluster '{}'", config.metadata.name);
    Ok(())
}
