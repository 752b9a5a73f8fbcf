use crate::error::{self, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_sdk_ec2::Region;
use aws_smithy_types::timeout::TimeoutConfig;
use log::info;
use snafu::OptionExt;
use std::time::Duration;

/// Upper bound on a single describe/authorize call so a stalled API
/// endpoint cannot hang the whole run. eksctl itself is not covered by
/// this; cluster creation legitimately takes much longer.
const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// The AWS service clients used by this crate, all scoped to one region.
#[derive(Debug, Clone)]
pub struct AwsClients {
    pub eks: aws_sdk_eks::Client,
    pub ec2: aws_sdk_ec2::Client,
}

impl AwsClients {
    pub async fn new(region: &str) -> Self {
        let region_provider = RegionProviderChain::first_try(Some(Region::new(region.to_string())));
        // Retries are disabled on purpose: every call is attempted exactly
        // once so a failure surfaces instead of being papered over.
        let shared_config = aws_config::from_env()
            .region(region_provider)
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(OPERATION_TIMEOUT)
                    .build(),
            )
            .load()
            .await;
        Self {
            eks: aws_sdk_eks::Client::new(&shared_config),
            ec2: aws_sdk_ec2::Client::new(&shared_config),
        }
    }
}

/// Pick the region for the run: an explicitly requested region wins,
/// otherwise the default AWS region provider chain (environment,
/// profile, instance metadata) is consulted. No hardcoded fallback;
/// an unresolvable region is an error.
pub async fn resolve_region(explicit: Option<String>) -> Result<String> {
    if let Some(region) = explicit {
        return Ok(region);
    }
    let region = RegionProviderChain::default_provider()
        .region()
        .await
        .context(error::MissingSnafu {
            what: "region",
            from: "the default AWS region provider chain",
        })?;
    info!("Using ambient region '{}'", region);
    Ok(region.to_string())
}
