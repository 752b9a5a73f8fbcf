use aws_sdk_ec2::error::{DescribeSecurityGroupsError, DescribeSubnetsError};
use aws_sdk_ec2::types::SdkError;
use aws_sdk_eks::error::DescribeClusterError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[allow(clippy::large_enum_variant)]
pub enum Error {
    #[snafu(display("Failed to render the cluster config: {}", source))]
    ConfigSerialize { source: serde_yaml::Error },

    #[snafu(display("eksctl create cluster exited with status code {}", code))]
    CreateCluster { code: i32 },

    #[snafu(display("Unable to describe cluster '{}': {}", cluster_name, source))]
    DescribeCluster {
        cluster_name: String,
        source: SdkError<DescribeClusterError>,
    },

    #[snafu(display(
        "Unable to describe security groups of cluster '{}': {}",
        cluster_name,
        source
    ))]
    DescribeSecurityGroups {
        cluster_name: String,
        source: SdkError<DescribeSecurityGroupsError>,
    },

    #[snafu(display("Unable to describe subnets of cluster '{}': {}", cluster_name, source))]
    DescribeSubnets {
        cluster_name: String,
        source: SdkError<DescribeSubnetsError>,
    },

    #[snafu(display("Failed to run eksctl: {}", source))]
    EksctlSpawn { source: std::io::Error },

    #[snafu(display("Failed to write the cluster config to eksctl's stdin: {}", source))]
    EksctlStdin { source: std::io::Error },

    #[snafu(display("Failed to wait for eksctl to finish: {}", source))]
    EksctlWait { source: std::io::Error },

    #[snafu(display("{} was missing from {}", what, from))]
    Missing { what: String, from: String },

    #[snafu(display("{} of {} ingress rules could not be authorized", failed, total))]
    RuleApplication { failed: usize, total: usize },

    #[snafu(display("no security group found for cluster {} nodegroup", cluster_name))]
    SecurityGroupNotFound { cluster_name: String },
}

pub type Result<T> = std::result::Result<T, Error>;
