use crate::aws::AwsClients;
use crate::error::{self, Result};
use aws_sdk_ec2::model::Filter;
use aws_sdk_eks::model::VpcConfigResponse;
use log::debug;
use snafu::{OptionExt, ResultExt};

/// A subnet belonging to an existing cluster. Read-only: instances are
/// only ever built from EC2 describe responses and re-projected into
/// the cluster config or into CIDR lists for ingress rules.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubnetRef {
    pub id: String,
    pub availability_zone: Option<String>,
    pub cidr_block: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubnetClass {
    Private,
    Public,
}

impl SubnetClass {
    /// The `tag:Name` glob eksctl stamps on the subnets it creates.
    fn name_tag(&self, cluster_name: &str) -> String {
        let class = match self {
            SubnetClass::Private => "Private",
            SubnetClass::Public => "Public",
        };
        format!("eksctl-{}-cluster/*{}*", cluster_name, class)
    }
}

/// Look up the subnets of `cluster_name` that belong to the given class.
/// The cluster's subnet-id list comes from EKS; the class split comes
/// from the `tag:Name` convention eksctl applies to the subnets.
pub async fn cluster_subnets(
    clients: &AwsClients,
    cluster_name: &str,
    class: SubnetClass,
) -> Result<Vec<SubnetRef>> {
    let subnet_ids = resources_vpc_config(clients, cluster_name)
        .await?
        .subnet_ids
        .context(error::MissingSnafu {
            what: "subnet ids",
            from: "describe-cluster response",
        })?;

    let describe_results = clients
        .ec2
        .describe_subnets()
        .set_subnet_ids(Some(subnet_ids))
        .filters(
            Filter::builder()
                .name("tag:Name")
                .values(class.name_tag(cluster_name))
                .build(),
        )
        .send()
        .await
        .context(error::DescribeSubnetsSnafu { cluster_name })?;

    let subnets: Vec<SubnetRef> = describe_results
        .subnets
        .unwrap_or_default()
        .into_iter()
        .map(|subnet| {
            Ok(SubnetRef {
                id: subnet.subnet_id.context(error::MissingSnafu {
                    what: "subnet id",
                    from: "describe-subnets response",
                })?,
                availability_zone: subnet.availability_zone,
                cidr_block: subnet.cidr_block.context(error::MissingSnafu {
                    what: "subnet cidr block",
                    from: "describe-subnets response",
                })?,
            })
        })
        .collect::<Result<_>>()?;
    debug!(
        "Cluster '{}' {:?} subnets: {:?}",
        cluster_name, class, subnets
    );
    Ok(subnets)
}

/// The id of the VPC the cluster was created in.
pub async fn cluster_vpc_id(clients: &AwsClients, cluster_name: &str) -> Result<String> {
    resources_vpc_config(clients, cluster_name)
        .await?
        .vpc_id
        .context(error::MissingSnafu {
            what: "vpc id",
            from: "describe-cluster response",
        })
}

/// Project subnets to their CIDR blocks, preserving order.
pub fn subnet_cidrs(subnets: &[SubnetRef]) -> Vec<String> {
    subnets
        .iter()
        .map(|subnet| subnet.cidr_block.clone())
        .collect()
}

async fn resources_vpc_config(
    clients: &AwsClients,
    cluster_name: &str,
) -> Result<VpcConfigResponse> {
    let describe_results = clients
        .eks
        .describe_cluster()
        .name(cluster_name)
        .send()
        .await
        .context(error::DescribeClusterSnafu { cluster_name })?;

    describe_results
        .cluster
        .and_then(|cluster| cluster.resources_vpc_config)
        .context(error::MissingSnafu {
            what: "resources_vpc_config",
            from: "describe-cluster response",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subnet_class_name_tags() {
        assert_eq!(
            SubnetClass::Private.name_tag("demo"),
            "eksctl-demo-cluster/*Private*"
        );
        assert_eq!(
            SubnetClass::Public.name_tag("demo"),
            "eksctl-demo-cluster/*Public*"
        );
    }

    #[test]
    fn subnet_cidrs_preserve_order() {
        let subnets = vec![
            SubnetRef {
                id: "subnet-b".to_string(),
                availability_zone: Some("us-east-1b".to_string()),
                cidr_block: "10.0.2.0/24".to_string(),
            },
            SubnetRef {
                id: "subnet-a".to_string(),
                availability_zone: Some("us-east-1a".to_string()),
                cidr_block: "10.0.1.0/24".to_string(),
            },
        ];
        assert_eq!(subnet_cidrs(&subnets), vec!["10.0.2.0/24", "10.0.1.0/24"]);
    }
}
