use crate::cluster::SubnetRef;
use crate::error::{self, Result};
use serde::Serialize;
use snafu::ResultExt;
use std::collections::BTreeMap;

const API_VERSION: &str = "eksctl.io/v1alpha5";
const KIND: &str = "ClusterConfig";

/// Fixed node group shape for member clusters.
const NODE_GROUP_NAME: &str = "member-ng";
const NODE_GROUP_SIZE: i32 = 2;
const MAX_SPOT_PRICE: f64 = 0.093;
const INSTANCE_TYPES: [&str; 2] = ["t3a.large", "t3.large"];

/// The cluster configuration document handed to eksctl. Built once per
/// invocation by [`cluster_config`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub vpc: VpcConfig,
    pub node_groups: Vec<NodeGroup>,
}

impl ClusterConfig {
    /// Render the document for inspection or for piping to eksctl.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context(error::ConfigSerializeSnafu)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub name: String,
    pub region: String,
}

/// Either attach to a reference cluster's VPC or let eksctl create a
/// dedicated one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VpcConfig {
    Reused(ReusedVpc),
    Dedicated(DedicatedVpc),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReusedVpc {
    pub cidr: String,
    pub id: String,
    pub subnets: SubnetTopology,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetTopology {
    pub private: BTreeMap<String, SubnetSpec>,
    pub public: BTreeMap<String, SubnetSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetSpec {
    pub id: String,
    pub cidr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedicatedVpc {
    pub cidr: String,
    pub nat: NatGateway,
    pub cluster_endpoints: EndpointAccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NatGateway {
    pub gateway: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointAccess {
    pub public_access: bool,
    pub private_access: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroup {
    pub name: String,
    pub min_size: i32,
    pub max_size: i32,
    pub instances_distribution: InstancesDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh: Option<Ssh>,
    pub iam: Iam,
}

/// Spot/on-demand capacity mix for the node group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancesDistribution {
    pub max_price: f64,
    pub instance_types: Vec<String>,
    pub on_demand_base_capacity: i32,
    pub on_demand_percentage_above_base_capacity: i32,
    pub spot_instance_pools: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ssh {
    pub public_key_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Iam {
    pub with_addon_policies: AddonPolicies,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonPolicies {
    #[serde(rename = "externalDNS")]
    pub external_dns: bool,
}

/// Build the cluster config for a member cluster. Pure; performs no I/O.
///
/// The reused-vpc branch needs the reference VPC id and both subnet
/// classes at once; anything less gets a dedicated VPC. Callers that
/// looked up a reference cluster should warn when they hit the
/// fallback with partial data.
pub fn cluster_config(
    name: &str,
    region: &str,
    cidr: &str,
    ref_vpc_id: Option<&str>,
    ref_private_subnets: &[SubnetRef],
    ref_public_subnets: &[SubnetRef],
    ssh_public_key_path: Option<&str>,
) -> ClusterConfig {
    let vpc = match ref_vpc_id {
        Some(vpc_id) if !ref_private_subnets.is_empty() && !ref_public_subnets.is_empty() => {
            VpcConfig::Reused(ReusedVpc {
                cidr: cidr.to_string(),
                id: vpc_id.to_string(),
                subnets: SubnetTopology {
                    private: consolidate(ref_private_subnets),
                    public: consolidate(ref_public_subnets),
                },
            })
        }
        _ => VpcConfig::Dedicated(DedicatedVpc {
            cidr: cidr.to_string(),
            nat: NatGateway {
                gateway: "Single".to_string(),
            },
            cluster_endpoints: EndpointAccess {
                public_access: true,
                private_access: true,
            },
        }),
    };

    ClusterConfig {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        metadata: Metadata {
            name: name.to_string(),
            region: region.to_string(),
        },
        vpc,
        node_groups: vec![NodeGroup {
            name: NODE_GROUP_NAME.to_string(),
            min_size: NODE_GROUP_SIZE,
            max_size: NODE_GROUP_SIZE,
            instances_distribution: InstancesDistribution {
                max_price: MAX_SPOT_PRICE,
                instance_types: INSTANCE_TYPES.iter().map(|t| t.to_string()).collect(),
                on_demand_base_capacity: 0,
                on_demand_percentage_above_base_capacity: 50,
                spot_instance_pools: 2,
            },
            ssh: ssh_public_key_path
                .filter(|path| !path.is_empty())
                .map(|path| Ssh {
                    public_key_path: path.to_string(),
                }),
            iam: Iam {
                with_addon_policies: AddonPolicies { external_dns: true },
            },
        }],
    }
}

/// Consolidate a subnet list into eksctl's availability-zone-keyed map.
/// A subnet without an availability zone keeps its entry under its own id.
fn consolidate(subnets: &[SubnetRef]) -> BTreeMap<String, SubnetSpec> {
    subnets
        .iter()
        .map(|subnet| {
            (
                subnet
                    .availability_zone
                    .clone()
                    .unwrap_or_else(|| subnet.id.clone()),
                SubnetSpec {
                    id: subnet.id.clone(),
                    cidr: subnet.cidr_block.clone(),
                },
            )
        })
        .collect()
}
