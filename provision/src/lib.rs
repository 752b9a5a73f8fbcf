/*!

`provision` holds the decision logic behind `memberctl`: synthesizing
the eksctl cluster config for a member cluster, looking up the network
resources of existing clusters, opening the security-group ingress two
clusters sharing a VPC need to reach each other, and driving eksctl
itself.

The pure pieces (`config::cluster_config`,
`security_group::plan_ingress_rules`) are kept free of I/O so they can
be tested without AWS.

!*/

pub mod aws;
pub mod cluster;
pub mod config;
pub mod eksctl;
mod error;
pub mod security_group;

pub use error::{Error, Result};
