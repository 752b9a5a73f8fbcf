use crate::aws::AwsClients;
use crate::error::{self, Result};
use aws_sdk_ec2::error::AuthorizeSecurityGroupIngressError;
use aws_sdk_ec2::model::{Filter, IpPermission, IpRange, SecurityGroup};
use aws_sdk_ec2::types::SdkError;
use log::{debug, error, info};
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt;

/// Port ranges opened for traffic from public subnets. Port 3389 (RDP)
/// is deliberately left out of both ranges; this is fixed policy, not
/// configuration.
const PUBLIC_PORT_RANGES: [(i32, i32); 2] = [(1025, 3388), (3390, 65535)];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Protocol {
    Tcp,
    Udp,
    /// All protocols, `-1` on the wire.
    All,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::All => "-1",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingress authorization to submit. Ephemeral; planned, applied,
/// never persisted.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IngressRule {
    pub group_id: String,
    pub protocol: Protocol,
    /// Inclusive port range; `None` opens every port.
    pub port_range: Option<(i32, i32)>,
    pub cidr: String,
}

impl fmt::Display for IngressRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port_range {
            Some((from, to)) => write!(
                f,
                "{} {}-{} from {} on {}",
                self.protocol, from, to, self.cidr, self.group_id
            ),
            None => write!(
                f,
                "{} all ports from {} on {}",
                self.protocol, self.cidr, self.group_id
            ),
        }
    }
}

/// Derive the full rule set for a cluster's node group security group:
/// restricted tcp/udp ranges for each public subnet CIDR, everything
/// open for each private subnet CIDR. Pure; the rules are applied by
/// [`open_security_groups`].
pub fn plan_ingress_rules(
    group_id: &str,
    private_cidrs: &[String],
    public_cidrs: &[String],
) -> Vec<IngressRule> {
    let mut rules = Vec::with_capacity(public_cidrs.len() * 4 + private_cidrs.len());
    for cidr in public_cidrs {
        for protocol in [Protocol::Tcp, Protocol::Udp] {
            for port_range in PUBLIC_PORT_RANGES {
                rules.push(IngressRule {
                    group_id: group_id.to_string(),
                    protocol,
                    port_range: Some(port_range),
                    cidr: cidr.clone(),
                });
            }
        }
    }
    for cidr in private_cidrs {
        // Private subnets are already network-isolated; intra-VPC
        // traffic is trusted wholesale.
        rules.push(IngressRule {
            group_id: group_id.to_string(),
            protocol: Protocol::All,
            port_range: None,
            cidr: cidr.clone(),
        });
    }
    rules
}

/// Open ingress on the cluster's node group security group for the
/// given subnet CIDRs. Rules are applied one at a time; a rule that
/// fails to apply is logged and counted but does not stop the rest.
/// If any rule failed, a summarizing error is returned after all of
/// them were attempted.
pub async fn open_security_groups(
    clients: &AwsClients,
    cluster_name: &str,
    private_cidrs: &[String],
    public_cidrs: &[String],
) -> Result<()> {
    info!(
        "Looking up the node group security group of cluster '{}'",
        cluster_name
    );
    let describe_results = clients
        .ec2
        .describe_security_groups()
        .filters(
            Filter::builder()
                .name("tag:aws:cloudformation:logical-id")
                .values("SG")
                .build(),
        )
        .filters(
            Filter::builder()
                .name("tag:alpha.eksctl.io/cluster-name")
                .values(cluster_name)
                .build(),
        )
        .send()
        .await
        .context(error::DescribeSecurityGroupsSnafu { cluster_name })?;

    let group_id = node_group_security_group(
        describe_results.security_groups.unwrap_or_default(),
        cluster_name,
    )?;

    let rules = plan_ingress_rules(&group_id, private_cidrs, public_cidrs);
    let total = rules.len();
    let mut failed: usize = 0;
    for rule in &rules {
        info!("Authorizing ingress: {}", rule);
        if let Err(e) = authorize_ingress(clients, rule).await {
            error!("Failed to authorize ingress ({}): {}", rule, e);
            failed += 1;
        }
    }
    ensure!(failed == 0, error::RuleApplicationSnafu { failed, total });
    info!(
        "Authorized {} ingress rules on security group '{}'",
        total, group_id
    );
    Ok(())
}

/// Pick the node group security group from a describe result. Zero
/// matches is an error; more than one match is tolerated and the first
/// is used.
fn node_group_security_group(groups: Vec<SecurityGroup>, cluster_name: &str) -> Result<String> {
    let mut group_ids = groups.into_iter().filter_map(|group| group.group_id);
    let group_id = group_ids
        .next()
        .context(error::SecurityGroupNotFoundSnafu { cluster_name })?;
    let extra_matches = group_ids.count();
    if extra_matches > 0 {
        debug!(
            "{} additional security groups matched for cluster '{}'; using '{}'",
            extra_matches, cluster_name, group_id
        );
    }
    Ok(group_id)
}

async fn authorize_ingress(
    clients: &AwsClients,
    rule: &IngressRule,
) -> std::result::Result<(), SdkError<AuthorizeSecurityGroupIngressError>> {
    let mut permission = IpPermission::builder()
        .ip_protocol(rule.protocol.as_str())
        .ip_ranges(IpRange::builder().cidr_ip(&rule.cidr).build());
    if let Some((from_port, to_port)) = rule.port_range {
        permission = permission.from_port(from_port).to_port(to_port);
    }
    clients
        .ec2
        .authorize_security_group_ingress()
        .group_id(&rule.group_id)
        .ip_permissions(permission.build())
        .send()
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidrs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn four_rules_per_public_cidr() {
        let public = cidrs(&["10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]);
        let rules = plan_ingress_rules("sg-1", &[], &public);
        assert_eq!(rules.len(), 12);
        for rule in &rules {
            let (from, to) = rule.port_range.expect("public rules have a port range");
            assert!(
                to < 3389 || from > 3389,
                "rule {} must not include port 3389",
                rule
            );
            assert!(matches!(rule.protocol, Protocol::Tcp | Protocol::Udp));
        }
    }

    #[test]
    fn one_open_rule_per_private_cidr() {
        let private = cidrs(&["10.0.1.0/24", "10.0.2.0/24"]);
        let rules = plan_ingress_rules("sg-1", &private, &[]);
        assert_eq!(rules.len(), 2);
        for rule in &rules {
            assert_eq!(rule.protocol, Protocol::All);
            assert_eq!(rule.port_range, None);
        }
    }

    #[test]
    fn worked_example_rule_order() {
        let rules = plan_ingress_rules("sg-1", &cidrs(&["10.0.1.0/24"]), &cidrs(&["10.0.2.0/24"]));
        let expected: Vec<(Protocol, Option<(i32, i32)>, &str)> = vec![
            (Protocol::Tcp, Some((1025, 3388)), "10.0.2.0/24"),
            (Protocol::Tcp, Some((3390, 65535)), "10.0.2.0/24"),
            (Protocol::Udp, Some((1025, 3388)), "10.0.2.0/24"),
            (Protocol::Udp, Some((3390, 65535)), "10.0.2.0/24"),
            (Protocol::All, None, "10.0.1.0/24"),
        ];
        assert_eq!(rules.len(), expected.len());
        for (rule, (protocol, port_range, cidr)) in rules.iter().zip(expected) {
            assert_eq!(rule.group_id, "sg-1");
            assert_eq!(rule.protocol, protocol);
            assert_eq!(rule.port_range, port_range);
            assert_eq!(rule.cidr, cidr);
        }
    }

    #[test]
    fn empty_subnet_lists_plan_nothing() {
        assert!(plan_ingress_rules("sg-1", &[], &[]).is_empty());
    }

    #[test]
    fn missing_security_group_is_an_error() {
        let err = node_group_security_group(Vec::new(), "demo").unwrap_err();
        assert_eq!(
            err.to_string(),
            "no security group found for cluster demo nodegroup"
        );
    }

    #[test]
    fn first_security_group_wins() {
        let groups = vec![
            SecurityGroup::builder().group_id("sg-1").build(),
            SecurityGroup::builder().group_id("sg-2").build(),
        ];
        assert_eq!(node_group_security_group(groups, "demo").unwrap(), "sg-1");
    }

    #[test]
    fn failed_rule_count_is_surfaced() {
        let rules = plan_ingress_rules("sg-1", &cidrs(&["10.0.1.0/24"]), &cidrs(&["10.0.2.0/24"]));
        let err = crate::error::RuleApplicationSnafu {
            failed: 2usize,
            total: rules.len(),
        }
        .build();
        assert_eq!(
            err.to_string(),
            "2 of 5 ingress rules could not be authorized"
        );
    }

    #[test]
    fn wire_representation_of_protocols() {
        assert_eq!(Protocol::Tcp.as_str(), "tcp");
        assert_eq!(Protocol::Udp.as_str(), "udp");
        assert_eq!(Protocol::All.as_str(), "-1");
    }
}
