//! AWS resource kinds and teardown ordering
//!
//! A VPC can only be deleted once nothing references it, so its dependents
//! are removed first. Lower priority numbers are torn down first.

use std::fmt;

/// Types of AWS resources managed by the utilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Internet gateway (detached, then deleted)
    InternetGateway,
    /// Subnet inside the VPC
    Subnet,
    /// Gateway VPC endpoint
    VpcEndpoint,
    /// The VPC itself
    Vpc,
    /// EC2 instance
    Ec2Instance,
    /// Security group
    SecurityGroup,
    /// IAM instance profile
    IamInstanceProfile,
    /// IAM role
    IamRole,
}

impl ResourceKind {
    /// Teardown priority inside a VPC (lower number = delete first)
    ///
    /// - 0: Internet gateways (must be detached before the VPC goes)
    /// - 1: Subnets
    /// - 2: VPC endpoints
    /// - 3: The VPC
    ///
    /// Kinds outside a VPC stack return `None`.
    pub fn vpc_teardown_priority(self) -> Option<u8> {
        match self {
            ResourceKind::InternetGateway => Some(0),
            ResourceKind::Subnet => Some(1),
            ResourceKind::VpcEndpoint => Some(2),
            ResourceKind::Vpc => Some(3),
            _ => None,
        }
    }

    /// Short lowercase name for logs and reports
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::InternetGateway => "internet-gateway",
            ResourceKind::Subnet => "subnet",
            ResourceKind::VpcEndpoint => "vpc-endpoint",
            ResourceKind::Vpc => "vpc",
            ResourceKind::Ec2Instance => "instance",
            ResourceKind::SecurityGroup => "security-group",
            ResourceKind::IamInstanceProfile => "instance-profile",
            ResourceKind::IamRole => "iam-role",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
