//! Default configuration values shared by all utilities

use std::time::Duration;

/// Default AWS region for every utility
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// Default `Name` tag of the VPC stack
pub const DEFAULT_VPC_NAME: &str = "awsprov-vpc";

/// Default `Name` tag of launched instances
pub const DEFAULT_INSTANCE_NAME: &str = "awsprov-instance";

/// Default EC2 instance type
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";

/// Default security group name
pub const DEFAULT_SECURITY_GROUP_NAME: &str = "awsprov-sg";

/// Default security group description
pub const DEFAULT_SECURITY_GROUP_DESCRIPTION: &str = "awsprov security group";

/// Default IAM role (and instance profile) name
pub const DEFAULT_ROLE_NAME: &str = "awsprov-role";

/// CIDR block of a freshly created VPC
pub const VPC_CIDR_BLOCK: &str = "10.0.0.0/24";

/// CIDR block of the subnet carved out of [`VPC_CIDR_BLOCK`]
pub const SUBNET_CIDR_BLOCK: &str = "10.0.0.0/28";

/// Destination of the default route through the internet gateway
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Source range of the SSH ingress rule
pub const SSH_INGRESS_CIDR: &str = "0.0.0.0/0";

/// SSH port
pub const SSH_PORT: i32 = 22;

/// Login user of Amazon Linux AMIs, used in the SSH hint
pub const DEFAULT_SSH_USER: &str = "ec2-user";

/// Managed policy attached to new roles when none are given
pub const S3_FULL_ACCESS_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonS3FullAccess";

/// First sleep while polling for an asynchronously populated attribute
pub const POLL_INITIAL_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on a single poll sleep; the next doubling past this fails
pub const POLL_MAX_DELAY: Duration = Duration::from_secs(60);

/// Availability zone used when none is given: the region's "a" zone
pub fn default_availability_zone(region: &str) -> String {
    format!("{region}a")
}

/// Service name of the S3 gateway endpoint in a region
pub fn s3_endpoint_service(region: &str) -> String {
    format!("com.amazonaws.{region}.s3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_zone_uses_a_suffix() {
        assert_eq!(default_availability_zone("ap-northeast-1"), "ap-northeast-1a");
    }

    #[test]
    fn s3_service_name_is_regional() {
        assert_eq!(s3_endpoint_service("us-west-2"), "com.amazonaws.us-west-2.s3");
    }

    #[test]
    fn poll_bound_allows_doubling_from_initial() {
        assert!(POLL_INITIAL_DELAY < POLL_MAX_DELAY);
    }
}
