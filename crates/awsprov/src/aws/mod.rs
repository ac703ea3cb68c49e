//! AWS client modules
//!
//! This module provides wrappers around AWS SDK clients for:
//! - EC2: VPC stacks, instances and security groups
//! - IAM: Roles and instance profiles

pub mod context;
pub mod ec2;
pub mod error;
pub mod iam;

pub use context::{AwsContext, FromAwsContext};
pub use ec2::{
    Ec2Client, InstanceOperations, LaunchInstanceConfig, LaunchedInstance, SecurityGroupOperations,
    SecurityGroupSummary, VpcOperations,
};
pub use error::{AwsError, classify_anyhow_error, classify_aws_error, ignore_not_found};
pub use iam::{IamClient, IamOperations, InstanceProfileSummary, EC2_ASSUME_ROLE_POLICY};
