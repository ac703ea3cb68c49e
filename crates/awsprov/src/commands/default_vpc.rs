//! `get-default-vpc`

use crate::aws::VpcOperations;
use crate::config::DefaultVpcConfig;
use anyhow::Result;

/// The default VPC's ID, failing when the region has none
pub async fn run<E: VpcOperations>(ec2: &E, config: &DefaultVpcConfig) -> Result<String> {
    match ec2.default_vpc_id().await? {
        Some(vpc_id) => Ok(vpc_id),
        None => anyhow::bail!("No default VPC in region {}", config.aws.region),
    }
}
