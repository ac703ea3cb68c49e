//! Dependency-ordered VPC teardown
//!
//! A VPC cannot be deleted while anything still references it. The stack
//! built by `create-vpc-if-not-exists` is removed in this order:
//!
//! 1. internet gateways tagged `<name>-ig`: detach, then delete; gateways
//!    with that tag that never got attached are deleted too
//! 2. subnets tagged `<name>-sn`
//! 3. every VPC endpoint in the VPC, in one call
//! 4. the VPC
//!
//! The main route table and the default security group go away with the
//! VPC, so neither is deleted explicitly.

use crate::aws::VpcOperations;
use anyhow::{Context, Result};
use awsprov_common::tags::{gateway_name, subnet_name};
use awsprov_common::ResourceKind;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// Deletion counts from one [`teardown_vpc`] run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub vpc_id: String,
    deleted: BTreeMap<ResourceKind, usize>,
}

impl TeardownReport {
    fn new(vpc_id: &str) -> Self {
        Self {
            vpc_id: vpc_id.to_string(),
            deleted: BTreeMap::new(),
        }
    }

    fn record(&mut self, kind: ResourceKind, count: usize) {
        *self.deleted.entry(kind).or_default() += count;
    }

    /// How many resources of `kind` were deleted
    pub fn deleted(&self, kind: ResourceKind) -> usize {
        self.deleted.get(&kind).copied().unwrap_or(0)
    }

    /// Total number of deleted resources, the VPC included
    pub fn total(&self) -> usize {
        self.deleted.values().sum()
    }
}

impl fmt::Display for TeardownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.deleted.iter().filter(|(_, n)| **n > 0).collect();
        kinds.sort_by_key(|(kind, _)| kind.vpc_teardown_priority());

        write!(f, "Deleted {}:", self.vpc_id)?;
        for (kind, count) in kinds {
            write!(f, " {} {}", count, kind)?;
        }
        Ok(())
    }
}

/// Delete a VPC and the resources the provisioning flow attached to it.
///
/// `name` is the stack's base `Name` tag. Any failure aborts the teardown;
/// resources deleted before it stay deleted.
pub async fn teardown_vpc<E: VpcOperations>(
    ec2: &E,
    vpc_id: &str,
    name: &str,
) -> Result<TeardownReport> {
    info!(vpc_id = %vpc_id, name = %name, "Tearing down VPC");
    let mut report = TeardownReport::new(vpc_id);

    let gateway_tag = gateway_name(name);
    let gateways = ec2.find_internet_gateways(vpc_id, &gateway_tag).await?;
    for gateway_id in &gateways {
        ec2.detach_internet_gateway(gateway_id, vpc_id).await?;
        ec2.delete_internet_gateway(gateway_id).await?;
    }
    report.record(ResourceKind::InternetGateway, gateways.len());

    let detached = ec2.find_detached_internet_gateways(&gateway_tag).await?;
    for gateway_id in &detached {
        ec2.delete_internet_gateway(gateway_id).await?;
    }
    report.record(ResourceKind::InternetGateway, detached.len());

    let subnets = ec2.find_subnets(vpc_id, &subnet_name(name)).await?;
    for subnet_id in &subnets {
        ec2.delete_subnet(subnet_id).await?;
    }
    report.record(ResourceKind::Subnet, subnets.len());

    let endpoints = ec2.find_vpc_endpoints(vpc_id).await?;
    let endpoint_count = endpoints.len();
    if endpoint_count > 0 {
        ec2.delete_vpc_endpoints(endpoints).await?;
    }
    report.record(ResourceKind::VpcEndpoint, endpoint_count);

    ec2.delete_vpc(vpc_id)
        .await
        .with_context(|| format!("Failed to tear down VPC {}", vpc_id))?;
    report.record(ResourceKind::Vpc, 1);

    info!(vpc_id = %vpc_id, deleted = report.total(), "VPC torn down");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::ec2::MockVpcOperations;
    use mockall::Sequence;

    #[tokio::test]
    async fn deletes_dependents_before_vpc() {
        let mut seq = Sequence::new();
        let mut ec2 = MockVpcOperations::new();

        ec2.expect_find_internet_gateways()
            .withf(|vpc, name| vpc == "vpc-1" && name == "demo-ig")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec!["igw-1".to_string()]));
        ec2.expect_detach_internet_gateway()
            .withf(|gw, vpc| gw == "igw-1" && vpc == "vpc-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        ec2.expect_delete_internet_gateway()
            .withf(|gw| gw == "igw-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        ec2.expect_find_detached_internet_gateways()
            .withf(|name| name == "demo-ig")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        ec2.expect_find_subnets()
            .withf(|vpc, name| vpc == "vpc-1" && name == "demo-sn")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec!["subnet-1".to_string()]));
        ec2.expect_delete_subnet()
            .withf(|id| id == "subnet-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        ec2.expect_find_vpc_endpoints()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec!["vpce-1".to_string()]));
        ec2.expect_delete_vpc_endpoints()
            .withf(|ids| ids == &vec!["vpce-1".to_string()])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        ec2.expect_delete_vpc()
            .withf(|vpc| vpc == "vpc-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let report = teardown_vpc(&ec2, "vpc-1", "demo").await.unwrap();
        assert_eq!(report.deleted(ResourceKind::InternetGateway), 1);
        assert_eq!(report.deleted(ResourceKind::Subnet), 1);
        assert_eq!(report.deleted(ResourceKind::VpcEndpoint), 1);
        assert_eq!(report.total(), 4);
        assert_eq!(
            report.to_string(),
            "Deleted vpc-1: 1 internet-gateway 1 subnet 1 vpc-endpoint 1 vpc"
        );
    }

    #[tokio::test]
    async fn no_endpoints_skips_batch_delete() {
        let mut ec2 = MockVpcOperations::new();
        ec2.expect_find_internet_gateways()
            .returning(|_, _| Ok(vec![]));
        ec2.expect_find_detached_internet_gateways()
            .returning(|_| Ok(vec![]));
        ec2.expect_find_subnets().returning(|_, _| Ok(vec![]));
        ec2.expect_find_vpc_endpoints().returning(|_| Ok(vec![]));
        ec2.expect_delete_vpc_endpoints().never();
        ec2.expect_delete_vpc().times(1).returning(|_| Ok(()));

        let report = teardown_vpc(&ec2, "vpc-1", "demo").await.unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(report.to_string(), "Deleted vpc-1: 1 vpc");
    }

    #[tokio::test]
    async fn unattached_gateway_is_deleted_without_detach() {
        let mut seq = Sequence::new();
        let mut ec2 = MockVpcOperations::new();
        ec2.expect_find_internet_gateways()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![]));
        ec2.expect_find_detached_internet_gateways()
            .withf(|name| name == "demo-ig")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec!["igw-orphan".to_string()]));
        ec2.expect_detach_internet_gateway().never();
        ec2.expect_delete_internet_gateway()
            .withf(|gw| gw == "igw-orphan")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        ec2.expect_find_subnets().returning(|_, _| Ok(vec![]));
        ec2.expect_find_vpc_endpoints().returning(|_| Ok(vec![]));
        ec2.expect_delete_vpc().times(1).returning(|_| Ok(()));

        let report = teardown_vpc(&ec2, "vpc-1", "demo").await.unwrap();
        assert_eq!(report.deleted(ResourceKind::InternetGateway), 1);
        assert_eq!(report.to_string(), "Deleted vpc-1: 1 internet-gateway 1 vpc");
    }

    #[tokio::test]
    async fn failure_stops_before_vpc_delete() {
        let mut ec2 = MockVpcOperations::new();
        ec2.expect_find_internet_gateways()
            .returning(|_, _| Ok(vec!["igw-1".to_string()]));
        ec2.expect_detach_internet_gateway()
            .returning(|_, _| Err(anyhow::anyhow!("Gateway.NotAttached")));
        ec2.expect_delete_internet_gateway().never();
        ec2.expect_find_subnets().never();
        ec2.expect_delete_vpc().never();

        let err = teardown_vpc(&ec2, "vpc-1", "demo").await.unwrap_err();
        assert!(err.to_string().contains("Gateway.NotAttached"));
    }
}
