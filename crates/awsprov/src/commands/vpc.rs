//! `create-vpc-if-not-exists`: a VPC with one public subnet and an S3
//! gateway endpoint.

use super::Outcome;
use crate::aws::VpcOperations;
use crate::config::VpcConfig;
use crate::ensure::{ensure, remove_existing, ManagedResource};
use crate::teardown::teardown_vpc;
use anyhow::{Context, Result};
use awsprov_common::defaults::{
    s3_endpoint_service, DEFAULT_ROUTE_CIDR, SUBNET_CIDR_BLOCK, VPC_CIDR_BLOCK,
};
use awsprov_common::tags::{gateway_name, route_table_name, subnet_name};
use awsprov_common::ResourceKind;
use std::fmt;
use tracing::info;

/// IDs making up one VPC stack.
///
/// Only `vpc_id` is known for a stack that already existed; the rest is
/// filled in when this run built it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcLayout {
    pub name: String,
    pub vpc_id: String,
    pub subnet_id: Option<String>,
    pub gateway_id: Option<String>,
    pub route_table_id: Option<String>,
    pub endpoint_id: Option<String>,
}

impl VpcLayout {
    fn existing(name: &str, vpc_id: String) -> Self {
        Self {
            name: name.to_string(),
            vpc_id,
            subnet_id: None,
            gateway_id: None,
            route_table_id: None,
            endpoint_id: None,
        }
    }
}

impl fmt::Display for VpcLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VPC {} ({})", self.name, self.vpc_id)?;
        let parts = [
            ("Subnet", &self.subnet_id),
            ("Internet gateway", &self.gateway_id),
            ("Route table", &self.route_table_id),
            ("S3 endpoint", &self.endpoint_id),
        ];
        for (label, id) in parts {
            if let Some(id) = id {
                write!(f, "\n  {:<17} {}", format!("{label}:"), id)?;
            }
        }
        Ok(())
    }
}

/// Endpoint policy letting anything in the VPC reach any S3 resource
fn allow_all_endpoint_policy() -> String {
    serde_json::json!({
        "Statement": [
            {
                "Action": "*",
                "Effect": "Allow",
                "Resource": "*",
                "Principal": "*"
            }
        ]
    })
    .to_string()
}

/// The VPC stack as a [`ManagedResource`], found by the VPC's `Name` tag
pub struct VpcStack<'a, E> {
    ec2: &'a E,
    name: &'a str,
    region: &'a str,
    availability_zone: &'a str,
}

impl<'a, E: VpcOperations> VpcStack<'a, E> {
    pub fn new(ec2: &'a E, config: &'a VpcConfig) -> Self {
        Self {
            ec2,
            name: &config.name,
            region: &config.aws.region,
            availability_zone: &config.availability_zone,
        }
    }
}

impl<E: VpcOperations> ManagedResource for VpcStack<'_, E> {
    type Descriptor = VpcLayout;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Vpc
    }

    fn name(&self) -> &str {
        self.name
    }

    async fn find(&self) -> Result<Vec<VpcLayout>> {
        let ids = self.ec2.find_vpcs(self.name).await?;
        Ok(ids
            .into_iter()
            .map(|id| VpcLayout::existing(self.name, id))
            .collect())
    }

    async fn remove(&self, existing: &[VpcLayout]) -> Result<()> {
        for layout in existing {
            let report = teardown_vpc(self.ec2, &layout.vpc_id, self.name).await?;
            info!("{}", report);
        }
        Ok(())
    }

    async fn create(&self) -> Result<VpcLayout> {
        let ec2 = self.ec2;
        let name = self.name;

        let vpc_id = ec2.create_vpc(VPC_CIDR_BLOCK, name).await?;

        let subnet_id = ec2
            .create_subnet(
                &vpc_id,
                self.availability_zone,
                SUBNET_CIDR_BLOCK,
                &subnet_name(name),
            )
            .await?;

        let gateway_id = ec2.create_internet_gateway(&gateway_name(name)).await?;
        ec2.attach_internet_gateway(&gateway_id, &vpc_id).await?;

        // AWS creates the main route table together with the VPC
        let route_table_id = ec2
            .find_route_tables(&vpc_id)
            .await?
            .into_iter()
            .next()
            .with_context(|| format!("VPC {} has no route table", vpc_id))?;
        ec2.tag_resource(&route_table_id, &route_table_name(name))
            .await?;

        ec2.create_route(&route_table_id, DEFAULT_ROUTE_CIDR, &gateway_id)
            .await?;

        let endpoint_id = ec2
            .create_vpc_endpoint(
                &vpc_id,
                &route_table_id,
                &s3_endpoint_service(self.region),
                &allow_all_endpoint_policy(),
            )
            .await?;

        info!(vpc_id = %vpc_id, "Everything is up");
        Ok(VpcLayout {
            name: name.to_string(),
            vpc_id,
            subnet_id: Some(subnet_id),
            gateway_id: Some(gateway_id),
            route_table_id: Some(route_table_id),
            endpoint_id: Some(endpoint_id),
        })
    }
}

/// Ensure the VPC stack named in `config` exists, or tear it down with
/// `destroy`
pub async fn run<E: VpcOperations>(ec2: &E, config: &VpcConfig) -> Result<Outcome<VpcLayout>> {
    let stack = VpcStack::new(ec2, config);

    if config.destroy {
        let removed = remove_existing(&stack).await?;
        return Ok(Outcome::Removed(removed));
    }

    Ok(Outcome::Ensured(ensure(&stack, config.clean).await?))
}
