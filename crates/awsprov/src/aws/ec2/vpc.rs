//! VPC, subnet, internet gateway, route table and endpoint calls

use super::{name_filter, name_tag_spec, vpc_filter, Ec2Client};
use crate::aws::error::ignore_not_found;
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{AccountAttributeName, Filter, ResourceType, Tag, VpcEndpointType};
use awsprov_common::tags::TAG_NAME;
use tracing::{debug, info};

impl Ec2Client {
    /// IDs of VPCs whose `Name` tag equals `name`
    pub async fn find_vpcs(&self, name: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_vpcs()
            .filters(name_filter(name))
            .send()
            .await
            .context("Failed to describe VPCs")?;

        let ids: Vec<String> = response
            .vpcs()
            .iter()
            .filter_map(|v| v.vpc_id())
            .map(str::to_string)
            .collect();
        debug!(name = %name, count = ids.len(), "Looked up VPCs by name");
        Ok(ids)
    }

    /// Create a VPC tagged `Name=name`
    pub async fn create_vpc(&self, cidr_block: &str, name: &str) -> Result<String> {
        let response = self
            .client
            .create_vpc()
            .cidr_block(cidr_block)
            .tag_specifications(name_tag_spec(ResourceType::Vpc, name))
            .send()
            .await
            .context("Failed to create VPC")?;

        let vpc_id = response
            .vpc()
            .and_then(|v| v.vpc_id())
            .context("No VPC ID in response")?
            .to_string();

        info!(vpc_id = %vpc_id, cidr = %cidr_block, "VPC created");
        Ok(vpc_id)
    }

    /// Create a subnet tagged `Name=name`
    pub async fn create_subnet(
        &self,
        vpc_id: &str,
        availability_zone: &str,
        cidr_block: &str,
        name: &str,
    ) -> Result<String> {
        let response = self
            .client
            .create_subnet()
            .vpc_id(vpc_id)
            .availability_zone(availability_zone)
            .cidr_block(cidr_block)
            .tag_specifications(name_tag_spec(ResourceType::Subnet, name))
            .send()
            .await
            .context("Failed to create subnet")?;

        let subnet_id = response
            .subnet()
            .and_then(|s| s.subnet_id())
            .context("No subnet ID in response")?
            .to_string();

        info!(subnet_id = %subnet_id, az = %availability_zone, "Subnet created");
        Ok(subnet_id)
    }

    /// Create an internet gateway tagged `Name=name`
    pub async fn create_internet_gateway(&self, name: &str) -> Result<String> {
        let response = self
            .client
            .create_internet_gateway()
            .tag_specifications(name_tag_spec(ResourceType::InternetGateway, name))
            .send()
            .await
            .context("Failed to create internet gateway")?;

        let gateway_id = response
            .internet_gateway()
            .and_then(|g| g.internet_gateway_id())
            .context("No internet gateway ID in response")?
            .to_string();

        info!(gateway_id = %gateway_id, "Internet gateway created");
        Ok(gateway_id)
    }

    /// Attach an internet gateway to a VPC
    pub async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        self.client
            .attach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .context("Failed to attach internet gateway")?;

        debug!(gateway_id = %gateway_id, vpc_id = %vpc_id, "Internet gateway attached");
        Ok(())
    }

    /// IDs of the route tables in a VPC
    pub async fn find_route_tables(&self, vpc_id: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_route_tables()
            .filters(vpc_filter(vpc_id))
            .send()
            .await
            .context("Failed to describe route tables")?;

        Ok(response
            .route_tables()
            .iter()
            .filter_map(|rt| rt.route_table_id())
            .map(str::to_string)
            .collect())
    }

    /// Set the `Name` tag on an existing resource
    pub async fn tag_resource(&self, resource_id: &str, name: &str) -> Result<()> {
        self.client
            .create_tags()
            .resources(resource_id)
            .tags(Tag::builder().key(TAG_NAME).value(name).build())
            .send()
            .await
            .with_context(|| format!("Failed to tag {}", resource_id))?;

        debug!(resource_id = %resource_id, name = %name, "Resource tagged");
        Ok(())
    }

    /// Add a route through an internet gateway
    pub async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<()> {
        self.client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .gateway_id(gateway_id)
            .send()
            .await
            .context("Failed to create route")?;

        info!(
            route_table_id = %route_table_id,
            destination = %destination_cidr,
            gateway_id = %gateway_id,
            "Route created"
        );
        Ok(())
    }

    /// Create a gateway VPC endpoint bound to one route table
    pub async fn create_vpc_endpoint(
        &self,
        vpc_id: &str,
        route_table_id: &str,
        service_name: &str,
        policy_document: &str,
    ) -> Result<String> {
        let response = self
            .client
            .create_vpc_endpoint()
            .vpc_id(vpc_id)
            .vpc_endpoint_type(VpcEndpointType::Gateway)
            .service_name(service_name)
            .route_table_ids(route_table_id)
            .policy_document(policy_document)
            .send()
            .await
            .context("Failed to create VPC endpoint")?;

        let endpoint_id = response
            .vpc_endpoint()
            .and_then(|e| e.vpc_endpoint_id())
            .context("No VPC endpoint ID in response")?
            .to_string();

        info!(endpoint_id = %endpoint_id, service = %service_name, "VPC endpoint created");
        Ok(endpoint_id)
    }

    /// Internet gateways tagged `Name=name` that are attached to the VPC
    pub async fn find_internet_gateways(&self, vpc_id: &str, name: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_internet_gateways()
            .filters(name_filter(name))
            .filters(
                Filter::builder()
                    .name("attachment.vpc-id")
                    .values(vpc_id)
                    .build(),
            )
            .send()
            .await
            .context("Failed to describe internet gateways")?;

        Ok(response
            .internet_gateways()
            .iter()
            .filter_map(|g| g.internet_gateway_id())
            .map(str::to_string)
            .collect())
    }

    /// Internet gateways tagged `Name=name` with no VPC attachment, such as
    /// one left behind when attaching it failed
    pub async fn find_detached_internet_gateways(&self, name: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_internet_gateways()
            .filters(name_filter(name))
            .send()
            .await
            .context("Failed to describe internet gateways")?;

        Ok(response
            .internet_gateways()
            .iter()
            .filter(|g| g.attachments().is_empty())
            .filter_map(|g| g.internet_gateway_id())
            .map(str::to_string)
            .collect())
    }

    /// Detach an internet gateway from a VPC
    pub async fn detach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        self.client
            .detach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .context("Failed to detach internet gateway")?;

        debug!(gateway_id = %gateway_id, vpc_id = %vpc_id, "Internet gateway detached");
        Ok(())
    }

    /// Delete an internet gateway
    ///
    /// Returns Ok(()) if the gateway is already gone.
    pub async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<()> {
        let result = self
            .client
            .delete_internet_gateway()
            .internet_gateway_id(gateway_id)
            .send()
            .await;

        match ignore_not_found(result).context("Failed to delete internet gateway")? {
            Some(_) => info!(gateway_id = %gateway_id, "Internet gateway deleted"),
            None => debug!(gateway_id = %gateway_id, "Internet gateway already deleted"),
        }
        Ok(())
    }

    /// Subnets tagged `Name=name` inside the VPC
    pub async fn find_subnets(&self, vpc_id: &str, name: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_subnets()
            .filters(name_filter(name))
            .filters(vpc_filter(vpc_id))
            .send()
            .await
            .context("Failed to describe subnets")?;

        Ok(response
            .subnets()
            .iter()
            .filter_map(|s| s.subnet_id())
            .map(str::to_string)
            .collect())
    }

    /// Delete a subnet
    ///
    /// Returns Ok(()) if the subnet is already gone.
    pub async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        let result = self.client.delete_subnet().subnet_id(subnet_id).send().await;

        match ignore_not_found(result).context("Failed to delete subnet")? {
            Some(_) => info!(subnet_id = %subnet_id, "Subnet deleted"),
            None => debug!(subnet_id = %subnet_id, "Subnet already deleted"),
        }
        Ok(())
    }

    /// All VPC endpoints in the VPC
    pub async fn find_vpc_endpoints(&self, vpc_id: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_vpc_endpoints()
            .filters(vpc_filter(vpc_id))
            .send()
            .await
            .context("Failed to describe VPC endpoints")?;

        Ok(response
            .vpc_endpoints()
            .iter()
            .filter_map(|e| e.vpc_endpoint_id())
            .map(str::to_string)
            .collect())
    }

    /// Delete VPC endpoints in a single call
    pub async fn delete_vpc_endpoints(&self, endpoint_ids: Vec<String>) -> Result<()> {
        if endpoint_ids.is_empty() {
            return Ok(());
        }

        let count = endpoint_ids.len();
        let response = self
            .client
            .delete_vpc_endpoints()
            .set_vpc_endpoint_ids(Some(endpoint_ids))
            .send()
            .await
            .context("Failed to delete VPC endpoints")?;

        // The call succeeds even when individual endpoints could not be deleted
        if let Some(failure) = response.unsuccessful().first() {
            let reason = failure
                .error()
                .and_then(|e| e.message())
                .unwrap_or("no reason given");
            anyhow::bail!(
                "Failed to delete VPC endpoint {}: {}",
                failure.resource_id().unwrap_or("unknown"),
                reason
            );
        }

        info!(count, "VPC endpoints deleted");
        Ok(())
    }

    /// Delete a VPC
    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        self.client
            .delete_vpc()
            .vpc_id(vpc_id)
            .send()
            .await
            .context("Failed to delete VPC")?;

        info!(vpc_id = %vpc_id, "VPC deleted");
        Ok(())
    }

    /// The account's default VPC, read from the `default-vpc` account attribute
    ///
    /// AWS reports the literal value `none` when the region has no default VPC.
    pub async fn default_vpc_id(&self) -> Result<Option<String>> {
        let response = self
            .client
            .describe_account_attributes()
            .attribute_names(AccountAttributeName::DefaultVpc)
            .send()
            .await
            .context("Failed to describe account attributes")?;

        let vpc_id = response
            .account_attributes()
            .iter()
            .filter(|attr| attr.attribute_name() == Some("default-vpc"))
            .flat_map(|attr| attr.attribute_values())
            .filter_map(|value| value.attribute_value())
            .find(|value| *value != "none")
            .map(str::to_string);

        debug!(default_vpc = ?vpc_id, "Read default-vpc account attribute");
        Ok(vpc_id)
    }
}
