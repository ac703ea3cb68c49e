//! EC2 capability traits
//!
//! These traits abstract the EC2 calls each utility actually makes so that
//! the provisioning logic can be tested against mocks or the in-memory fake
//! instead of real AWS. `Ec2Client` implements all of them.
//!
//! Note: list parameters are passed as owned `Vec<String>` to work around
//! mockall lifetime limitations.

use super::types::{LaunchInstanceConfig, LaunchedInstance, SecurityGroupSummary};
use super::Ec2Client;
use anyhow::Result;

/// VPC stack operations: the VPC and everything hanging off it.
#[allow(async_fn_in_trait)] // Used with concrete types only, never boxed
#[cfg_attr(test, mockall::automock)]
pub trait VpcOperations: Send + Sync {
    /// IDs of VPCs whose `Name` tag equals `name`
    async fn find_vpcs(&self, name: &str) -> Result<Vec<String>>;

    /// Create a VPC tagged `Name=name`, returning its ID
    async fn create_vpc(&self, cidr_block: &str, name: &str) -> Result<String>;

    /// Create a subnet tagged `Name=name`, returning its ID
    async fn create_subnet(
        &self,
        vpc_id: &str,
        availability_zone: &str,
        cidr_block: &str,
        name: &str,
    ) -> Result<String>;

    /// Create an internet gateway tagged `Name=name`, returning its ID
    async fn create_internet_gateway(&self, name: &str) -> Result<String>;

    /// Attach an internet gateway to a VPC
    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()>;

    /// IDs of the route tables associated with a VPC
    async fn find_route_tables(&self, vpc_id: &str) -> Result<Vec<String>>;

    /// Set the `Name` tag on an existing resource
    async fn tag_resource(&self, resource_id: &str, name: &str) -> Result<()>;

    /// Add a route to a route table through an internet gateway
    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<()>;

    /// Create a gateway VPC endpoint, returning its ID
    async fn create_vpc_endpoint(
        &self,
        vpc_id: &str,
        route_table_id: &str,
        service_name: &str,
        policy_document: &str,
    ) -> Result<String>;

    /// IDs of internet gateways tagged `Name=name` and attached to the VPC
    async fn find_internet_gateways(&self, vpc_id: &str, name: &str) -> Result<Vec<String>>;

    /// IDs of internet gateways tagged `Name=name` that are not attached to
    /// any VPC
    async fn find_detached_internet_gateways(&self, name: &str) -> Result<Vec<String>>;

    /// Detach an internet gateway from a VPC
    async fn detach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()>;

    /// Delete an internet gateway
    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<()>;

    /// IDs of subnets tagged `Name=name` inside the VPC
    async fn find_subnets(&self, vpc_id: &str, name: &str) -> Result<Vec<String>>;

    /// Delete a subnet
    async fn delete_subnet(&self, subnet_id: &str) -> Result<()>;

    /// IDs of all VPC endpoints in the VPC
    async fn find_vpc_endpoints(&self, vpc_id: &str) -> Result<Vec<String>>;

    /// Delete VPC endpoints in one call
    async fn delete_vpc_endpoints(&self, endpoint_ids: Vec<String>) -> Result<()>;

    /// Delete a VPC
    async fn delete_vpc(&self, vpc_id: &str) -> Result<()>;

    /// The account's default VPC in this region, if it has one
    async fn default_vpc_id(&self) -> Result<Option<String>>;
}

/// Instance lifecycle operations.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait InstanceOperations: Send + Sync {
    /// Latest Amazon Linux 2023 x86_64 AMI in the region
    async fn latest_al2023_ami(&self) -> Result<String>;

    /// Launch one instance
    async fn launch_instance(&self, config: LaunchInstanceConfig) -> Result<LaunchedInstance>;

    /// Read the instance's current attributes
    async fn describe_instance(&self, instance_id: &str) -> Result<LaunchedInstance>;

    /// Terminate an instance
    async fn terminate_instance(&self, instance_id: &str) -> Result<()>;
}

/// Security group operations.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait SecurityGroupOperations: Send + Sync {
    /// IDs of security groups named `name`
    async fn find_security_groups(&self, name: &str) -> Result<Vec<String>>;

    /// Create a security group, returning its ID
    async fn create_security_group(&self, name: &str, description: &str) -> Result<String>;

    /// Allow inbound TCP on `port` from `cidr_ip`
    async fn authorize_tcp_ingress(
        &self,
        group_id: &str,
        port: i32,
        cidr_ip: &str,
    ) -> Result<()>;

    /// Read a security group back
    async fn describe_security_group(&self, group_id: &str) -> Result<SecurityGroupSummary>;

    /// Delete a security group
    async fn delete_security_group(&self, group_id: &str) -> Result<()>;
}

impl VpcOperations for Ec2Client {
    async fn find_vpcs(&self, name: &str) -> Result<Vec<String>> {
        Ec2Client::find_vpcs(self, name).await
    }

    async fn create_vpc(&self, cidr_block: &str, name: &str) -> Result<String> {
        Ec2Client::create_vpc(self, cidr_block, name).await
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        availability_zone: &str,
        cidr_block: &str,
        name: &str,
    ) -> Result<String> {
        Ec2Client::create_subnet(self, vpc_id, availability_zone, cidr_block, name).await
    }

    async fn create_internet_gateway(&self, name: &str) -> Result<String> {
        Ec2Client::create_internet_gateway(self, name).await
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        Ec2Client::attach_internet_gateway(self, gateway_id, vpc_id).await
    }

    async fn find_route_tables(&self, vpc_id: &str) -> Result<Vec<String>> {
        Ec2Client::find_route_tables(self, vpc_id).await
    }

    async fn tag_resource(&self, resource_id: &str, name: &str) -> Result<()> {
        Ec2Client::tag_resource(self, resource_id, name).await
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<()> {
        Ec2Client::create_route(self, route_table_id, destination_cidr, gateway_id).await
    }

    async fn create_vpc_endpoint(
        &self,
        vpc_id: &str,
        route_table_id: &str,
        service_name: &str,
        policy_document: &str,
    ) -> Result<String> {
        Ec2Client::create_vpc_endpoint(self, vpc_id, route_table_id, service_name, policy_document)
            .await
    }

    async fn find_internet_gateways(&self, vpc_id: &str, name: &str) -> Result<Vec<String>> {
        Ec2Client::find_internet_gateways(self, vpc_id, name).await
    }

    async fn find_detached_internet_gateways(&self, name: &str) -> Result<Vec<String>> {
        Ec2Client::find_detached_internet_gateways(self, name).await
    }

    async fn detach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        Ec2Client::detach_internet_gateway(self, gateway_id, vpc_id).await
    }

    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<()> {
        Ec2Client::delete_internet_gateway(self, gateway_id).await
    }

    async fn find_subnets(&self, vpc_id: &str, name: &str) -> Result<Vec<String>> {
        Ec2Client::find_subnets(self, vpc_id, name).await
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        Ec2Client::delete_subnet(self, subnet_id).await
    }

    async fn find_vpc_endpoints(&self, vpc_id: &str) -> Result<Vec<String>> {
        Ec2Client::find_vpc_endpoints(self, vpc_id).await
    }

    async fn delete_vpc_endpoints(&self, endpoint_ids: Vec<String>) -> Result<()> {
        Ec2Client::delete_vpc_endpoints(self, endpoint_ids).await
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        Ec2Client::delete_vpc(self, vpc_id).await
    }

    async fn default_vpc_id(&self) -> Result<Option<String>> {
        Ec2Client::default_vpc_id(self).await
    }
}

impl InstanceOperations for Ec2Client {
    async fn latest_al2023_ami(&self) -> Result<String> {
        Ec2Client::latest_al2023_ami(self).await
    }

    async fn launch_instance(&self, config: LaunchInstanceConfig) -> Result<LaunchedInstance> {
        Ec2Client::launch_instance(self, config).await
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<LaunchedInstance> {
        Ec2Client::describe_instance(self, instance_id).await
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        Ec2Client::terminate_instance(self, instance_id).await
    }
}

impl SecurityGroupOperations for Ec2Client {
    async fn find_security_groups(&self, name: &str) -> Result<Vec<String>> {
        Ec2Client::find_security_groups(self, name).await
    }

    async fn create_security_group(&self, name: &str, description: &str) -> Result<String> {
        Ec2Client::create_security_group(self, name, description).await
    }

    async fn authorize_tcp_ingress(
        &self,
        group_id: &str,
        port: i32,
        cidr_ip: &str,
    ) -> Result<()> {
        Ec2Client::authorize_tcp_ingress(self, group_id, port, cidr_ip).await
    }

    async fn describe_security_group(&self, group_id: &str) -> Result<SecurityGroupSummary> {
        Ec2Client::describe_security_group(self, group_id).await
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        Ec2Client::delete_security_group(self, group_id).await
    }
}
