//! Security group management

use super::types::{IngressRule, SecurityGroupSummary};
use super::{name_tag_spec, Ec2Client};
use crate::aws::error::ignore_not_found;
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Filter, IpPermission, IpRange, ResourceType};
use tracing::{debug, info};

impl Ec2Client {
    /// IDs of security groups named `name`
    pub async fn find_security_groups(&self, name: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_security_groups()
            .filters(Filter::builder().name("group-name").values(name).build())
            .send()
            .await
            .context("Failed to describe security groups")?;

        Ok(response
            .security_groups()
            .iter()
            .filter_map(|g| g.group_id())
            .map(str::to_string)
            .collect())
    }

    /// Create a security group in the default VPC
    pub async fn create_security_group(&self, name: &str, description: &str) -> Result<String> {
        info!(name = %name, "Creating security group");

        let response = self
            .client
            .create_security_group()
            .group_name(name)
            .description(description)
            .tag_specifications(name_tag_spec(ResourceType::SecurityGroup, name))
            .send()
            .await
            .context("Failed to create security group")?;

        let group_id = response
            .group_id()
            .context("No security group ID in response")?
            .to_string();

        info!(group_id = %group_id, "Security group created");
        Ok(group_id)
    }

    /// Allow inbound TCP on one port from a CIDR range
    pub async fn authorize_tcp_ingress(
        &self,
        group_id: &str,
        port: i32,
        cidr_ip: &str,
    ) -> Result<()> {
        let permission = IpPermission::builder()
            .ip_protocol("tcp")
            .from_port(port)
            .to_port(port)
            .ip_ranges(IpRange::builder().cidr_ip(cidr_ip).build())
            .build();

        self.client
            .authorize_security_group_ingress()
            .group_id(group_id)
            .ip_permissions(permission)
            .send()
            .await
            .with_context(|| format!("Failed to add ingress rule for port {}", port))?;

        debug!(group_id = %group_id, port, cidr_ip = %cidr_ip, "Ingress rule added");
        Ok(())
    }

    /// Read a security group back
    pub async fn describe_security_group(&self, group_id: &str) -> Result<SecurityGroupSummary> {
        let response = self
            .client
            .describe_security_groups()
            .group_ids(group_id)
            .send()
            .await
            .context("Failed to describe security group")?;

        let group = response
            .security_groups()
            .first()
            .with_context(|| format!("Security group {} not found", group_id))?;

        let ingress = group
            .ip_permissions()
            .iter()
            .map(|perm| IngressRule {
                protocol: perm.ip_protocol().unwrap_or("-1").to_string(),
                from_port: perm.from_port(),
                to_port: perm.to_port(),
                cidr_blocks: perm
                    .ip_ranges()
                    .iter()
                    .filter_map(|r| r.cidr_ip())
                    .map(str::to_string)
                    .collect(),
            })
            .collect();

        Ok(SecurityGroupSummary {
            group_id: group.group_id().unwrap_or(group_id).to_string(),
            group_name: group.group_name().unwrap_or_default().to_string(),
            description: group.description().unwrap_or_default().to_string(),
            vpc_id: group.vpc_id().map(str::to_string),
            ingress,
        })
    }

    /// Delete a security group
    ///
    /// Returns Ok(()) if the security group is already gone.
    pub async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        let result = self
            .client
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await;

        match ignore_not_found(result).context("Failed to delete security group")? {
            Some(_) => info!(group_id = %group_id, "Security group deleted"),
            None => debug!(group_id = %group_id, "Security group already deleted"),
        }
        Ok(())
    }
}
