//! `create-security-group`: a named group that allows SSH from anywhere.

use super::Outcome;
use crate::aws::{SecurityGroupOperations, SecurityGroupSummary};
use crate::config::SecurityGroupConfig;
use crate::ensure::{ensure, remove_existing, ManagedResource};
use anyhow::Result;
use awsprov_common::defaults::{SSH_INGRESS_CIDR, SSH_PORT};
use awsprov_common::ResourceKind;

/// A security group found by its group name
pub struct SecurityGroup<'a, E> {
    ec2: &'a E,
    name: &'a str,
    description: &'a str,
}

impl<'a, E: SecurityGroupOperations> SecurityGroup<'a, E> {
    pub fn new(ec2: &'a E, config: &'a SecurityGroupConfig) -> Self {
        Self {
            ec2,
            name: &config.name,
            description: &config.description,
        }
    }
}

impl<E: SecurityGroupOperations> ManagedResource for SecurityGroup<'_, E> {
    /// Group ID
    type Descriptor = String;

    fn kind(&self) -> ResourceKind {
        ResourceKind::SecurityGroup
    }

    fn name(&self) -> &str {
        self.name
    }

    async fn find(&self) -> Result<Vec<String>> {
        self.ec2.find_security_groups(self.name).await
    }

    async fn remove(&self, existing: &[String]) -> Result<()> {
        for group_id in existing {
            self.ec2.delete_security_group(group_id).await?;
        }
        Ok(())
    }

    async fn create(&self) -> Result<String> {
        let group_id = self
            .ec2
            .create_security_group(self.name, self.description)
            .await?;
        self.ec2
            .authorize_tcp_ingress(&group_id, SSH_PORT, SSH_INGRESS_CIDR)
            .await?;
        Ok(group_id)
    }
}

/// Ensure the group exists and read it back.
///
/// `clean` deletes an existing group and stops; `recreate` replaces it.
pub async fn run<E: SecurityGroupOperations>(
    ec2: &E,
    config: &SecurityGroupConfig,
) -> Result<Outcome<SecurityGroupSummary>> {
    let group = SecurityGroup::new(ec2, config);

    if config.clean {
        let removed = remove_existing(&group).await?;
        return Ok(Outcome::Removed(removed));
    }

    let ensured = ensure(&group, config.recreate).await?;
    let summary = ec2.describe_security_group(ensured.descriptor()).await?;
    Ok(Outcome::Ensured(ensured.map(|_| summary)))
}
