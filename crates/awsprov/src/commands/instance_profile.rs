//! `create-instance-profile`: an IAM role EC2 can assume, wrapped in an
//! instance profile of the same name.

use super::Outcome;
use crate::aws::{IamOperations, EC2_ASSUME_ROLE_POLICY};
use crate::config::InstanceProfileConfig;
use crate::ensure::{ensure, remove_existing, ManagedResource};
use anyhow::Result;
use awsprov_common::ResourceKind;
use chrono::Utc;
use std::fmt;
use tracing::info;

/// An instance profile and the role in it.
///
/// `arn` is `None` when only the role exists (a half-created pair).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProfile {
    pub name: String,
    pub role_name: String,
    pub arn: Option<String>,
}

impl fmt::Display for InstanceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance profile {} (role {})", self.name, self.role_name)?;
        if let Some(arn) = &self.arn {
            write!(f, "\n  ARN: {arn}")?;
        }
        Ok(())
    }
}

/// A role plus its same-named instance profile
pub struct RoleProfile<'a, I> {
    iam: &'a I,
    name: &'a str,
    policy_arns: &'a [String],
}

impl<'a, I: IamOperations> RoleProfile<'a, I> {
    pub fn new(iam: &'a I, config: &'a InstanceProfileConfig) -> Self {
        Self {
            iam,
            name: &config.role_name,
            policy_arns: &config.policy_arns,
        }
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        for policy_arn in self.iam.list_attached_role_policies(role_name).await? {
            self.iam.detach_role_policy(role_name, &policy_arn).await?;
        }
        for policy_name in self.iam.list_role_policies(role_name).await? {
            self.iam.delete_role_policy(role_name, &policy_name).await?;
        }
        self.iam.delete_role(role_name).await?;
        info!(kind = %ResourceKind::IamRole, name = %role_name, "Deleted");
        Ok(())
    }
}

impl<I: IamOperations> ManagedResource for RoleProfile<'_, I> {
    type Descriptor = InstanceProfile;

    fn kind(&self) -> ResourceKind {
        ResourceKind::IamInstanceProfile
    }

    fn name(&self) -> &str {
        self.name
    }

    async fn find(&self) -> Result<Vec<InstanceProfile>> {
        if let Some(profile) = self.iam.find_instance_profile(self.name).await? {
            let role_name = profile
                .roles
                .first()
                .cloned()
                .unwrap_or_else(|| self.name.to_string());
            return Ok(vec![InstanceProfile {
                name: profile.name,
                role_name,
                arn: Some(profile.arn),
            }]);
        }

        if self.iam.role_exists(self.name).await? {
            return Ok(vec![InstanceProfile {
                name: self.name.to_string(),
                role_name: self.name.to_string(),
                arn: None,
            }]);
        }

        Ok(Vec::new())
    }

    async fn remove(&self, existing: &[InstanceProfile]) -> Result<()> {
        for profile in existing {
            if profile.arn.is_some() {
                self.iam
                    .remove_role_from_instance_profile(&profile.name, &profile.role_name)
                    .await?;
                self.iam.delete_instance_profile(&profile.name).await?;
            }
            self.delete_role(&profile.role_name).await?;
            if profile.role_name != self.name {
                self.delete_role(self.name).await?;
            }
        }
        Ok(())
    }

    async fn create(&self) -> Result<InstanceProfile> {
        let description = Utc::now().to_rfc3339();
        self.iam
            .create_role(self.name, EC2_ASSUME_ROLE_POLICY, &description)
            .await?;

        for policy_arn in self.policy_arns {
            self.iam.attach_role_policy(self.name, policy_arn).await?;
        }

        info!(kind = %ResourceKind::IamRole, name = %self.name, "Created");

        let arn = self.iam.create_instance_profile(self.name).await?;
        self.iam
            .add_role_to_instance_profile(self.name, self.name)
            .await?;

        info!(name = %self.name, policies = self.policy_arns.len(), "Role and instance profile ready");
        Ok(InstanceProfile {
            name: self.name.to_string(),
            role_name: self.name.to_string(),
            arn: Some(arn),
        })
    }
}

/// Ensure the role and profile exist, or delete them with `destroy`
pub async fn run<I: IamOperations>(
    iam: &I,
    config: &InstanceProfileConfig,
) -> Result<Outcome<InstanceProfile>> {
    let pair = RoleProfile::new(iam, config);

    if config.destroy {
        let removed = remove_existing(&pair).await?;
        return Ok(Outcome::Removed(removed));
    }

    Ok(Outcome::Ensured(ensure(&pair, config.clean).await?))
}
