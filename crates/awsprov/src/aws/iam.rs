//! IAM role and instance profile management

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::ignore_not_found;
use anyhow::{Context, Result};
use aws_sdk_iam::types::Tag;
use aws_sdk_iam::Client;
use awsprov_common::tags::{TAG_TOOL, TAG_TOOL_VALUE};
use tracing::{debug, info};

/// The trust policy allowing EC2 to assume the role
pub const EC2_ASSUME_ROLE_POLICY: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [
        {
            "Effect": "Allow",
            "Principal": {
                "Service": "ec2.amazonaws.com"
            },
            "Action": "sts:AssumeRole"
        }
    ]
}"#;

/// An instance profile as IAM reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProfileSummary {
    pub name: String,
    pub arn: String,
    /// Names of the roles in the profile (IAM allows at most one)
    pub roles: Vec<String>,
}

/// IAM client for managing roles and instance profiles
pub struct IamClient {
    client: Client,
}

impl FromAwsContext for IamClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.iam_client(),
        }
    }
}

fn tool_tag() -> Result<Tag> {
    Tag::builder()
        .key(TAG_TOOL)
        .value(TAG_TOOL_VALUE)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build IAM tag: {}", e))
}

impl IamClient {
    /// Create a new IAM client
    pub async fn new(region: &str) -> Self {
        let ctx = AwsContext::new(region).await;
        Self::from_context(&ctx)
    }

    /// Look up an instance profile by name
    pub async fn find_instance_profile(&self, name: &str) -> Result<Option<InstanceProfileSummary>> {
        let result = self
            .client
            .get_instance_profile()
            .instance_profile_name(name)
            .send()
            .await;

        let Some(response) = ignore_not_found(result).context("Failed to get instance profile")?
        else {
            return Ok(None);
        };

        Ok(response.instance_profile().map(|p| InstanceProfileSummary {
            name: p.instance_profile_name().to_string(),
            arn: p.arn().to_string(),
            roles: p.roles().iter().map(|r| r.role_name().to_string()).collect(),
        }))
    }

    /// Check whether a role with this name exists
    pub async fn role_exists(&self, role_name: &str) -> Result<bool> {
        let result = self.client.get_role().role_name(role_name).send().await;
        Ok(ignore_not_found(result)
            .context("Failed to get IAM role")?
            .is_some())
    }

    /// Create a role, returning its ARN
    pub async fn create_role(
        &self,
        role_name: &str,
        assume_role_policy: &str,
        description: &str,
    ) -> Result<String> {
        let response = self
            .client
            .create_role()
            .path("/")
            .role_name(role_name)
            .assume_role_policy_document(assume_role_policy)
            .description(description)
            .tags(tool_tag()?)
            .send()
            .await
            .context("Failed to create IAM role")?;

        let arn = response
            .role()
            .map(|r| r.arn().to_string())
            .context("No role in response")?;

        info!(role_name = %role_name, arn = %arn, "IAM role created");
        Ok(arn)
    }

    /// Attach a managed policy to a role
    pub async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .with_context(|| format!("Failed to attach policy {}", policy_arn))?;

        debug!(role_name = %role_name, policy_arn = %policy_arn, "Managed policy attached");
        Ok(())
    }

    /// ARNs of the managed policies attached to a role (empty if the role is gone)
    pub async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<String>> {
        let result = self
            .client
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await;

        Ok(ignore_not_found(result)
            .context("Failed to list attached role policies")?
            .map(|r| {
                r.attached_policies()
                    .iter()
                    .filter_map(|p| p.policy_arn())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Detach a managed policy from a role
    pub async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        let result = self
            .client
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await;

        if ignore_not_found(result)
            .context("Failed to detach role policy")?
            .is_none()
        {
            debug!(policy_arn = %policy_arn, "Policy already detached");
        }
        Ok(())
    }

    /// Names of the inline policies on a role (empty if the role is gone)
    pub async fn list_role_policies(&self, role_name: &str) -> Result<Vec<String>> {
        let result = self
            .client
            .list_role_policies()
            .role_name(role_name)
            .send()
            .await;

        Ok(ignore_not_found(result)
            .context("Failed to list inline role policies")?
            .map(|r| r.policy_names().to_vec())
            .unwrap_or_default())
    }

    /// Delete an inline policy from a role
    pub async fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> Result<()> {
        let result = self
            .client
            .delete_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .send()
            .await;

        if ignore_not_found(result)
            .context("Failed to delete inline role policy")?
            .is_none()
        {
            debug!(policy_name = %policy_name, "Inline policy already deleted");
        }
        Ok(())
    }

    /// Create an instance profile, returning its ARN
    pub async fn create_instance_profile(&self, name: &str) -> Result<String> {
        let response = self
            .client
            .create_instance_profile()
            .instance_profile_name(name)
            .tags(tool_tag()?)
            .send()
            .await
            .context("Failed to create instance profile")?;

        let arn = response
            .instance_profile()
            .map(|p| p.arn().to_string())
            .context("No instance profile in response")?;

        info!(profile_name = %name, arn = %arn, "Instance profile created");
        Ok(arn)
    }

    /// Put a role into an instance profile
    pub async fn add_role_to_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> Result<()> {
        self.client
            .add_role_to_instance_profile()
            .instance_profile_name(profile_name)
            .role_name(role_name)
            .send()
            .await
            .context("Failed to add role to instance profile")?;

        debug!(profile_name = %profile_name, role_name = %role_name, "Role added to instance profile");
        Ok(())
    }

    /// Take a role out of an instance profile
    pub async fn remove_role_from_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> Result<()> {
        let result = self
            .client
            .remove_role_from_instance_profile()
            .instance_profile_name(profile_name)
            .role_name(role_name)
            .send()
            .await;

        if ignore_not_found(result)
            .context("Failed to remove role from instance profile")?
            .is_none()
        {
            debug!(profile_name = %profile_name, "Role already removed from instance profile");
        }
        Ok(())
    }

    /// Delete an instance profile
    pub async fn delete_instance_profile(&self, name: &str) -> Result<()> {
        let result = self
            .client
            .delete_instance_profile()
            .instance_profile_name(name)
            .send()
            .await;

        match ignore_not_found(result).context("Failed to delete instance profile")? {
            Some(_) => info!(profile_name = %name, "Instance profile deleted"),
            None => debug!(profile_name = %name, "Instance profile already deleted"),
        }
        Ok(())
    }

    /// Delete a role (its policies must already be gone)
    pub async fn delete_role(&self, role_name: &str) -> Result<()> {
        let result = self.client.delete_role().role_name(role_name).send().await;

        match ignore_not_found(result).context("Failed to delete IAM role")? {
            Some(_) => info!(role_name = %role_name, "IAM role deleted"),
            None => debug!(role_name = %role_name, "IAM role already deleted"),
        }
        Ok(())
    }
}

/// Trait for IAM operations.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait IamOperations: Send + Sync {
    /// Look up an instance profile by name
    async fn find_instance_profile(&self, name: &str) -> Result<Option<InstanceProfileSummary>>;

    /// Check whether a role exists
    async fn role_exists(&self, role_name: &str) -> Result<bool>;

    /// Create a role, returning its ARN
    async fn create_role(
        &self,
        role_name: &str,
        assume_role_policy: &str,
        description: &str,
    ) -> Result<String>;

    /// Attach a managed policy to a role
    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;

    /// ARNs of the managed policies attached to a role
    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<String>>;

    /// Detach a managed policy from a role
    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;

    /// Names of a role's inline policies
    async fn list_role_policies(&self, role_name: &str) -> Result<Vec<String>>;

    /// Delete an inline policy from a role
    async fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> Result<()>;

    /// Create an instance profile, returning its ARN
    async fn create_instance_profile(&self, name: &str) -> Result<String>;

    /// Put a role into an instance profile
    async fn add_role_to_instance_profile(&self, profile_name: &str, role_name: &str)
        -> Result<()>;

    /// Take a role out of an instance profile
    async fn remove_role_from_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> Result<()>;

    /// Delete an instance profile
    async fn delete_instance_profile(&self, name: &str) -> Result<()>;

    /// Delete a role
    async fn delete_role(&self, role_name: &str) -> Result<()>;
}

impl IamOperations for IamClient {
    async fn find_instance_profile(&self, name: &str) -> Result<Option<InstanceProfileSummary>> {
        IamClient::find_instance_profile(self, name).await
    }

    async fn role_exists(&self, role_name: &str) -> Result<bool> {
        IamClient::role_exists(self, role_name).await
    }

    async fn create_role(
        &self,
        role_name: &str,
        assume_role_policy: &str,
        description: &str,
    ) -> Result<String> {
        IamClient::create_role(self, role_name, assume_role_policy, description).await
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        IamClient::attach_role_policy(self, role_name, policy_arn).await
    }

    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<String>> {
        IamClient::list_attached_role_policies(self, role_name).await
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        IamClient::detach_role_policy(self, role_name, policy_arn).await
    }

    async fn list_role_policies(&self, role_name: &str) -> Result<Vec<String>> {
        IamClient::list_role_policies(self, role_name).await
    }

    async fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> Result<()> {
        IamClient::delete_role_policy(self, role_name, policy_name).await
    }

    async fn create_instance_profile(&self, name: &str) -> Result<String> {
        IamClient::create_instance_profile(self, name).await
    }

    async fn add_role_to_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> Result<()> {
        IamClient::add_role_to_instance_profile(self, profile_name, role_name).await
    }

    async fn remove_role_from_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> Result<()> {
        IamClient::remove_role_from_instance_profile(self, profile_name, role_name).await
    }

    async fn delete_instance_profile(&self, name: &str) -> Result<()> {
        IamClient::delete_instance_profile(self, name).await
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        IamClient::delete_role(self, role_name).await
    }
}
