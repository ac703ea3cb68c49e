//! Configuration types for the utilities
//!
//! Each binary turns its command-line arguments into one of these structs
//! once at startup and hands it to the command by reference.

use crate::aws::AwsContext;
use std::fmt;
use thiserror::Error;

/// Which AWS account and region to talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

impl AwsConfig {
    /// Load the SDK configuration for this region and profile
    pub async fn load_context(&self) -> AwsContext {
        AwsContext::with_profile(&self.region, self.aws_profile.as_deref()).await
    }
}

/// Configuration for `create-vpc-if-not-exists`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcConfig {
    pub aws: AwsConfig,
    /// `Name` tag of the VPC; dependents derive their names from it
    pub name: String,
    /// Availability zone of the subnet
    pub availability_zone: String,
    /// Tear down an existing stack with this name and build a fresh one
    pub clean: bool,
    /// Tear down an existing stack with this name and stop
    pub destroy: bool,
}

/// Configuration for `create-instance`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub aws: AwsConfig,
    /// `Name` tag of the instance
    pub name: String,
    /// EC2 instance type (e.g., "t2.micro")
    pub instance_type: String,
    /// Security group name
    pub security_group: String,
    /// Key pair name used for SSH
    pub key_name: String,
    /// AMI to boot; the latest Amazon Linux 2023 image when unset
    pub image_id: Option<String>,
    /// Terminate the instance before exiting
    pub clean: bool,
}

/// Configuration for `create-security-group`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupConfig {
    pub aws: AwsConfig,
    pub name: String,
    pub description: String,
    /// Delete an existing group with this name and stop
    pub clean: bool,
    /// Delete an existing group with this name, then create a new one
    pub recreate: bool,
}

/// Configuration for `get-default-vpc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultVpcConfig {
    pub aws: AwsConfig,
}

/// Configuration for `create-instance-profile`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProfileConfig {
    pub aws: AwsConfig,
    /// Name shared by the role and its instance profile
    pub role_name: String,
    /// Managed policies attached to the role
    pub policy_arns: Vec<String>,
    /// Delete an existing role/profile with this name and build fresh ones
    pub clean: bool,
    /// Delete an existing role/profile with this name and stop
    pub destroy: bool,
}

/// A single problem with the command-line arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("--security-group is required")]
    MissingSecurityGroup,

    #[error("--key-name is required")]
    MissingKeyName,

    #[error("--{flag} must not be empty")]
    Empty { flag: &'static str },
}

/// Every problem found with the arguments, reported together
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid arguments:")?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_listed_one_per_line() {
        let errors = ValidationErrors(vec![
            ValidationError::MissingSecurityGroup,
            ValidationError::MissingKeyName,
        ]);
        assert_eq!(
            errors.to_string(),
            "invalid arguments:\n  - --security-group is required\n  - --key-name is required"
        );
    }

    #[test]
    fn empty_collection_is_ok() {
        assert!(ValidationErrors(Vec::new()).into_result().is_ok());
        let err = ValidationErrors(vec![ValidationError::Empty { flag: "name" }])
            .into_result()
            .unwrap_err();
        assert!(err.contains(&ValidationError::Empty { flag: "name" }));
        assert_eq!(err.0[0].to_string(), "--name must not be empty");
    }
}
