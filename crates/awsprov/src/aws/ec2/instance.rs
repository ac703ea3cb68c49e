//! EC2 instance lifecycle operations

use super::types::{LaunchInstanceConfig, LaunchedInstance};
use super::{name_tag_spec, Ec2Client};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Filter, Instance, InstanceType, ResourceType};
use tracing::{debug, info};

impl LaunchedInstance {
    fn from_sdk(instance: &Instance) -> Result<Self> {
        Ok(Self {
            instance_id: instance
                .instance_id()
                .context("No instance ID")?
                .to_string(),
            instance_type: instance
                .instance_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            key_name: instance.key_name().map(str::to_string),
            public_ip: instance.public_ip_address().map(str::to_string),
        })
    }
}

impl Ec2Client {
    /// Get the latest Amazon Linux 2023 AMI for x86_64
    pub async fn latest_al2023_ami(&self) -> Result<String> {
        let response = self
            .client
            .describe_images()
            .owners("amazon")
            .filters(
                Filter::builder()
                    .name("name")
                    .values("al2023-ami-2023*-x86_64")
                    .build(),
            )
            .filters(Filter::builder().name("state").values("available").build())
            .filters(
                Filter::builder()
                    .name("architecture")
                    .values("x86_64")
                    .build(),
            )
            .send()
            .await
            .context("Failed to describe images")?;

        // Creation dates are ISO 8601, so the string order is the time order
        let ami = response
            .images()
            .iter()
            .max_by(|a, b| a.creation_date().cmp(&b.creation_date()))
            .and_then(|img| img.image_id())
            .context("No Amazon Linux 2023 AMI found")?;

        debug!(ami = %ami, "Found AL2023 AMI");
        Ok(ami.to_string())
    }

    /// Launch one instance with the given configuration
    pub async fn launch_instance(&self, config: LaunchInstanceConfig) -> Result<LaunchedInstance> {
        info!(
            instance_type = %config.instance_type,
            ami = %config.image_id,
            security_group = %config.security_group,
            key_name = %config.key_name,
            "Launching instance"
        );

        let response = self
            .client
            .run_instances()
            .image_id(&config.image_id)
            .instance_type(InstanceType::from(config.instance_type.as_str()))
            .security_groups(&config.security_group)
            .key_name(&config.key_name)
            .min_count(1)
            .max_count(1)
            .tag_specifications(name_tag_spec(ResourceType::Instance, &config.name))
            .send()
            .await
            .context("Failed to launch instance")?;

        let instance = response
            .instances()
            .first()
            .context("No instances created")?;

        let launched = LaunchedInstance::from_sdk(instance)?;
        info!(instance_id = %launched.instance_id, "Instance launched");
        Ok(launched)
    }

    /// Read an instance's current attributes
    pub async fn describe_instance(&self, instance_id: &str) -> Result<LaunchedInstance> {
        let response = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .context("Failed to describe instance")?;

        let instance = response
            .reservations()
            .first()
            .and_then(|r| r.instances().first())
            .with_context(|| format!("Instance {} not found", instance_id))?;

        LaunchedInstance::from_sdk(instance)
    }

    /// Terminate an instance
    pub async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        info!(instance_id = %instance_id, "Terminating instance");

        self.client
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .context("Failed to terminate instance")?;

        Ok(())
    }
}
