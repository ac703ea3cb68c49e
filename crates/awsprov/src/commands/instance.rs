//! `create-instance`: launch one instance and wait for its public IP.

use crate::aws::{InstanceOperations, LaunchInstanceConfig, LaunchedInstance};
use crate::config::InstanceConfig;
use crate::poll::{poll_until_ready, PollConfig, Sleeper};
use anyhow::{Context, Result};
use awsprov_common::defaults::DEFAULT_SSH_USER;
use awsprov_common::ResourceKind;
use std::fmt;
use tracing::{info, warn};

/// A running instance and whether `--clean` already terminated it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceOutcome {
    pub instance: LaunchedInstance,
    pub terminated: bool,
}

impl fmt::Display for InstanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instance = &self.instance;
        let ip = instance.public_ip.as_deref().unwrap_or("-");
        let key = instance.key_name.as_deref().unwrap_or("<key>");

        writeln!(
            f,
            "Instance {} ({}) is up at {}",
            instance.instance_id, instance.instance_type, ip
        )?;
        writeln!(f, "Next:")?;
        writeln!(
            f,
            "    SSH:        ssh -i file/path/to/{}.pem {}@{}",
            key, DEFAULT_SSH_USER, ip
        )?;
        if self.terminated {
            write!(f, "    Terminated by --clean")
        } else {
            write!(
                f,
                "    Terminate:  aws ec2 terminate-instances --instance-id {}",
                instance.instance_id
            )
        }
    }
}

/// Launch the instance described by `config` and wait until it has a
/// public IP.
///
/// With `clean` the instance is terminated before returning, also when
/// waiting failed. A failed termination is only logged so that the waiting
/// error, if any, is what surfaces.
pub async fn run<E, S>(
    ec2: &E,
    sleeper: &S,
    poll: &PollConfig,
    config: &InstanceConfig,
) -> Result<InstanceOutcome>
where
    E: InstanceOperations,
    S: Sleeper,
{
    let image_id = match &config.image_id {
        Some(id) => id.clone(),
        None => ec2
            .latest_al2023_ami()
            .await
            .context("Failed to look up an Amazon Linux 2023 AMI")?,
    };

    let launched = ec2
        .launch_instance(LaunchInstanceConfig::new(
            &config.name,
            &config.instance_type,
            image_id,
            &config.security_group,
            &config.key_name,
        ))
        .await?;
    info!(kind = %ResourceKind::Ec2Instance, instance_id = %launched.instance_id, "Successfully created instance");

    let instance_id = launched.instance_id.as_str();
    let waited = poll_until_ready(poll, sleeper, "public IP address", move || async move {
        let instance = ec2.describe_instance(instance_id).await?;
        Ok(instance.public_ip.is_some().then_some(instance))
    })
    .await;

    let terminated = if config.clean {
        match ec2.terminate_instance(instance_id).await {
            Ok(()) => {
                info!(kind = %ResourceKind::Ec2Instance, instance_id = %instance_id, "Terminated by --clean");
                true
            }
            Err(e) => {
                warn!(kind = %ResourceKind::Ec2Instance, instance_id = %instance_id, error = ?e, "Failed to terminate instance");
                false
            }
        }
    } else {
        false
    };

    let instance = waited.with_context(|| {
        format!("Instance {} never received a public IP", instance_id)
    })?;
    Ok(InstanceOutcome {
        instance,
        terminated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::ec2::MockInstanceOperations;
    use crate::config::AwsConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct NoSleep;

    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn config(clean: bool, image_id: Option<&str>) -> InstanceConfig {
        InstanceConfig {
            aws: AwsConfig {
                region: "ap-northeast-1".to_string(),
                aws_profile: None,
            },
            name: "demo".to_string(),
            instance_type: "t2.micro".to_string(),
            security_group: "web".to_string(),
            key_name: "me".to_string(),
            image_id: image_id.map(str::to_string),
            clean,
        }
    }

    fn launched(ip: Option<&str>) -> LaunchedInstance {
        LaunchedInstance {
            instance_id: "i-1".to_string(),
            instance_type: "t2.micro".to_string(),
            key_name: Some("me".to_string()),
            public_ip: ip.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn waits_for_ip_and_prints_ssh_hint() {
        let mut ec2 = MockInstanceOperations::new();
        ec2.expect_latest_al2023_ami()
            .times(1)
            .returning(|| Ok("ami-latest".to_string()));
        ec2.expect_launch_instance()
            .withf(|c| {
                c.image_id == "ami-latest"
                    && c.security_group == "web"
                    && c.key_name == "me"
                    && c.name == "demo"
            })
            .returning(|_| Ok(launched(None)));
        let describes = Arc::new(AtomicUsize::new(0));
        let counter = describes.clone();
        ec2.expect_describe_instance().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(launched((n >= 2).then_some("203.0.113.7")))
        });
        ec2.expect_terminate_instance().never();

        let outcome = run(&ec2, &NoSleep, &PollConfig::default(), &config(false, None))
            .await
            .unwrap();

        assert_eq!(describes.load(Ordering::SeqCst), 3);
        assert!(!outcome.terminated);
        let text = outcome.to_string();
        assert!(text.contains("ssh -i file/path/to/me.pem ec2-user@203.0.113.7"));
        assert!(text.contains("aws ec2 terminate-instances --instance-id i-1"));
    }

    #[tokio::test]
    async fn explicit_image_skips_lookup() {
        let mut ec2 = MockInstanceOperations::new();
        ec2.expect_latest_al2023_ami().never();
        ec2.expect_launch_instance()
            .withf(|c| c.image_id == "ami-pinned")
            .returning(|_| Ok(launched(None)));
        ec2.expect_describe_instance()
            .returning(|_| Ok(launched(Some("203.0.113.7"))));
        ec2.expect_terminate_instance()
            .withf(|id| id == "i-1")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = run(
            &ec2,
            &NoSleep,
            &PollConfig::default(),
            &config(true, Some("ami-pinned")),
        )
        .await
        .unwrap();
        assert!(outcome.terminated);
        assert!(outcome.to_string().ends_with("Terminated by --clean"));
    }

    #[tokio::test]
    async fn clean_terminates_even_when_ip_never_arrives() {
        let mut ec2 = MockInstanceOperations::new();
        ec2.expect_launch_instance()
            .returning(|_| Ok(launched(None)));
        ec2.expect_describe_instance()
            .times(6)
            .returning(|_| Ok(launched(None)));
        ec2.expect_terminate_instance()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("terminate failed")));

        let err = run(
            &ec2,
            &NoSleep,
            &PollConfig::default(),
            &config(true, Some("ami-pinned")),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Instance i-1 never received a public IP");
        assert!(format!("{:#}", err).contains("Timed out waiting for public IP address"));
    }
}
