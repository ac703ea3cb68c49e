//! Command-line arguments, logging setup and error printing shared by the
//! binaries.

use crate::aws::classify_anyhow_error;
use crate::config::{
    AwsConfig, DefaultVpcConfig, InstanceConfig, InstanceProfileConfig, SecurityGroupConfig,
    ValidationError, ValidationErrors, VpcConfig,
};
use awsprov_common::defaults::{
    default_availability_zone, DEFAULT_INSTANCE_NAME, DEFAULT_INSTANCE_TYPE, DEFAULT_REGION,
    DEFAULT_ROLE_NAME, DEFAULT_SECURITY_GROUP_DESCRIPTION, DEFAULT_SECURITY_GROUP_NAME,
    DEFAULT_VPC_NAME, S3_FULL_ACCESS_POLICY_ARN,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset: our progress at info, SDK
/// chatter only from warn up
const DEFAULT_LOG_FILTER: &str =
    "info,aws_config=warn,aws_smithy_runtime=warn,aws_sdk_ec2=warn,aws_sdk_iam=warn";

/// Flags every utility accepts
#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    pub aws_profile: Option<String>,
}

impl From<CommonArgs> for AwsConfig {
    fn from(args: CommonArgs) -> Self {
        Self {
            region: args.region,
            aws_profile: args.aws_profile,
        }
    }
}

/// Collect an `Empty` error when a string flag was given as ""
fn require_non_empty(errors: &mut Vec<ValidationError>, flag: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Empty { flag });
    }
}

/// Ensure a VPC with a subnet, internet gateway, default route and S3
/// endpoint exists
#[derive(Parser, Debug)]
#[command(name = "create-vpc-if-not-exists")]
#[command(version)]
pub struct VpcArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// `Name` tag of the VPC
    #[arg(long, default_value = DEFAULT_VPC_NAME)]
    pub name: String,

    /// Availability zone of the subnet (default: the region's "a" zone)
    #[arg(long)]
    pub availability_zone: Option<String>,

    /// Tear down an existing VPC with this name before creating
    #[arg(long, conflicts_with = "destroy")]
    pub clean: bool,

    /// Tear down an existing VPC with this name and exit
    #[arg(long)]
    pub destroy: bool,
}

impl TryFrom<VpcArgs> for VpcConfig {
    type Error = ValidationErrors;

    fn try_from(args: VpcArgs) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();
        require_non_empty(&mut errors, "name", &args.name);
        ValidationErrors(errors).into_result()?;

        let availability_zone = args
            .availability_zone
            .unwrap_or_else(|| default_availability_zone(&args.common.region));
        Ok(Self {
            aws: args.common.into(),
            name: args.name,
            availability_zone,
            clean: args.clean,
            destroy: args.destroy,
        })
    }
}

/// Launch an EC2 instance and print how to reach it
#[derive(Parser, Debug)]
#[command(name = "create-instance")]
#[command(version)]
pub struct InstanceArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// `Name` tag of the instance
    #[arg(long, default_value = DEFAULT_INSTANCE_NAME)]
    pub name: String,

    /// EC2 instance type
    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    pub instance_type: String,

    /// Security group name (required)
    #[arg(long, visible_alias = "sg")]
    pub security_group: Option<String>,

    /// Key pair name (required)
    #[arg(long, visible_alias = "keyname")]
    pub key_name: Option<String>,

    /// AMI ID (default: latest Amazon Linux 2023 for x86_64)
    #[arg(long)]
    pub image_id: Option<String>,

    /// Terminate the instance before exiting
    #[arg(long)]
    pub clean: bool,
}

impl TryFrom<InstanceArgs> for InstanceConfig {
    type Error = ValidationErrors;

    /// Reports every missing or empty flag at once.
    fn try_from(args: InstanceArgs) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();
        require_non_empty(&mut errors, "name", &args.name);
        require_non_empty(&mut errors, "instance-type", &args.instance_type);

        let security_group = args.security_group.filter(|s| !s.trim().is_empty());
        if security_group.is_none() {
            errors.push(ValidationError::MissingSecurityGroup);
        }
        let key_name = args.key_name.filter(|s| !s.trim().is_empty());
        if key_name.is_none() {
            errors.push(ValidationError::MissingKeyName);
        }

        match (security_group, key_name) {
            (Some(security_group), Some(key_name)) if errors.is_empty() => Ok(Self {
                aws: args.common.into(),
                name: args.name,
                instance_type: args.instance_type,
                security_group,
                key_name,
                image_id: args.image_id.filter(|s| !s.trim().is_empty()),
                clean: args.clean,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

/// Ensure a security group allowing SSH exists
#[derive(Parser, Debug)]
#[command(name = "create-security-group")]
#[command(version)]
pub struct SecurityGroupArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Security group name
    #[arg(long, default_value = DEFAULT_SECURITY_GROUP_NAME)]
    pub name: String,

    /// Security group description
    #[arg(long, default_value = DEFAULT_SECURITY_GROUP_DESCRIPTION)]
    pub description: String,

    /// Delete an existing group with this name and exit
    #[arg(long, conflicts_with = "recreate")]
    pub clean: bool,

    /// Delete an existing group with this name, then create a new one
    #[arg(long)]
    pub recreate: bool,
}

impl TryFrom<SecurityGroupArgs> for SecurityGroupConfig {
    type Error = ValidationErrors;

    fn try_from(args: SecurityGroupArgs) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();
        require_non_empty(&mut errors, "name", &args.name);
        require_non_empty(&mut errors, "description", &args.description);
        ValidationErrors(errors).into_result()?;

        Ok(Self {
            aws: args.common.into(),
            name: args.name,
            description: args.description,
            clean: args.clean,
            recreate: args.recreate,
        })
    }
}

/// Print the ID of the region's default VPC
#[derive(Parser, Debug)]
#[command(name = "get-default-vpc")]
#[command(version)]
pub struct DefaultVpcArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl From<DefaultVpcArgs> for DefaultVpcConfig {
    fn from(args: DefaultVpcArgs) -> Self {
        Self {
            aws: args.common.into(),
        }
    }
}

/// Ensure an IAM role and a same-named instance profile exist
#[derive(Parser, Debug)]
#[command(name = "create-instance-profile")]
#[command(version)]
pub struct InstanceProfileArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Name of the role and of the instance profile
    #[arg(long, default_value = DEFAULT_ROLE_NAME)]
    pub role_name: String,

    /// Managed policy to attach to the role (repeatable)
    #[arg(long = "policy-arn", default_value = S3_FULL_ACCESS_POLICY_ARN)]
    pub policy_arns: Vec<String>,

    /// Delete an existing role and profile with this name before creating
    #[arg(long, conflicts_with = "destroy")]
    pub clean: bool,

    /// Delete an existing role and profile with this name and exit
    #[arg(long)]
    pub destroy: bool,
}

impl TryFrom<InstanceProfileArgs> for InstanceProfileConfig {
    type Error = ValidationErrors;

    fn try_from(args: InstanceProfileArgs) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();
        require_non_empty(&mut errors, "role-name", &args.role_name);
        for arn in &args.policy_arns {
            require_non_empty(&mut errors, "policy-arn", arn);
        }
        ValidationErrors(errors).into_result()?;

        Ok(Self {
            aws: args.common.into(),
            role_name: args.role_name,
            policy_arns: args.policy_arns,
            clean: args.clean,
            destroy: args.destroy,
        })
    }
}

/// Install the stdout tracing subscriber.
///
/// `RUST_LOG` replaces the default filter entirely when set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Write the error report for a failed run to stderr
pub fn print_error(e: &anyhow::Error) {
    let show_backtrace = std::env::var_os("RUST_BACKTRACE").is_some();
    eprint!("{}", render_error(e, show_backtrace));
}

/// The colored report `print_error` writes: the error, each cause, a hint
/// for errors the user can act on, then the backtrace or how to get one.
fn render_error(e: &anyhow::Error, show_backtrace: bool) -> String {
    use std::fmt::Write;

    let mut out = format!("\n\x1b[1;31mError:\x1b[0m {e}\n");
    for cause in e.chain().skip(1) {
        let _ = writeln!(out, "  \x1b[33mCaused by:\x1b[0m {cause}");
    }

    if let Some(hint) = classify_anyhow_error(e).suggestion() {
        let _ = writeln!(out, "\n\x1b[36mHint:\x1b[0m {hint}");
    }

    if !show_backtrace {
        out.push_str("\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m\n");
    } else if e.backtrace().status() == std::backtrace::BacktraceStatus::Captured {
        let _ = writeln!(out, "\n\x1b[2mBacktrace:\x1b[0m\n{}", e.backtrace());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_report_lists_causes_and_hint() {
        let err = anyhow::anyhow!("InvalidKeyPair.NotFound: key 'me' does not exist")
            .context("Failed to launch instance");
        let report = render_error(&err, false);

        assert!(report.contains("Error:\x1b[0m Failed to launch instance"));
        assert!(report.contains("Caused by:\x1b[0m InvalidKeyPair.NotFound"));
        assert!(report.contains("Hint:\x1b[0m The key pair does not exist"));
        assert!(report.contains("Set RUST_BACKTRACE=1"));
    }

    #[test]
    fn error_report_without_hint_or_causes() {
        let report = render_error(&anyhow::anyhow!("connection refused"), true);

        assert!(report.contains("connection refused"));
        assert!(!report.contains("Caused by"));
        assert!(!report.contains("Hint"));
        assert!(!report.contains("Set RUST_BACKTRACE=1"));
    }

    #[test]
    fn vpc_defaults() {
        let args = VpcArgs::try_parse_from(["create-vpc-if-not-exists"]).unwrap();
        let config = VpcConfig::try_from(args).unwrap();
        assert_eq!(config.aws.region, "ap-northeast-1");
        assert_eq!(config.aws.aws_profile, None);
        assert_eq!(config.name, "awsprov-vpc");
        assert_eq!(config.availability_zone, "ap-northeast-1a");
        assert!(!config.clean);
        assert!(!config.destroy);
    }

    #[test]
    fn vpc_zone_follows_region() {
        let args = VpcArgs::try_parse_from([
            "create-vpc-if-not-exists",
            "--region",
            "us-west-2",
            "--name",
            "demo",
            "--clean",
        ])
        .unwrap();
        let config = VpcConfig::try_from(args).unwrap();
        assert_eq!(config.availability_zone, "us-west-2a");
        assert!(config.clean);
    }

    #[test]
    fn vpc_clean_and_destroy_conflict() {
        let result =
            VpcArgs::try_parse_from(["create-vpc-if-not-exists", "--clean", "--destroy"]);
        assert!(result.is_err());
    }

    #[test]
    fn instance_reports_all_missing_flags() {
        let args = InstanceArgs::try_parse_from(["create-instance"]).unwrap();
        let errors = InstanceConfig::try_from(args).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingSecurityGroup));
        assert!(errors.contains(&ValidationError::MissingKeyName));
        assert_eq!(errors.0.len(), 2);
    }

    #[test]
    fn instance_accepts_short_aliases() {
        let args = InstanceArgs::try_parse_from([
            "create-instance",
            "--sg",
            "web",
            "--keyname",
            "me",
            "--clean",
        ])
        .unwrap();
        let config = InstanceConfig::try_from(args).unwrap();
        assert_eq!(config.security_group, "web");
        assert_eq!(config.key_name, "me");
        assert_eq!(config.instance_type, "t2.micro");
        assert_eq!(config.name, "awsprov-instance");
        assert_eq!(config.image_id, None);
        assert!(config.clean);
    }

    #[test]
    fn instance_blank_key_counts_as_missing() {
        let args = InstanceArgs::try_parse_from([
            "create-instance",
            "--security-group",
            "web",
            "--key-name",
            " ",
        ])
        .unwrap();
        let errors = InstanceConfig::try_from(args).unwrap_err();
        assert_eq!(errors.0, vec![ValidationError::MissingKeyName]);
    }

    #[test]
    fn security_group_clean_and_recreate_conflict() {
        let result =
            SecurityGroupArgs::try_parse_from(["create-security-group", "--clean", "--recreate"]);
        assert!(result.is_err());
    }

    #[test]
    fn instance_profile_defaults_to_s3_policy() {
        let args = InstanceProfileArgs::try_parse_from(["create-instance-profile"]).unwrap();
        let config = InstanceProfileConfig::try_from(args).unwrap();
        assert_eq!(config.role_name, "awsprov-role");
        assert_eq!(config.policy_arns, vec![S3_FULL_ACCESS_POLICY_ARN.to_string()]);
    }

    #[test]
    fn instance_profile_policy_arn_repeats() {
        let args = InstanceProfileArgs::try_parse_from([
            "create-instance-profile",
            "--policy-arn",
            "arn:aws:iam::aws:policy/A",
            "--policy-arn",
            "arn:aws:iam::aws:policy/B",
            "--aws-profile",
            "dev",
        ])
        .unwrap();
        let config = InstanceProfileConfig::try_from(args).unwrap();
        assert_eq!(config.policy_arns.len(), 2);
        assert_eq!(config.aws.aws_profile.as_deref(), Some("dev"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let args =
            SecurityGroupArgs::try_parse_from(["create-security-group", "--name", ""]).unwrap();
        let errors = SecurityGroupConfig::try_from(args).unwrap_err();
        assert_eq!(errors.0, vec![ValidationError::Empty { flag: "name" }]);
    }
}
