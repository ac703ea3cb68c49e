//! EC2 types and configuration

use std::fmt;

/// Launched instance info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedInstance {
    pub instance_id: String,
    pub instance_type: String,
    pub key_name: Option<String>,
    pub public_ip: Option<String>,
}

/// Configuration for launching an EC2 instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchInstanceConfig {
    /// Value of the instance's `Name` tag
    pub name: String,
    /// EC2 instance type (e.g., "t2.micro")
    pub instance_type: String,
    /// AMI to boot
    pub image_id: String,
    /// Security group name
    pub security_group: String,
    /// Key pair name used for SSH
    pub key_name: String,
}

impl LaunchInstanceConfig {
    /// Create a new launch configuration with required fields
    pub fn new(
        name: impl Into<String>,
        instance_type: impl Into<String>,
        image_id: impl Into<String>,
        security_group: impl Into<String>,
        key_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instance_type: instance_type.into(),
            image_id: image_id.into(),
            security_group: security_group.into(),
            key_name: key_name.into(),
        }
    }
}

/// A single ingress rule of a security group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: Option<i32>,
    pub to_port: Option<i32>,
    pub cidr_blocks: Vec<String>,
}

/// What `describe_security_groups` reports for one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupSummary {
    pub group_id: String,
    pub group_name: String,
    pub description: String,
    pub vpc_id: Option<String>,
    pub ingress: Vec<IngressRule>,
}

impl fmt::Display for SecurityGroupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Security group {} ({})", self.group_name, self.group_id)?;
        writeln!(f, "  Description: {}", self.description)?;
        writeln!(f, "  VPC:         {}", self.vpc_id.as_deref().unwrap_or("-"))?;
        write!(f, "  Ingress:")?;
        if self.ingress.is_empty() {
            write!(f, " none")?;
        }
        for rule in &self.ingress {
            let ports = match (rule.from_port, rule.to_port) {
                (Some(from), Some(to)) if from == to => from.to_string(),
                (Some(from), Some(to)) => format!("{from}-{to}"),
                _ => "all".to_string(),
            };
            write!(
                f,
                "\n    {}/{} from {}",
                rule.protocol,
                ports,
                rule.cidr_blocks.join(", ")
            )?;
        }
        Ok(())
    }
}
