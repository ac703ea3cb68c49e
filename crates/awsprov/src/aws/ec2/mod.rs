//! EC2 client: VPC stacks, instances and security groups

mod instance;
mod operations;
mod security_group;
mod types;
mod vpc;

pub use operations::{InstanceOperations, SecurityGroupOperations, VpcOperations};
pub use types::{IngressRule, LaunchInstanceConfig, LaunchedInstance, SecurityGroupSummary};

#[cfg(test)]
pub use operations::{MockInstanceOperations, MockSecurityGroupOperations, MockVpcOperations};

use crate::aws::context::{AwsContext, FromAwsContext};
use aws_sdk_ec2::types::{Filter, ResourceType, Tag, TagSpecification};
use aws_sdk_ec2::Client;
use awsprov_common::tags::{NAME_TAG_FILTER, TAG_NAME, TAG_TOOL, TAG_TOOL_VALUE};

/// EC2 client for the provisioning utilities
pub struct Ec2Client {
    pub(crate) client: Client,
}

impl Ec2Client {
    /// Create a new EC2 client (loads AWS config from environment)
    pub async fn new(region: &str) -> Self {
        let ctx = AwsContext::new(region).await;
        Self::from_context(&ctx)
    }
}

impl FromAwsContext for Ec2Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }
}

/// Filter matching resources whose `Name` tag equals `name`
pub(crate) fn name_filter(name: &str) -> Filter {
    Filter::builder().name(NAME_TAG_FILTER).values(name).build()
}

/// Filter matching resources inside `vpc_id`
pub(crate) fn vpc_filter(vpc_id: &str) -> Filter {
    Filter::builder().name("vpc-id").values(vpc_id).build()
}

/// Tag specification giving a new resource its `Name` plus the tool tag
pub(crate) fn name_tag_spec(resource_type: ResourceType, name: &str) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Tag::builder().key(TAG_NAME).value(name).build())
        .tags(Tag::builder().key(TAG_TOOL).value(TAG_TOOL_VALUE).build())
        .build()
}
