//! One loaded SDK configuration, shared by the EC2 and IAM clients
//!
//! Credentials and endpoints come from the SDK's standard resolution chain
//! (environment, config files, instance roles). Only the region and an
//! optional named profile are pinned here.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::fmt;
use std::sync::Arc;

/// Loaded AWS configuration for a single region.
///
/// ```ignore
/// let ctx = AwsContext::with_profile("ap-northeast-1", Some("dev")).await;
/// let ec2 = Ec2Client::from_context(&ctx);
/// ```
#[derive(Clone)]
pub struct AwsContext {
    sdk: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    pub async fn new(region: &str) -> Self {
        Self::with_profile(region, None).await
    }

    /// Load configuration for `region`, reading credentials from `profile`
    /// when one is given
    pub async fn with_profile(region: &str, profile: Option<&str>) -> Self {
        let loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()));
        let loader = match profile {
            Some(profile) => loader.profile_name(profile),
            None => loader,
        };

        Self {
            sdk: Arc::new(loader.load().await),
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn ec2_client(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(&self.sdk)
    }

    pub fn iam_client(&self) -> aws_sdk_iam::Client {
        aws_sdk_iam::Client::new(&self.sdk)
    }
}

impl fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Clients that can be built from a loaded [`AwsContext`]
pub trait FromAwsContext: Sized {
    fn from_context(ctx: &AwsContext) -> Self;
}
