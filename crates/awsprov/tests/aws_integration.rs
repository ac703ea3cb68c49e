//! Live AWS tests - these create and delete real resources
//!
//! Marked `#[ignore]`; run them with:
//! ```
//! AWS_PROFILE=your_profile cargo test -p awsprov --test aws_integration -- --ignored
//! ```

use awsprov::aws::{Ec2Client, IamClient};
use awsprov::commands::{default_vpc, instance_profile, security_group, vpc, Outcome};
use awsprov::config::{
    AwsConfig, DefaultVpcConfig, InstanceProfileConfig, SecurityGroupConfig, VpcConfig,
};
use awsprov::ensure::Ensured;
use awsprov_common::defaults::{default_availability_zone, S3_FULL_ACCESS_POLICY_ARN};
use awsprov_test_utils::{get_test_region, unique_name};

fn aws(region: &str) -> AwsConfig {
    AwsConfig {
        region: region.to_string(),
        aws_profile: None,
    }
}

/// Full VPC stack: create, reuse, then destroy
#[tokio::test]
#[ignore]
async fn test_vpc_lifecycle() {
    let region = get_test_region();
    let ec2 = Ec2Client::new(&region).await;
    let mut config = VpcConfig {
        aws: aws(&region),
        name: unique_name("awsprov-test-vpc"),
        availability_zone: default_availability_zone(&region),
        clean: false,
        destroy: false,
    };

    let created = vpc::run(&ec2, &config).await.expect("Should create VPC stack");
    let layout = created.descriptor().expect("Should describe the stack").clone();
    assert!(layout.vpc_id.starts_with("vpc-"));
    assert!(layout.endpoint_id.is_some(), "S3 endpoint should be created");

    let again = vpc::run(&ec2, &config).await.expect("Second run should succeed");
    assert!(
        matches!(again, Outcome::Ensured(Ensured::Existing(ref l)) if l.vpc_id == layout.vpc_id),
        "Second run should reuse the VPC"
    );

    config.destroy = true;
    let removed = vpc::run(&ec2, &config).await.expect("Should tear down VPC stack");
    assert_eq!(removed, Outcome::Removed(1));

    let left = ec2.find_vpcs(&config.name).await.expect("Should list VPCs");
    assert!(left.is_empty(), "VPC should be gone, found {:?}", left);
}

#[tokio::test]
#[ignore]
async fn test_security_group_lifecycle() {
    let region = get_test_region();
    let ec2 = Ec2Client::new(&region).await;
    let mut config = SecurityGroupConfig {
        aws: aws(&region),
        name: unique_name("awsprov-test-sg"),
        description: "awsprov integration test".to_string(),
        clean: false,
        recreate: false,
    };

    let created = security_group::run(&ec2, &config)
        .await
        .expect("Should create security group");
    let summary = created.descriptor().expect("Should describe the group");
    assert!(
        summary.ingress.iter().any(|r| r.from_port == Some(22)),
        "SSH should be allowed, got {:?}",
        summary.ingress
    );

    config.clean = true;
    let removed = security_group::run(&ec2, &config)
        .await
        .expect("Should delete security group");
    assert_eq!(removed, Outcome::Removed(1));
}

#[tokio::test]
#[ignore]
async fn test_instance_profile_lifecycle() {
    let region = get_test_region();
    let iam = IamClient::new(&region).await;
    let mut config = InstanceProfileConfig {
        aws: aws(&region),
        role_name: unique_name("awsprov-test-role"),
        policy_arns: vec![S3_FULL_ACCESS_POLICY_ARN.to_string()],
        clean: false,
        destroy: false,
    };

    let created = instance_profile::run(&iam, &config)
        .await
        .expect("Should create role and instance profile");
    let profile = created.descriptor().expect("Should describe the profile");
    assert_eq!(profile.name, config.role_name);
    assert!(profile.arn.is_some());

    config.destroy = true;
    let removed = instance_profile::run(&iam, &config)
        .await
        .expect("Should delete role and instance profile");
    assert_eq!(removed, Outcome::Removed(1));

    let left = iam
        .find_instance_profile(&config.role_name)
        .await
        .expect("Should look up instance profile");
    assert!(left.is_none(), "Instance profile should not exist after deletion");
}

#[tokio::test]
#[ignore]
async fn test_default_vpc_lookup() {
    let region = get_test_region();
    let ec2 = Ec2Client::new(&region).await;
    let config = DefaultVpcConfig { aws: aws(&region) };

    match default_vpc::run(&ec2, &config).await {
        Ok(vpc_id) => assert!(vpc_id.starts_with("vpc-")),
        Err(e) => assert!(e.to_string().starts_with("No default VPC in region")),
    }
}
