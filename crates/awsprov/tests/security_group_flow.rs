//! Security group provisioning against the in-memory fake

use awsprov::commands::{security_group, Outcome};
use awsprov::config::{AwsConfig, SecurityGroupConfig};
use awsprov::ensure::Ensured;
use awsprov_test_utils::FakeCloud;

fn config(clean: bool, recreate: bool) -> SecurityGroupConfig {
    SecurityGroupConfig {
        aws: AwsConfig {
            region: "ap-northeast-1".to_string(),
            aws_profile: None,
        },
        name: "web".to_string(),
        description: "web servers".to_string(),
        clean,
        recreate,
    }
}

#[tokio::test]
async fn creates_group_with_ssh_ingress() {
    let cloud = FakeCloud::new().with_default_vpc("vpc-default");

    let outcome = security_group::run(&cloud, &config(false, false)).await.unwrap();
    let Outcome::Ensured(Ensured::Created(summary)) = outcome else {
        panic!("expected a created group");
    };

    assert_eq!(summary.group_name, "web");
    assert_eq!(summary.vpc_id.as_deref(), Some("vpc-default"));
    assert_eq!(summary.ingress.len(), 1);
    assert_eq!(summary.ingress[0].from_port, Some(22));
    assert_eq!(summary.ingress[0].cidr_blocks, vec!["0.0.0.0/0".to_string()]);
    assert!(summary.to_string().contains("tcp/22 from 0.0.0.0/0"));
}

#[tokio::test]
async fn rerun_keeps_the_same_group() {
    let cloud = FakeCloud::new();
    let first = security_group::run(&cloud, &config(false, false)).await.unwrap();
    let second = security_group::run(&cloud, &config(false, false)).await.unwrap();

    assert_eq!(
        first.descriptor().unwrap().group_id,
        second.descriptor().unwrap().group_id
    );
    assert!(matches!(second, Outcome::Ensured(Ensured::Existing(_))));
    assert_eq!(cloud.snapshot().security_groups.len(), 1);
}

#[tokio::test]
async fn recreate_replaces_the_group() {
    let cloud = FakeCloud::new();
    let first = security_group::run(&cloud, &config(false, false)).await.unwrap();
    let second = security_group::run(&cloud, &config(false, true)).await.unwrap();

    let old_id = &first.descriptor().unwrap().group_id;
    let new_id = &second.descriptor().unwrap().group_id;
    assert_ne!(old_id, new_id);

    let state = cloud.snapshot();
    assert_eq!(state.security_groups.len(), 1);
    assert!(state.security_groups.contains_key(new_id));
}

#[tokio::test]
async fn clean_deletes_and_stops() {
    let cloud = FakeCloud::new();
    security_group::run(&cloud, &config(false, false)).await.unwrap();
    cloud.clear_calls();

    let outcome = security_group::run(&cloud, &config(true, false)).await.unwrap();

    assert_eq!(outcome, Outcome::Removed(1));
    assert!(cloud.snapshot().security_groups.is_empty());
    assert_eq!(
        cloud.operations(),
        vec!["find_security_groups", "delete_security_group"]
    );
}
