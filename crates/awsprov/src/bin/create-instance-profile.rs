//! create-instance-profile: ensure an EC2 role and a same-named instance
//! profile exist.

use anyhow::Result;
use awsprov::aws::{FromAwsContext, IamClient};
use awsprov::cli::{init_tracing, print_error, InstanceProfileArgs};
use awsprov::commands::instance_profile;
use awsprov::config::InstanceProfileConfig;
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = InstanceProfileConfig::try_from(InstanceProfileArgs::parse())?;

    let aws = config.aws.load_context().await;
    let iam = IamClient::from_context(&aws);

    let outcome = instance_profile::run(&iam, &config).await?;
    println!("{outcome}");
    Ok(())
}
