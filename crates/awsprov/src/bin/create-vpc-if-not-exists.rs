//! create-vpc-if-not-exists: ensure a VPC stack with internet access and an
//! S3 endpoint exists.

use anyhow::Result;
use awsprov::aws::{Ec2Client, FromAwsContext};
use awsprov::cli::{init_tracing, print_error, VpcArgs};
use awsprov::commands::vpc;
use awsprov::config::VpcConfig;
use clap::Parser;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = VpcConfig::try_from(VpcArgs::parse())?;
    info!(name = %config.name, region = %config.aws.region, "Ensuring VPC");

    let aws = config.aws.load_context().await;
    let ec2 = Ec2Client::from_context(&aws);

    let outcome = vpc::run(&ec2, &config).await?;
    println!("{outcome}");
    Ok(())
}
