//! get-default-vpc: print the region's default VPC ID.

use anyhow::Result;
use awsprov::aws::{Ec2Client, FromAwsContext};
use awsprov::cli::{init_tracing, print_error, DefaultVpcArgs};
use awsprov::commands::default_vpc;
use awsprov::config::DefaultVpcConfig;
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
    let config = DefaultVpcConfig::from(DefaultVpcArgs::parse());

    let aws = config.aws.load_context().await;
    let ec2 = Ec2Client::from_context(&aws);

    let vpc_id = default_vpc::run(&ec2, &config).await?;
    println!("VPC ID: {vpc_id}");
    Ok(())
}
