//! create-security-group: ensure a security group allowing SSH exists.

use anyhow::Result;
use awsprov::aws::{Ec2Client, FromAwsContext};
use awsprov::cli::{init_tracing, print_error, SecurityGroupArgs};
use awsprov::commands::security_group;
use awsprov::config::SecurityGroupConfig;
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
    let config = SecurityGroupConfig::try_from(SecurityGroupArgs::parse())?;

    let aws = config.aws.load_context().await;
    let ec2 = Ec2Client::from_context(&aws);

    let outcome = security_group::run(&ec2, &config).await?;
    println!("{outcome}");
    Ok(())
}
