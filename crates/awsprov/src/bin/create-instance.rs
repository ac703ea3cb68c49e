//! create-instance: launch an EC2 instance and print how to SSH into it.

use anyhow::Result;
use awsprov::aws::{Ec2Client, FromAwsContext};
use awsprov::cli::{init_tracing, print_error, InstanceArgs};
use awsprov::commands::instance;
use awsprov::config::InstanceConfig;
use awsprov::poll::{PollConfig, TokioSleeper};
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
    // Validate before touching AWS
    let config = InstanceConfig::try_from(InstanceArgs::parse())?;

    let aws = config.aws.load_context().await;
    let ec2 = Ec2Client::from_context(&aws);

    let outcome = instance::run(&ec2, &TokioSleeper, &PollConfig::default(), &config).await?;
    println!("{outcome}");
    Ok(())
}
