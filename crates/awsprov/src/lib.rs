//! awsprov - provisioning and teardown of AWS test infrastructure
//!
//! This crate provides the library behind the awsprov command-line
//! utilities: thin EC2/IAM clients behind capability traits, an idempotent
//! resource ensurer, a bounded poll-until-ready loop and the
//! dependency-ordered VPC teardown.

pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod ensure;
pub mod poll;
pub mod teardown;
