//! Shared test utilities for awsprov
//!
//! This crate provides common test helpers that can be used across
//! multiple test modules without circular dependencies.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and unique names for live tests
//! - [`fake`]: in-memory stand-in for the EC2 and IAM APIs
//! - [`sleeper`]: a [`Sleeper`](awsprov::poll::Sleeper) that records instead of waiting

pub mod aws;
pub mod fake;
pub mod sleeper;

// Re-export commonly used items
pub use aws::{get_test_region, unique_name};
pub use fake::{FakeCloud, FakeState};
pub use sleeper::RecordingSleeper;
