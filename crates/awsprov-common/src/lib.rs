//! awsprov-common - Shared defaults and naming conventions
//!
//! This crate holds the constants and naming rules used by every awsprov
//! utility, without any AWS SDK dependencies so the test helpers can share
//! them cheaply.
//!
//! ## Modules
//!
//! - [`defaults`]: Default flag values, CIDR blocks and poll bounds
//! - [`resource_kind`]: Kinds of AWS resources the utilities manage
//! - [`tags`]: `Name` tag conventions for dependent resources

pub mod defaults;
pub mod resource_kind;
pub mod tags;

pub use resource_kind::ResourceKind;
