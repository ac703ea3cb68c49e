//! `Name` tag conventions
//!
//! A VPC stack is identified by the `Name` tag of its VPC. Every dependent
//! resource carries the same base name plus a suffix naming its kind:
//!
//! | Resource | `Name` tag |
//! |----------|------------|
//! | VPC | `<name>` |
//! | Subnet | `<name>-sn` |
//! | Internet gateway | `<name>-ig` |
//! | Route table | `<name>-rt` |
//!
//! Resources created by the utilities also carry `awsprov:tool=awsprov` so
//! they can be told apart from hand-made ones in the console.

/// The tag key the console displays as the resource name
pub const TAG_NAME: &str = "Name";

/// Tag key for tool identification
pub const TAG_TOOL: &str = "awsprov:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "awsprov";

/// Filter name matching the `Name` tag in EC2 describe calls
pub const NAME_TAG_FILTER: &str = "tag:Name";

/// Suffix of the subnet's `Name` tag
pub const SUBNET_SUFFIX: &str = "-sn";

/// Suffix of the internet gateway's `Name` tag
pub const GATEWAY_SUFFIX: &str = "-ig";

/// Suffix of the route table's `Name` tag
pub const ROUTE_TABLE_SUFFIX: &str = "-rt";

/// `Name` tag of the subnet belonging to stack `name`
pub fn subnet_name(name: &str) -> String {
    format!("{name}{SUBNET_SUFFIX}")
}

/// `Name` tag of the internet gateway belonging to stack `name`
pub fn gateway_name(name: &str) -> String {
    format!("{name}{GATEWAY_SUFFIX}")
}

/// `Name` tag of the route table belonging to stack `name`
pub fn route_table_name(name: &str) -> String {
    format!("{name}{ROUTE_TABLE_SUFFIX}")
}
