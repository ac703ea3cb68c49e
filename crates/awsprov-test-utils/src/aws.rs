//! Region and naming helpers for the live AWS tests

use awsprov_common::defaults::DEFAULT_REGION;
use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Region for live tests: `AWS_REGION`, then `AWS_DEFAULT_REGION`, then the
/// utilities' default region.
pub fn get_test_region() -> String {
    ["AWS_REGION", "AWS_DEFAULT_REGION"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

/// A resource name no other test run will pick: `{prefix}-{unix_ms}-{n}`.
///
/// ```
/// use awsprov_test_utils::aws::unique_name;
///
/// assert!(unique_name("awsprov-test").starts_with("awsprov-test-"));
/// ```
pub fn unique_name(prefix: &str) -> String {
    static SEQ: AtomicU32 = AtomicU32::new(0);

    let n = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_in_one_run_differ() {
        let a = unique_name("t");
        let b = unique_name("t");
        assert_ne!(a, b);
        assert!(a.starts_with("t-"));
    }
}
