//! Idempotent resource creation.
//!
//! A [`ManagedResource`] knows how to look itself up by name, delete the
//! matches, and create a fresh copy. [`ensure`] combines the three so that
//! exactly one resource with that name exists afterwards.

use anyhow::Result;
use awsprov_common::ResourceKind;
use tracing::info;

/// A named provider resource the utilities can find, remove and create.
#[allow(async_fn_in_trait)]
pub trait ManagedResource {
    /// What a lookup or a creation yields (at minimum an identifier)
    type Descriptor;

    /// Kind of the top-level resource, for logging
    fn kind(&self) -> ResourceKind;

    /// Name or tag value identifying the resource
    fn name(&self) -> &str;

    /// Every existing resource matching the name
    async fn find(&self) -> Result<Vec<Self::Descriptor>>;

    /// Delete the given matches together with their dependents
    async fn remove(&self, existing: &[Self::Descriptor]) -> Result<()>;

    /// Create a fresh resource
    async fn create(&self) -> Result<Self::Descriptor>;
}

/// Outcome of [`ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured<D> {
    /// A matching resource was already there and was left alone
    Existing(D),
    /// The resource was created by this run
    Created(D),
}

impl<D> Ensured<D> {
    pub fn is_created(&self) -> bool {
        matches!(self, Ensured::Created(_))
    }

    pub fn descriptor(&self) -> &D {
        match self {
            Ensured::Existing(d) | Ensured::Created(d) => d,
        }
    }

    pub fn into_inner(self) -> D {
        match self {
            Ensured::Existing(d) | Ensured::Created(d) => d,
        }
    }

    /// Replace the descriptor, keeping whether it was created
    pub fn map<T>(self, f: impl FnOnce(D) -> T) -> Ensured<T> {
        match self {
            Ensured::Existing(d) => Ensured::Existing(f(d)),
            Ensured::Created(d) => Ensured::Created(f(d)),
        }
    }
}

/// Make sure exactly one resource named like `resource` exists.
///
/// Without `clean`, the first existing match is returned untouched. With
/// `clean`, all matches are removed before a new one is created. Any failure
/// aborts immediately and leaves whatever was already done in place.
pub async fn ensure<R: ManagedResource>(resource: &R, clean: bool) -> Result<Ensured<R::Descriptor>> {
    let kind = resource.kind();
    let name = resource.name();
    let existing = resource.find().await?;
    let count = existing.len();

    if !clean {
        if let Some(first) = existing.into_iter().next() {
            info!(kind = %kind, name = %name, count, "Already exists, skipping creation");
            return Ok(Ensured::Existing(first));
        }
    } else if count > 0 {
        info!(kind = %kind, name = %name, count, "Removing existing resources before creating");
        resource.remove(&existing).await?;
    }

    info!(kind = %kind, name = %name, "Creating");
    let created = resource.create().await?;
    Ok(Ensured::Created(created))
}

/// Remove every resource named like `resource` without creating anything.
///
/// Returns how many matches were removed.
pub async fn remove_existing<R: ManagedResource>(resource: &R) -> Result<usize> {
    let existing = resource.find().await?;
    if existing.is_empty() {
        info!(kind = %resource.kind(), name = %resource.name(), "Nothing to remove");
        return Ok(0);
    }

    info!(
        kind = %resource.kind(),
        name = %resource.name(),
        count = existing.len(),
        "Removing existing resources"
    );
    resource.remove(&existing).await?;
    Ok(existing.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        existing: Vec<String>,
        fail_create: bool,
        calls: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new(existing: &[&str]) -> Self {
            Self {
                existing: existing.iter().map(|s| s.to_string()).collect(),
                fail_create: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ManagedResource for Recording {
        type Descriptor = String;

        fn kind(&self) -> ResourceKind {
            ResourceKind::Vpc
        }

        fn name(&self) -> &str {
            "demo"
        }

        async fn find(&self) -> Result<Vec<String>> {
            self.calls.lock().unwrap().push("find".into());
            Ok(self.existing.clone())
        }

        async fn remove(&self, existing: &[String]) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("remove {}", existing.join(",")));
            Ok(())
        }

        async fn create(&self) -> Result<String> {
            self.calls.lock().unwrap().push("create".into());
            if self.fail_create {
                anyhow::bail!("create failed");
            }
            Ok("new-1".into())
        }
    }

    #[tokio::test]
    async fn creates_exactly_once_when_absent() {
        let resource = Recording::new(&[]);
        let result = ensure(&resource, false).await.unwrap();

        assert_eq!(result, Ensured::Created("new-1".to_string()));
        assert_eq!(resource.calls(), vec!["find", "create"]);
    }

    #[tokio::test]
    async fn existing_without_clean_is_left_alone() {
        let resource = Recording::new(&["old-1", "old-2"]);
        let result = ensure(&resource, false).await.unwrap();

        assert_eq!(result, Ensured::Existing("old-1".to_string()));
        assert!(!result.is_created());
        assert_eq!(resource.calls(), vec!["find"]);
    }

    #[tokio::test]
    async fn existing_with_clean_is_removed_before_create() {
        let resource = Recording::new(&["old-1", "old-2"]);
        let result = ensure(&resource, true).await.unwrap();

        assert_eq!(result.into_inner(), "new-1");
        assert_eq!(resource.calls(), vec!["find", "remove old-1,old-2", "create"]);
    }

    #[tokio::test]
    async fn clean_with_nothing_existing_just_creates() {
        let resource = Recording::new(&[]);
        ensure(&resource, true).await.unwrap();
        assert_eq!(resource.calls(), vec!["find", "create"]);
    }

    #[tokio::test]
    async fn create_failure_surfaces_after_removal() {
        let mut resource = Recording::new(&["old-1"]);
        resource.fail_create = true;

        let err = ensure(&resource, true).await.unwrap_err();
        assert_eq!(err.to_string(), "create failed");
        assert_eq!(resource.calls(), vec!["find", "remove old-1", "create"]);
    }

    #[tokio::test]
    async fn remove_existing_never_creates() {
        let resource = Recording::new(&["old-1"]);
        assert_eq!(remove_existing(&resource).await.unwrap(), 1);
        assert_eq!(resource.calls(), vec!["find", "remove old-1"]);

        let empty = Recording::new(&[]);
        assert_eq!(remove_existing(&empty).await.unwrap(), 0);
        assert_eq!(empty.calls(), vec!["find"]);
    }
}
