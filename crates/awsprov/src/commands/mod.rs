//! One module per utility.
//!
//! Each `run` function takes the capability traits it needs plus its config
//! and returns what the binary prints.

pub mod default_vpc;
pub mod instance;
pub mod instance_profile;
pub mod security_group;
pub mod vpc;

use crate::ensure::Ensured;
use std::fmt;

/// Result of a command built on the ensurer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<D> {
    /// The resource exists now, either found or freshly created
    Ensured(Ensured<D>),
    /// Existing resources were deleted and nothing was created
    Removed(usize),
}

impl<D> Outcome<D> {
    /// The resulting descriptor, unless this was a removal
    pub fn descriptor(&self) -> Option<&D> {
        match self {
            Outcome::Ensured(ensured) => Some(ensured.descriptor()),
            Outcome::Removed(_) => None,
        }
    }
}

impl<D: fmt::Display> fmt::Display for Outcome<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ensured(Ensured::Existing(d)) => {
                write!(f, "Already exists, nothing created\n{d}")
            }
            Outcome::Ensured(Ensured::Created(d)) => write!(f, "{d}"),
            Outcome::Removed(0) => write!(f, "Nothing to remove"),
            Outcome::Removed(1) => write!(f, "Removed 1 existing resource"),
            Outcome::Removed(n) => write!(f, "Removed {n} existing resources"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_messages() {
        let existing: Outcome<&str> = Outcome::Ensured(Ensured::Existing("vpc-1"));
        assert_eq!(existing.to_string(), "Already exists, nothing created\nvpc-1");
        assert_eq!(existing.descriptor(), Some(&"vpc-1"));

        let removed: Outcome<&str> = Outcome::Removed(2);
        assert_eq!(removed.to_string(), "Removed 2 existing resources");
        assert_eq!(removed.descriptor(), None);
        assert_eq!(Outcome::<&str>::Removed(0).to_string(), "Nothing to remove");
    }
}
