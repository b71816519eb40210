#![forbid(unsafe_code)]

use std::path::Path;

/// Repository content state: the checked-out revision plus a signature of the working tree.
///
/// Equality is exact on both fields. A repository without commits has `revision: None`
/// and is still comparable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub revision: Option<String>,
    pub dirty_signature: Option<String>,
}

impl Fingerprint {
    pub fn new(revision: Option<String>, dirty_signature: Option<String>) -> Self {
        Self {
            revision,
            dirty_signature,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FingerprintProbe {
    Comparable(Fingerprint),
    /// The root is not under version control, or the version-control tool is unavailable.
    NotARepository,
}

impl FingerprintProbe {
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            Self::Comparable(fp) => Some(fp),
            Self::NotARepository => None,
        }
    }

    pub fn into_fingerprint(self) -> Option<Fingerprint> {
        match self {
            Self::Comparable(fp) => Some(fp),
            Self::NotARepository => None,
        }
    }
}

/// Read-only inspection of a repository root.
pub trait FingerprintProvider {
    fn probe(&self, root: &Path) -> FingerprintProbe;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(rev: &str, dirty: &str) -> Fingerprint {
        Fingerprint::new(Some(rev.to_string()), Some(dirty.to_string()))
    }

    #[test]
    fn equality_is_exact_on_both_fields() {
        assert_eq!(fp("A", "d0"), fp("A", "d0"));
        assert_ne!(fp("A", "d0"), fp("A", "d1"));
        assert_ne!(fp("A", "d0"), fp("B", "d0"));
        assert_ne!(fp("A", "d0"), fp("a", "d0"));
        assert_ne!(
            fp("A", "d0"),
            Fingerprint::new(None, Some("d0".to_string()))
        );
    }

    #[test]
    fn unborn_revision_is_still_comparable() {
        let unborn = Fingerprint::new(None, Some("d0".to_string()));
        let probe = FingerprintProbe::Comparable(unborn.clone());
        assert_eq!(probe.fingerprint(), Some(&unborn));
        assert!(unborn.revision.is_none());
        assert!(FingerprintProbe::NotARepository.fingerprint().is_none());
    }
}
