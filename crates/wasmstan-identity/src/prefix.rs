//! Fixed-identity stand-in
//!
//! [`PrefixIdentity`] equals any string in the model namespace. It does not
//! distinguish models at all, so it only suits collaborators that check the
//! namespace and nothing else. Prefer [`crate::resolve`].

use crate::identity::{ModelIdentity, MODEL_NAMESPACE};

/// Placeholder id reported by [`PrefixIdentity::segments`]
pub const PLACEHOLDER_ID: &str = "0000000000";

/// Identity that compares equal to every `models/...` string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefixIdentity;

impl PrefixIdentity {
    /// Create the stand-in; the source is ignored
    #[inline]
    #[must_use]
    pub fn new(_source_code: &[u8]) -> Self {
        Self
    }

    /// Whether `other` lies in the model namespace
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        other
            .strip_prefix(MODEL_NAMESPACE)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Path segments, `["models", "0000000000"]`
    #[inline]
    #[must_use]
    pub fn segments(&self) -> [&'static str; 2] {
        [MODEL_NAMESPACE, PLACEHOLDER_ID]
    }
}

impl PartialEq<str> for PrefixIdentity {
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl PartialEq<&str> for PrefixIdentity {
    fn eq(&self, other: &&str) -> bool {
        self.matches(other)
    }
}

impl PartialEq<String> for PrefixIdentity {
    fn eq(&self, other: &String) -> bool {
        self.matches(other)
    }
}

impl PartialEq<ModelIdentity> for PrefixIdentity {
    fn eq(&self, other: &ModelIdentity) -> bool {
        self.matches(other.as_str())
    }
}
