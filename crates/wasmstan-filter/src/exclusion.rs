//! Exclusion lists
//!
//! Each upstream library carries a fixed list of tests the substitute backend
//! is not expected to pass, every entry tagged with why.

use crate::error::FilterError;
use crate::library::Library;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

static IDENTIFIER: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"));

/// Operators of the runner's `-k` expression language
const KEYWORDS: [&str; 3] = ["and", "or", "not"];

/// Why a test is excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionReason {
    /// Feature the substitute backend does not implement
    UnsupportedFeature,
    /// Caching behaves differently between the backends
    CacheSemantics,
    /// Values the transport encoding cannot round-trip
    NumericEncoding,
    /// Asserts on internals of the upstream backend
    BackendInternals,
}

impl ExclusionReason {
    /// Stable kebab-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedFeature => "unsupported-feature",
            Self::CacheSemantics => "cache-semantics",
            Self::NumericEncoding => "numeric-encoding",
            Self::BackendInternals => "backend-internals",
        }
    }
}

impl Display for ExclusionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One excluded test identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    /// Identifier matched by substring against test names
    pub pattern: String,
    /// Category
    pub reason: ExclusionReason,
    /// Short note on the specific test
    pub note: String,
}

impl Exclusion {
    /// Create new exclusion
    #[must_use]
    pub fn new(pattern: impl Into<String>, reason: ExclusionReason, note: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            reason,
            note: note.into(),
        }
    }

    /// Whether `test_name` is hit by this exclusion
    #[inline]
    #[must_use]
    pub fn matches(&self, test_name: &str) -> bool {
        test_name.contains(self.pattern.as_str())
    }
}

/// Validated list of exclusions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionList {
    entries: Vec<Exclusion>,
}

impl ExclusionList {
    /// Validate and collect `entries`
    ///
    /// # Errors
    /// - [`FilterError::InvalidIdentifier`] for a pattern that is not a plain identifier
    /// - [`FilterError::ReservedKeyword`] for `and`, `or` or `not`
    /// - [`FilterError::DuplicateIdentifier`] for a pattern listed twice
    pub fn new(entries: impl IntoIterator<Item = Exclusion>) -> Result<Self, FilterError> {
        let identifier = IDENTIFIER.as_ref().map_err(Clone::clone)?;
        let entries: Vec<_> = entries.into_iter().collect();

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !identifier.is_match(&entry.pattern) {
                return Err(FilterError::InvalidIdentifier(entry.pattern.clone()));
            }
            if KEYWORDS.contains(&entry.pattern.as_str()) {
                return Err(FilterError::ReservedKeyword(entry.pattern.clone()));
            }
            if !seen.insert(entry.pattern.clone()) {
                return Err(FilterError::DuplicateIdentifier(entry.pattern.clone()));
            }
        }

        Ok(Self { entries })
    }

    /// Built-in exclusions for `library`
    #[must_use]
    pub fn for_library(library: Library) -> Self {
        use ExclusionReason::{BackendInternals, CacheSemantics, NumericEncoding, UnsupportedFeature};

        let table: &[(&str, ExclusionReason, &str)] = match library {
            Library::Httpstan => &[
                ("test_function_arguments", BackendInternals, "introspects services module signatures"),
                ("test_list_model_names", BackendInternals, "expects models compiled by the upstream service"),
                ("test_openapi_spec", BackendInternals, "checks the upstream service's OpenAPI document"),
                ("test_cvodes", UnsupportedFeature, "CVODES ODE solver not built into the backend"),
                ("test_bernoulli_unacceptable_arg", UnsupportedFeature, "detailed bad-argument errors"),
                ("test_bernoulli_unknown_arg", UnsupportedFeature, "detailed bad-argument errors"),
                ("test_build_unknown_arg", UnsupportedFeature, "detailed bad-argument errors"),
                ("test_models_actions_bad_args", UnsupportedFeature, "detailed bad-argument errors"),
                ("test_user_inits_invalid_value", UnsupportedFeature, "detailed bad-argument errors"),
                ("test_nan_inf", NumericEncoding, "NaN and infinities do not survive JSON transport"),
            ],
            Library::Pystan => &[
                ("test_fit_cache", CacheSemantics, "fit caching differs from the upstream service"),
                ("test_nan_inf", NumericEncoding, "NaN and infinities do not survive JSON transport"),
            ],
        };

        Self {
            entries: table
                .iter()
                .map(|&(pattern, reason, note)| Exclusion::new(pattern, reason, note))
                .collect(),
        }
    }

    /// Entries in declaration order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[Exclusion] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is excluded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First exclusion hitting `test_name`
    #[must_use]
    pub fn excluding(&self, test_name: &str) -> Option<&Exclusion> {
        self.entries.iter().find(|e| e.matches(test_name))
    }

    /// Entries with the given reason
    pub fn by_reason(&self, reason: ExclusionReason) -> impl Iterator<Item = &Exclusion> {
        self.entries.iter().filter(move |e| e.reason == reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_lists_pass_validation() {
        for library in Library::ALL {
            let builtin = ExclusionList::for_library(library);
            let revalidated = ExclusionList::new(builtin.entries().to_vec()).unwrap();
            assert_eq!(revalidated, builtin);
        }
    }

    #[test]
    fn expression_keywords_are_rejected() {
        for keyword in ["and", "or", "not"] {
            let err = ExclusionList::new([
                Exclusion::new("test_fit_cache", ExclusionReason::CacheSemantics, ""),
                Exclusion::new(keyword, ExclusionReason::UnsupportedFeature, ""),
            ])
            .unwrap_err();
            assert_eq!(err, FilterError::ReservedKeyword(keyword.to_string()));
        }

        // Only the bare words; identifiers containing them are fine
        ExclusionList::new([
            Exclusion::new("test_and", ExclusionReason::UnsupportedFeature, ""),
            Exclusion::new("nothing", ExclusionReason::UnsupportedFeature, ""),
            Exclusion::new("AND", ExclusionReason::UnsupportedFeature, ""),
        ])
        .unwrap();
    }

    #[test]
    fn pystan_list_is_cache_and_nan() {
        let list = ExclusionList::for_library(Library::Pystan);
        let patterns: Vec<_> = list.entries().iter().map(|e| e.pattern.as_str()).collect();
        assert_eq!(patterns, ["test_fit_cache", "test_nan_inf"]);
    }

    #[test]
    fn httpstan_groups_bad_argument_tests_as_unsupported() {
        let list = ExclusionList::for_library(Library::Httpstan);
        assert_eq!(list.len(), 10);
        assert_eq!(list.by_reason(ExclusionReason::UnsupportedFeature).count(), 6);
        assert_eq!(list.by_reason(ExclusionReason::BackendInternals).count(), 3);
    }

    #[test]
    fn rejects_non_identifiers() {
        for bad in ["", "1test", "test-nan", "not a", "a or b"] {
            let err = ExclusionList::new([Exclusion::new(bad, ExclusionReason::UnsupportedFeature, "")]);
            assert_eq!(err, Err(FilterError::InvalidIdentifier(bad.to_string())));
        }
    }

    #[test]
    fn rejects_duplicates() {
        let entry = Exclusion::new("test_nan_inf", ExclusionReason::NumericEncoding, "");
        let err = ExclusionList::new([entry.clone(), entry]);
        assert_eq!(err, Err(FilterError::DuplicateIdentifier("test_nan_inf".to_string())));
    }

    #[test]
    fn excluding_is_substring_match() {
        let list = ExclusionList::for_library(Library::Httpstan);
        assert_eq!(
            list.excluding("test_cvodes_solver").map(|e| e.reason),
            Some(ExclusionReason::UnsupportedFeature)
        );
        assert!(list.excluding("test_basic").is_none());
    }
}
