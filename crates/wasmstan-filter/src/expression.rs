//! Runner selection expressions
//!
//! [`build_filter`] turns a library's exclusions into the `-k` expression the
//! Python test runner accepts: `not a and not b ...`. A test runs iff none
//! of the excluded identifiers is a substring of its name.

use crate::exclusion::ExclusionList;
use crate::library::Library;
use std::fmt::{self, Display, Formatter};

/// Conjunction of negated substring matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    excluded: Vec<String>,
}

impl FilterExpression {
    /// Expression excluding every entry of `list`
    #[must_use]
    pub fn from_exclusions(list: &ExclusionList) -> Self {
        Self {
            excluded: list.entries().iter().map(|e| e.pattern.clone()).collect(),
        }
    }

    /// Excluded identifiers in declaration order
    #[inline]
    #[must_use]
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Whether `test_name` is selected
    #[must_use]
    pub fn matches(&self, test_name: &str) -> bool {
        !self.excluded.iter().any(|pattern| test_name.contains(pattern.as_str()))
    }

    /// Arguments to pass to the runner, empty if nothing is excluded
    #[must_use]
    pub fn runner_args(&self) -> Vec<String> {
        if self.excluded.is_empty() {
            Vec::new()
        } else {
            vec!["-k".to_string(), self.to_string()]
        }
    }
}

impl Display for FilterExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, pattern) in self.excluded.iter().enumerate() {
            if i > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "not {pattern}")?;
        }
        Ok(())
    }
}

/// Selection expression for `library`'s suite
#[must_use]
pub fn build_filter(library: Library) -> FilterExpression {
    let list = ExclusionList::for_library(library);
    let expression = FilterExpression::from_exclusions(&list);
    tracing::debug!(%library, excluded = list.len(), %expression, "built test filter");
    expression
}
