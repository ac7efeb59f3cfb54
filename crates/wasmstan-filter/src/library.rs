//! Upstream libraries whose suites the harness runs

use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;

/// Collaborator library under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
    /// The HTTP compilation service
    Httpstan,
    /// The client library talking to the service
    Pystan,
}

impl Library {
    /// Every supported library
    pub const ALL: [Library; 2] = [Self::Httpstan, Self::Pystan];

    /// Checkout directory name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Httpstan => "httpstan",
            Self::Pystan => "pystan",
        }
    }

    /// Library for a checkout directory name
    #[must_use]
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lib| lib.as_str() == name)
    }

    /// Library whose checkout is `dir`, judged by its final component
    ///
    /// # Errors
    /// [`FilterError::UnknownLibrary`] if the directory name matches no library
    pub fn detect(dir: &Path) -> Result<Self, FilterError> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_dir_name(&name).ok_or(FilterError::UnknownLibrary(name))
    }
}

impl Display for Library {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Library {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dir_name(&s.to_ascii_lowercase()).ok_or_else(|| FilterError::UnknownLibrary(s.to_string()))
    }
}
