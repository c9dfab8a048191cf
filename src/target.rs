//! The closed set of supported build targets and their toolchain mappings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::BuildError;

/// A platform the service can cross-compile a client for.
///
/// Every mapping below is an exhaustive match, so adding or removing a
/// platform is a single edit here and the compiler flags every site that
/// needs to learn about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    Windows,
    Linux,
    Macos,
}

impl BuildTarget {
    /// Every supported target, in the order the admin form lists them.
    pub const ALL: [BuildTarget; 3] =
        [BuildTarget::Windows, BuildTarget::Linux, BuildTarget::Macos];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Macos => "macos",
        }
    }

    /// Value for the toolchain's `GOOS` environment parameter.
    pub fn toolchain_os(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Macos => "darwin",
        }
    }

    /// Value for the toolchain's `GOARCH` environment parameter. Each
    /// target is a fixed (OS, arch) pair, not a grid.
    pub fn toolchain_arch(&self) -> &'static str {
        match self {
            Self::Windows => "amd64",
            Self::Linux => "amd64",
            Self::Macos => "amd64",
        }
    }

    /// Filename extension convention for produced executables.
    pub fn artifact_extension(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Linux => "",
            Self::Macos => "",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = BuildError;

    /// Exact match over the closed selector set. Anything else is rejected
    /// here, before any side effect can occur.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::Macos),
            _ => Err(BuildError::InvalidTarget(s.to_string())),
        }
    }
}
