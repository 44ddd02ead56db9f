//! On-disk layout generations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CasError, Result};

/// One of the two coexisting layout/identifier generations.
///
/// Ordering follows the enumeration order: every V1 blob sorts before every V2 blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scheme {
    V1,
    V2,
}

impl Scheme {
    /// All supported schemes, oldest first.
    pub const ALL: [Scheme; 2] = [Scheme::V1, Scheme::V2];

    /// The newest scheme; used for new uploads and raw-field addressing by default.
    pub const LATEST: Scheme = Scheme::V2;

    /// Map a numeric version tag to a scheme.
    pub fn from_version(version: u32) -> Result<Self> {
        match version {
            1 => Ok(Scheme::V1),
            2 => Ok(Scheme::V2),
            other => Err(CasError::UnknownScheme(other.to_string())),
        }
    }

    pub fn version(self) -> u32 {
        match self {
            Scheme::V1 => 1,
            Scheme::V2 => 2,
        }
    }

    /// Name of the scheme's sub-tree directory under the storage root.
    pub fn root_dir(self) -> &'static str {
        match self {
            Scheme::V1 => "V1",
            Scheme::V2 => "V2",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_dir())
    }
}
