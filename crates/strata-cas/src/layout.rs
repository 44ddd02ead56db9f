//! Shard path derivation.
//!
//! ```text
//! <root>/V1/<h0>/<h1>/.../<h7>/<size>          data
//! <root>/V1/<h0>/<h1>/.../<h7>/<.ext|.none>    record marker
//! <root>/V2/<size>/<h0>/.../<h7>/_data_        data
//! <root>/V2/<size>/<h0>/.../<h7>/<name>        record marker
//! ```

use std::path::{Component, Path, PathBuf};

use crate::codec::{parse_size, DATA_SENTINEL, NONE_EXT};
use crate::identity::{is_plain_file_name, AddressedIdentity, ContentHash, SEGMENT_LEN};
use crate::scheme::Scheme;
use crate::{CasError, Result};

/// Number of hash segments in every shard directory.
pub const HASH_SEGMENTS: usize = 8;

/// Derived on-disk location of one blob under one scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardPath {
    scheme: Scheme,
    data_dir: Vec<String>,
    data_file_name: String,
    record_file_name: String,
}

impl ShardPath {
    /// Derive the layout of `identity` under `scheme`, which need not be the
    /// identity's own scheme.
    pub fn derive(identity: &AddressedIdentity, scheme: Scheme) -> Self {
        let mut data_dir = Vec::with_capacity(HASH_SEGMENTS + 1);
        if scheme == Scheme::V2 {
            data_dir.push(identity.size().to_string());
        }
        data_dir.extend(identity.hash().segments().map(str::to_string));

        let (data_file_name, record_file_name) = match scheme {
            Scheme::V1 => (identity.size().to_string(), identity.extension().to_string()),
            Scheme::V2 => (DATA_SENTINEL.to_string(), identity.name().to_string()),
        };

        Self {
            scheme,
            data_dir,
            data_file_name,
            record_file_name,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Directory segments below the scheme root.
    pub fn data_dir(&self) -> &[String] {
        &self.data_dir
    }

    pub fn data_file_name(&self) -> &str {
        &self.data_file_name
    }

    pub fn record_file_name(&self) -> &str {
        &self.record_file_name
    }

    pub fn dir_path(&self, root: &Path) -> PathBuf {
        let mut path = scheme_root(root, self.scheme);
        path.extend(&self.data_dir);
        path
    }

    pub fn data_file(&self, root: &Path) -> PathBuf {
        self.dir_path(root).join(&self.data_file_name)
    }

    pub fn record_file(&self, root: &Path) -> PathBuf {
        self.dir_path(root).join(&self.record_file_name)
    }

    /// Whether the record marker is a plain file distinct from the data file.
    pub fn has_plain_record(&self) -> bool {
        is_plain_file_name(&self.record_file_name) && self.record_file_name != self.data_file_name
    }
}

/// `<root>/V1` or `<root>/V2`.
pub fn scheme_root(root: &Path, scheme: Scheme) -> PathBuf {
    root.join(scheme.root_dir())
}

/// Whether a file name is a listable data file under `scheme`.
///
/// Zero-length V1 data files (named `0`) are not listed.
pub fn is_data_leaf(scheme: Scheme, file_name: &str) -> bool {
    match scheme {
        Scheme::V1 => parse_size(file_name).is_some_and(|size| size > 0),
        Scheme::V2 => file_name == DATA_SENTINEL,
    }
}

/// Whether a file name is any data file (as opposed to a record marker),
/// zero-length V1 data included.
pub fn is_data_file(scheme: Scheme, file_name: &str) -> bool {
    match scheme {
        Scheme::V1 => parse_size(file_name).is_some(),
        Scheme::V2 => file_name == DATA_SENTINEL,
    }
}

/// Rebuild the identity of a data file from its path under `scheme_root`.
///
/// The path alone carries no user name, so V1 identities get `.none` and V2
/// identities get the data sentinel.
pub fn identity_from_data_path(
    scheme_root: &Path,
    path: &Path,
    scheme: Scheme,
) -> Result<AddressedIdentity> {
    let unsupported = || CasError::invalid(path.display().to_string());

    let relative = path.strip_prefix(scheme_root).map_err(|_| unsupported())?;
    let segments = relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str().ok_or_else(unsupported),
            _ => Err(unsupported()),
        })
        .collect::<Result<Vec<_>>>()?;

    let (size, hash_segments, name) = match scheme {
        Scheme::V1 if segments.len() == HASH_SEGMENTS + 1 => {
            (segments[HASH_SEGMENTS], &segments[..HASH_SEGMENTS], NONE_EXT)
        }
        Scheme::V2 if segments.len() == HASH_SEGMENTS + 2 => {
            (segments[0], &segments[1..=HASH_SEGMENTS], DATA_SENTINEL)
        }
        _ => return Err(unsupported()),
    };

    if hash_segments.iter().any(|s| s.len() != SEGMENT_LEN) {
        return Err(unsupported());
    }
    let hash = ContentHash::parse(&hash_segments.concat()).map_err(|_| unsupported())?;
    let size = parse_size(size).ok_or_else(unsupported)?;

    Ok(AddressedIdentity::new(scheme, hash, size, name))
}
