//! Content identity values.
//!
//! A [`ContentIdentity`] is either unaddressed (a new upload whose bytes have not
//! been hashed yet) or addressed (hash and size known). The transition happens
//! once, by value, through [`PendingIdentity::address`]; an addressed identity
//! is never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::codec::{DATA_SENTINEL, NONE_EXT, RESERVED_PREFIX};
use crate::scheme::Scheme;
use crate::{CasError, Result};

/// Length of a hex-encoded content hash (MD5-sized).
pub const HASH_LEN: usize = 32;

/// Width of one shard directory segment.
pub const SEGMENT_LEN: usize = 4;

/// Lowercase hex content hash, exactly [`HASH_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Parse a hash, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != HASH_LEN || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CasError::invalid(raw));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The eight 4-character shard segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        (0..HASH_LEN)
            .step_by(SEGMENT_LEN)
            .map(move |i| &self.0[i..i + SEGMENT_LEN])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentHash {
    type Err = CasError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Identity of an upload that has not been ingested yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingIdentity {
    scheme: Scheme,
    name: String,
}

impl PendingIdentity {
    pub fn new(scheme: Scheme, name: impl Into<String>) -> Self {
        Self {
            scheme,
            name: name.into(),
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finalize with the hash and byte count produced by ingestion.
    pub fn address(self, hash: ContentHash, size: u64) -> AddressedIdentity {
        AddressedIdentity {
            scheme: self.scheme,
            hash,
            size,
            name: self.name,
        }
    }
}

/// Identity whose content hash and size are known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressedIdentity {
    scheme: Scheme,
    hash: ContentHash,
    size: u64,
    name: String,
}

impl AddressedIdentity {
    pub fn new(scheme: Scheme, hash: ContentHash, size: u64, name: impl Into<String>) -> Self {
        Self {
            scheme,
            hash,
            size,
            name: name.into(),
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extension of the original name starting at the last `.`, or `.none`.
    pub fn extension(&self) -> &str {
        extension_of(&self.name)
    }

    /// The part of the name a scheme actually preserves: the extension for V1,
    /// the whole name for V2.
    pub fn significant_name(&self) -> &str {
        match self.scheme {
            Scheme::V1 => self.extension(),
            Scheme::V2 => &self.name,
        }
    }
}

/// A trailing bare `.` carries no extension and maps to `.none`.
pub(crate) fn extension_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx..],
        _ => NONE_EXT,
    }
}

/// Check that the record file `name` derives under `scheme` stays a plain
/// file inside its shard directory, returning the name to store.
///
/// A V2 name equal to [`DATA_SENTINEL`] is stored with [`RESERVED_PREFIX`] so
/// its record marker never lands on the data file.
pub(crate) fn checked_name(scheme: Scheme, name: String) -> Result<String> {
    let name = if scheme == Scheme::V2 && name == DATA_SENTINEL {
        format!("{}{}", RESERVED_PREFIX, DATA_SENTINEL)
    } else {
        name
    };
    let record = match scheme {
        Scheme::V1 => extension_of(&name),
        Scheme::V2 => name.as_str(),
    };
    if !is_plain_file_name(record) {
        return Err(CasError::invalid(name));
    }
    Ok(name)
}

/// Non-empty, not `.` or `..`, and free of path separators and NUL.
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    !matches!(name, "" | "." | "..") && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
}

/// A content identity, before or after ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentIdentity {
    Unaddressed(PendingIdentity),
    Addressed(AddressedIdentity),
}

impl ContentIdentity {
    pub fn builder(scheme: Scheme) -> IdentityBuilder {
        IdentityBuilder::new(scheme)
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            ContentIdentity::Unaddressed(p) => p.scheme(),
            ContentIdentity::Addressed(a) => a.scheme(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ContentIdentity::Unaddressed(p) => p.name(),
            ContentIdentity::Addressed(a) => a.name(),
        }
    }

    pub fn is_addressed(&self) -> bool {
        matches!(self, ContentIdentity::Addressed(_))
    }

    pub fn addressed(&self) -> Result<&AddressedIdentity> {
        match self {
            ContentIdentity::Addressed(a) => Ok(a),
            ContentIdentity::Unaddressed(_) => Err(CasError::NotInitialized),
        }
    }
}

impl From<AddressedIdentity> for ContentIdentity {
    fn from(identity: AddressedIdentity) -> Self {
        ContentIdentity::Addressed(identity)
    }
}

impl From<PendingIdentity> for ContentIdentity {
    fn from(identity: PendingIdentity) -> Self {
        ContentIdentity::Unaddressed(identity)
    }
}

/// Staged constructor for [`ContentIdentity`].
///
/// Without a hash it yields an unaddressed identity; with one it validates the
/// hash and yields an addressed identity. A name, when given, must derive a
/// plain record file; an identity built without one only locates data.
#[derive(Debug, Clone)]
pub struct IdentityBuilder {
    scheme: Scheme,
    name: Option<String>,
    hash: Option<String>,
    size: u64,
}

impl IdentityBuilder {
    pub fn new(scheme: Scheme) -> Self {
        Self {
            scheme,
            name: None,
            hash: None,
            size: 0,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn build(self) -> Result<ContentIdentity> {
        let name = match self.name {
            Some(name) => checked_name(self.scheme, name)?,
            None => String::new(),
        };
        match self.hash {
            None => Ok(PendingIdentity::new(self.scheme, name).into()),
            Some(raw) => {
                let hash = ContentHash::parse(&raw)?;
                Ok(AddressedIdentity::new(self.scheme, hash, self.size, name).into())
            }
        }
    }
}
