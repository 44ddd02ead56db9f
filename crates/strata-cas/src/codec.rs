//! Identifier codec.
//!
//! ```text
//! V1: <hash>-<size><.ext|.none>        5a8dd3ad0756a93ded72b823b19dd877-6.test
//! V2: v2-<size>-<hash>-<name>          v2-6-5a8dd3ad0756a93ded72b823b19dd877-ab.test
//! ```
//!
//! V2 names are embedded verbatim and may contain `-`; only the first three
//! delimiters are structural. Names that would put a record marker outside
//! its shard directory are rejected.

use std::fmt;
use std::str::FromStr;

use crate::identity::{checked_name, AddressedIdentity, ContentHash, HASH_LEN};
use crate::scheme::Scheme;
use crate::{CasError, Result};

/// Extension recorded for V1 names without a `.`.
pub const NONE_EXT: &str = ".none";

/// File name of the V2 data file inside its shard directory.
pub const DATA_SENTINEL: &str = "_data_";

/// Prefix applied to a V2 name that collides with [`DATA_SENTINEL`].
pub const RESERVED_PREFIX: &str = "rel-";

const V2_TAG: &str = "v2-";

/// Encode an addressed identity as its canonical identifier.
pub fn encode(identity: &AddressedIdentity) -> String {
    match identity.scheme() {
        Scheme::V1 => format!(
            "{}-{}{}",
            identity.hash(),
            identity.size(),
            identity.extension()
        ),
        Scheme::V2 => format!(
            "{}{}-{}-{}",
            V2_TAG,
            identity.size(),
            identity.hash(),
            identity.name()
        ),
    }
}

/// Decode an identifier produced by [`encode`] (or by the lister).
pub fn decode(id: &str) -> Result<AddressedIdentity> {
    let id = id.trim();
    if let Some(rest) = id.strip_prefix(V2_TAG) {
        return decode_v2(id, rest);
    }
    if let Some(tagged) = id.strip_prefix('v') {
        // `v<digits>-...` names a generation we do not know; anything else is noise.
        let tag = tagged.split('-').next().unwrap_or_default();
        if parse_size(tag).is_some() {
            return Err(CasError::UnknownScheme(tag.to_string()));
        }
        return Err(CasError::invalid(id));
    }
    decode_v1(id)
}

fn decode_v1(id: &str) -> Result<AddressedIdentity> {
    if id.len() <= HASH_LEN + 1 || id.as_bytes()[HASH_LEN] != b'-' {
        return Err(CasError::invalid(id));
    }
    let hash = id
        .get(..HASH_LEN)
        .ok_or_else(|| CasError::invalid(id))
        .and_then(ContentHash::parse)?;

    let rest = &id[HASH_LEN + 1..];
    let (size, name) = match rest.find('.') {
        Some(dot) => (&rest[..dot], &rest[dot..]),
        None => (rest, NONE_EXT),
    };
    let size = parse_size(size).ok_or_else(|| CasError::invalid(id))?;
    let name = checked_name(Scheme::V1, name.to_string()).map_err(|_| CasError::invalid(id))?;

    Ok(AddressedIdentity::new(Scheme::V1, hash, size, name))
}

fn decode_v2(id: &str, rest: &str) -> Result<AddressedIdentity> {
    let mut parts = rest.splitn(3, '-');
    let (Some(size), Some(hash), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CasError::invalid(id));
    };
    let size = parse_size(size).ok_or_else(|| CasError::invalid(id))?;
    let hash = ContentHash::parse(hash).map_err(|_| CasError::invalid(id))?;

    // Listed identifiers carry the data sentinel; it comes back reserved.
    let name = checked_name(Scheme::V2, name.to_string()).map_err(|_| CasError::invalid(id))?;

    Ok(AddressedIdentity::new(Scheme::V2, hash, size, name))
}

/// Strict decimal: at least one digit, nothing else.
pub(crate) fn parse_size(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for AddressedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}

impl FromStr for AddressedIdentity {
    type Err = CasError;

    fn from_str(s: &str) -> Result<Self> {
        decode(s)
    }
}
