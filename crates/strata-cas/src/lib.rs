//! # strata-cas
//!
//! Content-addressable blob storage layered directly on a directory tree.
//!
//! Payloads are hashed (MD5) while they stream into a scratch directory and
//! then renamed onto a path derived from the hash and size. The returned
//! identifier is enough to find the bytes again; there is no index beside the
//! directory tree itself.
//!
//! ## Directory Layout
//!
//! Two layout generations coexist under one root:
//!
//! ```text
//! <root>/
//! ├── V1/
//! │   └── 5a8d/d3ad/0756/a93d/ed72/b823/b19d/d877/
//! │       ├── 6          # data, named by size
//! │       └── .test      # record marker, named by extension
//! └── V2/
//!     └── 6/5a8d/d3ad/0756/a93d/ed72/b823/b19d/d877/
//!         ├── _data_     # data
//!         └── ab.test    # record marker, full original name
//! ```
//!
//! Identifiers: `5a8dd3ad0756a93ded72b823b19dd877-6.test` (V1) and
//! `v2-6-5a8dd3ad0756a93ded72b823b19dd877-ab.test` (V2).
//!
//! ## Listing
//!
//! [`list::list`] pages through every stored blob in a fixed total order,
//! forwards or backwards, resuming from the last identifier it returned.

pub mod blob;
pub mod codec;
mod fs_util;
pub mod identity;
pub mod layout;
pub mod list;
pub mod scheme;
mod store;

use std::io;

use thiserror::Error;

pub use blob::{Blob, Presence, StoredState};
pub use identity::{AddressedIdentity, ContentHash, ContentIdentity, IdentityBuilder, PendingIdentity};
pub use layout::ShardPath;
pub use list::{list, Direction};
pub use scheme::Scheme;
pub use store::{size_exists, size_hash_exists, BlobStore, SchemeStats, StoreStats};

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum CasError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("unknown scheme version: {0}")]
    UnknownScheme(String),

    #[error("content hash is not set")]
    NotInitialized,

    #[error("content hash is already set")]
    AlreadyInitialized,

    #[error("not found: {0}")]
    NotFound(String),
}

impl CasError {
    pub(crate) fn invalid(id: impl Into<String>) -> Self {
        CasError::InvalidIdentifier(id.into())
    }
}

pub type Result<T> = std::result::Result<T, CasError>;
