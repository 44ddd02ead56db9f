//! Blob handles: ingestion, record markers and presence checks.
//!
//! Publishing is two-phase. [`Blob::ingest`] atomically renames the data file
//! into place; [`Blob::write_record_marker`] then drops a zero-byte marker next
//! to it. A crash in between leaves data without a marker, which
//! [`Blob::exists`] reports as [`StoredState::DataOnly`].

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::codec;
use crate::fs_util::file_exists;
use crate::identity::{checked_name, AddressedIdentity, ContentHash, ContentIdentity, PendingIdentity};
use crate::layout::ShardPath;
use crate::scheme::Scheme;
use crate::{CasError, Result};

/// Prefix of in-flight temp files inside the scratch directory.
const TEMP_PREFIX: &str = ".ingest-";

/// A content identity bound to a storage root and a scratch directory.
#[derive(Debug, Clone)]
pub struct Blob {
    root: PathBuf,
    scratch: PathBuf,
    identity: ContentIdentity,
    /// Cached layout; present exactly when the identity is addressed.
    shard: Option<ShardPath>,
}

impl Blob {
    /// A new upload: only the scheme and original name are known.
    pub fn new_upload(
        scheme: Scheme,
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        scratch: impl Into<PathBuf>,
    ) -> Self {
        Self::from_identity(PendingIdentity::new(scheme, name).into(), root, scratch)
    }

    /// Address known content directly, under the latest scheme.
    pub fn from_parts(
        hash: &str,
        size: u64,
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        scratch: impl Into<PathBuf>,
    ) -> Result<Self> {
        let identity = ContentIdentity::builder(Scheme::LATEST)
            .hash(hash)
            .size(size)
            .name(name)
            .build()?;
        Ok(Self::from_identity(identity, root, scratch))
    }

    /// Re-locate a blob from a previously issued identifier.
    pub fn from_identifier(
        id: &str,
        root: impl Into<PathBuf>,
        scratch: impl Into<PathBuf>,
    ) -> Result<Self> {
        let identity = codec::decode(id)?;
        Ok(Self::from_identity(identity.into(), root, scratch))
    }

    pub fn from_identity(
        identity: ContentIdentity,
        root: impl Into<PathBuf>,
        scratch: impl Into<PathBuf>,
    ) -> Self {
        let shard = match &identity {
            ContentIdentity::Addressed(a) => Some(ShardPath::derive(a, a.scheme())),
            ContentIdentity::Unaddressed(_) => None,
        };
        Self {
            root: root.into(),
            scratch: scratch.into(),
            identity,
            shard,
        }
    }

    pub fn identity(&self) -> &ContentIdentity {
        &self.identity
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    fn shard(&self) -> Result<&ShardPath> {
        self.shard.as_ref().ok_or(CasError::NotInitialized)
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Stream `reader` into the store.
    ///
    /// Bytes are hashed while they are copied into a temp file in the scratch
    /// directory; the temp file is then renamed onto its content-addressed
    /// path. Identical content always lands on the same path, so concurrent
    /// ingestions of the same bytes simply overwrite each other.
    ///
    /// The name is checked first: one that cannot be recorded inside the shard
    /// directory fails with [`CasError::InvalidIdentifier`] before anything is
    /// written.
    #[instrument(skip(self, reader), fields(scheme = %self.identity.scheme()), level = "debug")]
    pub fn ingest<R: Read>(&mut self, mut reader: R) -> Result<()> {
        let ContentIdentity::Unaddressed(pending) = &self.identity else {
            return Err(CasError::AlreadyInitialized);
        };
        let scheme = pending.scheme();
        let pending = PendingIdentity::new(scheme, checked_name(scheme, pending.name().to_string())?);

        // Removed on drop unless persisted.
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.scratch)?;

        let mut writer = HashingWriter::new(BufWriter::new(temp.as_file()));
        let size = io::copy(&mut reader, &mut writer)?;
        let (mut buffered, digest) = writer.finish();
        buffered.flush()?;
        drop(buffered);
        temp.as_file().sync_all()?;

        let identity = pending.address(ContentHash::from_digest(&digest), size);
        let shard = ShardPath::derive(&identity, identity.scheme());
        let dest = shard.data_file(&self.root);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        temp.persist(&dest).map_err(|e| CasError::Io(e.error))?;
        debug!(hash = %identity.hash(), size, path = %dest.display(), "published data file");

        self.identity = identity.into();
        self.shard = Some(shard);
        Ok(())
    }

    /// Write the zero-byte record marker next to the data file.
    ///
    /// An existing file at the marker path is left as it is.
    #[instrument(skip(self), level = "debug")]
    pub fn write_record_marker(&self) -> Result<()> {
        let shard = self.shard()?;
        if !shard.has_plain_record() {
            return Err(CasError::invalid(self.identity.name()));
        }
        let path = shard.record_file(&self.root);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        debug!(path = %path.display(), "wrote record marker");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Presence of the data file and record marker under this blob's own scheme.
    pub fn exists(&self) -> Result<Presence> {
        let shard = self.shard()?;
        Ok(Presence {
            data: file_exists(&shard.data_file(&self.root))?,
            record: file_exists(&shard.record_file(&self.root))?,
        })
    }

    /// Whether the data file exists under any scheme, oldest first.
    pub fn exists_under_any_scheme(&self) -> Result<bool> {
        let identity = self.addressed()?;
        for scheme in Scheme::ALL {
            let shard = ShardPath::derive(identity, scheme);
            if file_exists(&shard.data_file(&self.root))? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn addressed(&self) -> Result<&AddressedIdentity> {
        self.identity.addressed()
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        Ok(self.shard()?.data_file(&self.root))
    }

    pub fn record_path(&self) -> Result<PathBuf> {
        Ok(self.shard()?.record_file(&self.root))
    }

    /// Canonical identifier of this blob.
    pub fn identifier(&self) -> Result<String> {
        self.addressed().map(codec::encode)
    }
}

/// Result of [`Blob::exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Presence {
    pub data: bool,
    pub record: bool,
}

impl Presence {
    pub fn state(&self) -> StoredState {
        match (self.data, self.record) {
            (false, false) => StoredState::Absent,
            (true, false) => StoredState::DataOnly,
            (false, true) => StoredState::RecordOnly,
            (true, true) => StoredState::Complete,
        }
    }
}

/// Observable publish states.
///
/// `DataOnly` means ingestion finished but the marker was never written;
/// re-running [`Blob::write_record_marker`] is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredState {
    Absent,
    DataOnly,
    RecordOnly,
    Complete,
}

/// Forwards writes while feeding the same bytes to an MD5 hasher.
struct HashingWriter<W> {
    inner: W,
    hasher: Md5,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
        }
    }

    fn finish(self) -> (W, Vec<u8>) {
        (self.inner, self.hasher.finalize().to_vec())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
