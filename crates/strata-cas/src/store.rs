//! Store facade binding a storage root and a scratch directory.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::instrument;
use walkdir::WalkDir;

use crate::blob::Blob;
use crate::fs_util::{dir_exists, file_exists};
use crate::identity::ContentIdentity;
use crate::layout::{is_data_file, scheme_root};
use crate::list::{self, Direction};
use crate::scheme::Scheme;
use crate::{CasError, Result};

/// Whether any V2 blob of exactly `size` bytes exists under `root`.
///
/// Only V2 shards by size, so V1 content is invisible to this check.
pub fn size_exists(root: &Path, size: u64) -> Result<bool> {
    Ok(dir_exists(
        &scheme_root(root, Scheme::V2).join(size.to_string()),
    )?)
}

/// Whether content with this size and hash exists under any scheme.
pub fn size_hash_exists(root: &Path, size: u64, hash: &str) -> Result<bool> {
    let identity = ContentIdentity::builder(Scheme::LATEST)
        .hash(hash)
        .size(size)
        .build()?;
    Blob::from_identity(identity, root, PathBuf::new()).exists_under_any_scheme()
}

/// Content-addressed blob store rooted at one directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    scratch: PathBuf,
}

impl BlobStore {
    /// Open a store, creating the root and scratch directories if missing.
    ///
    /// The scratch directory must be on the same volume as the root for the
    /// publish rename to be atomic.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(root: P, scratch: Q) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let scratch = scratch.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        fs::create_dir_all(&scratch)?;
        Ok(Self { root, scratch })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    pub fn new_upload(&self, scheme: Scheme, name: impl Into<String>) -> Blob {
        Blob::new_upload(scheme, name, &self.root, &self.scratch)
    }

    pub fn blob_from_parts(
        &self,
        scheme: Scheme,
        hash: &str,
        size: u64,
        name: impl Into<String>,
    ) -> Result<Blob> {
        let identity = ContentIdentity::builder(scheme)
            .hash(hash)
            .size(size)
            .name(name)
            .build()?;
        Ok(Blob::from_identity(identity, &self.root, &self.scratch))
    }

    pub fn blob_from_identifier(&self, id: &str) -> Result<Blob> {
        Blob::from_identifier(id, &self.root, &self.scratch)
    }

    /// Ingest `reader` and write its record marker, returning the identifier.
    #[instrument(skip(self, reader), level = "debug")]
    pub fn put<R: Read>(&self, scheme: Scheme, name: &str, reader: R) -> Result<String> {
        let mut blob = self.new_upload(scheme, name);
        blob.ingest(reader)?;
        blob.write_record_marker()?;
        blob.identifier()
    }

    /// Open the data file behind an identifier for reading.
    pub fn open(&self, id: &str) -> Result<File> {
        let blob = self.blob_from_identifier(id)?;
        let path = blob.data_path()?;
        match File::open(&path) {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CasError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn size_exists(&self, size: u64) -> Result<bool> {
        size_exists(&self.root, size)
    }

    pub fn size_hash_exists(&self, size: u64, hash: &str) -> Result<bool> {
        size_hash_exists(&self.root, size, hash)
    }

    /// See [`list::list`].
    pub fn list(&self, cursor: &str, direction: Direction, limit: usize) -> Result<Vec<String>> {
        list::list(&self.root, cursor, direction, limit)
    }

    /// Count data files, record markers and data bytes per scheme.
    ///
    /// Zero-length V1 data files count as data here even though the lister
    /// skips them.
    pub fn stats(&self) -> Result<StoreStats> {
        let mut schemes = Vec::with_capacity(Scheme::ALL.len());
        for scheme in Scheme::ALL {
            let mut stats = SchemeStats {
                scheme,
                data_files: 0,
                record_markers: 0,
                data_bytes: 0,
            };
            let dir = scheme_root(&self.root, scheme);
            if dir_exists(&dir)? {
                for entry in WalkDir::new(&dir) {
                    let entry = entry.map_err(io::Error::from)?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let name = entry.file_name().to_string_lossy();
                    if is_data_file(scheme, &name) {
                        stats.data_files += 1;
                        stats.data_bytes += entry.metadata().map_err(io::Error::from)?.len();
                    } else {
                        stats.record_markers += 1;
                    }
                }
            }
            schemes.push(stats);
        }
        Ok(StoreStats { schemes })
    }

    /// Whether the data file for `id` is present.
    pub fn contains(&self, id: &str) -> Result<bool> {
        let blob = self.blob_from_identifier(id)?;
        Ok(file_exists(&blob.data_path()?)?)
    }
}

/// Per-scheme counters from [`BlobStore::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct SchemeStats {
    pub scheme: Scheme,
    pub data_files: u64,
    pub record_markers: u64,
    pub data_bytes: u64,
}

/// Statistics about the store
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub schemes: Vec<SchemeStats>,
}

impl StoreStats {
    pub fn data_files(&self) -> u64 {
        self.schemes.iter().map(|s| s.data_files).sum()
    }

    pub fn data_bytes(&self) -> u64 {
        self.schemes.iter().map(|s| s.data_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn store() -> (TempDir, BlobStore) {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path().join("root"), temp.path().join("tmp")).unwrap();
        (temp, store)
    }

    #[test]
    fn test_new_creates_directories() {
        let (_temp, store) = store();
        assert!(store.root().is_dir());
        assert!(store.scratch().is_dir());
    }

    #[test]
    fn test_put_and_open() {
        let (_temp, store) = store();
        let id = store.put(Scheme::V2, "greeting.txt", &b"hello!"[..]).unwrap();

        let mut content = String::new();
        store.open(&id).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello!");
        assert!(store.contains(&id).unwrap());
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let (_temp, store) = store();
        let result = store.open("v2-1-5a8dd3ad0756a93ded72b823b19dd877-a");
        assert!(matches!(result, Err(CasError::NotFound(_))));
    }

    #[test]
    fn test_size_checks() {
        let (_temp, store) = store();
        let id = store.put(Scheme::V2, "ab.test", &b"hello!"[..]).unwrap();
        let hash = store.blob_from_identifier(&id).unwrap().addressed().unwrap().hash().to_string();

        assert!(store.size_exists(6).unwrap());
        assert!(!store.size_exists(5).unwrap());
        assert!(store.size_hash_exists(6, &hash).unwrap());
        assert!(!store.size_hash_exists(5, &hash).unwrap());
        assert!(store.size_hash_exists(6, "nothex").is_err());
    }

    #[test]
    fn test_size_hash_check_sees_v1() {
        let (_temp, store) = store();
        let id = store.put(Scheme::V1, "ab.test", &b"hello!!"[..]).unwrap();
        let hash = store.blob_from_identifier(&id).unwrap().addressed().unwrap().hash().to_string();

        assert!(!store.size_exists(7).unwrap());
        assert!(store.size_hash_exists(7, &hash).unwrap());
    }

    #[test]
    fn test_blob_from_parts_with_scheme() {
        let (_temp, store) = store();
        let id = store.put(Scheme::V1, "a.txt", &b"abc"[..]).unwrap();
        let hash = store.blob_from_identifier(&id).unwrap().addressed().unwrap().hash().to_string();

        let blob = store.blob_from_parts(Scheme::V1, &hash, 3, "other.txt").unwrap();
        assert!(blob.exists().unwrap().data);
        // The record marker is per extension under V1.
        assert!(blob.exists().unwrap().record);
    }

    #[test]
    fn test_stats() {
        let (_temp, store) = store();
        store.put(Scheme::V1, "a.txt", &b"one"[..]).unwrap();
        store.put(Scheme::V2, "b.txt", &b"three"[..]).unwrap();
        store.put(Scheme::V2, "c.txt", &b"three"[..]).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.data_files(), 2);
        assert_eq!(stats.data_bytes(), 8);
        let v2 = stats.schemes.iter().find(|s| s.scheme == Scheme::V2).unwrap();
        assert_eq!(v2.data_files, 1);
        assert_eq!(v2.record_markers, 2);
    }

    #[test]
    fn test_stats_counts_empty_v1_data() {
        let (_temp, store) = store();
        let id = store.put(Scheme::V1, "empty.txt", &b""[..]).unwrap();
        assert!(id.ends_with("-0.txt"));

        let stats = store.stats().unwrap();
        let v1 = stats.schemes.iter().find(|s| s.scheme == Scheme::V1).unwrap();
        assert_eq!(v1.data_files, 1);
        assert_eq!(v1.record_markers, 1);
        assert_eq!(v1.data_bytes, 0);
    }

    #[test]
    fn test_put_rejects_unrecordable_name_without_publishing() {
        let (_temp, store) = store();
        for (scheme, name) in [(Scheme::V2, ""), (Scheme::V2, "a/b"), (Scheme::V2, "..")] {
            assert!(matches!(
                store.put(scheme, name, &b"hello!"[..]),
                Err(CasError::InvalidIdentifier(_))
            ));
        }
        assert_eq!(store.stats().unwrap().data_files(), 0);
        assert!(!store.size_exists(6).unwrap());
    }

    #[test]
    fn test_put_v1_trailing_dot() {
        let (_temp, store) = store();
        let id = store.put(Scheme::V1, "notes.", &b"hello!"[..]).unwrap();
        assert!(id.ends_with("-6.none"));
        assert!(store.blob_from_identifier(&id).unwrap().exists().unwrap().record);
    }

    #[test]
    fn test_stats_on_empty_store() {
        let (_temp, store) = store();
        let stats = store.stats().unwrap();
        assert_eq!(stats.data_files(), 0);
        assert_eq!(stats.schemes.len(), 2);
    }
}
