//! Thin filesystem helpers shared by the ingestor and the lister.

use std::fs;
use std::io;
use std::path::Path;

/// One directory entry, reduced to what the lister needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

pub(crate) fn file_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

pub(crate) fn dir_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// List a directory sorted by name (byte order).
///
/// Entries whose names are not UTF-8 cannot belong to the shard tree and are skipped.
pub(crate) fn list_dir(path: &Path) -> io::Result<Vec<DirEntryInfo>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let is_dir = entry.file_type()?.is_dir();
        entries.push(DirEntryInfo { name, is_dir });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exists_helpers() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, b"x").unwrap();

        assert!(file_exists(&file).unwrap());
        assert!(!dir_exists(&file).unwrap());
        assert!(dir_exists(temp.path()).unwrap());
        assert!(!file_exists(temp.path()).unwrap());
        assert!(!file_exists(&temp.path().join("missing")).unwrap());
        assert!(!dir_exists(&temp.path().join("missing")).unwrap());
    }

    #[test]
    fn test_list_dir_is_sorted() {
        let temp = TempDir::new().unwrap();
        for name in ["b", "_data_", "A", "10", "9"] {
            fs::write(temp.path().join(name), b"").unwrap();
        }
        fs::create_dir(temp.path().join("a")).unwrap();

        let entries = list_dir(temp.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["10", "9", "A", "_data_", "a", "b"]);
        assert!(entries.iter().find(|e| e.name == "a").unwrap().is_dir);
    }
}
