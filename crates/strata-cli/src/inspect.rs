//! `stat`, `cat` and `stats`: read-only views of stored blobs.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use strata_cas::{BlobStore, Scheme, StoreStats, StoredState};

#[derive(Debug, Serialize)]
struct StatReport {
    id: String,
    scheme: Scheme,
    hash: String,
    size: u64,
    name: String,
    data_path: PathBuf,
    record_path: PathBuf,
    state: StoredState,
}

fn stat_report(store: &BlobStore, id: &str) -> Result<StatReport> {
    let blob = store
        .blob_from_identifier(id)
        .with_context(|| format!("Failed to parse identifier {:?}", id))?;
    let identity = blob.addressed()?;
    Ok(StatReport {
        id: blob.identifier()?,
        scheme: identity.scheme(),
        hash: identity.hash().to_string(),
        size: identity.size(),
        name: identity.name().to_string(),
        data_path: blob.data_path()?,
        record_path: blob.record_path()?,
        state: blob.exists()?.state(),
    })
}

pub fn stat(store: &BlobStore, id: &str, json: bool) -> Result<()> {
    let report = stat_report(store, id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("id:      {}", report.id);
    println!("scheme:  {}", report.scheme);
    println!("hash:    {}", report.hash);
    println!("size:    {}", report.size);
    println!("name:    {}", report.name);
    println!("data:    {}", report.data_path.display());
    println!("record:  {}", report.record_path.display());
    println!("state:   {:?}", report.state);
    Ok(())
}

pub fn cat(store: &BlobStore, id: &str) -> Result<()> {
    let mut file = store.open(id)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut file, &mut out).context("Failed to write blob to stdout")?;
    out.flush()?;
    Ok(())
}

pub fn stats(store: &BlobStore, json: bool) -> Result<()> {
    let stats = store.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &StoreStats) {
    for s in &stats.schemes {
        println!(
            "{}: {} blobs, {} record markers, {} bytes",
            s.scheme, s.data_files, s.record_markers, s.data_bytes
        );
    }
    println!(
        "total: {} blobs, {} bytes",
        stats.data_files(),
        stats.data_bytes()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stat_report_for_stored_blob() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path().join("root"), temp.path().join("tmp")).unwrap();
        let id = store.put(Scheme::V2, "ab.test", &b"hello!"[..]).unwrap();

        let report = stat_report(&store, &id).unwrap();
        assert_eq!(report.id, id);
        assert_eq!(report.size, 6);
        assert_eq!(report.name, "ab.test");
        assert_eq!(report.state, StoredState::Complete);
        assert!(report.data_path.ends_with("_data_"));
    }

    #[test]
    fn test_stat_report_for_missing_blob() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path().join("root"), temp.path().join("tmp")).unwrap();

        let report = stat_report(&store, "81d95db337a18c65384d35ba7ea2efda-7.none").unwrap();
        assert_eq!(report.scheme, Scheme::V1);
        assert_eq!(report.state, StoredState::Absent);
        assert!(stat_report(&store, "garbage").is_err());
    }
}
