//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - a temporary storage root
//! - a scratch directory on the same volume
//! - a fixtures directory for source files
//!
//! # Usage
//!
//! ```ignore
//! use strata_config::testing::TestEnvironment;
//!
//! #[test]
//! fn test_something() {
//!     let env = TestEnvironment::new().unwrap();
//!     let store = BlobStore::new(&env.store_root, &env.scratch_dir).unwrap();
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context;
use tempfile::TempDir;

use crate::Config;

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment; everything lives under one temp dir.
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Isolated storage root
    pub store_root: PathBuf,
    /// Scratch directory for in-flight uploads
    pub scratch_dir: PathBuf,
    /// Source files to ingest
    pub fixtures_dir: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::with_prefix(format!("strata-test-{}-", test_id))
            .context("creating test temp dir")?;
        let base = temp_dir.path();

        let store_root = base.join("store");
        let scratch_dir = base.join("scratch");
        let fixtures_dir = base.join("fixtures");

        for dir in [&store_root, &scratch_dir, &fixtures_dir] {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }

        Ok(Self {
            _temp_dir: temp_dir,
            store_root,
            scratch_dir,
            fixtures_dir,
            test_id,
        })
    }

    /// Create a fixture file with content
    pub fn create_file(&self, relative_path: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.fixtures_dir.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Config pointing at this environment's directories
    pub fn config(&self) -> Config {
        let mut cfg = Config::default();
        cfg.storage.root = self.store_root.clone();
        cfg.storage.scratch = self.scratch_dir.clone();
        cfg
    }

    /// Environment variables that point a spawned process at this environment
    pub fn env_vars(&self) -> Vec<(String, String)> {
        vec![
            ("STRATA_ROOT".into(), self.store_root.display().to_string()),
            ("STRATA_SCRATCH".into(), self.scratch_dir.display().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_directories() {
        let env = TestEnvironment::new().unwrap();
        assert!(env.store_root.is_dir());
        assert!(env.scratch_dir.is_dir());
        assert!(env.fixtures_dir.is_dir());
    }

    #[test]
    fn test_environments_are_isolated() {
        let env1 = TestEnvironment::new().unwrap();
        let env2 = TestEnvironment::new().unwrap();
        assert_ne!(env1.store_root, env2.store_root);
        assert_ne!(env1.test_id, env2.test_id);
    }

    #[test]
    fn test_create_file() {
        let env = TestEnvironment::new().unwrap();
        let path = env.create_file("nested/a.txt", b"hello!").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello!");
    }

    #[test]
    fn test_config_points_at_environment() {
        let env = TestEnvironment::new().unwrap();
        let cfg = env.config();
        assert_eq!(cfg.storage.root_path(), env.store_root);
        assert_eq!(cfg.storage.scratch_path(), env.scratch_dir);
        assert!(env.env_vars().iter().any(|(k, _)| k == "STRATA_ROOT"));
    }
}
