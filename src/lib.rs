use std::path::{Path, PathBuf};

pub mod append;
pub mod collection;
pub mod coords;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod merge;
pub mod normalizer;
pub mod partitioner;
pub mod regions;
pub mod sorter;

pub use collection::{read_collection, WaypointCollection};
pub use error::{Error, Result};
pub use logging::{init_logging, Verbosity};

pub const DEFAULT_ROOT: &str = "public/geojson";
pub const SOURCE_FILE: &str = "Waypoints.json";
pub const SHARD_DIR: &str = "waypoints";

/// Conventional file locations under a data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths::new(DEFAULT_ROOT)
    }
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataPaths { root: root.into() }
    }

    /// The full, unpartitioned collection.
    pub fn source(&self) -> PathBuf {
        self.root.join(SOURCE_FILE)
    }

    pub fn shard_dir(&self) -> PathBuf {
        self.root.join(SHARD_DIR)
    }

    pub fn shard(&self, letter: char) -> PathBuf {
        partitioner::shard_path(&self.shard_dir(), letter)
    }

    pub fn index(&self) -> PathBuf {
        self.shard_dir().join(partitioner::INDEX_FILE)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
