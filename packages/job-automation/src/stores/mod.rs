//! Artifact store implementations.
//!
//! - [`FsArtifactStore`]: one JSON file per item under an output directory
//! - [`MemoryArtifactStore`]: in-memory, for tests

mod fs;
mod memory;

pub use fs::{write_json_atomic, FsArtifactStore, SUMMARY_FILE};
pub use memory::MemoryArtifactStore;
