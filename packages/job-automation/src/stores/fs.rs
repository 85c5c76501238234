//! Filesystem artifact store.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::traits::store::ArtifactStore;
use crate::types::batch::BatchSummary;

/// File name of the batch summary inside the output directory.
pub const SUMMARY_FILE: &str = "extraction_summary.json";

/// Stores each artifact as `<root>/<encoded id>.json`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path for an id. Distinct ids get distinct paths.
    ///
    /// Ids are percent-encoded, so `/` can never escape the output directory.
    /// The one id that would encode to the summary's name gets its last byte
    /// escaped as well.
    pub fn artifact_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(id)))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.artifact_path(id)).await?)
    }

    async fn write(&self, id: &str, document: &Value) -> Result<()> {
        let path = self.artifact_path(id);
        write_json_atomic(&path, document).await?;
        tracing::debug!(id, path = %path.display(), "artifact saved");
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Option<Value>> {
        let path = self.artifact_path(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_summary(&self, summary: &BatchSummary) -> Result<()> {
        let path = self.summary_path();
        write_json_atomic(&path, summary).await?;
        tracing::info!(path = %path.display(), "summary saved");
        Ok(())
    }
}

fn file_stem(id: &str) -> String {
    let encoded = urlencoding::encode(id).into_owned();
    let reserved = SUMMARY_FILE.trim_end_matches(".json");
    if encoded != reserved {
        return encoded;
    }
    // ASCII only: every byte of the reserved name is unescaped
    let (head, last) = encoded.split_at(encoded.len() - 1);
    format!("{}%{:02X}", head, last.as_bytes()[0])
}

/// Pretty-print `value` to `path` atomically: write a sibling temp file, then rename.
///
/// Creates missing parent directories.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(value)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::batch::BatchResult;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("posts"));
        let doc = json!({"jobId": "4012345678", "views": 120, "amount_spent": 31.5});

        assert!(!store.exists("4012345678").await.unwrap());
        store.write("4012345678", &doc).await.unwrap();

        assert!(store.exists("4012345678").await.unwrap());
        assert_eq!(store.read("4012345678").await.unwrap(), Some(doc));
        assert!(dir.path().join("posts/4012345678.json").exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        assert_eq!(store.read("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        store.write("a", &json!({"v": 1})).await.unwrap();
        store.write("a", &json!({"v": 2})).await.unwrap();

        assert_eq!(store.read("a").await.unwrap(), Some(json!({"v": 2})));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.json".to_string()]);
    }

    #[test]
    fn test_artifact_path_is_deterministic_and_contained() {
        let store = FsArtifactStore::new("/out");

        assert_eq!(store.artifact_path("123"), PathBuf::from("/out/123.json"));
        assert_eq!(
            store.artifact_path("../etc/passwd"),
            PathBuf::from("/out/..%2Fetc%2Fpasswd.json")
        );
        assert_eq!(store.artifact_path("a b"), store.artifact_path("a b"));
    }

    #[tokio::test]
    async fn test_similar_ids_do_not_share_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let ids = ["a b", "a_b", "a/b", "a%20b"];

        let paths: std::collections::HashSet<_> = ids.iter().map(|id| store.artifact_path(id)).collect();
        assert_eq!(paths.len(), ids.len());

        store.write("a b", &json!({"jobId": "a b"})).await.unwrap();

        assert!(store.exists("a b").await.unwrap());
        assert!(!store.exists("a_b").await.unwrap());
        assert!(!store.exists("a%20b").await.unwrap());
        assert_eq!(store.read("a_b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_summary_name_is_reserved() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let doc = json!({"jobId": "extraction_summary"});

        assert_ne!(store.artifact_path("extraction_summary"), store.summary_path());
        assert_ne!(
            store.artifact_path("extraction_summary"),
            store.artifact_path("extraction_summar%79")
        );

        store.write("extraction_summary", &doc).await.unwrap();
        store.write_summary(&BatchSummary::new(vec![], vec![])).await.unwrap();

        assert_eq!(store.read("extraction_summary").await.unwrap(), Some(doc));
        assert!(!store.exists("extraction_summar%79").await.unwrap());
    }

    #[tokio::test]
    async fn test_summary_written_to_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let summary = BatchSummary::new(
            vec![BatchResult::Success {
                id: "x".into(),
                data: json!({"jobId": "x"}),
            }],
            vec!["y".into()],
        );

        store.write_summary(&summary).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        let parsed: BatchSummary = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, summary);
        assert_eq!(parsed.processed, parsed.results.len());
    }
}
