//! Run records for single workflow invocations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::stores::write_json_atomic;

/// Input and output of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub workflow_name: String,
    pub run_time: DateTime<Utc>,
    pub input: Value,
    pub output: Value,
}

impl RunRecord {
    pub fn new(workflow_name: impl Into<String>, input: Value, output: Value) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            run_time: Utc::now(),
            input,
            output,
        }
    }

    /// `<workflow>_<YYYYmmddTHHMMSS.mmmZ>.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.json",
            self.workflow_name,
            self.run_time.format("%Y%m%dT%H%M%S%.3fZ")
        )
    }
}

/// Write a timestamped record into `runs_dir` and return its path.
///
/// Never replaces an earlier record: a name already taken gets a `_<n>` suffix.
pub async fn save_run_record(
    runs_dir: &Path,
    workflow_name: &str,
    input: Value,
    output: Value,
) -> Result<PathBuf> {
    let record = RunRecord::new(workflow_name, input, output);
    let path = free_path(runs_dir, &record.file_name()).await?;
    write_record(&path, &record).await?;
    Ok(path)
}

async fn free_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(path);
    }
    let stem = file_name.trim_end_matches(".json");
    let mut n = 2;
    loop {
        let candidate = dir.join(format!("{}_{}.json", stem, n));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Write any record document at an explicit path.
pub async fn write_record<T: Serialize + ?Sized>(path: &Path, record: &T) -> Result<()> {
    write_json_atomic(path, record).await?;
    tracing::info!(path = %path.display(), "run record saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_file_name_uses_compact_utc_timestamp() {
        let mut record = RunRecord::new("job_promotion", json!({}), json!({}));
        record.run_time = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::milliseconds(42);

        assert_eq!(record.file_name(), "job_promotion_20250309T140507.042Z.json");
    }

    #[tokio::test]
    async fn test_records_in_quick_succession_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for run in 0..3 {
            let path = save_run_record(
                dir.path(),
                "job_promotion",
                json!({"run": run}),
                json!({"status": "submitted"}),
            )
            .await
            .unwrap();
            paths.push(path);
        }

        let unique: std::collections::HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[tokio::test]
    async fn test_taken_name_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("job_promotion_x.json"), "{}").unwrap();
        std::fs::write(dir.path().join("job_promotion_x_2.json"), "{}").unwrap();

        let path = free_path(dir.path(), "job_promotion_x.json").await.unwrap();

        assert_eq!(path, dir.path().join("job_promotion_x_3.json"));
    }

    #[tokio::test]
    async fn test_saved_record_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_run_record(
            dir.path(),
            "job_edit_country",
            json!({"employee_location": "India"}),
            json!({"status": "updated"}),
        )
        .await
        .unwrap();

        let record: RunRecord =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(record.workflow_name, "job_edit_country");
        assert_eq!(record.output["status"], "updated");
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("job_edit_country_"));
    }
}
