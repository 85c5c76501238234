//! Assembling the list of work item ids.

use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{AutomationError, IdListError, Result};

/// Object keys recognized as holding the id list in a JSON file.
const ID_KEYS: &[&str] = &["job_ids", "ids"];

/// Load ids from a file.
///
/// A `.json` file must hold an array of ids or an object with a `job_ids`
/// (or `ids`) array; strings and integers are accepted. Any other file is read
/// as one id per line, trimmed, with blank lines dropped.
pub async fn load_ids_from_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IdListError::FileNotFound(path.display().to_string()).into())
        }
        Err(e) => return Err(e.into()),
    };

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        parse_json_ids(&serde_json::from_str(&content)?)
    } else {
        Ok(parse_text_ids(&content))
    }
}

fn parse_json_ids(value: &Value) -> Result<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(object) => ID_KEYS
            .iter()
            .find_map(|key| object.get(*key))
            .and_then(Value::as_array)
            .ok_or(IdListError::UnrecognizedShape)?,
        _ => return Err(IdListError::UnrecognizedShape.into()),
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
            other => Err(AutomationError::from(IdListError::UnsupportedValue(
                other.to_string(),
            ))),
        })
        .filter(|id| !matches!(id, Ok(s) if s.is_empty()))
        .collect()
}

fn parse_text_ids(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remove repeated ids, keeping the first occurrence of each.
pub fn dedup_ids(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Explicit ids followed by ids from `file`, deduplicated.
///
/// Fails with [`IdListError::NoIds`] when nothing resolves.
pub async fn collect_ids(explicit: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut ids: Vec<String> = explicit
        .iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    if let Some(file) = file {
        ids.extend(load_ids_from_file(file).await?);
    }

    let ids = dedup_ids(ids);
    if ids.is_empty() {
        return Err(IdListError::NoIds.into());
    }
    tracing::info!(count = ids.len(), "unique ids to process");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    async fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_json_array_and_object_forms() {
        let dir = tempfile::tempdir().unwrap();

        let list = write(&dir, "ids.json", r#"["4012", 4013, " 4014 "]"#).await;
        assert_eq!(load_ids_from_file(&list).await.unwrap(), vec!["4012", "4013", "4014"]);

        let object = write(&dir, "obj.JSON", r#"{"job_ids": ["1", "2"]}"#).await;
        assert_eq!(load_ids_from_file(&object).await.unwrap(), vec!["1", "2"]);

        let alt = write(&dir, "alt.json", r#"{"ids": ["9"]}"#).await;
        assert_eq!(load_ids_from_file(&alt).await.unwrap(), vec!["9"]);
    }

    #[tokio::test]
    async fn test_json_shape_errors() {
        let dir = tempfile::tempdir().unwrap();

        let wrong_key = write(&dir, "a.json", r#"{"jobs": ["1"]}"#).await;
        assert!(matches!(
            load_ids_from_file(&wrong_key).await,
            Err(AutomationError::IdList(IdListError::UnrecognizedShape))
        ));

        let nested = write(&dir, "b.json", r#"[{"id": 1}]"#).await;
        assert!(matches!(
            load_ids_from_file(&nested).await,
            Err(AutomationError::IdList(IdListError::UnsupportedValue(_)))
        ));

        let broken = write(&dir, "c.json", "[1,").await;
        assert!(matches!(
            load_ids_from_file(&broken).await,
            Err(AutomationError::JsonParse(_))
        ));
    }

    #[tokio::test]
    async fn test_text_file_trims_and_drops_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ids.txt", "  100 \n\n200\r\n   \n300").await;

        assert_eq!(load_ids_from_file(&path).await.unwrap(), vec!["100", "200", "300"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = load_ids_from_file("/nonexistent/ids.txt").await.unwrap_err();
        assert!(matches!(err, AutomationError::IdList(IdListError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_collect_merges_explicit_then_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ids.txt", "2\n3\n1\n").await;
        let explicit = vec!["1".to_string(), "2".to_string()];

        let ids = collect_ids(&explicit, Some(path.as_path())).await.unwrap();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_collect_requires_at_least_one_id() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write(&dir, "empty.txt", "\n\n").await;

        let err = collect_ids(&[], Some(empty.as_path())).await.unwrap_err();
        assert!(matches!(err, AutomationError::IdList(IdListError::NoIds)));
        assert!(collect_ids(&[], None).await.is_err());
    }

    proptest! {
        #[test]
        fn dedup_keeps_first_occurrence_order(ids in proptest::collection::vec("[a-d]{1,2}", 0..40)) {
            let deduped = dedup_ids(ids.clone());

            let unique: HashSet<_> = deduped.iter().collect();
            prop_assert_eq!(unique.len(), deduped.len());

            let mut expected = Vec::new();
            for id in &ids {
                if !expected.contains(id) {
                    expected.push(id.clone());
                }
            }
            prop_assert_eq!(deduped, expected);
        }
    }
}
