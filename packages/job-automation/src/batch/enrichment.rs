//! Lookup tables that decorate extracted postings.
//!
//! - [`JobTitleIndex`]: posted title → original title and target countries
//! - [`ApplyUrlIndex`]: job id → apply URL, from promotion run records
//! - [`JobEnricher`]: attaches both to successful batch results

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{AutomationError, Result};
use crate::traits::processor::Enricher;

/// One row of the job title table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleEntry {
    pub original_title: String,
    pub countries: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TitleRow {
    job_title: String,
    original_title: String,
    #[serde(default)]
    countries: String,
}

/// Job title table keyed by the trimmed posted title.
#[derive(Debug, Clone, Default)]
pub struct JobTitleIndex {
    entries: HashMap<String, TitleEntry>,
}

impl JobTitleIndex {
    /// Load `job_title, original_title, countries` rows from a CSV file.
    ///
    /// `countries` is a comma-separated list inside one field.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AutomationError::ExternalDependency(format!(
                    "job title table not found: {}",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let index = Self::from_csv(&content)?;
        tracing::info!(path = %path.display(), entries = index.len(), "job title table loaded");
        Ok(index)
    }

    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut entries = HashMap::new();
        for row in reader.deserialize::<TitleRow>() {
            let row = row.map_err(|e| {
                AutomationError::ExternalDependency(format!("malformed job title table: {}", e))
            })?;
            let countries = row
                .countries
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            entries.insert(
                row.job_title.trim().to_string(),
                TitleEntry {
                    original_title: row.original_title.trim().to_string(),
                    countries,
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn get(&self, job_title: &str) -> Option<&TitleEntry> {
        self.entries.get(job_title.trim())
    }

    pub fn original_title(&self, job_title: &str) -> Option<&str> {
        self.get(job_title).map(|e| e.original_title.as_str())
    }

    /// Target countries for a title; empty when the title is unknown.
    pub fn countries(&self, job_title: &str) -> &[String] {
        self.get(job_title).map(|e| e.countries.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Job id → apply URL, collected from promotion run records.
#[derive(Debug, Clone, Default)]
pub struct ApplyUrlIndex {
    urls: HashMap<String, String>,
}

impl ApplyUrlIndex {
    /// Scan `runs_dir` for `*_promotion_*.json` records.
    ///
    /// Records that cannot be read or carry no apply URL are skipped. When
    /// several records share a job id, the first file in name order wins. A
    /// missing directory yields an empty index.
    pub async fn scan(runs_dir: impl AsRef<Path>) -> Result<Self> {
        let runs_dir = runs_dir.as_ref();
        let mut entries = match tokio::fs::read_dir(runs_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".json") && name.contains("_promotion_") {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut urls = HashMap::new();
        for path in paths {
            let record: Value = match tokio::fs::read_to_string(&path)
                .await
                .ok()
                .and_then(|content| serde_json::from_str(&content).ok())
            {
                Some(record) => record,
                None => {
                    tracing::debug!(path = %path.display(), "skipping unreadable run record");
                    continue;
                }
            };
            if let Some((job_id, apply_url)) = apply_url_entry(&record) {
                urls.entry(job_id).or_insert(apply_url);
            }
        }

        tracing::debug!(entries = urls.len(), "apply URL index built");
        Ok(Self { urls })
    }

    pub fn get(&self, job_id: &str) -> Option<&str> {
        self.urls.get(job_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

fn apply_url_entry(record: &Value) -> Option<(String, String)> {
    let job_id = match record.pointer("/output/jobId")? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let apply_url = record
        .pointer("/input/apply_url")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())?;
    Some((job_id, apply_url.to_string()))
}

/// Adds `original_job_title` and `apply_url` to extracted postings.
///
/// Only documents that carry a `job_name` are touched. Misses become empty
/// strings.
#[derive(Debug, Clone, Default)]
pub struct JobEnricher {
    titles: JobTitleIndex,
    apply_urls: ApplyUrlIndex,
}

impl JobEnricher {
    pub fn new(titles: JobTitleIndex, apply_urls: ApplyUrlIndex) -> Self {
        Self { titles, apply_urls }
    }

    /// Build from the title table and run records on disk.
    ///
    /// A missing title table is not fatal here; titles are left empty.
    pub async fn load(titles_csv: &Path, runs_dir: &Path) -> Result<Self> {
        let titles = match JobTitleIndex::load(titles_csv).await {
            Ok(titles) => titles,
            Err(AutomationError::ExternalDependency(message)) => {
                tracing::warn!(error = %message, "original titles will be empty");
                JobTitleIndex::default()
            }
            Err(e) => return Err(e),
        };
        let apply_urls = ApplyUrlIndex::scan(runs_dir).await?;
        Ok(Self::new(titles, apply_urls))
    }
}

#[async_trait]
impl Enricher for JobEnricher {
    async fn enrich(&self, id: &str, document: &mut Map<String, Value>) {
        let Some(job_name) = document.get("job_name").and_then(Value::as_str) else {
            return;
        };
        if job_name.is_empty() {
            return;
        }

        let original_title = self.titles.original_title(job_name).unwrap_or_default().to_string();
        if original_title.is_empty() {
            tracing::debug!(id, job_name, "no original title");
        }
        let apply_url = self.apply_urls.get(id).unwrap_or_default().to_string();
        if apply_url.is_empty() {
            tracing::debug!(id, "no apply URL");
        }

        document.insert("original_job_title".into(), Value::String(original_title));
        document.insert("apply_url".into(), Value::String(apply_url));
    }
}
