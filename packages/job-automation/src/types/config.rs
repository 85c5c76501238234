//! Configuration for the action layer and batch runs.
//!
//! Built once per run and passed by reference into each component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Attempt budgets and pauses for the resilient executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Outer attempts per instruction. Only the first may trust the cache.
    ///
    /// Default: 3.
    pub attempts: u32,

    /// Attempts for a single observe call, absorbing transient backend errors.
    ///
    /// Independent of `attempts`. Default: 3.
    pub observe_attempts: u32,

    /// Pause after serving a descriptor from the cache, letting the page settle.
    ///
    /// Default: 2s.
    #[serde(with = "millis")]
    pub cache_hit_pause: Duration,

    /// Pause between failed outer attempts.
    ///
    /// Default: 1s.
    #[serde(with = "millis")]
    pub retry_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            observe_attempts: 3,
            cache_hit_pause: Duration::from_secs(2),
            retry_pause: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Same budgets, no pauses. Used by tests.
    pub fn immediate() -> Self {
        Self {
            cache_hit_pause: Duration::ZERO,
            retry_pause: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_observe_attempts(mut self, attempts: u32) -> Self {
        self.observe_attempts = attempts.max(1);
        self
    }
}

/// Paths and pacing for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// One cache document per workflow lives here.
    pub cache_dir: PathBuf,

    /// Workflow run records (including promotion records used for enrichment).
    pub runs_dir: PathBuf,

    /// Batch artifacts, one document per work item plus the summary.
    pub output_dir: PathBuf,

    /// Input templates for the promotion campaign.
    pub inputs_dir: PathBuf,

    /// `job_title, original_title, countries` lookup table.
    pub titles_csv: PathBuf,

    /// Executor budgets.
    pub retry: RetryPolicy,

    /// Pause after each batch item to throttle the backend.
    ///
    /// Default: 2s.
    #[serde(with = "millis")]
    pub item_pause: Duration,

    /// Multiplier applied to the fixed page-settle waits inside workflows.
    ///
    /// 1.0 keeps the scripted timings; tests set 0.0.
    pub settle_scale: f64,
}

impl AutomationConfig {
    /// Derive the standard layout below a project root.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            cache_dir: root.join("cache"),
            runs_dir: root.join("workflow_runs"),
            output_dir: root.join("linked_job_posts"),
            inputs_dir: root.join("inputs"),
            titles_csv: root.join("downloads").join("job_titles_summary.csv"),
            retry: RetryPolicy::default(),
            item_pause: Duration::from_secs(2),
            settle_scale: 1.0,
        }
    }

    /// Layout below `root` with every pause disabled.
    pub fn immediate(root: impl AsRef<Path>) -> Self {
        Self {
            retry: RetryPolicy::immediate(),
            item_pause: Duration::ZERO,
            settle_scale: 0.0,
            ..Self::from_root(root)
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_item_pause(mut self, pause: Duration) -> Self {
        self.item_pause = pause;
        self
    }

    /// Cache document for a workflow.
    pub fn cache_path(&self, workflow: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", workflow))
    }

    /// Scale a scripted page-settle wait.
    pub fn settle(&self, millis: u64) -> Duration {
        Duration::from_millis(millis).mul_f64(self.settle_scale.max(0.0))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_root() {
        let config = AutomationConfig::from_root("/srv/jobs");

        assert_eq!(config.cache_path("job_extract"), PathBuf::from("/srv/jobs/cache/job_extract.json"));
        assert_eq!(config.runs_dir, PathBuf::from("/srv/jobs/workflow_runs"));
        assert_eq!(
            config.titles_csv,
            PathBuf::from("/srv/jobs/downloads/job_titles_summary.csv")
        );
        assert_eq!(config.retry.attempts, 3);
    }

    #[test]
    fn test_immediate_disables_pauses() {
        let config = AutomationConfig::immediate("/tmp/x");

        assert_eq!(config.item_pause, Duration::ZERO);
        assert_eq!(config.retry.cache_hit_pause, Duration::ZERO);
        assert_eq!(config.settle(20_000), Duration::ZERO);
    }

    #[test]
    fn test_attempts_never_zero() {
        let policy = RetryPolicy::default().with_attempts(0).with_observe_attempts(0);
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.observe_attempts, 1);
    }
}
