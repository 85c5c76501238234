//! Resilient execution of a single natural-language UI step.
//!
//! Each step resolves an instruction to an [`ActionDescriptor`] and executes
//! it. The first attempt may trust the [`ActionCache`]; every later attempt
//! discards it and re-resolves against the live page, so a stale selector
//! costs one attempt instead of failing the step for good.
//!
//! ```text
//!  TryCached ──fail──▶ ForceFresh ──fail──▶ ForceFresh ──fail──▶ Exhausted
//!      │                   │                    │
//!      └──────── ok ───────┴─────── ok ─────────┴──▶ done
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ActionCache;
use crate::error::{AutomationError, Result};
use crate::traits::backend::UiBackend;
use crate::types::config::RetryPolicy;
use crate::types::descriptor::ActionDescriptor;

/// What to do with the resolved element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode<'a> {
    /// Invoke the descriptor's action through the agent.
    Act,
    /// Write a literal value into the resolved field.
    Fill(&'a str),
}

/// Whether a step may use the cache at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Read the cache on the first attempt; write every fresh resolution.
    #[default]
    Trust,
    /// Never read or write the cache. For controls whose position shifts
    /// between runs.
    Bypass,
}

/// Where an instruction's attempt sequence currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    TryCached,
    ForceFresh,
    Exhausted,
}

/// Attempt counter with its phase transitions.
#[derive(Debug, Clone)]
pub struct AttemptMachine {
    phase: AttemptPhase,
    failures: u32,
    budget: u32,
}

impl AttemptMachine {
    pub fn new(budget: u32, cache: CachePolicy) -> Self {
        let phase = match (budget, cache) {
            (0, _) => AttemptPhase::Exhausted,
            (_, CachePolicy::Trust) => AttemptPhase::TryCached,
            (_, CachePolicy::Bypass) => AttemptPhase::ForceFresh,
        };
        Self {
            phase,
            failures: 0,
            budget,
        }
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    /// 1-based number of the attempt about to run.
    pub fn attempt(&self) -> u32 {
        self.failures + 1
    }

    /// Record a failed attempt and move to the next phase.
    pub fn fail(&mut self) -> AttemptPhase {
        self.failures += 1;
        self.phase = if self.failures >= self.budget {
            AttemptPhase::Exhausted
        } else {
            AttemptPhase::ForceFresh
        };
        self.phase
    }
}

/// Why one attempt did not complete.
#[derive(Debug)]
enum AttemptFailure {
    NoCandidates,
    Observe(AutomationError),
    Execute(AutomationError),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "no elements found"),
            Self::Observe(e) => write!(f, "observe failed: {}", e),
            Self::Execute(e) => write!(f, "{}", e),
        }
    }
}

/// Runs instructions against a [`UiBackend`] with cache-then-self-heal retries.
pub struct ResilientExecutor {
    backend: Arc<dyn UiBackend>,
    cache: Arc<ActionCache>,
    policy: RetryPolicy,
}

impl ResilientExecutor {
    pub fn new(backend: Arc<dyn UiBackend>, cache: Arc<ActionCache>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            cache,
            policy,
        }
    }

    pub fn backend(&self) -> &dyn UiBackend {
        self.backend.as_ref()
    }

    pub fn cache(&self) -> &ActionCache {
        &self.cache
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolve `instruction` and invoke its action.
    pub async fn act(&self, instruction: &str) -> Result<()> {
        self.perform(instruction, Mode::Act).await
    }

    /// Resolve `instruction` without touching the cache and invoke its action.
    pub async fn act_uncached(&self, instruction: &str) -> Result<()> {
        self.perform_with(instruction, Mode::Act, CachePolicy::Bypass)
            .await
    }

    /// Resolve `instruction` to a field and fill it with `value`.
    pub async fn fill(&self, instruction: &str, value: &str) -> Result<()> {
        self.perform(instruction, Mode::Fill(value)).await
    }

    pub async fn perform(&self, instruction: &str, mode: Mode<'_>) -> Result<()> {
        self.perform_with(instruction, mode, CachePolicy::Trust).await
    }

    /// Run one step under the attempt budget.
    ///
    /// Fails with [`AutomationError::ResolutionExhausted`] when no attempt
    /// produced a descriptor, and with [`AutomationError::ActionExhausted`]
    /// when descriptors were found but executing them kept failing.
    pub async fn perform_with(
        &self,
        instruction: &str,
        mode: Mode<'_>,
        cache: CachePolicy,
    ) -> Result<()> {
        let mut machine = AttemptMachine::new(self.policy.attempts, cache);
        let mut resolved_any = false;
        let mut last_failure: Option<AttemptFailure> = None;

        while machine.phase() != AttemptPhase::Exhausted {
            let attempt = machine.attempt();

            let failure = match self.resolve(instruction, machine.phase(), cache).await {
                Ok(descriptor) => {
                    resolved_any = true;
                    match self.execute(&descriptor, mode).await {
                        Ok(()) => {
                            tracing::debug!(instruction, attempt, selector = %descriptor.selector, "step done");
                            return Ok(());
                        }
                        Err(e) => AttemptFailure::Execute(e),
                    }
                }
                Err(failure) => failure,
            };

            tracing::warn!(instruction, attempt, error = %failure, "step attempt failed");
            last_failure = Some(failure);

            if machine.fail() != AttemptPhase::Exhausted {
                pause(self.policy.retry_pause).await;
            }
        }

        let attempts = self.policy.attempts;
        let last_error = last_failure.map(|f| f.to_string());
        if resolved_any {
            Err(AutomationError::ActionExhausted {
                instruction: instruction.to_string(),
                attempts,
                last_error: last_error.unwrap_or_default(),
            })
        } else {
            Err(AutomationError::ResolutionExhausted {
                instruction: instruction.to_string(),
                attempts,
                last_error,
            })
        }
    }

    /// Every candidate the agent finds for `instruction`.
    ///
    /// Retries only on backend errors, up to `observe_attempts`. An empty
    /// answer is returned as-is.
    pub async fn observe_all(&self, instruction: &str) -> Result<Vec<ActionDescriptor>> {
        let mut last_error = None;
        for attempt in 1..=self.policy.observe_attempts {
            match self.backend.observe(instruction).await {
                Ok(candidates) => {
                    tracing::debug!(instruction, count = candidates.len(), "observed");
                    return Ok(candidates);
                }
                Err(e) => {
                    tracing::warn!(instruction, attempt, error = %e, "observe failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| AutomationError::backend("observe attempt budget is zero")))
    }

    async fn resolve(
        &self,
        instruction: &str,
        phase: AttemptPhase,
        cache: CachePolicy,
    ) -> std::result::Result<ActionDescriptor, AttemptFailure> {
        if phase == AttemptPhase::TryCached {
            if let Some(descriptor) = self.cache.get(instruction) {
                tracing::debug!(instruction, selector = %descriptor.selector, "cache hit");
                pause(self.policy.cache_hit_pause).await;
                return Ok(descriptor);
            }
        }

        let descriptor = self
            .observe_all(instruction)
            .await
            .map_err(AttemptFailure::Observe)?
            .into_iter()
            .next()
            .ok_or(AttemptFailure::NoCandidates)?;

        if cache == CachePolicy::Trust {
            if let Err(e) = self.cache.set(instruction, descriptor.clone()).await {
                tracing::warn!(instruction, error = %e, "could not persist action cache");
            }
        }
        Ok(descriptor)
    }

    async fn execute(&self, descriptor: &ActionDescriptor, mode: Mode<'_>) -> Result<()> {
        match mode {
            Mode::Act => self.backend.act(&descriptor.in_iframes()).await,
            Mode::Fill(value) => self.backend.fill(&descriptor.selector, value).await,
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBackend, MockBackendCall};

    const CLICK_POST: &str = "Click the \"Post job\" button. Set method='click'";
    const JOB_TITLE: &str = "Locate the \"Job title\" input field";

    fn executor(backend: &Arc<MockBackend>, cache: Arc<ActionCache>) -> ResilientExecutor {
        ResilientExecutor::new(backend.clone(), cache, RetryPolicy::immediate())
    }

    #[test]
    fn test_machine_transitions() {
        let mut machine = AttemptMachine::new(3, CachePolicy::Trust);
        assert_eq!(machine.phase(), AttemptPhase::TryCached);
        assert_eq!(machine.attempt(), 1);
        assert_eq!(machine.fail(), AttemptPhase::ForceFresh);
        assert_eq!(machine.attempt(), 2);
        assert_eq!(machine.fail(), AttemptPhase::ForceFresh);
        assert_eq!(machine.fail(), AttemptPhase::Exhausted);

        let machine = AttemptMachine::new(3, CachePolicy::Bypass);
        assert_eq!(machine.phase(), AttemptPhase::ForceFresh);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_observe() {
        let backend = Arc::new(MockBackend::new());
        let cache = Arc::new(ActionCache::in_memory());
        cache.set(CLICK_POST, ActionDescriptor::new("#post")).await.unwrap();

        executor(&backend, cache).act(CLICK_POST).await.unwrap();

        assert_eq!(backend.observe_count(CLICK_POST), 0);
        assert_eq!(
            backend.calls(),
            vec![MockBackendCall::Act {
                selector: "#post".into(),
                iframes: true
            }]
        );
    }

    #[tokio::test]
    async fn test_miss_observes_and_caches_first_candidate() {
        let backend = Arc::new(MockBackend::new().with_candidates(
            CLICK_POST,
            vec![ActionDescriptor::new("#first"), ActionDescriptor::new("#second")],
        ));
        let cache = Arc::new(ActionCache::in_memory());

        executor(&backend, cache.clone()).act(CLICK_POST).await.unwrap();

        assert_eq!(backend.observe_count(CLICK_POST), 1);
        assert_eq!(cache.get(CLICK_POST).unwrap().selector, "#first");
        assert_eq!(backend.acted_selectors(), vec!["#first".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_cache_self_heals_on_second_attempt() {
        let backend = Arc::new(
            MockBackend::new()
                .with_element(CLICK_POST, "#fresh")
                .failing_selector("#stale", usize::MAX),
        );
        let cache = Arc::new(ActionCache::in_memory());
        cache.set(CLICK_POST, ActionDescriptor::new("#stale")).await.unwrap();

        executor(&backend, cache.clone()).act(CLICK_POST).await.unwrap();

        assert_eq!(backend.acted_selectors(), vec!["#stale".to_string(), "#fresh".to_string()]);
        assert_eq!(backend.observe_count(CLICK_POST), 1);
        assert_eq!(cache.get(CLICK_POST).unwrap().selector, "#fresh");
    }

    #[tokio::test]
    async fn test_later_attempts_always_observe_even_with_cache_entry() {
        let backend = Arc::new(
            MockBackend::new()
                .with_element(CLICK_POST, "#cached")
                .failing_selector("#cached", usize::MAX),
        );
        let cache = Arc::new(ActionCache::in_memory());
        cache.set(CLICK_POST, ActionDescriptor::new("#cached")).await.unwrap();

        let err = executor(&backend, cache).act(CLICK_POST).await.unwrap_err();

        assert!(matches!(err, AutomationError::ActionExhausted { attempts: 3, .. }));
        // attempt 1 from cache, attempts 2 and 3 fresh
        assert_eq!(backend.observe_count(CLICK_POST), 2);
        assert_eq!(backend.acted_selectors().len(), 3);
    }

    #[tokio::test]
    async fn test_resolution_exhausted_when_nothing_matches() {
        let backend = Arc::new(MockBackend::new());
        let cache = Arc::new(ActionCache::in_memory());

        let err = executor(&backend, cache.clone()).act(CLICK_POST).await.unwrap_err();

        match err {
            AutomationError::ResolutionExhausted {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error.as_deref(), Some("no elements found"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.observe_count(CLICK_POST), 3);
        assert!(backend.acted_selectors().is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_observe_retries_absorb_transient_errors() {
        let backend = Arc::new(MockBackend::new().with_observe_responses(
            JOB_TITLE,
            vec![
                Err("target closed".into()),
                Err("timeout".into()),
                Ok(vec![ActionDescriptor::new("#title")]),
            ],
        ));
        let cache = Arc::new(ActionCache::in_memory());

        executor(&backend, cache).fill(JOB_TITLE, "Staff Engineer").await.unwrap();

        assert_eq!(backend.observe_count(JOB_TITLE), 3);
        assert_eq!(
            backend.calls().last().unwrap(),
            &MockBackendCall::Fill {
                selector: "#title".into(),
                value: "Staff Engineer".into()
            }
        );
    }

    #[tokio::test]
    async fn test_observe_errors_beyond_inner_budget_fail_the_attempt() {
        let errors: Vec<std::result::Result<Vec<ActionDescriptor>, String>> =
            (0..9).map(|_| Err("backend down".to_string())).collect();
        let backend = Arc::new(MockBackend::new().with_observe_responses(JOB_TITLE, errors));
        let cache = Arc::new(ActionCache::in_memory());

        let err = executor(&backend, cache).fill(JOB_TITLE, "x").await.unwrap_err();

        assert!(matches!(err, AutomationError::ResolutionExhausted { .. }));
        assert_eq!(backend.observe_count(JOB_TITLE), 9);
    }

    #[tokio::test]
    async fn test_fill_uses_selector_with_literal_value() {
        let backend = Arc::new(
            MockBackend::new()
                .with_element(JOB_TITLE, "#title")
                .failing_selector("#title", 1),
        );
        let cache = Arc::new(ActionCache::in_memory());

        executor(&backend, cache).fill(JOB_TITLE, "Data Analyst").await.unwrap();

        let fills: Vec<_> = backend
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MockBackendCall::Fill { .. }))
            .collect();
        assert_eq!(fills.len(), 2);
        assert_eq!(backend.observe_count(JOB_TITLE), 2);
    }

    #[tokio::test]
    async fn test_bypass_never_reads_or_writes_cache() {
        let backend = Arc::new(MockBackend::new().with_element(CLICK_POST, "#live"));
        let cache = Arc::new(ActionCache::in_memory());
        cache.set(CLICK_POST, ActionDescriptor::new("#cached")).await.unwrap();

        executor(&backend, cache.clone()).act_uncached(CLICK_POST).await.unwrap();

        assert_eq!(backend.acted_selectors(), vec!["#live".to_string()]);
        assert_eq!(cache.get(CLICK_POST).unwrap().selector, "#cached");
    }

    #[tokio::test]
    async fn test_cache_write_persists_across_executors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job_promotion.json");
        let backend = Arc::new(MockBackend::new().with_element(CLICK_POST, "#post"));

        let cache = Arc::new(ActionCache::load(&path).await.unwrap());
        executor(&backend, cache).act(CLICK_POST).await.unwrap();

        let cache = Arc::new(ActionCache::load(&path).await.unwrap());
        executor(&backend, cache).act(CLICK_POST).await.unwrap();

        assert_eq!(backend.observe_count(CLICK_POST), 1);
        assert_eq!(backend.acted_selectors().len(), 2);
    }
}
