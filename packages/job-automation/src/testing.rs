//! Testing utilities including mock implementations.
//!
//! These drive workflows and batches without a browser or a message store.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{AutomationError, Result};
use crate::traits::{
    backend::UiBackend,
    otp::{Otp, OtpSource},
};
use crate::types::descriptor::ActionDescriptor;

type ObserveResponse = std::result::Result<Vec<ActionDescriptor>, String>;

/// A scripted UI backend.
///
/// Observe answers are looked up by exact instruction text: queued responses
/// are consumed first, then the sticky candidates apply. Unknown instructions
/// resolve to nothing unless [`MockBackend::resolve_everything`] is set.
#[derive(Default)]
pub struct MockBackend {
    /// One-shot observe responses by instruction
    observe_queue: Arc<RwLock<HashMap<String, VecDeque<ObserveResponse>>>>,

    /// Observe candidates returned whenever the queue is empty
    candidates: Arc<RwLock<HashMap<String, Vec<ActionDescriptor>>>>,

    /// Resolve unknown instructions to a synthetic selector
    resolve_everything: bool,

    /// Remaining failures for act/fill/click by selector
    failing_selectors: Arc<RwLock<HashMap<String, usize>>>,

    /// Remaining failures for iframe fills
    frame_fill_failures: Arc<RwLock<usize>>,

    /// Extraction answers by instruction
    extractions: Arc<RwLock<HashMap<String, std::result::Result<Value, String>>>>,

    /// Page URL after acting on a selector
    navigations: Arc<RwLock<HashMap<String, String>>>,

    /// URL of the active page
    url: Arc<RwLock<String>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockBackendCall>>>,
}

/// Record of a call made to the mock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBackendCall {
    Goto { url: String },
    Observe { instruction: String },
    Act { selector: String, iframes: bool },
    Fill { selector: String, value: String },
    FillInFrame { frame_selector: String, selector: String, value: String },
    Click { selector: String },
    Press { key: String },
    TypeText { text: String },
    Extract { instruction: String, with_schema: bool },
    CurrentUrl,
    Wait { millis: u64 },
    Close,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every unregistered instruction to `mock://<instruction>`.
    pub fn resolve_everything(mut self) -> Self {
        self.resolve_everything = true;
        self
    }

    /// Candidates returned for `instruction` on every observe.
    pub fn with_candidates(self, instruction: impl Into<String>, candidates: Vec<ActionDescriptor>) -> Self {
        self.candidates
            .write()
            .unwrap()
            .insert(instruction.into(), candidates);
        self
    }

    /// A single candidate for `instruction`.
    pub fn with_element(self, instruction: impl Into<String>, selector: impl Into<String>) -> Self {
        let instruction = instruction.into();
        let descriptor = ActionDescriptor::new(selector).with_description(instruction.clone());
        self.with_candidates(instruction, vec![descriptor])
    }

    /// Responses consumed one per observe call before the sticky candidates apply.
    pub fn with_observe_responses(self, instruction: impl Into<String>, responses: Vec<ObserveResponse>) -> Self {
        self.observe_queue
            .write()
            .unwrap()
            .insert(instruction.into(), responses.into());
        self
    }

    /// Fail the next `times` act/fill/click calls on `selector`.
    pub fn failing_selector(self, selector: impl Into<String>, times: usize) -> Self {
        self.failing_selectors
            .write()
            .unwrap()
            .insert(selector.into(), times);
        self
    }

    /// Fail the next `times` iframe fills.
    pub fn failing_frame_fills(self, times: usize) -> Self {
        *self.frame_fill_failures.write().unwrap() = times;
        self
    }

    /// Answer extractions for `instruction` with `value`.
    pub fn with_extraction(self, instruction: impl Into<String>, value: Value) -> Self {
        self.extractions
            .write()
            .unwrap()
            .insert(instruction.into(), Ok(value));
        self
    }

    /// Fail extractions for `instruction`.
    pub fn failing_extraction(self, instruction: impl Into<String>, message: impl Into<String>) -> Self {
        self.extractions
            .write()
            .unwrap()
            .insert(instruction.into(), Err(message.into()));
        self
    }

    /// Move the page to `url` once `selector` is acted on or clicked.
    pub fn navigates_on(self, selector: impl Into<String>, url: impl Into<String>) -> Self {
        self.navigations
            .write()
            .unwrap()
            .insert(selector.into(), url.into());
        self
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        *self.url.write().unwrap() = url.into();
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockBackendCall> {
        self.calls.read().unwrap().clone()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    /// Observe calls made for exactly this instruction.
    pub fn observe_count(&self, instruction: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockBackendCall::Observe { instruction: i } if i == instruction))
            .count()
    }

    /// Selectors submitted to `act`, in order.
    pub fn acted_selectors(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                MockBackendCall::Act { selector, .. } => Some(selector.clone()),
                _ => None,
            })
            .collect()
    }

    /// URLs navigated to, in order.
    pub fn visited(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                MockBackendCall::Goto { url } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockBackendCall) {
        self.calls.write().unwrap().push(call);
    }

    /// Consume one scripted failure for `selector`, if any remain.
    fn take_failure(&self, selector: &str) -> bool {
        let mut failing = self.failing_selectors.write().unwrap();
        match failing.get_mut(selector) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                true
            }
            _ => false,
        }
    }

    fn interact(&self, selector: &str) -> Result<()> {
        if self.take_failure(selector) {
            return Err(AutomationError::backend(format!(
                "element not interactable: {}",
                selector
            )));
        }
        if let Some(url) = self.navigations.read().unwrap().get(selector) {
            *self.url.write().unwrap() = url.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl UiBackend for MockBackend {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(MockBackendCall::Goto { url: url.to_string() });
        *self.url.write().unwrap() = url.to_string();
        Ok(())
    }

    async fn observe(&self, instruction: &str) -> Result<Vec<ActionDescriptor>> {
        self.record(MockBackendCall::Observe {
            instruction: instruction.to_string(),
        });

        let queued = self
            .observe_queue
            .write()
            .unwrap()
            .get_mut(instruction)
            .and_then(VecDeque::pop_front);
        if let Some(response) = queued {
            return response.map_err(AutomationError::backend);
        }

        if let Some(candidates) = self.candidates.read().unwrap().get(instruction) {
            return Ok(candidates.clone());
        }

        if self.resolve_everything {
            return Ok(vec![ActionDescriptor::new(format!("mock://{}", instruction))
                .with_description(instruction)]);
        }
        Ok(Vec::new())
    }

    async fn act(&self, descriptor: &ActionDescriptor) -> Result<()> {
        self.record(MockBackendCall::Act {
            selector: descriptor.selector.clone(),
            iframes: descriptor.iframes,
        });
        self.interact(&descriptor.selector)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.record(MockBackendCall::Fill {
            selector: selector.to_string(),
            value: value.to_string(),
        });
        self.interact(selector)
    }

    async fn fill_in_frame(&self, frame_selector: &str, selector: &str, value: &str) -> Result<()> {
        self.record(MockBackendCall::FillInFrame {
            frame_selector: frame_selector.to_string(),
            selector: selector.to_string(),
            value: value.to_string(),
        });
        let mut remaining = self.frame_fill_failures.write().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(AutomationError::backend("frame not attached"));
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(MockBackendCall::Click {
            selector: selector.to_string(),
        });
        self.interact(selector)
    }

    async fn press(&self, key: &str) -> Result<()> {
        self.record(MockBackendCall::Press { key: key.to_string() });
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.record(MockBackendCall::TypeText { text: text.to_string() });
        Ok(())
    }

    async fn extract(&self, instruction: &str, schema: Option<&Value>) -> Result<Value> {
        self.record(MockBackendCall::Extract {
            instruction: instruction.to_string(),
            with_schema: schema.is_some(),
        });
        match self.extractions.read().unwrap().get(instruction) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(AutomationError::backend(message.clone())),
            None => Ok(Value::Null),
        }
    }

    async fn current_url(&self) -> Result<String> {
        self.record(MockBackendCall::CurrentUrl);
        Ok(self.url.read().unwrap().clone())
    }

    async fn wait(&self, duration: Duration) -> Result<()> {
        self.record(MockBackendCall::Wait {
            millis: duration.as_millis() as u64,
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(MockBackendCall::Close);
        Ok(())
    }
}

/// A one-time password source with a fixed answer.
#[derive(Default)]
pub struct MockOtpSource {
    otp: Option<Otp>,
    calls: Arc<RwLock<usize>>,
}

impl MockOtpSource {
    /// A source with no recent code.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_code(sender: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            otp: Some(Otp {
                sender: sender.into(),
                code: code.into(),
            }),
            calls: Arc::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.read().unwrap()
    }
}

#[async_trait]
impl OtpSource for MockOtpSource {
    async fn latest_otp(&self) -> Result<Option<Otp>> {
        *self.calls.write().unwrap() += 1;
        Ok(self.otp.clone())
    }
}
