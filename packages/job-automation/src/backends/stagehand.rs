//! Stagehand server implementation of the UI backend.

use async_trait::async_trait;
use serde_json::Value;
use stagehand_client::{
    ActRequest, ExtractRequest, FillRequest, ObserveRequest, ObservedElement, Session,
    SessionConfig, StagehandClient,
};
use std::time::Duration;

use crate::error::{AutomationError, Result};
use crate::traits::backend::UiBackend;
use crate::types::descriptor::ActionDescriptor;

/// Normalize an observed element. `None` when it carries no selector.
pub fn descriptor_from_element(element: &ObservedElement) -> Option<ActionDescriptor> {
    let value = serde_json::to_value(element).ok()?;
    ActionDescriptor::from_value(&value)
}

/// One Stagehand browser session.
pub struct StagehandBackend {
    session: Session,
    act_timeout: Option<Duration>,
}

impl StagehandBackend {
    /// Start a session on the server.
    pub async fn connect(client: StagehandClient, config: &SessionConfig) -> Result<Self> {
        let session = client
            .start_session(config)
            .await
            .map_err(AutomationError::backend)?;
        tracing::info!(session_id = %session.id(), "browser session started");
        Ok(Self::new(session))
    }

    pub fn new(session: Session) -> Self {
        Self {
            session,
            act_timeout: None,
        }
    }

    /// Upper bound the server enforces on each act call.
    pub fn with_act_timeout(mut self, timeout: Duration) -> Self {
        self.act_timeout = Some(timeout);
        self
    }

    pub fn session_id(&self) -> &str {
        self.session.id()
    }
}

#[async_trait]
impl UiBackend for StagehandBackend {
    async fn goto(&self, url: &str) -> Result<()> {
        self.session.navigate(url).await.map_err(AutomationError::backend)
    }

    async fn observe(&self, instruction: &str) -> Result<Vec<ActionDescriptor>> {
        let elements = self
            .session
            .observe(&ObserveRequest {
                instruction: instruction.to_string(),
                iframes: true,
            })
            .await
            .map_err(AutomationError::backend)?;

        let total = elements.len();
        let descriptors: Vec<_> = elements.iter().filter_map(descriptor_from_element).collect();
        if descriptors.len() < total {
            tracing::debug!(
                instruction,
                dropped = total - descriptors.len(),
                "observed elements without a selector"
            );
        }
        Ok(descriptors)
    }

    async fn act(&self, descriptor: &ActionDescriptor) -> Result<()> {
        let request = ActRequest {
            selector: descriptor.selector.clone(),
            description: descriptor.description.clone(),
            method: descriptor.method_or_click().to_string(),
            arguments: descriptor.arguments.clone(),
            iframes: descriptor.iframes,
            timeout_ms: self.act_timeout.map(|t| t.as_millis() as u64),
        };
        self.session.act(&request).await.map_err(AutomationError::backend)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.session
            .fill(&FillRequest {
                selector: selector.to_string(),
                value: value.to_string(),
                frame_selector: None,
            })
            .await
            .map_err(AutomationError::backend)
    }

    async fn fill_in_frame(&self, frame_selector: &str, selector: &str, value: &str) -> Result<()> {
        self.session
            .fill(&FillRequest {
                selector: selector.to_string(),
                value: value.to_string(),
                frame_selector: Some(frame_selector.to_string()),
            })
            .await
            .map_err(AutomationError::backend)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.session.click(selector).await.map_err(AutomationError::backend)
    }

    async fn press(&self, key: &str) -> Result<()> {
        self.session.press(key).await.map_err(AutomationError::backend)
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.session.type_text(text).await.map_err(AutomationError::backend)
    }

    async fn extract(&self, instruction: &str, schema: Option<&Value>) -> Result<Value> {
        self.session
            .extract(&ExtractRequest {
                instruction: instruction.to_string(),
                schema: schema.cloned(),
                iframes: true,
            })
            .await
            .map_err(AutomationError::backend)
    }

    async fn current_url(&self) -> Result<String> {
        self.session.current_url().await.map_err(AutomationError::backend)
    }

    async fn wait(&self, duration: Duration) -> Result<()> {
        self.session
            .wait(duration.as_millis() as u64)
            .await
            .map_err(AutomationError::backend)
    }

    async fn close(&self) -> Result<()> {
        self.session.end().await.map_err(AutomationError::backend)?;
        tracing::info!(session_id = %self.session.id(), "browser session closed");
        Ok(())
    }
}
