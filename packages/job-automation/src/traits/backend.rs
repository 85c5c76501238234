//! UiBackend trait for the browser agent.
//!
//! Implementations normalize whatever their service returns into
//! [`ActionDescriptor`]s before handing results back; nothing above this
//! trait sees the service's raw shapes.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::Result;
use crate::types::descriptor::ActionDescriptor;

/// A browser session driven by an AI-assisted element locator.
///
/// Every call may fail transiently and may take seconds.
#[async_trait]
pub trait UiBackend: Send + Sync {
    /// Navigate the active page.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Candidate elements for a natural-language instruction, best first.
    ///
    /// An empty list is a valid answer (nothing matched).
    async fn observe(&self, instruction: &str) -> Result<Vec<ActionDescriptor>>;

    /// Perform the action a descriptor describes.
    async fn act(&self, descriptor: &ActionDescriptor) -> Result<()>;

    /// Write a literal value into the field at `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Write a literal value into a field inside the iframe matched by `frame_selector`.
    async fn fill_in_frame(&self, frame_selector: &str, selector: &str, value: &str) -> Result<()>;

    /// Click the element at `selector` directly, bypassing the agent.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Press a key or chord on the focused element.
    async fn press(&self, key: &str) -> Result<()>;

    /// Type text into the focused element.
    async fn type_text(&self, text: &str) -> Result<()>;

    /// Structured extraction. Without a schema the agent answers free-form.
    async fn extract(&self, instruction: &str, schema: Option<&Value>) -> Result<Value>;

    /// URL of the active page.
    async fn current_url(&self) -> Result<String>;

    /// Let the page settle.
    async fn wait(&self, duration: Duration) -> Result<()>;

    /// Release the session.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
