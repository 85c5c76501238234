//! Pure Stagehand REST API client
//!
//! A minimal client for a Stagehand server driving a browser. Exposes the agent
//! primitives (observe, act, extract) plus the raw page primitives the workflows
//! need between agent calls (fill, click, keyboard, wait, current URL).
//!
//! # Example
//!
//! ```rust,ignore
//! use stagehand_client::{StagehandClient, SessionConfig, ObserveRequest};
//!
//! let client = StagehandClient::from_env()?;
//! let session = client.start_session(&SessionConfig::local("http://localhost:9222")).await?;
//!
//! session.navigate("https://www.linkedin.com/my-items/posted-jobs/").await?;
//! let elements = session.observe(&ObserveRequest {
//!     instruction: "Click the \"Post a free job\" button".into(),
//!     iframes: true,
//! }).await?;
//!
//! session.end().await?;
//! ```

pub mod error;
pub mod types;

pub use error::{Result, StagehandError};
pub use types::*;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "http://localhost:3000/v1";

/// Stagehand server client. Cheap to clone.
#[derive(Clone)]
pub struct StagehandClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl StagehandClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Create from `STAGEHAND_API_URL`, falling back to the local default.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("STAGEHAND_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        if base_url.trim().is_empty() {
            return Err(StagehandError::Config("STAGEHAND_API_URL is empty".into()));
        }
        let mut client = Self::new(base_url);
        client.api_key = std::env::var("STAGEHAND_API_KEY").ok();
        Ok(client)
    }

    /// Authenticate against the server with an API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a browser session.
    pub async fn start_session(&self, config: &SessionConfig) -> Result<Session> {
        let data: SessionData = self.post("/sessions/start", config).await?;
        debug!(session_id = %data.session_id, model = %config.model_name, "Stagehand session started");
        Ok(Session {
            client: self.clone(),
            id: data.session_id,
        })
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        self.send(path, body)
            .await?
            .ok_or_else(|| StagehandError::Parse(format!("response to {} had no data", path)))
    }

    async fn send<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<R>> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http_client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("x-stagehand-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, path, "Stagehand request failed");
            StagehandError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %message, path, "Stagehand API error");
            return Err(StagehandError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| StagehandError::Parse(e.to_string()))?;

        if !envelope.success {
            return Err(StagehandError::Operation(
                envelope.message.unwrap_or_else(|| "unknown error".into()),
            ));
        }

        Ok(envelope.data)
    }
}

/// A live browser session. All page operations go through the session.
pub struct Session {
    client: StagehandClient,
    id: String,
}

impl Session {
    /// Server-assigned session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    async fn call<B: Serialize, R: DeserializeOwned>(&self, op: &str, body: &B) -> Result<R> {
        self.client
            .post(&format!("/sessions/{}/{}", self.id, op), body)
            .await
    }

    /// Call an operation whose response carries no data.
    async fn call_unit<B: Serialize>(&self, op: &str, body: &B) -> Result<()> {
        let _: Option<Value> = self
            .client
            .send(&format!("/sessions/{}/{}", self.id, op), body)
            .await?;
        Ok(())
    }

    /// Navigate the active page.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.call_unit("navigate", &NavigateRequest { url: url.to_string() })
            .await
    }

    /// Ask the agent for elements matching a natural-language instruction.
    pub async fn observe(&self, request: &ObserveRequest) -> Result<Vec<ObservedElement>> {
        let data: ObserveData = self.call("observe", request).await?;
        debug!(
            instruction = %request.instruction,
            count = data.elements.len(),
            "Stagehand observe"
        );
        Ok(data.elements)
    }

    /// Perform an action on a previously observed element.
    pub async fn act(&self, request: &ActRequest) -> Result<()> {
        let data: ActData = self.call("act", request).await?;
        if !data.success {
            return Err(StagehandError::Operation(data.message));
        }
        Ok(())
    }

    /// Extract structured data from the page.
    pub async fn extract(&self, request: &ExtractRequest) -> Result<Value> {
        self.call("extract", request).await
    }

    /// Fill a field directly by selector.
    pub async fn fill(&self, request: &FillRequest) -> Result<()> {
        self.call_unit("page/fill", request).await
    }

    /// Click an element directly by selector.
    pub async fn click(&self, selector: &str) -> Result<()> {
        self.call_unit(
            "page/click",
            &ClickRequest {
                selector: selector.to_string(),
            },
        )
        .await
    }

    /// Press a key (e.g. "Tab", "ArrowDown", "Meta+A").
    pub async fn press(&self, key: &str) -> Result<()> {
        self.keyboard(KeyboardAction::Press, key).await
    }

    /// Type literal text into the focused element.
    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.keyboard(KeyboardAction::Type, text).await
    }

    async fn keyboard(&self, action: KeyboardAction, value: &str) -> Result<()> {
        self.call_unit(
            "page/keyboard",
            &KeyboardRequest {
                action,
                value: value.to_string(),
            },
        )
        .await
    }

    /// Let the page settle for the given number of milliseconds.
    pub async fn wait(&self, timeout_ms: u64) -> Result<()> {
        self.call_unit("page/wait", &WaitRequest { timeout_ms }).await
    }

    /// URL of the active page.
    pub async fn current_url(&self) -> Result<String> {
        let state: PageState = self.call("page/state", &Value::Null).await?;
        Ok(state.url)
    }

    /// End the session and release the browser.
    pub async fn end(&self) -> Result<()> {
        self.call_unit("end", &Value::Null).await?;
        debug!(session_id = %self.id, "Stagehand session ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = StagehandClient::new("http://localhost:3000/v1/").with_api_key("sh-test");

        assert_eq!(client.base_url(), "http://localhost:3000/v1");
        assert_eq!(client.api_key.as_deref(), Some("sh-test"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client = StagehandClient::new("http://127.0.0.1:9");
        let err = client
            .start_session(&SessionConfig::default())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, StagehandError::Network(_)));
    }
}
