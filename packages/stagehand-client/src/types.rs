//! Stagehand API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Sessions
// =============================================================================

/// Options used when the server attaches to a locally running browser.
#[derive(Debug, Clone, Serialize)]
pub struct LocalBrowserLaunchOptions {
    #[serde(rename = "cdpUrl")]
    pub cdp_url: String,
}

/// Options forwarded to the model client used for element resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ModelClientOptions {
    #[serde(rename = "apiBase", skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// Session start request.
#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    /// "LOCAL" attaches to an existing browser over CDP
    pub env: String,

    #[serde(rename = "modelName")]
    pub model_name: String,

    #[serde(rename = "modelApiKey", skip_serializing_if = "Option::is_none")]
    pub model_api_key: Option<String>,

    #[serde(rename = "modelClientOptions", skip_serializing_if = "Option::is_none")]
    pub model_client_options: Option<ModelClientOptions>,

    #[serde(
        rename = "localBrowserLaunchOptions",
        skip_serializing_if = "Option::is_none"
    )]
    pub local_browser_launch_options: Option<LocalBrowserLaunchOptions>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            env: "LOCAL".to_string(),
            model_name: "openrouter/google/gemini-2.5-flash-preview-09-2025".to_string(),
            model_api_key: None,
            model_client_options: None,
            local_browser_launch_options: Some(LocalBrowserLaunchOptions {
                cdp_url: "http://localhost:9222".to_string(),
            }),
        }
    }
}

impl SessionConfig {
    /// Attach to a local browser at the given CDP endpoint.
    pub fn local(cdp_url: impl Into<String>) -> Self {
        Self {
            local_browser_launch_options: Some(LocalBrowserLaunchOptions {
                cdp_url: cdp_url.into(),
            }),
            ..Default::default()
        }
    }

    /// Set the model name.
    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Set the model API key.
    pub fn model_api_key(mut self, key: impl Into<String>) -> Self {
        self.model_api_key = Some(key.into());
        self
    }

    /// Route model calls through a custom API base (e.g. OpenRouter).
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.model_client_options = Some(ModelClientOptions {
            api_base: Some(api_base.into()),
        });
        self
    }
}

/// Envelope wrapping every server response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionData {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

// =============================================================================
// Agent primitives
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NavigateRequest {
    pub url: String,
}

/// Observe request: ask the agent for elements matching an instruction.
#[derive(Debug, Clone, Serialize)]
pub struct ObserveRequest {
    pub instruction: String,
    pub iframes: bool,
}

/// A candidate element returned by observe.
///
/// The server's shape varies between versions, so every field is optional and
/// anything unrecognized lands in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservedElement {
    #[serde(default)]
    pub selector: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub method: Option<String>,

    #[serde(default)]
    pub arguments: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObserveData {
    #[serde(default)]
    pub elements: Vec<ObservedElement>,
}

/// Act request carrying a previously observed element.
#[derive(Debug, Clone, Serialize)]
pub struct ActRequest {
    pub selector: String,
    pub description: String,
    pub method: String,
    pub arguments: Vec<String>,
    pub iframes: bool,
    #[serde(rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActData {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Extract request. Without a schema the server returns `{"extraction": "..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractRequest {
    pub instruction: String,
    #[serde(rename = "schemaDefinition", skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    pub iframes: bool,
}

// =============================================================================
// Raw page primitives
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct FillRequest {
    pub selector: String,
    pub value: String,
    /// Selector of the iframe the field lives in, if any
    #[serde(rename = "frameSelector", skip_serializing_if = "Option::is_none")]
    pub frame_selector: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClickRequest {
    pub selector: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardRequest {
    pub action: KeyboardAction,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardAction {
    Press,
    Type,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitRequest {
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageState {
    pub url: String,
}
