//! The canonical, machine-actionable form of a resolved instruction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A resolved UI target.
///
/// Produced by normalizing whatever the backend returns for an observe call.
/// Cached verbatim under the instruction text; replaced wholesale on
/// re-resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub selector: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default)]
    pub arguments: Vec<String>,

    /// Resolve and act across iframes.
    #[serde(default)]
    pub iframes: bool,

    /// Literal value for fill-style actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ActionDescriptor {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            description: String::new(),
            method: None,
            arguments: Vec::new(),
            iframes: false,
            value: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Copy of this descriptor with the iframe scope enabled.
    pub fn in_iframes(&self) -> Self {
        Self {
            iframes: true,
            ..self.clone()
        }
    }

    /// Method to invoke, defaulting to a click.
    pub fn method_or_click(&self) -> &str {
        self.method.as_deref().unwrap_or("click")
    }

    /// Normalize a loosely-typed backend or cache record.
    ///
    /// Accepts any object carrying a non-empty `selector` string. Arguments
    /// that are not strings are rendered as JSON text. Returns `None` for
    /// records with no usable selector.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let selector = object
            .get("selector")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        let arguments = match object.get("arguments") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            selector: selector.to_string(),
            description: text("description").unwrap_or_default(),
            method: text("method").filter(|m| !m.is_empty()),
            arguments,
            iframes: object.get("iframes").and_then(Value::as_bool).unwrap_or(false),
            value: text("value"),
        })
    }
}
