use anyhow::{Context, Result};
use dotenvy::dotenv;
use job_automation::AutomationConfig;
use stagehand_client::{SessionConfig, StagehandClient};
use std::env;
use std::path::PathBuf;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub stagehand_api_url: String,
    pub stagehand_api_key: Option<String>,
    pub cdp_url: String,
    pub model_name: String,
    pub openai_api_key: Option<String>,
    pub openrouter_api_base: Option<String>,
    pub automation_root: PathBuf,
    pub messages_db_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            stagehand_api_url: env::var("STAGEHAND_API_URL")
                .unwrap_or_else(|_| "http://localhost:3000/v1".to_string()),
            stagehand_api_key: env::var("STAGEHAND_API_KEY").ok(),
            cdp_url: env::var("STAGEHAND_LOCAL_CDP_URL")
                .unwrap_or_else(|_| "http://localhost:9222".to_string()),
            model_name: env::var("STAGEHAND_MODEL_NAME")
                .unwrap_or_else(|_| "openrouter/google/gemini-2.5-flash-preview-09-2025".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openrouter_api_base: env::var("OPENROUTER_API_BASE").ok(),
            automation_root: env::var("AUTOMATION_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            messages_db_path: match env::var("MESSAGES_DB_PATH") {
                Ok(path) => PathBuf::from(path),
                Err(_) => PathBuf::from(env::var("HOME").context("MESSAGES_DB_PATH or HOME must be set")?)
                    .join("Library/Messages/chat.db"),
            },
        })
    }

    pub fn client(&self) -> StagehandClient {
        let client = StagehandClient::new(&self.stagehand_api_url);
        match &self.stagehand_api_key {
            Some(key) => client.with_api_key(key),
            None => client,
        }
    }

    pub fn session(&self) -> SessionConfig {
        let mut session = SessionConfig::local(&self.cdp_url).model_name(&self.model_name);
        if let Some(key) = &self.openai_api_key {
            session = session.model_api_key(key);
        }
        if let Some(base) = &self.openrouter_api_base {
            session = session.api_base(base);
        }
        session
    }

    pub fn automation(&self) -> AutomationConfig {
        AutomationConfig::from_root(&self.automation_root)
    }
}
