//! One-time passwords from a local SQLite message store.

use async_trait::async_trait;
use regex::Regex;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{AutomationError, Result};
use crate::traits::otp::{Otp, OtpSource};

static RE_OTP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{6})\b").unwrap());

/// First standalone 6-digit number in a message.
pub fn parse_otp(text: &str) -> Option<String> {
    RE_OTP.captures(text).map(|c| c[1].to_string())
}

#[derive(Debug, FromRow)]
struct MessageRow {
    sender: String,
    message_text: String,
}

/// Reads the newest messages from matching senders in a `message`/`handle`
/// database and returns the first code found.
#[derive(Debug, Clone)]
pub struct MessagesOtpSource {
    db_path: PathBuf,
    sender_pattern: String,
    max_rows: u32,
}

impl MessagesOtpSource {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            sender_pattern: "hdfcbk".to_string(),
            max_rows: 20,
        }
    }

    /// Case-insensitive substring matched against sender handles.
    pub fn with_sender_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.sender_pattern = pattern.into().to_lowercase();
        self
    }

    /// How many recent messages to scan.
    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn recent_messages(&self) -> Result<Vec<MessageRow>> {
        if !tokio::fs::try_exists(&self.db_path).await? {
            return Err(AutomationError::ExternalDependency(format!(
                "message database not found at {}",
                self.db_path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| AutomationError::ExternalDependency(e.to_string()))?;

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT h.id AS sender, m.text AS message_text
            FROM message m
            JOIN handle h ON m.handle_id = h.ROWID
            WHERE lower(h.id) LIKE ?1
              AND m.text IS NOT NULL
            ORDER BY m.date DESC
            LIMIT ?2
            "#,
        )
        .bind(format!("%{}%", self.sender_pattern))
        .bind(i64::from(self.max_rows))
        .fetch_all(&pool)
        .await
        .map_err(|e| AutomationError::ExternalDependency(e.to_string()));

        pool.close().await;
        rows
    }
}

#[async_trait]
impl OtpSource for MessagesOtpSource {
    async fn latest_otp(&self) -> Result<Option<Otp>> {
        let rows = self.recent_messages().await?;
        tracing::debug!(scanned = rows.len(), "recent messages read");

        Ok(rows.into_iter().find_map(|row| {
            parse_otp(&row.message_text).map(|code| Otp {
                sender: row.sender,
                code,
            })
        }))
    }
}
