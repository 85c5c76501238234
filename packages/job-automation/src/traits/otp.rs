//! One-time password lookup.

use async_trait::async_trait;

use crate::error::Result;

/// A one-time password and the handle that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Otp {
    pub sender: String,
    pub code: String,
}

/// Source of the most recent one-time password.
#[async_trait]
pub trait OtpSource: Send + Sync {
    /// Latest code, or `None` if no recent message carries one.
    async fn latest_otp(&self) -> Result<Option<Otp>>;
}
