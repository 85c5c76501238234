//! Core trait abstractions.
//!
//! - [`UiBackend`](backend::UiBackend): the browser agent being driven
//! - [`ArtifactStore`](store::ArtifactStore): per-item result persistence
//! - [`ItemProcessor`](processor::ItemProcessor) / [`Enricher`](processor::Enricher): batch hooks
//! - [`OtpSource`](otp::OtpSource): one-time password lookup

pub mod backend;
pub mod otp;
pub mod processor;
pub mod store;
