//! [`UiBackend`](crate::traits::backend::UiBackend) implementations.
//!
//! - `StagehandBackend`: a Stagehand server session (requires `stagehand` feature)
//! - [`MockBackend`](crate::testing::MockBackend): scripted, for tests

#[cfg(feature = "stagehand")]
mod stagehand;

#[cfg(feature = "stagehand")]
pub use stagehand::{descriptor_from_element, StagehandBackend};
