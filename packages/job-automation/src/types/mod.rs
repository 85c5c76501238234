//! Domain types shared across the action layer and the batch layer.

pub mod batch;
pub mod config;
pub mod descriptor;
