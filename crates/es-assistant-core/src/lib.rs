//! # es-assistant core
//!
//! Runtime-free logic shared by the `esa` binary and its transports: the
//! document model, the search gateway abstraction (with an in-memory
//! implementation), chat intent classification, and report formatting.
//!
//! This crate has no tokio, HTTP client, or filesystem dependencies.

pub mod format;
pub mod gateway;
pub mod intent;
pub mod models;
