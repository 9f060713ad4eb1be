//! # es-assistant
//!
//! Answer free-text questions from an Elasticsearch index, either through a
//! conversational front end or through a JSON-RPC style tool protocol.
//!
//! ## Architecture
//!
//! ```text
//!   chat message                     JSON-RPC request
//!        │                                  │
//!        ▼                                  ▼
//! ┌──────────────┐                  ┌──────────────┐
//! │  ChatFacade  │                  │  Dispatcher  │◀── ToolCatalog
//! │ (classifier) │                  │              │
//! └──────┬───────┘                  └──────┬───────┘
//!        │         ┌───────────────┐       │
//!        └────────▶│ SearchGateway │◀──────┘
//!                  │ Elasticsearch │
//!                  └───────────────┘
//! ```
//!
//! The runtime-free pieces (models, gateway trait, classifier, formatter)
//! live in the `es-assistant-core` crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`elastic`] | Elasticsearch gateway over HTTP |
//! | [`keywords`] | LLM keyword extraction |
//! | [`chat`] | Chat facade |
//! | [`tools`] | Tool trait, parameter declarations, built-in tools |
//! | [`catalog`] | Tool and resource registry |
//! | [`protocol`] | Wire envelopes and error codes |
//! | [`dispatcher`] | Request routing |
//! | [`stdio`] | Line-delimited stdio transport |
//! | [`server`] | HTTP transport |

pub mod catalog;
pub mod chat;
pub mod config;
pub mod dispatcher;
pub mod elastic;
pub mod keywords;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod stdio;
pub mod tools;

pub use es_assistant_core as core;
