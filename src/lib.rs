//! # Stream Gateway
//!
//! A chat-completion gateway that forwards requests to heterogeneous backend
//! inference providers and returns a single canonical wire format regardless
//! of which provider served them.
//!
//! ## Overview
//!
//! The core of the crate is the streaming protocol normalization engine: it
//! consumes a provider-specific byte stream in one of two incompatible
//! framings:
//! - **Server-Sent Events** (`data: <json>\n\n`, OpenAI-compatible backends)
//! - **Newline-delimited JSON** (`<json>\n`, Ollama-style backends)
//!
//! reassembles it across arbitrary network chunk boundaries (including split
//! multi-byte text and split JSON tokens), parses each event exactly once,
//! and re-emits a canonical `chat.completion.chunk` stream plus accumulated
//! content and usage statistics.
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error taxonomy and handling
//! - [`models`] - Inbound request structures
//! - [`streaming`] - Decoder, frame buffer, event parser, normalizer, and
//!   per-request orchestrator
//! - [`retry`] - Backoff policy for opening upstream connections
//! - [`client`] - Provider transport clients
//! - [`handler`] - Axum streaming endpoint

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod retry;
pub mod streaming;

pub use config::ProxyConfig;
pub use error::{GatewayError, Result};
