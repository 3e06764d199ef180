//! Domain logic for the Ken terminal client.
//!
//! Everything here is free of terminal concerns: the backend client, the
//! agent stream decoder and chat reducer, the windowed text renderer, search
//! supersession, and the pending-workspace cache.

pub mod api;
pub mod chat;
pub mod config;
pub mod document;
pub mod error;
pub mod markup;
pub mod pending;
pub mod search;
pub mod stream;
pub mod text_window;
pub mod types;

pub use api::ApiClient;
pub use config::Config;
pub use error::{ApiError, ChatError, ConfigError, StreamError};
