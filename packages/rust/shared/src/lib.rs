//! Shared types, error model, and configuration for TrendChat.
//!
//! This crate is the foundation depended on by all other TrendChat crates.
//! It provides:
//! - [`TrendChatError`], the unified error type
//! - Domain types ([`SearchResult`], [`Turn`], [`ConversationHistory`], [`SearchTermBatch`])
//! - Configuration ([`AppConfig`], [`SearchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChatConfig, MAX_TERMS_CAP, OpenRouterConfig, SearchConfig, ToolSignature,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{Result, TrendChatError};
pub use types::{ConversationHistory, Role, SearchResult, SearchTermBatch, SessionId, Turn};
