//! The reasoning step: a pluggable language-model capability.

use async_trait::async_trait;

use trendchat_shared::{Result, Turn};

use crate::tools::SearchTool;

/// Turns a conversation into an answer, calling the search tool as it sees fit.
///
/// Implementations receive the full turn sequence ending with the pending
/// user turn. They should keep answers short (about 150 words) and must not
/// echo raw transcript ids; that contract is carried by the instructions
/// given to the model, not checked here.
#[async_trait]
pub trait ReasoningStep: Send + Sync {
    async fn respond(&self, turns: &[Turn], tools: &SearchTool) -> Result<String>;
}
