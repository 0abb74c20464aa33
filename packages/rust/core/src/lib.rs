//! Conversation engine for TrendChat.
//!
//! Ties the search tool to a reasoning step and keeps per-session history:
//! a user turn goes in, the model searches transcripts as it sees fit, and
//! one plain-text answer comes out.

pub mod agent;
pub mod conversation;
pub mod reasoning;
pub mod session;
pub mod tools;

pub use agent::{AgentOptions, ChatCompletionsAgent};
pub use conversation::{ConversationController, EXIT_KEYWORDS, TurnOutcome, UserInput, classify_input};
pub use reasoning::ReasoningStep;
pub use session::{ChatSession, Reply};
pub use tools::{MULTI_SEARCH_TOOL, SINGLE_SEARCH_TOOL, SearchTool, ToolDefinition};
