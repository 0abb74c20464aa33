//! Core domain types: search hits, conversation turns, and history.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one chat session (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SearchResult
// ---------------------------------------------------------------------------

/// One transcript hit returned to the language model.
///
/// Identity is `id` only; two results with the same id are duplicates
/// regardless of their text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Content identifier from the search backend.
    pub id: String,
    /// Sanitized transcript text (at most 1000 characters).
    pub text: String,
}

impl SearchResult {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Turns and history
// ---------------------------------------------------------------------------

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only turn sequence owned by a single session.
///
/// There is no way to edit or remove a turn once recorded. New turns are
/// added through [`ConversationHistory::with_exchange`], which leaves the
/// original value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The turns sent to the reasoning step: everything so far plus `user_text`.
    pub fn with_pending(&self, user_text: &str) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(self.turns.len() + 1);
        turns.extend_from_slice(&self.turns);
        turns.push(Turn::user(user_text));
        turns
    }

    /// Copy of this history with one user/assistant exchange appended.
    pub fn with_exchange(&self, user_text: &str, answer: &str) -> Self {
        let mut turns = self.with_pending(user_text);
        turns.push(Turn::assistant(answer));
        Self { turns }
    }
}

// ---------------------------------------------------------------------------
// SearchTermBatch
// ---------------------------------------------------------------------------

/// Ordered search phrases for one tool call.
///
/// Only the first `max_terms` supplied phrases are considered; among those,
/// blank phrases and exact repeats are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchTermBatch {
    terms: Vec<String>,
}

impl SearchTermBatch {
    pub fn new<I, S>(terms: I, max_terms: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept: Vec<String> = Vec::new();
        for term in terms.into_iter().take(max_terms) {
            let term = term.into().trim().to_string();
            if term.is_empty() || kept.contains(&term) {
                continue;
            }
            kept.push(term);
        }
        Self { terms: kept }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_display_roundtrip() {
        let id = SessionId::new();
        let s = id.to_string();
        assert_eq!(Uuid::parse_str(&s).expect("uuid"), id.0);
    }

    #[test]
    fn search_result_serializes_as_id_text() {
        let r = SearchResult::new("a1", "hello");
        let json = serde_json::to_value(&r).expect("serialize");
        assert_eq!(json, serde_json::json!({"id": "a1", "text": "hello"}));
    }

    #[test]
    fn role_serializes_lowercase() {
        let turn = Turn::assistant("hi");
        let json = serde_json::to_value(&turn).expect("serialize");
        assert_eq!(json["role"], "assistant");
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn with_exchange_appends_two_and_keeps_original() {
        let history = ConversationHistory::new().with_exchange("q1", "a1");
        let next = history.with_exchange("q2", "a2");

        assert_eq!(history.len(), 2);
        assert_eq!(next.len(), 4);
        assert_eq!(&next.turns()[..2], history.turns());
        assert_eq!(next.last(), Some(&Turn::assistant("a2")));
    }

    #[test]
    fn with_pending_adds_user_turn_only() {
        let history = ConversationHistory::new().with_exchange("q1", "a1");
        let pending = history.with_pending("q2");
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[2], Turn::user("q2"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn term_batch_truncates_before_filtering() {
        let batch = SearchTermBatch::new(["eco denim", "  ", "eco denim", "thrift hauls"], 3);
        assert_eq!(batch.terms(), ["eco denim"]);

        let batch = SearchTermBatch::new(["a", "b", "c", "d"], 3);
        assert_eq!(batch.terms(), ["a", "b", "c"]);
    }

    #[test]
    fn term_batch_trims_phrases() {
        let batch = SearchTermBatch::new(vec![" slow fashion ".to_string()], 3);
        assert_eq!(batch.terms(), ["slow fashion"]);
        assert_eq!(batch.len(), 1);
        assert!(SearchTermBatch::new(Vec::<String>::new(), 3).is_empty());
    }
}
