//! A single chat session: its id, its history, and the input loop rules.

use tracing::{Instrument, info, info_span};

use trendchat_shared::{ConversationHistory, Result, SessionId};

use crate::conversation::{ConversationController, UserInput, classify_input};

/// What the caller should do after feeding a line to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Blank input; prompt again.
    Ignored,
    /// Exit keyword; end the session.
    Exit,
    /// The assistant's answer to show.
    Answer(String),
}

/// Session state machine: `AwaitingInput -> Processing -> AwaitingInput`,
/// ending on an exit keyword or end of input.
pub struct ChatSession {
    id: SessionId,
    controller: ConversationController,
    history: ConversationHistory,
}

impl ChatSession {
    pub fn new(controller: ConversationController) -> Self {
        Self {
            id: SessionId::new(),
            controller,
            history: ConversationHistory::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Handle one line of input.
    ///
    /// History is replaced only after the turn completes, so dropping this
    /// future mid-turn (Ctrl-C) leaves the session as it was.
    pub async fn send(&mut self, line: &str) -> Result<Reply> {
        let query = match classify_input(line) {
            UserInput::Empty => return Ok(Reply::Ignored),
            UserInput::Exit => {
                info!(session = %self.id, turns = self.history.len(), "session ended by user");
                return Ok(Reply::Exit);
            }
            UserInput::Query(q) => q,
        };

        let span = info_span!("turn", session = %self.id, turn = self.history.len() / 2 + 1);
        let outcome = self
            .controller
            .respond(&self.history, query)
            .instrument(span)
            .await?;

        match outcome {
            Some(outcome) => {
                self.history = outcome.history;
                Ok(Reply::Answer(outcome.answer))
            }
            None => Ok(Reply::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::ReasoningStep;
    use crate::tools::SearchTool;
    use crate::tools::tests::StubSource;
    use async_trait::async_trait;
    use std::sync::Arc;
    use trendchat_shared::{ToolSignature, TrendChatError, Turn};

    struct EchoReasoner;

    #[async_trait]
    impl ReasoningStep for EchoReasoner {
        async fn respond(&self, turns: &[Turn], _tools: &SearchTool) -> Result<String> {
            let last = turns.last().expect("pending turn");
            if last.content == "fail" {
                return Err(TrendChatError::reasoning("boom"));
            }
            Ok(format!("echo: {} ({} turns)", last.content, turns.len()))
        }
    }

    fn session() -> ChatSession {
        let tools = SearchTool::new(Arc::new(StubSource::default()), ToolSignature::Batch, 3);
        ChatSession::new(ConversationController::new(Arc::new(EchoReasoner), tools))
    }

    #[tokio::test]
    async fn answers_and_accumulates_history() {
        let mut s = session();
        assert_eq!(s.send("first").await.unwrap(), Reply::Answer("echo: first (1 turns)".into()));
        assert_eq!(s.send("second").await.unwrap(), Reply::Answer("echo: second (3 turns)".into()));
        assert_eq!(s.history().len(), 4);
    }

    #[tokio::test]
    async fn blank_and_exit_do_not_touch_history() {
        let mut s = session();
        assert_eq!(s.send("   ").await.unwrap(), Reply::Ignored);
        assert_eq!(s.send("EXIT").await.unwrap(), Reply::Exit);
        assert!(s.history().is_empty());
    }

    #[tokio::test]
    async fn failed_turn_keeps_previous_history() {
        let mut s = session();
        s.send("ok").await.unwrap();
        assert!(s.send("fail").await.is_err());
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.history().last(), Some(&Turn::assistant("echo: ok (1 turns)")));
    }
}
