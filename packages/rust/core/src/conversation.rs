//! Conversation controller: one user turn in, one answer turn out.
//!
//! History is a value owned by the caller. [`ConversationController::respond`]
//! never touches the history it is given; on success it returns a new one
//! with exactly two more turns. Raw search hits never enter history; only
//! the model's final answer does.

use std::sync::Arc;

use tracing::{info, instrument};

use trendchat_search::{HttpSearchClient, SearchOptions};
use trendchat_shared::{AppConfig, ConversationHistory, Result};

use crate::agent::{AgentOptions, ChatCompletionsAgent};
use crate::reasoning::ReasoningStep;
use crate::tools::SearchTool;

/// Inputs that end a session instead of being asked (case-insensitive).
pub const EXIT_KEYWORDS: [&str; 3] = ["exit", "quit", "bye"];

/// What a line of user input means to the surrounding loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput<'a> {
    /// Blank or whitespace-only; re-prompt.
    Empty,
    /// One of [`EXIT_KEYWORDS`].
    Exit,
    /// A question, trimmed.
    Query(&'a str),
}

/// Classify a raw input line.
pub fn classify_input(text: &str) -> UserInput<'_> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return UserInput::Empty;
    }
    if EXIT_KEYWORDS
        .iter()
        .any(|kw| trimmed.eq_ignore_ascii_case(kw))
    {
        return UserInput::Exit;
    }
    UserInput::Query(trimmed)
}

/// Result of one completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub answer: String,
    pub history: ConversationHistory,
}

/// Wires the reasoning step to the search tool.
#[derive(Clone)]
pub struct ConversationController {
    reasoning: Arc<dyn ReasoningStep>,
    tools: SearchTool,
}

impl ConversationController {
    pub fn new(reasoning: Arc<dyn ReasoningStep>, tools: SearchTool) -> Self {
        Self { reasoning, tools }
    }

    /// Wire the HTTP search client and the chat-completions agent from config.
    pub fn from_config(config: &AppConfig, api_key: String) -> Result<Self> {
        config.validate()?;
        let search_opts = SearchOptions::from_config(&config.search)?;
        let client = HttpSearchClient::new(&search_opts)?;
        let tools = SearchTool::new(
            Arc::new(client),
            config.search.tool_signature,
            search_opts.max_terms,
        );

        let agent = ChatCompletionsAgent::new(AgentOptions::from_config(config, api_key)?)?;
        info!(
            model = %agent.model(),
            tool = tools.name(),
            max_terms = tools.max_terms(),
            "conversation controller ready"
        );

        Ok(Self::new(Arc::new(agent), tools))
    }

    pub fn tools(&self) -> &SearchTool {
        &self.tools
    }

    /// Run one turn.
    ///
    /// Returns `Ok(None)` for blank input without calling the reasoning
    /// step. Reasoning failures propagate and leave no trace in history.
    #[instrument(skip_all, fields(history_len = history.len()))]
    pub async fn respond(
        &self,
        history: &ConversationHistory,
        user_text: &str,
    ) -> Result<Option<TurnOutcome>> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Ok(None);
        }

        let turns = history.with_pending(user_text);
        let answer = self.reasoning.respond(&turns, &self.tools).await?;

        info!(answer_chars = answer.chars().count(), "turn answered");

        Ok(Some(TurnOutcome {
            history: history.with_exchange(user_text, &answer),
            answer,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::StubSource;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use trendchat_shared::{Role, SearchResult, ToolSignature, TrendChatError, Turn};
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Reasoner that searches the latest user turn verbatim and remembers
    /// what it saw.
    #[derive(Default)]
    struct SearchingReasoner {
        seen_turns: Mutex<Vec<Vec<Turn>>>,
        seen_results: Mutex<Vec<SearchResult>>,
    }

    #[async_trait]
    impl ReasoningStep for SearchingReasoner {
        async fn respond(&self, turns: &[Turn], tools: &SearchTool) -> Result<String> {
            self.seen_turns.lock().unwrap().push(turns.to_vec());
            let question = &turns.last().expect("pending turn").content;
            let results = tools.run(&[question.as_str()]).await;
            let answer = format!("Found {} posts.", results.len());
            *self.seen_results.lock().unwrap() = results;
            Ok(answer)
        }
    }

    struct FailingReasoner;

    #[async_trait]
    impl ReasoningStep for FailingReasoner {
        async fn respond(&self, _turns: &[Turn], _tools: &SearchTool) -> Result<String> {
            Err(TrendChatError::reasoning("provider unavailable"))
        }
    }

    fn stub_tools(source: Arc<StubSource>) -> SearchTool {
        SearchTool::new(source, ToolSignature::Batch, 3)
    }

    #[test]
    fn from_config_uses_configured_tool_shape() {
        let mut config = AppConfig::default();
        config.search.tool_signature = ToolSignature::Single;
        config.search.max_terms = 2;

        let controller = ConversationController::from_config(&config, "key".into()).unwrap();
        assert_eq!(controller.tools().name(), "semantic_search");
        assert_eq!(controller.tools().max_terms(), 2);
    }

    #[test]
    fn from_config_rejects_bad_endpoint() {
        let mut config = AppConfig::default();
        config.search.endpoint = "not a url".into();
        assert!(ConversationController::from_config(&config, "key".into()).is_err());
    }

    #[test]
    fn classify_recognizes_exit_keywords() {
        assert_eq!(classify_input("exit"), UserInput::Exit);
        assert_eq!(classify_input("  QUIT "), UserInput::Exit);
        assert_eq!(classify_input("Bye"), UserInput::Exit);
        assert_eq!(classify_input(""), UserInput::Empty);
        assert_eq!(classify_input(" \t\n"), UserInput::Empty);
        assert_eq!(
            classify_input(" bye bye trends "),
            UserInput::Query("bye bye trends")
        );
    }

    #[tokio::test]
    async fn turn_appends_exactly_two() {
        let source = Arc::new(StubSource::default().with("q1", vec![]).with("q2", vec![]));
        let reasoner = Arc::new(SearchingReasoner::default());
        let controller = ConversationController::new(reasoner.clone(), stub_tools(source));

        let empty = ConversationHistory::new();
        let first = controller.respond(&empty, "q1").await.unwrap().unwrap();
        assert_eq!(first.history.len(), 2);
        assert!(empty.is_empty());

        let second = controller.respond(&first.history, "q2").await.unwrap().unwrap();
        assert_eq!(second.history.len(), 4);
        assert_eq!(&second.history.turns()[..2], first.history.turns());
        assert_eq!(second.history.turns()[2], Turn::user("q2"));
        assert_eq!(second.history.turns()[3].role, Role::Assistant);
        assert_eq!(second.history.turns()[3].content, second.answer);

        // The reasoner saw prior turns plus the pending user turn.
        let seen = reasoner.seen_turns.lock().unwrap();
        assert_eq!(seen[1].len(), 3);
        assert_eq!(seen[1][2], Turn::user("q2"));
    }

    #[tokio::test]
    async fn whitespace_input_is_ignored() {
        let source = Arc::new(StubSource::default());
        let reasoner = Arc::new(SearchingReasoner::default());
        let controller = ConversationController::new(reasoner.clone(), stub_tools(source.clone()));

        let history = ConversationHistory::new().with_exchange("hi", "hello");
        let outcome = controller.respond(&history, "   \n ").await.unwrap();

        assert!(outcome.is_none());
        assert_eq!(history.len(), 2);
        assert!(reasoner.seen_turns.lock().unwrap().is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn reasoning_failure_leaves_no_partial_turn() {
        let source = Arc::new(StubSource::default());
        let controller = ConversationController::new(Arc::new(FailingReasoner), stub_tools(source));

        let history = ConversationHistory::new();
        let result = controller.respond(&history, "what's hot?").await;

        assert!(matches!(result, Err(TrendChatError::Reasoning(_))));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn total_search_failure_still_answers() {
        // No stubs: every term lookup fails.
        let source = Arc::new(StubSource::default());
        let reasoner = Arc::new(SearchingReasoner::default());
        let controller = ConversationController::new(reasoner.clone(), stub_tools(source));

        let outcome = controller
            .respond(&ConversationHistory::new(), "anything new in skincare?")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.answer, "Found 0 posts.");
        assert_eq!(outcome.history.len(), 2);
    }

    #[tokio::test]
    async fn sustainable_fashion_end_to_end() {
        let server = MockServer::start().await;
        let question = "What's trending about sustainable fashion?";

        Mock::given(method("GET"))
            .and(path("/api/transcript_vector_search"))
            .and(query_param("term", question))
            .and(query_param("limit", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"_id": "a", "transcript": "... sustainable fashion is huge https://x.com/y ..."},
                    {"_id": "a", "transcript": "duplicate"},
                    {"_id": "b", "transcript": "  multiple   spaces  "}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let opts = SearchOptions {
            endpoint: Url::parse(&format!("{}/api/transcript_vector_search", server.uri()))
                .unwrap(),
            per_term_limit: 20,
            timeout_secs: 5,
            max_terms: 3,
        };
        let client = Arc::new(HttpSearchClient::new(&opts).unwrap());
        let tools = SearchTool::new(client, ToolSignature::Batch, 3);
        let reasoner = Arc::new(SearchingReasoner::default());
        let controller = ConversationController::new(reasoner.clone(), tools);

        let outcome = controller
            .respond(&ConversationHistory::new(), question)
            .await
            .unwrap()
            .unwrap();

        let merged = reasoner.seen_results.lock().unwrap().clone();
        assert_eq!(
            merged,
            vec![
                SearchResult::new("a", "... sustainable fashion is huge ..."),
                SearchResult::new("b", "multiple spaces"),
            ]
        );
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.history.turns()[0], Turn::user(question));
        // Only the answer is remembered, never the transcripts.
        assert!(!outcome
            .history
            .turns()
            .iter()
            .any(|t| t.content.contains("sustainable fashion is huge")));
    }
}
