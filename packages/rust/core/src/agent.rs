//! Reasoning step backed by an OpenAI-compatible chat-completions API.
//!
//! Sends the fixed instructions, the conversation, and the search tool
//! definition. Tool calls in the reply are executed and answered with `tool`
//! messages; the first reply without tool calls is the answer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use trendchat_shared::{AppConfig, Result, TrendChatError, Turn};

use crate::reasoning::ReasoningStep;
use crate::tools::{SearchTool, ToolDefinition};

/// Timeout for one chat-completions request.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("TrendChat/", env!("CARGO_PKG_VERSION"));

/// Soft cap on answer length, stated to the model.
pub const ANSWER_WORD_LIMIT: usize = 150;

/// System instructions for the given tool shape.
pub fn instructions(tool: &SearchTool) -> String {
    let call_guidance = if tool.max_terms() > 1 {
        format!(
            "call `{name}` once with up to {max} meaning-rich phrases that cover \
             different angles of the request. Phrases may be long; their job is to \
             match the wording creators use in their videos.",
            name = tool.name(),
            max = tool.max_terms(),
        )
    } else {
        format!(
            "call `{name}` with one meaning-rich phrase worded the way creators talk \
             in their videos.",
            name = tool.name(),
        )
    };

    format!(
        "You are the glystn assistant and you uncover social-media trends.\n\
         \n\
         - First decide whether a transcript search is needed.\n\
         - If it is, {call_guidance}\n\
         - You receive merged, de-duplicated posts as {{id, text}} pairs.\n\
         - Analyse all posts and answer the question directly in at most \
           {ANSWER_WORD_LIMIT} words. If nothing relevant came back, say so.\n\
         - Cite examples or patterns, but never reveal raw ids or quote \
           transcripts verbatim. Call the people who post \"creators\".\n\
         - Reply with plain text only."
    )
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Provider settings resolved from config, CLI flags, and the environment.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// API base URL, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: Url,
    /// Bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Maximum replies that may request tools before the turn fails.
    pub max_tool_rounds: u32,
}

impl AgentOptions {
    pub fn from_config(config: &AppConfig, api_key: String) -> Result<Self> {
        let base_url = Url::parse(&config.openrouter.base_url).map_err(|e| {
            TrendChatError::validation(format!(
                "invalid provider base URL '{}': {e}",
                config.openrouter.base_url
            ))
        })?;

        Ok(Self {
            base_url,
            api_key,
            model: config.openrouter.default_model.clone(),
            max_tool_rounds: config.chat.max_tool_rounds,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.as_str().trim_end_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    tools: Vec<WireTool>,
    tool_choice: &'static str,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool_result(call_id: &str, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(call_id.to_string()),
        }
    }
}

impl From<&Turn> for WireMessage {
    fn from(turn: &Turn) -> Self {
        Self::text(turn.role.as_str(), turn.content.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// [`ReasoningStep`] that talks to a chat-completions endpoint.
pub struct ChatCompletionsAgent {
    client: Client,
    opts: AgentOptions,
}

impl ChatCompletionsAgent {
    pub fn new(opts: AgentOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TrendChatError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, opts })
    }

    pub fn model(&self) -> &str {
        &self.opts.model
    }

    /// One request/response round-trip.
    async fn complete(&self, messages: &[WireMessage], tool: &ToolDefinition) -> Result<WireMessage> {
        let request = ChatRequest {
            model: &self.opts.model,
            messages,
            tools: vec![WireTool {
                kind: "function",
                function: tool.clone(),
            }],
            tool_choice: "auto",
        };

        let response = self
            .client
            .post(self.opts.completions_url())
            .bearer_auth(&self.opts.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TrendChatError::reasoning(format!("provider request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrendChatError::reasoning(format!(
                "provider returned HTTP {status}: {}",
                body.trim()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TrendChatError::reasoning(format!("failed to parse provider response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| TrendChatError::reasoning("provider returned empty choices"))
    }
}

#[async_trait]
impl ReasoningStep for ChatCompletionsAgent {
    #[instrument(skip_all, fields(model = %self.opts.model, turns = turns.len()))]
    async fn respond(&self, turns: &[Turn], tools: &SearchTool) -> Result<String> {
        let definition = tools.definition();
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(WireMessage::text("system", instructions(tools)));
        messages.extend(turns.iter().map(WireMessage::from));

        let mut tool_rounds = 0;
        loop {
            let reply = self.complete(&messages, &definition).await?;

            let calls = reply.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                let answer = reply.content.unwrap_or_default().trim().to_string();
                if answer.is_empty() {
                    return Err(TrendChatError::reasoning("provider returned an empty answer"));
                }
                info!(tool_rounds, "answer received");
                return Ok(answer);
            }

            if tool_rounds == self.opts.max_tool_rounds {
                return Err(TrendChatError::reasoning(format!(
                    "model still requesting tools after {tool_rounds} rounds"
                )));
            }
            tool_rounds += 1;

            messages.push(reply);
            for call in &calls {
                debug!(call_id = %call.id, tool = %call.function.name, "running tool call");
                let content = match tools.invoke(&call.function.name, &call.function.arguments).await
                {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(tool = %call.function.name, error = %e, "tool call rejected");
                        serde_json::json!({ "error": e.to_string() }).to_string()
                    }
                };
                messages.push(WireMessage::tool_result(&call.id, content));
            }
        }
    }
}
