//! The search tool offered to the language model.
//!
//! Two shapes exist, chosen by [`ToolSignature`]:
//! - `semantic_multi_search(terms: [string])` with up to `max_terms` phrases
//! - `semantic_search(term: string)` with exactly one phrase
//!
//! Both return a JSON array of `{id, text}` objects, deduplicated by id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use trendchat_search::{TermSource, search};
use trendchat_shared::{Result, SearchResult, ToolSignature, TrendChatError};

/// Function name of the batch tool.
pub const MULTI_SEARCH_TOOL: &str = "semantic_multi_search";

/// Function name of the single-phrase tool.
pub const SINGLE_SEARCH_TOOL: &str = "semantic_search";

/// JSON-schema description of a callable function, as providers expect it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MultiSearchArgs {
    terms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SingleSearchArgs {
    term: String,
}

/// Search tool bound to a term source and a tool shape.
#[derive(Clone)]
pub struct SearchTool {
    source: Arc<dyn TermSource>,
    signature: ToolSignature,
    max_terms: usize,
}

impl std::fmt::Debug for SearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchTool")
            .field("signature", &self.signature)
            .field("max_terms", &self.max_terms)
            .finish_non_exhaustive()
    }
}

impl SearchTool {
    pub fn new(source: Arc<dyn TermSource>, signature: ToolSignature, max_terms: usize) -> Self {
        Self {
            source,
            signature,
            max_terms,
        }
    }

    pub fn signature(&self) -> ToolSignature {
        self.signature
    }

    pub fn max_terms(&self) -> usize {
        self.max_terms
    }

    /// Function name the model must use.
    pub fn name(&self) -> &'static str {
        match self.signature {
            ToolSignature::Batch => MULTI_SEARCH_TOOL,
            ToolSignature::Single => SINGLE_SEARCH_TOOL,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self.signature {
            ToolSignature::Batch => ToolDefinition {
                name: MULTI_SEARCH_TOOL,
                description: format!(
                    "Semantic search over social-media video transcripts. Accepts up to {} \
                     different natural-language phrases, each covering a different angle of \
                     the question. Returns unique {{id, text}} posts.",
                    self.max_terms
                ),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "terms": {
                            "type": "array",
                            "items": { "type": "string" },
                            "minItems": 1,
                            "maxItems": self.max_terms,
                            "description": "Meaning-rich phrases worded the way creators might talk."
                        }
                    },
                    "required": ["terms"],
                    "additionalProperties": false
                }),
            },
            ToolSignature::Single => ToolDefinition {
                name: SINGLE_SEARCH_TOOL,
                description: "Semantic search over social-media video transcripts for one \
                              natural-language phrase. Returns unique {id, text} posts."
                    .to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "term": {
                            "type": "string",
                            "description": "A meaning-rich phrase worded the way creators might talk."
                        }
                    },
                    "required": ["term"],
                    "additionalProperties": false
                }),
            },
        }
    }

    /// Search the given phrases (capped at `max_terms`) and merge the hits.
    pub async fn run<S: AsRef<str>>(&self, terms: &[S]) -> Vec<SearchResult> {
        search(self.source.as_ref(), terms, self.max_terms).await
    }

    /// Execute a tool call from the model and return the JSON result text.
    ///
    /// Unknown names and malformed arguments are errors; the caller decides
    /// how to report them back to the model.
    #[instrument(skip(self, arguments), fields(signature = %self.signature))]
    pub async fn invoke(&self, name: &str, arguments: &str) -> Result<String> {
        if name != self.name() {
            return Err(TrendChatError::parse(format!(
                "unknown tool '{name}', expected '{}'",
                self.name()
            )));
        }

        let terms = self.parse_arguments(arguments)?;
        let results = self.run(terms.as_slice()).await;
        info!(terms = terms.len(), results = results.len(), "tool call served");

        serde_json::to_string(&results)
            .map_err(|e| TrendChatError::parse(format!("failed to encode tool result: {e}")))
    }

    fn parse_arguments(&self, arguments: &str) -> Result<Vec<String>> {
        let arguments = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };

        match self.signature {
            ToolSignature::Batch => {
                let args: MultiSearchArgs = serde_json::from_str(arguments).map_err(|e| {
                    TrendChatError::parse(format!("invalid {MULTI_SEARCH_TOOL} arguments: {e}"))
                })?;
                Ok(args.terms)
            }
            ToolSignature::Single => {
                let args: SingleSearchArgs = serde_json::from_str(arguments).map_err(|e| {
                    TrendChatError::parse(format!("invalid {SINGLE_SEARCH_TOOL} arguments: {e}"))
                })?;
                Ok(vec![args.term])
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory term source that records every phrase it is asked for.
    #[derive(Default)]
    pub(crate) struct StubSource {
        pub hits: HashMap<String, Vec<SearchResult>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubSource {
        pub(crate) fn with(mut self, term: &str, hits: Vec<SearchResult>) -> Self {
            self.hits.insert(term.to_string(), hits);
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl TermSource for StubSource {
        async fn fetch_term(&self, term: &str) -> Result<Vec<SearchResult>> {
            self.calls.lock().expect("calls lock").push(term.to_string());
            match self.hits.get(term) {
                Some(hits) => Ok(hits.clone()),
                None => Err(TrendChatError::network(format!("no stub for '{term}'"))),
            }
        }
    }

    fn stub() -> Arc<StubSource> {
        Arc::new(
            StubSource::default()
                .with("upcycled denim", vec![SearchResult::new("a", "denim jackets")])
                .with(
                    "thrift flips",
                    vec![SearchResult::new("a", "again"), SearchResult::new("b", "flips")],
                ),
        )
    }

    #[test]
    fn definitions_match_signature() {
        let batch = SearchTool::new(stub(), ToolSignature::Batch, 3);
        let def = batch.definition();
        assert_eq!(def.name, "semantic_multi_search");
        assert_eq!(def.parameters["properties"]["terms"]["maxItems"], 3);

        let single = SearchTool::new(stub(), ToolSignature::Single, 3);
        let def = single.definition();
        assert_eq!(def.name, "semantic_search");
        assert_eq!(def.parameters["required"][0], "term");
    }

    #[tokio::test]
    async fn batch_invoke_merges_and_dedupes() {
        let source = stub();
        let tool = SearchTool::new(source.clone(), ToolSignature::Batch, 3);

        let out = tool
            .invoke(
                MULTI_SEARCH_TOOL,
                r#"{"terms": ["upcycled denim", "thrift flips"]}"#,
            )
            .await
            .unwrap();

        let parsed: Vec<SearchResult> = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed,
            vec![SearchResult::new("a", "denim jackets"), SearchResult::new("b", "flips")]
        );
        assert_eq!(source.calls(), ["upcycled denim", "thrift flips"]);
    }

    #[tokio::test]
    async fn batch_invoke_caps_terms() {
        let source = stub();
        let tool = SearchTool::new(source.clone(), ToolSignature::Batch, 3);

        tool.invoke(
            MULTI_SEARCH_TOOL,
            r#"{"terms": ["upcycled denim", "x", "y", "thrift flips"]}"#,
        )
        .await
        .unwrap();

        assert_eq!(source.calls(), ["upcycled denim", "x", "y"]);
    }

    #[tokio::test]
    async fn single_invoke_uses_one_term() {
        let source = stub();
        let tool = SearchTool::new(source.clone(), ToolSignature::Single, 3);

        let out = tool
            .invoke(SINGLE_SEARCH_TOOL, r#"{"term": "thrift flips"}"#)
            .await
            .unwrap();

        let parsed: Vec<SearchResult> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(source.calls(), ["thrift flips"]);
    }

    #[tokio::test]
    async fn failing_terms_yield_empty_array() {
        let tool = SearchTool::new(stub(), ToolSignature::Batch, 3);
        let out = tool
            .invoke(MULTI_SEARCH_TOOL, r#"{"terms": ["nothing here"]}"#)
            .await
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[tokio::test]
    async fn rejects_wrong_name_and_bad_arguments() {
        let tool = SearchTool::new(stub(), ToolSignature::Batch, 3);

        let err = tool.invoke("web_search", "{}").await.unwrap_err();
        assert!(err.to_string().contains("unknown tool"));

        let err = tool
            .invoke(MULTI_SEARCH_TOOL, r#"{"term": "wrong shape"}"#)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid semantic_multi_search arguments"));

        assert!(tool.invoke(MULTI_SEARCH_TOOL, "").await.is_err());
    }
}
