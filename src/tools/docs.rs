//! Reference-documentation search over one fixed URL.
//!
//! The page is fetched and split into passages on first use; later queries
//! rank the cached passages by term overlap.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use url::Url;

use super::text::extract_text_from_html;
use super::{Tool, ToolError};

const PASSAGE_WORDS: usize = 120;
const PASSAGE_OVERLAP: usize = 30;
const TOP_PASSAGES: usize = 3;

/// A passage of the indexed page plus its lowercase terms.
struct Passage {
    text: String,
    terms: HashSet<String>,
}

/// Search a documentation site bound at construction.
pub struct DocsSearchTool {
    url: Url,
    description: String,
    client: reqwest::Client,
    index: OnceCell<Vec<Passage>>,
    token_re: Regex,
}

impl DocsSearchTool {
    /// # Errors
    ///
    /// Returns `ToolError::InvalidArguments` if `url` is not an absolute http(s) URL.
    pub fn new(url: &str) -> Result<Self, ToolError> {
        let parsed = Url::parse(url)
            .map_err(|e| ToolError::InvalidArguments(format!("invalid corpus URL {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ToolError::InvalidArguments(format!(
                "corpus URL must be http(s): {}",
                url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; docforge/0.1)")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::CorpusUnavailable {
                url: url.to_string(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        let token_re = Regex::new(r"[A-Za-z0-9_]+").map_err(|e| {
            ToolError::InvalidArguments(format!("token pattern failed to compile: {}", e))
        })?;

        Ok(Self {
            description: format!(
                "Search the reference documentation at {} and return the most relevant excerpts.",
                parsed
            ),
            url: parsed,
            client,
            index: OnceCell::new(),
            token_re,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn unavailable(&self, reason: impl Into<String>) -> ToolError {
        ToolError::CorpusUnavailable {
            url: self.url.to_string(),
            reason: reason.into(),
        }
    }

    async fn fetch_passages(&self) -> Result<Vec<Passage>, ToolError> {
        tracing::info!("Indexing documentation corpus {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("HTTP error: {}", status)));
        }

        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.contains("text/html"))
            .unwrap_or(false);

        let body = response
            .text()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let text = if is_html {
            extract_text_from_html(&body)
        } else {
            body
        };

        let passages = self.split_passages(&text);
        tracing::debug!("Indexed {} passages from {}", passages.len(), self.url);
        Ok(passages)
    }

    fn split_passages(&self, text: &str) -> Vec<Passage> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let step = PASSAGE_WORDS - PASSAGE_OVERLAP;
        let mut passages = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + PASSAGE_WORDS).min(words.len());
            let text = words[start..end].join(" ");
            passages.push(Passage {
                terms: self.terms(&text),
                text,
            });
            if end == words.len() {
                break;
            }
            start += step;
        }

        passages
    }

    fn terms(&self, text: &str) -> HashSet<String> {
        self.token_re
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .filter(|t| t.len() > 1)
            .collect()
    }

    /// Rank cached passages against `query`; empty when nothing matches.
    fn rank(&self, passages: &[Passage], query: &str) -> Vec<String> {
        let query_terms = self.terms(query);
        let mut scored: Vec<(usize, usize)> = passages
            .iter()
            .enumerate()
            .map(|(idx, p)| (idx, query_terms.intersection(&p.terms).count()))
            .filter(|(_, score)| *score > 0)
            .collect();

        // Highest score first, earlier passages win ties.
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(TOP_PASSAGES)
            .map(|(idx, _)| passages[idx].text.clone())
            .collect()
    }
}

#[async_trait]
impl Tool for DocsSearchTool {
    fn name(&self) -> &str {
        "search_docs"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for in the documentation"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let query = args["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".to_string()))?;

        // A failed fetch leaves the cell empty so the next call retries.
        let passages = self
            .index
            .get_or_try_init(|| self.fetch_passages())
            .await?;

        Ok(self
            .rank(passages, query)
            .join("\n\n---\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_locators() {
        assert!(matches!(
            DocsSearchTool::new("ftp://docs.example.com"),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            DocsSearchTool::new("not a url"),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn ranks_passages_by_term_overlap() {
        let tool = DocsSearchTool::new("https://docs.example.com/").unwrap();
        let passages: Vec<Passage> = ["quad integrates a function", "minimize finds a minimum of a scalar function", "unrelated text"]
            .iter()
            .map(|t| Passage {
                text: t.to_string(),
                terms: tool.terms(t),
            })
            .collect();

        let hits = tool.rank(&passages, "minimize scalar function");
        assert_eq!(hits[0], "minimize finds a minimum of a scalar function");
        assert_eq!(hits.len(), 2);
        assert!(tool.rank(&passages, "websocket").is_empty());
    }

    #[test]
    fn long_text_is_split_with_overlap() {
        let tool = DocsSearchTool::new("https://docs.example.com/").unwrap();
        let text = (0..250).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let passages = tool.split_passages(&text);

        assert_eq!(passages.len(), 3);
        assert!(passages[0].text.starts_with("w0 "));
        assert!(passages[1].text.starts_with("w90 "));
        assert!(passages[2].text.ends_with("w249"));
    }

    #[tokio::test]
    async fn missing_query_is_invalid() {
        let tool = DocsSearchTool::new("https://docs.example.com/").unwrap();
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn unreachable_corpus_is_unavailable() {
        let tool = DocsSearchTool::new("http://127.0.0.1:1/docs").unwrap();
        let err = tool.execute(json!({"query": "path parameters"})).await.unwrap_err();
        assert!(matches!(err, ToolError::CorpusUnavailable { .. }));
    }
}
