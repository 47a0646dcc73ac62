//! web_search tool - instant-answer web search

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::tools::{Tool, ToolContext, ToolResult};

const USER_AGENT: &str = concat!("termpilot/", env!("CARGO_PKG_VERSION"));

/// Infobox entries scanned for official websites
const MAX_INFOBOX_ITEMS: usize = 2;

/// Search the web for current information
pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the web for current information using the DuckDuckGo Instant Answer API."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"]
        })
    }

    fn input_from_argument(&self, argument: &str) -> Value {
        serde_json::json!({ "query": argument })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolResult {
        debug!(?input, "WebSearchTool::execute: called");
        let query = match input["query"].as_str().map(str::trim) {
            Some(q) if !q.is_empty() => q,
            _ => return ToolResult::error("query is required"),
        };
        search(query, &ctx.search).await
    }
}

async fn search(query: &str, config: &SearchConfig) -> ToolResult {
    let client = match reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(USER_AGENT)
        .build()
    {
        Ok(c) => c,
        Err(e) => return ToolResult::error(format!("Error searching for '{}': {}", query, e)),
    };

    let response = match client
        .get(&config.endpoint)
        .query(&[
            ("q", query),
            ("format", "json"),
            ("no_redirect", "1"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ])
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(%query, %e, "Search request failed");
            return ToolResult::error(format!("Error searching for '{}': Network error - {}", query, e));
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        warn!(%query, %status, "Search endpoint returned an error status");
        return ToolResult::error(format!("Error searching for '{}': Network error - HTTP {}", query, status));
    }

    // DuckDuckGo answers with a javascript content type, so parse the text
    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => return ToolResult::error(format!("Error searching for '{}': Network error - {}", query, e)),
    };
    let data: Value = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            debug!(%e, "search: response was not json");
            return ToolResult::error(format!("Error searching for '{}': Invalid response format", query));
        }
    };

    ToolResult::success(render_instant_answer(query, &data, config.max_related))
}

/// Render an instant-answer payload into plain text
pub fn render_instant_answer(query: &str, data: &Value, max_related: usize) -> String {
    let mut sections = Vec::new();

    if let Some(abstract_text) = non_empty(&data["Abstract"]) {
        sections.push(format!("Summary: {}", abstract_text));
        if let Some(url) = non_empty(&data["AbstractURL"]) {
            sections.push(format!("Source URL: {}", url));
        }
    }

    if let Some(definition) = non_empty(&data["Definition"]) {
        sections.push(format!("Definition: {}", definition));
    }

    if let Some(topics) = data["RelatedTopics"].as_array() {
        let texts: Vec<&str> = topics
            .iter()
            .take(max_related)
            .filter_map(|topic| non_empty(&topic["Text"]))
            .collect();
        if !texts.is_empty() {
            sections.push(format!("Related information: {}", texts.join("; ")));
        }
    }

    if let Some(answer) = non_empty(&data["Answer"]) {
        sections.push(format!("Direct answer: {}", answer));
    }

    if let Some(items) = data["Infobox"]["content"].as_array() {
        for item in items.iter().take(MAX_INFOBOX_ITEMS) {
            if item["data_type"].as_str() == Some("website")
                && let Some(url) = non_empty(&item["value"])
            {
                sections.push(format!("Official website: {}", url));
            }
        }
    }

    if !sections.is_empty() {
        return format!("Search results for '{}':\n{}", query, sections.join("\n\n"));
    }

    let lowered = query.to_lowercase();
    if lowered.contains("doc") {
        format!(
            "No specific results found for '{}'. For documentation searches, try:\n\
             - Searching directly on the official website\n\
             - Adding 'official' to your search query\n\
             - Checking the project's GitHub repository",
            query
        )
    } else {
        format!("No specific results found for '{}'. Try rephrasing your search query.", query)
    }
}

fn non_empty(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}
