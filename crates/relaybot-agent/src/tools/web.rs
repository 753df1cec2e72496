//! Web tools — search (Brave API) and fetch (HTTP content extraction).

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::base::{optional_i64, require_string, Tool};

/// User-Agent header.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Max chars for fetched content.
const DEFAULT_MAX_CHARS: usize = 50_000;

/// Max search results.
const DEFAULT_MAX_RESULTS: usize = 5;

// ─────────────────────────────────────────────
// WebSearchTool (Brave API)
// ─────────────────────────────────────────────

/// Searches the web using the Brave Search API.
pub struct WebSearchTool {
    api_key: Option<String>,
    client: Client,
}

impl WebSearchTool {
    /// Create a new web search tool. Without a key, calls fail with a
    /// readable configuration error.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web using Brave Search API. Returns a numbered list of results \
         with titles, URLs, and descriptions."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "count": {
                    "type": "integer",
                    "description": "Number of results (1-10, default 5)",
                    "minimum": 1,
                    "maximum": 10
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let query = require_string(&params, "query")?;
        let count = optional_i64(&params, "count").unwrap_or(DEFAULT_MAX_RESULTS as i64) as usize;
        let count = count.clamp(1, 10);

        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No Brave API key configured (set tools.web.search.apiKey)"))?;

        debug!(query = %query, count = count, "searching web");

        let resp = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .header("X-Subscription-Token", &api_key)
            .query(&[("q", &query), ("count", &count.to_string())])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Brave API request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Brave API returned {status}: {body}");
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse Brave response: {e}"))?;

        let results = body["web"]["results"].as_array().cloned().unwrap_or_default();

        if results.is_empty() {
            return Ok("No results found.".into());
        }

        let mut output = Vec::new();
        for (i, r) in results.iter().enumerate() {
            let title = r["title"].as_str().unwrap_or("(no title)");
            let url = r["url"].as_str().unwrap_or("");
            let desc = r["description"].as_str().unwrap_or("");
            output.push(format!("{}. {}\n   {}\n   {}", i + 1, title, url, desc));
        }

        Ok(output.join("\n\n"))
    }
}

// ─────────────────────────────────────────────
// WebFetchTool
// ─────────────────────────────────────────────

/// Fetches and extracts content from a web page.
pub struct WebFetchTool {
    client: Client,
}

impl WebFetchTool {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .redirect(reqwest::redirect::Policy::limited(5))
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetch and extract the main text content from a web page URL. \
         Supports HTML (converted to text) and JSON."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                },
                "max_chars": {
                    "type": "integer",
                    "description": "Maximum characters to return (default 50000)",
                    "minimum": 100
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let url = require_string(&params, "url")?;
        let max_chars =
            optional_i64(&params, "max_chars").unwrap_or(DEFAULT_MAX_CHARS as i64) as usize;
        let max_chars = max_chars.max(100);

        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("Invalid URL: must start with http:// or https://");
        }

        debug!(url = %url, "fetching web page");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("HTTP request failed: {e}"))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = resp
            .text()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read response body: {e}"))?;

        let (text, extractor) = if content_type.contains("json") {
            match serde_json::from_str::<Value>(&body) {
                Ok(v) => (serde_json::to_string_pretty(&v).unwrap_or(body), "json"),
                Err(_) => (body, "raw"),
            }
        } else if content_type.contains("html") || body.trim_start().starts_with('<') {
            (strip_html_tags(&body), "text")
        } else {
            (body, "raw")
        };

        let (text, truncated) = truncate_chars(text, max_chars);

        let result = json!({
            "url": url,
            "finalUrl": final_url,
            "status": status,
            "extractor": extractor,
            "truncated": truncated,
            "length": text.chars().count(),
            "text": text,
        });

        Ok(serde_json::to_string_pretty(&result).unwrap_or_default())
    }
}

/// Cap a string at `max_chars` characters. Counts codepoints, never byte
/// offsets, so multibyte content cannot split mid-character.
fn truncate_chars(text: String, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text, false);
    }
    (text.chars().take(max_chars).collect(), true)
}

// ─────────────────────────────────────────────
// HTML helpers
// ─────────────────────────────────────────────

/// Remove HTML tags, scripts, and styles, then collapse whitespace.
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;
    let mut tag_name = String::new();
    let mut collecting_tag_name = false;

    for ch in html.chars() {
        if ch == '<' {
            in_tag = true;
            collecting_tag_name = true;
            tag_name.clear();
            continue;
        }
        if ch == '>' {
            in_tag = false;
            collecting_tag_name = false;
            let lower = tag_name.to_lowercase();
            match lower.as_str() {
                "script" => in_script = true,
                "/script" => in_script = false,
                "style" => in_style = true,
                "/style" => in_style = false,
                "br" | "br/" | "p" | "/p" | "div" | "/div" | "li" => result.push('\n'),
                _ => {}
            }
            continue;
        }
        if in_tag {
            if collecting_tag_name && (ch.is_alphanumeric() || ch == '/') {
                tag_name.push(ch);
            } else {
                collecting_tag_name = false;
            }
            continue;
        }
        if in_script || in_style {
            continue;
        }
        result.push(ch);
    }

    // Decode a few common entities
    let result = result
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    // Collapse runs of spaces and newlines
    let mut collapsed = String::with_capacity(result.len());
    let mut prev_space = false;
    let mut prev_newline = false;
    for ch in result.chars() {
        if ch == '\n' {
            if !prev_newline {
                collapsed.push('\n');
            }
            prev_newline = true;
            prev_space = false;
        } else if ch.is_whitespace() {
            if !prev_space && !prev_newline {
                collapsed.push(' ');
            }
            prev_space = true;
        } else {
            collapsed.push(ch);
            prev_space = false;
            prev_newline = false;
        }
    }

    collapsed.trim().to_string()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
