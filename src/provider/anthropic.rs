use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::Provider;
use crate::config::Config;
use crate::errors::{DeskError, Result};
use crate::wire::{CompletionRequest, CompletionResponse, Segment};

const WEB_SEARCH_TOOL: Tool = Tool { r#type: "web_search_20250305", name: "web_search" };

pub struct Anthropic {
    client: Client,
    api_key: String,
    api_base: String,
    api_version: String,
}

impl Anthropic {
    pub fn new(cfg: &Config, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            api_base: cfg.api_base.clone(),
            api_version: cfg.api_version.clone(),
        })
    }
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize, Clone, Copy)]
struct Tool {
    r#type: &'static str,
    name: &'static str,
}

#[derive(Deserialize)]
struct MsgResponse {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    r#type: String,
    #[serde(default)]
    text: String,
}

fn request_body(req: &CompletionRequest) -> MsgRequest<'_> {
    MsgRequest {
        model: &req.model,
        max_tokens: req.max_tokens,
        messages: vec![Msg { role: "user", content: &req.prompt }],
        system: req.system.as_deref(),
        tools: if req.web_search { vec![WEB_SEARCH_TOOL] } else { Vec::new() },
    }
}

/// Keeps block order; anything that isn't a text block is recorded as a tool segment.
fn parse_body(body: &str) -> Result<CompletionResponse> {
    let parsed: MsgResponse = serde_json::from_str(body)?;
    let segments = parsed
        .content
        .into_iter()
        .map(|b| match b.r#type.as_str() {
            "text" => Segment::Text { text: b.text },
            _ => Segment::ToolResult { tool: b.r#type },
        })
        .collect();
    Ok(CompletionResponse { segments })
}

#[async_trait]
impl Provider for Anthropic {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/v1/messages", self.api_base.trim_end_matches('/'));
        let started = Instant::now();
        tracing::debug!(label = %req.label, %url, "anthropic request");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&request_body(req))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            tracing::warn!(label = %req.label, %status, body = %text, "anthropic call failed");
            return Err(DeskError::Transport(format!("API error: {status}")));
        }

        let parsed = parse_body(&text)?;
        tracing::info!(
            label = %req.label,
            model = %req.model,
            prompt_chars = req.prompt.len(),
            web_search = req.web_search,
            segments = parsed.segments.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "completion finished"
        );
        Ok(parsed)
    }
}
