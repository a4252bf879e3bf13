use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::{DeskError, Result};
use crate::wire::{CompletionRequest, CompletionResponse};

pub mod anthropic;

/// The model completion capability. One request in, ordered content segments out.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse>;
}

pub type DynProvider = Arc<dyn Provider>;

pub fn make_provider(cfg: &Config) -> Result<DynProvider> {
    let key = cfg.api_key()?.to_string();
    Ok(Arc::new(anthropic::Anthropic::new(cfg, key)?))
}

/// Completes and joins the text segments; a response with no text at all is malformed.
pub async fn complete_text(provider: &dyn Provider, req: &CompletionRequest) -> Result<String> {
    let text = provider.complete(req).await?.text();
    if text.trim().is_empty() {
        return Err(DeskError::MalformedResponse(format!("{}: no text segments", req.label)));
    }
    Ok(text)
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;
    use crate::wire::Segment;

    fn req() -> CompletionRequest {
        CompletionRequest {
            label: "generate".into(),
            model: "m".into(),
            system: None,
            prompt: "p".into(),
            max_tokens: 10,
            web_search: false,
        }
    }

    #[tokio::test]
    async fn complete_text_rejects_tool_only_responses() {
        let p = ScriptedProvider::new();
        p.push_response(CompletionResponse {
            segments: vec![Segment::ToolResult { tool: "web_search".into() }],
        });
        let err = complete_text(&p, &req()).await.unwrap_err();
        assert!(matches!(err, DeskError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn scripted_failures_surface_as_transport_errors() {
        let p = ScriptedProvider::new();
        p.push_failure("API error: 500");
        let err = complete_text(&p, &req()).await.unwrap_err();
        assert!(matches!(err, DeskError::Transport(ref m) if m == "API error: 500"));
        assert_eq!(p.calls(), 1);
    }

    #[test]
    fn make_provider_needs_a_key() {
        let err = make_provider(&Config::default()).err().unwrap();
        assert!(matches!(err, DeskError::Config(_)));
    }
}
