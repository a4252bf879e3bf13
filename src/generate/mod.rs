//! Prompt composition and the generate call.
//!
//! Composition is pure so the exact prompt sent for a request can be inspected;
//! `generate` adds the model round-trip and hands the text to the classifier.

use chrono::Utc;

use crate::classify::classify;
use crate::errors::{DeskError, Result};
use crate::prompt;
use crate::provider::{complete_text, Provider};
use crate::wire::{CompletionRequest, GenerationRequest, GenerationResult, Mode, SourceItem};

pub mod flight;

pub use flight::{FlightGuard, FlightState, FlightTicket};

const SOURCE_DELIMITER: &str = "\n\n---\n\n";
const SEARCH_TRIGGERS: [&str; 4] = ["search", "web", "find", "verify"];

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    pub mode: Mode,
    pub prompt: String,
    pub web_search: bool,
}

/// Several sources always synthesize, whatever mode was picked.
pub fn effective_mode(requested: Mode, sources: &[SourceItem]) -> Mode {
    if sources.len() > 1 {
        Mode::Synthesize
    } else {
        requested
    }
}

/// The material appended to the prompt. Copy-edit of a single source works on its
/// rich form so formatting survives the round-trip.
pub fn effective_source(requested: Mode, sources: &[SourceItem]) -> String {
    match sources {
        [] => String::new(),
        [only] if requested == Mode::Copyedit && !only.html.trim().is_empty() => only.html.clone(),
        [only] => only.text.clone(),
        many => many
            .iter()
            .enumerate()
            .map(|(i, s)| match &s.url {
                Some(url) => format!("SOURCE {} ({url}):\n{}", i + 1, s.text),
                None => format!("SOURCE {}:\n{}", i + 1, s.text),
            })
            .collect::<Vec<_>>()
            .join(SOURCE_DELIMITER),
    }
}

/// Plain-text view of all sources, used by fact-checking and similarity scoring.
pub fn plain_source(sources: &[SourceItem]) -> String {
    effective_source(Mode::Standard, sources)
}

pub fn source_urls(sources: &[SourceItem]) -> Vec<&str> {
    sources
        .iter()
        .filter_map(|s| s.url.as_deref())
        .filter(|u| !u.trim().is_empty())
        .collect()
}

pub fn needs_web_search(custom_instructions: Option<&str>, mode: Mode) -> bool {
    if mode == Mode::Snark {
        return true;
    }
    let lowered = custom_instructions.unwrap_or_default().to_lowercase();
    SEARCH_TRIGGERS.iter().any(|t| lowered.contains(t))
}

pub fn compose(req: &GenerationRequest) -> Result<ComposedPrompt> {
    if !req.sources.iter().any(SourceItem::has_text) {
        return Err(DeskError::EmptySource(format!(
            "{} source item(s), none with text",
            req.sources.len()
        )));
    }

    let mode = effective_mode(req.mode, &req.sources);
    let source = effective_source(req.mode, &req.sources);
    let urls = source_urls(&req.sources);
    let custom = req
        .custom_instructions
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let mut full = String::from(prompt::universal_preamble());
    if let Some(instructions) = custom {
        full.push_str(&prompt::override_block(instructions));
    }

    full.push_str(&prompt::build_mode_prompt(mode, req.edit_strength));
    full.push_str("\n\n");
    full.push_str(&source);
    if mode != Mode::Copyedit && !urls.is_empty() {
        full.push_str("\n\nSOURCE URL(S): ");
        full.push_str(&urls.join(", "));
    }

    Ok(ComposedPrompt { mode, prompt: full, web_search: needs_web_search(custom, mode) })
}

/// Builds the prompt, makes one completion call and classifies the reply under the
/// effective mode. Nothing is sent when the sources are blank.
pub async fn generate(
    provider: &dyn Provider,
    req: &GenerationRequest,
    max_tokens: u32,
) -> Result<GenerationResult> {
    let composed = compose(req)?;
    tracing::info!(
        requested = %req.mode,
        effective = %composed.mode,
        sources = req.sources.len(),
        web_search = composed.web_search,
        "generating"
    );

    let completion = CompletionRequest {
        label: format!("generate-{}", composed.mode),
        model: req.model.model_id().to_string(),
        system: None,
        prompt: composed.prompt,
        max_tokens,
        web_search: composed.web_search,
    };
    let raw_text = complete_text(provider, &completion).await?;

    let classified = classify(composed.mode, &raw_text);
    if classified.dropped_segments > 0 {
        tracing::warn!(
            mode = %composed.mode,
            dropped = classified.dropped_segments,
            "model reply only partly matched the expected shape"
        );
    }
    Ok(GenerationResult {
        raw_text,
        output: classified.output,
        dropped_segments: classified.dropped_segments,
        created_at: Utc::now(),
    })
}
