//! Operations that work on an existing result: SEO packaging, free-form revision,
//! fact-checking, plus pulling a dropped URL in as source material.

use chrono::Utc;

use crate::classify::{extract_headlines, fact_check_report, parse_fact_checks};
use crate::errors::{DeskError, Result};
use crate::prompt;
use crate::provider::{complete_text, Provider};
use crate::render::{to_html, to_seo_html};
use crate::wire::{
    CompletionRequest, CopyEdit, EditStrength, FactCheckReport, FactCheckRecord, GenerationResult,
    HeadlineSet, Mode, ModelVariant, Post, SourceItem, StructuredOutput,
};

pub mod similarity;

pub use similarity::score_similarity;

/// Model and output ceiling shared by every follow-up call.
#[derive(Debug, Clone, Copy)]
pub struct CallSettings {
    pub model: ModelVariant,
    pub max_tokens: u32,
}

fn completion(label: &str, settings: CallSettings, prompt: String, web_search: bool) -> CompletionRequest {
    CompletionRequest {
        label: label.to_string(),
        model: settings.model.model_id().to_string(),
        system: None,
        prompt,
        max_tokens: settings.max_tokens,
        web_search,
    }
}

fn result(raw_text: String, output: StructuredOutput, dropped_segments: usize) -> GenerationResult {
    GenerationResult { raw_text, output, dropped_segments, created_at: Utc::now() }
}

/// Turns the current output into a full SEO package. The result is always in SEO mode.
pub async fn enrich_seo(
    provider: &dyn Provider,
    settings: CallSettings,
    current_html: &str,
) -> Result<GenerationResult> {
    if current_html.trim().is_empty() {
        return Err(DeskError::EmptyContent("generate SEO for".into()));
    }
    let prompt = format!(
        "{}\n\n{}",
        prompt::build_mode_prompt(Mode::Seo, EditStrength::default()),
        current_html
    );
    let raw = complete_text(provider, &completion("seo", settings, prompt, false)).await?;
    let html = to_seo_html(&raw);
    Ok(result(raw, StructuredOutput::Seo(Post { html }), 0))
}

/// Re-shapes revised text into the same variant as the output it replaces.
fn rewrap(mode: Mode, html: String, raw: &str) -> (StructuredOutput, usize) {
    match mode {
        Mode::Copyedit => (
            StructuredOutput::Copyedit(CopyEdit { edited_html: html, changes_report_html: None }),
            0,
        ),
        Mode::Headlines => {
            let (headlines, _) = extract_headlines(raw);
            (StructuredOutput::Headlines(HeadlineSet { html, headlines }), 0)
        }
        Mode::Factcheck => {
            let (records, dropped) = parse_fact_checks(raw);
            (StructuredOutput::Factcheck(FactCheckReport { html, records }), dropped)
        }
        Mode::Standard => (StructuredOutput::Standard(Post { html }), 0),
        Mode::Snark => (StructuredOutput::Snark(Post { html }), 0),
        Mode::Seo => (StructuredOutput::Seo(Post { html }), 0),
        Mode::Roundup => (StructuredOutput::Roundup(Post { html }), 0),
        Mode::Synthesize => (StructuredOutput::Synthesize(Post { html }), 0),
        Mode::Wikipedia => (StructuredOutput::Wikipedia(Post { html }), 0),
    }
}

/// Applies free-form revision instructions to the current output, keeping its mode.
pub async fn revise(
    provider: &dyn Provider,
    settings: CallSettings,
    current: &StructuredOutput,
    instructions: &str,
) -> Result<GenerationResult> {
    if current.html().trim().is_empty() || instructions.trim().is_empty() {
        return Err(DeskError::MissingInstruction(format!(
            "output {} chars, instructions {} chars",
            current.html().trim().len(),
            instructions.trim().len()
        )));
    }
    let prompt = prompt::revision_prompt(instructions, current.html());
    let raw = complete_text(provider, &completion("revise", settings, prompt, false)).await?;
    let (output, dropped) = rewrap(current.mode(), to_html(&raw), &raw);
    Ok(result(raw, output, dropped))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactCheckOutcome {
    pub report: FactCheckReport,
    pub dropped_segments: usize,
}

impl FactCheckOutcome {
    pub fn records(&self) -> &[FactCheckRecord] {
        &self.report.records
    }
}

/// Checks the output against the source with live search always on.
pub async fn fact_check(
    provider: &dyn Provider,
    settings: CallSettings,
    output_html: &str,
    source_text: &str,
) -> Result<FactCheckOutcome> {
    if output_html.trim().is_empty() {
        return Err(DeskError::EmptyContent("fact-check".into()));
    }
    let prompt = prompt::fact_check_prompt(output_html, source_text);
    let raw = complete_text(provider, &completion("factcheck", settings, prompt, true)).await?;
    let (report, dropped_segments) = fact_check_report(&raw);
    tracing::info!(claims = report.records.len(), dropped = dropped_segments, "fact-check parsed");
    Ok(FactCheckOutcome { report, dropped_segments })
}

/// Asks the model to fetch a URL and return only its article text. `settings`
/// should carry the lightweight output ceiling.
pub async fn extract_article(
    provider: &dyn Provider,
    settings: CallSettings,
    url: &str,
) -> Result<SourceItem> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(DeskError::EmptySource(format!("not a web address: {url:?}")));
    }
    let prompt = prompt::extract_article_prompt(url);
    let text = complete_text(provider, &completion("extract", settings, prompt, true)).await?;
    let html = format!("<p>{}</p>", text.replace("\n\n", "</p><p>"));
    Ok(SourceItem { html, ..SourceItem::from_text(text, Some(url.to_string())) })
}
