use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::render::escape_html;

/// ========================================
/// Editorial data model
/// ========================================

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Copyedit,
    Standard,
    Snark,
    Seo,
    Roundup,
    Headlines,
    Factcheck,
    Synthesize,
    Wikipedia,
}

impl Mode {
    pub const ALL: [Mode; 9] = [
        Mode::Copyedit,
        Mode::Standard,
        Mode::Snark,
        Mode::Seo,
        Mode::Roundup,
        Mode::Headlines,
        Mode::Factcheck,
        Mode::Synthesize,
        Mode::Wikipedia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Copyedit => "copyedit",
            Mode::Standard => "standard",
            Mode::Snark => "snark",
            Mode::Seo => "seo",
            Mode::Roundup => "roundup",
            Mode::Headlines => "headlines",
            Mode::Factcheck => "factcheck",
            Mode::Synthesize => "synthesize",
            Mode::Wikipedia => "wikipedia",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Copyedit => "Copy Edit",
            Mode::Standard => "Standard",
            Mode::Snark => "Snark",
            Mode::Seo => "SEO",
            Mode::Roundup => "Newsletter",
            Mode::Headlines => "Headlines",
            Mode::Factcheck => "Fact Check",
            Mode::Synthesize => "Synthesis",
            Mode::Wikipedia => "Wikipedia",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EditStrength {
    Light,
    #[default]
    Medium,
    Heavy,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    Haiku,
    Sonnet,
    #[default]
    Opus,
}

impl ModelVariant {
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelVariant::Haiku => "claude-3-5-haiku-latest",
            ModelVariant::Sonnet => "claude-sonnet-4-20250514",
            ModelVariant::Opus => "claude-opus-4-20250514",
        }
    }
}

/// One pasted, dropped, or fetched piece of source material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: Uuid,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl SourceItem {
    pub fn empty() -> Self {
        Self { id: Uuid::new_v4(), text: String::new(), html: String::new(), url: None }
    }

    /// Plain text source; the rich form is escaped and keeps line breaks as `<br>`.
    pub fn from_text(text: impl Into<String>, url: Option<String>) -> Self {
        let text = text.into();
        let html = format!("<p>{}</p>", escape_html(&text).replace('\n', "<br>"));
        Self { id: Uuid::new_v4(), text, html, url }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub mode: Mode,
    #[serde(default)]
    pub edit_strength: EditStrength,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    pub sources: Vec<SourceItem>,
    #[serde(default)]
    pub model: ModelVariant,
}

/// ========================================
/// Structured output, one payload per mode
/// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyEdit {
    pub edited_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes_report_html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineSet {
    pub html: String,
    pub headlines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FactStatus {
    Verified,
    Unverified,
    Fabricated,
}

impl FactStatus {
    /// Accepts `VERIFIED`, `[Unverified]`, `FABRICATED - invented quote`, ...
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = raw
            .trim()
            .trim_start_matches(['[', '*'])
            .trim_start()
            .to_ascii_uppercase();
        if cleaned.starts_with("UNVERIFIED") {
            Some(FactStatus::Unverified)
        } else if cleaned.starts_with("VERIFIED") {
            Some(FactStatus::Verified)
        } else if cleaned.starts_with("FABRICATED") {
            Some(FactStatus::Fabricated)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FactStatus::Verified => "VERIFIED",
            FactStatus::Unverified => "UNVERIFIED",
            FactStatus::Fabricated => "FABRICATED",
        }
    }
}

impl fmt::Display for FactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckRecord {
    pub claim: String,
    pub status: FactStatus,
    pub source_quote: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckReport {
    pub html: String,
    pub records: Vec<FactCheckRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StructuredOutput {
    Copyedit(CopyEdit),
    Standard(Post),
    Snark(Post),
    Seo(Post),
    Roundup(Post),
    Headlines(HeadlineSet),
    Factcheck(FactCheckReport),
    Synthesize(Post),
    Wikipedia(Post),
}

impl StructuredOutput {
    pub fn mode(&self) -> Mode {
        match self {
            StructuredOutput::Copyedit(_) => Mode::Copyedit,
            StructuredOutput::Standard(_) => Mode::Standard,
            StructuredOutput::Snark(_) => Mode::Snark,
            StructuredOutput::Seo(_) => Mode::Seo,
            StructuredOutput::Roundup(_) => Mode::Roundup,
            StructuredOutput::Headlines(_) => Mode::Headlines,
            StructuredOutput::Factcheck(_) => Mode::Factcheck,
            StructuredOutput::Synthesize(_) => Mode::Synthesize,
            StructuredOutput::Wikipedia(_) => Mode::Wikipedia,
        }
    }

    /// Wraps normalized HTML in the post-shaped variant for `mode`.
    /// Only valid for modes whose payload is a plain `Post`.
    pub fn post(mode: Mode, html: String) -> Option<Self> {
        let post = Post { html };
        match mode {
            Mode::Standard => Some(StructuredOutput::Standard(post)),
            Mode::Snark => Some(StructuredOutput::Snark(post)),
            Mode::Seo => Some(StructuredOutput::Seo(post)),
            Mode::Roundup => Some(StructuredOutput::Roundup(post)),
            Mode::Synthesize => Some(StructuredOutput::Synthesize(post)),
            Mode::Wikipedia => Some(StructuredOutput::Wikipedia(post)),
            Mode::Copyedit | Mode::Headlines | Mode::Factcheck => None,
        }
    }

    /// The editable HTML body, whatever the mode.
    pub fn html(&self) -> &str {
        match self {
            StructuredOutput::Copyedit(c) => &c.edited_html,
            StructuredOutput::Headlines(h) => &h.html,
            StructuredOutput::Factcheck(f) => &f.html,
            StructuredOutput::Standard(p)
            | StructuredOutput::Snark(p)
            | StructuredOutput::Seo(p)
            | StructuredOutput::Roundup(p)
            | StructuredOutput::Synthesize(p)
            | StructuredOutput::Wikipedia(p) => &p.html,
        }
    }

    pub fn html_mut(&mut self) -> &mut String {
        match self {
            StructuredOutput::Copyedit(c) => &mut c.edited_html,
            StructuredOutput::Headlines(h) => &mut h.html,
            StructuredOutput::Factcheck(f) => &mut f.html,
            StructuredOutput::Standard(p)
            | StructuredOutput::Snark(p)
            | StructuredOutput::Seo(p)
            | StructuredOutput::Roundup(p)
            | StructuredOutput::Synthesize(p)
            | StructuredOutput::Wikipedia(p) => &mut p.html,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub raw_text: String,
    pub output: StructuredOutput,
    /// Segments the classifier could not parse and skipped.
    #[serde(default)]
    pub dropped_segments: usize,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn mode(&self) -> Mode {
        self.output.mode()
    }

    pub fn html(&self) -> &str {
        self.output.html()
    }

    pub fn is_partial(&self) -> bool {
        self.dropped_segments > 0
    }
}

/// ========================================
/// Model completion wire protocol
/// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Short name of the flow that issued the call, used in logs and artifacts.
    pub label: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub web_search: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text { text: String },
    ToolResult { tool: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CompletionResponse {
    pub segments: Vec<Segment>,
}

impl CompletionResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { segments: vec![Segment::Text { text: text.into() }] }
    }

    /// All text segments in order, one per line; tool results are skipped.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text { text } if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_source_escapes_its_rich_form() {
        let item = SourceItem::from_text("Fish & chips <cheap>\nsecond line", None);
        assert_eq!(item.html, "<p>Fish &amp; chips &lt;cheap&gt;<br>second line</p>");
        assert_eq!(item.text, "Fish & chips <cheap>\nsecond line");
    }

    #[test]
    fn fact_status_accepts_bracketed_and_annotated_values() {
        assert_eq!(FactStatus::parse("[VERIFIED]"), Some(FactStatus::Verified));
        assert_eq!(FactStatus::parse("Unverified"), Some(FactStatus::Unverified));
        assert_eq!(
            FactStatus::parse("FABRICATED - quote not in source"),
            Some(FactStatus::Fabricated)
        );
        assert_eq!(FactStatus::parse("maybe"), None);
    }

    #[test]
    fn response_text_skips_tool_results() {
        let resp = CompletionResponse {
            segments: vec![
                Segment::Text { text: "first".into() },
                Segment::ToolResult { tool: "web_search".into() },
                Segment::Text { text: "second".into() },
            ],
        };
        assert_eq!(resp.text(), "first\nsecond");
    }

    #[test]
    fn structured_output_serializes_with_mode_tag() {
        let out = StructuredOutput::Snark(Post { html: "<p>x</p>".into() });
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["mode"], "snark");
        assert_eq!(json["html"], "<p>x</p>");
        let back: StructuredOutput = serde_json::from_value(json).unwrap();
        assert_eq!(back.mode(), Mode::Snark);
    }

    #[test]
    fn post_variant_only_for_post_shaped_modes() {
        assert!(StructuredOutput::post(Mode::Wikipedia, String::new()).is_some());
        assert!(StructuredOutput::post(Mode::Headlines, String::new()).is_none());
    }
}
