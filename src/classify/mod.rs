//! Mode-specific post-processing of raw model text.
//!
//! Nothing in here fails. Segments that don't match their expected shape are
//! skipped and counted in `Classified::dropped_segments`, so a sloppy response
//! still produces whatever structure could be recovered.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::prompt::CHANGES_SEPARATOR;
use crate::render::{escape_html, inline_format, to_html};
use crate::wire::{
    CopyEdit, FactCheckRecord, FactCheckReport, FactStatus, HeadlineSet, Mode, Post,
    StructuredOutput,
};

static NUMBERED_HEADLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\.[ \t]+(.+?)\s*$").expect("static pattern compiles"));
static CLAIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CLAIM:\**[ \t]*(.+)").expect("static pattern compiles"));
static STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"STATUS:\**[ \t]*(.+)").expect("static pattern compiles"));
static SOURCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"SOURCE:\**[ \t]*(.+)").expect("static pattern compiles"));

const FINDING_SEPARATOR: &str = "---";

#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub output: StructuredOutput,
    pub dropped_segments: usize,
}

impl Classified {
    fn complete(output: StructuredOutput) -> Self {
        Self { output, dropped_segments: 0 }
    }
}

pub fn classify(mode: Mode, raw: &str) -> Classified {
    let post = || Post { html: to_html(raw) };
    match mode {
        Mode::Headlines => headlines(raw),
        Mode::Copyedit => copyedit(raw),
        Mode::Factcheck => {
            let (report, dropped) = fact_check_report(raw);
            Classified { output: StructuredOutput::Factcheck(report), dropped_segments: dropped }
        }
        Mode::Standard => Classified::complete(StructuredOutput::Standard(post())),
        Mode::Snark => Classified::complete(StructuredOutput::Snark(post())),
        Mode::Seo => Classified::complete(StructuredOutput::Seo(post())),
        Mode::Roundup => Classified::complete(StructuredOutput::Roundup(post())),
        Mode::Synthesize => Classified::complete(StructuredOutput::Synthesize(post())),
        Mode::Wikipedia => Classified::complete(StructuredOutput::Wikipedia(post())),
    }
}

/// Numbered lines (`1. text`) in order, plus how many other non-blank lines were skipped.
pub fn extract_headlines(raw: &str) -> (Vec<String>, usize) {
    let mut found = Vec::new();
    let mut skipped = 0;
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        match NUMBERED_HEADLINE.captures(line) {
            Some(caps) => found.push(caps[1].to_string()),
            None => skipped += 1,
        }
    }
    (found, skipped)
}

fn headlines(raw: &str) -> Classified {
    let (list, skipped) = extract_headlines(raw);
    Classified {
        output: StructuredOutput::Headlines(HeadlineSet { html: to_html(raw), headlines: list }),
        dropped_segments: skipped,
    }
}

fn copyedit(raw: &str) -> Classified {
    let mut parts = raw.split(CHANGES_SEPARATOR);
    let edited = parts.next().unwrap_or_default().trim().to_string();
    let report = parts
        .next()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(render_changes_report);
    Classified {
        output: StructuredOutput::Copyedit(CopyEdit { edited_html: edited, changes_report_html: report }),
        dropped_segments: parts.count(),
    }
}

fn bullet_body(line: &str) -> Option<&str> {
    let mut chars = line.chars();
    let marker = chars.next()?;
    if !matches!(marker, '-' | '•' | '*') {
        return None;
    }
    let rest = chars.as_str();
    // `**Heading**` is emphasis, not a bullet
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Bulleted lines become list items, everything else a paragraph, all inside one list.
pub fn render_changes_report(report: &str) -> String {
    let body: String = report
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| match bullet_body(line) {
            Some(item) => format!("<li>{}</li>", inline_format(item)),
            None => format!("<p>{}</p>", inline_format(line)),
        })
        .collect();
    format!("<ul>{body}</ul>")
}

/// Splits a fact-check response into findings. A finding needs both a CLAIM and
/// a recognisable STATUS; anything else non-blank is counted as dropped.
pub fn parse_fact_checks(raw: &str) -> (Vec<FactCheckRecord>, usize) {
    let mut records = Vec::new();
    let mut dropped = 0;
    for segment in raw.split(FINDING_SEPARATOR) {
        if segment.trim().is_empty() {
            continue;
        }
        let claim = CLAIM.captures(segment).map(|c| c[1].trim().to_string());
        let status = STATUS
            .captures(segment)
            .and_then(|c| FactStatus::parse(&c[1]));
        match (claim, status) {
            (Some(claim), Some(status)) => {
                let source_quote = SOURCE
                    .captures(segment)
                    .map(|c| c[1].trim().to_string())
                    .unwrap_or_default();
                records.push(FactCheckRecord { claim, status, source_quote });
            }
            _ => dropped += 1,
        }
    }
    (records, dropped)
}

pub fn render_fact_checks(records: &[FactCheckRecord]) -> String {
    if records.is_empty() {
        return "<p>No checkable claims found.</p>".to_string();
    }
    let items: String = records
        .iter()
        .map(|r| {
            format!(
                "<li><strong>{}</strong>: {}<br><em>{}</em></li>",
                r.status,
                escape_html(&r.claim),
                escape_html(&r.source_quote)
            )
        })
        .collect();
    format!("<ul>{items}</ul>")
}

pub fn fact_check_report(raw: &str) -> (FactCheckReport, usize) {
    let (records, dropped) = parse_fact_checks(raw);
    let html = render_fact_checks(&records);
    (FactCheckReport { html, records }, dropped)
}
