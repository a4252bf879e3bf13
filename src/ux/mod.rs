use colored::Colorize;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::DeskError;
use crate::publish::{Post, SavedPost};
use crate::render::strip_tags;
use crate::scrape::{RiverLink, WikiLink};
use crate::session::SessionState;
use crate::wire::{FactCheckRecord, FactStatus, GenerationResult, SourceItem, StructuredOutput};

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</p>|</li>|</h\d>|<br\s*/?>").expect("static pattern compiles"));

/// HTML flattened for the terminal: one line per block, tags dropped.
pub fn terminal_text(html: &str) -> String {
    let broken = LINE_BREAK.replace_all(html, "\n");
    strip_tags(&broken)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn banner(title: &str) {
    println!("\n{}", format!("━━━━━━━━━━ {title} ━━━━━━━━━━").bold());
}

pub fn print_result(result: &GenerationResult, show_changes: bool) {
    banner(result.mode().label());
    match &result.output {
        StructuredOutput::Headlines(set) => {
            for (i, h) in set.headlines.iter().enumerate() {
                println!("{:>2}. {}", i + 1, h);
            }
        }
        StructuredOutput::Factcheck(report) => print_fact_checks(&report.records),
        StructuredOutput::Copyedit(edit) => {
            println!("{}", edit.edited_html);
            match (&edit.changes_report_html, show_changes) {
                (Some(report), true) => {
                    println!("\n{}", "Changes:".bold());
                    for line in terminal_text(report).lines() {
                        println!("  • {line}");
                    }
                }
                (Some(_), false) => println!("\n{}", "(changes report hidden; `show --changes` to toggle)".dimmed()),
                (None, _) => {}
            }
        }
        other => println!("{}", other.html()),
    }
    if result.is_partial() {
        println!(
            "\n{} {} segment(s) of the reply could not be parsed and were skipped",
            "partial:".yellow().bold(),
            result.dropped_segments
        );
    }
}

fn status_label(status: FactStatus) -> colored::ColoredString {
    let tag = format!("[{status}]");
    match status {
        FactStatus::Verified => tag.green().bold(),
        FactStatus::Unverified => tag.yellow().bold(),
        FactStatus::Fabricated => tag.red().bold(),
    }
}

pub fn print_fact_checks(records: &[FactCheckRecord]) {
    if records.is_empty() {
        println!("No checkable claims found.");
        return;
    }
    let count = |s: FactStatus| records.iter().filter(|r| r.status == s).count();
    println!(
        "  {}: {}   {}: {}   {}: {}",
        "Verified".green().bold(),
        count(FactStatus::Verified),
        "Unverified".yellow().bold(),
        count(FactStatus::Unverified),
        "Fabricated".red().bold(),
        count(FactStatus::Fabricated),
    );
    for r in records {
        println!("\n{} {}", status_label(r.status), r.claim);
        if !r.source_quote.is_empty() {
            println!("    {}", format!("\"{}\"", r.source_quote).dimmed());
        }
    }
}

pub fn print_score(score: u8) {
    let shown = format!("{score}%");
    let shown = match score {
        0..=19 => shown.green().bold(),
        20..=49 => shown.yellow().bold(),
        _ => shown.red().bold(),
    };
    println!("Overlap with sources: {shown} of five-word phrases");
}

pub fn print_source(item: &SourceItem) {
    let url = item.url.as_deref().unwrap_or("(no url)");
    println!("{} {}  {} words", "added source".green().bold(), url, item.text.split_whitespace().count());
}

pub fn print_state(state: &SessionState, raw: bool) {
    banner("Session");
    println!(
        "mode: {}   strength: {:?}   model: {:?}",
        state.mode.label().bold(),
        state.edit_strength,
        state.model
    );
    if !state.custom_instructions.is_empty() {
        println!("instructions: {}", state.custom_instructions);
    }
    for (i, s) in state.sources.iter().enumerate() {
        let words = s.text.split_whitespace().count();
        let url = s.url.as_deref().map(|u| format!("  ({u})")).unwrap_or_default();
        println!("source {}: {} words{}", i + 1, words, url);
    }
    println!("source words: {}   output words: {}", state.source_word_count(), state.output_word_count());
    if let Some(score) = state.plagiarism_score {
        print_score(score);
    }
    if state.editing {
        println!("{}", "(edit in progress)".yellow());
    }

    match &state.result {
        Some(result) if raw => {
            banner("Raw reply");
            println!("{}", result.raw_text);
        }
        Some(result) => print_result(result, state.show_changes_report),
        None => println!("\n(nothing generated yet)"),
    }
    if state.show_fact_check && !state.fact_checks.is_empty() {
        banner("Fact check");
        print_fact_checks(&state.fact_checks);
    }
}

pub fn print_river(links: &[RiverLink]) {
    banner("River");
    for (i, l) in links.iter().enumerate() {
        println!("{:>3}. {}  {}", i + 1, l.title.bold(), l.source.dimmed());
        println!("     {}", l.url);
    }
}

pub fn print_wiki(links: &[WikiLink]) {
    banner("Unusual articles");
    for (i, l) in links.iter().enumerate() {
        println!("{:>3}. {}", i + 1, l.title.bold());
        if !l.description.is_empty() {
            println!("     {}", l.description.dimmed());
        }
        println!("     {}", l.url);
    }
}

pub fn print_post(post: &Post, saved: &SavedPost) {
    banner("Post");
    println!("{}", post.headline.bold());
    println!("{}", terminal_text(&post.post));
    if !post.tags.is_empty() {
        println!("\ntags: {}", post.tags);
    }
    println!("\n{} {}", "saved".green().bold(), saved.path.display());
}

/// Typed failures show their user-facing message; anything else its full chain.
pub fn print_error(err: &anyhow::Error) {
    let message = match err.downcast_ref::<DeskError>() {
        Some(desk) => desk.user_message(),
        None => format!("{err:#}"),
    };
    eprintln!("{} {}", "error:".red().bold(), message);
}
