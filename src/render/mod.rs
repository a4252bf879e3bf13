//! Turns model output (HTML, markdown-ish text, or a mix) into an HTML fragment
//! that the editor can display and re-edit.
//!
//! Both entry points are total: any input, including the empty string, yields a
//! fragment with at least one block-level element.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| re(r"(?s)```.*?```"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| re(r"`([^`]+)`"));
static LINK: Lazy<Regex> = Lazy::new(|| re(r"\[([^\]]+)\]\(([^)]+)\)"));
static STRONG_STAR: Lazy<Regex> = Lazy::new(|| re(r"\*\*([^*\n]+)\*\*"));
static STRONG_UNDERSCORE: Lazy<Regex> = Lazy::new(|| re(r"(^|[^\w])__([^_\n]+)__"));
static EM_STAR: Lazy<Regex> = Lazy::new(|| re(r"\*([^*\n]+)\*"));
static EM_UNDERSCORE: Lazy<Regex> = Lazy::new(|| re(r"(^|[^\w])_([^_\n]+)_"));
static PARAGRAPH_MARKUP: Lazy<Regex> = Lazy::new(|| re(r"(?i)<(p|div)[\s>]"));
static ANY_BLOCK: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)<(p|div|h[1-6]|ol|ul|li|blockquote|table|section|article)[\s>]"));
static BLANK_LINE: Lazy<Regex> = Lazy::new(|| re(r"\n[ \t]*\n\s*"));
static CAPS_LINE: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^[ \t]*([A-Z][A-Z \t]+(?:\([^)\n]+\))?)[ \t]*$"));
static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| re(r"^\d+\.\s+"));
static TAG: Lazy<Regex> = Lazy::new(|| re(r"<[^>]+>"));

const EMPTY_PARAGRAPH: &str = "<p></p>";

/// Markdown link / bold / italic syntax to tags. Block structure is left alone.
pub fn inline_format(text: &str) -> String {
    let s = replace_outside_tags(&LINK, text, r#"<a href="${2}">${1}</a>"#);
    let s = replace_outside_tags(&STRONG_STAR, &s, "<strong>${1}</strong>");
    let s = replace_outside_tags(&STRONG_UNDERSCORE, &s, "${1}<strong>${2}</strong>");
    let s = replace_outside_tags(&EM_STAR, &s, "<em>${1}</em>");
    replace_outside_tags(&EM_UNDERSCORE, &s, "${1}<em>${2}</em>")
}

/// Like `replace_all`, but a match that starts or ends inside a tag is kept verbatim.
fn replace_outside_tags(pattern: &Regex, text: &str, replacement: &str) -> String {
    let tags: Vec<_> = TAG.find_iter(text).map(|m| m.range()).collect();
    let inside = |at: usize| tags.iter().any(|t| t.start < at && at < t.end);
    pattern
        .replace_all(text, |caps: &Captures| {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
            if inside(whole.start) || inside(whole.end) {
                return caps[0].to_string();
            }
            let mut out = String::new();
            caps.expand(replacement, &mut out);
            out
        })
        .into_owned()
}

fn strip_code(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let without_fences = FENCED_CODE.replace_all(normalized.trim(), "");
    INLINE_CODE.replace_all(&without_fences, "${1}").into_owned()
}

pub fn has_paragraph_markup(html: &str) -> bool {
    PARAGRAPH_MARKUP.is_match(html)
}

pub fn has_block_element(html: &str) -> bool {
    ANY_BLOCK.is_match(html)
}

/// Last-resort wrap for fragments that carry no block element at all.
pub fn ensure_block(html: String) -> String {
    if has_block_element(&html) {
        html
    } else {
        format!("<p>{}</p>", html.trim().replace('\n', "<br>"))
    }
}

/// Canonical HTML for general model output.
pub fn to_html(text: &str) -> String {
    let html = strip_code(text);
    if html.trim().is_empty() {
        return EMPTY_PARAGRAPH.to_string();
    }

    if has_paragraph_markup(&html) {
        return inline_format(&html);
    }

    let formatted = inline_format(&html);
    let paragraphs: Vec<String> = BLANK_LINE
        .split(&formatted)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", p.replace('\n', " ")))
        .collect();

    if paragraphs.is_empty() {
        EMPTY_PARAGRAPH.to_string()
    } else {
        paragraphs.join("\n")
    }
}

/// Like [`to_html`] but tuned for the SEO package: all-caps section labels become
/// `<h3>` and runs of numbered lines become an ordered list.
pub fn to_seo_html(text: &str) -> String {
    let html = strip_code(text);
    if html.trim().is_empty() {
        return EMPTY_PARAGRAPH.to_string();
    }

    let formatted = inline_format(&html);
    let headed = CAPS_LINE.replace_all(&formatted, "<h3>${1}</h3>");

    let mut out: Vec<String> = Vec::new();
    let mut in_list = false;
    for raw in headed.lines() {
        let line = raw.trim();
        if let Some(m) = NUMBERED_LINE.find(line) {
            if !in_list {
                out.push("<ol>".into());
                in_list = true;
            }
            out.push(format!("<li>{}</li>", &line[m.end()..]));
            continue;
        }
        if in_list {
            out.push("</ol>".into());
            in_list = false;
        }
        if line.is_empty() || line.starts_with("<h3>") {
            out.push(line.to_string());
        } else {
            out.push(format!("<p>{line}</p>"));
        }
    }
    if in_list {
        out.push("</ol>".into());
    }

    ensure_block(out.join("\n"))
}

pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Words in rendered output, ignoring tags and leftover emphasis markers.
pub fn word_count(html: &str) -> usize {
    strip_tags(html).replace('*', "").split_whitespace().count()
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}
