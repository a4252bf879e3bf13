//! Fetching source material from the web: arbitrary article pages, a link
//! aggregator's headline river, and Wikipedia's unusual-articles list.
//!
//! Parsing is split from fetching so the page-shape rules can be tested on fixtures.

use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::errors::{DeskError, Result};

pub const RIVER_URL: &str = "https://memeorandum.com/river";
const RIVER_HOST: &str = "memeorandum.com";
pub const UNUSUAL_ARTICLES_URL: &str = "https://en.wikipedia.org/wiki/Wikipedia:Unusual_articles";
const WIKI_ORIGIN: &str = "https://en.wikipedia.org";

const MAX_ARTICLE_CHARS: usize = 10_000;
const MAX_WIKI_CHARS: usize = 8_000;
const MAX_DESCRIPTION_CHARS: usize = 300;
const MAX_LISTED: usize = 20;
const MIN_CONTENT_CHARS: usize = 200;

const NOISE: &str = "script, style, nav, footer, aside, .ad, .advertisement, .social-share, .comments";
const CONTENT_CANDIDATES: [&str; 7] = [
    "article",
    "[role=\"main\"]",
    "main",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".story-body",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverLink {
    pub title: String,
    pub url: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiLink {
    pub title: String,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiArticle {
    pub title: String,
    pub content: String,
    pub description: String,
    pub thumbnail: Option<String>,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector parses")
}

fn compact_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Text under `elem`, skipping any subtree that matches `skip`.
fn visible_text(elem: ElementRef<'_>, skip: &Selector, out: &mut String) {
    for child in elem.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(el) = ElementRef::wrap(child) {
            if !skip.matches(&el) {
                visible_text(el, skip, out);
            }
        }
    }
}

fn selection_text(doc: &Html, css: &str, skip: &Selector) -> String {
    let mut out = String::new();
    for el in doc.select(&selector(css)) {
        if !skip.matches(&el) {
            visible_text(el, skip, &mut out);
        }
    }
    out.trim().to_string()
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    doc.select(&selector(css))
        .next()
        .map(|el| compact_ws(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
}

pub fn parse_article(html: &str) -> Article {
    let doc = Html::parse_document(html);
    let noise = selector(NOISE);

    let content = CONTENT_CANDIDATES
        .iter()
        .map(|css| selection_text(&doc, css, &noise))
        .find(|text| text.chars().count() > MIN_CONTENT_CHARS)
        .unwrap_or_else(|| selection_text(&doc, "body", &noise));

    let title = first_text(&doc, "title")
        .or_else(|| first_text(&doc, "h1"))
        .or_else(|| {
            doc.select(&selector("meta[property=\"og:title\"]"))
                .next()
                .and_then(|m| m.value().attr("content"))
                .map(|c| c.trim().to_string())
        })
        .unwrap_or_default();

    Article { title, content: truncate_chars(&compact_ws(&content), MAX_ARTICLE_CHARS) }
}

pub fn parse_river(html: &str) -> Vec<RiverLink> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for a in doc.select(&selector("a")) {
        if links.len() >= MAX_LISTED {
            break;
        }
        let Some(href) = a.value().attr("href") else { continue };
        if !href.starts_with("http") || href.contains(RIVER_HOST) {
            continue;
        }
        let title = a.text().collect::<String>().trim().to_string();
        let len = title.chars().count();
        if len <= 20 || len >= 200 {
            continue;
        }
        let Some(host) = Url::parse(href).ok().and_then(|u| u.host_str().map(str::to_string)) else {
            continue;
        };
        if !seen.insert(href.to_string()) {
            continue;
        }
        let source = host.strip_prefix("www.").unwrap_or(&host).to_string();
        links.push(RiverLink { title, url: href.to_string(), source });
    }
    links
}

/// Article links from the unusual-articles page in page order, first occurrence of each title.
pub fn parse_unusual_articles(html: &str) -> Vec<WikiLink> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for a in doc.select(&selector("#mw-content-text a")) {
        let (Some(href), Some(title)) = (a.value().attr("href"), a.value().attr("title")) else {
            continue;
        };
        if !href.starts_with("/wiki/") || href.contains(':') || href.contains('#') {
            continue;
        }
        if title.chars().count() <= 2 || !seen.insert(title.to_string()) {
            continue;
        }
        let description = a
            .parent()
            .and_then(ElementRef::wrap)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .map(|t| truncate_chars(&t, MAX_DESCRIPTION_CHARS))
            .unwrap_or_default();
        out.push(WikiLink { title: title.to_string(), url: format!("{WIKI_ORIGIN}{href}"), description });
    }
    out
}

pub fn pick_random<T>(mut items: Vec<T>, rng: &mut impl rand::Rng) -> Vec<T> {
    items.shuffle(rng);
    items.truncate(MAX_LISTED);
    items
}

/// Section text of a mobile-html page with references and print-only bits dropped.
pub fn parse_wiki_sections(html: &str) -> String {
    let doc = Html::parse_document(html);
    let skip = selector("script, style, .mw-ref, .noprint");
    truncate_chars(&selection_text(&doc, "section", &skip), MAX_WIKI_CHARS)
}

/// Page title segment of a `/wiki/<title>` URL.
pub fn wiki_title(url: &str) -> Option<&str> {
    url.split_once("/wiki/")
        .map(|(_, rest)| rest)
        .filter(|t| !t.is_empty())
}

#[derive(Deserialize)]
struct WikiSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    description: String,
    thumbnail: Option<WikiThumb>,
}

#[derive(Deserialize)]
struct WikiThumb {
    source: String,
}

#[derive(Clone)]
pub struct Scraper {
    client: Client,
    user_agent: String,
}

impl Scraper {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self { client, user_agent: cfg.user_agent.clone() })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DeskError::Transport(format!("Failed to fetch {url}: {status}")));
        }
        Ok(resp)
    }

    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        tracing::debug!(%url, "fetching page");
        Ok(self.get(url).await?.text().await?)
    }

    pub async fn fetch_article(&self, url: &str) -> Result<Article> {
        let html = self.fetch_page(url).await?;
        let article = parse_article(&html);
        tracing::info!(%url, chars = article.content.chars().count(), "article extracted");
        Ok(article)
    }

    pub async fn fetch_river(&self) -> Result<Vec<RiverLink>> {
        let html = self.fetch_page(RIVER_URL).await?;
        Ok(parse_river(&html))
    }

    pub async fn fetch_unusual_articles(&self) -> Result<Vec<WikiLink>> {
        let html = self.fetch_page(UNUSUAL_ARTICLES_URL).await?;
        let links = parse_unusual_articles(&html);
        Ok(pick_random(links, &mut rand::thread_rng()))
    }

    /// Summary endpoint first; the full section text replaces the summary extract
    /// when the mobile page is reachable.
    pub async fn fetch_wiki_article(&self, url: &str) -> Result<WikiArticle> {
        let title = wiki_title(url)
            .ok_or_else(|| DeskError::Transport(format!("not a Wikipedia article URL: {url}")))?;
        let summary: WikiSummary = self
            .get(&format!("{WIKI_ORIGIN}/api/rest_v1/page/summary/{title}"))
            .await?
            .json()
            .await?;

        let full = match self.fetch_page(&format!("{WIKI_ORIGIN}/api/rest_v1/page/mobile-html/{title}")).await {
            Ok(html) => parse_wiki_sections(&html),
            Err(e) => {
                tracing::warn!(%url, error = %e, "mobile page unavailable, using summary");
                String::new()
            }
        };

        Ok(WikiArticle {
            title: summary.title,
            content: if full.is_empty() { summary.extract } else { full },
            description: summary.description,
            thumbnail: summary.thumbnail.map(|t| t.source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn article_prefers_main_content_and_drops_noise() {
        let body = "Real reporting. ".repeat(20);
        let html = format!(
            r#"<html><head><title> Big   Story </title></head><body>
            <nav>Home | World</nav>
            <article><p>{body}</p><script>var x = 1;</script><div class="ad">BUY NOW</div></article>
            <footer>Copyright</footer></body></html>"#
        );
        let article = parse_article(&html);
        assert_eq!(article.title, "Big Story");
        assert!(article.content.starts_with("Real reporting. Real reporting."));
        assert!(!article.content.contains("BUY NOW"));
        assert!(!article.content.contains("var x"));
        assert!(!article.content.contains("Home"));
    }

    #[test]
    fn short_article_falls_back_to_body_and_h1() {
        let html = "<html><body><h1>Headline</h1><article>tiny</article><p>Body text</p><footer>f</footer></body></html>";
        let article = parse_article(html);
        assert_eq!(article.title, "Headline");
        assert_eq!(article.content, "Headline tiny Body text");
    }

    #[test]
    fn og_title_is_the_last_resort() {
        let html = r#"<html><head><meta property="og:title" content="From OG"></head><body>x</body></html>"#;
        assert_eq!(parse_article(html).title, "From OG");
    }

    #[test]
    fn article_content_is_capped() {
        let html = format!("<html><body><main>{}</main></body></html>", "word ".repeat(5000));
        assert_eq!(parse_article(&html).content.chars().count(), MAX_ARTICLE_CHARS);
    }

    #[test]
    fn river_keeps_external_headline_links() {
        let html = r#"<html><body>
            <a href="https://www.nytimes.com/2024/a.html">Senate passes the sweeping spending bill late</a>
            <a href="https://www.nytimes.com/2024/a.html">Senate passes the sweeping spending bill late</a>
            <a href="https://memeorandum.com/240101/p1">Discussion of the spending bill at length</a>
            <a href="/relative">Relative link with a long enough title</a>
            <a href="https://short.example/x">Too short</a>
            <a href="https://apnews.com/b">Storm knocks out power across the coast</a>
        </body></html>"#;
        let links = parse_river(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].source, "nytimes.com");
        assert_eq!(links[1].source, "apnews.com");
        assert_eq!(links[1].title, "Storm knocks out power across the coast");
    }

    #[test]
    fn river_stops_at_twenty() {
        let html: String = (0..30)
            .map(|i| format!(r#"<a href="https://news.example/{i}">A sufficiently long headline number {i}</a>"#))
            .collect();
        assert_eq!(parse_river(&html).len(), 20);
    }

    #[test]
    fn unusual_articles_filter_and_dedupe() {
        let html = r#"<div id="mw-content-text">
            <p><a href="/wiki/Exploding_whale" title="Exploding whale">Exploding whale</a>, a 1970 beach incident.</p>
            <p><a href="/wiki/Exploding_whale" title="Exploding whale">again</a></p>
            <p><a href="/wiki/Help:Contents" title="Help:Contents">help</a></p>
            <p><a href="/wiki/Ox#History" title="Ox">ox</a></p>
            <p><a href="/wiki/Ab" title="Ab">ab</a></p>
        </div>
        <a href="/wiki/Outside" title="Outside the content">outside</a>"#;
        let links = parse_unusual_articles(html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://en.wikipedia.org/wiki/Exploding_whale");
        assert_eq!(links[0].description, "Exploding whale, a 1970 beach incident.");
    }

    #[test]
    fn random_pick_caps_the_list() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let picked = pick_random((0..50).collect::<Vec<_>>(), &mut rng);
        assert_eq!(picked.len(), 20);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn wiki_sections_skip_references() {
        let html = r#"<html><body><section><p>Fact one.<sup class="mw-ref">[1]</sup></p></section>
            <section><p>Fact two.</p><div class="noprint">edit</div></section></body></html>"#;
        assert_eq!(compact_ws(&parse_wiki_sections(html)), "Fact one. Fact two.");
    }

    #[test]
    fn wiki_title_comes_from_the_path() {
        assert_eq!(wiki_title("https://en.wikipedia.org/wiki/Exploding_whale"), Some("Exploding_whale"));
        assert_eq!(wiki_title("https://example.com/page"), None);
    }
}
