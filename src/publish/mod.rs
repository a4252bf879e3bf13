//! Finished posts on disk: one standalone page per post plus an index that lists them.

use anyhow::Context;
use fs_err as fs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::render::escape_html;

pub mod draft;

pub use draft::{article_context, draft_post, river_context, wiki_context};

const INDEX_MARKER: &str = "// New posts";
const INDEX_LIST_OPEN: &str = "const posts = [";
const MAX_SLUG_CHARS: usize = 50;

static UNSAFE_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("static pattern compiles"));
static HYPHEN_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("static pattern compiles"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Related {
    pub title: String,
    pub url: String,
}

/// A post ready to publish, as drafted by the model or assembled by hand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Post {
    pub headline: String,
    /// Body HTML, one `<p>` per paragraph.
    pub post: String,
    pub source_url: String,
    pub headlines: Vec<String>,
    pub tags: String,
    pub focus_keyphrase: String,
    pub meta_headlines: Vec<String>,
    pub meta_descriptions: Vec<String>,
    pub previously: Vec<Related>,
}

/// `post-<slug>.html`; the slug is lower-cased, runs of anything outside
/// `[a-z0-9-]` become one hyphen, and it is cut to 50 characters.
pub fn safe_filename(slug: &str) -> String {
    let lowered = slug.to_lowercase();
    let replaced = UNSAFE_CHAR.replace_all(&lowered, "-");
    let collapsed = HYPHEN_RUN.replace_all(&replaced, "-");
    let cut: String = collapsed.chars().take(MAX_SLUG_CHARS).collect();
    format!("post-{cut}.html")
}

/// Wraps each paragraph in block-editor comments so the body pastes cleanly.
fn block_paragraphs(body: &str) -> String {
    body.split("</p>")
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("<!-- wp:paragraph -->\n{}</p>\n<!-- /wp:paragraph -->", p.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn item_rows(items: &[String]) -> String {
    items
        .iter()
        .map(|i| {
            format!(
                r#"<div class="item-row"><span>{}</span><button class="copy-btn" onclick="copyThis(this)">copy</button></div>"#,
                escape_html(i)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn previously_block(previously: &[Related]) -> String {
    if previously.is_empty() {
        return String::new();
    }
    let items = previously
        .iter()
        .map(|p| format!(r#"<li><a href="{}">{}</a></li>"#, escape_html(&p.url), escape_html(&p.title)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("<div class=\"previously\" id=\"previously\">\n<strong>Previously:</strong>\n<ul>\n{items}\n</ul>\n</div>")
}

pub fn render_post_html(post: &Post) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{headline}</title>
    <link rel="stylesheet" href="post-style.css">
</head>
<body>

<div class="headline-row">
    <h1 id="headline">{headline}</h1>
    <button class="copy-btn" onclick="copyText('headline')">copy</button>
</div>

<article id="postBody">
{body}

{previously}
</article>

<hr>

<div class="metadata">

<h3>Source</h3>
<p class="source-url" id="sourceUrl">{source}</p>

<h3>Headlines (70 characters max)</h3>
{headlines}

<h3>Category Tags</h3>
<p id="tags">{tags}</p>

<h3>Focus Keyphrase</h3>
<p id="focusKeyphrase">{keyphrase}</p>

<h3>Meta Headlines (60 characters max)</h3>
{meta_headlines}

<h3>Meta Descriptions (120 characters max)</h3>
{meta_descriptions}

</div>

<script src="post-script.js"></script>

</body>
</html>
"#,
        headline = escape_html(&post.headline),
        body = block_paragraphs(&post.post),
        previously = previously_block(&post.previously),
        source = escape_html(&post.source_url),
        headlines = item_rows(&post.headlines),
        tags = escape_html(&post.tags),
        keyphrase = escape_html(&post.focus_keyphrase),
        meta_headlines = item_rows(&post.meta_headlines),
        meta_descriptions = item_rows(&post.meta_descriptions),
    )
}

const STARTER_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Posts</title>
</head>
<body>
<ul id="posts"></ul>
<script>
const posts = [
    // New posts
];
const list = document.getElementById('posts');
for (const p of posts) {
    const li = document.createElement('li');
    li.innerHTML = `<a href="${p.file}">${p.title}</a>`;
    list.appendChild(li);
}
</script>
</body>
</html>
"#;

/// Puts a new entry at the top of the index's post list.
pub fn add_to_index(index: &str, filename: &str, title: &str) -> String {
    let safe_title = title.replace('\\', "\\\\").replace('\'', "\\'");
    let entry = format!("{{ file: '{filename}', title: '{safe_title}' }},");
    if index.contains(INDEX_MARKER) {
        index.replacen(INDEX_MARKER, &format!("{INDEX_MARKER}\n    {entry}"), 1)
    } else {
        index.replacen(INDEX_LIST_OPEN, &format!("{INDEX_LIST_OPEN}\n    {entry}"), 1)
    }
}

/// Writes through a sibling temp file so readers never see a half-written page.
pub fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let tmp = NamedTempFile::new_in(parent)?;
    fs::write(tmp.path(), contents)?;
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedPost {
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PostStore {
    root: PathBuf,
}

impl PostStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index.html")
    }

    /// Only names this store could have written resolve to a path.
    pub fn page_path(&self, name: &str) -> Option<PathBuf> {
        let is_page = name == "index.html"
            || (name.starts_with("post-")
                && name.ends_with(".html")
                && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'));
        is_page.then(|| self.root.join(name))
    }

    pub fn read_index(&self) -> anyhow::Result<String> {
        let path = self.index_path();
        if path.exists() {
            Ok(fs::read_to_string(&path)?)
        } else {
            Ok(STARTER_INDEX.to_string())
        }
    }

    pub fn save(&self, post: &Post, slug: &str) -> anyhow::Result<SavedPost> {
        let filename = safe_filename(slug);
        let path = self.root.join(&filename);
        write_atomic(&path, &render_post_html(post))?;

        let index = add_to_index(&self.read_index()?, &filename, &post.headline);
        write_atomic(&self.index_path(), &index)?;

        tracing::info!(%filename, headline = %post.headline, "post saved");
        Ok(SavedPost { filename, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Post {
        Post {
            headline: "Giant <squid> washes ashore".into(),
            post: "<p>First para.</p><p>Second <a href=\"https://x.example\">para</a>.</p>".into(),
            source_url: "https://x.example/squid".into(),
            headlines: vec!["Squid & friends".into()],
            tags: "squid, ocean".into(),
            focus_keyphrase: "giant squid".into(),
            meta_headlines: vec!["Squid".into()],
            meta_descriptions: vec!["A squid.".into()],
            previously: vec![Related { title: "Older squid".into(), url: "https://x.example/old".into() }],
        }
    }

    #[test]
    fn filenames_are_slugged() {
        assert_eq!(safe_filename("Giant Squid!! Washes Ashore"), "post-giant-squid-washes-ashore.html");
        assert_eq!(safe_filename("a//b"), "post-a-b.html");
        let long = "x".repeat(80);
        assert_eq!(safe_filename(&long), format!("post-{}.html", "x".repeat(50)));
    }

    #[test]
    fn post_page_wraps_paragraphs_and_escapes_metadata() {
        let html = render_post_html(&sample());
        assert!(html.contains("<h1 id=\"headline\">Giant &lt;squid&gt; washes ashore</h1>"));
        assert!(html.contains("<!-- wp:paragraph -->\n<p>First para.</p>\n<!-- /wp:paragraph -->"));
        assert_eq!(html.matches("<!-- wp:paragraph -->").count(), 2);
        assert!(html.contains("<span>Squid &amp; friends</span>"));
        assert!(html.contains("<li><a href=\"https://x.example/old\">Older squid</a></li>"));
    }

    #[test]
    fn no_previously_block_without_related_posts() {
        let post = Post { previously: vec![], ..sample() };
        assert!(!render_post_html(&post).contains("Previously:"));
    }

    #[test]
    fn index_entry_goes_after_marker_or_list_open() {
        let with_marker = "const posts = [\n    // New posts\n    { file: 'post-old.html', title: 'Old' },\n];";
        let out = add_to_index(with_marker, "post-new.html", "It's new");
        assert!(out.contains("// New posts\n    { file: 'post-new.html', title: 'It\\'s new' },\n    { file: 'post-old.html'"));

        let bare = "const posts = [\n];";
        let out = add_to_index(bare, "post-a.html", "A");
        assert_eq!(out, "const posts = [\n    { file: 'post-a.html', title: 'A' },\n];");
    }

    #[test]
    fn store_writes_page_and_updates_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = PostStore::new(dir.path().join("posts"));

        let saved = store.save(&sample(), "Giant Squid").unwrap();
        assert_eq!(saved.filename, "post-giant-squid.html");
        assert!(saved.path.exists());

        store.save(&Post { headline: "Second".into(), ..sample() }, "second").unwrap();
        let index = std::fs::read_to_string(store.index_path()).unwrap();
        let second = index.find("post-second.html").unwrap();
        let first = index.find("post-giant-squid.html").unwrap();
        assert!(second < first, "newest post should be listed first");
    }

    #[test]
    fn page_paths_reject_traversal() {
        let store = PostStore::new("/srv/posts");
        assert!(store.page_path("post-a-b.html").is_some());
        assert!(store.page_path("index.html").is_some());
        assert!(store.page_path("../secret.html").is_none());
        assert!(store.page_path("post-../../x.html").is_none());
    }

    #[test]
    fn post_json_is_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["sourceUrl"], "https://x.example/squid");
        assert_eq!(json["focusKeyphrase"], "giant squid");
        let partial: Post = serde_json::from_str(r#"{"headline":"Only this"}"#).unwrap();
        assert!(partial.headlines.is_empty());
    }
}
