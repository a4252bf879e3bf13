use once_cell::sync::Lazy;
use regex::Regex;

use super::Post;
use crate::errors::{DeskError, Result};
use crate::prompt;
use crate::provider::{complete_text, Provider};
use crate::wire::{CompletionRequest, ModelVariant};

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\n?").expect("static pattern compiles"));

/// Asks the model for a complete post object about an article.
pub async fn draft_post(
    provider: &dyn Provider,
    model: ModelVariant,
    max_tokens: u32,
    article: &str,
    source_url: &str,
    context: &str,
) -> Result<Post> {
    let req = CompletionRequest {
        label: "draft-post".into(),
        model: model.model_id().to_string(),
        system: Some(prompt::draft_system_prompt()),
        prompt: prompt::draft_user_prompt(article, source_url, context),
        max_tokens,
        web_search: false,
    };
    let text = complete_text(provider, &req).await?;
    parse_post(&text)
}

/// Context line for a link picked from the news river.
pub fn river_context(title: &str) -> String {
    format!("Original headline: {title}")
}

/// Context for a Wikipedia "unusual article" draft.
pub fn wiki_context(title: &str, description: &str) -> String {
    format!(
        "This is a Wikipedia \"Unusual Article\" about: {title}.\n\
         Write in a tone of wonder and amusement at the unusual nature of the topic.\n\
         Description: {description}"
    )
}

/// Context for an arbitrary article URL.
pub fn article_context(title: &str) -> String {
    format!("Original title: {title}")
}

pub fn parse_post(text: &str) -> Result<Post> {
    let unfenced = FENCE.replace_all(text, "");
    let unfenced = unfenced.trim();
    match serde_json::from_str::<Post>(unfenced) {
        Ok(post) => Ok(post),
        Err(direct) => {
            // models sometimes wrap the object in prose
            let obj = extract_first_json_object(unfenced)
                .ok_or_else(|| DeskError::MalformedResponse(format!("no JSON object in draft: {direct}")))?;
            Ok(serde_json::from_str(obj)?)
        }
    }
}

/// The first balanced `{...}` in `s`, skipping braces inside string literals.
fn extract_first_json_object(s: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in s.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if start.is_some() => in_string = true,
            b'{' => {
                start.get_or_insert(i);
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|st| &s[st..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedProvider;

    #[test]
    fn fenced_json_parses() {
        let text = "```json\n{\"headline\":\"Hi\",\"post\":\"<p>x</p>\",\"metaHeadlines\":[\"a\"]}\n```";
        let post = parse_post(text).unwrap();
        assert_eq!(post.headline, "Hi");
        assert_eq!(post.meta_headlines, vec!["a"]);
    }

    #[test]
    fn object_is_dug_out_of_prose() {
        let text = "Here you go: {\"headline\":\"Braces } in {text}\",\"tags\":\"a, b\"} Enjoy!";
        let post = parse_post(text).unwrap();
        assert_eq!(post.headline, "Braces } in {text}");
        assert_eq!(post.tags, "a, b");
    }

    #[test]
    fn prose_without_json_is_malformed() {
        assert!(matches!(parse_post("I can't do that"), Err(DeskError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn draft_uses_system_prompt_and_light_ceiling() {
        let provider = ScriptedProvider::with_text("{\"headline\":\"Squid\"}");
        let post = draft_post(&provider, ModelVariant::Sonnet, 2000, "Body", "https://x.example", "").await.unwrap();
        assert_eq!(post.headline, "Squid");

        let sent = &provider.requests()[0];
        assert_eq!(sent.max_tokens, 2000);
        assert!(sent.system.as_deref().unwrap_or_default().contains("\"focusKeyphrase\""));
        assert!(sent.prompt.contains("https://x.example"));
    }
}
