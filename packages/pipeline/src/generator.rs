//! Content generation: topic in, structured article out.
//!
//! Builds a prompt from the topic and generation options, calls the
//! completion API through the shared retry policy, and parses the reply
//! into title, body, and excerpt. A timed-out or failed call surfaces as
//! `PipelineError::Generation`, which the worker converts into a failure
//! release against the job's retry budget.

use async_trait::async_trait;
use completion_client::{ChatRequest, CompletionClient, CompletionError, Message};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::retry::RetryPolicy;

lazy_static! {
    static ref H1_REGEX: Regex = Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>")
        .expect("h1 regex is valid");
}

/// Default excerpt length in characters.
pub const DEFAULT_EXCERPT_CHARS: usize = 160;

/// Knobs for the generation prompt.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub model: String,
    pub word_count: u32,
    pub tone: Option<String>,
    pub audience: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub excerpt_chars: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            word_count: 800,
            tone: None,
            audience: None,
            temperature: 0.7,
            max_tokens: 4096,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// A generated article ready for publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
    pub excerpt: String,
}

/// Turns a topic into an article.
#[async_trait]
pub trait ArticleGenerator: Send + Sync {
    async fn generate(&self, topic: &str) -> Result<GeneratedArticle>;
}

/// Production generator backed by the completion API.
pub struct LlmArticleGenerator {
    client: CompletionClient,
    options: GenerationOptions,
    retry: RetryPolicy,
}

impl LlmArticleGenerator {
    pub fn new(client: CompletionClient, options: GenerationOptions, retry: RetryPolicy) -> Self {
        Self {
            client,
            options,
            retry,
        }
    }

    fn build_request(&self, topic: &str) -> ChatRequest {
        let mut brief = format!(
            "Write an article about \"{topic}\". Aim for roughly {} words.",
            self.options.word_count
        );
        if let Some(tone) = &self.options.tone {
            brief.push_str(&format!(" Use a {tone} tone."));
        }
        if let Some(audience) = &self.options.audience {
            brief.push_str(&format!(" Write for {audience}."));
        }

        ChatRequest::new(self.options.model.clone())
            .message(Message::system(
                "You are a professional content writer. Produce well-structured \
                 articles in clean HTML: a single <h1> with the article title, \
                 then <h2> section headings and <p> paragraphs. No markdown, \
                 no code fences.",
            ))
            .message(Message::user(brief))
            .temperature(self.options.temperature)
            .max_tokens(self.options.max_tokens)
    }
}

#[async_trait]
impl ArticleGenerator for LlmArticleGenerator {
    async fn generate(&self, topic: &str) -> Result<GeneratedArticle> {
        let request = self.build_request(topic);

        let response = self
            .retry
            .run(move || {
                let client = self.client.clone();
                let request = request.clone();
                async move {
                    client
                        .chat_completion(request)
                        .await
                        .map_err(PipelineError::Generation)
                }
            })
            .await?;

        if response.content.trim().is_empty() {
            return Err(PipelineError::Generation(CompletionError::Parse(
                "model returned empty content".into(),
            )));
        }

        let article = parse_article(topic, &response.content, self.options.excerpt_chars);
        debug!(
            topic,
            title = %article.title,
            content_len = article.content.len(),
            "article generated"
        );
        Ok(article)
    }
}

/// Split raw model output into title, body, and excerpt.
///
/// A top-level heading (markdown `# ` or HTML `<h1>`) becomes the title and
/// is stripped from the body; otherwise the title is derived from the topic.
pub fn parse_article(topic: &str, raw: &str, excerpt_chars: usize) -> GeneratedArticle {
    let raw = raw.trim();

    let (title, content) = match extract_heading(raw) {
        Some((title, body)) => (title, body),
        None => (title_from_topic(topic), raw.to_string()),
    };

    let excerpt = derive_excerpt(&strip_html(&content), excerpt_chars);

    GeneratedArticle {
        title,
        content,
        excerpt,
    }
}

/// Pull a top-level heading off the content, returning `(title, remainder)`.
fn extract_heading(raw: &str) -> Option<(String, String)> {
    // Markdown heading on the first non-empty line
    let trimmed = raw.trim_start();
    if let Some(rest) = trimmed.strip_prefix("# ") {
        let (line, body) = match rest.split_once('\n') {
            Some((line, body)) => (line, body),
            None => (rest, ""),
        };
        let title = line.trim().to_string();
        if !title.is_empty() {
            return Some((title, body.trim().to_string()));
        }
    }

    // HTML <h1> anywhere in the document; first one wins
    if let Some(m) = H1_REGEX.captures(raw) {
        let title = strip_html(m.get(1).map_or("", |g| g.as_str()));
        if !title.is_empty() {
            let full = m.get(0).map_or("", |g| g.as_str());
            let body = raw.replacen(full, "", 1).trim().to_string();
            return Some((title, body));
        }
    }

    None
}

/// Derive a presentable title from the raw topic.
fn title_from_topic(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(|word| {
            if word.chars().any(char::is_uppercase) {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce HTML to whitespace-normalized plain text.
fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of the text, cut at a word boundary with an
/// ellipsis when truncated.
fn derive_excerpt(plain: &str, max_chars: usize) -> String {
    if plain.chars().count() <= max_chars {
        return plain.to_string();
    }

    let cut: String = plain.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(char::is_whitespace) {
        Some(boundary) => &cut[..boundary],
        None => cut.as_str(),
    };

    format!("{}…", trimmed.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_heading_becomes_title() {
        let article = parse_article("topic", "# The Real Title\n\nBody text here.", 160);
        assert_eq!(article.title, "The Real Title");
        assert_eq!(article.content, "Body text here.");
    }

    #[test]
    fn html_heading_becomes_title_and_is_stripped() {
        let raw = "<h1>Rust in Production</h1>\n<p>First paragraph.</p>";
        let article = parse_article("topic", raw, 160);
        assert_eq!(article.title, "Rust in Production");
        assert_eq!(article.content, "<p>First paragraph.</p>");
    }

    #[test]
    fn title_falls_back_to_topic_when_no_heading() {
        let article = parse_article("rust memory safety", "<p>No heading at all.</p>", 160);
        assert_eq!(article.title, "Rust Memory Safety");
        assert_eq!(article.content, "<p>No heading at all.</p>");
    }

    #[test]
    fn topic_title_preserves_existing_capitalization() {
        assert_eq!(title_from_topic("the rise of AI agents"), "The Rise Of AI Agents");
    }

    #[test]
    fn excerpt_is_html_stripped() {
        let article = parse_article("t", "<p>Hello <strong>world</strong> today.</p>", 160);
        assert_eq!(article.excerpt, "Hello world today.");
    }

    #[test]
    fn excerpt_truncates_at_word_boundary_with_ellipsis() {
        let excerpt = derive_excerpt("the quick brown fox jumps over the lazy dog", 18);
        assert!(excerpt.chars().count() <= 19);
        assert!(excerpt.ends_with('…'));
        // 18 chars lands mid-"fox"; the cut backs up to the previous word
        assert_eq!(excerpt, "the quick brown…");
    }

    #[test]
    fn short_text_is_not_truncated() {
        assert_eq!(derive_excerpt("short", 160), "short");
    }

    #[test]
    fn unbroken_text_is_hard_cut() {
        let excerpt = derive_excerpt(&"x".repeat(50), 10);
        assert_eq!(excerpt, format!("{}…", "x".repeat(10)));
    }

    #[test]
    fn request_includes_tone_and_audience() {
        let generator = LlmArticleGenerator::new(
            CompletionClient::new("sk-test").unwrap(),
            GenerationOptions {
                tone: Some("conversational".into()),
                audience: Some("beginners".into()),
                ..Default::default()
            },
            RetryPolicy::none(),
        );

        let request = generator.build_request("test topic");
        let user_message = &request.messages[1].content;
        assert!(user_message.contains("test topic"));
        assert!(user_message.contains("conversational"));
        assert!(user_message.contains("beginners"));
    }
}
