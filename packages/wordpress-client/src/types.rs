//! WordPress REST API request and response types.

use serde::{Deserialize, Serialize};

/// Payload for creating a post via `POST /wp-json/wp/v2/posts`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub excerpt: String,

    /// Post status: "publish", "draft", "pending", "private"
    pub status: String,

    /// WordPress category term IDs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<u32>,
}

impl NewPost {
    /// Create a post payload that publishes immediately.
    pub fn publish(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            excerpt: String::new(),
            status: "publish".to_string(),
            categories: Vec::new(),
        }
    }

    /// Set the excerpt.
    pub fn excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    /// Set the post status.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Set the category term IDs.
    pub fn categories(mut self, categories: Vec<u32>) -> Self {
        self.categories = categories;
        self
    }
}

/// Response body for a created post.
#[derive(Debug, Clone, Deserialize)]
pub struct PostResponse {
    pub id: u64,
    pub link: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_payload_serializes_expected_fields() {
        let post = NewPost::publish("Title", "<p>Body</p>")
            .excerpt("A summary")
            .categories(vec![3, 7]);

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["title"], "Title");
        assert_eq!(json["status"], "publish");
        assert_eq!(json["categories"], serde_json::json!([3, 7]));
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let post = NewPost::publish("Title", "Body");
        let json = serde_json::to_value(&post).unwrap();

        assert!(json.get("excerpt").is_none());
        assert!(json.get("categories").is_none());
    }

    #[test]
    fn post_response_parses_wire_format() {
        let response: PostResponse = serde_json::from_str(
            r#"{"id": 123, "link": "https://example.com/?p=123", "status": "publish", "type": "post"}"#,
        )
        .unwrap();

        assert_eq!(response.id, 123);
        assert_eq!(response.status, "publish");
    }
}
