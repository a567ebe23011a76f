//! Publishing: generated article in, CMS post identifier out.
//!
//! The WordPress implementation posts through the shared retry policy so
//! transient CMS hiccups are absorbed inside one job attempt. Publishing is
//! not idempotent here; the worker never re-publishes a job that already
//! carries a `published_post_id`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use wordpress_client::{NewPost, WordPressClient};

use crate::error::{PipelineError, Result};
use crate::generator::GeneratedArticle;
use crate::retry::RetryPolicy;

/// A successfully published post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedPost {
    pub post_id: String,
    pub url: String,
}

/// Pushes an article to the CMS.
#[async_trait]
pub trait ArticlePublisher: Send + Sync {
    /// Publish an article, attaching the given category term IDs.
    async fn publish(&self, article: &GeneratedArticle, categories: &[u32])
        -> Result<PublishedPost>;
}

/// Production publisher backed by the WordPress REST API.
pub struct WordPressPublisher {
    client: WordPressClient,
    retry: RetryPolicy,
}

impl WordPressPublisher {
    pub fn new(client: WordPressClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl ArticlePublisher for WordPressPublisher {
    async fn publish(
        &self,
        article: &GeneratedArticle,
        categories: &[u32],
    ) -> Result<PublishedPost> {
        let post = NewPost::publish(&article.title, &article.content)
            .excerpt(&article.excerpt)
            .categories(categories.to_vec());

        let created = self
            .retry
            .run(move || {
                let client = self.client.clone();
                let post = post.clone();
                async move {
                    client
                        .create_post(&post)
                        .await
                        .map_err(PipelineError::Publish)
                }
            })
            .await?;

        info!(post_id = created.id, url = %created.link, "article published");

        Ok(PublishedPost {
            post_id: created.id.to_string(),
            url: created.link,
        })
    }
}
