//! News Collection
//!
//! Background gathering of per-stock articles. Collection runs on its own
//! task and fills a shared [`NewsStore`]; the advisory cycle hands back a
//! [`NewsTask`] and never waits for it. Articles are supplementary context,
//! nothing in the allocation depends on them.

mod archive;
mod store;
mod task;

pub use archive::NewsArchive;
pub use store::NewsStore;
pub use task::{spawn_collection, CollectionRequest, CollectionSettings, NewsTask};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Articles with content at or below this many characters are dropped
pub const MIN_CONTENT_CHARS: usize = 100;

/// A news article about one stock
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,

    pub content: String,

    #[serde(default)]
    pub url: String,

    /// Publisher or provider name
    #[serde(default)]
    pub source: String,

    /// Search relevance reported by the source
    #[serde(default)]
    pub relevance_score: f64,

    pub stock_symbol: String,

    #[serde(default)]
    pub company_name: String,

    /// Whether the source vouches for the article
    #[serde(default)]
    pub verified: bool,
}

impl NewsArticle {
    pub fn new(
        stock_symbol: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: String::new(),
            source: String::new(),
            relevance_score: 0.0,
            stock_symbol: stock_symbol.into().to_uppercase(),
            company_name: String::new(),
            verified: false,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_relevance(mut self, relevance_score: f64) -> Self {
        self.relevance_score = relevance_score;
        self
    }

    /// Has a title and more than [`MIN_CONTENT_CHARS`] of content
    pub fn is_substantive(&self) -> bool {
        !self.title.trim().is_empty() && self.content.chars().count() > MIN_CONTENT_CHARS
    }
}

/// Snapshot of collection progress
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsStatus {
    pub in_progress: bool,
    pub complete: bool,
    pub articles_count: usize,
    pub message: String,
}

/// Article provider trait
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Up to `max_articles` articles about one stock
    async fn search(
        &self,
        symbol: &str,
        company_name: &str,
        max_articles: usize,
    ) -> Result<Vec<NewsArticle>>;

    /// Source name
    fn name(&self) -> &str;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substantive_article() {
        let short = NewsArticle::new("TCS", "Headline", "too short");
        assert!(!short.is_substantive());

        let untitled = NewsArticle::new("TCS", "  ", testing::long_text("TCS"));
        assert!(!untitled.is_substantive());

        let good = NewsArticle::new("tcs", "TCS beats", testing::long_text("TCS"));
        assert!(good.is_substantive());
        assert_eq!(good.stock_symbol, "TCS");
    }
}
