//! Shared News Store
//!
//! Cloneable handle over the article cache. Writers are tagged with the
//! generation returned by [`NewsStore::begin`], so a superseded collection
//! run cannot overwrite a newer one.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::{NewsArticle, NewsStatus};

/// Articles returned when a stock has no coverage of its own
const GENERAL_FALLBACK_ARTICLES: usize = 3;

/// Articles listed per stock in the summary
const SUMMARY_ARTICLES_PER_STOCK: usize = 2;

#[derive(Debug, Default)]
struct NewsState {
    articles: Vec<NewsArticle>,
    in_progress: bool,
    complete: bool,
    generation: u64,
}

/// Shared, lock-guarded article cache
#[derive(Clone, Debug)]
pub struct NewsStore {
    state: Arc<RwLock<NewsState>>,
    configured: bool,
}

impl Default for NewsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NewsStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(NewsState::default())),
            configured: true,
        }
    }

    /// Store for deployments without a news source; always reports as such
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Start a new collection run, clearing previous articles.
    /// Returns the generation writers must present.
    pub async fn begin(&self) -> u64 {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.articles.clear();
        state.in_progress = true;
        state.complete = false;
        state.generation
    }

    /// Append articles from run `generation`; stale runs are ignored
    pub async fn extend(&self, generation: u64, articles: Vec<NewsArticle>) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return false;
        }
        state.articles.extend(articles);
        true
    }

    /// Mark run `generation` finished
    pub async fn finish(&self, generation: u64, complete: bool) {
        let mut state = self.state.write().await;
        if state.generation == generation {
            state.in_progress = false;
            state.complete = complete;
        }
    }

    pub async fn status(&self) -> NewsStatus {
        let state = self.state.read().await;
        let articles_count = state.articles.len();

        let message = if !self.configured {
            "News source not configured".to_string()
        } else if state.in_progress {
            format!("Collecting news... ({articles_count} articles so far)")
        } else if state.complete {
            format!("{articles_count} articles ready")
        } else {
            "No news collection started yet".to_string()
        };

        NewsStatus {
            in_progress: state.in_progress,
            complete: state.complete,
            articles_count,
            message,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.articles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn articles(&self) -> Vec<NewsArticle> {
        self.state.read().await.articles.clone()
    }

    /// Articles about `symbol`, or general coverage when it has none
    pub async fn articles_for(&self, symbol: &str) -> Vec<NewsArticle> {
        let state = self.state.read().await;
        let matching: Vec<NewsArticle> = state
            .articles
            .iter()
            .filter(|a| a.stock_symbol.eq_ignore_ascii_case(symbol))
            .cloned()
            .collect();

        if matching.is_empty() {
            return state
                .articles
                .iter()
                .take(GENERAL_FALLBACK_ARTICLES)
                .cloned()
                .collect();
        }
        matching
    }

    /// Keyword search: title hit +3, content hit +1, symbol named in query +2
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<NewsArticle> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let state = self.state.read().await;
        let mut scored: Vec<(u32, &NewsArticle)> = state
            .articles
            .iter()
            .filter_map(|article| {
                let mut score = 0;
                if article.title.to_lowercase().contains(&query) {
                    score += 3;
                }
                if article.content.to_lowercase().contains(&query) {
                    score += 1;
                }
                let symbol = article.stock_symbol.to_lowercase();
                if !symbol.is_empty() && query.contains(&symbol) {
                    score += 2;
                }
                (score > 0).then_some((score, article))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, article)| article.clone())
            .collect()
    }

    /// Articles grouped by stock in first-seen order
    pub async fn summary(&self) -> String {
        let articles = self.articles().await;
        if articles.is_empty() {
            let status = self.status().await;
            return format!("News status: {}", status.message);
        }

        let mut groups: Vec<(&str, Vec<&NewsArticle>)> = Vec::new();
        for article in &articles {
            let symbol = article.stock_symbol.as_str();
            match groups.iter_mut().find(|(s, _)| *s == symbol) {
                Some((_, group)) => group.push(article),
                None => groups.push((symbol, vec![article])),
            }
        }

        let mut s = String::new();
        s.push_str(&format!("News ({} articles)\n\n", articles.len()));
        for (symbol, group) in &groups {
            s.push_str(&format!("{symbol} ({} articles):\n", group.len()));
            for (i, article) in group.iter().take(SUMMARY_ARTICLES_PER_STOCK).enumerate() {
                let title: String = article.title.chars().take(80).collect();
                s.push_str(&format!("{}. {title}\n", i + 1));
                s.push_str(&format!("   Relevance: {:.2}\n", article.relevance_score));
                if !article.url.is_empty() {
                    s.push_str(&format!("   {}\n", article.url));
                }
            }
            s.push('\n');
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::testing::long_text;

    fn article(symbol: &str, title: &str) -> NewsArticle {
        NewsArticle::new(symbol, title, long_text(title)).with_relevance(0.5)
    }

    async fn filled_store() -> NewsStore {
        let store = NewsStore::new();
        let generation = store.begin().await;
        store
            .extend(
                generation,
                vec![
                    article("TCS", "TCS wins large deal"),
                    article("INFY", "Infosys raises guidance"),
                    article("TCS", "TCS hiring update"),
                    article("TCS", "TCS dividend announced"),
                ],
            )
            .await;
        store.finish(generation, true).await;
        store
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let store = NewsStore::new();
        let idle = store.status().await;
        assert!(!idle.in_progress && !idle.complete);

        let generation = store.begin().await;
        assert!(store.status().await.in_progress);

        store.extend(generation, vec![article("TCS", "x")]).await;
        store.finish(generation, true).await;

        let done = store.status().await;
        assert!(done.complete);
        assert_eq!(done.articles_count, 1);
        assert!(done.message.contains("1 articles ready"));
    }

    #[tokio::test]
    async fn test_unconfigured_status() {
        let status = NewsStore::unconfigured().status().await;
        assert_eq!(status.message, "News source not configured");
    }

    #[tokio::test]
    async fn test_stale_generation_ignored() {
        let store = NewsStore::new();
        let old = store.begin().await;
        let new = store.begin().await;

        assert!(!store.extend(old, vec![article("OLD", "stale")]).await);
        store.finish(old, true).await;
        assert!(store.status().await.in_progress);

        assert!(store.extend(new, vec![article("NEW", "fresh")]).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_articles_for_with_fallback() {
        let store = filled_store().await;
        assert_eq!(store.articles_for("tcs").await.len(), 3);

        let general = store.articles_for("WIPRO").await;
        assert_eq!(general.len(), 3);
        assert_eq!(general[0].title, "TCS wins large deal");

        assert!(NewsStore::new().articles_for("TCS").await.is_empty());
    }

    #[tokio::test]
    async fn test_keyword_search() {
        let store = filled_store().await;

        let hits = store.search("guidance", 3).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stock_symbol, "INFY");

        // symbol in query scores every TCS article, title hit ranks first
        let hits = store.search("tcs dividend", 2).await;
        assert_eq!(hits[0].title, "TCS dividend announced");
        assert_eq!(hits.len(), 2);

        assert!(store.search("   ", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_summary_groups_by_stock() {
        let store = filled_store().await;
        let summary = store.summary().await;

        assert!(summary.starts_with("News (4 articles)"));
        assert!(summary.contains("TCS (3 articles):"));
        assert!(summary.contains("INFY (1 articles):"));
        assert!(!summary.contains("TCS dividend announced"));
        assert!(summary.find("TCS (").unwrap() < summary.find("INFY (").unwrap());

        let empty = NewsStore::new().summary().await;
        assert!(empty.starts_with("News status:"));
    }
}
