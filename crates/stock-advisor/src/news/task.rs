//! Background Collection Task

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::{NewsArchive, NewsArticle, NewsSource, NewsStore};
use crate::error::{AdvisorError, Result};

/// One stock to collect news for
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRequest {
    pub symbol: String,
    pub company_name: String,
}

impl CollectionRequest {
    pub fn new(symbol: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: company_name.into(),
        }
    }
}

/// Pacing and output of a collection run
#[derive(Clone, Debug)]
pub struct CollectionSettings {
    pub articles_per_stock: usize,

    /// Pause between stocks
    pub interval: Duration,

    /// Also write each stock's articles here
    pub archive: Option<NewsArchive>,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            articles_per_stock: 3,
            interval: Duration::from_secs(1),
            archive: None,
        }
    }
}

/// Handle to a running collection.
///
/// Dropping it detaches the task. Nothing is guaranteed about when, or
/// whether, the task finishes; callers may ignore, poll or await it.
#[derive(Debug)]
pub struct NewsTask {
    handle: JoinHandle<usize>,
    generation: u64,
}

impl NewsTask {
    /// Store generation this task writes to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for completion; yields the number of articles stored
    pub async fn wait(self) -> Result<usize> {
        self.handle
            .await
            .map_err(|e| AdvisorError::News(format!("collection task failed: {e}")))
    }
}

/// Start collecting news for `requests` on a single background task.
///
/// Stocks are searched one at a time, `interval` apart. A failing stock is
/// logged and skipped, and so is a failed archive write. Only the store
/// reset is awaited here.
pub async fn spawn_collection(
    source: Arc<dyn NewsSource>,
    store: NewsStore,
    requests: Vec<CollectionRequest>,
    settings: CollectionSettings,
) -> NewsTask {
    let generation = store.begin().await;
    tracing::info!(
        source = source.name(),
        stocks = requests.len(),
        generation,
        "News collection started in background"
    );

    let handle = tokio::spawn(async move {
        let CollectionSettings {
            articles_per_stock,
            interval,
            archive,
        } = settings;
        let total = requests.len();
        let mut collected = 0;

        for (i, request) in requests.iter().enumerate() {
            if i > 0 && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
            tracing::debug!(symbol = %request.symbol, "[{}/{}] Searching news", i + 1, total);

            let articles = match source
                .search(&request.symbol, &request.company_name, articles_per_stock)
                .await
            {
                Ok(articles) => articles,
                Err(e) => {
                    tracing::warn!(symbol = %request.symbol, error = %e, "News search failed");
                    continue;
                }
            };

            let articles: Vec<NewsArticle> = articles
                .into_iter()
                .filter(NewsArticle::is_substantive)
                .take(articles_per_stock)
                .map(|mut article| {
                    if article.stock_symbol.is_empty() {
                        article.stock_symbol.clone_from(&request.symbol);
                    }
                    if article.company_name.is_empty() {
                        article.company_name.clone_from(&request.company_name);
                    }
                    article
                })
                .collect();

            if articles.is_empty() {
                tracing::debug!(symbol = %request.symbol, "No articles found");
                continue;
            }

            let count = articles.len();
            let archived = archive.is_some().then(|| articles.clone());
            if !store.extend(generation, articles).await {
                tracing::info!(generation, "News collection superseded by a newer run");
                return collected;
            }
            collected += count;
            tracing::debug!(symbol = %request.symbol, count, "Stored articles");

            if let (Some(archive), Some(articles)) = (&archive, archived) {
                if let Err(e) = archive.save(&request.symbol, &articles).await {
                    tracing::warn!(symbol = %request.symbol, error = %e, "Could not archive articles");
                }
            }
        }

        store.finish(generation, true).await;
        tracing::info!(articles = collected, "News collection complete");
        collected
    });

    NewsTask { handle, generation }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::testing::{long_text, StaticNewsSource};
    use tempfile::TempDir;

    fn requests(symbols: &[&str]) -> Vec<CollectionRequest> {
        symbols
            .iter()
            .map(|s| CollectionRequest::new(*s, format!("{s} Ltd")))
            .collect()
    }

    fn settings(articles_per_stock: usize, interval: Duration) -> CollectionSettings {
        CollectionSettings {
            articles_per_stock,
            interval,
            archive: None,
        }
    }

    fn source() -> StaticNewsSource {
        StaticNewsSource {
            failing: vec!["BAD".into()],
            ..Default::default()
        }
        .with(NewsArticle::new("TCS", "TCS beats", long_text("TCS")))
        .with(NewsArticle::new("TCS", "TCS short", "tiny"))
        .with(NewsArticle::new("INFY", "Infosys wins", long_text("INFY")))
        .with(NewsArticle::new("INFY", "Infosys again", long_text("INFY again")))
    }

    #[tokio::test]
    async fn test_collects_into_store() {
        let store = NewsStore::new();
        let task = spawn_collection(
            Arc::new(source()),
            store.clone(),
            requests(&["TCS", "BAD", "INFY", "NONE"]),
            settings(3, Duration::ZERO),
        )
        .await;

        let stored = task.wait().await.unwrap();
        assert_eq!(stored, 3);

        let status = store.status().await;
        assert!(status.complete);
        assert!(!status.in_progress);
        assert_eq!(store.articles_for("TCS").await.len(), 1);
        assert_eq!(store.articles_for("INFY").await[0].company_name, "INFY Ltd");
    }

    #[tokio::test]
    async fn test_respects_articles_per_stock() {
        let store = NewsStore::new();
        let task = spawn_collection(
            Arc::new(source()),
            store.clone(),
            requests(&["INFY"]),
            settings(1, Duration::ZERO),
        )
        .await;

        assert_eq!(task.wait().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_status_in_progress_before_completion() {
        let store = NewsStore::new();
        let task = spawn_collection(
            Arc::new(source()),
            store.clone(),
            requests(&["TCS", "INFY"]),
            settings(3, Duration::from_millis(50)),
        )
        .await;

        assert!(store.status().await.in_progress);
        task.wait().await.unwrap();
        assert!(store.status().await.complete);
    }

    #[tokio::test]
    async fn test_newer_run_supersedes() {
        let store = NewsStore::new();
        let slow = spawn_collection(
            Arc::new(source()),
            store.clone(),
            requests(&["TCS", "INFY"]),
            settings(3, Duration::from_millis(100)),
        )
        .await;
        let fast = spawn_collection(
            Arc::new(source()),
            store.clone(),
            requests(&["TCS"]),
            settings(3, Duration::ZERO),
        )
        .await;

        assert!(fast.generation() > slow.generation());
        assert_eq!(fast.wait().await.unwrap(), 1);
        slow.wait().await.unwrap();

        let articles = store.articles().await;
        assert!(articles.iter().all(|a| a.stock_symbol == "TCS"));
        assert!(store.status().await.complete);
    }

    #[tokio::test]
    async fn test_archives_collected_articles() {
        let dir = TempDir::new().unwrap();
        let archive = NewsArchive::new(dir.path());
        let store = NewsStore::new();

        let task = spawn_collection(
            Arc::new(source()),
            store.clone(),
            requests(&["TCS", "BAD", "INFY"]),
            CollectionSettings {
                archive: Some(archive.clone()),
                ..settings(3, Duration::ZERO)
            },
        )
        .await;
        task.wait().await.unwrap();

        let tcs = archive.load("TCS").await.unwrap();
        assert_eq!(tcs.len(), 1);
        assert_eq!(tcs[0].company_name, "TCS Ltd");
        assert_eq!(archive.load("INFY").await.unwrap().len(), 2);
        assert!(archive.load("BAD").await.unwrap().is_empty());
    }
}
