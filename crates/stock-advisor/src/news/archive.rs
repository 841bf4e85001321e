//! On-disk News Archive
//!
//! One JSON file per stock (`<SYMBOL>.json`) holding a list of articles.
//! Serves as a [`NewsSource`] for offline runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{NewsArticle, NewsSource};
use crate::error::Result;

#[derive(Clone, Debug)]
pub struct NewsArchive {
    dir: PathBuf,
}

impl NewsArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        let file: String = symbol
            .trim()
            .to_uppercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '&') { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    /// Overwrite the stored articles for `symbol`
    pub async fn save(&self, symbol: &str, articles: &[NewsArticle]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(symbol);
        let json = serde_json::to_string_pretty(articles)?;
        tokio::fs::write(&path, json).await?;
        tracing::debug!(%symbol, path = %path.display(), count = articles.len(), "Archived articles");
        Ok(path)
    }

    /// Stored articles for `symbol`; empty when none were archived
    pub async fn load(&self, symbol: &str) -> Result<Vec<NewsArticle>> {
        let path = self.path_for(symbol);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        let json = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[async_trait]
impl NewsSource for NewsArchive {
    async fn search(
        &self,
        symbol: &str,
        _company_name: &str,
        max_articles: usize,
    ) -> Result<Vec<NewsArticle>> {
        let mut articles = self.load(symbol).await?;
        articles.truncate(max_articles);
        Ok(articles)
    }

    fn name(&self) -> &str {
        "Archive"
    }
}
