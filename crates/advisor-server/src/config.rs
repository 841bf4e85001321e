//! Server Configuration
//!
//! Read from the environment (after `.env` is loaded). Unset or
//! unparseable values fall back to defaults.

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use stock_advisor::AdvisorConfig;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Stock universe CSV
    pub universe_path: PathBuf,

    /// Quote snapshot CSV
    pub quotes_path: PathBuf,

    /// News archive directory; `None` disables news collection
    pub news_dir: Option<PathBuf>,

    /// Directory collected articles are saved to; `None` keeps them in memory only
    pub news_save_dir: Option<PathBuf>,

    pub advisor: AdvisorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            universe_path: "data/stocks.csv".into(),
            quotes_path: "data/quotes.csv".into(),
            news_dir: Some("knowledge_base".into()),
            news_save_dir: None,
            advisor: AdvisorConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("ADVISOR_UNIVERSE_PATH") {
            config.universe_path = path.into();
        }
        if let Some(path) = lookup("ADVISOR_QUOTES_PATH") {
            config.quotes_path = path.into();
        }
        if let Some(dir) = lookup("ADVISOR_NEWS_DIR") {
            config.news_dir = (!dir.trim().is_empty()).then(|| dir.into());
        }
        if let Some(dir) = lookup("ADVISOR_NEWS_SAVE_DIR") {
            config.news_save_dir = (!dir.trim().is_empty()).then(|| dir.into());
        }

        let advisor = &mut config.advisor;
        if let Some(n) = parse(&lookup, "ADVISOR_SHORTLIST_COUNT") {
            advisor.shortlist_count = n;
        }
        if let Some(n) = parse(&lookup, "ADVISOR_SELECTION_COUNT") {
            advisor.selection_count = n;
        }
        if let Some(n) = parse(&lookup, "ADVISOR_ARTICLES_PER_STOCK") {
            advisor.articles_per_stock = n;
        }
        if let Some(ms) = parse(&lookup, "ADVISOR_NEWS_INTERVAL_MS") {
            advisor.news_request_interval_ms = ms;
        }
        if let Some(flag) = parse(&lookup, "ADVISOR_PREFER_AFFORDABLE") {
            advisor.prefer_affordable = flag;
        }
        if let Some(threshold) = parse::<Decimal>(&lookup, "ADVISOR_FRACTIONAL_BELOW") {
            advisor.allocator.fractional_below = threshold;
        }

        config
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(%key, value = %raw, "Ignoring unparseable setting");
            None
        }
    }
}
