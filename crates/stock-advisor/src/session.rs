//! Advisory Sessions
//!
//! Tracks a user's progress through the advisory flow:
//!
//! ```text
//! Greeting ──start──▶ CollectingInfo ──begin_analysis──▶ Analyzing
//!                          ▲                              │     │
//!                          └──────── fail_analysis ───────┘     │
//!                                                    complete_analysis
//!                                                               ▼
//!                          CollectingInfo ◀──reset── ActiveAdvice
//! ```
//!
//! `begin_analysis` is accepted from every stage except `Analyzing`, so an
//! advised user can re-run with a new amount.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::advisor::AdvisoryReport;
use crate::error::{AdvisorError, Result};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a session is in the advisory flow
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Greeting,
    CollectingInfo,
    Analyzing,
    ActiveAdvice,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Greeting => write!(f, "greeting"),
            Self::CollectingInfo => write!(f, "collecting_info"),
            Self::Analyzing => write!(f, "analyzing"),
            Self::ActiveAdvice => write!(f, "active_advice"),
        }
    }
}

/// One user's advisory session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvisorySession {
    pub id: SessionId,

    pub stage: Stage,

    /// Amount under analysis or last analyzed
    pub investment_amount: Option<Decimal>,

    /// Result of the last successful analysis
    pub last_report: Option<AdvisoryReport>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Default for AdvisorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisorySession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            stage: Stage::Greeting,
            investment_amount: None,
            last_report: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn invalid(&self, action: &'static str) -> AdvisorError {
        AdvisorError::InvalidTransition {
            from: self.stage,
            action,
        }
    }

    /// Greeting -> CollectingInfo
    pub fn start(&mut self) -> Result<()> {
        if self.stage != Stage::Greeting {
            return Err(self.invalid("start"));
        }
        self.stage = Stage::CollectingInfo;
        self.touch();
        Ok(())
    }

    /// Any stage but Analyzing -> Analyzing
    pub fn begin_analysis(&mut self, amount: Decimal) -> Result<()> {
        if self.stage == Stage::Analyzing {
            return Err(self.invalid("begin analysis"));
        }
        if amount <= Decimal::ZERO {
            return Err(AdvisorError::InvalidBudget(amount));
        }
        self.stage = Stage::Analyzing;
        self.investment_amount = Some(amount);
        self.touch();
        Ok(())
    }

    /// Analyzing -> ActiveAdvice
    pub fn complete_analysis(&mut self, report: AdvisoryReport) -> Result<()> {
        if self.stage != Stage::Analyzing {
            return Err(self.invalid("complete analysis"));
        }
        self.stage = Stage::ActiveAdvice;
        self.last_report = Some(report);
        self.touch();
        Ok(())
    }

    /// Analyzing -> CollectingInfo; the previous report is kept
    pub fn fail_analysis(&mut self) -> Result<()> {
        if self.stage != Stage::Analyzing {
            return Err(self.invalid("fail analysis"));
        }
        self.stage = Stage::CollectingInfo;
        self.investment_amount = None;
        self.touch();
        Ok(())
    }

    /// Back to CollectingInfo, forgetting amount and report
    pub fn reset(&mut self) {
        self.stage = Stage::CollectingInfo;
        self.investment_amount = None;
        self.last_report = None;
        self.touch();
    }
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, AdvisorySession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> AdvisorySession {
        let session = AdvisorySession::new();
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        session
    }

    pub async fn get(&self, id: &SessionId) -> Result<AdvisorySession> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AdvisorError::SessionNotFound(id.to_string()))
    }

    /// Apply `f` to a session under the write lock
    pub async fn update<T>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut AdvisorySession) -> Result<T>,
    ) -> Result<T> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AdvisorError::SessionNotFound(id.to_string()))?;
        f(session)
    }

    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
