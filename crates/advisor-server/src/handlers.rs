//! HTTP Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stock_advisor::{
    market::MarketDataSource,
    news::{NewsArticle, NewsStatus},
    AdvisorError, AdvisorySession, AdvisoryReport, AllocationPlan, Candidate, SessionId, Stage,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub market_source: String,
    pub market_healthy: bool,
    pub universe_size: usize,
    pub news: NewsStatus,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    pub candidates: Vec<Candidate>,
    pub budget: Decimal,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub session_id: SessionId,
    pub stage: Stage,
    pub summary: String,
    pub report: AdvisoryReport,
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

const fn default_top_k() -> usize {
    3
}

#[derive(Debug, Serialize)]
pub struct NewsSummaryResponse {
    pub summary: String,
    pub status: NewsStatus,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Map a domain error onto a status code and JSON body
pub fn api_error(err: AdvisorError) -> ApiError {
    let status = match &err {
        AdvisorError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        AdvisorError::InvalidTransition { .. } => StatusCode::CONFLICT,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!(code = err.code(), "Rejected request: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let market = state.advisor.market();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        market_source: market.name().to_string(),
        market_healthy: market.health_check().await,
        universe_size: state.advisor.universe().len(),
        news: state.advisor.news().status().await,
    })
}

/// Rank, allocate and rebalance caller-supplied candidates
pub async fn allocate(
    State(state): State<AppState>,
    Json(payload): Json<AllocateRequest>,
) -> ApiResult<AllocationPlan> {
    let count = payload
        .count
        .unwrap_or(state.advisor.config().selection_count);

    state
        .advisor
        .allocator()
        .plan(&payload.candidates, count, payload.budget)
        .map(Json)
        .map_err(api_error)
}

pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<AdvisorySession>) {
    let session = state.sessions.create().await;
    tracing::info!(session = %session.id, "Session created");
    (StatusCode::CREATED, Json(session))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AdvisorySession> {
    state
        .sessions
        .get(&SessionId::from_string(id))
        .await
        .map(Json)
        .map_err(api_error)
}

/// Run an advisory cycle inside a session.
///
/// The news collection started by the cycle is detached; the response
/// carries whatever news status existed when the allocation finished.
pub async fn analyze_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AnalyzeRequest>,
) -> ApiResult<AnalyzeResponse> {
    let id = SessionId::from_string(id);
    let amount = payload.amount;

    state
        .sessions
        .update(&id, |s| s.begin_analysis(amount))
        .await
        .map_err(api_error)?;

    let analysis = match state.advisor.analyze(amount).await {
        Ok(analysis) => analysis,
        Err(e) => {
            if let Err(update_err) = state.sessions.update(&id, |s| s.fail_analysis()).await {
                tracing::warn!(session = %id, "Could not mark analysis failed: {}", update_err);
            }
            return Err(api_error(e));
        }
    };

    let report = analysis.report;
    let stage = state
        .sessions
        .update(&id, |s| {
            s.complete_analysis(report.clone())?;
            Ok(s.stage)
        })
        .await
        .map_err(api_error)?;

    Ok(Json(AnalyzeResponse {
        session_id: id,
        stage,
        summary: report.summary(),
        report,
    }))
}

pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AdvisorySession> {
    let id = SessionId::from_string(id);
    state
        .sessions
        .update(&id, |s| {
            s.reset();
            Ok(s.clone())
        })
        .await
        .map(Json)
        .map_err(api_error)
}

/// Articles for one stock, or everything collected so far
pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Json<Vec<NewsArticle>> {
    let news = state.advisor.news();
    let articles = match query.symbol {
        Some(symbol) => news.articles_for(&symbol).await,
        None => news.articles().await,
    };
    Json(articles)
}

pub async fn news_status(State(state): State<AppState>) -> Json<NewsStatus> {
    Json(state.advisor.news().status().await)
}

pub async fn news_summary(State(state): State<AppState>) -> Json<NewsSummaryResponse> {
    let news = state.advisor.news();
    Json(NewsSummaryResponse {
        summary: news.summary().await,
        status: news.status().await,
    })
}

pub async fn search_news(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<NewsArticle>> {
    Json(state.advisor.news().search(&query.q, query.top_k).await)
}
