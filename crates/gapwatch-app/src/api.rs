// Read-only HTTP API over the latest processed batch.
//
// Every request reloads the newest `processed_*.csv` and recomputes from it,
// so the API always reflects whatever the last `process` run wrote.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use gapwatch_core::ranking::to_display_pct;
use gapwatch_core::rolling::player_series;
use gapwatch_core::{
    DailyLeaderboardEntry, EnrichedRecord, EstimationType, Leaderboards, Pipeline, PipelineError,
    PlayerId,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::io::{self, IoError};
use crate::plot::PlotSeries;
use crate::report::DailyReport;

// ---------------------------------------------------------------------------
// State and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AppState {
    pub processed_dir: PathBuf,
    pub pipeline: Pipeline,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("background task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_)
            | ApiError::Io(IoError::NoProcessedData { .. })
            | ApiError::Pipeline(PipelineError::EmptyInput { .. }) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStat {
    pub player_id: PlayerId,
    pub player_name: String,
    pub rolling_woba: f64,
    /// Percentage points, two decimals.
    #[serde(rename = "diff_rolling_OBA")]
    pub diff_rolling_oba: f64,
    pub rank: usize,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateLeaderboards {
    pub date: NaiveDate,
    pub underestimated: Vec<DailyLeaderboardEntry>,
    pub overestimated: Vec<DailyLeaderboardEntry>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn read_latest(dir: &std::path::Path) -> Result<Vec<EnrichedRecord>, ApiError> {
    let path = io::latest_processed_file(dir)?;
    Ok(io::load_enriched(&path)?)
}

async fn load_enriched(state: &AppState) -> Result<Vec<EnrichedRecord>, ApiError> {
    let dir = state.processed_dir.clone();
    tokio::task::spawn_blocking(move || read_latest(&dir))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))?
}

async fn load_ranked(state: &AppState) -> Result<(Vec<EnrichedRecord>, Leaderboards), ApiError> {
    let dir = state.processed_dir.clone();
    let pipeline = state.pipeline.clone();
    tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let enriched = read_latest(&dir)?;
        let boards = pipeline.rank(&enriched)?;
        Ok((enriched, boards))
    })
    .await
    .map_err(|e| ApiError::Task(e.to_string()))?
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// # GET /api/health
pub async fn health() -> &'static str {
    "OK"
}

/// # GET /api/baseball-stats
/// Underestimated players on the most recent date.
pub async fn baseball_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PlayerStat>>, ApiError> {
    let (enriched, boards) = load_ranked(&state).await?;
    let date = boards
        .latest_date()
        .ok_or_else(|| ApiError::NotFound("no leaderboard data".into()))?;
    let report = DailyReport::build(date, &boards, &enriched)?;

    let stats = report
        .entries
        .into_iter()
        .map(|e| PlayerStat {
            player_id: e.player_id,
            player_name: e.player_name,
            rolling_woba: e.rolling_woba,
            diff_rolling_oba: to_display_pct(e.diff_oba),
            rank: e.rank,
        })
        .collect();
    Ok(Json(stats))
}

/// # GET /api/leaderboards?date=YYYY-MM-DD
pub async fn leaderboards(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<DateLeaderboards>, ApiError> {
    let (_, boards) = load_ranked(&state).await?;
    let date = query
        .date
        .or_else(|| boards.latest_date())
        .ok_or_else(|| ApiError::NotFound("no leaderboard data".into()))?;

    let pick = |t: EstimationType| -> Vec<DailyLeaderboardEntry> {
        boards.for_date(date, t).into_iter().cloned().collect()
    };
    let underestimated = pick(EstimationType::Underestimated);
    let overestimated = pick(EstimationType::Overestimated);
    if underestimated.is_empty() && overestimated.is_empty() {
        return Err(ApiError::NotFound(format!("no leaderboard for {date}")));
    }

    Ok(Json(DateLeaderboards {
        date,
        underestimated,
        overestimated,
    }))
}

/// # GET /api/baseball-plot/:player_id
pub async fn baseball_plot(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<PlayerId>,
) -> Result<Json<PlotSeries>, ApiError> {
    let enriched = load_enriched(&state).await?;
    let series = player_series(&enriched, player_id);
    if series.is_empty() {
        return Err(ApiError::NotFound(format!("unknown player {player_id}")));
    }
    Ok(Json(PlotSeries::from_records(&series)?))
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/baseball-stats", get(baseball_stats))
        .route("/api/leaderboards", get(leaderboards))
        .route("/api/baseball-plot/:player_id", get(baseball_plot))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_maps_to_not_found() {
        let err = ApiError::from(IoError::NoProcessedData { dir: "x".into() });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = ApiError::from(PipelineError::EmptyInput { context: "y".into() });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NotFound("z".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn data_errors_map_to_server_error() {
        let err = ApiError::from(PipelineError::Schema {
            missing: vec!["woba_value".into()],
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::Task("panicked".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn player_stat_keeps_csv_column_name() {
        let stat = PlayerStat {
            player_id: 621043,
            player_name: "Juan Soto".into(),
            rolling_woba: 0.4,
            diff_rolling_oba: 3.25,
            rank: 1,
        };
        let value = serde_json::to_value(&stat).unwrap();
        assert_eq!(value["diff_rolling_OBA"], 3.25);
        assert_eq!(value["player_id"], 621043);
    }

    #[test]
    fn leaderboard_entries_use_same_gap_key_as_stats() {
        let entry = DailyLeaderboardEntry {
            game_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            player_id: 621043,
            player_name: "Juan Soto".into(),
            rolling_gap_pct: 37.5,
            daily_gap: 0.375,
            rank: 1,
            estimation_type: EstimationType::Underestimated,
        };
        let boards = DateLeaderboards {
            date: entry.game_date,
            underestimated: vec![entry.clone()],
            overestimated: vec![],
        };
        let value = serde_json::to_value(&boards).unwrap();
        let under = &value["underestimated"][0];
        assert_eq!(under["diff_rolling_OBA"], 37.5);
        assert!(under.get("rolling_gap_pct").is_none());

        let back: DateLeaderboards = serde_json::from_value(value).unwrap();
        assert_eq!(back.underestimated, vec![entry]);
    }

    #[tokio::test]
    async fn empty_processed_dir_is_not_found() {
        let dir = std::env::temp_dir().join("gapwatch_api_empty");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let state = Arc::new(AppState {
            processed_dir: dir.clone(),
            pipeline: Pipeline::new(Default::default()).unwrap(),
        });

        let err = baseball_stats(State(state)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
