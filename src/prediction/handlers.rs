use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use time::{macros::time, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, instrument};

use super::{
    predict,
    repo_types::{FlareStatistics, PredictionRecord},
    FlarePrediction, HIGH_RISK,
};
use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    state::AppState,
    validation::{parse_date, Validator},
};

pub fn prediction_routes() -> Router<AppState> {
    Router::new()
        .route("/predictions", post(create_prediction))
        .route("/predictions/recent", get(recent_predictions))
        .route("/predictions/statistics", get(flare_statistics))
}

#[instrument(skip(auth), fields(user_id = %auth.id))]
async fn create_prediction(auth: AuthUser) -> Json<FlarePrediction> {
    let p = predict();
    debug!(probability = p.probability, "prediction served");
    Json(p)
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: i64,
}
fn default_recent_limit() -> i64 {
    5
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
async fn recent_predictions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<RecentQuery>,
) -> Result<Json<Vec<PredictionRecord>>, AppError> {
    let rows = state
        .store
        .recent_predictions(auth.id, q.limit.clamp(1, 100))
        .await?;
    Ok(Json(rows))
}

/// Calendar-day window; both ends inclusive.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatisticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl StatisticsQuery {
    /// Start of `start_date` (unbounded when absent) and the last instant of
    /// `end_date` (`now` when absent).
    fn window(
        &self,
        now: OffsetDateTime,
    ) -> Result<(Option<OffsetDateTime>, OffsetDateTime), AppError> {
        let mut v = Validator::new();
        let mut parse = |field: &str, raw: Option<&str>| {
            let raw = raw?;
            let parsed = parse_date(raw);
            v.check(parsed.is_some(), field, "Invalid date format (YYYY-MM-DD)");
            parsed
        };
        let start = parse("start_date", self.start_date.as_deref());
        let end = parse("end_date", self.end_date.as_deref());
        v.finish()?;

        let from = start.map(|d| d.midnight().assume_utc());
        let until = match end {
            Some(d) => PrimitiveDateTime::new(d, time!(23:59:59.999999)).assume_utc(),
            None => now,
        };
        Ok((from, until))
    }
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
async fn flare_statistics(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<StatisticsQuery>,
) -> Result<Json<FlareStatistics>, AppError> {
    let (from, until) = q.window(OffsetDateTime::now_utc())?;
    let stats = state
        .store
        .flare_statistics(auth.id, from, until, HIGH_RISK)
        .await?;
    Ok(Json(stats))
}
