use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::{
    dto::{CreatedEntryResponse, JournalEntryBody, JournalEntryRequest, Pagination},
    repo_types::StoredPrediction,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppJson},
    prediction::{self, MODEL_VERSION},
    state::AppState,
};

pub fn journal_routes() -> Router<AppState> {
    Router::new().route("/journal/entries", post(create_entry).get(list_entries))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn create_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<JournalEntryRequest>,
) -> Result<(StatusCode, Json<CreatedEntryResponse>), AppError> {
    let today = OffsetDateTime::now_utc().date();
    let entry = payload.into_new_entry(today)?;

    let prediction = prediction::predict();
    let stored = StoredPrediction {
        prediction: prediction.is_flare(),
        probability: prediction.probability,
        model_version: MODEL_VERSION,
    };

    let row = state
        .store
        .create_journal_entry(auth.id, &entry, stored)
        .await?;

    info!(entry_id = %row.entry_id, flare = stored.prediction, "journal entry saved");
    Ok((
        StatusCode::CREATED,
        Json(CreatedEntryResponse {
            message: "Journal entry and prediction saved successfully",
            entry_id: row.entry_id,
            prediction,
        }),
    ))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn list_entries(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<JournalEntryBody>>, AppError> {
    let rows = state
        .store
        .list_journal_entries(auth.id, p.limit.clamp(1, 100), p.offset.max(0))
        .await?;
    Ok(Json(rows.into_iter().map(JournalEntryBody::from).collect()))
}
