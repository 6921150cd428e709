use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::dto::{ChangePasswordRequest, ProfileResponse, UpdateProfileRequest};
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::{AppError, AppJson},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users/password", put(change_password))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state
        .store
        .find_user_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".into()))?;
    let profile = state.store.find_profile(auth.id).await?;
    Ok(Json(ProfileResponse::new(user, profile)))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let patch = payload.into_patch()?;

    if state.store.find_user_by_id(auth.id).await?.is_none() {
        return Err(AppError::NotFound("User".into()));
    }

    if patch.touches_user() {
        state
            .store
            .update_user_names(auth.id, patch.first_name.as_deref(), patch.last_name.as_deref())
            .await?;
    }

    let existing = state.store.find_profile(auth.id).await?;
    // first write creates the row even if only names were sent
    if patch.touches_profile() || existing.is_none() {
        let merged = patch.merge_into(existing, auth.id, OffsetDateTime::now_utc());
        state.store.upsert_profile(&merged).await?;
    }

    info!("profile updated");
    Ok(Json(MessageResponse {
        message: "Profile updated successfully",
    }))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    let user = state
        .store
        .find_user_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".into()))?;

    if !state
        .hashing
        .verify(&payload.current_password, &user.password_hash)?
    {
        warn!("change password with wrong current password");
        return Err(AppError::unauthorized(
            "Invalid current password",
            "The current password you entered is incorrect",
        ));
    }

    let hash = state.hashing.hash(&payload.new_password)?;
    state.store.update_password_hash(auth.id, &hash).await?;

    info!("password changed");
    Ok(Json(MessageResponse {
        message: "Password changed successfully",
    }))
}
