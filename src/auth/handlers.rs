use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, HistoryQuery, LoginRequest, MeResponse, MessageResponse, PublicUser,
            RegisterRequest,
        },
        extractors::{AuthUser, ClientMeta},
        jwt::{token_hash, JwtKeys},
        repo_types::{LoginEvent, NewLoginEvent, NewSession, NewUser, Session, User},
    },
    error::{AppError, AppJson},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/login-history", get(login_history))
        .route("/auth/sessions", get(sessions))
}

/// Signs a token for `user` and records the matching session row.
async fn issue_token(state: &AppState, user: &User, meta: &ClientMeta) -> Result<String, AppError> {
    let keys = JwtKeys::from_ref(state);
    let signed = keys.sign(user.id, &user.email)?;
    state
        .store
        .insert_session(NewSession {
            user_id: user.id,
            token_hash: token_hash(&signed.token),
            device_info: meta.user_agent.clone(),
            ip_address: meta.ip.clone(),
            expires_at: signed.expires_at,
        })
        .await?;
    Ok(signed.token)
}

async fn log_attempt(
    state: &AppState,
    user_id: Option<uuid::Uuid>,
    failure_reason: Option<&'static str>,
    meta: &ClientMeta,
) -> Result<(), AppError> {
    state
        .store
        .insert_login_event(NewLoginEvent {
            user_id,
            success: failure_reason.is_none(),
            failure_reason,
            ip_address: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
        })
        .await?;
    Ok(())
}

#[instrument(skip(state, meta, payload))]
pub async fn register(
    State(state): State<AppState>,
    meta: ClientMeta,
    AppJson(mut payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    if let Err(e) = payload.validate() {
        warn!(email = %payload.email, "registration rejected by validation");
        return Err(e);
    }

    if state.store.find_user_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict(
            "An account with this email address already exists".into(),
        ));
    }

    let hash = state.hashing.hash(&payload.password)?;

    let user = state
        .store
        .create_user(NewUser {
            email: payload.email,
            password_hash: hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?
        .ok_or_else(|| {
            // lost a race with a concurrent registration
            AppError::Conflict("An account with this email address already exists".into())
        })?;

    let token = issue_token(&state, &user, &meta).await?;
    log_attempt(&state, Some(user.id), None, &meta).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: PublicUser::from(user),
            token,
        }),
    ))
}

#[instrument(skip(state, meta, payload))]
pub async fn login(
    State(state): State<AppState>,
    meta: ClientMeta,
    AppJson(mut payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;
    let now = OffsetDateTime::now_utc();

    let Some(user) = state.store.find_user_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        log_attempt(&state, None, Some("Invalid email"), &meta).await?;
        return Err(AppError::invalid_credentials());
    };

    if state.lockout.is_locked(user.locked_until, now) {
        warn!(user_id = %user.id, "login attempt on locked account");
        return Err(AppError::Locked);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login attempt on disabled account");
        return Err(AppError::unauthorized(
            "Account disabled",
            "Your account has been disabled. Please contact support.",
        ));
    }

    if !state.hashing.verify(&payload.password, &user.password_hash)? {
        let failed = state.lockout.register_failure(user.login_attempts, now);
        state
            .store
            .record_failed_login(user.id, failed.login_attempts, failed.locked_until)
            .await?;
        log_attempt(&state, Some(user.id), Some("Invalid password"), &meta).await?;
        if failed.locked_until.is_some() {
            warn!(user_id = %user.id, attempts = failed.login_attempts, "account locked");
        } else {
            warn!(user_id = %user.id, attempts = failed.login_attempts, "login invalid password");
        }
        return Err(AppError::invalid_credentials());
    }

    state.store.record_successful_login(user.id, now).await?;
    let token = issue_token(&state, &user, &meta).await?;
    log_attempt(&state, Some(user.id), None, &meta).await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful",
        user: PublicUser::from(user),
        token,
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    let now = OffsetDateTime::now_utc();
    let closed = state.store.close_latest_login(auth.id, now).await?;
    state
        .store
        .deactivate_session(auth.id, &auth.token_hash)
        .await?;
    info!(closed, email = %auth.email, "user logged out");
    Ok(Json(MessageResponse {
        message: "Logout successful",
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let user = state
        .store
        .find_user_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".into()))?;
    Ok(Json(MeResponse {
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn login_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<LoginEvent>>, AppError> {
    let limit = q.limit.clamp(1, 100);
    Ok(Json(state.store.list_login_history(auth.id, limit).await?))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn sessions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Session>>, AppError> {
    let now = OffsetDateTime::now_utc();
    Ok(Json(state.store.list_active_sessions(auth.id, now).await?))
}
