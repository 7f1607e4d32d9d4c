use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegistrationRequest},
        extractors::AuthUser,
        repo::DirectoryError,
        services::{LoginError, RegistrationError},
    },
    state::AppState,
};

type Rejection = (StatusCode, String);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn registration_rejection(e: RegistrationError) -> Rejection {
    match e {
        RegistrationError::EmailTaken => (StatusCode::CONFLICT, "Email already registered".into()),
        RegistrationError::HashingFailed(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not process password".into(),
        ),
        RegistrationError::StorageUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable".into(),
        ),
        RegistrationError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Request timed out".into()),
    }
}

fn login_rejection(e: LoginError) -> Rejection {
    match e {
        LoginError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".into()),
        LoginError::InternalError(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Login failed, please try again later".into(),
        ),
        LoginError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Request timed out".into()),
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<PublicUser>), Rejection> {
    let payload = payload.validate().map_err(|msg| {
        warn!(reason = %msg, "invalid registration request");
        (StatusCode::BAD_REQUEST, msg)
    })?;

    let user = state
        .auth
        .register(payload)
        .await
        .map_err(registration_rejection)?;

    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, Rejection> {
    let payload = payload.validate().map_err(|msg| {
        warn!(reason = %msg, "invalid login request");
        (StatusCode::BAD_REQUEST, msg)
    })?;

    let (token, user) = state.auth.login(payload).await.map_err(login_rejection)?;

    Ok(Json(LoginResponse {
        token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, claims))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, Rejection> {
    let user = state
        .auth
        .user_by_id(claims.user_id)
        .await
        .map_err(|e| match e {
            DirectoryError::NotFound => {
                warn!(user_id = %claims.user_id, "token for unknown user");
                (StatusCode::UNAUTHORIZED, "User not found".to_string())
            }
            other => {
                error!(error = %other, user_id = %claims.user_id, "find_by_id failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                )
            }
        })?;

    Ok(Json(PublicUser::from(user)))
}
