use super::blocking;
use crate::auth::{cleared_cookie, session_cookie, AuthenticatedUser, PresentedToken, TerminationCaller};
use crate::error::AppError;
use crate::models::{
    LoginRequest, LoginResponse, LogoutResponse, SessionStatusResponse, TerminateResponse,
};
use crate::rate_limit::Limit;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use vending_engine::{AccountProfile, SessionCheck, SignupRequest};

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountProfile>), AppError> {
    let Json(request) = payload?;
    let accounts = state.accounts.clone();
    let profile = blocking(move || accounts.signup(request)).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    state
        .rate_limiter
        .check(&request.email.trim().to_lowercase(), "login", Limit::LOGIN)?;

    let sessions = state.sessions.clone();
    let issued = blocking(move || sessions.login(&request.email, &request.password)).await?;

    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie(&issued.token, state.cookie))]),
        Json(LoginResponse {
            success: true,
            expires_at: issued.expires_at,
        }),
    ))
}

/// End the caller's own session. Only the token of the stored session
/// removes it; the cookie is cleared either way.
pub async fn logout(
    State(state): State<AppState>,
    PresentedToken(token): PresentedToken,
) -> Result<impl IntoResponse, AppError> {
    let removed = match token {
        Some(token) => {
            let sessions = state.sessions.clone();
            blocking(move || sessions.logout(&token)).await?
        }
        None => false,
    };
    Ok((
        AppendHeaders([(SET_COOKIE, cleared_cookie(state.cookie))]),
        Json(LogoutResponse {
            success: true,
            removed,
        }),
    ))
}

pub async fn logout_all(
    State(state): State<AppState>,
    caller: TerminationCaller,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.sessions.clone();
    let terminated = blocking(move || sessions.terminate_all(&caller.account_id)).await?;
    Ok((
        AppendHeaders([(SET_COOKIE, cleared_cookie(state.cookie))]),
        Json(TerminateResponse { terminated }),
    ))
}

/// Report whether the presented token was replaced by a newer login. A
/// stale cookie is cleared.
pub async fn session_status(
    State(state): State<AppState>,
    PresentedToken(token): PresentedToken,
) -> Result<axum::response::Response, AppError> {
    let check = match token {
        Some(token) => state.sessions.is_active(&token)?,
        None => SessionCheck::NoSession,
    };
    let body = Json(SessionStatusResponse {
        stale: check.is_stale(),
        active: check == SessionCheck::Current,
    });

    if check.is_stale() {
        tracing::debug!("clearing stale session cookie");
        Ok((
            AppendHeaders([(SET_COOKIE, cleared_cookie(state.cookie))]),
            body,
        )
            .into_response())
    } else {
        Ok(body.into_response())
    }
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<AccountProfile>, AppError> {
    Ok(Json(state.accounts.profile(&user.account_id)?))
}
