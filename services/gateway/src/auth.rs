//! Caller identity
//!
//! The token travels in the `token` cookie; an `Authorization: Bearer`
//! header is accepted as a fallback for non-browser clients.

use crate::error::AppError;
use crate::state::{AppState, CookieSettings};
use axum::{extract::FromRequestParts, http::request::Parts};
use headers::authorization::Bearer;
use headers::{Authorization, Cookie, HeaderMapExt};
use std::convert::Infallible;
use types::errors::VendingError;
use types::ids::AccountId;

pub const TOKEN_COOKIE: &str = "token";

fn presented_token(parts: &Parts) -> Option<String> {
    if let Some(token) = parts
        .headers
        .typed_get::<Cookie>()
        .and_then(|cookie| cookie.get(TOKEN_COOKIE).map(str::to_owned))
    {
        return Some(token);
    }
    parts
        .headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_owned())
}

/// Holder of the account's current session
pub struct AuthenticatedUser {
    pub account_id: AccountId,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts).ok_or(VendingError::InvalidToken)?;
        let claims = state.sessions.authenticate(&token)?;
        Ok(AuthenticatedUser {
            account_id: claims.sub,
        })
    }
}

/// Caller allowed to end every session of `account_id`. Accepts the
/// termination token handed out by a refused login.
pub struct TerminationCaller {
    pub account_id: AccountId,
}

impl FromRequestParts<AppState> for TerminationCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts).ok_or(VendingError::InvalidToken)?;
        let account_id = state.sessions.authorize_termination(&token)?;
        Ok(TerminationCaller { account_id })
    }
}

/// Whatever token came with the request, unchecked
pub struct PresentedToken(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for PresentedToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(PresentedToken(presented_token(parts)))
    }
}

pub fn session_cookie(token: &str, settings: CookieSettings) -> String {
    cookie_header(token, settings.max_age_secs, settings.secure)
}

pub fn cleared_cookie(settings: CookieSettings) -> String {
    cookie_header("", 0, settings.secure)
}

fn cookie_header(value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
