//! HTTP handlers, one module per resource.

pub mod article;
pub mod user;

use api::auth::SESSION_COOKIE;
use api::{ApiError, ApiResult};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::AppState;

pub(crate) fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

/// Health check.
pub async fn health() -> Json<Value> {
    message("Ok")
}

/// Issue a fresh session token for `user_id` and add it to the jar.
pub(crate) fn start_session(state: &AppState, jar: CookieJar, user_id: Uuid) -> ApiResult<CookieJar> {
    let token = state.codec.issue(user_id)?;
    let same_site = if state.secure_cookie {
        SameSite::None
    } else {
        SameSite::Lax
    };
    let max_age = time::Duration::seconds(state.codec.ttl().num_seconds());
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.secure_cookie)
        .same_site(same_site)
        .max_age(max_age);
    Ok(jar.add(cookie))
}

pub(crate) fn end_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Ids that do not parse cannot name an existing document.
pub(crate) fn parse_id(raw: &str, missing: fn() -> ApiError) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| missing())
}
