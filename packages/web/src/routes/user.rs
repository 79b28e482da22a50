use api::accounts::{self, ProfileEdit, SignUp};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::CookieJar;
use serde_json::{json, Value};

use super::{end_session, message, start_session};
use crate::error::AppResult;
use crate::extract::{AuthUser, Submission, Viewer};
use crate::AppState;

pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Submission,
) -> AppResult<(StatusCode, CookieJar, Json<Value>)> {
    let user = accounts::sign_up(
        &state.services,
        SignUp {
            first_name: form.text("firstName"),
            last_name: form.text("lastName"),
            username: form.text("username"),
            password: form.text("password"),
            avatar: form.image,
        },
    )
    .await?;
    let jar = start_session(&state, jar, user.id)?;
    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({ "user": user, "message": "You signed up" })),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Submission,
) -> AppResult<(CookieJar, Json<Value>)> {
    let user = accounts::sign_in(&state.services, &form.text("username"), &form.text("password"))
        .await?;
    let jar = start_session(&state, jar, user.id)?;
    Ok((jar, Json(json!({ "user": user, "message": "You signed in" }))))
}

pub async fn sign_out(_user: AuthUser, jar: CookieJar) -> (CookieJar, Json<Value>) {
    (end_session(jar), message("You signed out"))
}

/// Own profile. Every call re-issues the session cookie.
pub async fn me(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Value>)> {
    let user = accounts::me(&state.services, viewer).await?;
    let jar = start_session(&state, jar, viewer)?;
    Ok((jar, Json(json!(user))))
}

pub async fn profile(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(username): Path<String>,
) -> AppResult<Json<accounts::Profile>> {
    Ok(Json(accounts::profile(&state.services, &username, viewer).await?))
}

pub async fn follow(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<Value>> {
    accounts::follow(&state.services, viewer, &username).await?;
    Ok(message("Followed"))
}

pub async fn unfollow(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<Value>> {
    accounts::unfollow(&state.services, viewer, &username).await?;
    Ok(message("Unfollowed"))
}

pub async fn edit_profile(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    form: Submission,
) -> AppResult<Json<Value>> {
    let edit = ProfileEdit {
        first_name: form.text("firstName"),
        last_name: form.text("lastName"),
        username: form.text("username"),
        remove_avatar: form.flag("removeAvatar"),
        avatar: form.image,
    };
    let user = accounts::edit_profile(&state.services, viewer, edit).await?;
    Ok(Json(json!({ "user": user, "message": "Profile edited" })))
}

pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Value>)> {
    accounts::delete_account(&state.services, viewer).await?;
    Ok((end_session(jar), message("Profile deleted")))
}
