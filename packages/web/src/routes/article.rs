use api::articles::{self, ArticleDraft, ArticleView};
use api::feed::{self, SearchPage};
use api::{engagement, ApiError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use store::{Article, Comment};

use super::{message, parse_id};
use crate::error::AppResult;
use crate::extract::{AuthUser, Page, Submission, Viewer};
use crate::AppState;

fn comment_not_found() -> ApiError {
    ApiError::NotFound("Comment was not found".into())
}

fn draft(form: Submission) -> ArticleDraft {
    ArticleDraft {
        title: form.text("title"),
        description: form.text("description"),
        content: form.text("content"),
        category: form.text("category"),
        image: form.image,
    }
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    form: Submission,
) -> AppResult<(StatusCode, Json<Value>)> {
    let article = articles::create(&state.services, viewer, draft(form)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "article": article, "message": "Article created" })),
    ))
}

pub async fn edit(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(id): Path<String>,
    form: Submission,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id, ApiError::article_not_found)?;
    let article = articles::edit(&state.services, viewer, id, draft(form)).await?;
    Ok(Json(json!({ "article": article, "message": "Article edited" })))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id, ApiError::article_not_found)?;
    articles::delete(&state.services, viewer, id).await?;
    Ok(message("Article deleted"))
}

pub async fn get(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> AppResult<Json<ArticleView>> {
    let id = parse_id(&id, ApiError::article_not_found)?;
    Ok(Json(articles::get(&state.services, id, viewer).await?))
}

pub async fn global_feed(
    State(state): State<AppState>,
    Page(page): Page,
) -> AppResult<Json<Vec<Article>>> {
    Ok(Json(feed::global(state.store(), page).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    query: String,
}

pub async fn search(
    State(state): State<AppState>,
    Page(page): Page,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchPage>> {
    Ok(Json(feed::search(state.store(), &params.query, page).await?))
}

pub async fn following_feed(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Page(page): Page,
) -> AppResult<Json<Vec<Article>>> {
    Ok(Json(feed::following(state.store(), viewer, page).await?))
}

pub async fn my_feed(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Page(page): Page,
) -> AppResult<Json<Vec<Article>>> {
    Ok(Json(feed::own(state.store(), viewer, page).await?))
}

pub async fn author_feed(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Page(page): Page,
) -> AppResult<Json<Vec<Article>>> {
    Ok(Json(feed::author(state.store(), &username, page).await?))
}

pub async fn category_feed(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Page(page): Page,
) -> AppResult<Json<Vec<Article>>> {
    Ok(Json(feed::category(state.store(), &category, page).await?))
}

pub async fn like(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id, ApiError::article_not_found)?;
    let likes = engagement::like(state.store(), viewer, id).await?;
    Ok(Json(json!({ "message": "Liked", "likes": likes })))
}

pub async fn unlike(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id, ApiError::article_not_found)?;
    let likes = engagement::unlike(state.store(), viewer, id).await?;
    Ok(Json(json!({ "message": "Unliked", "likes": likes })))
}

pub async fn comment(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(id): Path<String>,
    form: Submission,
) -> AppResult<(StatusCode, Json<Value>)> {
    let id = parse_id(&id, ApiError::article_not_found)?;
    let comment = engagement::comment(state.store(), viewer, id, &form.text("text")).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "newComment": comment, "message": "Commented" })),
    ))
}

pub async fn comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Comment>>> {
    let id = parse_id(&id, ApiError::article_not_found)?;
    Ok(Json(engagement::list_comments(state.store(), id).await?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path((id, comment_id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id, ApiError::article_not_found)?;
    let comment_id = parse_id(&comment_id, comment_not_found)?;
    engagement::delete_comment(state.store(), viewer, id, comment_id).await?;
    Ok(message("Deleted"))
}
