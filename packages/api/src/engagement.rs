//! # Engagement ledger: likes and comments
//!
//! Likes go through [`DocumentStore::set_like`], which checks the viewer's
//! liked-set and moves the article counter in one atomic step, so two
//! concurrent likes by the same viewer count once.
//!
//! Comments are separate documents referenced from the article's ordered
//! `comments` list. Creating one inserts the document and then appends its id;
//! deleting one removes the document and then pulls the id.

use chrono::Utc;
use store::{Comment, DocumentStore, LikeChange};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, OrConflict};

fn comment_not_found() -> ApiError {
    ApiError::NotFound("Comment was not found".into())
}

/// Like an article. Returns the new like count.
pub async fn like(store: &dyn DocumentStore, viewer: Uuid, article_id: Uuid) -> ApiResult<i64> {
    match store
        .set_like(viewer, article_id, true)
        .await
        .or_conflict("like an article")?
    {
        LikeChange::Applied { likes } => Ok(likes),
        LikeChange::Unchanged => Err(ApiError::AlreadyLiked),
        LikeChange::ArticleMissing => Err(ApiError::article_not_found()),
        LikeChange::UserMissing => Err(ApiError::user_not_found()),
    }
}

/// Undo a like. Returns the new like count.
pub async fn unlike(store: &dyn DocumentStore, viewer: Uuid, article_id: Uuid) -> ApiResult<i64> {
    match store
        .set_like(viewer, article_id, false)
        .await
        .or_conflict("unlike an article")?
    {
        LikeChange::Applied { likes } => Ok(likes),
        LikeChange::Unchanged => Err(ApiError::NotLiked),
        LikeChange::ArticleMissing => Err(ApiError::article_not_found()),
        LikeChange::UserMissing => Err(ApiError::user_not_found()),
    }
}

/// Add a comment by `viewer`, snapshotting their current identity.
pub async fn comment(
    store: &dyn DocumentStore,
    viewer: Uuid,
    article_id: Uuid,
    text: &str,
) -> ApiResult<Comment> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::EmptyText);
    }
    let author = store
        .user(viewer)
        .await
        .or_conflict("comment an article")?
        .ok_or_else(ApiError::user_not_found)?;
    if store
        .article(article_id)
        .await
        .or_conflict("comment an article")?
        .is_none()
    {
        return Err(ApiError::article_not_found());
    }

    let comment = Comment {
        id: Uuid::new_v4(),
        author: author.snapshot(),
        article_id,
        text: text.to_string(),
        created_at: Utc::now(),
    };
    store
        .insert_comment(&comment)
        .await
        .or_conflict("comment an article")?;
    let attached = store
        .push_comment(article_id, comment.id)
        .await
        .or_conflict("comment an article")?;
    if !attached {
        // The article vanished between the check and the push.
        if let Err(e) = store.delete_comment(comment.id).await {
            tracing::warn!(comment = %comment.id, error = %e, "Failed to remove orphaned comment");
        }
        return Err(ApiError::article_not_found());
    }
    Ok(comment)
}

/// Delete a comment. Only its author may do so, and only through the article
/// it belongs to.
pub async fn delete_comment(
    store: &dyn DocumentStore,
    viewer: Uuid,
    article_id: Uuid,
    comment_id: Uuid,
) -> ApiResult<()> {
    let comment = store
        .comment(comment_id)
        .await
        .or_conflict("delete comment")?
        .filter(|c| c.article_id == article_id)
        .ok_or_else(comment_not_found)?;
    if comment.author.author_id != viewer {
        return Err(ApiError::Forbidden("You can only delete your own comments".into()));
    }

    store
        .delete_comment(comment_id)
        .await
        .or_conflict("delete comment")?;
    if !store
        .pull_comment(article_id, comment_id)
        .await
        .or_conflict("delete comment")?
    {
        tracing::warn!(article = %article_id, comment = %comment_id, "Comment id was not on its article");
    }
    Ok(())
}

/// Comments of an article, newest first.
pub async fn list_comments(store: &dyn DocumentStore, article_id: Uuid) -> ApiResult<Vec<Comment>> {
    let article = store
        .article(article_id)
        .await
        .or_conflict("get article comments")?
        .ok_or_else(ApiError::article_not_found)?;
    let mut comments = store
        .comments(&article.comments)
        .await
        .or_conflict("get article comments")?;
    comments.reverse();
    Ok(comments)
}
