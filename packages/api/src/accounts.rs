//! # Accounts, profiles and the follow graph
//!
//! | Operation | Notes |
//! |-----------|-------|
//! | [`sign_up`] | unique username, argon2 hash, optional avatar |
//! | [`sign_in`] | unknown user is `NotFound`, wrong password is a `Conflict` |
//! | [`me`] / [`profile`] | public projections; `profile` adds viewer-relative flags |
//! | [`follow`] / [`unfollow`] | two add-to-set / pull updates, one on each user |
//! | [`edit_profile`] | replaces fields, then rewrites the author snapshot on everything the user wrote |
//! | [`delete_account`] | a logged sequence of cleanup steps, see below |
//!
//! Session tokens are not issued here; the HTTP layer turns the returned user
//! into a cookie.
//!
//! ## Account deletion
//!
//! There is no multi-document transaction, so deletion runs as independent
//! steps after the user document is gone:
//!
//! 1. remove the avatar blob
//! 2. for every article the user wrote: the article, its image and its comments
//! 3. pull the user id from every `followers` and `following` set
//!
//! A failing step is logged and the remaining steps still run.

use serde::{Deserialize, Serialize};
use store::{ArticleFilter, ProfileFields, StoreError, User, UserInfo, UserSet};
use uuid::Uuid;

use crate::articles::purge_article;
use crate::assets::{discard, Upload};
use crate::auth::{hash_password, verify_password};
use crate::error::{conflict, ApiError, ApiResult, OrConflict};
use crate::{require_filled, Services};

fn username_taken() -> ApiError {
    ApiError::Conflict("Username is already taken".into())
}

#[derive(Debug, Clone, Default)]
pub struct SignUp {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub avatar: Option<Upload>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub avatar: Option<Upload>,
    pub remove_avatar: bool,
}

/// A user as seen by a (possibly anonymous) viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: UserInfo,
    pub is_me: bool,
    pub is_following: bool,
}

pub async fn sign_up(services: &Services, form: SignUp) -> ApiResult<UserInfo> {
    require_filled(&[&form.first_name, &form.last_name, &form.username, &form.password])?;
    let store = services.store.as_ref();
    let username = form.username.trim();

    if store
        .user_by_username(username)
        .await
        .or_conflict("sign up")?
        .is_some()
    {
        return Err(username_taken());
    }

    let hash = hash_password(&form.password)?;
    let avatar = match &form.avatar {
        Some(upload) => Some(services.assets.save(upload).await.or_conflict("sign up")?),
        None => None,
    };
    let user = User::new(
        form.first_name.trim().to_string(),
        form.last_name.trim().to_string(),
        username.to_string(),
        hash,
        avatar,
    );

    if let Err(e) = store.insert_user(&user).await {
        if let Some(name) = &user.avatar {
            discard(services.assets.as_ref(), name).await;
        }
        return match e {
            StoreError::Duplicate(_) => Err(username_taken()),
            other => Err(conflict("sign up", other)),
        };
    }
    tracing::info!(user = %user.id, username = %user.username, "User signed up");
    Ok(user.to_info())
}

pub async fn sign_in(services: &Services, username: &str, password: &str) -> ApiResult<UserInfo> {
    require_filled(&[username, password])?;
    let user = services
        .store
        .user_by_username(username.trim())
        .await
        .or_conflict("sign in")?
        .ok_or_else(ApiError::user_not_found)?;
    if !verify_password(password, &user.password)? {
        return Err(ApiError::Conflict("Username or password is incorrect".into()));
    }
    Ok(user.to_info())
}

pub async fn me(services: &Services, viewer: Uuid) -> ApiResult<UserInfo> {
    services
        .store
        .user(viewer)
        .await
        .or_conflict("get profile")?
        .map(|user| user.to_info())
        .ok_or_else(ApiError::user_not_found)
}

pub async fn profile(
    services: &Services,
    username: &str,
    viewer: Option<Uuid>,
) -> ApiResult<Profile> {
    require_filled(&[username])?;
    let user = services
        .store
        .user_by_username(username)
        .await
        .or_conflict("view profile")?
        .ok_or_else(ApiError::user_not_found)?;
    let is_me = viewer == Some(user.id);
    let is_following = viewer.is_some_and(|id| user.is_followed_by(id));
    Ok(Profile {
        user: user.to_info(),
        is_me,
        is_following,
    })
}

async fn follow_target(services: &Services, viewer: Uuid, username: &str, action: &str) -> ApiResult<User> {
    let store = services.store.as_ref();
    let target = store
        .user_by_username(username)
        .await
        .or_conflict(action)?
        .ok_or_else(ApiError::user_not_found)?;
    if target.id == viewer {
        return Err(ApiError::Validation(format!("You cannot {action} yourself")));
    }
    if store.user(viewer).await.or_conflict(action)?.is_none() {
        return Err(ApiError::user_not_found());
    }
    Ok(target)
}

pub async fn follow(services: &Services, viewer: Uuid, username: &str) -> ApiResult<()> {
    let target = follow_target(services, viewer, username, "follow").await?;
    let store = services.store.as_ref();
    store
        .add_to_set(target.id, UserSet::Followers, viewer)
        .await
        .or_conflict("follow")?;
    store
        .add_to_set(viewer, UserSet::Following, target.id)
        .await
        .or_conflict("follow")?;
    Ok(())
}

pub async fn unfollow(services: &Services, viewer: Uuid, username: &str) -> ApiResult<()> {
    let target = follow_target(services, viewer, username, "unfollow").await?;
    let store = services.store.as_ref();
    store
        .pull_from_set(target.id, UserSet::Followers, viewer)
        .await
        .or_conflict("unfollow")?;
    store
        .pull_from_set(viewer, UserSet::Following, target.id)
        .await
        .or_conflict("unfollow")?;
    Ok(())
}

pub async fn edit_profile(services: &Services, viewer: Uuid, form: ProfileEdit) -> ApiResult<UserInfo> {
    require_filled(&[&form.first_name, &form.last_name, &form.username])?;
    let store = services.store.as_ref();
    let assets = services.assets.as_ref();
    let username = form.username.trim();

    let current = store
        .user(viewer)
        .await
        .or_conflict("edit profile")?
        .ok_or_else(ApiError::user_not_found)?;
    if username != current.username
        && store
            .user_by_username(username)
            .await
            .or_conflict("edit profile")?
            .is_some()
    {
        return Err(username_taken());
    }

    let uploaded = match &form.avatar {
        Some(upload) => Some(assets.save(upload).await.or_conflict("edit profile")?),
        None => None,
    };
    let avatar = match (&uploaded, form.remove_avatar) {
        (Some(name), _) => Some(name.clone()),
        (None, true) => None,
        (None, false) => current.avatar.clone(),
    };
    let fields = ProfileFields {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        username: username.to_string(),
        avatar,
    };

    let updated = match store.update_profile(viewer, &fields).await {
        Ok(Some(user)) => user,
        failed => {
            if let Some(name) = &uploaded {
                discard(assets, name).await;
            }
            return match failed {
                Ok(_) => Err(ApiError::user_not_found()),
                Err(StoreError::Duplicate(_)) => Err(username_taken()),
                Err(e) => Err(conflict("edit profile", e)),
            };
        }
    };

    if let Some(old) = current.avatar.as_deref() {
        if updated.avatar.as_deref() != Some(old) {
            discard(assets, old).await;
        }
    }

    let touched = store
        .rewrite_author(&updated.snapshot())
        .await
        .or_conflict("edit profile")?;
    tracing::debug!(user = %viewer, touched, "Rewrote author snapshots");
    Ok(updated.to_info())
}

pub async fn delete_account(services: &Services, viewer: Uuid) -> ApiResult<()> {
    let store = services.store.as_ref();
    let user = store
        .delete_user(viewer)
        .await
        .or_conflict("delete")?
        .ok_or_else(ApiError::user_not_found)?;

    if let Some(avatar) = &user.avatar {
        discard(services.assets.as_ref(), avatar).await;
    }

    let owned = match store
        .find_articles(&ArticleFilter::Author(user.id), None)
        .await
    {
        Ok(articles) => articles,
        Err(e) => {
            tracing::warn!(user = %user.id, error = %e, "Failed to list articles of deleted user");
            Vec::new()
        }
    };
    for article in &owned {
        purge_article(services, article).await;
    }

    for article_id in &user.liked_articles {
        if let Err(e) = store.release_like(*article_id).await {
            tracing::warn!(user = %user.id, article = %article_id, error = %e, "Failed to release like");
        }
    }

    match store.delete_author_comments(user.id).await {
        Ok(comments) => {
            for comment in comments {
                if let Err(e) = store.pull_comment(comment.article_id, comment.id).await {
                    tracing::warn!(comment = %comment.id, error = %e, "Failed to detach comment");
                }
            }
        }
        Err(e) => {
            tracing::warn!(user = %user.id, error = %e, "Failed to delete comments of deleted user");
        }
    }

    for set in [UserSet::Followers, UserSet::Following] {
        if let Err(e) = store.pull_from_all_users(set, user.id).await {
            tracing::warn!(user = %user.id, set = set.column(), error = %e, "Failed to detach deleted user");
        }
    }

    tracing::info!(user = %user.id, articles = owned.len(), "Deleted account");
    Ok(())
}
