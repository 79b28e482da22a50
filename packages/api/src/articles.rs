//! Article authoring: create, edit, delete and the single-article view.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use store::{Article, ArticleFields, UserSet};
use uuid::Uuid;

use crate::assets::{discard, Upload};
use crate::error::{conflict, ApiError, ApiResult, OrConflict};
use crate::feed::normalize_category;
use crate::reading_time::reading_time;
use crate::{require_filled, Services};

/// Fields submitted when creating or editing an article.
#[derive(Debug, Clone, Default)]
pub struct ArticleDraft {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub image: Option<Upload>,
}

impl ArticleDraft {
    fn validate(&self) -> ApiResult<()> {
        require_filled(&[&self.title, &self.description, &self.content, &self.category])
    }
}

/// An article with flags relative to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub article: Article,
    pub is_my: bool,
    pub is_liked: bool,
}

pub async fn create(services: &Services, viewer: Uuid, draft: ArticleDraft) -> ApiResult<Article> {
    draft.validate()?;
    let store = services.store.as_ref();
    let author = store
        .user(viewer)
        .await
        .or_conflict("create an article")?
        .ok_or_else(ApiError::user_not_found)?;

    let image = match &draft.image {
        Some(upload) => Some(
            services
                .assets
                .save(upload)
                .await
                .or_conflict("create an article")?,
        ),
        None => None,
    };
    let now = Utc::now();
    let article = Article {
        id: Uuid::new_v4(),
        author: author.snapshot(),
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        reading_time: reading_time(&draft.content),
        content: draft.content,
        category: normalize_category(&draft.category),
        image,
        likes: 0,
        comments: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = store.insert_article(&article).await {
        if let Some(name) = &article.image {
            discard(services.assets.as_ref(), name).await;
        }
        return Err(conflict("create an article", e));
    }
    store
        .add_to_set(viewer, UserSet::MyArticles, article.id)
        .await
        .or_conflict("create an article")?;
    tracing::info!(article = %article.id, author = %viewer, "Article created");
    Ok(article)
}

/// Load an article and make sure `viewer` wrote it.
async fn owned(services: &Services, viewer: Uuid, id: Uuid, action: &str) -> ApiResult<Article> {
    let article = services
        .store
        .article(id)
        .await
        .or_conflict(action)?
        .ok_or_else(ApiError::article_not_found)?;
    if article.author.author_id != viewer {
        return Err(ApiError::Forbidden("Only the author can change this article".into()));
    }
    Ok(article)
}

pub async fn edit(
    services: &Services,
    viewer: Uuid,
    id: Uuid,
    draft: ArticleDraft,
) -> ApiResult<Article> {
    draft.validate()?;
    let current = owned(services, viewer, id, "edit an article").await?;
    let assets = services.assets.as_ref();

    let uploaded = match &draft.image {
        Some(upload) => Some(assets.save(upload).await.or_conflict("edit an article")?),
        None => None,
    };
    let fields = ArticleFields {
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        reading_time: reading_time(&draft.content),
        content: draft.content,
        category: normalize_category(&draft.category),
        image: uploaded.clone().or_else(|| current.image.clone()),
    };

    let updated = match services.store.update_article(id, &fields).await {
        Ok(Some(article)) => article,
        failed => {
            if let Some(name) = &uploaded {
                discard(assets, name).await;
            }
            return match failed {
                Ok(_) => Err(ApiError::article_not_found()),
                Err(e) => Err(conflict("edit an article", e)),
            };
        }
    };
    if let (Some(_), Some(old)) = (&uploaded, &current.image) {
        discard(assets, old).await;
    }
    Ok(updated)
}

pub async fn delete(services: &Services, viewer: Uuid, id: Uuid) -> ApiResult<()> {
    owned(services, viewer, id, "delete an article").await?;
    let store = services.store.as_ref();
    let article = store
        .delete_article(id)
        .await
        .or_conflict("delete an article")?
        .ok_or_else(ApiError::article_not_found)?;
    purge_references(services, &article).await;
    Ok(())
}

pub async fn get(services: &Services, id: Uuid, viewer: Option<Uuid>) -> ApiResult<ArticleView> {
    let store = services.store.as_ref();
    let article = store
        .article(id)
        .await
        .or_conflict("get an article")?
        .ok_or_else(|| ApiError::NotFound("Article does not exist".into()))?;

    let (is_my, is_liked) = match viewer {
        Some(viewer) => {
            let is_liked = store
                .user(viewer)
                .await
                .or_conflict("get an article")?
                .is_some_and(|user| user.has_liked(id));
            (article.author.author_id == viewer, is_liked)
        }
        None => (false, false),
    };
    Ok(ArticleView {
        article,
        is_my,
        is_liked,
    })
}

/// Delete an article document and everything hanging off it. Used when the
/// author's account goes away; every step is logged and none aborts the rest.
pub(crate) async fn purge_article(services: &Services, article: &Article) {
    match services.store.delete_article(article.id).await {
        Ok(_) => purge_references(services, article).await,
        Err(e) => {
            tracing::warn!(article = %article.id, error = %e, "Failed to delete article");
        }
    }
}

async fn purge_references(services: &Services, article: &Article) {
    let store = services.store.as_ref();
    if let Some(image) = &article.image {
        discard(services.assets.as_ref(), image).await;
    }
    if let Err(e) = store.delete_article_comments(article.id).await {
        tracing::warn!(article = %article.id, error = %e, "Failed to delete article comments");
    }
    if let Err(e) = store
        .pull_from_set(article.author.author_id, UserSet::MyArticles, article.id)
        .await
    {
        tracing::warn!(article = %article.id, error = %e, "Failed to detach article from author");
    }
    if let Err(e) = store
        .pull_from_all_users(UserSet::LikedArticles, article.id)
        .await
    {
        tracing::warn!(article = %article.id, error = %e, "Failed to remove article from likes");
    }
}
