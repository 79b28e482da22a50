//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use store::{Article, DocumentStore, MemoryStore, User, UserSet};
use uuid::Uuid;

use crate::assets::MemoryAssets;
use crate::Services;

pub(crate) fn services() -> (Services, MemoryStore, MemoryAssets) {
    let store = MemoryStore::new();
    let assets = MemoryAssets::new();
    let services = Services::new(Arc::new(store.clone()), Arc::new(assets.clone()));
    (services, store, assets)
}

pub(crate) fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
}

pub(crate) async fn user(store: &dyn DocumentStore, username: &str) -> User {
    let user = User::new(
        "First".into(),
        "Last".into(),
        username.into(),
        "$argon2id$placeholder".into(),
        None,
    );
    store.insert_user(&user).await.unwrap();
    user
}

/// Insert an article by `author` created `minute` minutes into the test epoch.
pub(crate) async fn article(
    store: &dyn DocumentStore,
    author: &User,
    title: &str,
    category: &str,
    minute: i64,
) -> Article {
    let article = Article {
        id: Uuid::new_v4(),
        author: author.snapshot(),
        title: title.into(),
        description: "description".into(),
        content: "<p>content</p>".into(),
        category: category.into(),
        image: None,
        reading_time: "1 min read".into(),
        likes: 0,
        comments: Vec::new(),
        created_at: at(minute),
        updated_at: at(minute),
    };
    store.insert_article(&article).await.unwrap();
    store
        .add_to_set(author.id, UserSet::MyArticles, article.id)
        .await
        .unwrap();
    article
}

pub(crate) fn titles(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.title.as_str()).collect()
}
