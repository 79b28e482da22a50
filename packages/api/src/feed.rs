//! # Feed aggregator
//!
//! Every feed is a page of [`PAGE_SIZE`] articles, newest first, for a 1-based
//! page number.
//!
//! | Feed | Filter | Pagination |
//! |------|--------|-----------|
//! | [`global`] | none | pushed down to the store |
//! | [`own`] | `authorId == viewer` | pushed down |
//! | [`category`] | `category == slug` | pushed down |
//! | [`author`] | `authorUsername == username` | pushed down |
//! | [`search`] | title contains query, case-insensitive | pushed down, plus a total count |
//! | [`following`] | one query per followed author | merged and sliced in memory |
//!
//! The following feed cannot push the window down: no single store query
//! returns "articles of N authors, globally ordered by time". It loads every
//! article of every followed author, concatenates the batches in `following`
//! order, stable-sorts them by `createdAt` descending and slices the page out
//! of the merged list. Each page request repeats the full merge.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use store::{Article, ArticleFilter, DocumentStore, Window, PAGE_SIZE};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, OrConflict};

/// A page of search results with the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub articles: Vec<Article>,
    pub count: u64,
}

fn window(page: u64) -> ApiResult<Window> {
    if page == 0 {
        return Err(ApiError::Validation("Page must be a positive number".into()));
    }
    Ok(Window::page(page))
}

async fn filtered(
    store: &dyn DocumentStore,
    filter: ArticleFilter,
    page: u64,
) -> ApiResult<Vec<Article>> {
    let window = window(page)?;
    store
        .find_articles(&filter, Some(window))
        .await
        .or_conflict("load articles")
}

pub async fn global(store: &dyn DocumentStore, page: u64) -> ApiResult<Vec<Article>> {
    filtered(store, ArticleFilter::All, page).await
}

pub async fn own(store: &dyn DocumentStore, viewer: Uuid, page: u64) -> ApiResult<Vec<Article>> {
    filtered(store, ArticleFilter::Author(viewer), page).await
}

/// Category slugs are compared in their normalised (trimmed, lowercase) form.
pub async fn category(
    store: &dyn DocumentStore,
    category: &str,
    page: u64,
) -> ApiResult<Vec<Article>> {
    let slug = normalize_category(category);
    filtered(store, ArticleFilter::Category(slug), page).await
}

pub async fn author(
    store: &dyn DocumentStore,
    username: &str,
    page: u64,
) -> ApiResult<Vec<Article>> {
    filtered(store, ArticleFilter::AuthorUsername(username.to_string()), page).await
}

pub async fn search(store: &dyn DocumentStore, query: &str, page: u64) -> ApiResult<SearchPage> {
    let window = window(page)?;
    let filter = ArticleFilter::TitleContains(query.trim().to_string());
    let articles = store
        .find_articles(&filter, Some(window))
        .await
        .or_conflict("search articles")?;
    let count = store
        .count_articles(&filter)
        .await
        .or_conflict("search articles")?;
    Ok(SearchPage { articles, count })
}

pub async fn following(
    store: &dyn DocumentStore,
    viewer: Uuid,
    page: u64,
) -> ApiResult<Vec<Article>> {
    let window = window(page)?;
    let viewer = store
        .user(viewer)
        .await
        .or_conflict("load articles")?
        .ok_or_else(ApiError::user_not_found)?;
    if viewer.following.is_empty() {
        return Ok(Vec::new());
    }

    let filters: Vec<ArticleFilter> = viewer
        .following
        .iter()
        .map(|id| ArticleFilter::Author(*id))
        .collect();
    let batches = try_join_all(filters.iter().map(|f| store.find_articles(f, None)))
        .await
        .or_conflict("load articles")?;

    Ok(window.slice(merge_newest_first(batches)))
}

/// Concatenate per-author batches and order them by `createdAt` descending.
/// Equal timestamps keep their concatenation order.
pub fn merge_newest_first(batches: Vec<Vec<Article>>) -> Vec<Article> {
    let mut merged: Vec<Article> = batches.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}

pub(crate) fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use store::UserSet;

    use super::*;
    use crate::testing::{article, titles, user};

    #[tokio::test]
    async fn test_global_feed_is_windowed_newest_first() {
        let store = store::MemoryStore::new();
        let alice = user(&store, "alice").await;
        for minute in 0..7 {
            article(&store, &alice, &format!("a{minute}"), "tech", minute).await;
        }

        let first = global(&store, 1).await.unwrap();
        assert_eq!(titles(&first), vec!["a6", "a5", "a4", "a3", "a2"]);
        let second = global(&store, 2).await.unwrap();
        assert_eq!(titles(&second), vec!["a1", "a0"]);
        assert!(global(&store, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_page_zero_is_rejected() {
        let store = store::MemoryStore::new();
        assert!(matches!(global(&store, 0).await, Err(ApiError::Validation(_))));
        assert!(matches!(
            following(&store, Uuid::new_v4(), 0).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_page_is_empty() {
        let store = store::MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        for minute in 0..7 {
            article(&store, &alice, &format!("a{minute}"), "tech", minute).await;
        }
        store
            .add_to_set(bob.id, UserSet::Following, alice.id)
            .await
            .unwrap();

        for page in [u64::MAX, 3689348814741910325] {
            assert!(global(&store, page).await.unwrap().is_empty());
            assert!(following(&store, bob.id, page).await.unwrap().is_empty());
            assert!(search(&store, "a", page).await.unwrap().articles.is_empty());
        }
    }

    #[tokio::test]
    async fn test_filtered_feeds_never_exceed_page_size() {
        let store = store::MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        for minute in 0..12 {
            let author = if minute % 2 == 0 { &alice } else { &bob };
            article(&store, author, &format!("Rust {minute}"), "tech", minute).await;
        }

        for page in 1..5 {
            assert!(global(&store, page).await.unwrap().len() as u64 <= PAGE_SIZE);
            assert!(own(&store, alice.id, page).await.unwrap().len() as u64 <= PAGE_SIZE);
            assert!(category(&store, "tech", page).await.unwrap().len() as u64 <= PAGE_SIZE);
            assert!(author(&store, "bob", page).await.unwrap().len() as u64 <= PAGE_SIZE);
            assert!(
                search(&store, "rust", page).await.unwrap().articles.len() as u64 <= PAGE_SIZE
            );
        }
        assert!(own(&store, alice.id, 1)
            .await
            .unwrap()
            .iter()
            .all(|a| a.author.author_id == alice.id));
    }

    #[tokio::test]
    async fn test_category_is_normalised() {
        let store = store::MemoryStore::new();
        let alice = user(&store, "alice").await;
        article(&store, &alice, "t", "travel", 0).await;
        assert_eq!(category(&store, " Travel ", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_counts_all_matches() {
        let store = store::MemoryStore::new();
        let alice = user(&store, "alice").await;
        for minute in 0..8 {
            article(&store, &alice, &format!("Learning Rust {minute}"), "tech", minute).await;
        }
        article(&store, &alice, "Gardening", "home", 9).await;

        let page = search(&store, "RUST", 2).await.unwrap();
        assert_eq!(page.count, 8);
        assert_eq!(page.articles.len(), 3);

        let none = search(&store, "haskell", 1).await.unwrap();
        assert_eq!(none.count, 0);
        assert!(none.articles.is_empty());
    }

    #[tokio::test]
    async fn test_following_feed_empty_when_following_nobody() {
        let store = store::MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        article(&store, &bob, "b", "tech", 0).await;
        for page in 1..4 {
            assert!(following(&store, alice.id, page).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_following_feed_merges_authors_by_time() {
        let store = store::MemoryStore::new();
        let viewer = user(&store, "viewer").await;
        let a = user(&store, "a").await;
        let b = user(&store, "b").await;
        // A: t1 < t2 < t3, B: t4 < t5 with t1 < t4 < t2.
        article(&store, &a, "a1", "x", 10).await;
        article(&store, &a, "a2", "x", 30).await;
        article(&store, &a, "a3", "x", 40).await;
        article(&store, &b, "b4", "x", 20).await;
        article(&store, &b, "b5", "x", 50).await;
        for author in [&a, &b] {
            store
                .add_to_set(viewer.id, UserSet::Following, author.id)
                .await
                .unwrap();
        }

        let page = following(&store, viewer.id, 1).await.unwrap();
        assert_eq!(titles(&page), vec!["b5", "a3", "a2", "b4", "a1"]);
        assert!(following(&store, viewer.id, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_following_feed_slices_after_merge() {
        let store = store::MemoryStore::new();
        let viewer = user(&store, "viewer").await;
        let a = user(&store, "a").await;
        let b = user(&store, "b").await;
        for minute in 0..4 {
            article(&store, &a, &format!("a{minute}"), "x", minute * 2).await;
            article(&store, &b, &format!("b{minute}"), "x", minute * 2 + 1).await;
        }
        store.add_to_set(viewer.id, UserSet::Following, a.id).await.unwrap();
        store.add_to_set(viewer.id, UserSet::Following, b.id).await.unwrap();

        let first = following(&store, viewer.id, 1).await.unwrap();
        assert_eq!(titles(&first), vec!["b3", "a3", "b2", "a2", "b1"]);
        let second = following(&store, viewer.id, 2).await.unwrap();
        assert_eq!(titles(&second), vec!["a1", "b0", "a0"]);
    }

    #[tokio::test]
    async fn test_following_feed_unknown_viewer() {
        let store = store::MemoryStore::new();
        assert_eq!(
            following(&store, Uuid::new_v4(), 1).await,
            Err(ApiError::user_not_found())
        );
    }

    #[tokio::test]
    async fn test_merge_keeps_concatenation_order_on_ties() {
        let store = store::MemoryStore::new();
        let a = user(&store, "a").await;
        let first = article(&store, &a, "first", "x", 5).await;
        let second = article(&store, &a, "second", "x", 5).await;
        let newer = article(&store, &a, "newer", "x", 6).await;

        let merged = merge_newest_first(vec![vec![first], vec![second, newer]]);
        assert_eq!(titles(&merged), vec!["newer", "first", "second"]);
    }
}
