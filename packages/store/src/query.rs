//! # Query vocabulary for the document store
//!
//! The store is only ever asked simple questions: one predicate over articles,
//! a fixed `createdAt` descending order, and an optional skip/limit window.
//! [`ArticleFilter`] is that predicate, [`Window`] is the window, and
//! [`UserSet`] names the id arrays on a user document that support atomic
//! add-to-set / pull updates.

use uuid::Uuid;

use crate::models::Article;

/// Number of articles in one feed page.
pub const PAGE_SIZE: u64 = 5;

/// Predicate applied to the article collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleFilter {
    All,
    /// `authorId == id`
    Author(Uuid),
    /// `authorUsername == username`
    AuthorUsername(String),
    /// `category == category`
    Category(String),
    /// Case-insensitive substring match on `title`.
    TitleContains(String),
}

impl ArticleFilter {
    pub fn matches(&self, article: &Article) -> bool {
        match self {
            ArticleFilter::All => true,
            ArticleFilter::Author(id) => article.author.author_id == *id,
            ArticleFilter::AuthorUsername(username) => article.author.author_username == *username,
            ArticleFilter::Category(category) => article.category == *category,
            ArticleFilter::TitleContains(needle) => article
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

/// Skip/limit window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: u64,
}

impl Window {
    /// Window for a 1-based page of [`PAGE_SIZE`] items. Pages too far out to
    /// address skip everything.
    pub fn page(page: u64) -> Self {
        Self {
            skip: page
                .saturating_sub(1)
                .checked_mul(PAGE_SIZE)
                .unwrap_or(u64::MAX),
            limit: PAGE_SIZE,
        }
    }

    /// Apply the window to an already ordered vector.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(self.skip).unwrap_or(usize::MAX))
            .take(usize::try_from(self.limit).unwrap_or(usize::MAX))
            .collect()
    }
}

/// Id arrays on a user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSet {
    MyArticles,
    LikedArticles,
    Followers,
    Following,
}

impl UserSet {
    /// Column name used by the Postgres backend.
    pub fn column(&self) -> &'static str {
        match self {
            UserSet::MyArticles => "my_articles",
            UserSet::LikedArticles => "liked_articles",
            UserSet::Followers => "followers",
            UserSet::Following => "following",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        assert_eq!(Window::page(1), Window { skip: 0, limit: 5 });
        assert_eq!(Window::page(3), Window { skip: 10, limit: 5 });
    }

    #[test]
    fn test_slice_past_end_is_empty() {
        let items: Vec<u32> = (0..7).collect();
        assert_eq!(Window::page(2).slice(items.clone()), vec![5, 6]);
        assert!(Window::page(3).slice(items).is_empty());
    }

    #[test]
    fn test_huge_page_skips_everything() {
        assert_eq!(Window::page(u64::MAX).skip, u64::MAX);
        assert_eq!(Window::page(3689348814741910325).skip, u64::MAX);
        let items: Vec<u32> = (0..7).collect();
        assert!(Window::page(u64::MAX).slice(items).is_empty());
    }
}
