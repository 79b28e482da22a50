//! # DocumentStore: the persistence seam of the blog
//!
//! Every domain operation reads and writes through the [`DocumentStore`] trait,
//! so the same feed and engagement logic runs against the in-memory
//! [`crate::MemoryStore`] (tests, local runs) and the Postgres store in the
//! `api` crate.
//!
//! The trait deliberately mirrors what a document database offers:
//!
//! | Group | Operations |
//! |-------|-----------|
//! | Users | lookup by id / username, insert (unique username), profile update, delete |
//! | Sets | atomic add-to-set / pull on a user's id arrays ([`UserSet`]), bulk pull across all users |
//! | Likes | [`set_like`](DocumentStore::set_like): membership check, set update and counter change as one atomic step |
//! | Articles | insert, lookup, field update, delete, filtered listing ordered by `createdAt` desc with an optional [`Window`], count |
//! | Comments | insert, lookup, delete, ordered lookup by ids, per-article cleanup, push/pull on the article's comment list |
//! | Snapshots | [`rewrite_author`](DocumentStore::rewrite_author) bulk-updates the denormalized author on articles and comments |
//!
//! There are no multi-document transactions. Callers compose these steps and
//! accept that a failure between two of them leaves the documents out of sync.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Article, AuthorSnapshot, Comment, User};
use crate::query::{ArticleFilter, UserSet, Window};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique field `{0}`")]
    Duplicate(&'static str),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a conditional like/unlike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeChange {
    /// The liked-set and the counter were both updated.
    Applied { likes: i64 },
    /// The liked-set was already in the requested state; nothing changed.
    Unchanged,
    ArticleMissing,
    UserMissing,
}

/// Profile fields replaced by an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileFields {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub avatar: Option<String>,
}

/// Article fields replaced by an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleFields {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub image: Option<String>,
    pub reading_time: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the username is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Returns the updated user, or `None` if it does not exist.
    async fn update_profile(&self, id: Uuid, fields: &ProfileFields) -> StoreResult<Option<User>>;

    /// Returns the removed user.
    async fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Add `value` to the set unless already present. `true` if the set changed.
    async fn add_to_set(&self, user_id: Uuid, set: UserSet, value: Uuid) -> StoreResult<bool>;

    /// Remove `value` from the set. `true` if the set changed.
    async fn pull_from_set(&self, user_id: Uuid, set: UserSet, value: Uuid) -> StoreResult<bool>;

    /// Remove `value` from the set on every user. Returns the number of users changed.
    async fn pull_from_all_users(&self, set: UserSet, value: Uuid) -> StoreResult<u64>;

    /// Like (`liked = true`) or unlike an article.
    ///
    /// Only when the user's liked-set is *not* already in the requested state is
    /// the article id added/removed and the counter moved by one. The counter
    /// never drops below zero.
    async fn set_like(&self, user_id: Uuid, article_id: Uuid, liked: bool) -> StoreResult<LikeChange>;

    /// Take one like off the counter without touching any liked-set, for
    /// likes whose user document is already gone. Clamped at zero; `false` if
    /// the article does not exist.
    async fn release_like(&self, article_id: Uuid) -> StoreResult<bool>;

    async fn insert_article(&self, article: &Article) -> StoreResult<()>;

    async fn article(&self, id: Uuid) -> StoreResult<Option<Article>>;

    async fn update_article(&self, id: Uuid, fields: &ArticleFields) -> StoreResult<Option<Article>>;

    async fn delete_article(&self, id: Uuid) -> StoreResult<Option<Article>>;

    /// Matching articles, newest first, optionally windowed.
    async fn find_articles(
        &self,
        filter: &ArticleFilter,
        window: Option<Window>,
    ) -> StoreResult<Vec<Article>>;

    async fn count_articles(&self, filter: &ArticleFilter) -> StoreResult<u64>;

    /// Rewrite the author snapshot on every article and comment by
    /// `snapshot.author_id`. Returns the number of documents touched.
    async fn rewrite_author(&self, snapshot: &AuthorSnapshot) -> StoreResult<u64>;

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()>;

    async fn comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;

    async fn delete_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;

    /// Comments for the given ids, in the same order; missing ids are skipped.
    async fn comments(&self, ids: &[Uuid]) -> StoreResult<Vec<Comment>>;

    async fn delete_article_comments(&self, article_id: Uuid) -> StoreResult<u64>;

    /// Remove every comment written by `author_id`, returning them.
    async fn delete_author_comments(&self, author_id: Uuid) -> StoreResult<Vec<Comment>>;

    /// Append a comment id to the article's list. `false` if the article is gone.
    async fn push_comment(&self, article_id: Uuid, comment_id: Uuid) -> StoreResult<bool>;

    async fn pull_comment(&self, article_id: Uuid, comment_id: Uuid) -> StoreResult<bool>;
}
