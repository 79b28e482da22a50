use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Article, AuthorSnapshot, Comment, User};
use crate::query::{ArticleFilter, UserSet, Window};
use crate::repo::{
    ArticleFields, DocumentStore, LikeChange, ProfileFields, StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct Collections {
    users: Vec<User>,
    articles: Vec<Article>,
    comments: Vec<Comment>,
}

impl Collections {
    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn article_mut(&mut self, id: Uuid) -> Option<&mut Article> {
        self.articles.iter_mut().find(|a| a.id == id)
    }
}

fn set_of(user: &mut User, set: UserSet) -> &mut Vec<Uuid> {
    match set {
        UserSet::MyArticles => &mut user.my_articles,
        UserSet::LikedArticles => &mut user.liked_articles,
        UserSet::Followers => &mut user.followers,
        UserSet::Following => &mut user.following,
    }
}

fn pull(values: &mut Vec<Uuid>, value: Uuid) -> bool {
    let before = values.len();
    values.retain(|v| *v != value);
    values.len() != before
}

/// In-memory DocumentStore for tests and local runs.
///
/// A single mutex guards all three collections, so every trait method is
/// atomic with respect to every other.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Backend(format!("memory store poisoned: {e}")))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut db = self.lock()?;
        if db.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username"));
        }
        db.users.push(user.clone());
        Ok(())
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_profile(&self, id: Uuid, fields: &ProfileFields) -> StoreResult<Option<User>> {
        let mut db = self.lock()?;
        if db
            .users
            .iter()
            .any(|u| u.id != id && u.username == fields.username)
        {
            return Err(StoreError::Duplicate("username"));
        }
        let Some(user) = db.user_mut(id) else {
            return Ok(None);
        };
        user.first_name = fields.first_name.clone();
        user.last_name = fields.last_name.clone();
        user.username = fields.username.clone();
        user.avatar = fields.avatar.clone();
        user.updated_at = chrono::Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut db = self.lock()?;
        let position = db.users.iter().position(|u| u.id == id);
        Ok(position.map(|i| db.users.remove(i)))
    }

    async fn add_to_set(&self, user_id: Uuid, set: UserSet, value: Uuid) -> StoreResult<bool> {
        let mut db = self.lock()?;
        let Some(user) = db.user_mut(user_id) else {
            return Ok(false);
        };
        let values = set_of(user, set);
        if values.contains(&value) {
            return Ok(false);
        }
        values.push(value);
        Ok(true)
    }

    async fn pull_from_set(&self, user_id: Uuid, set: UserSet, value: Uuid) -> StoreResult<bool> {
        let mut db = self.lock()?;
        Ok(db
            .user_mut(user_id)
            .map(|user| pull(set_of(user, set), value))
            .unwrap_or(false))
    }

    async fn pull_from_all_users(&self, set: UserSet, value: Uuid) -> StoreResult<u64> {
        let mut db = self.lock()?;
        let changed = db
            .users
            .iter_mut()
            .filter_map(|user| pull(set_of(user, set), value).then_some(()))
            .count();
        Ok(changed as u64)
    }

    async fn set_like(&self, user_id: Uuid, article_id: Uuid, liked: bool) -> StoreResult<LikeChange> {
        let mut db = self.lock()?;
        if !db.articles.iter().any(|a| a.id == article_id) {
            return Ok(LikeChange::ArticleMissing);
        }
        let Some(user) = db.user_mut(user_id) else {
            return Ok(LikeChange::UserMissing);
        };
        if user.has_liked(article_id) == liked {
            return Ok(LikeChange::Unchanged);
        }
        if liked {
            user.liked_articles.push(article_id);
        } else {
            pull(&mut user.liked_articles, article_id);
        }
        let Some(article) = db.article_mut(article_id) else {
            return Ok(LikeChange::ArticleMissing);
        };
        article.likes = if liked {
            article.likes + 1
        } else {
            (article.likes - 1).max(0)
        };
        Ok(LikeChange::Applied {
            likes: article.likes,
        })
    }

    async fn release_like(&self, article_id: Uuid) -> StoreResult<bool> {
        let mut db = self.lock()?;
        let Some(article) = db.article_mut(article_id) else {
            return Ok(false);
        };
        article.likes = (article.likes - 1).max(0);
        Ok(true)
    }

    async fn insert_article(&self, article: &Article) -> StoreResult<()> {
        self.lock()?.articles.push(article.clone());
        Ok(())
    }

    async fn article(&self, id: Uuid) -> StoreResult<Option<Article>> {
        Ok(self.lock()?.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn update_article(&self, id: Uuid, fields: &ArticleFields) -> StoreResult<Option<Article>> {
        let mut db = self.lock()?;
        let Some(article) = db.article_mut(id) else {
            return Ok(None);
        };
        article.title = fields.title.clone();
        article.description = fields.description.clone();
        article.content = fields.content.clone();
        article.category = fields.category.clone();
        article.image = fields.image.clone();
        article.reading_time = fields.reading_time.clone();
        article.updated_at = chrono::Utc::now();
        Ok(Some(article.clone()))
    }

    async fn delete_article(&self, id: Uuid) -> StoreResult<Option<Article>> {
        let mut db = self.lock()?;
        let position = db.articles.iter().position(|a| a.id == id);
        Ok(position.map(|i| db.articles.remove(i)))
    }

    async fn find_articles(
        &self,
        filter: &ArticleFilter,
        window: Option<Window>,
    ) -> StoreResult<Vec<Article>> {
        let mut found: Vec<Article> = self
            .lock()?
            .articles
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(match window {
            Some(window) => window.slice(found),
            None => found,
        })
    }

    async fn count_articles(&self, filter: &ArticleFilter) -> StoreResult<u64> {
        Ok(self
            .lock()?
            .articles
            .iter()
            .filter(|a| filter.matches(a))
            .count() as u64)
    }

    async fn rewrite_author(&self, snapshot: &AuthorSnapshot) -> StoreResult<u64> {
        let mut db = self.lock()?;
        let mut touched = 0;
        for article in db
            .articles
            .iter_mut()
            .filter(|a| a.author.author_id == snapshot.author_id)
        {
            article.author = snapshot.clone();
            touched += 1;
        }
        for comment in db
            .comments
            .iter_mut()
            .filter(|c| c.author.author_id == snapshot.author_id)
        {
            comment.author = snapshot.clone();
            touched += 1;
        }
        Ok(touched)
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.lock()?.comments.push(comment.clone());
        Ok(())
    }

    async fn comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.lock()?.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let mut db = self.lock()?;
        let position = db.comments.iter().position(|c| c.id == id);
        Ok(position.map(|i| db.comments.remove(i)))
    }

    async fn comments(&self, ids: &[Uuid]) -> StoreResult<Vec<Comment>> {
        let db = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| db.comments.iter().find(|c| c.id == *id).cloned())
            .collect())
    }

    async fn delete_article_comments(&self, article_id: Uuid) -> StoreResult<u64> {
        let mut db = self.lock()?;
        let before = db.comments.len();
        db.comments.retain(|c| c.article_id != article_id);
        Ok((before - db.comments.len()) as u64)
    }

    async fn delete_author_comments(&self, author_id: Uuid) -> StoreResult<Vec<Comment>> {
        let mut db = self.lock()?;
        let (removed, kept): (Vec<Comment>, Vec<Comment>) = std::mem::take(&mut db.comments)
            .into_iter()
            .partition(|c| c.author.author_id == author_id);
        db.comments = kept;
        Ok(removed)
    }

    async fn push_comment(&self, article_id: Uuid, comment_id: Uuid) -> StoreResult<bool> {
        let mut db = self.lock()?;
        let Some(article) = db.article_mut(article_id) else {
            return Ok(false);
        };
        article.comments.push(comment_id);
        Ok(true)
    }

    async fn pull_comment(&self, article_id: Uuid, comment_id: Uuid) -> StoreResult<bool> {
        let mut db = self.lock()?;
        Ok(db
            .article_mut(article_id)
            .map(|article| pull(&mut article.comments, comment_id))
            .unwrap_or(false))
    }
}
