//! # Document models for users, articles and comments
//!
//! These are the three collections of the blog's document store. Field names
//! serialize in camelCase so the JSON returned by the HTTP layer keeps the shape
//! the browser client already reads (`authorUsername`, `likedArticles`, ...).
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`User`] | A full user document, including the password hash. Never serialized directly. |
//! | [`UserInfo`] | The public projection of a user (everything but the hash). |
//! | [`AuthorSnapshot`] | The denormalized copy of an author's identity stored on articles and comments. |
//! | [`Article`] | A published article with its like counter and ordered comment ids. |
//! | [`Comment`] | A comment on an article. |
//!
//! Snapshots are *copies*: editing a profile does not touch them unless the
//! profile edit explicitly rewrites them (see `DocumentStore::rewrite_author`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Full user document.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    /// Argon2 PHC string.
    pub password: String,
    pub avatar: Option<String>,
    /// Ids of articles written by this user, oldest first.
    pub my_articles: Vec<Uuid>,
    /// Never holds the same article twice.
    pub liked_articles: Vec<Uuid>,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh user with empty relation sets.
    pub fn new(
        first_name: String,
        last_name: String,
        username: String,
        password_hash: String,
        avatar: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            username,
            password: password_hash,
            avatar,
            my_articles: Vec::new(),
            liked_articles: Vec::new(),
            followers: Vec::new(),
            following: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Convert to the projection that is safe to send to clients.
    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            avatar: self.avatar.clone(),
            my_articles: self.my_articles.clone(),
            liked_articles: self.liked_articles.clone(),
            followers: self.followers.clone(),
            following: self.following.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// The identity copied onto articles and comments this user writes.
    pub fn snapshot(&self) -> AuthorSnapshot {
        AuthorSnapshot {
            author_id: self.id,
            author_username: self.username.clone(),
            author_first_name: self.first_name.clone(),
            author_last_name: self.last_name.clone(),
            author_avatar: self.avatar.clone(),
        }
    }

    pub fn has_liked(&self, article_id: Uuid) -> bool {
        self.liked_articles.contains(&article_id)
    }

    pub fn is_followed_by(&self, user_id: Uuid) -> bool {
        self.followers.contains(&user_id)
    }
}

/// User information safe to send to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub avatar: Option<String>,
    pub my_articles: Vec<Uuid>,
    pub liked_articles: Vec<Uuid>,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized author identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSnapshot {
    pub author_id: Uuid,
    pub author_username: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    #[serde(flatten)]
    pub author: AuthorSnapshot,
    pub title: String,
    pub description: String,
    /// Rich text (HTML).
    pub content: String,
    /// Lowercase category slug.
    pub category: String,
    pub image: Option<String>,
    /// Derived from `content`, e.g. `"4 min read"`.
    pub reading_time: String,
    pub likes: i64,
    pub comments: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    #[serde(flatten)]
    pub author: AuthorSnapshot,
    pub article_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_omits_password() {
        let user = User::new(
            "Ada".into(),
            "Lovelace".into(),
            "ada".into(),
            "$argon2id$hash".into(),
            None,
        );
        let json = serde_json::to_string(&user.to_info()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"firstName\":\"Ada\""));
        assert!(json.contains("likedArticles"));
    }

    #[test]
    fn test_article_flattens_author() {
        let user = User::new("A".into(), "B".into(), "ab".into(), "h".into(), None);
        let now = Utc::now();
        let article = Article {
            id: Uuid::new_v4(),
            author: user.snapshot(),
            title: "Title".into(),
            description: "Description".into(),
            content: "<p>Body</p>".into(),
            category: "rust".into(),
            image: None,
            reading_time: "1 min read".into(),
            likes: 0,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["authorUsername"], "ab");
        assert_eq!(value["readingTime"], "1 min read");
        assert!(value.get("author").is_none());
    }

    #[test]
    fn test_snapshot_copies_identity() {
        let user = User::new(
            "Grace".into(),
            "Hopper".into(),
            "grace".into(),
            "hash".into(),
            Some("grace_1.png".into()),
        );
        let snapshot = user.snapshot();
        assert_eq!(snapshot.author_id, user.id);
        assert_eq!(snapshot.author_username, "grace");
        assert_eq!(snapshot.author_avatar.as_deref(), Some("grace_1.png"));
    }
}
