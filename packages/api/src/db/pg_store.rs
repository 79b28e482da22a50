use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use store::{
    Article, ArticleFields, ArticleFilter, AuthorSnapshot, Comment, DocumentStore, LikeChange,
    ProfileFields, StoreError, StoreResult, User, UserSet, Window,
};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, first_name, last_name, username, password, avatar, my_articles, \
     liked_articles, followers, following, created_at, updated_at";

const ARTICLE_COLUMNS: &str = "id, author_id, author_username, author_first_name, author_last_name, \
     author_avatar, title, description, content, category, image, reading_time, likes, comments, \
     created_at, updated_at";

const COMMENT_COLUMNS: &str = "id, author_id, author_username, author_first_name, author_last_name, \
     author_avatar, article_id, text, created_at";

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate("username"),
        _ => backend(e),
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    username: String,
    password: String,
    avatar: Option<String>,
    my_articles: Vec<Uuid>,
    liked_articles: Vec<Uuid>,
    followers: Vec<Uuid>,
    following: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            username: row.username,
            password: row.password,
            avatar: row.avatar,
            my_articles: row.my_articles,
            liked_articles: row.liked_articles,
            followers: row.followers,
            following: row.following,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ArticleRow {
    id: Uuid,
    author_id: Uuid,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    author_avatar: Option<String>,
    title: String,
    description: String,
    content: String,
    category: String,
    image: Option<String>,
    reading_time: String,
    likes: i64,
    comments: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            author: AuthorSnapshot {
                author_id: row.author_id,
                author_username: row.author_username,
                author_first_name: row.author_first_name,
                author_last_name: row.author_last_name,
                author_avatar: row.author_avatar,
            },
            title: row.title,
            description: row.description,
            content: row.content,
            category: row.category,
            image: row.image,
            reading_time: row.reading_time,
            likes: row.likes,
            comments: row.comments,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: Uuid,
    author_id: Uuid,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    author_avatar: Option<String>,
    article_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            author: AuthorSnapshot {
                author_id: row.author_id,
                author_username: row.author_username,
                author_first_name: row.author_first_name,
                author_last_name: row.author_last_name,
                author_avatar: row.author_avatar,
            },
            article_id: row.article_id,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

/// `LIMIT`/`OFFSET` binds for a window, `None` when the offset is past
/// anything Postgres can address.
fn limit_offset(window: Window) -> Option<(i64, i64)> {
    let offset = i64::try_from(window.skip).ok()?;
    let limit = i64::try_from(window.limit).unwrap_or(i64::MAX);
    Some((limit, offset))
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    query.push(" WHERE ");
    match filter {
        ArticleFilter::All => {
            query.push("TRUE");
        }
        ArticleFilter::Author(id) => {
            query.push("author_id = ").push_bind(*id);
        }
        ArticleFilter::AuthorUsername(username) => {
            query.push("author_username = ").push_bind(username.clone());
        }
        ArticleFilter::Category(category) => {
            query.push("category = ").push_bind(category.clone());
        }
        ArticleFilter::TitleContains(needle) => {
            query
                .push("strpos(lower(title), lower(")
                .push_bind(needle.clone())
                .push(")) > 0");
        }
    }
}

/// [`DocumentStore`] over Postgres.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.avatar)
        .bind(&user.my_articles)
        .bind(&user.liked_articles)
        .bind(&user.followers)
        .bind(&user.following)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;
        Ok(())
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(row.map(User::from))
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(row.map(User::from))
    }

    async fn update_profile(&self, id: Uuid, fields: &ProfileFields) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET first_name = $2, last_name = $3, username = $4, avatar = $5, \
             updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.username)
        .bind(&fields.avatar)
        .fetch_optional(&self.pool)
        .await
        .map_err(insert_error)?;
        Ok(row.map(User::from))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(User::from))
    }

    async fn add_to_set(&self, user_id: Uuid, set: UserSet, value: Uuid) -> StoreResult<bool> {
        let column = set.column();
        let result = sqlx::query(&format!(
            "UPDATE users SET {column} = array_append({column}, $2), updated_at = now() \
             WHERE id = $1 AND NOT ($2 = ANY({column}))"
        ))
        .bind(user_id)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn pull_from_set(&self, user_id: Uuid, set: UserSet, value: Uuid) -> StoreResult<bool> {
        let column = set.column();
        let result = sqlx::query(&format!(
            "UPDATE users SET {column} = array_remove({column}, $2), updated_at = now() \
             WHERE id = $1 AND $2 = ANY({column})"
        ))
        .bind(user_id)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn pull_from_all_users(&self, set: UserSet, value: Uuid) -> StoreResult<u64> {
        let column = set.column();
        let result = sqlx::query(&format!(
            "UPDATE users SET {column} = array_remove({column}, $1), updated_at = now() \
             WHERE $1 = ANY({column})"
        ))
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected())
    }

    /// One statement: the user update only matches when the liked-set is not
    /// already in the requested state, and the counter update only runs when
    /// the user update returned a row.
    async fn set_like(&self, user_id: Uuid, article_id: Uuid, liked: bool) -> StoreResult<LikeChange> {
        let (article_exists, user_exists, likes): (bool, bool, Option<i64>) = sqlx::query_as(
            "WITH target AS (SELECT id FROM articles WHERE id = $2), \
             viewer AS (SELECT id FROM users WHERE id = $1), \
             changed AS ( \
                 UPDATE users u SET liked_articles = CASE WHEN $3 \
                     THEN array_append(u.liked_articles, $2) \
                     ELSE array_remove(u.liked_articles, $2) END \
                 FROM target \
                 WHERE u.id = $1 AND ($2 = ANY(u.liked_articles)) <> $3 \
                 RETURNING u.id \
             ), \
             counted AS ( \
                 UPDATE articles a SET likes = CASE WHEN $3 \
                     THEN a.likes + 1 \
                     ELSE GREATEST(a.likes - 1, 0) END \
                 FROM changed \
                 WHERE a.id = $2 \
                 RETURNING a.likes \
             ) \
             SELECT EXISTS (SELECT 1 FROM target), \
                    EXISTS (SELECT 1 FROM viewer), \
                    (SELECT likes FROM counted)",
        )
        .bind(user_id)
        .bind(article_id)
        .bind(liked)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(match (article_exists, user_exists, likes) {
            (false, _, _) => LikeChange::ArticleMissing,
            (_, false, _) => LikeChange::UserMissing,
            (_, _, Some(likes)) => LikeChange::Applied { likes },
            (_, _, None) => LikeChange::Unchanged,
        })
    }

    async fn release_like(&self, article_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE articles SET likes = GREATEST(likes - 1, 0) WHERE id = $1")
            .bind(article_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_article(&self, article: &Article) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO articles ({ARTICLE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        ))
        .bind(article.id)
        .bind(article.author.author_id)
        .bind(&article.author.author_username)
        .bind(&article.author.author_first_name)
        .bind(&article.author.author_last_name)
        .bind(&article.author.author_avatar)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.content)
        .bind(&article.category)
        .bind(&article.image)
        .bind(&article.reading_time)
        .bind(article.likes)
        .bind(&article.comments)
        .bind(article.created_at)
        .bind(article.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn article(&self, id: Uuid) -> StoreResult<Option<Article>> {
        let row: Option<ArticleRow> =
            sqlx::query_as(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(row.map(Article::from))
    }

    async fn update_article(&self, id: Uuid, fields: &ArticleFields) -> StoreResult<Option<Article>> {
        let row: Option<ArticleRow> = sqlx::query_as(&format!(
            "UPDATE articles SET title = $2, description = $3, content = $4, category = $5, \
             image = $6, reading_time = $7, updated_at = now() \
             WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.content)
        .bind(&fields.category)
        .bind(&fields.image)
        .bind(&fields.reading_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Article::from))
    }

    async fn delete_article(&self, id: Uuid) -> StoreResult<Option<Article>> {
        let row: Option<ArticleRow> = sqlx::query_as(&format!(
            "DELETE FROM articles WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Article::from))
    }

    async fn find_articles(
        &self,
        filter: &ArticleFilter,
        window: Option<Window>,
    ) -> StoreResult<Vec<Article>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {ARTICLE_COLUMNS} FROM articles"));
        push_filter(&mut query, filter);
        query.push(" ORDER BY created_at DESC, seq ASC");
        if let Some(window) = window {
            let Some((limit, offset)) = limit_offset(window) else {
                return Ok(Vec::new());
            };
            query
                .push(" LIMIT ")
                .push_bind(limit)
                .push(" OFFSET ")
                .push_bind(offset);
        }
        let rows: Vec<ArticleRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn count_articles(&self, filter: &ArticleFilter) -> StoreResult<u64> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM articles");
        push_filter(&mut query, filter);
        let (count,): (i64,) = query
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn rewrite_author(&self, snapshot: &AuthorSnapshot) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let mut touched = 0;
        for table in ["articles", "comments"] {
            let result = sqlx::query(&format!(
                "UPDATE {table} SET author_username = $2, author_first_name = $3, \
                 author_last_name = $4, author_avatar = $5 WHERE author_id = $1"
            ))
            .bind(snapshot.author_id)
            .bind(&snapshot.author_username)
            .bind(&snapshot.author_first_name)
            .bind(&snapshot.author_last_name)
            .bind(&snapshot.author_avatar)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
            touched += result.rows_affected();
        }
        tx.commit().await.map_err(backend)?;
        Ok(touched)
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(comment.id)
        .bind(comment.author.author_id)
        .bind(&comment.author.author_username)
        .bind(&comment.author.author_first_name)
        .bind(&comment.author.author_last_name)
        .bind(&comment.author.author_avatar)
        .bind(comment.article_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let row: Option<CommentRow> =
            sqlx::query_as(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(row.map(Comment::from))
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let row: Option<CommentRow> = sqlx::query_as(&format!(
            "DELETE FROM comments WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Comment::from))
    }

    async fn comments(&self, ids: &[Uuid]) -> StoreResult<Vec<Comment>> {
        let rows: Vec<CommentRow> =
            sqlx::query_as(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ANY($1)"))
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
        let mut by_id: HashMap<Uuid, Comment> = rows
            .into_iter()
            .map(|row| (row.id, Comment::from(row)))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn delete_article_comments(&self, article_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE article_id = $1")
            .bind(article_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn delete_author_comments(&self, author_id: Uuid) -> StoreResult<Vec<Comment>> {
        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "DELETE FROM comments WHERE author_id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn push_comment(&self, article_id: Uuid, comment_id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE articles SET comments = array_append(comments, $2) WHERE id = $1")
                .bind(article_id)
                .bind(comment_id)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn pull_comment(&self, article_id: Uuid, comment_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE articles SET comments = array_remove(comments, $2) \
             WHERE id = $1 AND $2 = ANY(comments)",
        )
        .bind(article_id)
        .bind(comment_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}
