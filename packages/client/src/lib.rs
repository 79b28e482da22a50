//! Typed HTTP client for the blog server.
//!
//! [`BlogClient`] keeps the session cookie in its own cookie store, so a
//! successful [`BlogClient::sign_up`] or [`BlogClient::sign_in`] authorizes
//! every later call made through the same client. Failures carry the status
//! code and the server's `{"error": ...}` message.

use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode, Url,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use store::{Article, Comment, UserInfo};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub mod pager;

pub use pager::{Feed, FeedPager};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("{message} ({status})")]
    Api { status: StatusCode, message: String },
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::InvalidUrl(_) => None,
            ClientError::Http(e) => e.status(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            ClientError::InvalidUrl(_) | ClientError::Http(_) => self.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
}

/// Article fields for create and edit. The image, when present, is sent as
/// the `image` part of a multipart form.
#[derive(Debug, Clone, Default)]
pub struct ArticleInput {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub image: Option<ImageFile>,
}

#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: UserInfo,
    pub is_me: bool,
    pub is_following: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub article: Article,
    pub is_my: bool,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub articles: Vec<Article>,
    pub count: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct UserReply {
    user: UserInfo,
}

#[derive(Deserialize)]
struct ArticleReply {
    article: Article,
}

#[derive(Deserialize)]
struct LikesReply {
    likes: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentReply {
    new_comment: Comment,
}

#[derive(Clone, Debug)]
pub struct BlogClient {
    http: Client,
    base_url: Url,
}

impl BlogClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self { http, base_url })
    }

    /// Endpoint URL built from path segments. Each segment is percent-encoded,
    /// so user-supplied names cannot reach another route.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        debug!(%status, %message, "Request rejected");
        Err(ClientError::Api { status, message })
    }

    async fn get<T: DeserializeOwned>(&self, path: &[&str], query: &[(&str, String)]) -> ClientResult<T> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        Self::read(response).await
    }

    async fn get_page<T: DeserializeOwned>(&self, path: &[&str], page: u64) -> ClientResult<T> {
        self.get(path, &[("page", page.to_string())]).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &[&str]) -> ClientResult<T> {
        Self::read(self.http.post(self.url(path)).send().await?).await
    }

    async fn post_json<B, T>(&self, path: &[&str], body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Self::read(self.http.post(self.url(path)).json(body).send().await?).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &[&str]) -> ClientResult<T> {
        Self::read(self.http.delete(self.url(path)).send().await?).await
    }

    pub async fn health(&self) -> ClientResult<()> {
        let _: Value = self.get(&["message"], &[]).await?;
        Ok(())
    }

    pub async fn sign_up(&self, account: &NewAccount) -> ClientResult<UserInfo> {
        let reply: UserReply = self.post_json(&["user", "signup"], account).await?;
        Ok(reply.user)
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> ClientResult<UserInfo> {
        let body = json!({ "username": username, "password": password });
        let reply: UserReply = self.post_json(&["user", "signin"], &body).await?;
        Ok(reply.user)
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        let _: Value = self.get(&["user", "signout"], &[]).await?;
        Ok(())
    }

    /// The signed-in user. Also refreshes the session cookie.
    pub async fn me(&self) -> ClientResult<UserInfo> {
        self.get(&["user", "me"], &[]).await
    }

    pub async fn profile(&self, username: &str) -> ClientResult<Profile> {
        self.get(&["user", username], &[]).await
    }

    pub async fn follow(&self, username: &str) -> ClientResult<()> {
        let _: Value = self.post(&["user", "follow", username]).await?;
        Ok(())
    }

    pub async fn unfollow(&self, username: &str) -> ClientResult<()> {
        let _: Value = self.post(&["user", "unfollow", username]).await?;
        Ok(())
    }

    pub async fn delete_account(&self) -> ClientResult<()> {
        let _: Value = self.delete(&["user"]).await?;
        Ok(())
    }

    fn article_form(input: &ArticleInput) -> Form {
        let mut form = Form::new()
            .text("title", input.title.clone())
            .text("description", input.description.clone())
            .text("content", input.content.clone())
            .text("category", input.category.clone());
        if let Some(image) = &input.image {
            let part = Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
            form = form.part("image", part);
        }
        form
    }

    pub async fn create_article(&self, input: &ArticleInput) -> ClientResult<Article> {
        let form = Self::article_form(input);
        let response = self.http.post(self.url(&["article"])).multipart(form).send().await?;
        let reply: ArticleReply = Self::read(response).await?;
        Ok(reply.article)
    }

    pub async fn edit_article(&self, id: Uuid, input: &ArticleInput) -> ClientResult<Article> {
        let form = Self::article_form(input);
        let response = self
            .http
            .patch(self.url(&["article", &id.to_string()]))
            .multipart(form)
            .send()
            .await?;
        let reply: ArticleReply = Self::read(response).await?;
        Ok(reply.article)
    }

    pub async fn delete_article(&self, id: Uuid) -> ClientResult<()> {
        let _: Value = self.delete(&["article", &id.to_string()]).await?;
        Ok(())
    }

    pub async fn article(&self, id: Uuid) -> ClientResult<ArticleView> {
        self.get(&["article", &id.to_string()], &[]).await
    }

    pub async fn global_feed(&self, page: u64) -> ClientResult<Vec<Article>> {
        self.get_page(&["articles"], page).await
    }

    pub async fn following_feed(&self, page: u64) -> ClientResult<Vec<Article>> {
        self.get_page(&["articles", "following"], page).await
    }

    pub async fn my_feed(&self, page: u64) -> ClientResult<Vec<Article>> {
        self.get_page(&["articles", "my"], page).await
    }

    pub async fn author_feed(&self, username: &str, page: u64) -> ClientResult<Vec<Article>> {
        self.get_page(&["articles", username], page).await
    }

    pub async fn category_feed(&self, category: &str, page: u64) -> ClientResult<Vec<Article>> {
        self.get_page(&["articles", "category", category], page).await
    }

    pub async fn search(&self, query: &str, page: u64) -> ClientResult<SearchPage> {
        self.get(
            &["articles", "search"],
            &[("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }

    /// Like an article, returning its new like count.
    pub async fn like(&self, id: Uuid) -> ClientResult<i64> {
        let reply: LikesReply = self.post(&["article", "like", &id.to_string()]).await?;
        Ok(reply.likes)
    }

    pub async fn unlike(&self, id: Uuid) -> ClientResult<i64> {
        let reply: LikesReply = self.post(&["article", "unlike", &id.to_string()]).await?;
        Ok(reply.likes)
    }

    pub async fn comment(&self, id: Uuid, text: &str) -> ClientResult<Comment> {
        let reply: CommentReply = self
            .post_json(&["article", "comment", &id.to_string()], &json!({ "text": text }))
            .await?;
        Ok(reply.new_comment)
    }

    /// Comments of an article, newest first.
    pub async fn comments(&self, id: Uuid) -> ClientResult<Vec<Comment>> {
        self.get(&["article", &id.to_string(), "comments"], &[]).await
    }

    pub async fn delete_comment(&self, article_id: Uuid, comment_id: Uuid) -> ClientResult<()> {
        let article_id = article_id.to_string();
        let comment_id = comment_id.to_string();
        let _: Value = self
            .delete(&["article", &article_id, "comments", "delete", &comment_id])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_from_base() {
        let client = BlogClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.url(&["articles"]).as_str(), "http://localhost:8080/articles");
        let nested = BlogClient::new("http://localhost:8080/blog/").unwrap();
        assert_eq!(
            nested.url(&["user", "me"]).as_str(),
            "http://localhost:8080/blog/user/me"
        );
        assert!(matches!(
            BlogClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let client = BlogClient::new("http://localhost:8080").unwrap();
        assert_eq!(
            client.url(&["user", "a/b?c#d"]).as_str(),
            "http://localhost:8080/user/a%2Fb%3Fc%23d"
        );
        assert_eq!(
            client.url(&["articles", "category", "art & design"]).as_str(),
            "http://localhost:8080/articles/category/art%20&%20design"
        );
    }

    #[test]
    fn test_new_account_uses_camel_case() {
        let body = serde_json::to_value(NewAccount {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            username: "ada".into(),
            password: "pw".into(),
        })
        .unwrap();
        assert_eq!(body["firstName"], "Ada");
        assert_eq!(body["lastName"], "Lovelace");
    }

    #[test]
    fn test_error_status() {
        let error = ClientError::Api {
            status: StatusCode::CONFLICT,
            message: "Username is already taken".into(),
        };
        assert_eq!(error.status(), Some(StatusCode::CONFLICT));
        assert_eq!(error.message(), "Username is already taken");
        assert_eq!(error.to_string(), "Username is already taken (409 Conflict)");
    }
}
