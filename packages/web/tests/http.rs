use std::sync::Arc;

use api::assets::MemoryAssets;
use api::auth::SessionCodec;
use api::Services;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use store::{ArticleFilter, DocumentStore, MemoryStore};
use tower::ServiceExt;
use web::{router, AppState};

const SECRET: &[u8] = b"test-secret";

struct TestApp {
    router: Router,
    store: MemoryStore,
    assets: MemoryAssets,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let services = Services::new(Arc::new(store.clone()), Arc::new(assets.clone()));
        let state = AppState::new(services, SessionCodec::new(SECRET), false);
        Self {
            router: router(state),
            store,
            assets,
        }
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            cookie,
            body,
        }
    }

    /// Sign up and return the `token=...` pair for later requests.
    async fn sign_up(&self, username: &str) -> String {
        let reply = self
            .send(json_request(
                "POST",
                "/user/signup",
                None,
                json!({
                    "firstName": "Test",
                    "lastName": "User",
                    "username": username,
                    "password": "secret",
                }),
            ))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        session_pair(&reply.cookie.unwrap())
    }

    async fn create_article(&self, cookie: &str, title: &str) -> String {
        let reply = self
            .send(json_request(
                "POST",
                "/article",
                Some(cookie),
                json!({
                    "title": title,
                    "description": "desc",
                    "content": "<p>words</p>",
                    "category": "Tech",
                }),
            ))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        reply.body["article"]["id"].as_str().unwrap().to_string()
    }
}

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

fn session_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let reply = app.send(empty_request("GET", "/message", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "message": "Ok" }));
}

#[tokio::test]
async fn test_gate_rejects_without_running_the_handler() {
    let app = TestApp::new();
    let expired = SessionCodec::new(SECRET)
        .with_ttl(chrono::Duration::seconds(-10))
        .issue(uuid::Uuid::new_v4())
        .unwrap();
    let cookies = [
        None,
        Some("token=garbage".to_string()),
        Some(format!("token={expired}")),
    ];

    for cookie in &cookies {
        let reply = app
            .send(json_request(
                "POST",
                "/article",
                cookie.as_deref(),
                json!({ "title": "t", "description": "d", "content": "c", "category": "x" }),
            ))
            .await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
        assert_eq!(reply.body, json!({ "error": "No access" }));

        let reply = app
            .send(empty_request("GET", "/articles/following", cookie.as_deref()))
            .await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
    }
    assert_eq!(app.store.count_articles(&ArticleFilter::All).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sign_up_sets_session_cookie() {
    let app = TestApp::new();
    let reply = app
        .send(json_request(
            "POST",
            "/user/signup",
            None,
            json!({ "firstName": "A", "lastName": "B", "username": "ab", "password": "pw" }),
        ))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let cookie = reply.cookie.unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=2592000"));
    assert_eq!(reply.body["user"]["username"], "ab");
    assert!(reply.body["user"].get("password").is_none());

    let me = app
        .send(empty_request("GET", "/user/me", Some(&session_pair(&cookie))))
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "ab");
    assert!(me.cookie.is_some());
}

#[tokio::test]
async fn test_duplicate_sign_up_is_a_conflict_without_session() {
    let app = TestApp::new();
    app.sign_up("taken").await;

    let reply = app
        .send(json_request(
            "POST",
            "/user/signup",
            None,
            json!({ "firstName": "A", "lastName": "B", "username": "taken", "password": "pw" }),
        ))
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body, json!({ "error": "Username is already taken" }));
    assert!(reply.cookie.is_none());
}

#[tokio::test]
async fn test_sign_up_with_missing_fields() {
    let app = TestApp::new();
    let reply = app
        .send(json_request(
            "POST",
            "/user/signup",
            None,
            json!({ "firstName": "A", "username": "ab", "password": "pw" }),
        ))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body, json!({ "error": "Data is incomplete" }));
}

#[tokio::test]
async fn test_sign_in_errors() {
    let app = TestApp::new();
    app.sign_up("ada").await;

    let unknown = app
        .send(json_request(
            "POST",
            "/user/signin",
            None,
            json!({ "username": "nobody", "password": "secret" }),
        ))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let wrong = app
        .send(json_request(
            "POST",
            "/user/signin",
            None,
            json!({ "username": "ada", "password": "nope" }),
        ))
        .await;
    assert_eq!(wrong.status, StatusCode::CONFLICT);
    assert!(wrong.cookie.is_none());

    let ok = app
        .send(json_request(
            "POST",
            "/user/signin",
            None,
            json!({ "username": "ada", "password": "secret" }),
        ))
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(ok.cookie.is_some());
}

#[tokio::test]
async fn test_sign_out_clears_cookie() {
    let app = TestApp::new();
    let cookie = app.sign_up("ada").await;
    let reply = app
        .send(empty_request("GET", "/user/signout", Some(&cookie)))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let cleared = reply.cookie.unwrap();
    assert!(cleared.starts_with("token=;"), "{cleared}");
}

#[tokio::test]
async fn test_page_parameter_validation() {
    let app = TestApp::new();
    for uri in ["/articles?page=0", "/articles?page=two", "/articles/search?query=a&page=-1"] {
        let reply = app.send(empty_request("GET", uri, None)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
    }
    let reply = app.send(empty_request("GET", "/articles", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!([]));
}

#[tokio::test]
async fn test_page_beyond_any_data_is_empty() {
    let app = TestApp::new();
    let alice = app.sign_up("alice").await;
    let bob = app.sign_up("bob").await;
    app.create_article(&alice, "Only post").await;
    app.send(empty_request("POST", "/user/follow/alice", Some(&bob)))
        .await;

    for page in ["18446744073709551615", "3689348814741910325"] {
        let global = app
            .send(empty_request("GET", &format!("/articles?page={page}"), None))
            .await;
        assert_eq!(global.status, StatusCode::OK);
        assert_eq!(global.body, json!([]));

        let following = app
            .send(empty_request(
                "GET",
                &format!("/articles/following?page={page}"),
                Some(&bob),
            ))
            .await;
        assert_eq!(following.status, StatusCode::OK);
        assert_eq!(following.body, json!([]));
    }
}

#[tokio::test]
async fn test_article_engagement_flow() {
    let app = TestApp::new();
    let author = app.sign_up("author").await;
    let reader = app.sign_up("reader").await;
    let id = app.create_article(&author, "First post").await;

    let like = app
        .send(empty_request("POST", &format!("/article/like/{id}"), Some(&reader)))
        .await;
    assert_eq!(like.status, StatusCode::OK);
    assert_eq!(like.body["likes"], 1);
    let again = app
        .send(empty_request("POST", &format!("/article/like/{id}"), Some(&reader)))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body, json!({ "error": "You cannot like article twice" }));

    let view = app
        .send(empty_request("GET", &format!("/article/{id}"), Some(&reader)))
        .await;
    assert_eq!(view.body["isLiked"], true);
    assert_eq!(view.body["isMy"], false);
    assert_eq!(view.body["article"]["category"], "tech");

    let blank = app
        .send(json_request(
            "POST",
            &format!("/article/comment/{id}"),
            Some(&reader),
            json!({ "text": "  " }),
        ))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let commented = app
        .send(json_request(
            "POST",
            &format!("/article/comment/{id}"),
            Some(&reader),
            json!({ "text": "Nice" }),
        ))
        .await;
    assert_eq!(commented.status, StatusCode::CREATED);
    let comment_id = commented.body["newComment"]["id"].as_str().unwrap().to_string();

    let listed = app
        .send(empty_request("GET", &format!("/article/{id}/comments"), None))
        .await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let path = format!("/article/{id}/comments/delete/{comment_id}");
    let foreign = app.send(empty_request("DELETE", &path, Some(&author))).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    let own = app.send(empty_request("DELETE", &path, Some(&reader))).await;
    assert_eq!(own.status, StatusCode::OK);

    let listed = app
        .send(empty_request("GET", &format!("/article/{id}/comments"), None))
        .await;
    assert_eq!(listed.body, json!([]));
}

#[tokio::test]
async fn test_unknown_article_id_is_not_found() {
    let app = TestApp::new();
    let reply = app
        .send(empty_request("GET", "/article/not-a-uuid", None))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_multipart_article_with_image() {
    let app = TestApp::new();
    let cookie = app.sign_up("author").await;

    let boundary = "XBOUNDARYX";
    let mut body = String::new();
    for (name, value) in [
        ("title", "With picture"),
        ("description", "desc"),
        ("content", "<p>hello world</p>"),
        ("category", "art"),
    ] {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"cover.png\"\r\n\
         Content-Type: image/png\r\n\r\nPNGDATA\r\n--{boundary}--\r\n"
    ));

    let request = Request::builder()
        .method("POST")
        .uri("/article")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::COOKIE, &cookie)
        .body(Body::from(body))
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);

    let image = reply.body["article"]["image"].as_str().unwrap();
    assert!(image.starts_with("cover_") && image.ends_with(".png"));
    assert!(app.assets.contains(image));
}

#[tokio::test]
async fn test_feeds_over_http() {
    let app = TestApp::new();
    let alice = app.sign_up("alice").await;
    let bob = app.sign_up("bob").await;
    for n in 0..6 {
        app.create_article(&alice, &format!("Alice {n}")).await;
    }
    app.create_article(&bob, "Bob 0").await;

    let global = app.send(empty_request("GET", "/articles?page=1", None)).await;
    assert_eq!(global.body.as_array().unwrap().len(), 5);

    let search = app
        .send(empty_request("GET", "/articles/search?query=alice&page=2", None))
        .await;
    assert_eq!(search.body["count"], 6);
    assert_eq!(search.body["articles"].as_array().unwrap().len(), 1);

    let by_author = app.send(empty_request("GET", "/articles/bob", None)).await;
    assert_eq!(by_author.body.as_array().unwrap().len(), 1);

    let category = app
        .send(empty_request("GET", "/articles/category/TECH?page=2", None))
        .await;
    assert_eq!(category.body.as_array().unwrap().len(), 2);

    let nothing = app
        .send(empty_request("GET", "/articles/following", Some(&bob)))
        .await;
    assert_eq!(nothing.body, json!([]));

    let follow = app
        .send(empty_request("POST", "/user/follow/alice", Some(&bob)))
        .await;
    assert_eq!(follow.status, StatusCode::OK);
    let following = app
        .send(empty_request("GET", "/articles/following?page=2", Some(&bob)))
        .await;
    assert_eq!(following.body.as_array().unwrap().len(), 1);

    let profile = app
        .send(empty_request("GET", "/user/alice", Some(&bob)))
        .await;
    assert_eq!(profile.body["isFollowing"], true);
    assert_eq!(profile.body["isMe"], false);
}
