//! Request extractors.
//!
//! | Extractor | Yields | Rejects with |
//! |-----------|--------|--------------|
//! | [`AuthUser`] | the verified user id from the session cookie | 403 `No access` |
//! | [`Viewer`] | `Some(id)` for a valid session, `None` otherwise | never |
//! | [`Page`] | the 1-based `?page=` number, `1` when absent | 400 |
//! | [`Submission`] | text fields plus an optional `image` file, from JSON or multipart | 400 |

use std::collections::HashMap;

use api::assets::Upload;
use api::auth::{authorize, identify, SESSION_COOKIE};
use api::ApiError;
use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Query, Request},
    http::{header::CONTENT_TYPE, request::Parts},
    Json,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

fn session_token(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// The authenticated caller. Handlers taking this never run without a valid
/// session.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts);
        let id = authorize(&state.codec, token.as_deref())?;
        Ok(AuthUser(id))
    }
}

/// The caller, if signed in.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<Uuid>);

impl FromRequestParts<AppState> for Viewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts);
        Ok(Viewer(identify(&state.codec, token.as_deref())))
    }
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<String>,
}

/// Page number from `?page=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(pub u64);

impl Page {
    fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        match raw {
            None => Ok(Page(1)),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|page| *page > 0)
                .map(Page)
                .ok_or_else(|| ApiError::Validation("Page must be a positive number".into())),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Page {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PageParams>::try_from_uri(&parts.uri)
            .map_err(|_| ApiError::Validation("Malformed query string".into()))?;
        Ok(Page::parse(params.page.as_deref())?)
    }
}

/// Form fields of a submission. Browsers send multipart when a file is
/// attached and JSON otherwise; both end up here.
#[derive(Debug, Default)]
pub struct Submission {
    fields: HashMap<String, String>,
    pub image: Option<Upload>,
}

impl Submission {
    /// Field value, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.fields.get(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("true" | "1" | "on")
        )
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut submission = Submission::default();
        while let Some(field) = multipart.next_field().await.map_err(|_| malformed())? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) if name == "image" => {
                    let bytes = field.bytes().await.map_err(|_| malformed())?;
                    if !bytes.is_empty() {
                        submission.image = Some(Upload::new(file_name, bytes.to_vec()));
                    }
                }
                Some(_) => {
                    tracing::debug!(field = %name, "Ignoring unexpected file field");
                }
                None => {
                    let value = field.text().await.map_err(|_| malformed())?;
                    submission.fields.insert(name, value);
                }
            }
        }
        Ok(submission)
    }

    fn from_json(body: HashMap<String, Value>) -> Self {
        let fields = body
            .into_iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((name, value))
            })
            .collect();
        Submission {
            fields,
            image: None,
        }
    }
}

fn malformed() -> ApiError {
    ApiError::Validation("Malformed request body".into())
}

impl<S: Send + Sync> FromRequest<S> for Submission {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|_| malformed())?;
            return Ok(Submission::from_multipart(multipart).await?);
        }

        let Json(body) = Json::<HashMap<String, Value>>::from_request(req, state)
            .await
            .map_err(|_| ApiError::incomplete())?;
        Ok(Submission::from_json(body))
    }
}
