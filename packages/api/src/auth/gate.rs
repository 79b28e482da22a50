//! Authorization gate.
//!
//! A request is either unauthenticated or carries a verified user id; there is
//! no other state and nothing survives the request. [`authorize`] is used by
//! endpoints that require a session, [`identify`] by endpoints that only
//! personalise their answer for a signed-in viewer.

use uuid::Uuid;

use super::session::SessionCodec;
use crate::error::{ApiError, ApiResult};

/// Resolve the session token to a user id or reject with [`ApiError::Unauthorized`].
pub fn authorize(codec: &SessionCodec, token: Option<&str>) -> ApiResult<Uuid> {
    let token = token.filter(|t| !t.is_empty()).ok_or(ApiError::Unauthorized)?;
    codec.verify(token).map_err(|_| ApiError::Unauthorized)
}

/// Optional viewer: a token that fails verification is treated as absent.
pub fn identify(codec: &SessionCodec, token: Option<&str>) -> Option<Uuid> {
    authorize(codec, token).ok()
}
