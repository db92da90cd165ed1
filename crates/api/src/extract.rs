//! Requester identity extraction.
//!
//! Authentication itself is an upstream concern: the auth proxy resolves
//! sessions and forwards the user id in a trusted `x-user-id` header.
//! Everything else is a guest, keyed by client IP (`x-forwarded-for` when
//! behind a proxy, socket address otherwise). A request with neither a
//! user id nor a determinable IP cannot be quota-keyed and is rejected.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use ladle_core::request::Requester;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the pre-resolved user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the original client IP when behind a proxy.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Extracts the [`Requester`] for quota and ownership decisions.
#[derive(Debug, Clone, Copy)]
pub struct RequesterContext(pub Requester);

impl FromRequestParts<AppState> for RequesterContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(raw) = parts.headers.get(USER_ID_HEADER) {
            let id = raw
                .to_str()
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| {
                    AppError::BadRequest(format!("{USER_ID_HEADER} header is not a valid id"))
                })?;
            return Ok(RequesterContext(Requester::User { id }));
        }

        let ip = forwarded_ip(parts)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.ip())
            })
            .ok_or_else(|| {
                AppError::BadRequest("client identity could not be determined".to_string())
            })?;

        Ok(RequesterContext(Requester::Guest { ip }))
    }
}

/// First parseable address in `x-forwarded-for`, if any.
fn forwarded_ip(parts: &Parts) -> Option<IpAddr> {
    parts
        .headers
        .get(FORWARDED_FOR_HEADER)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

impl RequesterContext {
    /// The authenticated user id, or an Unauthorized error with the given
    /// message for guests.
    pub fn require_user(&self, message: &str) -> Result<i64, AppError> {
        match self.0 {
            Requester::User { id } => Ok(id),
            Requester::Guest { .. } => Err(AppError::Core(
                ladle_core::error::CoreError::Unauthorized(message.to_string()),
            )),
        }
    }
}
