//! Client authentication and caller identity.
//!
//! The PSK layer gates which clients may talk to the API at all and uses
//! constant-time comparison to mitigate timing attacks. Identity of the
//! individual caller is resolved upstream and forwarded in headers; the
//! [`CurrentUser`] extractor only consumes it.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::errors::{codes, AppError, ErrorResponse};

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Stable opaque identifier of the authenticated caller.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Contact address of the caller, used when the profile is first created.
pub const USER_EMAIL_HEADER: &str = "x-user-email";
/// Nickname of the caller, used as the initial display name.
pub const USER_NAME_HEADER: &str = "x-user-name";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let provided = header_value(request.headers(), API_KEY_HEADER).or_else(|| {
        header_value(request.headers(), header::AUTHORIZATION.as_str())
            .and_then(|s| s.strip_prefix("Bearer ").map(str::to_string))
    });

    match provided {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing or invalid API key"),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse::new(codes::UNAUTHORIZED, message);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The caller on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: String,
    pub nickname: String,
}

impl CurrentUser {
    /// Resolve the caller from forwarded identity headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let user_id = header_value(headers, USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Authorization required".to_string()))?;
        let email = header_value(headers, USER_EMAIL_HEADER).unwrap_or_default();
        let nickname = header_value(headers, USER_NAME_HEADER).unwrap_or_else(|| {
            email
                .split('@')
                .next()
                .filter(|local| !local.is_empty())
                .unwrap_or(&user_id)
                .to_string()
        });

        Ok(Self {
            user_id,
            email,
            nickname,
        })
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
