//! REST API module.
//!
//! Handlers resolve the caller with the [`CurrentUser`](crate::auth::CurrentUser)
//! extractor, delegate to the repository and wrap the result in the success
//! envelope. Errors render through [`AppError`]'s own envelope.

mod announcements;
mod events;
mod profile;
mod sessions;
mod wishlist;

pub use announcements::*;
pub use events::*;
pub use profile::*;
pub use sessions::*;
pub use wishlist::*;

use axum::{
    extract::{FromRequest, FromRequestParts, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{EventKey, SessionKey};

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// JSON body extractor whose rejections render as the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejections render as the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

// Path segments are parsed here rather than by the `Path` extractor so a
// malformed key renders as a BAD_REQUEST envelope.

fn event_key(raw: &str) -> Result<EventKey, AppError> {
    raw.parse()
}

fn session_key(raw: &str) -> Result<SessionKey, AppError> {
    raw.parse()
}
