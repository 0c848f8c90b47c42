//! Wishlist API endpoints.

use axum::extract::{Path, State};

use super::{session_key, success, ApiResult};
use crate::auth::CurrentUser;
use crate::models::Session;
use crate::AppState;

/// GET /api/wishlist - Sessions on the caller's wishlist.
pub async fn get_wishlist(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Session>> {
    success(state.repo.wishlist(&user).await?)
}

/// POST /api/wishlist/:session_key - Add a session.
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<Vec<Session>> {
    let key = session_key(&key)?;
    success(state.repo.toggle_wishlist(&user, &key, true).await?)
}

/// DELETE /api/wishlist/:session_key - Remove a session.
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<Vec<Session>> {
    let key = session_key(&key)?;
    success(state.repo.toggle_wishlist(&user, &key, false).await?)
}
