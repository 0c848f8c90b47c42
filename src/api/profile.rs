//! Profile API endpoints.

use axum::extract::State;

use super::{success, ApiResult, AppJson};
use crate::auth::CurrentUser;
use crate::models::{Profile, SaveProfileRequest};
use crate::AppState;

/// GET /api/profile - The caller's profile, created on first access.
pub async fn get_profile(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Profile> {
    success(state.repo.get_or_create_profile(&user).await?)
}

/// POST /api/profile - Save display name and tee shirt size.
pub async fn save_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(request): AppJson<SaveProfileRequest>,
) -> ApiResult<Profile> {
    success(state.repo.save_profile(&user, &request).await?)
}
