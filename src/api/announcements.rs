//! Cached summaries and the task trigger that refreshes them.

use axum::extract::State;

use super::{success, ApiResult};
use crate::auth::CurrentUser;
use crate::tasks::Task;
use crate::AppState;

/// GET /api/announcement - Current availability announcement, `null` when none.
pub async fn get_announcement(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Option<String>> {
    success(state.slots.announcement().await)
}

/// GET /api/featured-speaker - Current featured speaker digest, `null` when none.
pub async fn get_featured_speaker(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Option<String>> {
    success(state.slots.featured_speaker().await)
}

/// POST /api/tasks/announcement - Queue an announcement refresh.
///
/// Returns as soon as the task is queued; the slot updates asynchronously.
pub async fn trigger_announcement(State(state): State<AppState>) -> ApiResult<&'static str> {
    state.tasks.enqueue(Task::RefreshAnnouncement);
    success("queued")
}
