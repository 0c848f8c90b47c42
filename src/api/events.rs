//! Conference API endpoints, including seat registration and filtered queries.

use axum::extract::{Path, State};
use serde::Deserialize;

use super::{event_key, success, ApiResult, AppJson};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{CreateEventRequest, Event, UpdateEventRequest};
use crate::query::{compile_event_query, RawFilter};
use crate::AppState;

/// Body of a conference query: the filters are ANDed together.
#[derive(Debug, Default, Deserialize)]
pub struct EventQueryRequest {
    #[serde(default)]
    pub filters: Vec<RawFilter>,
}

/// POST /api/conferences - Create a conference owned by the caller.
pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(request): AppJson<CreateEventRequest>,
) -> ApiResult<Event> {
    success(state.repo.create_event(&user, &request).await?)
}

/// GET /api/conferences/:key - Get a single conference.
pub async fn get_event(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<Event> {
    let key = event_key(&key)?;

    match state.repo.get_event(&key).await? {
        Some(event) => success(event),
        None => Err(AppError::NotFound(format!(
            "No conference found with key: {}",
            key
        ))),
    }
}

/// PUT /api/conferences/:key - Update a conference the caller owns.
pub async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key): Path<String>,
    AppJson(request): AppJson<UpdateEventRequest>,
) -> ApiResult<Event> {
    let key = event_key(&key)?;
    success(state.repo.update_event(&user, &key, &request).await?)
}

/// POST /api/conferences/:key/registration - Take a seat.
pub async fn register_for_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<bool> {
    let key = event_key(&key)?;
    success(state.repo.register(&user, &key).await?)
}

/// DELETE /api/conferences/:key/registration - Give the seat back.
pub async fn unregister_from_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<bool> {
    let key = event_key(&key)?;
    success(state.repo.unregister(&user, &key).await?)
}

/// GET /api/conferences/created - Conferences the caller organizes.
pub async fn events_created(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Event>> {
    success(state.repo.events_created(&user.user_id).await?)
}

/// GET /api/conferences/attending - Conferences the caller registered for.
pub async fn events_attending(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Event>> {
    success(state.repo.events_attending(&user).await?)
}

/// POST /api/conferences/query - Filtered scan over all conferences.
pub async fn query_events(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppJson(request): AppJson<EventQueryRequest>,
) -> ApiResult<Vec<Event>> {
    let query = compile_event_query(&request.filters)?;
    success(state.repo.query_events(&query).await?)
}
