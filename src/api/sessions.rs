//! Session API endpoints.

use axum::extract::{Path, State};
use serde::Deserialize;

use super::{event_key, success, ApiResult, AppJson, AppQuery};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{format_hhmm, parse_hhmm, CreateSessionRequest, Session};
use crate::query::Operator;
use crate::tasks::Task;
use crate::AppState;

const DEFAULT_CUTOFF: &str = "23:59";

/// Start time cutoff for the before/after queries.
#[derive(Debug, Default, Deserialize)]
pub struct TimeQuery {
    pub time: Option<String>,
}

/// Speakers to look up, comma separated.
#[derive(Debug, Deserialize)]
pub struct SpeakerQuery {
    pub speaker: String,
}

/// Body of the before-time query with excluded session types.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludingTypesRequest {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub excluded_types: Vec<String>,
}

/// Normalize an optional `HH:MM` cutoff to the stored representation.
fn cutoff(time: Option<&str>) -> Result<String, AppError> {
    let raw = time
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_CUTOFF);
    parse_hhmm(raw)
        .map(|t| format_hhmm(&t))
        .ok_or_else(|| AppError::BadRequest(format!("Time must be HH:MM: {}", raw)))
}

/// POST /api/conferences/:key/sessions - Create a session in an owned conference.
pub async fn create_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key): Path<String>,
    AppJson(request): AppJson<CreateSessionRequest>,
) -> ApiResult<Session> {
    let key = event_key(&key)?;
    let session = state.repo.create_session(&user, &key, &request).await?;

    state.tasks.enqueue(Task::FeaturedSpeaker {
        session_key: session.websafe_key,
    });

    success(session)
}

/// GET /api/conferences/:key/sessions - All sessions of a conference.
pub async fn sessions_for_event(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<Vec<Session>> {
    let key = event_key(&key)?;
    success(state.repo.sessions_for_event(&key).await?)
}

/// GET /api/conferences/:key/sessions/type/:type - Sessions of one type.
pub async fn sessions_by_type(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((key, session_type)): Path<(String, String)>,
) -> ApiResult<Vec<Session>> {
    let key = event_key(&key)?;
    success(state.repo.sessions_by_type(&key, &session_type).await?)
}

/// GET /api/conferences/:key/sessions/before?time=HH:MM
pub async fn sessions_before(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(key): Path<String>,
    AppQuery(query): AppQuery<TimeQuery>,
) -> ApiResult<Vec<Session>> {
    let key = event_key(&key)?;
    let time = cutoff(query.time.as_deref())?;
    success(
        state
            .repo
            .sessions_by_start_time(&key, Operator::LessOrEqual, &time)
            .await?,
    )
}

/// GET /api/conferences/:key/sessions/after?time=HH:MM
pub async fn sessions_after(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(key): Path<String>,
    AppQuery(query): AppQuery<TimeQuery>,
) -> ApiResult<Vec<Session>> {
    let key = event_key(&key)?;
    let time = cutoff(query.time.as_deref())?;
    success(
        state
            .repo
            .sessions_by_start_time(&key, Operator::GreaterOrEqual, &time)
            .await?,
    )
}

/// GET /api/sessions/speakers?speaker=a,b - Sessions by any of the speakers.
pub async fn sessions_by_speakers(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppQuery(query): AppQuery<SpeakerQuery>,
) -> ApiResult<Vec<Session>> {
    let speakers: Vec<String> = query
        .speaker
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if speakers.is_empty() {
        return Err(AppError::Validation("At least one speaker is required".to_string()));
    }

    success(state.repo.sessions_by_speakers(&speakers).await?)
}

/// POST /api/sessions/excluding-types - Sessions before a time, minus some types.
pub async fn sessions_excluding_types(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppJson(request): AppJson<ExcludingTypesRequest>,
) -> ApiResult<Vec<Session>> {
    let time = cutoff(request.time.as_deref())?;
    success(
        state
            .repo
            .sessions_before_excluding_types(&time, &request.excluded_types)
            .await?,
    )
}
