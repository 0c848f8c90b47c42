//! Database repository for profiles, events and sessions.
//!
//! Uses prepared statements and transactions for data integrity.
//!
//! Every read-modify-write runs inside [`Repository::begin_write`], which
//! takes SQLite's database-wide write lock with its first statement. Writers
//! are therefore serialized globally, not per event or per profile: writes
//! to unrelated entities queue behind each other as well. SQLite offers no
//! finer-grained write locking, so this is an accepted limit of the store.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    default_session_date, format_hhmm, month_of, parse_hhmm, rebalance_seats, CreateEventRequest,
    CreateSessionRequest, Event, EventKey, Profile, SaveProfileRequest, Session, SessionKey,
    TeeShirtSize, UpdateEventRequest, DEFAULT_HIGHLIGHTS, DEFAULT_LOCATION,
};
use crate::query::{CompiledQuery, EventField, Operator, Predicate, SessionField};

const PROFILE_COLUMNS: &str = "user_id, display_name, main_email, tee_shirt_size, \
     conference_keys_to_attend, session_wishlist_keys";

const EVENT_COLUMNS: &str = "id, name, description, organizer_user_id, topics, city, \
     start_date, month, end_date, max_attendees, seats_available";

const SESSION_COLUMNS: &str = "id, event_id, name, highlights, location, typeof_session, \
     speakers, start_date, start_time, end_date, end_time, max_attendees, seats_available";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Begin a transaction that already holds the write lock.
    ///
    /// The first statement is a write, so concurrent writers queue on the
    /// busy timeout instead of failing when they try to upgrade a read
    /// snapshot later on.
    pub(super) async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, updated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Number of committed write transactions so far.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    // ==================== PROFILE OPERATIONS ====================

    /// Get the caller's profile, creating it on first access.
    pub async fn get_or_create_profile(&self, user: &CurrentUser) -> Result<Profile, AppError> {
        if let Some(profile) = self.get_profile(&user.user_id).await? {
            return Ok(profile);
        }

        let mut tx = self.begin_write().await?;
        let profile = ensure_profile(&mut tx, user).await?;
        tx.commit().await?;
        Ok(profile)
    }

    /// Get a profile by user ID.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM profiles WHERE user_id = ?",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    /// Update the user-editable profile fields that were provided.
    pub async fn save_profile(
        &self,
        user: &CurrentUser,
        request: &SaveProfileRequest,
    ) -> Result<Profile, AppError> {
        let mut tx = self.begin_write().await?;
        let mut profile = ensure_profile(&mut tx, user).await?;

        let display_name = request.display_name.as_deref().map(str::trim);
        if let Some(name) = display_name.filter(|n| !n.is_empty()) {
            profile.display_name = name.to_string();
        }
        if let Some(size) = request.tee_shirt_size {
            profile.tee_shirt_size = size;
        }

        sqlx::query("UPDATE profiles SET display_name = ?, tee_shirt_size = ? WHERE user_id = ?")
            .bind(&profile.display_name)
            .bind(profile.tee_shirt_size.as_str())
            .bind(&profile.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(profile)
    }

    /// Display names keyed by user ID for the given users; unknown users are absent.
    pub async fn display_names(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, String>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT user_id, display_name FROM profiles WHERE user_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in user_ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("user_id"), row.get("display_name")))
            .collect())
    }

    // ==================== EVENT OPERATIONS ====================

    /// Create a new event owned by the caller.
    pub async fn create_event(
        &self,
        user: &CurrentUser,
        request: &CreateEventRequest,
    ) -> Result<Event, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Conference 'name' field required".to_string(),
            ));
        }
        let max_attendees = request.max_attendees.unwrap_or(0);
        if max_attendees < 0 {
            return Err(AppError::Validation(
                "maxAttendees must not be negative".to_string(),
            ));
        }

        let event = Event {
            websafe_key: EventKey::generate(),
            name: request.name.clone(),
            description: request.description.clone(),
            organizer_user_id: user.user_id.clone(),
            topics: request.topics_or_default(),
            city: request.city_or_default(),
            start_date: request.start_date,
            month: month_of(request.start_date),
            end_date: request.end_date,
            max_attendees,
            seats_available: max_attendees,
            organizer_display_name: None,
        };

        let mut tx = self.begin_write().await?;
        let organizer = ensure_profile(&mut tx, user).await?;

        sqlx::query(
            "INSERT INTO events (id, name, description, organizer_user_id, topics, city, start_date, month, end_date, max_attendees, seats_available) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(event.websafe_key.to_string())
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.organizer_user_id)
        .bind(to_json(&event.topics)?)
        .bind(&event.city)
        .bind(event.start_date)
        .bind(event.month)
        .bind(event.end_date)
        .bind(event.max_attendees)
        .bind(event.seats_available)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(event = %event.websafe_key, organizer = %user.user_id, "Created conference");
        Ok(Event {
            organizer_display_name: Some(organizer.display_name),
            ..event
        })
    }

    /// Get an event by key, with its organizer's display name.
    pub async fn get_event(&self, key: &EventKey) -> Result<Option<Event>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(event) = row.as_ref().map(event_from_row).transpose()? else {
            return Ok(None);
        };
        Ok(self.with_organizer_names(vec![event]).await?.pop())
    }

    /// Update an event: existence, then ownership, then the provided fields.
    pub async fn update_event(
        &self,
        user: &CurrentUser,
        key: &EventKey,
        request: &UpdateEventRequest,
    ) -> Result<Event, AppError> {
        let mut tx = self.begin_write().await?;

        let mut event = fetch_event(&mut tx, key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No conference found with key: {}", key)))?;

        if event.organizer_user_id != user.user_id {
            return Err(AppError::Forbidden(
                "Only the owner can update the conference.".to_string(),
            ));
        }

        if let Some(name) = request.name.as_ref().filter(|n| !n.trim().is_empty()) {
            event.name = name.clone();
        }
        if let Some(description) = &request.description {
            event.description = Some(description.clone());
        }
        if let Some(topics) = request.topics.as_ref().filter(|t| !t.is_empty()) {
            event.topics = topics.clone();
        }
        if let Some(city) = request.city.as_ref().filter(|c| !c.trim().is_empty()) {
            event.city = city.clone();
        }
        if let Some(start_date) = request.start_date {
            event.start_date = Some(start_date);
            event.month = month_of(Some(start_date));
        }
        if let Some(end_date) = request.end_date {
            event.end_date = Some(end_date);
        }
        if let Some(max_attendees) = request.max_attendees {
            if max_attendees < 0 {
                return Err(AppError::Validation(
                    "maxAttendees must not be negative".to_string(),
                ));
            }
            event.seats_available =
                rebalance_seats(event.seats_available, event.max_attendees, max_attendees);
            event.max_attendees = max_attendees;
        }

        sqlx::query(
            "UPDATE events SET name = ?, description = ?, topics = ?, city = ?, start_date = ?, month = ?, end_date = ?, max_attendees = ?, seats_available = ? WHERE id = ?"
        )
        .bind(&event.name)
        .bind(&event.description)
        .bind(to_json(&event.topics)?)
        .bind(&event.city)
        .bind(event.start_date)
        .bind(event.month)
        .bind(event.end_date)
        .bind(event.max_attendees)
        .bind(event.seats_available)
        .bind(key.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(self
            .with_organizer_names(vec![event.clone()])
            .await?
            .pop()
            .unwrap_or(event))
    }

    /// Events owned by the given user, ordered by name.
    pub async fn events_created(&self, user_id: &str) -> Result<Vec<Event>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM events WHERE organizer_user_id = ? ORDER BY name",
            EVENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let events = rows
            .iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.with_organizer_names(events).await
    }

    /// Events the caller registered for, in registration order; missing ones are skipped.
    pub async fn events_attending(&self, user: &CurrentUser) -> Result<Vec<Event>, AppError> {
        let profile = self.get_or_create_profile(user).await?;

        let mut events = Vec::with_capacity(profile.conference_keys_to_attend.len());
        for key in &profile.conference_keys_to_attend {
            let row = sqlx::query(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
                .bind(key.to_string())
                .fetch_optional(&self.pool)
                .await?;
            if let Some(row) = row {
                events.push(event_from_row(&row)?);
            }
        }

        self.with_organizer_names(events).await
    }

    /// Run a compiled event query as a scan over all events.
    pub async fn query_events(
        &self,
        query: &CompiledQuery<EventField>,
    ) -> Result<Vec<Event>, AppError> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM events", EVENT_COLUMNS));
        query.push_sql(&mut builder, None);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let events = rows
            .iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.with_organizer_names(events).await
    }

    /// Names of events with `0 < seatsAvailable <= max_seats`, ordered by name.
    pub async fn nearly_sold_out_event_names(
        &self,
        max_seats: i32,
    ) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            "SELECT name FROM events WHERE seats_available > 0 AND seats_available <= ? ORDER BY name",
        )
        .bind(max_seats)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    async fn with_organizer_names(&self, mut events: Vec<Event>) -> Result<Vec<Event>, AppError> {
        let mut organizers: Vec<String> =
            events.iter().map(|e| e.organizer_user_id.clone()).collect();
        organizers.sort();
        organizers.dedup();

        let names = self.display_names(&organizers).await?;
        for event in &mut events {
            event.organizer_display_name = names.get(&event.organizer_user_id).cloned();
        }
        Ok(events)
    }

    // ==================== SESSION OPERATIONS ====================

    /// Create a session under an event the caller owns.
    pub async fn create_session(
        &self,
        user: &CurrentUser,
        event_key: &EventKey,
        request: &CreateSessionRequest,
    ) -> Result<Session, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Session 'name' field required".to_string(),
            ));
        }
        let max_attendees = request.max_attendees.unwrap_or(0);
        if max_attendees < 0 {
            return Err(AppError::Validation(
                "maxAttendees must not be negative".to_string(),
            ));
        }

        let midnight = NaiveTime::default();
        let session = Session {
            websafe_key: SessionKey::generate(),
            websafe_conference_key: *event_key,
            name: request.name.clone(),
            highlights: non_empty_or(&request.highlights, DEFAULT_HIGHLIGHTS),
            location: non_empty_or(&request.location, DEFAULT_LOCATION),
            typeof_session: request.typeof_session.clone(),
            speakers: request.speakers.clone(),
            start_date: request.start_date.unwrap_or_else(default_session_date),
            start_time: request.start_time.unwrap_or(midnight),
            end_date: request.end_date.unwrap_or_else(default_session_date),
            end_time: request.end_time.unwrap_or(midnight),
            max_attendees,
            seats_available: max_attendees,
        };

        let mut tx = self.begin_write().await?;

        let event = fetch_event(&mut tx, event_key).await?.ok_or_else(|| {
            AppError::NotFound(format!("No conference found with key: {}", event_key))
        })?;
        if event.organizer_user_id != user.user_id {
            return Err(AppError::Forbidden(
                "You must own the conference to add sessions.".to_string(),
            ));
        }

        sqlx::query(
            "INSERT INTO sessions (id, event_id, name, highlights, location, typeof_session, speakers, start_date, start_time, end_date, end_time, max_attendees, seats_available) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(session.websafe_key.to_string())
        .bind(event_key.to_string())
        .bind(&session.name)
        .bind(&session.highlights)
        .bind(&session.location)
        .bind(to_json(&session.typeof_session)?)
        .bind(to_json(&session.speakers)?)
        .bind(session.start_date)
        .bind(format_hhmm(&session.start_time))
        .bind(session.end_date)
        .bind(format_hhmm(&session.end_time))
        .bind(session.max_attendees)
        .bind(session.seats_available)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(session = %session.websafe_key, event = %event_key, "Created session");
        Ok(session)
    }

    /// Get a session by key.
    pub async fn get_session(&self, key: &SessionKey) -> Result<Option<Session>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM sessions WHERE id = ?",
            SESSION_COLUMNS
        ))
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    /// Resolve session keys in order, skipping those that no longer resolve.
    pub async fn resolve_sessions(&self, keys: &[SessionKey]) -> Result<Vec<Session>, AppError> {
        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(session) = self.get_session(key).await? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    /// Run a compiled session query, optionally restricted to one event.
    pub async fn query_sessions(
        &self,
        query: &CompiledQuery<SessionField>,
        event_key: Option<&EventKey>,
    ) -> Result<Vec<Session>, AppError> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM sessions", SESSION_COLUMNS));
        query.push_sql(&mut builder, event_key.map(|k| ("event_id", k.to_string())));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(session_from_row).collect()
    }

    /// All sessions of an event, ordered by name.
    pub async fn sessions_for_event(&self, event_key: &EventKey) -> Result<Vec<Session>, AppError> {
        self.query_sessions(&CompiledQuery::unrestricted(), Some(event_key))
            .await
    }

    /// Sessions of an event tagged with the given type.
    pub async fn sessions_by_type(
        &self,
        event_key: &EventKey,
        session_type: &str,
    ) -> Result<Vec<Session>, AppError> {
        let predicate = Predicate::new(SessionField::TypeOfSession, Operator::Equal, session_type)?;
        let query = CompiledQuery::from_predicates(vec![predicate])?;
        self.query_sessions(&query, Some(event_key)).await
    }

    /// Sessions across all events naming any of the given speakers, ordered by name.
    pub async fn sessions_by_speakers(
        &self,
        speakers: &[String],
    ) -> Result<Vec<Session>, AppError> {
        let mut found: BTreeMap<SessionKey, Session> = BTreeMap::new();
        for speaker in speakers {
            let predicate = Predicate::new(SessionField::Speaker, Operator::Equal, speaker)?;
            let query = CompiledQuery::from_predicates(vec![predicate])?;
            for session in self.query_sessions(&query, None).await? {
                found.insert(session.websafe_key, session);
            }
        }

        let mut sessions: Vec<Session> = found.into_values().collect();
        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sessions)
    }

    /// Sessions of an event whose start time compares to `time` with `operator`.
    pub async fn sessions_by_start_time(
        &self,
        event_key: &EventKey,
        operator: Operator,
        time: &str,
    ) -> Result<Vec<Session>, AppError> {
        let predicate = Predicate::new(SessionField::StartTime, operator, time)?;
        let query = CompiledQuery::from_predicates(vec![predicate])?;
        self.query_sessions(&query, Some(event_key)).await
    }

    /// Sessions starting at or before `time` that carry none of `excluded_types`.
    ///
    /// Only the start time goes to the store; a second inequality on the type
    /// field would not compile, so types are filtered here.
    pub async fn sessions_before_excluding_types(
        &self,
        time: &str,
        excluded_types: &[String],
    ) -> Result<Vec<Session>, AppError> {
        let predicate = Predicate::new(SessionField::StartTime, Operator::LessOrEqual, time)?;
        let query = CompiledQuery::from_predicates(vec![predicate])?;

        let sessions = self.query_sessions(&query, None).await?;
        Ok(sessions
            .into_iter()
            .filter(|s| !s.typeof_session.iter().any(|t| excluded_types.contains(t)))
            .collect())
    }
}

// Helpers shared with the transactional managers

/// Create the caller's profile if needed and return it, inside an open transaction.
pub(super) async fn ensure_profile(
    conn: &mut SqliteConnection,
    user: &CurrentUser,
) -> Result<Profile, AppError> {
    sqlx::query(
        "INSERT INTO profiles (user_id, display_name, main_email, tee_shirt_size) VALUES (?, ?, ?, ?) ON CONFLICT(user_id) DO NOTHING"
    )
    .bind(&user.user_id)
    .bind(&user.nickname)
    .bind(&user.email)
    .bind(TeeShirtSize::NotSpecified.as_str())
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query(&format!(
        "SELECT {} FROM profiles WHERE user_id = ?",
        PROFILE_COLUMNS
    ))
    .bind(&user.user_id)
    .fetch_one(&mut *conn)
    .await?;

    profile_from_row(&row)
}

pub(super) async fn fetch_event(
    conn: &mut SqliteConnection,
    key: &EventKey,
) -> Result<Option<Event>, AppError> {
    let row = sqlx::query(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
        .bind(key.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(event_from_row).transpose()
}

pub(super) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string(value)?)
}

fn non_empty_or(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

// Row conversion
//
// Stored values that fail to decode are reported as internal errors. Writing
// a substitute back would silently drop the user's data.

fn profile_from_row(row: &SqliteRow) -> Result<Profile, AppError> {
    let size: String = row.get("tee_shirt_size");
    Ok(Profile {
        user_id: row.get("user_id"),
        display_name: row.get("display_name"),
        main_email: row.get("main_email"),
        tee_shirt_size: TeeShirtSize::parse(&size)
            .ok_or_else(|| corrupt("tee_shirt_size", &size))?,
        conference_keys_to_attend: json_list(row, "conference_keys_to_attend")?,
        session_wishlist_keys: json_list(row, "session_wishlist_keys")?,
    })
}

fn event_from_row(row: &SqliteRow) -> Result<Event, AppError> {
    Ok(Event {
        websafe_key: stored_key(row, "id")?,
        name: row.get("name"),
        description: row.get("description"),
        organizer_user_id: row.get("organizer_user_id"),
        topics: json_list(row, "topics")?,
        city: row.get("city"),
        start_date: row.get::<Option<NaiveDate>, _>("start_date"),
        month: row.get("month"),
        end_date: row.get::<Option<NaiveDate>, _>("end_date"),
        max_attendees: row.get("max_attendees"),
        seats_available: row.get("seats_available"),
        organizer_display_name: None,
    })
}

fn session_from_row(row: &SqliteRow) -> Result<Session, AppError> {
    Ok(Session {
        websafe_key: stored_key(row, "id")?,
        websafe_conference_key: stored_key(row, "event_id")?,
        name: row.get("name"),
        highlights: row.get("highlights"),
        location: row.get("location"),
        typeof_session: json_list(row, "typeof_session")?,
        speakers: json_list(row, "speakers")?,
        start_date: row.get("start_date"),
        start_time: stored_time(row, "start_time")?,
        end_date: row.get("end_date"),
        end_time: stored_time(row, "end_time")?,
        max_attendees: row.get("max_attendees"),
        seats_available: row.get("seats_available"),
    })
}

fn corrupt(column: &str, raw: &str) -> AppError {
    tracing::error!(column, raw, "Undecodable stored value");
    AppError::Internal(format!("Stored {} is corrupt: {}", column, raw))
}

fn stored_key<K: FromStr>(row: &SqliteRow, column: &str) -> Result<K, AppError> {
    let raw: String = row.get(column);
    raw.parse().map_err(|_| corrupt(column, &raw))
}

fn stored_time(row: &SqliteRow, column: &str) -> Result<NaiveTime, AppError> {
    let raw: String = row.get(column);
    parse_hhmm(&raw).ok_or_else(|| corrupt(column, &raw))
}

fn json_list<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<Vec<T>, AppError> {
    let raw: String = row.get(column);
    serde_json::from_str(&raw).map_err(|_| corrupt(column, &raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::db::init_database;
    use crate::query::{compile_event_query, RawFilter};

    async fn setup() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        (Repository::new(pool), temp_dir)
    }

    fn date(month: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, month, day)
    }

    async fn seed_events(repo: &Repository) {
        let organizer = CurrentUser {
            user_id: "org".to_string(),
            email: "org@example.com".to_string(),
            nickname: "org".to_string(),
        };
        let events = [
            ("A", vec!["Rust", "Web"], date(9, 10)),
            ("B", vec!["Go"], date(3, 5)),
            ("C", vec!["Rust"], date(6, 1)),
            ("D", vec!["Web"], None),
        ];
        for (name, topics, start_date) in events {
            let request = CreateEventRequest {
                name: name.to_string(),
                topics: Some(topics.into_iter().map(String::from).collect()),
                start_date,
                ..Default::default()
            };
            repo.create_event(&organizer, &request).await.unwrap();
        }
    }

    async fn names_for(repo: &Repository, filters: &[RawFilter]) -> Vec<String> {
        let query = compile_event_query(filters).unwrap();
        let events = repo.query_events(&query).await.unwrap();
        events.into_iter().map(|e| e.name).collect()
    }

    #[tokio::test]
    async fn test_topic_equality_matches_any_list_element() {
        let (repo, _dir) = setup().await;
        seed_events(&repo).await;

        let found = names_for(&repo, &[RawFilter::new("TOPIC", "EQ", "Rust")]).await;
        assert_eq!(found, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_repeated_topic_equalities_are_all_applied() {
        let (repo, _dir) = setup().await;
        seed_events(&repo).await;

        let found = names_for(
            &repo,
            &[
                RawFilter::new("TOPIC", "EQ", "Rust"),
                RawFilter::new("TOPIC", "EQ", "Web"),
            ],
        )
        .await;
        assert_eq!(found, vec!["A"]);
    }

    #[tokio::test]
    async fn test_topic_inequality_orders_by_smallest_topic() {
        let (repo, _dir) = setup().await;
        seed_events(&repo).await;

        let found = names_for(&repo, &[RawFilter::new("TOPIC", "NE", "Rust")]).await;
        assert_eq!(found, vec!["B", "A", "D"]);
    }

    #[tokio::test]
    async fn test_month_inequality_orders_by_month_then_name() {
        let (repo, _dir) = setup().await;
        seed_events(&repo).await;

        let found = names_for(&repo, &[RawFilter::new("MONTH", "LTEQ", "6")]).await;
        assert_eq!(found, vec!["D", "B", "C"]);

        let found = names_for(
            &repo,
            &[
                RawFilter::new("TOPIC", "EQ", "Rust"),
                RawFilter::new("MONTH", "GT", "4"),
            ],
        )
        .await;
        assert_eq!(found, vec!["C", "A"]);
    }

    #[tokio::test]
    async fn test_corrupt_topic_list_is_reported() {
        let (repo, _dir) = setup().await;
        seed_events(&repo).await;

        sqlx::query("UPDATE events SET topics = '{broken' WHERE name = 'B'")
            .execute(&repo.pool)
            .await
            .unwrap();

        let query = CompiledQuery::<EventField>::unrestricted();
        let err = repo.query_events(&query).await.unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
