//! Seat inventory: registering and unregistering for events.
//!
//! The profile's attending set and the event's seat counter change in one
//! transaction. It holds the write lock from its first statement, so every
//! writer touching the same event is serialized and the counter can never
//! be driven below zero.

use super::repository::{ensure_profile, fetch_event, to_json};
use super::Repository;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::EventKey;

impl Repository {
    /// Register the caller for an event, taking one seat.
    pub async fn register(
        &self,
        user: &CurrentUser,
        event_key: &EventKey,
    ) -> Result<bool, AppError> {
        let mut tx = self.begin_write().await?;
        let mut profile = ensure_profile(&mut tx, user).await?;

        let event = fetch_event(&mut tx, event_key).await?.ok_or_else(|| {
            AppError::NotFound(format!("No conference found with key: {}", event_key))
        })?;

        if profile.conference_keys_to_attend.contains(event_key) {
            return Err(AppError::Conflict(
                "You have already registered for this conference".to_string(),
            ));
        }
        if event.seats_available <= 0 {
            return Err(AppError::Conflict(
                "There are no seats available.".to_string(),
            ));
        }

        profile.conference_keys_to_attend.push(*event_key);

        let taken = sqlx::query(
            "UPDATE events SET seats_available = seats_available - 1 WHERE id = ? AND seats_available > 0",
        )
        .bind(event_key.to_string())
        .execute(&mut *tx)
        .await?;
        if taken.rows_affected() != 1 {
            return Err(AppError::Conflict(
                "There are no seats available.".to_string(),
            ));
        }

        sqlx::query("UPDATE profiles SET conference_keys_to_attend = ? WHERE user_id = ?")
            .bind(to_json(&profile.conference_keys_to_attend)?)
            .bind(&profile.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(event = %event_key, user = %user.user_id, "Registered for conference");
        Ok(true)
    }

    /// Unregister the caller, giving the seat back. Returns `false` without
    /// touching anything when the caller was not registered.
    pub async fn unregister(
        &self,
        user: &CurrentUser,
        event_key: &EventKey,
    ) -> Result<bool, AppError> {
        let mut tx = self.begin_write().await?;
        let mut profile = ensure_profile(&mut tx, user).await?;

        if fetch_event(&mut tx, event_key).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "No conference found with key: {}",
                event_key
            )));
        }

        let Some(position) = profile
            .conference_keys_to_attend
            .iter()
            .position(|k| k == event_key)
        else {
            // Dropping the transaction rolls back the lock-taking write too.
            return Ok(false);
        };
        profile.conference_keys_to_attend.remove(position);

        sqlx::query(
            "UPDATE events SET seats_available = MIN(seats_available + 1, max_attendees) WHERE id = ?",
        )
        .bind(event_key.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE profiles SET conference_keys_to_attend = ? WHERE user_id = ?")
            .bind(to_json(&profile.conference_keys_to_attend)?)
            .bind(&profile.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(event = %event_key, user = %user.user_id, "Unregistered from conference");
        Ok(true)
    }
}
