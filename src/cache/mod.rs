//! Derived summaries recomputed out of band.
//!
//! Two single-value slots live in [`CacheSlots`], a handle shared through the
//! application state. They start empty; every recomputation overwrites the
//! slot it owns and concurrent recomputations race, so the last one to finish
//! wins. Readers never mutate.

use tokio::sync::RwLock;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::SessionKey;

/// Events with at most this many (but more than zero) seats left are announced.
pub const NEARLY_SOLD_OUT_SEATS: i32 = 5;

const ANNOUNCEMENT_PREFIX: &str =
    "Last chance to attend! The following conferences are nearly sold out: ";

/// Process-wide memoized summaries.
#[derive(Debug, Default)]
pub struct CacheSlots {
    announcement: RwLock<Option<String>>,
    featured_speaker: RwLock<Option<String>>,
}

impl CacheSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current availability announcement, if any.
    pub async fn announcement(&self) -> Option<String> {
        self.announcement.read().await.clone()
    }

    /// The current featured speaker digest, if any.
    pub async fn featured_speaker(&self) -> Option<String> {
        self.featured_speaker.read().await.clone()
    }

    async fn set_announcement(&self, value: Option<String>) {
        *self.announcement.write().await = value;
    }

    async fn set_featured_speaker(&self, value: String) {
        *self.featured_speaker.write().await = Some(value);
    }
}

pub fn format_announcement(event_names: &[String]) -> String {
    format!("{}{}", ANNOUNCEMENT_PREFIX, event_names.join(", "))
}

pub fn format_featured_speaker(speaker: &str, session_names: &[String]) -> String {
    format!("{} is speaking at {}", speaker, session_names.join(", "))
}

/// Recompute the availability announcement from the current event state.
///
/// Clears the slot when no event is nearly sold out.
pub async fn refresh_announcement(
    repo: &Repository,
    slots: &CacheSlots,
) -> Result<Option<String>, AppError> {
    let names = repo
        .nearly_sold_out_event_names(NEARLY_SOLD_OUT_SEATS)
        .await?;

    let announcement = if names.is_empty() {
        None
    } else {
        Some(format_announcement(&names))
    };

    tracing::debug!(events = names.len(), "Refreshed availability announcement");
    slots.set_announcement(announcement.clone()).await;
    Ok(announcement)
}

/// Recompute the featured speaker digest after `session_key` was created.
///
/// Every speaker of the new session who presents two or more sessions
/// overall produces a digest; the last such speaker wins. When nobody
/// qualifies the slot keeps its previous value.
pub async fn refresh_featured_speaker(
    repo: &Repository,
    slots: &CacheSlots,
    session_key: &SessionKey,
) -> Result<Option<String>, AppError> {
    let Some(session) = repo.get_session(session_key).await? else {
        tracing::info!(session = %session_key, "Session vanished before featured speaker check");
        return Ok(None);
    };

    let mut digest = None;
    for speaker in &session.speakers {
        let sessions = repo
            .sessions_by_speakers(std::slice::from_ref(speaker))
            .await?;
        if sessions.len() >= 2 {
            let names: Vec<String> = sessions.into_iter().map(|s| s.name).collect();
            digest = Some(format_featured_speaker(speaker, &names));
        }
    }

    match &digest {
        Some(text) => slots.set_featured_speaker(text.clone()).await,
        None => tracing::info!(session = %session_key, "Unable to set featured speaker"),
    }
    Ok(digest)
}
