//! Per-user session wishlist.

use super::repository::{ensure_profile, to_json};
use super::Repository;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Session, SessionKey};

impl Repository {
    /// Add (`add = true`) or remove a session key from the caller's wishlist.
    ///
    /// Adding a present key or removing an absent one changes nothing. The
    /// referenced session does not have to exist. Returns the sessions the
    /// wishlist resolves to afterwards.
    pub async fn toggle_wishlist(
        &self,
        user: &CurrentUser,
        session_key: &SessionKey,
        add: bool,
    ) -> Result<Vec<Session>, AppError> {
        let mut tx = self.begin_write().await?;
        let mut profile = ensure_profile(&mut tx, user).await?;

        let position = profile
            .session_wishlist_keys
            .iter()
            .position(|k| k == session_key);

        let changed = match (add, position) {
            (true, None) => {
                profile.session_wishlist_keys.push(*session_key);
                true
            }
            (false, Some(index)) => {
                profile.session_wishlist_keys.remove(index);
                true
            }
            _ => false,
        };

        if changed {
            sqlx::query("UPDATE profiles SET session_wishlist_keys = ? WHERE user_id = ?")
                .bind(to_json(&profile.session_wishlist_keys)?)
                .bind(&profile.user_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            tracing::debug!(user = %user.user_id, session = %session_key, add, "Updated wishlist");
        } else {
            tx.rollback().await?;
        }

        self.resolve_sessions(&profile.session_wishlist_keys).await
    }

    /// Sessions on the caller's wishlist, in wishlist order.
    pub async fn wishlist(&self, user: &CurrentUser) -> Result<Vec<Session>, AppError> {
        let profile = self.get_or_create_profile(user).await?;
        self.resolve_sessions(&profile.session_wishlist_keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::db::init_database;
    use crate::models::{CreateEventRequest, CreateSessionRequest};

    async fn setup() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        (Repository::new(pool), temp_dir)
    }

    fn user(id: &str) -> CurrentUser {
        CurrentUser {
            user_id: id.to_string(),
            email: String::new(),
            nickname: id.to_string(),
        }
    }

    async fn sessions(repo: &Repository, names: &[&str]) -> Vec<SessionKey> {
        let organizer = user("organizer");
        let event = repo
            .create_event(
                &organizer,
                &CreateEventRequest {
                    name: "RustConf".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut keys = Vec::new();
        for name in names {
            let session = repo
                .create_session(
                    &organizer,
                    &event.websafe_key,
                    &CreateSessionRequest {
                        name: name.to_string(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            keys.push(session.websafe_key);
        }
        keys
    }

    fn names(sessions: &[Session]) -> Vec<&str> {
        sessions.iter().map(|s| s.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (repo, _dir) = setup().await;
        let keys = sessions(&repo, &["Async", "Traits"]).await;
        let ada = user("ada");

        let once = repo.toggle_wishlist(&ada, &keys[0], true).await.unwrap();
        let twice = repo.toggle_wishlist(&ada, &keys[0], true).await.unwrap();
        assert_eq!(names(&once), vec!["Async"]);
        assert_eq!(names(&twice), vec!["Async"]);

        let profile = repo.get_profile("ada").await.unwrap().unwrap();
        assert_eq!(profile.session_wishlist_keys, vec![keys[0]]);
    }

    #[tokio::test]
    async fn test_appends_in_order_and_removes_single_entry() {
        let (repo, _dir) = setup().await;
        let keys = sessions(&repo, &["A", "B", "C"]).await;
        let ada = user("ada");

        for key in &keys {
            repo.toggle_wishlist(&ada, key, true).await.unwrap();
        }
        let after = repo.toggle_wishlist(&ada, &keys[1], false).await.unwrap();
        assert_eq!(names(&after), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let (repo, _dir) = setup().await;
        let keys = sessions(&repo, &["A", "B"]).await;
        let ada = user("ada");

        repo.toggle_wishlist(&ada, &keys[0], true).await.unwrap();
        let unchanged = repo.toggle_wishlist(&ada, &keys[1], false).await.unwrap();
        assert_eq!(names(&unchanged), vec!["A"]);
    }

    #[tokio::test]
    async fn test_unresolvable_key_is_kept_but_skipped() {
        let (repo, _dir) = setup().await;
        let keys = sessions(&repo, &["Real"]).await;
        let ghost = SessionKey::generate();
        let ada = user("ada");

        repo.toggle_wishlist(&ada, &ghost, true).await.unwrap();
        let listed = repo.toggle_wishlist(&ada, &keys[0], true).await.unwrap();
        assert_eq!(names(&listed), vec!["Real"]);

        let profile = repo.get_profile("ada").await.unwrap().unwrap();
        assert_eq!(profile.session_wishlist_keys, vec![ghost, keys[0]]);
        assert_eq!(names(&repo.wishlist(&ada).await.unwrap()), vec!["Real"]);
    }
}
