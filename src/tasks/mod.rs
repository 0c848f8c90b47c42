//! Fire-and-forget background tasks.
//!
//! Mutating requests hand recomputation work to the [`TaskDispatcher`] after
//! they commit and return immediately. A single worker drains a bounded queue
//! and runs tasks one at a time. Failures are logged and dropped; they never
//! reach the request that triggered them. When the queue is full new tasks
//! are dropped with a warning.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cache::{self, CacheSlots};
use crate::db::Repository;
use crate::models::SessionKey;

/// Work the dispatcher knows how to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Rebuild the nearly-sold-out announcement.
    RefreshAnnouncement,
    /// Check the speakers of a newly created session.
    FeaturedSpeaker { session_key: SessionKey },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::RefreshAnnouncement => "refresh_announcement",
            Task::FeaturedSpeaker { .. } => "featured_speaker",
        }
    }
}

/// Tasks waiting for the worker before new ones are dropped.
pub const TASK_QUEUE_CAPACITY: usize = 256;

/// Handle used to enqueue tasks.
#[derive(Clone, Debug)]
pub struct TaskDispatcher {
    sender: mpsc::Sender<Task>,
}

impl TaskDispatcher {
    /// Start the worker and return a handle to feed it.
    pub fn start(repo: Arc<Repository>, slots: Arc<CacheSlots>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(TASK_QUEUE_CAPACITY);
        let worker = tokio::spawn(run_worker(receiver, repo, slots));
        (Self { sender }, worker)
    }

    /// Queue a task without blocking. Returns whether it was queued.
    pub fn enqueue(&self, task: Task) -> bool {
        let name = task.name();
        match self.sender.try_send(task) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(task = name, "Task queue is full; dropping task");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(task = name, "Task worker is gone; dropping task");
                false
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Task>,
    repo: Arc<Repository>,
    slots: Arc<CacheSlots>,
) {
    while let Some(task) = receiver.recv().await {
        run_task(&task, &repo, &slots).await;
    }
    tracing::debug!("Task queue closed");
}

/// Run one task to completion, logging and swallowing failures.
pub async fn run_task(task: &Task, repo: &Repository, slots: &CacheSlots) {
    let result = match task {
        Task::RefreshAnnouncement => cache::refresh_announcement(repo, slots).await.map(|_| ()),
        Task::FeaturedSpeaker { session_key } => {
            cache::refresh_featured_speaker(repo, slots, session_key)
                .await
                .map(|_| ())
        }
    };

    if let Err(e) = result {
        tracing::warn!(task = task.name(), "Background task failed: {}", e);
    }
}

/// Enqueue an announcement refresh now and then once per `every`.
pub fn schedule_announcements(dispatcher: TaskDispatcher, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            dispatcher.enqueue(Task::RefreshAnnouncement);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::auth::CurrentUser;
    use crate::db::init_database;
    use crate::models::CreateEventRequest;

    #[tokio::test]
    async fn test_enqueued_announcement_eventually_lands() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        let repo = Arc::new(Repository::new(pool));
        let slots = Arc::new(CacheSlots::new());

        let user = CurrentUser {
            user_id: "org".to_string(),
            email: String::new(),
            nickname: "org".to_string(),
        };
        repo.create_event(
            &user,
            &CreateEventRequest {
                name: "Tiny".to_string(),
                max_attendees: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let (dispatcher, _worker) = TaskDispatcher::start(repo.clone(), slots.clone());
        dispatcher.enqueue(Task::RefreshAnnouncement);

        let mut announcement = None;
        for _ in 0..50 {
            announcement = slots.announcement().await;
            if announcement.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(
            announcement,
            Some(cache::format_announcement(&["Tiny".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_failed_task_is_swallowed() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        let repo = Repository::new(pool.clone());
        let slots = CacheSlots::new();

        pool.close().await;
        run_task(&Task::RefreshAnnouncement, &repo, &slots).await;
        assert_eq!(slots.announcement().await, None);
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let (sender, _receiver) = mpsc::channel(2);
        let dispatcher = TaskDispatcher { sender };

        assert!(dispatcher.enqueue(Task::RefreshAnnouncement));
        assert!(dispatcher.enqueue(Task::RefreshAnnouncement));
        assert!(!dispatcher.enqueue(Task::RefreshAnnouncement));
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_stopped_is_dropped() {
        let (sender, receiver) = mpsc::channel(2);
        drop(receiver);
        let dispatcher = TaskDispatcher { sender };

        assert!(!dispatcher.enqueue(Task::RefreshAnnouncement));
    }
}
