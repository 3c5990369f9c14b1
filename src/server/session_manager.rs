//! Session manager — the live registry of in-flight sessions and the
//! per-task locking that enforces "one live session per task".
//!
//! Owns three pieces of shared state, each behind its own lock so the three
//! concerns never contend with one another: the `contextId -> Session` map,
//! the `taskId -> contextId` index used to find a task's live session, and
//! the FIFO-fair per-task locks that `RequestHandler` takes out for the
//! duration of a `message/send` so two requests can never drive the same
//! task concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};

use super::push_notification::{PushNotificationConfigStorage, PushNotificationSender};
use super::session::Session;

/// Live-session registry and per-task lock manager.
///
/// Mirrors the "Rule: one Session per live task" invariant: `sessionForTask`
/// is how a handler checks whether a task already has a live executor before
/// starting a second one.
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    task_to_context: Mutex<HashMap<String, String>>,
    semaphores: Mutex<HashMap<String, Arc<Semaphore>>>,
    held_locks: Mutex<HashMap<String, tokio::sync::OwnedSemaphorePermit>>,
    push_store: Arc<dyn PushNotificationConfigStorage>,
    push_sender: Arc<dyn PushNotificationSender>,
}

impl SessionManager {
    /// Create a manager that dispatches terminal-state push notifications
    /// through `push_store`/`push_sender`.
    pub fn new(
        push_store: Arc<dyn PushNotificationConfigStorage>,
        push_sender: Arc<dyn PushNotificationSender>,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            task_to_context: Mutex::new(HashMap::new()),
            semaphores: Mutex::new(HashMap::new()),
            held_locks: Mutex::new(HashMap::new()),
            push_store,
            push_sender,
        }
    }

    /// Register a newly started session.
    ///
    /// Spawns a watcher that indexes every `taskId` the session's processor
    /// touches, fires push notifications when a task reaches a terminal
    /// state, and removes the session from the registry once its executor
    /// finishes.
    pub async fn add_session(self: &Arc<Self>, session: Arc<Session>) {
        let context_id = session.context_id().to_string();

        {
            let mut sessions = self.sessions.lock().await;
            sessions.insert(context_id.clone(), Arc::clone(&session));
        }

        let manager = Arc::clone(self);
        let watched = Arc::clone(&session);
        tokio::spawn(async move {
            manager.watch_session(watched).await;
        });
    }

    async fn watch_session(self: Arc<Self>, session: Arc<Session>) {
        let processor = session.processor();
        let mut consumer = processor.events().await;

        while let Some(event) = consumer.next_event().await {
            let Some(task_id) = Self::task_id_of(&event) else {
                continue;
            };

            {
                let mut index = self.task_to_context.lock().await;
                index.insert(task_id.clone(), session.context_id().to_string());
            }

            if Self::is_terminal_event(&event) {
                if let Some(task) = processor.current_task().await {
                    self.dispatch_push(&task_id, &task).await;
                }
            }
        }

        let _ = session.join().await;

        let mut sessions = self.sessions.lock().await;
        sessions.remove(session.context_id());
    }

    fn task_id_of(event: &crate::types::StreamResponse) -> Option<String> {
        use crate::types::StreamResponse;
        match event {
            StreamResponse::Task(task) => Some(task.id.clone()),
            StreamResponse::StatusUpdate(update) => Some(update.task_id.clone()),
            StreamResponse::ArtifactUpdate(update) => Some(update.task_id.clone()),
            StreamResponse::Message(_) => None,
        }
    }

    fn is_terminal_event(event: &crate::types::StreamResponse) -> bool {
        use crate::types::StreamResponse;
        match event {
            StreamResponse::Task(task) => task.status.state.is_terminal(),
            StreamResponse::StatusUpdate(update) => update.status.state.is_terminal(),
            StreamResponse::ArtifactUpdate(_) | StreamResponse::Message(_) => false,
        }
    }

    async fn dispatch_push(&self, task_id: &str, task: &crate::types::Task) {
        let configs = match self.push_store.get_all(task_id).await {
            Ok(configs) => configs,
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "failed to load push notification configs");
                return;
            }
        };

        for config in configs {
            self.push_sender
                .send(&config.push_notification_config, task)
                .await;
        }
    }

    /// Find the live session currently driving `task_id`, if any.
    pub async fn session_for_task(&self, task_id: &str) -> Option<Arc<Session>> {
        let context_id = self.task_to_context.lock().await.get(task_id).cloned()?;
        self.sessions.lock().await.get(&context_id).cloned()
    }

    /// All sessions currently registered.
    pub async fn active_sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.lock().await.values().cloned().collect()
    }

    /// Remove a session from the registry without waiting for its executor —
    /// used after an explicit `tasks/cancel` closes the session directly.
    pub async fn remove_session(&self, context_id: &str) {
        self.sessions.lock().await.remove(context_id);
    }

    /// Acquire the FIFO-fair lock for `task_id`. Blocks until no other
    /// request holds it.
    pub async fn task_lock(&self, task_id: &str) -> A2AResult<()> {
        let semaphore = {
            let mut semaphores = self.semaphores.lock().await;
            Arc::clone(
                semaphores
                    .entry(task_id.to_string())
                    .or_insert_with(|| Arc::new(Semaphore::new(1))),
            )
        };

        let permit = semaphore.acquire_owned().await.map_err(|_| {
            A2AError::internal_error(format!("task lock semaphore for {task_id} was closed"))
        })?;

        debug!(task_id = %task_id, "task lock acquired");
        self.held_locks
            .lock()
            .await
            .insert(task_id.to_string(), permit);
        Ok(())
    }

    /// Release the lock for `task_id`.
    ///
    /// Returns `InternalError` if `task_id` was never locked — unlocking a
    /// task that was never locked is a programming error in the caller, not
    /// a recoverable condition.
    pub async fn task_unlock(&self, task_id: &str) -> A2AResult<()> {
        let mut held = self.held_locks.lock().await;
        match held.remove(task_id) {
            Some(_) => {
                debug!(task_id = %task_id, "task lock released");
                Ok(())
            }
            None => Err(A2AError::internal_error(format!(
                "attempted to unlock task {task_id} which was never locked"
            ))),
        }
    }

    /// Whether `task_id` is currently locked.
    pub async fn is_task_locked(&self, task_id: &str) -> bool {
        self.held_locks.lock().await.contains_key(task_id)
    }
}
