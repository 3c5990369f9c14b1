//! Session event processor — the single place where task/message events are
//! applied to storage and then broadcast to subscribers.
//!
//! A [`SessionEventProcessor`] is bound to one `contextId` for the lifetime of
//! one [`Session`](super::session::Session). Every event an `AgentExecutor`
//! produces — a full `Task` snapshot, a `TaskStatusUpdateEvent`, a
//! `TaskArtifactUpdateEvent`, or a bare `Message` — passes through here so
//! that the storage write for a given `taskId` happens-before the matching
//! broadcast: a reader that observes the event on the stream may rely on the
//! corresponding storage read reflecting it.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::types::{Artifact, Message, StreamResponse, Task, TaskArtifactUpdateEvent, TaskStatus};

use super::event_queue::{EventConsumer, EventQueue};
use super::message_store::MessageStorage;
use super::task_store::TaskStore;

/// Applies and broadcasts the events of one context's live session.
///
/// Bound to a single `contextId`. Tracks the most recently applied `Task`
/// snapshot (`current_task`) and the set of `taskId`s this context has ever
/// produced, both of which `SessionManager` and `RequestHandler` consult when
/// deciding how to route a follow-up request.
pub struct SessionEventProcessor {
    context_id: String,
    task_store: Arc<dyn TaskStore>,
    message_store: Arc<dyn MessageStorage>,
    queue: EventQueue,
    current_task: Mutex<Option<Task>>,
    task_ids: Mutex<HashSet<String>>,
    exception: Mutex<Option<A2AError>>,
}

impl SessionEventProcessor {
    /// Create a processor bound to `context_id`, backed by the given storage.
    pub fn new(
        context_id: impl Into<String>,
        task_store: Arc<dyn TaskStore>,
        message_store: Arc<dyn MessageStorage>,
    ) -> Self {
        Self {
            context_id: context_id.into(),
            task_store,
            message_store,
            queue: EventQueue::with_default_capacity(),
            current_task: Mutex::new(None),
            task_ids: Mutex::new(HashSet::new()),
            exception: Mutex::new(None),
        }
    }

    /// The `contextId` this processor is bound to.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// The most recently applied task snapshot, if any.
    pub async fn current_task(&self) -> Option<Task> {
        self.current_task.lock().await.clone()
    }

    /// Every `taskId` this processor has ever applied an event for.
    pub async fn task_ids(&self) -> HashSet<String> {
        self.task_ids.lock().await.clone()
    }

    /// Publish a standalone message: appended to the context's message
    /// history, then broadcast. Not routed through task storage — a bare
    /// `Message` carries no task state to persist.
    pub async fn send_message(&self, message: Message) -> A2AResult<()> {
        if let Some(ref context_id) = message.context_id {
            if *context_id != self.context_id {
                return Err(A2AError::invalid_params(format!(
                    "message.contextId {context_id} does not match this session's contextId {}",
                    self.context_id
                )));
            }
        }

        self.message_store.append(message.clone()).await?;
        self.queue.enqueue_event(StreamResponse::Message(message)).await
    }

    /// Apply a task-shaped event (`Task`, `TaskStatusUpdateEvent`, or
    /// `TaskArtifactUpdateEvent`) to storage, then broadcast it.
    ///
    /// Returns `InternalError` if called with a `Message` event — use
    /// [`send_message`](Self::send_message) for those.
    pub async fn send_task_event(&self, event: StreamResponse) -> A2AResult<()> {
        if matches!(event, StreamResponse::Message(_)) {
            return Err(A2AError::internal_error(
                "send_task_event called with a Message event; use send_message",
            ));
        }

        if let Some(event_context_id) = event_context_id(&event) {
            if event_context_id != self.context_id {
                return Err(A2AError::internal_error(format!(
                    "event contextId {event_context_id} does not match this session's contextId {}",
                    self.context_id
                )));
            }
        }

        let task = self.apply_event(&event).await?;

        {
            let mut ids = self.task_ids.lock().await;
            ids.insert(task.id.clone());
        }
        {
            let mut current = self.current_task.lock().await;
            *current = Some(task);
        }

        self.queue.enqueue_event(event).await
    }

    /// Subscribe to this processor's event stream via a late-attaching tap.
    ///
    /// A tap only ever sees events enqueued after it was created — there is
    /// no history replay at this layer; replay policy is a `Session`/
    /// `SessionManager` concern.
    pub async fn events(&self) -> EventConsumer {
        EventConsumer::new(self.queue.tap().await)
    }

    /// Close the event stream normally.
    pub async fn close(&self) {
        self.queue.close().await;
    }

    /// Record `err` as the terminal exception for this context and close the
    /// stream. Subscribers that drain to completion can inspect
    /// [`exception`](Self::exception) afterward.
    pub async fn close_exceptionally(&self, err: A2AError) {
        warn!(context_id = %self.context_id, error = %err, "session closed exceptionally");
        *self.exception.lock().await = Some(err);
        self.queue.close().await;
    }

    /// The exception this processor was closed with, if any.
    pub async fn exception(&self) -> Option<A2AError> {
        self.exception.lock().await.clone()
    }

    /// Whether the stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    async fn apply_event(&self, event: &StreamResponse) -> A2AResult<Task> {
        match event {
            StreamResponse::Task(task) => {
                self.task_store.save(task.clone()).await?;
                Ok(task.clone())
            }
            StreamResponse::StatusUpdate(status_event) => {
                let mut task = self
                    .load_or_init_task(&status_event.task_id, &status_event.context_id)
                    .await?;

                if let Some(msg) = task.status.message.take() {
                    task.history.get_or_insert_with(Vec::new).push(msg);
                }

                if let Some(event_meta) = &status_event.metadata {
                    let task_meta = task
                        .metadata
                        .get_or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
                    if let (Some(task_obj), Some(event_obj)) =
                        (task_meta.as_object_mut(), event_meta.as_object())
                    {
                        for (k, v) in event_obj {
                            task_obj.insert(k.clone(), v.clone());
                        }
                    }
                }

                task.status = TaskStatus {
                    state: status_event.status.state,
                    message: status_event.status.message.clone(),
                    timestamp: status_event.status.timestamp.clone(),
                };

                debug!(task_id = %task.id, state = %task.status.state, "status event applied");
                self.task_store.save(task.clone()).await?;
                Ok(task)
            }
            StreamResponse::ArtifactUpdate(artifact_event) => {
                let mut task = self
                    .load_or_init_task(&artifact_event.task_id, &artifact_event.context_id)
                    .await?;

                append_artifact_to_task(&mut task, artifact_event);

                self.task_store.save(task.clone()).await?;
                Ok(task)
            }
            StreamResponse::Message(_) => unreachable!("checked by send_task_event"),
        }
    }

    async fn load_or_init_task(&self, task_id: &str, context_id: &str) -> A2AResult<Task> {
        if let Some(current) = self.current_task.lock().await.clone() {
            if current.id == task_id {
                return Ok(current);
            }
        }

        if let Some(task) = self.task_store.get(task_id).await? {
            return Ok(task);
        }

        debug!(task_id = %task_id, context_id = %context_id, "creating new task for event");
        Ok(Task {
            id: task_id.to_string(),
            context_id: context_id.to_string(),
            kind: "task".to_string(),
            status: TaskStatus {
                state: crate::types::TaskState::Submitted,
                message: None,
                timestamp: None,
            },
            artifacts: None,
            history: None,
            metadata: None,
        })
    }
}

/// The `contextId` carried by a task-shaped event, if any.
fn event_context_id(event: &StreamResponse) -> Option<&str> {
    match event {
        StreamResponse::Task(task) => Some(&task.context_id),
        StreamResponse::StatusUpdate(e) => Some(&e.context_id),
        StreamResponse::ArtifactUpdate(e) => Some(&e.context_id),
        StreamResponse::Message(_) => None,
    }
}

/// Appends an artifact to a task per an artifact update event.
///
/// `append == Some(true)` extends the parts of an existing artifact with the
/// same `artifactId`; anything else replaces it (or inserts it, if absent).
/// An `append == Some(true)` chunk for an artifact id the task has never seen
/// is dropped with a warning rather than silently creating a partial artifact.
pub fn append_artifact_to_task(task: &mut Task, event: &TaskArtifactUpdateEvent) {
    let artifacts = task.artifacts.get_or_insert_with(Vec::new);

    let new_artifact: &Artifact = &event.artifact;
    let artifact_id = &new_artifact.artifact_id;
    let append_parts = event.append.unwrap_or(false);

    let existing_idx = artifacts.iter().position(|a| a.artifact_id == *artifact_id);

    if !append_parts {
        if let Some(idx) = existing_idx {
            artifacts[idx] = new_artifact.clone();
        } else {
            artifacts.push(new_artifact.clone());
        }
    } else if let Some(idx) = existing_idx {
        artifacts[idx].parts.extend(new_artifact.parts.clone());
    } else {
        warn!(
            artifact_id = %artifact_id,
            task_id = %task.id,
            "received append=true for nonexistent artifact, dropping chunk"
        );
    }
}
