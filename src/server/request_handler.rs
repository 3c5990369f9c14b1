//! Request handler — coordinates sessions, storage, and event delivery for
//! every A2A JSON-RPC method.
//!
//! The [`RequestHandler`] trait defines the interface the transport layer
//! dispatches into. [`DefaultRequestHandler`] is the reference implementation,
//! wiring an [`AgentExecutor`] to [`TaskStore`]/[`MessageStorage`] and routing
//! every execution through a [`SessionManager`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::types::{
    AgentCard, CancelTaskParams, CreateTaskPushNotificationConfigParams,
    DeleteTaskPushNotificationConfigParams, GetTaskParams, GetTaskPushNotificationConfigParams,
    ListTaskPushNotificationConfigParams, ListTaskPushNotificationConfigResponse,
    ListTasksParams, ListTasksResponse, Message, SendMessageParams, SendMessageResponse,
    StreamResponse, SubscribeToTaskParams, Task, TaskPushNotificationConfig, TaskState,
    TaskStatus,
};

use super::agent_executor::{AgentExecutor, RequestContext};
use super::event_processor::SessionEventProcessor;
use super::event_queue::EventConsumer;
use super::message_store::{InMemoryMessageStore, MessageStorage};
use super::push_notification::{
    HttpPushNotificationSender, InMemoryPushNotificationConfigStore, PushNotificationConfigStorage,
    PushNotificationSender,
};
use super::session::Session;
use super::session_manager::SessionManager;
use super::task_store::{TaskListParams, TaskStore};

/// Trait for handling A2A JSON-RPC requests.
///
/// Each method corresponds to one A2A JSON-RPC method; the transport layer
/// dispatches incoming requests to these methods and maps the result (or
/// `A2AError`) back to the wire format.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle `message/send`.
    async fn on_message_send(&self, params: SendMessageParams) -> A2AResult<SendMessageResponse>;

    /// Handle `message/stream`.
    async fn on_message_send_stream(
        &self,
        params: SendMessageParams,
    ) -> A2AResult<EventConsumer>;

    /// Handle `tasks/get`.
    async fn on_get_task(&self, params: GetTaskParams) -> A2AResult<Task>;

    /// Handle `tasks/list`.
    async fn on_list_tasks(&self, params: ListTasksParams) -> A2AResult<ListTasksResponse>;

    /// Handle `tasks/cancel`.
    async fn on_cancel_task(&self, params: CancelTaskParams) -> A2AResult<Task>;

    /// Handle `tasks/subscribe`.
    async fn on_subscribe_to_task(
        &self,
        params: SubscribeToTaskParams,
    ) -> A2AResult<EventConsumer>;

    /// Handle `tasks/resubscribe`.
    ///
    /// Requires the streaming capability and a live session for the task —
    /// default implementation returns `UnsupportedOperation`.
    async fn on_resubscribe_to_task(
        &self,
        params: SubscribeToTaskParams,
    ) -> A2AResult<EventConsumer> {
        let _ = params;
        Err(A2AError::unsupported_operation("tasks/resubscribe is not supported"))
    }

    /// Handle `agent/getAuthenticatedExtendedCard`.
    ///
    /// Default implementation returns `AuthenticatedExtendedCardNotConfigured`.
    async fn on_get_authenticated_extended_card(&self) -> A2AResult<AgentCard> {
        Err(A2AError::authenticated_extended_card_not_configured(
            "no authenticated extended card is configured",
        ))
    }

    /// Handle `tasks/pushNotificationConfig/set`.
    async fn on_set_task_push_notification_config(
        &self,
        params: CreateTaskPushNotificationConfigParams,
    ) -> A2AResult<TaskPushNotificationConfig> {
        let _ = params;
        Err(A2AError::push_notification_not_supported(
            "push notifications are not supported",
        ))
    }

    /// Handle `tasks/pushNotificationConfig/get`.
    async fn on_get_task_push_notification_config(
        &self,
        params: GetTaskPushNotificationConfigParams,
    ) -> A2AResult<TaskPushNotificationConfig> {
        let _ = params;
        Err(A2AError::push_notification_not_supported(
            "push notifications are not supported",
        ))
    }

    /// Handle `tasks/pushNotificationConfig/list`.
    async fn on_list_task_push_notification_config(
        &self,
        params: ListTaskPushNotificationConfigParams,
    ) -> A2AResult<ListTaskPushNotificationConfigResponse> {
        let _ = params;
        Err(A2AError::push_notification_not_supported(
            "push notifications are not supported",
        ))
    }

    /// Handle `tasks/pushNotificationConfig/delete`.
    async fn on_delete_task_push_notification_config(
        &self,
        params: DeleteTaskPushNotificationConfigParams,
    ) -> A2AResult<()> {
        let _ = params;
        Err(A2AError::push_notification_not_supported(
            "push notifications are not supported",
        ))
    }
}

/// Reference [`RequestHandler`] implementation.
///
/// Coordinates:
/// - An [`AgentExecutor`] for running agent logic.
/// - A [`TaskStore`] and [`MessageStorage`] for persistence.
/// - A [`SessionManager`] that enforces one live session per task and
///   dispatches push notifications on terminal states.
pub struct DefaultRequestHandler {
    executor: Arc<dyn AgentExecutor>,
    task_store: Arc<dyn TaskStore>,
    message_store: Arc<dyn MessageStorage>,
    push_store: Arc<dyn PushNotificationConfigStorage>,
    session_manager: Arc<SessionManager>,
    agent_card: AgentCard,
    extended_agent_card: Option<AgentCard>,
    /// Whether `tasks/resubscribe` replays the task's current snapshot
    /// before tapping into live events, or behaves exactly like
    /// `tasks/subscribe` (no replay). See `DESIGN.md` for the rationale —
    /// this was left ambiguous upstream and is deliberately a knob here
    /// rather than a silent default.
    replay_on_resubscribe: bool,
}

impl DefaultRequestHandler {
    /// Build a handler with in-memory message storage and an HTTP push
    /// sender — the reference configuration.
    pub fn new(
        executor: Arc<dyn AgentExecutor>,
        task_store: Arc<dyn TaskStore>,
        agent_card: AgentCard,
    ) -> Self {
        Self::with_components(
            executor,
            task_store,
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(InMemoryPushNotificationConfigStore::new()),
            Arc::new(HttpPushNotificationSender::new()),
            agent_card,
        )
    }

    /// Build a handler from fully specified storage/delivery components.
    pub fn with_components(
        executor: Arc<dyn AgentExecutor>,
        task_store: Arc<dyn TaskStore>,
        message_store: Arc<dyn MessageStorage>,
        push_store: Arc<dyn PushNotificationConfigStorage>,
        push_sender: Arc<dyn PushNotificationSender>,
        agent_card: AgentCard,
    ) -> Self {
        let session_manager = Arc::new(SessionManager::new(
            Arc::clone(&push_store),
            push_sender,
        ));

        Self {
            executor,
            task_store,
            message_store,
            push_store,
            session_manager,
            agent_card,
            extended_agent_card: None,
            replay_on_resubscribe: false,
        }
    }

    /// Configure the card served by `agent/getAuthenticatedExtendedCard`.
    pub fn with_extended_agent_card(mut self, card: AgentCard) -> Self {
        self.extended_agent_card = Some(card);
        self
    }

    /// Configure whether `tasks/resubscribe` replays the task's current
    /// snapshot before tapping into live events.
    pub fn with_replay_on_resubscribe(mut self, replay: bool) -> Self {
        self.replay_on_resubscribe = replay;
        self
    }

    fn require_streaming(&self) -> A2AResult<()> {
        if self.agent_card.capabilities.streaming.unwrap_or(false) {
            Ok(())
        } else {
            Err(A2AError::unsupported_operation(
                "this agent does not support streaming",
            ))
        }
    }

    fn require_push_notifications(&self) -> A2AResult<()> {
        if self
            .agent_card
            .capabilities
            .push_notifications
            .unwrap_or(false)
        {
            Ok(())
        } else {
            Err(A2AError::push_notification_not_supported(
                "this agent does not support push notifications",
            ))
        }
    }

    /// Resolve the task a `message/send`-family request targets: the
    /// existing task (validated not terminal, not already live) when
    /// `message.task_id` is set, or a freshly created one otherwise.
    async fn resolve_task(&self, params: &SendMessageParams) -> A2AResult<Task> {
        if let Some(task_id) = params.message.task_id.clone() {
            let Some(existing) = self.task_store.get(&task_id).await? else {
                return Err(A2AError::task_not_found(format!(
                    "task {task_id} was specified but does not exist"
                )));
            };

            if let Some(ref context_id) = params.message.context_id {
                if *context_id != existing.context_id {
                    return Err(A2AError::invalid_params(format!(
                        "message.contextId {context_id} does not match task {task_id}'s contextId {}",
                        existing.context_id
                    )));
                }
            }

            if existing.status.state.is_terminal() {
                return Err(A2AError::invalid_params(format!(
                    "task {task_id} is in terminal state {}",
                    existing.status.state
                )));
            }

            if self.session_manager.session_for_task(&task_id).await.is_some() {
                return Err(A2AError::unsupported_operation(format!(
                    "task {task_id} still running — one session per live task"
                )));
            }

            let mut updated = existing;
            if let Some(status_msg) = updated.status.message.take() {
                updated.history.get_or_insert_with(Vec::new).push(status_msg);
            }
            updated
                .history
                .get_or_insert_with(Vec::new)
                .push(params.message.clone());
            self.task_store.save(updated.clone()).await?;
            Ok(updated)
        } else {
            let task_id = Uuid::new_v4().to_string();
            let context_id = params
                .message
                .context_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            let task = Task {
                id: task_id,
                context_id,
                kind: "task".to_string(),
                status: TaskStatus {
                    state: TaskState::Submitted,
                    message: None,
                    timestamp: Some(chrono::Utc::now().to_rfc3339()),
                },
                artifacts: None,
                history: Some(vec![params.message.clone()]),
                metadata: params.metadata.clone(),
            };

            self.task_store.save(task.clone()).await?;
            debug!(task_id = %task.id, "created new task");
            Ok(task)
        }
    }

    async fn start_session(
        &self,
        task: &Task,
        message: &Message,
        configuration: Option<&crate::types::SendMessageConfiguration>,
    ) -> A2AResult<Arc<Session>> {
        let processor = Arc::new(SessionEventProcessor::new(
            task.context_id.clone(),
            Arc::clone(&self.task_store),
            Arc::clone(&self.message_store),
        ));

        let context = RequestContext {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            message: Some(message.clone()),
            task: Some(task.clone()),
            configuration: configuration.cloned(),
            related_tasks: Vec::new(),
            metadata: task.metadata.clone(),
            call_context: None,
        };

        let session = Arc::new(Session::start(Arc::clone(&self.executor), context, processor));
        self.session_manager.add_session(Arc::clone(&session)).await;
        Ok(session)
    }

    /// Run one `message/send` request end to end under the task's lock.
    async fn run_message_send(
        &self,
        task: &Task,
        params: &SendMessageParams,
    ) -> A2AResult<SendMessageResponse> {
        let session = self
            .start_session(task, &params.message, params.configuration.as_ref())
            .await?;
        let processor = session.processor();
        let mut consumer = processor.events().await;
        let blocking = params
            .configuration
            .as_ref()
            .and_then(|c| c.blocking)
            .unwrap_or(true);

        let mut last_event = None;
        while let Some(event) = consumer.next_event().await {
            let done = Self::is_final_for_send(&event);
            last_event = Some(event);
            if done || !blocking {
                break;
            }
        }

        if last_event.is_none() {
            if let Some(err) = processor.exception().await {
                return Err(err);
            }
            return Err(A2AError::internal_error(
                "agent returned without emitting any event",
            ));
        }

        match last_event {
            Some(StreamResponse::Message(message)) => Ok(SendMessageResponse::Message(message)),
            _ => {
                let mut stored =
                    self.task_store.get(&task.id).await?.ok_or_else(|| {
                        A2AError::task_not_found(format!("task {} vanished mid-flight", task.id))
                    })?;
                let history_length = params
                    .configuration
                    .as_ref()
                    .and_then(|c| c.history_length)
                    .map(|n| n as usize);
                Self::trim_history(&mut stored, history_length);
                Ok(SendMessageResponse::Task(stored))
            }
        }
    }

    /// A blocking `message/send` stops consuming once the last event is a
    /// pure `Message`, or a task event reaching a terminal or pause state.
    fn is_final_for_send(event: &StreamResponse) -> bool {
        match event {
            StreamResponse::Message(_) => true,
            StreamResponse::StatusUpdate(update) => {
                update.r#final
                    || update.status.state.is_terminal()
                    || update.status.state.is_pause()
            }
            StreamResponse::Task(task) => {
                task.status.state.is_terminal() || task.status.state.is_pause()
            }
            StreamResponse::ArtifactUpdate(_) => false,
        }
    }

    /// Trim task history to the requested length, keeping the most recent
    /// `max_length` messages.
    fn trim_history(task: &mut Task, max_length: Option<usize>) {
        if let Some(max) = max_length {
            if max > 0 {
                if let Some(ref mut history) = task.history {
                    if history.len() > max {
                        let start = history.len() - max;
                        *history = history.split_off(start);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl RequestHandler for DefaultRequestHandler {
    async fn on_message_send(&self, params: SendMessageParams) -> A2AResult<SendMessageResponse> {
        let task = self.resolve_task(&params).await?;
        self.message_store.append(params.message.clone()).await?;

        self.session_manager.task_lock(&task.id).await?;
        let result = self.run_message_send(&task, &params).await;
        self.session_manager.task_unlock(&task.id).await?;
        result
    }

    async fn on_message_send_stream(
        &self,
        params: SendMessageParams,
    ) -> A2AResult<EventConsumer> {
        self.require_streaming()?;
        let task = self.resolve_task(&params).await?;
        self.message_store.append(params.message.clone()).await?;

        self.session_manager.task_lock(&task.id).await?;
        let started = self
            .start_session(&task, &params.message, params.configuration.as_ref())
            .await;
        self.session_manager.task_unlock(&task.id).await?;

        let session = started?;
        Ok(session.processor().events().await)
    }

    async fn on_get_task(&self, params: GetTaskParams) -> A2AResult<Task> {
        let mut task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;

        Self::trim_history(&mut task, params.history_length.map(|n| n as usize));
        Ok(task)
    }

    async fn on_list_tasks(&self, params: ListTasksParams) -> A2AResult<ListTasksResponse> {
        let internal = TaskListParams {
            context_id: params.context_id.clone(),
            status: params.status.map(|s| vec![s]),
            page_size: params.page_size.map(|n| n as usize),
            page_token: params.page_token.clone(),
        };

        let result = self.task_store.list(&internal).await?;
        let history_length = params.history_length.map(|n| n as usize);

        let mut tasks = result.tasks;
        for task in &mut tasks {
            Self::trim_history(task, history_length);
        }

        Ok(ListTasksResponse {
            page_size: tasks.len() as i32,
            total_size: tasks.len() as i32,
            tasks,
            next_page_token: result.next_page_token.unwrap_or_default(),
        })
    }

    async fn on_cancel_task(&self, params: CancelTaskParams) -> A2AResult<Task> {
        let task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;

        // Idempotence: canceling an already-canceled task performs no writes
        // and returns the same snapshot.
        if task.status.state == TaskState::Canceled {
            return Ok(task);
        }

        if task.status.state.is_terminal() {
            return Err(A2AError::task_not_cancelable(format!(
                "task cannot be canceled — current state: {}",
                task.status.state
            )));
        }

        if let Some(session) = self.session_manager.session_for_task(&params.id).await {
            let context = RequestContext {
                task_id: task.id.clone(),
                context_id: task.context_id.clone(),
                message: None,
                task: Some(task.clone()),
                configuration: None,
                related_tasks: Vec::new(),
                metadata: params.metadata.clone(),
                call_context: None,
            };

            self.executor.cancel(context, Arc::clone(&session)).await?;
            session.close().await;
            self.session_manager.remove_session(session.context_id()).await;

            self.task_store
                .get(&params.id)
                .await?
                .ok_or_else(|| A2AError::task_not_found(params.id.clone()))
        } else {
            let mut updated = task;
            if let Some(status_msg) = updated.status.message.take() {
                updated.history.get_or_insert_with(Vec::new).push(status_msg);
            }
            updated.status = TaskStatus {
                state: TaskState::Canceled,
                message: None,
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            };
            self.task_store.save(updated.clone()).await?;
            Ok(updated)
        }
    }

    async fn on_subscribe_to_task(
        &self,
        params: SubscribeToTaskParams,
    ) -> A2AResult<EventConsumer> {
        self.require_streaming()?;

        self.task_store
            .get(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;

        let session = self
            .session_manager
            .session_for_task(&params.id)
            .await
            .ok_or_else(|| {
                A2AError::unsupported_operation(format!(
                    "task {} has no active session to subscribe to",
                    params.id
                ))
            })?;

        Ok(session.processor().events().await)
    }

    async fn on_resubscribe_to_task(
        &self,
        params: SubscribeToTaskParams,
    ) -> A2AResult<EventConsumer> {
        self.require_streaming()?;

        let task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;

        let session = self
            .session_manager
            .session_for_task(&params.id)
            .await
            .ok_or_else(|| {
                A2AError::unsupported_operation(format!(
                    "task {} has no active session to resubscribe to",
                    params.id
                ))
            })?;

        let mut consumer = session.processor().events().await;
        if self.replay_on_resubscribe {
            consumer.replay_snapshot(StreamResponse::Task(task));
        }
        Ok(consumer)
    }

    async fn on_get_authenticated_extended_card(&self) -> A2AResult<AgentCard> {
        self.extended_agent_card.clone().ok_or_else(|| {
            A2AError::authenticated_extended_card_not_configured(
                "no authenticated extended card is configured",
            )
        })
    }

    async fn on_set_task_push_notification_config(
        &self,
        params: CreateTaskPushNotificationConfigParams,
    ) -> A2AResult<TaskPushNotificationConfig> {
        self.require_push_notifications()?;

        let config = TaskPushNotificationConfig {
            id: Some(params.config_id.clone()),
            task_id: params.task_id.clone(),
            push_notification_config: params.config.clone(),
            tenant: params.tenant.clone(),
        };
        self.push_store.save(config.clone()).await?;
        Ok(config)
    }

    async fn on_get_task_push_notification_config(
        &self,
        params: GetTaskPushNotificationConfigParams,
    ) -> A2AResult<TaskPushNotificationConfig> {
        self.require_push_notifications()?;

        let config_id = params
            .push_notification_config_id
            .clone()
            .unwrap_or_else(|| params.id.clone());

        self.push_store
            .get(&params.id, &config_id)
            .await?
            .ok_or_else(|| {
                A2AError::task_not_found(format!(
                    "no push notification config {config_id} for task {}",
                    params.id
                ))
            })
    }

    async fn on_list_task_push_notification_config(
        &self,
        params: ListTaskPushNotificationConfigParams,
    ) -> A2AResult<ListTaskPushNotificationConfigResponse> {
        self.require_push_notifications()?;

        let configs = self.push_store.get_all(&params.id).await?;
        Ok(ListTaskPushNotificationConfigResponse {
            configs,
            next_page_token: None,
        })
    }

    async fn on_delete_task_push_notification_config(
        &self,
        params: DeleteTaskPushNotificationConfigParams,
    ) -> A2AResult<()> {
        self.require_push_notifications()?;
        self.push_store
            .delete(&params.id, &params.push_notification_config_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::task_store::InMemoryTaskStore;
    use crate::types::{AgentCapabilities, Part, Role};
    use crate::AgentCardBuilder;

    struct EchoExecutor;

    #[async_trait]
    impl AgentExecutor for EchoExecutor {
        async fn execute(
            &self,
            context: RequestContext,
            processor: Arc<SessionEventProcessor>,
        ) -> A2AResult<()> {
            use crate::server::task_updater::TaskUpdater;
            let updater =
                TaskUpdater::new(processor, context.task_id.clone(), context.context_id.clone());
            let text = context.get_user_input(" ");
            updater.complete_with_text(&format!("echo: {text}")).await
        }

        async fn cancel(&self, context: RequestContext, session: Arc<Session>) -> A2AResult<()> {
            use crate::server::task_updater::TaskUpdater;
            let updater = TaskUpdater::new(
                session.processor(),
                context.task_id.clone(),
                context.context_id.clone(),
            );
            updater.cancel(None).await
        }
    }

    fn streaming_card() -> AgentCard {
        AgentCardBuilder::new("test-agent", "test agent", "1.0.0")
            .with_jsonrpc_interface("http://localhost/a2a")
            .with_streaming(true)
            .with_push_notifications(true)
            .build()
    }

    fn handler() -> DefaultRequestHandler {
        DefaultRequestHandler::new(
            Arc::new(EchoExecutor),
            Arc::new(InMemoryTaskStore::new()),
            streaming_card(),
        )
    }

    fn user_message(text: &str) -> Message {
        Message {
            message_id: Uuid::new_v4().to_string(),
            role: Role::User,
            kind: "message".to_string(),
            parts: vec![Part::text(text)],
            context_id: None,
            task_id: None,
            metadata: None,
            extensions: None,
            reference_task_ids: None,
        }
    }

    #[tokio::test]
    async fn blocking_send_returns_completed_task() {
        let handler = handler();
        let response = handler
            .on_message_send(SendMessageParams {
                message: user_message("hello"),
                configuration: None,
                metadata: None,
                tenant: None,
            })
            .await
            .unwrap();

        match response {
            SendMessageResponse::Task(task) => {
                assert_eq!(task.status.state, TaskState::Completed);
            }
            SendMessageResponse::Message(_) => panic!("expected a Task response"),
        }
    }

    #[tokio::test]
    async fn cancel_on_already_canceled_task_is_idempotent() {
        let handler = handler();
        let store = Arc::new(InMemoryTaskStore::new());
        let handler = DefaultRequestHandler::new(Arc::new(EchoExecutor), store.clone(), streaming_card());
        let _ = handler;

        let task = Task {
            id: "t1".to_string(),
            context_id: "ctx1".to_string(),
            kind: "task".to_string(),
            status: TaskStatus {
                state: TaskState::Canceled,
                message: None,
                timestamp: None,
            },
            artifacts: None,
            history: None,
            metadata: None,
        };
        store.save(task.clone()).await.unwrap();

        let handler = DefaultRequestHandler::new(Arc::new(EchoExecutor), store, streaming_card());
        let result = handler
            .on_cancel_task(CancelTaskParams {
                id: "t1".to_string(),
                metadata: None,
                tenant: None,
            })
            .await
            .unwrap();
        assert_eq!(result.status.state, TaskState::Canceled);
    }

    #[tokio::test]
    async fn cancel_unknown_task_returns_not_found() {
        let handler = handler();
        let result = handler
            .on_cancel_task(CancelTaskParams {
                id: "nope".to_string(),
                metadata: None,
                tenant: None,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn push_notification_config_roundtrip() {
        let handler = handler();
        let config = crate::types::PushNotificationConfig {
            id: None,
            url: "http://localhost/hook".to_string(),
            token: None,
            authentication: None,
        };

        let saved = handler
            .on_set_task_push_notification_config(CreateTaskPushNotificationConfigParams {
                task_id: "t1".to_string(),
                config_id: "c1".to_string(),
                config,
                tenant: None,
            })
            .await
            .unwrap();
        assert_eq!(saved.task_id, "t1");

        let fetched = handler
            .on_get_task_push_notification_config(GetTaskPushNotificationConfigParams {
                id: "t1".to_string(),
                push_notification_config_id: Some("c1".to_string()),
                metadata: None,
            })
            .await
            .unwrap();
        assert_eq!(fetched.id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn push_notifications_gated_by_capability() {
        let card = AgentCardBuilder::new("no-push", "no push agent", "1.0.0")
            .with_jsonrpc_interface("http://localhost/a2a")
            .build();
        let handler = DefaultRequestHandler::new(
            Arc::new(EchoExecutor),
            Arc::new(InMemoryTaskStore::new()),
            card,
        );

        let result = handler
            .on_list_task_push_notification_config(ListTaskPushNotificationConfigParams {
                id: "t1".to_string(),
                metadata: None,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn send_with_mismatched_context_id_is_rejected() {
        let store = Arc::new(InMemoryTaskStore::new());
        let task = Task {
            id: "t1".to_string(),
            context_id: "ctx1".to_string(),
            kind: "task".to_string(),
            status: TaskStatus {
                state: TaskState::Working,
                message: None,
                timestamp: None,
            },
            artifacts: None,
            history: None,
            metadata: None,
        };
        store.save(task).await.unwrap();

        let handler = DefaultRequestHandler::new(Arc::new(EchoExecutor), store, streaming_card());

        let mut message = user_message("hello");
        message.task_id = Some("t1".to_string());
        message.context_id = Some("ctx2".to_string());

        let result = handler
            .on_message_send(SendMessageParams {
                message,
                configuration: None,
                metadata: None,
                tenant: None,
            })
            .await;

        match result {
            Err(A2AError::InvalidParams { .. }) => {}
            other => panic!("expected InvalidParams, got: {other:?}"),
        }
    }

    /// Publishes a `working` status (so the session gets indexed by task id),
    /// then blocks until released, then completes.
    struct BlockingExecutor {
        proceed: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl AgentExecutor for BlockingExecutor {
        async fn execute(
            &self,
            context: RequestContext,
            processor: Arc<SessionEventProcessor>,
        ) -> A2AResult<()> {
            use crate::server::task_updater::TaskUpdater;
            let updater =
                TaskUpdater::new(processor, context.task_id.clone(), context.context_id.clone());
            updater.start_work(None).await?;
            self.proceed.notified().await;
            updater.complete_with_text("done").await
        }

        async fn cancel(&self, _context: RequestContext, _session: Arc<Session>) -> A2AResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn send_to_task_with_live_session_is_unsupported() {
        let proceed = Arc::new(tokio::sync::Notify::new());
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let handler = Arc::new(DefaultRequestHandler::new(
            Arc::new(BlockingExecutor {
                proceed: Arc::clone(&proceed),
            }),
            store,
            streaming_card(),
        ));

        let first_handler = Arc::clone(&handler);
        let first_message = user_message("first");
        let first = tokio::spawn(async move {
            first_handler
                .on_message_send(SendMessageParams {
                    message: first_message,
                    configuration: Some(crate::types::SendMessageConfiguration {
                        accepted_output_modes: None,
                        push_notification_config: None,
                        history_length: None,
                        blocking: Some(false),
                    }),
                    metadata: None,
                    tenant: None,
                })
                .await
        });

        // Wait for the first send's task to be registered with a live
        // session before trying a second send against the same task.
        let task_id = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                tokio::task::yield_now().await;
                let tasks = handler.task_store.list(&Default::default()).await.unwrap().tasks;
                if let Some(task) = tasks.first() {
                    if handler.session_manager.session_for_task(&task.id).await.is_some() {
                        return task.id.clone();
                    }
                }
            }
        })
        .await
        .expect("live session was never registered");

        let mut second_message = user_message("second");
        second_message.task_id = Some(task_id);
        let second = handler
            .on_message_send(SendMessageParams {
                message: second_message,
                configuration: None,
                metadata: None,
                tenant: None,
            })
            .await;

        match second {
            Err(A2AError::UnsupportedOperation { .. }) => {}
            other => panic!("expected UnsupportedOperation, got: {other:?}"),
        }

        proceed.notify_one();
        first.await.unwrap().unwrap();
    }

    struct NoOpExecutor;

    #[async_trait]
    impl AgentExecutor for NoOpExecutor {
        async fn execute(
            &self,
            _context: RequestContext,
            _processor: Arc<SessionEventProcessor>,
        ) -> A2AResult<()> {
            Ok(())
        }

        async fn cancel(&self, _context: RequestContext, _session: Arc<Session>) -> A2AResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn send_with_no_emitted_events_is_internal_error() {
        let handler = DefaultRequestHandler::new(
            Arc::new(NoOpExecutor),
            Arc::new(InMemoryTaskStore::new()),
            streaming_card(),
        );

        let result = handler
            .on_message_send(SendMessageParams {
                message: user_message("hello"),
                configuration: None,
                metadata: None,
                tenant: None,
            })
            .await;

        match result {
            Err(A2AError::InternalError { .. }) => {}
            other => panic!("expected InternalError, got: {other:?}"),
        }
    }
}
