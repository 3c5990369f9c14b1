//! A2A server framework — traits and implementations for building A2A agents.
//!
//! - [`AgentExecutor`] trait — implement your agent logic
//! - [`RequestContext`] — execution context with task IDs, message, metadata
//! - [`ServerCallContext`] — per-request context with extensions and state
//! - [`RequestContextBuilder`] trait + [`SimpleRequestContextBuilder`] — build contexts
//! - [`TaskStore`] trait + [`InMemoryTaskStore`] — task persistence
//! - [`MessageStorage`] trait + [`InMemoryMessageStore`] — message history persistence
//! - [`PushNotificationConfigStorage`]/[`PushNotificationSender`] — webhook config + delivery
//! - [`SessionEventProcessor`] — applies and broadcasts one context's task/message events
//! - [`Session`] — the lifetime of one `AgentExecutor::execute` invocation
//! - [`SessionManager`] — live-session registry and per-task locking
//! - [`TaskUpdater`] — thread-safe task state transition helper
//! - [`EventQueue`] — broadcast channel for streaming events
//! - [`QueueManager`] trait + [`InMemoryQueueManager`] — per-task queue management
//! - [`EventConsumer`] — consumes events from a queue (one-shot or streaming)
//! - [`RequestHandler`] trait + [`DefaultRequestHandler`] — JSON-RPC dispatch
//! - [`a2a_router`] — ready-made axum routes for A2A servers
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use a2a_rs::server::*;
//!
//! // 1. Implement your agent logic.
//! struct MyAgent;
//!
//! #[async_trait::async_trait]
//! impl AgentExecutor for MyAgent {
//!     async fn execute(&self, ctx: RequestContext, processor: Arc<SessionEventProcessor>) -> a2a_rs::A2AResult<()> {
//!         let updater = TaskUpdater::new(processor, ctx.task_id, ctx.context_id);
//!         updater.start_work(None).await?;
//!         // ... do work ...
//!         updater.complete(None).await?;
//!         Ok(())
//!     }
//!
//!     async fn cancel(&self, ctx: RequestContext, session: Arc<Session>) -> a2a_rs::A2AResult<()> {
//!         let updater = TaskUpdater::new(session.processor(), ctx.task_id, ctx.context_id);
//!         updater.cancel(None).await?;
//!         Ok(())
//!     }
//! }
//!
//! // 2. Wire up the server.
//! let executor: Arc<dyn AgentExecutor> = Arc::new(MyAgent);
//! let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
//! let handler: Arc<dyn RequestHandler> = Arc::new(
//!     DefaultRequestHandler::new(executor, store, agent_card.clone())
//! );
//!
//! // 3. Create the router and serve.
//! let app = a2a_router(handler, agent_card);
//! ```

pub mod agent_executor;
pub mod axum_integration;
pub mod event_processor;
pub mod event_queue;
pub mod message_store;
pub mod push_notification;
pub mod request_handler;
pub mod session;
pub mod session_manager;
pub mod task_store;
pub mod task_updater;

// Re-export key types at the server module level for convenience.
pub use crate::types::{
    CancelTaskParams, GetTaskParams, SendMessageConfiguration, SendMessageParams,
    SendMessageResponse, SubscribeToTaskParams,
};
pub use agent_executor::{
    AgentExecutor, RequestContext, RequestContextBuilder, ServerCallContext,
    SimpleRequestContextBuilder,
};
pub use axum_integration::a2a_router;
pub use event_processor::SessionEventProcessor;
pub use event_queue::{
    EventConsumer, EventQueue, InMemoryQueueManager, NoTaskQueue, QueueManager, TaskQueueExists,
};
pub use message_store::{InMemoryMessageStore, MessageStorage};
pub use push_notification::{
    HttpPushNotificationSender, InMemoryPushNotificationConfigStore, PushNotificationConfigStorage,
    PushNotificationSender,
};
pub use request_handler::{DefaultRequestHandler, RequestHandler};
pub use session::Session;
pub use session_manager::SessionManager;
pub use task_store::{InMemoryTaskStore, TaskListParams, TaskListResponse, TaskStore};
pub use task_updater::TaskUpdater;
