//! Session — the lifetime of one `AgentExecutor::execute` invocation.
//!
//! A `Session` owns exactly one spawned agent-execution task and the
//! [`SessionEventProcessor`] that invocation publishes through. It exists
//! from the moment a new task/context starts being worked until the agent
//! finishes, is canceled, or fails.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::error::{A2AError, A2AResult};

use super::agent_executor::{AgentExecutor, RequestContext};
use super::event_processor::SessionEventProcessor;

/// Wraps one running `AgentExecutor::execute` invocation.
///
/// `start` spawns the executor's `execute` future on the Tokio runtime;
/// `join` awaits its completion (propagating panics as `InternalError` and
/// cancellation as-is, never wrapped); `close` tears down the processor's
/// stream, which also unblocks any consumer still awaiting `events()`.
pub struct Session {
    context_id: String,
    processor: Arc<SessionEventProcessor>,
    handle: Mutex<Option<JoinHandle<A2AResult<()>>>>,
}

impl Session {
    /// Spawn `executor.execute(context, processor)` and return the `Session`
    /// that tracks it.
    ///
    /// The caller is responsible for choosing `processor`'s `contextId` to
    /// match `context.context_id`.
    pub fn start(
        executor: Arc<dyn AgentExecutor>,
        context: RequestContext,
        processor: Arc<SessionEventProcessor>,
    ) -> Self {
        let context_id = processor.context_id().to_string();
        let proc_for_task = Arc::clone(&processor);

        let handle = tokio::spawn(async move {
            let result = executor.execute(context, Arc::clone(&proc_for_task)).await;
            if let Err(ref err) = result {
                error!(error = %err, "agent execution ended with an error");
                proc_for_task.close_exceptionally(err.clone()).await;
            } else {
                proc_for_task.close().await;
            }
            result
        });

        Self {
            context_id,
            processor,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// The `contextId` this session's processor is bound to.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// The task IDs this session's execution has touched so far.
    pub async fn task_ids(&self) -> std::collections::HashSet<String> {
        self.processor.task_ids().await
    }

    /// The event processor this session's executor publishes through.
    pub fn processor(&self) -> Arc<SessionEventProcessor> {
        Arc::clone(&self.processor)
    }

    /// Await the underlying execution to completion.
    ///
    /// A panic inside the executor surfaces as `InternalError`; a
    /// cancellation (the join handle having been aborted) propagates as the
    /// `JoinError`'s cancellation, not wrapped in `A2AError`.
    pub async fn join(&self) -> A2AResult<()> {
        let handle = self.handle.lock().await.take();
        let Some(handle) = handle else {
            return Ok(());
        };

        match handle.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_cancelled() => {
                warn!(context_id = %self.context_id, "session execution was canceled");
                Ok(())
            }
            Err(join_err) => Err(A2AError::internal_error(format!(
                "agent execution panicked: {join_err}"
            ))),
        }
    }

    /// Abort the running execution (if still running) and close its stream.
    pub async fn close(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
        self.processor.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::message_store::InMemoryMessageStore;
    use crate::server::task_store::InMemoryTaskStore;
    use crate::types::{Message, Role};
    use async_trait::async_trait;

    struct ImmediateCompleteExecutor;

    #[async_trait]
    impl AgentExecutor for ImmediateCompleteExecutor {
        async fn execute(
            &self,
            context: RequestContext,
            processor: Arc<SessionEventProcessor>,
        ) -> A2AResult<()> {
            use crate::server::task_updater::TaskUpdater;
            let updater =
                TaskUpdater::new(processor, context.task_id.clone(), context.context_id.clone());
            updater.complete(None).await
        }

        async fn cancel(&self, _context: RequestContext, _session: Arc<Session>) -> A2AResult<()> {
            Ok(())
        }
    }

    fn context() -> RequestContext {
        RequestContext {
            task_id: "t1".to_string(),
            context_id: "ctx1".to_string(),
            message: Some(Message {
                message_id: "m1".to_string(),
                role: Role::User,
                kind: "message".to_string(),
                parts: vec![],
                context_id: Some("ctx1".to_string()),
                task_id: Some("t1".to_string()),
                metadata: None,
                extensions: None,
                reference_task_ids: None,
            }),
            task: None,
            configuration: None,
            related_tasks: vec![],
            metadata: None,
            call_context: None,
        }
    }

    #[tokio::test]
    async fn start_and_join_runs_executor_to_completion() {
        let executor: Arc<dyn AgentExecutor> = Arc::new(ImmediateCompleteExecutor);
        let processor = Arc::new(SessionEventProcessor::new(
            "ctx1",
            Arc::new(InMemoryTaskStore::new()) as Arc<dyn crate::server::task_store::TaskStore>,
            Arc::new(InMemoryMessageStore::new())
                as Arc<dyn crate::server::message_store::MessageStorage>,
        ));

        let session = Session::start(executor, context(), Arc::clone(&processor));
        session.join().await.unwrap();

        let task = processor.current_task().await.unwrap();
        assert_eq!(task.status.state, crate::types::TaskState::Completed);
    }
}
