//! Message storage — append-only per-context message history.
//!
//! The counterpart to [`TaskStore`](super::task_store::TaskStore) for the
//! non-task-shaped side of a conversation: every `Message` exchanged within a
//! context, in emission order, independent of which task (if any) carried it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::A2AResult;
use crate::types::Message;

/// Storage contract for messages, keyed by conversation context.
///
/// Implementations must preserve insertion order per `contextId`; callers
/// rely on `list` returning messages oldest-first.
#[async_trait]
pub trait MessageStorage: Send + Sync {
    /// Append a message to the history of its `context_id`.
    ///
    /// Messages without a `context_id` are not stored — a bare `Message`
    /// is only ever context history once it has been assigned one.
    async fn append(&self, message: Message) -> A2AResult<()>;

    /// List all messages recorded for the given context, oldest-first.
    async fn list(&self, context_id: &str) -> A2AResult<Vec<Message>>;
}

/// In-memory [`MessageStorage`] — the reference implementation.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    by_context: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl InMemoryMessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStorage for InMemoryMessageStore {
    async fn append(&self, message: Message) -> A2AResult<()> {
        let Some(context_id) = message.context_id.clone() else {
            debug!("dropping message with no context_id from message history");
            return Ok(());
        };

        let mut by_context = self.by_context.write().await;
        by_context.entry(context_id).or_default().push(message);
        Ok(())
    }

    async fn list(&self, context_id: &str) -> A2AResult<Vec<Message>> {
        let by_context = self.by_context.read().await;
        Ok(by_context.get(context_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn msg(context_id: &str, id: &str) -> Message {
        Message {
            message_id: id.to_string(),
            role: Role::User,
            kind: "message".to_string(),
            parts: vec![],
            context_id: Some(context_id.to_string()),
            task_id: None,
            metadata: None,
            extensions: None,
            reference_task_ids: None,
        }
    }

    #[tokio::test]
    async fn append_and_list_preserves_order() {
        let store = InMemoryMessageStore::new();
        store.append(msg("ctx-1", "m1")).await.unwrap();
        store.append(msg("ctx-1", "m2")).await.unwrap();
        store.append(msg("ctx-2", "m3")).await.unwrap();

        let ctx1 = store.list("ctx-1").await.unwrap();
        assert_eq!(ctx1.len(), 2);
        assert_eq!(ctx1[0].message_id, "m1");
        assert_eq!(ctx1[1].message_id, "m2");

        let ctx2 = store.list("ctx-2").await.unwrap();
        assert_eq!(ctx2.len(), 1);
    }

    #[tokio::test]
    async fn message_without_context_is_dropped() {
        let store = InMemoryMessageStore::new();
        let mut m = msg("ignored", "m1");
        m.context_id = None;
        store.append(m).await.unwrap();
        assert_eq!(store.list("ignored").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn unknown_context_returns_empty() {
        let store = InMemoryMessageStore::new();
        assert_eq!(store.list("nope").await.unwrap().len(), 0);
    }
}
