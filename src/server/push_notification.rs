//! Push notification config storage and delivery.
//!
//! Two independent concerns live here: [`PushNotificationConfigStorage`]
//! persists the webhook configs a client registers via the
//! `tasks/pushNotificationConfig/*` RPCs, and [`PushNotificationSender`]
//! delivers a best-effort notification when a task reaches a terminal state.
//! Delivery failures are logged, never propagated — a client's webhook being
//! unreachable must not fail the task whose terminal event triggered it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::error::A2AResult;
use crate::types::{PushNotificationConfig, Task, TaskPushNotificationConfig};

/// Storage contract for per-task push notification configs.
///
/// Configs are keyed by `(taskId, configId)` — a task may have more than one
/// registered webhook.
#[async_trait]
pub trait PushNotificationConfigStorage: Send + Sync {
    /// Save (insert or replace) a config for a task.
    async fn save(&self, config: TaskPushNotificationConfig) -> A2AResult<()>;

    /// Fetch one config by task and config id.
    async fn get(
        &self,
        task_id: &str,
        config_id: &str,
    ) -> A2AResult<Option<TaskPushNotificationConfig>>;

    /// Fetch every config registered for a task.
    async fn get_all(&self, task_id: &str) -> A2AResult<Vec<TaskPushNotificationConfig>>;

    /// Delete a config by task and config id. No-op if absent.
    async fn delete(&self, task_id: &str, config_id: &str) -> A2AResult<()>;
}

/// In-memory [`PushNotificationConfigStorage`] — the reference implementation.
#[derive(Debug, Default)]
pub struct InMemoryPushNotificationConfigStore {
    configs: Arc<RwLock<HashMap<String, HashMap<String, TaskPushNotificationConfig>>>>,
}

impl InMemoryPushNotificationConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PushNotificationConfigStorage for InMemoryPushNotificationConfigStore {
    async fn save(&self, config: TaskPushNotificationConfig) -> A2AResult<()> {
        let config_id = config
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut configs = self.configs.write().await;
        configs
            .entry(config.task_id.clone())
            .or_default()
            .insert(config_id, config);
        Ok(())
    }

    async fn get(
        &self,
        task_id: &str,
        config_id: &str,
    ) -> A2AResult<Option<TaskPushNotificationConfig>> {
        let configs = self.configs.read().await;
        Ok(configs
            .get(task_id)
            .and_then(|by_id| by_id.get(config_id))
            .cloned())
    }

    async fn get_all(&self, task_id: &str) -> A2AResult<Vec<TaskPushNotificationConfig>> {
        let configs = self.configs.read().await;
        Ok(configs
            .get(task_id)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, task_id: &str, config_id: &str) -> A2AResult<()> {
        let mut configs = self.configs.write().await;
        if let Some(by_id) = configs.get_mut(task_id) {
            by_id.remove(config_id);
        }
        Ok(())
    }
}

/// Delivery contract for push notifications.
///
/// Implementations should treat delivery as best-effort: the server invokes
/// `send` only when a task reaches a terminal state, and any failure must be
/// logged, not returned up to the caller that drove the task to completion.
#[async_trait]
pub trait PushNotificationSender: Send + Sync {
    /// Deliver a terminal-state notification for `task` to `config`'s endpoint.
    async fn send(&self, config: &PushNotificationConfig, task: &Task);
}

/// [`PushNotificationSender`] that POSTs the task as JSON to the config's URL.
///
/// Honors `PushNotificationConfig::token` as a `X-A2A-Notification-Token`
/// header and `PushNotificationAuthenticationInfo`'s first scheme as a
/// `Bearer` credential when `credentials` is set.
pub struct HttpPushNotificationSender {
    client: reqwest::Client,
}

impl HttpPushNotificationSender {
    /// Build a sender using a fresh `reqwest::Client`.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpPushNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushNotificationSender for HttpPushNotificationSender {
    async fn send(&self, config: &PushNotificationConfig, task: &Task) {
        let mut request = self.client.post(&config.url).json(task);

        if let Some(token) = &config.token {
            request = request.header("X-A2A-Notification-Token", token);
        }

        if let Some(auth) = &config.authentication {
            if let Some(credentials) = &auth.credentials {
                if auth.schemes.iter().any(|s| s.eq_ignore_ascii_case("bearer")) {
                    request = request.bearer_auth(credentials);
                }
            }
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                warn!(
                    task_id = %task.id,
                    url = %config.url,
                    status = %resp.status(),
                    "push notification endpoint returned a non-success status"
                );
            }
            Err(err) => {
                warn!(
                    task_id = %task.id,
                    url = %config.url,
                    error = %err,
                    "failed to deliver push notification"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(task_id: &str, id: Option<&str>) -> TaskPushNotificationConfig {
        TaskPushNotificationConfig {
            id: id.map(|s| s.to_string()),
            task_id: task_id.to_string(),
            push_notification_config: PushNotificationConfig {
                id: id.map(|s| s.to_string()),
                url: "http://localhost/webhook".to_string(),
                token: None,
                authentication: None,
            },
            tenant: None,
        }
    }

    #[tokio::test]
    async fn save_and_get_roundtrip() {
        let store = InMemoryPushNotificationConfigStore::new();
        store.save(config("t1", Some("c1"))).await.unwrap();

        let fetched = store.get("t1", "c1").await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().push_notification_config.url, "http://localhost/webhook");
    }

    #[tokio::test]
    async fn get_all_returns_every_config_for_task() {
        let store = InMemoryPushNotificationConfigStore::new();
        store.save(config("t1", Some("c1"))).await.unwrap();
        store.save(config("t1", Some("c2"))).await.unwrap();
        store.save(config("t2", Some("c3"))).await.unwrap();

        let all = store.get_all("t1").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_only_that_config() {
        let store = InMemoryPushNotificationConfigStore::new();
        store.save(config("t1", Some("c1"))).await.unwrap();
        store.save(config("t1", Some("c2"))).await.unwrap();

        store.delete("t1", "c1").await.unwrap();

        let remaining = store.get_all("t1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn save_without_explicit_id_generates_one() {
        let store = InMemoryPushNotificationConfigStore::new();
        store.save(config("t1", None)).await.unwrap();
        let all = store.get_all("t1").await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
