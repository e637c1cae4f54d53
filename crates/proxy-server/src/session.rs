// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Session store: tracks one target-client connection and a request
//! counter per session id. Creation of a given id is serialized so two
//! concurrent first-requests for the same new session don't each spawn
//! their own target client; creation of distinct ids proceeds concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hook_chain::{HookContext, RecreateClientFn, TargetHandle};
use tokio::sync::{Notify, RwLock};
use uuid::Uuid;

use crate::error::ProxyError;
use crate::target::{TargetClient, TargetClientFactory, TargetHandleAdapter};

pub struct Session {
    pub id: String,
    target: RwLock<Arc<dyn TargetClient>>,
    request_count: AtomicU64,
}

impl Session {
    pub async fn target(&self) -> Arc<dyn TargetClient> {
        self.target.read().await.clone()
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Builds the hook-invocation context for one request against this
    /// session.
    pub async fn hook_context(self: &Arc<Self>, store: Arc<SessionStore>) -> HookContext {
        let target: Arc<dyn TargetHandle> = Arc::new(TargetHandleAdapter(self.target().await));
        HookContext::new(self.id.clone(), target, recreate_fn(store, self.clone()))
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    creating: tokio::sync::Mutex<HashMap<String, Arc<Notify>>>,
    factory: Arc<dyn TargetClientFactory>,
}

impl SessionStore {
    pub fn new(factory: Arc<dyn TargetClientFactory>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            creating: tokio::sync::Mutex::new(HashMap::new()),
            factory,
        }
    }

    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Looks up a session by id, creating (and connecting) it if absent.
    /// Concurrent calls for the same never-seen id block on each other;
    /// only one of them actually invokes the target-client factory.
    pub async fn get_or_create(&self, id: &str) -> Result<Arc<Session>, ProxyError> {
        loop {
            if let Some(session) = self.sessions.read().await.get(id) {
                return Ok(session.clone());
            }

            let wait_on = {
                let mut creating = self.creating.lock().await;
                if let Some(existing) = creating.get(id) {
                    Some(existing.clone())
                } else {
                    creating.insert(id.to_string(), Arc::new(Notify::new()));
                    None
                }
            };

            let Some(notify) = wait_on else {
                // We hold the creation slot for `id`.
                let result = self.factory.create().await;
                let notify = self.creating.lock().await.remove(id);

                return match result {
                    Ok(target) => {
                        let session = Arc::new(Session {
                            id: id.to_string(),
                            target: RwLock::new(target),
                            request_count: AtomicU64::new(0),
                        });
                        self.sessions
                            .write()
                            .await
                            .insert(id.to_string(), session.clone());
                        if let Some(notify) = notify {
                            notify.notify_waiters();
                        }
                        Ok(session)
                    }
                    Err(err) => {
                        if let Some(notify) = notify {
                            notify.notify_waiters();
                        }
                        Err(err)
                    }
                };
            };

            notify.notified().await;
        }
    }

    /// Fetches (or creates) the session for `id` and marks one more request
    /// against it.
    pub async fn for_request(&self, id: &str) -> Result<Arc<Session>, ProxyError> {
        let session = self.get_or_create(id).await?;
        session.record_request();
        Ok(session)
    }

    pub async fn clear(&self, id: &str) {
        if let Some(session) = self.sessions.write().await.remove(id) {
            session.target().await.close().await;
        }
    }

    pub async fn clear_all(&self) {
        let drained: Vec<_> = self.sessions.write().await.drain().collect();
        futures::future::join_all(drained.into_iter().map(|(_, session)| async move {
            session.target().await.close().await;
        }))
        .await;
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn recreate(&self, session: &Session) -> Arc<dyn TargetHandle> {
        match self.factory.create().await {
            Ok(new_target) => {
                let old = {
                    let mut guard = session.target.write().await;
                    let old = guard.clone();
                    *guard = new_target.clone();
                    old
                };
                old.close().await;
                Arc::new(TargetHandleAdapter(new_target))
            }
            Err(err) => {
                tracing::error!(session_id = %session.id, error = %err, "failed to recreate target client; keeping existing connection");
                Arc::new(TargetHandleAdapter(session.target().await))
            }
        }
    }
}

fn recreate_fn(store: Arc<SessionStore>, session: Arc<Session>) -> RecreateClientFn {
    Arc::new(move || {
        let store = store.clone();
        let session = session.clone();
        Box::pin(async move { store.recreate(&session).await })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::fake::FakeTargetFactory;
    use rmcp::model::ListToolsResult;
    use std::sync::atomic::AtomicUsize;

    fn store_with_fake() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(Arc::new(FakeTargetFactory {
            tools: ListToolsResult::default(),
        })))
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_for_same_id() {
        let store = store_with_fake();
        let a = store.get_or_create("s1").await.unwrap();
        let b = store.get_or_create("s1").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_creation_of_same_id_creates_once() {
        let created = Arc::new(AtomicUsize::new(0));

        struct CountingFactory {
            created: Arc<AtomicUsize>,
        }

        #[async_trait::async_trait]
        impl TargetClientFactory for CountingFactory {
            async fn create(&self) -> Result<Arc<dyn TargetClient>, ProxyError> {
                self.created.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(Arc::new(crate::target::fake::FakeTargetClient::new(
                    ListToolsResult::default(),
                )))
            }
        }

        let store = Arc::new(SessionStore::new(Arc::new(CountingFactory {
            created: created.clone(),
        })));

        let (a, b) = tokio::join!(store.get_or_create("dup"), store.get_or_create("dup"));
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_ids_create_independently() {
        let store = store_with_fake();
        let a = store.get_or_create("s1").await.unwrap();
        let b = store.get_or_create("s2").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn for_request_increments_counter() {
        let store = store_with_fake();
        let session = store.for_request("s1").await.unwrap();
        assert_eq!(session.request_count(), 1);
        store.for_request("s1").await.unwrap();
        assert_eq!(session.request_count(), 2);
    }

    #[tokio::test]
    async fn clear_removes_session_and_closes_target() {
        use rmcp::model::{CallToolRequestParam, CallToolResult};

        struct TrackedTarget {
            closed: Arc<AtomicUsize>,
        }

        #[async_trait::async_trait]
        impl TargetClient for TrackedTarget {
            async fn list_tools(&self) -> Result<ListToolsResult, ProxyError> {
                Ok(ListToolsResult::default())
            }
            async fn call_tool(&self, _call: CallToolRequestParam) -> Result<CallToolResult, ProxyError> {
                unimplemented!("not exercised by this test")
            }
            async fn close(&self) {
                self.closed.fetch_add(1, Ordering::SeqCst);
            }

            fn peer(&self) -> &rmcp::service::Peer<rmcp::RoleClient> {
                unimplemented!("not exercised by this test")
            }
        }

        struct TrackedFactory {
            closed: Arc<AtomicUsize>,
        }

        #[async_trait::async_trait]
        impl TargetClientFactory for TrackedFactory {
            async fn create(&self) -> Result<Arc<dyn TargetClient>, ProxyError> {
                Ok(Arc::new(TrackedTarget {
                    closed: self.closed.clone(),
                }))
            }
        }

        let closed = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(SessionStore::new(Arc::new(TrackedFactory {
            closed: closed.clone(),
        })));
        store.get_or_create("s1").await.unwrap();
        store.clear("s1").await;
        assert_eq!(store.count().await, 0);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_all_empties_the_store() {
        let store = store_with_fake();
        store.get_or_create("s1").await.unwrap();
        store.get_or_create("s2").await.unwrap();
        store.clear_all().await;
        assert_eq!(store.count().await, 0);
    }
}
