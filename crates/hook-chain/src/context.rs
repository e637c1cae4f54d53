// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! The capability handle hooks receive alongside every interception point.
//!
//! `hook-chain` has no notion of subprocesses or HTTP — `proxy-server` owns
//! those concretely and hands the chain an opaque [`TargetHandle`] plus a
//! closure that knows how to recreate one. This keeps the dependency edge
//! one-directional (`proxy-server` depends on `hook-chain`, never the
//! reverse) while still letting a hook reach the target or force a
//! reconnect.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult, ListToolsResult};

use crate::error::HookChainError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Minimal surface of a target MCP connection that a hook is allowed to
/// touch. The concrete client (subprocess or HTTP-stream) lives in
/// `proxy-server` and implements this directly.
#[async_trait]
pub trait TargetHandle: Send + Sync {
    async fn list_tools(&self) -> Result<ListToolsResult, HookChainError>;
    async fn call_tool(&self, call: CallToolRequestParam) -> Result<CallToolResult, HookChainError>;
}

/// Bound to a session's slot in the session store. Calling it atomically
/// replaces that session's target client and returns the new handle; a hook
/// must not cache the handle it receives across invocations since the store
/// may swap it out from under it.
pub type RecreateClientFn = Arc<dyn Fn() -> BoxFuture<'static, Arc<dyn TargetHandle>> + Send + Sync>;

#[derive(Clone)]
pub struct HookContext {
    pub context_type: &'static str,
    pub session_id: String,
    pub target: Arc<dyn TargetHandle>,
    recreate: RecreateClientFn,
}

impl HookContext {
    pub fn new(
        session_id: impl Into<String>,
        target: Arc<dyn TargetHandle>,
        recreate: RecreateClientFn,
    ) -> Self {
        Self {
            context_type: "passthrough-server",
            session_id: session_id.into(),
            target,
            recreate,
        }
    }

    pub async fn recreate_client(&self) -> Arc<dyn TargetHandle> {
        (self.recreate)().await
    }
}
