// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Minimal hook implementations. These exist to exercise the chain in
//! tests and to give an integrator a working starting point — real
//! deployments are expected to bring their own.

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult};

use crate::context::HookContext;
use crate::decision::HookDecision;
use crate::hook::Hook;

/// Logs every request and response at `info` level. Never rejects
/// anything.
pub struct LoggingHook {
    name: &'static str,
}

impl LoggingHook {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new("logging")
    }
}

#[async_trait]
impl Hook for LoggingHook {
    async fn process_request(
        &self,
        call: CallToolRequestParam,
        ctx: &HookContext,
    ) -> HookDecision<CallToolRequestParam> {
        tracing::info!(session_id = %ctx.session_id, tool = %call.name, "tool call");
        HookDecision::continue_with(call)
    }

    async fn process_response(
        &self,
        response: CallToolResult,
        original: &CallToolRequestParam,
        ctx: &HookContext,
    ) -> HookDecision<CallToolResult> {
        tracing::info!(session_id = %ctx.session_id, tool = %original.name, is_error = response.is_error.unwrap_or(false), "tool response");
        HookDecision::continue_with(response)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Rejects any call to a named tool outright. Useful as a smoke test for
/// the ABORT path, or as a starting point for an allow/deny-list hook.
pub struct DenyToolHook {
    name: &'static str,
    denied: Vec<String>,
}

impl DenyToolHook {
    pub fn new(name: &'static str, denied: Vec<String>) -> Self {
        Self { name, denied }
    }
}

#[async_trait]
impl Hook for DenyToolHook {
    async fn process_request(
        &self,
        call: CallToolRequestParam,
        _ctx: &HookContext,
    ) -> HookDecision<CallToolRequestParam> {
        if self.denied.iter().any(|d| d.as_str() == call.name.as_ref()) {
            let reason = format!("tool '{}' is denied", call.name);
            return HookDecision::abort(call, reason);
        }
        HookDecision::continue_with(call)
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TargetHandle;
    use crate::error::HookChainError;
    use rmcp::model::ListToolsResult;
    use std::sync::Arc;

    struct NullTarget;

    #[async_trait]
    impl TargetHandle for NullTarget {
        async fn list_tools(&self) -> Result<ListToolsResult, HookChainError> {
            Ok(ListToolsResult::default())
        }

        async fn call_tool(&self, _call: CallToolRequestParam) -> Result<CallToolResult, HookChainError> {
            Ok(CallToolResult {
                content: None,
                structured_content: None,
                is_error: Some(false),
            })
        }
    }

    fn test_ctx() -> HookContext {
        let target: Arc<dyn TargetHandle> = Arc::new(NullTarget);
        let recreate_target = target.clone();
        HookContext::new(
            "session-1",
            target,
            Arc::new(move || {
                let target = recreate_target.clone();
                Box::pin(async move { target })
            }),
        )
    }

    #[tokio::test]
    async fn deny_tool_hook_rejects_named_tool() {
        let hook = DenyToolHook::new("deny", vec!["dangerous".to_string()]);
        let ctx = test_ctx();
        let call = CallToolRequestParam {
            name: "dangerous".into(),
            arguments: None,
        };
        let decision = hook.process_request(call, &ctx).await;
        assert!(decision.is_abort());
    }

    #[tokio::test]
    async fn deny_tool_hook_passes_other_tools() {
        let hook = DenyToolHook::new("deny", vec!["dangerous".to_string()]);
        let ctx = test_ctx();
        let call = CallToolRequestParam {
            name: "safe".into(),
            arguments: None,
        };
        let decision = hook.process_request(call, &ctx).await;
        assert!(!decision.is_abort());
    }
}
