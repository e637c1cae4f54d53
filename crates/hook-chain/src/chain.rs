// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Traversal engine: forward over the chain for requests, reverse (from
//! wherever the request side stopped) for responses. An explicit loop with
//! a counter, not recursion — the chain length is operator-controlled and
//! there is no reason to risk a stack frame per hook.

use std::sync::Arc;

use rmcp::model::{CallToolRequestParam, CallToolResult, ListToolsResult};

use crate::context::HookContext;
use crate::decision::Verdict;
use crate::definition::HookDefinition;
use crate::hook::Hook;
use crate::types::{ToolException, ToolsListRequest};

/// Outcome of a forward traversal: the (possibly rewritten) payload, and if
/// a hook aborted, the index it aborted at and why. `payload` doubles as
/// the rejection body when `rejected` is true — a hook's ABORT body and the
/// value the caller sees back are the same value.
pub struct RequestOutcome<T> {
    pub payload: T,
    pub rejected: bool,
    pub rejection_reason: Option<String>,
    /// Index of the last hook that ran, or -1 if the chain is empty. Reverse
    /// traversal on the response side starts here.
    pub last_idx: i64,
}

pub struct ResponseOutcome<T> {
    pub payload: T,
    pub rejected: bool,
    pub rejection_reason: Option<String>,
}

pub struct HookChain {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookChain {
    pub fn new(defs: Vec<HookDefinition>) -> Self {
        let hooks = defs.into_iter().map(HookDefinition::into_hook).collect();
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub async fn run_request(
        &self,
        mut payload: CallToolRequestParam,
        ctx: &HookContext,
    ) -> RequestOutcome<CallToolRequestParam> {
        let mut last_idx: i64 = -1;
        for (idx, hook) in self.hooks.iter().enumerate() {
            let decision = hook.process_request(payload, ctx).await;
            last_idx = idx as i64;
            payload = decision.body;
            if decision.verdict == Verdict::Abort {
                tracing::info!(hook = hook.name(), idx, reason = decision.reason.as_deref(), "request rejected by hook");
                return RequestOutcome {
                    payload,
                    rejected: true,
                    rejection_reason: decision.reason,
                    last_idx,
                };
            }
        }
        RequestOutcome {
            payload,
            rejected: false,
            rejection_reason: None,
            last_idx,
        }
    }

    pub async fn run_response(
        &self,
        mut payload: CallToolResult,
        original: &CallToolRequestParam,
        start_idx: i64,
        ctx: &HookContext,
    ) -> ResponseOutcome<CallToolResult> {
        let mut idx = start_idx;
        while idx >= 0 {
            let hook = &self.hooks[idx as usize];
            let decision = hook.process_response(payload, original, ctx).await;
            payload = decision.body;
            if decision.verdict == Verdict::Abort {
                tracing::info!(hook = hook.name(), idx, reason = decision.reason.as_deref(), "response rejected by hook");
                return ResponseOutcome {
                    payload,
                    rejected: true,
                    rejection_reason: decision.reason,
                };
            }
            idx -= 1;
        }
        ResponseOutcome {
            payload,
            rejected: false,
            rejection_reason: None,
        }
    }

    pub async fn run_tools_list_request(
        &self,
        mut payload: ToolsListRequest,
        ctx: &HookContext,
    ) -> RequestOutcome<ToolsListRequest> {
        let mut last_idx: i64 = -1;
        for (idx, hook) in self.hooks.iter().enumerate() {
            let decision = hook.process_tools_list(payload, ctx).await;
            last_idx = idx as i64;
            payload = decision.body;
            if decision.verdict == Verdict::Abort {
                tracing::info!(hook = hook.name(), idx, reason = decision.reason.as_deref(), "tools/list request rejected by hook");
                return RequestOutcome {
                    payload,
                    rejected: true,
                    rejection_reason: decision.reason,
                    last_idx,
                };
            }
        }
        RequestOutcome {
            payload,
            rejected: false,
            rejection_reason: None,
            last_idx,
        }
    }

    pub async fn run_tools_list_response(
        &self,
        mut payload: ListToolsResult,
        original: &ToolsListRequest,
        start_idx: i64,
        ctx: &HookContext,
    ) -> ResponseOutcome<ListToolsResult> {
        let mut idx = start_idx;
        while idx >= 0 {
            let hook = &self.hooks[idx as usize];
            let decision = hook.process_tools_list_response(payload, original, ctx).await;
            payload = decision.body;
            if decision.verdict == Verdict::Abort {
                tracing::info!(hook = hook.name(), idx, reason = decision.reason.as_deref(), "tools/list response rejected by hook");
                return ResponseOutcome {
                    payload,
                    rejected: true,
                    rejection_reason: decision.reason,
                };
            }
            idx -= 1;
        }
        ResponseOutcome {
            payload,
            rejected: false,
            rejection_reason: None,
        }
    }

    /// Forward-only: the first hook to ABORT wins and supplies the recovery
    /// response. If none do, the original failure propagates.
    pub async fn run_exception(
        &self,
        error: ToolException,
        original: &CallToolRequestParam,
        ctx: &HookContext,
    ) -> Option<CallToolResult> {
        for hook in &self.hooks {
            let decision = hook.process_tool_exception(error.clone(), original, ctx).await;
            if decision.verdict == Verdict::Abort {
                tracing::info!(hook = hook.name(), "tool exception recovered by hook");
                return Some(decision.body);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TargetHandle;
    use crate::decision::HookDecision;
    use crate::error::HookChainError;
    use crate::hook::Hook;
    use rmcp::model::Content;
    use std::sync::Mutex as StdMutex;

    struct NullTarget;

    #[async_trait::async_trait]
    impl TargetHandle for NullTarget {
        async fn list_tools(&self) -> Result<ListToolsResult, HookChainError> {
            Ok(ListToolsResult::default())
        }

        async fn call_tool(&self, _call: CallToolRequestParam) -> Result<CallToolResult, HookChainError> {
            unimplemented!("not exercised by these tests")
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

    fn call(name: &str) -> CallToolRequestParam {
        CallToolRequestParam {
            name: name.to_string().into(),
            arguments: None,
        }
    }

    fn ok_result(text: &str) -> CallToolResult {
        CallToolResult {
            content: Some(vec![Content::text(text.to_string())]),
            structured_content: None,
            is_error: Some(false),
        }
    }

    /// Records every index it is invoked at, in invocation order, and is
    /// otherwise a pure pass-through.
    struct RecordingHook {
        idx: usize,
        visits: Arc<StdMutex<Vec<(&'static str, usize)>>>,
    }

    #[async_trait::async_trait]
    impl Hook for RecordingHook {
        async fn process_request(
            &self,
            call: CallToolRequestParam,
            _ctx: &HookContext,
        ) -> HookDecision<CallToolRequestParam> {
            self.visits.lock().unwrap().push(("request", self.idx));
            HookDecision::continue_with(call)
        }

        async fn process_response(
            &self,
            response: CallToolResult,
            _original: &CallToolRequestParam,
            _ctx: &HookContext,
        ) -> HookDecision<CallToolResult> {
            self.visits.lock().unwrap().push(("response", self.idx));
            HookDecision::continue_with(response)
        }
    }

    fn recording_chain(n: usize, visits: Arc<StdMutex<Vec<(&'static str, usize)>>>) -> HookChain {
        let hooks = (0..n)
            .map(|i| {
                HookDefinition::local(RecordingHook {
                    idx: i,
                    visits: visits.clone(),
                })
            })
            .collect();
        HookChain::new(hooks)
    }

    #[tokio::test]
    async fn pass_through_chain_leaves_payload_and_response_unchanged() {
        let visits = Arc::new(StdMutex::new(Vec::new()));
        let chain = recording_chain(3, visits.clone());
        let ctx = test_ctx();

        let request_outcome = chain.run_request(call("echo"), &ctx).await;
        assert!(!request_outcome.rejected);
        assert_eq!(request_outcome.payload.name.as_ref(), "echo");
        assert_eq!(request_outcome.last_idx, 2);

        let response_outcome = chain
            .run_response(ok_result("hi"), &request_outcome.payload, request_outcome.last_idx, &ctx)
            .await;
        assert!(!response_outcome.rejected);

        let seen = visits.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("request", 0),
                ("request", 1),
                ("request", 2),
                ("response", 2),
                ("response", 1),
                ("response", 0),
            ]
        );
    }

    #[tokio::test]
    async fn empty_chain_is_a_pure_pass_through() {
        let chain = HookChain::new(vec![]);
        let ctx = test_ctx();
        let outcome = chain.run_request(call("echo"), &ctx).await;
        assert!(!outcome.rejected);
        assert_eq!(outcome.last_idx, -1);
    }

    /// A hook that rejects any request whose tool name matches, otherwise a
    /// pass-through; never implements the response point so it only
    /// exercises the request side.
    struct RejectingHook {
        name_to_reject: &'static str,
    }

    #[async_trait::async_trait]
    impl Hook for RejectingHook {
        async fn process_request(
            &self,
            call: CallToolRequestParam,
            _ctx: &HookContext,
        ) -> HookDecision<CallToolRequestParam> {
            if call.name.as_ref() == self.name_to_reject {
                HookDecision::abort(call, "rejected by test hook")
            } else {
                HookDecision::continue_with(call)
            }
        }
    }

    #[tokio::test]
    async fn rejecting_hook_at_index_k_stops_the_target_and_reverses_from_k() {
        let visits = Arc::new(StdMutex::new(Vec::new()));
        let hooks = vec![
            HookDefinition::local(RecordingHook { idx: 0, visits: visits.clone() }),
            HookDefinition::local(RejectingHook { name_to_reject: "dangerous" }),
            HookDefinition::local(RecordingHook { idx: 2, visits: visits.clone() }),
        ];
        let chain = HookChain::new(hooks);
        let ctx = test_ctx();

        let outcome = chain.run_request(call("dangerous"), &ctx).await;
        assert!(outcome.rejected);
        assert_eq!(outcome.rejection_reason.as_deref(), Some("rejected by test hook"));
        // The rejecting hook is index 1; the third hook (index 2) must never run.
        assert_eq!(outcome.last_idx, 1);

        let response_outcome = chain
            .run_response(ok_result("n/a"), &outcome.payload, outcome.last_idx, &ctx)
            .await;
        assert!(!response_outcome.rejected);

        let seen = visits.lock().unwrap().clone();
        // Only index 0 ever saw a request or response call; index 2 was never reached.
        assert_eq!(seen, vec![("request", 0), ("response", 0)]);
    }

    /// First ABORT in the exception chain wins; later hooks are never asked.
    struct ExceptionHook {
        substring: &'static str,
        recovered_text: &'static str,
        calls: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Hook for ExceptionHook {
        async fn process_tool_exception(
            &self,
            error: ToolException,
            _original: &CallToolRequestParam,
            ctx: &HookContext,
        ) -> HookDecision<CallToolResult> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if error.message.contains(self.substring) {
                ctx.recreate_client().await;
                HookDecision::abort(ok_result(self.recovered_text), "Connection recovered")
            } else {
                HookDecision::continue_with(error.passthrough_result())
            }
        }
    }

    #[tokio::test]
    async fn exception_chain_stops_at_first_recovering_hook() {
        let later_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let hooks = vec![
            HookDefinition::local(ExceptionHook {
                substring: "Connection",
                recovered_text: "Connection recovered for session S. Please retry.",
                calls: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            }),
            HookDefinition::local(ExceptionHook {
                substring: "never-matches",
                recovered_text: "should not run",
                calls: later_calls.clone(),
            }),
        ];
        let chain = HookChain::new(hooks);
        let ctx = test_ctx();

        let recovered = chain
            .run_exception(ToolException::new("Connection failed"), &call("fetch"), &ctx)
            .await;
        let recovered = recovered.expect("first hook should have recovered the exception");
        let text = recovered.content.unwrap()[0]
            .as_text()
            .expect("recovered result should carry text content")
            .text
            .clone();
        assert_eq!(text, "Connection recovered for session S. Please retry.");
        assert_eq!(later_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exception_chain_propagates_when_no_hook_claims_it() {
        let chain = HookChain::new(vec![HookDefinition::local(ExceptionHook {
            substring: "never-matches-anything",
            recovered_text: "unused",
            calls: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        })]);
        let ctx = test_ctx();
        let recovered = chain
            .run_exception(ToolException::new("boom"), &call("fetch"), &ctx)
            .await;
        assert!(recovered.is_none());
    }
}
