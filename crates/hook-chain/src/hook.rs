// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! The hook contract: five interception points, all defaulting to a
//! transparent pass-through so an implementer only overrides what it cares
//! about.

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult, ListToolsResult};

use crate::context::HookContext;
use crate::decision::HookDecision;
use crate::types::{ToolException, ToolsListRequest};

#[async_trait]
pub trait Hook: Send + Sync {
    /// Observe or rewrite a `tools/call` request before it reaches the
    /// target. Returning `ABORT` short-circuits the chain; the body becomes
    /// the rejection response.
    async fn process_request(
        &self,
        call: CallToolRequestParam,
        _ctx: &HookContext,
    ) -> HookDecision<CallToolRequestParam> {
        HookDecision::continue_with(call)
    }

    /// Observe or rewrite the target's response before it reaches the
    /// caller. Runs in reverse order from `process_request`.
    async fn process_response(
        &self,
        response: CallToolResult,
        _original: &CallToolRequestParam,
        _ctx: &HookContext,
    ) -> HookDecision<CallToolResult> {
        HookDecision::continue_with(response)
    }

    /// Observe or rewrite a `tools/list` request.
    async fn process_tools_list(
        &self,
        request: ToolsListRequest,
        _ctx: &HookContext,
    ) -> HookDecision<ToolsListRequest> {
        HookDecision::continue_with(request)
    }

    /// Observe or rewrite the advertised tool set before it reaches the
    /// caller.
    async fn process_tools_list_response(
        &self,
        response: ListToolsResult,
        _original: &ToolsListRequest,
        _ctx: &HookContext,
    ) -> HookDecision<ListToolsResult> {
        HookDecision::continue_with(response)
    }

    /// Given a target failure, a chance to synthesize a recovery response.
    /// `CONTINUE` means "not mine to handle" and the original error
    /// propagates; `ABORT` means the body is the recovered result.
    async fn process_tool_exception(
        &self,
        error: ToolException,
        _original: &CallToolRequestParam,
        _ctx: &HookContext,
    ) -> HookDecision<CallToolResult> {
        HookDecision::continue_with(error.passthrough_result())
    }

    fn name(&self) -> &str {
        "unnamed"
    }
}
