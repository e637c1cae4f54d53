// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Wraps an in-process [`Hook`] so a panic inside it degrades to CONTINUE
//! with the unchanged payload instead of taking the whole chain down.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use rmcp::model::{CallToolRequestParam, CallToolResult, ListToolsResult};

use crate::context::HookContext;
use crate::decision::HookDecision;
use crate::hook::Hook;
use crate::types::{ToolException, ToolsListRequest};

pub struct LocalHook {
    inner: Arc<dyn Hook>,
}

impl LocalHook {
    pub fn new(inner: Arc<dyn Hook>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Hook for LocalHook {
    async fn process_request(
        &self,
        call: CallToolRequestParam,
        ctx: &HookContext,
    ) -> HookDecision<CallToolRequestParam> {
        let fallback = call.clone();
        let inner = self.inner.clone();
        let ctx = ctx.clone();
        match AssertUnwindSafe(async move { inner.process_request(call, &ctx).await })
            .catch_unwind()
            .await
        {
            Ok(decision) => decision,
            Err(_) => {
                tracing::error!(hook = self.inner.name(), "hook panicked in process_request; continuing with unchanged payload");
                HookDecision::continue_with(fallback)
            }
        }
    }

    async fn process_response(
        &self,
        response: CallToolResult,
        original: &CallToolRequestParam,
        ctx: &HookContext,
    ) -> HookDecision<CallToolResult> {
        let fallback = response.clone();
        let inner = self.inner.clone();
        let original = original.clone();
        let ctx = ctx.clone();
        match AssertUnwindSafe(async move { inner.process_response(response, &original, &ctx).await })
            .catch_unwind()
            .await
        {
            Ok(decision) => decision,
            Err(_) => {
                tracing::error!(hook = self.inner.name(), "hook panicked in process_response; continuing with unchanged payload");
                HookDecision::continue_with(fallback)
            }
        }
    }

    async fn process_tools_list(
        &self,
        request: ToolsListRequest,
        ctx: &HookContext,
    ) -> HookDecision<ToolsListRequest> {
        let fallback = request.clone();
        let inner = self.inner.clone();
        let ctx = ctx.clone();
        match AssertUnwindSafe(async move { inner.process_tools_list(request, &ctx).await })
            .catch_unwind()
            .await
        {
            Ok(decision) => decision,
            Err(_) => {
                tracing::error!(hook = self.inner.name(), "hook panicked in process_tools_list; continuing with unchanged payload");
                HookDecision::continue_with(fallback)
            }
        }
    }

    async fn process_tools_list_response(
        &self,
        response: ListToolsResult,
        original: &ToolsListRequest,
        ctx: &HookContext,
    ) -> HookDecision<ListToolsResult> {
        let fallback = response.clone();
        let inner = self.inner.clone();
        let original = original.clone();
        let ctx = ctx.clone();
        match AssertUnwindSafe(async move {
            inner.process_tools_list_response(response, &original, &ctx).await
        })
        .catch_unwind()
        .await
        {
            Ok(decision) => decision,
            Err(_) => {
                tracing::error!(hook = self.inner.name(), "hook panicked in process_tools_list_response; continuing with unchanged payload");
                HookDecision::continue_with(fallback)
            }
        }
    }

    async fn process_tool_exception(
        &self,
        error: ToolException,
        original: &CallToolRequestParam,
        ctx: &HookContext,
    ) -> HookDecision<CallToolResult> {
        let fallback = error.passthrough_result();
        let inner = self.inner.clone();
        let original = original.clone();
        let ctx = ctx.clone();
        match AssertUnwindSafe(async move { inner.process_tool_exception(error, &original, &ctx).await })
            .catch_unwind()
            .await
        {
            Ok(decision) => decision,
            Err(_) => {
                tracing::error!(hook = self.inner.name(), "hook panicked in process_tool_exception; continuing with unchanged payload");
                HookDecision::continue_with(fallback)
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
