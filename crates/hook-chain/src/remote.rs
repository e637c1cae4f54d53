// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Client for a hook implemented out-of-process: a POST per interception
//! point, JSON request/response, with network failure, timeout, decode
//! failure, and "operation not implemented" all degrading to CONTINUE so a
//! single misbehaving remote hook never takes the chain down.

use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult, ListToolsResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::HookContext;
use crate::decision::{HookDecision, Verdict};
use crate::hook::Hook;
use crate::types::{ToolException, ToolsListRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RemoteHook {
    url: String,
    name: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl RemoteHook {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            http: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends `{"method": method, "params": params}` and interprets the
    /// response as a `HookDecision<T>`. Every failure mode resolves to
    /// `None`, meaning "continue unchanged" to the caller.
    async fn invoke<P, T>(&self, method: &str, params: &P) -> Option<HookDecision<T>>
    where
        P: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = serde_json::json!({ "method": method, "params": params });

        let send = self.http.post(&self.url).json(&body).send();
        let response = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                tracing::error!(hook = %self.name, method, error = %err, "remote hook request failed; continuing");
                return None;
            }
            Err(_) => {
                tracing::error!(hook = %self.name, method, timeout_secs = self.timeout.as_secs(), "remote hook timed out; continuing");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::error!(hook = %self.name, method, status = %response.status(), "remote hook returned a non-2xx status; continuing");
            return None;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(hook = %self.name, method, error = %err, "failed to read remote hook response body; continuing");
                return None;
            }
        };

        match serde_json::from_str::<RawDecision<T>>(&text) {
            Ok(raw) => Some(raw.into_decision()),
            Err(err) => {
                if text.contains("not implemented") {
                    tracing::debug!(hook = %self.name, method, "remote hook does not implement this operation; continuing");
                } else {
                    tracing::error!(hook = %self.name, method, error = %err, "remote hook returned an unparseable decision; continuing");
                }
                None
            }
        }
    }
}

/// Mirrors `HookDecision` but keeps `response` as a raw string first, so an
/// unrecognized verdict value can be turned into an explicit ABORT rather
/// than a blanket decode failure.
#[derive(serde::Deserialize)]
struct RawDecision<T> {
    response: String,
    body: T,
    #[serde(default)]
    reason: Option<String>,
}

impl<T> RawDecision<T> {
    fn into_decision(self) -> HookDecision<T> {
        match self.response.as_str() {
            "continue" => HookDecision {
                verdict: Verdict::Continue,
                body: self.body,
                reason: self.reason,
            },
            "abort" => HookDecision {
                verdict: Verdict::Abort,
                body: self.body,
                reason: self.reason,
            },
            other => {
                tracing::error!(response = other, "remote hook returned an unrecognized verdict; treating as abort");
                HookDecision::abort(self.body, "invalid hook response")
            }
        }
    }
}

#[async_trait]
impl Hook for RemoteHook {
    async fn process_request(
        &self,
        call: CallToolRequestParam,
        _ctx: &HookContext,
    ) -> HookDecision<CallToolRequestParam> {
        match self.invoke("processRequest", &call).await {
            Some(decision) => decision,
            None => HookDecision::continue_with(call),
        }
    }

    async fn process_response(
        &self,
        response: CallToolResult,
        original: &CallToolRequestParam,
        _ctx: &HookContext,
    ) -> HookDecision<CallToolResult> {
        let params = serde_json::json!({ "response": &response, "originalToolCall": original });
        match self.invoke("processResponse", &params).await {
            Some(decision) => decision,
            None => HookDecision::continue_with(response),
        }
    }

    async fn process_tools_list(
        &self,
        request: ToolsListRequest,
        _ctx: &HookContext,
    ) -> HookDecision<ToolsListRequest> {
        match self.invoke("processToolsList", &request).await {
            Some(decision) => decision,
            None => HookDecision::continue_with(request),
        }
    }

    async fn process_tools_list_response(
        &self,
        response: ListToolsResult,
        original: &ToolsListRequest,
        _ctx: &HookContext,
    ) -> HookDecision<ListToolsResult> {
        let params = serde_json::json!({ "response": &response, "originalRequest": original });
        match self.invoke("processToolsListResponse", &params).await {
            Some(decision) => decision,
            None => HookDecision::continue_with(response),
        }
    }

    async fn process_tool_exception(
        &self,
        error: ToolException,
        original: &CallToolRequestParam,
        _ctx: &HookContext,
    ) -> HookDecision<CallToolResult> {
        let params = serde_json::json!({ "error": &error, "originalToolCall": original });
        match self.invoke("processToolException", &params).await {
            Some(decision) => decision,
            None => HookDecision::continue_with(error.passthrough_result()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl RemoteHook {
    pub fn url(&self) -> &str {
        &self.url
    }
}
