// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Wire-level types that flow through the hook chain but are not already
//! covered by `rmcp::model` (tool calls, tool lists, and results are reused
//! directly from `rmcp` — see `hook.rs`).

use std::collections::HashMap;

use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The request half of a `tools/list` call. `rmcp` has no standalone type
/// for this (it's usually folded into `PaginatedRequestParam`), so the
/// chain carries its own, extensible via `metadata` the same way
/// `ToolCallMetadata` is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsListRequest {
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// An error the target raised while executing a tool call, handed to the
/// exception chain so a hook gets a chance to synthesize a recovery
/// response before the caller sees a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolException {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }

    /// Placeholder result used when no hook claims the exception. Never
    /// surfaced to a caller directly — `HookChain::run_exception` only
    /// returns a body when a hook aborts the exception chain.
    pub fn passthrough_result(&self) -> CallToolResult {
        CallToolResult {
            content: Some(vec![Content::text(self.message.clone())]),
            structured_content: None,
            is_error: Some(true),
        }
    }
}
