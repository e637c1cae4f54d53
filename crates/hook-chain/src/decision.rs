// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! The verdict a hook hands back for any interception point.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Continue,
    Abort,
}

/// A hook's answer for one interception point: the (possibly rewritten)
/// body, whether the chain should keep going, and why not if it shouldn't.
///
/// On the wire this is `{"response": "continue"|"abort", "body": ..., "reason"?: ...}` —
/// `response` rather than `verdict`, to match the remote hook contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookDecision<T> {
    #[serde(rename = "response")]
    pub verdict: Verdict,
    pub body: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl<T> HookDecision<T> {
    pub fn continue_with(body: T) -> Self {
        Self {
            verdict: Verdict::Continue,
            body,
            reason: None,
        }
    }

    pub fn abort(body: T, reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Abort,
            body,
            reason: Some(reason.into()),
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self.verdict, Verdict::Abort)
    }
}
