// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

use rmcp::model::{ErrorCode, ErrorData};
use thiserror::Error;

/// The proxy's internal error type. Every variant maps to one of the
/// JSON-RPC error codes the dispatcher promises callers.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("target client error: {0}")]
    Target(String),

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("request rejected: {reason}")]
    RequestRejected {
        reason: String,
        body: serde_json::Value,
    },

    #[error("response rejected: {reason}")]
    ResponseRejected {
        reason: String,
        body: serde_json::Value,
    },

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("malformed request: {0}")]
    Parse(String),

    #[error(transparent)]
    HookChain(#[from] hook_chain::HookChainError),
}

impl From<ProxyError> for ErrorData {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Parse(msg) => ErrorData::parse_error(msg, None),
            ProxyError::RequestRejected { reason, body } => {
                ErrorData::new(ErrorCode(-32001), reason, Some(body))
            }
            ProxyError::ResponseRejected { reason, body } => {
                ErrorData::new(ErrorCode(-32002), reason, Some(body))
            }
            ProxyError::SessionNotFound(id) => {
                ErrorData::new(ErrorCode::INVALID_PARAMS, format!("unknown session '{id}'"), None)
            }
            ProxyError::UnknownMethod(method) => {
                ErrorData::new(ErrorCode::METHOD_NOT_FOUND, method, None)
            }
            ProxyError::Target(msg) => ErrorData::internal_error(msg, None),
            ProxyError::HookChain(err) => ErrorData::internal_error(err.to_string(), None),
        }
    }
}
