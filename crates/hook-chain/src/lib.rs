// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Hook contract and chain-traversal engine for intercepting MCP tool
//! traffic. This crate has no notion of how a target is reached or how a
//! session is kept — that's `proxy-server`'s job. All it knows is: given a
//! payload and a chain of hooks, run them in order and report what came
//! out the other side.

mod chain;
mod context;
mod decision;
mod definition;
mod error;
mod hook;
mod local;
mod reference;
mod remote;
mod types;

pub use chain::{HookChain, RequestOutcome, ResponseOutcome};
pub use context::{BoxFuture, HookContext, RecreateClientFn, TargetHandle};
pub use decision::{HookDecision, Verdict};
pub use definition::HookDefinition;
pub use error::HookChainError;
pub use hook::Hook;
pub use reference::{DenyToolHook, LoggingHook};
pub use remote::RemoteHook;
pub use types::{ToolException, ToolsListRequest};
