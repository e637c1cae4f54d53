// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

use thiserror::Error;

/// Errors a [`crate::TargetHandle`] can raise back through the chain. The
/// remote-hook RPC leg never surfaces its own transport errors this way —
/// per spec §4.2 every failure mode there degrades to `CONTINUE` instead.
#[derive(Debug, Error)]
pub enum HookChainError {
    #[error("target client error: {0}")]
    Target(String),
}
