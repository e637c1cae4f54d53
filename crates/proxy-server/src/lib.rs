// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Session store, target-client abstraction, and `ServerHandler` dispatcher
//! for the MCP hook proxy. Owns every concrete notion of "how a target is
//! reached" and "how a session is kept" that `hook-chain` deliberately
//! knows nothing about.

pub mod dispatcher;
pub mod error;
pub mod session;
pub mod target;

pub use dispatcher::ProxyDispatcher;
pub use error::ProxyError;
pub use session::{Session, SessionStore};
pub use target::{
    ConfiguredTargetFactory, HttpStreamTargetClient, SubprocessTargetClient, TargetClient,
    TargetClientFactory, TargetConfig, TargetHandleAdapter,
};
