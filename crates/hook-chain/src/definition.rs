// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Tagged hook variants as they come out of configuration, normalized at
//! construction time into one uniform interface for the chain engine.

use std::sync::Arc;

use crate::hook::Hook;
use crate::local::LocalHook;
use crate::remote::RemoteHook;

pub enum HookDefinition {
    Local(Arc<dyn Hook>),
    Remote { url: String, name: String },
}

impl HookDefinition {
    pub fn local<H: Hook + 'static>(hook: H) -> Self {
        Self::Local(Arc::new(hook))
    }

    pub fn remote(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Remote {
            url: url.into(),
            name: name.into(),
        }
    }

    /// Dispatches at the edge into one uniform `Hook` interface: local hooks
    /// get panic isolation, remote hooks get an HTTP client. Past this
    /// point the chain engine never distinguishes the two.
    pub(crate) fn into_hook(self) -> Arc<dyn Hook> {
        match self {
            HookDefinition::Local(hook) => Arc::new(LocalHook::new(hook)),
            HookDefinition::Remote { url, name } => Arc::new(RemoteHook::new(url, name)),
        }
    }
}
