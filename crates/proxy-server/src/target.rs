// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Target client abstraction: the proxy's single outbound connection to the
//! MCP server it fronts, reachable either as a spawned subprocess or over
//! HTTP-stream.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use hook_chain::{HookChainError, TargetHandle};
use rmcp::model::{CallToolRequestParam, CallToolResult, ClientInfo, ListToolsResult};
use rmcp::serve_client;
use rmcp::service::{Peer, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::streamable_http_client::{
    StreamableHttpClientTransport, StreamableHttpClientTransportConfig,
};
use rmcp::RoleClient;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::error::ProxyError;

/// Where the proxy's single target lives, as it comes out of configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "kebab-case")]
pub enum TargetConfig {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default)]
        cwd: Option<PathBuf>,
    },
    Http {
        url: String,
        #[serde(default)]
        auth_token: Option<String>,
    },
}

/// The capability set the dispatcher needs from a connected target. Hooks
/// get a narrower view of this through [`hook_chain::TargetHandle`].
#[async_trait]
pub trait TargetClient: Send + Sync {
    async fn list_tools(&self) -> Result<ListToolsResult, ProxyError>;
    async fn call_tool(&self, call: CallToolRequestParam) -> Result<CallToolResult, ProxyError>;
    async fn close(&self);

    /// Raw peer handle, for the `ServerHandler` methods the dispatcher
    /// forwards verbatim instead of routing through the hook chain
    /// (prompts, resources, completion, logging level, subscriptions).
    fn peer(&self) -> &Peer<RoleClient>;
}

pub struct SubprocessTargetClient {
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
}

impl SubprocessTargetClient {
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        cwd: Option<&Path>,
        client_info: ClientInfo,
    ) -> Result<Self, ProxyError> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let transport = TokioChildProcess::new(cmd)
            .map_err(|e| ProxyError::Target(format!("failed to spawn target '{command}': {e}")))?;

        let service = serve_client(client_info, transport)
            .await
            .map_err(|e| ProxyError::Target(format!("failed to initialize target client: {e}")))?;
        let peer = service.peer().clone();

        Ok(Self {
            peer,
            service: Mutex::new(Some(service)),
        })
    }
}

#[async_trait]
impl TargetClient for SubprocessTargetClient {
    async fn list_tools(&self) -> Result<ListToolsResult, ProxyError> {
        self.peer
            .list_tools(None)
            .await
            .map_err(|e| ProxyError::Target(e.to_string()))
    }

    async fn call_tool(&self, call: CallToolRequestParam) -> Result<CallToolResult, ProxyError> {
        self.peer
            .call_tool(call)
            .await
            .map_err(|e| ProxyError::Target(e.to_string()))
    }

    async fn close(&self) {
        if let Some(service) = self.service.lock().await.take() {
            if let Err(err) = service.cancel().await {
                tracing::warn!(error = %err, "error cancelling subprocess target client");
            }
        }
    }

    fn peer(&self) -> &Peer<RoleClient> {
        &self.peer
    }
}

pub struct HttpStreamTargetClient {
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
}

impl HttpStreamTargetClient {
    pub async fn connect(
        url: &str,
        auth_token: Option<&str>,
        client_info: ClientInfo,
    ) -> Result<Self, ProxyError> {
        let mut config = StreamableHttpClientTransportConfig::with_uri(url);
        if let Some(token) = auth_token {
            config = config.auth_header(token.to_string());
        }
        let transport = StreamableHttpClientTransport::from_config(config);

        let service = serve_client(client_info, transport)
            .await
            .map_err(|e| ProxyError::Target(format!("failed to connect to target '{url}': {e}")))?;
        let peer = service.peer().clone();

        Ok(Self {
            peer,
            service: Mutex::new(Some(service)),
        })
    }
}

#[async_trait]
impl TargetClient for HttpStreamTargetClient {
    async fn list_tools(&self) -> Result<ListToolsResult, ProxyError> {
        self.peer
            .list_tools(None)
            .await
            .map_err(|e| ProxyError::Target(e.to_string()))
    }

    async fn call_tool(&self, call: CallToolRequestParam) -> Result<CallToolResult, ProxyError> {
        self.peer
            .call_tool(call)
            .await
            .map_err(|e| ProxyError::Target(e.to_string()))
    }

    async fn close(&self) {
        if let Some(service) = self.service.lock().await.take() {
            if let Err(err) = service.cancel().await {
                tracing::warn!(error = %err, "error cancelling HTTP target client");
            }
        }
    }

    fn peer(&self) -> &Peer<RoleClient> {
        &self.peer
    }
}

/// Builds a [`TargetClient`] from configuration. Injectable so tests can
/// swap in an in-memory fake without touching the dispatcher.
#[async_trait]
pub trait TargetClientFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn TargetClient>, ProxyError>;
}

pub struct ConfiguredTargetFactory {
    pub target: TargetConfig,
    pub client_info: ClientInfo,
}

#[async_trait]
impl TargetClientFactory for ConfiguredTargetFactory {
    async fn create(&self) -> Result<Arc<dyn TargetClient>, ProxyError> {
        match &self.target {
            TargetConfig::Stdio {
                command,
                args,
                env,
                cwd,
            } => {
                let client = SubprocessTargetClient::connect(
                    command,
                    args,
                    env,
                    cwd.as_deref(),
                    self.client_info.clone(),
                )
                .await?;
                Ok(Arc::new(client))
            }
            TargetConfig::Http { url, auth_token } => {
                let client =
                    HttpStreamTargetClient::connect(url, auth_token.as_deref(), self.client_info.clone())
                        .await?;
                Ok(Arc::new(client))
            }
        }
    }
}

/// Adapts the proxy's full [`TargetClient`] down to the narrower handle a
/// hook is allowed to see, per [`hook_chain::TargetHandle`].
pub struct TargetHandleAdapter(pub Arc<dyn TargetClient>);

#[async_trait]
impl TargetHandle for TargetHandleAdapter {
    async fn list_tools(&self) -> Result<ListToolsResult, HookChainError> {
        self.0
            .list_tools()
            .await
            .map_err(|e| HookChainError::Target(e.to_string()))
    }

    async fn call_tool(&self, call: CallToolRequestParam) -> Result<CallToolResult, HookChainError> {
        self.0
            .call_tool(call)
            .await
            .map_err(|e| HookChainError::Target(e.to_string()))
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// In-memory target used by session/dispatcher tests: returns a fixed
    /// tool list and echoes call arguments back as the result.
    pub struct FakeTargetClient {
        pub tools: RwLock<ListToolsResult>,
        pub calls: AtomicUsize,
        pub closed: AtomicUsize,
    }

    impl FakeTargetClient {
        pub fn new(tools: ListToolsResult) -> Self {
            Self {
                tools: RwLock::new(tools),
                calls: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TargetClient for FakeTargetClient {
        async fn list_tools(&self) -> Result<ListToolsResult, ProxyError> {
            Ok(self.tools.read().await.clone())
        }

        async fn call_tool(&self, call: CallToolRequestParam) -> Result<CallToolResult, ProxyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CallToolResult {
                content: Some(vec![rmcp::model::Content::text(format!(
                    "echo:{}:{}",
                    call.name,
                    serde_json::to_string(&call.arguments).unwrap_or_default()
                ))]),
                structured_content: None,
                is_error: Some(false),
            })
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }

        fn peer(&self) -> &rmcp::service::Peer<rmcp::RoleClient> {
            unimplemented!("fake target has no underlying peer; not exercised by these tests")
        }
    }

    pub struct FakeTargetFactory {
        pub tools: ListToolsResult,
    }

    #[async_trait]
    impl TargetClientFactory for FakeTargetFactory {
        async fn create(&self) -> Result<Arc<dyn TargetClient>, ProxyError> {
            Ok(Arc::new(FakeTargetClient::new(self.tools.clone())))
        }
    }
}
