// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! The proxy's `ServerHandler`: resolves a session, runs the hook chain
//! around every `tools/list` and `tools/call`, and forwards everything
//! else straight through to the target's peer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use arc_swap::ArcSwap;
use hook_chain::{HookChain, ToolException, ToolsListRequest};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, CompleteRequestParam, CompleteResult, Content,
    ErrorData, GetPromptRequestParam, GetPromptResult, Implementation, ListPromptsResult,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, PaginatedRequestParam,
    ReadResourceRequestParam, ReadResourceResult, ServerCapabilities, ServerInfo,
    SetLevelRequestParam, SubscribeRequestParam, Tool, ToolsCapability, UnsubscribeRequestParam,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ServerHandler;

use crate::error::ProxyError;
use crate::session::SessionStore;

/// The stand-in result a request-chain ABORT hands to the reverse response
/// chain as `response₀` (spec §4.3's `startIdx`/rejection-body rule). Shaped
/// like the response-hook-ABORT result in §4.3 so a wrapping hook can't tell
/// the two cases apart.
fn rejection_as_response(reason: &str) -> CallToolResult {
    CallToolResult {
        content: Some(vec![Content::text(reason.to_string())]),
        structured_content: None,
        is_error: Some(true),
    }
}

#[derive(Clone)]
pub struct ProxyDispatcher {
    store: Arc<SessionStore>,
    chain: Arc<HookChain>,
    server_info: Implementation,
    instructions: Option<String>,
    discovered_tools: Arc<ArcSwap<Vec<Tool>>>,
    session_id: String,
}

impl ProxyDispatcher {
    pub fn new(
        store: Arc<SessionStore>,
        chain: Arc<HookChain>,
        server_info: Implementation,
        instructions: Option<String>,
    ) -> Self {
        Self {
            store,
            chain,
            server_info,
            instructions,
            discovered_tools: Arc::new(ArcSwap::from_pointee(Vec::new())),
            session_id: "default".to_string(),
        }
    }

    /// Binds a clone of this dispatcher to a freshly generated session id.
    /// Called once per inbound HTTP connection, mirroring the way the
    /// stdio entry point runs a single dispatcher bound to `"default"`.
    pub fn for_new_session(&self) -> Self {
        Self {
            session_id: SessionStore::generate_id(),
            ..self.clone()
        }
    }

    pub fn advertised_tools(&self) -> Vec<Tool> {
        (**self.discovered_tools.load()).clone()
    }

    /// Pre-warms the advertised tool set. The stdio entry point calls this
    /// once at startup; HTTP sessions warm it lazily on their own first
    /// `tools/list`.
    pub async fn discover(&self) -> Result<(), ProxyError> {
        self.run_list_tools().await.map(|_| ())
    }

    async fn run_call_tool(&self, params: CallToolRequestParam) -> Result<CallToolResult, ProxyError> {
        let session = self.store.for_request(&self.session_id).await?;
        let ctx = session.hook_context(self.store.clone()).await;

        let request_outcome = self.chain.run_request(params, &ctx).await;
        if request_outcome.rejected {
            let reason = request_outcome
                .rejection_reason
                .unwrap_or_else(|| "rejected by hook chain".to_string());
            // Spec §4.3/§8 invariant 2: the response chain still traverses
            // lastIdx..0 with the rejection body as response₀, so wrapping
            // hooks observe (and may transform) what the caller gets back.
            let rejected_call = request_outcome.payload;
            let response_outcome = self
                .chain
                .run_response(rejection_as_response(&reason), &rejected_call, request_outcome.last_idx, &ctx)
                .await;
            let reason = response_outcome.rejection_reason.unwrap_or(reason);
            let body = serde_json::to_value(&response_outcome.payload).unwrap_or_default();
            return Err(ProxyError::RequestRejected { reason, body });
        }

        let original = request_outcome.payload.clone();
        match session.target().await.call_tool(request_outcome.payload).await {
            Ok(response) => {
                let response_outcome = self
                    .chain
                    .run_response(response, &original, request_outcome.last_idx, &ctx)
                    .await;
                if response_outcome.rejected {
                    let reason = response_outcome
                        .rejection_reason
                        .unwrap_or_else(|| "rejected by hook chain".to_string());
                    let body = serde_json::to_value(&response_outcome.payload).unwrap_or_default();
                    return Err(ProxyError::ResponseRejected { reason, body });
                }
                Ok(response_outcome.payload)
            }
            Err(err) => {
                let exception = ToolException::new(err.to_string());
                match self.chain.run_exception(exception, &original, &ctx).await {
                    Some(recovered) => Ok(recovered),
                    None => Err(err),
                }
            }
        }
    }

    async fn run_list_tools(&self) -> Result<ListToolsResult, ProxyError> {
        // Discovery never counts as a client request against the session.
        let session = self.store.get_or_create(&self.session_id).await?;
        let ctx = session.hook_context(self.store.clone()).await;

        let request_outcome = self
            .chain
            .run_tools_list_request(ToolsListRequest::default(), &ctx)
            .await;
        if request_outcome.rejected {
            let reason = request_outcome
                .rejection_reason
                .unwrap_or_else(|| "rejected by hook chain".to_string());
            // Still walk the reverse response chain from lastIdx so wrapping
            // hooks see the rejection (spec §4.3), but §4.7 makes an aborted
            // tools/list non-fatal: the advertised set just goes empty.
            let _ = self
                .chain
                .run_tools_list_response(
                    ListToolsResult::default(),
                    &request_outcome.payload,
                    request_outcome.last_idx,
                    &ctx,
                )
                .await;
            tracing::warn!(reason = %reason, "tools/list request rejected by hook chain; advertising no tools");
            self.discovered_tools.store(Arc::new(Vec::new()));
            return Ok(ListToolsResult::default());
        }

        let target_result = session.target().await.list_tools().await?;
        let response_outcome = self
            .chain
            .run_tools_list_response(target_result, &request_outcome.payload, request_outcome.last_idx, &ctx)
            .await;
        if response_outcome.rejected {
            let reason = response_outcome
                .rejection_reason
                .unwrap_or_else(|| "rejected by hook chain".to_string());
            tracing::warn!(reason = %reason, "tools/list response rejected by hook chain; advertising no tools");
            self.discovered_tools.store(Arc::new(Vec::new()));
            return Ok(ListToolsResult::default());
        }

        self.discovered_tools
            .store(Arc::new(response_outcome.payload.tools.clone()));
        Ok(response_outcome.payload)
    }
}

impl ServerHandler for ProxyDispatcher {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: self.server_info.clone(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(true),
                }),
                ..Default::default()
            },
            instructions: self.instructions.clone(),
            ..Default::default()
        }
    }

    fn call_tool<'a>(
        &'a self,
        params: CallToolRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move { self.run_call_tool(params).await.map_err(ErrorData::from) })
    }

    fn list_tools<'a>(
        &'a self,
        _params: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<ListToolsResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move { self.run_list_tools().await.map_err(ErrorData::from) })
    }

    fn list_prompts<'a>(
        &'a self,
        params: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<ListPromptsResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let session = self.store.get_or_create(&self.session_id).await.map_err(ErrorData::from)?;
            session
                .target()
                .await
                .peer()
                .list_prompts(params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))
        })
    }

    fn get_prompt<'a>(
        &'a self,
        params: GetPromptRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<GetPromptResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let session = self.store.get_or_create(&self.session_id).await.map_err(ErrorData::from)?;
            session
                .target()
                .await
                .peer()
                .get_prompt(params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))
        })
    }

    fn list_resources<'a>(
        &'a self,
        params: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<ListResourcesResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let session = self.store.get_or_create(&self.session_id).await.map_err(ErrorData::from)?;
            session
                .target()
                .await
                .peer()
                .list_resources(params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))
        })
    }

    fn list_resource_templates<'a>(
        &'a self,
        params: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<ListResourceTemplatesResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let session = self.store.get_or_create(&self.session_id).await.map_err(ErrorData::from)?;
            session
                .target()
                .await
                .peer()
                .list_resource_templates(params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))
        })
    }

    fn read_resource<'a>(
        &'a self,
        params: ReadResourceRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<ReadResourceResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let session = self.store.get_or_create(&self.session_id).await.map_err(ErrorData::from)?;
            session
                .target()
                .await
                .peer()
                .read_resource(params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))
        })
    }

    fn complete<'a>(
        &'a self,
        params: CompleteRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<CompleteResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let session = self.store.get_or_create(&self.session_id).await.map_err(ErrorData::from)?;
            session
                .target()
                .await
                .peer()
                .complete(params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))
        })
    }

    fn set_level<'a>(
        &'a self,
        params: SetLevelRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let session = self.store.get_or_create(&self.session_id).await.map_err(ErrorData::from)?;
            session
                .target()
                .await
                .peer()
                .set_level(params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))
        })
    }

    fn subscribe<'a>(
        &'a self,
        params: SubscribeRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let session = self.store.get_or_create(&self.session_id).await.map_err(ErrorData::from)?;
            session
                .target()
                .await
                .peer()
                .subscribe(params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))
        })
    }

    fn unsubscribe<'a>(
        &'a self,
        params: UnsubscribeRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let session = self.store.get_or_create(&self.session_id).await.map_err(ErrorData::from)?;
            session
                .target()
                .await
                .peer()
                .unsubscribe(params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))
        })
    }
}
