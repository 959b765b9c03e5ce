// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Core assembly.
//!
//! Every dependency of the pipeline is an explicit handle wired here;
//! nothing in the core reads process-wide state.  The one wiring knot is
//! delegation: delegate tools need a chat invoker, and the invoker is the
//! orchestrator that owns the tool registry.  [`OrchestratorInvoker`]
//! breaks that cycle with a late-bound reference.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use relay_config::Config;
use relay_metrics::MetricsSink;
use relay_provider::{
    get_image_provider, get_research_provider, get_speech_provider, ChatProvider, EchoChat,
    MockMedia, MockResearch, ProviderEnv,
};
use relay_retrieval::EmbeddingService;
use relay_store::{AgentRecord, Cache, MemoryCache, MemoryRepository, Repository, User};
use relay_team::{
    ChatInvoker, DelegateByRoleTool, DelegateToTeamMemberTool, DelegationLimiter, TeamDelegation,
    TeamError,
};
use relay_tools::{
    builtin::{GenerateImageTool, ResearchTool, SynthesizeSpeechTool},
    mcp::McpRegistry,
    register_workflow_tools, ToolRegistry,
};

use crate::{
    guardrails::{Guardrails, PatternGuardrails},
    ChatCompletionRequest, ChatOrchestrator, IncomingMessage,
};

/// Late-bound [`ChatInvoker`] so delegate tools can be registered before
/// the orchestrator exists.
#[derive(Default)]
pub struct OrchestratorInvoker {
    inner: OnceLock<Arc<ChatOrchestrator>>,
}

impl OrchestratorInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, orchestrator: Arc<ChatOrchestrator>) {
        let _ = self.inner.set(orchestrator);
    }
}

#[async_trait]
impl ChatInvoker for OrchestratorInvoker {
    async fn invoke_agent(
        &self,
        agent: &AgentRecord,
        user: &User,
        task: &str,
        context_messages: &[String],
        delegation_stack: &[String],
    ) -> Result<Vec<String>, TeamError> {
        let orchestrator = self
            .inner
            .get()
            .ok_or_else(|| TeamError::Invoke("orchestrator not bound".into()))?;

        let mut messages: Vec<IncomingMessage> = context_messages
            .iter()
            .map(|content| IncomingMessage {
                role: relay_provider::Role::User,
                content: content.clone(),
                tool_call_id: None,
                name: None,
            })
            .collect();
        messages.push(IncomingMessage {
            role: relay_provider::Role::User,
            content: task.to_string(),
            tool_call_id: None,
            name: None,
        });

        let request = ChatCompletionRequest {
            completion_id: Uuid::new_v4().to_string(),
            model: agent.model.clone(),
            messages,
            user: Some(user.clone()),
            current_agent_id: Some(agent.id.clone()),
            delegation_stack: delegation_stack.to_vec(),
            store: false,
            ..ChatCompletionRequest::default()
        };
        let response = orchestrator
            .complete(request)
            .await
            .map_err(|e| TeamError::Invoke(e.to_string()))?;
        Ok(vec![response.response.content])
    }
}

/// Builder for a fully wired core.  Defaults are in-process (memory store,
/// memory cache, mock providers) so the CLI and tests work offline; a real
/// deployment swaps in its own handles.
pub struct CoreBuilder {
    cfg: Config,
    repo: Arc<dyn Repository>,
    cache: Arc<dyn Cache>,
    sink: Option<Arc<dyn MetricsSink>>,
    retrieval: Option<Arc<dyn EmbeddingService>>,
    auxiliary: Arc<dyn ChatProvider>,
    chat_override: Option<Arc<dyn ChatProvider>>,
    mcp: McpRegistry,
    guardrails: Option<Arc<dyn Guardrails>>,
}

impl CoreBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            repo: Arc::new(MemoryRepository::new()),
            cache: Arc::new(MemoryCache::default()),
            sink: None,
            retrieval: None,
            auxiliary: Arc::new(EchoChat),
            chat_override: None,
            mcp: McpRegistry::new(),
            guardrails: None,
        }
    }

    pub fn repository(mut self, repo: Arc<dyn Repository>) -> Self {
        self.repo = repo;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn retrieval(mut self, service: Arc<dyn EmbeddingService>) -> Self {
        self.retrieval = Some(service);
        self
    }

    /// The auxiliary model used for analysis, reranking, and summaries.
    pub fn auxiliary(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.auxiliary = provider;
        self
    }

    /// Replace the chat provider layer entirely (tests, CLI mock mode).
    pub fn chat_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.chat_override = Some(provider);
        self
    }

    pub fn mcp_client(mut self, client: Arc<dyn relay_tools::McpClient>) -> Self {
        self.mcp.register(client);
        self
    }

    pub fn guardrails(mut self, guardrails: Arc<dyn Guardrails>) -> Self {
        self.guardrails = Some(guardrails);
        self
    }

    pub fn build(self) -> Arc<ChatOrchestrator> {
        let env = ProviderEnv::new(self.cfg.providers.clone());
        let use_mocks = self.cfg.providers.default_chat == "mock";

        let mut registry = ToolRegistry::new();
        register_workflow_tools(&mut registry);

        // Capability tools: mock providers in mock mode, factory-resolved
        // otherwise.  A provider that cannot be constructed (key missing in
        // this environment) just leaves its tool unregistered.
        if use_mocks {
            registry.register(ResearchTool::new(Arc::new(MockResearch)));
            registry.register(GenerateImageTool::new(Arc::new(MockMedia)));
            registry.register(SynthesizeSpeechTool::new(Arc::new(MockMedia)));
        } else {
            match get_research_provider(None, &env) {
                Ok(p) => registry.register(ResearchTool::new(Arc::from(p))),
                Err(e) => warn!(error = %e, "research tool unavailable"),
            }
            match get_image_provider(None, &env) {
                Ok(p) => registry.register(GenerateImageTool::new(Arc::from(p))),
                Err(e) => warn!(error = %e, "image tool unavailable"),
            }
            match get_speech_provider(None, &env) {
                Ok(p) => registry.register(SynthesizeSpeechTool::new(Arc::from(p))),
                Err(e) => warn!(error = %e, "speech tool unavailable"),
            }
        }

        let invoker = Arc::new(OrchestratorInvoker::new());
        let delegation = Arc::new(TeamDelegation::new(
            self.repo.clone(),
            DelegationLimiter::new(),
            self.cfg.limits.clone(),
        ));
        registry.register(DelegateToTeamMemberTool::new(
            delegation.clone(),
            invoker.clone(),
        ));
        registry.register(DelegateByRoleTool::new(delegation, invoker.clone()));

        let guardrails = self
            .guardrails
            .unwrap_or_else(|| Arc::new(PatternGuardrails::new(self.cfg.guardrails.clone())));

        let orchestrator = Arc::new(ChatOrchestrator {
            repo: self.repo,
            cache: self.cache,
            env,
            sink: self.sink,
            retrieval: self.retrieval,
            auxiliary: self.auxiliary,
            registry: Arc::new(registry),
            mcp: Arc::new(self.mcp),
            guardrails,
            chat_override: self.chat_override,
            cfg: self.cfg,
        });
        invoker.bind(orchestrator.clone());
        orchestrator
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use relay_config::ProvidersConfig;

    fn mock_config() -> Config {
        Config {
            providers: ProvidersConfig {
                default_chat: "mock".into(),
                default_embedding: "mock".into(),
                ..ProvidersConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn builder_registers_workflow_and_capability_tools() {
        let core = CoreBuilder::new(mock_config()).build();
        let names = core.registry.names();
        for expected in [
            "compose_functions",
            "if_then_else",
            "parallel_execute",
            "retry_with_backoff",
            "fallback",
            "request_approval",
            "ask_user",
            "call_api",
            "research",
            "generate_image",
            "synthesize_speech",
            "delegate_to_team_member",
            "delegate_to_team_member_by_role",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn unbound_invoker_reports_cleanly() {
        let invoker = OrchestratorInvoker::new();
        let agent = AgentRecord {
            id: "a".into(),
            user_id: 1,
            name: "A".into(),
            role: String::new(),
            description: None,
            model: None,
        };
        let user = User::new(1, "u@x.com", relay_store::Plan::Pro);
        let err = invoker
            .invoke_agent(&agent, &user, "t", &[], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not bound"));
    }
}
