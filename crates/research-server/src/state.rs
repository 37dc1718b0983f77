//! Application State

use std::sync::Arc;

use agent_core::{
    AgentError, GenerationOptions, LlmProvider, ModelBinding, Researcher, ResearcherBuilder, Result, ToolRegistry,
    run_log::{FanoutRunLogSink, MemoryRunLogSink, RunLogSink, TracingRunLogSink},
};
use agent_runtime::OpenAiProvider;
use research_tools::{
    SearchClient, default_registry,
    search::{DuckDuckGoClient, MockSearchClient, TavilyClient},
};

use crate::config::{SearchBackend, ServerConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The research loop; each request gets its own run state
    pub researcher: Arc<Researcher>,

    /// LLM provider, kept for health checks
    pub provider: Arc<dyn LlmProvider>,

    /// Recent run logs for `/api/runs`
    pub runs: Arc<MemoryRunLogSink>,
}

impl AppState {
    /// Wire provider, tools and sinks from configuration
    pub fn from_config(config: &ServerConfig, extra_sink: Option<Arc<dyn RunLogSink>>) -> Result<Self> {
        let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::from_config(config.openai.clone())?);
        let tools = build_tools(&config.search)?;
        Self::assemble(config, provider, tools, extra_sink)
    }

    /// Assemble with an already built provider and registry
    pub fn assemble(
        config: &ServerConfig,
        provider: Arc<dyn LlmProvider>,
        tools: ToolRegistry,
        extra_sink: Option<Arc<dyn RunLogSink>>,
    ) -> Result<Self> {
        let runs = Arc::new(MemoryRunLogSink::default());
        let mut sink = FanoutRunLogSink::new()
            .with(Arc::new(TracingRunLogSink))
            .with(runs.clone());
        if let Some(extra) = extra_sink {
            sink = sink.with(extra);
        }

        let researcher = ResearcherBuilder::new()
            .reasoning_model(ModelBinding::new(
                provider.clone(),
                GenerationOptions::for_model(&config.reasoning_model),
            ))
            .compression_model(ModelBinding::new(
                provider.clone(),
                GenerationOptions::for_model(&config.compression_model).with_max_tokens(config.compression_max_tokens),
            ))
            .tools(tools)
            .sink(Arc::new(sink))
            .config(config.research.clone())
            .build()?;

        Ok(Self {
            researcher: Arc::new(researcher),
            provider,
            runs,
        })
    }
}

fn build_tools(backend: &SearchBackend) -> Result<ToolRegistry> {
    let config_err = |e: research_tools::SearchError| AgentError::Config(e.to_string());

    let (quick, deep): (Arc<dyn SearchClient>, Arc<dyn SearchClient>) = match backend {
        SearchBackend::Live(tavily) => {
            let quick: Arc<dyn SearchClient> = Arc::new(DuckDuckGoClient::new().map_err(config_err)?);
            let deep: Arc<dyn SearchClient> = Arc::new(TavilyClient::new(tavily.clone()).map_err(config_err)?);
            (quick, deep)
        }
        SearchBackend::Mock => {
            tracing::warn!("Using mock search backend");
            let mock: Arc<dyn SearchClient> = Arc::new(MockSearchClient::new());
            (mock.clone(), mock)
        }
    };

    let registry = default_registry(quick, deep);
    tracing::info!("Registered {} tools:", registry.len());
    for name in registry.names() {
        tracing::info!("  • {}", name);
    }
    Ok(registry)
}
