//! # agent-runtime
//!
//! Runtime providers for the research agent.
//!
//! ## Providers
//!
//! - **OpenAI** (default): any OpenAI-compatible chat completions endpoint,
//!   including a local Ollama at `http://localhost:11434/v1`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::openai::{OpenAiConfig, OpenAiProvider};
//!
//! let provider = Arc::new(OpenAiProvider::from_config(OpenAiConfig::from_lookup(|k| std::env::var(k).ok())?)?);
//! let researcher = ResearcherBuilder::new()
//!     .reasoning_model(ModelBinding::new(provider.clone(), GenerationOptions::for_model("gpt-4o")))
//!     .compression_model(ModelBinding::new(provider, GenerationOptions::for_model("gpt-4.1")))
//!     .tools(registry)
//!     .build()?;
//! ```

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use agent_core::{
    AgentError, GenerationOptions, LlmProvider, Message, ModelBinding, Researcher, ResearcherBuilder,
    Result, Role, Tool, ToolRegistry,
};
