//! Server Configuration
//!
//! Everything is read from the environment (after `.env` is loaded) and
//! validated before the first model call.

use std::time::Duration;

use agent_core::{
    AgentError, Guardrails, ResearchConfig, Result, compression::RawNotesPolicy, retry::RetryPolicy,
};
use agent_runtime::OpenAiConfig;
use research_tools::{SearchError, search::TavilyConfig};

/// Where search tools send their queries
#[derive(Clone, Debug)]
pub enum SearchBackend {
    /// DuckDuckGo for quick search, Tavily for deep search
    Live(TavilyConfig),
    /// Canned results, no network
    Mock,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub openai: OpenAiConfig,
    pub search: SearchBackend,
    pub reasoning_model: String,
    pub compression_model: String,
    pub compression_max_tokens: u32,
    pub research: ResearchConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let openai = OpenAiConfig::from_lookup(&lookup)?;

        let search = match lookup("SEARCH_BACKEND").as_deref().unwrap_or("live") {
            "mock" => SearchBackend::Mock,
            "live" => SearchBackend::Live(TavilyConfig::from_lookup(&lookup).map_err(|e| match e {
                SearchError::Config(msg) => AgentError::Config(msg),
                other => AgentError::Config(other.to_string()),
            })?),
            other => {
                return Err(AgentError::Config(format!(
                    "SEARCH_BACKEND must be 'live' or 'mock', got '{other}'"
                )));
            }
        };

        let defaults = ResearchConfig::default();
        let research = ResearchConfig {
            guardrails: Guardrails {
                max_tool_calls: parse_or(&lookup, "MAX_TOOL_CALLS", defaults.guardrails.max_tool_calls)?,
                max_loops: parse_or(&lookup, "MAX_LOOPS", defaults.guardrails.max_loops)?,
            },
            model_timeout: Duration::from_secs(parse_or(&lookup, "MODEL_TIMEOUT_SECS", 60)?),
            tool_timeout: Duration::from_secs(parse_or(&lookup, "TOOL_TIMEOUT_SECS", 30)?),
            retry: RetryPolicy {
                max_retries: parse_or(&lookup, "MODEL_MAX_RETRIES", defaults.retry.max_retries)?,
                ..defaults.retry.clone()
            },
            parallel_tool_calls: parse_or(&lookup, "PARALLEL_TOOL_CALLS", defaults.parallel_tool_calls)?,
            raw_notes: match lookup("RAW_NOTES_POLICY").as_deref() {
                None | Some("accumulate") => RawNotesPolicy::Accumulate,
                Some("reset_per_run") => RawNotesPolicy::ResetPerRun,
                Some(other) => {
                    return Err(AgentError::Config(format!(
                        "RAW_NOTES_POLICY must be 'accumulate' or 'reset_per_run', got '{other}'"
                    )));
                }
            },
            system_prompt: research_tools::RESEARCH_AGENT_PROMPT.into(),
        };

        Ok(Self {
            openai,
            search,
            reasoning_model: lookup("REASONING_MODEL").unwrap_or_else(|| "gpt-4o".into()),
            compression_model: lookup("COMPRESSION_MODEL").unwrap_or_else(|| "gpt-4.1".into()),
            compression_max_tokens: parse_or(&lookup, "COMPRESSION_MAX_TOKENS", 32_000)?,
            research,
        })
    }
}

fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("{key} has an invalid value: '{raw}'")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            ServerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test"), ("TAVILY_API_KEY", "tvly-test")]))
                .unwrap();

        assert_eq!(config.reasoning_model, "gpt-4o");
        assert_eq!(config.compression_model, "gpt-4.1");
        assert_eq!(config.compression_max_tokens, 32_000);
        assert_eq!(config.research.guardrails, Guardrails::default());
        assert_eq!(config.research.model_timeout, Duration::from_secs(60));
        assert_eq!(config.research.raw_notes, RawNotesPolicy::Accumulate);
        assert!(matches!(config.search, SearchBackend::Live(_)));
    }

    #[test]
    fn test_missing_keys_fail_fast() {
        let err = ServerConfig::from_lookup(lookup(&[("TAVILY_API_KEY", "tvly")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = ServerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk")])).unwrap_err();
        assert!(err.to_string().contains("TAVILY_API_KEY"));
    }

    #[test]
    fn test_empty_keys_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", ""), ("TAVILY_API_KEY", "tvly")])).unwrap_err();
        assert!(matches!(err, AgentError::Config(msg) if msg.contains("OPENAI_API_KEY")));

        let err = ServerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk"), ("TAVILY_API_KEY", " ")])).unwrap_err();
        assert!(matches!(err, AgentError::Config(msg) if msg == "TAVILY_API_KEY is not set"));
    }

    #[test]
    fn test_base_urls_passed_through() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1"),
            ("TAVILY_API_KEY", "tvly"),
            ("TAVILY_BASE_URL", "http://localhost:8080"),
        ]))
        .unwrap();

        assert_eq!(config.openai.base_url, "http://localhost:11434/v1");
        assert!(matches!(config.search, SearchBackend::Live(t) if t.base_url == "http://localhost:8080"));
    }

    #[test]
    fn test_mock_search_needs_no_tavily_key() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("SEARCH_BACKEND", "mock"),
            ("MAX_TOOL_CALLS", "5"),
            ("RAW_NOTES_POLICY", "reset_per_run"),
            ("PARALLEL_TOOL_CALLS", "false"),
        ]))
        .unwrap();

        assert!(matches!(config.search, SearchBackend::Mock));
        assert_eq!(config.research.guardrails.max_tool_calls, 5);
        assert_eq!(config.research.raw_notes, RawNotesPolicy::ResetPerRun);
        assert!(!config.research.parallel_tool_calls);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("SEARCH_BACKEND", "mock"),
            ("MAX_LOOPS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AgentError::Config(msg) if msg.contains("MAX_LOOPS")));
    }
}
