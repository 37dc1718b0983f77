//! OpenAI-compatible LLM Provider
//!
//! Implementation of `LlmProvider` over the `/chat/completions` endpoint.
//! Works against OpenAI itself and any compatible server (Ollama's `/v1`,
//! vLLM, OpenRouter).

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
    tool::{ToolArguments, ToolCall, ToolSchema},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Base URL, without the trailing `/chat/completions`
    pub base_url: String,

    /// Bearer token
    pub api_key: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    /// Read `OPENAI_API_KEY` (required, non-empty) and `OPENAI_BASE_URL`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::Config("OPENAI_API_KEY is not set".into()))?;
        let base_url = lookup("OPENAI_BASE_URL").unwrap_or_else(|| Self::default().base_url);

        Ok(Self {
            base_url,
            api_key,
            ..Default::default()
        })
    }

    /// Local Ollama through its OpenAI-compatible endpoint
    pub fn ollama(host: &str, port: u16) -> Self {
        Self {
            base_url: format!("{}:{port}/v1", host.trim_end_matches('/')),
            api_key: "ollama".into(),
            ..Default::default()
        }
    }
}

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create from configuration
    pub fn from_config(mut config: OpenAiConfig) -> Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Convert agent messages to the wire format
    fn convert_messages(messages: &[Message]) -> Result<Vec<ApiMessage>> {
        messages
            .iter()
            .map(|m| {
                let tool_calls = m
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        Ok(ApiToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: serde_json::to_string(&tc.arguments)?,
                            },
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                let content = if m.content.is_empty() && !tool_calls.is_empty() {
                    None
                } else {
                    Some(m.content.clone())
                };

                Ok(ApiMessage {
                    role: match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        Role::Tool => "tool",
                    }
                    .into(),
                    content,
                    tool_calls,
                    tool_call_id: m.tool_call_id().map(str::to_string),
                })
            })
            .collect()
    }

    /// Tool schemas as function definitions
    fn convert_tools(tools: &[ToolSchema]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_json(),
                    }
                })
            })
            .collect()
    }

    fn build_body(messages: &[Message], tools: &[ToolSchema], options: &GenerationOptions) -> Result<serde_json::Value> {
        let mut body = serde_json::json!({
            "model": options.model,
            "messages": Self::convert_messages(messages)?,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(Self::convert_tools(tools));
        }
        if !options.stop_sequences.is_empty() {
            body["stop"] = serde_json::json!(options.stop_sequences);
        }
        Ok(body)
    }

    /// Map a non-success status to an error class
    fn status_error(status: StatusCode, body: &str) -> AgentError {
        let detail = format!("{status}: {body}");
        match status.as_u16() {
            429 => AgentError::RateLimited(detail),
            401 | 403 => AgentError::Auth(detail),
            500..=599 => AgentError::ProviderUnavailable(detail),
            _ => AgentError::ModelInvocation(detail),
        }
    }

    /// Convert the wire response to an agent completion
    fn convert_completion(response: ApiResponse, model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::MalformedResponse("no choices in response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|tc| {
                let arguments = parse_arguments(&tc.function.name, &tc.function.arguments)?;
                Ok(if tc.id.is_empty() {
                    ToolCall::new(tc.function.name, arguments)
                } else {
                    ToolCall::with_id(tc.function.name, arguments, tc.id)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let finish_reason = choice.finish_reason.as_deref().map(|r| match r {
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolUse,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        });

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            finish_reason,
        })
    }
}

fn parse_arguments(tool: &str, raw: &str) -> Result<ToolArguments> {
    if raw.trim().is_empty() {
        return Ok(ToolArguments::new());
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(AgentError::MalformedResponse(format!(
            "arguments for '{tool}' are not an object: {other}"
        ))),
        Err(e) => Err(AgentError::MalformedResponse(format!(
            "arguments for '{tool}' are not valid JSON: {e}"
        ))),
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url);
        match self.client.get(&url).bearer_auth(&self.config.api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = Self::build_body(messages, tools, options)?;

        tracing::debug!(model = %options.model, messages = messages.len(), tools = tools.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    AgentError::ProviderUnavailable(e.to_string())
                } else {
                    AgentError::ModelInvocation(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %text, "Provider returned error");
            return Err(Self::status_error(status, &text));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse(format!("failed to parse response: {e}")))?;

        Self::convert_completion(api_response, &options.model)
    }
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: Option<String>,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::ParameterSchema;

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");

        let config = OpenAiConfig::ollama("http://localhost/", 11434);
        assert_eq!(config.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_config_from_lookup() {
        let config = OpenAiConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "OPENAI_BASE_URL" => Some("http://localhost:11434/v1".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, "http://localhost:11434/v1");

        let err = OpenAiConfig::from_lookup(|key| (key == "OPENAI_API_KEY").then(|| "  ".to_string())).unwrap_err();
        assert!(matches!(err, AgentError::Config(msg) if msg.contains("OPENAI_API_KEY")));
        assert!(OpenAiConfig::from_lookup(|_| None).is_err());
    }

    #[test]
    fn test_message_conversion() {
        let mut args = ToolArguments::new();
        args.insert("query".into(), "jamf".into());
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Research JAMF"),
            Message::assistant("").with_tool_calls(vec![ToolCall::with_id("quick_search", args, "call_1")]),
            Message::tool("JAMF is an MDM vendor.", "call_1"),
        ];

        let converted = OpenAiProvider::convert_messages(&messages).unwrap();
        assert_eq!(converted.len(), 4);
        assert_eq!(converted[2].content, None);
        assert_eq!(converted[2].tool_calls[0].function.arguments, r#"{"query":"jamf"}"#);
        assert_eq!(converted[3].role, "tool");
        assert_eq!(converted[3].tool_call_id.as_deref(), Some("call_1"));

        let json = serde_json::to_value(&converted[0]).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn test_body_includes_tools_only_when_bound() {
        let schema = ToolSchema {
            name: "think".into(),
            description: "Reflect".into(),
            parameters: vec![ParameterSchema::required("reflection", "string", "Thoughts")],
            external: false,
        };
        let options = GenerationOptions::for_model("gpt-4.1").with_max_tokens(32_000);
        let messages = [Message::user("hi")];

        let body = OpenAiProvider::build_body(&messages, &[schema], &options).unwrap();
        assert_eq!(body["tools"][0]["function"]["name"], "think");
        assert_eq!(body["tools"][0]["function"]["parameters"]["required"][0], "reflection");
        assert_eq!(body["max_tokens"], 32_000);

        let body = OpenAiProvider::build_body(&messages, &[], &options).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_completion_with_tool_calls() {
        let response: ApiResponse = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "deep_search", "arguments": "{\"query\": \"jamf\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 18, "total_tokens": 138}
        }))
        .unwrap();

        let completion = OpenAiProvider::convert_completion(response, "gpt-4o").unwrap();
        assert_eq!(completion.content, "");
        assert_eq!(completion.tool_calls[0].id, "call_abc");
        assert_eq!(completion.tool_calls[0].str_arg("query"), Some("jamf"));
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(completion.usage.unwrap().input_tokens, 120);
        assert_eq!(completion.model, "gpt-4o-2024-08-06");
    }

    #[test]
    fn test_malformed_arguments_rejected() {
        assert!(matches!(
            parse_arguments("think", "{not json"),
            Err(AgentError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_arguments("think", "[1, 2]"),
            Err(AgentError::MalformedResponse(_))
        ));
        assert!(parse_arguments("think", "").unwrap().is_empty());
    }

    #[test]
    fn test_empty_choices_is_malformed() {
        let response: ApiResponse = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(
            OpenAiProvider::convert_completion(response, "gpt-4o"),
            Err(AgentError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            OpenAiProvider::status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            AgentError::RateLimited(_)
        ));
        assert!(matches!(
            OpenAiProvider::status_error(StatusCode::UNAUTHORIZED, ""),
            AgentError::Auth(_)
        ));
        assert!(matches!(
            OpenAiProvider::status_error(StatusCode::BAD_GATEWAY, ""),
            AgentError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            OpenAiProvider::status_error(StatusCode::BAD_REQUEST, "bad"),
            AgentError::ModelInvocation(_)
        ));
    }
}
