//! OpenAI-compatible chat-completions client used for the Azure OpenAI,
//! OpenAI and Ollama providers.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use ordermate_core::config::{LlmConfig, LlmProvider};

use crate::conversation::Role;
use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError};
use crate::tools::OrderCommand;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug)]
enum Auth {
    None,
    Bearer(SecretString),
    ApiKeyHeader(SecretString),
}

pub struct HttpChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    auth: Auth,
}

impl HttpChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let endpoint = endpoint_for(config)?;
        let auth = match config.provider {
            LlmProvider::OpenAi => Auth::Bearer(require_key(config)?),
            LlmProvider::AzureOpenAi => Auth::ApiKeyHeader(require_key(config)?),
            LlmProvider::Ollama => config.api_key.clone().map_or(Auth::None, Auth::Bearer),
            LlmProvider::Local => {
                return Err(LlmError::Rejected(
                    "the local provider does not use an http client".to_string(),
                ))
            }
        };
        let client =
            reqwest::Client::builder().build().map_err(|error| LlmError::Http(error.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            auth,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match &self.auth {
            Auth::None => {}
            Auth::Bearer(key) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
                    .map_err(|error| LlmError::Rejected(error.to_string()))?;
                headers.insert(AUTHORIZATION, value);
            }
            Auth::ApiKeyHeader(key) => {
                let value = HeaderValue::from_str(key.expose_secret())
                    .map_err(|error| LlmError::Rejected(error.to_string()))?;
                headers.insert(HeaderName::from_static("api-key"), value);
            }
        }
        Ok(headers)
    }

    fn body(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = vec![ChatMessage { role: "system", content: request.system.clone() }];
        messages.extend(request.turns.iter().map(|turn| ChatMessage {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: turn.text.clone(),
        }));

        let tools = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect::<Vec<_>>();

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
        }
    }
}

fn require_key(config: &LlmConfig) -> Result<SecretString, LlmError> {
    config.api_key.clone().ok_or_else(|| {
        LlmError::Rejected(format!("provider {:?} requires an api key", config.provider))
    })
}

fn endpoint_for(config: &LlmConfig) -> Result<String, LlmError> {
    let base = config.base_url.as_deref().map(|url| url.trim_end_matches('/'));
    match config.provider {
        LlmProvider::OpenAi => {
            Ok(format!("{}/chat/completions", base.unwrap_or(OPENAI_BASE_URL)))
        }
        LlmProvider::AzureOpenAi => {
            let base = base.ok_or_else(|| {
                LlmError::Rejected("azure_openai requires an endpoint base_url".to_string())
            })?;
            Ok(format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={}",
                config.model, config.api_version
            ))
        }
        LlmProvider::Ollama => {
            let base = base.ok_or_else(|| {
                LlmError::Rejected("ollama requires a base_url".to_string())
            })?;
            Ok(format!("{base}/v1/chat/completions"))
        }
        LlmProvider::Local => {
            Err(LlmError::Rejected("the local provider has no endpoint".to_string()))
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Turns a raw chat-completions payload into a [`Completion`]. The first
/// tool call wins; otherwise the message text is the reply.
///
/// A tool call that does not decode into a command is `Rejected`: asking
/// again with the same prompt is not expected to fix it.
fn parse_completion(body: &str) -> Result<Completion, LlmError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|error| LlmError::Serialization(error.to_string()))?;
    let message = parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| LlmError::Response("missing choices".to_string()))?;

    if let Some(call) = message.tool_calls.into_iter().flatten().next() {
        let name = call.function.name;
        let arguments = if call.function.arguments.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|error| {
                LlmError::Rejected(format!("tool `{name}` arguments: {error}"))
            })?
        };
        return OrderCommand::from_tool_call(&name, arguments)
            .map(Completion::Command)
            .map_err(|error| LlmError::Rejected(format!("tool `{name}`: {error}")));
    }

    message
        .content
        .filter(|content| !content.trim().is_empty())
        .map(Completion::Text)
        .ok_or_else(|| LlmError::Response("empty message".to_string()))
}

fn classify_status(status: StatusCode, body: String) -> LlmError {
    let message = format!("HTTP {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        LlmError::Response(message)
    } else {
        LlmError::Rejected(message)
    }
}

#[async_trait]
impl LlmClient for HttpChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|error| LlmError::Http(error.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|error| LlmError::Http(error.to_string()))?;
        if !status.is_success() {
            return Err(classify_status(status, text));
        }

        debug!(event_name = "llm.http.response", model = %self.model, bytes = text.len(), "llm response received");
        parse_completion(&text)
    }
}
