//! OpenAI-compatible chat completions client.
//!
//! Transcript messages map onto the chat completions wire format one to one:
//! human turns become `user`, proposals carry `tool_calls`, and tool results
//! carry the `tool_call_id` they answer. In single-call mode the request
//! binds every catalog tool with `parallel_tool_calls = false`; in text-only
//! mode no tools are sent.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    message::{Message, Role, ToolCall},
    tool::ToolSpec,
};
use devpilot_core::traits::{CompletionRequest, LanguageModel, ToolChoice};

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiSettings {
    /// Read `OPENAI_API_KEY` (required) and `OPENAI_BASE_URL` (optional).
    pub fn from_env() -> DevpilotResult<Self> {
        let api_key = std::env::var(ENV_API_KEY)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DevpilotError::ConfigError {
                reason: format!("{ENV_API_KEY} environment variable not set"),
            })?;
        Ok(Self {
            base_url: std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
        })
    }
}

pub struct OpenAiChatModel {
    client: reqwest::Client,
    settings: OpenAiSettings,
}

impl OpenAiChatModel {
    pub fn new(settings: OpenAiSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub fn from_env() -> DevpilotResult<Self> {
        Ok(Self::new(OpenAiSettings::from_env()?))
    }

    pub fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

fn wire_message(message: &Message) -> Value {
    match message.role {
        Role::System => json!({ "role": "system", "content": message.content }),
        Role::Human => json!({ "role": "user", "content": message.content }),
        Role::Assistant if message.has_tool_calls() => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": Value::Object(call.arguments.clone()).to_string(),
                        }
                    })
                })
                .collect();
            json!({ "role": "assistant", "content": message.content, "tool_calls": calls })
        }
        Role::Assistant => json!({ "role": "assistant", "content": message.content }),
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.content,
        }),
    }
}

fn wire_tool(spec: &ToolSpec) -> Value {
    let parameters = if spec.parameters.is_null() {
        json!({ "type": "object", "properties": {} })
    } else {
        spec.parameters.clone()
    };
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": parameters,
        }
    })
}

/// The request body for `request`.
pub fn request_body(settings: &OpenAiSettings, request: &CompletionRequest) -> Value {
    let mut body = json!({
        "model": settings.model,
        "temperature": settings.temperature,
        "messages": request.messages.iter().map(wire_message).collect::<Vec<_>>(),
    });
    if request.tool_choice == ToolChoice::Single && !request.tools.is_empty() {
        body["tools"] = Value::Array(request.tools.iter().map(wire_tool).collect());
        body["parallel_tool_calls"] = json!(false);
    }
    body
}

/// Parse the first choice of a chat completions response.
pub fn parse_response(body: &Value) -> DevpilotResult<Message> {
    let failure = |reason: &str| DevpilotError::ModelFailure {
        reason: reason.to_string(),
    };
    let message = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| failure("response has no choices[0].message"))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut calls = Vec::new();
    for raw in message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
    {
        let function = raw
            .get("function")
            .ok_or_else(|| failure("tool call without a function"))?;
        let name = function
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| failure("tool call without a name"))?;
        let arguments = match function.get("arguments").and_then(Value::as_str) {
            Some(text) if !text.trim().is_empty() => {
                match serde_json::from_str::<Value>(text) {
                    Ok(Value::Object(map)) => map,
                    _ => {
                        return Err(DevpilotError::ModelFailure {
                            reason: format!("arguments for '{name}' are not a JSON object"),
                        })
                    }
                }
            }
            _ => Map::new(),
        };
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
        calls.push(ToolCall::new(id, name, arguments));
    }

    Ok(if calls.is_empty() {
        Message::assistant(content)
    } else {
        Message::assistant_with_calls(content, calls)
    })
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, request: CompletionRequest) -> DevpilotResult<Message> {
        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let body = request_body(&self.settings, &request);
        let failure = |e: reqwest::Error| DevpilotError::ModelFailure {
            reason: format!("chat completions request failed: {e}"),
        };

        info!(
            model = %self.settings.model,
            message_count = request.messages.len(),
            tools = request.tools.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(failure)?;

        let status = response.status();
        let text = response.text().await.map_err(failure)?;
        if !status.is_success() {
            return Err(DevpilotError::ModelFailure {
                reason: format!("chat completions returned {status}: {text}"),
            });
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| DevpilotError::ModelFailure {
            reason: format!("response is not JSON: {e}"),
        })?;
        let message = parse_response(&json)?;
        debug!(
            tool_calls = message.tool_calls.len(),
            content_bytes = message.content.len(),
            "completion received"
        );
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use devpilot_contracts::message::ToolCall;

    use super::*;

    fn settings() -> OpenAiSettings {
        OpenAiSettings {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: "sk-test".to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
        }
    }

    fn kubectl_spec() -> ToolSpec {
        let mut spec = ToolSpec::new("kubectl_exec", "Execute Kubernetes commands");
        spec.parameters = json!({
            "type": "object",
            "properties": { "command": { "type": "string" } },
            "required": ["command"]
        });
        spec
    }

    #[test]
    fn test_single_mode_binds_tools_without_parallel_calls() {
        let request = CompletionRequest::with_tools(vec![Message::human("list pods")], vec![kubectl_spec()]);
        let body = request_body(&settings(), &request);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["parallel_tool_calls"], false);
        assert_eq!(body["tools"][0]["function"]["name"], "kubectl_exec");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_text_only_mode_sends_no_tools() {
        let request = CompletionRequest::text_only(vec![Message::human("summarize")]);
        let body = request_body(&settings(), &request);
        assert!(body.get("tools").is_none());
        assert!(body.get("parallel_tool_calls").is_none());
    }

    #[test]
    fn test_transcript_maps_to_wire_roles() {
        let call = ToolCall::new(
            "call_1",
            "kubectl_exec",
            json!({ "command": "get pods" }).as_object().cloned().unwrap(),
        );
        let request = CompletionRequest::text_only(vec![
            Message::system("You are DevOpsGPT"),
            Message::assistant_with_calls("", vec![call]),
            Message::tool_result("call_1", "kubectl_exec", "web-1 Running"),
        ]);
        let body = request_body(&settings(), &request);
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["tool_calls"][0]["function"]["arguments"], "{\"command\":\"get pods\"}");
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[2]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_parse_tool_call_response() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": { "name": "helm_exec", "arguments": "{\"command\":\"list\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let message = parse_response(&body).unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "");
        assert_eq!(message.tool_calls[0].id, "call_9");
        assert_eq!(message.tool_calls[0].arguments["command"], "list");
    }

    #[test]
    fn test_parse_text_response() {
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": "All pods healthy." } }] });
        let message = parse_response(&body).unwrap();
        assert!(!message.has_tool_calls());
        assert_eq!(message.content, "All pods healthy.");
    }

    #[test]
    fn test_parse_rejects_malformed_arguments() {
        let body = json!({
            "choices": [{ "message": { "tool_calls": [{
                "id": "c1",
                "function": { "name": "git_exec", "arguments": "[1,2]" }
            }] } }]
        });
        match parse_response(&body) {
            Err(DevpilotError::ModelFailure { reason }) => assert!(reason.contains("git_exec")),
            other => panic!("expected ModelFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_without_choices_fails() {
        assert!(parse_response(&json!({ "error": "rate limited" })).is_err());
    }

    #[test]
    fn test_settings_debug_masks_key() {
        let rendered = format!("{:?}", settings());
        assert!(!rendered.contains("sk-test"));
    }
}
