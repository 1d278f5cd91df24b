//! OpenAI-compatible chat completions client.
//!
//! Request encoding and response parsing are pure functions so they can be
//! tested without a server.

use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tars_core::{
    ActionCatalog, ActionInput, ActionRequest, ModelClient, ModelError, ModelReply, Transcript,
    Turn,
};
use tracing::{debug, warn};

pub struct OpenAiCompatibleClient {
    client: Client,
    config: ProviderConfig,
    api_key: Option<String>,
    label: String,
}

impl OpenAiCompatibleClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Fatal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key(),
            label: config.model.clone(),
            config,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatibleClient {
    async fn invoke(
        &self,
        instructions: &str,
        transcript: &Transcript,
        catalog: &ActionCatalog,
    ) -> Result<ModelReply, ModelError> {
        let url = self.config.completions_url();
        let body = build_request_body(&self.config, instructions, transcript, catalog);

        debug!("llm url={}", url);
        debug!("llm api_key_present={}", self.api_key.is_some());
        debug!("llm tools={}", catalog.names().join(","));

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ModelError::Fatal(format!("Network connection failed: {}", e))
            } else {
                ModelError::Fatal(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            let err = classify_http_error(status.as_u16(), &error_body);
            warn!("{} returned {}: {}", self.label, status, err);
            return Err(err);
        }

        let completion: Value = response
            .json()
            .await
            .map_err(|e| ModelError::Fatal(format!("Invalid response body: {}", e)))?;

        parse_completion(&completion)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Build the chat completions request body.
pub fn build_request_body(
    config: &ProviderConfig,
    instructions: &str,
    transcript: &Transcript,
    catalog: &ActionCatalog,
) -> Value {
    json!({
        "model": config.model,
        "messages": encode_transcript(instructions, transcript),
        "tools": catalog.function_schemas(),
        "tool_choice": config.tool_choice,
        "max_tokens": config.max_tokens,
    })
}

/// Encode instructions plus transcript as OpenAI chat messages.
pub fn encode_transcript(instructions: &str, transcript: &Transcript) -> Vec<Value> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(json!({"role": "system", "content": instructions}));

    for turn in transcript.turns() {
        let message = match turn {
            Turn::User { content } => json!({"role": "user", "content": content}),
            Turn::Model { narration, requests } => {
                let content = if narration.is_empty() {
                    Value::Null
                } else {
                    Value::String(narration.clone())
                };
                let mut message = json!({"role": "assistant", "content": content});
                if !requests.is_empty() {
                    message["tool_calls"] = requests
                        .iter()
                        .map(|request| {
                            json!({
                                "id": request.id,
                                "type": "function",
                                "function": {
                                    "name": request.name,
                                    "arguments": Value::Object(request.input.clone()).to_string(),
                                }
                            })
                        })
                        .collect();
                }
                message
            }
            Turn::ToolResult { name, outcome } => json!({
                "role": "tool",
                "tool_call_id": outcome.id,
                "name": name,
                "content": outcome.content(),
            }),
        };
        messages.push(message);
    }

    messages
}

/// Turn a chat completions response into a [`ModelReply`].
pub fn parse_completion(completion: &Value) -> Result<ModelReply, ModelError> {
    let choice = completion["choices"]
        .get(0)
        .ok_or_else(|| ModelError::Fatal("No choices in response".to_string()))?;

    let message = &choice["message"];
    let narration = message["content"].as_str().unwrap_or_default().to_string();
    let more_to_say = choice["finish_reason"].as_str() == Some("length");

    let mut requests = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for (index, call) in calls.iter().enumerate() {
            requests.push(parse_tool_call(index, call)?);
        }
    }

    Ok(ModelReply {
        narration,
        requests,
        more_to_say,
    })
}

fn parse_tool_call(index: usize, call: &Value) -> Result<ActionRequest, ModelError> {
    let name = call["function"]["name"]
        .as_str()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ModelError::MalformedToolCall(format!("tool call {} has no name", index)))?;

    let id = call["id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("call_{}", index));

    let input = match &call["function"]["arguments"] {
        Value::Null => ActionInput::new(),
        Value::Object(map) => map.clone(),
        Value::String(raw) if raw.trim().is_empty() => ActionInput::new(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(ModelError::MalformedToolCall(format!(
                    "arguments for {} are not an object: {}",
                    name, other
                )))
            }
            Err(e) => {
                return Err(ModelError::MalformedToolCall(format!(
                    "invalid arguments for {}: {}",
                    name, e
                )))
            }
        },
        other => {
            return Err(ModelError::MalformedToolCall(format!(
                "arguments for {} are not an object: {}",
                name, other
            )))
        }
    };

    Ok(ActionRequest::new(id, name, input))
}

/// Classify a non-success HTTP response.
pub fn classify_http_error(status: u16, body: &str) -> ModelError {
    let detail = format!("HTTP {}: {}", status, body.trim());
    if body.contains("tool_use_failed") {
        ModelError::MalformedToolCall(detail)
    } else if status == 429 || body.contains("rate_limit") {
        ModelError::RateLimited(detail)
    } else {
        ModelError::Fatal(detail)
    }
}
