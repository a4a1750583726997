//! Gemini `generateContent` client
//!
//! Tool results travel as `functionResponse` parts inside `user` turns,
//! which is how the API expects them. The API key is sent in the
//! `x-goog-api-key` header and never appears in a URL.

use super::{
    Content, FunctionCall, FunctionResponse, LLMError, LLMProvider, LLMRequest, LLMResponse, Part,
    Role, Usage,
};
use crate::config::GeminiConfig;
use crate::secrets::{self, SecretString};
use crate::tools::schema::{FunctionDeclaration, ParamType};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

pub struct GeminiProvider {
    config: GeminiConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, api_key: SecretString) -> Self {
        Self {
            config,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &LLMRequest<'_>) -> super::Result<LLMResponse> {
        let payload = build_payload(request);
        debug!(
            "Sending {} turns and {} declarations to {}",
            request.contents.len(),
            request.tools.len(),
            self.config.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(secrets::scrub(&e.to_string(), &self.api_key)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let text = secrets::scrub(&text, &self.api_key);
            warn!("Gemini API returned {}", status);

            return Err(match status.as_u16() {
                400 | 404 => LLMError::InvalidRequest(text),
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                _ => LLMError::ProviderUnavailable(format!(
                    "Gemini API error ({}): {}",
                    status, text
                )),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        parse_response(&data)
    }
}

/// Build the `generateContent` request body
fn build_payload(request: &LLMRequest<'_>) -> Value {
    // The API rejects turns without parts, e.g. an empty model reply we
    // still keep in history
    let contents: Vec<Value> = request
        .contents
        .iter()
        .filter(|content| !content.parts.is_empty())
        .map(content_to_json)
        .collect();

    let mut payload = Map::new();
    payload.insert("contents".to_string(), json!(contents));

    if !request.system_prompt.is_empty() {
        payload.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [{ "text": request.system_prompt }] }),
        );
    }

    if !request.tools.is_empty() {
        let declarations: Vec<Value> = request.tools.iter().map(declaration_to_json).collect();
        payload.insert(
            "tools".to_string(),
            json!([{ "functionDeclarations": declarations }]),
        );
    }

    Value::Object(payload)
}

fn content_to_json(content: &Content) -> Value {
    let role = match content.role {
        Role::Model => "model",
        Role::User | Role::Tool => "user",
    };
    let parts: Vec<Value> = content.parts.iter().map(part_to_json).collect();
    json!({ "role": role, "parts": parts })
}

fn part_to_json(part: &Part) -> Value {
    match part {
        Part::Text(text) => json!({ "text": text }),
        Part::FunctionCall(call) => {
            let mut value = json!({
                "functionCall": { "name": call.name, "args": call.args }
            });
            if let Some(signature) = &call.thought_signature {
                value["thoughtSignature"] = json!(signature);
            }
            value
        }
        Part::FunctionResponse(response) => json!({
            "functionResponse": { "name": response.name, "response": response.response }
        }),
    }
}

fn param_type_to_json(param_type: &ParamType) -> Value {
    match param_type {
        ParamType::String => json!({ "type": "STRING" }),
        ParamType::Integer => json!({ "type": "INTEGER" }),
        ParamType::Boolean => json!({ "type": "BOOLEAN" }),
        ParamType::Array(item) => json!({ "type": "ARRAY", "items": param_type_to_json(item) }),
    }
}

fn declaration_to_json(declaration: &FunctionDeclaration) -> Value {
    let mut properties = Map::new();
    for param in &declaration.params {
        let mut schema = param_type_to_json(&param.param_type);
        schema["description"] = json!(param.description);
        properties.insert(param.name.clone(), schema);
    }

    let required: Vec<&str> = declaration
        .params
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    let mut parameters = json!({ "type": "OBJECT", "properties": properties });
    if !required.is_empty() {
        parameters["required"] = json!(required);
    }

    json!({
        "name": declaration.name,
        "description": declaration.description,
        "parameters": parameters,
    })
}

/// Turn a `generateContent` response body into an [`LLMResponse`]
fn parse_response(data: &Value) -> super::Result<LLMResponse> {
    let usage = data.get("usageMetadata").map(|meta| Usage {
        prompt_tokens: meta
            .get("promptTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        response_tokens: meta
            .get("candidatesTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    });

    let Some(candidate) = data
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        if let Some(reason) = data
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
        {
            return Err(LLMError::InvalidRequest(format!(
                "Prompt blocked by Gemini: {}",
                reason
            )));
        }
        return Err(LLMError::ParseError("No candidates in response".to_string()));
    };

    // A candidate without content (e.g. finishReason SAFETY) is an empty turn
    let content = match candidate.get("content") {
        Some(content) => Some(parse_content(content)?),
        None => {
            let finish_reason = candidate
                .get("finishReason")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            debug!("Candidate without content (finishReason: {})", finish_reason);
            None
        }
    };

    Ok(LLMResponse { content, usage })
}

fn parse_content(content: &Value) -> super::Result<Content> {
    let raw_parts = content
        .get("parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut parts = Vec::with_capacity(raw_parts.len());
    for part in raw_parts {
        // Thought summaries are not part of the answer
        if part.get("thought").and_then(Value::as_bool) == Some(true) {
            continue;
        }

        if let Some(call) = part.get("functionCall") {
            let name = call
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| LLMError::ParseError("functionCall without a name".to_string()))?;
            let args = match call.get("args") {
                Some(Value::Object(args)) => args.clone(),
                _ => Map::new(),
            };
            parts.push(Part::FunctionCall(FunctionCall {
                name: name.to_string(),
                args,
                thought_signature: part
                    .get("thoughtSignature")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }));
        } else if let Some(response) = part.get("functionResponse") {
            parts.push(Part::FunctionResponse(FunctionResponse {
                name: response
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                response: response.get("response").cloned().unwrap_or(Value::Null),
            }));
        } else if let Some(text) = part.get("text").and_then(Value::as_str) {
            parts.push(Part::Text(text.to_string()));
        }
    }

    Ok(Content::model(parts))
}
