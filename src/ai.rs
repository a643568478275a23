use crate::config::AiConfig;
use crate::models::{GatewayError, GatewayResult};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;

const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Thin relay to the two chat providers. No history, no streaming; the
/// provider keys come from configuration and are never taken from callers.
pub struct ChatRelay {
    client: Client,
    config: AiConfig,
}

impl ChatRelay {
    pub fn new(config: AiConfig, timeout_secs: u64) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| crate::Error::new(format!("http client build failed: {err}")))?;
        Ok(Self { client, config })
    }

    pub fn chat(&self, provider: &str, message: &str) -> GatewayResult<Value> {
        if message.trim().is_empty() {
            return Err(GatewayError::invalid_request("message is required"));
        }
        match provider.trim().to_lowercase().as_str() {
            "gemini" => self.gemini(message),
            "chaingpt" => self.chaingpt(message),
            other => Err(GatewayError::invalid_request(format!(
                "unknown chat provider: {other}"
            ))),
        }
    }

    fn gemini(&self, message: &str) -> GatewayResult<Value> {
        let key = self.config.gemini_api_key.as_deref().ok_or_else(|| {
            GatewayError::missing_credentials("gemini API key is not configured")
        })?;
        let url = format!(
            "{}/v1beta/models/{GEMINI_MODEL}:generateContent?key={key}",
            self.config.gemini_base_url
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": message }] }],
        });
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .map_err(|err| GatewayError::network(format!("gemini request failed: {err}")))?;
        if !response.status().is_success() {
            return Err(GatewayError::network(format!(
                "gemini response status: {}",
                response.status()
            )));
        }
        let payload = response.json::<Value>().map_err(|err| {
            GatewayError::malformed(format!("gemini response parse failed: {err}"))
        })?;
        let reply = payload
            .get("candidates")
            .and_then(|candidates| candidates.as_array())
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.as_array())
            .and_then(|parts| parts.first())
            .and_then(|part| part.get("text"))
            .and_then(|text| text.as_str())
            .ok_or_else(|| GatewayError::malformed("gemini reply text missing"))?;
        Ok(json!({ "provider": "gemini", "reply": reply }))
    }

    fn chaingpt(&self, message: &str) -> GatewayResult<Value> {
        let key = self.config.chaingpt_api_key.as_deref().ok_or_else(|| {
            GatewayError::missing_credentials("chaingpt API key is not configured")
        })?;
        let url = format!("{}/chat/stream", self.config.chaingpt_base_url);
        let body = json!({
            "model": "general_assistant",
            "question": message,
            "chatHistory": "off",
        });
        let response = self
            .client
            .post(url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .map_err(|err| GatewayError::network(format!("chaingpt request failed: {err}")))?;
        if !response.status().is_success() {
            return Err(GatewayError::network(format!(
                "chaingpt response status: {}",
                response.status()
            )));
        }
        let reply = response.text().map_err(|err| {
            GatewayError::malformed(format!("chaingpt response read failed: {err}"))
        })?;
        Ok(json!({ "provider": "chaingpt", "reply": reply }))
    }
}
