//! Chat-completions HTTP adapter for the proposal path.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ProposalError;
use crate::proposal::ProposalSource;

const SYSTEM_PROMPT: &str =
    "You schedule drivers for trips. Follow the rules exactly and answer with JSON only.";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1".to_string(),
            api_key: None,
            timeout_secs: 30,
            temperature: 0.0,
        }
    }
}

impl ChatConfig {
    /// Defaults overridden by `DISPATCH_LLM_BASE_URL`, `DISPATCH_LLM_MODEL`
    /// and `DISPATCH_LLM_API_KEY` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = env::var("DISPATCH_LLM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("DISPATCH_LLM_MODEL") {
            config.model = model;
        }
        config.api_key = env::var("DISPATCH_LLM_API_KEY").ok().filter(|key| !key.is_empty());
        config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    config: ChatConfig,
    client: reqwest::blocking::Client,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl ProposalSource for ChatClient {
    fn complete(&self, prompt: &str) -> Result<String, ProposalError> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
        };

        let mut request = self.client.post(self.config.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProposalError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProposalError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_slash() {
        let config = ChatConfig {
            base_url: "http://example.test/v1/".to_string(),
            ..ChatConfig::default()
        };
        assert_eq!(config.endpoint(), "http://example.test/v1/chat/completions");
    }

    #[test]
    fn test_request_shape() {
        let body = ChatRequest {
            model: "m",
            temperature: 0.0,
            messages: vec![ChatMessage { role: "user", content: "hi" }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
