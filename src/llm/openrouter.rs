use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::Result;
use crate::llm::prompts::PromptTemplate;
use crate::llm::provider::{AnalysisOutcome, FailureKind, InstructionAnalyzer};

/// Chat-completions client for OpenRouter (or any OpenAI-compatible endpoint).
pub struct OpenRouterClient {
    client: Client,
    url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    template: PromptTemplate,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    /// Provider error object; its shape varies, so only `message` is read.
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenRouterClient {
    /// Builds a client for `settings`. Fails with `MissingCredential` when no
    /// API key resolved.
    pub fn new(settings: &Settings, template: PromptTemplate) -> Result<Self> {
        let api_key = settings.require_api_key()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            url: settings.base_url.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            template,
        })
    }

    fn build_messages(&self, instruction: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system".to_string(),
                content: self.template.system.clone(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: self.template.render(instruction),
            },
        ]
    }
}

#[async_trait]
impl InstructionAnalyzer for OpenRouterClient {
    async fn analyze(&self, instruction: &str) -> AnalysisOutcome {
        let request_body = ChatRequest {
            model: &self.model,
            messages: self.build_messages(instruction),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        tracing::debug!("Sending instruction to {} ({} chars)", self.model, instruction.len());

        let response = match self.client.post(&self.url).json(&request_body).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return AnalysisOutcome::failure(FailureKind::Unknown, e.to_string())
            }
            Err(e) => return AnalysisOutcome::failure(FailureKind::Transport, e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return AnalysisOutcome::failure(
                FailureKind::Transport,
                format!("HTTP {} from {}: {}", status, self.url, body.trim()),
            );
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return AnalysisOutcome::failure(FailureKind::Transport, e.to_string()),
        };

        parse_completion(&body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Extracts `choices[0].message.content` from a chat-completions body.
fn parse_completion(body: &str) -> AnalysisOutcome {
    let parsed: ChatResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return AnalysisOutcome::failure(
                FailureKind::Protocol,
                format!("invalid JSON body: {}", e),
            )
        }
    };

    if let Some(error) = parsed.error {
        let message = match error.get("message").and_then(|m| m.as_str()) {
            Some(message) => message.to_string(),
            None => format!("provider error: {}", error),
        };
        return AnalysisOutcome::failure(FailureKind::Protocol, message);
    }

    match parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
    {
        Some(text) => AnalysisOutcome::Success { text },
        None => AnalysisOutcome::failure(
            FailureKind::Protocol,
            "response has no choices[0].message.content",
        ),
    }
}
