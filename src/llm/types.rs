//! Common types for LLM interactions

use serde_json::Value;

/// LLM request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
    pub response_format: ResponseFormat,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Single user turn, free-form text answer
    pub fn text(prompt: impl Into<String>) -> Self {
        Self::conversation(vec![LlmMessage::user(prompt)])
    }

    /// Multi-turn dialogue, free-form text answer
    pub fn conversation(messages: Vec<LlmMessage>) -> Self {
        Self {
            system: None,
            messages,
            response_format: ResponseFormat::Text,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Constrain the answer to JSON matching `schema`
    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.response_format = ResponseFormat::Json { schema };
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// Shape of the answer the oracle must produce
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Text,
    Json { schema: Value },
}

impl ResponseFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, ResponseFormat::Json { .. })
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Concatenated text of the first candidate
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
