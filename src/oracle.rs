//! Remote analysis client
//!
//! Three single-shot operations against the language-model oracle: detect,
//! respond and extract. None of them can fail from the caller's point of
//! view. Transport errors, timeouts and unparseable answers are logged and
//! replaced by fixed fallback values, flagged as such through [`Analysis`].

mod prompts;

use crate::intelligence::ScamIntelligence;
use crate::llm::{LlmError, LlmRequest, LlmService};
use crate::state_machine::Message;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PERSONA: &str = "generic";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Reply used when the oracle answers with nothing
pub const EMPTY_REPLY_FALLBACK: &str = "I'm not sure I understand, could you explain more?";
/// Reply used when the oracle cannot be reached
pub const ERROR_REPLY_FALLBACK: &str = "Oh, that sounds interesting. Tell me more.";

/// Outcome of an oracle call. Both variants carry a usable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis<T> {
    /// The oracle produced this value
    Answered(T),
    /// The call failed; this is the documented default
    Fallback(T),
}

impl<T> Analysis<T> {
    pub fn into_inner(self) -> T {
        match self {
            Analysis::Answered(v) | Analysis::Fallback(v) => v,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Analysis::Answered(v) | Analysis::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Analysis::Fallback(_))
    }
}

/// Verdict of a detection call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub is_scam: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub suggested_persona: String,
}

impl DetectionResult {
    pub fn fallback() -> Self {
        Self {
            is_scam: false,
            confidence: 0.0,
            reason: "error".to_string(),
            suggested_persona: DEFAULT_PERSONA.to_string(),
        }
    }

    fn validated(mut self) -> Self {
        self.confidence = clamp_confidence(self.confidence);
        if self.suggested_persona.trim().is_empty() {
            self.suggested_persona = DEFAULT_PERSONA.to_string();
        } else {
            self.suggested_persona = self.suggested_persona.trim().to_string();
        }
        self
    }
}

/// Force a confidence into `[0, 1]`; non-finite values become 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// The oracle as seen by the session runtime
#[async_trait]
pub trait Analyst: Send + Sync {
    /// Classify the conversation so far
    async fn detect(&self, history: &[Message]) -> Analysis<DetectionResult>;

    /// Next utterance of `persona`
    async fn respond(&self, history: &[Message], persona: &str) -> Analysis<String>;

    /// Entities found anywhere in the conversation
    async fn extract(&self, history: &[Message]) -> Analysis<ScamIntelligence>;
}

#[async_trait]
impl<T: Analyst + ?Sized> Analyst for Arc<T> {
    async fn detect(&self, history: &[Message]) -> Analysis<DetectionResult> {
        (**self).detect(history).await
    }

    async fn respond(&self, history: &[Message], persona: &str) -> Analysis<String> {
        (**self).respond(history, persona).await
    }

    async fn extract(&self, history: &[Message]) -> Analysis<ScamIntelligence> {
        (**self).extract(history).await
    }
}

/// [`Analyst`] backed by an LLM service
pub struct AnalysisClient {
    llm: Arc<dyn LlmService>,
    timeout: Duration,
    temperature: f32,
}

impl AnalysisClient {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self {
            llm,
            timeout: DEFAULT_TIMEOUT,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn call(&self, request: &LlmRequest) -> Result<String, LlmError> {
        match tokio::time::timeout(self.timeout, self.llm.complete(request)).await {
            Ok(result) => result.map(|r| r.text),
            Err(_) => Err(LlmError::timeout(self.timeout)),
        }
    }

    async fn try_detect(&self, history: &[Message]) -> Result<DetectionResult, LlmError> {
        let request = LlmRequest::text(prompts::detection_prompt(history))
            .with_system(prompts::DETECTOR_INSTRUCTION)
            .with_json_schema(prompts::detection_schema());
        let text = self.call(&request).await?;
        parse_json::<DetectionResult>(&text).map(DetectionResult::validated)
    }

    async fn try_respond(&self, history: &[Message], persona: &str) -> Result<String, LlmError> {
        let messages = prompts::conversation_turns(history);
        if messages.is_empty() {
            return Err(LlmError::invalid_request("No conversation to respond to"));
        }
        let request = LlmRequest::conversation(messages)
            .with_system(prompts::persona_instruction(persona))
            .with_temperature(self.temperature);
        Ok(self.call(&request).await?.trim().to_string())
    }

    async fn try_extract(&self, history: &[Message]) -> Result<ScamIntelligence, LlmError> {
        let request = LlmRequest::text(prompts::extraction_prompt(history))
            .with_system(prompts::EXTRACTOR_INSTRUCTION)
            .with_json_schema(prompts::extraction_schema());
        let text = self.call(&request).await?;
        parse_json::<ScamIntelligence>(&text).map(ScamIntelligence::normalized)
    }
}

#[async_trait]
impl Analyst for AnalysisClient {
    async fn detect(&self, history: &[Message]) -> Analysis<DetectionResult> {
        match self.try_detect(history).await {
            Ok(result) => {
                tracing::info!(
                    is_scam = result.is_scam,
                    confidence = result.confidence,
                    reason = %result.reason,
                    "Scam detection finished"
                );
                Analysis::Answered(result)
            }
            Err(e) => {
                tracing::error!(error = %e, kind = ?e.kind, "Scam detection error");
                Analysis::Fallback(DetectionResult::fallback())
            }
        }
    }

    async fn respond(&self, history: &[Message], persona: &str) -> Analysis<String> {
        match self.try_respond(history, persona).await {
            Ok(text) if text.is_empty() => {
                tracing::warn!(persona, "Agent response was empty");
                Analysis::Fallback(EMPTY_REPLY_FALLBACK.to_string())
            }
            Ok(text) => Analysis::Answered(text),
            Err(e) => {
                tracing::error!(error = %e, kind = ?e.kind, persona, "Agent response error");
                Analysis::Fallback(ERROR_REPLY_FALLBACK.to_string())
            }
        }
    }

    async fn extract(&self, history: &[Message]) -> Analysis<ScamIntelligence> {
        match self.try_extract(history).await {
            Ok(found) => {
                tracing::info!(points = found.points(), scam_type = %found.scam_type, "Extraction finished");
                Analysis::Answered(found)
            }
            Err(e) => {
                tracing::error!(error = %e, kind = ?e.kind, "Extraction error");
                Analysis::Fallback(ScamIntelligence::unknown())
            }
        }
    }
}

/// Parse a structured answer, tolerating a Markdown code fence around it.
fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(LlmError::malformed("Empty structured response"));
    }
    serde_json::from_str(body)
        .map_err(|e| LlmError::malformed(format!("Failed to parse structured response: {e}")))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
