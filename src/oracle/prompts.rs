//! Instructions, schemas and transcript rendering for the three oracle calls.

use crate::llm::LlmMessage;
use crate::state_machine::{Message, MessageRole};
use serde_json::{json, Value};

pub const DETECTOR_INSTRUCTION: &str = r#"You are an expert Scam Analyst. Analyze the incoming message(s) to determine if there is fraudulent intent.
Common scams include: job offers, lottery wins, tech support, bank fraud alerts, romance scams, and crypto investment "opportunities".
Return a JSON object with:
- isScam: boolean
- confidence: number (0 to 1)
- reason: short string explaining the flag
- suggestedPersona: a character the Honey-Pot should adopt to keep the scammer engaged (e.g., "Naive retiree", "Eager young professional", "Concerned parent")."#;

pub const EXTRACTOR_INSTRUCTION: &str = r"You are a Cyber Intelligence Tool. Analyze the conversation history and extract specific scam-related intelligence.
Identify:
- Bank account numbers and IFSC codes
- UPI IDs (VPA)
- Phishing links (URLs)
- Phone numbers or contact details provided by the scammer for further contact.
Also name the scam category in scamType.
Return the structured data as JSON.";

/// System instruction for the in-character responder
pub fn persona_instruction(persona: &str) -> String {
    format!(
        "Your identity: {persona}.
Your objective: you are an autonomous Honey-Pot. A potential scammer is talking to you.
Stay in character. Act slightly naive and curious, but don't be a pushover.
Your primary goal is to extract intelligence: ask for their bank details, payment links, UPI IDs, or website URLs.
DO NOT reveal you are an AI or that you've detected a scam.
Be verbose enough to keep them interested but not suspicious.
Wait for the scammer to propose a 'deal' and then ask \"How do I send the money?\" or \"Where do I sign up?\"."
    )
}

/// History as `role: text` lines
pub fn render_transcript(history: &[Message]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn detection_prompt(history: &[Message]) -> String {
    format!(
        "Analyze these messages for scam intent:\n\n{}",
        render_transcript(history)
    )
}

pub fn extraction_prompt(history: &[Message]) -> String {
    format!(
        "Extract intelligence from this chat:\n\n{}",
        render_transcript(history)
    )
}

/// History as chat turns: the scammer is the user, the persona is the model.
/// System notes are not part of the dialogue.
pub fn conversation_turns(history: &[Message]) -> Vec<LlmMessage> {
    history
        .iter()
        .filter_map(|m| match m.role {
            MessageRole::Incoming => Some(LlmMessage::user(m.text.clone())),
            MessageRole::Agent => Some(LlmMessage::assistant(m.text.clone())),
            MessageRole::System => None,
        })
        .collect()
}

pub fn detection_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isScam": { "type": "BOOLEAN" },
            "confidence": { "type": "NUMBER" },
            "reason": { "type": "STRING" },
            "suggestedPersona": { "type": "STRING" }
        },
        "required": ["isScam", "confidence", "reason", "suggestedPersona"]
    })
}

pub fn extraction_schema() -> Value {
    let list = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "bankAccounts": list,
            "upiIds": list,
            "phishingUrls": list,
            "phoneNumbers": list,
            "scamType": { "type": "STRING" }
        },
        "required": ["bankAccounts", "upiIds", "phishingUrls", "phoneNumbers", "scamType"]
    })
}
