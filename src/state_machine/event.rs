//! Events that can occur in a session

use crate::intelligence::ScamIntelligence;
use crate::oracle::{Analysis, DetectionResult};
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Operator events
    IncomingMessage {
        id: String,
        text: String,
        at: DateTime<Utc>,
    },
    Cancel,

    // Oracle events
    DetectionComplete {
        call_id: u64,
        result: DetectionResult,
        at: DateTime<Utc>,
    },
    AgentReply {
        call_id: u64,
        id: String,
        text: String,
        at: DateTime<Utc>,
    },
    ExtractionComplete {
        call_id: u64,
        outcome: Analysis<ScamIntelligence>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// New incoming message stamped with a fresh id and the current time
    pub fn incoming(text: impl Into<String>) -> Self {
        Event::IncomingMessage {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Oracle call this event completes, if any
    pub fn call_id(&self) -> Option<u64> {
        match self {
            Event::DetectionComplete { call_id, .. }
            | Event::AgentReply { call_id, .. }
            | Event::ExtractionComplete { call_id, .. } => Some(*call_id),
            Event::IncomingMessage { .. } | Event::Cancel => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::IncomingMessage { .. } => "incoming_message",
            Event::Cancel => "cancel",
            Event::DetectionComplete { .. } => "detection_complete",
            Event::AgentReply { .. } => "agent_reply",
            Event::ExtractionComplete { .. } => "extraction_complete",
        }
    }
}
