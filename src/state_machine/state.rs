//! Session state types

use crate::intelligence::ScamIntelligence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Messages
// ============================================================================

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Text received from the suspected scammer
    #[serde(rename = "scammer")]
    Incoming,
    /// Reply produced by the honey-pot persona
    Agent,
    System,
}

impl MessageRole {
    /// Label used when rendering history for the oracle
    pub fn label(self) -> &'static str {
        match self {
            MessageRole::Incoming => "scammer",
            MessageRole::Agent => "agent",
            MessageRole::System => "system",
        }
    }
}

/// A single conversation entry. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        role: MessageRole,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            text: text.into(),
            timestamp,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Conversation status. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No message received yet
    #[default]
    Idle,
    /// Messages received, not (yet) judged fraudulent
    Detecting,
    /// Scam confirmed, persona engaged
    Engaging,
    /// Reserved terminal state; no transition enters it
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Detecting => "detecting",
            SessionStatus::Engaging => "engaging",
            SessionStatus::Completed => "completed",
        }
    }
}

/// The aggregate root observed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoneyPotSession {
    pub id: String,
    pub status: SessionStatus,
    pub is_scam: bool,
    pub confidence: f64,
    pub messages: Vec<Message>,
    pub intelligence: ScamIntelligence,
    pub persona: String,
    pub start_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
}

impl HoneyPotSession {
    pub fn new(id: impl Into<String>, started: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: SessionStatus::Idle,
            is_scam: false,
            confidence: 0.0,
            messages: Vec::new(),
            intelligence: ScamIntelligence::default(),
            persona: String::new(),
            start_time: started,
            last_update_time: started,
        }
    }

    pub fn count_role(&self, role: MessageRole) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            messages_intercepted: self.count_role(MessageRole::Incoming),
            agent_replies: self.count_role(MessageRole::Agent),
            intel_points: self.intelligence.points(),
            engaged: self.status == SessionStatus::Engaging,
        }
    }
}

/// Dashboard counters derived from a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub messages_intercepted: usize,
    pub agent_replies: usize,
    pub intel_points: usize,
    pub engaged: bool,
}

// ============================================================================
// Workflow phase
// ============================================================================

/// Which oracle call, if any, the session is waiting on.
///
/// Each waiting phase records the id of the outstanding call so that late
/// completions from an aborted call can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Ready,
    AwaitingDetection { call_id: u64 },
    AwaitingReply { call_id: u64, extract_after: bool },
    AwaitingExtraction { call_id: u64 },
}

impl Phase {
    pub fn is_busy(self) -> bool {
        !matches!(self, Phase::Ready)
    }

    pub fn call_id(self) -> Option<u64> {
        match self {
            Phase::Ready => None,
            Phase::AwaitingDetection { call_id }
            | Phase::AwaitingReply { call_id, .. }
            | Phase::AwaitingExtraction { call_id } => Some(call_id),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Phase::Ready => "ready",
            Phase::AwaitingDetection { .. } => "analyzing",
            Phase::AwaitingReply { .. } => "replying",
            Phase::AwaitingExtraction { .. } => "extracting",
        }
    }
}

/// Everything the transition function needs
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub session: HoneyPotSession,
    pub phase: Phase,
    /// Id handed to the next oracle call
    pub next_call_id: u64,
}

impl SessionState {
    pub fn new(session: HoneyPotSession) -> Self {
        Self {
            session,
            phase: Phase::Ready,
            next_call_id: 1,
        }
    }
}
