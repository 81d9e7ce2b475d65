//! Effects produced by state transitions

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Classify the full message history
    RequestDetection { call_id: u64 },

    /// Generate the next in-character reply
    RequestReply { call_id: u64, persona: String },

    /// Extract entities from the full message history
    RequestExtraction { call_id: u64 },

    /// Abort the currently running oracle call
    AbortCall,

    /// Push a fresh snapshot to observers
    PublishSnapshot,
}

impl Effect {
    pub fn reply(call_id: u64, persona: impl Into<String>) -> Self {
        Effect::RequestReply {
            call_id,
            persona: persona.into(),
        }
    }

    pub fn is_oracle_request(&self) -> bool {
        matches!(
            self,
            Effect::RequestDetection { .. }
                | Effect::RequestReply { .. }
                | Effect::RequestExtraction { .. }
        )
    }
}
