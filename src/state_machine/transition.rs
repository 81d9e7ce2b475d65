//! Pure state transition function
//!
//! Given the same state and event it always produces the same result. Ids
//! and timestamps travel on the events, and all I/O is described by the
//! returned effects.

use super::state::{Message, MessageRole, Phase, SessionState, SessionStatus};
use super::{Effect, Event};
use crate::intelligence::merge;
use crate::oracle::{clamp_confidence, Analysis};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Agent is busy, wait for the current step to finish (or cancel it)")]
    Busy,
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Session is completed and accepts no further messages")]
    SessionCompleted,
    #[error("Nothing to cancel")]
    NothingToCancel,
    #[error("Discarding stale {event} for call {call_id}")]
    StaleResponse { event: &'static str, call_id: u64 },
}

/// Pure transition function
#[allow(clippy::too_many_lines)]
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state.phase, event) {
        // ============================================================
        // Incoming messages
        // ============================================================
        (Phase::Ready, Event::IncomingMessage { id, text, at }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            let previous = state.session.status;
            if previous == SessionStatus::Completed {
                return Err(TransitionError::SessionCompleted);
            }

            let mut next = state.clone();
            next.session
                .messages
                .push(Message::new(id, MessageRole::Incoming, text, at));
            next.session.last_update_time = at;
            if previous == SessionStatus::Idle {
                next.session.status = SessionStatus::Detecting;
            }

            let call_id = take_call_id(&mut next);
            let request = if previous == SessionStatus::Engaging {
                // Once engaged, every message gets a reply followed by extraction
                next.phase = Phase::AwaitingReply {
                    call_id,
                    extract_after: true,
                };
                Effect::reply(call_id, next.session.persona.clone())
            } else {
                next.phase = Phase::AwaitingDetection { call_id };
                Effect::RequestDetection { call_id }
            };

            Ok(TransitionResult::new(next)
                .with_effect(Effect::PublishSnapshot)
                .with_effect(request))
        }

        (_, Event::IncomingMessage { .. }) => Err(TransitionError::Busy),

        // ============================================================
        // Detection
        // ============================================================
        (
            Phase::AwaitingDetection { call_id },
            Event::DetectionComplete {
                call_id: completed,
                result,
                at,
            },
        ) if call_id == completed => {
            let mut next = state.clone();

            if !result.is_scam {
                // Keep monitoring; nothing about the session changes
                next.phase = Phase::Ready;
                return Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot));
            }

            next.session.is_scam = true;
            next.session.confidence = clamp_confidence(result.confidence);
            next.session.persona = result.suggested_persona;
            next.session.status = SessionStatus::Engaging;
            next.session.last_update_time = at;

            let reply_id = take_call_id(&mut next);
            next.phase = Phase::AwaitingReply {
                call_id: reply_id,
                extract_after: false,
            };
            let persona = next.session.persona.clone();

            Ok(TransitionResult::new(next)
                .with_effect(Effect::PublishSnapshot)
                .with_effect(Effect::reply(reply_id, persona)))
        }

        // ============================================================
        // Agent reply
        // ============================================================
        (
            Phase::AwaitingReply {
                call_id,
                extract_after,
            },
            Event::AgentReply {
                call_id: completed,
                id,
                text,
                at,
            },
        ) if call_id == completed => {
            let mut next = state.clone();
            next.session
                .messages
                .push(Message::new(id, MessageRole::Agent, text, at));
            next.session.last_update_time = at;

            if extract_after {
                let extract_id = take_call_id(&mut next);
                next.phase = Phase::AwaitingExtraction {
                    call_id: extract_id,
                };
                Ok(TransitionResult::new(next)
                    .with_effect(Effect::PublishSnapshot)
                    .with_effect(Effect::RequestExtraction {
                        call_id: extract_id,
                    }))
            } else {
                next.phase = Phase::Ready;
                Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot))
            }
        }

        // ============================================================
        // Extraction
        // ============================================================
        (
            Phase::AwaitingExtraction { call_id },
            Event::ExtractionComplete {
                call_id: completed,
                outcome,
                at,
            },
        ) if call_id == completed => {
            let mut next = state.clone();
            next.phase = Phase::Ready;

            // A fallback carries no information; merging its "Unknown" type
            // would overwrite a real one.
            if let Analysis::Answered(found) = outcome {
                let merged = merge(&next.session.intelligence, &found);
                if merged != next.session.intelligence {
                    next.session.intelligence = merged;
                    next.session.last_update_time = at;
                }
            }

            Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Cancellation
        // ============================================================
        (Phase::Ready, Event::Cancel) => Err(TransitionError::NothingToCancel),

        (_, Event::Cancel) => {
            let mut next = state.clone();
            next.phase = Phase::Ready;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::AbortCall)
                .with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Late or mismatched oracle completions
        // ============================================================
        (_, event) => Err(TransitionError::StaleResponse {
            event: event.name(),
            call_id: event.call_id().unwrap_or_default(),
        }),
    }
}

fn take_call_id(state: &mut SessionState) -> u64 {
    let id = state.next_call_id;
    state.next_call_id += 1;
    id
}
