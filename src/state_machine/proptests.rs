//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::state::*;
use super::transition::*;
use super::*;
use crate::intelligence::ScamIntelligence;
use crate::oracle::{Analysis, DetectionResult};
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn t(step: usize) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + i64::try_from(step).unwrap(), 0)
        .unwrap()
}

fn fresh() -> SessionState {
    SessionState::new(HoneyPotSession::new("prop-session", t(0)))
}

/// Abstract step; completions are bound to a call id against the live state
#[derive(Debug, Clone)]
enum Step {
    Incoming(String),
    Cancel,
    Detect { matching: bool, result: DetectionResult },
    Reply { matching: bool, text: String },
    Extract { matching: bool, outcome: Analysis<ScamIntelligence> },
}

fn realize(step: Step, state: &SessionState, at: DateTime<Utc>) -> Event {
    let call_id = |matching: bool| {
        if matching {
            state.phase.call_id().unwrap_or(0)
        } else {
            // Never issued
            state.next_call_id + 100
        }
    };
    match step {
        Step::Incoming(text) => Event::IncomingMessage {
            id: format!("in-{}", at.timestamp()),
            text,
            at,
        },
        Step::Cancel => Event::Cancel,
        Step::Detect { matching, result } => Event::DetectionComplete {
            call_id: call_id(matching),
            result,
            at,
        },
        Step::Reply { matching, text } => Event::AgentReply {
            call_id: call_id(matching),
            id: format!("agent-{}", at.timestamp()),
            text,
            at,
        },
        Step::Extract { matching, outcome } => Event::ExtractionComplete {
            call_id: call_id(matching),
            outcome,
            at,
        },
    }
}

/// Run steps from a fresh session, returning every (before, after) pair accepted
fn run(steps: Vec<Step>) -> Vec<(SessionState, SessionState)> {
    let mut state = fresh();
    let mut accepted = Vec::new();
    for (i, step) in steps.into_iter().enumerate() {
        let event = realize(step, &state, t(i + 1));
        if let Ok(result) = transition(&state, event) {
            accepted.push((state.clone(), result.new_state.clone()));
            state = result.new_state;
        }
    }
    accepted
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_persona() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Naive retiree".to_string()),
        Just("Eager young professional".to_string()),
        Just("Concerned parent".to_string()),
    ]
}

fn arb_detection() -> impl Strategy<Value = DetectionResult> {
    (any::<bool>(), -1.0f64..2.0, arb_persona()).prop_map(|(is_scam, confidence, persona)| {
        DetectionResult {
            is_scam,
            confidence,
            reason: "prop".to_string(),
            suggested_persona: persona,
        }
    })
}

fn arb_entries() -> impl Strategy<Value = Vec<String>> {
    // Small pool so that extractions overlap
    proptest::collection::vec(
        prop_oneof![
            Just("prize@ybl".to_string()),
            Just("refund@okaxis".to_string()),
            Just("http://claim.example".to_string()),
            Just("9876543210".to_string()),
        ],
        0..3,
    )
}

/// Answered extractions arrive normalized
fn arb_intelligence() -> impl Strategy<Value = ScamIntelligence> {
    (arb_entries(), arb_entries(), "[A-Za-z ]{0,12}").prop_map(|(upi_ids, phone_numbers, scam_type)| {
        ScamIntelligence {
            upi_ids,
            phone_numbers,
            scam_type,
            ..Default::default()
        }
        .normalized()
    })
}

fn arb_outcome() -> impl Strategy<Value = Analysis<ScamIntelligence>> {
    prop_oneof![
        3 => arb_intelligence().prop_map(Analysis::Answered),
        1 => Just(Analysis::Fallback(ScamIntelligence::unknown())),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => "[a-zA-Z ]{0,20}".prop_map(Step::Incoming),
        1 => Just(Step::Cancel),
        2 => (prop::bool::weighted(0.85), arb_detection())
            .prop_map(|(matching, result)| Step::Detect { matching, result }),
        2 => (prop::bool::weighted(0.85), "[a-zA-Z ?]{1,20}")
            .prop_map(|(matching, text)| Step::Reply { matching, text }),
        2 => (prop::bool::weighted(0.85), arb_outcome())
            .prop_map(|(matching, outcome)| Step::Extract { matching, outcome }),
    ]
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    proptest::collection::vec(arb_step(), 0..40)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Status only moves forward and never reaches the reserved terminal state
    #[test]
    fn prop_status_never_regresses(steps in arb_steps()) {
        for (before, after) in run(steps) {
            prop_assert!(after.session.status >= before.session.status);
            prop_assert_ne!(after.session.status, SessionStatus::Completed);
        }
    }

    /// Once flagged, a session stays a scam with the same persona
    #[test]
    fn prop_scam_flag_and_persona_are_sticky(steps in arb_steps()) {
        for (before, after) in run(steps) {
            if before.session.is_scam {
                prop_assert!(after.session.is_scam);
                prop_assert_eq!(&after.session.persona, &before.session.persona);
            }
            prop_assert_eq!(after.session.is_scam, after.session.status == SessionStatus::Engaging);
        }
    }

    /// History is append-only and every entry is either incoming or a reply
    #[test]
    fn prop_history_is_append_only(steps in arb_steps()) {
        for (before, after) in run(steps) {
            prop_assert!(after.session.messages.len() >= before.session.messages.len());
            prop_assert_eq!(
                &after.session.messages[..before.session.messages.len()],
                &before.session.messages[..]
            );
            let s = &after.session;
            prop_assert_eq!(
                s.messages.len(),
                s.count_role(MessageRole::Incoming) + s.count_role(MessageRole::Agent)
            );
            prop_assert!(s.count_role(MessageRole::Agent) <= s.count_role(MessageRole::Incoming));
        }
    }

    /// Extracted entries are never lost once recorded
    #[test]
    fn prop_intelligence_only_grows(steps in arb_steps()) {
        for (before, after) in run(steps) {
            let (b, a) = (&before.session.intelligence, &after.session.intelligence);
            for (old, new) in [
                (&b.upi_ids, &a.upi_ids),
                (&b.bank_accounts, &a.bank_accounts),
                (&b.phishing_urls, &a.phishing_urls),
                (&b.phone_numbers, &a.phone_numbers),
            ] {
                for entry in old {
                    prop_assert!(new.contains(entry), "lost {entry}");
                }
            }
        }
    }

    /// Outstanding call ids were issued and are never reused
    #[test]
    fn prop_call_ids_are_fresh(steps in arb_steps()) {
        for (before, after) in run(steps) {
            prop_assert!(after.next_call_id >= before.next_call_id);
            if let Some(id) = after.phase.call_id() {
                prop_assert!(id < after.next_call_id);
                if before.phase.call_id() != Some(id) {
                    prop_assert!(id >= before.next_call_id);
                }
            }
        }
    }

    /// A busy session refuses new messages
    #[test]
    fn prop_busy_rejects_messages(steps in arb_steps(), text in "[a-zA-Z]{1,20}") {
        for (_, state) in run(steps) {
            if state.phase.is_busy() {
                let result = transition(&state, Event::IncomingMessage {
                    id: "late".to_string(),
                    text: text.clone(),
                    at: t(99),
                });
                prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
            }
        }
    }

    /// Cancel frees a busy session without touching the session record
    #[test]
    fn prop_cancel_releases_without_side_effects(steps in arb_steps()) {
        for (_, state) in run(steps) {
            let result = transition(&state, Event::Cancel);
            if state.phase.is_busy() {
                let result = result.unwrap();
                prop_assert_eq!(result.new_state.phase, Phase::Ready);
                prop_assert_eq!(&result.new_state.session, &state.session);
                prop_assert!(result.effects.contains(&Effect::AbortCall));
            } else {
                prop_assert_eq!(result.unwrap_err(), TransitionError::NothingToCancel);
            }
        }
    }

    /// Completions for a call that was never issued are always refused
    #[test]
    fn prop_unknown_call_ids_rejected(steps in arb_steps(), result in arb_detection()) {
        for (_, state) in run(steps) {
            let err = transition(&state, Event::DetectionComplete {
                call_id: state.next_call_id + 100,
                result: result.clone(),
                at: t(99),
            });
            let is_stale = matches!(err, Err(TransitionError::StaleResponse { .. }));
            prop_assert!(is_stale);
        }
    }

    /// A blank message is refused in any phase
    #[test]
    fn prop_blank_messages_never_recorded(steps in arb_steps(), blank in "[ \t\n]{0,5}") {
        for (_, state) in run(steps) {
            let result = transition(&state, Event::IncomingMessage {
                id: "blank".to_string(),
                text: blank.clone(),
                at: t(99),
            });
            prop_assert!(result.is_err());
        }
    }
}
