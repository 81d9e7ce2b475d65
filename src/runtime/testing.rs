//! Mock analyst and integration tests for the session runtime
//!
//! The mock replaces the remote oracle so the whole runtime can be driven
//! without network I/O.

use crate::intelligence::ScamIntelligence;
use crate::oracle::{Analysis, Analyst, DetectionResult, ERROR_REPLY_FALLBACK};
use crate::state_machine::Message;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One oracle call as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Detect { history_len: usize },
    Respond { history_len: usize, persona: String },
    Extract { history_len: usize },
}

// ============================================================================
// Mock Analyst
// ============================================================================

/// Analyst returning queued outcomes; an empty queue yields the fallback
#[derive(Default)]
pub struct MockAnalyst {
    detections: Mutex<VecDeque<Analysis<DetectionResult>>>,
    replies: Mutex<VecDeque<Analysis<String>>>,
    extractions: Mutex<VecDeque<Analysis<ScamIntelligence>>>,
    delay: Option<Duration>,
    /// Signalled when any call starts
    pub call_started: Arc<Notify>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockAnalyst {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_detection(&self, result: DetectionResult) {
        self.detections
            .lock()
            .unwrap()
            .push_back(Analysis::Answered(result));
    }

    pub fn queue_reply(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Analysis::Answered(text.to_string()));
    }

    pub fn queue_extraction(&self, found: ScamIntelligence) {
        self.extractions
            .lock()
            .unwrap()
            .push_back(Analysis::Answered(found));
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn begin(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
        self.call_started.notify_one();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Analyst for MockAnalyst {
    async fn detect(&self, history: &[Message]) -> Analysis<DetectionResult> {
        self.begin(RecordedCall::Detect {
            history_len: history.len(),
        })
        .await;
        self.detections
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Analysis::Fallback(DetectionResult::fallback()))
    }

    async fn respond(&self, history: &[Message], persona: &str) -> Analysis<String> {
        self.begin(RecordedCall::Respond {
            history_len: history.len(),
            persona: persona.to_string(),
        })
        .await;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Analysis::Fallback(ERROR_REPLY_FALLBACK.to_string()))
    }

    async fn extract(&self, history: &[Message]) -> Analysis<ScamIntelligence> {
        self.begin(RecordedCall::Extract {
            history_len: history.len(),
        })
        .await;
        self.extractions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Analysis::Fallback(ScamIntelligence::unknown()))
    }
}

// ============================================================================
// Tests
// ============================================================================

mod tests {
    use super::*;
    use crate::runtime::{start_session, start_with_session, SessionView, SubmitError};
    use crate::state_machine::{HoneyPotSession, MessageRole, Phase, SessionStatus};
    use chrono::Utc;
    use tokio::sync::watch;

    async fn wait_for(
        rx: &mut watch::Receiver<SessionView>,
        predicate: impl FnMut(&SessionView) -> bool,
    ) -> SessionView {
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .expect("view should reach the expected state")
            .expect("runtime should be running")
            .clone()
    }

    fn scam(persona: &str) -> DetectionResult {
        DetectionResult {
            is_scam: true,
            confidence: 0.96,
            reason: "advance fee".to_string(),
            suggested_persona: persona.to_string(),
        }
    }

    fn upi(ids: &[&str]) -> ScamIntelligence {
        ScamIntelligence {
            upi_ids: ids.iter().map(ToString::to_string).collect(),
            scam_type: "Lottery".to_string(),
            ..Default::default()
        }
    }

    fn engaged_session(persona: &str, intelligence: ScamIntelligence) -> HoneyPotSession {
        let mut session = HoneyPotSession::new("engaged", Utc::now());
        session.status = SessionStatus::Engaging;
        session.is_scam = true;
        session.confidence = 0.9;
        session.persona = persona.to_string();
        session.intelligence = intelligence;
        session
    }

    #[tokio::test]
    async fn test_initial_view_is_idle() {
        let handle = start_session(MockAnalyst::new());
        let view = handle.current_session();
        assert_eq!(view.session.status, SessionStatus::Idle);
        assert!(!view.busy);
        assert!(view.session.messages.is_empty());
        assert_eq!(view.stats.messages_intercepted, 0);
    }

    #[tokio::test]
    async fn test_benign_message_keeps_monitoring() {
        let analyst = Arc::new(MockAnalyst::new());
        analyst.queue_detection(DetectionResult::default());
        let handle = start_session(analyst.clone());
        let mut rx = handle.subscribe();

        handle.submit_incoming_message("Hi, is this Ravi?").unwrap();
        let view = wait_for(&mut rx, |v| v.session.messages.len() == 1 && !v.busy).await;

        assert_eq!(view.session.status, SessionStatus::Detecting);
        assert!(!view.session.is_scam);
        assert!(view.session.persona.is_empty());
        assert_eq!(view.stats.agent_replies, 0);
        assert_eq!(
            analyst.recorded_calls(),
            vec![RecordedCall::Detect { history_len: 1 }]
        );
    }

    #[tokio::test]
    async fn test_scam_detection_engages_persona() {
        let analyst = Arc::new(MockAnalyst::new());
        analyst.queue_detection(scam("Naive retiree"));
        analyst.queue_reply("Oh my, what do I need to do to claim it?");
        let handle = start_session(analyst.clone());
        let mut rx = handle.subscribe();

        handle
            .submit_incoming_message("Congratulations! You won 25 lakh in the KBC lottery.")
            .unwrap();
        let view = wait_for(&mut rx, |v| v.session.messages.len() == 2 && !v.busy).await;

        let session = &view.session;
        assert_eq!(session.status, SessionStatus::Engaging);
        assert!(session.is_scam);
        assert_eq!(session.persona, "Naive retiree");
        assert_eq!(session.messages[0].role, MessageRole::Incoming);
        assert_eq!(session.messages[1].role, MessageRole::Agent);
        assert_eq!(
            session.messages[1].text,
            "Oh my, what do I need to do to claim it?"
        );
        assert!(view.stats.engaged);
        assert_eq!(
            analyst.recorded_calls(),
            vec![
                RecordedCall::Detect { history_len: 1 },
                RecordedCall::Respond {
                    history_len: 1,
                    persona: "Naive retiree".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_engaged_messages_extract_and_dedupe() {
        let analyst = Arc::new(MockAnalyst::new());
        analyst.queue_detection(scam("Eager young professional"));
        analyst.queue_reply("Sounds great, how do I start?");
        analyst.queue_reply("Which UPI should I use?");
        analyst.queue_reply("Done? Is there another ID?");
        analyst.queue_extraction(upi(&["a@b"]));
        analyst.queue_extraction(upi(&["a@b", "c@d"]));
        let handle = start_session(analyst.clone());
        let mut rx = handle.subscribe();

        handle
            .submit_incoming_message("Work from home, earn 5000 daily!")
            .unwrap();
        wait_for(&mut rx, |v| v.session.messages.len() == 2 && !v.busy).await;

        handle
            .submit_incoming_message("Pay registration fee to a@b")
            .unwrap();
        let view = wait_for(&mut rx, |v| v.session.messages.len() == 4 && !v.busy).await;
        assert_eq!(view.session.intelligence.upi_ids, vec!["a@b".to_string()]);

        handle
            .submit_incoming_message("Or use c@d, same thing")
            .unwrap();
        let view = wait_for(&mut rx, |v| v.session.messages.len() == 6 && !v.busy).await;
        assert_eq!(
            view.session.intelligence.upi_ids,
            vec!["a@b".to_string(), "c@d".to_string()]
        );
        assert_eq!(view.session.intelligence.scam_type, "Lottery");
        assert_eq!(view.stats.messages_intercepted, 3);
        assert_eq!(view.stats.agent_replies, 3);
        assert_eq!(view.stats.intel_points, 2);

        // Engaged sessions are never re-classified; extraction sees the reply
        let calls = analyst.recorded_calls();
        assert_eq!(
            calls
                .iter()
                .filter(|c| matches!(c, RecordedCall::Detect { .. }))
                .count(),
            1
        );
        assert!(calls.contains(&RecordedCall::Extract { history_len: 4 }));
        assert!(calls.contains(&RecordedCall::Extract { history_len: 6 }));
    }

    #[tokio::test]
    async fn test_fallbacks_do_not_erase_intelligence() {
        let known = upi(&["prize@ybl"]);
        let analyst = Arc::new(MockAnalyst::new());
        let handle =
            start_with_session(engaged_session("Concerned parent", known.clone()), analyst);
        let mut rx = handle.subscribe();

        handle.submit_incoming_message("Send OTP now").unwrap();
        let view = wait_for(&mut rx, |v| v.session.messages.len() == 2 && !v.busy).await;

        // Failed reply still produces the fixed fallback line
        assert_eq!(view.session.messages[1].text, ERROR_REPLY_FALLBACK);
        // Failed extraction leaves what was already known
        assert_eq!(view.session.intelligence, known);
        assert_eq!(view.session.status, SessionStatus::Engaging);
    }

    #[tokio::test]
    async fn test_detection_fallback_is_not_a_scam() {
        let handle = start_session(MockAnalyst::new());
        let mut rx = handle.subscribe();

        handle.submit_incoming_message("Your parcel is held").unwrap();
        let view = wait_for(&mut rx, |v| v.session.messages.len() == 1 && !v.busy).await;
        assert_eq!(view.session.status, SessionStatus::Detecting);
        assert!(!view.session.is_scam);
    }

    #[tokio::test]
    async fn test_submission_refused_while_busy() {
        let analyst = MockAnalyst::new().with_delay(Duration::from_secs(5));
        let handle = start_session(analyst);
        let mut rx = handle.subscribe();

        handle.submit_incoming_message("first").unwrap();
        wait_for(&mut rx, |v| v.busy).await;

        assert_eq!(
            handle.submit_incoming_message("second"),
            Err(SubmitError::Busy)
        );
        assert_eq!(handle.submit_incoming_message("  "), Err(SubmitError::Empty));
        assert_eq!(handle.current_session().session.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_racing_submission_rejected_by_runtime() {
        let analyst = MockAnalyst::new().with_delay(Duration::from_secs(5));
        let handle = start_session(analyst);
        let mut rx = handle.subscribe();

        // Both pass the handle check before the runtime has processed either
        handle.submit_incoming_message("first").unwrap();
        handle.submit_incoming_message("second").unwrap();

        let view = wait_for(&mut rx, |v| v.notice.is_some()).await;
        assert_eq!(view.session.messages.len(), 1);
        assert_eq!(view.session.messages[0].text, "first");
        assert!(view.busy);
    }

    #[tokio::test]
    async fn test_cancel_during_detection() {
        let analyst = Arc::new(MockAnalyst::new().with_delay(Duration::from_secs(5)));
        let call_started = analyst.call_started.clone();
        let handle = start_session(analyst.clone());
        let mut rx = handle.subscribe();

        let start = tokio::time::Instant::now();
        handle.submit_incoming_message("Click this link").unwrap();
        tokio::time::timeout(Duration::from_secs(1), call_started.notified())
            .await
            .expect("detection should start");

        handle.cancel().unwrap();
        let view = wait_for(&mut rx, |v| v.session.messages.len() == 1 && !v.busy).await;

        assert!(
            start.elapsed() < Duration::from_secs(2),
            "Cancellation should not wait for the oracle"
        );
        assert_eq!(view.phase, Phase::Ready);
        assert_eq!(view.session.status, SessionStatus::Detecting);
        assert!(view.session.persona.is_empty());

        // The session accepts the next message with a fresh call
        handle.submit_incoming_message("Hello?").unwrap();
        let view = wait_for(&mut rx, |v| v.session.messages.len() == 2).await;
        assert_eq!(view.phase, Phase::AwaitingDetection { call_id: 2 });
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_harmless() {
        let handle = start_session(MockAnalyst::new());
        handle.cancel().unwrap();
        tokio::task::yield_now().await;
        let view = handle.current_session();
        assert!(!view.busy);
        assert!(view.notice.is_none());
    }
}
