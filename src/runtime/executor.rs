//! Session runtime executor

use super::SessionView;
use crate::oracle::Analyst;
use crate::state_machine::{
    transition, Effect, Event, HoneyPotSession, SessionState, TransitionError,
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Completions from oracle tasks; one call is outstanding at a time.
const COMPLETION_QUEUE_DEPTH: usize = 4;

/// Owns the session state and executes the effects of each transition
pub struct SessionRuntime<A: Analyst + 'static> {
    state: SessionState,
    analyst: Arc<A>,
    /// Operator events; closes when every handle is dropped
    event_rx: mpsc::Receiver<Event>,
    /// Oracle completions from spawned calls
    completion_tx: mpsc::Sender<Event>,
    completion_rx: mpsc::Receiver<Event>,
    view_tx: watch::Sender<SessionView>,
    /// Token to cancel the running oracle call
    call_cancel_token: Option<CancellationToken>,
    notice: Option<String>,
}

impl<A: Analyst + 'static> SessionRuntime<A> {
    pub fn new(
        session: HoneyPotSession,
        analyst: A,
        event_rx: mpsc::Receiver<Event>,
        view_tx: watch::Sender<SessionView>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_QUEUE_DEPTH);
        Self {
            state: SessionState::new(session),
            analyst: Arc::new(analyst),
            event_rx,
            completion_tx,
            completion_rx,
            view_tx,
            call_cancel_token: None,
            notice: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.state.session.id, "Starting session runtime");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event),
                    None => break,
                },
                Some(event) = self.completion_rx.recv() => self.process_event(event),
            }
        }

        if let Some(token) = self.call_cancel_token.take() {
            token.cancel();
        }
        tracing::info!(session_id = %self.state.session.id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let event_name = event.name();

        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(e @ (TransitionError::StaleResponse { .. } | TransitionError::NothingToCancel)) => {
                tracing::debug!(event = event_name, reason = %e, "Event ignored");
                return;
            }
            Err(e) => {
                // Refused submissions are shown to the operator, nothing else changes
                tracing::warn!(event = event_name, error = %e, "Event rejected");
                self.notice = Some(e.to_string());
                self.publish();
                return;
            }
        };

        let old_status = self.state.session.status;
        self.state = result.new_state;
        self.notice = None;

        if old_status != self.state.session.status {
            tracing::info!(
                session_id = %self.state.session.id,
                from = old_status.as_str(),
                to = self.state.session.status.as_str(),
                persona = %self.state.session.persona,
                "Session status changed"
            );
        }
        tracing::debug!(
            event = event_name,
            phase = self.state.phase.describe(),
            call_id = ?self.state.phase.call_id(),
            messages = self.state.session.messages.len(),
            "Transition applied"
        );

        debug_assert!(
            result.effects.iter().filter(|e| e.is_oracle_request()).count() <= 1,
            "one oracle call at a time"
        );

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestDetection { call_id } => {
                let analyst = Arc::clone(&self.analyst);
                let history = self.state.session.messages.clone();
                self.spawn_call(call_id, async move {
                    let outcome = analyst.detect(&history).await;
                    if outcome.is_fallback() {
                        tracing::warn!(call_id, "Detection unavailable, treating as not a scam");
                    }
                    tracing::debug!(call_id, is_scam = outcome.value().is_scam, "Detection returned");
                    Event::DetectionComplete {
                        call_id,
                        result: outcome.into_inner(),
                        at: Utc::now(),
                    }
                });
            }

            Effect::RequestReply { call_id, persona } => {
                let analyst = Arc::clone(&self.analyst);
                let history = self.state.session.messages.clone();
                self.spawn_call(call_id, async move {
                    let outcome = analyst.respond(&history, &persona).await;
                    if outcome.is_fallback() {
                        tracing::warn!(call_id, persona = %persona, "Using fallback agent reply");
                    }
                    Event::AgentReply {
                        call_id,
                        id: uuid::Uuid::new_v4().to_string(),
                        text: outcome.into_inner(),
                        at: Utc::now(),
                    }
                });
            }

            Effect::RequestExtraction { call_id } => {
                let analyst = Arc::clone(&self.analyst);
                let history = self.state.session.messages.clone();
                self.spawn_call(call_id, async move {
                    let outcome = analyst.extract(&history).await;
                    if outcome.is_fallback() {
                        tracing::warn!(call_id, "Extraction unavailable, intelligence left as is");
                    }
                    Event::ExtractionComplete {
                        call_id,
                        outcome,
                        at: Utc::now(),
                    }
                });
            }

            Effect::AbortCall => {
                if let Some(token) = self.call_cancel_token.take() {
                    token.cancel();
                }
            }

            Effect::PublishSnapshot => self.publish(),
        }
    }

    /// Run an oracle call in the background, racing it against cancellation
    fn spawn_call<F>(&mut self, call_id: u64, call: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.call_cancel_token.replace(token.clone()) {
            previous.cancel();
        }

        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    tracing::info!(call_id, "Oracle call cancelled");
                }

                event = call => {
                    let _ = completion_tx.send(event).await;
                }
            }
        });
    }

    fn publish(&self) {
        self.view_tx.send_replace(SessionView::new(
            self.state.session.clone(),
            self.state.phase,
            self.notice.clone(),
        ));
    }
}
