//! Runtime for a single honey-pot session
//!
//! The runtime task is the only writer of the session. The presentation
//! layer talks to it through a [`SessionHandle`]: submissions go in over a
//! channel and immutable [`SessionView`] snapshots come back over a watch.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::oracle::Analyst;
use crate::state_machine::{Event, HoneyPotSession, Phase, SessionStats};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Pending operator events; a full queue means the runtime is behind.
const EVENT_QUEUE_DEPTH: usize = 16;

/// Snapshot published after every change
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub session: HoneyPotSession,
    pub phase: Phase,
    /// True while an oracle call is outstanding; input must stay disabled
    pub busy: bool,
    pub stats: SessionStats,
    /// Why the last submission was refused, if it was
    pub notice: Option<String>,
}

impl SessionView {
    pub fn new(session: HoneyPotSession, phase: Phase, notice: Option<String>) -> Self {
        Self {
            stats: session.stats(),
            busy: phase.is_busy(),
            session,
            phase,
            notice,
        }
    }
}

/// Why a submission was refused at the handle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Message text is empty")]
    Empty,
    #[error("Agent is busy, wait for the current step to finish")]
    Busy,
    #[error("Session runtime has stopped")]
    Closed,
}

/// Presentation-side handle to the running session
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    view_rx: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Queue an incoming scammer message.
    ///
    /// Refused while a previous message is still being processed.
    pub fn submit_incoming_message(&self, text: &str) -> Result<(), SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.view_rx.borrow().busy {
            return Err(SubmitError::Busy);
        }
        self.send(Event::incoming(text))
    }

    /// Abort the in-flight oracle call, if any
    pub fn cancel(&self) -> Result<(), SubmitError> {
        self.send(Event::Cancel)
    }

    /// Latest snapshot
    pub fn current_session(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }

    fn send(&self, event: Event) -> Result<(), SubmitError> {
        self.event_tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::Busy,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}

/// Spawn the runtime for a fresh session and return its handle.
///
/// The runtime stops once every handle has been dropped.
pub fn start_session<A: Analyst + 'static>(analyst: A) -> SessionHandle {
    let session = HoneyPotSession::new(uuid::Uuid::new_v4().to_string(), Utc::now());
    start_with_session(session, analyst)
}

pub fn start_with_session<A: Analyst + 'static>(
    session: HoneyPotSession,
    analyst: A,
) -> SessionHandle {
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let (view_tx, view_rx) = watch::channel(SessionView::new(session.clone(), Phase::Ready, None));

    let runtime = SessionRuntime::new(session, analyst, event_rx, view_tx);
    tokio::spawn(runtime.run());

    SessionHandle { event_tx, view_rx }
}
