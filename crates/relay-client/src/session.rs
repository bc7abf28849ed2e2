use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt as _;
use relay_harness::{ConversationTurn, Role, Utf8Decoder};
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::message::{DisplayMessage, MessageSink};
use crate::transport::GatewayClient;

/// Text shown in place of an answer when the gateway cannot be read.
pub const APOLOGY: &str = "Sorry, something went wrong. Please try again.";

/// Lifecycle of the current (or last) submission.
///
/// `Idle`, `Finalized` and `Errored` accept a new submission;
/// `Submitting` and `Streaming` do not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Streaming,
    Finalized,
    Errored,
}

impl SubmissionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting | Self::Streaming)
    }
}

/// How a call to `ChatSession::submit` ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing was sent.
    Ignored,
    /// The stream closed normally.
    Finalized { message_id: uuid::Uuid },
    /// The request or the stream failed; the apology is displayed.
    Errored { message_id: uuid::Uuid },
    /// The transcript was cleared while the answer was streaming.
    Abandoned,
}

struct SessionState {
    phase: SubmissionState,
    messages: Vec<DisplayMessage>,
    generation: u64,
}

struct Inner {
    client: GatewayClient,
    state: Mutex<SessionState>,
}

/// One conversation as seen by the user, with at most one submission in flight.
///
/// Cloning yields another handle to the same conversation.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    pub fn new(client: GatewayClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                state: Mutex::new(SessionState {
                    phase: SubmissionState::Idle,
                    messages: Vec::new(),
                    generation: 0,
                }),
            }),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.lock().phase
    }

    /// Snapshot of the transcript, oldest first.
    pub fn messages(&self) -> Vec<DisplayMessage> {
        self.lock().messages.clone()
    }

    /// Discards the transcript and frees the session for a new submission.
    ///
    /// A submission still streaming stops at its next chunk without touching
    /// the new transcript or the new submission's state.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.messages.clear();
        state.generation = state.generation.wrapping_add(1);
        state.phase = SubmissionState::Idle;
    }

    /// Sends `input` with the prior transcript and streams the answer into a
    /// new assistant message, notifying `sink` after every change.
    pub async fn submit(
        &self,
        input: &str,
        sink: &mut dyn MessageSink,
    ) -> Result<SubmitOutcome, ClientError> {
        let content = input.trim();
        if content.is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        let (generation, turns, user_message) = {
            let mut state = self.lock();
            if state.phase.is_in_flight() {
                return Err(ClientError::Busy);
            }
            state.phase = SubmissionState::Submitting;
            let user_message = DisplayMessage::finalized(Role::User, content);
            state.messages.push(user_message.clone());
            let turns: Vec<ConversationTurn> =
                state.messages.iter().map(DisplayMessage::to_turn).collect();
            (state.generation, turns, user_message)
        };
        let mut flight = InFlight {
            session: self,
            generation,
            settled: false,
        };
        sink.render(&user_message);

        let response = match self.inner.client.send(&turns).await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = %response.status(), "gateway rejected submission");
                return Ok(self.fail_before_stream(generation, &mut flight, sink));
            }
            Err(e) => {
                warn!(error = %e, "gateway request failed");
                return Ok(self.fail_before_stream(generation, &mut flight, sink));
            }
        };

        let placeholder = DisplayMessage::open(Role::Assistant);
        let message_id = placeholder.id();
        {
            let mut state = self.lock();
            if state.generation != generation {
                return Ok(SubmitOutcome::Abandoned);
            }
            state.phase = SubmissionState::Streaming;
            state.messages.push(placeholder.clone());
        }
        sink.render(&placeholder);

        let mut decoder = Utf8Decoder::new();
        let mut body = response.bytes_stream();
        loop {
            match body.next().await {
                Some(Ok(chunk)) => {
                    let text = decoder.decode(&chunk);
                    if text.is_empty() {
                        continue;
                    }
                    match self.update_message(generation, message_id, |m| {
                        m.append(&text);
                    }) {
                        Some(snapshot) => sink.render(&snapshot),
                        None => return Ok(SubmitOutcome::Abandoned),
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "gateway stream failed mid-answer");
                    let Some(snapshot) = self.update_message(generation, message_id, |m| {
                        m.replace_and_finalize(APOLOGY);
                    }) else {
                        return Ok(SubmitOutcome::Abandoned);
                    };
                    sink.render(&snapshot);
                    flight.settle(SubmissionState::Errored);
                    return Ok(SubmitOutcome::Errored { message_id });
                }
                None => {
                    let tail = decoder.finish();
                    let Some(snapshot) = self.update_message(generation, message_id, |m| {
                        m.append(&tail);
                        m.finalize();
                    }) else {
                        return Ok(SubmitOutcome::Abandoned);
                    };
                    debug!(chars = snapshot.content().chars().count(), "answer finalized");
                    sink.render(&snapshot);
                    flight.settle(SubmissionState::Finalized);
                    return Ok(SubmitOutcome::Finalized { message_id });
                }
            }
        }
    }

    fn fail_before_stream(
        &self,
        generation: u64,
        flight: &mut InFlight<'_>,
        sink: &mut dyn MessageSink,
    ) -> SubmitOutcome {
        let apology = DisplayMessage::finalized(Role::Assistant, APOLOGY);
        {
            let mut state = self.lock();
            if state.generation != generation {
                return SubmitOutcome::Abandoned;
            }
            state.messages.push(apology.clone());
        }
        sink.render(&apology);
        flight.settle(SubmissionState::Errored);
        SubmitOutcome::Errored {
            message_id: apology.id(),
        }
    }

    /// Applies `f` to an open message of the current generation and returns
    /// a snapshot, or `None` when the message has been discarded.
    fn update_message(
        &self,
        generation: u64,
        id: uuid::Uuid,
        f: impl FnOnce(&mut DisplayMessage),
    ) -> Option<DisplayMessage> {
        let mut state = self.lock();
        if state.generation != generation {
            return None;
        }
        let message = state.messages.iter_mut().find(|m| m.id() == id)?;
        f(message);
        Some(message.clone())
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the single-flight slot even when the submission future is dropped.
///
/// After a `clear` the slot belongs to the next generation, so a stale guard
/// leaves the state alone.
struct InFlight<'a> {
    session: &'a ChatSession,
    generation: u64,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, phase: SubmissionState) {
        let mut state = self.session.lock();
        if state.generation == self.generation {
            state.phase = phase;
        }
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.session.lock();
        if state.generation != self.generation {
            return;
        }
        state.phase = SubmissionState::Idle;
        for message in state.messages.iter_mut() {
            message.finalize();
        }
    }
}
