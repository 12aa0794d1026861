//! The Conference Coordinator: bridges a caller Session and an owner
//! Session together after a transfer, consulting a [`Gatekeeper`] on
//! every turn and fanning one shared generation's speech to both
//! egress legs.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::conversation::{Conversation, Speaker};
use crate::gatekeeper::{Advisor, Gatekeeper};
use crate::llm::{message, LanguageService, LlmEvent};
use crate::session::registry::SessionRegistry;
use crate::speech::{TtsAdapter, TtsEvent};

const HISTORY_WINDOW: usize = 64;

/// Upper bound on draining the shared TTS adapter for one turn. A
/// shared adapter that never emits `Flushed`/`Close`/`Error` would
/// otherwise hang this coordinator forever while holding the lock
/// every subsequent turn needs too.
const SHARED_TTS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds a fresh TTS adapter the first time the conference needs one.
/// Both legs share a single synthesized voice rather than each Session
/// running its own, since a conference reply is heard by both parties.
pub type TtsFactory = Arc<dyn Fn() -> Box<dyn TtsAdapter> + Send + Sync>;

/// Pairs two Sessions — caller and owner — registered under the given
/// ids, and runs the shared AI turn-taking logic between them.
pub struct ConferenceCoordinator<A: Advisor> {
    caller_id: String,
    owner_id: String,
    registry: Arc<SessionRegistry>,
    gatekeeper: Gatekeeper<A>,
    llm: Arc<dyn LanguageService>,
    tts_factory: TtsFactory,
    shared_tts: AsyncMutex<Option<Box<dyn TtsAdapter>>>,
    conversation: AsyncMutex<Conversation>,
}

impl<A: Advisor> ConferenceCoordinator<A> {
    pub fn new(
        caller_id: String,
        owner_id: String,
        registry: Arc<SessionRegistry>,
        advisor: A,
        gatekeeper_timeout: std::time::Duration,
        llm: Arc<dyn LanguageService>,
        tts_factory: TtsFactory,
    ) -> Self {
        let mut conversation = Conversation::new();
        conversation.set_conference_mode(true);
        Self {
            caller_id,
            owner_id,
            registry,
            gatekeeper: Gatekeeper::new(advisor, gatekeeper_timeout),
            llm,
            tts_factory,
            shared_tts: AsyncMutex::new(None),
            conversation: AsyncMutex::new(conversation),
        }
    }

    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn speaker_for(&self, from_session_id: &str) -> Speaker {
        if from_session_id == self.caller_id {
            Speaker::Caller
        } else {
            Speaker::Owner
        }
    }

    fn other_of(&self, from_session_id: &str) -> &str {
        if from_session_id == self.caller_id {
            &self.owner_id
        } else {
            &self.caller_id
        }
    }

    /// Bridge one party's raw inbound audio straight to the other
    /// party's outbound stream, bypassing AI audio gating entirely.
    /// This is how the two humans actually hear each other.
    pub async fn route_raw_audio(&self, from_session_id: &str, frame: &[u8]) {
        let target_id = self.other_of(from_session_id).to_string();
        let Some(target) = self.registry.get(&target_id) else {
            warn!(target_id, "conference peer not found; dropping bridged audio");
            return;
        };
        let target = target.lock().await;
        target.relay_raw_frame(frame);
    }

    /// Handle a finalized transcript from either party: append it to
    /// the shared conversation, consult the gatekeeper, and if it
    /// advises a response, run one shared generation.
    pub async fn on_transcript(&self, from_session_id: &str, text: &str) {
        let speaker = self.speaker_for(from_session_id);
        let (snapshot, last_speaker) = {
            let mut conv = self.conversation.lock().await;
            conv.append_user(text, Some(speaker));
            (conv.snapshot(HISTORY_WINDOW), conv.last_speaker())
        };
        let verdict = self.gatekeeper.consult(&snapshot, last_speaker).await;
        if !verdict.respond {
            info!(reason = %verdict.reason, confidence = verdict.confidence, "gatekeeper declined to respond");
            return;
        }
        self.run_generation(snapshot).await;
    }

    async fn run_generation(&self, snapshot: Vec<crate::conversation::Message>) {
        let wire_messages = message::from_conversation(&snapshot);
        let cancel = CancellationToken::new();
        let stream = match self.llm.stream(&wire_messages, &[], cancel).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "conference generation failed to start");
                return;
            }
        };
        tokio::pin!(stream);

        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event {
                LlmEvent::TextDelta { text: delta, .. } => text.push_str(&delta),
                LlmEvent::Finish { .. } | LlmEvent::Error { .. } | LlmEvent::Abort => break,
                _ => {}
            }
        }
        if text.is_empty() {
            return;
        }
        {
            let mut conv = self.conversation.lock().await;
            conv.start_assistant();
            conv.extend_assistant(&text);
            conv.finish_assistant();
        }
        self.speak_to_both(&text).await;
    }

    async fn speak_to_both(&self, text: &str) {
        let mut guard = self.shared_tts.lock().await;
        if guard.is_none() {
            *guard = Some((self.tts_factory)());
        }
        let tts = guard.as_mut().expect("inserted above if empty");

        if let Err(err) = tts.send_text(text).await {
            warn!(error = %err, "shared tts rejected text");
            return;
        }
        if let Err(err) = tts.flush().await {
            warn!(error = %err, "shared tts flush failed");
            return;
        }
        let drain = async {
            loop {
                match tts.next_event().await {
                    Some(TtsEvent::Audio(bytes)) => self.relay_to_both(&bytes).await,
                    Some(TtsEvent::Flushed) => break,
                    Some(TtsEvent::Error(cause)) => {
                        warn!(cause, "shared tts reported an error");
                        break;
                    }
                    Some(TtsEvent::Close) | None => break,
                    Some(TtsEvent::Open) => {}
                }
            }
        };
        if tokio::time::timeout(SHARED_TTS_DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("shared tts drain timed out; forcing turn to end");
        }
    }

    async fn relay_to_both(&self, frame: &[u8]) {
        for id in [self.caller_id.as_str(), self.owner_id.as_str()] {
            if let Some(session) = self.registry.get(id) {
                session.lock().await.relay_raw_frame(frame);
            }
        }
    }

    /// The peer leg has disconnected: revert the remaining Session to
    /// solo operation and drop the shared TTS adapter.
    pub async fn on_peer_disconnected(&self, disconnected_id: &str) {
        let remaining_id = self.other_of(disconnected_id).to_string();
        if let Some(remaining) = self.registry.get(&remaining_id) {
            remaining.lock().await.leave_conference();
            info!(remaining_id, "conference peer disconnected; reverted to solo mode");
        }
        self.cleanup().await;
    }

    /// Tear down the shared TTS adapter. Idempotent.
    pub async fn cleanup(&self) {
        let mut guard = self.shared_tts.lock().await;
        if let Some(mut tts) = guard.take() {
            tts.close().await;
        }
    }
}
