//! The Session Orchestrator: the per-call coordinator owning call state,
//! the audio gate, the conversation log, speech adapters, and the
//! per-generation LLM cancellation scope.
//!
//! Session methods are driven by a single external dispatcher (the
//! telephony WebSocket handler) that serializes access through the
//! registry's `SharedSession` lock — see the registry module docs for
//! the concurrency model this relies on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::conversation::{Conversation, Part, ToolResultEntry};
use crate::error::CoreError;
use crate::llm::message;
use crate::llm::{DriverOutcome, FinishReason, LanguageService, LlmEvent, ToolDefinition, ToolExecutor};
use crate::speech::{SttAdapter, TtsAdapter};
use crate::state::{State, StateMachine};
use crate::telephony::{ControlPlane, UplinkFrame};

/// Which leg of a call a Session represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Not part of a conference.
    Solo,
    Caller,
    Owner,
}

/// Sends frames back over the telephony stream this Session owns. Must
/// not block: this is called from the hot audio-egress path.
pub trait TelephonyTransport: Send + Sync {
    fn send(&self, frame: UplinkFrame);
}

/// Adapter handles installed for a Session, or swapped in wholesale on
/// reconnection (§4.8 reconnection semantics: conversation, state, and
/// speaker bindings survive; only these handles are replaced).
pub struct SessionHandles {
    pub stt: Box<dyn SttAdapter>,
    pub tts: Box<dyn TtsAdapter>,
    pub transport: Arc<dyn TelephonyTransport>,
}

/// Upper bound on waiting for a `flushed` TTS event before the
/// orchestrator forces LISTENING itself, so a wedged TTS adapter cannot
/// strand a Session in SPEAKING forever.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `transfer_to_human` waits after the verbatim announcement
/// before asking the control plane to bridge the conference, giving the
/// TTS a moment to actually finish playing out.
const TRANSFER_SETTLE: Duration = Duration::from_millis(3_500);

/// Messages handed to the language service per generation round.
const HISTORY_WINDOW: usize = 64;

/// Upper bound on tool-call round trips within one response generation,
/// guarding against a misbehaving language service looping forever.
const MAX_TOOL_ROUNDS: usize = 8;

/// The per-call coordinator: state machine, audio gate, conversation
/// log, speech adapters, and the generation-scoped cancellation token.
pub struct Session {
    pub id: String,
    pub call_id: String,
    pub role: SessionRole,
    state: StateMachine,
    conversation: Conversation,
    gate: Arc<crate::audio_gate::AudioGate>,
    stt: Box<dyn SttAdapter>,
    tts: Box<dyn TtsAdapter>,
    transport: Arc<dyn TelephonyTransport>,
    llm: Arc<dyn LanguageService>,
    tool_defs: Vec<ToolDefinition>,
    tool_executor: Arc<dyn ToolExecutor>,
    control_plane: Option<Arc<dyn ControlPlane>>,
    owner_phone: Option<String>,
    public_base_url: Option<String>,
    appointment_id: Option<String>,
    conference_id: Option<String>,
    call_outcome: Option<(crate::appointment::AppointmentStatus, Option<String>)>,
    root_cancel: CancellationToken,
    generation_cancel: Option<CancellationToken>,
    flush_deadline: Option<Instant>,
    hung_up: bool,
    interruption_detector: crate::interruption::InterruptionDetector,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        call_id: impl Into<String>,
        role: SessionRole,
        handles: SessionHandles,
        llm: Arc<dyn LanguageService>,
        tool_defs: Vec<ToolDefinition>,
        tool_executor: Arc<dyn ToolExecutor>,
        control_plane: Option<Arc<dyn ControlPlane>>,
        owner_phone: Option<String>,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_id: call_id.into(),
            role,
            state: StateMachine::new(),
            conversation: Conversation::new(),
            gate: Arc::new(crate::audio_gate::AudioGate::new()),
            stt: handles.stt,
            tts: handles.tts,
            transport: handles.transport,
            llm,
            tool_defs,
            tool_executor,
            control_plane,
            owner_phone,
            public_base_url,
            appointment_id: None,
            conference_id: None,
            call_outcome: None,
            root_cancel: CancellationToken::new(),
            generation_cancel: None,
            flush_deadline: None,
            hung_up: false,
            interruption_detector: crate::interruption::InterruptionDetector::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state.current()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn appointment_id(&self) -> Option<&str> {
        self.appointment_id.as_deref()
    }

    pub fn set_appointment_id(&mut self, id: Option<String>) {
        self.appointment_id = id;
    }

    pub fn conference_id(&self) -> Option<&str> {
        self.conference_id.as_deref()
    }

    /// Whether the audio gate currently permits synthesized frames to
    /// egress. [`Self::relay_raw_frame`] ignores this entirely.
    pub fn gate_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    /// Force the audio gate shut, e.g. to exercise the raw-frame bypass
    /// path independent of gate state.
    pub fn disable_gate(&self) {
        self.gate.disable();
    }

    pub fn call_outcome(&self) -> Option<&(crate::appointment::AppointmentStatus, Option<String>)> {
        self.call_outcome.as_ref()
    }

    /// Record the final disposition of the call this Session carries,
    /// e.g. from `hangUpCall`'s `status`/`notes` arguments.
    pub fn record_call_outcome(&mut self, status: crate::appointment::AppointmentStatus, notes: Option<String>) {
        self.call_outcome = Some((status, notes));
    }

    pub fn set_conference_mode(&mut self, enabled: bool) {
        self.conversation.set_conference_mode(enabled);
    }

    /// Bind this Session into a conference and switch its conversation
    /// to speaker-prefixed mode. Called by the coordinator once both
    /// legs are paired.
    pub fn enter_conference(&mut self, conference_id: String) {
        self.conference_id = Some(conference_id);
        self.conversation.set_conference_mode(true);
    }

    /// Unbind from a conference, reverting to solo operation. Called
    /// when the peer leg disconnects.
    pub fn leave_conference(&mut self) {
        self.conference_id = None;
        self.conversation.set_conference_mode(false);
    }

    /// Swap in new adapter handles, e.g. on reconnection. Conversation,
    /// state, and speaker bindings are untouched.
    pub fn swap_adapters(&mut self, handles: SessionHandles) {
        self.stt = handles.stt;
        self.tts = handles.tts;
        self.transport = handles.transport;
        info!(session_id = %self.id, "adapter handles swapped on reconnection");
    }

    /// First transition out of IDLE once the telephony stream's `start`
    /// frame has been processed.
    pub fn init(&mut self) -> bool {
        self.state.attempt(State::Listening, "session initialized")
    }

    /// Forward one inbound μ-law frame to the STT adapter. While
    /// SPEAKING, also runs the raw-audio interruption fallback (§9):
    /// the authoritative barge-in path is a transcript arriving from
    /// the STT adapter, but this catches activity well before
    /// endpointing would deliver one.
    pub async fn on_inbound_frame(&mut self, frame: &[u8]) {
        self.check_flush_timeout();
        if self.state.current() == State::Speaking && self.interruption_detector.should_interrupt(frame) {
            self.handle_interruption("raw audio activity detected while speaking").await;
        }
        if let Err(err) = self.stt.send_frame(frame).await {
            warn!(session_id = %self.id, error = %err, "stt adapter rejected frame");
        }
    }

    /// A joined final transcript is ready. `speaker_id` is the raw
    /// diarization id, if diarization is enabled upstream.
    pub async fn on_transcript(&mut self, text: &str, speaker_id: Option<String>) {
        self.check_flush_timeout();
        match self.state.current() {
            State::Speaking => {
                self.handle_interruption("user transcript while speaking").await;
                self.begin_generation(text, speaker_id).await;
            }
            State::Listening => {
                self.begin_generation(text, speaker_id).await;
            }
            other => {
                warn!(session_id = %self.id, state = %other, "transcript dropped: session not accepting input");
            }
        }
    }

    /// A synthesized audio frame is ready to egress. Gated by
    /// [`crate::audio_gate::AudioGate`].
    pub fn on_tts_frame(&self, frame: &[u8]) {
        let stream_id = self.id.clone();
        let transport = self.transport.clone();
        self.gate.send(frame, move |f| {
            use base64::Engine;
            let payload = base64::engine::general_purpose::STANDARD.encode(f);
            transport.send(UplinkFrame::Media {
                stream_id: stream_id.clone(),
                payload,
            });
        });
    }

    /// Send a raw inbound audio frame straight to this Session's
    /// telephony leg, bypassing the audio gate entirely. Used by the
    /// Conference Coordinator to bridge one party's microphone audio
    /// directly to the other party's ears.
    pub fn relay_raw_frame(&self, frame: &[u8]) {
        use base64::Engine;
        let payload = base64::engine::general_purpose::STANDARD.encode(frame);
        self.transport.send(UplinkFrame::Media {
            stream_id: self.id.clone(),
            payload,
        });
    }

    /// The TTS adapter has drained every frame from the most recent
    /// `flush()`. Authoritative signal that speaking has finished.
    pub fn on_tts_drained(&mut self) {
        self.flush_deadline = None;
        if self.state.current() == State::Speaking {
            self.gate.disable();
            self.state.attempt(State::Listening, "tts drained");
        }
    }

    /// Speak `text` verbatim, bypassing the language service (used for
    /// announcements such as the transfer-in-progress notice).
    pub async fn speak_verbatim(&mut self, text: &str) -> Result<(), CoreError> {
        if self.state.current() == State::Thinking {
            return Err(CoreError::Telephony(
                "cannot speak verbatim while awaiting a response".into(),
            ));
        }
        if self.state.current() != State::Speaking {
            self.state.attempt(State::Speaking, "verbatim announcement");
            self.gate.enable();
        }
        self.conversation.start_assistant();
        self.conversation.extend_assistant(text);
        self.tts
            .send_text(text)
            .await
            .map_err(|e| CoreError::Speech(e.to_string()))?;
        self.tts
            .flush()
            .await
            .map_err(|e| CoreError::Speech(e.to_string()))?;
        self.flush_deadline = Some(Instant::now() + FLUSH_TIMEOUT);
        self.conversation.finish_assistant();
        Ok(())
    }

    /// Emit DTMF digits to the telephony stream. Rejects anything
    /// outside `{0-9, *, #}`.
    pub fn send_dtmf(&self, digits: &str) -> Result<(), CoreError> {
        for c in digits.chars() {
            if !matches!(c, '0'..='9' | '*' | '#') {
                return Err(CoreError::Telephony(format!("invalid DTMF digit: {c}")));
            }
        }
        for c in digits.chars() {
            self.transport.send(UplinkFrame::Dtmf {
                stream_id: self.id.clone(),
                digit: c,
            });
        }
        Ok(())
    }

    /// Request telephony termination. Idempotent.
    pub async fn hang_up(&mut self) {
        if self.hung_up {
            return;
        }
        self.hung_up = true;
        if let Some(token) = self.generation_cancel.take() {
            token.cancel();
        }
        if let Some(cp) = &self.control_plane {
            if let Err(err) = cp
                .update_call(&self.call_id, "<Response><Hangup/></Response>")
                .await
            {
                warn!(session_id = %self.id, error = %err, "control-plane hangup request failed");
            }
        }
        self.state.attempt(State::Idle, "hang up requested");
    }

    /// Announce the transfer, then ask the control plane to bridge this
    /// call into a conference with the configured owner number.
    pub async fn transfer_to_human(&mut self, reason: &str) -> Result<(), CoreError> {
        self.speak_verbatim(&format!("One moment, let me connect you. {reason}"))
            .await?;
        tokio::time::sleep(TRANSFER_SETTLE).await;

        let Some(owner_phone) = self.owner_phone.clone() else {
            self.state.attempt(State::Listening, "transfer unavailable");
            return Err(CoreError::Conference(
                "no owner phone number configured for transfer".into(),
            ));
        };
        let Some(cp) = self.control_plane.clone() else {
            self.state.attempt(State::Listening, "transfer unavailable");
            return Err(CoreError::Conference(
                "no control plane configured for transfer".into(),
            ));
        };

        let conference_name = format!("conf-{}", self.id);
        let status_callback = format!(
            "{}/conference-status",
            self.public_base_url.clone().unwrap_or_default()
        );
        match cp
            .create_conference(&conference_name, &owner_phone, &status_callback)
            .await
        {
            Ok(()) => {
                self.conference_id = Some(conference_name);
                Ok(())
            }
            Err(err) => {
                warn!(session_id = %self.id, error = %err, "conference creation failed");
                self.state.attempt(State::Listening, "transfer failed");
                Err(err)
            }
        }
    }

    /// Tear down: cancel any in-flight generation, disable the gate,
    /// close both adapters. Idempotent.
    pub async fn cleanup(&mut self) {
        if let Some(token) = self.generation_cancel.take() {
            token.cancel();
        }
        self.root_cancel.cancel();
        self.gate.disable();
        self.stt.close().await;
        self.tts.close().await;
        self.state.attempt(State::Idle, "session cleanup");
    }

    async fn handle_interruption(&mut self, reason: &str) {
        if !self.state.attempt(State::Interrupted, reason) {
            return;
        }
        let stream_id = self.id.clone();
        let transport = self.transport.clone();
        self.gate.stop_immediately(move || {
            transport.send(UplinkFrame::Clear {
                stream_id: stream_id.clone(),
            });
        });
        if let Some(token) = self.generation_cancel.take() {
            token.cancel();
        }
        if let Err(err) = self.tts.clear().await {
            warn!(session_id = %self.id, error = %err, "tts clear failed during interruption (ignored)");
        }
        self.conversation.finish_assistant_interrupted();
        self.flush_deadline = None;
        self.state.attempt(State::Listening, "interruption handled");
    }

    fn check_flush_timeout(&mut self) {
        let Some(deadline) = self.flush_deadline else {
            return;
        };
        if Instant::now() >= deadline && self.state.current() == State::Speaking {
            warn!(session_id = %self.id, "tts flushed event not received within timeout; forcing LISTENING");
            self.gate.disable();
            self.state.attempt(State::Listening, "flush timeout");
            self.flush_deadline = None;
        }
    }

    async fn begin_generation(&mut self, text: &str, speaker_id: Option<String>) {
        let speaker = speaker_id
            .as_deref()
            .and_then(|id| self.conversation.resolve_speaker(id));
        self.conversation.append_user(text, speaker);

        if !self.state.attempt(State::Thinking, "user input received") {
            return;
        }

        let gen_token = self.root_cancel.child_token();
        self.generation_cancel = Some(gen_token.clone());

        let outcome = self.run_generation(gen_token).await;
        self.generation_cancel = None;

        match outcome {
            DriverOutcome::Finished { had_text, .. } => {
                if had_text {
                    if let Err(err) = self.tts.flush().await {
                        warn!(session_id = %self.id, error = %err, "tts flush failed");
                    }
                    self.flush_deadline = Some(Instant::now() + FLUSH_TIMEOUT);
                } else {
                    self.state.attempt(State::Listening, "no text generated");
                }
            }
            DriverOutcome::Error { cause } => {
                warn!(session_id = %self.id, cause = %cause, "language service stream failed");
                self.state.attempt(State::Listening, "llm stream error");
            }
            DriverOutcome::Aborted => {
                // The interruption path (or cleanup) already drove the
                // state machine; nothing further to do here.
            }
        }
    }

    /// Drives the language service across however many tool-call round
    /// trips it takes to reach a final answer. Unlike
    /// [`crate::llm::driver::run`], text deltas are forwarded to the TTS
    /// adapter as they arrive (not buffered) so SPEAKING starts, and the
    /// gate opens, on the very first delta of a response.
    async fn run_generation(&mut self, gen_token: CancellationToken) -> DriverOutcome {
        let mut had_text_overall = false;

        for round in 0..MAX_TOOL_ROUNDS {
            let snapshot = self.conversation.snapshot(HISTORY_WINDOW);
            let wire_messages = message::from_conversation(&snapshot);

            let mut stream = match self
                .llm
                .stream(&wire_messages, &self.tool_defs, gen_token.clone())
                .await
            {
                Ok(stream) => stream,
                Err(err) => {
                    return DriverOutcome::Error {
                        cause: err.to_string(),
                    }
                }
            };

            let mut started_assistant = false;
            let mut had_text = false;
            let mut pending_parts: Vec<Part> = Vec::new();
            let mut made_tool_call = false;

            let round_outcome = loop {
                let event = tokio::select! {
                    _ = gen_token.cancelled() => {
                        flush_pending(&mut self.conversation, &mut pending_parts);
                        break DriverOutcome::Aborted;
                    }
                    maybe_event = stream.next() => maybe_event,
                };

                let Some(event) = event else {
                    flush_pending(&mut self.conversation, &mut pending_parts);
                    break DriverOutcome::Finished {
                        reason: FinishReason::Other,
                        had_text,
                    };
                };

                match event {
                    LlmEvent::Start { request_id } => {
                        debug!(session_id = %self.id, request_id, round, "llm stream started");
                    }
                    LlmEvent::TextDelta { text, .. } => {
                        if !started_assistant {
                            self.conversation.start_assistant();
                            started_assistant = true;
                        }
                        had_text = true;
                        self.conversation.extend_assistant(&text);
                        if self.state.current() != State::Speaking {
                            self.state.attempt(State::Speaking, "generating response");
                            self.gate.enable();
                        }
                        if let Err(err) = self.tts.send_text(&text).await {
                            warn!(session_id = %self.id, error = %err, "tts send_text failed");
                        }
                    }
                    LlmEvent::TextStart { .. } | LlmEvent::TextEnd { .. } => {}
                    LlmEvent::ReasoningStart | LlmEvent::ReasoningEnd => {}
                    LlmEvent::ReasoningDelta { text } => {
                        debug!(session_id = %self.id, reasoning = %text, "llm reasoning (not sent to tts)");
                    }
                    LlmEvent::ToolCall { id, name, args } => {
                        made_tool_call = true;
                        info!(session_id = %self.id, call_id = %id, tool = %name, "llm requested tool call");
                        pending_parts.push(Part::ToolCall {
                            call_id: id.clone(),
                            name: name.clone(),
                            args: args.clone(),
                        });
                        flush_pending(&mut self.conversation, &mut pending_parts);
                        let payload = match self.tool_executor.execute(&name, &args).await {
                            Ok(payload) => payload,
                            Err(cause) => {
                                warn!(session_id = %self.id, call_id = %id, cause = %cause, "tool execution failed");
                                format!("error: {cause}")
                            }
                        };
                        self.conversation.add_tool_results(vec![ToolResultEntry {
                            call_id: id,
                            payload,
                        }]);
                    }
                    LlmEvent::ToolResult { id, payload } => {
                        // The language service only ever emits tool-call
                        // events (§1 scope); a raw tool-result in the
                        // stream indicates a test double or a
                        // self-executing provider. Record it as-is.
                        flush_pending(&mut self.conversation, &mut pending_parts);
                        self.conversation
                            .add_tool_results(vec![ToolResultEntry { call_id: id, payload }]);
                    }
                    LlmEvent::ToolError { id, cause } => {
                        flush_pending(&mut self.conversation, &mut pending_parts);
                        warn!(session_id = %self.id, call_id = %id, cause = %cause, "tool reported error");
                        self.conversation.add_tool_results(vec![ToolResultEntry {
                            call_id: id,
                            payload: format!("error: {cause}"),
                        }]);
                    }
                    LlmEvent::Finish { reason } => {
                        flush_pending(&mut self.conversation, &mut pending_parts);
                        if started_assistant {
                            self.conversation.finish_assistant();
                        }
                        break DriverOutcome::Finished { reason, had_text };
                    }
                    LlmEvent::Error { cause } => {
                        flush_pending(&mut self.conversation, &mut pending_parts);
                        break DriverOutcome::Error { cause };
                    }
                    LlmEvent::Abort => {
                        flush_pending(&mut self.conversation, &mut pending_parts);
                        break DriverOutcome::Aborted;
                    }
                }
            };

            had_text_overall |= had_text;

            match round_outcome {
                DriverOutcome::Finished {
                    reason: FinishReason::ToolCalls,
                    ..
                } if made_tool_call => continue,
                DriverOutcome::Finished { reason, .. } => {
                    return DriverOutcome::Finished {
                        reason,
                        had_text: had_text_overall,
                    }
                }
                other => return other,
            }
        }

        warn!(session_id = %self.id, "tool-call round trip limit reached; ending generation");
        DriverOutcome::Finished {
            reason: FinishReason::Other,
            had_text: had_text_overall,
        }
    }
}

fn flush_pending(conversation: &mut Conversation, pending_parts: &mut Vec<Part>) {
    if !pending_parts.is_empty() {
        conversation.add_assistant_structured(std::mem::take(pending_parts));
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::fake_session;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use crate::llm::error::LlmError;
    use crate::llm::provider::LlmEventStream;
    use crate::speech::{SttEvent, TtsEvent};
    use async_trait::async_trait;

    struct RecordingTransport {
        sent: StdMutex<Vec<UplinkFrame>>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                sent: StdMutex::new(Vec::new()),
            }
        }

        fn frames(&self) -> Vec<UplinkFrame> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl TelephonyTransport for RecordingTransport {
        fn send(&self, frame: UplinkFrame) {
            self.sent.lock().unwrap().push(frame);
        }
    }

    struct NullStt;

    #[async_trait]
    impl SttAdapter for NullStt {
        async fn send_frame(&mut self, _frame: &[u8]) -> Result<(), CoreError> {
            Ok(())
        }
        async fn next_event(&mut self) -> Option<SttEvent> {
            None
        }
        async fn close(&mut self) {}
    }

    #[derive(Default)]
    struct RecordingTts {
        sent_text: StdMutex<Vec<String>>,
        flush_count: AtomicUsize,
        clear_count: AtomicUsize,
    }

    #[async_trait]
    impl TtsAdapter for RecordingTts {
        async fn send_text(&mut self, chunk: &str) -> Result<(), CoreError> {
            self.sent_text.lock().unwrap().push(chunk.to_string());
            Ok(())
        }
        async fn flush(&mut self) -> Result<(), CoreError> {
            self.flush_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn clear(&mut self) -> Result<(), CoreError> {
            self.clear_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn close(&mut self) {}
        async fn next_event(&mut self) -> Option<TtsEvent> {
            None
        }
    }

    struct ScriptedLlm {
        events: Vec<LlmEvent>,
    }

    #[async_trait]
    impl LanguageService for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn stream(
            &self,
            _messages: &[crate::llm::Message],
            _tools: &[ToolDefinition],
            _cancel: CancellationToken,
        ) -> Result<LlmEventStream, LlmError> {
            Ok(Box::pin(futures_util::stream::iter(self.events.clone())))
        }
    }

    struct EchoExecutor;

    #[async_trait]
    impl ToolExecutor for EchoExecutor {
        async fn execute(&self, name: &str, args: &str) -> Result<String, String> {
            Ok(format!("ran {name} with {args}"))
        }
    }

    fn session_with(
        events: Vec<LlmEvent>,
        transport: Arc<RecordingTransport>,
        tts: Arc<tokio::sync::Mutex<RecordingTts>>,
    ) -> Session {
        struct TtsHandle(Arc<tokio::sync::Mutex<RecordingTts>>);

        #[async_trait]
        impl TtsAdapter for TtsHandle {
            async fn send_text(&mut self, chunk: &str) -> Result<(), CoreError> {
                self.0.lock().await.send_text(chunk).await
            }
            async fn flush(&mut self) -> Result<(), CoreError> {
                self.0.lock().await.flush().await
            }
            async fn clear(&mut self) -> Result<(), CoreError> {
                self.0.lock().await.clear().await
            }
            async fn close(&mut self) {}
            async fn next_event(&mut self) -> Option<TtsEvent> {
                None
            }
        }

        Session::new(
            "S1",
            "CA1",
            SessionRole::Solo,
            SessionHandles {
                stt: Box::new(NullStt),
                tts: Box::new(TtsHandle(tts)),
                transport,
            },
            Arc::new(ScriptedLlm { events }),
            Vec::new(),
            Arc::new(EchoExecutor),
            None,
            None,
            None,
        )
    }

    #[tokio::test]
    async fn init_transitions_idle_to_listening() {
        let mut session = fake_session();
        assert!(session.init());
        assert_eq!(session.state(), State::Listening);
    }

    #[tokio::test]
    async fn simple_reply_speaks_and_returns_to_listening_on_drain() {
        let transport = Arc::new(RecordingTransport::new());
        let tts = Arc::new(tokio::sync::Mutex::new(RecordingTts::default()));
        let mut session = session_with(
            vec![
                LlmEvent::TextDelta {
                    id: "t1".into(),
                    text: "Hello".into(),
                },
                LlmEvent::Finish {
                    reason: FinishReason::Stop,
                },
            ],
            transport,
            tts.clone(),
        );
        session.init();
        session.on_transcript("hi", None).await;
        assert_eq!(session.state(), State::Speaking);
        assert_eq!(tts.lock().await.flush_count.load(Ordering::SeqCst), 1);

        session.on_tts_drained();
        assert_eq!(session.state(), State::Listening);
    }

    #[tokio::test]
    async fn no_text_response_returns_directly_to_listening() {
        let transport = Arc::new(RecordingTransport::new());
        let tts = Arc::new(tokio::sync::Mutex::new(RecordingTts::default()));
        let mut session = session_with(
            vec![LlmEvent::Finish {
                reason: FinishReason::Stop,
            }],
            transport,
            tts,
        );
        session.init();
        session.on_transcript("hi", None).await;
        assert_eq!(session.state(), State::Listening);
    }

    #[tokio::test]
    async fn tool_call_executes_locally_and_continues_generation() {
        let transport = Arc::new(RecordingTransport::new());
        let tts = Arc::new(tokio::sync::Mutex::new(RecordingTts::default()));
        let mut session = session_with(
            vec![
                LlmEvent::ToolCall {
                    id: "tc_1".into(),
                    name: "getCalendarAvailability".into(),
                    args: "{}".into(),
                },
                LlmEvent::Finish {
                    reason: FinishReason::ToolCalls,
                },
            ],
            transport,
            tts,
        );
        session.init();
        session.on_transcript("what's open tomorrow?", None).await;
        // The scripted provider always replies with the same script, so
        // the second round also reports ToolCalls; the round-trip cap
        // ends the generation with no text and the session settles back
        // in LISTENING.
        assert_eq!(session.state(), State::Listening);
        assert!(session.conversation().len() >= 2);
    }

    #[tokio::test]
    async fn transcript_dropped_before_init() {
        let mut session = fake_session();
        // init() was never called: state is still IDLE, which does not
        // accept a transcript.
        session.on_transcript("too early", None).await;
        assert_eq!(session.state(), State::Idle);
        assert_eq!(session.conversation().len(), 0);
    }

    #[tokio::test]
    async fn dtmf_rejects_invalid_digit() {
        let session = fake_session();
        assert!(session.send_dtmf("123").is_ok());
        assert!(session.send_dtmf("12a").is_err());
    }

    #[tokio::test]
    async fn dtmf_emits_one_frame_per_digit() {
        let transport = Arc::new(RecordingTransport::new());
        let tts = Arc::new(tokio::sync::Mutex::new(RecordingTts::default()));
        let session = session_with(vec![], transport.clone(), tts);
        session.send_dtmf("1*#").expect("valid digits");
        assert_eq!(transport.frames().len(), 3);
    }

    #[tokio::test]
    async fn hang_up_is_idempotent() {
        let mut session = fake_session();
        session.init();
        session.hang_up().await;
        session.hang_up().await;
        assert_eq!(session.state(), State::Idle);
    }

    #[tokio::test]
    async fn speak_verbatim_enters_speaking_from_listening() {
        let mut session = fake_session();
        session.init();
        let result = session.speak_verbatim("hello there").await;
        assert!(result.is_ok());
        assert_eq!(session.state(), State::Speaking);
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let mut session = fake_session();
        session.init();
        session.cleanup().await;
        session.cleanup().await;
        assert_eq!(session.state(), State::Idle);
    }
}
