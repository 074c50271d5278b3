/*!
The speech orchestrator.

One [Character] per model instance owns every collaborator: the face
registry, the emotion overlay, the playback manager, conversation memory,
the unlock gate, the backend client, and the host bridge. All of it runs on
one cooperative thread; the host calls [Character::update] from its frame
callback and the entry points from its event handlers.
*/

use crate::audio::gate::UnlockGate;
use crate::audio::playback::{Lifecycle, PlaybackManager};
use crate::audio::{AudioOutput, SpeechSynthesizer};
use crate::backend::{BackendResult, ChatBackend};
use crate::bridge::{parse_host_message, HostMessage, HostNotification, HostSink};
use crate::db::SessionStore;
use crate::face::blink::BlinkDriver;
use crate::face::emotion::{Emotion, EmotionController};
use crate::face::lip_sync::LipSyncDriver;
use crate::face::{FaceRegistry, MorphMesh};
use crate::model::chat::{ChatRequest, ChatResponse, ConversationMemory};
use crate::model::{CharacterOptions, GatePolicy};
use crate::scheduler::{Scheduler, Tick, TimeMs};
use crate::Logger;

pub struct Character {
    logger: Logger,
    options: CharacterOptions,
    scheduler: Scheduler,
    face: FaceRegistry,
    emotions: EmotionController,
    playback: PlaybackManager,
    blink: BlinkDriver,
    memory: ConversationMemory,
    gate: UnlockGate,
    backend: Box<dyn ChatBackend>,
    host: Box<dyn HostSink>,
    /// A request is in flight. There is no timeout: a hung backend leaves
    /// this set until the worker reports something.
    awaiting_reply: bool,
}

impl Character {
    /// Build a character around a loaded model's meshes and the host's
    /// platform seams.
    pub fn mount(
        meshes: Vec<Box<dyn MorphMesh>>,
        audio: Box<dyn AudioOutput>,
        synth: Box<dyn SpeechSynthesizer>,
        backend: Box<dyn ChatBackend>,
        host: Box<dyn HostSink>,
        store: Box<dyn SessionStore>,
        options: CharacterOptions,
    ) -> Self {
        let logger = Logger::create("Character");

        let mut face = FaceRegistry::scan(meshes);
        let mut emotions = EmotionController::new();
        emotions.apply(Emotion::Neutral, &mut face);

        let lip = LipSyncDriver::new(options.lip_period_ms, options.lip_weight);
        let playback = PlaybackManager::new(
            audio,
            synth,
            lip,
            options.locale.clone(),
            options.settle_delay_ms,
        );

        let mut scheduler = Scheduler::new();
        let mut blink = BlinkDriver::new(
            options.blink_min_spacing_ms,
            options.blink_max_spacing_ms,
            options.blink_close_ms,
        );
        blink.start(&mut scheduler);

        let memory = ConversationMemory::new(options.max_turns);
        let gate = UnlockGate::new(store);

        Self {
            logger,
            options,
            scheduler,
            face,
            emotions,
            playback,
            blink,
            memory,
            gate,
            backend,
            host,
            awaiting_reply: false,
        }
    }

    /// Raw message from the embedding context. Unrecognized messages are
    /// dropped by the bridge.
    pub fn handle_host_message(&mut self, raw: &str) {
        let Some(message) = parse_host_message(raw) else {
            return;
        };

        match message {
            HostMessage::Chat { text } => self.handle_inbound_text(&text),
        }
    }

    /// Record the user's text and submit it to the backend, unless the
    /// audio gate is still locked.
    pub fn handle_inbound_text(&mut self, text: &str) {
        self.memory.append_user(text);

        // No point paying for a reply that cannot be played.
        if !self.gate.is_unlocked() {
            match self.options.gate_policy {
                GatePolicy::Prompt => {
                    self.logger
                        .info("Audio gate is locked, prompting the host to unlock");
                    self.host.notify(HostNotification::UnlockRequired);
                }
                GatePolicy::Drop => {
                    self.logger.info("Audio gate is locked, dropping the utterance");
                }
            }
            return;
        }

        let request = ChatRequest {
            text: text.to_string(),
            history: self.memory.snapshot(),
        };

        match self.backend.submit(request) {
            Ok(()) => self.awaiting_reply = true,
            Err(e) => {
                self.logger.error(format!("Unable to contact the backend: {e}"));
                self.fail_silently();
            }
        }
    }

    /// Host user-gesture handler.
    pub fn unlock_audio(&mut self) {
        self.gate.unlock(self.playback.audio_mut());
    }

    pub fn audio_unlocked(&self) -> bool {
        self.gate.is_unlocked()
    }

    pub fn emotion(&self) -> Emotion {
        self.emotions.current()
    }

    /// The cooperative pump. `now` is milliseconds on the host's monotonic
    /// clock, counted from mount; call this from the frame callback.
    pub fn update(&mut self, now: TimeMs) {
        for tick in self.scheduler.advance(now) {
            match tick {
                Tick::LipSync => self.playback.lip_tick(&mut self.face),
                Tick::Settle => {
                    let events = self.playback.settle_elapsed();
                    self.emit(events);
                }
                Tick::BlinkClose => self.blink.close(&mut self.scheduler, &mut self.face),
                Tick::BlinkOpen => self.blink.open(&mut self.scheduler, &mut self.face),
            }
        }

        let events = self.playback.pump(&mut self.scheduler, &mut self.face);
        self.emit(events);

        if self.awaiting_reply {
            if let Some(result) = self.backend.poll() {
                self.awaiting_reply = false;
                self.handle_backend_result(result);
            }
        }
    }

    fn handle_backend_result(&mut self, result: BackendResult) {
        match result {
            Ok(response) => self.handle_backend_response(response),
            Err(e) => {
                self.logger.error(format!("Backend request failed: {e}"));
                self.fail_silently();
            }
        }
    }

    fn handle_backend_response(&mut self, response: ChatResponse) {
        if let Some(reply) = response.reply.as_deref() {
            self.memory.append_assistant(reply);
        }

        if response.reply.is_none() && response.audio.is_none() {
            self.logger.debug("Backend response had nothing to play");
            self.fail_silently();
            return;
        }

        let unlocked = self.gate.is_unlocked();
        let events = self.playback.speak(
            response.reply.as_deref(),
            response.audio.as_deref(),
            unlocked,
            &mut self.scheduler,
            &mut self.face,
        );
        self.emit(events);

        // Must come after emit: a force-retired session's ended event resets
        // the face to neutral, which would wipe this overlay.
        if let Some(emotion) = response.emotion.as_deref() {
            self.emotions.set_emotion(emotion, &mut self.face);
        }
    }

    /// Absorb a failure: retire whatever was active and make sure the host
    /// sees exactly one speech-ended. Never propagates.
    fn fail_silently(&mut self) {
        let mut events = self.playback.retire(&mut self.scheduler, &mut self.face);
        if events.is_empty() {
            events.push(Lifecycle::Ended);
        }
        self.emit(events);
    }

    fn emit(&mut self, events: Vec<Lifecycle>) {
        for event in events {
            match event {
                Lifecycle::Started => self.host.notify(HostNotification::SpeechStarted),
                Lifecycle::Ended => {
                    // Neutral is restored before the notification goes out.
                    self.emotions.apply(Emotion::Neutral, &mut self.face);
                    self.host.notify(HostNotification::SpeechEnded);
                }
            }
        }
    }
}
