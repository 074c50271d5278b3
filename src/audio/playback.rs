/*!
The playback and fallback manager.

Owns the single active speech attempt. A session tries the cloud clip
first (when one exists and the gate is unlocked), falls back to local
synthesis on refusal, and drives lip sync in lockstep with whichever path
is playing. Every terminal path stops lip sync and zeroes the mouth before
the session ends, so the character never sticks in a talking pose.
*/

use crate::audio::{select_voice, AudioOutput, ClipEvent, SpeechSynthesizer, SynthEvent};
use crate::face::lip_sync::LipSyncDriver;
use crate::face::FaceRegistry;
use crate::scheduler::{Scheduler, Tick, TimerHandle};
use crate::Logger;

/// States of the speech session.
///
/// `Settling` is the short window between audio ending and the face
/// returning to neutral; stray engine events that arrive during it are
/// logged and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    CloudAudio,
    LocalSynth,
    Settling,
}

/// Session lifecycle, bubbled up to the orchestrator for host
/// notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Started,
    Ended,
}

pub struct PlaybackManager {
    logger: Logger,
    state: PlaybackState,
    audio: Box<dyn AudioOutput>,
    synth: Box<dyn SpeechSynthesizer>,
    lip: LipSyncDriver,
    locale: String,
    settle_delay_ms: u64,
    settle_timer: Option<TimerHandle>,
    /// Reply text retained for the synthesis fallback.
    pending_text: Option<String>,
    /// Whether this session has announced speech-started.
    announced: bool,
}

impl PlaybackManager {
    pub fn new(
        audio: Box<dyn AudioOutput>,
        synth: Box<dyn SpeechSynthesizer>,
        lip: LipSyncDriver,
        locale: impl Into<String>,
        settle_delay_ms: u64,
    ) -> Self {
        Self {
            logger: Logger::create("PlaybackManager"),
            state: PlaybackState::default(),
            audio,
            synth,
            lip,
            locale: locale.into(),
            settle_delay_ms,
            settle_timer: None,
            pending_text: None,
            announced: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn audio_mut(&mut self) -> &mut dyn AudioOutput {
        self.audio.as_mut()
    }

    /// Start a new speech session, force-retiring any active one first.
    pub fn speak(
        &mut self,
        text: Option<&str>,
        clip: Option<&[u8]>,
        unlocked: bool,
        scheduler: &mut Scheduler,
        face: &mut FaceRegistry,
    ) -> Vec<Lifecycle> {
        let mut events = self.retire(scheduler, face);

        self.pending_text = text.map(str::to_owned).filter(|t| !t.is_empty());

        if let Some(clip) = clip {
            if unlocked {
                match self.audio.play(clip) {
                    Ok(()) => {
                        self.state = PlaybackState::CloudAudio;
                        self.lip.start(scheduler);
                        events.push(self.announce());
                        return events;
                    }
                    Err(e) => self.logger.warn(format!(
                        "Cloud clip refused, falling back to local synthesis: {e}"
                    )),
                }
            } else {
                self.logger
                    .debug("Audio gate is locked, skipping the cloud clip");
            }
        }

        self.start_synthesis(scheduler, face, &mut events);
        events
    }

    /// Force-retire the active session: stop engines and lip sync, drop the
    /// grace delay, and emit the deferred ended event if the session had
    /// announced itself.
    pub fn retire(
        &mut self,
        scheduler: &mut Scheduler,
        face: &mut FaceRegistry,
    ) -> Vec<Lifecycle> {
        if self.state == PlaybackState::Idle {
            return Vec::new();
        }

        self.logger
            .debug(format!("Retiring active session in state {:?}", self.state));

        self.audio.stop();
        self.synth.cancel();
        self.lip.stop(scheduler, face);
        if let Some(handle) = self.settle_timer.take() {
            scheduler.cancel(handle);
        }
        self.pending_text = None;
        self.state = PlaybackState::Idle;

        let mut events = Vec::new();
        if self.announced {
            self.announced = false;
            events.push(Lifecycle::Ended);
        }
        events
    }

    /// Drain pending engine events. Called once per pump.
    pub fn pump(&mut self, scheduler: &mut Scheduler, face: &mut FaceRegistry) -> Vec<Lifecycle> {
        let mut events = Vec::new();

        while let Some(event) = self.audio.poll_event() {
            events.extend(self.handle_clip_event(event, scheduler, face));
        }
        while let Some(event) = self.synth.poll_event() {
            events.extend(self.handle_synth_event(event, scheduler, face));
        }

        events
    }

    pub fn handle_clip_event(
        &mut self,
        event: ClipEvent,
        scheduler: &mut Scheduler,
        face: &mut FaceRegistry,
    ) -> Vec<Lifecycle> {
        let mut events = Vec::new();

        if self.state != PlaybackState::CloudAudio {
            self.logger.debug(format!(
                "Ignoring clip event {event:?} in state {:?}",
                self.state
            ));
            return events;
        }

        match event {
            ClipEvent::Ended => {
                self.lip.stop(scheduler, face);
                self.begin_settle(scheduler);
            }
            ClipEvent::Error => {
                self.lip.stop(scheduler, face);
                if self.pending_text.is_some() {
                    self.logger
                        .warn("Clip playback failed mid-stream, retrying via local synthesis");
                    self.start_synthesis(scheduler, face, &mut events);
                } else {
                    self.end_now(&mut events);
                }
            }
        }

        events
    }

    pub fn handle_synth_event(
        &mut self,
        event: SynthEvent,
        scheduler: &mut Scheduler,
        face: &mut FaceRegistry,
    ) -> Vec<Lifecycle> {
        let mut events = Vec::new();

        if self.state != PlaybackState::LocalSynth {
            self.logger.debug(format!(
                "Ignoring synthesis event {event:?} in state {:?}",
                self.state
            ));
            return events;
        }

        match event {
            SynthEvent::Started => {
                self.lip.start(scheduler);
                events.push(self.announce());
            }
            SynthEvent::Ended => {
                self.lip.stop(scheduler, face);
                self.begin_settle(scheduler);
            }
            SynthEvent::Error => {
                self.logger.error("Local synthesis reported an error");
                self.lip.stop(scheduler, face);
                self.begin_settle(scheduler);
            }
        }

        events
    }

    /// [Tick::Settle] handler: the grace delay elapsed.
    pub fn settle_elapsed(&mut self) -> Vec<Lifecycle> {
        if self.state != PlaybackState::Settling {
            self.logger
                .debug(format!("Spurious settle tick in state {:?}", self.state));
            return Vec::new();
        }

        self.settle_timer = None;
        let mut events = Vec::new();
        self.end_now(&mut events);
        events
    }

    /// [Tick::LipSync] handler.
    pub fn lip_tick(&mut self, face: &mut FaceRegistry) {
        self.lip.tick(face);
    }

    fn start_synthesis(
        &mut self,
        scheduler: &mut Scheduler,
        face: &mut FaceRegistry,
        events: &mut Vec<Lifecycle>,
    ) {
        let Some(text) = self.pending_text.take() else {
            self.logger.debug("Nothing to synthesize, ending the session");
            self.end_now(events);
            return;
        };

        let voices = self.synth.voices();
        let voice = select_voice(&voices, &self.locale);

        match self.synth.speak(&text, voice) {
            Ok(()) => {
                // Lip sync starts when the engine reports Started.
                self.state = PlaybackState::LocalSynth;
            }
            Err(e) => {
                self.logger.error(format!("Local synthesis failed: {e}"));
                self.lip.stop(scheduler, face);
                self.end_now(events);
            }
        }
    }

    fn begin_settle(&mut self, scheduler: &mut Scheduler) {
        self.state = PlaybackState::Settling;
        self.settle_timer = Some(scheduler.schedule_once(self.settle_delay_ms, Tick::Settle));
    }

    fn end_now(&mut self, events: &mut Vec<Lifecycle>) {
        self.state = PlaybackState::Idle;
        self.announced = false;
        events.push(Lifecycle::Ended);
    }

    fn announce(&mut self) -> Lifecycle {
        self.announced = true;
        Lifecycle::Started
    }
}
