use crate::audio::AudioOutput;
use crate::db::SessionStore;
use crate::Logger;

/// One-way permission flag required before autonomous audio playback.
///
/// The platform only allows media to start from a user gesture until the
/// page has played something during one; the host routes that gesture to
/// [UnlockGate::unlock]. The flag persists in session storage so a reload
/// within the same session does not re-gate.
pub struct UnlockGate {
    logger: Logger,
    unlocked: bool,
    store: Box<dyn SessionStore>,
}

impl UnlockGate {
    pub fn new(mut store: Box<dyn SessionStore>) -> Self {
        let logger = Logger::create("UnlockGate");

        let unlocked = store.audio_unlocked();
        if unlocked {
            logger.debug("Audio already unlocked this session");
        }

        Self {
            logger,
            unlocked,
            store,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Run the silent feature probe and mark the gate unlocked.
    ///
    /// Unlocking is optimistic: a failed probe is logged, never surfaced,
    /// and does not keep the gate closed.
    pub fn unlock(&mut self, audio: &mut dyn AudioOutput) {
        if self.unlocked {
            return;
        }

        if let Err(e) = audio.probe() {
            self.logger.warn(format!("Silent probe failed, unlocking anyway: {e}"));
        }

        self.unlocked = true;
        self.store.set_audio_unlocked(true);
        self.logger.info("Audio unlocked for this session");
    }
}
