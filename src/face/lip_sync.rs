/*!
Coarse randomized-viseme lip sync.

No phoneme timing: while the talking flag is set, a fixed-period tick picks
one mouth shape at random and raises it. Good enough to read as speech from
across a page.
*/

use rand::Rng;

use crate::face::{FaceRegistry, MOUTH_SHAPES};
use crate::scheduler::{Scheduler, Tick, TimerHandle};
use crate::Logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LipState {
    Idle,
    Talking,
}

pub struct LipSyncDriver {
    logger: Logger,
    state: LipState,
    timer: Option<TimerHandle>,
    period_ms: u64,
    weight: f32,
}

impl LipSyncDriver {
    pub fn new(period_ms: u64, weight: f32) -> Self {
        Self {
            logger: Logger::create("LipSyncDriver"),
            state: LipState::Idle,
            timer: None,
            period_ms,
            weight,
        }
    }

    pub fn is_talking(&self) -> bool {
        self.state == LipState::Talking
    }

    /// Begin ticking. Re-entrant calls are no-ops so a media "play" event
    /// and a manual trigger cannot double-start the timer.
    pub fn start(&mut self, scheduler: &mut Scheduler) {
        if self.state == LipState::Talking {
            self.logger.debug("Already talking, ignoring start");
            return;
        }

        self.state = LipState::Talking;
        self.timer = Some(scheduler.schedule_repeating(self.period_ms, Tick::LipSync));
    }

    /// Stop unconditionally: cancel the tick and zero every mouth shape so
    /// no open-mouth frame dangles.
    pub fn stop(&mut self, scheduler: &mut Scheduler, face: &mut FaceRegistry) {
        if let Some(handle) = self.timer.take() {
            scheduler.cancel(handle);
        }
        face.reset_group(&MOUTH_SHAPES);
        self.state = LipState::Idle;
    }

    /// One viseme frame: clear the mouth, raise one shape at random.
    pub fn tick(&mut self, face: &mut FaceRegistry) {
        if self.state != LipState::Talking {
            return;
        }

        face.reset_group(&MOUTH_SHAPES);
        let viseme = MOUTH_SHAPES[rand::thread_rng().gen_range(0..MOUTH_SHAPES.len())];
        face.set_influence(viseme, self.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::testing::face_with;

    fn driver() -> LipSyncDriver {
        LipSyncDriver::new(120, 0.75)
    }

    #[test]
    fn double_start_registers_a_single_timer() {
        let mut scheduler = Scheduler::new();
        let mut lip = driver();

        lip.start(&mut scheduler);
        lip.start(&mut scheduler);

        assert_eq!(scheduler.pending(), 1);
        assert!(lip.is_talking());
    }

    #[test]
    fn tick_raises_exactly_one_viseme() {
        let (mut face, mesh) = face_with(&MOUTH_SHAPES);
        let mut scheduler = Scheduler::new();
        let mut lip = driver();
        lip.start(&mut scheduler);

        for _ in 0..20 {
            lip.tick(&mut face);
            let raised = MOUTH_SHAPES
                .iter()
                .filter(|shape| mesh.influence(shape) == Some(0.75))
                .count();
            assert_eq!(raised, 1);
        }
    }

    #[test]
    fn tick_while_idle_does_nothing() {
        let (mut face, mesh) = face_with(&MOUTH_SHAPES);
        let mut lip = driver();

        lip.tick(&mut face);

        for shape in MOUTH_SHAPES {
            assert_eq!(mesh.influence(shape), Some(0.0));
        }
    }

    #[test]
    fn stop_cancels_the_timer_and_zeroes_the_mouth() {
        let (mut face, mesh) = face_with(&MOUTH_SHAPES);
        let mut scheduler = Scheduler::new();
        let mut lip = driver();

        lip.start(&mut scheduler);
        lip.tick(&mut face);
        lip.stop(&mut scheduler, &mut face);

        assert_eq!(scheduler.pending(), 0);
        assert!(!lip.is_talking());
        for shape in MOUTH_SHAPES {
            assert_eq!(mesh.influence(shape), Some(0.0));
        }

        // Stopping again is harmless.
        lip.stop(&mut scheduler, &mut face);
        assert!(!lip.is_talking());
    }
}
