use rand::Rng;

use crate::face::{FaceRegistry, EYE_SHAPES};
use crate::scheduler::{Scheduler, Tick, TimerHandle};

/// Idle eye-blink motion: random spacing, brief closed phase.
///
/// Purely cosmetic. Writes only to [EYE_SHAPES], which is disjoint from the
/// mouth and emotion sets, so it can never race the speech drivers on a
/// target.
pub struct BlinkDriver {
    timer: Option<TimerHandle>,
    min_spacing_ms: u64,
    max_spacing_ms: u64,
    close_ms: u64,
}

impl BlinkDriver {
    pub fn new(min_spacing_ms: u64, max_spacing_ms: u64, close_ms: u64) -> Self {
        Self {
            timer: None,
            min_spacing_ms,
            max_spacing_ms: max_spacing_ms.max(min_spacing_ms),
            close_ms,
        }
    }

    pub fn start(&mut self, scheduler: &mut Scheduler) {
        if self.timer.is_some() {
            return;
        }
        self.schedule_next(scheduler);
    }

    pub fn stop(&mut self, scheduler: &mut Scheduler, face: &mut FaceRegistry) {
        if let Some(handle) = self.timer.take() {
            scheduler.cancel(handle);
        }
        face.reset_group(&EYE_SHAPES);
    }

    /// [Tick::BlinkClose] handler: shut the eyes and queue the reopen.
    pub fn close(&mut self, scheduler: &mut Scheduler, face: &mut FaceRegistry) {
        face.set_influence(EYE_SHAPES[0], 1.0);
        self.timer = Some(scheduler.schedule_once(self.close_ms, Tick::BlinkOpen));
    }

    /// [Tick::BlinkOpen] handler: reopen and queue the next blink.
    pub fn open(&mut self, scheduler: &mut Scheduler, face: &mut FaceRegistry) {
        face.reset_group(&EYE_SHAPES);
        self.schedule_next(scheduler);
    }

    fn schedule_next(&mut self, scheduler: &mut Scheduler) {
        let spacing = rand::thread_rng().gen_range(self.min_spacing_ms..=self.max_spacing_ms);
        self.timer = Some(scheduler.schedule_once(spacing, Tick::BlinkClose));
    }
}
