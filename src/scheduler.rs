/*!
A cooperative timer scheduler driven by the host's clock.

The character never spins its own threads for animation: every periodic
effect (lip-sync tick, settle delay, blink) registers here and fires when
the host pumps [Scheduler::advance] with the current time. Tests drive a
virtual clock the same way.
*/

/// Milliseconds on the host's monotonic clock, starting at mount time.
pub type TimeMs = u64;

/// The timer tasks understood by the character's pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    LipSync,
    Settle,
    BlinkClose,
    BlinkOpen,
}

/// Opaque handle for cancelling a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct TimerEntry {
    id: u64,
    due: TimeMs,
    period: Option<u64>,
    task: Tick,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: TimeMs,
    next_id: u64,
    timers: Vec<TimerEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> TimeMs {
        self.now
    }

    /// Number of timers currently registered.
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Fire `task` once, `delay` milliseconds from the current time.
    pub fn schedule_once(&mut self, delay: u64, task: Tick) -> TimerHandle {
        self.push(self.now + delay, None, task)
    }

    /// Fire `task` every `period` milliseconds until cancelled.
    pub fn schedule_repeating(&mut self, period: u64, task: Tick) -> TimerHandle {
        let period = period.max(1);
        self.push(self.now + period, Some(period), task)
    }

    pub fn cancel(&mut self, handle: TimerHandle) {
        self.timers.retain(|t| t.id != handle.0);
    }

    /// Advance the clock to `now` and collect every task that came due, in
    /// due order. Repeating timers are rescheduled relative to their own
    /// period, so a large jump drains each missed tick.
    pub fn advance(&mut self, now: TimeMs) -> Vec<Tick> {
        if now > self.now {
            self.now = now;
        }

        let mut fired = Vec::new();
        loop {
            let next = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due <= self.now)
                .min_by_key(|(_, t)| (t.due, t.id))
                .map(|(idx, _)| idx);

            let Some(idx) = next else {
                break;
            };

            let task = self.timers[idx].task;
            match self.timers[idx].period {
                Some(period) => self.timers[idx].due += period,
                None => {
                    self.timers.remove(idx);
                }
            }
            fired.push(task);
        }

        fired
    }

    fn push(&mut self, due: TimeMs, period: Option<u64>, task: Tick) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.push(TimerEntry {
            id,
            due,
            period,
            task,
        });
        TimerHandle(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_fires_once() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once(100, Tick::Settle);

        assert_eq!(scheduler.advance(99), vec![]);
        assert_eq!(scheduler.advance(100), vec![Tick::Settle]);
        assert_eq!(scheduler.advance(1_000), vec![]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn repeating_fires_every_period() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_repeating(120, Tick::LipSync);

        assert_eq!(scheduler.advance(119), vec![]);
        assert_eq!(scheduler.advance(120), vec![Tick::LipSync]);
        assert_eq!(scheduler.advance(240), vec![Tick::LipSync]);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn repeating_catches_up_after_a_jump() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_repeating(100, Tick::LipSync);

        let fired = scheduler.advance(350);
        assert_eq!(fired, vec![Tick::LipSync, Tick::LipSync, Tick::LipSync]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule_once(50, Tick::Settle);
        scheduler.cancel(handle);

        assert_eq!(scheduler.advance(100), vec![]);
    }

    #[test]
    fn due_order_is_preserved() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once(200, Tick::Settle);
        scheduler.schedule_once(100, Tick::BlinkClose);

        assert_eq!(scheduler.advance(300), vec![Tick::BlinkClose, Tick::Settle]);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut scheduler = Scheduler::new();
        scheduler.advance(500);
        scheduler.advance(100);

        assert_eq!(scheduler.now(), 500);
    }

    #[test]
    fn zero_period_is_clamped() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_repeating(0, Tick::LipSync);

        // One tick per elapsed millisecond, not an infinite loop.
        assert_eq!(scheduler.advance(3).len(), 3);
    }
}
