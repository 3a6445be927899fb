//! Deterministic choice of which simulated thread runs next.

use crate::random::DeterministicRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Keep running the current thread
    Continue,
    /// Switch to the given thread
    Switch(usize),
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    rng: DeterministicRng,
    threads_count: usize,
    current: usize,
    yield_probability: f64,
}

impl Scheduler {
    #[must_use]
    pub fn new(rng: DeterministicRng, threads_count: usize, yield_probability: f64) -> Self {
        debug_assert!(threads_count > 0, "Must have at least one thread");
        Self {
            rng,
            threads_count,
            current: 0,
            yield_probability,
        }
    }

    #[must_use]
    pub fn current_thread(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn threads_count(&self) -> usize {
        self.threads_count
    }

    /// At a yield point, maybe hand control to another thread.
    pub fn decide(&mut self) -> ScheduleDecision {
        if self.threads_count < 2 || !self.rng.gen_bool(self.yield_probability) {
            return ScheduleDecision::Continue;
        }
        let offset = self.rng.gen_range(1..self.threads_count);
        self.current = (self.current + offset) % self.threads_count;
        ScheduleDecision::Switch(self.current)
    }

    /// Move to the next thread unconditionally.
    pub fn force_switch(&mut self) -> usize {
        self.current = (self.current + 1) % self.threads_count;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_never_targets_current() {
        let mut scheduler = Scheduler::new(DeterministicRng::new(3), 4, 1.0);
        for _ in 0..100 {
            let before = scheduler.current_thread();
            match scheduler.decide() {
                ScheduleDecision::Switch(next) => assert_ne!(next, before),
                ScheduleDecision::Continue => panic!("yield probability 1.0 must switch"),
            }
        }
    }

    #[test]
    fn test_single_thread_continues() {
        let mut scheduler = Scheduler::new(DeterministicRng::new(3), 1, 1.0);
        assert_eq!(scheduler.decide(), ScheduleDecision::Continue);
        assert_eq!(scheduler.force_switch(), 0);
    }
}
