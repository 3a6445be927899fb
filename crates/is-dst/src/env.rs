//! The simulation environment: one seed, every source of nondeterminism.

use std::fmt;

use crate::fault::{FaultConfig, FaultInjector};
use crate::random::DeterministicRng;
use crate::scheduler::Scheduler;

/// Probability that `maybe_delay` stalls the current step.
const DELAY_PROBABILITY: f64 = 0.1;

pub struct DstEnv {
    seed: u64,
    rng: DeterministicRng,
    fault: FaultInjector,
    scheduler: Option<Scheduler>,
    /// Simulated time in microseconds
    now_us: u64,
    delays_count: u64,
}

impl DstEnv {
    /// Environment with default fault injection and no scheduler.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_fault_config(seed, FaultConfig::default())
    }

    #[must_use]
    pub fn with_fault_config(seed: u64, config: FaultConfig) -> Self {
        Self {
            seed,
            rng: DeterministicRng::new(seed),
            fault: FaultInjector::new(DeterministicRng::new(seed.wrapping_add(1)), config),
            scheduler: None,
            now_us: 0,
            delays_count: 0,
        }
    }

    /// Environment that also simulates `threads_count` interleaved callers.
    #[must_use]
    pub fn with_scheduler(seed: u64, threads_count: usize, yield_probability: f64, config: FaultConfig) -> Self {
        let mut env = Self::with_fault_config(seed, config);
        env.scheduler = Some(Scheduler::new(
            DeterministicRng::new(seed.wrapping_add(2)),
            threads_count,
            yield_probability,
        ));
        env
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    pub fn fault(&mut self) -> &mut FaultInjector {
        &mut self.fault
    }

    pub fn scheduler(&mut self) -> Option<&mut Scheduler> {
        self.scheduler.as_mut()
    }

    #[must_use]
    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    pub fn advance_us(&mut self, us: u64) {
        self.now_us = self.now_us.saturating_add(us);
    }

    /// Occasionally stall simulated time, modelling a slow caller.
    pub fn maybe_delay(&mut self) {
        if self.rng.gen_bool(DELAY_PROBABILITY) {
            let stall = self.rng.gen_range(100..10_000_u64);
            self.advance_us(stall);
            self.delays_count += 1;
        }
    }

    #[must_use]
    pub fn format_seed(&self) -> String {
        format!("DST_SEED={}", self.seed)
    }

    #[must_use]
    pub fn stats(&self) -> EnvStats {
        EnvStats {
            seed: self.seed,
            now_us: self.now_us,
            delays_count: self.delays_count,
            faults_count: self.fault.stats().faults_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvStats {
    pub seed: u64,
    pub now_us: u64,
    pub delays_count: u64,
    pub faults_count: u64,
}

impl fmt::Display for EnvStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DST_SEED={} sim_time={}us delays={} faults={}",
            self.seed, self.now_us, self.delays_count, self.faults_count
        )
    }
}
