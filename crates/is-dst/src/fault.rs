//! Probabilistic fault decisions.

use crate::random::DeterministicRng;

/// How often faults fire.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultConfig {
    /// Probability that any single check fails
    pub failure_probability: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            failure_probability: 0.05,
        }
    }
}

impl FaultConfig {
    /// Never inject.
    #[must_use]
    pub fn none() -> Self {
        Self {
            failure_probability: 0.0,
        }
    }

    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            failure_probability: 0.25,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultStats {
    pub checks_count: u64,
    pub faults_count: u64,
}

/// Decides, deterministically, when a fault fires.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    stats: FaultStats,
}

impl FaultInjector {
    #[must_use]
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&config.failure_probability),
            "failure probability out of range: {}",
            config.failure_probability
        );
        Self {
            rng,
            config,
            stats: FaultStats::default(),
        }
    }

    pub fn should_fail(&mut self) -> bool {
        self.stats.checks_count += 1;
        if self.config.failure_probability <= 0.0 {
            return false;
        }
        let fail = self.rng.gen_bool(self.config.failure_probability);
        if fail {
            self.stats.faults_count += 1;
        }
        fail
    }

    #[must_use]
    pub fn stats(&self) -> &FaultStats {
        &self.stats
    }

    #[must_use]
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_never_fails() {
        let mut injector = FaultInjector::new(DeterministicRng::new(1), FaultConfig::none());
        assert!((0..1000).all(|_| !injector.should_fail()));
        assert_eq!(injector.stats().checks_count, 1000);
        assert_eq!(injector.stats().faults_count, 0);
    }

    #[test]
    fn test_always_fails() {
        let config = FaultConfig {
            failure_probability: 1.0,
        };
        let mut injector = FaultInjector::new(DeterministicRng::new(1), config);
        assert!((0..10).all(|_| injector.should_fail()));
        assert_eq!(injector.stats().faults_count, 10);
    }
}
