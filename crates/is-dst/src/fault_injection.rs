//! Scripted scenarios with faults at operation boundaries.
//!
//! Faults never reach inside the engine's critical section. They happen
//! around it, in the runner, or through the engine's allocator seam:
//!
//! | Concern | Where | Effect |
//! |---------|-------|--------|
//! | Allocation failure | `FaultyAllocator` | resize returns `ResourceExhausted` |
//! | Caller crash before the call | runner, pre-op | operation never starts |
//! | Caller crash after the call | runner, post-op | effect applied, result lost |
//! | Slow caller | runner | simulated time advances |

use is_core::{PropertyChecker, PropertyResult, StackEngine, StackError, StackPropertyChecker, TrackedEngine};

use crate::alloc::FaultyAllocator;
use crate::fault::{FaultConfig, FaultInjector};
use crate::random::DeterministicRng;

/// Fault injection points (between operations, not inside).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    BeforeOperation,
    AfterOperation,
}

/// Faults injected by the runner itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    /// Caller "crashes" and never sees the result
    ThreadCrash,
    /// Caller stalls; the operation still runs
    Delay,
}

/// DST operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstOp {
    Push(i32),
    Pop,
    Resize(i32),
}

/// What the caller observed for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstOutcome {
    Pushed,
    Popped(Option<i32>),
    Resized,
    Rejected(StackError),
}

/// DST runner for the stack engine.
pub struct DstRunner {
    stack: TrackedEngine<FaultyAllocator>,
    rng: DeterministicRng,
    fault_injector: FaultInjector,
    seed: u64,
    sim_time_us: u64,
    operations_count: u64,
    faults_injected: u64,
    abandoned_operations: u64,
    rejected_operations: u64,
}

impl DstRunner {
    /// Runner with default fault rates for both caller and allocator faults.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_fault_config(seed, FaultConfig::default())
    }

    #[must_use]
    pub fn with_fault_config(seed: u64, config: FaultConfig) -> Self {
        let allocator = FaultyAllocator::new(seed.wrapping_add(2), config.clone());
        Self {
            stack: TrackedEngine::with_engine(StackEngine::with_allocator(allocator)),
            rng: DeterministicRng::new(seed),
            fault_injector: FaultInjector::new(DeterministicRng::new(seed.wrapping_add(1)), config),
            seed,
            sim_time_us: 0,
            operations_count: 0,
            faults_injected: 0,
            abandoned_operations: 0,
            rejected_operations: 0,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stack(&self) -> &TrackedEngine<FaultyAllocator> {
        &self.stack
    }

    /// Apply one operation with faults at its boundaries.
    pub fn apply(&mut self, op: DstOp) -> Result<DstOutcome, FaultType> {
        if let Some(fault) = self.maybe_inject_fault(FaultPoint::BeforeOperation) {
            if fault == FaultType::ThreadCrash {
                self.abandoned_operations += 1;
                return Err(fault);
            }
        }

        let outcome = match op {
            DstOp::Push(value) => self
                .stack
                .push(value)
                .map_or_else(DstOutcome::Rejected, |()| DstOutcome::Pushed),
            DstOp::Pop => DstOutcome::Popped(self.stack.pop()),
            DstOp::Resize(capacity) => self
                .stack
                .resize(capacity)
                .map_or_else(DstOutcome::Rejected, |()| DstOutcome::Resized),
        };
        self.operations_count += 1;
        if matches!(outcome, DstOutcome::Rejected(_)) {
            self.rejected_operations += 1;
        }

        if let Some(FaultType::ThreadCrash) = self.maybe_inject_fault(FaultPoint::AfterOperation) {
            // Effect is applied; only the caller's view is lost.
            self.abandoned_operations += 1;
            return Err(FaultType::ThreadCrash);
        }

        Ok(outcome)
    }

    fn maybe_inject_fault(&mut self, point: FaultPoint) -> Option<FaultType> {
        if !self.fault_injector.should_fail() {
            return None;
        }
        self.faults_injected += 1;
        let fault = if self.rng.gen_bool(0.5) {
            FaultType::ThreadCrash
        } else {
            FaultType::Delay
        };
        if fault == FaultType::Delay {
            self.sim_time_us += self.rng.gen_range(10..1_000_u64);
        }
        tracing::trace!(?point, ?fault, "fault injected");
        Some(fault)
    }

    /// Evaluate every stack invariant.
    #[must_use]
    pub fn check_invariants(&self) -> Vec<PropertyResult> {
        StackPropertyChecker::new(&self.stack)
            .with_seed(self.seed.max(1))
            .check_all()
    }

    #[must_use]
    pub fn stats(&self) -> DstStats {
        DstStats {
            seed: self.seed,
            operations_count: self.operations_count,
            faults_injected: self.faults_injected,
            allocation_failures: self.stack.engine().allocator().stats().faults_count,
            abandoned_operations: self.abandoned_operations,
            rejected_operations: self.rejected_operations,
            sim_time_us: self.sim_time_us,
        }
    }
}

/// Statistics from DST run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DstStats {
    pub seed: u64,
    pub operations_count: u64,
    pub faults_injected: u64,
    pub allocation_failures: u64,
    pub abandoned_operations: u64,
    pub rejected_operations: u64,
    pub sim_time_us: u64,
}

impl DstStats {
    #[must_use]
    pub fn format(&self) -> String {
        format!(
            "DST_SEED={} ops={} faults={} alloc_failures={} abandoned={} rejected={}",
            self.seed,
            self.operations_count,
            self.faults_injected,
            self.allocation_failures,
            self.abandoned_operations,
            self.rejected_operations
        )
    }
}

/// DST result.
#[derive(Debug)]
pub struct DstResult {
    pub passed: bool,
    pub violations: Vec<PropertyResult>,
    pub stats: DstStats,
    /// Outcomes in operation order; `Err` where a fault hid the result
    pub outcomes: Vec<Result<DstOutcome, FaultType>>,
}

impl DstResult {
    #[must_use]
    pub fn format(&self) -> String {
        let status = if self.passed { "PASS" } else { "FAIL" };
        let mut result = format!("[{}] {}", status, self.stats.format());
        for violation in &self.violations {
            result.push_str(&format!("\n  VIOLATION: {}", violation));
        }
        result
    }
}

/// Run a scripted scenario, then check every invariant.
pub fn run_dst_scenario(seed: u64, config: FaultConfig, operations: &[DstOp]) -> DstResult {
    let mut runner = DstRunner::with_fault_config(seed, config);
    let outcomes: Vec<_> = operations.iter().map(|&op| runner.apply(op)).collect();

    let violations: Vec<PropertyResult> = runner
        .check_invariants()
        .into_iter()
        .filter(|r| !r.holds)
        .collect();

    DstResult {
        passed: violations.is_empty(),
        violations,
        stats: runner.stats(),
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_without_faults() {
        let ops = [
            DstOp::Resize(3),
            DstOp::Push(1),
            DstOp::Push(2),
            DstOp::Push(3),
            DstOp::Push(4),
            DstOp::Pop,
            DstOp::Resize(1),
            DstOp::Pop,
            DstOp::Pop,
        ];

        let result = run_dst_scenario(12345, FaultConfig::none(), &ops);
        assert!(result.passed, "DST failed: {}", result.format());

        let outcomes: Vec<DstOutcome> = result.outcomes.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            outcomes,
            vec![
                DstOutcome::Resized,
                DstOutcome::Pushed,
                DstOutcome::Pushed,
                DstOutcome::Pushed,
                DstOutcome::Rejected(StackError::Full),
                DstOutcome::Popped(Some(3)),
                DstOutcome::Resized,
                DstOutcome::Popped(Some(1)),
                DstOutcome::Popped(None),
            ]
        );
    }

    #[test]
    fn test_invariants_hold_under_faults() {
        let mut ops = vec![DstOp::Resize(8)];
        for v in 1..=40 {
            ops.push(DstOp::Push(v));
            if v % 3 == 0 {
                ops.push(DstOp::Pop);
            }
            if v % 10 == 0 {
                ops.push(DstOp::Resize(v % 7 + 1));
            }
        }

        let result = run_dst_scenario(777, FaultConfig::aggressive(), &ops);
        assert!(result.passed, "DST failed: {}", result.format());
    }

    #[test]
    fn test_determinism() {
        let ops = [DstOp::Resize(2), DstOp::Push(1), DstOp::Push(2), DstOp::Pop];

        let result1 = run_dst_scenario(42, FaultConfig::aggressive(), &ops);
        let result2 = run_dst_scenario(42, FaultConfig::aggressive(), &ops);

        // Same seed = same faults = same stats
        assert_eq!(result1.stats, result2.stats);
        assert_eq!(result1.outcomes, result2.outcomes);
    }

    #[test]
    fn test_push_before_resize_rejected() {
        let result = run_dst_scenario(9, FaultConfig::none(), &[DstOp::Push(5), DstOp::Pop]);
        assert!(result.passed);
        assert_eq!(
            result.outcomes[0],
            Ok(DstOutcome::Rejected(StackError::Uninitialized))
        );
        assert_eq!(result.outcomes[1], Ok(DstOutcome::Popped(None)));
    }
}
