//! Randomized simulated-concurrent runs against the engine.
//!
//! The harness interleaves several simulated callers on one engine. After
//! every operation it compares the engine against the contract using the
//! pre-operation snapshot, and every `invariant_check_interval` operations
//! it runs the full property checker.

use is_core::{PropertyChecker, StackEngine, StackError, StackPropertyChecker, StackSnapshot, TrackedEngine};

use crate::alloc::FaultyAllocator;
use crate::env::DstEnv;
use crate::fault::FaultConfig;
use crate::fault_injection::DstOp;
use crate::scheduler::ScheduleDecision;

/// Configuration for DST test harness.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Number of simulated callers
    pub threads_count: usize,
    pub operations_per_thread: u64,
    /// Probability of context switch at yield points
    pub yield_probability: f64,
    /// Applies to buffer allocation during resize
    pub fault_config: FaultConfig,
    /// Check invariants after every N operations (0 = only at the end)
    pub invariant_check_interval: u64,
    /// Upper bound for generated resize capacities
    pub capacity_max: i32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            threads_count: 4,
            operations_per_thread: 100,
            yield_probability: 0.2,
            fault_config: FaultConfig::default(),
            invariant_check_interval: 10,
            capacity_max: 16,
        }
    }
}

impl HarnessConfig {
    /// Configuration for stress testing.
    #[must_use]
    pub fn stress() -> Self {
        Self {
            threads_count: 8,
            operations_per_thread: 1000,
            yield_probability: 0.3,
            fault_config: FaultConfig::aggressive(),
            invariant_check_interval: 100,
            capacity_max: 64,
        }
    }

    /// Configuration for quick testing.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            threads_count: 2,
            operations_per_thread: 50,
            yield_probability: 0.1,
            fault_config: FaultConfig::none(),
            invariant_check_interval: 10,
            capacity_max: 8,
        }
    }
}

/// Result of running the harness.
#[derive(Debug, Clone)]
pub struct HarnessResult {
    /// Seed used for reproduction
    pub seed: u64,
    pub operations_count: u64,
    pub context_switches_count: u64,
    /// Allocations refused during resize
    pub allocation_failures_count: u64,
    /// Operations that returned an error
    pub rejected_count: u64,
    pub invariant_checks_count: u64,
    pub all_invariants_held: bool,
    /// First violation (if any)
    pub first_violation: Option<String>,
}

impl HarnessResult {
    #[must_use]
    pub fn format(&self) -> String {
        let status = if self.all_invariants_held { "PASS" } else { "FAIL" };
        let mut result = format!(
            "[{}] DST_SEED={} ops={} switches={} alloc_failures={} rejected={} checks={}",
            status,
            self.seed,
            self.operations_count,
            self.context_switches_count,
            self.allocation_failures_count,
            self.rejected_count,
            self.invariant_checks_count
        );
        if let Some(ref violation) = self.first_violation {
            result.push_str(&format!("\n  Violation: {}", violation));
        }
        result
    }
}

/// DST harness for the stack engine.
///
/// Given the same seed and config, the same interleaving, values and
/// allocation failures are produced.
pub struct DstHarness {
    env: DstEnv,
    config: HarnessConfig,
    stack: TrackedEngine<FaultyAllocator>,
    next_value: i32,
    operations_count: u64,
    context_switches_count: u64,
    rejected_count: u64,
    invariant_checks_count: u64,
    violation: Option<String>,
}

impl DstHarness {
    #[must_use]
    pub fn new(seed: u64, config: HarnessConfig) -> Self {
        debug_assert!(seed != 0, "Seed should not be zero");
        debug_assert!(config.threads_count > 0, "Must have at least one thread");
        debug_assert!(
            config.threads_count <= 16,
            "Too many threads for DST: {}",
            config.threads_count
        );
        debug_assert!(config.capacity_max > 0, "capacity_max must be positive");

        let env = DstEnv::with_scheduler(
            seed,
            config.threads_count,
            config.yield_probability,
            FaultConfig::none(),
        );
        let allocator = FaultyAllocator::new(seed.wrapping_add(3), config.fault_config.clone());

        Self {
            env,
            config,
            stack: TrackedEngine::with_engine(StackEngine::with_allocator(allocator)),
            next_value: 1,
            operations_count: 0,
            context_switches_count: 0,
            rejected_count: 0,
            invariant_checks_count: 0,
            violation: None,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.env.seed()
    }

    pub fn stack(&self) -> &TrackedEngine<FaultyAllocator> {
        &self.stack
    }

    fn generate_op(&mut self) -> DstOp {
        let capacity_max = self.config.capacity_max;
        let rng = self.env.rng();
        match rng.gen_range(0..100_u32) {
            0..=49 => {
                let value = self.next_value;
                self.next_value += 1;
                DstOp::Push(value)
            }
            50..=84 => DstOp::Pop,
            85..=96 => DstOp::Resize(rng.gen_range(1..=capacity_max)),
            _ => DstOp::Resize(rng.gen_range(-2..=0)),
        }
    }

    /// Run one operation and hold its outcome to the contract.
    fn execute(&mut self, thread: usize, op: DstOp) -> Result<(), String> {
        let thread_id = thread as u64;
        let before = self.stack.engine().snapshot();

        let unchanged = |stack: &TrackedEngine<FaultyAllocator>, what: &str| -> Result<(), String> {
            let after = stack.engine().snapshot();
            if after == before {
                Ok(())
            } else {
                Err(format!("{} mutated state: {:?} -> {:?}", what, before, after))
            }
        };

        match op {
            DstOp::Push(value) => match self.stack.push_as(thread_id, value) {
                Ok(()) => {
                    let mut expected = before.contents.clone();
                    expected.push(value);
                    self.expect_contents(&expected, "push")
                }
                Err(StackError::Full) => {
                    self.rejected_count += 1;
                    if before.capacity != Some(before.contents.len()) {
                        return Err(format!("push({}) reported Full on {:?}", value, before));
                    }
                    unchanged(&self.stack, "rejected push")
                }
                Err(StackError::Uninitialized) => {
                    self.rejected_count += 1;
                    if before.capacity.is_some() {
                        return Err(format!("push({}) reported Uninitialized on {:?}", value, before));
                    }
                    unchanged(&self.stack, "rejected push")
                }
                Err(e) => Err(format!("push({}) returned unexpected {:?}", value, e)),
            },
            DstOp::Pop => {
                let popped = self.stack.pop_as(thread_id);
                let top = before.contents.last().copied();
                if popped != top {
                    return Err(format!("pop returned {:?}, top was {:?}", popped, top));
                }
                let expected = &before.contents[..before.contents.len().saturating_sub(1)];
                self.expect_contents(expected, "pop")
            }
            DstOp::Resize(capacity) => match self.stack.resize_as(thread_id, capacity) {
                Ok(()) => {
                    let keep = usize::try_from(capacity)
                        .map_err(|_| format!("resize({}) accepted a non-positive capacity", capacity))?
                        .min(before.contents.len());
                    self.expect_contents(&before.contents[..keep], "resize")
                }
                Err(StackError::InvalidArgument) if capacity <= 0 => {
                    self.rejected_count += 1;
                    unchanged(&self.stack, "invalid resize")
                }
                Err(StackError::ResourceExhausted) => {
                    self.rejected_count += 1;
                    unchanged(&self.stack, "failed resize")
                }
                Err(e) => Err(format!("resize({}) returned unexpected {:?}", capacity, e)),
            },
        }
    }

    fn expect_contents(&self, expected: &[i32], what: &str) -> Result<(), String> {
        let StackSnapshot { contents, .. } = self.stack.engine().snapshot();
        if contents == expected {
            Ok(())
        } else {
            Err(format!("after {}: stack holds {:?}, expected {:?}", what, contents, expected))
        }
    }

    fn check_invariants(&mut self) -> Result<(), String> {
        self.invariant_checks_count += 1;
        let checker = StackPropertyChecker::new(&self.stack).with_seed(self.env.seed());
        match checker.violations().into_iter().next() {
            None => Ok(()),
            Some(violation) => Err(violation.to_string()),
        }
    }

    /// Run the simulated concurrent workload.
    pub fn run(&mut self) -> HarnessResult {
        let threads_count = self.config.threads_count;
        let ops_per_thread = self.config.operations_per_thread;
        let mut thread_steps: Vec<u64> = vec![0; threads_count];

        while self.violation.is_none() {
            let current = self.env.scheduler().map_or(0, |s| s.current_thread());

            if thread_steps[current] >= ops_per_thread {
                if thread_steps.iter().all(|&s| s >= ops_per_thread) {
                    break;
                }
                if let Some(scheduler) = self.env.scheduler() {
                    scheduler.force_switch();
                }
                continue;
            }

            let op = self.generate_op();
            if let Err(e) = self.execute(current, op) {
                self.violation = Some(format!("Thread {}: {:?}: {}", current, op, e));
                break;
            }
            self.operations_count += 1;
            thread_steps[current] += 1;

            let interval = self.config.invariant_check_interval;
            if interval > 0 && self.operations_count % interval == 0 {
                if let Err(e) = self.check_invariants() {
                    self.violation = Some(e);
                    break;
                }
            }

            self.env.maybe_delay();
            if let Some(ScheduleDecision::Switch(_)) = self.env.scheduler().map(|s| s.decide()) {
                self.context_switches_count += 1;
            }
        }

        if self.violation.is_none() {
            if let Err(e) = self.check_invariants() {
                self.violation = Some(e);
            }
        }

        self.build_result()
    }

    fn build_result(&self) -> HarnessResult {
        HarnessResult {
            seed: self.env.seed(),
            operations_count: self.operations_count,
            context_switches_count: self.context_switches_count,
            allocation_failures_count: self.stack.engine().allocator().stats().faults_count,
            rejected_count: self.rejected_count,
            invariant_checks_count: self.invariant_checks_count,
            all_invariants_held: self.violation.is_none(),
            first_violation: self.violation.clone(),
        }
    }
}
