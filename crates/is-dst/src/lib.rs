//! # is-dst
//!
//! Deterministic Simulation Testing for the shared integer stack.
//!
//! All randomness, simulated scheduling and fault injection derive from a
//! single seed, so any failing run can be replayed exactly.
//!
//! ## Components
//!
//! - `fault_injection`: scripted scenarios with faults at operation boundaries
//! - `harness`: randomized simulated-concurrent runs with periodic invariant checks
//! - `alloc`: a buffer allocator that fails on the injector's schedule
//!
//! ## Usage
//!
//! ```rust
//! use is_dst::DstEnv;
//!
//! let mut env = DstEnv::new(12345);
//! let choice = env.rng().gen_range(0..10);
//! assert!(choice < 10);
//! if env.fault().should_fail() {
//!     // Simulate failure
//! }
//! ```
//!
//! ## Reproducibility
//!
//! ```bash
//! DST_SEED=12345 cargo test -p is-dst
//! ```

pub mod alloc;
pub mod env;
pub mod fault;
pub mod fault_injection;
pub mod harness;
pub mod random;
pub mod scheduler;

pub use alloc::FaultyAllocator;
pub use env::DstEnv;
pub use fault::{FaultConfig, FaultInjector, FaultStats};
pub use fault_injection::{run_dst_scenario, DstOp, DstOutcome, DstResult, DstRunner, DstStats, FaultPoint, FaultType};
pub use harness::{DstHarness, HarnessConfig, HarnessResult};
pub use random::DeterministicRng;
pub use scheduler::{ScheduleDecision, Scheduler};

/// Get DST seed from environment or generate random one.
///
/// Prints the seed for reproduction. Use `DST_SEED=<seed>` to reproduce.
/// An unparseable `DST_SEED` falls back to a random seed with a warning.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    let from_env = std::env::var("DST_SEED").ok().and_then(|s| match s.parse::<u64>() {
        Ok(seed) if seed != 0 => Some(seed),
        _ => {
            tracing::warn!(value = %s, "ignoring invalid DST_SEED");
            None
        }
    });

    match from_env {
        Some(seed) => {
            println!("DST_SEED={} (from environment)", seed);
            seed
        }
        None => {
            let seed = rand::random::<u64>().max(1);
            println!("DST_SEED={} (randomly generated)", seed);
            seed
        }
    }
}
