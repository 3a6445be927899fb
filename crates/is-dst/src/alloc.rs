//! Allocation failures on a deterministic schedule.

use std::sync::{Mutex, PoisonError};

use is_core::{AllocError, BufferAllocator, SystemAllocator};

use crate::fault::{FaultConfig, FaultInjector, FaultStats};
use crate::random::DeterministicRng;

/// A [`BufferAllocator`] that refuses allocations when its injector fires.
///
/// The engine under test is unchanged; only its allocator is swapped.
pub struct FaultyAllocator {
    injector: Mutex<FaultInjector>,
}

impl FaultyAllocator {
    #[must_use]
    pub fn new(seed: u64, config: FaultConfig) -> Self {
        Self {
            injector: Mutex::new(FaultInjector::new(DeterministicRng::new(seed), config)),
        }
    }

    #[must_use]
    pub fn stats(&self) -> FaultStats {
        self.injector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats()
            .clone()
    }
}

impl BufferAllocator for FaultyAllocator {
    fn allocate(&self, capacity: usize) -> Result<Vec<i32>, AllocError> {
        let fail = self
            .injector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .should_fail();
        if fail {
            return Err(AllocError { requested: capacity });
        }
        SystemAllocator.allocate(capacity)
    }
}
