//! Engine wrapper that records every operation for property checking.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::alloc::{BufferAllocator, SystemAllocator};
use crate::engine::StackEngine;
use crate::error::StackError;
use crate::invariants::{StackHistory, StackProperties};

/// Tracking state for property verification.
#[derive(Debug, Default)]
struct StackTracker {
    pushed: HashSet<i32>,
    popped: HashSet<i32>,
    discarded: HashSet<i32>,
    history: StackHistory,
    step: u64,
}

impl StackTracker {
    fn next_step(&mut self) -> u64 {
        self.step += 1;
        self.step
    }
}

/// A [`StackEngine`] whose operations are recorded in linearization order.
///
/// The tracker lock is held across each engine call, so the recorded
/// history matches the order in which the engine lock was taken.
pub struct TrackedEngine<A = SystemAllocator> {
    engine: StackEngine<A>,
    tracker: Mutex<StackTracker>,
}

impl TrackedEngine<SystemAllocator> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(StackEngine::new())
    }
}

impl Default for TrackedEngine<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: BufferAllocator> TrackedEngine<A> {
    #[must_use]
    pub fn with_engine(engine: StackEngine<A>) -> Self {
        Self {
            engine,
            tracker: Mutex::new(StackTracker::default()),
        }
    }

    pub fn engine(&self) -> &StackEngine<A> {
        &self.engine
    }

    fn tracker(&self) -> MutexGuard<'_, StackTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, value: i32) -> Result<(), StackError> {
        self.push_as(0, value)
    }

    pub fn pop(&self) -> Option<i32> {
        self.pop_as(0)
    }

    pub fn resize(&self, new_capacity: i32) -> Result<(), StackError> {
        self.resize_as(0, new_capacity)
    }

    /// Push on behalf of caller `thread_id`.
    pub fn push_as(&self, thread_id: u64, value: i32) -> Result<(), StackError> {
        let mut tracker = self.tracker();
        let result = self.engine.push(value);
        match result {
            Ok(()) => {
                debug_assert!(
                    !tracker.pushed.contains(&value),
                    "tracked values must be unique"
                );
                tracker.pushed.insert(value);
                let step = tracker.next_step();
                tracker.history.record_push(thread_id, value, step);
            }
            Err(StackError::Full) => {
                let step = tracker.next_step();
                tracker.history.record_push_full(thread_id, value, step);
            }
            Err(_) => {}
        }
        result
    }

    /// Pop on behalf of caller `thread_id`.
    pub fn pop_as(&self, thread_id: u64) -> Option<i32> {
        let mut tracker = self.tracker();
        let value = self.engine.pop();
        if let Some(v) = value {
            tracker.popped.insert(v);
        }
        let step = tracker.next_step();
        tracker.history.record_pop(thread_id, value, step);
        value
    }

    /// Resize on behalf of caller `thread_id`, recording discarded elements.
    pub fn resize_as(&self, thread_id: u64, new_capacity: i32) -> Result<(), StackError> {
        let mut tracker = self.tracker();
        let before = self.engine.snapshot().contents;
        self.engine.resize(new_capacity)?;

        let capacity = self.engine.capacity().unwrap_or_default();
        if before.len() > capacity {
            tracker.discarded.extend(before[capacity..].iter().copied());
        }
        let step = tracker.next_step();
        tracker.history.record_resize(thread_id, capacity, step);
        Ok(())
    }
}

impl<A: BufferAllocator> StackProperties for TrackedEngine<A> {
    fn pushed_elements(&self) -> HashSet<i32> {
        self.tracker().pushed.clone()
    }

    fn popped_elements(&self) -> HashSet<i32> {
        self.tracker().popped.clone()
    }

    fn discarded_elements(&self) -> HashSet<i32> {
        self.tracker().discarded.clone()
    }

    fn current_contents(&self) -> Vec<i32> {
        self.engine.snapshot().contents
    }

    fn current_capacity(&self) -> Option<usize> {
        self.engine.capacity()
    }

    fn history(&self) -> StackHistory {
        self.tracker().history.clone()
    }
}
