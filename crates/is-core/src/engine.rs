//! The stack engine.
//!
//! # State Machine
//!
//! ```text
//! Uninitialized ──resize(c)──> Bounded(c) ──resize(c')──> Bounded(c')
//!        │                          │
//!        └────────── drop ──────────┴──> Destroyed
//! ```
//!
//! # Invariants
//!
//! | Property | Holds |
//! |----------|-------|
//! | Uninitialized implies `count == 0` | push is refused until resize |
//! | `0 <= count <= capacity` | push checks `count == capacity` |
//! | Positions ordered by push time | only the top is added or removed |
//! | One lock guards `(buffer, capacity, count)` | every operation locks once |
//!
//! # Resize Policy
//!
//! Shrinking below `count` keeps the OLDEST `capacity` elements (positions
//! `0..capacity`) and discards the most recently pushed ones.

#[cfg(loom)]
use loom::sync::{Mutex, MutexGuard};
#[cfg(not(loom))]
use std::sync::{Mutex, MutexGuard};

use std::sync::PoisonError;

use tracing::{debug, trace};

use crate::alloc::{BufferAllocator, SystemAllocator};
use crate::error::StackError;

/// State guarded by the engine lock. `count` is `buffer.len()`.
#[derive(Debug, Default)]
struct StackState {
    /// Absent while uninitialized.
    buffer: Option<Vec<i32>>,
    capacity: usize,
}

impl StackState {
    fn len(&self) -> usize {
        self.buffer.as_ref().map_or(0, Vec::len)
    }
}

/// Point-in-time copy of the engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSnapshot {
    /// `None` while uninitialized.
    pub capacity: Option<usize>,
    /// Bottom (oldest) to top (newest).
    pub contents: Vec<i32>,
}

/// A capacity-bounded stack of `i32` shared by concurrent callers.
///
/// All mutation passes through a single exclusive lock; each operation
/// takes it once for its whole critical section, so operations are
/// linearizable in lock acquisition order. No operation waits for space
/// or data: push on full and pop on empty return immediately.
pub struct StackEngine<A = SystemAllocator> {
    state: Mutex<StackState>,
    allocator: A,
}

impl StackEngine<SystemAllocator> {
    /// Create an uninitialized engine backed by the global allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_allocator(SystemAllocator)
    }
}

impl Default for StackEngine<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: BufferAllocator> StackEngine<A> {
    /// Create an uninitialized engine that obtains buffers from `allocator`.
    #[must_use]
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            state: Mutex::new(StackState::default()),
            allocator,
        }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    // Every critical section leaves the state consistent before anything
    // that could unwind, so a poisoned lock still guards a valid stack.
    fn lock(&self) -> MutexGuard<'_, StackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push `value` on top.
    ///
    /// # Errors
    ///
    /// - `Uninitialized` if no capacity has ever been set
    /// - `Full` if `count == capacity`; nothing is added
    pub fn push(&self, value: i32) -> Result<(), StackError> {
        let mut state = self.lock();
        let capacity = state.capacity;
        let Some(buffer) = state.buffer.as_mut() else {
            return Err(StackError::Uninitialized);
        };
        if buffer.len() >= capacity {
            trace!(value, capacity, "push refused: stack full");
            return Err(StackError::Full);
        }
        buffer.push(value);
        debug_assert!(buffer.len() <= capacity);
        Ok(())
    }

    /// Remove and return the top element.
    ///
    /// Returns `None` when the stack is empty, including while
    /// uninitialized. Empty is a normal outcome, not a failure.
    pub fn pop(&self) -> Option<i32> {
        self.lock().buffer.as_mut().and_then(Vec::pop)
    }

    /// Pop every element under one lock acquisition, newest first.
    pub fn unwind(&self) -> Vec<i32> {
        let mut state = self.lock();
        match state.buffer.as_mut() {
            Some(buffer) => buffer.drain(..).rev().collect(),
            None => Vec::new(),
        }
    }

    /// Set the capacity to `new_capacity`.
    ///
    /// A fresh buffer is allocated and the oldest `min(count, new_capacity)`
    /// elements are copied into it in order. The old buffer is released
    /// only after the copy, and only then is the new one installed.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `new_capacity <= 0`
    /// - `ResourceExhausted` if the buffer cannot be allocated; the
    ///   engine is left exactly as it was
    pub fn resize(&self, new_capacity: i32) -> Result<(), StackError> {
        let capacity = usize::try_from(new_capacity)
            .ok()
            .filter(|&c| c > 0)
            .ok_or(StackError::InvalidArgument)?;

        let mut state = self.lock();
        let mut fresh = self.allocator.allocate(capacity).map_err(|e| {
            debug!(requested = e.requested, "resize allocation failed");
            StackError::ResourceExhausted
        })?;

        // Drop anything the allocator left in the buffer.
        fresh.clear();
        let count = state.len();
        let keep = count.min(capacity);
        if let Some(old) = state.buffer.as_ref() {
            fresh.extend_from_slice(&old[..keep]);
        }

        // Old buffer is dropped here, after the copy.
        state.buffer = Some(fresh);
        state.capacity = capacity;

        debug!(
            capacity,
            kept = keep,
            discarded = count - keep,
            "stack resized"
        );
        Ok(())
    }

    /// Number of elements held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current capacity, or `None` while uninitialized.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        let state = self.lock();
        state.buffer.as_ref().map(|_| state.capacity)
    }

    /// Copy of the full state, taken under the lock.
    #[must_use]
    pub fn snapshot(&self) -> StackSnapshot {
        let state = self.lock();
        StackSnapshot {
            capacity: state.buffer.as_ref().map(|_| state.capacity),
            contents: state.buffer.clone().unwrap_or_default(),
        }
    }
}

impl<A> Drop for StackEngine<A> {
    fn drop(&mut self) {
        #[cfg(not(loom))]
        {
            let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
            debug!(
                capacity = state.capacity,
                count = state.len(),
                "stack engine destroyed"
            );
        }
    }
}


/// Loom tests - these exhaustively check all interleavings
#[cfg(loom)]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    #[test]
    fn test_push_push() {
        loom::model(|| {
            let stack = Arc::new(StackEngine::new());
            stack.resize(2).unwrap();

            let s1 = Arc::clone(&stack);
            let s2 = Arc::clone(&stack);
            let h1 = thread::spawn(move || s1.push(1));
            let h2 = thread::spawn(move || s2.push(2));

            assert!(h1.join().unwrap().is_ok());
            assert!(h2.join().unwrap().is_ok());

            let mut values = stack.unwind();
            values.sort_unstable();
            assert_eq!(values, vec![1, 2]);
        });
    }

    #[test]
    fn test_push_on_last_slot() {
        loom::model(|| {
            let stack = Arc::new(StackEngine::new());
            stack.resize(1).unwrap();

            let s1 = Arc::clone(&stack);
            let s2 = Arc::clone(&stack);
            let h1 = thread::spawn(move || s1.push(1));
            let h2 = thread::spawn(move || s2.push(2));

            let results = [h1.join().unwrap(), h2.join().unwrap()];
            let full = results.iter().filter(|r| **r == Err(StackError::Full)).count();
            assert_eq!(full, 1, "exactly one push must win the slot");
            assert_eq!(stack.len(), 1);
        });
    }

    #[test]
    fn test_concurrent_pop() {
        loom::model(|| {
            let stack = Arc::new(StackEngine::new());
            stack.resize(1).unwrap();
            stack.push(1).unwrap();

            let s1 = Arc::clone(&stack);
            let s2 = Arc::clone(&stack);
            let h1 = thread::spawn(move || s1.pop());
            let h2 = thread::spawn(move || s2.pop());

            match (h1.join().unwrap(), h2.join().unwrap()) {
                (Some(1), None) | (None, Some(1)) => {}
                other => panic!("Unexpected result: {:?}", other),
            }
        });
    }

    #[test]
    fn test_resize_during_push() {
        loom::model(|| {
            let stack = Arc::new(StackEngine::new());
            stack.resize(2).unwrap();
            stack.push(1).unwrap();

            let s1 = Arc::clone(&stack);
            let s2 = Arc::clone(&stack);
            let h1 = thread::spawn(move || s1.push(2));
            let h2 = thread::spawn(move || s2.resize(1));

            let pushed = h1.join().unwrap();
            h2.join().unwrap().unwrap();

            // Oldest element always survives the shrink.
            let contents = stack.snapshot().contents;
            assert_eq!(contents, vec![1]);
            // Push either landed before the shrink or found the stack full.
            assert!(pushed.is_ok() || pushed == Err(StackError::Full));
        });
    }
}
