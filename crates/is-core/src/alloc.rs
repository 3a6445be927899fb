//! Buffer allocation for resize.
//!
//! Resize never grows the live buffer in place. It asks a
//! [`BufferAllocator`] for a fresh, empty buffer and copies into it, so an
//! allocation failure leaves the engine exactly as it was.

use std::mem::size_of;

use thiserror::Error;

/// Allocation of a stack buffer was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("failed to allocate buffer for {requested} elements")]
pub struct AllocError {
    /// Element count that was requested.
    pub requested: usize,
}

/// Source of backing storage for the stack.
///
/// Implementations return an empty `Vec` able to hold at least `capacity`
/// elements without reallocating.
pub trait BufferAllocator: Send + Sync {
    fn allocate(&self, capacity: usize) -> Result<Vec<i32>, AllocError>;
}

/// Allocates from the global allocator, reporting failure instead of aborting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl BufferAllocator for SystemAllocator {
    fn allocate(&self, capacity: usize) -> Result<Vec<i32>, AllocError> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| AllocError { requested: capacity })?;
        Ok(buffer)
    }
}

/// Refuses any buffer larger than `max_bytes`.
///
/// The server uses this to bound how much memory a single caller can make
/// the engine hold.
#[derive(Debug, Clone, Copy)]
pub struct BudgetAllocator {
    max_bytes: usize,
}

impl BudgetAllocator {
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Largest capacity this budget admits.
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.max_bytes / size_of::<i32>()
    }
}

impl BufferAllocator for BudgetAllocator {
    fn allocate(&self, capacity: usize) -> Result<Vec<i32>, AllocError> {
        let within_budget = capacity
            .checked_mul(size_of::<i32>())
            .is_some_and(|bytes| bytes <= self.max_bytes);
        if !within_budget {
            return Err(AllocError { requested: capacity });
        }
        SystemAllocator.allocate(capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_allocator_reserves_exact() {
        let buffer = SystemAllocator.allocate(16).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 16);
    }

    #[test]
    fn test_budget_allocator_limits() {
        let alloc = BudgetAllocator::new(40);
        assert_eq!(alloc.max_capacity(), 10);
        assert!(alloc.allocate(10).is_ok());
        assert_eq!(alloc.allocate(11), Err(AllocError { requested: 11 }));
        assert!(alloc.allocate(usize::MAX).is_err());
    }
}
