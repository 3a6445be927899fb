//! # is-core
//!
//! The shared integer stack engine.
//!
//! This crate provides:
//! - `StackEngine`: one capacity-bounded LIFO of `i32` behind a single lock
//! - `StackError`: the error taxonomy surfaced to every caller
//! - `BufferAllocator`: the seam through which resize obtains storage
//! - `StackPropertyChecker` and `TrackedEngine` for verifying invariants
//!
//! ## Lifecycle
//!
//! The engine starts uninitialized. The first successful `resize` bounds it;
//! later resizes may grow or shrink it. Shrinking keeps the oldest elements
//! and discards the most recently pushed ones.

pub mod alloc;
pub mod engine;
pub mod error;
pub mod invariants;
pub mod property;
pub mod tracked;

pub use alloc::{AllocError, BudgetAllocator, BufferAllocator, SystemAllocator};
pub use engine::{StackEngine, StackSnapshot};
pub use error::StackError;
pub use invariants::{StackHistory, StackOpType, StackOperation, StackProperties, StackPropertyChecker};
pub use property::{PropertyChecker, PropertyResult};
pub use tracked::TrackedEngine;
