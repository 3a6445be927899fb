//! Stack invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | NoLostElements | Every pushed element is held, was popped, or was discarded by a shrink |
//! | NoDuplicates | No element is held twice or both held and popped |
//! | LIFO_Order | Replaying the history against a model reproduces every result |
//! | BoundedCapacity | `count <= capacity`, and nothing is held while uninitialized |

use std::collections::HashSet;

use crate::property::{PropertyChecker, PropertyResult};

/// Properties that any implementation of the stack contract must expose.
///
/// The checker verifies invariants against this state.
pub trait StackProperties {
    /// Set of all elements that were successfully pushed.
    fn pushed_elements(&self) -> HashSet<i32>;

    /// Set of all elements returned by pop.
    fn popped_elements(&self) -> HashSet<i32>;

    /// Set of all elements dropped by a shrinking resize.
    fn discarded_elements(&self) -> HashSet<i32>;

    /// Current contents, bottom to top.
    fn current_contents(&self) -> Vec<i32>;

    /// Current capacity, `None` while uninitialized.
    fn current_capacity(&self) -> Option<usize>;

    /// Operation history in linearization order.
    fn history(&self) -> StackHistory;
}

/// History of stack operations for order checking.
#[derive(Debug, Clone, Default)]
pub struct StackHistory {
    /// Sequence of operations in linearization order
    pub operations: Vec<StackOperation>,
}

/// A single stack operation.
#[derive(Debug, Clone)]
pub struct StackOperation {
    /// Caller that performed the operation
    pub thread_id: u64,
    pub op_type: StackOpType,
    /// Value pushed, or value returned by pop
    pub element: Option<i32>,
    /// New capacity for a resize
    pub capacity: Option<usize>,
    /// Step number for ordering
    pub step: u64,
}

/// Type of stack operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOpType {
    Push,
    PushFull,
    Pop,
    PopEmpty,
    Resize,
}

impl StackHistory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    fn record(&mut self, thread_id: u64, op_type: StackOpType, element: Option<i32>, capacity: Option<usize>, step: u64) {
        debug_assert!(step > 0, "Step must be positive");
        debug_assert!(
            self.operations.last().map_or(true, |op| op.step < step),
            "Steps must increase"
        );
        self.operations.push(StackOperation {
            thread_id,
            op_type,
            element,
            capacity,
            step,
        });
    }

    /// Record a successful push.
    pub fn record_push(&mut self, thread_id: u64, element: i32, step: u64) {
        self.record(thread_id, StackOpType::Push, Some(element), None, step);
    }

    /// Record a push refused because the stack was full.
    pub fn record_push_full(&mut self, thread_id: u64, element: i32, step: u64) {
        self.record(thread_id, StackOpType::PushFull, Some(element), None, step);
    }

    /// Record a pop and its result.
    pub fn record_pop(&mut self, thread_id: u64, element: Option<i32>, step: u64) {
        let op_type = if element.is_some() {
            StackOpType::Pop
        } else {
            StackOpType::PopEmpty
        };
        self.record(thread_id, op_type, element, None, step);
    }

    /// Record a successful resize.
    pub fn record_resize(&mut self, thread_id: u64, capacity: usize, step: u64) {
        debug_assert!(capacity > 0, "Resize capacity must be positive");
        self.record(thread_id, StackOpType::Resize, None, Some(capacity), step);
    }
}

/// Property checker for stack implementations.
pub struct StackPropertyChecker<'a, T: StackProperties> {
    stack: &'a T,
    dst_seed: Option<u64>,
}

impl<'a, T: StackProperties> StackPropertyChecker<'a, T> {
    #[must_use]
    pub fn new(stack: &'a T) -> Self {
        Self {
            stack,
            dst_seed: None,
        }
    }

    /// Set DST seed so violations name the run to reproduce.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        debug_assert!(seed != 0, "DST seed should not be zero");
        self.dst_seed = Some(seed);
        self
    }

    fn fail(&self, name: &'static str, message: String) -> PropertyResult {
        match self.dst_seed {
            Some(seed) => PropertyResult::fail(name, format!("{} (DST_SEED={})", message, seed)),
            None => PropertyResult::fail(name, message),
        }
    }

    /// Every element that was pushed must be in the stack, have been
    /// popped, or have been discarded by a shrinking resize.
    fn check_no_lost_elements(&self) -> PropertyResult {
        let pushed = self.stack.pushed_elements();
        let popped = self.stack.popped_elements();
        let discarded = self.stack.discarded_elements();
        let contents: HashSet<i32> = self.stack.current_contents().into_iter().collect();

        let mut lost: Vec<i32> = pushed
            .iter()
            .filter(|e| !contents.contains(e) && !popped.contains(e) && !discarded.contains(e))
            .copied()
            .collect();
        lost.sort_unstable();

        match lost.first() {
            None => PropertyResult::pass("NoLostElements"),
            Some(element) => self.fail(
                "NoLostElements",
                format!(
                    "Element {} was pushed but is neither held, popped, nor discarded ({} lost)",
                    element,
                    lost.len()
                ),
            ),
        }
    }

    fn check_no_duplicates(&self) -> PropertyResult {
        let contents = self.stack.current_contents();
        let mut seen = HashSet::new();
        for element in &contents {
            if !seen.insert(*element) {
                return self.fail(
                    "NoDuplicates",
                    format!("Element {} appears multiple times in stack", element),
                );
            }
        }

        let popped = self.stack.popped_elements();
        if let Some(element) = contents.iter().find(|e| popped.contains(e)) {
            return self.fail(
                "NoDuplicates",
                format!("Element {} was popped but is still in stack", element),
            );
        }

        PropertyResult::pass("NoDuplicates")
    }

    /// Replays the history against a model stack. Resize truncates the
    /// model to its oldest elements, matching the engine's shrink policy.
    fn check_lifo_order(&self) -> PropertyResult {
        let history = self.stack.history();
        if history.operations.is_empty() {
            return PropertyResult::pass("LIFO_Order");
        }

        let mut model: Vec<i32> = Vec::new();
        let mut capacity: Option<usize> = None;

        for op in &history.operations {
            match op.op_type {
                StackOpType::Push => {
                    if let Some(e) = op.element {
                        model.push(e);
                    }
                }
                StackOpType::PushFull => {
                    if capacity != Some(model.len()) {
                        return self.fail(
                            "LIFO_Order",
                            format!(
                                "push refused as full but model holds {} of {:?} (step {})",
                                model.len(),
                                capacity,
                                op.step
                            ),
                        );
                    }
                }
                StackOpType::Pop => {
                    let expected = model.pop();
                    if expected != op.element {
                        return self.fail(
                            "LIFO_Order",
                            format!(
                                "pop returned {:?} but model expected {:?} (step {})",
                                op.element, expected, op.step
                            ),
                        );
                    }
                }
                StackOpType::PopEmpty => {
                    if !model.is_empty() {
                        return self.fail(
                            "LIFO_Order",
                            format!(
                                "pop returned None but model has {} elements (step {})",
                                model.len(),
                                op.step
                            ),
                        );
                    }
                }
                StackOpType::Resize => {
                    if let Some(c) = op.capacity {
                        model.truncate(c);
                        capacity = Some(c);
                    }
                }
            }
        }

        let contents = self.stack.current_contents();
        if contents != model {
            return self.fail(
                "LIFO_Order",
                format!("stack holds {:?} but model holds {:?}", contents, model),
            );
        }

        PropertyResult::pass("LIFO_Order")
    }

    fn check_bounded_capacity(&self) -> PropertyResult {
        let count = self.stack.current_contents().len();
        match self.stack.current_capacity() {
            None if count > 0 => self.fail(
                "BoundedCapacity",
                format!("uninitialized stack holds {} elements", count),
            ),
            Some(capacity) if count > capacity => self.fail(
                "BoundedCapacity",
                format!("stack holds {} elements with capacity {}", count, capacity),
            ),
            _ => PropertyResult::pass("BoundedCapacity"),
        }
    }
}

impl<T: StackProperties> PropertyChecker for StackPropertyChecker<'_, T> {
    fn check_all(&self) -> Vec<PropertyResult> {
        vec![
            self.check_no_lost_elements(),
            self.check_no_duplicates(),
            self.check_lifo_order(),
            self.check_bounded_capacity(),
        ]
    }
}
