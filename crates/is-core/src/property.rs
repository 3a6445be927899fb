//! Property results and the checker trait.

use std::fmt;

/// Outcome of checking one named invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyResult {
    /// Invariant name, e.g. `NoLostElements`.
    pub name: &'static str,
    /// Whether the invariant held.
    pub holds: bool,
    /// Description of the violation, if any.
    pub violation: Option<String>,
}

impl PropertyResult {
    #[must_use]
    pub fn pass(name: &'static str) -> Self {
        Self {
            name,
            holds: true,
            violation: None,
        }
    }

    #[must_use]
    pub fn fail(name: &'static str, violation: impl Into<String>) -> Self {
        Self {
            name,
            holds: false,
            violation: Some(violation.into()),
        }
    }
}

impl fmt::Display for PropertyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.violation {
            None => write!(f, "[PASS] {}", self.name),
            Some(v) => write!(f, "[FAIL] {}: {}", self.name, v),
        }
    }
}

/// Something that can evaluate a set of invariants.
pub trait PropertyChecker {
    fn check_all(&self) -> Vec<PropertyResult>;

    /// True if every invariant holds.
    fn all_hold(&self) -> bool {
        self.check_all().iter().all(|r| r.holds)
    }

    /// Only the failing results.
    fn violations(&self) -> Vec<PropertyResult> {
        self.check_all().into_iter().filter(|r| !r.holds).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PropertyResult::pass("NoDuplicates").to_string(), "[PASS] NoDuplicates");
        assert_eq!(
            PropertyResult::fail("LIFO_Order", "pop returned 3").to_string(),
            "[FAIL] LIFO_Order: pop returned 3"
        );
    }
}
