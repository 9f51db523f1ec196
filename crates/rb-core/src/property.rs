//! Property results and the checker trait.

use std::fmt;

use crate::counterexample::Counterexample;

/// Outcome of checking a single named invariant.
#[derive(Debug, Clone)]
pub struct PropertyResult {
    /// Invariant name, e.g. `NoLostMessages`
    pub name: &'static str,
    /// Whether the invariant held
    pub holds: bool,
    /// Human-readable description of the violation
    pub violation: Option<String>,
    /// Failure path, when the checker could build one
    pub counterexample: Option<Counterexample>,
}

impl PropertyResult {
    /// A passing result.
    #[must_use]
    pub fn pass(name: &'static str) -> Self {
        Self {
            name,
            holds: true,
            violation: None,
            counterexample: None,
        }
    }

    /// A failing result with a violation message.
    #[must_use]
    pub fn fail(
        name: &'static str,
        violation: impl Into<String>,
        counterexample: Option<Counterexample>,
    ) -> Self {
        let violation = violation.into();
        debug_assert!(!violation.is_empty(), "violation message must not be empty");
        Self {
            name,
            holds: false,
            violation: Some(violation),
            counterexample,
        }
    }

    /// One-line status, `[PASS] Name` or `[FAIL] Name: reason`.
    #[must_use]
    pub fn format_status(&self) -> String {
        match &self.violation {
            None => format!("[PASS] {}", self.name),
            Some(violation) => format!("[FAIL] {}: {}", self.name, violation),
        }
    }
}

impl fmt::Display for PropertyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_status())?;
        if let Some(ce) = &self.counterexample {
            write!(f, "\n{}", ce.render_diagram())?;
        }
        Ok(())
    }
}

/// Something that can check a set of invariants.
pub trait PropertyChecker {
    /// Check every invariant and return one result per invariant.
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

    struct Fixed(Vec<PropertyResult>);

    impl PropertyChecker for Fixed {
        fn check_all(&self) -> Vec<PropertyResult> {
            self.0.clone()
        }
    }

    #[test]
    fn test_format_status() {
        assert_eq!(
            PropertyResult::pass("BoundedCapacity").format_status(),
            "[PASS] BoundedCapacity"
        );

        let failed = PropertyResult::fail("NoDuplicates", "message 7 seen twice", None);
        assert_eq!(failed.format_status(), "[FAIL] NoDuplicates: message 7 seen twice");
    }

    #[test]
    fn test_checker_defaults() {
        let checker = Fixed(vec![
            PropertyResult::pass("A"),
            PropertyResult::fail("B", "broken", None),
        ]);

        assert!(!checker.all_hold());
        let violations = checker.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].name, "B");

        assert!(Fixed(vec![PropertyResult::pass("A")]).all_hold());
    }
}
