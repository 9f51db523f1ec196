//! Failure traces for ring buffer runs.
//!
//! A [`Counterexample`] holds the producer and consumer calls leading up to
//! a violation, plus optional buffer snapshots, and renders them side by side.

use std::fmt;

/// Which side of the SPSC hand-off performed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => f.pad("Producer"),
            Role::Consumer => f.pad("Consumer"),
        }
    }
}

/// Calls and snapshots leading up to a violation.
#[derive(Debug, Clone, Default)]
pub struct Counterexample {
    /// Buffer snapshots keyed by step.
    pub states: Vec<StateSnapshot>,
    pub actions: Vec<RoleAction>,
    /// Seed that replays the run, when it came from DST.
    pub dst_seed: Option<u64>,
    pub description: Option<String>,
}

/// Snapshot of buffer state at a point in time.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub step: u64,
    /// One-line summary shown in the diagram, e.g. `count=2`.
    pub description: String,
    /// Named values captured at this step.
    pub variables: Vec<(String, String)>,
}

/// Action taken by the producer or the consumer.
#[derive(Debug, Clone)]
pub struct RoleAction {
    pub role: Role,
    pub step: u64,
    /// e.g. `enqueue(7)`, `dequeue() -> 3`
    pub action: String,
    pub success: bool,
}

impl Counterexample {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counterexample carrying a DST seed for reproduction.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        debug_assert!(seed != 0, "DST seed should not be zero");
        Self {
            dst_seed: Some(seed),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a state snapshot. Steps must be strictly increasing.
    pub fn add_state(&mut self, state: StateSnapshot) {
        debug_assert!(
            self.states.last().map_or(true, |last| state.step > last.step),
            "snapshot steps must increase"
        );
        self.states.push(state);
    }

    pub fn add_action(&mut self, action: RoleAction) {
        self.actions.push(action);
    }

    /// Render as a two-column producer/consumer diagram.
    ///
    /// Only steps that recorded an action get a row, so a trace holding the
    /// tail of a long run stays short.
    ///
    /// ```text
    /// DST_SEED=12345
    ///
    /// Step | Producer             | Consumer             | State
    /// -----|----------------------|----------------------|------
    ///    1 | enqueue(1)           |                      | count=1
    ///    2 |                      | dequeue() -> 1       | count=0
    ///    3 | enqueue(2) [FAIL]    |                      |
    /// ```
    #[must_use]
    pub fn render_diagram(&self) -> String {
        const COLUMN_WIDTH: usize = 20;

        let mut output = String::new();

        if let Some(seed) = self.dst_seed {
            output.push_str(&format!("DST_SEED={}\n\n", seed));
        }
        if let Some(failure) = &self.description {
            output.push_str(&format!("Failure: {}\n\n", failure));
        }

        if self.actions.is_empty() {
            output.push_str("(no actions recorded)\n");
            return output;
        }

        output.push_str(&format!(
            "Step | {:<w$} | {:<w$} | State\n",
            Role::Producer,
            Role::Consumer,
            w = COLUMN_WIDTH
        ));
        output.push_str(&format!(
            "-----|-{}-|-{}-|------\n",
            "-".repeat(COLUMN_WIDTH),
            "-".repeat(COLUMN_WIDTH)
        ));

        let mut steps: Vec<u64> = self.actions.iter().map(|a| a.step).collect();
        steps.sort_unstable();
        steps.dedup();

        for step in steps {
            let cell = |role: Role| -> String {
                self.actions
                    .iter()
                    .find(|a| a.step == step && a.role == role)
                    .map(|a| {
                        if a.success {
                            a.action.clone()
                        } else {
                            format!("{} [FAIL]", a.action)
                        }
                    })
                    .unwrap_or_default()
            };

            let state = self
                .states
                .iter()
                .find(|s| s.step == step)
                .map(|s| s.description.as_str())
                .unwrap_or("");

            output.push_str(&format!(
                "{:4} | {:<w$} | {:<w$} | {}\n",
                step,
                cell(Role::Producer),
                cell(Role::Consumer),
                state,
                w = COLUMN_WIDTH
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_blank() {
        let trace = Counterexample::new();
        assert!(trace.states.is_empty());
        assert!(trace.actions.is_empty());
        assert_eq!(trace.dst_seed, None);
    }

    #[test]
    fn test_diagram_skips_unrecorded_steps() {
        let mut trace = Counterexample::new();
        trace.add_action(RoleAction {
            role: Role::Consumer,
            step: 998,
            action: "dequeue() -> None".to_string(),
            success: true,
        });
        trace.add_action(RoleAction {
            role: Role::Producer,
            step: 1000,
            action: "enqueue(9)".to_string(),
            success: true,
        });

        let rendered = trace.render_diagram();
        // header, rule, two rows
        assert_eq!(rendered.lines().count(), 4, "{}", rendered);
        assert!(rendered.contains(" 998 |"));
        assert!(!rendered.contains(" 999 |"));
    }

    #[test]
    fn test_empty_diagram() {
        let trace = Counterexample::with_seed(7).with_description("nothing happened");
        let diagram = trace.render_diagram();
        assert!(diagram.contains("DST_SEED=7"));
        assert!(diagram.contains("Failure: nothing happened"));
        assert!(diagram.contains("(no actions recorded)"));
    }

    #[test]
    fn test_render_diagram() {
        let mut trace = Counterexample::with_seed(42);

        trace.add_action(RoleAction {
            role: Role::Producer,
            step: 1,
            action: "enqueue(1)".to_string(),
            success: true,
        });
        trace.add_action(RoleAction {
            role: Role::Consumer,
            step: 2,
            action: "dequeue() -> 1".to_string(),
            success: true,
        });
        trace.add_action(RoleAction {
            role: Role::Producer,
            step: 3,
            action: "enqueue(2)".to_string(),
            success: false,
        });
        trace.add_state(StateSnapshot {
            step: 1,
            description: "count=1".to_string(),
            variables: vec![],
        });

        let diagram = trace.render_diagram();
        assert!(diagram.contains("DST_SEED=42"));
        assert!(diagram.contains("Producer"));
        assert!(diagram.contains("dequeue() -> 1"));
        assert!(diagram.contains("enqueue(2) [FAIL]"));
        assert!(diagram.contains("count=1"));
    }
}
