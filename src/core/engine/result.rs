use serde::Serialize;

use crate::utils::command::CapturedOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The program could not be started.
    Spawn,
    /// The program ran and reported failure.
    NonZeroExit,
    /// A copy/move/mkdir/chmod/append target was inaccessible.
    Filesystem,
    /// The thread running a parallel member panicked.
    Panicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure {
        kind: FailureKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
}

/// Outcome of one action, group or collection.
///
/// Aggregates (groups and collections) keep the results of every entry that
/// was started as `children`; leaves keep their captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub label: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "CapturedOutput::is_empty")]
    pub output: CapturedOutput,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StepResult>,
    /// Failed, but the action allowed failure so its collection kept going.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tolerated: bool,
    #[serde(skip)]
    aggregate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    pub actions_run: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub tolerated: usize,
}

impl StepResult {
    pub fn success(label: impl Into<String>, output: CapturedOutput) -> Self {
        Self {
            label: label.into(),
            outcome: Outcome::Success,
            output,
            children: Vec::new(),
            tolerated: false,
            aggregate: false,
        }
    }

    pub fn failure(
        label: impl Into<String>,
        kind: FailureKind,
        exit_code: Option<i32>,
        output: CapturedOutput,
    ) -> Self {
        Self {
            label: label.into(),
            outcome: Outcome::Failure { kind, exit_code },
            output,
            children: Vec::new(),
            tolerated: false,
            aggregate: false,
        }
    }

    pub fn aggregate(label: impl Into<String>, outcome: Outcome, children: Vec<StepResult>) -> Self {
        Self {
            label: label.into(),
            outcome,
            output: CapturedOutput::default(),
            children,
            tolerated: false,
            aggregate: true,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.outcome {
            Outcome::Failure { exit_code, .. } => exit_code,
            Outcome::Success => None,
        }
    }

    /// The leaf responsible for this result failing: leftmost, deepest,
    /// skipping tolerated failures.
    pub fn first_failure(&self) -> Option<&StepResult> {
        if self.is_success() {
            return None;
        }
        let culprit = self
            .children
            .iter()
            .find(|child| !child.is_success() && !child.tolerated)
            .and_then(StepResult::first_failure);
        Some(culprit.unwrap_or(self))
    }

    /// Counts over the leaves (actions) of this result tree.
    pub fn summary(&self) -> StepSummary {
        let mut summary = StepSummary::default();
        self.accumulate(&mut summary);
        summary
    }

    fn accumulate(&self, summary: &mut StepSummary) {
        if self.aggregate {
            for child in &self.children {
                child.accumulate(summary);
            }
            return;
        }
        summary.actions_run += 1;
        if self.is_success() {
            summary.succeeded += 1;
        } else if self.tolerated {
            summary.tolerated += 1;
        } else {
            summary.failed += 1;
        }
    }
}
