use std::thread;

use serde::Serialize;

use crate::action::Action;
use crate::utils::command::CapturedOutput;

use super::executor::ActionExecutor;
use super::result::{FailureKind, Outcome, StepResult};

/// Actions launched together and awaited as one entry.
///
/// Every member is started before any is joined, and every member is joined
/// before the group reports, failed members included. Nothing is cancelled.
/// A failing member with `allow_failure` is marked tolerated and does not
/// fail the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParallelGroup {
    pub name: String,
    pub members: Vec<Action>,
}

impl ParallelGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn push(&mut self, action: Action) {
        self.members.push(action);
    }

    pub fn with(mut self, action: Action) -> Self {
        self.push(action);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn run(&self, executor: &dyn ActionExecutor) -> StepResult {
        let results: Vec<StepResult> = if self.members.len() <= 1 {
            self.members
                .iter()
                .map(|member| executor.execute(member))
                .collect()
        } else {
            log_status!(
                "parallel",
                "Launching {} task(s) in '{}'",
                self.members.len(),
                self.name
            );
            self.run_concurrently(executor)
        };

        let results: Vec<StepResult> = self
            .members
            .iter()
            .zip(results)
            .map(|(member, mut result)| {
                if member.allow_failure && !result.is_success() {
                    result.tolerated = true;
                }
                result
            })
            .collect();

        let outcome = results
            .iter()
            .filter(|result| !result.tolerated)
            .map(|result| result.outcome)
            .find(|outcome| *outcome != Outcome::Success)
            .unwrap_or(Outcome::Success);

        StepResult::aggregate(&self.name, outcome, results)
    }

    fn run_concurrently(&self, executor: &dyn ActionExecutor) -> Vec<StepResult> {
        thread::scope(|scope| {
            let handles: Vec<_> = self
                .members
                .iter()
                .map(|member| (member, scope.spawn(move || executor.execute(member))))
                .collect();

            handles
                .into_iter()
                .map(|(member, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        StepResult::failure(
                            &member.label,
                            FailureKind::Panicked,
                            None,
                            CapturedOutput::stderr_only("Task thread panicked"),
                        )
                    })
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::CommandSpec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    /// Waits until every member of the group has started (or a deadline
    /// passes), so a sequential implementation is observable as a timeout.
    struct Rendezvous {
        expected: usize,
        started: AtomicUsize,
        finished: AtomicUsize,
        failing: &'static str,
    }

    impl Rendezvous {
        fn new(expected: usize, failing: &'static str) -> Self {
            Self {
                expected,
                started: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
                failing,
            }
        }
    }

    impl ActionExecutor for Rendezvous {
        fn execute(&self, action: &Action) -> StepResult {
            self.started.fetch_add(1, Ordering::SeqCst);
            let deadline = Instant::now() + Duration::from_secs(5);
            while self.started.load(Ordering::SeqCst) < self.expected {
                if Instant::now() > deadline {
                    self.finished.fetch_add(1, Ordering::SeqCst);
                    return StepResult::failure(
                        &action.label,
                        FailureKind::NonZeroExit,
                        Some(99),
                        CapturedOutput::stderr_only("siblings never started"),
                    );
                }
                thread::sleep(Duration::from_millis(5));
            }
            // The failing member finishes first; the others keep working.
            if action.label != self.failing {
                thread::sleep(Duration::from_millis(50));
            }
            self.finished.fetch_add(1, Ordering::SeqCst);
            if action.label == self.failing {
                StepResult::failure(
                    &action.label,
                    FailureKind::NonZeroExit,
                    Some(1),
                    CapturedOutput::new("", format!("{} output", action.label)),
                )
            } else {
                StepResult::success(
                    &action.label,
                    CapturedOutput::new(format!("{} output", action.label), ""),
                )
            }
        }
    }

    struct Panicker;

    impl ActionExecutor for Panicker {
        fn execute(&self, action: &Action) -> StepResult {
            if action.label == "boom" {
                panic!("member exploded");
            }
            StepResult::success(&action.label, CapturedOutput::default())
        }
    }

    fn group(labels: &[&str]) -> ParallelGroup {
        labels.iter().fold(ParallelGroup::new("group"), |g, l| {
            g.with(Action::exec(*l, CommandSpec::new("true")))
        })
    }

    #[test]
    fn members_start_concurrently_and_all_succeed() {
        let executor = Rendezvous::new(3, "");
        let result = group(&["a", "b", "c"]).run(&executor);
        assert!(result.is_success());
        assert_eq!(result.children.len(), 3);
    }

    #[test]
    fn failure_still_joins_every_member() {
        let executor = Rendezvous::new(3, "b");
        let result = group(&["a", "b", "c"]).run(&executor);

        assert!(!result.is_success());
        assert_eq!(executor.finished.load(Ordering::SeqCst), 3);
        assert_eq!(result.exit_code(), Some(1));
        assert_eq!(result.first_failure().unwrap().label, "b");
    }

    #[test]
    fn output_is_attributed_to_each_member() {
        let executor = Rendezvous::new(2, "b");
        let result = group(&["a", "b"]).run(&executor);

        assert_eq!(result.children[0].label, "a");
        assert_eq!(result.children[0].output.stdout, "a output");
        assert_eq!(result.children[1].label, "b");
        assert_eq!(result.children[1].output.stderr, "b output");
    }

    #[test]
    fn panicking_member_becomes_failure() {
        let result = group(&["ok", "boom"]).run(&Panicker);
        assert!(!result.is_success());
        let culprit = result.first_failure().unwrap();
        assert_eq!(culprit.label, "boom");
        assert_eq!(
            culprit.outcome,
            Outcome::Failure {
                kind: FailureKind::Panicked,
                exit_code: None
            }
        );
    }

    #[test]
    fn tolerated_member_does_not_fail_the_group() {
        let executor = Rendezvous::new(2, "b");
        let tolerant = ParallelGroup::new("group")
            .with(Action::exec("a", CommandSpec::new("true")))
            .with(Action::exec("b", CommandSpec::new("true")).allow_failure());

        let result = tolerant.run(&executor);
        assert!(result.is_success());
        assert!(!result.children[0].tolerated);
        assert!(result.children[1].tolerated);
        assert!(result.first_failure().is_none());
        assert_eq!(result.summary().tolerated, 1);
    }

    /// Fails every member it is handed.
    struct AlwaysFails;

    impl ActionExecutor for AlwaysFails {
        fn execute(&self, action: &Action) -> StepResult {
            StepResult::failure(
                &action.label,
                FailureKind::NonZeroExit,
                Some(3),
                CapturedOutput::default(),
            )
        }
    }

    #[test]
    fn tolerated_member_does_not_hide_a_real_failure() {
        let result = ParallelGroup::new("group")
            .with(Action::exec("a", CommandSpec::new("true")).allow_failure())
            .with(Action::exec("b", CommandSpec::new("true")))
            .run(&AlwaysFails);

        assert!(!result.is_success());
        assert!(result.children[0].tolerated);
        assert_eq!(result.first_failure().unwrap().label, "b");
        assert_eq!(result.exit_code(), Some(3));
    }

    #[test]
    fn empty_group_succeeds() {
        assert!(ParallelGroup::new("none").run(&Panicker).is_success());
    }

    #[cfg(unix)]
    #[test]
    fn local_processes_run_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let group = ParallelGroup::new("touch")
            .with(Action::exec(
                "one",
                CommandSpec::new("touch").arg(dir.path().join("one").to_string_lossy()),
            ))
            .with(Action::exec("fails", CommandSpec::new("false")))
            .with(Action::exec(
                "two",
                CommandSpec::new("touch").arg(dir.path().join("two").to_string_lossy()),
            ));

        let result = group.run(&crate::engine::LocalExecutor);
        assert!(!result.is_success());
        assert!(dir.path().join("one").exists());
        assert!(dir.path().join("two").exists());
    }
}
