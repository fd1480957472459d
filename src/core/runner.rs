//! Runs an assembled workflow and reports on it.

use serde::Serialize;

use crate::engine::{ActionExecutor, StepResult, StepSummary, TaskCollection};
use crate::error::{Error, Result, WorkflowFailedDetails};
use crate::workflow::{AssemblyContext, FailMode, WorkflowKind, WorkflowParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Success,
    Failed,
}

/// The action a failed workflow stopped at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub workflow: String,
    pub status: WorkflowStatus,
    pub fail_mode: FailMode,
    pub summary: StepSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSummary>,
    pub result: StepResult,
}

impl WorkflowReport {
    pub fn is_success(&self) -> bool {
        self.status == WorkflowStatus::Success
    }
}

/// A workflow as it would run, for `--dry-run`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowPlan {
    pub workflow: String,
    pub fail_mode: FailMode,
    pub steps: Vec<PlannedStep>,
    pub collection: TaskCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub label: String,
    pub command: String,
}

pub struct WorkflowRunner<'a> {
    executor: &'a dyn ActionExecutor,
    stop_on_fail: bool,
}

impl<'a> WorkflowRunner<'a> {
    pub fn new(executor: &'a dyn ActionExecutor) -> Self {
        Self {
            executor,
            stop_on_fail: false,
        }
    }

    pub fn stop_on_fail(mut self, stop_on_fail: bool) -> Self {
        self.stop_on_fail = stop_on_fail;
        self
    }

    pub fn fail_mode(&self, kind: &WorkflowKind) -> FailMode {
        resolve_fail_mode(kind, self.stop_on_fail)
    }

    /// Assemble and run a workflow.
    ///
    /// In continue mode a failed workflow is still `Ok`; the report carries
    /// the failure. In stop mode it is printed to stderr and returned as a
    /// `workflow.failed` error.
    pub fn run(
        &self,
        kind: &WorkflowKind,
        params: &WorkflowParams,
        ctx: &AssemblyContext,
    ) -> Result<WorkflowReport> {
        let collection = kind.build(params, ctx)?;
        self.run_collection(kind, &collection)
    }

    pub fn run_collection(
        &self,
        kind: &WorkflowKind,
        collection: &TaskCollection,
    ) -> Result<WorkflowReport> {
        let fail_mode = self.fail_mode(kind);
        log_status!(
            "workflow",
            "Running '{}' ({} action(s))",
            kind.name(),
            collection.actions().len()
        );

        let result = collection.run(self.executor);
        let summary = result.summary();
        let failure = result.first_failure().map(|step| FailureSummary {
            step: step.label.clone(),
            exit_code: step.exit_code(),
            stdout: step.output.stdout.clone(),
            stderr: step.output.stderr.clone(),
        });

        let status = if result.is_success() {
            WorkflowStatus::Success
        } else {
            WorkflowStatus::Failed
        };

        log_status!(
            "workflow",
            "'{}' {}: {} succeeded, {} failed, {} tolerated",
            kind.name(),
            if status == WorkflowStatus::Success { "finished" } else { "failed" },
            summary.succeeded,
            summary.failed,
            summary.tolerated
        );

        if let (FailMode::Stop, Some(failure)) = (fail_mode, &failure) {
            eprintln!(
                "[{}] Failed at '{}'{}",
                kind.name(),
                failure.step,
                failure
                    .exit_code
                    .map(|code| format!(" (exit code {})", code))
                    .unwrap_or_default()
            );
            let diagnostic = result
                .first_failure()
                .map(|step| step.output.diagnostic().to_string())
                .unwrap_or_default();
            if !diagnostic.is_empty() {
                eprintln!("{}", diagnostic);
            }
            return Err(Error::workflow_failed(WorkflowFailedDetails {
                workflow: kind.name().to_string(),
                step: failure.step.clone(),
                exit_code: failure.exit_code,
                stdout: failure.stdout.clone(),
                stderr: failure.stderr.clone(),
            }));
        }

        Ok(WorkflowReport {
            workflow: kind.name().to_string(),
            status,
            fail_mode,
            summary,
            failure,
            result,
        })
    }
}

/// Assemble a workflow without running it.
pub fn plan(
    kind: &WorkflowKind,
    params: &WorkflowParams,
    ctx: &AssemblyContext,
    stop_on_fail: bool,
) -> Result<WorkflowPlan> {
    let collection = kind.build(params, ctx)?;
    let steps = collection
        .actions()
        .into_iter()
        .map(|action| PlannedStep {
            label: action.label.clone(),
            command: action.describe(),
        })
        .collect();

    Ok(WorkflowPlan {
        workflow: kind.name().to_string(),
        fail_mode: resolve_fail_mode(kind, stop_on_fail),
        steps,
        collection,
    })
}

fn resolve_fail_mode(kind: &WorkflowKind, stop_on_fail: bool) -> FailMode {
    kind.fixed_fail_mode().unwrap_or(if stop_on_fail {
        FailMode::Stop
    } else {
        FailMode::Continue
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, CommandSpec};
    use crate::engine::FailureKind;
    use crate::utils::command::CapturedOutput;
    use crate::workflow::fixtures::{self, StaticLocator};

    struct FailLabel(&'static str);

    impl ActionExecutor for FailLabel {
        fn execute(&self, action: &Action) -> StepResult {
            if action.label == self.0 {
                StepResult::failure(
                    &action.label,
                    FailureKind::NonZeroExit,
                    Some(3),
                    CapturedOutput::new("partial", "database is locked"),
                )
            } else {
                StepResult::success(&action.label, CapturedOutput::default())
            }
        }
    }

    fn collection() -> TaskCollection {
        TaskCollection::new("update-config")
            .with(Action::exec("config:import", CommandSpec::new("drush")))
            .with(Action::exec("cache-rebuild", CommandSpec::new("drush")))
    }

    #[test]
    fn continue_mode_reports_failure() {
        let executor = FailLabel("config:import");
        let report = WorkflowRunner::new(&executor)
            .run_collection(&WorkflowKind::UpdateConfig, &collection())
            .unwrap();

        assert_eq!(report.status, WorkflowStatus::Failed);
        assert_eq!(report.fail_mode, FailMode::Continue);
        let failure = report.failure.unwrap();
        assert_eq!(failure.step, "config:import");
        assert_eq!(failure.exit_code, Some(3));
        assert_eq!(failure.stderr, "database is locked");
        assert_eq!(report.summary.actions_run, 1);
    }

    #[test]
    fn stop_mode_returns_workflow_error() {
        let executor = FailLabel("cache-rebuild");
        let err = WorkflowRunner::new(&executor)
            .stop_on_fail(true)
            .run_collection(&WorkflowKind::UpdateConfig, &collection())
            .unwrap_err();

        assert_eq!(err.code.as_str(), "workflow.failed");
        assert_eq!(err.details["step"], "cache-rebuild");
        assert_eq!(err.details["exitCode"], 3);
    }

    #[test]
    fn successful_run_has_no_failure() {
        let executor = FailLabel("nothing");
        let report = WorkflowRunner::new(&executor)
            .stop_on_fail(true)
            .run_collection(&WorkflowKind::UpdateConfig, &collection())
            .unwrap();
        assert!(report.is_success());
        assert!(report.failure.is_none());
        assert_eq!(report.summary.succeeded, 2);
    }

    #[test]
    fn dev_workflows_always_stop() {
        let executor = FailLabel("nothing");
        let runner = WorkflowRunner::new(&executor);
        assert_eq!(runner.fail_mode(&WorkflowKind::Dev), FailMode::Stop);
        assert_eq!(runner.fail_mode(&WorkflowKind::UpdateDev), FailMode::Stop);
        assert_eq!(runner.fail_mode(&WorkflowKind::Install), FailMode::Continue);
    }

    #[test]
    fn plan_lists_actions_without_running() {
        let project = fixtures::project("ca", "intranet");
        let locator = StaticLocator::empty();
        let ctx = AssemblyContext::new(&project.config, &locator);

        let plan = plan(&WorkflowKind::Backup, &WorkflowParams::default(), &ctx, false).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].label, "backups:prepare");
        assert!(plan.steps[1].command.contains("sql-dump"));
        assert!(!project.root().join("backups").exists());
    }
}
