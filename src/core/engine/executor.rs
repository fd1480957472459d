use crate::action::Action;

use super::result::StepResult;

/// Runs a single action on behalf of the engine.
///
/// Parallel groups call `execute` from several threads at once.
pub trait ActionExecutor: Send + Sync {
    fn execute(&self, action: &Action) -> StepResult;
}

/// Executes actions for real on the local host.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl ActionExecutor for LocalExecutor {
    fn execute(&self, action: &Action) -> StepResult {
        log_status!("run", "{}: {}", action.label, action.describe());
        let result = action.run();
        if !result.is_success() {
            log_status!(
                "run",
                "{} failed: {}",
                action.label,
                result.output.diagnostic()
            );
        }
        result
    }
}
