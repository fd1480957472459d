use clap::Args;

use drobo::workflow::{WorkflowKind, WorkflowParams};

use super::{execute, CmdResult, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct LintArgs {
    /// Auto-fix coding standard violations with phpcbf
    #[arg(long)]
    pub fix: bool,
}

pub fn all(args: LintArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::Lint, fix_params(&args), global)
}

pub fn php(args: LintArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::LintPhp, fix_params(&args), global)
}

pub fn composer(global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::LintComposer, WorkflowParams::default(), global)
}

fn fix_params(args: &LintArgs) -> WorkflowParams {
    WorkflowParams {
        fix: args.fix,
        ..WorkflowParams::default()
    }
}
