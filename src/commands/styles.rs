use drobo::workflow::{WorkflowKind, WorkflowParams};

use super::{execute, CmdResult, DevelArgs, GlobalArgs, WorkflowOutput};

pub fn build(args: DevelArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    let params = WorkflowParams {
        devel: args.devel,
        ..WorkflowParams::default()
    };
    execute(WorkflowKind::StyleBuild, params, global)
}
