use clap::Args;

use drobo::workflow::{WorkflowKind, WorkflowParams};

use super::{execute, CmdResult, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct LocalArgs {
    /// Target the local environment instead of the container one
    #[arg(long)]
    pub local: bool,
}

pub fn backup(global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::Backup, WorkflowParams::default(), global)
}

pub fn sync_stage(args: LocalArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::SyncStage, local_params(&args), global)
}

pub fn external_db(args: LocalArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::ExternalDb, local_params(&args), global)
}

fn local_params(args: &LocalArgs) -> WorkflowParams {
    WorkflowParams {
        local: args.local,
        ..WorkflowParams::default()
    }
}
