use clap::Args;

use drobo::workflow::{WorkflowKind, WorkflowParams};

use super::{execute, CmdResult, DevelArgs, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct InstallProfileArgs {
    /// Install profile (defaults to the configured profile)
    pub profile: Option<String>,

    #[command(flatten)]
    pub devel: DevelArgs,
}

pub fn install(args: DevelArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::Install, devel_params(&args), global)
}

pub fn install_profile(args: InstallProfileArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    let params = WorkflowParams {
        profile: args.profile,
        ..devel_params(&args.devel)
    };
    execute(WorkflowKind::InstallProfile, params, global)
}

pub fn update(args: DevelArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::Update, devel_params(&args), global)
}

pub fn update_config(args: DevelArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::UpdateConfig, devel_params(&args), global)
}

pub fn dev(global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::Dev, WorkflowParams::devel(), global)
}

pub fn update_dev(global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::UpdateDev, WorkflowParams::devel(), global)
}

fn devel_params(args: &DevelArgs) -> WorkflowParams {
    WorkflowParams {
        devel: args.devel,
        ..WorkflowParams::default()
    }
}
