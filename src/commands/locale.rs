use clap::Args;

use drobo::workflow::{WorkflowKind, WorkflowParams};

use super::{execute, CmdResult, DevelArgs, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct LocaleExportArgs {
    /// Language code of the exported translation (e.g. "fr")
    pub language: String,

    /// Machine name of the module or theme to export
    pub module: String,
}

pub fn update(_args: DevelArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    execute(WorkflowKind::LocaleUpdate, WorkflowParams::default(), global)
}

pub fn export(args: LocaleExportArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    let kind = WorkflowKind::LocaleExport {
        language: args.language,
        module: args.module,
    };
    execute(kind, WorkflowParams::default(), global)
}
