use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use drobo::config::ProjectConfig;
use drobo::engine::LocalExecutor;
use drobo::runner::{self, WorkflowPlan, WorkflowReport, WorkflowRunner};
use drobo::workflow::{AssemblyContext, DrushModuleLocator, WorkflowKind, WorkflowParams};

pub type CmdResult<T> = drobo::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub root: PathBuf,
    pub dry_run: bool,
    pub stop_on_fail: bool,
}

/// `--devel`, accepted by every workflow so parallel members can forward it.
#[derive(Args, Debug, Default, Clone)]
pub struct DevelArgs {
    /// Include development-only steps
    #[arg(long)]
    pub devel: bool,
}

/// Output of a workflow command: the plan for `--dry-run`, else the report.
#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WorkflowOutput {
    Plan(WorkflowPlan),
    Run(WorkflowReport),
}

/// Load the project, assemble the workflow and run (or plan) it.
pub(crate) fn execute(
    kind: WorkflowKind,
    params: WorkflowParams,
    global: &GlobalArgs,
) -> CmdResult<WorkflowOutput> {
    let config = ProjectConfig::load(&global.root)?;
    let locator = DrushModuleLocator::new(&config);
    let ctx = AssemblyContext::new(&config, &locator);

    if global.dry_run {
        let plan = runner::plan(&kind, &params, &ctx, global.stop_on_fail)?;
        return Ok((WorkflowOutput::Plan(plan), 0));
    }

    let executor = LocalExecutor;
    let report = WorkflowRunner::new(&executor)
        .stop_on_fail(global.stop_on_fail)
        .run(&kind, &params, &ctx)?;
    let exit_code = if report.is_success() { 0 } else { 1 };
    Ok((WorkflowOutput::Run(report), exit_code))
}

pub mod db;
pub mod lint;
pub mod locale;
pub mod site;
pub mod styles;

macro_rules! dispatch {
    ($global:expr, $run:path) => {
        crate::output::map_cmd_result_to_json($run($global))
    };
    ($args:expr, $global:expr, $run:path) => {
        crate::output::map_cmd_result_to_json($run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (drobo::Result<serde_json::Value>, i32) {
    use crate::Commands;

    match command {
        Commands::Install(args) => dispatch!(args, global, site::install),
        Commands::InstallProfile(args) => dispatch!(args, global, site::install_profile),
        Commands::Update(args) => dispatch!(args, global, site::update),
        Commands::UpdateConfig(args) => dispatch!(args, global, site::update_config),
        Commands::Dev => dispatch!(global, site::dev),
        Commands::UpdateDev => dispatch!(global, site::update_dev),

        Commands::Backup => dispatch!(global, db::backup),
        Commands::SyncStage(args) => dispatch!(args, global, db::sync_stage),
        Commands::ExternalDb(args) => dispatch!(args, global, db::external_db),

        Commands::LocaleUpdate(args) => dispatch!(args, global, locale::update),
        Commands::LocaleExport(args) => dispatch!(args, global, locale::export),

        Commands::StyleBuild(args) => dispatch!(args, global, styles::build),

        Commands::Lint(args) => dispatch!(args, global, lint::all),
        Commands::LintPhp(args) => dispatch!(args, global, lint::php),
        Commands::LintComposer => dispatch!(global, lint::composer),
    }
}
