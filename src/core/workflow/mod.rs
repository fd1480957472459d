//! Workflow assembly.
//!
//! A workflow is a function from project configuration and parameters to a
//! [`TaskCollection`]. Assembly only reads the project tree; the one program
//! it runs is the module lookup `locale-export` needs. Every conditional step
//! is decided here, so a built collection is the complete plan.

mod database;
mod lint;
mod locale;
mod site;
mod styles;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::action::Action;
use crate::config::ProjectConfig;
use crate::engine::TaskCollection;
use crate::error::{Error, Result};

pub use locale::{DrushModuleLocator, ModuleLocator};

/// Whether a workflow failure aborts the invocation or is only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    Stop,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "workflow", rename_all = "kebab-case")]
pub enum WorkflowKind {
    Install,
    InstallProfile,
    Update,
    UpdateConfig,
    Dev,
    UpdateDev,
    Backup,
    SyncStage,
    ExternalDb,
    LocaleUpdate,
    LocaleExport { language: String, module: String },
    StyleBuild,
    Lint,
    LintComposer,
    LintPhp,
}

impl WorkflowKind {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowKind::Install => "install",
            WorkflowKind::InstallProfile => "install-profile",
            WorkflowKind::Update => "update",
            WorkflowKind::UpdateConfig => "update-config",
            WorkflowKind::Dev => "dev",
            WorkflowKind::UpdateDev => "update-dev",
            WorkflowKind::Backup => "backup",
            WorkflowKind::SyncStage => "sync-stage",
            WorkflowKind::ExternalDb => "external-db",
            WorkflowKind::LocaleUpdate => "locale-update",
            WorkflowKind::LocaleExport { .. } => "locale-export",
            WorkflowKind::StyleBuild => "style-build",
            WorkflowKind::Lint => "lint",
            WorkflowKind::LintComposer => "lint-composer",
            WorkflowKind::LintPhp => "lint-php",
        }
    }

    /// Fail mode the workflow always runs with, if it does not follow the
    /// caller's choice.
    pub fn fixed_fail_mode(&self) -> Option<FailMode> {
        match self {
            WorkflowKind::Dev | WorkflowKind::UpdateDev => Some(FailMode::Stop),
            _ => None,
        }
    }

    pub fn build(&self, params: &WorkflowParams, ctx: &AssemblyContext) -> Result<TaskCollection> {
        match self {
            WorkflowKind::Install => site::install(params, ctx),
            WorkflowKind::InstallProfile => site::install_profile(params, ctx),
            WorkflowKind::Update => Ok(site::update(params, ctx)),
            WorkflowKind::UpdateConfig => Ok(site::update_config(ctx)),
            WorkflowKind::Dev => site::dev(ctx),
            WorkflowKind::UpdateDev => Ok(site::update_dev(ctx)),
            WorkflowKind::Backup => Ok(database::backup(ctx)),
            WorkflowKind::SyncStage => Ok(database::sync_stage(params, ctx)),
            WorkflowKind::ExternalDb => database::external_db(params, ctx),
            WorkflowKind::LocaleUpdate => locale::locale_update(ctx),
            WorkflowKind::LocaleExport { language, module } => {
                locale::locale_export(language, module, ctx)
            }
            WorkflowKind::StyleBuild => Ok(styles::style_build(params, ctx)),
            WorkflowKind::Lint => Ok(lint::lint(params, ctx)),
            WorkflowKind::LintComposer => Ok(lint::lint_composer(ctx)),
            WorkflowKind::LintPhp => Ok(lint::lint_php(params, ctx)),
        }
    }
}

/// Caller-supplied switches. Devel mode is always passed in, never read from
/// the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowParams {
    pub devel: bool,
    /// Target the local environment (sync-stage, external-db).
    pub local: bool,
    /// Fix coding standard violations instead of reporting them.
    pub fix: bool,
    /// Install profile override for install-profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl WorkflowParams {
    pub fn devel() -> Self {
        Self {
            devel: true,
            ..Self::default()
        }
    }
}

/// Everything assembly reads besides its parameters.
pub struct AssemblyContext<'a> {
    pub config: &'a ProjectConfig,
    pub locator: &'a dyn ModuleLocator,
    pub now: DateTime<Local>,
}

impl<'a> AssemblyContext<'a> {
    pub fn new(config: &'a ProjectConfig, locator: &'a dyn ModuleLocator) -> Self {
        Self {
            config,
            locator,
            now: Local::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }
}

pub(crate) fn require_argument(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation_missing_argument(vec![name.to_string()]));
    }
    Ok(())
}

/// One drush step, labelled with its subcommand.
pub(crate) fn drush<I, S>(config: &ProjectConfig, args: I) -> Action
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    let label = args
        .iter()
        .find(|a| !a.starts_with('-') && !a.starts_with('@'))
        .cloned()
        .unwrap_or_else(|| "drush".to_string());
    Action::exec(label, config.drush().args(args))
}

/// Re-invoke this tool for a workflow, so it can run as a parallel member.
pub(crate) fn invoke(config: &ProjectConfig, workflow: &str, devel: bool) -> Action {
    let mut command = config.runner().arg(workflow);
    if devel {
        command = command.arg("--devel");
    }
    Action::exec(workflow, command)
}
