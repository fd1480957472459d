use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{db, lint, locale, site, DevelArgs};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const ROOT_ENV: &str = "DROBO_ROOT";

#[derive(Parser)]
#[command(name = "drobo")]
#[command(version = VERSION)]
#[command(about = "Build, update and maintain Drupal projects")]
struct Cli {
    /// Project root (defaults to $DROBO_ROOT, then the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<String>,

    /// Print the assembled plan without running anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Abort with a non-zero exit at the first failing step
    #[arg(long, global = true)]
    stop_on_fail: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Build a new site from the project's configuration
    Install(DevelArgs),
    /// Run site installation with an install profile
    InstallProfile(site::InstallProfileArgs),
    /// Apply database updates, configuration and translations
    Update(DevelArgs),
    /// Import the exported configuration
    UpdateConfig(DevelArgs),
    /// Install a development site (always stops on failure)
    Dev,
    /// Refresh a development site from stage (always stops on failure)
    UpdateDev,
    /// Dump the database into backups/
    Backup,
    /// Replace the local database with the stage database
    SyncStage(db::LocalArgs),
    /// Import compressed database dumps shipped with the project
    ExternalDb(db::LocalArgs),
    /// Check and import interface translations
    LocaleUpdate(DevelArgs),
    /// Export a module's interface translation
    LocaleExport(locale::LocaleExportArgs),
    /// Compile the active custom theme's styles
    StyleBuild(DevelArgs),
    /// Validate composer.json and check coding standards
    Lint(lint::LintArgs),
    /// Check (or fix) PHP coding standards
    LintPhp(lint::LintArgs),
    /// Validate composer.json
    LintComposer,
}

fn resolve_root(arg: Option<String>) -> drobo::Result<PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|e| drobo::Error::internal_io(e.to_string(), Some("resolve cwd".to_string())))?;

    let raw = arg
        .or_else(|| std::env::var(ROOT_ENV).ok())
        .filter(|value| !value.trim().is_empty());
    let Some(raw) = raw else {
        return Ok(cwd);
    };

    let expanded = PathBuf::from(shellexpand::tilde(&raw).as_ref());
    Ok(if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    })
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let root = match resolve_root(cli.root) {
        Ok(root) => root,
        Err(err) => {
            let (json_result, exit_code) = output::map_cmd_result_to_json::<()>(Err(err));
            let _ = output::print_json_result(json_result);
            return std::process::ExitCode::from(exit_code_to_u8(exit_code));
        }
    };

    let global = GlobalArgs {
        root,
        dry_run: cli.dry_run,
        stop_on_fail: cli.stop_on_fail,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
