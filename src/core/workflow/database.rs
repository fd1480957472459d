use std::path::PathBuf;

use crate::action::{Action, CommandSpec};
use crate::engine::TaskCollection;
use crate::error::{Error, Result};

use super::{drush, AssemblyContext, WorkflowParams};

/// Minute resolution: two backups within the same minute share a file name.
const BACKUP_TIMESTAMP: &str = "%Y%m%d%H%M";

pub fn backup(ctx: &AssemblyContext) -> TaskCollection {
    let config = ctx.config;
    let backups = config.backups_dir();
    let file = backups.join(format!("backup_{}.sql", ctx.now.format(BACKUP_TIMESTAMP)));

    TaskCollection::new("backup")
        .with(Action::create_dir("backups:prepare", &backups))
        .with(drush(
            config,
            ["sql-dump".to_string(), format!("--result-file={}", file.display())],
        ))
}

/// Replace the local database with the stage one (or the local alias's).
pub fn sync_stage(params: &WorkflowParams, ctx: &AssemblyContext) -> TaskCollection {
    let config = ctx.config;
    let source = if params.local {
        config.alias("stagelocal")
    } else {
        config.alias("stage")
    };
    TaskCollection::new("sync-stage").with(drush(
        config,
        ["sql-sync".to_string(), source, "@self".to_string()],
    ))
}

/// Import compressed dumps shipped with the project straight into MySQL.
pub fn external_db(params: &WorkflowParams, ctx: &AssemblyContext) -> Result<TaskCollection> {
    let config = ctx.config;
    let db = &config.defaults.database;
    let dumps = find_dumps(ctx)?;

    let host = if params.local {
        "localhost".to_string()
    } else {
        format!("{}_db", config.project_name)
    };

    let producer = CommandSpec::new("zcat").args(dumps.iter().map(|p| p.display().to_string()));
    let consumer = CommandSpec::new("mysql").args([
        format!("-h{}", host),
        format!("-u{}", db.user),
        format!("-p{}", db.password),
        format!("{}_db", config.project_name),
    ]);

    Ok(TaskCollection::new("external-db").with(Action::pipe("database:import", producer, consumer)))
}

fn find_dumps(ctx: &AssemblyContext) -> Result<Vec<PathBuf>> {
    let config = ctx.config;
    let root = glob::Pattern::escape(&config.root.to_string_lossy());
    let pattern = format!("{}/{}", root, config.defaults.database.dump_glob);

    let entries = glob::glob(&pattern).map_err(|e| {
        Error::config_invalid_value(
            "database.dump_glob",
            Some(config.defaults.database.dump_glob.clone()),
            e.to_string(),
        )
    })?;

    let mut dumps: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
    dumps.sort();

    if dumps.is_empty() {
        return Err(Error::validation_invalid_argument(
            "dump",
            format!("No database dump matches {}", config.defaults.database.dump_glob),
            Some(vec![pattern]),
        ));
    }
    Ok(dumps)
}
