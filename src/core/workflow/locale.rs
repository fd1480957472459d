use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::action::{Action, CommandSpec};
use crate::config::ProjectConfig;
use crate::engine::TaskCollection;
use crate::error::{Error, Result};
use crate::utils::command;

use super::{drush, require_argument, AssemblyContext};

const EXPORTED_TEMPLATE: &str = "general.pot";
const INFO_MARKER: &str = "interface translation project";

/// Resolves a module or theme machine name to its path below the docroot.
pub trait ModuleLocator {
    fn module_path(&self, module: &str) -> Result<String>;
}

/// Asks drush for the installed extension list.
pub struct DrushModuleLocator {
    drush: CommandSpec,
}

#[derive(Debug, Deserialize)]
struct ExtensionInfo {
    path: String,
}

impl DrushModuleLocator {
    pub fn new(config: &ProjectConfig) -> Self {
        Self {
            drush: config.drush(),
        }
    }
}

impl ModuleLocator for DrushModuleLocator {
    fn module_path(&self, module: &str) -> Result<String> {
        let mut args = self.drush.args.clone();
        args.extend(["pm:list", "--format=json", "--fields=path"].map(String::from));

        let stdout = command::run_in(None, &self.drush.program, &args, "drush pm:list")
            .map_err(|e| {
                let cause = e.details["error"].as_str().unwrap_or(&e.message).to_string();
                Error::module_lookup_failed(cause)
            })?;
        parse_extension_list(&stdout, module)
    }
}

fn parse_extension_list(json: &str, module: &str) -> Result<String> {
    let extensions: HashMap<String, ExtensionInfo> = serde_json::from_str(json)
        .map_err(|e| Error::module_lookup_failed(format!("Unreadable extension list: {}", e)))?;
    extensions
        .get(module)
        .map(|info| info.path.trim_matches('/').to_string())
        .ok_or_else(|| Error::module_not_found(module))
}

/// Refresh interface translations and import the project's own `.po` files.
pub fn locale_update(ctx: &AssemblyContext) -> Result<TaskCollection> {
    let config = ctx.config;
    let mut collection = TaskCollection::new("locale-update");
    if config.default_langcode == config.defaults.base_langcode {
        return Ok(collection);
    }

    collection.push(drush(config, ["locale:check", "--quiet"]));
    collection.push(drush(config, ["locale:update"]));

    for file in custom_translations(config)? {
        let Some(name) = file.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        let language = name.split('.').next().unwrap_or(&name).to_string();
        collection.push(drush(
            config,
            [
                "locale:import".to_string(),
                language,
                file.display().to_string(),
                "--type=customized".to_string(),
                "--override=all".to_string(),
            ],
        ));
    }

    Ok(collection)
}

/// `*.po` files in the custom translations directory, sorted by name.
fn custom_translations(config: &ProjectConfig) -> Result<Vec<PathBuf>> {
    let dir = config.custom_translations_dir();
    let pattern = format!("{}/*.po", glob::Pattern::escape(&dir.to_string_lossy()));
    let entries = glob::glob(&pattern)
        .map_err(|e| Error::internal_unexpected(format!("Invalid translation pattern: {}", e)))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Extract a module's strings into `<module>/translations/<language>.po` and
/// register the translation pattern in its info file.
pub fn locale_export(language: &str, module: &str, ctx: &AssemblyContext) -> Result<TaskCollection> {
    require_argument("language", language)?;
    require_argument("module", module)?;

    let config = ctx.config;
    let path = ctx.locator.module_path(module)?;
    let web = config.web_dir();
    let module_dir = web.join(&path);
    let translations = module_dir.join("translations");

    let potx = config.drush().dir(&web).args([
        "potx".to_string(),
        "single".to_string(),
        format!("--folder={}", path),
        "--api=8".to_string(),
        format!("--language={}", language),
    ]);

    let text = format!(
        "\n'{}': {}\n'interface translation server pattern': '{}/translations/%language.po'",
        INFO_MARKER, module, path
    );

    Ok(TaskCollection::new("locale-export")
        .with(Action::exec("potx", potx))
        .with(Action::create_dir("translations:prepare", &translations))
        .with(Action::move_file(
            "translations:move",
            web.join(EXPORTED_TEMPLATE),
            translations.join(format!("{}.po", language)),
        ))
        .with(Action::append_unless_matches(
            "info:register",
            module_dir.join(format!("{}.info.yml", module)),
            INFO_MARKER,
            text,
        )))
}
