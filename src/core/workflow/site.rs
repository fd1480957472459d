use std::fs;

use crate::action::Action;
use crate::config::ProjectConfig;
use crate::engine::{ParallelGroup, TaskCollection};
use crate::error::{Error, Result};
use crate::utils::shell;

use super::{database, drush, invoke, AssemblyContext, WorkflowParams};

const SETTINGS_FILE: &str = "settings.php";
const DEFAULT_SETTINGS_FILE: &str = "default.settings.php";
const IMAGE_SETTINGS_FILE: &str = "image.settings.yml";

/// Fresh site build: settings, profile install, translations, cache.
pub fn install(params: &WorkflowParams, ctx: &AssemblyContext) -> Result<TaskCollection> {
    install_site(params, ctx, false)
}

/// `open_settings` leaves the generated settings.php world-writable for the
/// installer, as local development sites need.
fn install_site(
    params: &WorkflowParams,
    ctx: &AssemblyContext,
    open_settings: bool,
) -> Result<TaskCollection> {
    let config = ctx.config;
    // The member install-profile run needs these; fail before touching anything.
    config.credentials()?;
    let sites_default = config.sites_default_dir();

    let mut collection = TaskCollection::new("install")
        .with(Action::copy(
            "settings:copy",
            sites_default.join(DEFAULT_SETTINGS_FILE),
            sites_default.join(SETTINGS_FILE),
        ))
        .with(Action::append_lines(
            "settings:append",
            sites_default.join(SETTINGS_FILE),
            settings_lines(config),
        ));
    if open_settings {
        collection.push(Action::chmod(
            "settings:permissions",
            sites_default.join(SETTINGS_FILE),
            0o777,
        ));
    }

    let mut install = ParallelGroup::new("install")
        .with(invoke(config, "install-profile", params.devel));
    if params.devel {
        install.push(invoke(config, "style-build", true));
    }
    collection.push(install);

    collection.push(ParallelGroup::new("post-install").with(invoke(config, "locale-update", false)));
    collection.push(cache(config));

    if params.devel {
        collection.push(drush(config, ["migrate-import", "--tag=migrate_default_content"]));
        collection.push(login(config));
    }

    Ok(collection)
}

pub fn install_profile(params: &WorkflowParams, ctx: &AssemblyContext) -> Result<TaskCollection> {
    let config = ctx.config;
    let credentials = config.credentials()?;
    let profile = params
        .profile
        .clone()
        .unwrap_or_else(|| config.defaults.install_profile.clone());

    let mut args = vec![
        "site:install".to_string(),
        format!("--account-name={}", credentials.account_name),
        format!("--account-pass={}", credentials.account_pass),
        format!("--account-mail={}", credentials.account_mail),
        format!("--locale={}", config.install_locale),
    ];
    if let Some(site_name) = &credentials.site_name {
        args.push(format!("--site-name={}", site_name));
    }
    args.push(format!("--site-mail={}", credentials.site_mail));
    args.push(profile);
    if has_existing_config(config) {
        args.push("--existing-config".to_string());
    }

    let mut collection = TaskCollection::new("install-profile")
        .with(drush(config, args))
        .with(drush(
            config,
            [
                "user:role:add".to_string(),
                "administrator".to_string(),
                credentials.account_name.clone(),
            ],
        ));

    for command in &config.post_install {
        let words = shell::split_words(command).ok_or_else(|| {
            Error::config_invalid_value(
                "extra.drupalconfig.drushPostInstall",
                Some(command.clone()),
                "unterminated quote or trailing backslash",
            )
        })?;
        if !words.is_empty() {
            collection.push(drush(config, words));
        }
    }

    Ok(collection)
}

/// Bring an installed site up to date with code and configuration.
pub fn update(params: &WorkflowParams, ctx: &AssemblyContext) -> TaskCollection {
    let config = ctx.config;

    let mut update = ParallelGroup::new("update").with(invoke(config, "update-config", params.devel));
    if params.devel {
        update.push(invoke(config, "style-build", true));
    }

    let mut collection = TaskCollection::new("update")
        .with(drush(config, ["updatedb"]))
        .with(update)
        .with(ParallelGroup::new("post-update").with(invoke(config, "locale-update", false)))
        .with(cache(config));

    if params.devel {
        collection.push(login(config).allow_failure());
    }

    collection
}

pub fn update_config(ctx: &AssemblyContext) -> TaskCollection {
    TaskCollection::new("update-config").with(drush(ctx.config, ["config:import"]))
}

/// Local development install: open up sites/default, install with devel
/// steps, then lock it down again. settings.php stays writable.
pub fn dev(ctx: &AssemblyContext) -> Result<TaskCollection> {
    let sites_default = ctx.config.sites_default_dir();
    Ok(TaskCollection::new("dev")
        .with(Action::chmod("permissions:open", &sites_default, 0o777))
        .with(install_site(&WorkflowParams::devel(), ctx, true)?)
        .with(Action::chmod("permissions:restore", &sites_default, 0o755)))
}

/// Refresh a local copy from stage: dependencies, database, then update.
pub fn update_dev(ctx: &AssemblyContext) -> TaskCollection {
    let config = ctx.config;
    TaskCollection::new("update-dev")
        .with(Action::exec("composer:install", config.composer().arg("install")))
        .with(database::sync_stage(&WorkflowParams::default(), ctx))
        .with(update(&WorkflowParams::devel(), ctx))
}

/// Cache rebuild, plus image derivative flush when the image module is
/// configured.
fn cache(config: &ProjectConfig) -> TaskCollection {
    let mut cache = TaskCollection::new("cache").with(drush(config, ["cache-rebuild"]));
    if config.config_sync_dir().join(IMAGE_SETTINGS_FILE).is_file() {
        cache.push(drush(config, ["image-flush", "--all"]));
    }
    cache
}

fn login(config: &ProjectConfig) -> Action {
    drush(config, [config.alias("local"), "user:login".to_string()])
}

fn settings_lines(config: &ProjectConfig) -> Vec<String> {
    vec![
        String::new(),
        "// Custom configurations.".to_string(),
        "include $app_root . '/' . $site_path . '/settings.local.php';".to_string(),
        format!(
            "$settings['install_profile'] = '{}';",
            config.defaults.install_profile
        ),
        "$settings['config_sync_directory'] = '../config/sync';".to_string(),
    ]
}

/// The sync directory holds exported configuration (anything besides the
/// access guard).
fn has_existing_config(config: &ProjectConfig) -> bool {
    fs::read_dir(config.config_sync_dir())
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .any(|entry| entry.file_name() != ".htaccess")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{self, args_of, labels, StaticLocator};
    use super::*;
    use crate::action::ActionKind;
    use crate::engine::Entry;

    fn ctx<'a>(
        config: &'a ProjectConfig,
        locator: &'a StaticLocator,
    ) -> AssemblyContext<'a> {
        AssemblyContext::new(config, locator).at(fixtures::noon())
    }

    fn group(collection: &TaskCollection, index: usize) -> &ParallelGroup {
        match &collection.entries[index] {
            Entry::Parallel(group) => group,
            other => panic!("expected parallel group, got {:?}", other.label()),
        }
    }

    fn member_args(group: &ParallelGroup) -> Vec<Vec<String>> {
        group.members.iter().map(args_of).collect()
    }

    #[test]
    fn install_without_devel_has_five_entries() {
        let project = fixtures::project("ca", "intranet");
        let locator = StaticLocator::empty();
        let collection = install(&WorkflowParams::default(), &ctx(&project.config, &locator)).unwrap();

        assert_eq!(
            labels(&collection),
            vec!["settings:copy", "settings:append", "install", "post-install", "cache"]
        );
        let root = project.root().display().to_string();
        assert_eq!(
            member_args(group(&collection, 2)),
            vec![vec!["--root".to_string(), root.clone(), "install-profile".to_string()]]
        );
        assert_eq!(
            member_args(group(&collection, 3)),
            vec![vec!["--root".to_string(), root, "locale-update".to_string()]]
        );
    }

    #[test]
    fn install_with_devel_builds_styles_and_logs_in() {
        let project = fixtures::project("ca", "intranet");
        let locator = StaticLocator::empty();
        let collection = install(&WorkflowParams::devel(), &ctx(&project.config, &locator)).unwrap();

        assert_eq!(
            labels(&collection),
            vec![
                "settings:copy",
                "settings:append",
                "install",
                "post-install",
                "cache",
                "migrate-import",
                "user:login"
            ]
        );
        let install = group(&collection, 2);
        assert_eq!(install.len(), 2);
        assert_eq!(&args_of(&install.members[0])[2..], ["install-profile", "--devel"]);
        assert_eq!(&args_of(&install.members[1])[2..], ["style-build", "--devel"]);

        let Entry::Action(login) = &collection.entries[6] else {
            panic!("login should be an action");
        };
        assert_eq!(&args_of(login)[2..], ["@intranet.local", "user:login"]);
        assert!(!login.allow_failure);
    }

    #[test]
    fn settings_copy_overwrites_from_default() {
        let project = fixtures::project("en", "bartik");
        let locator = StaticLocator::empty();
        let collection = install(&WorkflowParams::default(), &ctx(&project.config, &locator)).unwrap();

        let Entry::Action(copy) = &collection.entries[0] else {
            panic!("copy should be an action");
        };
        let sites_default = project.root().join("web/sites/default");
        assert_eq!(
            copy.kind,
            ActionKind::Copy {
                from: sites_default.join("default.settings.php"),
                to: sites_default.join("settings.php"),
                overwrite: true,
            }
        );

        let Entry::Action(append) = &collection.entries[1] else {
            panic!("append should be an action");
        };
        let ActionKind::AppendLines { lines, .. } = &append.kind else {
            panic!("append should append lines");
        };
        assert_eq!(lines[0], "");
        assert_eq!(lines[3], "$settings['install_profile'] = 'kickstart';");
        assert_eq!(lines[4], "$settings['config_sync_directory'] = '../config/sync';");
    }

    #[test]
    fn cache_flushes_images_only_when_configured() {
        let project = fixtures::project("en", "bartik");
        assert_eq!(cache(&project.config).len(), 1);

        fs::write(project.root().join("config/sync/image.settings.yml"), "preview_image: x\n").unwrap();
        let cache = cache(&project.config);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.entries[1].label(), "image-flush");
    }

    #[test]
    fn install_profile_for_fresh_config() {
        let project = fixtures::fresh_project();
        let locator = StaticLocator::empty();
        let collection =
            install_profile(&WorkflowParams::default(), &ctx(&project.config, &locator)).unwrap();

        let actions = collection.actions();
        assert_eq!(actions.len(), 4);
        assert_eq!(
            &args_of(actions[0])[2..],
            [
                "site:install",
                "--account-name=admin",
                "--account-pass=secret",
                "--account-mail=admin@example.com",
                "--locale=en",
                "--site-mail=site@example.com",
                "kickstart"
            ]
        );
        assert_eq!(&args_of(actions[1])[2..], ["user:role:add", "administrator", "admin"]);
        assert_eq!(&args_of(actions[2])[2..], ["pm:enable", "devel"]);
        assert_eq!(
            &args_of(actions[3])[2..],
            ["config:set", "system.site", "page.front", "/home"]
        );
    }

    #[test]
    fn install_profile_uses_existing_config_when_exported() {
        let project = fixtures::project("ca", "intranet");
        let locator = StaticLocator::empty();
        let params = WorkflowParams {
            profile: Some("minimal".to_string()),
            ..WorkflowParams::default()
        };
        // system.site.yml and system.theme.yml are already in the sync dir.
        let collection = install_profile(&params, &ctx(&project.config, &locator)).unwrap();
        let args = args_of(collection.actions()[0]);
        assert_eq!(args[args.len() - 2], "minimal");
        assert_eq!(args[args.len() - 1], "--existing-config");
    }

    #[test]
    fn install_profile_requires_credentials() {
        let project = fixtures::fresh_project_with(r#"{"name": "acme/intranet"}"#);
        let locator = StaticLocator::empty();
        let ctx = ctx(&project.config, &locator);

        let err = install_profile(&WorkflowParams::default(), &ctx).unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
        assert_eq!(err.details["key"], "extra.drupalconfig.accountname");

        let err = install(&WorkflowParams::default(), &ctx).unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
        assert!(dev(&ctx).is_err());
    }

    #[test]
    fn post_install_commands_keep_quoted_arguments() {
        let project = fixtures::fresh_project_with(
            r#"{"name": "acme/intranet", "extra": {"drupalconfig": {
                "accountname": "admin", "accountpass": "secret",
                "accountmail": "admin@example.com", "sitemail": "site@example.com",
                "drushPostInstall": ["config:set system.site name 'Acme Intranet'"]
            }}}"#,
        );
        let locator = StaticLocator::empty();
        let collection =
            install_profile(&WorkflowParams::default(), &ctx(&project.config, &locator)).unwrap();

        let actions = collection.actions();
        assert_eq!(actions.len(), 3);
        assert_eq!(
            &args_of(actions[2])[2..],
            ["config:set", "system.site", "name", "Acme Intranet"]
        );
        assert_eq!(actions[2].label, "config:set");
    }

    #[test]
    fn unbalanced_post_install_quote_is_a_config_error() {
        let project = fixtures::fresh_project_with(
            r#"{"name": "acme/intranet", "extra": {"drupalconfig": {
                "accountname": "admin", "accountpass": "secret",
                "accountmail": "admin@example.com", "sitemail": "site@example.com",
                "drushPostInstall": ["config:set system.site name 'Acme"]
            }}}"#,
        );
        let locator = StaticLocator::empty();
        let err = install_profile(&WorkflowParams::default(), &ctx(&project.config, &locator))
            .unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["value"], "config:set system.site name 'Acme");
    }

    #[test]
    fn update_with_devel_tolerates_login_failure() {
        let project = fixtures::project("ca", "intranet");
        let locator = StaticLocator::empty();
        let collection = update(&WorkflowParams::devel(), &ctx(&project.config, &locator));

        assert_eq!(
            labels(&collection),
            vec!["updatedb", "update", "post-update", "cache", "user:login"]
        );
        assert_eq!(group(&collection, 1).len(), 2);
        let Entry::Action(login) = &collection.entries[4] else {
            panic!("login should be an action");
        };
        assert!(login.allow_failure);
    }

    #[test]
    fn update_without_devel() {
        let project = fixtures::project("ca", "intranet");
        let locator = StaticLocator::empty();
        let collection = update(&WorkflowParams::default(), &ctx(&project.config, &locator));

        assert_eq!(labels(&collection), vec!["updatedb", "update", "post-update", "cache"]);
        assert_eq!(&args_of(&group(&collection, 1).members[0])[2..], ["update-config"]);
    }

    #[test]
    fn dev_wraps_devel_install_in_permission_changes() {
        let project = fixtures::project("ca", "intranet");
        let locator = StaticLocator::empty();
        let collection = dev(&ctx(&project.config, &locator)).unwrap();

        assert_eq!(
            labels(&collection),
            vec!["permissions:open", "install", "permissions:restore"]
        );
        let Entry::Collection(install) = &collection.entries[1] else {
            panic!("install should be nested");
        };
        assert_eq!(
            labels(install),
            vec![
                "settings:copy",
                "settings:append",
                "settings:permissions",
                "install",
                "post-install",
                "cache",
                "migrate-import",
                "user:login"
            ]
        );
        let Entry::Action(open) = &install.entries[2] else {
            panic!("settings permissions should be an action");
        };
        assert_eq!(
            open.kind,
            ActionKind::Chmod {
                path: project.root().join("web/sites/default/settings.php"),
                mode: 0o777,
            }
        );
    }

    #[test]
    fn plain_install_leaves_settings_permissions_alone() {
        let project = fixtures::project("ca", "intranet");
        let locator = StaticLocator::empty();
        let collection = install(&WorkflowParams::devel(), &ctx(&project.config, &locator)).unwrap();
        assert!(!labels(&collection).contains(&"settings:permissions".to_string()));
    }

    #[test]
    fn update_dev_syncs_before_updating() {
        let project = fixtures::project("ca", "intranet");
        let locator = StaticLocator::empty();
        let collection = update_dev(&ctx(&project.config, &locator));

        assert_eq!(labels(&collection), vec!["composer:install", "sync-stage", "update"]);
        let actions = collection.actions();
        assert_eq!(&args_of(actions[1])[2..], ["sql-sync", "@intranet.stage", "@self"]);
    }
}
