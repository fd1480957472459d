//! Project configuration, loaded once per invocation.
//!
//! Sources, in order of precedence:
//! 1. Environment (`ACCOUNT_NAME`, `ACCOUNT_PASS`, `ACCOUNT_MAIL`, `LOCALE`,
//!    `SITE_NAME`, `SITE_MAIL`)
//! 2. `composer.json` (`name`, `extra.drupalconfig`)
//! 3. `<config sync>/system.site.yml` and `<config sync>/system.theme.yml`,
//!    both optional until configuration has been exported
//! 4. `drobo.json` layout overrides (see [`crate::defaults`])
//!
//! Install credentials are only checked by the workflows that install a site,
//! through [`ProjectConfig::credentials`].

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::action::CommandSpec;
use crate::defaults::{self, Defaults};
use crate::error::{Error, Result};
use crate::utils::io;

pub const PACKAGE_FILE: &str = "composer.json";
pub const SITE_FILE: &str = "system.site.yml";
pub const THEME_FILE: &str = "system.theme.yml";

#[derive(Debug, Deserialize)]
struct PackageDescriptor {
    name: Option<String>,
    #[serde(default)]
    extra: PackageExtra,
}

#[derive(Debug, Default, Deserialize)]
struct PackageExtra {
    #[serde(default)]
    drupalconfig: DrupalConfig,
}

#[derive(Debug, Default, Deserialize)]
struct DrupalConfig {
    accountname: Option<String>,
    accountpass: Option<String>,
    accountmail: Option<String>,
    sitemail: Option<String>,
    sitename: Option<String>,
    #[serde(rename = "drushPostInstall", default)]
    drush_post_install: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SiteSettings {
    default_langcode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThemeSettings {
    default: Option<String>,
}

/// Site administrator account and site mail used by site installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_name: String,
    pub account_pass: String,
    pub account_mail: String,
    pub site_mail: String,
    pub site_name: Option<String>,
}

/// Credential values as found at load, environment already applied.
#[derive(Debug, Clone, Default)]
struct CredentialValues {
    account_name: Option<String>,
    account_pass: Option<String>,
    account_mail: Option<String>,
    site_mail: Option<String>,
    site_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub root: PathBuf,
    /// Package name without its vendor prefix; used for drush aliases.
    pub project_name: String,
    /// Site default language from system.site.yml, or the base language
    /// before configuration is exported.
    pub default_langcode: String,
    /// Locale passed to site installation (`LOCALE` or the default language).
    pub install_locale: String,
    /// Active theme machine name from system.theme.yml, or the base theme.
    pub theme: String,
    /// Extra drush commands to run after site installation.
    pub post_install: Vec<String>,
    pub defaults: Defaults,
    credentials: CredentialValues,
    package_path: PathBuf,
    runner_program: String,
}

impl ProjectConfig {
    /// Load from the process environment, re-invoking this executable for
    /// parallel members unless drobo.json names another runner.
    pub fn load(root: &Path) -> Result<Self> {
        let runner = std::env::current_exe()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| "drobo".to_string());
        Self::load_with(root, &|key| std::env::var(key).ok(), runner)
    }

    pub fn load_with(
        root: &Path,
        env: &dyn Fn(&str) -> Option<String>,
        runner_program: String,
    ) -> Result<Self> {
        let defaults = defaults::load(root)?;
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let package_path = root.join(PACKAGE_FILE);
        let package: PackageDescriptor =
            serde_json::from_str(&io::read_config_file(&package_path)?).map_err(|e| {
                Error::config_invalid_json(package_path.display().to_string(), e)
            })?;

        let name = package
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                Error::config_missing_key("name", Some(package_path.display().to_string()))
            })?;
        let project_name = name.rsplit('/').next().unwrap_or(&name).to_string();

        let drupal = package.extra.drupalconfig;
        let pick = |env_key: &str, value: Option<String>| {
            env(env_key).or(value.filter(|v| !v.trim().is_empty()))
        };
        let credentials = CredentialValues {
            account_name: pick("ACCOUNT_NAME", drupal.accountname),
            account_pass: pick("ACCOUNT_PASS", drupal.accountpass),
            account_mail: pick("ACCOUNT_MAIL", drupal.accountmail),
            site_mail: pick("SITE_MAIL", drupal.sitemail),
            site_name: pick("SITE_NAME", drupal.sitename),
        };

        let sync_dir = root.join(&defaults.config_sync_dir);

        // A file that is present must carry its key; an absent one means
        // nothing has been exported yet.
        let site_path = sync_dir.join(SITE_FILE);
        let default_langcode = match parse_optional_yaml::<SiteSettings>(&site_path)? {
            Some(site) => site.default_langcode.ok_or_else(|| {
                Error::config_missing_key("default_langcode", Some(site_path.display().to_string()))
            })?,
            None => defaults.base_langcode.clone(),
        };

        let theme_path = sync_dir.join(THEME_FILE);
        let theme = match parse_optional_yaml::<ThemeSettings>(&theme_path)? {
            Some(theme) => theme.default.ok_or_else(|| {
                Error::config_missing_key("default", Some(theme_path.display().to_string()))
            })?,
            None => defaults.base_theme.clone(),
        };

        let install_locale = env("LOCALE").unwrap_or_else(|| default_langcode.clone());
        let runner_program = defaults
            .runner
            .as_deref()
            .map(|p| resolve_program(root, p))
            .unwrap_or(runner_program);

        Ok(Self {
            root: root.to_path_buf(),
            project_name,
            default_langcode,
            install_locale,
            theme,
            post_install: drupal.drush_post_install,
            defaults,
            credentials,
            package_path,
            runner_program,
        })
    }

    /// Administrator account and site mail for site installation.
    ///
    /// Fails with `config.missing_key` naming the first unset value.
    pub fn credentials(&self) -> Result<Credentials> {
        let values = &self.credentials;
        Ok(Credentials {
            account_name: self.require(&values.account_name, "accountname", "ACCOUNT_NAME")?,
            account_pass: self.require(&values.account_pass, "accountpass", "ACCOUNT_PASS")?,
            account_mail: self.require(&values.account_mail, "accountmail", "ACCOUNT_MAIL")?,
            site_mail: self.require(&values.site_mail, "sitemail", "SITE_MAIL")?,
            site_name: values.site_name.clone(),
        })
    }

    fn require(&self, value: &Option<String>, key: &str, env_key: &str) -> Result<String> {
        value.clone().ok_or_else(|| {
            Error::config_missing_key(
                format!("extra.drupalconfig.{}", key),
                Some(self.package_path.display().to_string()),
            )
            .with_hint(format!("Set it in composer.json or export {}", env_key))
        })
    }

    pub fn web_dir(&self) -> PathBuf {
        self.root.join(&self.defaults.web_dir)
    }

    pub fn sites_default_dir(&self) -> PathBuf {
        self.web_dir().join("sites").join("default")
    }

    pub fn config_sync_dir(&self) -> PathBuf {
        self.root.join(&self.defaults.config_sync_dir)
    }

    pub fn custom_translations_dir(&self) -> PathBuf {
        self.root.join(&self.defaults.custom_translations_dir)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(&self.defaults.backups_dir)
    }

    pub fn theme_dir(&self) -> PathBuf {
        self.root.join(&self.defaults.themes_dir).join(&self.theme)
    }

    /// Non-interactive drush bound to the docroot.
    pub fn drush(&self) -> CommandSpec {
        CommandSpec::new(resolve_program(&self.root, &self.defaults.drush))
            .arg("--yes")
            .arg(format!("--root={}", self.web_dir().display()))
    }

    pub fn npm(&self) -> CommandSpec {
        CommandSpec::new(resolve_program(&self.root, &self.defaults.npm))
    }

    pub fn composer(&self) -> CommandSpec {
        CommandSpec::new(resolve_program(&self.root, &self.defaults.composer)).dir(&self.root)
    }

    /// This tool, re-invoked against the same project root.
    pub fn runner(&self) -> CommandSpec {
        CommandSpec::new(&self.runner_program)
            .arg("--root")
            .arg(self.root.display().to_string())
    }

    /// Drush alias for one of the project's environments, e.g. `@site.local`.
    pub fn alias(&self, environment: &str) -> String {
        format!("@{}.{}", self.project_name, environment)
    }
}

fn parse_optional_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(content) = io::read_optional_file(path)? else {
        return Ok(None);
    };
    serde_yml::from_str(&content)
        .map(Some)
        .map_err(|e| Error::config_invalid_yaml(path.display().to_string(), e))
}

/// Relative paths with a separator are taken from the project root; bare
/// names are left for PATH lookup.
fn resolve_program(root: &Path, program: &str) -> String {
    let path = Path::new(program);
    if path.is_absolute() || !program.contains('/') {
        program.to_string()
    } else {
        root.join(path).display().to_string()
    }
}
