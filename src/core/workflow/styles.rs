use crate::action::Action;
use crate::engine::TaskCollection;

use super::{AssemblyContext, WorkflowParams};

/// Compile the active custom theme's stylesheets. Nothing to do while the
/// site still runs the base theme.
pub fn style_build(params: &WorkflowParams, ctx: &AssemblyContext) -> TaskCollection {
    let config = ctx.config;
    let mut collection = TaskCollection::new("style-build");
    if config.theme == config.defaults.base_theme {
        return collection;
    }

    let theme_dir = config.theme_dir();
    let npm = || config.npm().dir(&theme_dir);
    let target = if params.devel { "styles" } else { "styles:production" };

    collection.push(Action::exec("npm:install", npm().args(["install", "--no-save"])));
    collection.push(Action::exec("npm:rebuild", npm().args(["rebuild", "node-sass"])));
    collection.push(Action::exec("gulp", npm().args(["run", "gulp", target])));
    collection
}
