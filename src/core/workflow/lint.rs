use crate::action::Action;
use crate::engine::TaskCollection;

use super::{AssemblyContext, WorkflowParams};

/// Validate composer.json, then run the PHP coding standard.
pub fn lint(params: &WorkflowParams, ctx: &AssemblyContext) -> TaskCollection {
    TaskCollection::new("lint")
        .with(lint_composer(ctx))
        .with(lint_php(params, ctx))
}

pub fn lint_composer(ctx: &AssemblyContext) -> TaskCollection {
    TaskCollection::new("lint-composer").with(Action::exec(
        "composer:validate",
        ctx.config.composer().arg("validate"),
    ))
}

/// `composer phpcs`, or `composer phpcbf` to apply fixes.
pub fn lint_php(params: &WorkflowParams, ctx: &AssemblyContext) -> TaskCollection {
    let script = if params.fix { "phpcbf" } else { "phpcs" };
    TaskCollection::new("lint-php").with(Action::exec(
        format!("composer:{}", script),
        ctx.config.composer().arg(script),
    ))
}
