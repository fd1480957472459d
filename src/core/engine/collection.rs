use serde::Serialize;

use crate::action::Action;

use super::executor::ActionExecutor;
use super::parallel::ParallelGroup;
use super::result::{Outcome, StepResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum Entry {
    Action(Action),
    Parallel(ParallelGroup),
    Collection(TaskCollection),
}

impl Entry {
    pub fn label(&self) -> &str {
        match self {
            Entry::Action(action) => &action.label,
            Entry::Parallel(group) => &group.name,
            Entry::Collection(collection) => &collection.name,
        }
    }

    pub fn run(&self, executor: &dyn ActionExecutor) -> StepResult {
        match self {
            Entry::Action(action) => executor.execute(action),
            Entry::Parallel(group) => group.run(executor),
            Entry::Collection(collection) => collection.run(executor),
        }
    }

    fn tolerates_failure(&self) -> bool {
        matches!(self, Entry::Action(action) if action.allow_failure)
    }
}

impl From<Action> for Entry {
    fn from(action: Action) -> Self {
        Entry::Action(action)
    }
}

impl From<ParallelGroup> for Entry {
    fn from(group: ParallelGroup) -> Self {
        Entry::Parallel(group)
    }
}

impl From<TaskCollection> for Entry {
    fn from(collection: TaskCollection) -> Self {
        Entry::Collection(collection)
    }
}

/// An ordered, fail-fast sequence of entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskCollection {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl TaskCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: impl Into<Entry>) {
        self.entries.push(entry.into());
    }

    pub fn with(mut self, entry: impl Into<Entry>) -> Self {
        self.push(entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every action in the tree, in declaration order.
    pub fn actions(&self) -> Vec<&Action> {
        let mut actions = Vec::new();
        for entry in &self.entries {
            match entry {
                Entry::Action(action) => actions.push(action),
                Entry::Parallel(group) => actions.extend(group.members.iter()),
                Entry::Collection(collection) => actions.extend(collection.actions()),
            }
        }
        actions
    }

    /// Run entries in order, stopping at the first failure.
    ///
    /// A failing action with `allow_failure` set is recorded as tolerated and
    /// does not stop the collection.
    pub fn run(&self, executor: &dyn ActionExecutor) -> StepResult {
        let mut children = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let mut result = entry.run(executor);

            if result.is_success() {
                children.push(result);
                continue;
            }

            if entry.tolerates_failure() {
                log_status!("collection", "'{}' failed but is allowed to fail", entry.label());
                result.tolerated = true;
                children.push(result);
                continue;
            }

            let outcome = result.outcome;
            children.push(result);
            log_status!(
                "collection",
                "'{}' stopped at '{}'",
                self.name,
                entry.label()
            );
            return StepResult::aggregate(&self.name, outcome, children);
        }

        StepResult::aggregate(&self.name, Outcome::Success, children)
    }
}
