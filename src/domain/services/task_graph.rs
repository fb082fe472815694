//! Task graph
//!
//! Tasks are either leaves (a body plus a role filter) or groups that expand
//! to their children in order. `declare_before(task, prerequisite)` splices
//! the prerequisite's expansion in front of the task's wherever it appears.
//!
//! The graph is validated once when built: every reference must resolve and
//! no task may (transitively) contain itself. Expansion afterwards cannot
//! fail on structure.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::entities::Role;
use crate::error::{CutoverError, CutoverResult};

/// What a task does when reached
#[derive(Debug, Clone)]
pub enum TaskKind<B> {
    Leaf {
        body: B,
        /// Empty means "run once locally, without a host"
        roles: Vec<Role>,
        /// Run on the first matching host only
        once: bool,
    },
    Group(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Task<B> {
    name: String,
    description: String,
    kind: TaskKind<B>,
}

impl<B> Task<B> {
    pub fn leaf(name: impl Into<String>, body: B) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind: TaskKind::Leaf {
                body,
                roles: Vec::new(),
                once: false,
            },
        }
    }

    pub fn group<I, S>(name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: String::new(),
            kind: TaskKind::Group(children.into_iter().map(Into::into).collect()),
        }
    }

    pub fn on_roles(mut self, filter: impl IntoIterator<Item = Role>) -> Self {
        if let TaskKind::Leaf { roles, .. } = &mut self.kind {
            roles.extend(filter);
        }
        self
    }

    pub fn once(mut self) -> Self {
        if let TaskKind::Leaf { once, .. } = &mut self.kind {
            *once = true;
        }
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &TaskKind<B> {
        &self.kind
    }

    pub fn roles(&self) -> &[Role] {
        match &self.kind {
            TaskKind::Leaf { roles, .. } => roles,
            TaskKind::Group(_) => &[],
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(&self.kind, TaskKind::Leaf { roles, .. } if roles.is_empty())
    }
}

/// Collects tasks and ordering constraints
pub struct TaskGraphBuilder<B> {
    tasks: BTreeMap<String, Task<B>>,
    before: HashMap<String, Vec<String>>,
}

impl<B> Default for TaskGraphBuilder<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> TaskGraphBuilder<B> {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            before: HashMap::new(),
        }
    }

    /// Add a task; registering an existing name replaces it
    pub fn register(&mut self, task: Task<B>) -> &mut Self {
        self.tasks.insert(task.name.clone(), task);
        self
    }

    /// Run `prerequisite` immediately before `task`
    pub fn declare_before(
        &mut self,
        task: impl Into<String>,
        prerequisite: impl Into<String>,
    ) -> &mut Self {
        let prereqs = self.before.entry(task.into()).or_default();
        let prerequisite = prerequisite.into();
        if !prereqs.contains(&prerequisite) {
            prereqs.push(prerequisite);
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Validate references and acyclicity
    pub fn build(self) -> CutoverResult<TaskGraph<B>> {
        let graph = TaskGraph {
            tasks: self.tasks,
            before: self.before,
        };

        for (task, prereqs) in &graph.before {
            for name in std::iter::once(task).chain(prereqs) {
                if !graph.tasks.contains_key(name) {
                    return Err(CutoverError::UnknownTask { name: name.clone() });
                }
            }
        }
        for task in graph.tasks.values() {
            if let TaskKind::Group(children) = &task.kind {
                if let Some(missing) = children.iter().find(|c| !graph.tasks.contains_key(*c)) {
                    return Err(CutoverError::UnknownTask {
                        name: missing.clone(),
                    });
                }
            }
        }

        {
            let mut state: HashMap<&str, Visit> = HashMap::new();
            let mut path: Vec<&str> = Vec::new();
            for name in graph.tasks.keys() {
                graph.detect_cycle(name, &mut state, &mut path)?;
            }
        }

        Ok(graph)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// A validated, immutable task graph
pub struct TaskGraph<B> {
    tasks: BTreeMap<String, Task<B>>,
    before: HashMap<String, Vec<String>>,
}

impl<B> TaskGraph<B> {
    pub fn get(&self, name: &str) -> Option<&Task<B>> {
        self.tasks.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task<B>> {
        self.tasks.values()
    }

    /// Leaf tasks for `name`, in execution order
    ///
    /// A leaf reachable along several routes runs at its first position only.
    pub fn execution_order(&self, name: &str) -> CutoverResult<Vec<&Task<B>>> {
        if !self.tasks.contains_key(name) {
            return Err(CutoverError::UnknownTask {
                name: name.to_string(),
            });
        }
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        self.expand(name, &mut order, &mut seen);
        Ok(order)
    }

    fn expand<'a>(
        &'a self,
        name: &str,
        order: &mut Vec<&'a Task<B>>,
        seen: &mut HashSet<&'a str>,
    ) {
        if let Some(prereqs) = self.before.get(name) {
            for prereq in prereqs {
                self.expand(prereq, order, seen);
            }
        }
        let Some(task) = self.tasks.get(name) else {
            return;
        };
        match &task.kind {
            TaskKind::Group(children) => {
                for child in children {
                    self.expand(child, order, seen);
                }
            }
            TaskKind::Leaf { .. } => {
                if seen.insert(task.name.as_str()) {
                    order.push(task);
                }
            }
        }
    }

    fn edges<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a String> {
        let prereqs = self.before.get(name).into_iter().flatten();
        let children: &'a [String] = match self.tasks.get(name).map(|t| &t.kind) {
            Some(TaskKind::Group(children)) => children.as_slice(),
            _ => &[],
        };
        prereqs.chain(children.iter())
    }

    fn detect_cycle<'a>(
        &'a self,
        name: &'a str,
        state: &mut HashMap<&'a str, Visit>,
        path: &mut Vec<&'a str>,
    ) -> CutoverResult<()> {
        match state.get(name) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                let start = path.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(name.to_string());
                return Err(CutoverError::TaskCycle { path: cycle });
            }
            None => {}
        }

        state.insert(name, Visit::InProgress);
        path.push(name);
        for next in self.edges(name) {
            self.detect_cycle(next, state, path)?;
        }
        path.pop();
        state.insert(name, Visit::Done);
        Ok(())
    }
}
