//! Task dependency graph
//!
//! Status is always derived from the dependency closure at query time,
//! never cached: marking a task complete triggers no cascading updates,
//! and dependents become ready on their next status query. This keeps the
//! invariant "ready implies all dependencies complete" true by
//! construction.

use std::collections::BTreeMap;
use tracing::debug;
use ward_core::{Result, TaskNode, TaskStatus, WardError};

/// A dependency graph over named work items
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: BTreeMap<String, TaskNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from persisted nodes, validating the dependency
    /// closure. An unknown dependency is fatal at graph-build time, and
    /// so is a dependency cycle (status derivation would never settle).
    pub fn from_nodes(nodes: BTreeMap<String, TaskNode>) -> Result<Self> {
        for (name, node) in &nodes {
            for dep in &node.dependencies {
                if !nodes.contains_key(dep) {
                    return Err(WardError::UnknownDependency {
                        task: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut settled = std::collections::BTreeSet::new();
        for name in nodes.keys() {
            let mut trail = Vec::new();
            check_acyclic(name, &nodes, &mut settled, &mut trail)?;
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &BTreeMap<String, TaskNode> {
        &self.nodes
    }

    pub fn into_nodes(self) -> BTreeMap<String, TaskNode> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a work item; its dependencies must already exist
    ///
    /// Redefining an existing task can close a cycle through its
    /// dependents, so the dependency closure is re-checked from the new
    /// node before the change is kept.
    pub fn add_task(&mut self, name: impl Into<String>, node: TaskNode) -> Result<()> {
        let name = name.into();
        for dep in &node.dependencies {
            if !self.nodes.contains_key(dep) {
                return Err(WardError::UnknownDependency {
                    task: name,
                    dependency: dep.clone(),
                });
            }
        }

        let deps = node.dependencies.len();
        let previous = self.nodes.insert(name.clone(), node);
        let mut settled = std::collections::BTreeSet::new();
        let mut trail = Vec::new();
        if let Err(e) = check_acyclic(&name, &self.nodes, &mut settled, &mut trail) {
            // Roll back so a rejected redefinition leaves the graph intact
            match previous {
                Some(previous) => {
                    self.nodes.insert(name, previous);
                }
                None => {
                    self.nodes.remove(&name);
                }
            }
            return Err(e);
        }
        debug!(task = %name, deps, "Task added");
        Ok(())
    }

    /// Derived status: complete if marked; else in-progress if marked;
    /// else ready iff every dependency is complete; else blocked.
    pub fn status(&self, name: &str) -> Option<TaskStatus> {
        let node = self.nodes.get(name)?;
        Some(match node.status {
            TaskStatus::Complete => TaskStatus::Complete,
            TaskStatus::InProgress => TaskStatus::InProgress,
            _ => {
                let all_deps_complete = node
                    .dependencies
                    .iter()
                    .all(|dep| self.status(dep) == Some(TaskStatus::Complete));
                if all_deps_complete {
                    TaskStatus::Ready
                } else {
                    TaskStatus::Blocked
                }
            }
        })
    }

    /// Mark a task complete; dependents are untouched and recompute
    /// lazily on their next status query.
    pub fn mark_complete(&mut self, name: &str) -> Result<()> {
        self.mark(name, TaskStatus::Complete)
    }

    pub fn mark_in_progress(&mut self, name: &str) -> Result<()> {
        self.mark(name, TaskStatus::InProgress)
    }

    fn mark(&mut self, name: &str, status: TaskStatus) -> Result<()> {
        let node = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| WardError::Other(format!("Unknown task: {}", name)))?;
        node.status = status;
        debug!(task = name, status = %status, "Task marked");
        Ok(())
    }

    /// Names of tasks currently ready to start, in name order
    pub fn ready_tasks(&self) -> Vec<&str> {
        self.nodes
            .keys()
            .filter(|name| self.status(name) == Some(TaskStatus::Ready))
            .map(String::as_str)
            .collect()
    }
}

fn check_acyclic(
    name: &str,
    nodes: &BTreeMap<String, TaskNode>,
    settled: &mut std::collections::BTreeSet<String>,
    trail: &mut Vec<String>,
) -> Result<()> {
    if settled.contains(name) {
        return Ok(());
    }
    if trail.iter().any(|n| n == name) {
        return Err(WardError::Configuration(format!(
            "Dependency cycle through task '{}'",
            name
        )));
    }
    trail.push(name.to_string());
    if let Some(node) = nodes.get(name) {
        for dep in &node.dependencies {
            check_acyclic(dep, nodes, settled, trail)?;
        }
    }
    trail.pop();
    settled.insert(name.to_string());
    Ok(())
}
