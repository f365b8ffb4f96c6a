// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Task dependency graph
//!
//! Every task is a node; every reference (a `depends_on` entry or a series /
//! parallel member) is an edge from the referenced task to the referrer. The
//! graph is validated once at startup: unknown references and cycles fail
//! before anything runs.

use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::fmt;

use crate::errors::AssetflowError;
use crate::pipeline::{TaskKind, TaskRef, Taskfile};

/// Executable plan for a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Run a single non-composite task
    Run(String),
    /// Run members in order, stopping at the first failure
    Series(Vec<Plan>),
    /// Run members concurrently
    Parallel(Vec<Plan>),
}

impl Plan {
    /// Leaf task names in the order a sequential walk would visit them
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Run(name) => out.push(name),
            Self::Series(plans) | Self::Parallel(plans) => {
                for plan in plans {
                    plan.collect_leaves(out);
                }
            }
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, plans) = match self {
            Self::Run(name) => return write!(f, "{}", name),
            Self::Series(plans) => ("series", plans),
            Self::Parallel(plans) => ("parallel", plans),
        };
        write!(f, "{}(", label)?;
        for (i, plan) in plans.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", plan)?;
        }
        write!(f, ")")
    }
}

/// Validated task graph
pub struct TaskGraph {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
    taskfile: Taskfile,
}

impl TaskGraph {
    /// Build and validate the graph for a taskfile
    pub fn build(taskfile: &Taskfile) -> Result<Self, AssetflowError> {
        let mut graph = DiGraph::new();
        let mut name_to_index = HashMap::new();
        let mut index_to_name = HashMap::new();

        // Add all tasks as nodes
        for (idx, task) in taskfile.tasks.iter().enumerate() {
            if name_to_index.contains_key(&task.name) {
                return Err(AssetflowError::DuplicateTask {
                    task: task.name.clone(),
                });
            }
            let node = graph.add_node(idx);
            name_to_index.insert(task.name.clone(), node);
            index_to_name.insert(node, task.name.clone());
        }

        // Add reference edges
        for task in &taskfile.tasks {
            let task_node = name_to_index[&task.name];
            for reference in task.references() {
                let dep_node = name_to_index.get(reference).ok_or_else(|| {
                    AssetflowError::UnknownReference {
                        task: task.name.clone(),
                        reference: reference.to_string(),
                    }
                })?;

                if !graph.contains_edge(*dep_node, task_node) {
                    graph.add_edge(*dep_node, task_node, ());
                }
            }
        }

        let dag = Self {
            graph,
            name_to_index,
            index_to_name,
            taskfile: taskfile.clone(),
        };
        dag.validate_acyclic()?;

        Ok(dag)
    }

    /// Validate that the graph is acyclic
    fn validate_acyclic(&self) -> Result<(), AssetflowError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(_) => Err(AssetflowError::CircularDependency {
                tasks: self.find_cycle_members(),
            }),
        }
    }

    /// Names of the tasks in the first cycle found, first name repeated at the end
    fn find_cycle_members(&self) -> Vec<String> {
        for component in kosaraju_scc(&self.graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .map(|n| self.graph.contains_edge(*n, *n))
                    .unwrap_or(false);
            if !is_cycle {
                continue;
            }

            let mut members: Vec<NodeIndex> = component;
            members.sort_by_key(|n| self.graph[*n]);
            let mut names: Vec<String> = members
                .iter()
                .map(|n| self.index_to_name[n].clone())
                .collect();
            if let Some(first) = names.first().cloned() {
                names.push(first);
            }
            return names;
        }
        vec![]
    }

    /// The taskfile this graph was built from
    pub fn taskfile(&self) -> &Taskfile {
        &self.taskfile
    }

    /// Whether a task is registered
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Compile a task into its execution plan
    pub fn plan(&self, name: &str) -> Result<Plan, AssetflowError> {
        let task = self
            .taskfile
            .get_task(name)
            .ok_or_else(|| AssetflowError::UnknownTask {
                task: name.to_string(),
            })?;

        let body = match &task.kind {
            TaskKind::Series { tasks } => Plan::Series(self.plan_refs(tasks)?),
            TaskKind::Parallel { tasks } => Plan::Parallel(self.plan_refs(tasks)?),
            _ => Plan::Run(task.name.clone()),
        };

        if task.depends_on.is_empty() {
            return Ok(body);
        }

        let mut steps = task
            .depends_on
            .iter()
            .map(|dep| self.plan(dep))
            .collect::<Result<Vec<_>, _>>()?;
        steps.push(body);
        Ok(Plan::Series(steps))
    }

    fn plan_refs(&self, refs: &[TaskRef]) -> Result<Vec<Plan>, AssetflowError> {
        refs.iter().map(|r| self.plan_ref(r)).collect()
    }

    fn plan_ref(&self, task_ref: &TaskRef) -> Result<Plan, AssetflowError> {
        match task_ref {
            TaskRef::Name(name) => self.plan(name),
            TaskRef::Series { series } => Ok(Plan::Series(self.plan_refs(series)?)),
            TaskRef::Parallel { parallel } => Ok(Plan::Parallel(self.plan_refs(parallel)?)),
        }
    }

    /// Get topologically sorted task names
    pub fn topological_order_names(&self) -> Result<Vec<String>, AssetflowError> {
        toposort(&self.graph, None)
            .map(|nodes| {
                nodes
                    .into_iter()
                    .map(|n| self.index_to_name[&n].clone())
                    .collect()
            })
            .map_err(|_| AssetflowError::CircularDependency {
                tasks: self.find_cycle_members(),
            })
    }

    /// Tasks referenced by `name` (must be planned before it)
    pub fn dependencies(&self, name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(name)?;
        let mut deps: Vec<(usize, String)> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .map(|n| (self.graph[n], self.index_to_name[&n].clone()))
            .collect();
        deps.sort();
        Some(deps.into_iter().map(|(_, name)| name).collect())
    }

    /// Check if task A references task B, directly or transitively
    pub fn depends_on(&self, task_a: &str, task_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(task_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(task_b) else {
            return false;
        };

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    fn sorted_edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(usize, usize, &str, &str)> = self
            .graph
            .raw_edges()
            .iter()
            .map(|e| {
                (
                    self.graph[e.source()],
                    self.graph[e.target()],
                    self.index_to_name[&e.source()].as_str(),
                    self.index_to_name[&e.target()].as_str(),
                )
            })
            .collect();
        edges.sort();
        edges.into_iter().map(|(_, _, a, b)| (a, b)).collect()
    }

    /// Generate Mermaid diagram of the graph
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for task in &self.taskfile.tasks {
            out.push_str(&format!("    {}[{}]\n", task.name, task.name));
        }

        for (from, to) in self.sorted_edges() {
            out.push_str(&format!("    {} --> {}\n", from, to));
        }

        out
    }

    /// Generate DOT diagram of the graph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph tasks {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.sorted_edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        // Add isolated nodes (no edges)
        for task in &self.taskfile.tasks {
            let node = self.name_to_index[&task.name];
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", task.name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of the registry
    pub fn to_text(&self) -> Result<String, AssetflowError> {
        let order = self.topological_order_names()?;
        let mut out = String::new();

        for (i, name) in order.iter().enumerate() {
            let Some(task) = self.taskfile.get_task(name) else {
                continue;
            };

            out.push_str(&format!("{}. {} ({})", i + 1, task.name, task.kind_name()));
            if task.is_composite() || !task.depends_on.is_empty() {
                out.push_str(&format!(" = {}", self.plan(name)?));
            }
            out.push('\n');
        }

        Ok(out)
    }
}
