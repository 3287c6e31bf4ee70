//! Forest construction from a flat task list.
//!
//! The builder never fails: parents that do not resolve (missing, stale, or
//! the task itself) make the task a root, and a link that would close a
//! parent cycle is dropped so the task becomes a root instead. Which member
//! of a cycle ends up as the root is decided by input order: earlier tasks
//! keep their parent link.

use std::collections::HashMap;

use serde::Serialize;

use crate::task::Task;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreeNode {
    pub task: Task,
    /// Mirrors `task.task_type`.
    pub level: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(task: Task) -> Self {
        Self {
            level: task.task_type.clone(),
            task,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    /// Number of nodes in this subtree, including the node itself.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.task.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }
}

/// Ordered collection of root nodes.
pub type Forest = Vec<TreeNode>;

/// Disjoint sets over the links made so far. Two tasks share a set when they
/// belong to the same partially built tree.
struct LinkSets {
    parent: Vec<usize>,
}

impl LinkSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut idx: usize) -> usize {
        let mut root = idx;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[idx] != root {
            let next = self.parent[idx];
            self.parent[idx] = root;
            idx = next;
        }
        root
    }

    fn union(&mut self, left: usize, right: usize) {
        let left = self.find(left);
        let right = self.find(right);
        if left != right {
            self.parent[left] = right;
        }
    }
}

/// Build the forest for `tasks`, preserving input order among roots and
/// among each node's children.
///
/// Duplicate ids resolve parent lookups to their first occurrence; every
/// record still gets its own node.
pub fn build_forest(tasks: &[Task]) -> Forest {
    // Index pass.
    let mut index_by_id: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    for (idx, task) in tasks.iter().enumerate() {
        index_by_id.entry(task.id.as_str()).or_insert(idx);
    }

    // Link pass. A task is unlinked until its own turn, so it is still the
    // root of its set; its parent sharing that set means the parent already
    // hangs below it.
    let mut sets = LinkSets::new(tasks.len());
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    let mut roots: Vec<usize> = Vec::new();
    for (idx, task) in tasks.iter().enumerate() {
        let parent = task
            .declared_parent()
            .and_then(|parent| index_by_id.get(parent).copied())
            .filter(|&parent| parent != idx);
        match parent {
            Some(parent) if sets.find(parent) != sets.find(idx) => {
                children[parent].push(idx);
                sets.union(idx, parent);
            }
            _ => roots.push(idx),
        }
    }

    assemble(tasks, &roots, &children)
}

/// Materialize nodes bottom-up with an explicit stack.
fn assemble(tasks: &[Task], roots: &[usize], children: &[Vec<usize>]) -> Forest {
    let mut built: Vec<Option<TreeNode>> = vec![None; tasks.len()];
    let mut forest = Vec::with_capacity(roots.len());

    for &root in roots {
        let mut stack: Vec<(usize, bool)> = vec![(root, false)];
        while let Some((idx, expanded)) = stack.pop() {
            if expanded {
                let mut node = TreeNode::leaf(tasks[idx].clone());
                node.children = children[idx]
                    .iter()
                    .filter_map(|child| built[*child].take())
                    .collect();
                built[idx] = Some(node);
                continue;
            }
            stack.push((idx, true));
            for child in children[idx].iter().rev() {
                stack.push((*child, false));
            }
        }
        if let Some(node) = built[root].take() {
            forest.push(node);
        }
    }

    forest
}

/// Total number of nodes in the forest.
pub fn task_count(forest: &[TreeNode]) -> usize {
    forest.iter().map(TreeNode::size).sum()
}

pub fn find<'a>(forest: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
    forest.iter().find_map(|root| root.find(id))
}

/// One pre-order row of a flattened forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRow<'a> {
    pub depth: usize,
    pub node: &'a TreeNode,
}

/// Pre-order walk with depths, roots at depth 0.
pub fn flatten(forest: &[TreeNode]) -> Vec<FlatRow<'_>> {
    let mut rows = Vec::new();
    let mut stack: Vec<(usize, &TreeNode)> = forest.iter().rev().map(|node| (0, node)).collect();
    while let Some((depth, node)) = stack.pop() {
        rows.push(FlatRow { depth, node });
        for child in node.children.iter().rev() {
            stack.push((depth + 1, child));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(TreeNode::id).collect()
    }

    #[test]
    fn empty_input_builds_empty_forest() {
        assert!(build_forest(&[]).is_empty());
    }

    #[test]
    fn child_listed_before_parent_still_nests() {
        let tasks = vec![Task::new("C", "child").with_parent("P"), Task::new("P", "parent")];
        let forest = build_forest(&tasks);
        assert_eq!(ids(&forest), vec!["P"]);
        assert_eq!(ids(&forest[0].children), vec!["C"]);
    }

    #[test]
    fn level_mirrors_task_type() {
        let tasks = vec![Task::new("E", "epic").with_type("epic"), Task::new("T", "task").with_parent("E")];
        let forest = build_forest(&tasks);
        assert_eq!(forest[0].level, "epic");
        assert_eq!(forest[0].children[0].level, "task");
    }

    #[test]
    fn three_hop_cycle_keeps_every_task() {
        let tasks = vec![
            Task::new("A", "a").with_parent("C"),
            Task::new("B", "b").with_parent("A"),
            Task::new("C", "c").with_parent("B"),
        ];
        let forest = build_forest(&tasks);
        assert_eq!(ids(&forest), vec!["C"]);
        assert_eq!(task_count(&forest), 3);
        let flat: Vec<(usize, &str)> = flatten(&forest)
            .into_iter()
            .map(|row| (row.depth, row.node.id()))
            .collect();
        assert_eq!(flat, vec![(0, "C"), (1, "A"), (2, "B")]);
    }

    #[test]
    fn long_chain_builds_single_branch() {
        let mut tasks = vec![Task::new("n0", "root")];
        for idx in 1..2_000 {
            tasks.push(Task::new(format!("n{idx}"), "node").with_parent(format!("n{}", idx - 1)));
        }
        let forest = build_forest(&tasks);
        assert_eq!(forest.len(), 1);
        assert_eq!(task_count(&forest), 2_000);
        assert_eq!(flatten(&forest).last().map(|row| row.depth), Some(1_999));
    }

    #[test]
    fn find_locates_nested_node() {
        let tasks = vec![
            Task::new("T1", "a"),
            Task::new("T2", "b").with_parent("T1"),
            Task::new("T3", "c").with_parent("T2"),
        ];
        let forest = build_forest(&tasks);
        assert_eq!(find(&forest, "T3").map(TreeNode::id), Some("T3"));
        assert!(find(&forest, "T9").is_none());
    }

    #[test]
    fn duplicate_ids_each_get_a_node() {
        let tasks = vec![
            Task::new("T1", "first"),
            Task::new("T1", "second"),
            Task::new("T2", "child").with_parent("T1"),
        ];
        let forest = build_forest(&tasks);
        assert_eq!(task_count(&forest), 3);
        assert_eq!(forest[0].task.title, "first");
        assert_eq!(ids(&forest[0].children), vec!["T2"]);
    }
}
