//! Status tallies over task subsets.
//!
//! Counts are taken from the flat list, independent of tree shape. Only
//! statuses that occur get an entry, so counts always sum to the subset size.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::task::{Project, Task, TaskStatus};

pub type StatusCounts = BTreeMap<TaskStatus, usize>;

pub fn status_counts<'a, I>(tasks: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut counts = StatusCounts::new();
    for task in tasks {
        *counts.entry(task.status).or_insert(0) += 1;
    }
    counts
}

/// Tasks that belong to `project_id`, in input order.
pub fn for_project<'a>(tasks: &'a [Task], project_id: &'a str) -> impl Iterator<Item = &'a Task> {
    tasks
        .iter()
        .filter(move |task| task.project_id.as_deref() == Some(project_id))
}

/// Status summary for one project group.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupSummary {
    /// `None` for ungrouped tasks.
    pub project_id: Option<String>,
    /// Project name when the project is known.
    pub name: Option<String>,
    pub total: usize,
    pub counts: StatusCounts,
}

/// One summary per project referenced by `tasks`, ordered by first
/// appearance; ungrouped tasks come last.
pub fn group_summaries(tasks: &[Task], projects: &[Project]) -> Vec<GroupSummary> {
    let names: HashMap<&str, &str> = projects
        .iter()
        .map(|project| (project.id.as_str(), project.name.as_str()))
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<&Task>> = HashMap::new();
    let mut ungrouped: Vec<&Task> = Vec::new();
    for task in tasks {
        match task.project_id.as_deref() {
            Some(project) => {
                let entry = members.entry(project).or_default();
                if entry.is_empty() {
                    order.push(project);
                }
                entry.push(task);
            }
            None => ungrouped.push(task),
        }
    }

    let mut summaries: Vec<GroupSummary> = order
        .into_iter()
        .map(|project| {
            let group = members.remove(project).unwrap_or_default();
            GroupSummary {
                project_id: Some(project.to_string()),
                name: names.get(project).map(|name| name.to_string()),
                total: group.len(),
                counts: status_counts(group),
            }
        })
        .collect();

    if !ungrouped.is_empty() {
        summaries.push(GroupSummary {
            project_id: None,
            name: None,
            total: ungrouped.len(),
            counts: status_counts(ungrouped),
        });
    }

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ProjectStatus;

    #[test]
    fn empty_subset_has_no_entries() {
        assert!(status_counts(&Vec::<Task>::new()).is_empty());
    }

    #[test]
    fn only_present_statuses_are_counted() {
        let tasks = vec![
            Task::new("T1", "a").with_status(TaskStatus::Blocked),
            Task::new("T2", "b").with_status(TaskStatus::Blocked),
            Task::new("T3", "c"),
        ];
        let counts = status_counts(&tasks);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&TaskStatus::Blocked], 2);
        assert_eq!(counts[&TaskStatus::New], 1);
        assert!(!counts.contains_key(&TaskStatus::Completed));
    }

    #[test]
    fn groups_follow_first_appearance_with_ungrouped_last() {
        let tasks = vec![
            Task::new("T1", "a"),
            Task::new("T2", "b").with_project("P2"),
            Task::new("T3", "c").with_project("P1").with_status(TaskStatus::Completed),
            Task::new("T4", "d").with_project("P2"),
        ];
        let projects = vec![Project {
            id: "P1".to_string(),
            name: "Platform".to_string(),
            status: ProjectStatus::Active,
        }];
        let summaries = group_summaries(&tasks, &projects);
        let ids: Vec<Option<&str>> = summaries.iter().map(|s| s.project_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("P2"), Some("P1"), None]);
        assert_eq!(summaries[0].total, 2);
        assert_eq!(summaries[0].name, None);
        assert_eq!(summaries[1].name.as_deref(), Some("Platform"));
        assert_eq!(summaries[1].counts[&TaskStatus::Completed], 1);
        assert_eq!(summaries.iter().map(|s| s.total).sum::<usize>(), tasks.len());
    }

    #[test]
    fn for_project_filters_in_order() {
        let tasks = vec![
            Task::new("T1", "a").with_project("P1"),
            Task::new("T2", "b"),
            Task::new("T3", "c").with_project("P1"),
        ];
        let ids: Vec<&str> = for_project(&tasks, "P1").map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T3"]);
    }
}
