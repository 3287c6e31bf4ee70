//! tasktree command implementations.

use serde::Serialize;

use super::Commands;
use crate::aggregate::{self, StatusCounts};
use crate::config::{Config, OutputConfig};
use crate::coordinator::{MutationCoordinator, MutationOutcome, RefreshOutcome};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::{NewTask, Priority, Task, TaskPatch, TaskStatus};
use crate::tree::{self, TreeNode};

pub(super) async fn dispatch(
    coordinator: &MutationCoordinator,
    config: &Config,
    options: OutputOptions,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Tree { project } => {
            coordinator.refresh().await?;
            run_tree(coordinator, &config.output, options, project.as_deref())
        }
        Commands::List { project, status } => {
            coordinator.refresh().await?;
            let status = status.as_deref().map(str::parse::<TaskStatus>).transpose()?;
            run_list(coordinator, options, project.as_deref(), status)
        }
        Commands::Summary => {
            coordinator.refresh().await?;
            // Names are cosmetic; summaries still render without them.
            if let Err(err) = coordinator.refresh_projects().await {
                tracing::warn!(error = %err, "project list unavailable");
            }
            run_summary(coordinator, options)
        }
        Commands::Show { id } => {
            coordinator.refresh().await?;
            run_show(coordinator, &config.output, options, id)
        }
        Commands::Create {
            id,
            title,
            project,
            parent,
            status,
            priority,
            task_type,
            owner,
        } => {
            let mut payload = NewTask::new(id, title);
            payload.project_id = non_empty(project);
            payload.parent_task_id = non_empty(parent);
            payload.status = status.parse()?;
            payload.priority = priority.as_deref().map(str::parse::<Priority>).transpose()?;
            payload.task_type = task_type;
            payload.owner = non_empty(owner);
            let outcome = coordinator.create(payload).await?;
            emit_mutation(options, "create", &outcome)
        }
        Commands::Update {
            id,
            title,
            status,
            priority,
            clear_priority,
            parent,
            clear_parent,
            project,
            clear_project,
            task_type,
            owner,
            clear_owner,
        } => {
            let patch = TaskPatch {
                title,
                status: status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
                priority: nullable(
                    priority.as_deref().map(str::parse::<Priority>).transpose()?,
                    clear_priority,
                ),
                parent_task_id: nullable(parent, clear_parent),
                project_id: nullable(project, clear_project),
                task_type,
                owner: nullable(owner, clear_owner),
            };
            let outcome = coordinator.update(&id, patch).await?;
            emit_mutation(options, "update", &outcome)
        }
        Commands::Delete { id } => {
            let outcome = coordinator.delete(&id).await?;
            emit_mutation(options, "delete", &outcome)
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Map a set value / clear flag pair onto a nullable patch field.
fn nullable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn run_tree(
    coordinator: &MutationCoordinator,
    output: &OutputConfig,
    options: OutputOptions,
    project: Option<&str>,
) -> Result<()> {
    let tasks = coordinator.tasks();
    let forest = match project {
        Some(project) => {
            let subset: Vec<Task> = aggregate::for_project(&tasks, project).cloned().collect();
            tree::build_forest(&subset)
        }
        None => coordinator.forest(),
    };
    let counts = coordinator.status_counts(project);

    #[derive(Serialize)]
    struct TreeReport<'a> {
        generation: u64,
        tasks: usize,
        roots: &'a [TreeNode],
        counts: &'a StatusCounts,
    }

    let report = TreeReport {
        generation: coordinator.generation(),
        tasks: tree::task_count(&forest),
        roots: &forest,
        counts: &counts,
    };

    let mut human = HumanOutput::new(match project {
        Some(project) => format!("Task tree ({project})"),
        None => "Task tree".to_string(),
    });
    for row in tree::flatten(&forest) {
        human.push_detail(format!(
            "{}{}",
            " ".repeat(row.depth * output.indent),
            task_line(&row.node.task)
        ));
    }
    if output.show_counts {
        human.push_summary("tasks", report.tasks.to_string());
        human.push_summary("roots", forest.len().to_string());
        human.push_summary("status", format_counts(&counts));
    }

    emit_success(options, "tree", &report, Some(&human))
}

fn run_list(
    coordinator: &MutationCoordinator,
    options: OutputOptions,
    project: Option<&str>,
    status: Option<TaskStatus>,
) -> Result<()> {
    let tasks: Vec<Task> = coordinator
        .tasks()
        .into_iter()
        .filter(|task| project.is_none() || task.project_id.as_deref() == project)
        .filter(|task| status.map(|status| task.status == status).unwrap_or(true))
        .collect();

    let mut human = HumanOutput::new(format!("Tasks ({})", tasks.len()));
    for task in &tasks {
        human.push_detail(task_line(task));
    }

    emit_success(options, "list", &tasks, Some(&human))
}

fn run_summary(coordinator: &MutationCoordinator, options: OutputOptions) -> Result<()> {
    let summaries = coordinator.group_summaries();

    let mut human = HumanOutput::new("Project summary");
    for summary in &summaries {
        let label = match (&summary.project_id, &summary.name) {
            (Some(id), Some(name)) => format!("{name} ({id})"),
            (Some(id), None) => id.clone(),
            (None, _) => "(no project)".to_string(),
        };
        human.push_summary(label, format!("{} - {}", summary.total, format_counts(&summary.counts)));
    }

    emit_success(options, "summary", &summaries, Some(&human))
}

fn run_show(
    coordinator: &MutationCoordinator,
    output: &OutputConfig,
    options: OutputOptions,
    id: String,
) -> Result<()> {
    coordinator.select(id.clone());
    let task = coordinator
        .selected_task()
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
    let forest = coordinator.forest();
    let node = tree::find(&forest, &id).ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut human = HumanOutput::new(task_line(&task));
    human.push_summary("type", task.task_type.clone());
    human.push_summary("priority", task.priority.map(|p| p.to_string()).unwrap_or_default());
    human.push_summary("project", task.project_id.clone().unwrap_or_default());
    human.push_summary("parent", task.parent_task_id.clone().unwrap_or_default());
    human.push_summary("owner", task.owner.clone().unwrap_or_default());
    if let Some(parent) = task.declared_parent() {
        if coordinator.task(parent).is_none() {
            human.push_warning(format!("parent {parent} is not in the snapshot; shown as a root"));
        }
    }
    for row in tree::flatten(&node.children) {
        human.push_detail(format!(
            "{}{}",
            " ".repeat((row.depth + 1) * output.indent),
            task_line(&row.node.task)
        ));
    }

    emit_success(options, "show", node, Some(&human))
}

fn emit_mutation(options: OutputOptions, command: &str, outcome: &MutationOutcome) -> Result<()> {
    let verb = match command {
        "create" => "Created",
        "update" => "Updated",
        _ => "Deleted",
    };
    let mut human = HumanOutput::new(format!("{verb} {}", outcome.task_id));
    match &outcome.refresh {
        RefreshOutcome::Applied { generation, tasks } => {
            human.push_summary("snapshot", format!("generation {generation}, {tasks} tasks"));
        }
        RefreshOutcome::Superseded { latest, .. } => {
            human.push_summary("snapshot", format!("superseded by generation {latest}"));
        }
        RefreshOutcome::Failed { message } => {
            human.push_warning(format!("task list refresh failed: {message}"));
        }
    }
    emit_success(options, command, outcome, Some(&human))
}

fn task_line(task: &Task) -> String {
    let mut line = format!("{}  [{}] {}", task.id, task.status, task.title);
    if let Some(priority) = task.priority {
        line.push_str(&format!(" ({priority})"));
    }
    if task.task_type != "task" {
        line.push_str(&format!(" <{}>", task.task_type));
    }
    if let Some(owner) = &task.owner {
        line.push_str(&format!(" @{owner}"));
    }
    line
}

fn format_counts(counts: &StatusCounts) -> String {
    if counts.is_empty() {
        return "none".to_string();
    }
    counts
        .iter()
        .map(|(status, count)| format!("{status}={count}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_prefers_clear_flag() {
        assert_eq!(nullable(Some("T1".to_string()), true), Some(None));
        assert_eq!(nullable(Some("T1".to_string()), false), Some(Some("T1".to_string())));
        assert_eq!(nullable::<String>(None, false), None);
    }

    #[test]
    fn task_line_includes_optional_fields() {
        let mut task = Task::new("T1", "Ship it").with_type("epic");
        task.priority = Some(Priority::P0);
        task.owner = Some("kim".to_string());
        assert_eq!(task_line(&task), "T1  [new] Ship it (p0) <epic> @kim");
    }

    #[test]
    fn counts_render_in_status_order() {
        let tasks = vec![
            Task::new("T1", "a").with_status(TaskStatus::Completed),
            Task::new("T2", "b"),
        ];
        assert_eq!(format_counts(&aggregate::status_counts(&tasks)), "new=1 completed=1");
        assert_eq!(format_counts(&StatusCounts::new()), "none");
    }
}
