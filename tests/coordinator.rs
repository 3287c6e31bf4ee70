use std::sync::Arc;

use tasktree::api::memory::ApiCall;
use tasktree::api::InMemoryTaskApi;
use tasktree::coordinator::RefreshOutcome;
use tasktree::events::{Notification, Operation};
use tasktree::store::ApplyOutcome;
use tasktree::task::{NewTask, Task, TaskPatch, TaskStatus};
use tasktree::{Error, MutationCoordinator};

fn seeded() -> (Arc<InMemoryTaskApi>, MutationCoordinator) {
    let api = Arc::new(InMemoryTaskApi::with_tasks(vec![
        Task::new("T1", "root"),
        Task::new("T2", "child").with_parent("T1"),
        Task::new("T3", "orphan").with_parent("T9"),
    ]));
    let coordinator = MutationCoordinator::new(api.clone());
    (api, coordinator)
}

fn root_ids(coordinator: &MutationCoordinator) -> Vec<String> {
    coordinator
        .forest()
        .iter()
        .map(|node| node.task.id.clone())
        .collect()
}

#[tokio::test]
async fn refresh_builds_forest_from_api_list() {
    let (_api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");

    assert_eq!(root_ids(&coordinator), vec!["T1", "T3"]);
    let forest = coordinator.forest();
    assert_eq!(forest[0].children.len(), 1);
    assert_eq!(forest[0].children[0].task.id, "T2");
    assert_eq!(coordinator.generation(), 1);
}

#[tokio::test]
async fn create_refetches_and_rebuilds_tree() {
    let (api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");

    let mut payload = NewTask::new("T4", "grandchild");
    payload.parent_task_id = Some("T2".to_string());
    let outcome = coordinator.create(payload).await.expect("create");

    assert_eq!(outcome.operation, Operation::Create);
    assert_eq!(outcome.refresh, RefreshOutcome::Applied { generation: 2, tasks: 4 });
    let forest = coordinator.forest();
    assert_eq!(forest[0].children[0].children[0].task.id, "T4");
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::ListTasks,
            ApiCall::Create("T4".to_string()),
            ApiCall::ListTasks,
        ]
    );
}

#[tokio::test]
async fn create_with_duplicate_id_leaves_snapshot_unchanged() {
    let (api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");
    let before = coordinator.tasks();
    let mut rx = coordinator.subscribe();

    let err = coordinator
        .create(NewTask::new("T1", "again"))
        .await
        .expect_err("duplicate id");

    assert!(matches!(err, Error::Rejected { status: 409, .. }));
    assert_eq!(coordinator.tasks(), before);
    assert_eq!(coordinator.generation(), 1);
    assert_eq!(
        api.calls(),
        vec![ApiCall::ListTasks, ApiCall::Create("T1".to_string())]
    );
    match rx.try_recv().expect("failure notification") {
        Notification::MutationFailed {
            operation, task_id, ..
        } => {
            assert_eq!(operation, Operation::Create);
            assert_eq!(task_id.as_deref(), Some("T1"));
        }
        other => panic!("unexpected notification: {other:?}"),
    }
}

#[tokio::test]
async fn update_moves_task_between_parents() {
    let (_api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");

    let patch = TaskPatch {
        parent_task_id: Some(Some("T1".to_string())),
        status: Some(TaskStatus::InProgress),
        ..TaskPatch::default()
    };
    let outcome = coordinator.update("T3", patch).await.expect("update");
    assert_eq!(outcome.task.map(|task| task.status), Some(TaskStatus::InProgress));

    assert_eq!(root_ids(&coordinator), vec!["T1"]);
    let children: Vec<String> = coordinator.forest()[0]
        .children
        .iter()
        .map(|node| node.task.id.clone())
        .collect();
    assert_eq!(children, vec!["T2", "T3"]);
}

#[tokio::test]
async fn update_unknown_id_is_deferred_to_api() {
    let (api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");
    let before = coordinator.tasks();

    let patch = TaskPatch {
        title: Some("renamed".to_string()),
        ..TaskPatch::default()
    };
    let err = coordinator.update("T42", patch).await.expect_err("not found");

    assert!(matches!(err, Error::NotFound(ref id) if id == "T42"));
    assert!(api.calls().contains(&ApiCall::Update("T42".to_string())));
    assert_eq!(coordinator.tasks(), before);
}

#[tokio::test]
async fn delete_of_selected_task_clears_selection() {
    let (_api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");
    coordinator.select("T1");
    assert_eq!(coordinator.selected_task().map(|t| t.id), Some("T1".to_string()));
    let mut rx = coordinator.subscribe();

    coordinator.delete("T1").await.expect("delete");

    assert!(coordinator.selected_id().is_none());
    assert!(coordinator.selected_task().is_none());
    // T2 lost its parent and degrades to a root.
    assert_eq!(root_ids(&coordinator), vec!["T2", "T3"]);
    assert_eq!(
        rx.try_recv().expect("selection notification"),
        Notification::SelectionChanged { task_id: None }
    );
    assert!(matches!(
        rx.try_recv().expect("tree notification"),
        Notification::TreeChanged { tasks: 2, .. }
    ));
}

#[tokio::test]
async fn delete_of_other_task_keeps_selection() {
    let (_api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");
    coordinator.select("T1");

    coordinator.delete("T3").await.expect("delete");

    assert_eq!(coordinator.selected_id().as_deref(), Some("T1"));
}

#[tokio::test]
async fn failed_delete_keeps_selection_and_snapshot() {
    let (api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");
    coordinator.select("T1");
    let before = coordinator.tasks();

    api.fail_next(Error::Transport("connection refused".to_string()));
    let err = coordinator.delete("T1").await.expect_err("transport");

    assert!(err.is_remote());
    assert_eq!(coordinator.selected_id().as_deref(), Some("T1"));
    assert_eq!(coordinator.tasks(), before);
    assert_eq!(api.tasks().len(), 3);
}

#[tokio::test]
async fn selection_survives_task_disappearing_from_snapshot() {
    let (api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");
    coordinator.select("T5");
    assert!(coordinator.selected_task().is_none());

    api.seed(Task::new("T5", "late arrival"));
    coordinator.refresh().await.expect("refresh");

    assert_eq!(coordinator.selected_task().map(|t| t.title), Some("late arrival".to_string()));
}

#[tokio::test]
async fn confirmed_mutation_reports_failed_refresh() {
    let (api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");
    let before = coordinator.tasks();

    api.fail_next_list(Error::Transport("timeout".to_string()));
    let outcome = coordinator
        .create(NewTask::new("T4", "new"))
        .await
        .expect("create is confirmed");

    assert!(matches!(outcome.refresh, RefreshOutcome::Failed { .. }));
    assert!(api.tasks().iter().any(|task| task.id == "T4"));
    assert_eq!(coordinator.tasks(), before);
    assert_eq!(coordinator.generation(), 1);

    coordinator.refresh().await.expect("refresh");
    assert_eq!(coordinator.tasks().len(), 4);
}

#[tokio::test]
async fn stale_list_response_is_discarded() {
    let (api, coordinator) = seeded();
    coordinator.refresh().await.expect("refresh");

    let release = api.hold_next_list();
    let slow = coordinator.refresh();
    let fast = async {
        api.seed(Task::new("T4", "added meanwhile"));
        let outcome = coordinator.refresh().await;
        let _ = release.send(());
        outcome
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(
        fast.expect("fast refresh"),
        ApplyOutcome::Applied { generation: 3, tasks: 4 }
    );
    assert_eq!(
        slow.expect("slow refresh"),
        ApplyOutcome::Superseded { generation: 2, latest: 3 }
    );
    assert_eq!(coordinator.tasks().len(), 4);
    assert_eq!(coordinator.generation(), 3);
}

#[tokio::test]
async fn summaries_follow_refreshed_snapshot() {
    let api = Arc::new(InMemoryTaskApi::with_tasks(vec![
        Task::new("T1", "a").with_project("P1"),
        Task::new("T2", "b").with_project("P1").with_status(TaskStatus::Completed),
        Task::new("T3", "c"),
    ]));
    api.set_projects(vec![tasktree::task::Project {
        id: "P1".to_string(),
        name: "Platform".to_string(),
        status: tasktree::task::ProjectStatus::Active,
    }]);
    let coordinator = MutationCoordinator::new(api.clone());
    coordinator.refresh().await.expect("refresh");
    coordinator.refresh_projects().await.expect("projects");

    let summaries = coordinator.group_summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name.as_deref(), Some("Platform"));
    assert_eq!(summaries[0].total, 2);

    let counts = coordinator.status_counts(Some("P1"));
    assert_eq!(counts.values().sum::<usize>(), 2);
    assert_eq!(counts.get(&TaskStatus::Completed), Some(&1));

    coordinator
        .update(
            "T1",
            TaskPatch {
                status: Some(TaskStatus::Completed),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("update");
    let counts = coordinator.status_counts(Some("P1"));
    assert_eq!(counts.len(), 1);
    assert_eq!(counts.get(&TaskStatus::Completed), Some(&2));
}
