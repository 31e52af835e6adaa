use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use punchlist_core::model::{Category, NewTask, Priority, TaskPatch};
use punchlist_core::{LocalStore, TaskStore};
use tempfile::TempDir;

fn temp_store() -> (LocalStore, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let store = LocalStore::open(&dir.path().join("punchlist.sqlite3")).expect("open store");
    (store, dir)
}

fn new_task(text: &str, category: Category, priority: Priority) -> NewTask {
    NewTask {
        text: text.into(),
        completed: false,
        category,
        date: None,
        priority,
        order: 0,
    }
}

#[tokio::test]
async fn create_assigns_id_and_timestamps() {
    let (store, _dir) = temp_store();
    let created = store
        .create(new_task("Buy milk", Category::General, Priority::High))
        .await
        .expect("create");

    assert!(!created.id.is_empty());
    assert_eq!(created.created_at, created.updated_at);
    assert_eq!(store.get_by_id(&created.id).await.expect("get"), Some(created.clone()));
}

#[tokio::test]
async fn update_merges_fields_and_bumps_updated_at() {
    let (store, _dir) = temp_store();
    let created = store
        .create(new_task("Stretch", Category::Daily, Priority::Low))
        .await
        .expect("create");

    let date = NaiveDate::from_ymd_opt(2025, 3, 1);
    let updated = store
        .update(
            &created.id,
            TaskPatch {
                completed: Some(true),
                date: Some(date),
                order: Some(4),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("update")
        .expect("task exists");

    assert!(updated.completed);
    assert_eq!(updated.date, date);
    assert_eq!(updated.order, Some(4));
    assert_eq!(updated.text, "Stretch");
    assert_eq!(updated.category, Category::Daily);
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn unknown_ids_are_not_errors() {
    let (store, _dir) = temp_store();
    assert_eq!(store.get_by_id("nope").await.expect("get"), None);
    assert_eq!(
        store.update("nope", TaskPatch::order(1)).await.expect("update"),
        None
    );
    assert!(!store.delete("nope").await.expect("delete"));
}

#[tokio::test]
async fn delete_and_delete_all_remove_tasks() {
    let (store, _dir) = temp_store();
    let first = store
        .create(new_task("One", Category::General, Priority::Medium))
        .await
        .expect("create");
    store
        .create(new_task("Two", Category::Weekly, Priority::Medium))
        .await
        .expect("create");

    assert!(store.delete(&first.id).await.expect("delete"));
    assert_eq!(store.list_all().await.expect("list").len(), 1);

    assert!(store.delete_all().await.expect("delete all"));
    assert!(store.list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn tasks_survive_reopening_the_database() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("punchlist.sqlite3");
    let id = {
        let store = LocalStore::open(&path).expect("open");
        store
            .create(new_task("Persist me", Category::General, Priority::High))
            .await
            .expect("create")
            .id
    };

    let reopened = LocalStore::open(&path).expect("reopen");
    let tasks = reopened.list_all().await.expect("list");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, id);
    assert_eq!(tasks[0].priority, Some(Priority::High));
}
