//! Board Store Tests
//!
//! Scenarios run against the in-memory backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::*;
use crate::backend::{MemoryBackend, Op, Query, Row};
use crate::error::{BackendError, BackendResult};

fn setup() -> (Arc<MemoryBackend>, BoardStore) {
    let backend = Arc::new(MemoryBackend::new());
    let store = BoardStore::new(backend.clone());
    (backend, store)
}

async fn seed_board(backend: &dyn DataBackend) -> String {
    commands::create_board(backend, "Roadmap", "user-1").await.unwrap().id
}

async fn seed_column(backend: &dyn DataBackend, board_id: &str, title: &str) -> String {
    commands::create_column(backend, title, board_id).await.unwrap().id
}

async fn seed_task(backend: &dyn DataBackend, column_id: &str, title: &str) -> String {
    let payload = NewTask {
        title,
        column_id,
        description: None,
        status: None,
    };
    commands::create_task(backend, &payload).await.unwrap().id
}

async fn seed_subtask(backend: &dyn DataBackend, task_id: &str, title: &str) -> String {
    commands::create_subtask(backend, title, task_id).await.unwrap().id
}

/// Wraps the memory backend and parks the first select on one table until
/// released, handing back the rows it read before parking.
struct GatedBackend {
    inner: MemoryBackend,
    table: &'static str,
    armed: AtomicBool,
    fail_on_release: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedBackend {
    fn new(table: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::new(),
            table,
            armed: AtomicBool::new(true),
            fail_on_release: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl DataBackend for GatedBackend {
    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Row>> {
        if table == self.table && self.armed.swap(false, Ordering::SeqCst) {
            let rows = self.inner.select(table, query).await;
            self.entered.notify_one();
            self.release.notified().await;
            if self.fail_on_release.load(Ordering::SeqCst) {
                return Err(BackendError::fault("connection reset"));
            }
            return rows;
        }
        self.inner.select(table, query).await
    }

    async fn select_single(&self, table: &str, id: &str) -> BackendResult<Row> {
        self.inner.select_single(table, id).await
    }

    async fn insert(&self, table: &str, row: Row) -> BackendResult<Row> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> BackendResult<Row> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &str) -> BackendResult<()> {
        self.inner.delete(table, id).await
    }
}

// ========================
// Boards
// ========================

#[tokio::test]
async fn test_fetch_boards() {
    let (backend, store) = setup();
    seed_board(&*backend).await;
    seed_board(&*backend).await;

    store.fetch_boards().await;

    let state = store.snapshot();
    assert_eq!(state.boards.len(), 2);
    assert!(!state.is_loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_failed_create_board_keeps_boards() {
    let (backend, store) = setup();
    seed_board(&*backend).await;
    store.fetch_boards().await;
    let before = store.snapshot().boards;

    backend.fail_next(Op::Insert, "boards", "permission denied").await;
    store.create_board("Second", "user-1").await;

    let state = store.snapshot();
    assert_eq!(state.boards, before);
    assert_eq!(state.error.as_deref(), Some("Error creating board: permission denied"));
    assert!(!state.is_loading);

    let board = before[0].id.clone();
    seed_column(&*backend, &board, "Todo").await;
    store.fetch_columns(&board).await;

    let state = store.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.columns.len(), 1);
    assert_eq!(state.boards, before);
}

#[tokio::test]
async fn test_create_board_with_empty_title() {
    let (backend, store) = setup();

    store.create_board("", "user-1").await;

    assert!(store.snapshot().error.is_some_and(|e| e.contains("title")));
    assert_eq!(backend.calls(Op::Insert, "boards").await, 0);
}

#[tokio::test]
async fn test_create_board_with_blank_title() {
    let (backend, store) = setup();

    store.create_board("   ", "user-1").await;

    let state = store.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.boards.len(), 1);
    assert_eq!(state.boards[0].title, "   ");
    assert_eq!(backend.calls(Op::Insert, "boards").await, 1);
}

#[tokio::test]
async fn test_update_and_delete_board_sync_current() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    store.fetch_boards().await;
    store.fetch_board_by_id(&board).await;

    store.update_board(&board, "Renamed").await;
    let state = store.snapshot();
    assert_eq!(state.boards[0].title, "Renamed");
    assert_eq!(state.current_board.as_ref().map(|b| b.title.as_str()), Some("Renamed"));

    store.delete_board(&board).await;
    let state = store.snapshot();
    assert!(state.boards.is_empty());
    assert!(state.current_board.is_none());
}

#[tokio::test]
async fn test_fetch_board_by_id_loads_everything() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let todo = seed_column(&*backend, &board, "Todo").await;
    let done = seed_column(&*backend, &board, "Done").await;
    let task = seed_task(&*backend, &todo, "Write docs").await;
    seed_subtask(&*backend, &task, "Outline").await;
    seed_subtask(&*backend, &task, "Draft").await;

    store.fetch_board_by_id(&board).await;

    let state = store.snapshot();
    assert_eq!(state.current_board.as_ref().map(|b| b.id.as_str()), Some(board.as_str()));
    assert_eq!(state.columns.len(), 2);
    assert_eq!(state.tasks_in(&todo).len(), 1);
    assert!(state.tasks.get(&done).is_some_and(Vec::is_empty));
    assert_eq!(state.subtasks_of(&task).len(), 2);
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_fetch_missing_board_does_not_chain() {
    let (backend, store) = setup();

    store.fetch_board_by_id("missing").await;

    let state = store.snapshot();
    assert!(state.current_board.is_none());
    assert!(state.error.is_none());
    assert_eq!(backend.calls(Op::Select, "columns").await, 0);
}

#[tokio::test]
async fn test_fetch_board_detail_batches_requests() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let todo = seed_column(&*backend, &board, "Todo").await;
    let empty = seed_column(&*backend, &board, "Later").await;
    let first = seed_task(&*backend, &todo, "First").await;
    let second = seed_task(&*backend, &todo, "Second").await;
    seed_subtask(&*backend, &first, "Check").await;

    store.fetch_board_detail(&board).await;

    let state = store.snapshot();
    assert_eq!(state.current_board.as_ref().map(|b| b.id.as_str()), Some(board.as_str()));
    let titles: Vec<_> = state.columns.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Todo", "Later"]);
    assert_eq!(state.tasks_in(&todo).len(), 2);
    assert!(state.tasks.get(&empty).is_some_and(Vec::is_empty));
    assert_eq!(state.subtasks_of(&first).len(), 1);
    assert!(state.subtasks.get(&second).is_some_and(Vec::is_empty));

    for table in ["columns", "tasks", "subtasks"] {
        assert_eq!(backend.calls(Op::Select, table).await, 1, "{table}");
    }
    assert_eq!(backend.calls(Op::SelectSingle, "boards").await, 1);
}

#[tokio::test]
async fn test_fetch_board_detail_missing_board_keeps_view() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    seed_column(&*backend, &board, "Todo").await;
    store.fetch_board_detail(&board).await;
    let before = store.snapshot();

    store.fetch_board_detail("missing").await;

    let state = store.snapshot();
    assert_eq!(state.current_board, before.current_board);
    assert_eq!(state.columns, before.columns);
    assert_eq!(state.tasks, before.tasks);
    assert_eq!(state.error.as_deref(), Some("Error fetching board: no rows found in boards"));
    assert!(!state.is_loading);
    assert_eq!(backend.calls(Op::Select, "columns").await, 1);
}

// ========================
// Columns
// ========================

#[tokio::test]
async fn test_fetch_columns_on_empty_board() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;

    store.fetch_columns(&board).await;

    let state = store.snapshot();
    assert!(state.columns.is_empty());
    assert!(state.tasks.is_empty());
    assert_eq!(backend.calls(Op::Select, "tasks").await, 0);
}

#[tokio::test]
async fn test_column_create_and_update() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;

    store.create_column("Todo", &board).await;
    let column = store.snapshot().columns[0].clone();
    assert_eq!(column.title, "Todo");

    store.update_column(&column.id, "Doing").await;
    let state = store.snapshot();
    assert_eq!(state.columns.len(), 1);
    assert_eq!(state.columns[0].title, "Doing");
}

#[tokio::test]
async fn test_delete_column_keeps_subtask_buckets() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let column = seed_column(&*backend, &board, "Todo").await;
    let task = seed_task(&*backend, &column, "Write docs").await;
    seed_subtask(&*backend, &task, "Outline").await;
    store.fetch_columns(&board).await;

    store.delete_column(&column).await;

    let state = store.snapshot();
    assert!(state.columns.is_empty());
    assert!(!state.tasks.contains_key(&column));
    assert_eq!(state.subtasks_of(&task).len(), 1);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_columns() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    seed_column(&*backend, &board, "Todo").await;
    store.fetch_columns(&board).await;

    backend.fail_next(Op::Select, "columns", "timeout").await;
    store.fetch_columns(&board).await;

    let state = store.snapshot();
    assert_eq!(state.columns.len(), 1);
    assert_eq!(state.error.as_deref(), Some("Error fetching columns: timeout"));
    assert!(!state.is_loading);
}

// ========================
// Tasks
// ========================

#[tokio::test]
async fn test_create_task_appends_to_column() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let column = seed_column(&*backend, &board, "Todo").await;

    store.create_task("Write docs", &column, Some("all of them"), None).await;

    let state = store.snapshot();
    let tasks = state.tasks_in(&column);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Write docs");
    assert_eq!(tasks[0].column_id, column);
    assert_eq!(tasks[0].description.as_deref(), Some("all of them"));
}

#[tokio::test]
async fn test_move_task_between_columns() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let todo = seed_column(&*backend, &board, "Todo").await;
    let done = seed_column(&*backend, &board, "Done").await;
    let task = seed_task(&*backend, &todo, "Ship").await;
    store.fetch_columns(&board).await;

    store.move_task(&task, &done).await;

    let moved = store.snapshot();
    assert!(moved.tasks_in(&todo).is_empty());
    assert_eq!(moved.tasks_in(&done).len(), 1);
    assert_eq!(moved.tasks_in(&done)[0].column_id, done);

    store.move_task(&task, &done).await;

    let again = store.snapshot();
    assert_eq!(again.tasks, moved.tasks);
    assert_eq!(backend.calls(Op::Update, "tasks").await, 2);
}

#[tokio::test]
async fn test_update_task_mutates_only_owner_column() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let a = seed_column(&*backend, &board, "A").await;
    let b = seed_column(&*backend, &board, "B").await;
    seed_task(&*backend, &a, "T1").await;
    let t2 = seed_task(&*backend, &b, "T2").await;
    store.fetch_columns(&board).await;
    let before = store.snapshot();

    store.update_task(&t2, TaskUpdate::title("Renamed")).await;

    let state = store.snapshot();
    assert_eq!(state.tasks_in(&a), before.tasks_in(&a));
    assert_eq!(state.tasks_in(&b).len(), 1);
    assert_eq!(state.tasks_in(&b)[0].title, "Renamed");
}

#[tokio::test]
async fn test_update_task_with_column_moves_it() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let a = seed_column(&*backend, &board, "A").await;
    let b = seed_column(&*backend, &board, "B").await;
    let task = seed_task(&*backend, &a, "T1").await;
    store.fetch_columns(&board).await;

    store
        .update_task(&task, TaskUpdate::title("Done").with_column(b.clone()))
        .await;

    let state = store.snapshot();
    assert!(state.tasks_in(&a).is_empty());
    assert_eq!(state.tasks_in(&b)[0].title, "Done");
    assert_eq!(state.find_task_column(&task), Some(b.as_str()));
}

#[tokio::test]
async fn test_delete_task_drops_subtasks() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let column = seed_column(&*backend, &board, "Todo").await;
    let task = seed_task(&*backend, &column, "T1").await;
    seed_subtask(&*backend, &task, "S1").await;
    store.fetch_columns(&board).await;

    store.delete_task(&task).await;

    let state = store.snapshot();
    assert!(state.tasks_in(&column).is_empty());
    assert!(!state.subtasks.contains_key(&task));
}

// ========================
// Subtasks
// ========================

#[tokio::test]
async fn test_subtask_actions() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let column = seed_column(&*backend, &board, "Todo").await;
    let task = seed_task(&*backend, &column, "T1").await;

    store.create_subtask("Outline", &task).await;
    let subtask = store.snapshot().subtasks_of(&task)[0].clone();
    assert!(!subtask.is_completed);

    store.toggle_subtask_completion(&subtask.id, true).await;
    assert!(store.snapshot().subtasks_of(&task)[0].is_completed);

    let rename = SubtaskUpdate {
        title: Some("Full outline".to_string()),
        is_completed: None,
    };
    store.update_subtask(&subtask.id, rename).await;
    assert_eq!(store.snapshot().subtasks_of(&task)[0].title, "Full outline");

    store.delete_subtask(&subtask.id).await;
    assert!(store.snapshot().subtasks_of(&task).is_empty());
}

#[tokio::test]
async fn test_toggle_unloaded_subtask_leaves_index() {
    let (backend, store) = setup();
    let board = seed_board(&*backend).await;
    let column = seed_column(&*backend, &board, "Todo").await;
    let task = seed_task(&*backend, &column, "T1").await;
    let subtask = seed_subtask(&*backend, &task, "S1").await;

    store.toggle_subtask_completion(&subtask, true).await;

    let state = store.snapshot();
    assert!(state.subtasks.is_empty());
    assert!(state.error.is_none());
    assert_eq!(backend.calls(Op::Update, "subtasks").await, 1);
}

// ========================
// Loading & Staleness
// ========================

#[tokio::test]
async fn test_loading_held_until_fan_out_settles() {
    let backend = GatedBackend::new("subtasks");
    let board = seed_board(&*backend).await;
    let column = seed_column(&*backend, &board, "Todo").await;
    let task = seed_task(&*backend, &column, "T1").await;
    let store = BoardStore::new(backend.clone());

    let load = store.fetch_columns(&board);
    let check = async {
        backend.entered.notified().await;
        let state = store.snapshot();
        assert_eq!(state.columns.len(), 1);
        assert_eq!(state.tasks_in(&column).len(), 1);
        assert!(state.is_loading);
        backend.release.notify_one();
    };
    tokio::join!(load, check);

    let state = store.snapshot();
    assert!(!state.is_loading);
    assert!(state.subtasks.contains_key(&task));
}

#[tokio::test]
async fn test_stale_tasks_response_is_discarded() {
    let backend = GatedBackend::new("tasks");
    let board = seed_board(&*backend).await;
    let column = seed_column(&*backend, &board, "Todo").await;
    seed_task(&*backend, &column, "Old").await;
    let store = BoardStore::new(backend.clone());

    let slow = store.fetch_tasks(&column);
    let fast = async {
        backend.entered.notified().await;
        seed_task(&*backend, &column, "New").await;
        store.fetch_tasks(&column).await;

        let state = store.snapshot();
        assert_eq!(state.tasks_in(&column).len(), 2);
        assert!(state.is_loading);
        backend.release.notify_one();
    };
    tokio::join!(slow, fast);

    let state = store.snapshot();
    assert_eq!(state.tasks_in(&column).len(), 2);
    assert!(!state.is_loading);
    // Only the fresh response fanned out
    assert_eq!(backend.inner.calls(Op::Select, "subtasks").await, 2);
}

#[tokio::test]
async fn test_stale_error_is_discarded() {
    let backend = GatedBackend::new("tasks");
    backend.fail_on_release.store(true, Ordering::SeqCst);
    let board = seed_board(&*backend).await;
    let column = seed_column(&*backend, &board, "Todo").await;
    seed_task(&*backend, &column, "Only").await;
    let store = BoardStore::new(backend.clone());

    let slow = store.fetch_tasks(&column);
    let fast = async {
        backend.entered.notified().await;
        store.fetch_tasks(&column).await;
        backend.release.notify_one();
    };
    tokio::join!(slow, fast);

    let state = store.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.tasks_in(&column).len(), 1);
}

#[tokio::test]
async fn test_dropped_action_releases_loading() {
    let backend = GatedBackend::new("boards");
    let store = BoardStore::new(backend.clone());

    tokio::select! {
        _ = store.fetch_boards() => panic!("gated fetch should not complete"),
        _ = backend.entered.notified() => {}
    }

    assert!(!store.snapshot().is_loading);
}

#[tokio::test]
async fn test_subscribers_see_commits() {
    let (backend, store) = setup();
    let mut rx = store.subscribe();
    seed_board(&*backend).await;

    store.fetch_boards().await;

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.boards.len(), 1);
    assert!(!state.is_loading);
}
