//! Board detail binding
//!
//! Exposes the opened board with its columns, task buckets and subtask
//! buckets, and the column, task and subtask actions.

use indexmap::IndexMap;
use leptos::prelude::*;

use super::spawn_action;
use crate::context::{use_board_context, BoardContext};
use crate::models::{Board, Column, Subtask, SubtaskUpdate, Task, TaskUpdate};
use crate::state::{BoardState, BoardStateStoreFields};
use crate::store::BoardStore;

#[derive(Clone)]
pub struct UseBoardDetail {
    pub board: Signal<Option<Board>>,
    pub columns: Signal<Vec<Column>>,
    pub tasks: Signal<IndexMap<String, Vec<Task>>>,
    pub subtasks: Signal<IndexMap<String, Vec<Subtask>>>,
    pub is_loading: Signal<bool>,
    pub error: Signal<Option<String>>,
    view: reactive_stores::Store<BoardState>,
    store: BoardStore,
    board_id: Signal<Option<String>>,
}

/// Load the board named by `board_id` whenever it changes
pub fn use_board_detail(board_id: Signal<Option<String>>) -> UseBoardDetail {
    let BoardContext { store, view } = use_board_context();

    Effect::new({
        let store = store.clone();
        move |_| {
            if let Some(id) = board_id.get() {
                spawn_action(&store, move |store| async move {
                    store.fetch_board_detail(&id).await
                });
            }
        }
    });

    UseBoardDetail {
        board: Signal::derive(move || view.current_board().get()),
        columns: Signal::derive(move || view.columns().get()),
        tasks: Signal::derive(move || view.tasks().get()),
        subtasks: Signal::derive(move || view.subtasks().get()),
        is_loading: Signal::derive(move || view.is_loading().get()),
        error: Signal::derive(move || view.error().get()),
        view,
        store,
        board_id,
    }
}

impl UseBoardDetail {
    /// Tasks of one column (tracked)
    pub fn tasks_in(&self, column_id: &str) -> Vec<Task> {
        self.view
            .tasks()
            .with(|tasks| tasks.get(column_id).cloned().unwrap_or_default())
    }

    /// Subtasks of one task (tracked)
    pub fn subtasks_of(&self, task_id: &str) -> Vec<Subtask> {
        self.view
            .subtasks()
            .with(|subtasks| subtasks.get(task_id).cloned().unwrap_or_default())
    }

    pub fn refresh(&self) {
        if let Some(id) = self.board_id.get_untracked() {
            spawn_action(&self.store, move |store| async move {
                store.fetch_board_detail(&id).await
            });
        }
    }

    // ========================
    // Columns
    // ========================

    /// Add a column to the opened board
    pub fn create_column(&self, title: String) {
        if let Some(board_id) = self.board_id.get_untracked() {
            spawn_action(&self.store, move |store| async move {
                store.create_column(&title, &board_id).await
            });
        }
    }

    pub fn update_column(&self, id: String, title: String) {
        spawn_action(&self.store, move |store| async move {
            store.update_column(&id, &title).await
        });
    }

    pub fn delete_column(&self, id: String) {
        spawn_action(&self.store, move |store| async move { store.delete_column(&id).await });
    }

    // ========================
    // Tasks
    // ========================

    pub fn create_task(
        &self,
        title: String,
        column_id: String,
        description: Option<String>,
        status: Option<String>,
    ) {
        spawn_action(&self.store, move |store| async move {
            store
                .create_task(&title, &column_id, description.as_deref(), status.as_deref())
                .await
        });
    }

    pub fn update_task(&self, id: String, updates: TaskUpdate) {
        spawn_action(&self.store, move |store| async move {
            store.update_task(&id, updates).await
        });
    }

    pub fn move_task(&self, task_id: String, new_column_id: String) {
        spawn_action(&self.store, move |store| async move {
            store.move_task(&task_id, &new_column_id).await
        });
    }

    pub fn delete_task(&self, id: String) {
        spawn_action(&self.store, move |store| async move { store.delete_task(&id).await });
    }

    // ========================
    // Subtasks
    // ========================

    pub fn create_subtask(&self, title: String, task_id: String) {
        spawn_action(&self.store, move |store| async move {
            store.create_subtask(&title, &task_id).await
        });
    }

    pub fn update_subtask(&self, id: String, updates: SubtaskUpdate) {
        spawn_action(&self.store, move |store| async move {
            store.update_subtask(&id, updates).await
        });
    }

    pub fn toggle_subtask_completion(&self, id: String, is_completed: bool) {
        spawn_action(&self.store, move |store| async move {
            store.toggle_subtask_completion(&id, is_completed).await
        });
    }

    pub fn delete_subtask(&self, id: String) {
        spawn_action(&self.store, move |store| async move { store.delete_subtask(&id).await });
    }
}
