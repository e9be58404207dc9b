//! Board State
//!
//! The snapshot held by the board store, plus the reducer-like transitions
//! applied once a remote call has succeeded. Transitions never touch
//! `is_loading` or `error`; the store owns those.

use indexmap::IndexMap;
use reactive_stores::Store;

use crate::models::{Board, Column, Subtask, Task};

/// Board view state with field-level reactivity
#[derive(Clone, Debug, Default, PartialEq, Store)]
pub struct BoardState {
    /// Boards visible to the user
    pub boards: Vec<Board>,
    /// Board currently opened
    pub current_board: Option<Board>,
    /// Columns of the current board
    pub columns: Vec<Column>,
    /// Tasks keyed by column id, buckets in insertion order
    pub tasks: IndexMap<String, Vec<Task>>,
    /// Subtasks keyed by task id, buckets in insertion order
    pub subtasks: IndexMap<String, Vec<Subtask>>,
    pub is_loading: bool,
    /// Message of the last failed action
    pub error: Option<String>,
}

impl BoardState {
    /// Column currently holding a task.
    ///
    /// Scans every bucket, so the cost is linear in the number of loaded tasks.
    /// If an id shows up in several buckets the earliest inserted bucket wins.
    pub fn find_task_column(&self, task_id: &str) -> Option<&str> {
        self.tasks
            .iter()
            .find(|(_, tasks)| tasks.iter().any(|t| t.id == task_id))
            .map(|(column_id, _)| column_id.as_str())
    }

    /// Task currently holding a subtask. Linear in the number of loaded subtasks.
    pub fn find_subtask_task(&self, subtask_id: &str) -> Option<&str> {
        self.subtasks
            .iter()
            .find(|(_, subtasks)| subtasks.iter().any(|s| s.id == subtask_id))
            .map(|(task_id, _)| task_id.as_str())
    }

    /// Tasks of a column, empty when the column has no bucket
    pub fn tasks_in(&self, column_id: &str) -> &[Task] {
        self.tasks.get(column_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Subtasks of a task, empty when the task has no bucket
    pub fn subtasks_of(&self, task_id: &str) -> &[Subtask] {
        self.subtasks.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    // ========================
    // Boards
    // ========================

    pub fn set_boards(&mut self, boards: Vec<Board>) {
        self.boards = boards;
    }

    pub fn push_board(&mut self, board: Board) {
        self.boards.push(board);
    }

    /// Replace a board by id, keeping the opened board in sync
    pub fn replace_board(&mut self, updated: Board) {
        if let Some(board) = self.boards.iter_mut().find(|b| b.id == updated.id) {
            *board = updated.clone();
        }
        if self.current_board.as_ref().is_some_and(|b| b.id == updated.id) {
            self.current_board = Some(updated);
        }
    }

    /// Remove a board by id, closing it if it was opened
    pub fn remove_board(&mut self, board_id: &str) {
        self.boards.retain(|b| b.id != board_id);
        if self.current_board.as_ref().is_some_and(|b| b.id == board_id) {
            self.current_board = None;
        }
    }

    pub fn set_current_board(&mut self, board: Option<Board>) {
        self.current_board = board;
    }

    // ========================
    // Columns
    // ========================

    pub fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
    }

    pub fn push_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn replace_column(&mut self, updated: Column) {
        if let Some(column) = self.columns.iter_mut().find(|c| c.id == updated.id) {
            *column = updated;
        }
    }

    /// Remove a column and its task bucket.
    ///
    /// Subtask buckets of the removed tasks are left in place.
    pub fn remove_column(&mut self, column_id: &str) {
        self.columns.retain(|c| c.id != column_id);
        self.tasks.shift_remove(column_id);
    }

    // ========================
    // Tasks
    // ========================

    pub fn set_tasks(&mut self, column_id: &str, tasks: Vec<Task>) {
        self.tasks.insert(column_id.to_string(), tasks);
    }

    pub fn push_task(&mut self, column_id: &str, task: Task) {
        self.tasks.entry(column_id.to_string()).or_default().push(task);
    }

    /// Reconcile the index after a task patch.
    ///
    /// Without a column change (or when the task is not loaded) the row is
    /// replaced in place; otherwise it moves to the end of the target bucket.
    pub fn apply_task_update(&mut self, requested_column: Option<&str>, updated: Task) {
        let located = self.find_task_column(&updated.id).map(str::to_string);

        match (located, requested_column) {
            (Some(from), Some(to)) if from != to => self.relocate_task(&from, to, updated),
            (Some(column_id), _) => replace_by_id(self.tasks.entry(column_id).or_default(), updated),
            (None, Some(column_id)) => {
                replace_by_id(self.tasks.entry(column_id.to_string()).or_default(), updated)
            }
            (None, None) => {}
        }
    }

    /// Reconcile the index after a task was persisted in `new_column`.
    ///
    /// No-op when the task is not loaded or already sits in that column.
    pub fn apply_task_move(&mut self, new_column: &str, updated: Task) {
        let Some(from) = self.find_task_column(&updated.id).map(str::to_string) else {
            return;
        };
        if from != new_column {
            self.relocate_task(&from, new_column, updated);
        }
    }

    fn relocate_task(&mut self, from: &str, to: &str, updated: Task) {
        if let Some(tasks) = self.tasks.get_mut(from) {
            tasks.retain(|t| t.id != updated.id);
        }
        self.tasks.entry(to.to_string()).or_default().push(updated);
    }

    /// Remove a task and its subtask bucket. Returns false when it was not loaded.
    pub fn remove_task(&mut self, task_id: &str) -> bool {
        let Some(column_id) = self.find_task_column(task_id).map(str::to_string) else {
            return false;
        };
        if let Some(tasks) = self.tasks.get_mut(&column_id) {
            tasks.retain(|t| t.id != task_id);
        }
        self.subtasks.shift_remove(task_id);
        true
    }

    // ========================
    // Subtasks
    // ========================

    pub fn set_subtasks(&mut self, task_id: &str, subtasks: Vec<Subtask>) {
        self.subtasks.insert(task_id.to_string(), subtasks);
    }

    pub fn push_subtask(&mut self, task_id: &str, subtask: Subtask) {
        self.subtasks.entry(task_id.to_string()).or_default().push(subtask);
    }

    /// Replace a subtask in its owning bucket. Returns false when it was not loaded.
    pub fn replace_subtask(&mut self, updated: Subtask) -> bool {
        let Some(task_id) = self.find_subtask_task(&updated.id).map(str::to_string) else {
            return false;
        };
        if let Some(subtasks) = self.subtasks.get_mut(&task_id) {
            replace_by_id(subtasks, updated);
        }
        true
    }

    /// Remove a subtask from its owning bucket. Returns false when it was not loaded.
    pub fn remove_subtask(&mut self, subtask_id: &str) -> bool {
        let Some(task_id) = self.find_subtask_task(subtask_id).map(str::to_string) else {
            return false;
        };
        if let Some(subtasks) = self.subtasks.get_mut(&task_id) {
            subtasks.retain(|s| s.id != subtask_id);
        }
        true
    }

    // ========================
    // Batched Detail
    // ========================

    /// Replace the whole board view from one batched load.
    ///
    /// Every column and every task gets a bucket, possibly empty.
    pub fn set_board_detail(
        &mut self,
        board: Board,
        columns: Vec<Column>,
        tasks: Vec<Task>,
        subtasks: Vec<Subtask>,
    ) {
        let mut task_index: IndexMap<String, Vec<Task>> =
            columns.iter().map(|c| (c.id.clone(), Vec::new())).collect();
        let mut subtask_index: IndexMap<String, Vec<Subtask>> =
            tasks.iter().map(|t| (t.id.clone(), Vec::new())).collect();

        for task in tasks {
            task_index.entry(task.column_id.clone()).or_default().push(task);
        }
        for subtask in subtasks {
            subtask_index.entry(subtask.task_id.clone()).or_default().push(subtask);
        }

        self.current_board = Some(board);
        self.columns = columns;
        self.tasks = task_index;
        self.subtasks = subtask_index;
    }
}

fn replace_by_id<T: crate::models::Entity>(items: &mut [T], updated: T) {
    if let Some(item) = items.iter_mut().find(|item| item.id() == updated.id()) {
        *item = updated;
    }
}
