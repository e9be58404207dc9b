//! Board Store
//!
//! Single owned state container for the board views. Actions call the remote
//! access functions and reconcile the snapshot on success. Subscribers see
//! every committed change through a watch channel.
//!
//! Loading is tracked with an in-flight counter: `is_loading` stays true until
//! every started action, including nested fan-out fetches, has finished.
//! Fetches are tagged with a per-target generation, and a response whose
//! generation is no longer the latest for its target is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{DataBackend, RestBackend};
use crate::commands;
use crate::config::BackendConfig;
use crate::error::{BackendError, KanbanError, Result};
use crate::models::{NewTask, SubtaskUpdate, TaskUpdate};
use crate::state::BoardState;

/// Keys for which only the latest fetch may commit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    Boards,
    CurrentBoard,
    Columns,
    Tasks(String),
    Subtasks(String),
}

#[derive(Debug)]
struct Ticket {
    target: FetchTarget,
    generation: u64,
}

#[derive(Debug, Default)]
struct Bookkeeping {
    in_flight: usize,
    generations: HashMap<FetchTarget, u64>,
}

impl Bookkeeping {
    fn is_latest(&self, ticket: &Ticket) -> bool {
        self.generations.get(&ticket.target).copied().unwrap_or(0) == ticket.generation
    }
}

struct Inner {
    backend: Arc<dyn DataBackend>,
    state: watch::Sender<BoardState>,
    book: Mutex<Bookkeeping>,
}

impl Inner {
    fn book(&self) -> MutexGuard<'_, Bookkeeping> {
        // Bookkeeping holds plain counters, so a poisoned lock is still usable
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holds one loading slot; releasing the last slot clears `is_loading`
struct InFlight {
    inner: Arc<Inner>,
}

impl InFlight {
    fn begin(inner: &Arc<Inner>) -> Self {
        let mut book = inner.book();
        book.in_flight += 1;
        inner.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
        drop(book);

        Self {
            inner: Arc::clone(inner),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut book = self.inner.book();
        book.in_flight = book.in_flight.saturating_sub(1);
        if book.in_flight == 0 {
            self.inner.state.send_if_modified(|state| {
                let was_loading = state.is_loading;
                state.is_loading = false;
                was_loading
            });
        }
    }
}

/// Handle to the shared board state; cheap to clone
#[derive(Clone)]
pub struct BoardStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BoardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl BoardStore {
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        info!("Board store initialized");
        let (state, _) = watch::channel(BoardState::default());
        Self {
            inner: Arc::new(Inner {
                backend,
                state,
                book: Mutex::new(Bookkeeping::default()),
            }),
        }
    }

    /// Store backed by the hosted REST service
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let backend = RestBackend::new(config)?;
        Ok(Self::new(Arc::new(backend)))
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> BoardState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every committed change
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.inner.state.subscribe()
    }

    pub fn backend(&self) -> &dyn DataBackend {
        self.inner.backend.as_ref()
    }

    // ========================
    // Bookkeeping
    // ========================

    fn begin(&self) -> InFlight {
        InFlight::begin(&self.inner)
    }

    fn ticket(&self, target: FetchTarget) -> Ticket {
        let mut book = self.inner.book();
        let generation = book.generations.entry(target.clone()).or_insert(0);
        *generation += 1;
        Ticket {
            generation: *generation,
            target,
        }
    }

    fn commit(&self, apply: impl FnOnce(&mut BoardState)) {
        self.inner.state.send_modify(apply);
    }

    /// Apply a fetch result unless a newer fetch for any of the tickets'
    /// targets has started since. Returns whether it was applied.
    fn commit_fetch(&self, tickets: &[&Ticket], apply: impl FnOnce(&mut BoardState)) -> bool {
        let book = self.inner.book();
        if let Some(stale) = tickets.iter().find(|t| !book.is_latest(t)) {
            debug!(target_key = ?stale.target, generation = stale.generation, "Discarding stale fetch result");
            return false;
        }
        self.inner.state.send_modify(apply);
        true
    }

    fn fail(&self, action: &str, error: KanbanError) {
        warn!(action, error = %error, "Board store action failed");
        let message = error.to_string();
        self.commit(|state| state.error = Some(message));
    }

    fn fail_fetch(&self, ticket: &Ticket, action: &str, error: KanbanError) {
        let message = error.to_string();
        if self.commit_fetch(&[ticket], |state| state.error = Some(message)) {
            warn!(action, error = %error, "Board store fetch failed");
        }
    }

    // ========================
    // Boards
    // ========================

    pub async fn fetch_boards(&self) {
        let _loading = self.begin();
        let ticket = self.ticket(FetchTarget::Boards);

        match commands::list_boards(self.backend()).await {
            Ok(boards) => {
                self.commit_fetch(&[&ticket], |state| state.set_boards(boards));
            }
            Err(e) => self.fail_fetch(&ticket, "fetch_boards", e),
        }
    }

    /// Open a board and, when it exists, load its columns
    pub async fn fetch_board_by_id(&self, id: &str) {
        let _loading = self.begin();
        let ticket = self.ticket(FetchTarget::CurrentBoard);

        match commands::get_board(self.backend(), id).await {
            Ok(board) => {
                let found = board.is_some();
                let applied = self.commit_fetch(&[&ticket], |state| state.set_current_board(board));
                if applied && found {
                    self.fetch_columns(id).await;
                }
            }
            Err(e) => self.fail_fetch(&ticket, "fetch_board_by_id", e),
        }
    }

    /// Load a board with all its columns, tasks and subtasks in four requests
    pub async fn fetch_board_detail(&self, board_id: &str) {
        let _loading = self.begin();
        let board_ticket = self.ticket(FetchTarget::CurrentBoard);
        let columns_ticket = self.ticket(FetchTarget::Columns);
        let tickets = [&board_ticket, &columns_ticket];

        let board = match commands::get_board(self.backend(), board_id).await {
            Ok(Some(board)) => board,
            Ok(None) => {
                let missing = KanbanError::backend("fetching board", BackendError::not_found("boards"));
                return self.fail_fetch(&board_ticket, "fetch_board_detail", missing);
            }
            Err(e) => return self.fail_fetch(&board_ticket, "fetch_board_detail", e),
        };

        let detail = async {
            let columns = commands::list_columns_ordered(self.backend(), board_id).await?;
            let column_ids: Vec<String> = columns.iter().map(|c| c.id.clone()).collect();
            let tasks = commands::list_tasks_in(self.backend(), &column_ids).await?;
            let task_ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
            let subtasks = commands::list_subtasks_in(self.backend(), &task_ids).await?;
            Ok::<_, KanbanError>((columns, tasks, subtasks))
        };

        match detail.await {
            Ok((columns, tasks, subtasks)) => {
                debug!(board_id, columns = columns.len(), tasks = tasks.len(), "Loaded board detail");
                self.commit_fetch(&tickets, |state| {
                    state.set_board_detail(board, columns, tasks, subtasks)
                });
            }
            Err(e) => self.fail_fetch(&board_ticket, "fetch_board_detail", e),
        }
    }

    pub async fn create_board(&self, title: &str, owner_id: &str) {
        let _loading = self.begin();
        match commands::create_board(self.backend(), title, owner_id).await {
            Ok(board) => {
                info!(board_id = %board.id, "Created board");
                self.commit(|state| state.push_board(board));
            }
            Err(e) => self.fail("create_board", e),
        }
    }

    pub async fn update_board(&self, id: &str, title: &str) {
        let _loading = self.begin();
        match commands::update_board(self.backend(), id, title).await {
            Ok(board) => self.commit(|state| state.replace_board(board)),
            Err(e) => self.fail("update_board", e),
        }
    }

    pub async fn delete_board(&self, id: &str) {
        let _loading = self.begin();
        match commands::delete_board(self.backend(), id).await {
            Ok(()) => {
                info!(board_id = id, "Deleted board");
                self.commit(|state| state.remove_board(id));
            }
            Err(e) => self.fail("delete_board", e),
        }
    }

    // ========================
    // Columns
    // ========================

    /// Replace the columns, then load the tasks of every column
    pub async fn fetch_columns(&self, board_id: &str) {
        let _loading = self.begin();
        let ticket = self.ticket(FetchTarget::Columns);

        match commands::list_columns(self.backend(), board_id).await {
            Ok(columns) => {
                let column_ids: Vec<String> = columns.iter().map(|c| c.id.clone()).collect();
                if self.commit_fetch(&[&ticket], |state| state.set_columns(columns)) {
                    join_all(column_ids.iter().map(|id| self.fetch_tasks(id))).await;
                }
            }
            Err(e) => self.fail_fetch(&ticket, "fetch_columns", e),
        }
    }

    pub async fn create_column(&self, title: &str, board_id: &str) {
        let _loading = self.begin();
        match commands::create_column(self.backend(), title, board_id).await {
            Ok(column) => {
                info!(column_id = %column.id, board_id, "Created column");
                self.commit(|state| state.push_column(column));
            }
            Err(e) => self.fail("create_column", e),
        }
    }

    pub async fn update_column(&self, id: &str, title: &str) {
        let _loading = self.begin();
        match commands::update_column(self.backend(), id, title).await {
            Ok(column) => self.commit(|state| state.replace_column(column)),
            Err(e) => self.fail("update_column", e),
        }
    }

    /// Remove a column and its task bucket. Subtask buckets of its tasks stay.
    pub async fn delete_column(&self, id: &str) {
        let _loading = self.begin();
        match commands::delete_column(self.backend(), id).await {
            Ok(()) => {
                info!(column_id = id, "Deleted column");
                self.commit(|state| state.remove_column(id));
            }
            Err(e) => self.fail("delete_column", e),
        }
    }

    // ========================
    // Tasks
    // ========================

    /// Replace one column's tasks, then load the subtasks of every task
    pub async fn fetch_tasks(&self, column_id: &str) {
        let _loading = self.begin();
        let ticket = self.ticket(FetchTarget::Tasks(column_id.to_string()));

        match commands::list_tasks(self.backend(), column_id).await {
            Ok(tasks) => {
                let task_ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
                if self.commit_fetch(&[&ticket], |state| state.set_tasks(column_id, tasks)) {
                    join_all(task_ids.iter().map(|id| self.fetch_subtasks(id))).await;
                }
            }
            Err(e) => self.fail_fetch(&ticket, "fetch_tasks", e),
        }
    }

    pub async fn create_task(
        &self,
        title: &str,
        column_id: &str,
        description: Option<&str>,
        status: Option<&str>,
    ) {
        let _loading = self.begin();
        let payload = NewTask {
            title,
            column_id,
            description,
            status,
        };

        match commands::create_task(self.backend(), &payload).await {
            Ok(task) => {
                info!(task_id = %task.id, column_id, "Created task");
                self.commit(|state| state.push_task(column_id, task));
            }
            Err(e) => self.fail("create_task", e),
        }
    }

    /// Patch a task; a changed `column_id` moves it between buckets
    pub async fn update_task(&self, id: &str, updates: TaskUpdate) {
        let _loading = self.begin();
        match commands::update_task(self.backend(), id, &updates).await {
            Ok(task) => {
                self.commit(|state| state.apply_task_update(updates.column_id.as_deref(), task))
            }
            Err(e) => self.fail("update_task", e),
        }
    }

    pub async fn delete_task(&self, id: &str) {
        let _loading = self.begin();
        match commands::delete_task(self.backend(), id).await {
            Ok(()) => {
                info!(task_id = id, "Deleted task");
                self.commit(|state| {
                    if !state.remove_task(id) {
                        debug!(task_id = id, "Deleted task was not loaded");
                    }
                });
            }
            Err(e) => self.fail("delete_task", e),
        }
    }

    /// Persist a task's new column and move it between buckets
    pub async fn move_task(&self, task_id: &str, new_column_id: &str) {
        let _loading = self.begin();
        match commands::move_task(self.backend(), task_id, new_column_id).await {
            Ok(task) => self.commit(|state| state.apply_task_move(new_column_id, task)),
            Err(e) => self.fail("move_task", e),
        }
    }

    // ========================
    // Subtasks
    // ========================

    pub async fn fetch_subtasks(&self, task_id: &str) {
        let _loading = self.begin();
        let ticket = self.ticket(FetchTarget::Subtasks(task_id.to_string()));

        match commands::list_subtasks(self.backend(), task_id).await {
            Ok(subtasks) => {
                self.commit_fetch(&[&ticket], |state| state.set_subtasks(task_id, subtasks));
            }
            Err(e) => self.fail_fetch(&ticket, "fetch_subtasks", e),
        }
    }

    pub async fn create_subtask(&self, title: &str, task_id: &str) {
        let _loading = self.begin();
        match commands::create_subtask(self.backend(), title, task_id).await {
            Ok(subtask) => {
                info!(subtask_id = %subtask.id, task_id, "Created subtask");
                self.commit(|state| state.push_subtask(task_id, subtask));
            }
            Err(e) => self.fail("create_subtask", e),
        }
    }

    pub async fn update_subtask(&self, id: &str, updates: SubtaskUpdate) {
        let _loading = self.begin();
        match commands::update_subtask(self.backend(), id, &updates).await {
            Ok(subtask) => self.commit(|state| {
                state.replace_subtask(subtask);
            }),
            Err(e) => self.fail("update_subtask", e),
        }
    }

    pub async fn toggle_subtask_completion(&self, id: &str, is_completed: bool) {
        let _loading = self.begin();
        match commands::set_subtask_completed(self.backend(), id, is_completed).await {
            Ok(subtask) => self.commit(|state| {
                state.replace_subtask(subtask);
            }),
            Err(e) => self.fail("toggle_subtask_completion", e),
        }
    }

    pub async fn delete_subtask(&self, id: &str) {
        let _loading = self.begin();
        match commands::delete_subtask(self.backend(), id).await {
            Ok(()) => {
                info!(subtask_id = id, "Deleted subtask");
                self.commit(|state| {
                    state.remove_subtask(id);
                });
            }
            Err(e) => self.fail("delete_subtask", e),
        }
    }
}

#[cfg(test)]
mod tests;
