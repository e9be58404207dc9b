//! Board Context
//!
//! Shares the board store with the component tree and mirrors every committed
//! snapshot into a reactive `Store<BoardState>` for fine-grained tracking.

use leptos::prelude::*;
use leptos::task::spawn_local;
use reactive_stores::Store;
use tracing::debug;

use crate::state::BoardState;
use crate::store::BoardStore;

/// Board store plus its reactive mirror, provided via context
#[derive(Clone)]
pub struct BoardContext {
    /// Action surface
    pub store: BoardStore,
    /// Read side for views
    pub view: Store<BoardState>,
}

/// Mirror `store` into a reactive view and provide both to children
pub fn provide_board_context(store: BoardStore) -> BoardContext {
    let view = Store::new(store.snapshot());
    let mut changes = store.subscribe();

    spawn_local(async move {
        while changes.changed().await.is_ok() {
            let next = changes.borrow_and_update().clone();
            if view.try_update(|state| *state = next).is_none() {
                debug!("Board view disposed, stopping mirror");
                break;
            }
        }
    });

    let context = BoardContext { store, view };
    provide_context(context.clone());
    context
}

/// Get the board context provided by an ancestor
pub fn use_board_context() -> BoardContext {
    expect_context::<BoardContext>()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::commands;
    use crate::state::BoardStateStoreFields;

    async fn wait_until(mut done: impl FnMut() -> bool) {
        for _ in 0..500 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("view did not catch up with the store");
    }

    #[tokio::test]
    async fn test_view_mirrors_store() {
        let _ = any_spawner::Executor::init_tokio();
        let local = tokio::task::LocalSet::new();

        local
            .run_until(async {
                let owner = Owner::new();
                owner.set();

                let backend = Arc::new(MemoryBackend::new());
                commands::create_board(&*backend, "Roadmap", "user-1").await.unwrap();
                let store = BoardStore::new(backend.clone());

                let context = provide_board_context(store.clone());
                let view = context.view;
                assert!(view.boards().get_untracked().is_empty());

                store.fetch_boards().await;
                wait_until(|| view.get_untracked() == store.snapshot()).await;
                assert_eq!(view.boards().get_untracked().len(), 1);

                store.create_board("Ideas", "user-1").await;
                wait_until(|| view.get_untracked() == store.snapshot()).await;
                assert_eq!(view.boards().get_untracked().len(), 2);
                assert!(!view.is_loading().get_untracked());

                let provided = use_board_context();
                assert_eq!(provided.view.get_untracked(), store.snapshot());
            })
            .await;
    }
}
