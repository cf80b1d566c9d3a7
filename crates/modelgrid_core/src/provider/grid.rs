//! Grid-facing CRUD state machine.
//!
//! # Responsibility
//! - Track the current action button, selection and edit buffer for a
//!   data-grid host.
//! - Translate button clicks into provider operations.
//!
//! # Invariants
//! - Action flags are pure functions of (loading, button, selection).
//! - Removal always consults the injected confirmation capability first.
//! - The loading subscription opened at construction is closed exactly
//!   once at dispose.

use super::{lock, ItemProvider, LoadingSubscription, ProviderError, ProviderResult};
use crate::model::Model;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Grid action vocabulary.
///
/// `Yes`/`No` are only ever produced by [`RemoveConfirmation`]; the grid
/// never feeds them into its own transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonName {
    None,
    New,
    Add,
    Edit,
    Remove,
    Yes,
    No,
}

/// Host-supplied removal confirmation (a dialog, a prompt, a policy).
pub trait RemoveConfirmation: Send + Sync {
    /// Returns `ButtonName::Yes` to proceed with removal, anything else to
    /// abort.
    fn confirm_remove(&self) -> ButtonName;
}

struct GridState<T: Model> {
    button: ButtonName,
    selected: Option<T>,
    edit_item: Option<T>,
}

impl<T: Model> GridState<T> {
    fn new() -> Self {
        Self {
            button: ButtonName::None,
            selected: None,
            edit_item: None,
        }
    }
}

/// UI-facing provider coordinating button-driven CRUD and selection.
pub struct DataGridProvider<T: Model> {
    provider: Arc<dyn ItemProvider<T>>,
    confirm: Arc<dyn RemoveConfirmation>,
    state: Arc<Mutex<GridState<T>>>,
    subscription: Mutex<Option<LoadingSubscription>>,
    disposed: AtomicBool,
}

impl<T: Model> DataGridProvider<T> {
    /// Builds a grid provider and subscribes to the provider's loading
    /// notifications.
    pub fn new(provider: Arc<dyn ItemProvider<T>>, confirm: Arc<dyn RemoveConfirmation>) -> Self {
        let state = Arc::new(Mutex::new(GridState::new()));

        let callback_state = Arc::clone(&state);
        let callback_provider = Arc::clone(&provider);
        let subscription = provider.subscribe_loading(Arc::new(move |_is_loading| {
            let mut state = lock(&callback_state);
            if let Err(err) = refresh_selection(&mut state, callback_provider.as_ref()) {
                warn!("event=grid_refresh module=grid status=error error={err}");
            }
        }));

        Self {
            provider,
            confirm,
            state,
            subscription: Mutex::new(Some(subscription)),
            disposed: AtomicBool::new(false),
        }
    }

    /// Snapshot of the underlying collection.
    pub fn items(&self) -> Vec<T> {
        self.provider.items()
    }

    pub fn selected_item(&self) -> Option<T> {
        lock(&self.state).selected.clone()
    }

    pub fn edit_item(&self) -> Option<T> {
        lock(&self.state).edit_item.clone()
    }

    /// Replaces the edit buffer directly (host data-binding path).
    pub fn set_edit_item(&self, item: T) {
        lock(&self.state).edit_item = Some(item);
    }

    pub fn current_button(&self) -> ButtonName {
        lock(&self.state).button
    }

    /// Selects an item (or clears the selection), requesting a fresh edit
    /// clone when editing is possible.
    pub fn select_item(&self, item: Option<T>) -> ProviderResult<()> {
        let mut state = lock(&self.state);
        apply_selection(&mut state, self.provider.as_ref(), item)
    }

    pub fn can_new(&self) -> bool {
        let state = lock(&self.state);
        self.is_operable() && state.button != ButtonName::New
    }

    pub fn can_add(&self) -> bool {
        let state = lock(&self.state);
        self.is_operable() && state.button == ButtonName::New
    }

    pub fn can_edit(&self) -> bool {
        let state = lock(&self.state);
        can_edit_state(self.is_operable(), state.button, state.selected.is_some())
    }

    pub fn can_delete(&self) -> bool {
        let state = lock(&self.state);
        can_edit_state(self.is_operable(), state.button, state.selected.is_some())
    }

    /// Drives one button transition.
    pub fn click_button(&self, button: ButtonName) -> ProviderResult<()> {
        let mut state = lock(&self.state);
        let mut effective = button;
        match button {
            ButtonName::New => {
                state.selected = None;
                state.edit_item = Some(self.provider.new_item());
            }
            ButtonName::Add => {
                let to_add = self.edit_buffer(&state)?;
                self.provider.add(to_add.clone())?;
                apply_selection(&mut state, self.provider.as_ref(), Some(to_add))?;
            }
            ButtonName::Edit => {
                let edited = self.edit_buffer(&state)?;
                self.provider.end_edit(&edited)?;
            }
            ButtonName::Remove => {
                if self.confirm.confirm_remove() != ButtonName::Yes {
                    return Ok(());
                }
                let to_remove = self.edit_buffer(&state)?;
                self.provider.remove(&to_remove)?;
                match self.provider.neighbor_of(to_remove.identifier()) {
                    Some(nearest) => {
                        apply_selection(&mut state, self.provider.as_ref(), Some(nearest))?;
                    }
                    None => {
                        state.selected = None;
                        state.edit_item = Some(self.provider.new_item());
                        effective = ButtonName::New;
                    }
                }
            }
            // None/Yes/No carry no transition of their own.
            ButtonName::None | ButtonName::Yes | ButtonName::No => {}
        }
        state.button = effective;
        debug!(
            "event=grid_click module=grid status=ok button={effective:?} selected={:?}",
            state.selected.as_ref().map(Model::identifier)
        );
        Ok(())
    }

    /// Closes the loading subscription. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(subscription) = lock(&self.subscription).take() {
            self.provider.unsubscribe_loading(subscription);
        }
        debug!("event=grid_dispose module=grid status=ok");
    }

    fn is_operable(&self) -> bool {
        !self.provider.is_loading()
    }

    fn edit_buffer(&self, state: &GridState<T>) -> ProviderResult<T> {
        state
            .edit_item
            .clone()
            .ok_or_else(|| ProviderError::Argument("no edit item is set".to_string()))
    }
}

impl<T: Model> Drop for DataGridProvider<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn can_edit_state(operable: bool, button: ButtonName, has_selection: bool) -> bool {
    operable && button != ButtonName::New && has_selection
}

/// Shared selection transition: selection set, button reset, edit clone
/// requested when editing is possible.
fn apply_selection<T: Model>(
    state: &mut GridState<T>,
    provider: &dyn ItemProvider<T>,
    item: Option<T>,
) -> ProviderResult<()> {
    state.selected = item;
    state.button = ButtonName::None;
    if can_edit_state(!provider.is_loading(), state.button, state.selected.is_some()) {
        if let Some(selected) = state.selected.clone() {
            state.edit_item = Some(provider.begin_edit(&selected)?);
        }
    }
    Ok(())
}

/// Reaction to a loading-state edge: select the first item, or enter the
/// new-item flow when the collection is empty.
fn refresh_selection<T: Model>(
    state: &mut GridState<T>,
    provider: &dyn ItemProvider<T>,
) -> ProviderResult<()> {
    match provider.items().into_iter().next() {
        Some(first) => apply_selection(state, provider, Some(first)),
        None => {
            state.selected = None;
            state.edit_item = Some(provider.new_item());
            state.button = ButtonName::New;
            Ok(())
        }
    }
}
