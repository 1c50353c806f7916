//! Headless combobox state machine.
//!
//! A [`Combobox`] owns the highlighted index, open state, input text and
//! selected item of an input paired with a selectable list. It does not
//! render anything: each render pass the UI layer asks it for attribute
//! records, registers the visible items, and feeds user interactions back
//! through [`Combobox::dispatch`].
//!
//! # Render cycle
//!
//! ```
//! use horizon_geocomplete::combobox::{Combobox, ComboboxConfig, ComboboxEvent, ItemArgs, Key, RootElement};
//!
//! let mut combobox = Combobox::new(ComboboxConfig::<String>::default().with_id("city"));
//!
//! combobox.begin_render();
//! for city in ["Berlin", "Bern", "Bergen"] {
//!     combobox.item_props(ItemArgs::new(city.to_string())).unwrap();
//! }
//! combobox.end_render(RootElement::Plain).unwrap();
//!
//! combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), None);
//! combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), None);
//! assert_eq!(combobox.highlighted_index(), Some(0));
//!
//! combobox.dispatch(ComboboxEvent::key(Key::Enter), None);
//! assert!(!combobox.is_open());
//! assert_eq!(combobox.input_value(), "Berlin");
//! ```
//!
//! # Signals
//!
//! - `input_value_changed(String)`: An update carries new input text (fires before it is applied)
//! - `state_changed(StateChange<T>)`: Keys whose value changed, tagged with the cause
//! - `selected(Option<T>)`: An update carried a selected item, changed or not
//! - `changed(Option<T>)`: The selected item changed
//! - `outer_click(())`: A pointer release outside the root closed the menu
//! - `status_changed(String)`: The screen reader announcement changed
//!
//! # Controlled fields
//!
//! Any field can be handed to the caller with `control_*`. Updates that target
//! a controlled field are reported through `state_changed` but not stored; the
//! caller decides whether to feed the new value back.

mod config;
mod events;
mod props;
mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use horizon_geocomplete_core::logging::{span_names, targets};
use horizon_geocomplete_core::{
    Clock, Debouncer, PerfSpan, Signal, SystemClock, TimerManager,
};

pub use config::{ComboboxConfig, DEFAULT_SCROLL_SUPPRESSION};
pub use events::{ComboboxEvent, DispatchOutcome, EventContext, Key};
pub use props::{
    Attributes, ButtonProps, ElementIds, InputProps, ItemProps, LabelProps, MenuProps, RootProps,
    StatusProps,
};
pub use state::{ChangeKind, ComboboxState, Field, StateChange, StateKey, StateUpdate};

use crate::error::ComboboxError;
use crate::status::{StatusAnnouncer, StatusContext, StatusSnapshot};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn generate_id() -> String {
    format!("geocomplete-{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// What the UI layer rendered as the root element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootElement {
    /// A plain element; root attributes are bound automatically.
    Plain,
    /// A composite component that must apply [`Combobox::root_props`] itself.
    Composite,
}

/// Arguments to [`Combobox::item_props`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemArgs<T> {
    /// The item to register. Required.
    pub item: Option<T>,
    /// Explicit position; appended when `None`.
    pub index: Option<usize>,
}

impl<T> Default for ItemArgs<T> {
    fn default() -> Self {
        Self {
            item: None,
            index: None,
        }
    }
}

impl<T> ItemArgs<T> {
    /// Register `item` at the next position.
    pub fn new(item: T) -> Self {
        Self {
            item: Some(item),
            index: None,
        }
    }

    /// Register at an explicit, stable position.
    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

/// A request to scroll the highlighted item into view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrollRequest {
    /// Index of the item.
    pub index: usize,
    /// Element id of the item.
    pub element_id: String,
}

/// A headless combobox.
///
/// See the [module documentation](self) for the render cycle.
pub struct Combobox<T> {
    config: ComboboxConfig<T>,
    ids: ElementIds,

    highlighted_index: Field<Option<usize>>,
    is_open: Field<bool>,
    input_value: Field<String>,
    selected_item: Field<Option<T>>,

    /// Items registered during the current render pass.
    items: Vec<Option<T>>,
    item_count_override: Option<usize>,
    root_ref_key: Option<String>,

    timers: TimerManager,
    status: StatusAnnouncer,
    scroll_guard: Debouncer,
    avoid_scroll: bool,
    settled_highlight: Option<usize>,
    scroll_request: Option<ScrollRequest>,

    pointer_down: bool,
    mounted: bool,

    // Signals
    /// Signal emitted with new input text, before it is applied.
    pub input_value_changed: Signal<String>,
    /// Signal emitted with the keys an update changed.
    pub state_changed: Signal<StateChange<T>>,
    /// Signal emitted whenever an update carries a selected item.
    pub selected: Signal<Option<T>>,
    /// Signal emitted when the selected item changes.
    pub changed: Signal<Option<T>>,
    /// Signal emitted when a click outside the root closes the menu.
    pub outer_click: Signal<()>,
    /// Signal emitted when the status announcement changes.
    pub status_changed: Signal<String>,
}

static_assertions::assert_impl_all!(Combobox<String>: Send, Sync);

impl<T: Clone + PartialEq + 'static> Combobox<T> {
    /// Create a combobox on the system clock.
    pub fn new(config: ComboboxConfig<T>) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a combobox whose timers run on `clock`.
    pub fn with_clock(config: ComboboxConfig<T>, clock: Arc<dyn Clock>) -> Self {
        let id = config.id.clone().unwrap_or_else(generate_id);
        tracing::debug!(target: targets::COMBOBOX, %id, "combobox created");

        Self {
            ids: ElementIds::new(&id),
            highlighted_index: Field::Internal(config.default_highlighted_index),
            is_open: Field::Internal(config.default_is_open),
            input_value: Field::Internal(config.default_input_value.clone()),
            selected_item: Field::Internal(config.default_selected_item.clone()),
            items: Vec::new(),
            item_count_override: None,
            root_ref_key: None,
            timers: TimerManager::with_clock(clock),
            status: StatusAnnouncer::new(config.status_debounce),
            scroll_guard: Debouncer::new(config.scroll_suppression),
            avoid_scroll: false,
            settled_highlight: None,
            scroll_request: None,
            pointer_down: false,
            mounted: true,
            config,
            input_value_changed: Signal::new(),
            state_changed: Signal::new(),
            selected: Signal::new(),
            changed: Signal::new(),
            outer_click: Signal::new(),
            status_changed: Signal::new(),
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// The id element ids are derived from.
    pub fn id(&self) -> &str {
        &self.ids.root
    }

    /// Derived element ids.
    pub fn ids(&self) -> &ElementIds {
        &self.ids
    }

    /// The configuration.
    pub fn config(&self) -> &ComboboxConfig<T> {
        &self.config
    }

    /// The resolved state.
    pub fn state(&self) -> ComboboxState<T> {
        ComboboxState {
            highlighted_index: *self.highlighted_index.get(),
            is_open: *self.is_open.get(),
            input_value: self.input_value.get().clone(),
            selected_item: self.selected_item.get().clone(),
        }
    }

    /// Highlighted index.
    pub fn highlighted_index(&self) -> Option<usize> {
        *self.highlighted_index.get()
    }

    /// Whether the menu is open.
    pub fn is_open(&self) -> bool {
        *self.is_open.get()
    }

    /// Input text.
    pub fn input_value(&self) -> &str {
        self.input_value.get()
    }

    /// Selected item.
    pub fn selected_item(&self) -> Option<&T> {
        self.selected_item.get().as_ref()
    }

    /// Whether the caller controls `key`.
    pub fn is_controlled(&self, key: StateKey) -> bool {
        match key {
            StateKey::HighlightedIndex => self.highlighted_index.is_external(),
            StateKey::IsOpen => self.is_open.is_external(),
            StateKey::InputValue => self.input_value.is_external(),
            StateKey::SelectedItem => self.selected_item.is_external(),
        }
    }

    /// The registered item at `index`.
    pub fn item(&self, index: usize) -> Option<&T> {
        self.items.get(index).and_then(Option::as_ref)
    }

    /// Number of items: the override, else the configured count, else the
    /// number registered this render pass.
    pub fn item_count(&self) -> usize {
        self.item_count_override
            .or(self.config.item_count)
            .unwrap_or(self.items.len())
    }

    /// The current status announcement.
    pub fn status_message(&self) -> &str {
        self.status.message()
    }

    /// Whether the combobox is still mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    // =========================================================================
    // Controlled Fields
    // =========================================================================

    /// Supply the highlighted index from outside.
    pub fn control_highlighted_index(&mut self, index: Option<usize>) {
        self.highlighted_index.control(index);
    }

    /// Supply the open state from outside.
    pub fn control_is_open(&mut self, is_open: bool) {
        self.is_open.control(is_open);
    }

    /// Supply the input text from outside.
    pub fn control_input_value(&mut self, value: impl Into<String>) {
        self.input_value.control(value.into());
    }

    /// Supply the selected item from outside.
    pub fn control_selected_item(&mut self, item: Option<T>) {
        self.selected_item.control(item);
    }

    /// Take back ownership of the highlighted index.
    pub fn release_highlighted_index(&mut self) {
        self.highlighted_index.release();
    }

    /// Take back ownership of the open state.
    pub fn release_is_open(&mut self) {
        self.is_open.release();
    }

    /// Take back ownership of the input text.
    pub fn release_input_value(&mut self) {
        self.input_value.release();
    }

    /// Take back ownership of the selected item.
    pub fn release_selected_item(&mut self) {
        self.selected_item.release();
    }

    // =========================================================================
    // Update Primitive
    // =========================================================================

    /// Apply a state update.
    pub fn set_state(&mut self, update: impl Into<StateUpdate<T>>) {
        self.set_state_with(update, |_| {});
    }

    /// Apply a state update and run `on_complete` once it is committed.
    ///
    /// Notification order: `input_value_changed` (before commit), commit,
    /// `on_complete`, `state_changed` (only if a key changed), `selected`
    /// (if the update carries a selected item), `changed` (if the selected
    /// item differs from the previous one).
    pub fn set_state_with<F>(&mut self, update: impl Into<StateUpdate<T>>, on_complete: F)
    where
        F: FnOnce(&ComboboxState<T>),
    {
        if !self.mounted {
            tracing::debug!(target: targets::COMBOBOX, id = %self.ids.root, "update ignored after unmount");
            return;
        }
        let _span = PerfSpan::new(span_names::STATE_UPDATE);

        let current = self.state();
        let change = match update.into() {
            StateUpdate::Partial(change) => {
                if let Some(value) = &change.input_value {
                    self.input_value_changed.emit(value.clone());
                }
                self.reduce(&current, change)
            }
            StateUpdate::Compute(compute) => {
                let change = self.reduce(&current, compute(&current));
                if let Some(value) = &change.input_value {
                    self.input_value_changed.emit(value.clone());
                }
                change
            }
        };

        let mut notice = StateChange::new(change.kind);
        let mut reported_only = Vec::new();

        if let Some(index) = change.highlighted_index {
            if index != current.highlighted_index {
                notice.highlighted_index = Some(index);
            }
            if !self.highlighted_index.store(index) {
                reported_only.push(StateKey::HighlightedIndex);
            }
        }
        if let Some(is_open) = change.is_open {
            if is_open != current.is_open {
                notice.is_open = Some(is_open);
            }
            if !self.is_open.store(is_open) {
                reported_only.push(StateKey::IsOpen);
            }
        }
        if let Some(value) = change.input_value {
            if value != current.input_value {
                notice.input_value = Some(value.clone());
            }
            if !self.input_value.store(value) {
                reported_only.push(StateKey::InputValue);
            }
        }
        let mut selection = None;
        if let Some(item) = change.selected_item {
            let differs = item != current.selected_item;
            if differs {
                notice.selected_item = Some(item.clone());
            }
            if !self.selected_item.store(item.clone()) {
                reported_only.push(StateKey::SelectedItem);
            }
            selection = Some((item, differs));
        }

        tracing::trace!(
            target: targets::COMBOBOX,
            kind = %change.kind,
            changed = ?notice.keys(),
            controlled = ?reported_only,
            "state committed"
        );

        on_complete(&self.state());

        if !notice.is_empty() {
            self.state_changed.emit(notice);
        }
        if let Some((item, differs)) = selection {
            self.selected.emit(item.clone());
            if differs {
                self.changed.emit(item);
            }
        }
    }

    fn reduce(&self, current: &ComboboxState<T>, change: StateChange<T>) -> StateChange<T> {
        match &self.config.state_reducer {
            Some(reducer) => reducer(current, change),
            None => change,
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Open the menu.
    pub fn open_menu(&mut self) {
        self.set_state(StateChange::new(ChangeKind::Unknown).with_is_open(true));
    }

    /// Close the menu.
    pub fn close_menu(&mut self) {
        self.set_state(StateChange::new(ChangeKind::Unknown).with_is_open(false));
    }

    /// Flip the menu; opening highlights the default index.
    pub fn toggle_menu(&mut self) {
        self.toggle_menu_as(ChangeKind::Unknown);
    }

    /// Select `item`, close the menu and put its text in the input.
    pub fn select_item(&mut self, item: T) {
        self.select_item_as(item, ChangeKind::Unknown);
    }

    /// Select the registered item at `index`. Returns `false` if there is none.
    pub fn select_item_at_index(&mut self, index: usize) -> bool {
        self.select_item_at_index_as(index, ChangeKind::Unknown)
    }

    /// Select the highlighted item. Returns `false` if nothing is highlighted.
    pub fn select_highlighted_item(&mut self) -> bool {
        self.select_highlighted_item_as(ChangeKind::Unknown)
    }

    /// Highlight `index` exactly, or clear the highlight with `None`.
    ///
    /// Returns `false` and leaves the state alone when `index` is past the
    /// last item.
    pub fn set_highlighted_index(&mut self, index: Option<usize>) -> bool {
        if !self.in_range(index) {
            return false;
        }
        self.set_state(StateChange::new(ChangeKind::Unknown).with_highlighted_index(index));
        true
    }

    fn in_range(&self, index: Option<usize>) -> bool {
        index.is_none_or(|i| i < self.item_count())
    }

    /// Move the highlight by `amount`, wrapping at both ends; opens the menu
    /// on the default index when closed.
    pub fn move_highlighted_index(&mut self, amount: isize) {
        self.move_highlighted_index_as(amount, ChangeKind::Unknown);
    }

    /// Clear the selection and the input text, and close the menu.
    pub fn clear_selection(&mut self) {
        self.set_state(
            StateChange::new(ChangeKind::Unknown)
                .with_selected_item(None)
                .with_input_value("")
                .with_is_open(false)
                .with_highlighted_index(self.config.default_highlighted_index),
        );
    }

    /// Close the menu, restore the default highlight and put the selection's
    /// text (or nothing) back in the input.
    pub fn reset(&mut self) {
        self.reset_as(ChangeKind::Unknown);
    }

    /// Override the item count.
    pub fn set_item_count(&mut self, count: usize) {
        self.item_count_override = Some(count);
    }

    /// Remove the item count override.
    pub fn unset_item_count(&mut self) {
        self.item_count_override = None;
    }

    fn toggle_menu_as(&mut self, kind: ChangeKind) {
        self.set_state(StateUpdate::compute(move |state: &ComboboxState<T>| {
            StateChange::new(kind).with_is_open(!state.is_open)
        }));
        if self.is_open() {
            self.highlight_default_as(kind);
        }
    }

    fn select_item_as(&mut self, item: T, kind: ChangeKind) {
        let text = self.config.item_to_string(&item);
        self.set_state(
            StateChange::new(kind)
                .with_is_open(false)
                .with_highlighted_index(self.config.default_highlighted_index)
                .with_selected_item(Some(item))
                .with_input_value(text),
        );
    }

    fn select_item_at_index_as(&mut self, index: usize, kind: ChangeKind) -> bool {
        match self.item(index).cloned() {
            Some(item) => {
                self.select_item_as(item, kind);
                true
            }
            None => false,
        }
    }

    fn select_highlighted_item_as(&mut self, kind: ChangeKind) -> bool {
        match self.highlighted_index() {
            Some(index) => self.select_item_at_index_as(index, kind),
            None => false,
        }
    }

    fn highlight_default_as(&mut self, kind: ChangeKind) {
        self.set_state(
            StateChange::new(kind).with_highlighted_index(self.config.default_highlighted_index),
        );
    }

    fn move_highlighted_index_as(&mut self, amount: isize, kind: ChangeKind) {
        if self.is_open() {
            self.change_highlighted_index(amount, kind);
        } else {
            self.set_state(
                StateChange::new(kind)
                    .with_is_open(true)
                    .with_highlighted_index(self.config.default_highlighted_index),
            );
        }
    }

    fn change_highlighted_index(&mut self, amount: isize, kind: ChangeKind) {
        let count = self.item_count();
        if count == 0 {
            return;
        }
        let last = count as isize - 1;
        let base = match self.highlighted_index() {
            Some(index) => index as isize,
            None if amount > 0 => -1,
            None => last + 1,
        };
        let mut next = base + amount;
        if next < 0 {
            next = last;
        } else if next > last {
            next = 0;
        }
        self.set_state(StateChange::new(kind).with_highlighted_index(Some(next as usize)));
    }

    fn reset_as(&mut self, kind: ChangeKind) {
        let default_index = self.config.default_highlighted_index;
        let item_to_string = self.config.item_to_string.clone();
        self.set_state(StateUpdate::compute(move |state: &ComboboxState<T>| {
            StateChange::new(kind)
                .with_is_open(false)
                .with_highlighted_index(default_index)
                .with_input_value(
                    state
                        .selected_item
                        .as_ref()
                        .map(|item| item_to_string(item))
                        .unwrap_or_default(),
                )
        }));
    }

    // =========================================================================
    // Event Handlers
    // =========================================================================

    /// Route a user interaction.
    ///
    /// `caller` runs first; if it calls
    /// [`EventContext::prevent_default_handling`] the combobox leaves the
    /// event alone.
    pub fn dispatch(
        &mut self,
        event: ComboboxEvent,
        caller: Option<&mut dyn FnMut(&ComboboxEvent, &mut EventContext)>,
    ) -> DispatchOutcome {
        if !self.mounted {
            return DispatchOutcome::default();
        }

        let mut ctx = EventContext::default();
        if let Some(handler) = caller {
            handler(&event, &mut ctx);
        }
        if ctx.is_default_handling_prevented() {
            tracing::trace!(target: targets::COMBOBOX, ?event, "default handling prevented by caller");
            return DispatchOutcome {
                default_prevented: true,
                handled: false,
            };
        }

        let _span = PerfSpan::new(span_names::DISPATCH);
        let handled = self.handle_event(event);
        DispatchOutcome {
            default_prevented: false,
            handled,
        }
    }

    fn handle_event(&mut self, event: ComboboxEvent) -> bool {
        match event {
            ComboboxEvent::InputKeyDown { key, shift } => self.handle_input_key(key, shift),
            ComboboxEvent::InputChange { value } => {
                self.set_state(
                    StateChange::new(ChangeKind::ChangeInput)
                        .with_is_open(true)
                        .with_input_value(value)
                        .with_highlighted_index(self.config.default_highlighted_index),
                );
                true
            }
            ComboboxEvent::InputFocus => {
                if self.input_value().is_empty() || self.is_open() {
                    return false;
                }
                self.set_state(StateChange::new(ChangeKind::FocusInput).with_is_open(true));
                true
            }
            ComboboxEvent::InputBlur => {
                if self.pointer_down {
                    return false;
                }
                self.reset_as(ChangeKind::BlurInput);
                true
            }
            ComboboxEvent::ButtonClick => {
                self.toggle_menu_as(ChangeKind::ClickButton);
                true
            }
            ComboboxEvent::ButtonKeyDown { key } => {
                if key != Key::Enter {
                    return false;
                }
                self.toggle_menu_as(ChangeKind::KeyDownEnterButton);
                true
            }
            ComboboxEvent::ItemMouseEnter { index } => {
                if !self.in_range(Some(index)) {
                    return false;
                }
                self.set_state(
                    StateChange::new(ChangeKind::ItemMouseEnter).with_highlighted_index(Some(index)),
                );
                self.avoid_scroll = true;
                self.scroll_guard.trigger(&mut self.timers);
                true
            }
            ComboboxEvent::ItemClick { index } => {
                self.select_item_at_index_as(index, ChangeKind::ClickItem)
            }
            ComboboxEvent::PointerDown => {
                self.pointer_down = true;
                false
            }
            ComboboxEvent::PointerUp { inside_root } => {
                let was_down = std::mem::replace(&mut self.pointer_down, false);
                if !was_down || inside_root || !self.is_open() {
                    return false;
                }
                self.reset_as(ChangeKind::MouseUp);
                self.outer_click.emit(());
                true
            }
        }
    }

    fn handle_input_key(&mut self, key: Key, shift: bool) -> bool {
        let step = if shift { 5 } else { 1 };
        match key {
            Key::ArrowDown => {
                self.move_highlighted_index_as(step, ChangeKind::KeyDownArrowDown);
                true
            }
            Key::ArrowUp => {
                self.move_highlighted_index_as(-step, ChangeKind::KeyDownArrowUp);
                true
            }
            Key::Enter => {
                if !self.is_open() {
                    return false;
                }
                self.select_highlighted_item_as(ChangeKind::KeyDownEnter);
                true
            }
            Key::Escape => {
                self.reset_as(ChangeKind::KeyDownEscape);
                true
            }
            Key::Other => false,
        }
    }

    // =========================================================================
    // Render Cycle
    // =========================================================================

    /// Start a render pass. Items registered by the previous pass are dropped.
    pub fn begin_render(&mut self) {
        self.items.clear();
        self.root_ref_key = None;
    }

    /// Root props. A composite root must call this before `end_render`.
    pub fn root_props(&mut self, ref_key: impl Into<String>) -> RootProps {
        let ref_key = ref_key.into();
        self.root_ref_key = Some(ref_key.clone());
        RootProps {
            ref_key,
            id: self.ids.root.clone(),
        }
    }

    /// Label props.
    pub fn label_props(&self) -> LabelProps {
        LabelProps {
            id: self.ids.label.clone(),
            html_for: self.ids.input.clone(),
        }
    }

    /// Input props.
    pub fn input_props(&self) -> InputProps {
        let is_open = self.is_open();
        InputProps {
            id: self.ids.input.clone(),
            value: self.input_value().to_string(),
            expanded: is_open,
            active_descendant: self
                .highlighted_index()
                .filter(|_| is_open)
                .map(|index| self.ids.item(index)),
            labelled_by: self.ids.label.clone(),
        }
    }

    /// Toggle button props.
    pub fn button_props(&self) -> ButtonProps {
        ButtonProps {
            expanded: self.is_open(),
        }
    }

    /// Menu props.
    pub fn menu_props(&self) -> MenuProps {
        MenuProps {
            id: self.ids.menu.clone(),
            labelled_by: self.ids.label.clone(),
            is_open: self.is_open(),
        }
    }

    /// Register an item for this render pass and get its props.
    pub fn item_props(&mut self, args: ItemArgs<T>) -> Result<ItemProps, ComboboxError> {
        let item = args
            .item
            .ok_or(ComboboxError::missing("item", "item_props"))?;

        let index = match args.index {
            Some(index) => {
                if index >= self.items.len() {
                    self.items.resize_with(index + 1, || None);
                }
                self.items[index] = Some(item);
                index
            }
            None => {
                self.items.push(Some(item));
                self.items.len() - 1
            }
        };

        Ok(ItemProps {
            id: self.ids.item(index),
            index,
            highlighted: self.highlighted_index() == Some(index),
        })
    }

    /// Status region props.
    pub fn status_props(&self) -> StatusProps {
        StatusProps {
            id: self.ids.status.clone(),
            message: self.status.message().to_string(),
        }
    }

    /// Finish a render pass.
    ///
    /// Schedules a status announcement when what it depends on changed and
    /// queues a scroll request when the highlight moved.
    pub fn end_render(&mut self, root: RootElement) -> Result<(), ComboboxError> {
        if root == RootElement::Composite
            && self.root_ref_key.as_deref().is_none_or(str::is_empty)
        {
            return Err(ComboboxError::RootPropsNotApplied);
        }
        if self.mounted {
            self.settle();
        }
        Ok(())
    }

    fn settle(&mut self) {
        let snapshot = StatusSnapshot {
            is_open: self.is_open(),
            highlighted_index: self.highlighted_index(),
            result_count: self.item_count(),
        };
        self.status.observe(snapshot, &mut self.timers);

        let highlighted = self.highlighted_index();
        if highlighted != self.settled_highlight {
            self.settled_highlight = highlighted;
            if let Some(index) = highlighted.filter(|_| self.is_open()) {
                if self.avoid_scroll {
                    tracing::trace!(target: targets::COMBOBOX, index, "scroll suppressed after hover");
                } else {
                    self.scroll_request = Some(ScrollRequest {
                        index,
                        element_id: self.ids.item(index),
                    });
                }
            }
        }
    }

    /// Take the pending scroll-into-view request.
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.scroll_request.take()
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Run expired timers. Returns how many fired.
    pub fn process_timers(&mut self) -> usize {
        let fired = self.timers.process_expired();
        for &id in &fired {
            if self.status.claim(id) {
                self.announce_status();
            } else if self.scroll_guard.claim(id) {
                self.avoid_scroll = false;
            }
        }
        fired.len()
    }

    /// Time until the next timer is due.
    pub fn time_until_next_timer(&mut self) -> Option<Duration> {
        self.timers.time_until_next()
    }

    fn announce_status(&mut self) {
        let result_count = self.item_count();
        let message = {
            let ctx = StatusContext {
                is_open: self.is_open(),
                highlighted_item: self.highlighted_index().and_then(|index| self.item(index)),
                selected_item: self.selected_item(),
                result_count,
                previous_result_count: self.status.previous_result_count(),
                item_to_string: &*self.config.item_to_string,
            };
            (self.config.status_message)(&ctx)
        };
        if let Some(message) = self.status.publish(message, result_count) {
            self.status_changed.emit(message);
        }
    }
}

impl<T> Combobox<T> {
    /// Cancel pending timers and stop accepting updates.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.status.cancel(&mut self.timers);
        self.scroll_guard.cancel(&mut self.timers);
        self.timers.stop_all();
        tracing::debug!(target: targets::COMBOBOX, id = %self.ids.root, "combobox unmounted");
    }
}

impl<T> Drop for Combobox<T> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Combobox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Combobox")
            .field("id", &self.ids.root)
            .field("highlighted_index", &self.highlighted_index)
            .field("is_open", &self.is_open)
            .field("input_value", &self.input_value)
            .field("selected_item", &self.selected_item)
            .field("items", &self.items.len())
            .field("mounted", &self.mounted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use horizon_geocomplete_core::ManualClock;
    use parking_lot::Mutex;

    use super::*;

    fn cities() -> Vec<String> {
        ["Berlin", "Bern", "Bergen", "Bergamo", "Berkeley", "Bermuda", "Berchtesgaden"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn render(combobox: &mut Combobox<String>, items: &[String]) {
        combobox.begin_render();
        for item in items {
            combobox.item_props(ItemArgs::new(item.clone())).unwrap();
        }
        combobox.end_render(RootElement::Plain).unwrap();
    }

    fn combobox() -> (Combobox<String>, ManualClock) {
        let clock = ManualClock::new();
        let combobox = Combobox::with_clock(
            ComboboxConfig::default().with_id("geo"),
            Arc::new(clock.clone()),
        );
        (combobox, clock)
    }

    #[test]
    fn test_arrow_down_opens_on_default_index() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());

        let outcome = combobox.dispatch(ComboboxEvent::shift_key(Key::ArrowDown), None);
        assert!(outcome.handled);
        assert!(combobox.is_open());
        assert_eq!(combobox.highlighted_index(), None);
    }

    #[test]
    fn test_highlight_wraps_both_ways() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities()[..3]);
        combobox.open_menu();

        combobox.dispatch(ComboboxEvent::key(Key::ArrowUp), None);
        assert_eq!(combobox.highlighted_index(), Some(2));
        combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), None);
        assert_eq!(combobox.highlighted_index(), Some(0));
        combobox.dispatch(ComboboxEvent::key(Key::ArrowUp), None);
        assert_eq!(combobox.highlighted_index(), Some(2));
    }

    #[test]
    fn test_shift_moves_by_five() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());
        combobox.open_menu();

        combobox.dispatch(ComboboxEvent::shift_key(Key::ArrowDown), None);
        assert_eq!(combobox.highlighted_index(), Some(4));
        combobox.dispatch(ComboboxEvent::shift_key(Key::ArrowDown), None);
        assert_eq!(combobox.highlighted_index(), Some(0));
        combobox.dispatch(ComboboxEvent::shift_key(Key::ArrowUp), None);
        assert_eq!(combobox.highlighted_index(), Some(6));
    }

    #[test]
    fn test_move_with_no_items_is_noop() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &[]);
        combobox.open_menu();

        let emitted = Arc::new(Mutex::new(0));
        let count = emitted.clone();
        combobox.state_changed.connect(move |_| *count.lock() += 1);

        combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), None);
        assert_eq!(combobox.highlighted_index(), None);
        assert_eq!(*emitted.lock(), 0);
    }

    #[test]
    fn test_enter_selects_highlighted_item() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());
        combobox.open_menu();
        combobox.set_highlighted_index(Some(1));

        let outcome = combobox.dispatch(ComboboxEvent::key(Key::Enter), None);
        assert!(outcome.handled);
        assert!(!combobox.is_open());
        assert_eq!(combobox.selected_item().map(String::as_str), Some("Bern"));
        assert_eq!(combobox.input_value(), "Bern");
        assert_eq!(combobox.highlighted_index(), None);
    }

    #[test]
    fn test_enter_when_closed_is_not_handled() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());
        let outcome = combobox.dispatch(ComboboxEvent::key(Key::Enter), None);
        assert!(!outcome.handled);
        assert!(combobox.selected_item().is_none());
    }

    #[test]
    fn test_escape_restores_selection_text() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());
        combobox.select_item("Bergen".to_string());
        combobox.dispatch(ComboboxEvent::change("Berk"), None);
        assert!(combobox.is_open());

        combobox.dispatch(ComboboxEvent::key(Key::Escape), None);
        assert!(!combobox.is_open());
        assert_eq!(combobox.input_value(), "Bergen");
    }

    #[test]
    fn test_blur_respects_pointer_held() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());
        combobox.dispatch(ComboboxEvent::change("Ber"), None);

        combobox.dispatch(ComboboxEvent::PointerDown, None);
        combobox.dispatch(ComboboxEvent::InputBlur, None);
        assert!(combobox.is_open());
        assert_eq!(combobox.input_value(), "Ber");

        combobox.dispatch(ComboboxEvent::PointerUp { inside_root: true }, None);
        combobox.dispatch(ComboboxEvent::InputBlur, None);
        assert!(!combobox.is_open());
        assert_eq!(combobox.input_value(), "");
    }

    #[test]
    fn test_outer_click_resets_and_notifies() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());
        combobox.dispatch(ComboboxEvent::change("Ber"), None);

        let clicks = Arc::new(Mutex::new(0));
        let counter = clicks.clone();
        combobox.outer_click.connect(move |_| *counter.lock() += 1);

        combobox.dispatch(ComboboxEvent::PointerDown, None);
        combobox.dispatch(ComboboxEvent::PointerUp { inside_root: false }, None);
        assert!(!combobox.is_open());
        assert_eq!(combobox.input_value(), "");
        assert_eq!(*clicks.lock(), 1);

        // Closed menus ignore outside clicks.
        combobox.dispatch(ComboboxEvent::PointerDown, None);
        combobox.dispatch(ComboboxEvent::PointerUp { inside_root: false }, None);
        assert_eq!(*clicks.lock(), 1);
    }

    #[test]
    fn test_toggle_button() {
        let mut combobox = Combobox::new(
            ComboboxConfig::<String>::default().with_default_highlighted_index(Some(0)),
        );
        render(&mut combobox, &cities());

        combobox.dispatch(ComboboxEvent::ButtonClick, None);
        assert!(combobox.is_open());
        assert_eq!(combobox.highlighted_index(), Some(0));
        assert_eq!(combobox.button_props().label(), "close menu");

        combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), None);
        combobox.dispatch(ComboboxEvent::ButtonKeyDown { key: Key::Enter }, None);
        assert!(!combobox.is_open());
        assert_eq!(combobox.highlighted_index(), Some(1));
    }

    #[test]
    fn test_focus_opens_only_with_text() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());

        assert!(!combobox.dispatch(ComboboxEvent::InputFocus, None).handled);
        assert!(!combobox.is_open());

        combobox.set_state(StateChange::new(ChangeKind::Unknown).with_input_value("Be"));
        assert!(combobox.dispatch(ComboboxEvent::InputFocus, None).handled);
        assert!(combobox.is_open());
    }

    #[test]
    fn test_item_click_and_hover() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());
        combobox.open_menu();

        combobox.dispatch(ComboboxEvent::ItemMouseEnter { index: 3 }, None);
        assert_eq!(combobox.highlighted_index(), Some(3));

        combobox.dispatch(ComboboxEvent::ItemClick { index: 2 }, None);
        assert_eq!(combobox.input_value(), "Bergen");
        assert!(!combobox.is_open());

        assert!(!combobox.dispatch(ComboboxEvent::ItemClick { index: 99 }, None).handled);
    }

    #[test]
    fn test_highlight_past_last_item_is_ignored() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities()[..4]);
        combobox.open_menu();
        combobox.dispatch(ComboboxEvent::ItemMouseEnter { index: 1 }, None);

        let outcome = combobox.dispatch(ComboboxEvent::ItemMouseEnter { index: 9 }, None);
        assert!(!outcome.handled);
        assert_eq!(combobox.highlighted_index(), Some(1));
        assert_eq!(combobox.take_scroll_request(), None);

        assert!(!combobox.set_highlighted_index(Some(4)));
        assert_eq!(combobox.highlighted_index(), Some(1));
        assert_eq!(combobox.input_props().active_descendant.as_deref(), Some("geo-item-1"));

        assert!(combobox.set_highlighted_index(Some(3)));
        assert!(combobox.set_highlighted_index(None));
        assert_eq!(combobox.highlighted_index(), None);
    }

    #[test]
    fn test_caller_can_prevent_default_handling() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());

        let mut seen = Vec::new();
        let mut handler = |event: &ComboboxEvent, ctx: &mut EventContext| {
            seen.push(event.clone());
            ctx.prevent_default_handling();
        };
        let outcome = combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), Some(&mut handler));
        assert!(outcome.default_prevented);
        assert!(!combobox.is_open());
        assert_eq!(seen, vec![ComboboxEvent::key(Key::ArrowDown)]);

        let mut passthrough = |_: &ComboboxEvent, _: &mut EventContext| {};
        combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), Some(&mut passthrough));
        assert!(combobox.is_open());
    }

    #[test]
    fn test_notification_order() {
        let (mut combobox, _) = combobox();
        let log = Arc::new(Mutex::new(Vec::<String>::new()));

        let l = log.clone();
        combobox
            .input_value_changed
            .connect(move |value| l.lock().push(format!("input:{value}")));
        let l = log.clone();
        combobox
            .state_changed
            .connect(move |change| l.lock().push(format!("state:{:?}", change.keys())));
        let l = log.clone();
        combobox
            .selected
            .connect(move |item| l.lock().push(format!("selected:{item:?}")));
        let l = log.clone();
        combobox
            .changed
            .connect(move |item| l.lock().push(format!("changed:{item:?}")));

        let complete = log.clone();
        combobox.set_state_with(
            StateChange::new(ChangeKind::Unknown)
                .with_selected_item(Some("Bern".to_string()))
                .with_input_value("Bern"),
            move |state| complete.lock().push(format!("complete:{}", state.input_value)),
        );

        assert_eq!(
            *log.lock(),
            vec![
                "input:Bern".to_string(),
                "complete:Bern".to_string(),
                "state:[InputValue, SelectedItem]".to_string(),
                "selected:Some(\"Bern\")".to_string(),
                "changed:Some(\"Bern\")".to_string(),
            ]
        );

        // Re-selecting the same item notifies `selected` but not `changed`.
        log.lock().clear();
        combobox.select_item("Bern".to_string());
        let entries = log.lock().clone();
        assert!(entries.contains(&"selected:Some(\"Bern\")".to_string()));
        assert!(!entries.iter().any(|e| e.starts_with("changed:")));
        assert!(!entries.iter().any(|e| e.starts_with("state:")));
    }

    #[test]
    fn test_compute_update_reports_input_after_resolution() {
        let (mut combobox, _) = combobox();
        let values = Arc::new(Mutex::new(Vec::new()));
        let v = values.clone();
        combobox
            .input_value_changed
            .connect(move |value| v.lock().push(value.clone()));

        combobox.set_state(StateUpdate::compute(|state: &ComboboxState<String>| {
            StateChange::new(ChangeKind::Unknown).with_input_value(format!("{}!", state.input_value))
        }));
        assert_eq!(*values.lock(), vec!["!".to_string()]);
        assert_eq!(combobox.input_value(), "!");
    }

    #[test]
    fn test_controlled_field_is_reported_not_stored() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());
        combobox.control_input_value("from caller");

        let reported = Arc::new(Mutex::new(None));
        let r = reported.clone();
        combobox
            .state_changed
            .connect(move |change| *r.lock() = change.input_value.clone());

        combobox.dispatch(ComboboxEvent::change("typed"), None);
        assert_eq!(combobox.input_value(), "from caller");
        assert_eq!(reported.lock().as_deref(), Some("typed"));
        assert!(combobox.is_open());
        assert!(combobox.is_controlled(StateKey::InputValue));

        combobox.release_input_value();
        combobox.dispatch(ComboboxEvent::change("typed"), None);
        assert_eq!(combobox.input_value(), "typed");
    }

    #[test]
    fn test_state_reducer_rewrites_updates() {
        let config = ComboboxConfig::<String>::default().with_state_reducer(|_, change| {
            // Keep the menu open after selection.
            if change.kind == ChangeKind::ClickItem {
                change.with_is_open(true)
            } else {
                change
            }
        });
        let mut combobox = Combobox::new(config);
        render(&mut combobox, &cities());
        combobox.open_menu();

        combobox.dispatch(ComboboxEvent::ItemClick { index: 0 }, None);
        assert!(combobox.is_open());
        assert_eq!(combobox.input_value(), "Berlin");
    }

    #[test]
    fn test_item_props_requires_item() {
        let (mut combobox, _) = combobox();
        combobox.begin_render();
        let err = combobox.item_props(ItemArgs::default()).unwrap_err();
        assert_eq!(
            err,
            ComboboxError::MissingParameter {
                parameter: "item",
                call_site: "item_props"
            }
        );
    }

    #[test]
    fn test_item_props_explicit_indices() {
        let (mut combobox, _) = combobox();
        combobox.begin_render();
        let props = combobox
            .item_props(ItemArgs::new("Bern".to_string()).at_index(2))
            .unwrap();
        assert_eq!(props.id, "geo-item-2");
        assert_eq!(combobox.item_count(), 3);
        assert!(combobox.item(0).is_none());
        assert_eq!(combobox.item(2).map(String::as_str), Some("Bern"));
    }

    #[test]
    fn test_item_count_priority() {
        let mut fixed =
            Combobox::new(ComboboxConfig::<String>::default().with_item_count(Some(10)));
        render(&mut fixed, &cities()[..2]);
        assert_eq!(fixed.item_count(), 10);

        fixed.set_item_count(4);
        assert_eq!(fixed.item_count(), 4);

        fixed.unset_item_count();
        assert_eq!(fixed.item_count(), 10);

        let (mut plain, _) = combobox();
        render(&mut plain, &cities()[..2]);
        assert_eq!(plain.item_count(), 2);
    }

    #[test]
    fn test_composite_root_requires_root_props() {
        let (mut combobox, _) = combobox();
        combobox.begin_render();
        assert_eq!(
            combobox.end_render(RootElement::Composite),
            Err(ComboboxError::RootPropsNotApplied)
        );

        combobox.begin_render();
        combobox.root_props("");
        assert!(combobox.end_render(RootElement::Composite).is_err());

        combobox.begin_render();
        let root = combobox.root_props("innerRef");
        assert_eq!(root.ref_key, "innerRef");
        assert!(combobox.end_render(RootElement::Composite).is_ok());
    }

    #[test]
    fn test_input_props_active_descendant() {
        let (mut combobox, _) = combobox();
        render(&mut combobox, &cities());
        combobox.set_highlighted_index(Some(2));
        assert_eq!(combobox.input_props().active_descendant, None);

        combobox.open_menu();
        let props = combobox.input_props();
        assert_eq!(props.active_descendant.as_deref(), Some("geo-item-2"));
        assert!(props.attributes().contains(&("aria-expanded", "true".to_string())));
    }

    #[test]
    fn test_status_announced_after_debounce() {
        let (mut combobox, clock) = combobox();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let m = messages.clone();
        combobox.status_changed.connect(move |msg| m.lock().push(msg.clone()));

        combobox.dispatch(ComboboxEvent::change("Ber"), None);
        render(&mut combobox, &cities()[..3]);

        clock.advance(Duration::from_millis(199));
        combobox.process_timers();
        assert!(messages.lock().is_empty());

        clock.advance(Duration::from_millis(1));
        combobox.process_timers();
        assert_eq!(
            *messages.lock(),
            vec!["3 results are available, use up and down arrow keys to navigate.".to_string()]
        );

        combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), None);
        render(&mut combobox, &cities()[..3]);
        clock.advance(Duration::from_millis(200));
        combobox.process_timers();
        assert_eq!(messages.lock().last().map(String::as_str), Some("Berlin"));
        assert_eq!(combobox.status_props().message, "Berlin");
    }

    #[test]
    fn test_hover_suppresses_scroll_request() {
        let (mut combobox, clock) = combobox();
        render(&mut combobox, &cities());
        combobox.open_menu();

        combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), None);
        render(&mut combobox, &cities());
        assert_eq!(
            combobox.take_scroll_request(),
            Some(ScrollRequest {
                index: 0,
                element_id: "geo-item-0".to_string()
            })
        );

        combobox.dispatch(ComboboxEvent::ItemMouseEnter { index: 4 }, None);
        render(&mut combobox, &cities());
        assert_eq!(combobox.take_scroll_request(), None);

        clock.advance(Duration::from_millis(250));
        combobox.process_timers();
        combobox.dispatch(ComboboxEvent::key(Key::ArrowDown), None);
        render(&mut combobox, &cities());
        assert_eq!(combobox.take_scroll_request().map(|r| r.index), Some(5));
    }

    #[test]
    fn test_unmount_cancels_timers_and_ignores_updates() {
        let (mut combobox, clock) = combobox();
        combobox.dispatch(ComboboxEvent::change("Ber"), None);
        render(&mut combobox, &cities());
        assert!(combobox.time_until_next_timer().is_some());

        combobox.unmount();
        assert!(combobox.time_until_next_timer().is_none());

        clock.advance(Duration::from_secs(1));
        assert_eq!(combobox.process_timers(), 0);

        combobox.open_menu();
        combobox.dispatch(ComboboxEvent::key(Key::Escape), None);
        assert!(combobox.is_open());
        assert_eq!(combobox.input_value(), "Ber");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Combobox::new(ComboboxConfig::<String>::default());
        let b = Combobox::new(ComboboxConfig::<String>::default());
        assert_ne!(a.id(), b.id());
        assert!(a.id().starts_with("geocomplete-"));
    }
}
