//! Combobox state, field ownership and state changes.

use std::fmt;

/// The resolved state of a combobox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComboboxState<T> {
    /// Highlighted item index.
    pub highlighted_index: Option<usize>,
    /// Whether the menu is open.
    pub is_open: bool,
    /// Text in the input.
    pub input_value: String,
    /// The selected item.
    pub selected_item: Option<T>,
}

impl<T> Default for ComboboxState<T> {
    fn default() -> Self {
        Self {
            highlighted_index: None,
            is_open: false,
            input_value: String::new(),
            selected_item: None,
        }
    }
}

/// Who owns a state field.
///
/// `Internal` values live in the combobox and are written by state updates.
/// `External` values are supplied by the embedding caller; updates that target
/// them are reported through `state_changed` but never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field<V> {
    /// Owned by the combobox.
    Internal(V),
    /// Supplied by the caller.
    External(V),
}

impl<V> Field<V> {
    /// The current value, whoever owns it.
    pub fn get(&self) -> &V {
        match self {
            Self::Internal(value) | Self::External(value) => value,
        }
    }

    /// Whether the caller owns this field.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }

    /// Write an update. Returns `false` (and leaves the value alone) for external fields.
    pub fn store(&mut self, value: V) -> bool {
        match self {
            Self::Internal(current) => {
                *current = value;
                true
            }
            Self::External(_) => false,
        }
    }

    /// Hand the field to the caller with the given value.
    pub fn control(&mut self, value: V) {
        *self = Self::External(value);
    }

    /// Take the field back, keeping the last caller-supplied value.
    pub fn release(&mut self)
    where
        V: Default,
    {
        if let Self::External(value) = self {
            let value = std::mem::take(value);
            *self = Self::Internal(value);
        }
    }
}

/// A state field, named.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// `highlighted_index`
    HighlightedIndex,
    /// `is_open`
    IsOpen,
    /// `input_value`
    InputValue,
    /// `selected_item`
    SelectedItem,
}

/// What caused a state change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// No specific cause.
    #[default]
    Unknown,
    /// Pointer released outside the root.
    MouseUp,
    /// Pointer entered an item.
    ItemMouseEnter,
    /// Up arrow in the input.
    KeyDownArrowUp,
    /// Down arrow in the input.
    KeyDownArrowDown,
    /// Escape in the input.
    KeyDownEscape,
    /// Enter in the input.
    KeyDownEnter,
    /// Item clicked.
    ClickItem,
    /// Input lost focus.
    BlurInput,
    /// Input gained focus.
    FocusInput,
    /// Input text edited.
    ChangeInput,
    /// Toggle button clicked.
    ClickButton,
    /// Enter on the toggle button.
    KeyDownEnterButton,
}

impl ChangeKind {
    /// A stable name for logs and tests.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::MouseUp => "mouse_up",
            Self::ItemMouseEnter => "item_mouse_enter",
            Self::KeyDownArrowUp => "key_down_arrow_up",
            Self::KeyDownArrowDown => "key_down_arrow_down",
            Self::KeyDownEscape => "key_down_escape",
            Self::KeyDownEnter => "key_down_enter",
            Self::ClickItem => "click_item",
            Self::BlurInput => "blur_input",
            Self::FocusInput => "focus_input",
            Self::ChangeInput => "change_input",
            Self::ClickButton => "click_button",
            Self::KeyDownEnterButton => "key_down_enter_button",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partial state update tagged with its cause.
///
/// Each `Some` field is a key present in the update. For the optional fields
/// the inner `Option` is the new value, so `Some(None)` clears it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateChange<T> {
    /// Cause of the change.
    pub kind: ChangeKind,
    /// New highlighted index.
    pub highlighted_index: Option<Option<usize>>,
    /// New open state.
    pub is_open: Option<bool>,
    /// New input text.
    pub input_value: Option<String>,
    /// New selected item.
    pub selected_item: Option<Option<T>>,
}

impl<T> Default for StateChange<T> {
    fn default() -> Self {
        Self::new(ChangeKind::Unknown)
    }
}

impl<T> StateChange<T> {
    /// An update with no keys.
    pub fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            highlighted_index: None,
            is_open: None,
            input_value: None,
            selected_item: None,
        }
    }

    /// Set the highlighted index.
    pub fn with_highlighted_index(mut self, index: Option<usize>) -> Self {
        self.highlighted_index = Some(index);
        self
    }

    /// Set the open state.
    pub fn with_is_open(mut self, is_open: bool) -> Self {
        self.is_open = Some(is_open);
        self
    }

    /// Set the input text.
    pub fn with_input_value(mut self, value: impl Into<String>) -> Self {
        self.input_value = Some(value.into());
        self
    }

    /// Set the selected item.
    pub fn with_selected_item(mut self, item: Option<T>) -> Self {
        self.selected_item = Some(item);
        self
    }

    /// Replace the cause.
    pub fn with_kind(mut self, kind: ChangeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether the update carries no keys besides its cause.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// The keys present in the update.
    pub fn keys(&self) -> Vec<StateKey> {
        let mut keys = Vec::new();
        if self.highlighted_index.is_some() {
            keys.push(StateKey::HighlightedIndex);
        }
        if self.is_open.is_some() {
            keys.push(StateKey::IsOpen);
        }
        if self.input_value.is_some() {
            keys.push(StateKey::InputValue);
        }
        if self.selected_item.is_some() {
            keys.push(StateKey::SelectedItem);
        }
        keys
    }

    /// Fill keys missing here from `other`; keys already present win.
    pub fn or(mut self, other: StateChange<T>) -> Self {
        self.highlighted_index = self.highlighted_index.or(other.highlighted_index);
        self.is_open = self.is_open.or(other.is_open);
        self.input_value = self.input_value.or(other.input_value);
        self.selected_item = self.selected_item.or(other.selected_item);
        self
    }
}

type ComputeFn<T> = Box<dyn FnOnce(&ComboboxState<T>) -> StateChange<T>>;

/// The argument to [`Combobox::set_state`](super::Combobox::set_state).
pub enum StateUpdate<T> {
    /// A change known up front.
    Partial(StateChange<T>),
    /// A change computed from the state at commit time.
    Compute(ComputeFn<T>),
}

impl<T> StateUpdate<T> {
    /// Wrap a state function.
    pub fn compute<F>(f: F) -> Self
    where
        F: FnOnce(&ComboboxState<T>) -> StateChange<T> + 'static,
    {
        Self::Compute(Box::new(f))
    }
}

impl<T> From<StateChange<T>> for StateUpdate<T> {
    fn from(change: StateChange<T>) -> Self {
        Self::Partial(change)
    }
}

impl<T> fmt::Debug for StateUpdate<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial(change) => f.debug_tuple("Partial").field(change).finish(),
            Self::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}
