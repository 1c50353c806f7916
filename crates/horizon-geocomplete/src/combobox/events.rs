//! Events fed into the combobox by the embedding UI layer.

/// Keys the combobox reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Up arrow.
    ArrowUp,
    /// Down arrow.
    ArrowDown,
    /// Enter / Return.
    Enter,
    /// Escape.
    Escape,
    /// Any other key.
    Other,
}

/// A user interaction routed to one of the combobox elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComboboxEvent {
    /// Key pressed while the input has focus.
    InputKeyDown {
        /// The key.
        key: Key,
        /// Whether Shift was held.
        shift: bool,
    },
    /// The input text was edited.
    InputChange {
        /// The new text.
        value: String,
    },
    /// The input gained focus.
    InputFocus,
    /// The input lost focus.
    InputBlur,
    /// The toggle button was clicked.
    ButtonClick,
    /// Key pressed while the toggle button has focus.
    ButtonKeyDown {
        /// The key.
        key: Key,
    },
    /// The pointer entered an item.
    ItemMouseEnter {
        /// Item index.
        index: usize,
    },
    /// An item was clicked.
    ItemClick {
        /// Item index.
        index: usize,
    },
    /// A pointer button went down anywhere in the document.
    PointerDown,
    /// A pointer button was released anywhere in the document.
    PointerUp {
        /// Whether the release happened inside the root element.
        inside_root: bool,
    },
}

impl ComboboxEvent {
    /// Key press in the input without modifiers.
    pub fn key(key: Key) -> Self {
        Self::InputKeyDown { key, shift: false }
    }

    /// Key press in the input with Shift held.
    pub fn shift_key(key: Key) -> Self {
        Self::InputKeyDown { key, shift: true }
    }

    /// Text edit in the input.
    pub fn change(value: impl Into<String>) -> Self {
        Self::InputChange {
            value: value.into(),
        }
    }
}

/// Passed to a caller's handler before the combobox handles an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventContext {
    default_prevented: bool,
}

impl EventContext {
    /// Skip the combobox's own handling of this event.
    pub fn prevent_default_handling(&mut self) {
        self.default_prevented = true;
    }

    /// Whether the caller asked to skip default handling.
    pub fn is_default_handling_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Result of [`Combobox::dispatch`](super::Combobox::dispatch).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The caller's handler asked to skip default handling.
    pub default_prevented: bool,
    /// The combobox consumed the event; the host should suppress its native
    /// default action (cursor movement on arrows, form submit on Enter).
    pub handled: bool,
}
