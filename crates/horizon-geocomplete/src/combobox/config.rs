//! Combobox configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::state::{ComboboxState, StateChange};
use crate::status::{DEFAULT_STATUS_DEBOUNCE, StatusContext, default_status_message};

/// How long hover-driven highlighting suppresses scroll-into-view.
pub const DEFAULT_SCROLL_SUPPRESSION: Duration = Duration::from_millis(250);

pub(crate) type ItemToString<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
pub(crate) type StatusFormatter<T> = Arc<dyn Fn(&StatusContext<'_, T>) -> String + Send + Sync>;
pub(crate) type StateReducer<T> =
    Arc<dyn Fn(&ComboboxState<T>, StateChange<T>) -> StateChange<T> + Send + Sync>;

/// Options a combobox is created with.
///
/// ```
/// use horizon_geocomplete::combobox::ComboboxConfig;
///
/// let config = ComboboxConfig::<String>::default()
///     .with_id("city")
///     .with_default_highlighted_index(Some(0))
///     .with_default_input_value("Ber");
/// assert_eq!(config.id.as_deref(), Some("city"));
/// ```
pub struct ComboboxConfig<T> {
    /// Element id prefix. Generated when `None`.
    pub id: Option<String>,
    /// Highlighted index used at mount and after select/reset.
    pub default_highlighted_index: Option<usize>,
    /// Selected item at mount.
    pub default_selected_item: Option<T>,
    /// Input text at mount.
    pub default_input_value: String,
    /// Open state at mount.
    pub default_is_open: bool,
    /// Fixed item count, taking priority over registered items.
    pub item_count: Option<usize>,
    /// Coalescing window of status announcements.
    pub status_debounce: Duration,
    /// How long hover highlighting suppresses scroll requests.
    pub scroll_suppression: Duration,
    pub(crate) item_to_string: ItemToString<T>,
    pub(crate) status_message: StatusFormatter<T>,
    pub(crate) state_reducer: Option<StateReducer<T>>,
}

impl<T: 'static> ComboboxConfig<T> {
    /// Create a configuration with the given item-to-string conversion.
    pub fn new<F>(item_to_string: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            id: None,
            default_highlighted_index: None,
            default_selected_item: None,
            default_input_value: String::new(),
            default_is_open: false,
            item_count: None,
            status_debounce: DEFAULT_STATUS_DEBOUNCE,
            scroll_suppression: DEFAULT_SCROLL_SUPPRESSION,
            item_to_string: Arc::new(item_to_string),
            status_message: Arc::new(|ctx: &StatusContext<'_, T>| default_status_message(ctx)),
            state_reducer: None,
        }
    }

    /// Set the element id prefix.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the default highlighted index.
    pub fn with_default_highlighted_index(mut self, index: Option<usize>) -> Self {
        self.default_highlighted_index = index;
        self
    }

    /// Set the initially selected item.
    pub fn with_default_selected_item(mut self, item: Option<T>) -> Self {
        self.default_selected_item = item;
        self
    }

    /// Set the initial input text.
    pub fn with_default_input_value(mut self, value: impl Into<String>) -> Self {
        self.default_input_value = value.into();
        self
    }

    /// Set the initial open state.
    pub fn with_default_is_open(mut self, is_open: bool) -> Self {
        self.default_is_open = is_open;
        self
    }

    /// Fix the item count.
    pub fn with_item_count(mut self, count: Option<usize>) -> Self {
        self.item_count = count;
        self
    }

    /// Set the status announcement window.
    pub fn with_status_debounce(mut self, window: Duration) -> Self {
        self.status_debounce = window;
        self
    }

    /// Set the hover scroll-suppression window.
    pub fn with_scroll_suppression(mut self, window: Duration) -> Self {
        self.scroll_suppression = window;
        self
    }

    /// Replace the item-to-string conversion.
    pub fn with_item_to_string<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.item_to_string = Arc::new(f);
        self
    }

    /// Replace the status message formatter.
    pub fn with_status_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&StatusContext<'_, T>) -> String + Send + Sync + 'static,
    {
        self.status_message = Arc::new(f);
        self
    }

    /// Install a reducer that may rewrite every update before it is applied.
    pub fn with_state_reducer<F>(mut self, f: F) -> Self
    where
        F: Fn(&ComboboxState<T>, StateChange<T>) -> StateChange<T> + Send + Sync + 'static,
    {
        self.state_reducer = Some(Arc::new(f));
        self
    }

    /// Convert an item with the configured conversion.
    pub fn item_to_string(&self, item: &T) -> String {
        (self.item_to_string)(item)
    }

    /// Convert an optional item; `None` becomes the empty string.
    pub fn optional_item_to_string(&self, item: Option<&T>) -> String {
        item.map(|item| self.item_to_string(item)).unwrap_or_default()
    }
}

impl<T: fmt::Display + 'static> Default for ComboboxConfig<T> {
    fn default() -> Self {
        Self::new(|item: &T| item.to_string())
    }
}

impl<T: Clone> Clone for ComboboxConfig<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            default_highlighted_index: self.default_highlighted_index,
            default_selected_item: self.default_selected_item.clone(),
            default_input_value: self.default_input_value.clone(),
            default_is_open: self.default_is_open,
            item_count: self.item_count,
            status_debounce: self.status_debounce,
            scroll_suppression: self.scroll_suppression,
            item_to_string: self.item_to_string.clone(),
            status_message: self.status_message.clone(),
            state_reducer: self.state_reducer.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ComboboxConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComboboxConfig")
            .field("id", &self.id)
            .field("default_highlighted_index", &self.default_highlighted_index)
            .field("default_selected_item", &self.default_selected_item)
            .field("default_input_value", &self.default_input_value)
            .field("default_is_open", &self.default_is_open)
            .field("item_count", &self.item_count)
            .field("status_debounce", &self.status_debounce)
            .field("scroll_suppression", &self.scroll_suppression)
            .field("state_reducer", &self.state_reducer.is_some())
            .finish()
    }
}
