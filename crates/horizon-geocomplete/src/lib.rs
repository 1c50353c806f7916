//! Horizon Geocomplete: a headless places autocomplete.
//!
//! The crate holds the logic of an address/place autocomplete input without
//! rendering anything:
//!
//! - **Combobox**: a state machine for an input paired with a selectable list
//!   (highlight, open state, input text, selection), with typed prop records
//!   and an explicit event dispatcher. See [`combobox`].
//! - **Status announcer**: debounced screen-reader messages. See [`status`].
//! - **Prediction fetcher**: debounced queries against a [`PlacesApi`].
//! - **Suggestions**: predictions turned into escaped, emphasized markup.
//! - **Places autocomplete**: the pieces above wired together.
//! - **Settings**: TOML configuration for all of it.
//!
//! # Example
//!
//! ```
//! use horizon_geocomplete::combobox::{Combobox, ComboboxConfig, ComboboxEvent, Key};
//!
//! let mut combobox = Combobox::new(ComboboxConfig::<String>::default());
//! combobox.selected.connect(|item| println!("selected {item:?}"));
//!
//! combobox.dispatch(ComboboxEvent::change("Ber"), None);
//! assert!(combobox.is_open());
//!
//! combobox.dispatch(ComboboxEvent::key(Key::Escape), None);
//! assert!(!combobox.is_open());
//! assert_eq!(combobox.input_value(), "");
//! ```

mod autocomplete;
pub mod combobox;
mod error;
mod fetcher;
mod settings;
pub mod status;
mod suggestion;

pub use autocomplete::{AutocompleteView, PlacesAutocomplete};
pub use combobox::{
    ChangeKind, Combobox, ComboboxConfig, ComboboxEvent, ComboboxState, DispatchOutcome,
    EventContext, Key, RootElement, StateChange, StateUpdate,
};
pub use error::{ComboboxError, Error, Result, SettingsError};
pub use fetcher::{DEFAULT_FETCH_DEBOUNCE, FetchOptions, FetchState, PredictionFetcher};
pub use settings::{ComboboxSettings, FetchSettings, GeocompleteSettings};
pub use suggestion::{Suggestion, TextSegment, markup, segments};

pub use horizon_geocomplete_core::{Clock, ManualClock, Signal, SystemClock};
pub use horizon_geocomplete_net::{
    ApiLoader, LoadState, LoaderError, LoaderOptions, LoaderService, PlacesApi, ScriptHost,
};
