//! The places autocomplete component.
//!
//! [`PlacesAutocomplete`] pairs a [`Combobox`] of [`Suggestion`]s with a
//! [`PredictionFetcher`]. Text edits schedule a fetch; every
//! [`render`](PlacesAutocomplete::render) registers the fetcher's latest
//! suggestions as menu items and returns everything the UI layer binds.
//!
//! ```ignore
//! let loader = service.init(settings.loader.clone(), host)?;
//! let mut widget = PlacesAutocomplete::mount(&loader, &settings, |maps| MapsPlaces::new(maps)).await?;
//!
//! widget.fetcher().results_changed().connect(move |_| request_redraw());
//!
//! widget.dispatch(ComboboxEvent::change("Berl"), None);
//! let view = widget.render()?;
//! for (suggestion, props) in &view.items {
//!     draw_item(&props.id, &suggestion.main_markup, &suggestion.secondary_markup);
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use horizon_geocomplete_core::Clock;
use horizon_geocomplete_net::loader::{ApiLoader, ScriptHost};
use horizon_geocomplete_net::places::{GeocodeRequest, GeocodeResult, PlacesApi, PlacesResponse};

use crate::combobox::{
    ButtonProps, Combobox, ComboboxConfig, ComboboxEvent, ComboboxState, DispatchOutcome,
    EventContext, InputProps, ItemArgs, ItemProps, LabelProps, MenuProps, RootElement,
    StatusProps,
};
use crate::error::{ComboboxError, Result};
use crate::fetcher::{FetchOptions, PredictionFetcher};
use crate::settings::GeocompleteSettings;
use crate::suggestion::Suggestion;

/// Everything the UI layer needs for one render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutocompleteView {
    /// The resolved combobox state.
    pub state: ComboboxState<Suggestion>,
    /// Label props.
    pub label: LabelProps,
    /// Input props.
    pub input: InputProps,
    /// Toggle button props.
    pub button: ButtonProps,
    /// Menu props.
    pub menu: MenuProps,
    /// Menu items with their props; empty while the menu is closed.
    pub items: Vec<(Suggestion, ItemProps)>,
    /// Status region props.
    pub status: StatusProps,
    /// Whether the last fetch failed.
    pub error: bool,
}

/// A places autocomplete input.
pub struct PlacesAutocomplete<P: PlacesApi> {
    combobox: Combobox<Suggestion>,
    fetcher: PredictionFetcher<P>,
}

impl<P: PlacesApi> PlacesAutocomplete<P> {
    /// Create a component over `api`.
    pub fn new(api: P, fetch: FetchOptions, config: ComboboxConfig<Suggestion>) -> Self {
        Self {
            combobox: Combobox::new(config),
            fetcher: PredictionFetcher::new(api, fetch),
        }
    }

    /// Create a component whose combobox timers run on `clock`.
    pub fn with_clock(
        api: P,
        fetch: FetchOptions,
        config: ComboboxConfig<Suggestion>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            combobox: Combobox::with_clock(config, clock),
            fetcher: PredictionFetcher::new(api, fetch),
        }
    }

    /// Create a component configured from settings.
    pub fn from_settings(api: P, settings: &GeocompleteSettings) -> Self {
        Self::new(api, settings.fetch_options(), settings.combobox_config())
    }

    /// Wait for the external API, then build the component on top of it.
    ///
    /// Every component mounted on the same loader shares one script load.
    pub async fn mount<H, F>(
        loader: &ApiLoader<H>,
        settings: &GeocompleteSettings,
        make_api: F,
    ) -> Result<Self>
    where
        H: ScriptHost,
        F: FnOnce(Arc<H::Global>) -> P,
    {
        let global = loader.load().await?;
        Ok(Self::from_settings(make_api(global), settings))
    }

    /// The combobox.
    pub fn combobox(&self) -> &Combobox<Suggestion> {
        &self.combobox
    }

    /// The combobox, mutably.
    pub fn combobox_mut(&mut self) -> &mut Combobox<Suggestion> {
        &mut self.combobox
    }

    /// The fetcher.
    pub fn fetcher(&self) -> &PredictionFetcher<P> {
        &self.fetcher
    }

    /// Route a user interaction. Text edits that reach the combobox also
    /// schedule a fetch.
    pub fn dispatch(
        &mut self,
        event: ComboboxEvent,
        caller: Option<&mut dyn FnMut(&ComboboxEvent, &mut EventContext)>,
    ) -> DispatchOutcome {
        let query = match &event {
            ComboboxEvent::InputChange { value } => Some(value.clone()),
            _ => None,
        };
        let outcome = self.combobox.dispatch(event, caller);
        if let Some(query) = query
            && outcome.handled
        {
            self.fetcher.fetch(&query);
        }
        outcome
    }

    /// Run a render pass.
    pub fn render(&mut self) -> std::result::Result<AutocompleteView, ComboboxError> {
        let fetched = self.fetcher.state();

        self.combobox.begin_render();
        let mut items = Vec::new();
        if self.combobox.is_open() {
            items.reserve(fetched.suggestions.len());
            for suggestion in fetched.suggestions {
                let props = self.combobox.item_props(ItemArgs::new(suggestion.clone()))?;
                items.push((suggestion, props));
            }
        }
        self.combobox.end_render(RootElement::Plain)?;

        Ok(AutocompleteView {
            state: self.combobox.state(),
            label: self.combobox.label_props(),
            input: self.combobox.input_props(),
            button: self.combobox.button_props(),
            menu: self.combobox.menu_props(),
            items,
            status: self.combobox.status_props(),
            error: fetched.error,
        })
    }

    /// Geocode the selected suggestion.
    ///
    /// Resolves to `None` when nothing is selected.
    pub fn resolve_selection(
        &self,
    ) -> impl Future<Output = Option<PlacesResponse<GeocodeResult>>> + Send + use<P> {
        let api = self.fetcher.api().clone();
        let place_id = self
            .combobox
            .selected_item()
            .map(|suggestion| suggestion.place_id.clone());
        async move {
            match place_id {
                Some(place_id) => Some(api.geocode(GeocodeRequest::new(place_id)).await),
                None => None,
            }
        }
    }

    /// Run expired combobox timers.
    pub fn process_timers(&mut self) -> usize {
        self.combobox.process_timers()
    }

    /// Time until the next combobox timer is due.
    pub fn time_until_next_timer(&mut self) -> Option<Duration> {
        self.combobox.time_until_next_timer()
    }

    /// Tear the component down.
    pub fn unmount(&mut self) {
        self.fetcher.unmount();
        self.combobox.unmount();
    }
}

impl<P: PlacesApi> std::fmt::Debug for PlacesAutocomplete<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesAutocomplete")
            .field("combobox", &self.combobox)
            .field("fetcher", &self.fetcher)
            .finish()
    }
}
