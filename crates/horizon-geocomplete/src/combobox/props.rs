//! Attribute records for the elements a combobox is rendered into.
//!
//! Each record is computed from the current state and exposes its attributes
//! as ordered `(name, value)` pairs for the UI layer to bind. Events on those
//! elements go back through [`Combobox::dispatch`](super::Combobox::dispatch).

/// Attribute name/value pairs in binding order.
pub type Attributes = Vec<(&'static str, String)>;

/// Element ids derived from a combobox id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementIds {
    /// Root id.
    pub root: String,
    /// Label element id.
    pub label: String,
    /// Input element id.
    pub input: String,
    /// Menu element id.
    pub menu: String,
    /// Status region id.
    pub status: String,
}

impl ElementIds {
    /// Derive element ids from a combobox id.
    pub fn new(id: &str) -> Self {
        Self {
            root: id.to_string(),
            label: format!("{id}-label"),
            input: format!("{id}-input"),
            menu: format!("{id}-menu"),
            status: format!("{id}-status"),
        }
    }

    /// Id of the item element at `index`.
    pub fn item(&self, index: usize) -> String {
        format!("{}-item-{}", self.root, index)
    }
}

/// Root element props.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootProps {
    /// Name under which the UI layer attaches its element reference.
    pub ref_key: String,
    /// Root id.
    pub id: String,
}

impl RootProps {
    /// Attributes for binding.
    pub fn attributes(&self) -> Attributes {
        vec![("data-combobox-root", self.id.clone())]
    }
}

/// Label element props.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelProps {
    /// Label id.
    pub id: String,
    /// Id of the input the label describes.
    pub html_for: String,
}

impl LabelProps {
    /// Attributes for binding.
    pub fn attributes(&self) -> Attributes {
        vec![("id", self.id.clone()), ("for", self.html_for.clone())]
    }
}

/// Text input props.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputProps {
    /// Input id.
    pub id: String,
    /// Current text.
    pub value: String,
    /// Whether the menu is open.
    pub expanded: bool,
    /// Id of the highlighted item while the menu is open.
    pub active_descendant: Option<String>,
    /// Id of the label.
    pub labelled_by: String,
}

impl InputProps {
    /// Attributes for binding.
    pub fn attributes(&self) -> Attributes {
        let mut attrs = vec![
            ("id", self.id.clone()),
            ("value", self.value.clone()),
            ("role", "combobox".to_string()),
            ("aria-autocomplete", "list".to_string()),
            ("aria-expanded", self.expanded.to_string()),
        ];
        if let Some(descendant) = &self.active_descendant {
            attrs.push(("aria-activedescendant", descendant.clone()));
        }
        attrs.push(("autocomplete", "off".to_string()));
        attrs.push(("aria-labelledby", self.labelled_by.clone()));
        attrs
    }
}

/// Toggle button props.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonProps {
    /// Whether the menu is open.
    pub expanded: bool,
}

impl ButtonProps {
    /// The accessible label for the current state.
    pub fn label(&self) -> &'static str {
        if self.expanded { "close menu" } else { "open menu" }
    }

    /// Attributes for binding.
    pub fn attributes(&self) -> Attributes {
        vec![
            ("role", "button".to_string()),
            ("aria-haspopup", "true".to_string()),
            ("aria-label", self.label().to_string()),
            ("data-toggle", "true".to_string()),
        ]
    }
}

/// Menu (listbox) props.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuProps {
    /// Menu id.
    pub id: String,
    /// Id of the label.
    pub labelled_by: String,
    /// Whether the menu is open.
    pub is_open: bool,
}

impl MenuProps {
    /// Attributes for binding.
    pub fn attributes(&self) -> Attributes {
        vec![
            ("id", self.id.clone()),
            ("role", "listbox".to_string()),
            ("aria-labelledby", self.labelled_by.clone()),
        ]
    }
}

/// List item props.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemProps {
    /// Item element id.
    pub id: String,
    /// Position in the menu.
    pub index: usize,
    /// Whether the item is highlighted.
    pub highlighted: bool,
}

impl ItemProps {
    /// Attributes for binding.
    pub fn attributes(&self) -> Attributes {
        vec![
            ("id", self.id.clone()),
            ("role", "option".to_string()),
            ("aria-selected", self.highlighted.to_string()),
        ]
    }
}

/// Live status region props.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusProps {
    /// Region id.
    pub id: String,
    /// The message to render inside the region.
    pub message: String,
}

impl StatusProps {
    /// Attributes for binding.
    pub fn attributes(&self) -> Attributes {
        vec![
            ("id", self.id.clone()),
            ("role", "status".to_string()),
            ("aria-live", "polite".to_string()),
            ("aria-relevant", "additions text".to_string()),
        ]
    }
}
