//! Display synchronisation: one declarative registry of page targets and a
//! single routine that brings all of them in line with a location.
//!
//! Selectors follow the page's own conventions: `#id` addresses one element,
//! `.class` addresses every element carrying that class.  A selector that
//! matches nothing is normal (not every page variant renders every slot) and
//! is skipped without complaint.

mod page;

pub use page::{PageError, PageSurface};

use chrono::{DateTime, TimeZone};
use locsync_proto::catalog::Location;
use locsync_proto::hours;
use tracing::trace;

use crate::selection::SelectionListener;

pub const HOURS_GRID_DAY: &str = ".hours-day";
pub const HOURS_GRID_TIME: &str = ".hours-time";

/// Placeholder substituted with the location id in group patterns.
pub const ID_PLACEHOLDER: &str = "{id}";

/// The render-target capability the host page provides.
pub trait RenderSurface {
    /// Write text into every element matching `selector`; returns how many
    /// elements were written.
    fn set_text(&mut self, selector: &str, text: &str) -> usize;

    /// Write an attribute on every element matching `selector`.
    fn set_attribute(&mut self, selector: &str, name: &str, value: &str) -> usize;

    /// Identities of the elements matching `selector`, in page order.  An
    /// element's identity is its `data-location` key when it has one,
    /// otherwise its id.
    fn members(&self, selector: &str) -> Vec<String>;

    /// Show or hide every element in group `selector` whose identity is
    /// `member`; several pickers sharing one class each carry a copy of the
    /// same identity.  Returns whether any element matched.
    fn set_visible(&mut self, selector: &str, member: &str, visible: bool) -> bool;

    /// Set or clear the active marker on every element in group `selector`
    /// whose identity is `member`.  Returns whether any element matched.
    fn set_active(&mut self, selector: &str, member: &str, active: bool) -> bool;
}

/// Which location attribute a text slot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Name,
    Phone,
    Address,
    /// Opening window, e.g. "12:00 - 21:00".
    Hours,
}

/// Derived attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue {
    /// `tel:` + phone
    TelLink,
    MapUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayTarget {
    SetText {
        selector: String,
        field: TextField,
    },
    SetAttribute {
        selector: String,
        attribute: String,
        value: AttrValue,
    },
    /// Show exactly the member whose identity is `pattern` with the id
    /// substituted; hide the rest of the group.
    ToggleVisibility { selector: String, pattern: String },
    /// Mark exactly the matching member active; clear the rest.
    ToggleClass { selector: String, pattern: String },
}

impl DisplayTarget {
    pub fn text(selector: &str, field: TextField) -> Self {
        Self::SetText {
            selector: selector.to_string(),
            field,
        }
    }

    pub fn attribute(selector: &str, attribute: &str, value: AttrValue) -> Self {
        Self::SetAttribute {
            selector: selector.to_string(),
            attribute: attribute.to_string(),
            value,
        }
    }

    pub fn visibility(selector: &str, pattern: &str) -> Self {
        Self::ToggleVisibility {
            selector: selector.to_string(),
            pattern: pattern.to_string(),
        }
    }

    pub fn class(selector: &str, pattern: &str) -> Self {
        Self::ToggleClass {
            selector: selector.to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// Location selector instances (dropdown entries, buttons, footer list)
    /// keyed directly by location id.
    pub fn selector_group(selector: &str) -> Self {
        Self::class(selector, ID_PLACEHOLDER)
    }

    pub fn selector(&self) -> &str {
        match self {
            Self::SetText { selector, .. }
            | Self::SetAttribute { selector, .. }
            | Self::ToggleVisibility { selector, .. }
            | Self::ToggleClass { selector, .. } => selector,
        }
    }
}

/// Target declarations, registered once.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<DisplayTarget>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target.  Registering the same target twice is refused so that
    /// re-running setup cannot double-bind.
    pub fn register(&mut self, target: DisplayTarget) -> bool {
        if self.targets.contains(&target) {
            trace!("target {:?} already registered", target);
            return false;
        }
        self.targets.push(target);
        true
    }

    pub fn targets(&self) -> &[DisplayTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Every slot the full site renders.
    pub fn standard() -> Self {
        use AttrValue::*;
        use TextField::*;

        let mut registry = Self::new();
        let targets = [
            // Location name
            DisplayTarget::text("#current-location-text", Name),
            DisplayTarget::text("#header-location-text", Name),
            DisplayTarget::text("#mobile-location-text", Name),
            DisplayTarget::text("#hero-location-text", Name),
            DisplayTarget::text("#about-location-text", Name),
            DisplayTarget::text("#footer-location-text", Name),
            DisplayTarget::text("#banner-location-text", Name),
            DisplayTarget::text(".location-text", Name),
            // Phone numbers
            DisplayTarget::text("#hero-phone-number", Phone),
            DisplayTarget::text("#cta-phone-number", Phone),
            DisplayTarget::text("#cta-section-phone-number", Phone),
            DisplayTarget::text(".phone-number-text", Phone),
            // Phone links
            DisplayTarget::attribute("#hero-phone-link", "href", TelLink),
            DisplayTarget::attribute("#order-phone-link", "href", TelLink),
            DisplayTarget::attribute("#cta-phone-link", "href", TelLink),
            DisplayTarget::attribute("#cta-section-phone-link", "href", TelLink),
            DisplayTarget::attribute("#mobile-phone-link", "href", TelLink),
            DisplayTarget::attribute("#mobile-menu-phone", "href", TelLink),
            // Address, route, hours
            DisplayTarget::text("#address-text", Address),
            DisplayTarget::attribute("#map-link", "href", MapUrl),
            DisplayTarget::text("#hours-window", Hours),
            // Per-branch blocks
            DisplayTarget::visibility(".branch-details", "{id}-details"),
            DisplayTarget::class(".location-specific-content", "{id}-about"),
            DisplayTarget::class(".location-specific-address", "{id}-address"),
            DisplayTarget::class(".location-specific-phone", "{id}-phone"),
            DisplayTarget::class(".location-specific-map", "{id}-map"),
            DisplayTarget::class(".location-specific-footer-address", "{id}-footer-address"),
            DisplayTarget::class(".location-specific-footer-phone", "{id}-footer-phone"),
            // Location pickers
            DisplayTarget::selector_group(".location-item"),
            DisplayTarget::selector_group(".mobile-location-btn"),
            DisplayTarget::selector_group(".footer-location-item"),
        ];
        for target in targets {
            registry.register(target);
        }
        registry
    }
}

fn expand(pattern: &str, id: &str) -> String {
    pattern.replace(ID_PLACEHOLDER, id)
}

fn text_for(location: &Location, field: TextField) -> String {
    match field {
        TextField::Name => location.name.clone(),
        TextField::Phone => location.phone.clone(),
        TextField::Address => location.address.clone(),
        TextField::Hours => location.hours.window_label(),
    }
}

fn attribute_for(location: &Location, value: AttrValue) -> String {
    match value {
        AttrValue::TelLink => location.tel_link(),
        AttrValue::MapUrl => location.map_url.clone(),
    }
}

/// Applies the registry to a surface.  Stateless apart from what it owns;
/// applying the same location twice leaves the surface unchanged.
pub struct DisplaySynchronizer<S: RenderSurface> {
    registry: TargetRegistry,
    surface: S,
}

impl<S: RenderSurface> DisplaySynchronizer<S> {
    pub fn new(registry: TargetRegistry, surface: S) -> Self {
        Self { registry, surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn apply(&mut self, location: &Location) {
        for target in self.registry.targets() {
            match target {
                DisplayTarget::SetText { selector, field } => {
                    let text = text_for(location, *field);
                    if self.surface.set_text(selector, &text) == 0 {
                        trace!("skip {}: not on this page", selector);
                    }
                }
                DisplayTarget::SetAttribute {
                    selector,
                    attribute,
                    value,
                } => {
                    let value = attribute_for(location, *value);
                    if self.surface.set_attribute(selector, attribute, &value) == 0 {
                        trace!("skip {}: not on this page", selector);
                    }
                }
                DisplayTarget::ToggleVisibility { selector, pattern } => {
                    let wanted = expand(pattern, &location.id);
                    for member in self.surface.members(selector) {
                        let show = member == wanted;
                        self.surface.set_visible(selector, &member, show);
                    }
                }
                DisplayTarget::ToggleClass { selector, pattern } => {
                    let wanted = expand(pattern, &location.id);
                    for member in self.surface.members(selector) {
                        let active = member == wanted;
                        self.surface.set_active(selector, &member, active);
                    }
                }
            }
        }
    }

    /// "Open now" / "Closed now" plus today's line for `location`, and
    /// today's row marked in the weekly hours grid.
    pub fn render_open_status<Tz: TimeZone>(&mut self, location: &Location, now: &DateTime<Tz>) {
        let status = location.hours.status_at(now);
        self.surface.set_text("#status-text", status.label());
        self.surface
            .set_text(".opening-hours", &location.hours.today_line(now));
        self.highlight_today(hours::grid_row(now));
    }

    /// Grid rows are positional: day labels and times pair up by index.
    fn highlight_today(&mut self, row: usize) {
        let days = self.surface.members(HOURS_GRID_DAY);
        let times = self.surface.members(HOURS_GRID_TIME);
        if days.len() != times.len() {
            trace!(
                "hours grid has {} days and {} times, not highlighting",
                days.len(),
                times.len()
            );
            return;
        }
        for (selector, members) in [(HOURS_GRID_DAY, days), (HOURS_GRID_TIME, times)] {
            for (index, member) in members.iter().enumerate() {
                self.surface.set_active(selector, member, index == row);
            }
        }
    }
}

impl<S: RenderSurface> SelectionListener for DisplaySynchronizer<S> {
    fn selection_changed(&mut self, location: &Location) {
        self.apply(location);
    }
}
