//! PageSurface: in-memory page model implementing `RenderSurface`.
//!
//! Used by the stdin driver to publish page snapshots and by tests to check
//! what the synchroniser rendered.

use locsync_proto::catalog::LocationCatalog;
use locsync_proto::protocol::{ElementState, PageSnapshot};

use super::{DisplayTarget, RenderSurface, ID_PLACEHOLDER};

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("duplicate element id: {0}")]
    DuplicateId(String),
}

#[derive(Debug, Clone)]
struct Element {
    id: String,
    classes: Vec<String>,
    /// `data-location`
    key: Option<String>,
    state: ElementState,
}

impl Element {
    fn identity(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.id)
    }

    fn matches(&self, selector: &str) -> bool {
        if let Some(class) = selector.strip_prefix('.') {
            self.classes.iter().any(|c| c == class)
        } else {
            self.id == selector.strip_prefix('#').unwrap_or(selector)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageSurface {
    /// Page order.
    elements: Vec<Element>,
}

/// Elements outside the registry that the engine writes to directly.
const CHROME_ELEMENTS: &[(&str, &[&str])] = &[
    ("status-text", &[]),
    ("opening-hours-header", &["opening-hours"]),
    ("opening-hours-footer", &["opening-hours"]),
    ("header", &["header"]),
    ("scroll-to-top", &["scroll-to-top"]),
];

impl PageSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(
        &mut self,
        id: &str,
        classes: &[&str],
        key: Option<&str>,
    ) -> Result<(), PageError> {
        if self.find(id).is_some() {
            return Err(PageError::DuplicateId(id.to_string()));
        }
        self.elements.push(Element {
            id: id.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            key: key.map(str::to_string),
            state: ElementState {
                visible: true,
                ..Default::default()
            },
        });
        Ok(())
    }

    /// A page carrying every slot `registry` declares, with one group member
    /// per catalog entry, plus the status/header chrome.
    pub fn full(registry: &super::TargetRegistry, catalog: &LocationCatalog) -> Self {
        let mut page = Self::new();
        for target in registry.targets() {
            let selector = target.selector();
            match target {
                DisplayTarget::SetText { .. } | DisplayTarget::SetAttribute { .. } => {
                    if let Some(id) = selector.strip_prefix('#') {
                        let _ = page.add_element(id, &[], None);
                    } else if let Some(class) = selector.strip_prefix('.') {
                        for n in 0..2 {
                            let _ = page.add_element(&format!("{}-{}", class, n), &[class], None);
                        }
                    }
                }
                DisplayTarget::ToggleVisibility { pattern, .. }
                | DisplayTarget::ToggleClass { pattern, .. } => {
                    let Some(class) = selector.strip_prefix('.') else {
                        continue;
                    };
                    for id in catalog.ids() {
                        if pattern == ID_PLACEHOLDER {
                            let _ = page.add_element(&format!("{}-{}", class, id), &[class], Some(id));
                        } else {
                            let _ = page.add_element(&pattern.replace(ID_PLACEHOLDER, id), &[class], None);
                        }
                    }
                }
            }
        }
        for (id, classes) in CHROME_ELEMENTS {
            let _ = page.add_element(id, classes, None);
        }
        // Weekly hours grid, Sunday first.
        for row in 0..7 {
            let _ = page.add_element(&format!("hours-day-{}", row), &["hours-day"], None);
            let _ = page.add_element(&format!("hours-time-{}", row), &["hours-time"], None);
        }
        page
    }

    /// Drop every element whose id satisfies `pred` (page variants that do
    /// not render some slots).
    pub fn without(mut self, pred: impl Fn(&str) -> bool) -> Self {
        self.elements.retain(|e| !pred(e.id.as_str()));
        self
    }

    fn find(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Every element of group `selector` whose identity is `member`.  A
    /// class shared by several pickers yields one element per picker.
    fn members_mut<'a>(
        &'a mut self,
        selector: &'a str,
        member: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.elements
            .iter_mut()
            .filter(move |e| e.matches(selector) && e.identity() == member)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.find(id).and_then(|e| e.state.text.as_deref())
    }

    pub fn attribute(&self, id: &str, name: &str) -> Option<&str> {
        self.find(id)
            .and_then(|e| e.state.attributes.get(name))
            .map(String::as_str)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.find(id).map_or(false, |e| e.state.visible)
    }

    pub fn is_active(&self, selector: &str, member: &str) -> bool {
        self.elements
            .iter()
            .any(|e| e.matches(selector) && e.identity() == member && e.state.active)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn snapshot(&self) -> PageSnapshot {
        self.elements
            .iter()
            .map(|e| (e.id.clone(), e.state.clone()))
            .collect()
    }
}

impl RenderSurface for PageSurface {
    fn set_text(&mut self, selector: &str, text: &str) -> usize {
        let mut written = 0;
        for element in self.elements.iter_mut().filter(|e| e.matches(selector)) {
            element.state.text = Some(text.to_string());
            written += 1;
        }
        written
    }

    fn set_attribute(&mut self, selector: &str, name: &str, value: &str) -> usize {
        let mut written = 0;
        for element in self.elements.iter_mut().filter(|e| e.matches(selector)) {
            element
                .state
                .attributes
                .insert(name.to_string(), value.to_string());
            written += 1;
        }
        written
    }

    fn members(&self, selector: &str) -> Vec<String> {
        self.elements
            .iter()
            .filter(|e| e.matches(selector))
            .map(|e| e.identity().to_string())
            .collect()
    }

    fn set_visible(&mut self, selector: &str, member: &str, visible: bool) -> bool {
        let mut found = false;
        for element in self.members_mut(selector, member) {
            element.state.visible = visible;
            found = true;
        }
        found
    }

    fn set_active(&mut self, selector: &str, member: &str, active: bool) -> bool {
        let mut found = false;
        for element in self.members_mut(selector, member) {
            element.state.active = active;
            found = true;
        }
        found
    }
}
