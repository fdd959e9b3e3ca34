//! Scroll-driven header state.  Recomputed at most once per frame from the
//! latest scroll position (see `CoalescedWork`).

use crate::display::RenderSurface;

const SCROLLED_AFTER: f64 = 50.0;
const HIDE_HEADER_AFTER: f64 = 300.0;
const SCROLL_TOP_AFTER: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportState {
    /// Compact header.
    pub scrolled: bool,
    /// Header slid away while moving down.
    pub scroll_down: bool,
    pub show_scroll_top: bool,
}

impl ViewportState {
    fn header_class(&self) -> String {
        let mut class = String::from("header");
        if self.scrolled {
            class.push_str(" scrolled");
        }
        if self.scroll_down {
            class.push_str(" scroll-down");
        }
        class
    }
}

#[derive(Debug, Default)]
pub struct ViewportTracker {
    last_y: f64,
    state: ViewportState,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    /// Fold in a new scroll offset.
    pub fn update(&mut self, y: f64) -> ViewportState {
        self.state.scrolled = y > SCROLLED_AFTER;
        // Near the top the header keeps whatever it had.
        if y > HIDE_HEADER_AFTER {
            self.state.scroll_down = y > self.last_y;
        }
        self.state.show_scroll_top = y > SCROLL_TOP_AFTER;
        self.last_y = y;
        self.state
    }

    pub fn render(&self, surface: &mut dyn RenderSurface) {
        surface.set_attribute("#header", "class", &self.state.header_class());
        surface.set_visible(".scroll-to-top", "scroll-to-top", self.state.show_scroll_top);
    }
}
