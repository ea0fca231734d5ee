//! Page-side behaviour of the bookmarklets, written against an abstract page.
//!
//! Every operation takes a [`Page`] and never holds page state across an
//! await point, matching the single-threaded event loop the scripts run in.

use std::fmt;

use tokio::sync::watch;

use crate::domain::errors::AutomationError;

pub mod commands;
pub mod helpers;
pub mod memory;
pub mod multiselect;
pub mod stats;
pub mod workflow;

/// Modifier keys carried by a synthetic click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickModifiers {
    pub ctrl: bool,
}

impl ClickModifiers {
    pub const PLAIN: Self = Self { ctrl: false };
    pub const CTRL: Self = Self { ctrl: true };
}

/// Document height against the visible viewport, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_height: u32,
    pub viewport_height: u32,
}

impl Default for ScrollMetrics {
    fn default() -> Self {
        Self {
            scroll_height: 800,
            viewport_height: 800,
        }
    }
}

/// The slice of a live document the bookmarklets rely on.
///
/// Elements are opaque handles; all reads and writes go through the page.
pub trait Page {
    type Element: Clone + PartialEq + fmt::Debug;

    /// Matching elements in document order.
    fn query_selector_all(&self, selector: &str) -> Vec<Self::Element>;

    fn query_selector(&self, selector: &str) -> Option<Self::Element> {
        self.query_selector_all(selector).into_iter().next()
    }

    /// The element itself or its nearest ancestor matching `selector`.
    fn closest(&self, element: &Self::Element, selector: &str) -> Option<Self::Element>;

    /// Concatenated text of the element and its descendants, untrimmed.
    fn text_content(&self, element: &Self::Element) -> String;

    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    fn has_class(&self, element: &Self::Element, class: &str) -> bool;

    fn set_class(&self, element: &Self::Element, class: &str, enabled: bool);

    fn click(&self, element: &Self::Element, modifiers: ClickModifiers);

    /// Set a form control's value and notify input listeners.
    fn set_value(&self, element: &Self::Element, value: &str);

    /// Receiver that changes whenever the document subtree is mutated.
    fn mutations(&self) -> watch::Receiver<u64>;

    /// Blocking user notification.
    fn alert(&self, message: &str);

    /// Blocking yes/no question.
    fn confirm(&self, message: &str) -> bool;

    /// Blocking text question. `None` when cancelled.
    fn prompt(&self, message: &str, default: &str) -> Option<String>;

    fn read_clipboard(&self) -> Result<String, AutomationError>;

    /// Rendered text of the whole body.
    fn body_text(&self) -> String;

    fn scroll_metrics(&self) -> ScrollMetrics;
}
