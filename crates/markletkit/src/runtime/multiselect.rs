//! Ctrl-click multi-selection over grid rows tagged with `data-row-index`.

use std::time::Duration;

use crate::runtime::helpers::{delay, log};
use crate::runtime::{ClickModifiers, Page};

pub const ROW_SELECTOR: &str = "tr[data-row-index]";
pub const ROW_INDEX_ATTR: &str = "data-row-index";
pub const MARKER_CLASS: &str = "multi-selected";
pub const DEFAULT_CAP: usize = 20;
pub const CAP_STEP: usize = 50;
pub const STAGGER: Duration = Duration::from_millis(20);

/// What a user click on a row did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Not ours: plain click, a row without an index, or our own dispatch.
    Ignored,
    Selected,
    Deselected,
    /// The cap was hit and the user declined to raise it.
    CapReached,
}

/// A selected row as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedRow {
    pub row_index: String,
    pub text: String,
}

/// Selection state owned by one invocation. Dropped by [`MultiSelect::teardown`].
#[derive(Debug)]
pub struct MultiSelect {
    selected: Vec<String>,
    cap: usize,
    dispatching: bool,
}

impl Default for MultiSelect {
    fn default() -> Self {
        Self {
            selected: Vec::new(),
            cap: DEFAULT_CAP,
            dispatching: false,
        }
    }
}

impl MultiSelect {
    /// Start a fresh session, clearing markers a previous one left behind.
    pub fn activate<P: Page>(page: &P) -> Self {
        for row in page.query_selector_all(&format!("tr.{MARKER_CLASS}")) {
            page.set_class(&row, MARKER_CLASS, false);
        }
        let rows = page.query_selector_all(ROW_SELECTOR).len();
        log("Multi-select activated", Some(&rows));
        Self::default()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Selected row ids in selection order.
    pub fn selected_rows(&self) -> &[String] {
        &self.selected
    }

    pub fn status_line(&self) -> String {
        format!("Selected: {}/{}", self.selected.len(), self.cap)
    }

    fn is_selected(&self, index: &str) -> bool {
        self.selected.iter().any(|selected| selected == index)
    }

    /// Route a click that landed on `target` (a row or something inside one).
    pub fn handle_click<P: Page>(
        &mut self,
        page: &P,
        target: &P::Element,
        modifiers: ClickModifiers,
    ) -> ClickOutcome {
        if self.dispatching || !modifiers.ctrl {
            return ClickOutcome::Ignored;
        }
        let Some(row) = page.closest(target, ROW_SELECTOR) else {
            return ClickOutcome::Ignored;
        };
        let Some(index) = page.attribute(&row, ROW_INDEX_ATTR) else {
            return ClickOutcome::Ignored;
        };

        if self.is_selected(&index) {
            self.deselect_row(page, &row);
            return ClickOutcome::Deselected;
        }
        if self.selected.len() >= self.cap {
            let question = format!(
                "Maximum {} selections reached! Increase limit and continue?",
                self.cap
            );
            if !page.confirm(&question) {
                return ClickOutcome::CapReached;
            }
            self.cap += CAP_STEP;
        }
        self.select_row(page, &row);
        ClickOutcome::Selected
    }

    /// Mark `row` selected and mirror it into the host grid with a ctrl-click.
    pub fn select_row<P: Page>(&mut self, page: &P, row: &P::Element) -> bool {
        let Some(index) = page.attribute(row, ROW_INDEX_ATTR) else {
            return false;
        };
        if self.is_selected(&index) {
            return false;
        }
        self.selected.push(index);
        self.dispatch(page, row);
        page.set_class(row, MARKER_CLASS, true);
        true
    }

    pub fn deselect_row<P: Page>(&mut self, page: &P, row: &P::Element) -> bool {
        let Some(index) = page.attribute(row, ROW_INDEX_ATTR) else {
            return false;
        };
        let Some(position) = self.selected.iter().position(|selected| *selected == index) else {
            return false;
        };
        self.selected.remove(position);
        let natively_selected = page.has_class(row, "selected")
            || page.attribute(row, "aria-selected").as_deref() == Some("true");
        if natively_selected {
            self.dispatch(page, row);
        }
        page.set_class(row, MARKER_CLASS, false);
        true
    }

    fn dispatch<P: Page>(&mut self, page: &P, row: &P::Element) {
        self.dispatching = true;
        page.click(row, ClickModifiers::CTRL);
        self.dispatching = false;
    }

    pub fn clear<P: Page>(&mut self, page: &P) {
        for index in self.selected.clone() {
            if let Some(row) = page.query_selector(&row_selector(&index)) {
                self.deselect_row(page, &row);
            }
        }
        self.selected.clear();
    }

    /// Select the first `count` rows, one every [`STAGGER`], and return how
    /// many were selected. A grid without rows selects nothing.
    pub async fn auto_select<P: Page>(&mut self, page: &P, count: usize) -> usize {
        self.clear(page);
        let rows = page.query_selector_all(ROW_SELECTOR);
        let limit = count.min(rows.len());
        if count > self.cap {
            self.cap = count;
        }
        let mut selected = 0;
        for (position, row) in rows.iter().take(limit).enumerate() {
            if position > 0 {
                delay(STAGGER).await;
            }
            if self.select_row(page, row) {
                selected += 1;
            }
        }
        log(&format!("Auto-selected {selected} rows"), None);
        selected
    }

    pub fn selected_data<P: Page>(&self, page: &P) -> Vec<SelectedRow> {
        self.selected
            .iter()
            .filter_map(|index| {
                let row = page.query_selector(&row_selector(index))?;
                Some(SelectedRow {
                    row_index: index.clone(),
                    text: page.text_content(&row).trim().to_owned(),
                })
            })
            .collect()
    }

    /// Undo every selection and remove every marker, consuming the session.
    pub fn teardown<P: Page>(mut self, page: &P) {
        self.clear(page);
        for row in page.query_selector_all(ROW_SELECTOR) {
            page.set_class(&row, MARKER_CLASS, false);
        }
        log("Multi-select destroyed and cleaned up", None);
    }
}

fn row_selector(index: &str) -> String {
    format!(r#"tr[{ROW_INDEX_ATTR}="{index}"]"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::{MemoryPage, NodeId, NodeSpec};
    use tokio::time::Instant;

    /// Grid whose rows toggle `aria-selected` on ctrl-click like the host UI.
    fn grid(rows: usize) -> (MemoryPage, Vec<NodeId>) {
        let page = MemoryPage::new();
        let table = page.append(MemoryPage::ROOT, NodeSpec::new("table"));
        let ids = (0..rows)
            .map(|i| {
                let row = page.append(
                    table,
                    NodeSpec::new("tr")
                        .attr(ROW_INDEX_ATTR, i.to_string())
                        .attr("aria-selected", "false")
                        .text(format!(" row {i} ")),
                );
                page.on_click(row, |page, row, modifiers| {
                    if modifiers.ctrl {
                        let next = if page.attribute(&row, "aria-selected").as_deref() == Some("true") {
                            "false"
                        } else {
                            "true"
                        };
                        page.set_attribute(row, "aria-selected", Some(next));
                    }
                });
                row
            })
            .collect();
        (page, ids)
    }

    #[tokio::test(start_paused = true)]
    async fn empty_grid_auto_selects_zero() {
        let page = MemoryPage::new();
        let mut session = MultiSelect::activate(&page);
        assert_eq!(session.auto_select(&page, 20).await, 0);
        assert!(session.selected_rows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn auto_select_staggers_and_mirrors_native_state() {
        let (page, rows) = grid(5);
        let mut session = MultiSelect::activate(&page);
        let start = Instant::now();

        assert_eq!(session.auto_select(&page, 3).await, 3);

        assert_eq!(start.elapsed(), STAGGER * 2);
        assert_eq!(session.selected_rows(), ["0", "1", "2"]);
        assert!(page.has_class(&rows[2], MARKER_CLASS));
        assert_eq!(page.attribute(&rows[0], "aria-selected").as_deref(), Some("true"));
        assert_eq!(page.attribute(&rows[3], "aria-selected").as_deref(), Some("false"));
        assert_eq!(session.status_line(), "Selected: 3/20");
        assert_eq!(session.selected_data(&page)[1].text, "row 1");
    }

    #[tokio::test(start_paused = true)]
    async fn auto_select_beyond_cap_raises_it() {
        let (page, _) = grid(30);
        let mut session = MultiSelect::activate(&page);
        assert_eq!(session.auto_select(&page, 25).await, 25);
        assert_eq!(session.cap(), 25);
    }

    #[test]
    fn ctrl_click_toggles_and_plain_click_is_ignored() {
        let (page, rows) = grid(2);
        let mut session = MultiSelect::activate(&page);

        assert_eq!(session.handle_click(&page, &rows[0], ClickModifiers::PLAIN), ClickOutcome::Ignored);
        assert_eq!(session.handle_click(&page, &rows[0], ClickModifiers::CTRL), ClickOutcome::Selected);
        assert_eq!(session.handle_click(&page, &rows[0], ClickModifiers::CTRL), ClickOutcome::Deselected);
        assert!(!page.has_class(&rows[0], MARKER_CLASS));
        assert_eq!(page.attribute(&rows[0], "aria-selected").as_deref(), Some("false"));
        assert_eq!(page.clicks().len(), 2);
    }

    #[test]
    fn cap_asks_before_growing() {
        let (page, rows) = grid(DEFAULT_CAP + 2);
        let mut session = MultiSelect::activate(&page);
        for row in &rows[..DEFAULT_CAP] {
            session.select_row(&page, row);
        }

        page.push_confirm(false);
        assert_eq!(
            session.handle_click(&page, &rows[DEFAULT_CAP], ClickModifiers::CTRL),
            ClickOutcome::CapReached
        );
        assert_eq!(session.cap(), DEFAULT_CAP);

        page.push_confirm(true);
        assert_eq!(
            session.handle_click(&page, &rows[DEFAULT_CAP], ClickModifiers::CTRL),
            ClickOutcome::Selected
        );
        assert_eq!(session.cap(), DEFAULT_CAP + CAP_STEP);
    }

    #[test]
    fn teardown_removes_every_marker() {
        let (page, rows) = grid(3);
        let mut session = MultiSelect::activate(&page);
        session.select_row(&page, &rows[0]);
        session.select_row(&page, &rows[2]);
        page.set_class(&rows[1], MARKER_CLASS, true);

        session.teardown(&page);

        assert!(page.query_selector_all(&format!("tr.{MARKER_CLASS}")).is_empty());
        assert!(rows
            .iter()
            .all(|row| page.attribute(row, "aria-selected").as_deref() == Some("false")));
    }

    #[test]
    fn activation_clears_leftover_markers() {
        let (page, rows) = grid(1);
        page.set_class(&rows[0], MARKER_CLASS, true);
        let session = MultiSelect::activate(&page);
        assert!(!page.has_class(&rows[0], MARKER_CLASS));
        assert!(session.selected_rows().is_empty());
    }
}
