//! Page statistics scanner behind the page-stats bookmarklet.

use std::fmt;

use serde::Serialize;

use crate::runtime::Page;

const HIGHLIGHT_CLASS: &str = "markletkit-outline";

/// Element counts and size measurements for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageStats {
    pub divs: usize,
    pub images: usize,
    pub links: usize,
    pub buttons: usize,
    pub inputs: usize,
    pub scripts: usize,
    pub stylesheets: usize,
    pub word_count: usize,
    pub scroll_height: u32,
    pub viewport_height: u32,
}

/// A qualitative observation derived from fixed thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Fact {
    DivHeavy(usize),
    ImageRich(usize),
    LongRead { minutes: u64 },
    TallPage { ratio: u64 },
    ScriptHeavy(usize),
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivHeavy(count) => write!(f, "This page is div-heavy with {count} divs!"),
            Self::ImageRich(count) => write!(f, "Image-rich page with {count} images"),
            Self::LongRead { minutes } => write!(f, "Long read: ~{minutes} min read time"),
            Self::TallPage { ratio } => write!(f, "Tall page: {ratio}x viewport height"),
            Self::ScriptHeavy(count) => write!(f, "Script-heavy: {count} JavaScript files"),
        }
    }
}

pub fn scan<P: Page>(page: &P) -> PageStats {
    let count = |selector: &str| page.query_selector_all(selector).len();
    let scroll = page.scroll_metrics();
    PageStats {
        divs: count("div"),
        images: count("img"),
        links: count("a"),
        buttons: count("button"),
        inputs: count("input"),
        scripts: count("script"),
        stylesheets: count(r#"link[rel="stylesheet"]"#),
        word_count: page.body_text().split_whitespace().count(),
        scroll_height: scroll.scroll_height,
        viewport_height: scroll.viewport_height,
    }
}

impl PageStats {
    pub fn facts(&self) -> Vec<Fact> {
        let mut facts = Vec::new();
        if self.divs > 100 {
            facts.push(Fact::DivHeavy(self.divs));
        }
        if self.images > 20 {
            facts.push(Fact::ImageRich(self.images));
        }
        if self.word_count > 1000 {
            facts.push(Fact::LongRead {
                minutes: rounded_ratio(self.word_count as u64, 200),
            });
        }
        let viewport = u64::from(self.viewport_height);
        if viewport > 0 && u64::from(self.scroll_height) > viewport * 3 {
            facts.push(Fact::TallPage {
                ratio: rounded_ratio(u64::from(self.scroll_height), viewport),
            });
        }
        if self.scripts > 10 {
            facts.push(Fact::ScriptHeavy(self.scripts));
        }
        facts
    }
}

/// `numerator / denominator` rounded half up.
fn rounded_ratio(numerator: u64, denominator: u64) -> u64 {
    (numerator * 2 + denominator) / (denominator * 2)
}

/// Stable per-name element id so a re-invocation replaces its own panel.
pub fn instance_id(name: &str) -> String {
    let mut hash: i32 = 0;
    for unit in name.encode_utf16() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(i32::from(unit));
    }
    format!("{name}-{}", to_base36(hash.unsigned_abs()))
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Per-invocation state of the floating statistics panel.
#[derive(Debug)]
pub struct StatsPanel {
    id: String,
    highlighted: bool,
    report: PageStats,
}

impl StatsPanel {
    pub fn open<P: Page>(page: &P, name: &str) -> Self {
        let report = scan(page);
        tracing::debug!(divs = report.divs, words = report.word_count, "page scanned");
        Self {
            id: instance_id(name),
            highlighted: false,
            report,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn report(&self) -> &PageStats {
        &self.report
    }

    pub fn refresh<P: Page>(&mut self, page: &P) -> &PageStats {
        self.report = scan(page);
        &self.report
    }

    /// Outline every div on the page, or remove the outlines again.
    pub fn toggle_div_highlight<P: Page>(&mut self, page: &P) -> bool {
        self.highlighted = !self.highlighted;
        for div in page.query_selector_all("div") {
            if page.attribute(&div, "id").as_deref() != Some(self.id.as_str()) {
                page.set_class(&div, HIGHLIGHT_CLASS, self.highlighted);
            }
        }
        self.highlighted
    }

    /// Remove any highlight left behind and drop the panel.
    pub fn close<P: Page>(mut self, page: &P) {
        if self.highlighted {
            self.toggle_div_highlight(page);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ScrollMetrics;
    use crate::runtime::memory::{MemoryPage, NodeSpec};

    fn stats() -> PageStats {
        PageStats {
            divs: 0,
            images: 0,
            links: 0,
            buttons: 0,
            inputs: 0,
            scripts: 0,
            stylesheets: 0,
            word_count: 0,
            scroll_height: 800,
            viewport_height: 800,
        }
    }

    #[test]
    fn thresholds_are_strict() {
        let at_limits = PageStats {
            divs: 100,
            images: 20,
            word_count: 1000,
            scripts: 10,
            scroll_height: 2400,
            ..stats()
        };
        assert!(at_limits.facts().is_empty());

        let over = PageStats {
            divs: 101,
            images: 21,
            word_count: 1100,
            scripts: 11,
            scroll_height: 2401,
            ..stats()
        };
        assert_eq!(
            over.facts(),
            vec![
                Fact::DivHeavy(101),
                Fact::ImageRich(21),
                Fact::LongRead { minutes: 6 },
                Fact::TallPage { ratio: 3 },
                Fact::ScriptHeavy(11),
            ]
        );
    }

    #[test]
    fn zero_viewport_reports_no_ratio() {
        let page = PageStats {
            scroll_height: 5000,
            viewport_height: 0,
            ..stats()
        };
        assert!(page.facts().is_empty());
    }

    #[test]
    fn scan_counts_memory_page() {
        let page = MemoryPage::new();
        let wrapper = page.append(MemoryPage::ROOT, NodeSpec::new("div"));
        page.append(wrapper, NodeSpec::new("div").text("hello   brave\nnew world"));
        page.append(wrapper, NodeSpec::new("img"));
        page.append(MemoryPage::ROOT, NodeSpec::new("link").attr("rel", "stylesheet"));
        page.append(MemoryPage::ROOT, NodeSpec::new("link").attr("rel", "icon"));
        page.set_scroll(ScrollMetrics {
            scroll_height: 4000,
            viewport_height: 1000,
        });

        let stats = scan(&page);
        assert_eq!(stats.divs, 2);
        assert_eq!(stats.images, 1);
        assert_eq!(stats.stylesheets, 1);
        assert_eq!(stats.word_count, 4);
        assert_eq!(stats.facts(), vec![Fact::TallPage { ratio: 4 }]);
        assert_eq!(Fact::TallPage { ratio: 4 }.to_string(), "Tall page: 4x viewport height");
    }

    #[test]
    fn instance_ids_are_stable_per_name() {
        assert_eq!(instance_id("page-stats"), instance_id("page-stats"));
        assert_ne!(instance_id("page-stats"), instance_id("page-analyzer"));
        assert!(instance_id("page-stats").starts_with("page-stats-"));
        assert_eq!(instance_id("a"), "a-2p");
    }

    #[test]
    fn highlight_toggle_skips_own_panel() {
        let page = MemoryPage::new();
        let content = page.append(MemoryPage::ROOT, NodeSpec::new("div"));
        let mut panel = StatsPanel::open(&page, "page-stats");
        let own = page.append(MemoryPage::ROOT, NodeSpec::new("div").id(panel.id()));

        assert!(panel.toggle_div_highlight(&page));
        assert!(page.has_class(&content, HIGHLIGHT_CLASS));
        assert!(!page.has_class(&own, HIGHLIGHT_CLASS));
        assert_eq!(panel.refresh(&page).divs, 2);

        panel.close(&page);
        assert!(!page.has_class(&content, HIGHLIGHT_CLASS));
    }
}
