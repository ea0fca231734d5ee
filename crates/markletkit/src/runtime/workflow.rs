//! Linear portal workflows: locate, click, settle, repeat.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::errors::AutomationError;
use crate::runtime::helpers::{
    Locator, WaitOptions, click_and_wait, delay, log, show_error, wait_for_element,
    wait_for_element_observer,
};
use crate::runtime::{ClickModifiers, Page};

/// How a control's trimmed text is matched.
#[derive(Debug, Clone)]
pub enum TextMatch {
    Exact(String),
    Contains(String),
    Pattern(Regex),
}

impl TextMatch {
    pub fn matches(&self, text: &str) -> bool {
        let text = text.trim();
        match self {
            Self::Exact(expected) => text == expected,
            Self::Contains(needle) => text.contains(needle.as_str()),
            Self::Pattern(pattern) => pattern.is_match(text),
        }
    }
}

/// One suspend-and-act step.
#[derive(Debug, Clone)]
pub enum Step {
    /// Click the first element under `selector` whose text matches, or its
    /// closest `ancestor` when set, then wait `settle`.
    ClickText {
        selector: &'static str,
        text: TextMatch,
        ancestor: Option<&'static str>,
        settle: Duration,
    },
    /// Wait for `selector` to appear.
    WaitFor {
        selector: &'static str,
        timeout: Duration,
    },
    /// Wait for an input and paste the clipboard into it.
    FillFromClipboard {
        selector: &'static str,
        timeout: Duration,
    },
    /// Wait for a checkbox and tick it unless already ticked.
    Check {
        selector: &'static str,
        timeout: Duration,
    },
    Pause(Duration),
}

/// A named, described step.
#[derive(Debug, Clone)]
pub struct Stage {
    pub label: &'static str,
    pub missing: &'static str,
    pub step: Step,
}

#[derive(Debug, Clone)]
pub struct Workflow {
    name: &'static str,
    stages: Vec<Stage>,
}

impl Workflow {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            stages: Vec::new(),
        }
    }

    /// Add a step. `missing` is the error reported when its target is absent.
    pub fn stage(mut self, label: &'static str, missing: &'static str, step: Step) -> Self {
        self.stages.push(Stage {
            label,
            missing,
            step,
        });
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order, stopping at the first failure.
    pub async fn run<P: Page>(&self, page: &P) -> Result<(), AutomationError> {
        log(&format!("Starting {} workflow", self.name), None);
        for (position, stage) in self.stages.iter().enumerate() {
            log(&format!("{}. {}", position + 1, stage.label), None);
            run_step(page, stage).await?;
        }
        log(&format!("{} workflow complete", self.name), None);
        Ok(())
    }

    /// Run and surface any failure to the user.
    pub async fn run_reporting<P: Page>(&self, page: &P) -> Result<(), AutomationError> {
        let outcome = self.run(page).await;
        if let Err(error) = &outcome {
            show_error(page, error);
        }
        outcome
    }
}

async fn run_step<P: Page>(page: &P, stage: &Stage) -> Result<(), AutomationError> {
    match &stage.step {
        Step::ClickText {
            selector,
            text,
            ancestor,
            settle,
        } => {
            let candidates = page.query_selector_all(selector);
            let Some(found) = candidates
                .iter()
                .find(|element| text.matches(&page.text_content(element)))
            else {
                let available: Vec<String> = candidates
                    .iter()
                    .map(|element| page.text_content(element).trim().to_owned())
                    .collect();
                log("Available labels", Some(&available));
                return Err(AutomationError::not_found(stage.missing));
            };
            let target = match ancestor {
                Some(ancestor) => page
                    .closest(found, ancestor)
                    .ok_or_else(|| AutomationError::not_found(stage.missing))?,
                None => found.clone(),
            };
            click_and_wait(page, &target, *settle).await;
        }
        Step::WaitFor { selector, timeout } => {
            let locator = Locator::Selector(selector);
            wait_for_element(page, &locator, WaitOptions::with_timeout(*timeout)).await?;
        }
        Step::FillFromClipboard { selector, timeout } => {
            let input = wait_for_element_observer(page, selector, *timeout).await?;
            let text = page.read_clipboard()?;
            page.set_value(&input, &text);
            log("Pasted", Some(&text));
        }
        Step::Check { selector, timeout } => {
            let checkbox = wait_for_element_observer(page, selector, *timeout).await?;
            if page.attribute(&checkbox, "checked").is_none() {
                page.click(&checkbox, ClickModifiers::PLAIN);
            }
        }
        Step::Pause(duration) => delay(*duration).await,
    }
    Ok(())
}

/// Open the Links pane, start a child link and fill in the incident id
/// from the clipboard, stopping before the final confirmation.
pub fn link_child_incident() -> Workflow {
    let ms = Duration::from_millis;
    Workflow::new("link-child-incident")
        .stage(
            "Clicking Links button",
            "Links button not found",
            Step::ClickText {
                selector: "span.ms-Button-label",
                text: TextMatch::Exact("Links".into()),
                ancestor: None,
                settle: ms(500),
            },
        )
        .stage(
            "Clicking Child tab",
            "Child tab not found",
            Step::ClickText {
                selector: "span.ms-Pivot-text",
                text: TextMatch::Pattern(child_tab_pattern()),
                ancestor: None,
                settle: ms(300),
            },
        )
        .stage("Letting the pane settle", "", Step::Pause(ms(300)))
        .stage(
            "Clicking Add link button",
            "Add link button not found",
            Step::ClickText {
                selector: "span.ms-Button-label",
                text: TextMatch::Contains("Add link".into()),
                ancestor: None,
                settle: ms(800),
            },
        )
        .stage(
            "Pasting incident id into the search box",
            "Search box not found",
            Step::FillFromClipboard {
                selector: r#"input.ms-SearchBox-field[placeholder*="Search incident"]"#,
                timeout: ms(3000),
            },
        )
        .stage("Waiting for search results", "", Step::Pause(ms(2000)))
        .stage(
            "Selecting the result",
            "Result checkbox not found",
            Step::Check {
                selector: r#"input[type="checkbox"]"#,
                timeout: ms(8000),
            },
        )
        .stage("Letting the selection settle", "", Step::Pause(ms(300)))
        .stage(
            "Clicking Next button",
            "Next button not found",
            Step::ClickText {
                selector: "button span.ms-Button-label",
                text: TextMatch::Exact("Next".into()),
                ancestor: Some("button"),
                settle: Duration::ZERO,
            },
        )
}

static CHILD_TAB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Child\s*\(").expect("valid child tab pattern"));

fn child_tab_pattern() -> Regex {
    CHILD_TAB.clone()
}

pub const RESOLVE_CHECKBOX_SELECTOR: &str = r#"input.gridCheckbox.item-checkbox[type="checkbox"]"#;
pub const RESOLVE_BUTTON_SELECTOR: &str = r#"button[data-test-id="resolveIncidentAction"]"#;
pub const MAX_RESOLVE_BATCH: usize = 6;

/// Tick up to six incidents whose row mentions the prompted text, then open
/// the Resolve dialog. Returns how many incidents were ticked; zero when the
/// prompt was cancelled.
pub async fn resolve_matching_incidents<P: Page>(page: &P) -> Result<usize, AutomationError> {
    let Some(search) = page
        .prompt(
            "Enter the text to search for in incidents (e.g., \"has high latency\"):",
            "has high latency",
        )
        .filter(|search| !search.is_empty())
    else {
        page.alert("Search cancelled.");
        return Ok(0);
    };
    let needle = search.to_lowercase();

    let checkboxes = page.query_selector_all(RESOLVE_CHECKBOX_SELECTOR);
    if checkboxes.is_empty() {
        return Err(AutomationError::not_found(
            "No incident checkboxes found on this page.",
        ));
    }

    let matching: Vec<P::Element> = checkboxes
        .into_iter()
        .filter(|checkbox| {
            ["tr", r#"[role="row"]"#, ".grid-row"]
                .iter()
                .find_map(|row| page.closest(checkbox, row))
                .is_some_and(|row| page.text_content(&row).to_lowercase().contains(&needle))
        })
        .take(MAX_RESOLVE_BATCH)
        .collect();
    if matching.is_empty() {
        return Err(AutomationError::not_found(format!(
            "No incidents found containing \"{search}\""
        )));
    }

    for checkbox in &matching {
        if page.attribute(checkbox, "checked").is_none() {
            page.click(checkbox, ClickModifiers::PLAIN);
            delay(Duration::from_millis(200)).await;
        }
    }
    delay(Duration::from_millis(500)).await;

    let find_resolve = |page: &P| {
        page.query_selector_all(RESOLVE_BUTTON_SELECTOR)
            .into_iter()
            .find(|button| {
                page.text_content(button).contains("Resolve")
                    && page.attribute(button, "disabled").is_none()
            })
    };
    let locator = Locator::finder("enabled Resolve button", &find_resolve);
    let resolve = wait_for_element(page, &locator, WaitOptions::with_timeout(Duration::from_millis(3000)))
        .await?;
    page.click(&resolve, ClickModifiers::PLAIN);
    delay(Duration::from_millis(1000)).await;

    page.alert(&format!(
        "Selected {} incident(s) and opened Resolve dialog.\n\nPlease set the cause and click the Resolve button manually.",
        matching.len()
    ));
    Ok(matching.len())
}
