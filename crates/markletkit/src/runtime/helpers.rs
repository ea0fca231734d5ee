//! Async counterparts of the injected helper library.

use std::fmt;
use std::time::Duration;

use tokio::time::{Instant, sleep, sleep_until};

use crate::domain::errors::AutomationError;
use crate::runtime::{ClickModifiers, Page};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_CLICK_DELAY: Duration = Duration::from_millis(300);
const TEXT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const LOG_PREFIX: &str = "[Bookmarklet]";

/// Finder closure evaluated against the page on every probe.
pub type Finder<'a, P> = &'a dyn Fn(&P) -> Option<<P as Page>::Element>;

/// What to wait for: a CSS selector or a described finder.
pub enum Locator<'a, P: Page> {
    Selector(&'a str),
    Finder { describe: &'a str, find: Finder<'a, P> },
}

impl<'a, P: Page> Locator<'a, P> {
    pub fn finder(describe: &'a str, find: Finder<'a, P>) -> Self {
        Self::Finder { describe, find }
    }

    fn resolve(&self, page: &P) -> Option<P::Element> {
        match self {
            Self::Selector(selector) => page.query_selector(selector),
            Self::Finder { find, .. } => find(page),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Selector(selector) => format!("element: {selector}"),
            Self::Finder { describe, .. } => format!("element: {describe}"),
        }
    }
}

impl<'a, P: Page> From<&'a str> for Locator<'a, P> {
    fn from(selector: &'a str) -> Self {
        Self::Selector(selector)
    }
}

/// Polling budget for [`wait_for_element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Poll `locator` every `interval` until it resolves.
///
/// The last probe runs exactly at the deadline; if that one misses too the
/// wait fails with [`AutomationError::Timeout`].
pub async fn wait_for_element<P: Page>(
    page: &P,
    locator: &Locator<'_, P>,
    options: WaitOptions,
) -> Result<P::Element, AutomationError> {
    let deadline = Instant::now() + options.timeout;
    let interval = options.interval.max(Duration::from_millis(1));
    loop {
        if let Some(element) = locator.resolve(page) {
            return Ok(element);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(AutomationError::timeout(locator.describe(), options.timeout));
        }
        sleep_until((now + interval).min(deadline)).await;
    }
}

/// Like [`wait_for_element`] but re-queries only when the page mutates.
///
/// The mutation subscription lives inside this future and is dropped on
/// every exit path.
pub async fn wait_for_element_observer<P: Page>(
    page: &P,
    selector: &str,
    timeout: Duration,
) -> Result<P::Element, AutomationError> {
    let mut changes = page.mutations();
    if let Some(element) = page.query_selector(selector) {
        return Ok(element);
    }

    let deadline = sleep(timeout);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    (&mut deadline).await;
                    break;
                }
                if let Some(element) = page.query_selector(selector) {
                    return Ok(element);
                }
            }
            _ = &mut deadline => break,
        }
    }
    Err(AutomationError::timeout(format!("element: {selector}"), timeout))
}

/// Wait for `locator`, then click it.
pub async fn click_element<P: Page>(
    page: &P,
    locator: &Locator<'_, P>,
    timeout: Duration,
) -> Result<P::Element, AutomationError> {
    let element = wait_for_element(page, locator, WaitOptions::with_timeout(timeout)).await?;
    page.click(&element, ClickModifiers::PLAIN);
    Ok(element)
}

/// Click, then give the page `pause` to react.
pub async fn click_and_wait<P: Page>(page: &P, element: &P::Element, pause: Duration) {
    page.click(element, ClickModifiers::PLAIN);
    delay(pause).await;
}

pub async fn delay(duration: Duration) {
    sleep(duration).await;
}

/// First element under `selector`, in document order, whose trimmed text
/// equals `text` (`exact`) or contains it ignoring case.
pub fn find_element_by_text<P: Page>(
    page: &P,
    selector: &str,
    text: &str,
    exact: bool,
) -> Option<P::Element> {
    let needle = text.to_lowercase();
    page.query_selector_all(selector).into_iter().find(|element| {
        let content = page.text_content(element);
        let content = content.trim();
        if exact {
            content == text
        } else {
            content.to_lowercase().contains(&needle)
        }
    })
}

pub async fn wait_for_element_by_text<P: Page>(
    page: &P,
    selector: &str,
    text: &str,
    timeout: Duration,
    exact: bool,
) -> Result<P::Element, AutomationError> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Some(element) = find_element_by_text(page, selector, text, exact) {
            return Ok(element);
        }
        delay(TEXT_POLL_INTERVAL).await;
    }
    Err(AutomationError::timeout(format!("element with text: {text}"), timeout))
}

/// Where [`get_text_content`] reads from.
pub enum TextSource<'a, P: Page> {
    Selector(&'a str),
    Element(&'a P::Element),
}

/// Trimmed text of the resolved element, or empty when nothing resolves.
pub fn get_text_content<P: Page>(page: &P, source: TextSource<'_, P>) -> String {
    let element = match source {
        TextSource::Selector(selector) => page.query_selector(selector),
        TextSource::Element(element) => Some(element.clone()),
    };
    element
        .map(|element| page.text_content(&element).trim().to_owned())
        .unwrap_or_default()
}

pub fn element_exists<P: Page>(page: &P, selector: &str) -> bool {
    page.query_selector(selector).is_some()
}

pub fn log(message: &str, data: Option<&dyn fmt::Debug>) {
    match data {
        Some(data) => tracing::info!(target: "bookmarklet", data = ?data, "{LOG_PREFIX} {message}"),
        None => tracing::info!(target: "bookmarklet", "{LOG_PREFIX} {message}"),
    }
}

/// Log `error` and raise it to the user as a blocking alert.
pub fn show_error<P: Page>(page: &P, error: &dyn fmt::Display) {
    let message = error.to_string();
    tracing::error!(target: "bookmarklet", "[Bookmarklet Error] {message}");
    page.alert(&format!("Error: {message}\n\nCheck console for details."));
}
