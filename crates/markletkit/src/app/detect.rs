//! Static detection of the helpers a bookmarklet calls.
//!
//! Detection is a plain text scan: a helper counts as used when its name is
//! followed by an opening parenthesis and is not preceded by an identifier
//! character, `$` or `.`. Names inside comments or string literals therefore
//! count too, while member calls such as `console.log(` do not.

use std::collections::BTreeSet;

use regex::Regex;

use crate::app::helpers::HelperLibrary;
use crate::domain::errors::BuildError;

/// Matches call sites of every helper in a library.
#[derive(Debug)]
pub struct UsageDetector {
    patterns: Vec<(String, Regex)>,
}

impl UsageDetector {
    pub fn new(library: &HelperLibrary) -> Self {
        let patterns = library
            .names()
            .filter_map(|name| {
                let pattern = format!(r"(?:^|[^\w$.]){}\s*\(", regex::escape(name));
                match Regex::new(&pattern) {
                    Ok(regex) => Some((name.to_owned(), regex)),
                    Err(err) => {
                        tracing::warn!(helper = name, error = %err, "skipping helper with unusable name");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    /// Helper names called in `source`, in library declaration order.
    pub fn detect(&self, source: &str) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|(_, regex)| regex.is_match(source))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn detect_in_helper(&self, helper: &str, source: &str) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|(name, _)| name != helper)
            .filter(|(_, regex)| regex.is_match(source))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Text-scan entry point.
pub fn detect_used_helpers(source: &str, library: &HelperLibrary) -> Vec<String> {
    UsageDetector::new(library).detect(source)
}

/// Decide which helper bodies a unit needs.
///
/// `declared` is the unit's explicit dependency list and adds to what the
/// text scan finds; it never hides a detected call, so every helper the unit
/// calls has its body injected. The result is closed over helper-to-helper
/// calls and sorted in library declaration order.
pub fn resolve_helpers(
    unit: &str,
    source: &str,
    declared: Option<&[String]>,
    library: &HelperLibrary,
) -> Result<Vec<String>, BuildError> {
    let detector = UsageDetector::new(library);
    let mut roots = detector.detect(source);

    if let Some(declared) = declared {
        if let Some(unknown) = declared.iter().find(|name| !library.contains(name)) {
            return Err(BuildError::UnknownHelper {
                unit: unit.to_owned(),
                helper: unknown.clone(),
            });
        }
        for name in roots.iter().filter(|name| !declared.contains(name)) {
            tracing::debug!(unit, helper = %name, "helper called but not declared in meta.json");
        }
        roots.extend(declared.iter().cloned());
    }

    let mut resolved: BTreeSet<String> = BTreeSet::new();
    let mut pending = roots;
    while let Some(name) = pending.pop() {
        if !resolved.insert(name.clone()) {
            continue;
        }
        if let Some(entry) = library.get(&name) {
            pending.extend(detector.detect_in_helper(&name, &entry.source));
        }
    }

    let mut ordered: Vec<String> = resolved.into_iter().collect();
    ordered.sort_by_key(|name| library.position(name).unwrap_or(usize::MAX));
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> HelperLibrary {
        HelperLibrary::parse(
            r#"function waitForElement(selector, timeout = 5000) {
    return document.querySelector(selector);
}

async function clickElement(selector, timeout = 5000) {
    const element = await waitForElement(selector, timeout);
    element.click();
}

function delay(ms) {
    return new Promise(resolve => setTimeout(resolve, ms));
}

function log(message) {
    console.log(message);
}
"#,
        )
    }

    #[test]
    fn detects_calls_with_word_boundaries() {
        let library = library();
        let used = detect_used_helpers("await delay (10); mylog('x'); log('done');", &library);
        assert_eq!(used, vec!["delay", "log"]);
    }

    #[test]
    fn ignores_references_without_a_call() {
        let library = library();
        let used = detect_used_helpers("const fn = delay; fn(1);", &library);
        assert!(used.is_empty());
    }

    #[test]
    fn member_calls_are_not_helper_calls() {
        let library = library();
        let used = detect_used_helpers("console.log('x'); this.delay(3);", &library);
        assert!(used.is_empty());
    }

    #[test]
    fn counts_names_inside_comments() {
        let library = library();
        let used = detect_used_helpers("// remember to log() here\n", &library);
        assert_eq!(used, vec!["log"]);
    }

    #[test]
    fn resolution_follows_helper_to_helper_calls() -> anyhow::Result<()> {
        let library = library();
        let resolved = resolve_helpers("unit", "clickElement('#go');", None, &library)?;
        assert_eq!(resolved, vec!["waitForElement", "clickElement"]);
        Ok(())
    }

    #[test]
    fn declared_helpers_extend_detection() -> anyhow::Result<()> {
        let library = library();
        let declared = vec!["log".to_string()];
        let resolved = resolve_helpers("unit", "delay(5); log('x');", Some(&declared), &library)?;
        assert_eq!(resolved, vec!["delay", "log"]);
        Ok(())
    }

    #[test]
    fn declared_helpers_cover_bare_references() -> anyhow::Result<()> {
        let library = library();
        let declared = vec!["clickElement".to_string()];
        let resolved = resolve_helpers("unit", "run().catch(clickElement);", Some(&declared), &library)?;
        assert_eq!(resolved, vec!["waitForElement", "clickElement"]);
        Ok(())
    }

    #[test]
    fn unknown_declared_helper_fails_the_unit() {
        let library = library();
        let declared = vec!["teleport".to_string()];
        let err = resolve_helpers("unit", "", Some(&declared), &library).unwrap_err();
        assert!(matches!(err, BuildError::UnknownHelper { ref helper, .. } if helper == "teleport"));
    }
}
