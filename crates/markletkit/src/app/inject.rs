//! Splicing helper bodies into a bookmarklet's top-level scope.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::helpers::HelperLibrary;

const BLOCK_START: &str = "// === Shared Helper Functions ===";
const BLOCK_END: &str = "// === End Helper Functions ===";

static STRICT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:'use strict'|"use strict");"#).expect("strict marker pattern"));

static IIFE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*(?:async\s+)?(?:function\s*\(\s*\)|\(\s*\)\s*=>)\s*\{")
        .expect("wrapper pattern")
});

/// Where helpers ended up in the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPoint {
    AfterStrictMarker,
    WrapperStart,
    Prepended,
}

/// Result of an injection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injected {
    pub source: String,
    pub point: Option<InjectionPoint>,
}

/// Insert the bodies of `helpers` ahead of the unit's own statements.
///
/// Function declarations are hoisted, so placing them at the top of the
/// wrapper makes every later call resolve without reordering the unit.
pub fn inject_helpers(source: &str, helpers: &[String], library: &HelperLibrary) -> Injected {
    let bodies: Vec<&str> = helpers
        .iter()
        .filter_map(|name| library.get(name))
        .map(|entry| entry.source.as_str())
        .collect();

    if bodies.is_empty() {
        return Injected {
            source: source.to_owned(),
            point: None,
        };
    }

    let block = bodies.join("\n\n    ");

    if let Some(found) = STRICT_MARKER.find(source) {
        let (before, after) = source.split_at(found.end());
        return Injected {
            source: format!("{before}\n\n    {BLOCK_START}\n    {block}\n    {BLOCK_END}\n{after}"),
            point: Some(InjectionPoint::AfterStrictMarker),
        };
    }

    if let Some(found) = IIFE_OPEN.find(source) {
        let (before, after) = source.split_at(found.end());
        return Injected {
            source: format!("{before}\n    {BLOCK_START}\n    {block}\n    {BLOCK_END}\n{after}"),
            point: Some(InjectionPoint::WrapperStart),
        };
    }

    Injected {
        source: format!("{BLOCK_START}\n{block}\n{BLOCK_END}\n\n{source}"),
        point: Some(InjectionPoint::Prepended),
    }
}
