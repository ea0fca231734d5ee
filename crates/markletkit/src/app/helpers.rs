//! Parsing of the shared helper library into a static manifest.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::model::HelperEntry;

/// A top-level function declaration, optionally preceded by its `/** */` block.
static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:/\*\*(?:[^*]|\*[^/])*\*/[ \t]*\r?\n)?(?:async[ \t]+)?function[ \t]+([A-Za-z_$][\w$]*)[ \t]*\(")
        .expect("helper declaration pattern")
});

/// Ordered `name -> source` manifest of injectable helpers.
#[derive(Debug, Clone, Default)]
pub struct HelperLibrary {
    entries: Vec<HelperEntry>,
    index: HashMap<String, usize>,
}

impl HelperLibrary {
    /// Load the library from disk. A missing file yields an empty library.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "helper library not found; building without helpers");
            return Ok(Self::default());
        }
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read helper library {}", path.display()))?;
        let library = Self::parse(&source);
        tracing::debug!(count = library.len(), "loaded helper library");
        Ok(library)
    }

    /// Split helper source text into one entry per top-level function.
    ///
    /// Each entry runs from its doc block (or `function` keyword) up to the
    /// start of the next declaration. Text before the first declaration is
    /// dropped.
    pub fn parse(source: &str) -> Self {
        let starts: Vec<(usize, String)> = DECLARATION
            .captures_iter(source)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?.as_str().to_owned();
                Some((whole.start(), name))
            })
            .collect();

        let mut library = Self::default();
        for (position, (start, name)) in starts.iter().enumerate() {
            let end = starts
                .get(position + 1)
                .map(|(next, _)| *next)
                .unwrap_or(source.len());
            let body = source[*start..end].trim();
            library.insert(HelperEntry {
                name: name.clone(),
                source: body.to_owned(),
            });
        }
        library
    }

    fn insert(&mut self, entry: HelperEntry) {
        match self.index.get(&entry.name) {
            Some(&existing) => {
                tracing::warn!(helper = %entry.name, "duplicate helper definition; keeping the last one");
                self.entries[existing] = entry;
            }
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&HelperEntry> {
        self.index.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Helpers in declaration order.
    pub fn entries(&self) -> &[HelperEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Position of a helper in declaration order, used to keep injection stable.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}
