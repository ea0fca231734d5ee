//! Domain models for bookmarklet units and their packaged form.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One helper function parsed from the shared helper library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperEntry {
    pub name: String,
    pub source: String,
}

/// How a unit's sources are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitLayout {
    /// A lone `index.js`.
    SingleFile,
    /// `index.js` plus `template.html` and/or `styles.css`.
    MultiFile,
}

impl UnitLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitLayout::SingleFile => "single-file",
            UnitLayout::MultiFile => "multi-file",
        }
    }
}

/// Raw sources for one bookmarklet, read from its folder.
#[derive(Debug, Clone)]
pub struct BookmarkletUnit {
    pub name: String,
    pub dir: PathBuf,
    pub logic: String,
    pub template: Option<String>,
    pub styles: Option<String>,
    pub overrides: MetaOverrides,
}

impl BookmarkletUnit {
    pub fn layout(&self) -> UnitLayout {
        if self.template.is_some() || self.styles.is_some() {
            UnitLayout::MultiFile
        } else {
            UnitLayout::SingleFile
        }
    }
}

/// Contents of an optional `meta.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetaOverrides {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    /// Explicit helper dependencies. When present, replaces text detection.
    pub helpers: Option<Vec<String>>,
}

/// Display metadata shown in the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkletMeta {
    pub name: String,
    pub description: String,
    pub category: String,
    pub author: String,
}

impl BookmarkletMeta {
    /// Generated defaults for a folder, before `meta.json` is applied.
    pub fn defaults_for(folder: &str, category: &str, author: &str) -> Self {
        Self {
            name: title_case(folder),
            description: format!("{folder} bookmarklet"),
            category: category.to_owned(),
            author: author.to_owned(),
        }
    }

    pub fn merged(mut self, overrides: &MetaOverrides) -> Self {
        if let Some(name) = &overrides.name {
            self.name = name.clone();
        }
        if let Some(description) = &overrides.description {
            self.description = description.clone();
        }
        if let Some(category) = &overrides.category {
            self.category = category.clone();
        }
        if let Some(author) = &overrides.author {
            self.author = author.clone();
        }
        self
    }
}

/// Final `javascript:` artifact for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagedBookmarklet {
    pub meta: BookmarkletMeta,
    pub filename: String,
    pub code: String,
    pub size: usize,
    pub helpers: Vec<String>,
}

fn title_case(folder: &str) -> String {
    folder
        .replace('-', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
