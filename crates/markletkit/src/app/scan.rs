//! Discovery of bookmarklet units in the source tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::domain::errors::BuildError;
use crate::domain::model::{BookmarkletUnit, MetaOverrides};

pub const ENTRY_FILE: &str = "index.js";
pub const TEMPLATE_FILE: &str = "template.html";
pub const STYLES_FILE: &str = "styles.css";
pub const META_FILE: &str = "meta.json";

/// A unit folder found on disk, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSource {
    pub name: String,
    pub dir: PathBuf,
}

/// Walks the immediate children of the source directory.
#[derive(Debug, Clone)]
pub struct UnitScanner {
    root: PathBuf,
    ignore: GlobSet,
}

impl UnitScanner {
    pub fn new(root: impl Into<PathBuf>, ignore_globs: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in ignore_globs {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid unit ignore glob '{pattern}'"))?;
            builder.add(glob);
        }
        let ignore = builder.build().context("failed to build unit ignore matcher")?;
        Ok(Self {
            root: root.into(),
            ignore,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unit folders sorted by name. Folders without an entry file are
    /// skipped with a warning.
    pub fn discover(&self) -> Result<Vec<UnitSource>> {
        if !self.root.is_dir() {
            anyhow::bail!("source directory not found: {}", self.root.display());
        }

        let mut units = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .max_depth(Some(1))
            .hidden(true)
            .git_ignore(true)
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read source entry");
                    continue;
                }
            };
            if entry.depth() != 1 || !entry.file_type().is_some_and(|kind| kind.is_dir()) {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 folder name");
                continue;
            };
            if self.ignore.is_match(&name) {
                tracing::debug!(unit = %name, "ignored by configuration");
                continue;
            }
            if !entry.path().join(ENTRY_FILE).is_file() {
                tracing::warn!(unit = %name, "skipping: no {ENTRY_FILE} found");
                continue;
            }
            units.push(UnitSource {
                name,
                dir: entry.path().to_path_buf(),
            });
        }

        units.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(units)
    }
}

impl UnitSource {
    /// Read the unit's logic, optional templates and optional metadata.
    pub fn load(&self) -> Result<BookmarkletUnit, BuildError> {
        let logic = read_required(&self.dir.join(ENTRY_FILE))?;
        let template = read_optional(&self.dir.join(TEMPLATE_FILE))?;
        let styles = read_optional(&self.dir.join(STYLES_FILE))?;

        let meta_path = self.dir.join(META_FILE);
        let overrides = match read_optional(&meta_path)? {
            Some(raw) => serde_json::from_str::<MetaOverrides>(&raw).map_err(|source| {
                BuildError::InvalidMeta {
                    path: meta_path.clone(),
                    source,
                }
            })?,
            None => MetaOverrides::default(),
        };

        Ok(BookmarkletUnit {
            name: self.name.clone(),
            dir: self.dir.clone(),
            logic,
            template,
            styles,
            overrides,
        })
    }
}

fn read_required(path: &Path) -> Result<String, BuildError> {
    fs::read_to_string(path).map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional(path: &Path) -> Result<Option<String>, BuildError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(BuildError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
