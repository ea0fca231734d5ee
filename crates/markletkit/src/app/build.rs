//! Build orchestration: discover, package, write, and publish the gallery.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::app::gallery::GalleryGenerator;
use crate::app::helpers::HelperLibrary;
use crate::app::minify::MinifyOptions;
use crate::app::package::{AssembledUnit, PackageOptions, Packager};
use crate::app::scan::{UnitScanner, UnitSource};
use crate::domain::errors::BuildError;
use crate::domain::model::{BookmarkletUnit, PackagedBookmarklet, UnitLayout};
use crate::infra::config::Config;
use crate::infra::fs::write_atomic;

pub const GALLERY_FILE: &str = "index.html";

/// Inputs for one build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub source_dir: PathBuf,
    pub helpers_path: PathBuf,
    pub out_dir: PathBuf,
    pub ignore_globs: Vec<String>,
    pub package: PackageOptions,
    pub gallery_title: String,
    pub gallery_template: Option<PathBuf>,
}

impl BuildOptions {
    /// Build options from configuration defaults.
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_dir: config.paths.source_dir(),
            helpers_path: config.paths.helpers(),
            out_dir: config.paths.out_dir(),
            ignore_globs: config.ignore.globs.clone(),
            package: PackageOptions {
                minify: config.minify.enabled(),
                minify_options: MinifyOptions {
                    drop_debugger: config.minify.drop_debugger(),
                },
                default_category: config.defaults.category(),
                default_author: config.defaults.author(),
            },
            gallery_title: config.gallery.title(),
            gallery_template: config.gallery.template(),
        }
    }
}

/// A unit that was skipped because it failed to package.
#[derive(Debug)]
pub struct UnitFailure {
    pub unit: String,
    pub error: BuildError,
}

/// Outcome of a build run.
#[derive(Debug)]
pub struct BuildReport {
    pub packaged: Vec<PackagedBookmarklet>,
    pub failures: Vec<UnitFailure>,
    pub gallery_path: PathBuf,
}

impl BuildReport {
    pub fn total_bytes(&self) -> usize {
        self.packaged.iter().map(|b| b.size).sum()
    }
}

/// Per-unit summary used by `list` and `inspect`.
#[derive(Debug)]
pub struct UnitPlan {
    pub name: String,
    pub layout: Option<UnitLayout>,
    pub assembled: Result<AssembledUnit, BuildError>,
}

/// Runs the build pipeline.
pub struct Builder {
    options: BuildOptions,
    library: HelperLibrary,
}

impl Builder {
    /// Load the helper library named by `options`.
    pub fn new(options: BuildOptions) -> Result<Self> {
        let library = HelperLibrary::load(&options.helpers_path)?;
        Ok(Self { options, library })
    }

    pub fn with_library(options: BuildOptions, library: HelperLibrary) -> Self {
        Self { options, library }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn library(&self) -> &HelperLibrary {
        &self.library
    }

    fn discover(&self) -> Result<Vec<UnitSource>> {
        UnitScanner::new(&self.options.source_dir, &self.options.ignore_globs)?.discover()
    }

    /// Package every unit, write the artifacts, then render the gallery.
    ///
    /// A failing unit is logged and skipped. Failing to produce the gallery
    /// fails the whole build.
    pub fn build(&self) -> Result<BuildReport> {
        let units = self.discover()?;
        tracing::info!(
            units = units.len(),
            helpers = self.library.len(),
            source = %self.options.source_dir.display(),
            "building bookmarklets"
        );

        let packager = Packager::new(&self.library, self.options.package.clone());
        let results: Vec<(String, Result<PackagedBookmarklet, BuildError>)> = units
            .par_iter()
            .map(|source| {
                let outcome = source.load().and_then(|unit| {
                    tracing::debug!(unit = %unit.name, layout = unit.layout().as_str(), "assembling");
                    packager.package(&unit)
                });
                (source.name.clone(), outcome)
            })
            .collect();

        let mut packaged = Vec::new();
        let mut failures = Vec::new();
        for (unit, outcome) in results {
            match outcome.and_then(|bookmarklet| self.write_unit(bookmarklet)) {
                Ok(bookmarklet) => {
                    tracing::info!(unit = %unit, bytes = bookmarklet.size, "built {}", bookmarklet.filename);
                    packaged.push(bookmarklet);
                }
                Err(error) => {
                    tracing::error!(unit = %unit, error = %error_chain(&error), "skipping unit");
                    failures.push(UnitFailure { unit, error });
                }
            }
        }

        let gallery_path = self.options.out_dir.join(GALLERY_FILE);
        let html = GalleryGenerator::new(self.options.gallery_title.clone())
            .with_template(self.options.gallery_template.clone())
            .render_now(&packaged)
            .context("failed to generate gallery")?;
        write_atomic(&gallery_path, html.as_bytes())
            .with_context(|| format!("failed to write gallery to {}", gallery_path.display()))?;
        tracing::info!(count = packaged.len(), path = %gallery_path.display(), "generated gallery");

        Ok(BuildReport {
            packaged,
            failures,
            gallery_path,
        })
    }

    fn write_unit(&self, bookmarklet: PackagedBookmarklet) -> Result<PackagedBookmarklet, BuildError> {
        let path = self.options.out_dir.join(&bookmarklet.filename);
        write_atomic(&path, bookmarklet.code.as_bytes()).map_err(|err| BuildError::Write {
            path: path.clone(),
            source: std::io::Error::other(format!("{err:#}")),
        })?;
        Ok(bookmarklet)
    }

    /// Assemble every unit without minifying or writing anything.
    pub fn plan(&self) -> Result<Vec<UnitPlan>> {
        let packager = Packager::new(&self.library, self.options.package.clone());
        let plans = self
            .discover()?
            .into_iter()
            .map(|source| {
                let loaded = source.load();
                let layout = loaded.as_ref().ok().map(BookmarkletUnit::layout);
                UnitPlan {
                    name: source.name,
                    layout,
                    assembled: loaded.and_then(|unit| packager.assemble(&unit)),
                }
            })
            .collect();
        Ok(plans)
    }

    /// Assemble a single unit by folder name.
    pub fn assemble_unit(&self, name: &str) -> Result<AssembledUnit> {
        let source = self
            .discover()?
            .into_iter()
            .find(|unit| unit.name == name)
            .with_context(|| format!("no bookmarklet named '{name}' in {}", self.options.source_dir.display()))?;
        let unit = source.load()?;
        let packager = Packager::new(&self.library, self.options.package.clone());
        Ok(packager.assemble(&unit)?)
    }

    /// Package a single unit by folder name without writing it.
    pub fn package_unit(&self, name: &str) -> Result<PackagedBookmarklet> {
        let source = self
            .discover()?
            .into_iter()
            .find(|unit| unit.name == name)
            .with_context(|| format!("no bookmarklet named '{name}' in {}", self.options.source_dir.display()))?;
        let unit = source.load()?;
        let packager = Packager::new(&self.library, self.options.package.clone());
        Ok(packager.package(&unit)?)
    }
}

fn error_chain(error: &BuildError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
