//! Assembling and packaging one unit into its `javascript:` form.

use anyhow::Result;

use crate::app::detect::resolve_helpers;
use crate::app::helpers::HelperLibrary;
use crate::app::inject::{InjectionPoint, inject_helpers};
use crate::app::minify::{MinifyOptions, minify};
use crate::app::template::substitute_templates;
use crate::domain::errors::BuildError;
use crate::domain::model::{BookmarkletMeta, BookmarkletUnit, PackagedBookmarklet};

pub const SCHEME: &str = "javascript:";

/// Settings shared by every unit in a build.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Disable to ship the assembled source as-is (still single unit).
    pub minify: bool,
    pub minify_options: MinifyOptions,
    pub default_category: String,
    pub default_author: String,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            minify: true,
            minify_options: MinifyOptions::default(),
            default_category: "General".into(),
            default_author: "anonymous".into(),
        }
    }
}

/// A unit after templates and helpers were spliced in, before minification.
#[derive(Debug, Clone)]
pub struct AssembledUnit {
    pub source: String,
    pub helpers: Vec<String>,
    pub injection: Option<InjectionPoint>,
}

/// Turns loaded units into packaged bookmarklets.
#[derive(Debug, Clone)]
pub struct Packager<'a> {
    library: &'a HelperLibrary,
    options: PackageOptions,
}

impl<'a> Packager<'a> {
    pub fn new(library: &'a HelperLibrary, options: PackageOptions) -> Self {
        Self { library, options }
    }

    /// Template substitution, helper resolution and injection.
    pub fn assemble(&self, unit: &BookmarkletUnit) -> Result<AssembledUnit, BuildError> {
        let code = substitute_templates(&unit.logic, unit.template.as_deref(), unit.styles.as_deref())
            .map_err(|source| BuildError::Template {
                unit: unit.name.clone(),
                source,
            })?;

        let helpers = resolve_helpers(
            &unit.name,
            &code,
            unit.overrides.helpers.as_deref(),
            self.library,
        )?;
        let injected = inject_helpers(&code, &helpers, self.library);

        Ok(AssembledUnit {
            source: injected.source,
            helpers,
            injection: injected.point,
        })
    }

    /// Full pipeline for one unit.
    pub fn package(&self, unit: &BookmarkletUnit) -> Result<PackagedBookmarklet, BuildError> {
        let assembled = self.assemble(unit)?;

        let body = if self.options.minify {
            minify(&assembled.source, self.options.minify_options).map_err(|source| {
                BuildError::Minify {
                    unit: unit.name.clone(),
                    source,
                }
            })?
        } else {
            assembled.source
        };

        let code = format!("{SCHEME}{body}");
        let meta = BookmarkletMeta::defaults_for(
            &unit.name,
            &self.options.default_category,
            &self.options.default_author,
        )
        .merged(&unit.overrides);

        tracing::debug!(
            unit = %unit.name,
            helpers = ?assembled.helpers,
            injection = ?assembled.injection,
            bytes = code.len(),
            "packaged unit"
        );

        Ok(PackagedBookmarklet {
            meta,
            filename: format!("{}.js", unit.name),
            size: code.len(),
            code,
            helpers: assembled.helpers,
        })
    }
}
