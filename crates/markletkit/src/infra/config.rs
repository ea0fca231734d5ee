//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static WORKSPACE_CONFIG_FILE: &str = "markletkit.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub minify: Minify,
    #[serde(default)]
    pub gallery: Gallery,
    #[serde(default)]
    pub ignore: Ignore,
}

/// Where sources live and where artifacts go. Relative paths resolve
/// against the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Paths {
    #[serde(default)]
    source_dir: Option<PathBuf>,
    #[serde(default)]
    helpers: Option<PathBuf>,
    #[serde(default)]
    out_dir: Option<PathBuf>,
}

impl Paths {
    pub fn source_dir(&self) -> PathBuf {
        self.source_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("bookmarklets/src"))
    }

    pub fn helpers(&self) -> PathBuf {
        self.helpers
            .clone()
            .unwrap_or_else(|| PathBuf::from("bookmarklets/lib/helpers.js"))
    }

    pub fn out_dir(&self) -> PathBuf {
        self.out_dir.clone().unwrap_or_else(|| PathBuf::from("dist"))
    }

    pub fn set_source_dir(&mut self, path: impl Into<PathBuf>) {
        self.source_dir = Some(path.into());
    }

    pub fn set_helpers(&mut self, path: impl Into<PathBuf>) {
        self.helpers = Some(path.into());
    }

    pub fn set_out_dir(&mut self, path: impl Into<PathBuf>) {
        self.out_dir = Some(path.into());
    }
}

/// Metadata used when a unit has no `meta.json` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Defaults {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

impl Defaults {
    pub fn author(&self) -> String {
        self.author.clone().unwrap_or_else(|| "anonymous".into())
    }

    pub fn category(&self) -> String {
        self.category.clone().unwrap_or_else(|| "General".into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Minify {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    drop_debugger: Option<bool>,
}

impl Minify {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn drop_debugger(&self) -> bool {
        self.drop_debugger.unwrap_or(true)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = Some(enabled);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Gallery {
    #[serde(default)]
    title: Option<String>,
    /// Optional minijinja template replacing the built-in page.
    #[serde(default)]
    template: Option<PathBuf>,
}

impl Gallery {
    pub fn title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| "Bookmarklets Collection".into())
    }

    pub fn template(&self) -> Option<PathBuf> {
        self.template.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Ignore {
    /// Globs matched against unit folder names.
    #[serde(default)]
    pub globs: Vec<String>,
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    source_dir: Option<String>,
    out_dir: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            source_dir: env::var("MARKLETKIT_SOURCE_DIR").ok(),
            out_dir: env::var("MARKLETKIT_OUT_DIR").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(source_dir: &str, out_dir: &str) -> Self {
        Self {
            source_dir: Some(source_dir.to_owned()),
            out_dir: Some(out_dir.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading global config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            paths: Paths {
                source_dir: other.paths.source_dir.or(self.paths.source_dir),
                helpers: other.paths.helpers.or(self.paths.helpers),
                out_dir: other.paths.out_dir.or(self.paths.out_dir),
            },
            defaults: Defaults {
                author: other.defaults.author.or(self.defaults.author),
                category: other.defaults.category.or(self.defaults.category),
            },
            minify: Minify {
                enabled: other.minify.enabled.or(self.minify.enabled),
                drop_debugger: other.minify.drop_debugger.or(self.minify.drop_debugger),
            },
            gallery: Gallery {
                title: other.gallery.title.or(self.gallery.title),
                template: other.gallery.template.or(self.gallery.template),
            },
            ignore: merge_ignore(self.ignore, other.ignore),
        }
    }
}

fn merge_ignore(base: Ignore, overlay: Ignore) -> Ignore {
    let mut globs: BTreeSet<String> = base.globs.into_iter().collect();
    globs.extend(overlay.globs);
    Ignore {
        globs: globs.into_iter().collect(),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("markletkit/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(WORKSPACE_CONFIG_FILE)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(source_dir) = env.source_dir {
        config.paths.source_dir = Some(PathBuf::from(source_dir));
    }
    if let Some(out_dir) = env.out_dir {
        config.paths.out_dir = Some(PathBuf::from(out_dir));
    }
    config
}
