//! Putting a packaged bookmarklet on the system clipboard.
//!
//! Backends are tried in order: a command named by `MARKLETKIT_CLIPBOARD`,
//! the native clipboard, then the usual platform tools.

use std::env;
use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

pub const OVERRIDE_VAR: &str = "MARKLETKIT_CLIPBOARD";

/// One way of reaching the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Native,
    Command { program: String, args: Vec<String> },
}

impl Backend {
    fn command(program: &str, args: &[&str]) -> Self {
        Self::Command {
            program: program.to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
        }
    }

    /// Parse a whitespace separated command line such as `xclip -selection clipboard`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::Command {
            program: program.to_owned(),
            args: parts.map(str::to_owned).collect(),
        })
    }

    fn write(&self, text: &str) -> Result<()> {
        match self {
            Self::Native => {
                let mut clipboard = arboard::Clipboard::new().context("native clipboard unavailable")?;
                clipboard
                    .set_text(text.to_owned())
                    .context("native clipboard rejected the text")
            }
            Self::Command { program, args } => pipe_to(program, args, text),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("system clipboard"),
            Self::Command { program, .. } => f.write_str(program),
        }
    }
}

/// Ordered clipboard backends.
#[derive(Debug, Clone)]
pub struct Clipboard {
    backends: Vec<Backend>,
}

impl Clipboard {
    pub fn new() -> Self {
        let override_backend = env::var(OVERRIDE_VAR).ok().and_then(|line| Backend::parse(&line));
        Self::with_backends(backend_order(override_backend))
    }

    pub fn with_backends(backends: Vec<Backend>) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Copy `text` and report which backend took it.
    pub fn copy(&self, text: &str) -> Result<&Backend> {
        for backend in &self.backends {
            match backend.write(text) {
                Ok(()) => {
                    tracing::debug!(%backend, bytes = text.len(), "copied to clipboard");
                    return Ok(backend);
                }
                Err(err) => tracing::debug!(%backend, error = %format_args!("{err:#}"), "clipboard backend failed"),
            }
        }
        bail!("no clipboard backend accepted the bookmarklet (set {OVERRIDE_VAR} to a copy command)")
    }
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

fn backend_order(override_backend: Option<Backend>) -> Vec<Backend> {
    let mut backends: Vec<Backend> = override_backend.into_iter().collect();
    backends.push(Backend::Native);
    backends.extend(platform_commands());
    backends
}

fn pipe_to(program: &str, args: &[String], text: &str) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .with_context(|| format!("failed to write to {program}"))?;
    }

    let status = child.wait().with_context(|| format!("{program} did not exit cleanly"))?;
    if !status.success() {
        bail!("{program} exited with status {status}");
    }
    Ok(())
}

#[cfg(target_os = "macos")]
fn platform_commands() -> Vec<Backend> {
    vec![Backend::command("pbcopy", &[])]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_commands() -> Vec<Backend> {
    vec![
        Backend::command("wl-copy", &[]),
        Backend::command("xclip", &["-selection", "clipboard"]),
        Backend::command("xsel", &["--clipboard", "--input"]),
    ]
}

#[cfg(target_os = "windows")]
fn platform_commands() -> Vec<Backend> {
    vec![Backend::command("clip.exe", &[])]
}

#[cfg(not(any(unix, target_os = "windows")))]
fn platform_commands() -> Vec<Backend> {
    Vec::new()
}
