use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest with default configuration
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Build every bookmarklet and the gallery into the output directory
    Bundle {
        /// Override the output directory
        #[arg(long)]
        out: Option<String>,
        /// Keep artifacts readable
        #[arg(long)]
        no_minify: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile, release)?,
        Commands::Bundle { out, no_minify } => run_bundle(out, no_minify)?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("nextest").arg("run");
    if let Some(profile) = profile {
        cmd.arg("--profile").arg(profile);
    }
    if release {
        cmd.arg("--release");
    }
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("cargo nextest run failed");
    }
    Ok(())
}

fn run_bundle(out: Option<String>, no_minify: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["run", "--quiet", "-p", "markletkit", "--", "build"]);
    if let Some(out) = out {
        cmd.arg("--out").arg(out);
    }
    if no_minify {
        cmd.arg("--no-minify");
    }
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("bookmarklet build failed");
    }
    Ok(())
}
