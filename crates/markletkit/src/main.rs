use std::io;
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use markletkit::app::build::{BuildOptions, Builder};
use markletkit::app::watch::BuildWatcher;
use markletkit::infra::clipboard::Clipboard;
use markletkit::infra::config::Config;

#[derive(Parser)]
#[command(author, version, about = "Build bookmarklets and their gallery", long_about = None)]
struct Cli {
    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(flatten)]
    paths: PathArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PathArgs {
    /// Directory holding one folder per bookmarklet.
    #[arg(long = "src", global = true)]
    source_dir: Option<PathBuf>,
    /// Shared helper library.
    #[arg(long, global = true)]
    helpers: Option<PathBuf>,
    /// Output directory for packaged files and the gallery.
    #[arg(long = "out", global = true)]
    out_dir: Option<PathBuf>,
    /// Ship assembled sources without minifying.
    #[arg(long, global = true)]
    no_minify: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Package every bookmarklet and write the gallery
    Build,
    /// List discovered bookmarklets and the helpers each one needs
    List,
    /// Print one bookmarklet's assembled source
    Inspect {
        unit: String,
        /// Print the packaged `javascript:` URL instead
        #[arg(long)]
        packaged: bool,
    },
    /// Copy one packaged bookmarklet to the clipboard
    Copy { unit: String },
    /// Rebuild whenever sources or helpers change
    Watch,
    /// Print shell completions
    Completions { shell: Shell },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    markletkit::init(cli.verbose);

    if let Commands::Completions { shell } = cli.command {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut io::stdout());
        return Ok(());
    }

    let options = build_options(&cli.paths)?;
    match cli.command {
        Commands::Build => run_build(options),
        Commands::List => run_list(options),
        Commands::Inspect { unit, packaged } => run_inspect(options, &unit, packaged),
        Commands::Copy { unit } => run_copy(options, &unit),
        Commands::Watch => BuildWatcher::new(options).run(),
        Commands::Completions { .. } => Ok(()),
    }
}

fn build_options(args: &PathArgs) -> Result<BuildOptions> {
    let mut config = Config::load()?;
    if let Some(source_dir) = &args.source_dir {
        config.paths.set_source_dir(source_dir);
    }
    if let Some(helpers) = &args.helpers {
        config.paths.set_helpers(helpers);
    }
    if let Some(out_dir) = &args.out_dir {
        config.paths.set_out_dir(out_dir);
    }
    if args.no_minify {
        config.minify.set_enabled(false);
    }
    Ok(BuildOptions::from_config(&config))
}

fn run_build(options: BuildOptions) -> Result<()> {
    let report = Builder::new(options)?.build()?;
    println!(
        "Built {} bookmarklet(s), {:.1} KB total",
        report.packaged.len(),
        report.total_bytes() as f64 / 1024.0
    );
    println!("Gallery: {}", report.gallery_path.display());
    if !report.failures.is_empty() {
        for failure in &report.failures {
            eprintln!("failed: {} ({})", failure.unit, failure.error);
        }
        bail!("{} bookmarklet(s) failed to build", report.failures.len());
    }
    Ok(())
}

fn run_list(options: BuildOptions) -> Result<()> {
    let builder = Builder::new(options)?;
    for plan in builder.plan()? {
        let layout = plan.layout.map(|layout| layout.as_str()).unwrap_or("-");
        match &plan.assembled {
            Ok(assembled) if assembled.helpers.is_empty() => {
                println!("{:<32} {:<12} (no helpers)", plan.name, layout)
            }
            Ok(assembled) => println!(
                "{:<32} {:<12} {}",
                plan.name,
                layout,
                assembled.helpers.join(", ")
            ),
            Err(err) => println!("{:<32} {:<12} error: {err}", plan.name, layout),
        }
    }
    Ok(())
}

fn run_inspect(options: BuildOptions, unit: &str, packaged: bool) -> Result<()> {
    let builder = Builder::new(options)?;
    if packaged {
        println!("{}", builder.package_unit(unit)?.code);
    } else {
        let assembled = builder.assemble_unit(unit)?;
        println!("{}", assembled.source);
    }
    Ok(())
}

fn run_copy(options: BuildOptions, unit: &str) -> Result<()> {
    let bookmarklet = Builder::new(options)?.package_unit(unit)?;
    let clipboard = Clipboard::new();
    let backend = clipboard.copy(&bookmarklet.code)?;
    println!(
        "Copied {} ({} bytes) via {backend}",
        bookmarklet.meta.name, bookmarklet.size
    );
    Ok(())
}
