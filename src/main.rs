use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thisthat::generate::{self, BuildError, BuildInput, BuildOptions};
use thisthat::{config, output};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "thisthat")]
#[command(about = "Static site builder for \"this vs that\" comparison articles")]
#[command(long_about = "\
Static site builder for \"this vs that\" comparison articles

A catalog lists the comparisons in reading order; each one is a markdown
body that may hold callout blocks and interactive demo fragments.

Content structure:

  content/
  ├── config.toml                  # Site config (optional)
  ├── catalog.toml                 # [[entries]] slug / title / category, in order
  ├── posts/
  │   └── element-vs-node.md       # Body of entry \"element-vs-node\"
  ├── fragments/
  │   └── mouseenter-vs-mouseover/
  │       └── MouseOverDemo.html   # {% fragment \"MouseOverDemo\" %}
  ├── assets/                      # Copied verbatim
  ├── css/                         # Copied verbatim
  └── robots.txt                   # Copied verbatim

Body tags (each on its own line):
  {% callout %} ... {% endcallout %}   markdown rendered inside a callout box
  {% fragment \"Name\" %}                interactive demo from fragments/<slug>/

Run 'thisthat gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Log build diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log everything, including per-page details
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory
    Build,
    /// Load, render and minify every page without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    match cli.command {
        Command::Build => {
            println!("==> Building {} → {}", cli.source.display(), cli.output.display());
            run(&cli.source, &cli.output, false)?;
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            run(&cli.source, &cli.output, true)?;
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the content directory and build it, printing progress as pages land.
///
/// Ctrl-C stops the build between entries. Entry failures, including entries
/// skipped that way, are listed on stderr and end the process with status 1.
fn run(source: &Path, output_dir: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let input = BuildInput::load(source)?;
    init_thread_pool(&input.config.processing);

    if dry_run {
        output::print_catalog(&input.catalog);
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_build_event(&event) {
                println!("{}", line);
            }
        }
    });

    let options = BuildOptions {
        cancel: Some(cancel_on_interrupt()),
        dry_run,
        events: Some(tx),
    };
    let result = generate::generate(&input, output_dir, &options);
    drop(options);
    printer.join().ok();

    match result {
        Ok(report) => {
            output::print_build_summary(&report);
            Ok(())
        }
        Err(BuildError::EntriesFailed(failures)) => {
            output::print_failures(&failures, input.catalog.len());
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// A flag that flips when the user presses Ctrl-C.
///
/// Without a handler the build still runs; it just cannot be stopped early.
fn cancel_on_interrupt() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if !flag.swap(true, Ordering::SeqCst) {
            eprintln!("==> Interrupted, finishing pages in progress");
        }
    });
    if let Err(e) = installed {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    cancel
}

/// Route `tracing` diagnostics to stderr. Warnings only, unless asked.
fn init_tracing(verbose: bool, debug: bool) {
    let filter_layer = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else if verbose {
        tracing_subscriber::EnvFilter::new("info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    tracing::info!(threads, "initializing worker pool");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
