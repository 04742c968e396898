//! Extension packager and verifier CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use extpack::config::{ExecutionMode, ProbeMode};
use extpack::models::{BuildEvent, EntryKind, ScenarioId, Status, SuiteReport};
use extpack::parser::manifest::parse_manifest_from_file;
use extpack::utils::format_bytes;
use extpack::verifier::{run_suite_with_progress, SuiteContext, SuiteEvent};
use extpack::{ExtpackConfig, VerifyTarget};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "extpack")]
#[command(about = "Package a browser extension and smoke-test the result", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to extpack.toml in the source root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the declared sources into a clean output directory and zip it
    Build {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Run the verification scenarios against a built extension
    Verify {
        #[command(flatten)]
        build: BuildArgs,

        #[command(flatten)]
        verify: VerifyArgs,
    },

    /// Build, then verify the fresh output
    Check {
        #[command(flatten)]
        build: BuildArgs,

        #[command(flatten)]
        verify: VerifyArgs,
    },

    /// Show the manifest and archive of a built extension
    Inspect {
        #[command(flatten)]
        build: BuildArgs,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Extension source root
    #[arg(short, long, default_value = ".")]
    source: PathBuf,

    /// Output directory, relative to the source root
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args)]
struct VerifyArgs {
    /// Directory to verify (defaults to the build output directory)
    #[arg(long)]
    extension_dir: Option<PathBuf>,

    /// Run only these scenarios
    #[arg(long, value_delimiter = ',')]
    only: Vec<ScenarioId>,

    /// Retries per failed scenario (defaults to 2 under CI, 0 otherwise)
    #[arg(long)]
    retries: Option<u32>,

    /// Run scenarios concurrently
    #[arg(long)]
    parallel: bool,

    /// Record runtime probes without requiring them to be true
    #[arg(long)]
    observe: bool,

    /// Chromium executable to launch
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Launch Chromium without its sandbox (containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Write the suite report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the suite report as Markdown
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}", "❌ extpack failed!".red().bold());
            eprintln!("{}", format!("Error: {:#}", e).red());
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// `Ok(false)` means the command ran but reported failures.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Build { build } => {
            let config = load_config(cli.config.as_deref(), &build)?;
            run_build(&config, &build.source)?;
            Ok(true)
        }

        Commands::Verify { build, verify } => {
            let config = load_config(cli.config.as_deref(), &build)?;
            run_verify(config, &build.source, &verify)
        }

        Commands::Check { build, verify } => {
            let config = load_config(cli.config.as_deref(), &build)?;
            run_build(&config, &build.source)?;
            println!();
            run_verify(config, &build.source, &verify)
        }

        Commands::Inspect { build } => {
            let config = load_config(cli.config.as_deref(), &build)?;
            inspect(&config.verify_target(&build.source))?;
            Ok(true)
        }
    }
}

fn load_config(explicit: Option<&Path>, build: &BuildArgs) -> Result<ExtpackConfig> {
    let mut config = match explicit {
        Some(path) => ExtpackConfig::load(path)?,
        None => ExtpackConfig::discover(&build.source)?,
    };
    if let Some(out_dir) = &build.out_dir {
        config.build.out_dir = out_dir.clone();
    }
    Ok(config)
}

fn run_build(config: &ExtpackConfig, source: &Path) -> Result<()> {
    println!("{}", "Extension Packager".bold().blue());
    println!("{}", "=".repeat(50).blue());

    let result = extpack::package_with_progress(&config.build, source, |event| match event {
        BuildEvent::Cleaned { out_dir } => {
            println!("🧹 Cleaned: {}", out_dir.display());
        }
        BuildEvent::Copied(entry) => match entry.kind {
            EntryKind::File => println!("{} {}", "✅ Copied:".green(), entry.path.display()),
            EntryKind::Directory => println!(
                "{} {} ({} files)",
                "✅ Copied directory:".green(),
                entry.path.display(),
                entry.files
            ),
        },
        BuildEvent::Skipped(path) => {
            println!("{}", format!("   Skipped (not found): {}", path.display()).dimmed());
        }
        BuildEvent::Archived(archive) => {
            println!("📦 ZIP created: {} bytes", archive.size_bytes);
        }
    })
    .context("Build failed")?;

    println!(
        "{}",
        format!(
            "✅ Build written to {} and {}",
            result.out_dir.display(),
            result.archive.path.display()
        )
        .green()
        .bold()
    );
    println!(
        "   {} files, {} copied",
        result.copied_files(),
        format_bytes(result.copied_bytes())
    );
    Ok(())
}

fn run_verify(mut config: ExtpackConfig, source: &Path, args: &VerifyArgs) -> Result<bool> {
    if let Some(dir) = &args.extension_dir {
        config.verify.extension_dir = Some(dir.clone());
    }
    if !args.only.is_empty() {
        config.verify.only = args.only.clone();
    }
    if args.retries.is_some() {
        config.verify.retries = args.retries;
    }
    if args.parallel {
        config.verify.execution = ExecutionMode::Parallel;
    }
    if args.observe {
        config.verify.probe = ProbeMode::Observe;
    }
    if let Some(chrome) = &args.chrome {
        config.verify.chrome_executable = Some(chrome.clone());
    }
    if args.no_sandbox {
        config.verify.no_sandbox = true;
    }

    let target = config.verify_target(source);
    println!("{}", "Extension Verification".bold().blue());
    println!("{}", "=".repeat(50).blue());
    println!("Target: {}", target.extension_dir.display());
    println!();

    let spinner = if std::io::stdout().is_terminal() {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    } else {
        ProgressBar::hidden()
    };

    let runtime = tokio::runtime::Runtime::new()
        .context("failed to initialize async runtime")?;

    let ctx = SuiteContext::new(target, config.verify.clone());
    let report = runtime.block_on(run_suite_with_progress(ctx, &|event| match event {
        SuiteEvent::Started(id) => spinner.set_message(id.title()),
        SuiteEvent::Retrying { id, attempt, error } => spinner.println(format!(
            "{} {} (attempt {}): {}",
            "↻ retrying".yellow(),
            id,
            attempt,
            error
        )),
        SuiteEvent::Finished(outcome) => {
            let line = match outcome.status {
                Status::Passed => format!(
                    "{} {} {}",
                    "✓".green(),
                    outcome.title,
                    format!("({} ms)", outcome.duration_ms).dimmed()
                ),
                Status::Failed => format!(
                    "{} {}\n    {}",
                    "✘".red(),
                    outcome.title,
                    outcome.message.as_deref().unwrap_or_default().red()
                ),
            };
            if spinner.is_hidden() {
                println!("{}", line);
            } else {
                spinner.println(line);
            }
        }
    }));
    spinner.finish_and_clear();

    print_summary(&report);

    if let Some(path) = &args.json {
        extpack::report::write_json_report(&report, path)?;
        println!("  - JSON report: {}", path.display());
    }
    if let Some(path) = &args.report {
        extpack::report::write_markdown_report(&report, path)?;
        println!("  - Report: {}", path.display());
    }

    Ok(report.all_passed())
}

fn print_summary(report: &SuiteReport) {
    println!();
    println!("📊 Summary:");
    println!("  - Passed: {}", report.passed_count().to_string().green());
    println!("  - Failed: {}", report.failed_count().to_string().red());
    println!("  - Duration: {} ms", report.duration_ms);

    if report.all_passed() {
        println!("{}", "✅ All scenarios passed!".green().bold());
    } else {
        println!("{}", "❌ Some scenarios failed".red().bold());
    }
}

fn inspect(target: &VerifyTarget) -> Result<()> {
    let manifest_path = target.extension_dir.join("manifest.json");
    let manifest = parse_manifest_from_file(&manifest_path)?;

    println!("{}", "📊 Extension".bold().blue());
    println!("{}", "=".repeat(50).blue());
    println!(
        "Name: {} v{}",
        manifest.name,
        manifest.version.as_deref().unwrap_or("?")
    );
    match manifest.manifest_version {
        Some(version) => println!("Manifest Version: {}", version),
        None => println!("Manifest Version: {}", "missing".red()),
    }
    match &manifest.permissions {
        Some(permissions) => println!("Permissions: {}", permissions.join(", ")),
        None => println!("Permissions: {}", "missing".red()),
    }
    println!("Service worker: {}", manifest.service_worker().unwrap_or("-"));
    println!("Popup: {}", manifest.popup().unwrap_or("-"));
    for script in manifest.content_script_paths() {
        println!("Content script: {}", script);
    }

    let archive_path = target.archive_path();
    println!();
    if archive_path.is_file() {
        let entries = extpack::packager::list_archive(&archive_path)?;
        let size = std::fs::metadata(&archive_path)
            .with_context(|| format!("Failed to stat {}", archive_path.display()))?
            .len();
        println!(
            "📦 {}: {} entries, {}",
            archive_path.display(),
            entries.len(),
            format_bytes(size)
        );
        for name in entries {
            println!("  - {}", name);
        }
    } else {
        println!("{}", format!("No archive at {}", archive_path.display()).yellow());
    }

    Ok(())
}
