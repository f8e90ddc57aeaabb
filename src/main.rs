//! multiresize CLI - Batch Image Resizer
//!
//! Mirrors an input directory tree into an output tree, writing each PNG or
//! JPEG once at its original resolution and once per target size.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use serde::Serialize;
use tracing::{debug, info, warn};

use multiresize::parallel::{ConsoleProgressReporter, ReportStyle};
use multiresize::{
    discover_tasks, init_with_config, BatchProcessor, BatchReport, Config, FilterType, Overrides,
    ProcessingEngine, WorkerCount,
};

/// Exit status when `--strict` is set and at least one image failed
const EXIT_TASK_FAILURES: i32 = 2;

/// multiresize - Batch Image Resizer
#[derive(Parser)]
#[command(
    name = "multiresize",
    version,
    about = "Resize every image in a directory tree to several target sizes",
    long_about = "multiresize walks an input directory, and for every PNG or JPEG writes an \
                  unmodified copy plus one variant per target size into a mirrored output \
                  directory. Target sizes apply to the longer side of each image. Files are \
                  processed in parallel."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input directory [default: Imgs]
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output directory [default: resized_images]
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Target sizes in pixels for the longer side, comma separated [default: 100,300,500,2000,5000]
    #[arg(short, long, value_name = "PIXELS", value_delimiter = ',', value_parser = parse_width)]
    widths: Option<Vec<u32>>,

    /// Number of worker threads, or "auto" for one per CPU
    #[arg(short, long, value_name = "COUNT")]
    threads: Option<WorkerCount>,

    /// Configuration file path (.toml or .yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Resampling filter
    #[arg(long, value_enum, value_name = "FILTER")]
    filter: Option<CliFilter>,

    /// JPEG output quality (1-100)
    #[arg(short, long, value_name = "QUALITY", value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Show what would be processed without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Exit with a non-zero status if any image failed
    #[arg(long)]
    strict: bool,

    /// Skip the startup banner
    #[arg(long)]
    no_banner: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    Config {
        /// Configuration file to validate
        file: PathBuf,
    },
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "multiresize.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
}

/// CLI-compatible filter enum
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliFilter {
    Nearest,
    Triangle,
    Catmullrom,
    Gaussian,
    Lanczos3,
}

impl From<CliFilter> for FilterType {
    fn from(filter: CliFilter) -> Self {
        match filter {
            CliFilter::Nearest => FilterType::Nearest,
            CliFilter::Triangle => FilterType::Triangle,
            CliFilter::Catmullrom => FilterType::CatmullRom,
            CliFilter::Gaussian => FilterType::Gaussian,
            CliFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// `--dry-run --json` output
#[derive(Serialize)]
struct DryRunListing<'a> {
    total: usize,
    tasks: Vec<PlannedTask<'a>>,
}

#[derive(Serialize)]
struct PlannedTask<'a> {
    source: &'a Path,
    outputs: Vec<PathBuf>,
}

fn parse_width(s: &str) -> Result<u32, String> {
    match s.trim().parse::<u32>() {
        Ok(0) => Err("Target sizes must be greater than 0".to_string()),
        Ok(width) => Ok(width),
        Err(_) => Err(format!("Invalid target size '{}'", s)),
    }
}

fn main() {
    let mut cli = Cli::parse();

    if let Some(command) = cli.command.take() {
        if let Err(e) = handle_subcommand(command) {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
        return;
    }

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
    };

    init_with_config(&config);

    match run(&cli, &config) {
        Ok(Some(report)) if cli.strict && report.has_failures() => process::exit(EXIT_TASK_FAILURES),
        Ok(_) => {}
        Err(e) => {
            eprintln!("{}: Processing failed: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
    }
}

/// Handle subcommands
fn handle_subcommand(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Config { file } => validate_config_file(&file),
        Commands::ExampleConfig { output, yaml } => generate_example_config(&output, yaml),
    }
}

/// Defaults, then the config file, then command-line flags
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let base = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    let log_level = if cli.quiet {
        Some("error".to_string())
    } else if cli.verbose {
        Some("debug".to_string())
    } else {
        None
    };

    let config = base.merge(Overrides {
        input_folder: cli.input.clone(),
        output_folder: cli.output.clone(),
        target_widths: cli.widths.clone(),
        max_workers: cli.threads,
        filter: cli.filter.map(Into::into),
        jpeg_quality: cli.quality,
        log_level,
    });
    config.validate()?;
    Ok(config)
}

/// Run the batch; `None` for a dry run
fn run(cli: &Cli, config: &Config) -> anyhow::Result<Option<BatchReport>> {
    let show_console = !cli.quiet && !cli.json;
    if show_console && !cli.no_banner {
        print_banner();
    }

    info!("Input: {:?}", config.input_folder);
    info!("Output: {:?}", config.output_folder);
    info!("Target sizes: {:?}", config.target_widths);

    let tasks = discover_tasks(
        &config.input_folder,
        &config.output_folder,
        &config.target_widths,
    )?;
    info!("Found {} files to process", tasks.len());

    if cli.dry_run && cli.json {
        let listing = DryRunListing {
            total: tasks.len(),
            tasks: tasks
                .iter()
                .map(|task| PlannedTask {
                    source: task.source(),
                    outputs: task.output_paths(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(None);
    }

    if cli.dry_run {
        println!("{} files would be processed:", style(tasks.len()).bold());
        for task in &tasks {
            println!("  {}", task.source().display());
            for output in task.output_paths() {
                debug!("    -> {}", output.display());
            }
        }
        return Ok(None);
    }

    let processor = BatchProcessor::new(
        ProcessingEngine::with_config(&config.processing),
        config.max_workers.resolve(),
    );

    if show_console {
        println!("Using {} threads for processing.", processor.workers());
    }

    let report_style = if show_console {
        ReportStyle::detect()
    } else {
        ReportStyle::Silent
    };
    let reporter = ConsoleProgressReporter::new(processor.progress(), report_style);

    let report = std::thread::scope(|scope| {
        let handle = scope.spawn(move || reporter.run());
        let report = processor.run(tasks);
        processor.progress().close();
        reporter_finished(handle.join());
        report
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !cli.quiet {
        report.print_summary();
    }

    Ok(Some(report))
}

/// Log a panicked reporter; the batch result stands either way
fn reporter_finished(joined: std::thread::Result<()>) -> bool {
    match joined {
        Ok(()) => true,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("Progress reporter thread panicked: {}", message);
            false
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", style(r"                 _ _   _                _          ").cyan());
    println!("{}", style(r"  _ __ ___  _   _| | |_(_)_ __ ___  ___(_)_______ ").cyan());
    println!("{}", style(r" | '_ ` _ \| | | | | __| | '__/ _ \/ __| |_  / _ \").cyan());
    println!("{}", style(r" | | | | | | |_| | | |_| | | |  __/\__ \ |/ /  __/").cyan());
    println!("{}", style(r" |_| |_| |_|\__,_|_|\__|_|_|  \___||___/_/___\___|").cyan());
    println!();
    println!("  {} v{}", style("Batch image resizer").bold(), multiresize::VERSION);
    println!();
}

/// Validate configuration file
fn validate_config_file(file_path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(file_path)
        .with_context(|| format!("Failed to load {}", file_path.display()))?;
    config.validate()?;

    println!("{}: Configuration file is valid", style("Success").green().bold());
    println!("Input folder: {}", config.input_folder.display());
    println!("Output folder: {}", config.output_folder.display());
    println!("Target sizes: {:?}", config.target_widths);
    println!("Workers: {}", config.max_workers);

    Ok(())
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path, use_yaml: bool) -> anyhow::Result<()> {
    let output_path = if use_yaml && output_path.extension().is_some_and(|ext| ext == "toml") {
        output_path.with_extension("yaml")
    } else {
        output_path.to_path_buf()
    };

    Config::default().to_file(&output_path)?;

    let format = if use_yaml { "YAML" } else { "TOML" };
    println!(
        "{}: Generated example {} configuration: {}",
        style("Success").green().bold(),
        format,
        output_path.display()
    );

    Ok(())
}
