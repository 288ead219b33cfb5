use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dialoguer::Input;
use dupecull::delete::{self, FsRemover};
use dupecull::report::render_report;
use dupecull::walk::list_folders;
use dupecull::{
    logging, scan_folders, FolderScanner, KeepPolicy, MediaKind, ScanConfig, ScanReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "dupecull", version, about = "Find and remove duplicate images and videos")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find and list duplicate groups
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List duplicates, then delete them after confirmation
    Delete {
        #[command(flatten)]
        scan: ScanArgs,
        /// Delete without asking
        #[arg(long)]
        yes: bool,
    },

    /// List previously deleted duplicates
    History {
        /// Directory that was cleaned
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Media {
    Images,
    Videos,
}

impl From<Media> for MediaKind {
    fn from(media: Media) -> Self {
        match media {
            Media::Images => MediaKind::Images,
            Media::Videos => MediaKind::Videos,
        }
    }
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directory to scan (recursively)
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    path: PathBuf,
    /// Kind of media to compare
    #[arg(long, value_enum, default_value_t = Media::Images)]
    media: Media,
    /// Side length frames are resized to before comparison
    #[arg(long, default_value_t = dupecull::config::DEFAULT_COMPARE_SIZE)]
    compare_size: u32,
    /// Keep the largest file of each group instead of the smallest
    #[arg(long)]
    keep_largest: bool,
    /// Cosine distance below which two files are duplicates
    #[arg(long, default_value_t = dupecull::config::DEFAULT_THRESHOLD)]
    threshold: f64,
}

impl ScanArgs {
    fn config(&self) -> ScanConfig {
        ScanConfig::new(self.media.into())
            .with_compare_size(self.compare_size)
            .with_keep(KeepPolicy::from(self.keep_largest))
            .with_threshold(self.threshold)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Scan { scan, json } => {
            let report = scan_with_progress(&scan, !json)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", render_report(&report));
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Delete { scan, yes } => {
            let report = scan_with_progress(&scan, true)?;
            print!("{}", render_report(&report));

            let deletions = report.deletion_set();
            if deletions.is_empty() {
                return Ok(ExitCode::SUCCESS);
            }

            let confirmed = yes || {
                let answer: String = Input::new()
                    .with_prompt("Print Y to delete")
                    .allow_empty(true)
                    .interact_text()
                    .context("Failed to read confirmation")?;
                delete::is_confirmed(&answer)
            };
            if !confirmed {
                println!("Files not deleted.");
                return Ok(ExitCode::SUCCESS);
            }

            let outcome = delete::delete_files(&deletions, &FsRemover);
            for failure in &outcome.failed {
                eprintln!("⚠️  {}", failure);
            }

            let records = delete::history_records(&report, &outcome);
            if !records.is_empty() {
                let history = delete::append_history(&scan.path, &records).with_context(|| {
                    format!("Failed to write history in {}", scan.path.display())
                })?;
                println!("✅ Recorded deletions in {}", history.display());
            }

            if outcome.is_clean() {
                println!("Done.");
                Ok(ExitCode::SUCCESS)
            } else {
                println!(
                    "Deleted {} of {} file(s); {} failed.",
                    outcome.deleted.len(),
                    deletions.len(),
                    outcome.failed.len()
                );
                Ok(ExitCode::FAILURE)
            }
        }

        Commands::History { path } => {
            let records = delete::read_history(&path).with_context(|| {
                format!("Could not open history in {}", path.display())
            })?;
            println!("🗂️  Deletion History:");
            for (i, rec) in records.iter().enumerate() {
                println!(
                    "[{}] {}\n     kept: {}\n     deleted: {:?}\n     action: {}\n",
                    i, rec.timestamp, rec.retained, rec.deleted, rec.action
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn scan_with_progress(args: &ScanArgs, show_progress: bool) -> Result<ScanReport> {
    let config = args.config();
    config.validate()?;
    let folders = find_folders(&args.path, show_progress)?;

    let progress = if show_progress {
        let bar = ProgressBar::new(0);
        bar.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?);
        bar
    } else {
        ProgressBar::hidden()
    };

    let scanner = FolderScanner::new(config).with_progress(progress.clone());
    let report = benchmark("scanning", || scan(&args.path, &folders, &scanner))?;
    progress.finish_and_clear();
    Ok(report)
}

/// List every folder under `root`, with a spinner while the tree is walked.
fn find_folders(root: &Path, show_progress: bool) -> Result<Vec<PathBuf>> {
    let spinner = if show_progress {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message("Scanning for folders…");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let folders =
        list_folders(root).with_context(|| format!("Failed to scan {}", root.display()))?;
    spinner.finish_with_message(format!("Found {} folder(s)", folders.len()));
    Ok(folders)
}

fn scan(root: &Path, folders: &[PathBuf], scanner: &FolderScanner) -> Result<ScanReport> {
    scan_folders(root, folders, scanner)
        .with_context(|| format!("Failed to scan {}", root.display()))
}

/// Run `f()`, log how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    tracing::info!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}
