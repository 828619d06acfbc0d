//! CLI binary for vox2svox.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`
//! and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vox2svox::{
    run, BatchConfig, BatchReport, ConversionProgressCallback, ProgressCallback,
    DEFAULT_ENTRY_POINT,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` reports how many files were found.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening editor…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Take the bar off screen when the batch ends without `on_batch_complete`.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.activate_bar(total_files);
    }

    fn on_file_start(&self, _index: usize, _total: usize, input: &Path) {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.set_message(name);
    }

    fn on_file_complete(&self, index: usize, total: usize, output: &Path, bytes: usize) {
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}",
            green("✓"),
            index,
            total,
            output.display(),
            dim(&format!("{bytes} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_file_skipped(&self, index: usize, total: usize, input: &Path, reason: &str) {
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}",
            yellow("⏱"),
            index,
            total,
            input.display(),
            yellow(reason),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total_files: usize, _converted: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every .vox under models/ into scenes/
  vox2svox models/ scenes/

  # Editor served elsewhere, longer per-file timeout
  vox2svox --entry-point http://127.0.0.1:5173/playground.html --timeout-ms 5000 models/ scenes/

  # Fail the run (exit 1) if any file timed out
  vox2svox --strict models/ scenes/

  # Watch the browser while it works
  vox2svox --headful models/ scenes/

  # Machine-readable report
  vox2svox --json models/ scenes/ > report.json

ENVIRONMENT VARIABLES:
  CHROME_PATH              Browser executable (overridden by --chrome)
  VOX2SVOX_ENTRY_POINT     Editor URL
  VOX2SVOX_TIMEOUT_MS      Per-file timeout
  RUST_LOG                 Log filter, e.g. vox2svox=debug
"#;

/// Batch-convert MagicaVoxel .vox files to .svox through the voxel editor.
#[derive(Parser, Debug)]
#[command(
    name = "vox2svox",
    version,
    about = "Batch-convert MagicaVoxel .vox files to .svox through the voxel editor",
    long_about = "Recursively finds .vox files under INPUT_DIR, loads each into the browser-hosted \
voxel editor, and writes the editor's text serialisation to the mirrored path under OUTPUT_DIR \
with a .svox extension.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory searched recursively for .vox files.
    input_dir: PathBuf,

    /// Directory the .svox tree is written to.
    output_dir: PathBuf,

    /// URL of the editor page.
    #[arg(long, env = "VOX2SVOX_ENTRY_POINT", default_value = DEFAULT_ENTRY_POINT)]
    entry_point: String,

    /// Per-file wait for the editor to produce output, in milliseconds.
    #[arg(long, env = "VOX2SVOX_TIMEOUT_MS", default_value_t = 2000)]
    timeout_ms: u64,

    /// Delay between checks of the editor output, in milliseconds.
    #[arg(long, env = "VOX2SVOX_POLL_INTERVAL_MS", default_value_t = 50)]
    poll_interval_ms: u64,

    /// Exit non-zero when any file was skipped.
    #[arg(long, env = "VOX2SVOX_STRICT")]
    strict: bool,

    /// Chrome/Chromium executable.
    #[arg(long, env = "VOX2SVOX_CHROME")]
    chrome: Option<PathBuf>,

    /// Show the browser window instead of running headless.
    #[arg(long, env = "VOX2SVOX_HEADFUL")]
    headful: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "VOX2SVOX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "VOX2SVOX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VOX2SVOX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VOX2SVOX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // With the progress bar active, per-file INFO lines would fight the bar,
    // so the library is held to errors and the callback does the reporting.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb = progress
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let result = run(&cli.input_dir, &cli.output_dir, &config).await;

    // A fatal error skips on_batch_complete; don't leave the bar on screen.
    if let Some(ref cb) = progress {
        cb.abandon();
    }
    let report = result.context("Conversion failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report, &cli.output_dir);
    }

    report.into_result(cli.strict).context("Strict mode")?;
    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .entry_point(cli.entry_point.clone())
        .timeout_ms(cli.timeout_ms)
        .poll_interval_ms(cli.poll_interval_ms)
        .headless(!cli.headful);

    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_path(chrome.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &BatchReport, output_dir: &Path) {
    let stats = &report.stats;
    let mark = if stats.skipped == 0 {
        green("✔")
    } else if stats.converted == 0 && stats.discovered > 0 {
        red("✘")
    } else {
        yellow("⚠")
    };
    eprintln!(
        "{}  {}/{} files  {}ms  →  {}",
        mark,
        stats.converted,
        stats.discovered,
        stats.duration_ms,
        bold(&output_dir.display().to_string()),
    );
    for (input, error) in report.skipped() {
        eprintln!("   {} {}  {}", yellow("skipped"), input.display(), dim(&error.to_string()));
    }
}
