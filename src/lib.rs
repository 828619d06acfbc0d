//! # vox2svox
//!
//! Batch-convert MagicaVoxel `.vox` models to `.svox` text scenes by driving
//! a browser-hosted voxel editor.
//!
//! The conversion itself happens inside the editor page; this crate is the
//! driver around it. It finds every `.vox` file under an input directory,
//! hands each one to the editor over the Chrome DevTools Protocol, waits for
//! the editor to produce its text serialisation, and writes that text to a
//! mirrored path under the output directory.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input dir
//!  │
//!  ├─ 1. Discover  recursive walk for *.vox
//!  ├─ 2. Encode    raw bytes → base64
//!  ├─ 3. Load      loadMagicaVoxelFromBuffer(b64) in the editor page
//!  ├─ 4. Wait      poll editor.getValue() until non-empty (2 s timeout)
//!  ├─ 5. Polish    line endings → CRLF
//!  └─ 6. Output    out/<same relative path>.svox
//! ```
//!
//! Files are processed one at a time over a single browser session. A file
//! the editor does not convert in time is skipped; any other failure aborts
//! the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vox2svox::{run, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder()
//!         .entry_point("http://localhost:8080/playground.html")
//!         .build()?;
//!     let report = run("models/", "scenes/", &config).await?;
//!     eprintln!("{}/{} converted", report.stats.converted, report.stats.discovered);
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a browser
//!
//! Implement [`ConversionSession`] and call [`run_with_session`]. Pair it
//! with [`pipeline::wait::ManualClock`] to exercise timeouts instantly.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `vox2svox` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `browser-integration` | off | Runs tests that launch a real Chrome |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod browser;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BatchConfig, BatchConfigBuilder, DEFAULT_ENTRY_POINT};
pub use convert::{convert_one, run, run_with_session};
pub use error::{BatchError, FileError};
pub use output::{BatchReport, BatchStats, FileOutcome, FileStatus};
pub use pipeline::discover::{derive_output_path, discover};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::ConversionSession;
