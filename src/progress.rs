//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the driver works through the input tree.
//!
//! # Example
//!
//! ```rust
//! use vox2svox::{BatchConfig, ConversionProgressCallback};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, output: &Path, bytes: usize) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{index}/{total}] {} ({bytes} bytes)", output.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the driver as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Files are processed one at a time, so calls never
/// overlap, but the trait is `Send + Sync` so a callback can be shared with
/// other tasks.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after discovery, before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file's bytes are sent to the editor.
    ///
    /// `index` is 1-based.
    fn on_file_start(&self, index: usize, total_files: usize, input: &Path) {
        let _ = (index, total_files, input);
    }

    /// Called after the `.svox` file has been written.
    ///
    /// `bytes` is the size of the written file.
    fn on_file_complete(&self, index: usize, total_files: usize, output: &Path, bytes: usize) {
        let _ = (index, total_files, output, bytes);
    }

    /// Called when a file is skipped because the editor timed out.
    fn on_file_skipped(&self, index: usize, total_files: usize, input: &Path, reason: &str) {
        let _ = (index, total_files, input, reason);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, total_files: usize, converted: usize) {
        let _ = (total_files, converted);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
