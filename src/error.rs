//! Error types for the vox2svox library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BatchError`] — **Fatal**: the batch cannot proceed at all (input
//!   directory missing, browser failed to launch, editor unreachable, disk
//!   write failed). Returned as `Err(BatchError)` from the top-level `run*`
//!   functions; the run stops at the first one.
//!
//! * [`FileError`] — **Non-fatal**: a single file did not convert in time.
//!   Stored inside [`crate::output::FileOutcome`] so the caller can see which
//!   inputs were skipped while every other file still gets written.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the vox2svox library.
///
/// Per-file timeouts use [`FileError`] and are stored in
/// [`crate::output::FileOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input directory was not found at the given path.
    #[error("Input directory not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Input path exists but is a file, not a directory.
    #[error("Input path is not a directory: '{path}'")]
    InputNotADirectory { path: PathBuf },

    /// Listing a directory or reading a voxel file failed.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A discovered file does not live under the input root.
    #[error("'{path}' is not inside input directory '{root}'")]
    PathOutsideRoot { path: PathBuf, root: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output directory or write the `.svox` file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Browser errors ────────────────────────────────────────────────────
    /// No Chrome/Chromium executable could be located.
    #[error("Chrome not found — install Google Chrome or Chromium, or set CHROME_PATH")]
    BrowserNotFound,

    /// The browser process could not be started or connected to.
    #[error("Failed to launch browser: {context}")]
    LaunchFailed { context: String },

    /// The editor entry point could not be loaded.
    #[error("Navigation to '{url}' failed: {reason}\nIs the editor being served at that address?")]
    NavigationFailed { url: String, reason: String },

    /// Chrome DevTools Protocol transport or command error.
    #[error("CDP error: {0}")]
    Cdp(String),

    /// A script evaluated in the editor page threw.
    #[error("Evaluation of {action} failed in the editor: {reason}")]
    Evaluation { action: String, reason: String },

    /// An automation round-trip did not answer in time.
    #[error("Timed out after {timeout_ms}ms: {context}")]
    Timeout { timeout_ms: u64, context: String },

    // ── Policy errors ─────────────────────────────────────────────────────
    /// Some files were skipped and the run is in strict mode.
    ///
    /// Returned by [`crate::output::BatchReport::into_result`].
    #[error("{skipped}/{total} files were skipped during conversion")]
    PartialFailure {
        converted: usize,
        skipped: usize,
        total: usize,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single file.
///
/// The batch continues with the next file after recording this.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The editor did not produce any text within the timeout window.
    #[error("Timed out after {timeout_ms}ms waiting for the editor to convert '{path}'")]
    Timeout { path: PathBuf, timeout_ms: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = BatchError::PartialFailure {
            converted: 9,
            skipped: 1,
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
    }

    #[test]
    fn navigation_failed_display() {
        let e = BatchError::NavigationFailed {
            url: "http://localhost:8080/playground.html".into(),
            reason: "net::ERR_CONNECTION_REFUSED".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("playground.html"));
        assert!(msg.contains("ERR_CONNECTION_REFUSED"));
    }

    #[test]
    fn timeout_display() {
        let e = BatchError::Timeout {
            timeout_ms: 30_000,
            context: "CDP Runtime.evaluate".into(),
        };
        assert!(e.to_string().contains("30000ms"));
        assert!(e.to_string().contains("Runtime.evaluate"));
    }

    #[test]
    fn file_timeout_names_the_input() {
        let e = FileError::Timeout {
            path: PathBuf::from("models/castle.vox"),
            timeout_ms: 2000,
        };
        let msg = e.to_string();
        assert!(msg.contains("castle.vox"));
        assert!(msg.contains("2000ms"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = BatchError::OutputWriteFailed {
            path: PathBuf::from("/out/a.svox"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/out/a.svox"));
    }
}
