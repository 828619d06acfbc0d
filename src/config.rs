//! Configuration for a batch conversion run.
//!
//! All driver behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. The CLI maps its flags onto the builder; library
//! callers set only what they need and keep the defaults for the rest.

use crate::error::BatchError;
use crate::pipeline::wait::{Clock, TokioClock};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default address of the editor page.
pub const DEFAULT_ENTRY_POINT: &str = "http://localhost:8080/playground.html";

/// Configuration for a `.vox` → `.svox` batch run.
///
/// # Example
/// ```rust
/// use vox2svox::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .entry_point("http://127.0.0.1:5173/playground.html")
///     .timeout_ms(5000)
///     .build()
///     .unwrap();
/// assert_eq!(config.timeout_ms, 5000);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// URL of the editor page the session navigates to. Default:
    /// [`DEFAULT_ENTRY_POINT`].
    pub entry_point: String,

    /// Extension of discovered input files, without the dot. Default: `vox`.
    pub source_extension: String,

    /// Extension of written output files, without the dot. Default: `svox`.
    pub target_extension: String,

    /// How long to wait for the editor to produce text for one file. Default: 2000.
    ///
    /// A file that has produced nothing by then is skipped, not retried.
    pub timeout_ms: u64,

    /// Delay between probes of the editor text. Default: 50.
    pub poll_interval_ms: u64,

    /// Browser executable. If None, resolved by [`crate::browser::chrome::find_chrome`].
    pub chrome_path: Option<PathBuf>,

    /// Launch the browser without a window. Default: true.
    pub headless: bool,

    /// How long to wait for the entry point to finish loading. Default: 30000.
    pub navigation_timeout_ms: u64,

    /// Time source for the per-file wait. Default: [`TokioClock`].
    pub clock: Arc<dyn Clock>,

    /// Per-file event sink. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            source_extension: "vox".to_string(),
            target_extension: "svox".to_string(),
            timeout_ms: 2000,
            poll_interval_ms: 50,
            chrome_path: None,
            headless: true,
            navigation_timeout_ms: 30_000,
            clock: Arc::new(TokioClock::new()),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("entry_point", &self.entry_point)
            .field("source_extension", &self.source_extension)
            .field("target_extension", &self.target_extension)
            .field("timeout_ms", &self.timeout_ms)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("chrome_path", &self.chrome_path)
            .field("headless", &self.headless)
            .field("navigation_timeout_ms", &self.navigation_timeout_ms)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl fmt::Debug for BatchConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl BatchConfigBuilder {
    pub fn entry_point(mut self, url: impl Into<String>) -> Self {
        self.config.entry_point = url.into();
        self
    }

    /// Leading dots are stripped, so `.vox` and `vox` are equivalent.
    pub fn source_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.source_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn target_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.target_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn headless(mut self, v: bool) -> Self {
        self.config.headless = v;
        self
    }

    pub fn navigation_timeout_ms(mut self, ms: u64) -> Self {
        self.config.navigation_timeout_ms = ms;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config.clock = clock;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.entry_point.trim().is_empty() {
            return Err(BatchError::InvalidConfig("Entry point URL must not be empty".into()));
        }
        if c.source_extension.is_empty() || c.target_extension.is_empty() {
            return Err(BatchError::InvalidConfig("Extensions must not be empty".into()));
        }
        if c.source_extension == c.target_extension {
            return Err(BatchError::InvalidConfig(format!(
                "Source and target extension are both '.{}'",
                c.source_extension
            )));
        }
        if c.timeout_ms == 0 {
            return Err(BatchError::InvalidConfig("Timeout must be ≥ 1ms".into()));
        }
        if c.poll_interval_ms == 0 {
            return Err(BatchError::InvalidConfig("Poll interval must be ≥ 1ms".into()));
        }
        if c.navigation_timeout_ms == 0 {
            return Err(BatchError::InvalidConfig("Navigation timeout must be ≥ 1ms".into()));
        }
        Ok(self.config)
    }
}
