//! Batch conversion entry points.
//!
//! [`run`] is the one-call API: launch a browser, point it at the editor, and
//! convert every `.vox` file under the input root. [`run_with_session`] does
//! the same over any [`ConversionSession`], which is how the driver is tested
//! without a browser. [`convert_one`] is the per-file step both of them loop
//! over.
//!
//! Files are converted strictly one after another over a single session. A
//! file whose conversion times out is skipped; every other error ends the
//! run.

use crate::browser::{chrome, EditorSession};
use crate::config::BatchConfig;
use crate::error::{BatchError, FileError};
use crate::output::{BatchReport, BatchStats, FileOutcome, FileStatus};
use crate::pipeline::{discover, encode, postprocess, wait};
use crate::session::ConversionSession;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Convert every source file under `input_root` into `output_root`.
///
/// Launches the browser described by `config`, then delegates to
/// [`run_with_session`].
///
/// # Errors
/// Returns `Err(BatchError)` only for fatal errors:
/// - browser missing or failed to launch
/// - editor entry point unreachable
/// - input directory missing, unreadable, or an output write failing
///
/// Timed-out files are reported in the returned [`BatchReport`]; apply the
/// strict policy with [`BatchReport::into_result`].
pub async fn run(
    input_root: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<BatchReport, BatchError> {
    let chrome_path =
        chrome::find_chrome(config.chrome_path.as_deref()).ok_or(BatchError::BrowserNotFound)?;
    info!("Launching browser: {}", chrome_path.display());

    let session = EditorSession::launch(&chrome_path, config).await?;
    run_with_session(&session, input_root, output_root, config).await
}

/// Convert every source file under `input_root` using an existing session.
///
/// The session is opened on `config.entry_point` first and is always closed
/// before returning, whether the run succeeded or not. A failure to close is
/// logged and otherwise ignored.
pub async fn run_with_session(
    session: &dyn ConversionSession,
    input_root: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<BatchReport, BatchError> {
    let result = drive(session, input_root.as_ref(), output_root.as_ref(), config).await;

    if let Err(e) = session.close().await {
        error!("Failed to close session: {}", e);
    }

    if let Err(ref e) = result {
        debug!("Batch aborted: {}", e);
    }
    result
}

/// Convert a single file over `session`.
///
/// 1. create the output's parent directory
/// 2. read and base64-encode the input
/// 3. load it into the editor
/// 4. poll the editor text until non-empty or `config.timeout_ms` elapses
/// 5. on timeout, dismiss any error UI and report [`FileStatus::Skipped`]
/// 6. otherwise write the text with CRLF line endings, replacing any
///    existing file
pub async fn convert_one(
    session: &dyn ConversionSession,
    input: &Path,
    output: &Path,
    config: &BatchConfig,
) -> Result<FileStatus, BatchError> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BatchError::OutputWriteFailed {
                path: output.to_path_buf(),
                source: e,
            })?;
    }

    let bytes = tokio::fs::read(input)
        .await
        .map_err(|e| BatchError::ReadFailed {
            path: input.to_path_buf(),
            source: e,
        })?;
    let b64 = encode::encode_buffer(&bytes);
    drop(bytes);

    session.load_buffer(&b64).await?;

    let text = wait::await_condition(
        config.clock.as_ref(),
        config.timeout(),
        config.poll_interval(),
        || async {
            let text = session.read_result().await?;
            Ok::<_, BatchError>((!text.is_empty()).then_some(text))
        },
    )
    .await?;

    let Some(text) = text else {
        warn!(
            "Timed out after {}ms converting {}",
            config.timeout_ms,
            input.display()
        );
        session.dismiss().await?;
        return Ok(FileStatus::Skipped {
            error: FileError::Timeout {
                path: input.to_path_buf(),
                timeout_ms: config.timeout_ms,
            },
        });
    };

    let normalised = postprocess::normalise_line_endings(&text);
    write_output(output, &normalised, &config.target_extension).await?;
    info!("Wrote {}", output.display());

    Ok(FileStatus::Converted {
        bytes: normalised.len(),
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn drive(
    session: &dyn ConversionSession,
    input_root: &Path,
    output_root: &Path,
    config: &BatchConfig,
) -> Result<BatchReport, BatchError> {
    let start = Instant::now();

    info!("Opening editor at {}", config.entry_point);
    session.open(&config.entry_point).await?;

    let inputs = discover::discover(input_root, &config.source_extension).await?;
    let total = inputs.len();
    info!("Found {} .{} files under {}", total, config.source_extension, input_root.display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut files = Vec::with_capacity(total);
    for (i, input) in inputs.into_iter().enumerate() {
        let index = i + 1;
        let output = discover::derive_output_path(
            input_root,
            output_root,
            &input,
            &config.source_extension,
            &config.target_extension,
        )?;
        debug!("[{}/{}] {} → {}", index, total, input.display(), output.display());

        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(index, total, &input);
        }

        let status = convert_one(session, &input, &output, config).await?;

        if let Some(ref cb) = config.progress_callback {
            match &status {
                FileStatus::Converted { bytes } => cb.on_file_complete(index, total, &output, *bytes),
                FileStatus::Skipped { error } => {
                    cb.on_file_skipped(index, total, &input, &error.to_string())
                }
            }
        }

        files.push(FileOutcome {
            input,
            output,
            status,
        });
    }

    let converted = files.iter().filter(|f| f.is_converted()).count();
    let stats = BatchStats {
        discovered: total,
        converted,
        skipped: total - converted,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} files converted, {}ms total",
        stats.converted, stats.discovered, stats.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, converted);
    }

    Ok(BatchReport { files, stats })
}

/// Write via a sibling temp file and rename, so an interrupted run never
/// leaves a truncated output behind.
async fn write_output(path: &Path, contents: &str, target_ext: &str) -> Result<(), BatchError> {
    let write_failed = |source| BatchError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let tmp_path = path.with_extension(format!("{target_ext}.tmp"));
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::wait::{Clock, ManualClock};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Editor stand-in: answers with `reply` after `ready_after` reads.
    struct ScriptedSession {
        reply: String,
        ready_after: usize,
        reads: Mutex<usize>,
        loaded: Mutex<Vec<String>>,
        dismissed: Mutex<usize>,
        stall_reads: bool,
        dismiss_fails: bool,
    }

    impl ScriptedSession {
        fn new(reply: &str, ready_after: usize) -> Self {
            Self {
                reply: reply.to_string(),
                ready_after,
                reads: Mutex::new(0),
                loaded: Mutex::new(Vec::new()),
                dismissed: Mutex::new(0),
                stall_reads: false,
                dismiss_fails: false,
            }
        }
    }

    #[async_trait]
    impl ConversionSession for ScriptedSession {
        async fn open(&self, _entry_point: &str) -> Result<(), BatchError> {
            Ok(())
        }

        async fn load_buffer(&self, base64: &str) -> Result<(), BatchError> {
            self.loaded.lock().unwrap().push(base64.to_string());
            *self.reads.lock().unwrap() = 0;
            Ok(())
        }

        async fn read_result(&self) -> Result<String, BatchError> {
            if self.stall_reads {
                std::future::pending::<()>().await;
            }
            let mut reads = self.reads.lock().unwrap();
            *reads += 1;
            if *reads > self.ready_after {
                Ok(self.reply.clone())
            } else {
                Ok(String::new())
            }
        }

        async fn dismiss(&self) -> Result<(), BatchError> {
            *self.dismissed.lock().unwrap() += 1;
            if self.dismiss_fails {
                return Err(BatchError::Cdp("Input.dispatchKeyEvent: target closed".into()));
            }
            Ok(())
        }
    }

    fn config() -> BatchConfig {
        BatchConfig::builder()
            .clock(Arc::new(ManualClock::new()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn convert_one_writes_crlf_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.vox");
        let output = dir.path().join("out/deep/a.svox");
        std::fs::write(&input, b"VOX ").unwrap();

        let session = ScriptedSession::new("line1\nline2\n", 3);
        let status = convert_one(&session, &input, &output, &config()).await.unwrap();

        assert_eq!(status, FileStatus::Converted { bytes: 14 });
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "line1\r\nline2\r\n");
        assert_eq!(session.loaded.lock().unwrap().as_slice(), ["Vk9YIA=="]);
        assert_eq!(*session.dismissed.lock().unwrap(), 0);
        assert!(!output.with_extension("svox.tmp").exists());
    }

    #[tokio::test]
    async fn convert_one_timeout_skips_and_dismisses() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slow.vox");
        let output = dir.path().join("out/slow.svox");
        std::fs::write(&input, b"VOX ").unwrap();

        let session = ScriptedSession::new("never", usize::MAX);
        let status = convert_one(&session, &input, &output, &config()).await.unwrap();

        assert_eq!(
            status,
            FileStatus::Skipped {
                error: FileError::Timeout {
                    path: input.clone(),
                    timeout_ms: 2000
                }
            }
        );
        assert!(!output.exists());
        assert_eq!(*session.dismissed.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn convert_one_overwrites_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.vox");
        let output = dir.path().join("a.svox");
        std::fs::write(&input, b"VOX ").unwrap();
        std::fs::write(&output, "stale contents that are longer than the new ones").unwrap();

        let session = ScriptedSession::new("fresh", 0);
        convert_one(&session, &input, &output, &config()).await.unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "fresh");
    }

    #[tokio::test]
    async fn convert_one_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let session = ScriptedSession::new("x", 0);
        let err = convert_one(
            &session,
            &dir.path().join("gone.vox"),
            &dir.path().join("gone.svox"),
            &config(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BatchError::ReadFailed { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn convert_one_stalled_editor_times_out_on_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("busy.vox");
        let output = dir.path().join("busy.svox");
        std::fs::write(&input, b"VOX ").unwrap();

        let mut session = ScriptedSession::new("never", 0);
        session.stall_reads = true;
        let clock = Arc::new(ManualClock::new());
        let config = BatchConfig::builder().clock(clock.clone()).build().unwrap();

        let status = convert_one(&session, &input, &output, &config).await.unwrap();

        assert!(matches!(status, FileStatus::Skipped { .. }), "got: {status:?}");
        assert_eq!(clock.now(), config.timeout());
        assert_eq!(*session.dismissed.lock().unwrap(), 1);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn convert_one_failed_dismiss_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slow.vox");
        std::fs::write(&input, b"VOX ").unwrap();

        let mut session = ScriptedSession::new("never", usize::MAX);
        session.dismiss_fails = true;
        let err = convert_one(&session, &input, &dir.path().join("slow.svox"), &config())
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::Cdp(_)), "got: {err:?}");
        assert_eq!(*session.dismissed.lock().unwrap(), 1);
    }
}
