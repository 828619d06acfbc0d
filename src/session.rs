//! The seam between the batch driver and the external editor.
//!
//! The driver never talks to a browser directly. It holds a
//! [`ConversionSession`] and asks it to load a buffer, read the editor text,
//! and dismiss error UI. [`crate::browser::EditorSession`] implements the
//! trait over the Chrome DevTools Protocol; tests implement it in memory.

use crate::error::BatchError;
use async_trait::async_trait;

/// One live connection to the conversion service, reused for every file.
///
/// Calls are strictly sequential: the driver awaits each one before issuing
/// the next, so implementations need no internal locking.
#[async_trait]
pub trait ConversionSession: Send + Sync {
    /// Load the editor at `entry_point` and check it is ready to accept models.
    async fn open(&self, entry_point: &str) -> Result<(), BatchError>;

    /// Hand a base64-encoded `.vox` buffer to the editor.
    ///
    /// The editor's current text is expected to be empty until it has parsed
    /// the new model.
    async fn load_buffer(&self, base64: &str) -> Result<(), BatchError>;

    /// The editor's current text serialisation; empty while still parsing.
    async fn read_result(&self) -> Result<String, BatchError>;

    /// Clear any transient error state (e.g. a modal) left by a failed load.
    async fn dismiss(&self) -> Result<(), BatchError> {
        Ok(())
    }

    /// Release the session. Called exactly once, after the last file.
    async fn close(&self) -> Result<(), BatchError> {
        Ok(())
    }
}
