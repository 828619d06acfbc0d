//! [`ConversionSession`] over a live editor page.
//!
//! The editor exposes two globals that make up its entire automation surface:
//!
//! - `loadMagicaVoxelFromBuffer(base64)` parses a `.vox` buffer into the scene
//! - `editor.getValue()` returns the scene's current text serialisation
//!
//! Failed loads put up a modal that swallows input until dismissed with
//! Escape, which is what [`EditorSession::dismiss`] sends.

use super::cdp::CdpClient;
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::session::ConversionSession;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Name of the editor's load entry point.
pub const LOAD_FUNCTION: &str = "loadMagicaVoxelFromBuffer";

const READ_RESULT_SCRIPT: &str = "(typeof editor !== 'undefined' && editor && typeof editor.getValue === 'function') \
     ? String(editor.getValue()) : ''";

/// A browser tab driving the voxel editor.
pub struct EditorSession {
    cdp: CdpClient,
    navigation_timeout: Duration,
}

impl EditorSession {
    /// Launch the browser configured in `config`; the page stays blank until
    /// [`ConversionSession::open`].
    pub async fn launch(chrome_path: &Path, config: &BatchConfig) -> Result<Self, BatchError> {
        let cdp = CdpClient::launch(chrome_path, config.headless).await?;
        Ok(Self {
            cdp,
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
        })
    }
}

#[async_trait]
impl ConversionSession for EditorSession {
    async fn open(&self, entry_point: &str) -> Result<(), BatchError> {
        self.cdp.navigate(entry_point, self.navigation_timeout).await?;

        // Module scripts may still be wiring up globals after `load`.
        let ready = self
            .cdp
            .wait_until(
                self.navigation_timeout,
                &format!("typeof {LOAD_FUNCTION} === 'function'"),
            )
            .await?;
        if !ready {
            return Err(BatchError::NavigationFailed {
                url: entry_point.into(),
                reason: format!("page does not define {LOAD_FUNCTION}()"),
            });
        }
        debug!("Editor ready at {}", entry_point);
        Ok(())
    }

    async fn load_buffer(&self, base64: &str) -> Result<(), BatchError> {
        let script = load_script(base64);
        let _ = self.cdp.evaluate(LOAD_FUNCTION, &script).await?;
        Ok(())
    }

    async fn read_result(&self) -> Result<String, BatchError> {
        let value = self.cdp.evaluate("editor.getValue", READ_RESULT_SCRIPT).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn dismiss(&self) -> Result<(), BatchError> {
        self.cdp.press_key("Escape", 27).await
    }

    async fn close(&self) -> Result<(), BatchError> {
        self.cdp.close().await
    }
}

/// Build the script that clears the editor and loads one buffer.
///
/// The editor keeps the previous model's text until the new one is parsed,
/// so it is emptied first; otherwise the poll would see stale text at once.
fn load_script(base64: &str) -> String {
    let literal = serde_json::to_string(base64).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r"(() => {{
            if (typeof editor !== 'undefined' && editor && typeof editor.setValue === 'function') {{
                editor.setValue('');
            }}
            return Promise.resolve({LOAD_FUNCTION}({literal})).then(() => true);
        }})()"
    )
}


#[cfg(test)]
#[cfg(feature = "browser-integration")]
mod integration_tests {
    use super::*;
    use crate::browser::chrome::find_chrome;

    const FAKE_EDITOR: &str = "data:text/html,<script>\
        var editor = { v: '', getValue() { return this.v; }, setValue(s) { this.v = s; } };\
        function loadMagicaVoxelFromBuffer(b) { setTimeout(() => editor.setValue('len=' + atob(b).length + '\\n'), 10); }\
        </script>";

    async fn launch() -> EditorSession {
        let chrome = find_chrome(None).expect("Chrome required for integration tests");
        EditorSession::launch(&chrome, &BatchConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn round_trip_through_fake_editor() {
        let session = launch().await;
        session.open(FAKE_EDITOR).await.unwrap();
        session.load_buffer("Vk9YIA==").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.read_result().await.unwrap(), "len=4\n");
        session.dismiss().await.unwrap();
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn page_without_loader_is_rejected() {
        let chrome = find_chrome(None).expect("Chrome required for integration tests");
        let config = BatchConfig::builder()
            .navigation_timeout_ms(500)
            .build()
            .unwrap();
        let session = EditorSession::launch(&chrome, &config).await.unwrap();
        let err = session.open("data:text/html,<p>nothing</p>").await.unwrap_err();
        assert!(matches!(err, BatchError::NavigationFailed { .. }), "got: {err:?}");
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_entry_point_fails_navigation() {
        let session = launch().await;
        let err = session.open("http://127.0.0.1:9/playground.html").await.unwrap_err();
        assert!(matches!(err, BatchError::NavigationFailed { .. }), "got: {err:?}");
        session.close().await.unwrap();
    }
}
