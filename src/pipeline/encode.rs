//! Voxel buffer encoding: raw `.vox` bytes → base64 text.
//!
//! The editor is driven by evaluating script in the page, so the buffer has
//! to travel inside a JavaScript string literal. Standard base64 (with
//! padding) is what the editor's loader decodes back into an `ArrayBuffer`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode a voxel file's contents for the automation boundary.
pub fn encode_buffer(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    b64
}
