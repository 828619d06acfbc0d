//! Pipeline stages for `.vox` → `.svox` batch conversion.
//!
//! Each submodule implements exactly one step of a file's trip through the
//! driver, so each can be tested without a browser.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ encode ──▶ session ──▶ wait ──▶ postprocess ──▶ write
//! (walk dir)   (base64)   (load)      (poll)   (CRLF)
//! ```
//!
//! 1. [`discover`]    — find `*.vox` files and map each to its output path
//! 2. [`encode`]      — base64 the raw bytes for the script boundary
//! 3. [`wait`]        — poll the editor text with a bounded, clock-driven wait
//! 4. [`postprocess`] — normalise line endings before the file is written

pub mod discover;
pub mod encode;
pub mod postprocess;
pub mod wait;
