//! Browser automation: the production [`crate::session::ConversionSession`].
//!
//! - [`chrome`] — locate a Chrome/Chromium executable
//! - [`cdp`]    — minimal DevTools Protocol client (launch, navigate, evaluate)
//! - [`editor`] — the editor's load/read/dismiss contract on top of [`cdp`]

pub mod cdp;
pub mod chrome;
pub mod editor;

pub use editor::EditorSession;
