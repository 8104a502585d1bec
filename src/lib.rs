//! Codepane editor widget runtime
//!
//! Re-exports the capture and provider crates so hosts depend on one package.

pub use codepane_capture as capture;
pub use codepane_providers as providers;
