//! lambro-daemon: resolves media pages to audio streams and serves them
//! back retuned, as 16-bit stereo WAV over HTTP.
//!
//! This library provides the core functionality for the daemon and the
//! `lambro-bench` load generator.
//!
//! # Modules
//!
//! - [`resolve`]: yt-dlp metadata extraction and stream selection
//! - [`cache`]: LRU cache of resolution descriptors
//! - [`pipeline`]: transcode, pitch shift, encode and stream stages
//! - [`audio`]: WAV codec, resampling and pitch-shift DSP
//! - [`server`]: axum routes and handlers
//! - [`bench`]: benchmark scenarios, statistics and report
//! - [`types`]: Core data types (ResolutionDescriptor, ProcessingRequest, SampleBuffer)
//! - [`config`]: Runtime configuration (DaemonConfig, ShiftFallback)
//! - [`error`]: Error types and codes (DaemonError, ErrorCode)
//!
//! # Example
//!
//! ```rust,ignore
//! use lambro_daemon::{
//!     config::{DaemonConfig, ShiftFallback},
//!     server::{run_server, AppState},
//! };
//!
//! let config = DaemonConfig {
//!     shift_fallback: ShiftFallback::Fail,
//!     ..DaemonConfig::from_env()
//! };
//!
//! run_server(AppState::from_config(config)).await?;
//! ```

pub mod audio;
pub mod bench;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod resolve;
pub mod server;
pub mod types;

#[cfg(all(test, unix))]
mod test_support;

// Re-export commonly used types at crate root for convenience
pub use config::{DaemonConfig, ShiftFallback};
pub use error::{DaemonError, ErrorCode, Result};
pub use types::{EffectPreset, ProcessingRequest, ResolutionDescriptor, SampleBuffer};
