//! Source resolution.
//!
//! Turns a media page URL into a directly playable audio stream URL plus
//! metadata, using yt-dlp as the backend and the resolution cache in front
//! of it.

pub mod backend;
pub mod formats;
pub mod resolver;

// Re-export commonly used types
pub use backend::{BackendError, FormatEntry, MediaInfo, ResolutionBackend, YtDlpBackend};
pub use formats::{select_stream_url, Capability, FormatCandidate};
pub use resolver::{classify_backend_error, validate_identifier, Resolver};
