//! Core types for the lambro-daemon.
//!
//! This module re-exports all the core data types used throughout the daemon:
//! - [`ResolutionDescriptor`]: A resolved, directly fetchable audio stream
//! - [`ProcessingRequest`]: A validated retune-and-stream job
//! - [`SampleBuffer`]: Decoded PCM audio owned by one request

mod descriptor;
mod request;
mod samples;

// Re-export all types at the module level
pub use descriptor::{ResolutionDescriptor, UNKNOWN_TITLE};
pub use request::{semitones_for, EffectPreset, ProcessingRequest, BASE_FREQUENCY_HZ};
pub use samples::SampleBuffer;
