//! Cache module for resolution descriptors.
//!
//! Provides LRU-based caching of resolved stream URLs.

pub mod descriptors;

// Re-export commonly used types
pub use descriptors::{DescriptorCache, ResolutionCache, SharedResolutionCache, DEFAULT_CAPACITY};
