//! Resolver adapter.
//!
//! Validates a source identifier, serves it from the resolution cache when
//! possible, and otherwise asks the backend, picks a stream and caches the
//! resulting descriptor. Failures are classified and never cached.

use std::sync::Arc;

use crate::cache::{DescriptorCache, SharedResolutionCache};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, ErrorCode, Result};
use crate::types::ResolutionDescriptor;

use super::backend::{BackendError, ResolutionBackend, YtDlpBackend};
use super::formats::select_stream_url;

/// Phrases in backend diagnostics that mean the media is region or age gated.
const RESTRICTED_MARKERS: &[&str] = &[
    "sign in to confirm your age",
    "age-restricted",
    "age restricted",
    "inappropriate for some users",
    "available in your country",
    "blocked it in your country",
    "geo restriction",
    "geo-restricted",
    "geo restricted",
];

/// Phrases in backend diagnostics that mean the media cannot be played at all.
const UNAVAILABLE_MARKERS: &[&str] = &[
    "private video",
    "video unavailable",
    "this video is unavailable",
    "has been removed",
    "account associated with this video has been terminated",
    "this live event will begin",
    "premieres in",
    "not available",
    "does not exist",
];

/// Turns source identifiers into cached [`ResolutionDescriptor`]s.
#[derive(Clone)]
pub struct Resolver {
    backend: Arc<dyn ResolutionBackend>,
    cache: Arc<dyn DescriptorCache>,
}

impl Resolver {
    /// Creates a resolver over the given backend and cache.
    pub fn new(backend: Arc<dyn ResolutionBackend>, cache: Arc<dyn DescriptorCache>) -> Self {
        Self { backend, cache }
    }

    /// Creates the production resolver: yt-dlp plus a shared LRU cache.
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(
            Arc::new(YtDlpBackend::from_config(config)),
            Arc::new(SharedResolutionCache::with_capacity(config.cache_capacity)),
        )
    }

    /// The cache this resolver populates.
    pub fn cache(&self) -> &Arc<dyn DescriptorCache> {
        &self.cache
    }

    /// Resolves `source` to a playable audio stream.
    pub async fn resolve(&self, source: &str) -> Result<ResolutionDescriptor> {
        let source = validate_identifier(source)?;

        if let Some(descriptor) = self.cache.get(source) {
            tracing::debug!(source, "resolution cache hit");
            return Ok(descriptor);
        }

        tracing::info!(source, "resolving source");

        let info = self.backend.fetch(source).await.map_err(|e| {
            let err = classify_backend_error(e);
            tracing::warn!(source, code = %err.code, error = %err.message, "resolution failed");
            err
        })?;

        let Some(stream_url) = select_stream_url(&info) else {
            tracing::warn!(source, formats = info.formats.len(), "no audio stream in metadata");
            return Err(DaemonError::no_audio_stream(source));
        };

        let descriptor = ResolutionDescriptor::new(
            source,
            stream_url,
            info.title,
            info.duration,
            info.thumbnail,
        )
        .ok_or_else(|| DaemonError::no_audio_stream(source))?;

        self.cache.put(descriptor.clone());
        tracing::info!(
            source,
            title = %descriptor.title,
            duration_seconds = descriptor.duration_seconds,
            "resolved source"
        );

        Ok(descriptor)
    }
}

/// Checks that `source` is a plausible identifier and returns it trimmed.
pub fn validate_identifier(source: &str) -> Result<&str> {
    let source = source.trim();
    if source.is_empty() {
        return Err(DaemonError::invalid_request("sourceUrl is required"));
    }
    if source.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(DaemonError::invalid_request(
            "sourceUrl must not contain whitespace or control characters",
        ));
    }
    if source.starts_with('-') {
        return Err(DaemonError::invalid_request("sourceUrl must not start with '-'"));
    }
    Ok(source)
}

/// Maps a backend failure onto the resolution error codes.
pub fn classify_backend_error(err: BackendError) -> DaemonError {
    let diagnostics = err.diagnostics().unwrap_or_default().to_string();
    let lowered = diagnostics.to_lowercase();

    let (code, prefix) = if RESTRICTED_MARKERS.iter().any(|m| lowered.contains(m)) {
        (ErrorCode::ResolutionRestricted, "Source is restricted")
    } else if UNAVAILABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        (ErrorCode::ResolutionUnavailable, "Source is unavailable")
    } else {
        (ErrorCode::ResolutionFailed, "Error processing source URL")
    };

    let reason = first_error_line(&diagnostics).unwrap_or_else(|| err.to_string());
    let mut out = DaemonError::new(code, format!("{}: {}", prefix, reason));
    out.exit_code = match &err {
        BackendError::Exited { code, .. } => *code,
        _ => None,
    };
    out.source = Some(Box::new(err));
    out.with_diagnostics(diagnostics)
}

/// Returns the first `ERROR:` line of yt-dlp output, without the prefix.
fn first_error_line(diagnostics: &str) -> Option<String> {
    diagnostics
        .lines()
        .find_map(|line| line.trim().strip_prefix("ERROR:"))
        .map(|rest| rest.trim().to_string())
        .filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::backend::{FormatEntry, MediaInfo};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend double returning canned results and counting calls.
    struct ScriptedBackend {
        calls: AtomicUsize,
        responses: Mutex<Vec<std::result::Result<MediaInfo, BackendError>>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<std::result::Result<MediaInfo, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResolutionBackend for ScriptedBackend {
        async fn fetch(&self, _source: &str) -> std::result::Result<MediaInfo, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                match responses.first() {
                    Some(Ok(info)) => Ok(info.clone()),
                    _ => Err(failure("ERROR: exhausted")),
                }
            }
        }
    }

    fn playable() -> MediaInfo {
        MediaInfo {
            title: Some("Night Drive".to_string()),
            duration: Some(185.0),
            formats: vec![FormatEntry {
                format_id: Some("251".to_string()),
                url: Some("https://cdn.example.com/251".to_string()),
                acodec: Some("opus".to_string()),
                vcodec: Some("none".to_string()),
                ext: Some("webm".to_string()),
                abr: Some(160.0),
            }],
            ..Default::default()
        }
    }

    fn failure(stderr: &str) -> BackendError {
        BackendError::Exited {
            program: "yt-dlp".to_string(),
            code: Some(1),
            stderr: stderr.to_string(),
        }
    }

    fn resolver(backend: Arc<ScriptedBackend>, capacity: usize) -> Resolver {
        Resolver::new(backend, Arc::new(SharedResolutionCache::with_capacity(capacity)))
    }

    #[tokio::test]
    async fn second_resolve_is_served_from_cache() {
        let backend = ScriptedBackend::new(vec![Ok(playable())]);
        let resolver = resolver(backend.clone(), 4);

        let first = resolver.resolve("https://example.com/watch?v=1").await.unwrap();
        let second = resolver.resolve("https://example.com/watch?v=1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.playable_stream_url, "https://cdn.example.com/251");
        assert_eq!(first.title, "Night Drive");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn surrounding_whitespace_shares_the_cache_key() {
        let backend = ScriptedBackend::new(vec![Ok(playable())]);
        let resolver = resolver(backend.clone(), 4);

        resolver.resolve("https://example.com/a").await.unwrap();
        resolver.resolve("  https://example.com/a\n").await.unwrap();
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let backend = ScriptedBackend::new(vec![
            Err(failure("ERROR: Unable to download webpage: timed out")),
            Ok(playable()),
        ]);
        let resolver = resolver(backend.clone(), 4);

        let err = resolver.resolve("https://example.com/a").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ResolutionFailed);
        assert!(resolver.cache().is_empty());

        resolver.resolve("https://example.com/a").await.unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn metadata_without_audio_is_not_found() {
        let mut info = playable();
        info.formats[0].vcodec = Some("vp9".to_string());
        let backend = ScriptedBackend::new(vec![Ok(info)]);
        let resolver = resolver(backend, 4);

        let err = resolver.resolve("https://example.com/a").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NoAudioStream);
        assert_eq!(err.code.http_status(), 404);
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn invalid_identifiers_never_reach_the_backend() {
        let backend = ScriptedBackend::new(vec![Ok(playable())]);
        let resolver = resolver(backend.clone(), 4);

        for bad in ["", "   ", "https://a b", "https://a\u{0}b", "--exec=rm"] {
            let err = resolver.resolve(bad).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidRequest, "input {bad:?}");
        }
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn cache_capacity_is_respected() {
        let backend = ScriptedBackend::new(vec![Ok(playable())]);
        let resolver = resolver(backend.clone(), 2);

        for id in ["https://e/1", "https://e/2", "https://e/3"] {
            resolver.resolve(id).await.unwrap();
        }
        assert_eq!(resolver.cache().len(), 2);
        assert!(resolver.cache().get("https://e/1").is_none());

        // Evicted entry goes back to the backend
        resolver.resolve("https://e/1").await.unwrap();
        assert_eq!(backend.calls(), 4);
    }

    #[test]
    fn classifies_restricted_sources() {
        for stderr in [
            "ERROR: [youtube] x: Sign in to confirm your age. This video may be inappropriate for some users.",
            "ERROR: [youtube] x: The uploader has not made this video available in your country",
            "ERROR: [youtube] x: Video unavailable. The uploader has not made this video available in your country; geo restriction",
        ] {
            let err = classify_backend_error(failure(stderr));
            assert_eq!(err.code, ErrorCode::ResolutionRestricted, "{stderr}");
        }
    }

    #[test]
    fn classifies_unavailable_sources() {
        for stderr in [
            "ERROR: [youtube] x: Private video. Sign in if you've been granted access",
            "ERROR: [youtube] x: Video unavailable",
            "ERROR: [youtube] x: This video has been removed by the uploader",
        ] {
            let err = classify_backend_error(failure(stderr));
            assert_eq!(err.code, ErrorCode::ResolutionUnavailable, "{stderr}");
        }
    }

    #[test]
    fn generic_failures_keep_the_error_line() {
        let err = classify_backend_error(failure(
            "WARNING: something\nERROR: Unable to download webpage: HTTP Error 500\n",
        ));
        assert_eq!(err.code, ErrorCode::ResolutionFailed);
        assert_eq!(err.exit_code, Some(1));
        assert!(err.message.contains("HTTP Error 500"));
        assert!(err.detail().contains("WARNING: something"));
    }

    #[test]
    fn non_exit_failures_are_generic() {
        let err = classify_backend_error(BackendError::TimedOut {
            program: "yt-dlp".to_string(),
            secs: 60,
        });
        assert_eq!(err.code, ErrorCode::ResolutionFailed);
        assert!(err.message.contains("timed out"));
        assert!(err.diagnostics.is_none());
    }
}
