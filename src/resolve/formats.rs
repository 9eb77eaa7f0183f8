//! Stream selection from backend metadata.
//!
//! Metadata is flattened into an ordered list of [`FormatCandidate`]s, each
//! tagged with the [`Capability`] it offers. Selection then picks the best
//! capability, breaking ties by list order.

use super::backend::MediaInfo;

/// What a candidate stream offers, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    /// The backend's own top-level pick, carrying audio.
    Direct,
    /// Audio-only Opus (usually in WebM).
    Opus,
    /// Audio-only AAC in MP4.
    M4a,
    /// Any other audio-only stream.
    AudioOnly,
}

/// A stream URL the transcoder could read.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCandidate {
    pub url: String,
    pub capability: Capability,
    pub format_id: Option<String>,
}

/// Returns true unless the codec field says "none".
fn has_codec(codec: Option<&str>) -> bool {
    codec.map(|c| c != "none").unwrap_or(true)
}

fn is_audio_only(acodec: Option<&str>, vcodec: Option<&str>) -> bool {
    has_codec(acodec) && vcodec == Some("none")
}

fn classify(acodec: Option<&str>, ext: Option<&str>) -> Capability {
    let acodec = acodec.unwrap_or_default();
    match ext.unwrap_or_default() {
        _ if acodec.starts_with("opus") => Capability::Opus,
        "opus" | "webm" => Capability::Opus,
        _ if acodec.starts_with("mp4a") => Capability::M4a,
        "m4a" => Capability::M4a,
        _ => Capability::AudioOnly,
    }
}

/// Builds the candidate list: the top-level URL first, then usable formats
/// in backend order.
pub fn candidates(info: &MediaInfo) -> Vec<FormatCandidate> {
    let mut list = Vec::new();

    if let Some(url) = info.url.as_deref().filter(|u| !u.trim().is_empty()) {
        if has_codec(info.acodec.as_deref()) {
            list.push(FormatCandidate {
                url: url.to_string(),
                capability: Capability::Direct,
                format_id: None,
            });
        }
    }

    for format in &info.formats {
        let Some(url) = format.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            continue;
        };
        if !is_audio_only(format.acodec.as_deref(), format.vcodec.as_deref()) {
            continue;
        }
        list.push(FormatCandidate {
            url: url.to_string(),
            capability: classify(format.acodec.as_deref(), format.ext.as_deref()),
            format_id: format.format_id.clone(),
        });
    }

    list
}

/// Picks the candidate with the best capability; the first one wins ties.
pub fn select(candidates: &[FormatCandidate]) -> Option<&FormatCandidate> {
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(index, c)| (c.capability, *index))
        .map(|(_, c)| c)
}

/// Returns the playable stream URL for `info`, if any.
pub fn select_stream_url(info: &MediaInfo) -> Option<String> {
    let list = candidates(info);
    let chosen = select(&list)?;
    tracing::debug!(
        capability = ?chosen.capability,
        format_id = ?chosen.format_id,
        candidates = list.len(),
        "selected stream"
    );
    Some(chosen.url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::backend::FormatEntry;

    fn format(id: &str, acodec: &str, vcodec: &str, ext: &str) -> FormatEntry {
        FormatEntry {
            format_id: Some(id.to_string()),
            url: Some(format!("https://cdn/{}", id)),
            acodec: Some(acodec.to_string()),
            vcodec: Some(vcodec.to_string()),
            ext: Some(ext.to_string()),
            abr: None,
        }
    }

    #[test]
    fn top_level_url_with_audio_wins() {
        let info = MediaInfo {
            url: Some("https://cdn/direct".to_string()),
            acodec: Some("opus".to_string()),
            vcodec: Some("none".to_string()),
            formats: vec![format("251", "opus", "none", "webm")],
            ..Default::default()
        };
        assert_eq!(select_stream_url(&info).as_deref(), Some("https://cdn/direct"));
    }

    #[test]
    fn top_level_url_without_audio_is_ignored() {
        let info = MediaInfo {
            url: Some("https://cdn/video-only".to_string()),
            acodec: Some("none".to_string()),
            formats: vec![format("140", "mp4a.40.2", "none", "m4a")],
            ..Default::default()
        };
        assert_eq!(select_stream_url(&info).as_deref(), Some("https://cdn/140"));
    }

    #[test]
    fn opus_is_preferred_over_m4a_regardless_of_order() {
        let info = MediaInfo {
            formats: vec![
                format("140", "mp4a.40.2", "none", "m4a"),
                format("18", "mp4a.40.2", "avc1", "mp4"),
                format("251", "opus", "none", "webm"),
            ],
            ..Default::default()
        };
        assert_eq!(select_stream_url(&info).as_deref(), Some("https://cdn/251"));
    }

    #[test]
    fn m4a_beats_generic_audio() {
        let info = MediaInfo {
            formats: vec![
                format("mp3", "mp3", "none", "mp3"),
                format("140", "mp4a.40.2", "none", "m4a"),
            ],
            ..Default::default()
        };
        assert_eq!(select_stream_url(&info).as_deref(), Some("https://cdn/140"));
    }

    #[test]
    fn falls_back_to_any_audio_only_format() {
        let info = MediaInfo {
            formats: vec![
                format("18", "mp4a.40.2", "avc1", "mp4"),
                format("hls-audio", "aac", "none", "mp4"),
            ],
            ..Default::default()
        };
        let list = candidates(&info);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].capability, Capability::AudioOnly);
        assert_eq!(select_stream_url(&info).as_deref(), Some("https://cdn/hls-audio"));
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        let info = MediaInfo {
            formats: vec![
                format("249", "opus", "none", "webm"),
                format("251", "opus", "none", "webm"),
            ],
            ..Default::default()
        };
        assert_eq!(select_stream_url(&info).as_deref(), Some("https://cdn/249"));
    }

    #[test]
    fn nothing_usable_yields_none() {
        let mut no_url = format("251", "opus", "none", "webm");
        no_url.url = Some(String::new());
        let info = MediaInfo {
            formats: vec![format("18", "mp4a.40.2", "avc1", "mp4"), no_url],
            ..Default::default()
        };
        assert!(candidates(&info).is_empty());
        assert!(select_stream_url(&info).is_none());
    }
}
