#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;

use lambro_daemon::audio::GranularPitchShifter;
use lambro_daemon::cache::SharedResolutionCache;
use lambro_daemon::pipeline::{Pipeline, Transcode};
use lambro_daemon::resolve::{BackendError, FormatEntry, MediaInfo, ResolutionBackend, Resolver};
use lambro_daemon::server::{build_router, AppState};
use lambro_daemon::{DaemonConfig, DaemonError, EffectPreset, Result, SampleBuffer};

pub const TONE_HZ: f64 = 440.0;
pub const TONE_SECS: f64 = 0.5;
pub const RATE: u32 = 44_100;

/// Stereo sine whose samples are exact 16-bit values.
pub fn tone(freq: f64, secs: f64) -> SampleBuffer {
    let frames = (RATE as f64 * secs) as usize;
    let mut samples = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f64 / RATE as f64;
        let value = (0.5 * (2.0 * std::f64::consts::PI * freq * t).sin() * 32767.0).round() as i16;
        let sample = value as f32 / 32768.0;
        samples.push(sample);
        samples.push(sample);
    }
    SampleBuffer::new(samples, RATE, 2)
}

/// Transcoder returning a fixed tone. URLs containing "broken" fail like a
/// non-zero ffmpeg exit.
pub struct ToneTranscoder {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl ToneTranscoder {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcode for ToneTranscoder {
    async fn transcode(&self, stream_url: &str, _effect: EffectPreset) -> Result<SampleBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if stream_url.contains("broken") {
            return Err(DaemonError::transcode_failed(
                Some(1),
                format!("{}: Invalid data found when processing input", stream_url),
            ));
        }
        Ok(tone(TONE_HZ, TONE_SECS))
    }
}

/// Backend answering from canned metadata and counting calls.
pub struct FakeBackend {
    pub calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResolutionBackend for FakeBackend {
    async fn fetch(&self, source: &str) -> std::result::Result<MediaInfo, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if source.contains("private") {
            return Err(BackendError::Exited {
                program: "yt-dlp".to_string(),
                code: Some(1),
                stderr: "ERROR: [youtube] abc: Private video. Sign in if you've been granted access"
                    .to_string(),
            });
        }

        let formats = if source.contains("silent") {
            vec![FormatEntry {
                format_id: Some("18".to_string()),
                url: Some("https://cdn.test/video".to_string()),
                acodec: Some("none".to_string()),
                vcodec: Some("avc1".to_string()),
                ext: Some("mp4".to_string()),
                abr: None,
            }]
        } else {
            vec![FormatEntry {
                format_id: Some("251".to_string()),
                url: Some("https://cdn.test/audio.webm".to_string()),
                acodec: Some("opus".to_string()),
                vcodec: Some("none".to_string()),
                ext: Some("webm".to_string()),
                abr: Some(130.0),
            }]
        };

        Ok(MediaInfo {
            title: Some("Test Track".to_string()),
            duration: Some(212.0),
            thumbnail: Some("https://img.test/t.jpg".to_string()),
            formats,
            ..Default::default()
        })
    }
}

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub backend: Arc<FakeBackend>,
    pub transcoder: Arc<ToneTranscoder>,
}

/// Serves a router backed by fakes on an ephemeral port.
pub async fn setup_test_server(
    config: DaemonConfig,
    transcoder: ToneTranscoder,
) -> std::result::Result<TestServer, Box<dyn std::error::Error>> {
    let backend = Arc::new(FakeBackend::new());
    let transcoder = Arc::new(transcoder);
    let resolver = Resolver::new(
        backend.clone(),
        Arc::new(SharedResolutionCache::with_capacity(config.cache_capacity)),
    );
    let pipeline = Pipeline::new(
        transcoder.clone(),
        Arc::new(GranularPitchShifter::new()),
        &config,
    );

    let base_url = serve(AppState::new(resolver, pipeline, config)).await?;

    Ok(TestServer {
        base_url,
        client: reqwest::Client::new(),
        backend,
        transcoder,
    })
}

/// Serves `state` on 127.0.0.1 and returns the base URL.
pub async fn serve(state: AppState) -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_router(state)).await;
    });
    Ok(format!("http://{}", addr))
}

/// Reads every 16-bit sample of a WAV body.
pub fn wav_samples(body: &[u8]) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::new(std::io::Cursor::new(body)).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}
