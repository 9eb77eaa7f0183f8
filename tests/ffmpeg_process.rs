//! Processing through a real subprocess, with shell scripts standing in
//! for ffmpeg.
#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use common::{serve, tone, wav_samples, FakeBackend, RATE};
use lambro_daemon::audio::{encode_wav, GranularPitchShifter};
use lambro_daemon::cache::SharedResolutionCache;
use lambro_daemon::pipeline::{FfmpegTranscoder, Pipeline};
use lambro_daemon::resolve::Resolver;
use lambro_daemon::server::AppState;
use lambro_daemon::DaemonConfig;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn write_script(dir: &Path, body: &str) -> std::io::Result<PathBuf> {
    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

async fn server_with_ffmpeg(ffmpeg: PathBuf) -> std::io::Result<String> {
    let config = DaemonConfig {
        ffmpeg_path: ffmpeg,
        terminate_grace_ms: 200,
        ..DaemonConfig::default()
    };
    let resolver = Resolver::new(
        Arc::new(FakeBackend::new()),
        Arc::new(SharedResolutionCache::with_capacity(4)),
    );
    let pipeline = Pipeline::new(
        Arc::new(FfmpegTranscoder::from_config(&config)),
        Arc::new(GranularPitchShifter::new()),
        &config,
    );
    serve(AppState::new(resolver, pipeline, config)).await
}

#[tokio::test]
async fn failing_ffmpeg_yields_500_with_stderr() -> TestResult {
    let dir = tempfile::tempdir()?;
    let ffmpeg = write_script(
        dir.path(),
        "echo 'https://cdn.test/x: Server returned 403 Forbidden' >&2\nexit 1",
    )?;
    let base_url = server_with_ffmpeg(ffmpeg).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/process", base_url))
        .json(&json!({ "sourceStreamUrl": "https://cdn.test/x" }))
        .send()
        .await?;
    assert_eq!(response.status(), 500);

    let body: Value = response.json().await?;
    assert_eq!(body["code"], "TRANSCODE_FAILED");
    assert!(body["detail"].as_str().unwrap().contains("403 Forbidden"));
    Ok(())
}

#[tokio::test]
async fn ffmpeg_output_is_streamed_back() -> TestResult {
    let dir = tempfile::tempdir()?;
    let fixture = dir.path().join("tone.wav");
    std::fs::write(&fixture, encode_wav(&tone(440.0, 0.25))?)?;
    let ffmpeg = write_script(dir.path(), &format!("cat '{}'", fixture.display()))?;
    let base_url = server_with_ffmpeg(ffmpeg).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/process", base_url))
        .json(&json!({ "sourceStreamUrl": "https://cdn.test/x", "targetFrequencyHz": 554.37 }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body = response.bytes().await?;
    let (spec, samples) = wav_samples(&body);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, RATE);
    assert_eq!(samples.len() / 2, (RATE as f64 * 0.25) as usize);
    Ok(())
}

#[tokio::test]
async fn hung_ffmpeg_times_out() -> TestResult {
    let dir = tempfile::tempdir()?;
    let ffmpeg = write_script(dir.path(), "exec sleep 30")?;
    let config = DaemonConfig {
        ffmpeg_path: ffmpeg,
        terminate_grace_ms: 100,
        ..DaemonConfig::default()
    };
    let transcoder = FfmpegTranscoder::new(
        config.ffmpeg_path.clone(),
        Duration::from_millis(300),
        config.terminate_grace(),
    );
    let pipeline = Pipeline::new(
        Arc::new(transcoder),
        Arc::new(GranularPitchShifter::new()),
        &config,
    );
    let resolver = Resolver::new(
        Arc::new(FakeBackend::new()),
        Arc::new(SharedResolutionCache::with_capacity(4)),
    );
    let base_url = serve(AppState::new(resolver, pipeline, config)).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/process", base_url))
        .json(&json!({ "sourceStreamUrl": "https://cdn.test/x" }))
        .send()
        .await?;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "TRANSCODE_FAILED");
    Ok(())
}

/// True while `pid` exists and is not a zombie.
fn process_alive(pid: &str) -> bool {
    std::process::Command::new("ps")
        .args(["-o", "stat=", "-p", pid])
        .output()
        .map(|out| {
            let stat = String::from_utf8_lossy(&out.stdout);
            let stat = stat.trim();
            out.status.success() && !stat.is_empty() && !stat.starts_with('Z')
        })
        .unwrap_or(false)
}

#[tokio::test]
async fn client_disconnect_kills_running_ffmpeg() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pid_file = dir.path().join("ffmpeg.pid");
    let ffmpeg = write_script(
        dir.path(),
        &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
    )?;
    let base_url = server_with_ffmpeg(ffmpeg).await?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(750))
        .build()?;
    let result = client
        .post(format!("{}/process", base_url))
        .json(&json!({ "sourceStreamUrl": "https://cdn.test/x" }))
        .send()
        .await;
    assert!(result.is_err(), "request should time out while ffmpeg runs");
    drop(client);

    let pid = std::fs::read_to_string(&pid_file)?.trim().to_string();
    assert!(!pid.is_empty());

    let mut alive = true;
    for _ in 0..50 {
        alive = process_alive(&pid);
        if !alive {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(!alive, "ffmpeg pid {} still running after client left", pid);
    Ok(())
}
