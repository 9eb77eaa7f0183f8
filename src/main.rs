//! lambro-daemon: HTTP service that resolves media pages to audio streams
//! and streams them back retuned.

use anyhow::{bail, Context};

use lambro_daemon::cli::Cli;
use lambro_daemon::config::DaemonConfig;
use lambro_daemon::logging;
use lambro_daemon::server::{run_server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let config = cli.apply(DaemonConfig::from_env());

    logging::init(&config.log_filter);

    if let Some(problem) = config.validate() {
        bail!("invalid configuration: {}", problem);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        ffmpeg = %config.ffmpeg_path.display(),
        ytdlp = %config.ytdlp_path.display(),
        cache_capacity = config.cache_capacity,
        max_transcodes = config.max_concurrent_transcodes,
        max_pending = config.max_pending_transcodes,
        shift_fallback = %config.shift_fallback,
        "starting lambro-daemon"
    );

    let state = AppState::from_config(config);
    run_server(state).await.context("server failed")
}
