//! lambro-bench: load generator for a running lambro-daemon.

use anyhow::Context;

use lambro_daemon::bench::{default_scenarios, render_markdown, write_report, BenchRunner};
use lambro_daemon::cli::BenchCli;
use lambro_daemon::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = BenchCli::parse_args();
    logging::init(&cli.log_filter);

    let config = cli.to_config();
    let report_path = config.report_path.clone();
    let scenarios = default_scenarios(config.target_frequency_hz);

    tracing::info!(
        base_url = %config.base_url,
        source = %config.source_url,
        levels = ?config.concurrency_levels,
        requests = config.requests_per_level,
        "starting benchmark"
    );

    let runner = BenchRunner::new(config).context("building HTTP client")?;
    let results = runner.run_all(&scenarios).await;

    let markdown = render_markdown(&results);
    println!("{}", markdown);
    write_report(&report_path, &markdown)
        .with_context(|| format!("writing {}", report_path.display()))?;
    tracing::info!(path = %report_path.display(), "report written");

    Ok(())
}
