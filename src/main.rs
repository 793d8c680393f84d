//! holostack - headless host for per-viewer virtual labels
//!
//! Places the configured label stacks, walks scripted observers around them
//! and drives visibility from a fixed-rate update loop.

mod config;
mod headless;

use anyhow::Result;
use config::HostConfig;
use headless::HeadlessConfig;
use std::{env, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    // INFO by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting holostack v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let host = match &cli.config {
        Some(path) => HostConfig::load_from_path(path),
        None => HostConfig::load(),
    };

    if let Some(path) = &cli.write_config {
        host.save_to_path(path)?;
        info!("Wrote effective config to {}", path.display());
        return Ok(());
    }

    let report = headless::run(HeadlessConfig {
        host,
        ticks: cli.ticks,
        events: cli.events,
    })?;

    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "ticks": report.ticks,
        "shown": report.shown,
        "hidden": report.hidden,
        "proxy_calls": report.proxy_calls,
        "leaked_proxies": report.leaked_proxies,
    }))?);
    Ok(())
}

struct CliOptions {
    config: Option<PathBuf>,
    ticks: u64,
    events: Option<PathBuf>,
    write_config: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions {
            config: None,
            ticks: 200,
            events: None,
            write_config: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--ticks" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.ticks = value,
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--ticks must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--ticks requires an integer");
                    }
                }
                "--events" => {
                    if let Some(path) = args.next() {
                        opts.events = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--events requires a file path");
                    }
                }
                "--write-config" => {
                    if let Some(path) = args.next() {
                        opts.write_config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--write-config requires a file path");
                    }
                }
                other => tracing::warn!(arg = %other, "Ignoring unknown argument"),
            }
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_all_options() {
        let opts = parse(&["--config", "a.toml", "--ticks", "40", "--events", "out.jsonl"]);
        assert_eq!(opts.config, Some(PathBuf::from("a.toml")));
        assert_eq!(opts.ticks, 40);
        assert_eq!(opts.events, Some(PathBuf::from("out.jsonl")));
        assert!(opts.write_config.is_none());
    }

    #[test]
    fn bad_tick_count_keeps_default() {
        let opts = parse(&["--ticks", "soon"]);
        assert_eq!(opts.ticks, 200);
        assert!(opts.config.is_none());
    }
}
