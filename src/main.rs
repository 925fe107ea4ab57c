//! # Spot Check Entry Point
//!
//! Runs one forecast batch and writes the report.
//!
//! ```text
//! spot-check [--stdout] [--config <path>] [--init-config] [-v | -vv]
//! ```
//!
//! - `--stdout`: print the report instead of writing `run.output_path`
//! - `--config <path>`: read configuration from `<path>` instead of
//!   `spot-config.toml`
//! - `--init-config`: write the built-in configuration to the config path and
//!   exit
//! - `-v`, `-vv`: more logging (`RUST_LOG` overrides)

use anyhow::Context;
use chrono::Utc;
use spot_check::config::{Config, DEFAULT_CONFIG_PATH};
use spot_check::logging;
use spot_check::pipeline::Pipeline;
use spot_check::providers::open_meteo::OpenMeteo;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Command line flags.
struct Args {
    stdout: bool,
    init_config: bool,
    config_path: PathBuf,
    verbosity: u8,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        stdout: false,
        init_config: false,
        config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        verbosity: 0,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--stdout" => args.stdout = true,
            "--init-config" => args.init_config = true,
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                args.config_path = PathBuf::from(path);
            }
            "-v" => args.verbosity = args.verbosity.max(1),
            "-vv" => args.verbosity = 2,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    logging::init(args.verbosity);

    if args.init_config {
        return Config::default().save_to_path(&args.config_path);
    }

    let config = Config::load_from_path(&args.config_path);
    let provider = OpenMeteo::from_config(&config).context("building HTTP client")?;

    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;

    // Upstream failures degrade inside the pipeline; the run itself cannot fail
    let now = config.run.local_time(Utc::now())?;
    let report = rt.block_on(Pipeline::new(&config, &provider, &provider).run(now));

    let json = serde_json::to_string_pretty(&report)?;
    if args.stdout {
        println!("{json}");
        return Ok(());
    }

    fs::write(&config.run.output_path, json)
        .with_context(|| format!("writing {}", config.run.output_path.display()))?;
    info!(
        path = %config.run.output_path.display(),
        hours = report.hours.len(),
        "report written"
    );
    Ok(())
}
