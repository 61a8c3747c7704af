//! Command-line entry point: load one location's timeline from the image server

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Parser;
use skytrace::app::{App, Filters};
use skytrace::clients::HttpImageClient;
use skytrace::config::{AppConfig, LogFormat};
use skytrace::domain::{LatLng, Source};
use skytrace::services::{Phase, StreamController, Update};
use skytrace::view::timeline_entry;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "skytrace", about = "Satellite imagery timeline for a map location")]
struct Cli {
    /// Latitude of the selected point
    #[arg(allow_hyphen_values = true)]
    lat: f64,
    /// Longitude of the selected point
    #[arg(allow_hyphen_values = true)]
    lon: f64,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,
    /// sentinel1, sentinel2, sentinel3, landsat8 or naip
    #[arg(long)]
    source: Option<Source>,
    /// Use the generic `images` endpoint instead of a per-source one
    #[arg(long, conflicts_with = "source", default_value_t = false)]
    any_source: bool,
    /// Print records as NDJSON on stdout; logs go to stderr
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Open the detail view of this record id once loading ends
    #[arg(long)]
    show: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    info!(api = %config.api_base_url, "Configuration loaded successfully");

    let client = HttpImageClient::new(&config)?;
    let controller = StreamController::new(Arc::new(client));

    let source = if cli.any_source {
        None
    } else {
        Some(cli.source.unwrap_or(config.default_source))
    };
    let filters = Filters {
        start_date: cli.start_date,
        end_date: cli.end_date,
        source,
    };
    let mut app = App::new(controller, filters);

    app.on_location_select(LatLng::new(cli.lat, cli.lon));

    let mut out = io::stdout().lock();
    while let Some(update) = app.next_update().await {
        match update {
            Update::Record { index } => {
                let record = &app.records()[index];
                if cli.json {
                    serde_json::to_writer(&mut out, record)?;
                    writeln!(out)?;
                } else {
                    writeln!(out, "{}", timeline_entry(record))?;
                }
                out.flush()?;
            }
            Update::Started | Update::Notice => info!("{}", app.status_line()),
            Update::Skipped | Update::Completed | Update::Failed(_) => {}
        }
    }

    eprintln!("{}", app.status_line());

    if let Some(id) = cli.show.as_deref() {
        if app.select_by_id(id) {
            if let Some(detail) = app.detail() {
                writeln!(out, "{detail}")?;
            }
        } else {
            warn!(id, "no record with that id");
        }
    }

    if app.phase() == Phase::Failed {
        bail!("image stream failed");
    }
    Ok(())
}

/// Initialize logging on stderr. Respects RUST_LOG, defaulting to `info`.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_writer(io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            let _ = registry.with(fmt_layer.json().flatten_event(true)).try_init();
        }
        LogFormat::Text => {
            let _ = registry.with(fmt_layer.compact()).try_init();
        }
    }
}
