mod app;
mod config;
mod geometry;
mod merge;
mod project;
mod schema;
mod sinks;
mod source;
mod strategy;
mod utils;

use anyhow::Result;
use clap::Parser;

use app::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let start = std::time::Instant::now();
    let outcome = app::run(&cli)?;

    println!(
        "Combined GeoJSON file created at {} ({} features, {} fields, method: {}, {:.2}s)",
        outcome.output.display(),
        outcome.features_written,
        outcome.schema.field_count(),
        outcome.strategy,
        start.elapsed().as_secs_f64()
    );
    if !outcome.skipped.is_empty() {
        println!(
            "{} features were skipped; check that the layers contain valid geometries",
            outcome.skipped.len()
        );
        for skipped in &outcome.skipped {
            println!(
                "  - {} feature {}: {}",
                skipped.layer, skipped.index, skipped.reason
            );
        }
    }

    Ok(())
}
