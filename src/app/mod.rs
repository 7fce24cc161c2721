use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::{FeatureErrorPolicy, Settings};
use crate::project::Project;
use crate::source::FeatureSource;
use crate::strategy::{MergeJob, MergeOutcome, default_strategies, run_fallback};

#[derive(Parser)]
#[command(author, version, about = "Merge vector layers into a single GeoJSON file", long_about = None)]
pub struct Cli {
    /// Layer files to merge (.geojson, .json, .geojsonl, .ndjson)
    #[arg(required_unless_present = "project", conflicts_with = "project")]
    pub layers: Vec<PathBuf>,

    /// Project file (YAML) listing the layers to merge
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Output GeoJSON file (default: combined_layers.geojson on the desktop)
    #[arg(short, long, env = "JUICER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// What to do with features that cannot be copied
    #[arg(long, value_enum)]
    pub on_feature_error: Option<FeatureErrorPolicy>,

    /// Refuse to write mixed geometry types
    #[arg(long)]
    pub strict_geometry: bool,

    /// Write the combined extent as a top-level bbox
    #[arg(long)]
    pub write_bbox: bool,

    /// Add a field holding each feature's source layer name
    #[arg(long)]
    pub source_field: Option<String>,

    /// Do not add the combined layer to the project
    #[arg(long)]
    pub no_register: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(output) = &self.output {
            settings.output = Some(output.clone());
        }
        if let Some(policy) = self.on_feature_error {
            settings.on_feature_error = policy;
        }
        if self.strict_geometry {
            settings.strict_geometry = true;
        }
        if self.write_bbox {
            settings.write_bbox = true;
        }
        if let Some(field) = &self.source_field {
            settings.source_field = Some(field.clone());
        }
        if self.no_register {
            settings.register = false;
        }
    }
}

/// Discovers the layers, merges them through the fallback chain and
/// registers the result with the project.
pub fn run(cli: &Cli) -> Result<MergeOutcome> {
    let mut project = match &cli.project {
        Some(path) => Project::load(path)?,
        None => Project::from_paths(&cli.layers),
    };
    tracing::info!("Project has {} layers", project.layers().len());

    let mut settings = project.settings();
    cli.apply_overrides(&mut settings);
    let output = settings.output_path()?;
    tracing::info!("Output will be saved to: {:?}", output);
    tracing::info!("Feature errors: {}", settings.on_feature_error.label());

    let layers = project.vector_layers(&output)?;
    println!("Found {} vector layers:", layers.len());
    for layer in &layers {
        println!(
            "  - {} ({} features, {} fields)",
            layer.name(),
            layer.feature_count(),
            layer.fields().len()
        );
    }
    let job = MergeJob::new(layers, output, settings)?;
    tracing::info!(
        "Combined schema: {} fields, {} features in total",
        job.schema.field_count(),
        job.total_features()
    );

    let outcome = run_fallback(&job, &default_strategies())?;

    if job.settings.register {
        project.register_layer(&job.settings.display_name, &outcome.output)?;
        if project.save()? {
            tracing::info!("Project: Saved with layer {}", job.settings.display_name);
        }
    }

    Ok(outcome)
}
