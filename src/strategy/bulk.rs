use anyhow::{Context, Result};

use super::{MergeJob, MergeOutcome, Strategy};
use crate::config::FeatureErrorPolicy;
use crate::geometry::validate_geometry;
use crate::merge::{MemoryLayer, combine_feature, copy_features};
use crate::sinks::{GeoJsonSink, write_collection};
use crate::source::FeatureSource;
use crate::utils::ProgressCounter;

/// Method 1: streams every feature straight into the output file.
pub struct BulkToFile;

impl Strategy for BulkToFile {
    fn name(&self) -> &'static str {
        "bulk-merge-to-file"
    }

    fn run(&self, job: &MergeJob) -> Result<MergeOutcome> {
        job.single_geometry_family()?;

        let source_field = job.settings.source_field.as_deref();
        let mut sink = GeoJsonSink::new(&job.output, job.sink_options())?;
        let mut progress = ProgressCounter::new("Writing features", 1_000);

        for layer in &job.layers {
            for (index, feature) in layer.features().iter().enumerate() {
                if let Some(geometry) = &feature.geometry {
                    validate_geometry(geometry).with_context(|| {
                        format!(
                            "Merge: Invalid geometry in feature {} of layer {}",
                            index,
                            layer.name()
                        )
                    })?;
                }
                sink.add_feature(&combine_feature(
                    feature,
                    layer.name(),
                    &job.schema,
                    source_field,
                ))?;
                progress.inc(1);
            }
        }

        progress.finish();
        let features_written = sink.finish()?;
        Ok(MergeOutcome {
            strategy: self.name(),
            features_written,
            skipped: Vec::new(),
            schema: job.schema.clone(),
            output: job.output.clone(),
        })
    }
}

/// Method 2: merges into a memory layer in one edit session, then writes it.
pub struct BulkToMemory;

impl Strategy for BulkToMemory {
    fn name(&self) -> &'static str {
        "bulk-merge-to-memory"
    }

    fn run(&self, job: &MergeJob) -> Result<MergeOutcome> {
        let family = job.single_geometry_family()?;

        let mut layer = MemoryLayer::new(&job.settings.display_name, family);
        let mut session = layer.start_editing();
        for field in job.schema.fields() {
            session.add_attribute(field)?;
        }
        copy_features(
            &mut session,
            &job.layers,
            &job.schema,
            FeatureErrorPolicy::Abort,
            job.settings.source_field.as_deref(),
        )?;
        session.commit();

        let features_written =
            write_collection(&job.output, layer.into_features(), job.sink_options())?;
        Ok(MergeOutcome {
            strategy: self.name(),
            features_written,
            skipped: Vec::new(),
            schema: job.schema.clone(),
            output: job.output.clone(),
        })
    }
}
