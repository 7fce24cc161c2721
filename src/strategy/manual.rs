use anyhow::Result;

use super::{MergeJob, MergeOutcome, Strategy};
use crate::merge::{MemoryLayer, copy_features};
use crate::sinks::write_collection;

/// Method 3: copies features one by one into a layer that accepts any
/// geometry. Per-feature failures follow the configured policy.
pub struct ManualCopy;

impl Strategy for ManualCopy {
    fn name(&self) -> &'static str {
        "manual-copy"
    }

    fn run(&self, job: &MergeJob) -> Result<MergeOutcome> {
        let mut layer = MemoryLayer::new(&job.settings.display_name, None);

        let mut session = layer.start_editing();
        for field in job.schema.fields() {
            session.add_attribute(field)?;
        }
        session.commit();

        let mut session = layer.start_editing();
        let report = copy_features(
            &mut session,
            &job.layers,
            &job.schema,
            job.settings.on_feature_error,
            job.settings.source_field.as_deref(),
        )?;
        session.commit();
        tracing::info!("Merge: Copied {} features", report.copied);

        if !report.skipped.is_empty() {
            tracing::warn!(
                "Merge: {} of {} features were skipped",
                report.skipped.len(),
                job.total_features()
            );
        }

        let features_written =
            write_collection(&job.output, layer.into_features(), job.sink_options())?;
        Ok(MergeOutcome {
            strategy: self.name(),
            features_written,
            skipped: report.skipped,
            schema: job.schema.clone(),
            output: job.output.clone(),
        })
    }
}
