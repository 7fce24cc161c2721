//! Feature concatenation onto a combined schema.

mod attributes;
mod layer;

pub use attributes::project_attributes;
pub use layer::{EditSession, MemoryLayer};

use anyhow::Result;
use geojson::Feature;
use serde_json::Value;

use crate::config::FeatureErrorPolicy;
use crate::schema::CombinedSchema;
use crate::source::FeatureSource;
use crate::utils::ProgressCounter;

/// A feature left out of the combined layer under [`FeatureErrorPolicy::Continue`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFeature {
    pub layer: String,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct CopyReport {
    pub copied: usize,
    pub skipped: Vec<SkippedFeature>,
}

/// Builds the combined-layer version of a source feature: same geometry,
/// attributes projected onto `schema`, optionally tagged with the source
/// layer name under `source_field`.
pub fn combine_feature(
    feature: &Feature,
    layer_name: &str,
    schema: &CombinedSchema,
    source_field: Option<&str>,
) -> Feature {
    let mut properties = project_attributes(feature.properties.as_ref(), schema);
    if let Some(field) = source_field {
        properties.insert(field.to_string(), Value::String(layer_name.to_string()));
    }
    Feature {
        bbox: None,
        geometry: feature.geometry.clone(),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Copies every feature of every source into the session, in source order.
pub fn copy_features<S: FeatureSource>(
    session: &mut EditSession<'_>,
    sources: &[S],
    schema: &CombinedSchema,
    policy: FeatureErrorPolicy,
    source_field: Option<&str>,
) -> Result<CopyReport> {
    let mut report = CopyReport::default();
    let mut progress = ProgressCounter::new("Copying features", 1_000);

    for source in sources {
        tracing::info!("Copying features from {}...", source.name());
        for (index, feature) in source.features().iter().enumerate() {
            let combined = combine_feature(feature, source.name(), schema, source_field);
            match session.add_feature(combined) {
                Ok(()) => report.copied += 1,
                Err(err) => match policy {
                    FeatureErrorPolicy::Abort => {
                        return Err(err.context(format!(
                            "Merge: Failed to copy feature {} of layer {}",
                            index,
                            source.name()
                        )));
                    }
                    FeatureErrorPolicy::Continue => {
                        let reason = format!("{:#}", err);
                        tracing::warn!(
                            "Merge: Skipping feature {} of layer {}: {}",
                            index,
                            source.name(),
                            reason
                        );
                        report.skipped.push(SkippedFeature {
                            layer: source.name().to_string(),
                            index,
                            reason,
                        });
                    }
                },
            }
            progress.inc(1);
        }
    }

    progress.finish();
    Ok(report)
}
