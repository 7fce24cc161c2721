//! Merge strategies and the fallback chain that runs them.
//!
//! Strategies are tried in order; the first success ends the chain and each
//! failure is logged before the next one is tried:
//!
//!   1. bulk merge streamed straight to the output file
//!   2. bulk merge into a memory layer, then written out
//!   3. manual copy into a generic memory layer, then written out

mod bulk;
mod manual;

pub use bulk::{BulkToFile, BulkToMemory};
pub use manual::ManualCopy;

use anyhow::{Result, anyhow, bail};
use std::path::PathBuf;

use crate::config::Settings;
use crate::geometry::{GeometryFamily, families};
use crate::merge::SkippedFeature;
use crate::schema::CombinedSchema;
use crate::sinks::SinkOptions;
use crate::source::{FeatureSource, VectorLayer};

/// Everything a strategy needs: the discovered layers, their combined
/// schema and where to write.
#[derive(Debug)]
pub struct MergeJob {
    pub layers: Vec<VectorLayer>,
    pub schema: CombinedSchema,
    pub output: PathBuf,
    pub settings: Settings,
}

impl MergeJob {
    pub fn new(layers: Vec<VectorLayer>, output: PathBuf, settings: Settings) -> Result<Self> {
        if layers.is_empty() {
            bail!("Merge: No vector layers to merge");
        }
        let mut schema = CombinedSchema::unify(&layers)?;
        if let Some(field) = &settings.source_field {
            if schema.fields().any(|existing| existing == field) {
                bail!(
                    "Merge: Source field {:?} already exists in the layers; choose another name",
                    field
                );
            }
            schema = schema.with_field(field);
        }
        Ok(Self {
            layers,
            schema,
            output,
            settings,
        })
    }

    pub fn sink_options(&self) -> SinkOptions {
        SinkOptions {
            strict_geometry: self.settings.strict_geometry,
            write_bbox: self.settings.write_bbox,
        }
    }

    pub fn total_features(&self) -> usize {
        self.layers.iter().map(|layer| layer.feature_count()).sum()
    }

    /// The bulk strategies only merge layers of one geometry family. Returns
    /// that family, or `None` when no feature has a geometry.
    pub fn single_geometry_family(&self) -> Result<Option<GeometryFamily>> {
        let found = families(self.layers.iter().flat_map(|layer| layer.features()));
        if found.len() > 1 {
            let names: Vec<&str> = found.iter().map(GeometryFamily::label).collect();
            bail!(
                "Merge: Layers have different geometry types ({}); a bulk merge needs one",
                names.join(", ")
            );
        }
        Ok(found.into_iter().next())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub strategy: &'static str,
    pub features_written: usize,
    pub skipped: Vec<SkippedFeature>,
    pub schema: CombinedSchema,
    pub output: PathBuf,
}

pub trait Strategy {
    fn name(&self) -> &'static str;
    fn run(&self, job: &MergeJob) -> Result<MergeOutcome>;
}

pub fn default_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(BulkToFile),
        Box::new(BulkToMemory),
        Box::new(ManualCopy),
    ]
}

/// Position in the fallback chain. Only ever moves forward; `Success` and
/// `Failed` are terminal.
#[derive(Debug)]
pub enum FallbackState {
    Trying(usize),
    Success(MergeOutcome),
    Failed(anyhow::Error),
}

impl FallbackState {
    fn advance(self, job: &MergeJob, strategies: &[Box<dyn Strategy>]) -> Self {
        let FallbackState::Trying(index) = self else {
            return self;
        };
        let Some(strategy) = strategies.get(index) else {
            return FallbackState::Failed(anyhow!("Merge: No merge strategies configured"));
        };

        tracing::info!("Method {} ({}): merging layers...", index + 1, strategy.name());
        match strategy.run(job) {
            Ok(outcome) => FallbackState::Success(outcome),
            Err(err) => {
                tracing::warn!("Method {} ({}) failed: {:#}", index + 1, strategy.name(), err);
                if index + 1 < strategies.len() {
                    tracing::info!("Trying the next method...");
                    FallbackState::Trying(index + 1)
                } else {
                    FallbackState::Failed(err)
                }
            }
        }
    }
}

/// Runs the strategies in order until one succeeds. When all of them fail
/// the last error is returned.
pub fn run_fallback(job: &MergeJob, strategies: &[Box<dyn Strategy>]) -> Result<MergeOutcome> {
    let mut state = FallbackState::Trying(0);
    loop {
        state = match state {
            FallbackState::Success(outcome) => return Ok(outcome),
            FallbackState::Failed(err) => {
                return Err(err.context(format!(
                    "Merge: All {} merge methods failed",
                    strategies.len()
                )));
            }
            trying => trying.advance(job, strategies),
        };
    }
}
