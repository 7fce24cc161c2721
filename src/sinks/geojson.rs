use super::{AtomicFile, FamilyGuard, SinkOptions};
use crate::geometry::Bounds;
use anyhow::Result;
use geojson::Feature;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Streams a FeatureCollection to disk one feature at a time. The file only
/// appears at its final path when [`GeoJsonSink::finish`] succeeds.
pub struct GeoJsonSink {
    file: AtomicFile,
    path: PathBuf,
    options: SinkOptions,
    guard: FamilyGuard,
    bounds: Bounds,
    count: usize,
}

impl GeoJsonSink {
    pub fn new<P: AsRef<Path>>(path: P, options: SinkOptions) -> Result<Self> {
        let mut file = AtomicFile::create(path.as_ref())?;

        // Write the header of the FeatureCollection
        writeln!(file, "{{")?;
        writeln!(file, "  \"type\": \"FeatureCollection\",")?;
        writeln!(file, "  \"features\": [")?;

        tracing::info!("Sink: geojson -> {:?}", path.as_ref());
        Ok(Self {
            file,
            path: path.as_ref().to_path_buf(),
            options,
            guard: FamilyGuard::default(),
            bounds: Bounds::default(),
            count: 0,
        })
    }

    pub fn add_feature(&mut self, feature: &Feature) -> Result<()> {
        if self.options.strict_geometry {
            self.guard.check(feature)?;
        }
        if self.options.write_bbox
            && let Some(geometry) = &feature.geometry
        {
            self.bounds.include(geometry);
        }

        if self.count > 0 {
            writeln!(self.file, ",")?;
        }
        serde_json::to_writer(&mut self.file, feature)?;
        self.count += 1;
        Ok(())
    }

    /// Closes the collection and moves the file into place. Returns the
    /// number of features written.
    pub fn finish(mut self) -> Result<usize> {
        // Close the array, then the object
        if self.count > 0 {
            writeln!(self.file)?;
        }
        write!(self.file, "  ]")?;
        if self.options.write_bbox
            && let Some(bbox) = self.bounds.to_bbox()
        {
            write!(self.file, ",\n  \"bbox\": {}", serde_json::to_string(&bbox)?)?;
        }
        writeln!(self.file)?;
        writeln!(self.file, "}}")?;
        self.file.commit()?;
        tracing::info!("Sink: wrote {} features to {:?}", self.count, self.path);
        Ok(self.count)
    }
}
