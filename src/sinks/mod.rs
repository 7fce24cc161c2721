use anyhow::{Context, Result, anyhow, bail};
use ::geojson::{Feature, FeatureCollection};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::geometry::{Bounds, GeometryFamily};

pub mod geojson;

pub use self::geojson::GeoJsonSink;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkOptions {
    /// Every geometry must belong to the same family.
    pub strict_geometry: bool,
    /// Write the collection's extent as a top-level `bbox` member.
    pub write_bbox: bool,
}

/// Output file that only appears at its final path once complete. Writes go
/// to a temporary file next to the target which is renamed over it on
/// [`AtomicFile::commit`]; dropping an uncommitted file deletes the temporary.
pub struct AtomicFile {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl AtomicFile {
    pub fn create<P: AsRef<Path>>(target: P) -> Result<Self> {
        let target = target.as_ref();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let existing = std::fs::metadata(target)
            .ok()
            .map(|metadata| metadata.permissions());

        let mut builder = tempfile::Builder::new();
        builder.prefix(".juicer-").suffix(".tmp");
        // Temp files default to 0600; a new output gets the usual umask mode.
        #[cfg(unix)]
        if existing.is_none() {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let temp = builder
            .tempfile_in(dir)
            .with_context(|| format!("Sink: Cannot create a temporary file in {:?}", dir))?;
        if let Some(permissions) = existing {
            temp.as_file()
                .set_permissions(permissions)
                .with_context(|| format!("Sink: Cannot copy the permissions of {:?}", target))?;
        }
        Ok(Self {
            target: target.to_path_buf(),
            writer: BufWriter::new(temp),
        })
    }

    pub fn commit(self) -> Result<()> {
        let Self { target, writer } = self;
        let temp = writer
            .into_inner()
            .map_err(|err| anyhow!("Sink: Failed to flush {:?}: {}", target, err.error()))?;
        temp.as_file()
            .sync_all()
            .with_context(|| format!("Sink: Failed to sync {:?}", target))?;
        temp.persist(&target)
            .map_err(|err| err.error)
            .with_context(|| format!("Sink: Failed to move output into place at {:?}", target))?;
        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Enforces [`SinkOptions::strict_geometry`]: the first geometry fixes the
/// family, later ones must match.
#[derive(Debug, Default)]
struct FamilyGuard {
    family: Option<GeometryFamily>,
}

impl FamilyGuard {
    fn check(&mut self, feature: &Feature) -> Result<()> {
        let Some(geometry) = &feature.geometry else {
            return Ok(());
        };
        let family = GeometryFamily::of(&geometry.value);
        match self.family {
            None => self.family = Some(family),
            Some(expected) if expected != family => {
                bail!(
                    "Sink: Strict output cannot hold mixed geometry types ({} and {})",
                    expected,
                    family
                );
            }
            Some(_) => {}
        }
        Ok(())
    }
}

/// Writes a complete FeatureCollection in one go. Returns the number of
/// features written.
pub fn write_collection<P: AsRef<Path>>(
    path: P,
    features: Vec<Feature>,
    options: SinkOptions,
) -> Result<usize> {
    let path = path.as_ref();
    let mut guard = FamilyGuard::default();
    let mut bounds = Bounds::default();
    for feature in &features {
        if options.strict_geometry {
            guard.check(feature)?;
        }
        if options.write_bbox
            && let Some(geometry) = &feature.geometry
        {
            bounds.include(geometry);
        }
    }

    let count = features.len();
    let collection = FeatureCollection {
        bbox: if options.write_bbox {
            bounds.to_bbox()
        } else {
            None
        },
        features,
        foreign_members: None,
    };

    let mut file = AtomicFile::create(path)?;
    serde_json::to_writer(&mut file, &collection)
        .with_context(|| format!("Sink: Failed to serialize features to {:?}", path))?;
    writeln!(file)?;
    file.commit()?;

    tracing::info!("Sink: geojson -> {:?} ({} features)", path, count);
    Ok(count)
}
