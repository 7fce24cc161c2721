//! The project: which layers exist, which of them are vector layers, and
//! where the combined layer gets registered once written.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::sinks::AtomicFile;
use crate::source::{VectorLayer, geojson_file, geojsonl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    GeoJson,
    GeoJsonSeq,
    /// Anything that is not a vector layer; listed but never merged.
    Raster,
}

impl LayerKind {
    pub fn infer(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("geojson" | "json") => LayerKind::GeoJson,
            Some("geojsonl" | "geojsonseq" | "jsonl" | "ndjson") => LayerKind::GeoJsonSeq,
            _ => LayerKind::Raster,
        }
    }

    pub fn is_vector(&self) -> bool {
        !matches!(self, LayerKind::Raster)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LayerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LayerKind>,
}

impl LayerEntry {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        })
    }

    pub fn kind(&self) -> LayerKind {
        self.kind.unwrap_or_else(|| LayerKind::infer(&self.path))
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub layers: Vec<LayerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<Settings>,
}

#[derive(Debug)]
pub struct Project {
    manifest: ProjectManifest,
    base_dir: PathBuf,
    manifest_path: Option<PathBuf>,
}

impl Project {
    pub fn load(path: &Path) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()
            .with_context(|| format!("Project: Failed to read {:?}", path))?;
        let manifest: ProjectManifest = settings
            .try_deserialize()
            .with_context(|| format!("Project: Invalid project file {:?}", path))?;

        let manifest_path = std::path::absolute(path)
            .with_context(|| format!("Project: Cannot resolve {:?}", path))?;
        let base_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        tracing::info!(
            "Project: {:?} ({} layers)",
            manifest_path,
            manifest.layers.len()
        );
        Ok(Self {
            manifest,
            base_dir,
            manifest_path: Some(manifest_path),
        })
    }

    /// A project made of the given files, relative to the working directory.
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let layers = paths
            .iter()
            .map(|path| LayerEntry {
                name: None,
                path: path.clone(),
                kind: None,
            })
            .collect();
        Self {
            manifest: ProjectManifest {
                layers,
                merge: None,
            },
            base_dir: PathBuf::new(),
            manifest_path: None,
        }
    }

    /// Merge settings from the manifest. A relative output path is taken
    /// relative to the manifest, like the layer paths.
    pub fn settings(&self) -> Settings {
        let mut settings = self.manifest.merge.clone().unwrap_or_default();
        if let Some(output) = &settings.output {
            settings.output = Some(self.resolve(output));
        }
        settings
    }

    pub fn layers(&self) -> &[LayerEntry] {
        &self.manifest.layers
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Loads every vector layer of the project. Non-vector entries and the
    /// entry pointing at `exclude` (the merge output) are skipped.
    pub fn vector_layers(&self, exclude: &Path) -> Result<Vec<VectorLayer>> {
        let mut layers = Vec::new();
        for entry in &self.manifest.layers {
            let name = entry.display_name();
            let path = self.resolve(&entry.path);
            let kind = entry.kind();
            if !kind.is_vector() {
                tracing::info!("Project: Skipping non-vector layer {} ({:?})", name, path);
                continue;
            }
            if same_file(&path, exclude) {
                tracing::warn!(
                    "Project: Skipping layer {} because it is the merge output",
                    name
                );
                continue;
            }
            let layer = match kind {
                LayerKind::GeoJson => geojson_file::open(&name, &path)?,
                LayerKind::GeoJsonSeq => geojsonl::open(&name, &path)?,
                LayerKind::Raster => continue,
            };
            layers.push(layer);
        }

        if layers.is_empty() {
            bail!("Project: No vector layers found in the project");
        }

        Ok(layers)
    }

    /// Adds the merge output as a GeoJSON layer, replacing an earlier entry
    /// with the same name.
    pub fn register_layer(&mut self, name: &str, path: &Path) -> Result<()> {
        let absolute = std::path::absolute(path)
            .with_context(|| format!("Project: Cannot resolve {:?}", path))?;
        let path = match absolute.strip_prefix(&self.base_dir) {
            Ok(relative) if !self.base_dir.as_os_str().is_empty() => relative.to_path_buf(),
            _ => absolute.clone(),
        };
        let entry = LayerEntry {
            name: Some(name.to_string()),
            path,
            kind: Some(LayerKind::GeoJson),
        };

        let layers = &mut self.manifest.layers;
        match layers
            .iter_mut()
            .find(|existing| existing.name.as_deref() == Some(name))
        {
            Some(existing) => *existing = entry,
            None => layers.push(entry),
        }
        tracing::info!("Project: Registered layer {} -> {:?}", name, absolute);
        Ok(())
    }

    /// Writes the manifest back if the project was loaded from one. Returns
    /// whether anything was written.
    pub fn save(&self) -> Result<bool> {
        let Some(path) = &self.manifest_path else {
            return Ok(false);
        };
        let yaml = serde_yaml::to_string(&self.manifest)
            .context("Project: Failed to serialize project")?;
        let mut file = AtomicFile::create(path)?;
        file.write_all(yaml.as_bytes())?;
        file.commit()?;
        Ok(true)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
