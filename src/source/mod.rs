use anyhow::{Context, Result, anyhow};
use geojson::Feature;
use std::path::Path;

pub mod geojson_file;
pub mod geojsonl;

/// A named collection of features with a (possibly inconsistent) attribute schema.
pub trait FeatureSource {
    fn name(&self) -> &str;
    fn fields(&self) -> &[String];
    fn features(&self) -> &[Feature];

    fn feature_count(&self) -> usize {
        self.features().len()
    }
}

/// A vector layer read from disk.
#[derive(Debug, Clone)]
pub struct VectorLayer {
    name: String,
    fields: Vec<String>,
    features: Vec<Feature>,
}

impl VectorLayer {
    pub fn new(name: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            name: name.into(),
            fields: collect_fields(&features),
            features,
        }
    }
}

impl FeatureSource for VectorLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn features(&self) -> &[Feature] {
        &self.features
    }
}

/// Property names in the order they are first seen.
pub fn collect_fields(features: &[Feature]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for properties in features.iter().filter_map(|f| f.properties.as_ref()) {
        for key in properties.keys() {
            if !fields.iter().any(|existing| existing == key) {
                fields.push(key.clone());
            }
        }
    }
    fields
}

pub(crate) fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Source: Failed to read {:?}", path))?;
    let text = String::from_utf8(bytes).map_err(|err| {
        anyhow!(
            "Source: {:?} is not valid UTF-8 (invalid byte at offset {})",
            path,
            err.utf8_error().valid_up_to()
        )
    })?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}
