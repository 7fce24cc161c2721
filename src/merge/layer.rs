use anyhow::{Context, Result, bail};
use geojson::Feature;

use crate::geometry::{GeometryFamily, validate_geometry};
use crate::source::FeatureSource;

/// The combined collection while it is being built. Fields and features can
/// only change through an [`EditSession`].
#[derive(Debug)]
pub struct MemoryLayer {
    name: String,
    geometry_family: Option<GeometryFamily>,
    fields: Vec<String>,
    features: Vec<Feature>,
}

impl MemoryLayer {
    /// `geometry_family` restricts the accepted geometries; `None` accepts any.
    pub fn new(name: impl Into<String>, geometry_family: Option<GeometryFamily>) -> Self {
        Self {
            name: name.into(),
            geometry_family,
            fields: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Opens an edit session. The session borrows the layer mutably, so there
    /// is never more than one open at a time.
    pub fn start_editing(&mut self) -> EditSession<'_> {
        EditSession {
            layer: self,
            pending_fields: Vec::new(),
            pending_features: Vec::new(),
            committed: false,
        }
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field == name)
    }
}

impl FeatureSource for MemoryLayer {
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

/// Staged changes to a [`MemoryLayer`]. Nothing reaches the layer until
/// [`EditSession::commit`]; dropping the session discards the staged changes.
pub struct EditSession<'a> {
    layer: &'a mut MemoryLayer,
    pending_fields: Vec<String>,
    pending_features: Vec<Feature>,
    committed: bool,
}

impl EditSession<'_> {
    pub fn add_attribute(&mut self, name: &str) -> Result<()> {
        if self.has_field(name) {
            bail!("field {:?} already exists on layer {}", name, self.layer.name);
        }
        self.pending_fields.push(name.to_string());
        Ok(())
    }

    pub fn add_feature(&mut self, feature: Feature) -> Result<()> {
        if let Some(geometry) = &feature.geometry {
            validate_geometry(geometry).context("invalid geometry")?;
            let family = GeometryFamily::of(&geometry.value);
            if let Some(expected) = self.layer.geometry_family
                && family != expected
            {
                bail!(
                    "{} geometry cannot be added to {} layer {}",
                    family,
                    expected,
                    self.layer.name
                );
            }
        }
        if let Some(properties) = &feature.properties
            && let Some(unknown) = properties.keys().find(|key| !self.has_field(key))
        {
            bail!("field {:?} does not exist on layer {}", unknown, self.layer.name);
        }
        self.pending_features.push(feature);
        Ok(())
    }

    /// Applies the staged changes and returns the number of features added.
    pub fn commit(mut self) -> usize {
        let added = self.pending_features.len();
        self.layer.fields.append(&mut self.pending_fields);
        self.layer.features.append(&mut self.pending_features);
        self.committed = true;
        added
    }

    fn has_field(&self, name: &str) -> bool {
        self.layer.has_field(name) || self.pending_fields.iter().any(|field| field == name)
    }
}

impl Drop for EditSession<'_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(
                "Merge: Rolled back edit session on {} ({} fields, {} features discarded)",
                self.layer.name,
                self.pending_fields.len(),
                self.pending_features.len()
            );
        }
    }
}
