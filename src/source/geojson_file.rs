use super::{VectorLayer, read_text};
use anyhow::{Context, Result};
use geojson::{Feature, GeoJson};
use std::path::Path;

/// Reads a GeoJSON document as a layer. A FeatureCollection yields its
/// features, a single Feature yields itself and a bare Geometry is wrapped
/// into one attribute-less feature.
pub fn open<P: AsRef<Path>>(name: &str, path: P) -> Result<VectorLayer> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let features = parse_features(&text)
        .with_context(|| format!("Source: Failed to parse GeoJSON from {:?}", path))?;
    Ok(VectorLayer::new(name, features))
}

pub fn parse_features(text: &str) -> Result<Vec<Feature>> {
    let geojson: GeoJson = text.parse()?;
    Ok(match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    })
}
