use super::{VectorLayer, read_text};
use anyhow::{Context, Result};
use geojson::{Feature, GeoJson};
use std::path::Path;

const RECORD_SEPARATOR: char = '\u{1e}';

/// Reads newline-delimited GeoJSON (one Feature per line). RFC 8142 record
/// separators are accepted and blank lines skipped.
pub fn open<P: AsRef<Path>>(name: &str, path: P) -> Result<VectorLayer> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let features = parse_features(&text)
        .with_context(|| format!("Source: Failed to parse GeoJSON sequence from {:?}", path))?;
    Ok(VectorLayer::new(name, features))
}

pub fn parse_features(text: &str) -> Result<Vec<Feature>> {
    let mut features = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let record = line.trim_matches(|c: char| c == RECORD_SEPARATOR || c.is_whitespace());
        if record.is_empty() {
            continue;
        }
        let geojson: GeoJson = record
            .parse()
            .with_context(|| format!("Invalid record on line {}", index + 1))?;
        match geojson {
            GeoJson::Feature(feature) => features.push(feature),
            GeoJson::Geometry(geometry) => features.push(Feature::from(geometry)),
            GeoJson::FeatureCollection(collection) => features.extend(collection.features),
        }
    }
    Ok(features)
}
