//! Geometry checks shared by the merge strategies and the GeoJSON writers.

use anyhow::{Result, bail};
use geo::BoundingRect;
use geo_types::{Coord, Rect};
use geojson::{Bbox, Feature, Geometry, Position, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Coarse geometry classification. Multi-part types belong to the family of
/// their parts, so a layer mixing `Point` and `MultiPoint` is still uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeometryFamily {
    Point,
    Line,
    Polygon,
    Collection,
}

impl GeometryFamily {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Point(_) | Value::MultiPoint(_) => GeometryFamily::Point,
            Value::LineString(_) | Value::MultiLineString(_) => GeometryFamily::Line,
            Value::Polygon(_) | Value::MultiPolygon(_) => GeometryFamily::Polygon,
            Value::GeometryCollection(_) => GeometryFamily::Collection,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GeometryFamily::Point => "point",
            GeometryFamily::Line => "line",
            GeometryFamily::Polygon => "polygon",
            GeometryFamily::Collection => "geometry collection",
        }
    }
}

impl fmt::Display for GeometryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Families present among the features; features without geometry are ignored.
pub fn families<'a, I>(features: I) -> BTreeSet<GeometryFamily>
where
    I: IntoIterator<Item = &'a Feature>,
{
    features
        .into_iter()
        .filter_map(|feature| feature.geometry.as_ref())
        .map(|geometry| GeometryFamily::of(&geometry.value))
        .collect()
}

/// Rejects geometries that cannot be written as valid GeoJSON.
pub fn validate_geometry(geometry: &Geometry) -> Result<()> {
    validate_value(&geometry.value)
}

fn validate_value(value: &Value) -> Result<()> {
    match value {
        Value::Point(position) => check_position(position),
        Value::MultiPoint(positions) => positions.iter().try_for_each(|p| check_position(p)),
        Value::LineString(line) => check_line(line),
        Value::MultiLineString(lines) => lines.iter().try_for_each(|line| check_line(line)),
        Value::Polygon(rings) => rings.iter().try_for_each(|ring| check_ring(ring)),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .try_for_each(|ring| check_ring(ring)),
        Value::GeometryCollection(members) => members.iter().try_for_each(validate_geometry),
    }
}

fn check_position(position: &[f64]) -> Result<()> {
    if position.len() < 2 {
        bail!(
            "position has {} ordinate(s), at least 2 are required",
            position.len()
        );
    }
    if let Some(bad) = position.iter().find(|ordinate| !ordinate.is_finite()) {
        bail!("position contains a non-finite ordinate ({})", bad);
    }
    Ok(())
}

fn check_line(line: &[Position]) -> Result<()> {
    if line.len() < 2 {
        bail!("line string has {} position(s), at least 2 are required", line.len());
    }
    line.iter().try_for_each(|p| check_position(p))
}

fn check_ring(ring: &[Position]) -> Result<()> {
    if ring.len() < 4 {
        bail!("polygon ring has {} position(s), at least 4 are required", ring.len());
    }
    ring.iter().try_for_each(|p| check_position(p))?;
    if ring.first() != ring.last() {
        bail!("polygon ring is not closed");
    }
    Ok(())
}

/// Running 2D extent of the geometries written so far.
#[derive(Debug, Default)]
pub struct Bounds {
    rect: Option<Rect<f64>>,
}

impl Bounds {
    pub fn include(&mut self, geometry: &Geometry) {
        let Ok(geometry) = geo_types::Geometry::<f64>::try_from(geometry.value.clone()) else {
            return;
        };
        let Some(rect) = geometry.bounding_rect() else {
            return;
        };
        self.rect = Some(match self.rect {
            None => rect,
            Some(current) => Rect::new(
                Coord {
                    x: current.min().x.min(rect.min().x),
                    y: current.min().y.min(rect.min().y),
                },
                Coord {
                    x: current.max().x.max(rect.max().x),
                    y: current.max().y.max(rect.max().y),
                },
            ),
        });
    }

    pub fn to_bbox(&self) -> Option<Bbox> {
        self.rect.map(|rect| {
            vec![rect.min().x, rect.min().y, rect.max().x, rect.max().y]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(value: Value) -> Geometry {
        Geometry::new(value)
    }

    #[test]
    fn multi_parts_share_family_with_single_parts() {
        let point = Value::Point(vec![0.0, 0.0]);
        let multi = Value::MultiPoint(vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
        assert_eq!(GeometryFamily::of(&point), GeometryFamily::of(&multi));
    }

    #[test]
    fn rejects_short_line_string() {
        let line = geometry(Value::LineString(vec![vec![0.0, 0.0]]));
        let err = validate_geometry(&line).unwrap_err();
        assert!(err.to_string().contains("line string"));
    }

    #[test]
    fn rejects_open_ring() {
        let polygon = geometry(Value::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
        ]]));
        let err = validate_geometry(&polygon).unwrap_err();
        assert!(err.to_string().contains("not closed"));
    }

    #[test]
    fn rejects_one_dimensional_position_inside_collection() {
        let collection = geometry(Value::GeometryCollection(vec![
            geometry(Value::Point(vec![1.0, 2.0])),
            geometry(Value::Point(vec![1.0])),
        ]));
        assert!(validate_geometry(&collection).is_err());
    }

    #[test]
    fn rejects_non_finite_ordinates() {
        let point = geometry(Value::Point(vec![f64::NAN, 1.0]));
        assert!(validate_geometry(&point).is_err());
    }

    #[test]
    fn accepts_closed_polygon_with_elevation() {
        let polygon = geometry(Value::Polygon(vec![vec![
            vec![0.0, 0.0, 5.0],
            vec![1.0, 0.0, 5.0],
            vec![1.0, 1.0, 5.0],
            vec![0.0, 0.0, 5.0],
        ]]));
        assert!(validate_geometry(&polygon).is_ok());
    }

    #[test]
    fn families_skip_features_without_geometry() {
        let features = vec![
            Feature::from(geometry(Value::Point(vec![0.0, 0.0]))),
            Feature {
                bbox: None,
                geometry: None,
                id: None,
                properties: None,
                foreign_members: None,
            },
            Feature::from(geometry(Value::LineString(vec![
                vec![0.0, 0.0],
                vec![1.0, 1.0],
            ]))),
        ];
        let found = families(&features);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&GeometryFamily::Point));
        assert!(found.contains(&GeometryFamily::Line));
    }

    #[test]
    fn bounds_cover_all_included_geometries() {
        let mut bounds = Bounds::default();
        assert!(bounds.to_bbox().is_none());

        bounds.include(&geometry(Value::Point(vec![-1.0, 2.0])));
        bounds.include(&geometry(Value::LineString(vec![
            vec![3.0, -4.0],
            vec![5.0, 0.5],
        ])));

        assert_eq!(bounds.to_bbox(), Some(vec![-1.0, -4.0, 5.0, 2.0]));
    }
}
