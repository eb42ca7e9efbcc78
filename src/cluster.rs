use crate::catalog::FieldCatalog;
use crate::popup::compose;
use crate::types::Place;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::{MultiPoint, Rect};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

/// A resource marker ready for the clustered layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lng: f64,
    pub popup: String,
    pub tooltip: Option<String>,
}

/// The complete marker set, rendered as one cluster group.
///
/// Bucketing by zoom level is left to the map library in the browser; this
/// only guarantees each valid place is present exactly once, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterIndex {
    markers: Vec<Marker>,
}

impl ClusterIndex {
    pub fn build(places: &[Place], catalog: &FieldCatalog) -> Self {
        let invalid = places.iter().filter(|p| !p.has_valid_coordinates()).count();
        if invalid > 0 {
            warn!("Dropping {} places with invalid coordinates from the marker layer", invalid);
        }

        // par_iter + collect keeps input order
        let markers: Vec<Marker> = places
            .par_iter()
            .filter(|p| p.has_valid_coordinates())
            .map(|place| {
                let content = compose(place, catalog);
                Marker {
                    lat: place.latitude,
                    lng: place.longitude,
                    popup: content.to_html(),
                    tooltip: content.tooltip().map(str::to_string),
                }
            })
            .collect();

        info!("Built cluster index with {} markers", markers.len());
        Self { markers }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Bounding rectangle of all markers (x = longitude, y = latitude).
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let points: MultiPoint<f64> = self
            .markers
            .iter()
            .map(|m| (m.lng, m.lat))
            .collect::<Vec<_>>()
            .into();
        points.bounding_rect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, latitude: f64, longitude: f64) -> Place {
        Place {
            name: Some(name.to_string()),
            latitude,
            longitude,
            fields: vec![],
        }
    }

    #[test]
    fn every_valid_place_appears_once_in_order() {
        let places: Vec<Place> = (0..50).map(|i| place(&format!("P{}", i), 38.0 + i as f64 * 0.01, -76.0)).collect();
        let index = ClusterIndex::build(&places, &FieldCatalog::default());
        assert_eq!(index.len(), 50);
        let names: Vec<&str> = index.markers().iter().filter_map(|m| m.tooltip.as_deref()).collect();
        let expected: Vec<String> = (0..50).map(|i| format!("P{}", i)).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn invalid_places_are_excluded() {
        let places = vec![place("ok", 39.0, -76.6), place("bad", 120.0, -76.6)];
        let index = ClusterIndex::build(&places, &FieldCatalog::default());
        assert_eq!(index.len(), 1);
        assert_eq!(index.markers()[0].tooltip.as_deref(), Some("ok"));
    }

    #[test]
    fn bounds_cover_all_markers() {
        let places = vec![place("a", 38.0, -77.0), place("b", 39.5, -75.5)];
        let rect = ClusterIndex::build(&places, &FieldCatalog::default()).bounds().unwrap();
        assert_eq!(rect.min().x, -77.0);
        assert_eq!(rect.max().y, 39.5);
        assert!(ClusterIndex::default().bounds().is_none());
    }
}
