use crate::cluster::ClusterIndex;
use geo::{MultiPolygon, Point};
use serde::Serialize;
use std::collections::BTreeMap;

/// One community resource, built from a single input row.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    // Catalog column -> non-blank value, in insertion order
    pub fields: Vec<(String, String)>,
}

impl Place {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_valid_coordinates(&self) -> bool {
        valid_coordinates(self.latitude, self.longitude)
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

pub fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    pub fill_color: String,
    #[serde(rename = "color")]
    pub stroke_color: String,
}

impl FeatureStyle {
    pub fn solid(color: &str) -> Self {
        Self {
            fill_color: color.to_string(),
            stroke_color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub geometry: MultiPolygon<f64>,
    pub properties: BTreeMap<String, String>,
    pub style: FeatureStyle,
    pub popup: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    Boundary(Vec<BoundaryFeature>),
    Markers(ClusterIndex),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub content: LayerContent,
}

impl Layer {
    pub fn boundary(name: impl Into<String>, features: Vec<BoundaryFeature>) -> Self {
        Self {
            name: name.into(),
            content: LayerContent::Boundary(features),
        }
    }

    pub fn markers(name: impl Into<String>, index: ClusterIndex) -> Self {
        Self {
            name: name.into(),
            content: LayerContent::Markers(index),
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self.content, LayerContent::Boundary(_))
    }

    /// Same layer with every boundary feature recolored; marker layers are unchanged.
    pub fn with_style(self, style: FeatureStyle) -> Self {
        match self.content {
            LayerContent::Boundary(features) => Self {
                name: self.name,
                content: LayerContent::Boundary(
                    features
                        .into_iter()
                        .map(|f| BoundaryFeature { style: style.clone(), ..f })
                        .collect(),
                ),
            },
            LayerContent::Markers(_) => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: [f64; 2],
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayer {
    pub url: String,
    pub attribution: String,
    pub max_zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocoderOptions {
    pub collapse: bool,
    pub position: ControlPosition,
    pub add_marker_on_result: bool,
    pub popup_on_found: bool,
    pub default_zoom: u8,
    pub search_placeholder: String,
}

impl Default for GeocoderOptions {
    fn default() -> Self {
        Self {
            collapse: true,
            position: ControlPosition::TopLeft,
            add_marker_on_result: true,
            popup_on_found: true,
            default_zoom: 12,
            search_placeholder: "address".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerControl {
    pub entries: Vec<String>,
}

/// Presentation bounds for marker popups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupFrame {
    pub max_width: u32,
    pub max_height: u32,
    pub icon_url: Option<String>,
    pub icon_size: [u32; 2],
}

impl Default for PopupFrame {
    fn default() -> Self {
        Self {
            max_width: 300,
            max_height: 150,
            icon_url: None,
            icon_size: [30, 20],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    pub title: String,
    pub viewport: Viewport,
    pub tiles: TileLayer,
    pub layers: Vec<Layer>,
    pub layer_control: LayerControl,
    pub geocoder: GeocoderOptions,
    pub popup: PopupFrame,
}

impl MapDocument {
    pub fn boundary_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.is_boundary())
    }

    pub fn marker_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| !l.is_boundary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_bounds_are_inclusive() {
        assert!(valid_coordinates(90.0, -180.0));
        assert!(valid_coordinates(-90.0, 180.0));
        assert!(!valid_coordinates(90.5, 0.0));
        assert!(!valid_coordinates(0.0, 181.0));
        assert!(!valid_coordinates(f64::NAN, 0.0));
        assert!(!valid_coordinates(0.0, f64::INFINITY));
    }

    #[test]
    fn with_style_recolors_boundary_features() {
        let feature = BoundaryFeature {
            geometry: MultiPolygon::new(vec![]),
            properties: BTreeMap::new(),
            style: FeatureStyle::solid("#000000"),
            popup: None,
        };
        let layer = Layer::boundary("Counties", vec![feature]).with_style(FeatureStyle::solid("#2C557E"));
        match layer.content {
            LayerContent::Boundary(features) => assert_eq!(features[0].style.fill_color, "#2C557E"),
            LayerContent::Markers(_) => panic!("expected boundary layer"),
        }
    }

    #[test]
    fn geocoder_defaults_match_search_control() {
        let json = serde_json::to_value(GeocoderOptions::default()).unwrap();
        assert_eq!(json["position"], "topleft");
        assert_eq!(json["defaultZoom"], 12);
        assert_eq!(json["searchPlaceholder"], "address");
        assert_eq!(json["addMarkerOnResult"], true);
    }
}
