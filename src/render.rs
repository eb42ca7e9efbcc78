use crate::catalog::Palette;
use crate::cluster::{ClusterIndex, Marker};
use crate::error::{MapError, Result};
use crate::html::MAP_DOCUMENT_HTML;
use crate::popup::escape_html;
use crate::types::{
    FeatureStyle, GeocoderOptions, Layer, LayerContent, LayerControl, MapDocument, PopupFrame,
    TileLayer, Viewport,
};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Composes fetched layers and the marker index into a [`MapDocument`].
///
/// Holds only presentation settings; [`MapAssembler::assemble`] performs no I/O.
#[derive(Debug, Clone)]
pub struct MapAssembler<'a> {
    palette: &'a Palette,
    title: String,
    tiles: TileLayer,
    popup: PopupFrame,
    marker_layer: String,
}

impl<'a> MapAssembler<'a> {
    pub fn new(palette: &'a Palette) -> Self {
        Self {
            palette,
            title: "Community Resources".to_string(),
            tiles: TileLayer {
                url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                attribution: "&copy; OpenStreetMap contributors".to_string(),
                max_zoom: 19,
            },
            popup: PopupFrame::default(),
            marker_layer: "Community Resources".to_string(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn tiles(mut self, tiles: TileLayer) -> Self {
        self.tiles = tiles;
        self
    }

    pub fn popup_frame(mut self, popup: PopupFrame) -> Self {
        self.popup = popup;
        self
    }

    pub fn marker_layer(mut self, name: impl Into<String>) -> Self {
        self.marker_layer = name.into();
        self
    }

    pub fn assemble(
        &self,
        boundary_layers: Vec<Layer>,
        clusters: ClusterIndex,
        viewport: Viewport,
        geocoder: GeocoderOptions,
    ) -> MapDocument {
        let mut layers: Vec<Layer> = boundary_layers
            .into_iter()
            .enumerate()
            .map(|(i, layer)| layer.with_style(FeatureStyle::solid(self.palette.color_for(i))))
            .collect();
        layers.push(Layer::markers(self.marker_layer.clone(), clusters));

        let layer_control = LayerControl {
            entries: layers.iter().map(|l| l.name.clone()).collect(),
        };

        info!(
            "Assembled map document with {} layers ({} markers)",
            layers.len(),
            layers
                .iter()
                .map(|l| match &l.content {
                    LayerContent::Markers(index) => index.len(),
                    LayerContent::Boundary(_) => 0,
                })
                .sum::<usize>()
        );

        MapDocument {
            title: self.title.clone(),
            viewport,
            tiles: self.tiles.clone(),
            layers,
            layer_control,
            geocoder,
            popup: self.popup.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentPayload<'a> {
    viewport: &'a Viewport,
    tiles: &'a TileLayer,
    layers: Vec<LayerPayload<'a>>,
    layer_control: &'a LayerControl,
    geocoder: &'a GeocoderOptions,
    popup: &'a PopupFrame,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum LayerPayload<'a> {
    Boundary {
        name: &'a str,
        features: Vec<FeaturePayload<'a>>,
    },
    Markers {
        name: &'a str,
        markers: Vec<Marker>,
    },
}

#[derive(Serialize)]
struct FeaturePayload<'a> {
    geometry: geojson::Geometry,
    style: &'a FeatureStyle,
    popup: Option<&'a str>,
}

fn layer_payload<'a>(layer: &'a Layer, frame: &PopupFrame) -> LayerPayload<'a> {
    match &layer.content {
        LayerContent::Boundary(features) => LayerPayload::Boundary {
            name: &layer.name,
            features: features
                .iter()
                .map(|f| FeaturePayload {
                    geometry: geojson::Geometry::new(geojson::Value::from(&f.geometry)),
                    style: &f.style,
                    popup: f.popup.as_deref(),
                })
                .collect(),
        },
        LayerContent::Markers(index) => LayerPayload::Markers {
            name: &layer.name,
            markers: index
                .markers()
                .iter()
                .map(|m| Marker {
                    lat: m.lat,
                    lng: m.lng,
                    popup: format!(
                        "<div style='max-height: {}px; overflow-y: auto;'>{}</div>",
                        frame.max_height, m.popup
                    ),
                    tooltip: m.tooltip.as_deref().map(escape_html),
                })
                .collect(),
        },
    }
}

/// Serialize a document into one standalone HTML page.
pub fn render_html(document: &MapDocument) -> Result<String> {
    let payload = DocumentPayload {
        viewport: &document.viewport,
        tiles: &document.tiles,
        layers: document
            .layers
            .iter()
            .map(|l| layer_payload(l, &document.popup))
            .collect(),
        layer_control: &document.layer_control,
        geocoder: &document.geocoder,
        popup: &document.popup,
    };
    let json = serde_json::to_string(&payload)
        .map_err(|e| MapError::parse("map document payload", e))?;
    // Keep "</script>" inside string values from closing the data block
    let json = json.replace("</", "<\\/");

    let (head, rest) = MAP_DOCUMENT_HTML
        .split_once("{{TITLE}}")
        .ok_or_else(|| MapError::parse("document template", "missing title slot"))?;
    let (middle, tail) = rest
        .split_once("{{MAP_DATA}}")
        .ok_or_else(|| MapError::parse("document template", "missing data slot"))?;

    let mut html = String::with_capacity(MAP_DOCUMENT_HTML.len() + json.len());
    html.push_str(head);
    html.push_str(&escape_html(&document.title));
    html.push_str(middle);
    html.push_str(&json);
    html.push_str(tail);
    Ok(html)
}

/// Render and write the document. The file only appears once fully written.
pub fn write_document(document: &MapDocument, path: &Path) -> Result<()> {
    let html = render_html(document)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MapError::io(parent, e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    fs::write(tmp, html.as_bytes()).map_err(|e| MapError::io(tmp, e))?;
    fs::rename(tmp, path).map_err(|e| MapError::io(path, e))?;

    info!("Wrote map document to {:?} ({} bytes)", path, html.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::types::{BoundaryFeature, Place};
    use geo::{polygon, MultiPolygon};
    use std::collections::BTreeMap;

    fn boundary(name: &str) -> Layer {
        let square = polygon![(x: -77.0, y: 39.0), (x: -76.0, y: 39.0), (x: -76.0, y: 40.0), (x: -77.0, y: 39.0)];
        Layer::boundary(
            name,
            vec![BoundaryFeature {
                geometry: MultiPolygon::new(vec![square]),
                properties: BTreeMap::new(),
                style: FeatureStyle::solid("#ffffff"),
                popup: Some("<strong>County:</strong> Howard".into()),
            }],
        )
    }

    fn clusters() -> ClusterIndex {
        let places = vec![Place {
            name: Some("Acme </script>".into()),
            latitude: 39.0,
            longitude: -76.6,
            fields: vec![],
        }];
        ClusterIndex::build(&places, &FieldCatalog::default())
    }

    fn viewport() -> Viewport {
        Viewport {
            center: [39.0458, -76.6413],
            zoom: 8,
        }
    }

    fn fill_color(layer: &Layer) -> &str {
        match &layer.content {
            LayerContent::Boundary(features) => &features[0].style.fill_color,
            LayerContent::Markers(_) => panic!("expected boundary layer"),
        }
    }

    #[test]
    fn boundary_colors_cycle_through_palette() {
        let palette = Palette::default();
        let layers: Vec<Layer> = (0..5).map(|i| boundary(&format!("B{}", i))).collect();
        let doc = MapAssembler::new(&palette).assemble(layers, clusters(), viewport(), GeocoderOptions::default());

        assert_eq!(fill_color(&doc.layers[0]), "#2C557E");
        assert_eq!(fill_color(&doc.layers[1]), "#fdda25");
        assert_eq!(fill_color(&doc.layers[4]), fill_color(&doc.layers[0]));
    }

    #[test]
    fn layer_control_lists_boundaries_then_markers() {
        let palette = Palette::default();
        let doc = MapAssembler::new(&palette)
            .marker_layer("Resources")
            .assemble(vec![boundary("Counties"), boundary("Districts")], clusters(), viewport(), GeocoderOptions::default());

        assert_eq!(doc.boundary_layers().count(), 2);
        assert_eq!(doc.marker_layers().count(), 1);
        assert_eq!(doc.layer_control.entries, vec!["Counties", "Districts", "Resources"]);
    }

    #[test]
    fn rendered_page_embeds_escaped_payload() {
        let palette = Palette::default();
        let doc = MapAssembler::new(&palette)
            .title("Resources & Services")
            .assemble(vec![boundary("Counties")], clusters(), viewport(), GeocoderOptions::default());
        let html = render_html(&doc).unwrap();

        assert!(html.contains("<title>Resources &amp; Services</title>"));
        assert!(html.contains("\"searchPlaceholder\":\"address\""));
        assert!(html.contains("\"position\":\"topleft\""));
        assert!(html.contains("max-height: 150px; overflow-y: auto;"));
        assert!(html.contains("\"kind\":\"markers\""));
        assert!(html.contains("\"type\":\"MultiPolygon\""));
        // only the template's own closing tags remain
        assert_eq!(html.matches("</script>").count(), 5);
    }

    #[test]
    fn write_document_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site").join("map.html");
        let palette = Palette::default();
        let doc = MapAssembler::new(&palette).assemble(vec![], clusters(), viewport(), GeocoderOptions::default());

        write_document(&doc, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
        assert!(!path.with_file_name("map.html.tmp").exists());
    }
}
