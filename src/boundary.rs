use crate::catalog::Palette;
use crate::config::{BoundaryPopupConfig, BoundarySourceConfig};
use crate::error::{MapError, Result};
use crate::popup::escape_html;
use crate::types::{BoundaryFeature, FeatureStyle, Layer};
use futures::future::try_join_all;
use geo::MultiPolygon;
use geojson::GeoJson;
use std::collections::BTreeMap;
use std::convert::TryInto;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const COUNTY_LAYER_SUFFIX: &str = "County Boundaries";
const COUNTY_FIELD: &str = "COUNTY_NAME";
const COUNTY_ALIAS: &str = "County:";

/// Which property a boundary layer shows in its popup, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryPopup {
    pub field: String,
    pub alias: String,
}

impl BoundaryPopup {
    /// An explicit override wins; otherwise county layers get the county-name popup.
    pub fn resolve(layer_name: &str, explicit: Option<&BoundaryPopupConfig>) -> Option<Self> {
        if let Some(c) = explicit {
            return Some(Self {
                field: c.field.clone(),
                alias: c.alias.clone(),
            });
        }
        if layer_name.trim_end().ends_with(COUNTY_LAYER_SUFFIX) {
            return Some(Self {
                field: COUNTY_FIELD.to_string(),
                alias: COUNTY_ALIAS.to_string(),
            });
        }
        None
    }

    fn render(&self, properties: &BTreeMap<String, String>) -> Option<String> {
        properties.get(&self.field).map(|value| {
            format!(
                "<strong>{}</strong> {}",
                escape_html(&self.alias),
                escape_html(value)
            )
        })
    }
}

pub struct BoundarySource {
    client: reqwest::Client,
}

impl BoundarySource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| MapError::fetch("*", "http client", e))?;
        Ok(Self { client })
    }

    /// Fetch every source concurrently. The first failure aborts the whole set.
    pub async fn fetch_all(&self, sources: &[BoundarySourceConfig], palette: &Palette) -> Result<Vec<Layer>> {
        let fetches = sources
            .iter()
            .enumerate()
            .map(|(i, source)| self.fetch(source, FeatureStyle::solid(palette.color_for(i))));
        let layers = try_join_all(fetches).await?;
        info!("Fetched {} boundary layers", layers.len());
        Ok(layers)
    }

    pub async fn fetch(&self, source: &BoundarySourceConfig, style: FeatureStyle) -> Result<Layer> {
        let payload = if is_remote(&source.url) {
            let url = with_all_features_filter(&source.url)
                .map_err(|e| MapError::fetch(&source.name, &source.url, e))?;
            info!("Fetching boundary layer '{}' from {}", source.name, url);
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| MapError::fetch(&source.name, url.as_str(), e))?;
            response
                .text()
                .await
                .map_err(|e| MapError::fetch(&source.name, url.as_str(), e))?
        } else {
            info!("Loading boundary layer '{}' from {}", source.name, source.url);
            tokio::fs::read_to_string(&source.url)
                .await
                .map_err(|e| MapError::fetch(&source.name, &source.url, e))?
        };

        let popup = BoundaryPopup::resolve(&source.name, source.popup.as_ref());
        let features = parse_features(&source.name, &payload, &style, popup.as_ref())?;
        Ok(Layer::boundary(source.name.clone(), features))
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// ArcGIS `/query` endpoints return nothing without a `where` clause; fill in
/// whichever of the "all features" parameters the URL leaves out.
pub fn with_all_features_filter(raw: &str) -> std::result::Result<Url, url::ParseError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with("/query") {
        return Ok(url);
    }
    let present: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    let defaults = [("where", "1=1"), ("outFields", "*"), ("f", "geojson")];
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in defaults {
            if !present.iter().any(|p| p == key) {
                pairs.append_pair(key, value);
            }
        }
    }
    Ok(url)
}

/// Parse a FeatureCollection payload into boundary features.
pub fn parse_features(
    layer_name: &str,
    payload: &str,
    style: &FeatureStyle,
    popup: Option<&BoundaryPopup>,
) -> Result<Vec<BoundaryFeature>> {
    let what = format!("boundary layer '{}'", layer_name);
    let geojson: GeoJson = payload.parse().map_err(|e| MapError::parse(&what, e))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(MapError::parse(&what, "payload is not a FeatureCollection")),
    };

    let mut features = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in collection.features {
        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| MapError::parse(&what, format!("invalid geometry: {:?}", e)))?;
                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        skipped += 1;
                        continue;
                    }
                }
            }
            None => {
                skipped += 1;
                continue;
            }
        };

        let properties: BTreeMap<String, String> = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, v)| property_string(v).map(|s| (k, s)))
            .collect();

        let popup = popup.and_then(|p| p.render(&properties));
        features.push(BoundaryFeature {
            geometry,
            properties,
            style: style.clone(),
            popup,
        });
    }

    if skipped > 0 {
        debug!("Skipped {} non-polygon features in '{}'", skipped, layer_name);
    }
    Ok(features)
}

fn property_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const COUNTIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "COUNTY_NAME": "Howard", "FIPS": 27, "NOTE": null },
                "geometry": { "type": "Polygon", "coordinates": [[[-77.0, 39.1], [-76.8, 39.1], [-76.8, 39.3], [-77.0, 39.1]]] }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Marker" },
                "geometry": { "type": "Point", "coordinates": [-76.0, 39.0] }
            }
        ]
    }"#;

    #[test]
    fn county_layers_get_county_popup() {
        let popup = BoundaryPopup::resolve("MDOT SHA County Boundaries", None).unwrap();
        let features = parse_features("Counties", COUNTIES, &FeatureStyle::solid("#2C557E"), Some(&popup)).unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].popup.as_deref(), Some("<strong>County:</strong> Howard"));
        assert_eq!(features[0].properties.get("FIPS").map(String::as_str), Some("27"));
        assert!(!features[0].properties.contains_key("NOTE"));
        assert_eq!(features[0].style.stroke_color, "#2C557E");
    }

    #[test]
    fn other_layers_have_no_popup() {
        assert_eq!(BoundaryPopup::resolve("Legislative Districts", None), None);
        let features = parse_features("Districts", COUNTIES, &FeatureStyle::solid("#000000"), None).unwrap();
        assert_eq!(features[0].popup, None);
    }

    #[test]
    fn explicit_popup_overrides_name_rule() {
        let explicit = BoundaryPopupConfig {
            field: "DISTRICT".into(),
            alias: "District:".into(),
        };
        let popup = BoundaryPopup::resolve("Legislative Districts", Some(&explicit)).unwrap();
        assert_eq!(popup.field, "DISTRICT");
    }

    #[test]
    fn non_collection_payload_is_parse_error() {
        let point = r#"{ "type": "Point", "coordinates": [0.0, 0.0] }"#;
        let err = parse_features("x", point, &FeatureStyle::solid("#000000"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = parse_features("x", "<html>oops</html>", &FeatureStyle::solid("#000000"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn query_endpoints_get_all_features_filter() {
        let url = with_all_features_filter("https://example.test/FeatureServer/0/query?f=geojson").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert!(pairs.contains(&("where".into(), "1=1".into())));
        assert!(pairs.contains(&("outFields".into(), "*".into())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "f").count(), 1);

        let plain = with_all_features_filter("https://example.test/counties.geojson").unwrap();
        assert_eq!(plain.query(), None);
    }
}
