//! Page shell for the generated map document.
//!
//! `{{TITLE}}` receives the escaped document title and `{{MAP_DATA}}` the JSON
//! payload built by [`crate::render`]. Everything else is static.

pub const MAP_DOCUMENT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">

<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>

  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css" />
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css" />
  <link rel="stylesheet" href="https://unpkg.com/leaflet-control-geocoder@2.4.0/dist/Control.Geocoder.css" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>
  <script src="https://unpkg.com/leaflet-control-geocoder@2.4.0/dist/Control.Geocoder.js"></script>

  <style>
    html, body { height: 100%; margin: 0; padding: 0; }
    #map { position: absolute; top: 0; bottom: 0; left: 0; right: 0; }
  </style>
</head>

<body>
  <div id="map"></div>

  <script id="map-data" type="application/json">{{MAP_DATA}}</script>
  <script>
    (function () {
      var data = JSON.parse(document.getElementById("map-data").textContent);
      var map = L.map("map").setView(data.viewport.center, data.viewport.zoom);

      L.tileLayer(data.tiles.url, {
        attribution: data.tiles.attribution,
        maxZoom: data.tiles.maxZoom
      }).addTo(map);

      var icon = null;
      if (data.popup.iconUrl) {
        icon = L.icon({ iconUrl: data.popup.iconUrl, iconSize: data.popup.iconSize });
      }

      var overlays = {};
      data.layers.forEach(function (layer) {
        var group;
        if (layer.kind === "boundary") {
          group = L.featureGroup();
          layer.features.forEach(function (feature) {
            var shape = L.geoJSON(feature.geometry, { style: feature.style });
            if (feature.popup) {
              shape.bindPopup(feature.popup);
            }
            group.addLayer(shape);
          });
        } else {
          group = L.markerClusterGroup();
          layer.markers.forEach(function (m) {
            var marker = icon ? L.marker([m.lat, m.lng], { icon: icon }) : L.marker([m.lat, m.lng]);
            marker.bindPopup(m.popup, { maxWidth: data.popup.maxWidth });
            if (m.tooltip) {
              marker.bindTooltip(m.tooltip);
            }
            group.addLayer(marker);
          });
        }
        group.addTo(map);
        overlays[layer.name] = group;
      });

      var toggles = {};
      data.layerControl.entries.forEach(function (name) {
        if (overlays[name]) {
          toggles[name] = overlays[name];
        }
      });
      L.control.layers(null, toggles).addTo(map);

      var geocoder = L.Control.geocoder({
        collapsed: data.geocoder.collapse,
        position: data.geocoder.position,
        placeholder: data.geocoder.searchPlaceholder,
        defaultMarkGeocode: false
      });
      geocoder.on("markgeocode", function (e) {
        var result = e.geocode;
        map.setView(result.center, data.geocoder.defaultZoom);
        if (data.geocoder.addMarkerOnResult) {
          var found = L.marker(result.center).addTo(map);
          if (data.geocoder.popupOnFound) {
            found.bindPopup(result.name).openPopup();
          }
        }
      });
      geocoder.addTo(map);
    })();
  </script>
</body>

</html>
"#;
