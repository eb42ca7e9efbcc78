use crate::boundary::BoundarySource;
use crate::catalog::{FieldCatalog, Palette};
use crate::cluster::ClusterIndex;
use crate::config::AppConfig;
use crate::data::{ingest_path, IngestOptions, SkippedRow};
use crate::error::{MapError, Result};
use crate::publish::{publish_document, ArtifactStore, PublishOutcome};
use crate::render::{write_document, MapAssembler};
use crate::types::{ControlPosition, GeocoderOptions, PopupFrame, TileLayer, Viewport};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub document: PathBuf,
    pub boundary_layers: Vec<String>,
    pub markers: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Fetch boundaries, ingest the table, build markers, assemble and write the map.
///
/// Any fetch or parse failure returns before the output file is touched.
pub async fn run(config: &AppConfig, catalog: &FieldCatalog, input: Option<&Path>) -> Result<RunReport> {
    let palette = Palette::new(config.map.palette.clone())
        .map_err(|e| MapError::parse("map palette", e))?;

    info!("Fetching {} boundary sources", config.boundaries.len());
    let source = BoundarySource::new(Duration::from_secs(config.fetch.timeout_secs))?;
    let boundary_layers = source.fetch_all(&config.boundaries, &palette).await?;

    let data_csv = input.unwrap_or(config.input.data_csv.as_path());
    info!("Ingesting records from {:?}", data_csv);
    let options = IngestOptions {
        require_name: config.input.require_name,
        extra_columns: config.input.extra_columns.clone(),
    };
    let ingestion = ingest_path(data_csv, catalog, &options)?;

    let clusters = ClusterIndex::build(&ingestion.places, catalog);
    let markers = clusters.len();

    let boundary_names = boundary_layers.iter().map(|l| l.name.clone()).collect();
    let document = assembler(config, &palette).assemble(
        boundary_layers,
        clusters,
        Viewport {
            center: config.map.center,
            zoom: config.map.zoom,
        },
        geocoder_options(config),
    );

    write_document(&document, &config.output.document)?;

    Ok(RunReport {
        document: config.output.document.clone(),
        boundary_layers: boundary_names,
        markers,
        skipped: ingestion.skipped,
    })
}

pub fn assembler<'a>(config: &AppConfig, palette: &'a Palette) -> MapAssembler<'a> {
    let markers = &config.map.markers;
    MapAssembler::new(palette)
        .title(config.map.title.clone())
        .marker_layer(config.map.marker_layer.clone())
        .tiles(TileLayer {
            url: config.map.tiles.url.clone(),
            attribution: config.map.tiles.attribution.clone(),
            max_zoom: config.map.tiles.max_zoom,
        })
        .popup_frame(PopupFrame {
            max_width: markers.popup_max_width,
            max_height: markers.popup_max_height,
            icon_url: markers.icon_url.clone(),
            icon_size: markers.icon_size,
        })
}

pub fn geocoder_options(config: &AppConfig) -> GeocoderOptions {
    let g = &config.map.geocoder;
    GeocoderOptions {
        collapse: g.collapse,
        position: ControlPosition::TopLeft,
        add_marker_on_result: g.add_marker,
        popup_on_found: g.popup_on_found,
        default_zoom: g.zoom,
        search_placeholder: g.placeholder.clone(),
    }
}

/// Push the written document to the store under `remote_path`.
pub async fn publish<S: ArtifactStore>(
    store: &S,
    document: &Path,
    remote_path: &str,
    message: &str,
) -> Result<PublishOutcome> {
    let content = tokio::fs::read_to_string(document)
        .await
        .map_err(|e| MapError::io(document, e))?;
    publish_document(store, remote_path, &content, message).await
}
