use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{anyhow, Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default = "default_boundaries")]
    pub boundaries: Vec<BoundarySourceConfig>,
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub publish: Option<PublishConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data_csv: PathBuf,
    #[serde(default = "default_true")]
    pub require_name: bool,
    // Non-catalog columns copied into the popup under their raw header
    #[serde(default)]
    pub extra_columns: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub title: String,
    pub center: [f64; 2],
    pub zoom: u8,
    pub palette: Vec<String>,
    pub marker_layer: String,
    pub tiles: TileConfig,
    pub markers: MarkerConfig,
    pub geocoder: GeocoderConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            title: "Community Resources".to_string(),
            center: [39.0458, -76.6413],
            zoom: 8,
            palette: crate::catalog::DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            marker_layer: "Community Resources".to_string(),
            tiles: TileConfig::default(),
            markers: MarkerConfig::default(),
            geocoder: GeocoderConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TileConfig {
    pub url: String,
    pub attribution: String,
    pub max_zoom: u8,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors".to_string(),
            max_zoom: 19,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarkerConfig {
    pub icon_url: Option<String>,
    pub icon_size: [u32; 2],
    pub popup_max_width: u32,
    pub popup_max_height: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            icon_url: None,
            icon_size: [30, 20],
            popup_max_width: 300,
            popup_max_height: 150,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub collapse: bool,
    pub add_marker: bool,
    pub popup_on_found: bool,
    pub zoom: u8,
    pub placeholder: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            collapse: true,
            add_marker: true,
            popup_on_found: true,
            zoom: 12,
            placeholder: "address".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoundarySourceConfig {
    pub name: String,
    /// `http(s)` URL or path to a local GeoJSON file.
    pub url: String,
    pub popup: Option<BoundaryPopupConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BoundaryPopupConfig {
    pub field: String,
    pub alias: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub title_column: String,
    pub link_column: String,
    pub fields: Vec<CatalogFieldConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogFieldConfig {
    pub column: String,
    pub alias: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub document: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            document: PathBuf::from("map.html"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PublishConfig {
    /// `owner/name` of the GitHub repository.
    pub repository: String,
    pub path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_true() -> bool {
    true
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_message() -> String {
    "Update map.html".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_boundaries() -> Vec<BoundarySourceConfig> {
    vec![BoundarySourceConfig {
        name: "MDOT SHA County Boundaries".to_string(),
        url: "https://services.arcgis.com/njFNhDsUCentVYJW/arcgis/rest/services/MDOT_SHA_County_Boundaries/FeatureServer/0/query?outFields=*&where=1%3D1&f=geojson".to_string(),
        popup: None,
    }]
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let [lat, lon] = self.map.center;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(anyhow!("Map center {:?} is outside valid coordinates", self.map.center));
        }
        if self.map.zoom > 22 {
            return Err(anyhow!("Map zoom {} is above 22", self.map.zoom));
        }
        if self.map.palette.is_empty() {
            return Err(anyhow!("Map palette must contain at least one color"));
        }
        if let Some(catalog) = &self.catalog {
            if !catalog.fields.iter().any(|f| f.column == catalog.title_column) {
                return Err(anyhow!(
                    "Catalog title column '{}' is not listed in catalog fields",
                    catalog.title_column
                ));
            }
        }
        Ok(())
    }
}
