//! Field catalog and boundary palette.
//!
//! Both are built once at startup (from defaults or the config file) and passed
//! by reference to the components that need them.

use crate::config::CatalogConfig;
use anyhow::{anyhow, Result};

pub const NAME_COLUMN: &str = "Organization or Agency Name";
pub const WEBSITE_COLUMN: &str = "Organization or Agency Website";
pub const LATITUDE_COLUMN: &str = "Latitude";
pub const LONGITUDE_COLUMN: &str = "Longitude";

const DEFAULT_FIELDS: [(&str, &str); 10] = [
    (NAME_COLUMN, "Organization"),
    ("Organization or Agency Phone Number", "Phone"),
    ("Organization or Agency Email", "Email"),
    ("Organization or Agency Location or Address", "Location"),
    (WEBSITE_COLUMN, "Website"),
    ("Facebook", "Facebook"),
    ("X (formerly Twitter)", "Twitter"),
    ("Instagram", "Instagram"),
    ("LinkedIn", "LinkedIn"),
    ("Truncated Description", "Description"),
];

pub const DEFAULT_PALETTE: [&str; 4] = ["#2C557E", "#fdda25", "#B7DCDF", "#000000"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub column: String,
    pub alias: String,
}

/// Canonical columns with their popup alias. Rank is the entry position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCatalog {
    title_column: String,
    link_column: String,
    entries: Vec<CatalogEntry>,
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self {
            title_column: NAME_COLUMN.to_string(),
            link_column: WEBSITE_COLUMN.to_string(),
            entries: DEFAULT_FIELDS
                .iter()
                .map(|(column, alias)| CatalogEntry {
                    column: column.to_string(),
                    alias: alias.to_string(),
                })
                .collect(),
        }
    }
}

impl FieldCatalog {
    pub fn new(title_column: impl Into<String>, link_column: impl Into<String>, entries: Vec<CatalogEntry>) -> Self {
        Self {
            title_column: title_column.into(),
            link_column: link_column.into(),
            entries,
        }
    }

    pub fn from_config(config: Option<&CatalogConfig>) -> Self {
        match config {
            None => Self::default(),
            Some(c) => Self::new(
                c.title_column.clone(),
                c.link_column.clone(),
                c.fields
                    .iter()
                    .map(|f| CatalogEntry {
                        column: f.column.clone(),
                        alias: f.alias.clone(),
                    })
                    .collect(),
            ),
        }
    }

    pub fn title_column(&self) -> &str {
        &self.title_column
    }

    pub fn link_column(&self) -> &str {
        &self.link_column
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Popup alias for a column; unknown columns fall back to their raw key.
    pub fn alias<'a>(&'a self, column: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|e| e.column == column)
            .map(|e| e.alias.as_str())
            .unwrap_or(column)
    }

    pub fn rank(&self, column: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.column == column)
    }

    /// Catalog columns that become `Place::fields` (everything but the title).
    pub fn attribute_columns(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .map(|e| e.column.as_str())
            .filter(move |c| *c != self.title_column)
    }
}

/// Fill/stroke colors handed out round-robin to boundary layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Palette {
    pub fn new(colors: Vec<String>) -> Result<Self> {
        if colors.is_empty() {
            return Err(anyhow!("Palette must contain at least one color"));
        }
        for color in &colors {
            if !is_hex_color(color) {
                return Err(anyhow!("Palette color '{}' is not a #RRGGBB hex code", color));
            }
        }
        Ok(Self { colors })
    }

    pub fn color_for(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_aliases_and_ranks() {
        let catalog = FieldCatalog::default();
        assert_eq!(catalog.alias("Organization or Agency Phone Number"), "Phone");
        assert_eq!(catalog.alias("X (formerly Twitter)"), "Twitter");
        assert_eq!(catalog.alias("Opening Hours"), "Opening Hours");
        assert!(catalog.rank("Organization or Agency Email") < catalog.rank("Truncated Description"));
        assert_eq!(catalog.rank("Opening Hours"), None);
    }

    #[test]
    fn attribute_columns_exclude_title() {
        let catalog = FieldCatalog::default();
        let columns: Vec<&str> = catalog.attribute_columns().collect();
        assert_eq!(columns.len(), 9);
        assert!(!columns.contains(&NAME_COLUMN));
        assert!(columns.contains(&WEBSITE_COLUMN));
    }

    #[test]
    fn palette_is_round_robin() {
        let palette = Palette::default();
        assert_eq!(palette.len(), 4);
        assert_eq!(palette.color_for(4), palette.color_for(0));
        assert_eq!(palette.color_for(1), "#fdda25");
        assert_eq!(palette.color_for(7), "#000000");
    }

    #[test]
    fn palette_rejects_bad_input() {
        assert!(Palette::new(vec![]).is_err());
        assert!(Palette::new(vec!["blue".into()]).is_err());
        assert!(Palette::new(vec!["#00ff00".into()]).is_ok());
    }
}
