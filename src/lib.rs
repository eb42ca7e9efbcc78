//! Community resource map generator.
//!
//! Turns a CSV directory of community resources into a clustered, searchable
//! Leaflet map with administrative boundary overlays, and publishes the result
//! to a versioned remote store.

pub mod boundary;
pub mod catalog;
pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod html;
pub mod pipeline;
pub mod popup;
pub mod publish;
pub mod render;
pub mod server;
pub mod types;
