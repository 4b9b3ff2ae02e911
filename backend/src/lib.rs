//! # Land-cover dashboard backend
//!
//! Land-use and land-cover analysis over the MapBiomas annual classification,
//! plus the SISSER rural-insurance dashboard.
//!
//! ## Features
//!
//! - **Class remapping**: fine-grained MapBiomas codes grouped into a handful
//!   of categories, one lazily evaluated band per year
//! - **Study areas**: shapefile uploads, pasted GeoJSON or a named municipality
//! - **Area statistics**: km² per category per year inside the study area
//! - **Charts and maps**: stacked shares, grouped bars, pie, pivot table and
//!   map layer descriptions
//! - **Insurance analytics**: per-state and per-company aggregates,
//!   correlations and a state choropleth
//! - **HTTP API**: RESTful endpoints for the dashboard frontend
//!
//! ## Architecture
//!
//! - [`models`]: domain types (codes, legend, rasters, study areas, records)
//! - [`compute`]: the land-cover engine and its local raster backend
//! - [`study_area`]: parsing and resolution of study-area inputs
//! - [`services`]: aggregation, charts, map views, sessions, insurance
//! - [`config`]: TOML configuration
//! - [`http`]: Axum-based HTTP server and request handlers

pub mod compute;
pub mod config;
pub mod models;
pub mod services;
pub mod study_area;

#[cfg(feature = "http-server")]
pub mod http;
