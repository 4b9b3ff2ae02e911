//! HTTP server module for the land-cover dashboard backend.
//!
//! This module provides an axum-based HTTP server that exposes the service
//! layer as a REST API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Request parsing and validation                         │
//! │  - JSON serialization/deserialization                     │
//! │  - CORS, compression, error handling                      │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/, study_area/)                   │
//! │  - Study-area resolution, sessions                        │
//! │  - Area statistics, charts, insurance analytics           │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Compute Layer (compute/)                                 │
//! │  - LandCoverEngine / LocalEngine                          │
//! │  - Band evaluation and region reductions                  │
//! └──────────────────────────────────────────────────────────┘
//! ```

#[cfg(feature = "http-server")]
pub mod handlers;

#[cfg(feature = "http-server")]
pub mod router;

#[cfg(feature = "http-server")]
pub mod state;

#[cfg(feature = "http-server")]
pub mod error;

#[cfg(feature = "http-server")]
pub mod dto;

#[cfg(feature = "http-server")]
pub use router::{create_router, create_router_with_limit};

#[cfg(feature = "http-server")]
pub use state::AppState;
