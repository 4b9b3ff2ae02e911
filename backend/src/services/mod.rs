//! Service layer for business logic and orchestration.
//!
//! Services sit between the HTTP handlers and the compute engine: they build
//! the reclassified band stack, aggregate areas, shape chart and map payloads,
//! keep dashboard sessions and analyse the insurance dataset.

pub mod area_stats;
pub mod charts;
pub mod insurance;
pub mod map_layers;
pub mod remap;
pub mod session;

pub use area_stats::{compute_area_statistics, AggregationError, AggregationOptions, AreaReport};
pub use charts::{build_charts, ChartBundle};
pub use insurance::{CompanyMetric, InsuranceDataset, InsuranceError, StateBoundaries};
pub use map_layers::{build_map_view, render_layer, LayerRaster, MapView};
pub use remap::reclassify_bands;
pub use session::{AreaChange, SessionError, SessionSnapshot, SessionStore};
