pub mod classification;
pub mod image;
pub mod insurance;
pub mod macros;
pub mod raster;
pub mod statistics;
pub mod study_area;

pub use classification::*;
pub use image::*;
pub use insurance::*;
pub use raster::*;
pub use statistics::*;
pub use study_area::*;
