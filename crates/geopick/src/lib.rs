//! GEOPICK: the spatial side of the pipeline.
//!
//! Places world-space geometries on the raster's local grid
//! ([`transform`]), decomposes them into per-category indexed primitives
//! ([`index`]), and answers pixel-space queries: nearest feature
//! ([`picker`]) and cell lookup ([`probe`]).

pub mod index;
pub mod picker;
pub mod probe;
pub mod transform;

pub use index::{PointPrimitive, SegmentPrimitive, SpatialIndexSet};
pub use picker::{pick, DisplayMode, PickHit, ViewFilters};
pub use probe::{probe, CellSample};
pub use transform::{GridTransform, PixelMap, ViewTransform};
