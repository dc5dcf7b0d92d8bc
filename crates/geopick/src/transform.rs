//! Coordinate spaces: world (data files), local (grid cells, origin at the
//! top-left cell corner, y down), pixel (screen).

use ascgrid::GridHeader;
use geotable::Point;

/// World → local grid space, derived from the raster header.
#[derive(Debug, Clone, Copy)]
pub struct GridTransform {
    xllcorner: f64,
    y_top: f64,
    cellsize: f64,
}

impl GridTransform {
    pub fn new(header: &GridHeader) -> Self {
        Self {
            xllcorner: header.xllcorner,
            y_top: header.yllcorner + header.nrows as f64 * header.cellsize,
            cellsize: header.cellsize,
        }
    }

    /// World y grows upward, local y downward; the flip pivots on the
    /// grid's top edge.
    #[inline]
    pub fn world_to_local(&self, p: Point) -> [f64; 2] {
        [
            (p.x - self.xllcorner) / self.cellsize,
            (self.y_top - p.y) / self.cellsize,
        ]
    }
}

/// Screen transform supplied by the rendering side. Implementations must
/// not mirror axes: the pick box derivation assumes corner ordering
/// survives the mapping.
pub trait PixelMap {
    fn local_to_pixel(&self, local: [f64; 2]) -> [f64; 2];
    fn pixel_to_local(&self, pixel: [f64; 2]) -> [f64; 2];
}

/// Uniform scale plus offset, the shape a pan/zoom camera produces.
/// Scale must be positive.
#[derive(Debug, Clone, Copy)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ViewTransform {
    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            scale,
            offset_x,
            offset_y,
        }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

impl PixelMap for ViewTransform {
    #[inline]
    fn local_to_pixel(&self, local: [f64; 2]) -> [f64; 2] {
        [
            local[0] * self.scale + self.offset_x,
            local[1] * self.scale + self.offset_y,
        ]
    }

    #[inline]
    fn pixel_to_local(&self, pixel: [f64; 2]) -> [f64; 2] {
        [
            (pixel[0] - self.offset_x) / self.scale,
            (pixel[1] - self.offset_y) / self.scale,
        ]
    }
}
