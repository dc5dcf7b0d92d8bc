//! Cell lookup under a pixel position.

use ascgrid::AscGrid;

use crate::transform::PixelMap;

/// One raster cell addressed by a probe, with its stored value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    pub col: usize,
    pub row: usize,
    pub value: f64,
    /// False when the cell holds the nodata sentinel.
    pub has_value: bool,
}

/// Resolves `pixel` to the grid cell underneath it.
///
/// Positions outside the raster clamp to the nearest edge cell, so a
/// probe always answers.
pub fn probe(grid: &AscGrid, view: &impl PixelMap, pixel: [f64; 2]) -> CellSample {
    let header = grid.header();
    let local = view.pixel_to_local(pixel);

    let col = (local[0].floor() as i64).clamp(0, header.ncols as i64 - 1) as usize;
    let row = (local[1].floor() as i64).clamp(0, header.nrows as i64 - 1) as usize;

    let value = grid.value(col, row);

    CellSample {
        col,
        row,
        value,
        has_value: !grid.is_nodata(value),
    }
}
