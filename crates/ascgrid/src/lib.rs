//! ASCGRID: reader for the ASCII raster grid format (ESRI ASC style).
//!
//! File layout:
//!   6 header lines, each `<key> <value>`:
//!     ncols         <positive integer>
//!     nrows         <positive integer>
//!     xllcorner     <double, world x of the lower-left corner>
//!     yllcorner     <double, world y of the lower-left corner>
//!     cellsize      <double, edge length of one square cell>
//!     nodata_value  <double, sentinel marking cells without a measurement>
//!   Keys are case-insensitive and may appear in any order; an unknown key
//!   is fatal. After the header: exactly ncols * nrows whitespace-separated
//!   cell values, row-major, row 0 at the top.
//!
//! Global min/max are scanned once at load, skipping no-data cells. A grid
//! that is entirely no-data leaves min above max; `value_range` answers
//! `None` there so callers see the empty case explicitly.

use std::fs;
use std::path::Path;

use thiserror::Error;

pub const HEADER_LINES: usize = 6;

pub const KEY_NCOLS: &str = "ncols";
pub const KEY_NROWS: &str = "nrows";
pub const KEY_XLLCORNER: &str = "xllcorner";
pub const KEY_YLLCORNER: &str = "yllcorner";
pub const KEY_CELLSIZE: &str = "cellsize";
pub const KEY_NODATA_VALUE: &str = "nodata_value";

#[derive(Debug, Error)]
pub enum GridError {
    #[error("ASC format error: {0}")]
    Format(String),

    #[error("data size mismatch: expected {expected} values, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GridError>;

/// Grid metadata from the six header lines. Dimensions are immutable once
/// parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHeader {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata_value: f64,
}

impl GridHeader {
    /// Number of cells the data block must contain, or `None` when
    /// `ncols * nrows` does not fit in `usize`.
    #[inline]
    pub fn cell_count(&self) -> Option<usize> {
        self.ncols.checked_mul(self.nrows)
    }
}

/// A fully loaded raster: header, row-major cells, and the min/max scan.
#[derive(Debug, Clone)]
pub struct AscGrid {
    header: GridHeader,
    data: Vec<f64>,
    min_value: f64,
    max_value: f64,
}

impl AscGrid {
    #[inline]
    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    /// Row-major cell values, row 0 at the top. Length is `ncols * nrows`.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Cell value at (col, row). Both must be in bounds.
    #[inline]
    pub fn value(&self, col: usize, row: usize) -> f64 {
        self.data[row * self.header.ncols + col]
    }

    #[inline]
    pub fn is_nodata(&self, value: f64) -> bool {
        value == self.header.nodata_value
    }

    /// Smallest non-no-data value; stays at the scan-initial extreme
    /// (`f64::MAX`) when every cell is no-data.
    #[inline]
    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    /// Largest non-no-data value; stays at the scan-initial extreme
    /// (`f64::MIN`) when every cell is no-data.
    #[inline]
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    /// (min, max) over cells carrying a measurement, or `None` when the
    /// grid is entirely no-data.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        if self.min_value <= self.max_value {
            Some((self.min_value, self.max_value))
        } else {
            None
        }
    }
}

fn parse_header_int(key: &str, token: &str) -> Result<i64> {
    token
        .parse()
        .map_err(|_| GridError::Format(format!("invalid integer for '{}': '{}'", key, token)))
}

fn parse_header_num(key: &str, token: &str) -> Result<f64> {
    token
        .parse()
        .map_err(|_| GridError::Format(format!("invalid number for '{}': '{}'", key, token)))
}

/// Parse a grid from in-memory text. This is the single source of truth for
/// parsing; `load` is a thin file wrapper around it.
pub fn parse_str(text: &str) -> Result<AscGrid> {
    let mut lines = text.lines();

    // Header: six `<key> <value>` lines, any order, case-insensitive keys.
    let mut ncols: i64 = 0;
    let mut nrows: i64 = 0;
    let mut xllcorner = 0.0_f64;
    let mut yllcorner = 0.0_f64;
    let mut cellsize = 0.0_f64;
    let mut nodata_value = 0.0_f64;

    for _ in 0..HEADER_LINES {
        let line = lines
            .next()
            .ok_or_else(|| GridError::Format("truncated header".into()))?;

        let mut parts = line.split_whitespace();
        let key = parts
            .next()
            .ok_or_else(|| GridError::Format("empty header line".into()))?;
        let value = parts
            .next()
            .ok_or_else(|| GridError::Format(format!("header key '{}' has no value", key)))?;

        match key.to_ascii_lowercase().as_str() {
            KEY_NCOLS => ncols = parse_header_int(key, value)?,
            KEY_NROWS => nrows = parse_header_int(key, value)?,
            KEY_XLLCORNER => xllcorner = parse_header_num(key, value)?,
            KEY_YLLCORNER => yllcorner = parse_header_num(key, value)?,
            KEY_CELLSIZE => cellsize = parse_header_num(key, value)?,
            KEY_NODATA_VALUE => nodata_value = parse_header_num(key, value)?,
            _ => return Err(GridError::Format(format!("unknown header key '{}'", key))),
        }
    }

    if ncols <= 0 || nrows <= 0 {
        return Err(GridError::Format(
            "ncols and nrows must both be positive".into(),
        ));
    }

    let header = GridHeader {
        ncols: ncols as usize,
        nrows: nrows as usize,
        xllcorner,
        yllcorner,
        cellsize,
        nodata_value,
    };

    // Data block: remaining tokens, row-major. Reading stops at the first
    // token that is not a number, so a stray token mid-grid surfaces as a
    // short read in the count check.
    let expected = header
        .cell_count()
        .ok_or_else(|| GridError::Format("ncols * nrows overflows the cell count".into()))?;
    let mut data = Vec::with_capacity(expected);

    for token in lines.flat_map(str::split_whitespace) {
        match token.parse::<f64>() {
            Ok(value) => data.push(value),
            Err(_) => break,
        }
    }

    if data.len() != expected {
        return Err(GridError::SizeMismatch {
            expected,
            found: data.len(),
        });
    }

    // Min/max over measured cells only.
    let mut min_value = f64::MAX;
    let mut max_value = f64::MIN;

    for &value in &data {
        if value != header.nodata_value {
            min_value = min_value.min(value);
            max_value = max_value.max(value);
        }
    }

    Ok(AscGrid {
        header,
        data,
        min_value,
        max_value,
    })
}

/// Read and parse a grid file.
pub fn load(path: &Path) -> Result<AscGrid> {
    let text = fs::read_to_string(path)?;
    parse_str(&text)
}
