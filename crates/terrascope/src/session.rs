//! Workspace state: the loaded raster, the loaded entity table with its
//! spatial indices, and the interactive filter settings.
//!
//! Loads never leave the session half-replaced. A failed load is logged
//! and the previous state stays usable; a successful entity load swaps
//! the dataset and its index set together under a fresh generation.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};
use walkdir::WalkDir;

use ascgrid::AscGrid;
use geopick::{CellSample, DisplayMode, PickHit, PixelMap, SpatialIndexSet, ViewFilters};
use geotable::{CategoryGroups, Dataset};

/// Raster and entity-table files found in a data directory.
#[derive(Debug, Clone, Default)]
pub struct DataCatalog {
    rasters: Vec<PathBuf>,
    tables: Vec<PathBuf>,
}

impl DataCatalog {
    /// Scans `dir` (non-recursively) for `.asc` and `.csv` files.
    pub fn scan(dir: &Path) -> Result<Self> {
        ensure!(
            dir.is_dir(),
            "data directory {} does not exist",
            dir.display()
        );

        let mut rasters = Vec::new();
        let mut tables = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            match entry.path().extension().and_then(|s| s.to_str()) {
                Some("asc") => rasters.push(entry.path().to_path_buf()),
                Some("csv") => tables.push(entry.path().to_path_buf()),
                _ => {}
            }
        }

        rasters.sort();
        tables.sort();

        Ok(Self { rasters, tables })
    }

    pub fn rasters(&self) -> &[PathBuf] {
        &self.rasters
    }

    pub fn tables(&self) -> &[PathBuf] {
        &self.tables
    }
}

pub struct Session {
    grid: Option<AscGrid>,
    dataset: Option<Dataset>,
    indices: Option<SpatialIndexSet>,
    groups: CategoryGroups,
    filters: ViewFilters,
    next_generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            grid: None,
            dataset: None,
            indices: None,
            groups: CategoryGroups::default(),
            filters: ViewFilters::default(),
            next_generation: 1,
        }
    }

    pub fn grid(&self) -> Option<&AscGrid> {
        self.grid.as_ref()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn groups(&self) -> &CategoryGroups {
        &self.groups
    }

    pub fn filters(&self) -> &ViewFilters {
        &self.filters
    }

    /// Loads a raster, keeping the previous one on failure.
    pub fn load_grid(&mut self, path: &Path) -> bool {
        match ascgrid::load(path) {
            Ok(grid) => {
                let header = grid.header();
                log::info!(
                    "Loaded raster {}: {}x{} cells, cellsize {}",
                    path.display(),
                    header.ncols,
                    header.nrows,
                    header.cellsize
                );

                self.grid = Some(grid);
                self.rebuild_indices();
                true
            }
            Err(e) => {
                log::error!("Failed to load raster {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Loads an entity table, keeping the previous dataset and index
    /// set on failure.
    pub fn load_entities(&mut self, path: &Path) -> bool {
        match geotable::table::load(path) {
            Ok(mut dataset) => {
                dataset.set_generation(self.next_generation);
                self.next_generation += 1;

                log::info!(
                    "Loaded {} entities from {} (life range [{}, {}])",
                    dataset.len(),
                    path.display(),
                    dataset.life_min(),
                    dataset.life_max()
                );

                self.groups = CategoryGroups::from_dataset(&dataset);
                self.filters.life_min = dataset.life_min();
                self.filters.life_max = dataset.life_max();
                self.dataset = Some(dataset);
                self.rebuild_indices();
                true
            }
            Err(e) => {
                log::error!("Failed to load entity table {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Loads the catalog's `index`-th raster; out-of-range is a no-op.
    pub fn load_grid_at(&mut self, catalog: &DataCatalog, index: usize) -> bool {
        match catalog.rasters().get(index) {
            Some(path) => self.load_grid(path),
            None => false,
        }
    }

    /// Loads the catalog's `index`-th entity table; out-of-range is a no-op.
    pub fn load_entities_at(&mut self, catalog: &DataCatalog, index: usize) -> bool {
        match catalog.tables().get(index) {
            Some(path) => self.load_entities(path),
            None => false,
        }
    }

    /// The dataset and its indices are replaced together so queries
    /// never mix generations.
    fn rebuild_indices(&mut self) {
        self.indices = match (&self.grid, &self.dataset) {
            (Some(grid), Some(dataset)) => Some(SpatialIndexSet::build(dataset, grid.header())),
            _ => None,
        };
    }

    /// Sets the life filter, ordered and clamped to the dataset's range.
    pub fn set_life_filter(&mut self, lo: f64, hi: f64) {
        let (range_min, range_max) = match &self.dataset {
            Some(dataset) => (dataset.life_min(), dataset.life_max()),
            None => (0.0, 0.0),
        };

        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };

        self.filters.life_min = lo.clamp(range_min, range_max);
        self.filters.life_max = hi.clamp(range_min, range_max);
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.filters.mode = mode;
    }

    pub fn set_show_maxima(&mut self, show: bool) {
        self.filters.show_maxima = show;
    }

    pub fn set_show_minima(&mut self, show: bool) {
        self.filters.show_minima = show;
    }

    pub fn set_show_saddles(&mut self, show: bool) {
        self.filters.show_saddles = show;
    }

    pub fn set_show_lines_ascending(&mut self, show: bool) {
        self.filters.show_lines_ascending = show;
    }

    pub fn set_show_lines_descending(&mut self, show: bool) {
        self.filters.show_lines_descending = show;
    }

    pub fn set_show_areas(&mut self, show: bool) {
        self.filters.show_areas = show;
    }

    /// Normalizes a life value against the current filter range, for
    /// brightness scaling on the drawing side.
    pub fn life_to_unit(&self, life: f64) -> f64 {
        let span = self.filters.life_max - self.filters.life_min;
        if span <= 0.0 {
            return 1.0;
        }

        ((life - self.filters.life_min) / span).clamp(0.0, 1.0)
    }

    /// Nearest visible feature around `pixel`, or `None` when no grid
    /// or dataset is loaded.
    pub fn pick(&self, pixel: [f64; 2], radius_px: f64, view: &impl PixelMap) -> Option<PickHit> {
        let dataset = self.dataset.as_ref()?;
        let indices = self.indices.as_ref()?;

        geopick::pick(pixel, radius_px, &self.filters, dataset, indices, view)
    }

    /// Grid cell under `pixel`, or `None` when no grid is loaded.
    pub fn probe(&self, pixel: [f64; 2], view: &impl PixelMap) -> Option<CellSample> {
        let grid = self.grid.as_ref()?;

        Some(geopick::probe(grid, view, pixel))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
