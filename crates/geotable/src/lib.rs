//! GEOTABLE: typed geometries and the `;`-delimited entity table.
//!
//! A table file is one header row plus data rows, `;`-separated with
//! double-quote quoting. Each row describes one entity: a numeric id, a
//! name, a category, a life value, a free-text annotation, and a WKT
//! geometry. Loading is all-or-nothing; a bad row aborts the whole file.
//!
//! - [`wkt`] parses the geometry text into a [`Geometry`].
//! - [`table`] parses whole files into a [`Dataset`].

pub mod table;
pub mod wkt;

pub use table::TableError;
pub use wkt::WktError;

/// A 2D position in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An ordered run of points; open unless used as a polygon ring.
pub type LineString = Vec<Point>;

/// Ring 0 is the outer boundary, the rest are holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub rings: Vec<LineString>,
}

/// A parsed geometry. Exactly the payload of the active case, nothing else.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    MultiLineString(Vec<LineString>),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
    Unknown,
}

impl Geometry {
    /// The position, if this is a point geometry.
    #[inline]
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Every line run this geometry carries: one for a LineString, each
    /// member for a MultiLineString, empty otherwise.
    pub fn line_strings(&self) -> &[LineString] {
        match self {
            Geometry::LineString(ls) => std::slice::from_ref(ls),
            Geometry::MultiLineString(lss) => lss,
            _ => &[],
        }
    }

    /// Every polygon this geometry carries, by the same convention.
    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Geometry::Polygon(p) => std::slice::from_ref(p),
            Geometry::MultiPolygon(ps) => ps,
            _ => &[],
        }
    }
}

/// Entity category from the table's `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Maximum,
    Minimum,
    Saddle,
    LineAscending,
    LineDescending,
    Area,
    Unknown,
}

impl EntityKind {
    /// Case-insensitive match against the table's spelling; anything
    /// unrecognized is `Unknown` rather than an error.
    pub fn parse(text: &str) -> EntityKind {
        match text.to_ascii_lowercase().as_str() {
            "maximum" => EntityKind::Maximum,
            "minimum" => EntityKind::Minimum,
            "saddle" => EntityKind::Saddle,
            "line-ascending" => EntityKind::LineAscending,
            "line-descending" => EntityKind::LineDescending,
            "area" => EntityKind::Area,
            _ => EntityKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Maximum => "maximum",
            EntityKind::Minimum => "minimum",
            EntityKind::Saddle => "saddle",
            EntityKind::LineAscending => "line-ascending",
            EntityKind::LineDescending => "line-descending",
            EntityKind::Area => "area",
            EntityKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One table row. Owned exclusively by the [`Dataset`] that loaded it.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: u32,
    pub name: String,
    pub kind: EntityKind,
    pub life: f64,
    pub misc: String,
    pub geometry: Geometry,
}

/// An insertion-ordered load of entities plus the derived life range.
///
/// The generation tag pairs a dataset with spatial indices built from it;
/// standalone datasets start at 0 and a host session re-stamps on install.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    entities: Vec<Entity>,
    life_min: f64,
    life_max: f64,
    generation: u64,
}

impl Dataset {
    pub fn from_entities(entities: Vec<Entity>) -> Self {
        let (life_min, life_max) = life_range(&entities);
        Self {
            entities,
            life_min,
            life_max,
            generation: 0,
        }
    }

    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Smallest life value across all entities; 0 when empty.
    #[inline]
    pub fn life_min(&self) -> f64 {
        self.life_min
    }

    /// Largest life value across all entities; 0 when empty.
    #[inline]
    pub fn life_max(&self) -> f64 {
        self.life_max
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }
}

fn life_range(entities: &[Entity]) -> (f64, f64) {
    if entities.is_empty() {
        return (0.0, 0.0);
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;

    for entity in entities {
        lo = lo.min(entity.life);
        hi = hi.max(entity.life);
    }

    (lo, hi)
}

/// Per-category entity indices into a [`Dataset`], insertion order kept.
/// `Unknown` entities belong to no group.
#[derive(Debug, Clone, Default)]
pub struct CategoryGroups {
    pub maxima: Vec<usize>,
    pub minima: Vec<usize>,
    pub saddles: Vec<usize>,
    pub lines_ascending: Vec<usize>,
    pub lines_descending: Vec<usize>,
    pub areas: Vec<usize>,
}

impl CategoryGroups {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut groups = CategoryGroups::default();

        for (index, entity) in dataset.entities().iter().enumerate() {
            match entity.kind {
                EntityKind::Maximum => groups.maxima.push(index),
                EntityKind::Minimum => groups.minima.push(index),
                EntityKind::Saddle => groups.saddles.push(index),
                EntityKind::LineAscending => groups.lines_ascending.push(index),
                EntityKind::LineDescending => groups.lines_descending.push(index),
                EntityKind::Area => groups.areas.push(index),
                EntityKind::Unknown => {}
            }
        }

        groups
    }

    /// The same groups with every entity outside [lo, hi] dropped.
    pub fn restrict_to_life(&self, dataset: &Dataset, lo: f64, hi: f64) -> Self {
        let keep = |indices: &[usize]| -> Vec<usize> {
            indices
                .iter()
                .copied()
                .filter(|&i| {
                    let life = dataset.entities()[i].life;
                    life >= lo && life <= hi
                })
                .collect()
        };

        CategoryGroups {
            maxima: keep(&self.maxima),
            minima: keep(&self.minima),
            saddles: keep(&self.saddles),
            lines_ascending: keep(&self.lines_ascending),
            lines_descending: keep(&self.lines_descending),
            areas: keep(&self.areas),
        }
    }

    pub fn total(&self) -> usize {
        self.maxima.len()
            + self.minima.len()
            + self.saddles.len()
            + self.lines_ascending.len()
            + self.lines_descending.len()
            + self.areas.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: EntityKind, life: f64) -> Entity {
        Entity {
            id: 0,
            name: String::new(),
            kind,
            life,
            misc: String::new(),
            geometry: Geometry::Point(Point::new(0.0, 0.0)),
        }
    }

    #[test]
    fn dataset_life_range_is_zero_when_empty() {
        let dataset = Dataset::from_entities(Vec::new());
        assert_eq!(dataset.life_min(), 0.0);
        assert_eq!(dataset.life_max(), 0.0);
    }

    #[test]
    fn dataset_life_range_spans_all_entities() {
        let dataset = Dataset::from_entities(vec![
            entity(EntityKind::Maximum, 3.0),
            entity(EntityKind::Minimum, -1.5),
            entity(EntityKind::Area, 0.5),
        ]);
        assert_eq!(dataset.life_min(), -1.5);
        assert_eq!(dataset.life_max(), 3.0);
    }

    #[test]
    fn groups_split_by_kind_and_skip_unknown() {
        let dataset = Dataset::from_entities(vec![
            entity(EntityKind::Maximum, 1.0),
            entity(EntityKind::Unknown, 1.0),
            entity(EntityKind::Saddle, 2.0),
            entity(EntityKind::Maximum, 3.0),
        ]);

        let groups = CategoryGroups::from_dataset(&dataset);
        assert_eq!(groups.maxima, vec![0, 3]);
        assert_eq!(groups.saddles, vec![2]);
        assert!(groups.minima.is_empty());
        assert_eq!(groups.total(), 3);
    }

    #[test]
    fn life_restriction_filters_each_group() {
        let dataset = Dataset::from_entities(vec![
            entity(EntityKind::Maximum, 1.0),
            entity(EntityKind::Maximum, 5.0),
            entity(EntityKind::Area, 2.0),
        ]);

        let groups = CategoryGroups::from_dataset(&dataset);
        let narrowed = groups.restrict_to_life(&dataset, 1.5, 4.0);
        assert!(narrowed.maxima.is_empty());
        assert_eq!(narrowed.areas, vec![2]);
    }

    #[test]
    fn geometry_accessors_cover_single_and_multi() {
        let ls: LineString = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        let single = Geometry::LineString(ls.clone());
        let multi = Geometry::MultiLineString(vec![ls.clone(), ls.clone()]);

        assert_eq!(single.line_strings().len(), 1);
        assert_eq!(multi.line_strings().len(), 2);
        assert!(single.polygons().is_empty());
        assert_eq!(single.as_point(), None);

        let poly = Geometry::Polygon(Polygon { rings: vec![ls] });
        assert_eq!(poly.polygons().len(), 1);
    }

    #[test]
    fn entity_kind_parses_case_insensitively() {
        assert_eq!(EntityKind::parse("Maximum"), EntityKind::Maximum);
        assert_eq!(EntityKind::parse("LINE-ASCENDING"), EntityKind::LineAscending);
        assert_eq!(EntityKind::parse("weird"), EntityKind::Unknown);
    }
}
