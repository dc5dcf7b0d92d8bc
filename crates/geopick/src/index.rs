//! Decomposition of entity geometries into local-space primitives and the
//! four per-category R-trees.
//!
//! Markers (maxima, minima, saddles) index as points, and only when the
//! geometry really is a point. Line categories decompose every line run
//! into open-path segments. Areas decompose every polygon ring into a
//! closed segment cycle; line-bearing areas without polygons fall back to
//! open paths (legacy data shape).

use rstar::{RTree, RTreeObject, AABB};

use ascgrid::GridHeader;
use geotable::{Dataset, EntityKind, LineString};

use crate::transform::GridTransform;

/// A point marker in local grid space, tagged with its entity's index.
#[derive(Debug, Clone, Copy)]
pub struct PointPrimitive {
    pub at: [f64; 2],
    pub entity: usize,
}

impl RTreeObject for PointPrimitive {
    type Envelope = AABB<[f64; 2]>;

    #[inline]
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.at)
    }
}

/// One segment of a decomposed line or ring, in local grid space.
#[derive(Debug, Clone, Copy)]
pub struct SegmentPrimitive {
    pub a: [f64; 2],
    pub b: [f64; 2],
    pub entity: usize,
}

impl RTreeObject for SegmentPrimitive {
    type Envelope = AABB<[f64; 2]>;

    #[inline]
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.a[0].min(self.b[0]), self.a[1].min(self.b[1])],
            [self.a[0].max(self.b[0]), self.a[1].max(self.b[1])],
        )
    }
}

/// The four bulk-built indices over one dataset generation. Always
/// replaced as a whole, never mutated in place.
pub struct SpatialIndexSet {
    points: RTree<PointPrimitive>,
    segments_ascending: RTree<SegmentPrimitive>,
    segments_descending: RTree<SegmentPrimitive>,
    segments_area: RTree<SegmentPrimitive>,
    generation: u64,
}

impl SpatialIndexSet {
    pub fn build(dataset: &Dataset, header: &GridHeader) -> Self {
        let transform = GridTransform::new(header);

        let mut points = Vec::new();
        let mut ascending = Vec::new();
        let mut descending = Vec::new();
        let mut area = Vec::new();

        for (index, entity) in dataset.entities().iter().enumerate() {
            match entity.kind {
                EntityKind::Maximum | EntityKind::Minimum | EntityKind::Saddle => {
                    // Marker rows with non-point geometry are skipped
                    // without complaint.
                    if let Some(p) = entity.geometry.as_point() {
                        points.push(PointPrimitive {
                            at: transform.world_to_local(p),
                            entity: index,
                        });
                    }
                }
                EntityKind::LineAscending => {
                    for line in entity.geometry.line_strings() {
                        push_open_path(&mut ascending, line, &transform, index);
                    }
                }
                EntityKind::LineDescending => {
                    for line in entity.geometry.line_strings() {
                        push_open_path(&mut descending, line, &transform, index);
                    }
                }
                EntityKind::Area => {
                    let polygons = entity.geometry.polygons();
                    if !polygons.is_empty() {
                        for polygon in polygons {
                            for ring in &polygon.rings {
                                push_closed_ring(&mut area, ring, &transform, index);
                            }
                        }
                    } else {
                        // Legacy shape: areas carrying lines instead of
                        // polygons are treated as open paths.
                        for line in entity.geometry.line_strings() {
                            push_open_path(&mut area, line, &transform, index);
                        }
                    }
                }
                EntityKind::Unknown => {}
            }
        }

        SpatialIndexSet {
            points: RTree::bulk_load(points),
            segments_ascending: RTree::bulk_load(ascending),
            segments_descending: RTree::bulk_load(descending),
            segments_area: RTree::bulk_load(area),
            generation: dataset.generation(),
        }
    }

    #[inline]
    pub fn points(&self) -> &RTree<PointPrimitive> {
        &self.points
    }

    #[inline]
    pub fn segments_ascending(&self) -> &RTree<SegmentPrimitive> {
        &self.segments_ascending
    }

    #[inline]
    pub fn segments_descending(&self) -> &RTree<SegmentPrimitive> {
        &self.segments_descending
    }

    #[inline]
    pub fn segments_area(&self) -> &RTree<SegmentPrimitive> {
        &self.segments_area
    }

    /// Generation of the dataset this set was built from.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn push_open_path(
    out: &mut Vec<SegmentPrimitive>,
    line: &LineString,
    transform: &GridTransform,
    entity: usize,
) {
    if line.len() < 2 {
        return;
    }

    for pair in line.windows(2) {
        out.push(SegmentPrimitive {
            a: transform.world_to_local(pair[0]),
            b: transform.world_to_local(pair[1]),
            entity,
        });
    }
}

fn push_closed_ring(
    out: &mut Vec<SegmentPrimitive>,
    ring: &LineString,
    transform: &GridTransform,
    entity: usize,
) {
    let len = ring.len();
    if len < 2 {
        return;
    }

    for i in 0..len {
        let j = (i + 1) % len;
        out.push(SegmentPrimitive {
            a: transform.world_to_local(ring[i]),
            b: transform.world_to_local(ring[j]),
            entity,
        });
    }
}
