//! Staged nearest-feature query in pixel space.
//!
//! Point markers are tried first and win outright when close enough; only
//! then are segment layers consulted, gated by the display mode. All
//! distances are measured in pixels after projecting primitives through
//! the view transform.

use log::warn;
use rstar::{RTree, AABB};

use geotable::{Dataset, EntityKind};

use crate::index::{SegmentPrimitive, SpatialIndexSet};
use crate::transform::PixelMap;

/// Segment layers are mutually exclusive: lines or areas, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Lines,
    Areas,
}

/// Interactive filter state shared by picking and the drawing side.
#[derive(Debug, Clone, Copy)]
pub struct ViewFilters {
    pub show_maxima: bool,
    pub show_minima: bool,
    pub show_saddles: bool,
    pub show_lines_ascending: bool,
    pub show_lines_descending: bool,
    pub show_areas: bool,
    pub mode: DisplayMode,
    pub life_min: f64,
    pub life_max: f64,
}

impl Default for ViewFilters {
    fn default() -> Self {
        Self {
            show_maxima: true,
            show_minima: true,
            show_saddles: true,
            show_lines_ascending: true,
            show_lines_descending: true,
            show_areas: true,
            mode: DisplayMode::Lines,
            life_min: 0.0,
            life_max: 0.0,
        }
    }
}

/// A successful pick: the entity's index and its pixel distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub entity: usize,
    pub distance: f64,
}

/// Nearest entity within `radius_px` of `query_pixel`, or `None`.
///
/// Never an error: empty indices, filtered-out candidates, and a stale
/// index generation all answer `None`.
pub fn pick(
    query_pixel: [f64; 2],
    radius_px: f64,
    filters: &ViewFilters,
    dataset: &Dataset,
    indices: &SpatialIndexSet,
    view: &impl PixelMap,
) -> Option<PickHit> {
    if indices.generation() != dataset.generation() {
        warn!(
            "pick skipped: index generation {} does not match dataset generation {}",
            indices.generation(),
            dataset.generation()
        );
        return None;
    }

    let query_box = local_query_box(query_pixel, radius_px, view);

    // Point markers first; a close-enough marker beats any segment.
    let want_points = filters.show_maxima || filters.show_minima || filters.show_saddles;
    if want_points {
        let mut best: Option<PickHit> = None;

        for primitive in indices.points().locate_in_envelope_intersecting(&query_box) {
            let entity = &dataset.entities()[primitive.entity];

            if entity.life < filters.life_min || entity.life > filters.life_max {
                continue;
            }

            let visible = match entity.kind {
                EntityKind::Maximum => filters.show_maxima,
                EntityKind::Minimum => filters.show_minima,
                EntityKind::Saddle => filters.show_saddles,
                _ => false,
            };
            if !visible {
                continue;
            }

            let pixel = view.local_to_pixel(primitive.at);
            let distance = pixel_distance(query_pixel, pixel);

            if best.map_or(true, |b| distance < b.distance) {
                best = Some(PickHit {
                    entity: primitive.entity,
                    distance,
                });
            }
        }

        if let Some(hit) = best {
            if hit.distance <= radius_px {
                return Some(hit);
            }
        }
    }

    // Segment layers; the mode decides which trees even get asked.
    let (want_asc, want_desc, want_areas) = match filters.mode {
        DisplayMode::Lines => (
            filters.show_lines_ascending,
            filters.show_lines_descending,
            false,
        ),
        DisplayMode::Areas => (false, false, filters.show_areas),
    };

    let mut best: Option<PickHit> = None;

    if want_asc {
        scan_segments(
            indices.segments_ascending(),
            &query_box,
            query_pixel,
            filters,
            dataset,
            view,
            &mut best,
        );
    }

    if want_desc {
        scan_segments(
            indices.segments_descending(),
            &query_box,
            query_pixel,
            filters,
            dataset,
            view,
            &mut best,
        );
    }

    if want_areas {
        scan_segments(
            indices.segments_area(),
            &query_box,
            query_pixel,
            filters,
            dataset,
            view,
            &mut best,
        );
    }

    best.filter(|hit| hit.distance <= radius_px)
}

/// Pixel square around the query mapped into local space.
fn local_query_box(
    query_pixel: [f64; 2],
    radius_px: f64,
    view: &impl PixelMap,
) -> AABB<[f64; 2]> {
    let a = view.pixel_to_local([query_pixel[0] - radius_px, query_pixel[1] - radius_px]);
    let b = view.pixel_to_local([query_pixel[0] + radius_px, query_pixel[1] + radius_px]);

    AABB::from_corners(
        [a[0].min(b[0]), a[1].min(b[1])],
        [a[0].max(b[0]), a[1].max(b[1])],
    )
}

fn scan_segments(
    tree: &RTree<SegmentPrimitive>,
    query_box: &AABB<[f64; 2]>,
    query_pixel: [f64; 2],
    filters: &ViewFilters,
    dataset: &Dataset,
    view: &impl PixelMap,
    best: &mut Option<PickHit>,
) {
    for segment in tree.locate_in_envelope_intersecting(query_box) {
        let entity = &dataset.entities()[segment.entity];

        if entity.life < filters.life_min || entity.life > filters.life_max {
            continue;
        }

        let a = view.local_to_pixel(segment.a);
        let b = view.local_to_pixel(segment.b);
        let distance = pixel_distance_to_segment(query_pixel, a, b);

        if best.map_or(true, |h| distance < h.distance) {
            *best = Some(PickHit {
                entity: segment.entity,
                distance,
            });
        }
    }
}

#[inline]
fn pixel_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Below this squared pixel length a segment is treated as a point.
const DEGENERATE_SEGMENT_SQ: f64 = 1e-6;

fn pixel_distance_to_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let length_sq = dx * dx + dy * dy;

    if length_sq <= DEGENERATE_SEGMENT_SQ {
        return pixel_distance(p, a);
    }

    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / length_sq).clamp(0.0, 1.0);
    let closest = [a[0] + t * dx, a[1] + t * dy];

    pixel_distance(p, closest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::ViewTransform;
    use ascgrid::GridHeader;
    use geotable::{Entity, Geometry, LineString, Point, Polygon};

    fn header() -> GridHeader {
        GridHeader {
            ncols: 100,
            nrows: 100,
            xllcorner: 0.0,
            yllcorner: 0.0,
            cellsize: 1.0,
            nodata_value: -9999.0,
        }
    }

    fn entity(kind: EntityKind, life: f64, geometry: Geometry) -> Entity {
        Entity {
            id: 0,
            name: String::new(),
            kind,
            life,
            misc: String::new(),
            geometry,
        }
    }

    fn line(points: &[(f64, f64)]) -> LineString {
        points.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn filters_for(dataset: &Dataset) -> ViewFilters {
        ViewFilters {
            life_min: dataset.life_min(),
            life_max: dataset.life_max(),
            ..ViewFilters::default()
        }
    }

    // World (x, y) on this header lands at local (x, 100 - y); with the
    // identity view that is also the pixel position.
    fn pixel_of(x: f64, y: f64) -> [f64; 2] {
        [x, 100.0 - y]
    }

    #[test]
    fn hit_within_radius_and_miss_outside() {
        let dataset = Dataset::from_entities(vec![entity(
            EntityKind::Maximum,
            2.5,
            Geometry::Point(Point::new(5.0, 5.0)),
        )]);
        let set = SpatialIndexSet::build(&dataset, &header());
        let filters = filters_for(&dataset);
        let view = ViewTransform::identity();

        let hit = pick(pixel_of(5.0, 5.0), 10.0, &filters, &dataset, &set, &view)
            .expect("exact hit");
        assert_eq!(hit.entity, 0);
        assert_eq!(hit.distance, 0.0);

        let mut far = pixel_of(5.0, 5.0);
        far[0] += 50.0;
        assert_eq!(pick(far, 10.0, &filters, &dataset, &set, &view), None);
    }

    #[test]
    fn distance_equal_to_radius_still_hits() {
        let dataset = Dataset::from_entities(vec![entity(
            EntityKind::Minimum,
            1.0,
            Geometry::Point(Point::new(5.0, 5.0)),
        )]);
        let set = SpatialIndexSet::build(&dataset, &header());
        let filters = filters_for(&dataset);
        let view = ViewTransform::identity();

        let mut query = pixel_of(5.0, 5.0);
        query[0] += 10.0;
        let hit = pick(query, 10.0, &filters, &dataset, &set, &view).expect("boundary hit");
        assert_eq!(hit.distance, 10.0);
    }

    #[test]
    fn points_outrank_nearer_segments() {
        let dataset = Dataset::from_entities(vec![
            entity(
                EntityKind::LineAscending,
                1.0,
                Geometry::LineString(line(&[(0.0, 5.0), (10.0, 5.0)])),
            ),
            entity(
                EntityKind::Maximum,
                1.0,
                Geometry::Point(Point::new(5.0, 8.0)),
            ),
        ]);
        let set = SpatialIndexSet::build(&dataset, &header());
        let filters = filters_for(&dataset);
        let view = ViewTransform::identity();

        // Query sits on the line (distance 0) and 3 px from the marker;
        // the marker still wins.
        let hit = pick(pixel_of(5.0, 5.0), 10.0, &filters, &dataset, &set, &view)
            .expect("marker hit");
        assert_eq!(hit.entity, 1);
        assert_eq!(hit.distance, 3.0);
    }

    #[test]
    fn segment_phase_runs_when_marker_is_out_of_radius() {
        let dataset = Dataset::from_entities(vec![
            entity(
                EntityKind::Maximum,
                1.0,
                Geometry::Point(Point::new(50.0, 50.0)),
            ),
            entity(
                EntityKind::LineAscending,
                1.0,
                Geometry::LineString(line(&[(0.0, 5.0), (10.0, 5.0)])),
            ),
        ]);
        let set = SpatialIndexSet::build(&dataset, &header());
        let filters = filters_for(&dataset);
        let view = ViewTransform::identity();

        let hit = pick(pixel_of(5.0, 6.0), 10.0, &filters, &dataset, &set, &view)
            .expect("segment hit");
        assert_eq!(hit.entity, 1);
        assert_eq!(hit.distance, 1.0);
    }

    #[test]
    fn display_mode_gates_segment_layers() {
        let dataset = Dataset::from_entities(vec![
            entity(
                EntityKind::LineAscending,
                1.0,
                Geometry::LineString(line(&[(0.0, 5.0), (10.0, 5.0)])),
            ),
            entity(
                EntityKind::Area,
                1.0,
                Geometry::Polygon(Polygon {
                    rings: vec![line(&[(20.0, 20.0), (30.0, 20.0), (30.0, 30.0), (20.0, 30.0)])],
                }),
            ),
        ]);
        let set = SpatialIndexSet::build(&dataset, &header());
        let view = ViewTransform::identity();
        let mut filters = filters_for(&dataset);

        // Lines mode sees the line, not the area boundary.
        filters.mode = DisplayMode::Lines;
        assert!(pick(pixel_of(5.0, 5.0), 5.0, &filters, &dataset, &set, &view).is_some());
        assert_eq!(
            pick(pixel_of(25.0, 20.0), 5.0, &filters, &dataset, &set, &view),
            None
        );

        // Areas mode is the reverse.
        filters.mode = DisplayMode::Areas;
        assert_eq!(
            pick(pixel_of(5.0, 5.0), 5.0, &filters, &dataset, &set, &view),
            None
        );
        let hit = pick(pixel_of(25.0, 20.0), 5.0, &filters, &dataset, &set, &view)
            .expect("area boundary hit");
        assert_eq!(hit.entity, 1);
    }

    #[test]
    fn hidden_categories_are_not_picked() {
        let dataset = Dataset::from_entities(vec![entity(
            EntityKind::Maximum,
            1.0,
            Geometry::Point(Point::new(5.0, 5.0)),
        )]);
        let set = SpatialIndexSet::build(&dataset, &header());
        let view = ViewTransform::identity();
        let mut filters = filters_for(&dataset);
        filters.show_maxima = false;

        assert_eq!(
            pick(pixel_of(5.0, 5.0), 10.0, &filters, &dataset, &set, &view),
            None
        );
    }

    #[test]
    fn life_filter_excludes_out_of_range_entities() {
        let dataset = Dataset::from_entities(vec![
            entity(
                EntityKind::Maximum,
                5.0,
                Geometry::Point(Point::new(5.0, 5.0)),
            ),
            entity(
                EntityKind::Maximum,
                1.0,
                Geometry::Point(Point::new(6.0, 5.0)),
            ),
        ]);
        let set = SpatialIndexSet::build(&dataset, &header());
        let view = ViewTransform::identity();
        let mut filters = filters_for(&dataset);
        filters.life_min = 0.0;
        filters.life_max = 2.0;

        // The nearer entity (life 5.0) is filtered out; the farther
        // in-range one is picked.
        let hit = pick(pixel_of(5.0, 5.0), 10.0, &filters, &dataset, &set, &view)
            .expect("in-range hit");
        assert_eq!(hit.entity, 1);
    }

    #[test]
    fn degenerate_segment_measures_as_a_point() {
        let dataset = Dataset::from_entities(vec![entity(
            EntityKind::LineAscending,
            1.0,
            Geometry::LineString(line(&[(5.0, 5.0), (5.0, 5.0)])),
        )]);
        let set = SpatialIndexSet::build(&dataset, &header());
        let filters = filters_for(&dataset);
        let view = ViewTransform::identity();

        let mut query = pixel_of(5.0, 5.0);
        query[1] += 4.0;
        let hit = pick(query, 5.0, &filters, &dataset, &set, &view).expect("degenerate hit");
        assert_eq!(hit.distance, 4.0);
    }

    #[test]
    fn stale_generation_answers_none() {
        let mut dataset = Dataset::from_entities(vec![entity(
            EntityKind::Maximum,
            1.0,
            Geometry::Point(Point::new(5.0, 5.0)),
        )]);
        let set = SpatialIndexSet::build(&dataset, &header());
        dataset.set_generation(7);
        let filters = filters_for(&dataset);
        let view = ViewTransform::identity();

        assert_eq!(
            pick(pixel_of(5.0, 5.0), 10.0, &filters, &dataset, &set, &view),
            None
        );
    }

    #[test]
    fn scaled_view_measures_distance_in_pixels() {
        let dataset = Dataset::from_entities(vec![entity(
            EntityKind::Maximum,
            1.0,
            Geometry::Point(Point::new(5.0, 5.0)),
        )]);
        let set = SpatialIndexSet::build(&dataset, &header());
        let filters = filters_for(&dataset);
        // 2x zoom: local (5, 95) projects to pixel (10, 190).
        let view = ViewTransform::new(2.0, 0.0, 0.0);

        let hit = pick([10.0, 186.0], 6.0, &filters, &dataset, &set, &view)
            .expect("hit under zoom");
        assert_eq!(hit.distance, 4.0);

        // 4 local units away is 8 pixels under the zoom; a 6 px radius
        // misses what an unzoomed view would hit.
        assert_eq!(
            pick([10.0, 182.0], 6.0, &filters, &dataset, &set, &view),
            None
        );
    }
}
