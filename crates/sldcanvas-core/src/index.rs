//! Uniform-grid spatial index for point and region queries.

use crate::config::IndexConfig;
use crate::geometry::rects_overlap_inclusive;
use crate::shapes::{DrawableObject, ObjectId};
use kurbo::{Point, Rect};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Default grid cell size in logical units.
pub const DEFAULT_CELL_SIZE: f64 = 100.0;

/// Objects covering more cells than this are kept out of the grid and
/// tested against every point query instead.
pub const MAX_CELLS_PER_OBJECT: u64 = 4096;

/// Grid cell coordinate.
type CellKey = (i64, i64);

/// One object under a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult<'a> {
    pub object: &'a DrawableObject,
    /// Distance to the shape outline, 0 when the point is inside.
    pub distance: f64,
    /// The query point in logical coordinates.
    pub point: Point,
}

/// Diagnostic counters for tuning the cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexStats {
    pub object_count: usize,
    pub cell_count: usize,
    pub average_objects_per_cell: f64,
    /// Objects too large for the grid.
    pub oversized_count: usize,
}

/// Registry of drawable objects bucketed into a uniform grid.
///
/// An object whose bounding box spans several cells is listed in each of them.
/// Past [`MAX_CELLS_PER_OBJECT`] cells it is listed in none and lands in the
/// oversized set, which every point query scans.
#[derive(Debug, Clone)]
pub struct HitTestIndex {
    cell_size: f64,
    objects: HashMap<ObjectId, DrawableObject>,
    grid: HashMap<CellKey, HashSet<ObjectId>>,
    oversized: HashSet<ObjectId>,
}

impl Default for HitTestIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTestIndex {
    /// Create an empty index with the default cell size.
    pub fn new() -> Self {
        Self::with_cell_size(DEFAULT_CELL_SIZE)
    }

    /// Create an empty index from configuration.
    pub fn from_config(config: &IndexConfig) -> Self {
        Self::with_cell_size(config.cell_size)
    }

    /// Create an empty index. Non-positive sizes fall back to the default.
    pub fn with_cell_size(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            objects: HashMap::new(),
            grid: HashMap::new(),
            oversized: HashSet::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Register an object. An existing entry with the same id is replaced.
    pub fn add_object(&mut self, object: DrawableObject) {
        if self.objects.contains_key(&object.id) {
            self.update_object(object);
            return;
        }
        log::debug!(
            "index: add {} {} at {:?}",
            object.shape.name(),
            object.id,
            object.bounds
        );
        self.insert_cells(&object);
        self.objects.insert(object.id, object);
    }

    /// Register a batch of objects, e.g. from a diagram generator.
    pub fn add_objects(&mut self, objects: impl IntoIterator<Item = DrawableObject>) {
        for object in objects {
            self.add_object(object);
        }
    }

    /// Replace a registered object. Unknown ids are ignored.
    pub fn update_object(&mut self, object: DrawableObject) {
        let Some(old) = self.objects.remove(&object.id) else {
            return;
        };
        self.remove_cells(&old);
        self.insert_cells(&object);
        self.objects.insert(object.id, object);
    }

    /// Remove an object. Returns it if it was registered.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<DrawableObject> {
        let object = self.objects.remove(&id)?;
        self.remove_cells(&object);
        log::debug!("index: removed {}", id);
        Some(object)
    }

    /// Drop every object.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.grid.clear();
        self.oversized.clear();
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&DrawableObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All registered objects, in no particular order.
    pub fn objects(&self) -> impl Iterator<Item = &DrawableObject> {
        self.objects.values()
    }

    /// Union of every bounding box, or `None` when empty.
    pub fn bounds(&self) -> Option<Rect> {
        self.objects
            .values()
            .map(|o| o.bounds)
            .reduce(|acc, b| acc.union(b))
    }

    /// Objects under a logical point.
    ///
    /// Candidates come from the single cell containing the point plus the
    /// oversized set. Results are ordered by z-index (highest first), then by
    /// distance (closest first).
    pub fn hit_test(&self, point: Point) -> Vec<HitResult<'_>> {
        let cell = self.grid.get(&self.cell_of(point));
        let mut hits: Vec<HitResult<'_>> = cell
            .into_iter()
            .flatten()
            .chain(&self.oversized)
            .filter_map(|id| self.objects.get(id))
            .filter(|object| object.is_interactive())
            .filter_map(|object| {
                let tolerance = object.effective_tolerance();
                let hit = object.shape.hit_test(object.bounds, point, tolerance);
                hit.is_hit(tolerance).then_some(HitResult {
                    object,
                    distance: hit.distance,
                    point,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.object
                .z_index
                .cmp(&a.object.z_index)
                .then_with(|| a.distance.total_cmp(&b.distance))
                .then_with(|| a.object.id.cmp(&b.object.id))
        });
        hits
    }

    /// The topmost object under a point, if any.
    pub fn hit_test_first(&self, point: Point) -> Option<HitResult<'_>> {
        self.hit_test(point).into_iter().next()
    }

    /// Interactive objects touched by a selection rectangle, highest z first.
    ///
    /// This is a full scan: a marquee usually spans many cells.
    pub fn rectangle_select(&self, selection: Rect) -> Vec<&DrawableObject> {
        let selection = selection.abs();
        let mut selected: Vec<&DrawableObject> = self
            .objects
            .values()
            .filter(|object| object.is_interactive())
            .filter(|object| object.shape.intersects_rect(object.bounds, selection))
            .collect();
        selected.sort_by(|a, b| by_z_descending(a, b));
        selected
    }

    /// Every object whose bounding box overlaps `rect`, ignoring flags and
    /// shape. Ordered by z-index ascending (paint order).
    pub fn get_objects_in_bounds(&self, rect: Rect) -> Vec<&DrawableObject> {
        let mut found: Vec<&DrawableObject> = self
            .objects
            .values()
            .filter(|object| rects_overlap_inclusive(object.bounds, rect))
            .collect();
        found.sort_by(|a, b| by_z_descending(b, a));
        found
    }

    pub fn get_stats(&self) -> IndexStats {
        let cell_count = self.grid.len();
        let entries: usize = self.grid.values().map(HashSet::len).sum();
        IndexStats {
            object_count: self.objects.len(),
            cell_count,
            average_objects_per_cell: if cell_count == 0 {
                0.0
            } else {
                entries as f64 / cell_count as f64
            },
            oversized_count: self.oversized.len(),
        }
    }

    fn cell_of(&self, point: Point) -> CellKey {
        (
            (point.x / self.cell_size).floor() as i64,
            (point.y / self.cell_size).floor() as i64,
        )
    }

    /// Cells covered by an object's bounds grown by its tolerance band, or
    /// `None` when there are more than [`MAX_CELLS_PER_OBJECT`].
    fn cells_for(&self, object: &DrawableObject) -> Option<Vec<CellKey>> {
        let tolerance = object.effective_tolerance();
        let area = object.bounds.abs().inflate(tolerance, tolerance);
        let (min_x, min_y) = self.cell_of(Point::new(area.x0, area.y0));
        let (max_x, max_y) = self.cell_of(Point::new(area.x1, area.y1));
        let columns = max_x.abs_diff(min_x).saturating_add(1);
        let rows = max_y.abs_diff(min_y).saturating_add(1);
        if columns.saturating_mul(rows) > MAX_CELLS_PER_OBJECT {
            return None;
        }
        Some(
            (min_x..=max_x)
                .flat_map(|cx| (min_y..=max_y).map(move |cy| (cx, cy)))
                .collect(),
        )
    }

    fn insert_cells(&mut self, object: &DrawableObject) {
        let Some(cells) = self.cells_for(object) else {
            log::debug!("index: {} is oversized, kept out of the grid", object.id);
            self.oversized.insert(object.id);
            return;
        };
        for key in cells {
            self.grid.entry(key).or_default().insert(object.id);
        }
    }

    fn remove_cells(&mut self, object: &DrawableObject) {
        let Some(cells) = self.cells_for(object) else {
            self.oversized.remove(&object.id);
            return;
        };
        for key in cells {
            if let Some(cell) = self.grid.get_mut(&key) {
                cell.remove(&object.id);
                if cell.is_empty() {
                    self.grid.remove(&key);
                }
            }
        }
    }
}

fn by_z_descending(a: &DrawableObject, b: &DrawableObject) -> Ordering {
    b.z_index.cmp(&a.z_index).then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Shape;
    use uuid::Uuid;

    fn rect_at(x: f64, y: f64, w: f64, h: f64) -> DrawableObject {
        DrawableObject::rectangle(Point::new(x, y), w, h)
    }

    #[test]
    fn test_empty_index_queries() {
        let index = HitTestIndex::new();
        assert!(index.hit_test(Point::new(10.0, 10.0)).is_empty());
        assert!(index.hit_test_first(Point::ZERO).is_none());
        assert!(index.rectangle_select(Rect::new(0.0, 0.0, 500.0, 500.0)).is_empty());
        let stats = index.get_stats();
        assert_eq!(stats.object_count, 0);
        assert!(stats.average_objects_per_cell.abs() < f64::EPSILON);
    }

    #[test]
    fn test_object_spanning_cells_is_in_each() {
        let mut index = HitTestIndex::new();
        index.add_object(rect_at(50.0, 50.0, 100.0, 100.0));
        let stats = index.get_stats();
        assert_eq!(stats.object_count, 1);
        assert_eq!(stats.cell_count, 4);
        assert!((stats.average_objects_per_cell - 1.0).abs() < f64::EPSILON);

        assert_eq!(index.hit_test(Point::new(60.0, 60.0)).len(), 1);
        assert_eq!(index.hit_test(Point::new(140.0, 140.0)).len(), 1);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut index = HitTestIndex::new();
        index.add_object(rect_at(-150.0, -30.0, 40.0, 20.0));
        assert_eq!(index.hit_test(Point::new(-130.0, -20.0)).len(), 1);
        assert!(index.hit_test(Point::new(130.0, 20.0)).is_empty());
    }

    #[test]
    fn test_update_moves_object_between_cells() {
        let mut index = HitTestIndex::new();
        let obj = rect_at(10.0, 10.0, 20.0, 20.0);
        let id = obj.id;
        index.add_object(obj.clone());

        let mut moved = obj;
        moved.bounds = Rect::from_origin_size(Point::new(510.0, 510.0), (20.0, 20.0));
        index.update_object(moved);

        assert!(index.hit_test(Point::new(15.0, 15.0)).is_empty());
        let hit = index.hit_test_first(Point::new(515.0, 515.0)).unwrap();
        assert_eq!(hit.object.id, id);
        assert_eq!(index.get_stats().cell_count, 1);
    }

    #[test]
    fn test_update_and_remove_unknown_are_noops() {
        let mut index = HitTestIndex::new();
        index.add_object(rect_at(0.0, 0.0, 10.0, 10.0));
        index.update_object(rect_at(200.0, 200.0, 10.0, 10.0));
        assert!(index.remove_object(Uuid::new_v4()).is_none());
        assert_eq!(index.len(), 1);
        assert!(index.hit_test(Point::new(205.0, 205.0)).is_empty());
    }

    #[test]
    fn test_remove_clears_grid() {
        let mut index = HitTestIndex::new();
        let obj = rect_at(0.0, 0.0, 250.0, 10.0);
        let id = obj.id;
        index.add_object(obj);
        assert!(index.remove_object(id).is_some());
        assert!(index.is_empty());
        assert_eq!(index.get_stats().cell_count, 0);
    }

    #[test]
    fn test_re_adding_id_replaces() {
        let mut index = HitTestIndex::new();
        let obj = rect_at(0.0, 0.0, 10.0, 10.0);
        let id = obj.id;
        index.add_object(obj);
        index.add_object(rect_at(300.0, 300.0, 10.0, 10.0).with_id(id));
        assert_eq!(index.len(), 1);
        assert!(index.hit_test(Point::new(5.0, 5.0)).is_empty());
        assert!(index.hit_test_first(Point::new(305.0, 305.0)).is_some());
    }

    #[test]
    fn test_hit_ordering_by_z_then_distance() {
        let mut index = HitTestIndex::new();
        let low = rect_at(0.0, 0.0, 50.0, 50.0).with_z_index(1);
        let high = rect_at(10.0, 10.0, 50.0, 50.0).with_z_index(5);
        // Same z as `low`, touched only through its tolerance band.
        let near = rect_at(22.0, 0.0, 10.0, 10.0)
            .with_z_index(1)
            .with_tolerance(5.0);
        let (low_id, high_id, near_id) = (low.id, high.id, near.id);
        index.add_objects([low, high, near]);

        let hits = index.hit_test(Point::new(20.0, 12.0));
        let ids: Vec<ObjectId> = hits.iter().map(|h| h.object.id).collect();
        assert_eq!(ids, vec![high_id, low_id, near_id]);

        for pair in hits.windows(2) {
            assert!(pair[0].object.z_index >= pair[1].object.z_index);
            if pair[0].object.z_index == pair[1].object.z_index {
                assert!(pair[0].distance <= pair[1].distance);
            }
        }
    }

    #[test]
    fn test_filters_locked_hidden_unselectable() {
        let mut index = HitTestIndex::new();
        let mut locked = rect_at(0.0, 0.0, 10.0, 10.0);
        locked.set_locked(true);
        let mut hidden = rect_at(0.0, 0.0, 10.0, 10.0);
        hidden.set_visible(false);
        let mut fixed = rect_at(0.0, 0.0, 10.0, 10.0);
        fixed.set_selectable(false);
        index.add_objects([locked, hidden, fixed]);

        assert!(index.hit_test(Point::new(5.0, 5.0)).is_empty());
        assert!(index.rectangle_select(Rect::new(0.0, 0.0, 20.0, 20.0)).is_empty());
        assert_eq!(index.get_objects_in_bounds(Rect::new(0.0, 0.0, 20.0, 20.0)).len(), 3);
    }

    #[test]
    fn test_rectangle_tolerance_property() {
        let mut index = HitTestIndex::new();
        index.add_object(rect_at(0.0, 0.0, 100.0, 40.0).with_tolerance(8.0));
        assert!(index.hit_test_first(Point::new(108.0, 20.0)).is_some());
        assert!(index.hit_test_first(Point::new(109.0, 20.0)).is_none());
        assert!(index.hit_test_first(Point::new(50.0, -8.0)).is_some());
        assert!(index.hit_test_first(Point::new(50.0, -9.0)).is_none());
    }

    #[test]
    fn test_tolerance_band_reaches_neighbor_cell() {
        let mut index = HitTestIndex::new();
        // Right edge just short of the cell boundary at x = 100.
        index.add_object(rect_at(0.0, 0.0, 98.0, 40.0).with_tolerance(5.0));
        let hit = index.hit_test_first(Point::new(102.0, 20.0)).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_huge_tolerance_goes_to_oversized_set() {
        let mut index = HitTestIndex::new();
        let wide = rect_at(0.0, 0.0, 10.0, 10.0).with_tolerance(1e6);
        let id = wide.id;
        index.add_object(wide);

        let stats = index.get_stats();
        assert_eq!(stats.cell_count, 0);
        assert_eq!(stats.oversized_count, 1);
        let hit = index.hit_test_first(Point::new(5000.0, 5.0)).unwrap();
        assert_eq!(hit.object.id, id);
        assert!(index.hit_test_first(Point::new(2e6, 5.0)).is_none());

        // Shrinking the band brings it back into the grid.
        index.update_object(rect_at(0.0, 0.0, 10.0, 10.0).with_id(id));
        let stats = index.get_stats();
        assert_eq!((stats.cell_count, stats.oversized_count), (1, 0));
        assert!(index.hit_test_first(Point::new(5000.0, 5.0)).is_none());

        index.update_object(rect_at(0.0, 0.0, 1e9, 1e9).with_id(id));
        assert!(index.hit_test_first(Point::new(5e8, 5e8)).is_some());
        assert!(index.remove_object(id).is_some());
        assert_eq!(index.get_stats().oversized_count, 0);
        assert!(index.hit_test(Point::new(5.0, 5.0)).is_empty());
    }

    #[test]
    fn test_object_at_cell_cap_stays_in_grid() {
        let mut index = HitTestIndex::new();
        // 64 x 64 cells exactly.
        index.add_object(rect_at(0.0, 0.0, 6399.0, 6399.0));
        let stats = index.get_stats();
        assert_eq!(stats.cell_count as u64, MAX_CELLS_PER_OBJECT);
        assert_eq!(stats.oversized_count, 0);
    }

    #[test]
    fn test_path_default_tolerance() {
        let mut index = HitTestIndex::new();
        index.add_object(DrawableObject::path(vec![
            Point::new(0.0, 50.0),
            Point::new(90.0, 50.0),
        ]));
        assert!(index.hit_test_first(Point::new(45.0, 55.0)).is_some());
        assert!(index.hit_test_first(Point::new(45.0, 56.0)).is_none());
    }

    #[test]
    fn test_rectangle_select_circles() {
        let mut index = HitTestIndex::new();
        // Center outside the selection, circle overlapping its right edge.
        let touching = DrawableObject::circle(Point::new(105.0, 50.0), 10.0);
        // More than one radius away from the selection.
        let distant = DrawableObject::circle(Point::new(130.0, 50.0), 10.0);
        let touching_id = touching.id;
        index.add_objects([touching, distant]);

        let selected = index.rectangle_select(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, touching_id);
    }

    #[test]
    fn test_rectangle_select_sorted_by_z() {
        let mut index = HitTestIndex::new();
        index.add_objects([
            rect_at(0.0, 0.0, 10.0, 10.0).with_z_index(2),
            rect_at(20.0, 0.0, 10.0, 10.0).with_z_index(7),
            rect_at(40.0, 0.0, 10.0, 10.0).with_z_index(-1),
        ]);
        // Dragging right-to-left produces an inverted rectangle.
        let selected = index.rectangle_select(Rect::new(60.0, 20.0, -5.0, -5.0));
        let zs: Vec<i32> = selected.iter().map(|o| o.z_index).collect();
        assert_eq!(zs, vec![7, 2, -1]);
    }

    #[test]
    fn test_rectangle_select_polygon_and_path() {
        let mut index = HitTestIndex::new();
        let triangle = DrawableObject::polygon(vec![
            Point::new(200.0, 200.0),
            Point::new(300.0, 200.0),
            Point::new(250.0, 300.0),
        ]);
        let wire = DrawableObject::path(vec![Point::new(0.0, 400.0), Point::new(500.0, 400.0)]);
        let (triangle_id, wire_id) = (triangle.id, wire.id);
        index.add_objects([triangle, wire]);

        let selected = index.rectangle_select(Rect::new(240.0, 190.0, 260.0, 210.0));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, triangle_id);

        let selected = index.rectangle_select(Rect::new(240.0, 390.0, 260.0, 410.0));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, wire_id);
    }

    #[test]
    fn test_objects_in_bounds_ignores_shape() {
        let mut index = HitTestIndex::new();
        // Bounding box overlaps the query, the circle itself does not.
        index.add_object(DrawableObject::circle(Point::new(10.0, 10.0), 10.0));
        let query = Rect::new(18.0, 18.0, 30.0, 30.0);
        assert_eq!(index.get_objects_in_bounds(query).len(), 1);
        assert!(index.rectangle_select(query).is_empty());
    }

    #[test]
    fn test_custom_shape_hit_on_polygon() {
        let mut index = HitTestIndex::with_cell_size(50.0);
        let square = DrawableObject::new(
            Uuid::new_v4(),
            Default::default(),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Shape::Polygon {
                points: vec![
                    Point::new(0.0, 0.0),
                    Point::new(10.0, 0.0),
                    Point::new(10.0, 10.0),
                    Point::new(0.0, 10.0),
                ],
            },
        );
        index.add_object(square);
        assert!(index.hit_test_first(Point::new(5.0, 5.0)).is_some());
        assert!(index.hit_test_first(Point::new(15.0, 5.0)).is_none());
    }

    #[test]
    fn test_invalid_cell_size_falls_back() {
        let index = HitTestIndex::with_cell_size(0.0);
        assert!((index.cell_size() - DEFAULT_CELL_SIZE).abs() < f64::EPSILON);
    }
}
