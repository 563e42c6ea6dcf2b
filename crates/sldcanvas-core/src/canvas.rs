//! Canvas facade tying the index, layers and gesture engine together.

use crate::animation::AnimationId;
use crate::camera::Transform;
use crate::config::EngineConfig;
use crate::gesture::GestureEngine;
use crate::geometry::rects_overlap_inclusive;
use crate::index::{HitResult, HitTestIndex};
use crate::layers::{
    LayerChange, LayerConfiguration, LayerError, LayerManager, LayerObject, LayerOptions,
    LayerUpdate,
};
use crate::observer::SubscriptionId;
use crate::shapes::{DrawableObject, ObjectId};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// An object together with the layer it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub layer_id: String,
    pub object: DrawableObject,
}

/// Everything a host needs to persist and later restore a canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasSnapshot {
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub layers: LayerConfiguration,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

impl CanvasSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A diagram canvas: objects, their layers, the viewport and the selection.
///
/// Input goes to [`Canvas::gesture_mut`]; queries take screen coordinates
/// and go through the current transform. Layers are read through
/// [`Canvas::layers`] and changed only through the canvas, so the index,
/// the layer membership and the selection always hold the same objects.
#[derive(Debug)]
pub struct Canvas {
    index: HitTestIndex,
    layers: LayerManager,
    gesture: GestureEngine,
    /// Selected ids in selection order.
    selection: Vec<ObjectId>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            index: HitTestIndex::from_config(&config.index),
            layers: LayerManager::new(),
            gesture: GestureEngine::from_config(config),
            selection: Vec::new(),
        }
    }

    pub fn index(&self) -> &HitTestIndex {
        &self.index
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn gesture(&self) -> &GestureEngine {
        &self.gesture
    }

    pub fn gesture_mut(&mut self) -> &mut GestureEngine {
        &mut self.gesture
    }

    // --- Objects ---

    /// Register an object in `layer`, or the active layer when `None`.
    ///
    /// Fails without touching the index if the layer is unknown or locked.
    pub fn add_object(&mut self, object: DrawableObject, layer: Option<&str>) -> bool {
        let Some(layer_id) = layer.or(self.layers.active_layer_id()).map(str::to_string) else {
            log::warn!("canvas: no active layer for object {}", object.id);
            return false;
        };
        if !self
            .layers
            .add_object(LayerObject::new(object.id, layer_id, object.kind))
        {
            return false;
        }
        self.index.add_object(object);
        true
    }

    /// Register a batch into one layer. Returns how many were accepted.
    pub fn add_objects(
        &mut self,
        objects: impl IntoIterator<Item = DrawableObject>,
        layer: Option<&str>,
    ) -> usize {
        objects
            .into_iter()
            .map(|object| self.add_object(object, layer))
            .filter(|added| *added)
            .count()
    }

    /// Replace geometry or flags of a registered object.
    pub fn update_object(&mut self, object: DrawableObject) -> bool {
        if !self.index.contains(object.id) {
            return false;
        }
        self.index.update_object(object);
        true
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<DrawableObject> {
        self.layers.remove_object(&id);
        self.selection.retain(|s| *s != id);
        self.index.remove_object(id)
    }

    pub fn move_object_to_layer(&mut self, id: ObjectId, layer: &str) -> bool {
        self.layers.move_object_to_layer(&id, layer)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&DrawableObject> {
        self.index.get_object(id)
    }

    // --- Layers ---

    pub fn create_layer(
        &mut self,
        id: &str,
        name: &str,
        options: LayerOptions,
    ) -> Result<(), LayerError> {
        self.layers.create_layer(id, name, options)
    }

    /// Delete a layer, dropping from the index any object it took with it.
    pub fn delete_layer(&mut self, id: &str) -> Option<Vec<ObjectId>> {
        let deleted = self.layers.delete_layer(id)?;
        for object_id in &deleted {
            self.index.remove_object(*object_id);
        }
        self.selection.retain(|s| !deleted.contains(s));
        Some(deleted)
    }

    pub fn update_layer(&mut self, id: &str, update: LayerUpdate) -> bool {
        self.layers.update_layer(id, update)
    }

    pub fn set_layer_visibility(&mut self, id: &str, visible: bool) -> bool {
        self.layers.set_layer_visibility(id, visible)
    }

    pub fn set_layer_locked(&mut self, id: &str, locked: bool) -> bool {
        self.layers.set_layer_locked(id, locked)
    }

    pub fn set_layer_opacity(&mut self, id: &str, opacity: f64) -> bool {
        self.layers.set_layer_opacity(id, opacity)
    }

    pub fn move_layer_up(&mut self, id: &str) -> bool {
        self.layers.move_layer_up(id)
    }

    pub fn move_layer_down(&mut self, id: &str) -> bool {
        self.layers.move_layer_down(id)
    }

    pub fn set_active_layer(&mut self, id: Option<&str>) -> bool {
        self.layers.set_active_layer(id)
    }

    /// Replace the layer set, keeping every object registered.
    ///
    /// Returns ids whose layer is not in `config`; they stay indexed but are
    /// neither visible nor hittable until a layer with that id is created.
    pub fn import_layer_configuration(&mut self, config: LayerConfiguration) -> Vec<ObjectId> {
        self.layers.import_layer_configuration(config)
    }

    pub fn subscribe_layers(
        &mut self,
        callback: impl FnMut(&LayerChange) + 'static,
    ) -> SubscriptionId {
        self.layers.subscribe(callback)
    }

    pub fn unsubscribe_layers(&mut self, id: SubscriptionId) -> bool {
        self.layers.unsubscribe(id)
    }

    fn is_interactive(&self, id: &ObjectId) -> bool {
        self.layers.is_object_visible(id) && !self.layers.is_object_locked(id)
    }

    // --- Queries ---

    /// Interactive objects under a screen point, topmost first.
    pub fn objects_at(&self, screen: Point) -> Vec<HitResult<'_>> {
        let logical = self.gesture.screen_to_logical(screen);
        self.index
            .hit_test(logical)
            .into_iter()
            .filter(|hit| self.is_interactive(&hit.object.id))
            .collect()
    }

    /// Interactive objects touched by a screen-space marquee, topmost first.
    pub fn objects_in_marquee(&self, screen_rect: Rect) -> Vec<&DrawableObject> {
        let a = self.gesture.screen_to_logical(Point::new(screen_rect.x0, screen_rect.y0));
        let b = self.gesture.screen_to_logical(Point::new(screen_rect.x1, screen_rect.y1));
        self.index
            .rectangle_select(Rect::from_points(a, b))
            .into_iter()
            .filter(|object| self.is_interactive(&object.id))
            .collect()
    }

    /// Paint-ordered ids of visible objects that overlap the current view.
    pub fn visible_objects_in_view(&self) -> Vec<ObjectId> {
        let view = self.gesture.calculate_view_box();
        self.layers
            .get_visible_objects()
            .into_iter()
            .filter(|id| {
                self.index
                    .get_object(*id)
                    .is_some_and(|o| o.visible && rects_overlap_inclusive(o.bounds, view))
            })
            .collect()
    }

    /// Animate the viewport to show every object. `None` when empty.
    pub fn fit_to_content(&mut self, padding: f64) -> Option<AnimationId> {
        let bounds = self.index.bounds()?;
        Some(self.gesture.fit_to_viewport(bounds, padding))
    }

    // --- Selection ---

    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selection.contains(&id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Select the topmost object under a screen point.
    ///
    /// Additive selection toggles the hit object and keeps the rest; otherwise
    /// the selection is replaced (and cleared on a miss).
    pub fn select_at(&mut self, screen: Point, additive: bool) -> Option<ObjectId> {
        let hit = self.objects_at(screen).first().map(|h| h.object.id);
        if !additive {
            self.selection.clear();
        }
        if let Some(id) = hit {
            if additive && self.is_selected(id) {
                self.selection.retain(|s| *s != id);
            } else {
                self.selection.push(id);
            }
        }
        hit
    }

    /// Select everything touched by a screen-space marquee. Returns the ids
    /// it matched.
    pub fn marquee_select(&mut self, screen_rect: Rect, additive: bool) -> Vec<ObjectId> {
        let matched: Vec<ObjectId> = self
            .objects_in_marquee(screen_rect)
            .into_iter()
            .map(|o| o.id)
            .collect();
        if !additive {
            self.selection.clear();
        }
        for id in &matched {
            if !self.selection.contains(id) {
                self.selection.push(*id);
            }
        }
        matched
    }

    // --- Persistence ---

    /// Capture transform, layers and objects.
    pub fn snapshot(&self) -> CanvasSnapshot {
        let mut objects: Vec<SceneObject> = self
            .index
            .objects()
            .filter_map(|object| {
                let layer = self.layers.get_object(&object.id)?;
                Some(SceneObject {
                    layer_id: layer.layer_id.clone(),
                    object: object.clone(),
                })
            })
            .collect();
        objects.sort_by(|a, b| {
            a.object
                .z_index
                .cmp(&b.object.z_index)
                .then_with(|| a.object.id.cmp(&b.object.id))
        });
        CanvasSnapshot {
            transform: self.gesture.transform(),
            layers: self.layers.export_layer_configuration(),
            objects,
        }
    }

    /// Replace the canvas contents with a snapshot.
    ///
    /// Objects are restored even into locked layers. Returns ids whose layer
    /// is missing from the snapshot; they stay registered but hidden.
    pub fn restore(&mut self, snapshot: CanvasSnapshot) -> Vec<ObjectId> {
        self.index.clear();
        self.layers.clear_objects();
        self.selection.clear();

        for SceneObject { layer_id, object } in snapshot.objects {
            self.layers
                .register_object(LayerObject::new(object.id, layer_id, object.kind));
            self.index.add_object(object);
        }
        let orphans = self.layers.import_layer_configuration(snapshot.layers);
        self.gesture.set_transform(snapshot.transform);
        log::debug!(
            "canvas: restored {} objects, {} orphaned",
            self.index.len(),
            orphans.len()
        );
        orphans
    }
}
