//! Layer manager: named, z-ordered groups that objects belong to.
//!
//! Layers control visibility, locking, opacity and paint order. The manager
//! is the sole owner of membership: every [`LayerObject`] records its
//! `layer_id` and the matching layer lists it, and both sides are always
//! updated together.

use crate::observer::{SubscriptionId, Subscribers};
use crate::shapes::{ObjectId, ObjectKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Objects of a deleted layer are moved here when it exists.
pub const FALLBACK_LAYER_ID: &str = "components";

/// Layers created by [`LayerManager::new`], bottom to top.
pub const DEFAULT_LAYERS: [(&str, &str); 6] = [
    ("grid", "Grid"),
    ("connections", "Connections"),
    ("components", "Components"),
    ("labels", "Labels"),
    ("annotations", "Annotations"),
    ("dimensions", "Dimensions"),
];

/// Layer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("Layer already exists: {0}")]
    DuplicateLayer(String),
}

/// A named group of objects sharing visibility, lock state and paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub opacity: f64,
    pub z_index: i32,
    objects: BTreeSet<ObjectId>,
}

impl Layer {
    fn new(id: &str, name: &str, z_index: i32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            visible: true,
            locked: false,
            opacity: 1.0,
            z_index,
            objects: BTreeSet::new(),
        }
    }

    /// Member object ids.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectId> {
        self.objects.iter()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains(id)
    }

    fn record(&self) -> LayerRecord {
        LayerRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            visible: self.visible,
            locked: self.locked,
            opacity: self.opacity,
            z_index: self.z_index,
        }
    }
}

/// Optional settings for [`LayerManager::create_layer`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerOptions {
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub opacity: Option<f64>,
    /// Defaults to one above the current topmost layer.
    pub z_index: Option<i32>,
}

/// Partial mutation for [`LayerManager::update_layer`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerUpdate {
    pub name: Option<String>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub opacity: Option<f64>,
    pub z_index: Option<i32>,
}

/// An object's membership entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerObject {
    pub id: ObjectId,
    pub layer_id: String,
    #[serde(default)]
    pub kind: ObjectKind,
}

impl LayerObject {
    pub fn new(id: ObjectId, layer_id: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id,
            layer_id: layer_id.into(),
            kind,
        }
    }
}

/// Serialized layer metadata, without membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub z_index: i32,
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

/// Exported layer list and active layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerConfiguration {
    pub layers: Vec<LayerRecord>,
    #[serde(default)]
    pub active_layer_id: Option<String>,
}

impl LayerConfiguration {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Notification sent after every layer mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerChange {
    /// Layers in ascending z-order.
    pub layers: Vec<LayerRecord>,
    pub active_layer_id: Option<String>,
}

/// Owns layers, their order and object membership.
#[derive(Debug)]
pub struct LayerManager {
    layers: HashMap<String, Layer>,
    /// Layer ids sorted by ascending z-index.
    order: Vec<String>,
    objects: HashMap<ObjectId, LayerObject>,
    active_layer: Option<String>,
    subscribers: Subscribers<LayerChange>,
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerManager {
    /// Create a manager holding the six default layers, with "components" active.
    pub fn new() -> Self {
        let mut manager = Self {
            layers: HashMap::new(),
            order: Vec::new(),
            objects: HashMap::new(),
            active_layer: Some(FALLBACK_LAYER_ID.to_string()),
            subscribers: Subscribers::new(),
        };
        for (z, (id, name)) in DEFAULT_LAYERS.iter().enumerate() {
            let mut layer = Layer::new(id, name, z as i32);
            if *id == "grid" {
                layer.locked = true;
                layer.opacity = 0.5;
            }
            manager.order.push(layer.id.clone());
            manager.layers.insert(layer.id.clone(), layer);
        }
        manager
    }

    // --- Layer queries ---

    pub fn get_layer(&self, id: &str) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Layers in ascending z-order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.order.iter().filter_map(|id| self.layers.get(id))
    }

    pub fn layer_count(&self) -> usize {
        self.order.len()
    }

    pub fn active_layer_id(&self) -> Option<&str> {
        self.active_layer.as_deref()
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active_layer.as_deref().and_then(|id| self.layers.get(id))
    }

    // --- Layer mutation ---

    /// Add a layer. Fails if `id` is taken.
    ///
    /// Objects orphaned by an earlier import that recorded this id rejoin it.
    pub fn create_layer(
        &mut self,
        id: &str,
        name: &str,
        options: LayerOptions,
    ) -> Result<(), LayerError> {
        if self.layers.contains_key(id) {
            return Err(LayerError::DuplicateLayer(id.to_string()));
        }
        let z_index = options.z_index.unwrap_or_else(|| {
            self.layers
                .values()
                .map(|l| l.z_index)
                .max()
                .map_or(0, |z| z + 1)
        });
        let mut layer = Layer::new(id, name, z_index);
        if let Some(visible) = options.visible {
            layer.visible = visible;
        }
        if let Some(locked) = options.locked {
            layer.locked = locked;
        }
        if let Some(opacity) = options.opacity {
            layer.opacity = clamp_opacity(opacity);
        }
        layer.objects = self
            .objects
            .values()
            .filter(|o| o.layer_id == id)
            .map(|o| o.id)
            .collect();
        if !layer.objects.is_empty() {
            log::debug!("layers: {} re-attached {} objects", id, layer.objects.len());
        }

        self.layers.insert(id.to_string(), layer);
        self.order.push(id.to_string());
        self.sort_order();
        self.notify();
        Ok(())
    }

    /// Remove a layer. Members move to the fallback layer when it survives,
    /// otherwise they are deleted.
    ///
    /// Returns the ids deleted outright, or `None` if the layer is unknown.
    pub fn delete_layer(&mut self, id: &str) -> Option<Vec<ObjectId>> {
        let layer = self.layers.remove(id)?;
        self.order.retain(|l| l != id);

        let mut deleted = Vec::new();
        match self.layers.get_mut(FALLBACK_LAYER_ID) {
            Some(fallback) => {
                for object_id in &layer.objects {
                    if let Some(object) = self.objects.get_mut(object_id) {
                        object.layer_id = FALLBACK_LAYER_ID.to_string();
                        fallback.objects.insert(*object_id);
                    }
                }
            }
            None => {
                for object_id in &layer.objects {
                    if self.objects.remove(object_id).is_some() {
                        deleted.push(*object_id);
                    }
                }
            }
        }

        if self.active_layer.as_deref() == Some(id) {
            self.active_layer = self.order.first().cloned();
        }
        log::debug!(
            "layers: deleted {} ({} objects reassigned, {} deleted)",
            id,
            layer.objects.len() - deleted.len(),
            deleted.len()
        );
        self.notify();
        Some(deleted)
    }

    /// Apply a partial update. Re-sorts only when the z-index changed.
    pub fn update_layer(&mut self, id: &str, update: LayerUpdate) -> bool {
        let Some(layer) = self.layers.get_mut(id) else {
            return false;
        };
        if let Some(name) = update.name {
            layer.name = name;
        }
        if let Some(visible) = update.visible {
            layer.visible = visible;
        }
        if let Some(locked) = update.locked {
            layer.locked = locked;
        }
        if let Some(opacity) = update.opacity {
            layer.opacity = clamp_opacity(opacity);
        }
        let mut resort = false;
        if let Some(z_index) = update.z_index {
            resort = layer.z_index != z_index;
            layer.z_index = z_index;
        }
        if resort {
            self.sort_order();
        }
        self.notify();
        true
    }

    pub fn set_layer_visibility(&mut self, id: &str, visible: bool) -> bool {
        self.update_layer(
            id,
            LayerUpdate {
                visible: Some(visible),
                ..LayerUpdate::default()
            },
        )
    }

    pub fn set_layer_locked(&mut self, id: &str, locked: bool) -> bool {
        self.update_layer(
            id,
            LayerUpdate {
                locked: Some(locked),
                ..LayerUpdate::default()
            },
        )
    }

    /// Set opacity, clamped to `[0, 1]`.
    pub fn set_layer_opacity(&mut self, id: &str, opacity: f64) -> bool {
        self.update_layer(
            id,
            LayerUpdate {
                opacity: Some(opacity),
                ..LayerUpdate::default()
            },
        )
    }

    /// Swap z-index with the layer above. No-op for the topmost layer.
    pub fn move_layer_up(&mut self, id: &str) -> bool {
        match self.order.iter().position(|l| l == id) {
            Some(pos) if pos + 1 < self.order.len() => self.swap_z(pos, pos + 1),
            _ => false,
        }
    }

    /// Swap z-index with the layer below. No-op for the bottom layer.
    pub fn move_layer_down(&mut self, id: &str) -> bool {
        match self.order.iter().position(|l| l == id) {
            Some(pos) if pos > 0 => self.swap_z(pos, pos - 1),
            _ => false,
        }
    }

    fn swap_z(&mut self, a: usize, b: usize) -> bool {
        let (Some(za), Some(zb)) = (
            self.layers.get(&self.order[a]).map(|l| l.z_index),
            self.layers.get(&self.order[b]).map(|l| l.z_index),
        ) else {
            return false;
        };
        if let Some(layer) = self.layers.get_mut(&self.order[a]) {
            layer.z_index = zb;
        }
        if let Some(layer) = self.layers.get_mut(&self.order[b]) {
            layer.z_index = za;
        }
        // Equal z-indices would not reorder under a stable sort.
        self.order.swap(a, b);
        self.sort_order();
        self.notify();
        true
    }

    /// Set the target layer for new objects. `None` clears it.
    pub fn set_active_layer(&mut self, id: Option<&str>) -> bool {
        match id {
            Some(id) if !self.layers.contains_key(id) => false,
            _ => {
                self.active_layer = id.map(str::to_string);
                self.notify();
                true
            }
        }
    }

    // --- Membership ---

    /// Put an object in `object.layer_id`. Fails for unknown or locked layers.
    ///
    /// An id that already belongs to another layer leaves it first.
    pub fn add_object(&mut self, object: LayerObject) -> bool {
        match self.layers.get(&object.layer_id) {
            None => {
                log::warn!("layers: unknown layer {} for object {}", object.layer_id, object.id);
                return false;
            }
            Some(layer) if layer.locked => {
                log::warn!(
                    "layers: layer {} is locked, rejected object {}",
                    object.layer_id,
                    object.id
                );
                return false;
            }
            Some(_) => {}
        }
        self.detach(&object.id);
        if let Some(layer) = self.layers.get_mut(&object.layer_id) {
            layer.objects.insert(object.id);
        }
        self.objects.insert(object.id, object);
        true
    }

    pub fn remove_object(&mut self, id: &ObjectId) -> Option<LayerObject> {
        self.detach(id);
        self.objects.remove(id)
    }

    /// Move an object to another layer. Fails for unknown objects and for
    /// unknown or locked targets.
    pub fn move_object_to_layer(&mut self, id: &ObjectId, target: &str) -> bool {
        if !self.objects.contains_key(id) {
            return false;
        }
        match self.layers.get(target) {
            Some(layer) if !layer.locked => {}
            _ => {
                log::warn!("layers: cannot move {} to layer {}", id, target);
                return false;
            }
        }
        self.detach(id);
        if let Some(layer) = self.layers.get_mut(target) {
            layer.objects.insert(*id);
        }
        if let Some(object) = self.objects.get_mut(id) {
            object.layer_id = target.to_string();
        }
        true
    }

    /// Forget every object. Layers stay.
    pub fn clear_objects(&mut self) {
        self.objects.clear();
        for layer in self.layers.values_mut() {
            layer.objects.clear();
        }
    }

    /// Record an object without joining its layer; the next import attaches
    /// it.
    pub(crate) fn register_object(&mut self, object: LayerObject) {
        self.detach(&object.id);
        self.objects.insert(object.id, object);
    }

    fn detach(&mut self, id: &ObjectId) {
        if let Some(layer) = self
            .objects
            .get(id)
            .and_then(|o| self.layers.get_mut(&o.layer_id))
        {
            layer.objects.remove(id);
        }
    }

    // --- Object queries ---

    pub fn get_object(&self, id: &ObjectId) -> Option<&LayerObject> {
        self.objects.get(id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn get_objects_in_layer(&self, id: &str) -> Vec<ObjectId> {
        self.layers
            .get(id)
            .map(|l| l.objects.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Objects of all visible layers in paint order (ascending z).
    pub fn get_visible_objects(&self) -> Vec<ObjectId> {
        self.layers()
            .filter(|l| l.visible)
            .flat_map(|l| l.objects.iter().copied())
            .collect()
    }

    /// Objects whose recorded layer does not exist.
    pub fn orphaned_objects(&self) -> Vec<ObjectId> {
        let mut orphans: Vec<_> = self
            .objects
            .values()
            .filter(|o| !self.layers.contains_key(&o.layer_id))
            .map(|o| o.id)
            .collect();
        orphans.sort();
        orphans
    }

    fn owning_layer(&self, id: &ObjectId) -> Option<&Layer> {
        self.objects
            .get(id)
            .and_then(|o| self.layers.get(&o.layer_id))
    }

    /// False for unknown or orphaned objects.
    pub fn is_object_visible(&self, id: &ObjectId) -> bool {
        self.owning_layer(id).is_some_and(|l| l.visible)
    }

    /// False for unknown or orphaned objects.
    pub fn is_object_locked(&self, id: &ObjectId) -> bool {
        self.owning_layer(id).is_some_and(|l| l.locked)
    }

    /// Layer opacity, or 1.0 for unknown or orphaned objects.
    pub fn get_object_opacity(&self, id: &ObjectId) -> f64 {
        self.owning_layer(id).map_or(1.0, |l| l.opacity)
    }

    // --- Serialization ---

    pub fn export_layer_configuration(&self) -> LayerConfiguration {
        LayerConfiguration {
            layers: self.layers().map(Layer::record).collect(),
            active_layer_id: self.active_layer.clone(),
        }
    }

    /// Replace all layers, then re-attach known objects by their recorded
    /// layer id.
    ///
    /// Objects whose layer is missing stay registered but belong to no
    /// layer. Their ids are returned.
    pub fn import_layer_configuration(&mut self, config: LayerConfiguration) -> Vec<ObjectId> {
        self.layers.clear();
        self.order.clear();
        for record in config.layers {
            if self.layers.contains_key(&record.id) {
                log::warn!(
                    "layers: duplicate layer {} in configuration, keeping the first",
                    record.id
                );
                continue;
            }
            let layer = Layer {
                id: record.id.clone(),
                name: record.name,
                visible: record.visible,
                locked: record.locked,
                opacity: clamp_opacity(record.opacity),
                z_index: record.z_index,
                objects: BTreeSet::new(),
            };
            self.order.push(record.id.clone());
            self.layers.insert(record.id, layer);
        }
        self.sort_order();

        let mut orphans = Vec::new();
        for object in self.objects.values() {
            match self.layers.get_mut(&object.layer_id) {
                Some(layer) => {
                    layer.objects.insert(object.id);
                }
                None => {
                    log::warn!(
                        "layers: object {} references missing layer {}",
                        object.id,
                        object.layer_id
                    );
                    orphans.push(object.id);
                }
            }
        }
        orphans.sort();

        self.active_layer = match config.active_layer_id {
            Some(id) if self.layers.contains_key(&id) => Some(id),
            _ => self.order.first().cloned(),
        };
        log::debug!(
            "layers: imported {} layers, {} orphaned objects",
            self.order.len(),
            orphans.len()
        );
        self.notify();
        orphans
    }

    // --- Subscriptions ---

    pub fn subscribe(&mut self, callback: impl FnMut(&LayerChange) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn sort_order(&mut self) {
        let layers = &self.layers;
        self.order
            .sort_by_key(|id| layers.get(id).map_or(i32::MAX, |l| l.z_index));
    }

    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let change = LayerChange {
            layers: self.layers().map(Layer::record).collect(),
            active_layer_id: self.active_layer.clone(),
        };
        self.subscribers.notify(&change);
    }
}

fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_nan() {
        1.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}
