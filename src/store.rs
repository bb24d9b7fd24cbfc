//! Ordered layer collection plus the singleton background.
//!
//! Array order is paint order: index 0 is painted first, the last layer is
//! on top. Presentation code that lists layers top-first goes through
//! [`LayerStore::display_to_store_index`] and never computes raw indices.

use serde::{Serialize, Deserialize};
use crate::error::{Result, StudioError};
use crate::objects::{Background, Layer, LayerId, LayerPatch};

#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    Added(LayerId),
    Updated(LayerId),
    Removed(Vec<LayerId>),
    Reordered { from: usize, to: usize },
    Replaced,
    BackgroundChanged,
}

pub type SubscriptionId = u32;

type Listener = Box<dyn FnMut(&StoreEvent)>;

#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    layers: Vec<Layer>,
    background: Background,
}

pub struct LayerStore {
    layers: Vec<Layer>,
    background: Background,
    next_id: LayerId,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl Default for LayerStore {
    fn default() -> Self {
        LayerStore::new()
    }
}

impl LayerStore {
    pub fn new() -> Self {
        LayerStore {
            layers: Vec::new(),
            background: Background::default(),
            next_id: 1,
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() < before
    }

    fn notify(&mut self, event: StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Reserve a fresh id. Ids are never reused within a session.
    pub fn allocate_id(&mut self) -> LayerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Append on top. A colliding id is replaced by a fresh one.
    pub fn add(&mut self, mut layer: Layer) -> LayerId {
        if layer.id == 0 || self.get(layer.id).is_some() {
            layer.id = self.allocate_id();
        } else if layer.id >= self.next_id {
            self.next_id = layer.id + 1;
        }
        let id = layer.id;
        self.layers.push(layer);
        self.notify(StoreEvent::Added(id));
        id
    }

    pub fn update(&mut self, id: LayerId, patch: &LayerPatch) -> Result<()> {
        self.modify(id, |layer| layer.apply(patch))
    }

    /// Mutate a layer in place and notify subscribers.
    pub fn modify<F>(&mut self, id: LayerId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Layer),
    {
        let layer = self.layers.iter_mut().find(|l| l.id == id).ok_or(StudioError::LayerNotFound(id))?;
        f(layer);
        self.notify(StoreEvent::Updated(id));
        Ok(())
    }

    /// Mutate several layers with one notification each, skipping ids that
    /// are not present.
    pub fn modify_each<F>(&mut self, ids: &[LayerId], mut f: F)
    where
        F: FnMut(&mut Layer),
    {
        let mut touched = Vec::new();
        for layer in self.layers.iter_mut().filter(|l| ids.contains(&l.id)) {
            f(layer);
            touched.push(layer.id);
        }
        for id in touched {
            self.notify(StoreEvent::Updated(id));
        }
    }

    /// Remove every listed layer. Returns how many were removed.
    pub fn remove(&mut self, ids: &[LayerId]) -> usize {
        let before = self.layers.len();
        let mut removed = Vec::new();
        self.layers.retain(|l| {
            if ids.contains(&l.id) {
                removed.push(l.id);
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.notify(StoreEvent::Removed(removed));
        }
        before - self.layers.len()
    }

    /// Splice the layer at `from` out and re-insert it at `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.layers.len();
        if from >= len {
            return Err(StudioError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(StudioError::IndexOutOfRange { index: to, len });
        }
        if from == to {
            return Ok(());
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.notify(StoreEvent::Reordered { from, to });
        Ok(())
    }

    /// Translate an index in a top-first list into the paint-order index.
    pub fn display_to_store_index(&self, display_index: usize) -> Option<usize> {
        self.layers.len().checked_sub(display_index + 1)
    }

    /// Reorder using top-first (layers panel) indices.
    pub fn reorder_display(&mut self, from_display: usize, to_display: usize) -> Result<()> {
        let len = self.layers.len();
        let from = self.display_to_store_index(from_display)
            .ok_or(StudioError::IndexOutOfRange { index: from_display, len })?;
        let to = self.display_to_store_index(to_display)
            .ok_or(StudioError::IndexOutOfRange { index: to_display, len })?;
        self.reorder(from, to)
    }

    pub fn bring_to_front(&mut self, id: LayerId) -> Result<()> {
        let from = self.index_of(id).ok_or(StudioError::LayerNotFound(id))?;
        self.reorder(from, self.layers.len() - 1)
    }

    pub fn send_to_back(&mut self, id: LayerId) -> Result<()> {
        let from = self.index_of(id).ok_or(StudioError::LayerNotFound(id))?;
        self.reorder(from, 0)
    }

    /// Move one step up (`+1`) or down (`-1`) in paint order. Returns false
    /// when already at the end.
    pub fn step(&mut self, id: LayerId, up: bool) -> Result<bool> {
        let from = self.index_of(id).ok_or(StudioError::LayerNotFound(id))?;
        let to = if up { from + 1 } else { match from.checked_sub(1) { Some(i) => i, None => return Ok(false) } };
        if to >= self.layers.len() {
            return Ok(false);
        }
        self.reorder(from, to)?;
        Ok(true)
    }

    /// Copy a layer, offset it, and insert the copy directly above the source.
    pub fn duplicate(&mut self, id: LayerId) -> Result<LayerId> {
        let pos = self.index_of(id).ok_or(StudioError::LayerNotFound(id))?;
        let mut copy = self.layers[pos].clone();
        copy.id = self.allocate_id();
        copy.x += 20.0;
        copy.y += 20.0;
        copy.locked = false;
        let new_id = copy.id;
        self.layers.insert(pos + 1, copy);
        self.notify(StoreEvent::Added(new_id));
        Ok(new_id)
    }

    /// Swap in a whole layer array (undo/redo, load).
    pub fn replace_all(&mut self, layers: Vec<Layer>) {
        let max_id = layers.iter().map(|l| l.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
        self.layers = layers;
        self.notify(StoreEvent::Replaced);
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
        self.notify(StoreEvent::BackgroundChanged);
    }

    pub fn modify_background<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Background),
    {
        f(&mut self.background);
        self.notify(StoreEvent::BackgroundChanged);
    }

    pub fn serialize(&self) -> Result<String> {
        let snapshot = StoreSnapshot { layers: self.layers.clone(), background: self.background.clone() };
        Ok(serde_json::to_string(&snapshot)?)
    }

    pub fn deserialize(&mut self, json: &str) -> Result<()> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        self.replace_all(snapshot.layers);
        self.set_background(snapshot.background);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ShapeKind;
    use kurbo::Point;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store_with(n: usize) -> LayerStore {
        let mut store = LayerStore::new();
        for i in 0..n {
            let id = store.allocate_id();
            store.add(Layer::shape(id, Point::new(i as f64 * 10.0, 0.0), ShapeKind::Rect));
        }
        store
    }

    fn ids(store: &LayerStore) -> Vec<LayerId> {
        store.layers().iter().map(|l| l.id).collect()
    }

    #[test]
    fn reorder_preserves_relative_order_of_others() {
        let mut store = store_with(5);
        store.reorder(0, 3).unwrap();
        assert_eq!(ids(&store), vec![2, 3, 4, 1, 5]);
        store.reorder(4, 1).unwrap();
        assert_eq!(ids(&store), vec![2, 5, 3, 4, 1]);
    }

    #[test]
    fn reorder_out_of_range_is_error() {
        let mut store = store_with(2);
        assert!(matches!(store.reorder(0, 2), Err(StudioError::IndexOutOfRange { index: 2, len: 2 })));
    }

    #[test]
    fn display_indices_map_to_paint_order() {
        let mut store = store_with(4);
        assert_eq!(store.display_to_store_index(0), Some(3));
        assert_eq!(store.display_to_store_index(3), Some(0));
        assert_eq!(store.display_to_store_index(4), None);
        // Drag the top row of the panel to the bottom row.
        store.reorder_display(0, 3).unwrap();
        assert_eq!(ids(&store), vec![4, 1, 2, 3]);
    }

    #[test]
    fn remove_takes_exactly_listed_ids() {
        let mut store = store_with(5);
        assert_eq!(store.remove(&[2, 4, 99]), 2);
        assert_eq!(ids(&store), vec![1, 3, 5]);
    }

    #[test]
    fn ids_stay_unique_after_replace() {
        let mut store = store_with(3);
        let snapshot = store.layers()[..1].to_vec();
        store.replace_all(snapshot);
        let id = store.allocate_id();
        assert_eq!(id, 4);
    }

    #[test]
    fn add_reassigns_colliding_id() {
        let mut store = store_with(2);
        let id = store.add(Layer::shape(1, Point::ZERO, ShapeKind::Circle));
        assert_eq!(id, 3);
    }

    #[test]
    fn duplicate_sits_above_source() {
        let mut store = store_with(3);
        let copy = store.duplicate(1).unwrap();
        assert_eq!(ids(&store), vec![1, copy, 2, 3]);
        assert_eq!(store.get(copy).map(|l| l.x), Some(20.0));
    }

    #[test]
    fn step_stops_at_ends() {
        let mut store = store_with(2);
        assert!(!store.step(2, true).unwrap());
        assert!(store.step(2, false).unwrap());
        assert_eq!(ids(&store), vec![2, 1]);
        assert!(!store.step(2, false).unwrap());
    }

    #[test]
    fn subscribers_see_events_until_unsubscribed() {
        let mut store = LayerStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = store.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        let id = store.allocate_id();
        store.add(Layer::shape(id, Point::ZERO, ShapeKind::Rect));
        store.update(id, &LayerPatch { x: Some(5.0), ..Default::default() }).unwrap();
        assert!(store.unsubscribe(sub));
        store.remove(&[id]);
        assert_eq!(*seen.borrow(), vec![StoreEvent::Added(id), StoreEvent::Updated(id)]);
    }

    #[test]
    fn update_missing_layer_is_error() {
        let mut store = LayerStore::new();
        assert!(matches!(store.update(9, &LayerPatch::default()), Err(StudioError::LayerNotFound(9))));
    }

    #[test]
    fn serialize_round_trip() {
        let mut store = store_with(2);
        store.modify_background(|bg| bg.image = Some("https://cdn/bg.png".into()));
        let json = store.serialize().unwrap();
        let mut other = LayerStore::new();
        other.deserialize(&json).unwrap();
        assert_eq!(other.layers(), store.layers());
        assert_eq!(other.background(), store.background());
    }
}
