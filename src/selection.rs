use kurbo::Point;
use crate::objects::LayerId;
use crate::store::LayerStore;
use crate::types::{Artboard, HandleType};

/// Ordered set of selected layer ids. The most recently added id is the
/// primary selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<LayerId>,
}

impl Selection {
    pub fn ids(&self) -> &[LayerId] {
        &self.ids
    }

    pub fn primary(&self) -> Option<LayerId> {
        self.ids.last().copied()
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn select_only(&mut self, id: LayerId) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Remove the id if present, otherwise add it as primary. Returns
    /// whether the id is selected afterwards.
    pub fn toggle(&mut self, id: LayerId) -> bool {
        if let Some(pos) = self.ids.iter().position(|&x| x == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn remove(&mut self, id: LayerId) {
        self.ids.retain(|&x| x != id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Keep only ids that still exist and are not locked.
    pub fn prune(&mut self, store: &LayerStore) {
        self.ids.retain(|&id| store.get(id).map(|l| !l.locked).unwrap_or(false));
    }

    /// Replace the selection, dropping unknown, locked and duplicate ids.
    pub fn set(&mut self, ids: &[LayerId], store: &LayerStore) {
        self.ids.clear();
        for &id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
        self.prune(store);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
    Handle(LayerId, HandleType),
    Layer(LayerId),
    Background,
    Empty,
}

/// Topmost visible, unlocked layer under `p`. Locked layers are invisible
/// to hit testing, so clicks fall through them.
pub fn hit_layer(store: &LayerStore, p: Point) -> Option<LayerId> {
    store
        .layers()
        .iter()
        .rev()
        .filter(|l| l.visible && !l.locked)
        .find(|l| l.contains(p))
        .map(|l| l.id)
}

/// Corner handle of a selected, unlocked layer within `radius` canvas units.
/// The primary selection is tested first.
pub fn hit_handle(store: &LayerStore, selection: &Selection, p: Point, radius: f64) -> Option<(LayerId, HandleType)> {
    const ORDER: [HandleType; 4] = [HandleType::TopLeft, HandleType::TopRight, HandleType::BottomLeft, HandleType::BottomRight];
    for &id in selection.ids().iter().rev() {
        let Some(layer) = store.get(id) else { continue };
        if layer.locked || !layer.visible || layer.is_drawing() {
            continue;
        }
        for (corner, handle) in layer.corners().iter().zip(ORDER) {
            if corner.distance(p) <= radius {
                return Some((id, handle));
            }
        }
    }
    None
}

pub fn hit_test(store: &LayerStore, selection: &Selection, artboard: &Artboard, p: Point, handle_radius: f64) -> HitTarget {
    if let Some((id, handle)) = hit_handle(store, selection, p, handle_radius) {
        return HitTarget::Handle(id, handle);
    }
    if let Some(id) = hit_layer(store, p) {
        return HitTarget::Layer(id);
    }
    if store.background().image.is_some() && artboard.contains(p) {
        return HitTarget::Background;
    }
    HitTarget::Empty
}
