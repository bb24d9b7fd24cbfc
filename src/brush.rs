use kurbo::{BezPath, Point};
use crate::objects::{Layer, LayerId, Stroke};
use crate::selection::Selection;
use crate::store::LayerStore;
use crate::types::{Artboard, BrushState};

/// Colour painted into a mask where the layer should disappear.
pub const MASK_HOLE_COLOR: &str = "#000000";

/// Where an eraser gesture goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EraserMode {
    /// Append to the vector mask of this image/shape layer.
    Mask(LayerId),
    /// Paint background-coloured strokes onto this drawing layer.
    Surface(LayerId),
}

/// A brush stroke starting at `at`. Settings are copied in and never
/// re-read from the brush afterwards.
pub fn begin_stroke(brush: &BrushState, at: Point) -> Stroke {
    Stroke {
        points: vec![at],
        color: brush.color.clone(),
        width: brush.size,
        opacity: brush.opacity,
        blur: brush.blur,
    }
}

/// Eraser on a drawing surface: opaque, canvas-coloured, twice as wide.
pub fn begin_surface_eraser(brush: &BrushState, background: &str, at: Point) -> Stroke {
    Stroke {
        points: vec![at],
        color: background.to_string(),
        width: brush.size * 2.0,
        opacity: 1.0,
        blur: 0.0,
    }
}

pub fn begin_mask_stroke(brush: &BrushState, at: Point) -> Stroke {
    Stroke {
        points: vec![at],
        color: MASK_HOLE_COLOR.to_string(),
        width: brush.size,
        opacity: 1.0,
        blur: 0.0,
    }
}

/// Polyline through the stroke's points. A single point becomes a
/// zero-length segment so round caps still draw a dot.
pub fn stroke_path(stroke: &Stroke) -> BezPath {
    let mut path = BezPath::new();
    let mut points = stroke.points.iter();
    if let Some(first) = points.next() {
        path.move_to(*first);
        if stroke.points.len() == 1 {
            path.line_to(*first);
        }
        for p in points {
            path.line_to(*p);
        }
    }
    path
}

/// The drawing layer a brush stroke should extend: the primary selection,
/// when it is an unlocked drawing layer.
pub fn brush_target(store: &LayerStore, selection: &Selection) -> Option<LayerId> {
    let id = selection.primary()?;
    let layer = store.get(id)?;
    (layer.is_drawing() && !layer.locked).then_some(id)
}

/// Masking applies only with exactly one unlocked, maskable, non-drawing
/// layer selected. Otherwise erase on the selected drawing layer, or the
/// topmost unlocked one.
pub fn eraser_mode(store: &LayerStore, selection: &Selection) -> Option<EraserMode> {
    if let [only] = selection.ids() {
        if let Some(layer) = store.get(*only) {
            if !layer.locked && !layer.is_drawing() && layer.mask_strokes().is_some() {
                return Some(EraserMode::Mask(layer.id));
            }
        }
    }
    if let Some(id) = brush_target(store, selection) {
        return Some(EraserMode::Surface(id));
    }
    store
        .layers()
        .iter()
        .rev()
        .find(|l| l.is_drawing() && !l.locked)
        .map(|l| EraserMode::Surface(l.id))
}

/// Centre, length and rotation (degrees) of a line dragged from `anchor`
/// to `current`.
pub fn line_geometry(anchor: Point, current: Point) -> (Point, f64, f64) {
    let d = current - anchor;
    (anchor.midpoint(current), d.hypot(), d.y.atan2(d.x).to_degrees())
}

/// Vector mask for one layer: an opaque rectangle covering the artboard
/// with every erased stroke cut out of it.
///
/// Mask points are in canvas space. They are not mapped through the
/// layer's own rotation or scale, so erasing a transformed layer and then
/// moving it leaves the hole where it was drawn on the canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorMask<'a> {
    pub width: f64,
    pub height: f64,
    pub holes: &'a [Stroke],
}

impl<'a> VectorMask<'a> {
    pub fn for_layer(layer: &'a Layer, artboard: &Artboard) -> Option<VectorMask<'a>> {
        let holes = layer.mask_strokes()?;
        if holes.is_empty() {
            return None;
        }
        Some(VectorMask { width: artboard.width, height: artboard.height, holes })
    }

    /// SVG `<mask>` markup, usable by an SVG renderer or exporter.
    pub fn to_svg(&self, id: &str) -> String {
        let mut out = format!(
            r##"<mask id="{}" maskUnits="userSpaceOnUse" x="0" y="0" width="{}" height="{}"><rect x="0" y="0" width="{}" height="{}" fill="#ffffff" />"##,
            id, self.width, self.height, self.width, self.height
        );
        for stroke in self.holes {
            out.push_str(&format!(
                r##"<path d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="round" stroke-linejoin="round" />"##,
                stroke_path(stroke).to_svg(),
                MASK_HOLE_COLOR,
                stroke.width
            ));
        }
        out.push_str("</mask>");
        out
    }
}
