use serde::{Serialize, Deserialize};
use kurbo::{Point, Vec2};
use crate::filters::FilterSettings;
use crate::types::Artboard;

pub type LayerId = u32;

fn one() -> f64 { 1.0 }
fn yes() -> bool { true }

/// One continuous freehand path in canvas coordinates.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Stroke {
    pub points: Vec<Point>,
    pub color: String,
    pub width: f64,
    pub opacity: f64,
    pub blur: f64,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    pub letter_spacing: f64,
    pub font_weight: String,
    pub font_style: String,
    pub text_align: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<f64>,
    pub shadow_blur: f64,
    pub glow_intensity: f64,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    pub src: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub mask_strokes: Vec<Stroke>,
}

/// Geometry shared by rect, circle, triangle, polygon and line layers.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ShapeLayer {
    pub width: f64,
    pub height: f64,
    pub fill: bool,
    pub fill_color: String,
    pub stroke: bool,
    pub stroke_color: String,
    pub stroke_width: f64,
    #[serde(default)]
    pub stroke_dash: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sides: Option<u32>,
    #[serde(default)]
    pub mask_strokes: Vec<Stroke>,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct DrawingLayer {
    pub strokes: Vec<Stroke>,
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    Text(TextLayer),
    Image(ImageLayer),
    Rect(ShapeLayer),
    Circle(ShapeLayer),
    Triangle(ShapeLayer),
    Polygon(ShapeLayer),
    Line(ShapeLayer),
    Drawing(DrawingLayer),
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Circle,
    Triangle,
    Polygon,
    Line,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64, // degrees
    #[serde(default = "one")]
    pub scale: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(default)]
    pub aspect_locked: bool,
    /// Height:width ratio captured when the aspect lock was engaged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(flatten)]
    pub kind: LayerKind,
}

/// The singleton artboard background. Not a layer: it has no rotation and
/// is never deleted.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct Background {
    pub image: Option<String>,
    pub offset: Vec2,
    pub scale: f64,
    pub locked: bool,
    pub filters: FilterSettings,
}

impl Default for Background {
    fn default() -> Self {
        Background {
            image: None,
            offset: Vec2::ZERO,
            scale: 1.0,
            locked: false,
            filters: FilterSettings::default(),
        }
    }
}

/// Partial property edit, as sent by a property panel.
#[derive(Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
    pub scale: Option<f64>,
    pub locked: Option<bool>,
    pub visible: Option<bool>,
    pub opacity: Option<f64>,
    pub aspect_locked: Option<bool>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub text: Option<String>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub color: Option<String>,
    pub letter_spacing: Option<f64>,
    pub font_weight: Option<String>,
    pub font_style: Option<String>,
    pub text_align: Option<String>,
    pub curve: Option<f64>,
    pub shadow_blur: Option<f64>,
    pub glow_intensity: Option<f64>,
    pub src: Option<String>,
    pub filters: Option<FilterSettings>,
    pub fill: Option<bool>,
    pub fill_color: Option<String>,
    pub stroke: Option<bool>,
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f64>,
    pub stroke_dash: Option<Vec<f64>>,
    pub sides: Option<u32>,
}

impl ShapeLayer {
    fn new(width: f64, height: f64, sides: Option<u32>) -> Self {
        ShapeLayer {
            width,
            height,
            fill: true,
            fill_color: "#4facfe".to_string(),
            stroke: false,
            stroke_color: "#000000".to_string(),
            stroke_width: 2.0,
            stroke_dash: Vec::new(),
            sides,
            mask_strokes: Vec::new(),
        }
    }
}

impl Layer {
    fn with_kind(id: LayerId, at: Point, kind: LayerKind) -> Self {
        Layer {
            id,
            x: at.x,
            y: at.y,
            rotation: 0.0,
            scale: 1.0,
            locked: false,
            visible: true,
            opacity: 1.0,
            aspect_locked: false,
            aspect_ratio: None,
            kind,
        }
    }

    pub fn text(id: LayerId, at: Point, text: &str) -> Self {
        Layer::with_kind(id, at, LayerKind::Text(TextLayer {
            text: text.to_string(),
            font_size: 48.0,
            font_family: "Inter, sans-serif".to_string(),
            color: "#000000".to_string(),
            letter_spacing: 0.0,
            font_weight: "normal".to_string(),
            font_style: "normal".to_string(),
            text_align: "center".to_string(),
            curve: None,
            shadow_blur: 0.0,
            glow_intensity: 0.0,
        }))
    }

    pub fn image(id: LayerId, at: Point, src: &str, width: f64, height: f64) -> Self {
        let mut layer = Layer::with_kind(id, at, LayerKind::Image(ImageLayer {
            src: src.to_string(),
            width,
            height,
            filters: FilterSettings::default(),
            mask_strokes: Vec::new(),
        }));
        layer.lock_aspect();
        layer
    }

    pub fn shape(id: LayerId, at: Point, shape: ShapeKind) -> Self {
        let kind = match shape {
            ShapeKind::Rect => LayerKind::Rect(ShapeLayer::new(100.0, 100.0, None)),
            ShapeKind::Circle => LayerKind::Circle(ShapeLayer::new(100.0, 100.0, None)),
            ShapeKind::Triangle => LayerKind::Triangle(ShapeLayer::new(100.0, 100.0, None)),
            ShapeKind::Polygon => LayerKind::Polygon(ShapeLayer::new(100.0, 100.0, Some(6))),
            ShapeKind::Line => {
                let mut line = ShapeLayer::new(0.0, 4.0, None);
                line.fill = false;
                line.stroke = true;
                line.stroke_width = 4.0;
                LayerKind::Line(line)
            }
        };
        Layer::with_kind(id, at, kind)
    }

    /// A freehand layer covering the whole artboard, centred on it.
    pub fn drawing(id: LayerId, artboard: &Artboard) -> Self {
        Layer::with_kind(id, artboard.center(), LayerKind::Drawing(DrawingLayer {
            strokes: Vec::new(),
            width: artboard.width,
            height: artboard.height,
        }))
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            LayerKind::Text(_) => "text",
            LayerKind::Image(_) => "image",
            LayerKind::Rect(_) => "rect",
            LayerKind::Circle(_) => "circle",
            LayerKind::Triangle(_) => "triangle",
            LayerKind::Polygon(_) => "polygon",
            LayerKind::Line(_) => "line",
            LayerKind::Drawing(_) => "drawing",
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.kind, LayerKind::Drawing(_))
    }

    pub fn shape_data(&self) -> Option<&ShapeLayer> {
        match &self.kind {
            LayerKind::Rect(s) | LayerKind::Circle(s) | LayerKind::Triangle(s)
            | LayerKind::Polygon(s) | LayerKind::Line(s) => Some(s),
            _ => None,
        }
    }

    pub fn shape_data_mut(&mut self) -> Option<&mut ShapeLayer> {
        match &mut self.kind {
            LayerKind::Rect(s) | LayerKind::Circle(s) | LayerKind::Triangle(s)
            | LayerKind::Polygon(s) | LayerKind::Line(s) => Some(s),
            _ => None,
        }
    }

    pub fn mask_strokes(&self) -> Option<&Vec<Stroke>> {
        match &self.kind {
            LayerKind::Image(img) => Some(&img.mask_strokes),
            _ => self.shape_data().map(|s| &s.mask_strokes),
        }
    }

    /// Only image and shape layers can carry an eraser mask.
    pub fn mask_strokes_mut(&mut self) -> Option<&mut Vec<Stroke>> {
        match &mut self.kind {
            LayerKind::Image(img) => Some(&mut img.mask_strokes),
            LayerKind::Rect(s) | LayerKind::Circle(s) | LayerKind::Triangle(s)
            | LayerKind::Polygon(s) | LayerKind::Line(s) => Some(&mut s.mask_strokes),
            _ => None,
        }
    }

    /// Unscaled width and height in canvas units. Text is estimated from
    /// font metrics since no font is available to the core.
    pub fn size(&self) -> (f64, f64) {
        match &self.kind {
            LayerKind::Text(t) => {
                let chars = t.text.chars().count().max(1) as f64;
                let width = chars * t.font_size * 0.6 + (chars - 1.0) * t.letter_spacing;
                (width.max(t.font_size * 0.6), t.font_size * 1.2)
            }
            LayerKind::Image(img) => (img.width, img.height),
            LayerKind::Line(s) => (s.width, s.height.max(s.stroke_width)),
            LayerKind::Drawing(d) => (d.width, d.height),
            _ => self.shape_data().map(|s| (s.width, s.height)).unwrap_or((0.0, 0.0)),
        }
    }

    /// Map a canvas point into this layer's unrotated, unscaled frame,
    /// relative to its centre.
    pub fn to_local(&self, p: Point) -> Point {
        let d = p - self.position();
        let (sin, cos) = (-self.rotation.to_radians()).sin_cos();
        let scale = self.scale.max(f64::EPSILON);
        Point::new((d.x * cos - d.y * sin) / scale, (d.x * sin + d.y * cos) / scale)
    }

    pub fn to_world(&self, local: Point) -> Point {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let lx = local.x * self.scale;
        let ly = local.y * self.scale;
        self.position() + Vec2::new(lx * cos - ly * sin, lx * sin + ly * cos)
    }

    /// Map a canvas point into the stroke space of a drawing layer. Strokes
    /// are kept in the canvas frame the layer had when created (centred on
    /// the artboard), so an untouched drawing layer maps points to themselves.
    pub fn to_surface(&self, p: Point) -> Point {
        let (w, h) = self.size();
        self.to_local(p) + Vec2::new(w / 2.0, h / 2.0)
    }

    /// Corners in canvas space: top-left, top-right, bottom-left, bottom-right.
    pub fn corners(&self) -> [Point; 4] {
        let (w, h) = self.size();
        let (hw, hh) = (w / 2.0, h / 2.0);
        [
            self.to_world(Point::new(-hw, -hh)),
            self.to_world(Point::new(hw, -hh)),
            self.to_world(Point::new(-hw, hh)),
            self.to_world(Point::new(hw, hh)),
        ]
    }

    pub fn world_bounds(&self) -> kurbo::Rect {
        let corners = self.corners();
        let mut rect = kurbo::Rect::from_points(corners[0], corners[1]);
        rect = rect.union_pt(corners[2]);
        rect.union_pt(corners[3])
    }

    /// Whether `p` (canvas space) falls on this layer. Drawing layers span
    /// the artboard, so they only hit near their actual strokes.
    pub fn contains(&self, p: Point) -> bool {
        match &self.kind {
            LayerKind::Drawing(d) => {
                let q = self.to_surface(p);
                d.strokes.iter().any(|s| stroke_hit(s, q))
            }
            LayerKind::Line(_) => {
                let (w, h) = self.size();
                let local = self.to_local(p);
                local.x.abs() <= w / 2.0 && local.y.abs() <= (h / 2.0).max(6.0)
            }
            _ => {
                let (w, h) = self.size();
                let local = self.to_local(p);
                local.x.abs() <= w / 2.0 && local.y.abs() <= h / 2.0
            }
        }
    }

    pub fn width(&self) -> Option<f64> {
        match &self.kind {
            LayerKind::Image(img) => Some(img.width),
            LayerKind::Text(_) | LayerKind::Drawing(_) => None,
            _ => self.shape_data().map(|s| s.width),
        }
    }

    fn dims(&self) -> Option<(f64, f64)> {
        match &self.kind {
            LayerKind::Image(img) => Some((img.width, img.height)),
            LayerKind::Text(_) | LayerKind::Drawing(_) => None,
            _ => self.shape_data().map(|s| (s.width, s.height)),
        }
    }

    fn dims_mut(&mut self) -> Option<(&mut f64, &mut f64)> {
        match &mut self.kind {
            LayerKind::Image(img) => Some((&mut img.width, &mut img.height)),
            LayerKind::Rect(s) | LayerKind::Circle(s) | LayerKind::Triangle(s)
            | LayerKind::Polygon(s) | LayerKind::Line(s) => Some((&mut s.width, &mut s.height)),
            LayerKind::Text(_) | LayerKind::Drawing(_) => None,
        }
    }

    fn current_ratio(&self) -> Option<f64> {
        self.dims().filter(|(w, _)| *w > 0.0).map(|(w, h)| h / w)
    }

    /// Engage the aspect lock, remembering the current height:width ratio.
    pub fn lock_aspect(&mut self) {
        self.aspect_locked = true;
        self.aspect_ratio = self.current_ratio();
    }

    /// Set the width; aspect-locked layers carry their height along with the
    /// ratio captured at lock time.
    pub fn set_width(&mut self, width: f64) {
        let ratio = if self.aspect_locked {
            self.aspect_ratio.or_else(|| self.current_ratio())
        } else {
            None
        };
        if ratio.is_some() && self.aspect_ratio.is_none() {
            self.aspect_ratio = ratio;
        }
        if let Some((w, h)) = self.dims_mut() {
            if let Some(r) = ratio {
                *h = width * r;
            }
            *w = width;
        }
    }

    pub fn apply(&mut self, patch: &LayerPatch) {
        if let Some(v) = patch.x { self.x = v; }
        if let Some(v) = patch.y { self.y = v; }
        if let Some(v) = patch.rotation { self.rotation = v; }
        if let Some(v) = patch.scale { self.scale = v.max(0.1); }
        if let Some(v) = patch.locked { self.locked = v; }
        if let Some(v) = patch.visible { self.visible = v; }
        if let Some(v) = patch.opacity { self.opacity = v.clamp(0.0, 1.0); }
        if let Some(v) = patch.aspect_locked {
            if v && !self.aspect_locked {
                self.lock_aspect();
            } else if !v {
                self.aspect_locked = false;
                self.aspect_ratio = None;
            }
        }
        if let Some(v) = patch.width { self.set_width(v); }
        if let Some(v) = patch.height {
            if !self.aspect_locked || patch.width.is_none() {
                if let Some((_, h)) = self.dims_mut() { *h = v; }
                if self.aspect_locked {
                    self.aspect_ratio = self.current_ratio().or(self.aspect_ratio);
                }
            }
        }
        match &mut self.kind {
            LayerKind::Text(t) => {
                if let Some(v) = &patch.text { t.text = v.clone(); }
                if let Some(v) = patch.font_size { t.font_size = v; }
                if let Some(v) = &patch.font_family { t.font_family = v.clone(); }
                if let Some(v) = &patch.color { t.color = v.clone(); }
                if let Some(v) = patch.letter_spacing { t.letter_spacing = v; }
                if let Some(v) = &patch.font_weight { t.font_weight = v.clone(); }
                if let Some(v) = &patch.font_style { t.font_style = v.clone(); }
                if let Some(v) = &patch.text_align { t.text_align = v.clone(); }
                if let Some(v) = patch.curve { t.curve = if v == 0.0 { None } else { Some(v) }; }
                if let Some(v) = patch.shadow_blur { t.shadow_blur = v; }
                if let Some(v) = patch.glow_intensity { t.glow_intensity = v; }
            }
            LayerKind::Image(img) => {
                if let Some(v) = &patch.src { img.src = v.clone(); }
                if let Some(v) = &patch.filters { img.filters = v.clamped(); }
            }
            LayerKind::Drawing(_) => {}
            LayerKind::Rect(s) | LayerKind::Circle(s) | LayerKind::Triangle(s)
            | LayerKind::Polygon(s) | LayerKind::Line(s) => {
                if let Some(v) = patch.fill { s.fill = v; }
                if let Some(v) = &patch.fill_color { s.fill_color = v.clone(); }
                if let Some(v) = patch.stroke { s.stroke = v; }
                if let Some(v) = &patch.stroke_color { s.stroke_color = v.clone(); }
                if let Some(v) = patch.stroke_width { s.stroke_width = v; }
                if let Some(v) = &patch.stroke_dash { s.stroke_dash = v.clone(); }
                if let Some(v) = patch.sides {
                    if s.sides.is_some() { s.sides = Some(v.max(3)); }
                }
            }
        }
    }
}

fn stroke_hit(stroke: &Stroke, p: Point) -> bool {
    let tolerance = stroke.width / 2.0 + 4.0;
    match stroke.points.as_slice() {
        [] => false,
        [only] => only.distance(p) <= tolerance,
        points => points.windows(2).any(|w| segment_distance(w[0], w[1], p) <= tolerance),
    }
}

fn segment_distance(a: Point, b: Point, p: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return a.distance(p);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t).distance(p)
}
