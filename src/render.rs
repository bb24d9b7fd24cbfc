use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Path2d};
use std::f64::consts::PI;
use crate::brush::{stroke_path, MASK_HOLE_COLOR};
use crate::engine::StudioEngine;
use crate::filters::{compose_filter, FilterSettings};
use crate::interaction::GuideOrientation;
use crate::objects::{Layer, LayerKind, ShapeLayer, Stroke, TextLayer};

const SELECTION_COLOR: &str = "#4facfe";
const GUIDE_COLOR: &str = "#ff3ea5";

fn dash_array(dash: &[f64]) -> js_sys::Array {
    let array = js_sys::Array::new();
    for &d in dash {
        array.push(&JsValue::from_f64(d));
    }
    array
}

fn set_filter(ctx: &CanvasRenderingContext2d, filters: &FilterSettings) {
    if filters.is_neutral() {
        ctx.set_filter("none");
    } else {
        ctx.set_filter(&compose_filter(filters));
    }
}

/// Detached canvas the size of the artboard, used to composite masks.
fn offscreen(width: f64, height: f64) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_width(width.ceil().max(1.0) as u32);
    canvas.set_height(height.ceil().max(1.0) as u32);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into()?;
    Ok((canvas, ctx))
}

fn draw_stroke(ctx: &CanvasRenderingContext2d, stroke: &Stroke, color: &str) -> Result<(), JsValue> {
    let path = Path2d::new_with_path_string(&stroke_path(stroke).to_svg())?;
    ctx.save();
    ctx.set_global_alpha(ctx.global_alpha() * stroke.opacity);
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(stroke.width);
    ctx.set_line_cap("round");
    ctx.set_line_join("round");
    if stroke.blur > 0.0 {
        ctx.set_filter(&format!("blur({}px)", stroke.blur));
    }
    ctx.stroke_with_path(&path);
    ctx.restore();
    Ok(())
}

fn paint_shape(ctx: &CanvasRenderingContext2d, shape: &ShapeLayer) -> Result<(), JsValue> {
    ctx.set_line_dash(&dash_array(&shape.stroke_dash))?;
    if shape.fill {
        ctx.set_fill_style_str(&shape.fill_color);
        ctx.fill();
    }
    if shape.stroke && shape.stroke_width > 0.0 {
        ctx.set_stroke_style_str(&shape.stroke_color);
        ctx.set_line_width(shape.stroke_width);
        ctx.stroke();
    }
    Ok(())
}

fn regular_polygon(ctx: &CanvasRenderingContext2d, rx: f64, ry: f64, sides: u32) {
    ctx.begin_path();
    for i in 0..sides {
        let angle = -PI / 2.0 + i as f64 * 2.0 * PI / sides as f64;
        let (x, y) = (rx * angle.cos(), ry * angle.sin());
        if i == 0 { ctx.move_to(x, y); } else { ctx.line_to(x, y); }
    }
    ctx.close_path();
}

fn draw_text(ctx: &CanvasRenderingContext2d, text: &TextLayer) -> Result<(), JsValue> {
    ctx.set_font(&format!("{} {} {}px {}", text.font_style, text.font_weight, text.font_size, text.font_family));
    ctx.set_fill_style_str(&text.color);
    ctx.set_text_baseline("middle");
    if text.glow_intensity > 0.0 {
        ctx.set_shadow_color(&text.color);
        ctx.set_shadow_blur(text.glow_intensity);
    } else if text.shadow_blur > 0.0 {
        ctx.set_shadow_color("rgba(0,0,0,0.5)");
        ctx.set_shadow_blur(text.shadow_blur);
    }

    let chars: Vec<String> = text.text.chars().map(|c| c.to_string()).collect();
    if text.curve.is_none() && text.letter_spacing == 0.0 {
        ctx.set_text_align(&text.text_align);
        let x = match text.text_align.as_str() {
            "left" | "start" => -ctx.measure_text(&text.text)?.width() / 2.0,
            "right" | "end" => ctx.measure_text(&text.text)?.width() / 2.0,
            _ => 0.0,
        };
        return ctx.fill_text(&text.text, x, 0.0);
    }

    let mut advances = Vec::with_capacity(chars.len());
    for c in &chars {
        advances.push(ctx.measure_text(c)?.width() + text.letter_spacing);
    }
    let total: f64 = advances.iter().sum::<f64>() - text.letter_spacing;
    ctx.set_text_align("center");

    match text.curve.filter(|c| *c != 0.0) {
        None => {
            let mut x = -total / 2.0;
            for (c, advance) in chars.iter().zip(&advances) {
                ctx.fill_text(c, x + (advance - text.letter_spacing) / 2.0, 0.0)?;
                x += advance;
            }
        }
        Some(curve) => {
            // Bend the baseline into an arc spanning `curve` degrees.
            let radius = total / curve.to_radians();
            let mut s = 0.0;
            for (c, advance) in chars.iter().zip(&advances) {
                let theta = (s + (advance - text.letter_spacing) / 2.0 - total / 2.0) / radius;
                ctx.save();
                ctx.translate(radius * theta.sin(), radius * (1.0 - theta.cos()))?;
                ctx.rotate(theta)?;
                ctx.fill_text(c, 0.0, 0.0)?;
                ctx.restore();
                s += advance;
            }
        }
    }
    Ok(())
}

#[wasm_bindgen]
impl StudioEngine {
    /// Paint the whole editor surface. `ctx` belongs to a canvas that
    /// covers the viewport container.
    pub fn render(&self, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
        let zoom = self.viewport.zoom;
        let (width, height) = match ctx.canvas() {
            Some(canvas) => (canvas.width() as f64, canvas.height() as f64),
            None => (self.viewport.container_size.width, self.viewport.container_size.height),
        };
        ctx.save();
        ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
        ctx.clear_rect(0.0, 0.0, width, height);

        let origin = self.viewport.artboard_screen_origin(&self.artboard) - self.viewport.container_origin.to_vec2();
        ctx.translate(origin.x, origin.y)?;
        ctx.scale(zoom, zoom)?;

        ctx.save();
        ctx.set_fill_style_str(&self.config.canvas_background);
        ctx.set_shadow_color("rgba(0,0,0,0.25)");
        ctx.set_shadow_blur(20.0);
        ctx.fill_rect(0.0, 0.0, self.artboard.width, self.artboard.height);
        ctx.restore();

        ctx.save();
        ctx.begin_path();
        ctx.rect(0.0, 0.0, self.artboard.width, self.artboard.height);
        ctx.clip();
        self.render_background(ctx)?;
        for layer in self.store.layers().iter().filter(|l| l.visible) {
            self.render_layer(ctx, layer)?;
        }
        ctx.restore();

        self.render_snap_guides(ctx);
        self.render_selection_overlay(ctx)?;
        ctx.restore();
        Ok(())
    }
}

impl StudioEngine {
    fn render_background(&self, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
        let background = self.store.background();
        let Some(src) = &background.image else { return Ok(()) };
        let Some(image) = self.image_cache.get(src) else { return Ok(()) };
        let (iw, ih) = (image.natural_width() as f64, image.natural_height() as f64);
        if iw == 0.0 || ih == 0.0 {
            return Ok(());
        }
        // Cover the artboard, then apply the user's scale and offset.
        let cover = (self.artboard.width / iw).max(self.artboard.height / ih) * background.scale;
        let (dw, dh) = (iw * cover, ih * cover);
        let dx = (self.artboard.width - dw) / 2.0 + background.offset.x;
        let dy = (self.artboard.height - dh) / 2.0 + background.offset.y;
        ctx.save();
        set_filter(ctx, &background.filters);
        ctx.draw_image_with_html_image_element_and_dw_and_dh(image, dx, dy, dw, dh)?;
        ctx.restore();
        Ok(())
    }

    fn render_layer(&self, ctx: &CanvasRenderingContext2d, layer: &Layer) -> Result<(), JsValue> {
        let holes = layer.mask_strokes().filter(|m| !m.is_empty());
        let Some(holes) = holes else {
            return self.draw_layer(ctx, layer);
        };
        // Mask strokes are in canvas space, so the layer is flattened onto
        // an artboard-sized surface before the holes are cut.
        let (canvas, octx) = offscreen(self.artboard.width, self.artboard.height)?;
        self.draw_layer(&octx, layer)?;
        octx.set_global_composite_operation("destination-out")?;
        for stroke in holes {
            draw_stroke(&octx, &Stroke { opacity: 1.0, blur: 0.0, ..stroke.clone() }, MASK_HOLE_COLOR)?;
        }
        ctx.draw_image_with_html_canvas_element(&canvas, 0.0, 0.0)
    }

    fn draw_layer(&self, ctx: &CanvasRenderingContext2d, layer: &Layer) -> Result<(), JsValue> {
        ctx.save();
        ctx.set_global_alpha(layer.opacity);
        ctx.translate(layer.x, layer.y)?;
        ctx.rotate(layer.rotation.to_radians())?;
        ctx.scale(layer.scale, layer.scale)?;
        let (w, h) = layer.size();
        match &layer.kind {
            LayerKind::Text(text) => draw_text(ctx, text)?,
            LayerKind::Image(image) => {
                if let Some(element) = self.image_cache.get(&image.src) {
                    set_filter(ctx, &image.filters);
                    ctx.draw_image_with_html_image_element_and_dw_and_dh(element, -w / 2.0, -h / 2.0, w, h)?;
                }
            }
            LayerKind::Rect(shape) => {
                ctx.begin_path();
                ctx.rect(-w / 2.0, -h / 2.0, w, h);
                paint_shape(ctx, shape)?;
            }
            LayerKind::Circle(shape) => {
                ctx.begin_path();
                ctx.ellipse(0.0, 0.0, w / 2.0, h / 2.0, 0.0, 0.0, PI * 2.0)?;
                paint_shape(ctx, shape)?;
            }
            LayerKind::Triangle(shape) => {
                ctx.begin_path();
                ctx.move_to(0.0, -h / 2.0);
                ctx.line_to(w / 2.0, h / 2.0);
                ctx.line_to(-w / 2.0, h / 2.0);
                ctx.close_path();
                paint_shape(ctx, shape)?;
            }
            LayerKind::Polygon(shape) => {
                regular_polygon(ctx, w / 2.0, h / 2.0, shape.sides.unwrap_or(6).max(3));
                paint_shape(ctx, shape)?;
            }
            LayerKind::Line(shape) => {
                ctx.set_line_dash(&dash_array(&shape.stroke_dash))?;
                ctx.set_stroke_style_str(&shape.stroke_color);
                ctx.set_line_width(shape.stroke_width);
                ctx.set_line_cap("round");
                ctx.begin_path();
                ctx.move_to(-w / 2.0, 0.0);
                ctx.line_to(w / 2.0, 0.0);
                ctx.stroke();
            }
            LayerKind::Drawing(drawing) => {
                ctx.translate(-drawing.width / 2.0, -drawing.height / 2.0)?;
                for stroke in &drawing.strokes {
                    draw_stroke(ctx, stroke, &stroke.color)?;
                }
            }
        }
        ctx.restore();
        Ok(())
    }

    fn render_selection_overlay(&self, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
        let zoom = self.viewport.zoom;
        let radius = self.config.handle_radius / zoom / 2.0;
        ctx.save();
        ctx.set_stroke_style_str(SELECTION_COLOR);
        ctx.set_line_width(1.5 / zoom);
        for id in self.selection.ids() {
            let Some(layer) = self.store.get(*id) else { continue };
            let [tl, tr, bl, br] = layer.corners();
            ctx.set_line_dash(&dash_array(&[]))?;
            if layer.is_drawing() {
                ctx.set_line_dash(&dash_array(&[4.0 / zoom, 4.0 / zoom]))?;
            }
            ctx.begin_path();
            ctx.move_to(tl.x, tl.y);
            ctx.line_to(tr.x, tr.y);
            ctx.line_to(br.x, br.y);
            ctx.line_to(bl.x, bl.y);
            ctx.close_path();
            ctx.stroke();
            if layer.locked || layer.is_drawing() {
                continue;
            }
            ctx.set_fill_style_str("#ffffff");
            for corner in [tl, tr, bl, br] {
                ctx.begin_path();
                ctx.arc(corner.x, corner.y, radius, 0.0, PI * 2.0)?;
                ctx.fill();
                ctx.stroke();
            }
        }
        ctx.restore();
        Ok(())
    }

    fn render_snap_guides(&self, ctx: &CanvasRenderingContext2d) {
        if self.snap_guides.is_empty() {
            return;
        }
        ctx.save();
        ctx.set_stroke_style_str(GUIDE_COLOR);
        ctx.set_line_width(1.0 / self.viewport.zoom);
        for guide in &self.snap_guides {
            ctx.begin_path();
            match guide.orientation {
                GuideOrientation::Vertical => {
                    ctx.move_to(guide.position, 0.0);
                    ctx.line_to(guide.position, self.artboard.height);
                }
                GuideOrientation::Horizontal => {
                    ctx.move_to(0.0, guide.position);
                    ctx.line_to(self.artboard.width, guide.position);
                }
            }
            ctx.stroke();
        }
        ctx.restore();
    }
}
