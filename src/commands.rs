use wasm_bindgen::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use kurbo::{Point, Vec2};
use crate::brush::VectorMask;
use crate::engine::StudioEngine;
use crate::error::{Result, StudioError};
use crate::filters::{FilterSettings, FILTER_PRESETS};
use crate::objects::{LayerId, LayerPatch, ShapeKind};
use crate::types::{ArtboardPreset, BrushState, Tool};

fn param_id(params: &Value) -> Result<LayerId> {
    params["id"]
        .as_u64()
        .map(|v| v as LayerId)
        .ok_or_else(|| StudioError::InvalidCommand("missing id".to_string()))
}

/// `ids` array, or a single `id`, or the current selection.
fn param_ids(engine: &StudioEngine, params: &Value) -> Vec<LayerId> {
    if let Some(ids) = params["ids"].as_array() {
        ids.iter().filter_map(|v| v.as_u64().map(|id| id as LayerId)).collect()
    } else if let Some(id) = params["id"].as_u64() {
        vec![id as LayerId]
    } else {
        engine.selection.ids().to_vec()
    }
}

fn param_index(params: &Value, key: &str) -> Result<usize> {
    params[key]
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| StudioError::InvalidCommand(format!("missing {}", key)))
}

fn param_point(params: &Value) -> Option<Point> {
    Some(Point::new(params["x"].as_f64()?, params["y"].as_f64()?))
}

fn parse<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T> {
    Ok(serde_json::from_value(value.clone())?)
}

#[wasm_bindgen]
impl StudioEngine {
    /// JSON command entry point for property panels and toolbars.
    ///
    /// Input: `{"action": "...", "params": {...}}`. Output is always a JSON
    /// object, either `{"success": true, ...}` or `{"error": "..."}`.
    pub fn execute_command(&mut self, cmd_json: &str) -> String {
        #[derive(Deserialize)]
        struct Command {
            action: String,
            #[serde(default)]
            params: Value,
        }

        let cmd: Command = match serde_json::from_str(cmd_json) {
            Ok(c) => c,
            Err(e) => return StudioError::from(e).to_json(),
        };

        match self.run_command(&cmd.action, &cmd.params) {
            Ok(Value::Object(mut body)) => {
                body.insert("success".to_string(), Value::Bool(true));
                Value::Object(body).to_string()
            }
            Ok(other) => json!({ "success": true, "result": other }).to_string(),
            Err(e) => {
                log::warn!("command {} failed: {}", cmd.action, e);
                e.to_json()
            }
        }
    }
}

impl StudioEngine {
    fn run_command(&mut self, action: &str, params: &Value) -> Result<Value> {
        match action {
            "add_shape" => {
                let kind: ShapeKind = parse(&params["shape"])?;
                let id = self.add_shape(kind, param_point(params));
                Ok(json!({ "id": id }))
            }
            "add_text" => {
                let text = params["text"].as_str().unwrap_or("Your Text");
                let id = self.add_text(text, param_point(params));
                Ok(json!({ "id": id }))
            }
            "add_image" => {
                let src = params["src"]
                    .as_str()
                    .ok_or_else(|| StudioError::InvalidCommand("missing src".to_string()))?;
                let width = params["width"].as_f64().unwrap_or(400.0);
                let height = params["height"].as_f64().unwrap_or(400.0);
                let id = self.add_image(src, width, height);
                Ok(json!({ "id": id }))
            }
            "update" => {
                let patch: LayerPatch = parse(params)?;
                let ids = param_ids(self, params);
                if ids.is_empty() {
                    return Err(StudioError::InvalidCommand("no layers to update".to_string()));
                }
                for id in ids {
                    self.update_layer(id, &patch)?;
                }
                Ok(json!({}))
            }
            "delete" => {
                let ids = param_ids(self, params);
                let removed = self.delete_layers(&ids);
                Ok(json!({ "removed": removed }))
            }
            "duplicate" => {
                if let Some(id) = params["id"].as_u64() {
                    self.select(&[id as LayerId]);
                }
                let ids = self.duplicate_selection()?;
                Ok(json!({ "ids": ids }))
            }
            "toggle_lock" => {
                let locked = self.toggle_lock(param_id(params)?)?;
                Ok(json!({ "locked": locked }))
            }
            "toggle_visibility" => {
                let visible = self.toggle_visibility(param_id(params)?)?;
                Ok(json!({ "visible": visible }))
            }
            "reorder" => {
                let from = param_index(params, "from")?;
                let to = param_index(params, "to")?;
                if params["display"].as_bool().unwrap_or(false) {
                    self.reorder_display(from, to)?;
                } else {
                    self.reorder(from, to)?;
                }
                Ok(json!({}))
            }
            "bring_to_front" => {
                self.bring_to_front(param_id(params)?)?;
                Ok(json!({}))
            }
            "send_to_back" => {
                self.send_to_back(param_id(params)?)?;
                Ok(json!({}))
            }
            "select" => {
                let ids: Vec<LayerId> = params["ids"]
                    .as_array()
                    .map(|a| a.iter().filter_map(|v| v.as_u64().map(|id| id as LayerId)).collect())
                    .unwrap_or_default();
                self.select(&ids);
                Ok(json!({ "ids": self.selection.ids() }))
            }
            "set_tool" => {
                let name = params["tool"].as_str().unwrap_or_default();
                let tool = Tool::parse(name).ok_or_else(|| StudioError::InvalidCommand(format!("unknown tool {}", name)))?;
                self.set_tool(tool);
                Ok(json!({}))
            }
            "set_brush" => {
                let mut merged = serde_json::to_value(&self.brush)?;
                if let (Value::Object(base), Value::Object(changes)) = (&mut merged, params) {
                    for (k, v) in changes {
                        base.insert(k.clone(), v.clone());
                    }
                }
                let brush: BrushState = parse(&merged)?;
                self.set_brush(brush);
                Ok(serde_json::to_value(&self.brush)?)
            }
            "set_preset" => {
                let preset = match params["id"].as_str() {
                    Some("custom") | None => ArtboardPreset::custom(
                        params["width"].as_f64().unwrap_or(self.artboard.width),
                        params["height"].as_f64().unwrap_or(self.artboard.height),
                    ),
                    Some(id) => ArtboardPreset::find(id)
                        .ok_or_else(|| StudioError::InvalidCommand(format!("unknown preset {}", id)))?,
                };
                self.set_preset(preset);
                Ok(serde_json::to_value(&self.preset)?)
            }
            "set_layer_filters" => {
                let filters: FilterSettings = parse(&params["filters"])?;
                self.set_layer_filters(param_id(params)?, filters)?;
                Ok(json!({}))
            }
            "set_background_image" => {
                match params["src"].as_str() {
                    Some(src) => self.set_background_image(src),
                    None => self.remove_background_image(),
                }
                Ok(json!({}))
            }
            "set_background_filters" => {
                let filters: FilterSettings = parse(&params["filters"])?;
                self.set_background_filters(filters);
                Ok(json!({}))
            }
            "set_background_transform" => {
                let background = self.store.background();
                let offset = Vec2::new(
                    params["x"].as_f64().unwrap_or(background.offset.x),
                    params["y"].as_f64().unwrap_or(background.offset.y),
                );
                let scale = params["scale"].as_f64().unwrap_or(background.scale);
                self.set_background_transform(offset, scale);
                Ok(json!({}))
            }
            "toggle_background_lock" => Ok(json!({ "locked": self.toggle_background_lock() })),
            "zoom_in" => {
                self.zoom_in();
                Ok(json!({ "zoom": self.viewport.zoom }))
            }
            "zoom_out" => {
                self.zoom_out();
                Ok(json!({ "zoom": self.viewport.zoom }))
            }
            "fit_to_screen" => {
                self.fit_to_screen();
                Ok(json!({ "zoom": self.viewport.zoom }))
            }
            "reset_view" => {
                self.reset_view();
                Ok(json!({ "zoom": self.viewport.zoom }))
            }
            "undo" => Ok(json!({ "changed": self.undo() })),
            "redo" => Ok(json!({ "changed": self.redo() })),
            "get_presets" => Ok(serde_json::to_value(ArtboardPreset::catalogue())?),
            "get_filter_presets" => {
                let presets: Vec<Value> = FILTER_PRESETS
                    .iter()
                    .map(|p| json!({ "id": p.id, "label": p.label }))
                    .collect();
                Ok(Value::Array(presets))
            }
            "get_mask_svg" => {
                let id = param_id(params)?;
                let layer = self.store.get(id).ok_or(StudioError::LayerNotFound(id))?;
                let svg = VectorMask::for_layer(layer, &self.artboard).map(|m| m.to_svg(&format!("mask-{}", id)));
                Ok(json!({ "svg": svg }))
            }
            other => Err(StudioError::InvalidCommand(format!("unknown action {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::history::ManualClock;

    fn engine() -> StudioEngine {
        StudioEngine::with_clock(EditorConfig::default(), Box::new(ManualClock::default()))
    }

    fn run(engine: &mut StudioEngine, cmd: Value) -> Value {
        serde_json::from_str(&engine.execute_command(&cmd.to_string())).unwrap()
    }

    #[test]
    fn malformed_json_is_an_error_body() {
        let mut engine = engine();
        let out: Value = serde_json::from_str(&engine.execute_command("{not json")).unwrap();
        assert!(out["error"].is_string());
    }

    #[test]
    fn unknown_action_is_reported() {
        let mut engine = engine();
        let out = run(&mut engine, json!({ "action": "explode" }));
        assert_eq!(out["error"], "Invalid command: unknown action explode");
    }

    #[test]
    fn add_then_update_shape() {
        let mut engine = engine();
        let out = run(&mut engine, json!({ "action": "add_shape", "params": { "shape": "polygon", "x": 10, "y": 20 } }));
        assert_eq!(out["success"], true);
        let id = out["id"].as_u64().unwrap() as LayerId;
        let out = run(&mut engine, json!({ "action": "update", "params": { "id": id, "fillColor": "#ff0000", "sides": 2 } }));
        assert_eq!(out["success"], true);
        let shape = engine.layer(id).unwrap().shape_data().unwrap();
        assert_eq!(shape.fill_color, "#ff0000");
        assert_eq!(shape.sides, Some(3));
    }

    #[test]
    fn update_missing_layer_fails() {
        let mut engine = engine();
        let out = run(&mut engine, json!({ "action": "update", "params": { "id": 77, "x": 1 } }));
        assert_eq!(out["error"], "Layer not found: 77");
    }

    #[test]
    fn set_brush_merges_partial_settings() {
        let mut engine = engine();
        let out = run(&mut engine, json!({ "action": "set_brush", "params": { "color": "#00ff00" } }));
        assert_eq!(out["color"], "#00ff00");
        assert_eq!(engine.brush().size, 10.0);
    }

    #[test]
    fn presets_resize_artboard() {
        let mut engine = engine();
        run(&mut engine, json!({ "action": "set_preset", "params": { "id": "youtube-thumbnail" } }));
        assert_eq!(engine.artboard().width, 1280.0);
        run(&mut engine, json!({ "action": "set_preset", "params": { "id": "custom", "width": 640, "height": 480 } }));
        assert_eq!(engine.artboard().height, 480.0);
        let out = run(&mut engine, json!({ "action": "set_preset", "params": { "id": "nope" } }));
        assert!(out["error"].is_string());
    }

    #[test]
    fn display_reorder_through_command() {
        let mut engine = engine();
        let a = engine.add_shape(ShapeKind::Rect, None);
        let b = engine.add_shape(ShapeKind::Rect, None);
        run(&mut engine, json!({ "action": "reorder", "params": { "from": 0, "to": 1, "display": true } }));
        let order: Vec<LayerId> = engine.layers().iter().map(|l| l.id).collect();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn filter_preset_catalogue_is_listed() {
        let mut engine = engine();
        let out = run(&mut engine, json!({ "action": "get_filter_presets" }));
        assert_eq!(out["result"].as_array().map(|a| a.len()), Some(FILTER_PRESETS.len()));
    }
}
