use serde::Deserialize;

/// Tunable constants for the editor. Every field has a default, so a host
/// may pass a partial JSON object.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub history_cap: usize,
    pub history_debounce_ms: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub default_zoom: f64,
    pub fit_margin: f64,
    pub min_layer_scale: f64,
    pub resize_sensitivity: f64,
    pub brush_size_step: f64,
    pub min_brush_size: f64,
    pub max_brush_size: f64,
    /// Resize handle radius in screen pixels.
    pub handle_radius: f64,
    /// Snap-guide distance in canvas units.
    pub snap_threshold: f64,
    pub max_upload_bytes: u64,
    pub allowed_mime_types: Vec<String>,
    pub canvas_background: String,
    pub storage_key: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            history_cap: 50,
            history_debounce_ms: 150.0,
            min_zoom: 0.1,
            max_zoom: 2.0,
            zoom_step: 0.1,
            default_zoom: 0.5,
            fit_margin: 0.9,
            min_layer_scale: 0.1,
            resize_sensitivity: 0.005,
            brush_size_step: 2.0,
            min_brush_size: 1.0,
            max_brush_size: 100.0,
            handle_radius: 8.0,
            snap_threshold: 6.0,
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_mime_types: ["image/png", "image/jpeg", "image/gif", "image/webp", "image/svg+xml"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            canvas_background: "#ffffff".to_string(),
            storage_key: "studio-editor-state".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn clamp_brush_size(&self, size: f64) -> f64 {
        size.clamp(self.min_brush_size, self.max_brush_size)
    }
}
