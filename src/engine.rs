use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;
use std::collections::HashMap;
use kurbo::{Point, Size, Vec2};
use crate::config::EditorConfig;
use crate::error::{Result, StudioError};
use crate::history::{default_clock, Clock, HistoryManager};
use crate::interaction::{InteractionState, SnapGuide};
use crate::io::{validate_upload, AssetStore, KeyValueStore, LocalStorageStore, Notifier, PersistedState, UploadFile};
use crate::objects::{Background, Layer, LayerId, LayerPatch, ShapeKind};
use crate::filters::FilterSettings;
use crate::selection::Selection;
use crate::store::LayerStore;
use crate::types::{Artboard, ArtboardPreset, BrushState, Severity, Tool};
use crate::viewport::Viewport;

#[wasm_bindgen]
pub struct StudioEngine {
    pub(crate) store: LayerStore,
    pub(crate) selection: Selection,
    pub(crate) viewport: Viewport,
    pub(crate) history: HistoryManager,
    pub(crate) interaction: InteractionState,
    pub(crate) snap_guides: Vec<SnapGuide>,
    pub(crate) tool: Tool,
    pub(crate) brush: BrushState,
    pub(crate) preset: ArtboardPreset,
    pub(crate) artboard: Artboard,
    pub(crate) config: EditorConfig,
    pub(crate) space_held: bool,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) kv: Option<Box<dyn KeyValueStore>>,
    pub(crate) save_due: Option<f64>,
    pub(crate) image_cache: HashMap<String, HtmlImageElement>,
}

#[wasm_bindgen]
impl StudioEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> StudioEngine {
        console_error_panic_hook::set_once();
        StudioEngine::with_clock(EditorConfig::default(), default_clock())
    }

    /// Construct from a partial JSON config. Unknown or malformed input
    /// falls back to the defaults.
    pub fn with_config(config_json: &str) -> StudioEngine {
        console_error_panic_hook::set_once();
        let config = EditorConfig::from_json(config_json).unwrap_or_else(|e| {
            log::warn!("invalid editor config, using defaults: {}", e);
            EditorConfig::default()
        });
        StudioEngine::with_clock(config, default_clock())
    }

    /// Attach `window.localStorage` and restore whatever it holds.
    pub fn use_local_storage(&mut self) {
        self.attach_storage(Box::new(LocalStorageStore));
    }

    /// Drive the history debounce and any pending save. Call once per
    /// animation frame. Returns whether a history snapshot was committed.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        let committed = self.history.tick(now, self.store.layers());
        let save_due = self.interaction.is_idle() && self.save_due.is_some_and(|due| now >= due);
        if committed || save_due {
            self.persist();
        }
        committed
    }

    pub fn undo(&mut self) -> bool {
        if self.history.flush(self.store.layers()) {
            self.persist();
        }
        let Some(layers) = self.history.undo().map(|l| l.to_vec()) else {
            return false;
        };
        self.restore(layers);
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.history.flush(self.store.layers()) {
            self.persist();
        }
        let Some(layers) = self.history.redo().map(|l| l.to_vec()) else {
            return false;
        };
        self.restore(layers);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn set_container_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.viewport.set_container(Point::new(x, y), Size::new(width, height));
    }

    pub fn set_artboard_size(&mut self, width: f64, height: f64) {
        self.set_preset(ArtboardPreset::custom(width, height));
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(&self.config);
        self.schedule_save();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out(&self.config);
        self.schedule_save();
    }

    pub fn fit_to_screen(&mut self) {
        self.viewport.fit_to_screen(&self.artboard, &self.config);
        self.schedule_save();
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset(&self.config);
        self.schedule_save();
    }

    pub fn get_zoom(&self) -> f64 {
        self.viewport.zoom
    }

    /// Remove every selected layer and clear the selection.
    pub fn delete_selection(&mut self) -> usize {
        let ids: Vec<LayerId> = self.selection.ids().to_vec();
        let removed = self.store.remove(&ids);
        self.selection.clear();
        if removed > 0 {
            self.mark_changed();
        }
        removed
    }

    /// Move the primary selection one step in paint order.
    pub fn move_primary(&mut self, up: bool) -> bool {
        let Some(id) = self.selection.primary() else { return false };
        match self.store.step(id, up) {
            Ok(true) => {
                self.mark_changed();
                true
            }
            _ => false,
        }
    }

    pub fn step_brush_size(&mut self, grow: bool) -> f64 {
        let step = if grow { self.config.brush_size_step } else { -self.config.brush_size_step };
        self.brush.size = self.config.clamp_brush_size(self.brush.size + step);
        self.schedule_save();
        self.brush.size
    }

    pub fn set_background_image(&mut self, url: &str) {
        self.store.modify_background(|bg| bg.image = Some(url.to_string()));
        self.schedule_save();
    }

    pub fn remove_background_image(&mut self) {
        self.store.modify_background(|bg| bg.image = None);
        self.schedule_save();
    }

    pub fn toggle_background_lock(&mut self) -> bool {
        self.store.modify_background(|bg| bg.locked = !bg.locked);
        self.schedule_save();
        self.store.background().locked
    }

    pub fn register_image(&mut self, src: &str, image: HtmlImageElement) {
        self.image_cache.insert(src.to_string(), image);
    }

    /// Call `callback(eventName)` after every store mutation.
    pub fn on_change(&mut self, callback: js_sys::Function) -> u32 {
        self.store.subscribe(move |event| {
            let name = match event {
                crate::store::StoreEvent::Added(_) => "added",
                crate::store::StoreEvent::Updated(_) => "updated",
                crate::store::StoreEvent::Removed(_) => "removed",
                crate::store::StoreEvent::Reordered { .. } => "reordered",
                crate::store::StoreEvent::Replaced => "replaced",
                crate::store::StoreEvent::BackgroundChanged => "background",
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(name)) {
                log::error!("change listener threw: {:?}", e);
            }
        })
    }

    pub fn off_change(&mut self, subscription: u32) -> bool {
        self.store.unsubscribe(subscription)
    }

    pub fn save(&mut self) {
        self.persist();
    }

    pub fn get_state(&self) -> std::result::Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.to_persisted()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn set_state(&mut self, state: JsValue) -> std::result::Result<(), JsValue> {
        let state: PersistedState = serde_wasm_bindgen::from_value(state).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.apply_state(state);
        Ok(())
    }

    pub fn get_layers_json(&self) -> String {
        serde_json::to_string(self.store.layers()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn get_background_json(&self) -> String {
        serde_json::to_string(self.store.background()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get_selected_ids(&self) -> String {
        serde_json::to_string(self.selection.ids()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn get_artboard(&self) -> String {
        serde_json::to_string(&self.preset).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get_brush(&self) -> String {
        serde_json::to_string(&self.brush).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get_tool(&self) -> String {
        serde_json::to_string(&self.tool).unwrap_or_else(|_| "\"select\"".to_string())
    }

    pub fn get_history(&self) -> String {
        serde_json::json!({
            "length": self.history.len(),
            "index": self.history.index(),
            "canUndo": self.history.can_undo(),
            "canRedo": self.history.can_redo(),
            "pending": self.history.is_pending(),
        })
        .to_string()
    }
}

impl Default for StudioEngine {
    fn default() -> Self {
        StudioEngine::with_clock(EditorConfig::default(), default_clock())
    }
}

impl StudioEngine {
    pub fn with_clock(config: EditorConfig, clock: Box<dyn Clock>) -> StudioEngine {
        let preset = ArtboardPreset::default();
        let mut viewport = Viewport::default();
        viewport.reset(&config);
        StudioEngine {
            store: LayerStore::new(),
            selection: Selection::default(),
            viewport,
            history: HistoryManager::new(Vec::new(), config.history_cap, config.history_debounce_ms),
            interaction: InteractionState::Idle,
            snap_guides: Vec::new(),
            tool: Tool::default(),
            brush: BrushState::default(),
            artboard: preset.artboard(),
            preset,
            config,
            space_held: false,
            clock,
            kv: None,
            save_due: None,
            image_cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    /// Store access for hosts that subscribe to change events.
    pub fn store_mut(&mut self) -> &mut LayerStore {
        &mut self.store
    }

    pub fn layers(&self) -> &[Layer] {
        self.store.layers()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.store.get(id)
    }

    pub fn background(&self) -> &Background {
        self.store.background()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn artboard(&self) -> &Artboard {
        &self.artboard
    }

    pub fn preset(&self) -> &ArtboardPreset {
        &self.preset
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.schedule_save();
    }

    pub fn brush(&self) -> &BrushState {
        &self.brush
    }

    pub fn set_brush(&mut self, brush: BrushState) {
        let size = self.config.clamp_brush_size(brush.size);
        self.brush = BrushState { size, opacity: brush.opacity.clamp(0.0, 1.0), blur: brush.blur.max(0.0), ..brush };
        self.schedule_save();
    }

    /// Switch the artboard. Degenerate sizes are raised to 1x1.
    pub fn set_preset(&mut self, mut preset: ArtboardPreset) {
        preset.width = preset.width.max(1.0);
        preset.height = preset.height.max(1.0);
        log::info!("artboard preset {} ({}x{})", preset.id, preset.width, preset.height);
        self.artboard = preset.artboard();
        self.preset = preset;
        self.schedule_save();
    }

    /// Record that the layer array changed. Outside a gesture this (re)arms
    /// the history debounce; during one it waits for pointer-up.
    pub(crate) fn mark_changed(&mut self) {
        if self.interaction.is_idle() {
            self.history.schedule(self.clock.now_ms());
            self.schedule_save();
        }
    }

    /// Arm a save for settings outside the layer array (background, brush,
    /// tool, view, preset). It fires on the first `tick` after the debounce.
    pub(crate) fn schedule_save(&mut self) {
        self.save_due = Some(self.clock.now_ms() + self.config.history_debounce_ms);
    }

    fn restore(&mut self, layers: Vec<Layer>) {
        self.store.replace_all(layers);
        self.selection.clear();
        self.persist();
    }

    pub fn select(&mut self, ids: &[LayerId]) {
        self.selection.set(ids, &self.store);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Append a layer on top, select it, and return its id.
    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = self.store.add(layer);
        self.selection.select_only(id);
        self.mark_changed();
        id
    }

    /// Add a default shape, centred on the artboard unless a position is given.
    pub fn add_shape(&mut self, kind: ShapeKind, at: Option<Point>) -> LayerId {
        let id = self.store.allocate_id();
        let at = at.unwrap_or_else(|| self.artboard.center());
        self.add_layer(Layer::shape(id, at, kind))
    }

    pub fn add_text(&mut self, text: &str, at: Option<Point>) -> LayerId {
        let id = self.store.allocate_id();
        let at = at.unwrap_or_else(|| self.artboard.center());
        self.add_layer(Layer::text(id, at, text))
    }

    /// Add an image that fits within half the artboard, keeping its ratio.
    pub fn add_image(&mut self, src: &str, natural_width: f64, natural_height: f64) -> LayerId {
        let max_w = self.artboard.width / 2.0;
        let max_h = self.artboard.height / 2.0;
        let fit = (max_w / natural_width.max(1.0)).min(max_h / natural_height.max(1.0)).min(1.0);
        let id = self.store.allocate_id();
        let center = self.artboard.center();
        self.add_layer(Layer::image(id, center, src, natural_width * fit, natural_height * fit))
    }

    pub fn update_layer(&mut self, id: LayerId, patch: &LayerPatch) -> Result<()> {
        self.store.update(id, patch)?;
        if patch.locked == Some(true) {
            self.selection.remove(id);
        }
        self.mark_changed();
        Ok(())
    }

    pub fn toggle_lock(&mut self, id: LayerId) -> Result<bool> {
        let locked = !self.store.get(id).ok_or(StudioError::LayerNotFound(id))?.locked;
        self.update_layer(id, &LayerPatch { locked: Some(locked), ..Default::default() })?;
        Ok(locked)
    }

    pub fn toggle_visibility(&mut self, id: LayerId) -> Result<bool> {
        let visible = !self.store.get(id).ok_or(StudioError::LayerNotFound(id))?.visible;
        self.update_layer(id, &LayerPatch { visible: Some(visible), ..Default::default() })?;
        Ok(visible)
    }

    pub fn delete_layers(&mut self, ids: &[LayerId]) -> usize {
        let removed = self.store.remove(ids);
        for id in ids {
            self.selection.remove(*id);
        }
        if removed > 0 {
            self.mark_changed();
        }
        removed
    }

    /// Duplicate every selected layer; the copies become the selection.
    pub fn duplicate_selection(&mut self) -> Result<Vec<LayerId>> {
        let mut copies = Vec::new();
        for id in self.selection.ids().to_vec() {
            copies.push(self.store.duplicate(id)?);
        }
        if !copies.is_empty() {
            self.selection.set(&copies, &self.store);
            self.mark_changed();
        }
        Ok(copies)
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.store.reorder(from, to)?;
        self.mark_changed();
        Ok(())
    }

    pub fn reorder_display(&mut self, from: usize, to: usize) -> Result<()> {
        self.store.reorder_display(from, to)?;
        self.mark_changed();
        Ok(())
    }

    pub fn bring_to_front(&mut self, id: LayerId) -> Result<()> {
        self.store.bring_to_front(id)?;
        self.mark_changed();
        Ok(())
    }

    pub fn send_to_back(&mut self, id: LayerId) -> Result<()> {
        self.store.send_to_back(id)?;
        self.mark_changed();
        Ok(())
    }

    pub fn set_layer_filters(&mut self, id: LayerId, filters: FilterSettings) -> Result<()> {
        self.update_layer(id, &LayerPatch { filters: Some(filters.clamped()), ..Default::default() })
    }

    pub fn set_background_filters(&mut self, filters: FilterSettings) {
        self.store.modify_background(|bg| bg.filters = filters.clamped());
        self.schedule_save();
    }

    pub fn set_background_transform(&mut self, offset: Vec2, scale: f64) {
        let scale = scale.max(self.config.min_layer_scale);
        self.store.modify_background(|bg| {
            bg.offset = offset;
            bg.scale = scale;
        });
        self.schedule_save();
    }

    /// Validate, upload, and only then use the returned URL as the
    /// background image.
    pub fn upload_background(&mut self, file: &UploadFile, assets: &mut dyn AssetStore, notifier: &mut dyn Notifier) -> Result<String> {
        if let Err(e) = validate_upload(file.bytes.len() as u64, &file.mime_type, &self.config) {
            log::warn!("rejected upload {}: {}", file.name, e);
            notifier.notify(&e.to_string(), Severity::Error);
            return Err(e);
        }
        let url = match assets.upload(&file.bytes, &file.name) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("upload of {} failed: {}", file.name, e);
                notifier.notify(&e.to_string(), Severity::Error);
                return Err(e);
            }
        };
        self.set_background_image(&url);
        self.persist();
        notifier.notify("Background uploaded", Severity::Success);
        Ok(url)
    }

    /// Attach a key-value store, restore its saved state, and persist to it
    /// after every history commit from now on.
    pub fn attach_storage(&mut self, kv: Box<dyn KeyValueStore>) {
        let state = PersistedState::load(kv.as_ref(), &self.config.storage_key);
        self.kv = Some(kv);
        self.apply_state(state);
    }

    /// Apply whichever fields are present. History restarts from the
    /// loaded layers.
    pub fn apply_state(&mut self, state: PersistedState) {
        if let Some(layers) = state.layers {
            log::info!("restoring {} layers", layers.len());
            self.store.replace_all(layers);
        }
        if let Some(background) = state.background {
            self.store.set_background(background);
        }
        if let Some(brush) = state.brush {
            self.set_brush(brush);
        }
        if let Some(tool) = state.active_tool {
            self.tool = tool;
        }
        if let Some(zoom) = state.zoom {
            self.viewport.set_zoom(zoom, &self.config);
        }
        if let Some(pan) = state.pan_offset {
            self.viewport.pan_offset = pan;
        }
        if let Some(preset) = state.active_preset {
            self.set_preset(preset);
        }
        self.selection.prune(&self.store);
        self.interaction = InteractionState::Idle;
        self.history.reset(self.store.layers().to_vec());
        self.save_due = None;
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            layers: Some(self.store.layers().to_vec()),
            background: Some(self.store.background().clone()),
            brush: Some(self.brush.clone()),
            active_tool: Some(self.tool),
            zoom: Some(self.viewport.zoom),
            pan_offset: Some(self.viewport.pan_offset),
            active_preset: Some(self.preset.clone()),
        }
    }

    pub(crate) fn persist(&mut self) {
        self.save_due = None;
        let state = self.to_persisted();
        let key = self.config.storage_key.clone();
        if let Some(kv) = self.kv.as_mut() {
            match state.save(kv.as_mut(), &key) {
                Ok(()) => log::debug!("saved editor state"),
                Err(e) => log::warn!("could not save editor state: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ManualClock;
    use crate::io::{AssetEntry, MemoryStore};

    fn engine() -> (StudioEngine, ManualClock) {
        let clock = ManualClock::default();
        (StudioEngine::with_clock(EditorConfig::default(), Box::new(clock.clone())), clock)
    }

    struct FakeAssets {
        fail: bool,
        uploads: usize,
    }

    impl AssetStore for FakeAssets {
        fn list(&self, _folder: &str) -> Result<Vec<AssetEntry>> {
            Ok(Vec::new())
        }

        fn upload(&mut self, _bytes: &[u8], name: &str) -> Result<String> {
            if self.fail {
                return Err(StudioError::AssetStore("offline".into()));
            }
            self.uploads += 1;
            Ok(format!("https://cdn.example/{}", name))
        }
    }

    #[derive(Default)]
    struct Notes(Vec<(String, Severity)>);

    impl Notifier for Notes {
        fn notify(&mut self, message: &str, severity: Severity) {
            self.0.push((message.to_string(), severity));
        }
    }

    fn png(size: usize) -> UploadFile {
        UploadFile { name: "bg.png".into(), mime_type: "image/png".into(), bytes: vec![0; size] }
    }

    #[test]
    fn new_engine_starts_at_default_zoom_with_one_history_entry() {
        let (engine, _) = engine();
        assert_eq!(engine.viewport().zoom, 0.5);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.artboard().width, 1080.0);
    }

    #[test]
    fn edits_commit_after_debounce() {
        let (mut engine, clock) = engine();
        engine.add_shape(ShapeKind::Rect, None);
        clock.advance(100.0);
        assert!(!engine.tick());
        clock.advance(60.0);
        assert!(engine.tick());
        assert_eq!(engine.history().len(), 2);
    }

    #[test]
    fn undo_flushes_pending_edit_first() {
        let (mut engine, _) = engine();
        engine.add_shape(ShapeKind::Rect, None);
        assert!(engine.undo());
        assert!(engine.layers().is_empty());
        assert!(engine.redo());
        assert_eq!(engine.layers().len(), 1);
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn locking_drops_layer_from_selection() {
        let (mut engine, _) = engine();
        let id = engine.add_shape(ShapeKind::Circle, None);
        assert!(engine.toggle_lock(id).unwrap());
        assert!(!engine.selection().contains(id));
        assert!(matches!(engine.toggle_lock(99), Err(StudioError::LayerNotFound(99))));
    }

    #[test]
    fn duplicate_selects_copies() {
        let (mut engine, _) = engine();
        let id = engine.add_shape(ShapeKind::Rect, Some(Point::new(10.0, 10.0)));
        let copies = engine.duplicate_selection().unwrap();
        assert_eq!(copies.len(), 1);
        assert_eq!(engine.selection().ids(), copies.as_slice());
        let copy = engine.layer(copies[0]).unwrap();
        assert_ne!(copy.id, id);
        assert_eq!((copy.x, copy.y), (30.0, 30.0));
    }

    #[test]
    fn add_image_fits_half_the_artboard() {
        let (mut engine, _) = engine();
        let id = engine.add_image("https://cdn/a.png", 2160.0, 1080.0);
        let layer = engine.layer(id).unwrap();
        assert_eq!(layer.width(), Some(540.0));
        assert!(layer.aspect_locked);
    }

    #[test]
    fn rejected_upload_leaves_background_alone() {
        let (mut engine, _) = engine();
        let mut assets = FakeAssets { fail: false, uploads: 0 };
        let mut notes = Notes::default();
        let big = png(11 * 1024 * 1024);
        assert!(matches!(engine.upload_background(&big, &mut assets, &mut notes), Err(StudioError::FileTooLarge { .. })));
        assert_eq!(assets.uploads, 0);
        assert!(engine.background().image.is_none());
        assert_eq!(notes.0[0].1, Severity::Error);
    }

    #[test]
    fn failed_store_upload_notifies() {
        let (mut engine, _) = engine();
        let mut assets = FakeAssets { fail: true, uploads: 0 };
        let mut notes = Notes::default();
        assert!(engine.upload_background(&png(10), &mut assets, &mut notes).is_err());
        assert!(engine.background().image.is_none());
        assert_eq!(notes.0.len(), 1);
    }

    #[test]
    fn successful_upload_sets_returned_url() {
        let (mut engine, _) = engine();
        let mut assets = FakeAssets { fail: false, uploads: 0 };
        let mut notes = Notes::default();
        let url = engine.upload_background(&png(10), &mut assets, &mut notes).unwrap();
        assert_eq!(engine.background().image.as_deref(), Some(url.as_str()));
        assert_eq!(notes.0.last().map(|n| n.1), Some(Severity::Success));
    }

    #[test]
    fn commits_are_persisted_to_attached_store() {
        let (mut engine, clock) = engine();
        engine.attach_storage(Box::new(MemoryStore::default()));
        engine.add_shape(ShapeKind::Triangle, None);
        clock.advance(200.0);
        assert!(engine.tick());
        let saved = engine.kv.as_ref().and_then(|kv| kv.get("studio-editor-state")).unwrap();
        let state = PersistedState::parse(&saved);
        assert_eq!(state.layers.map(|l| l.len()), Some(1));
    }

    #[test]
    fn brush_settings_are_clamped() {
        let (mut engine, _) = engine();
        engine.set_brush(BrushState { size: 500.0, opacity: 2.0, ..BrushState::default() });
        assert_eq!(engine.brush().size, 100.0);
        assert_eq!(engine.brush().opacity, 1.0);
    }

    #[test]
    fn settings_changes_are_saved_after_debounce() {
        let (mut engine, clock) = engine();
        engine.attach_storage(Box::new(MemoryStore::default()));
        let saved = |engine: &StudioEngine| {
            engine.kv.as_ref().and_then(|kv| kv.get("studio-editor-state")).map(|raw| PersistedState::parse(&raw))
        };
        engine.set_tool(Tool::Brush);
        engine.zoom_in();
        engine.toggle_background_lock();
        clock.advance(100.0);
        assert!(!engine.tick());
        assert!(saved(&engine).is_none());

        clock.advance(100.0);
        assert!(!engine.tick());
        let state = saved(&engine).unwrap();
        assert_eq!(state.active_tool, Some(Tool::Brush));
        assert_eq!(state.zoom, Some(engine.viewport().zoom));
        assert_eq!(state.background.map(|bg| bg.locked), Some(true));
    }

    #[test]
    fn loaded_preset_is_never_degenerate() {
        let (mut engine, _) = engine();
        let preset = ArtboardPreset {
            id: "broken".into(),
            label: "Broken".into(),
            width: 0.0,
            height: -20.0,
            platform: "custom".into(),
        };
        engine.apply_state(PersistedState { active_preset: Some(preset), ..PersistedState::default() });
        assert_eq!(engine.artboard().width, 1.0);
        assert_eq!(engine.artboard().height, 1.0);
        assert_eq!(engine.preset().id, "broken");
    }
}
