use std::cell::RefCell;
use std::rc::Rc;
use kurbo::{Point, Vec2};
use studio::filters::{compose_filter, FilterSettings};
use studio::history::ManualClock;
use studio::interaction::PointerInput;
use studio::io::{KeyValueStore, MemoryStore, PersistedState};
use studio::objects::{Background, Layer, LayerId, LayerKind, LayerPatch, ShapeKind};
use studio::types::{Modifiers, Tool};
use studio::{EditorConfig, StudioEngine};

const EPS: f64 = 1e-6;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

fn engine() -> (StudioEngine, ManualClock) {
    let clock = ManualClock::default();
    let engine = StudioEngine::with_clock(EditorConfig::default(), Box::new(clock.clone()));
    (engine, clock)
}

fn screen(engine: &StudioEngine, x: f64, y: f64) -> Point {
    engine.viewport().to_screen(Point::new(x, y), engine.artboard())
}

fn settle(engine: &mut StudioEngine, clock: &ManualClock) {
    clock.advance(200.0);
    engine.tick();
}

fn ids(engine: &StudioEngine) -> Vec<LayerId> {
    engine.layers().iter().map(|l| l.id).collect()
}

#[test]
fn shift_click_two_rects_and_drag_at_half_zoom() {
    let (mut engine, _) = engine();
    engine.viewport_mut().zoom = 0.5;
    let a = engine.add_shape(ShapeKind::Rect, Some(Point::new(100.0, 100.0)));
    let b = engine.add_shape(ShapeKind::Rect, Some(Point::new(300.0, 100.0)));
    engine.clear_selection();

    for (x, y) in [(100.0, 100.0), (300.0, 100.0)] {
        let p = screen(&engine, x, y);
        engine.pointer_down(&PointerInput::at(p.x, p.y).with_modifiers(Modifiers::SHIFT));
        engine.pointer_up(&PointerInput::at(p.x, p.y));
    }
    assert_eq!(engine.selection().ids(), &[a, b]);

    let start = screen(&engine, 100.0, 100.0);
    engine.pointer_down(&PointerInput::at(start.x, start.y));
    engine.pointer_move(&PointerInput::at(start.x + 40.0, start.y + 10.0));
    engine.pointer_move(&PointerInput::at(start.x + 100.0, start.y + 50.0));
    engine.pointer_up(&PointerInput::at(start.x + 100.0, start.y + 50.0));

    let pa = engine.layer(a).unwrap().position();
    let pb = engine.layer(b).unwrap().position();
    assert!(approx(pa.x, 300.0) && approx(pa.y, 200.0));
    assert!(approx(pb.x, 500.0) && approx(pb.y, 200.0));
    assert_eq!(engine.selection().len(), 2);
}

#[test]
fn press_without_move_on_multi_selection_selects_one() {
    let (mut engine, _) = engine();
    let a = engine.add_shape(ShapeKind::Rect, Some(Point::new(100.0, 100.0)));
    let b = engine.add_shape(ShapeKind::Rect, Some(Point::new(300.0, 100.0)));
    engine.select(&[a, b]);
    let p = screen(&engine, 300.0, 100.0);
    engine.pointer_down(&PointerInput::at(p.x, p.y));
    engine.pointer_up(&PointerInput::at(p.x, p.y));
    assert_eq!(engine.selection().ids(), &[b]);
}

#[test]
fn grayscale_at_half_intensity() {
    let (mut engine, _) = engine();
    let id = engine.add_image("https://cdn.example/cat.png", 400.0, 300.0);
    let filters = FilterSettings { preset: "grayscale".into(), intensity: 50.0, ..FilterSettings::default() };
    engine.set_layer_filters(id, filters).unwrap();
    match &engine.layer(id).unwrap().kind {
        LayerKind::Image(image) => assert!(compose_filter(&image.filters).contains("grayscale(0.5)")),
        _ => panic!("Expected image layer"),
    }
}

#[test]
fn rapid_brush_points_commit_one_snapshot() {
    let (mut engine, clock) = engine();
    engine.set_tool(Tool::Brush);
    let before = engine.history().len();

    let p = screen(&engine, 200.0, 200.0);
    engine.pointer_down(&PointerInput::at(p.x, p.y));
    for i in 1..=6 {
        clock.advance(20.0);
        engine.pointer_move(&PointerInput::at(p.x + i as f64 * 3.0, p.y));
        engine.tick();
    }
    engine.pointer_up(&PointerInput::at(p.x + 18.0, p.y));
    assert!(!engine.tick());
    clock.advance(149.0);
    assert!(!engine.tick());
    clock.advance(1.0);
    assert!(engine.tick());
    clock.advance(1000.0);
    assert!(!engine.tick());

    assert_eq!(engine.history().len(), before + 1);
    match &engine.layers()[0].kind {
        LayerKind::Drawing(d) => assert_eq!(d.strokes[0].points.len(), 7),
        _ => panic!("Expected drawing layer"),
    }
}

#[test]
fn blob_without_background_keeps_default_background() {
    let layer = Layer::shape(7, Point::new(40.0, 40.0), ShapeKind::Circle);
    let blob = serde_json::json!({
        "layers": [layer],
        "brush": { "color": "#123456", "size": 24, "opacity": 0.5, "blur": 2 },
        "activeTool": "eraser",
        "zoom": 1.25,
        "panOffset": { "x": 15, "y": -5 },
        "activePreset": { "id": "x-post", "label": "X Post", "width": 1600, "height": 900, "platform": "x" }
    });
    let mut kv = MemoryStore::default();
    kv.set("studio-editor-state", &blob.to_string());

    let (mut engine, _) = engine();
    engine.attach_storage(Box::new(kv));

    assert_eq!(engine.background(), &Background::default());
    assert_eq!(ids(&engine), vec![7]);
    assert_eq!(engine.brush().color, "#123456");
    assert_eq!(engine.tool(), Tool::Eraser);
    assert!(approx(engine.viewport().zoom, 1.25));
    assert_eq!(engine.viewport().pan_offset, Vec2::new(15.0, -5.0));
    assert_eq!(engine.artboard().width, 1600.0);
    assert_eq!(engine.history().len(), 1);
    assert!(!engine.can_undo());
}

#[test]
fn unparsable_blob_starts_from_defaults() {
    let mut kv = MemoryStore::default();
    kv.set("studio-editor-state", "{\"layers\": [oops");
    let (mut engine, _) = engine();
    engine.attach_storage(Box::new(kv));
    assert!(engine.layers().is_empty());
    assert_eq!(engine.tool(), Tool::Select);
    assert!(approx(engine.viewport().zoom, 0.5));
}

#[test]
fn undo_redo_walk_n_edits() {
    let (mut engine, clock) = engine();
    let id = engine.add_shape(ShapeKind::Rect, Some(Point::new(0.0, 0.0)));
    settle(&mut engine, &clock);
    for n in 1..=4 {
        engine.update_layer(id, &LayerPatch { x: Some(n as f64 * 10.0), ..Default::default() }).unwrap();
        settle(&mut engine, &clock);
    }
    assert!(engine.undo());
    assert_eq!(engine.layer(id).unwrap().x, 30.0);
    assert!(engine.selection().is_empty());
    assert!(engine.redo());
    assert_eq!(engine.layer(id).unwrap().x, 40.0);
    assert!(!engine.redo());
    assert_eq!(engine.layer(id).unwrap().x, 40.0);

    while engine.undo() {}
    assert!(engine.layers().is_empty());
    assert!(!engine.undo());
}

#[test]
fn history_stays_within_cap() {
    let (mut engine, clock) = engine();
    let id = engine.add_shape(ShapeKind::Rect, None);
    for n in 0..80 {
        engine.update_layer(id, &LayerPatch { rotation: Some(n as f64), ..Default::default() }).unwrap();
        settle(&mut engine, &clock);
        assert!(engine.history().len() <= 50);
    }
    assert_eq!(engine.history().len(), 50);
}

#[test]
fn burst_of_edits_commits_once() {
    let (mut engine, clock) = engine();
    let id = engine.add_shape(ShapeKind::Rect, None);
    for n in 0..10 {
        clock.advance(50.0);
        engine.update_layer(id, &LayerPatch { x: Some(n as f64), ..Default::default() }).unwrap();
        engine.tick();
    }
    settle(&mut engine, &clock);
    assert_eq!(engine.history().len(), 2);
}

#[test]
fn deleting_k_selected_layers() {
    let (mut engine, _) = engine();
    let created: Vec<LayerId> = (0..5).map(|i| engine.add_shape(ShapeKind::Rect, Some(Point::new(i as f64 * 50.0, 0.0)))).collect();
    engine.select(&[created[0], created[2], created[4]]);
    assert_eq!(engine.delete_selection(), 3);
    assert_eq!(ids(&engine), vec![created[1], created[3]]);
    assert!(engine.selection().is_empty());
}

#[test]
fn reorder_keeps_others_in_order() {
    let (mut engine, _) = engine();
    let created: Vec<LayerId> = (0..5).map(|_| engine.add_shape(ShapeKind::Circle, None)).collect();
    engine.reorder(1, 4).unwrap();
    assert_eq!(ids(&engine), vec![created[0], created[2], created[3], created[4], created[1]]);
    assert!(engine.reorder(0, 9).is_err());
}

#[test]
fn aspect_locked_image_keeps_ratio() {
    let (mut engine, _) = engine();
    let id = engine.add_image("https://cdn.example/wide.png", 300.0, 200.0);
    let (w0, h0) = engine.layer(id).unwrap().size();
    engine.update_layer(id, &LayerPatch { width: Some(90.0), ..Default::default() }).unwrap();
    let (w, h) = engine.layer(id).unwrap().size();
    assert!(approx(w, 90.0));
    assert!(approx(h, 90.0 * h0 / w0));
}

#[test]
fn locked_layers_ignore_drag_and_clicks_fall_through() {
    let (mut engine, _) = engine();
    let below = engine.add_shape(ShapeKind::Rect, Some(Point::new(500.0, 500.0)));
    let above = engine.add_shape(ShapeKind::Rect, Some(Point::new(500.0, 500.0)));
    engine.toggle_lock(above).unwrap();
    let p = screen(&engine, 500.0, 500.0);
    engine.pointer_down(&PointerInput::at(p.x, p.y));
    engine.pointer_move(&PointerInput::at(p.x + 20.0, p.y));
    engine.pointer_up(&PointerInput::at(p.x + 20.0, p.y));
    assert_eq!(engine.layer(above).unwrap().x, 500.0);
    assert_eq!(engine.selection().ids(), &[below]);
    assert!(engine.layer(below).unwrap().x > 500.0);
}

#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<MemoryStore>>);

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &str) {
        self.0.borrow_mut().set(key, value);
    }
}

#[test]
fn state_is_saved_after_commit() {
    let (mut engine, clock) = engine();
    let kv = SharedStore::default();
    engine.attach_storage(Box::new(kv.clone()));
    assert!(kv.get("studio-editor-state").is_none());

    engine.add_text("Hello", None);
    clock.advance(100.0);
    engine.tick();
    assert!(kv.get("studio-editor-state").is_none());

    settle(&mut engine, &clock);
    let saved = PersistedState::parse(&kv.get("studio-editor-state").unwrap());
    assert_eq!(saved.layers.map(|l| l.len()), Some(1));
    assert_eq!(saved.active_tool, Some(Tool::Select));
}

#[test]
fn background_drag_is_saved() {
    let (mut engine, clock) = engine();
    let kv = SharedStore::default();
    engine.attach_storage(Box::new(kv.clone()));
    engine.set_background_image("https://cdn.example/bg.png");
    settle(&mut engine, &clock);

    engine.viewport_mut().zoom = 0.5;
    let p = screen(&engine, 500.0, 500.0);
    engine.pointer_down(&PointerInput::at(p.x, p.y));
    engine.pointer_move(&PointerInput::at(p.x + 50.0, p.y));
    engine.pointer_up(&PointerInput::at(p.x + 50.0, p.y));
    assert_eq!(engine.background().offset, Vec2::new(100.0, 0.0));

    clock.advance(1000.0);
    assert!(!engine.tick());
    let saved = PersistedState::parse(&kv.get("studio-editor-state").unwrap());
    assert_eq!(saved.background.map(|bg| bg.offset), Some(Vec2::new(100.0, 0.0)));
    assert_eq!(saved.zoom, Some(0.5));
}
