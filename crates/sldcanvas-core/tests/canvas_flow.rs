//! Host control flow: input moves the viewport, queries go through it, and
//! layer state filters the results.

use kurbo::{Point, Rect, Vec2};
use sldcanvas_core::{
    Canvas, CanvasSnapshot, DrawableObject, EngineConfig, LayerOptions, Modifiers, MouseButton,
    PointerEvent, TouchEvent, TouchPoint, Transform, WheelEvent,
};
use std::time::Duration;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn diagram() -> (Canvas, Vec<sldcanvas_core::ObjectId>) {
    let mut canvas = Canvas::new();
    canvas
        .gesture_mut()
        .set_container(Rect::new(0.0, 0.0, 1000.0, 800.0));

    let transformer = DrawableObject::circle(Point::new(200.0, 100.0), 30.0).with_z_index(2);
    let panel = DrawableObject::rectangle(Point::new(150.0, 300.0), 100.0, 200.0).with_z_index(1);
    let feeder = DrawableObject::path(vec![Point::new(200.0, 130.0), Point::new(200.0, 300.0)]);
    let label = DrawableObject::rectangle(Point::new(260.0, 90.0), 80.0, 20.0);
    let ids = vec![transformer.id, panel.id, feeder.id, label.id];

    assert_eq!(canvas.add_objects([transformer, panel], None), 2);
    assert!(canvas.add_object(feeder, Some("connections")));
    assert!(canvas.add_object(label, Some("labels")));
    (canvas, ids)
}

#[test]
fn test_wheel_zoom_then_hit_test_through_transform() {
    let (mut canvas, ids) = diagram();
    let cursor = Point::new(200.0, 100.0);
    canvas.gesture_mut().handle_wheel(WheelEvent {
        position: cursor,
        delta: Vec2::new(0.0, -300.0),
        modifiers: Modifiers {
            ctrl: true,
            ..Modifiers::default()
        },
        time: ms(0),
    });
    assert!(canvas.gesture().transform().zoom > 1.0);

    // The transformer centre stays under the cursor.
    let hits = canvas.objects_at(cursor);
    assert_eq!(hits[0].object.id, ids[0]);
    assert!(hits[0].distance.abs() < 1e-9);
}

#[test]
fn test_pan_drag_and_marquee() {
    let (mut canvas, ids) = diagram();
    let gesture = canvas.gesture_mut();
    gesture.handle_pointer(PointerEvent::Down {
        position: Point::new(500.0, 500.0),
        button: MouseButton::Middle,
        time: ms(0),
    });
    gesture.handle_pointer(PointerEvent::Move {
        position: Point::new(600.0, 550.0),
        time: ms(500),
    });
    gesture.handle_pointer(PointerEvent::Up {
        position: Point::new(600.0, 550.0),
        button: MouseButton::Middle,
        time: ms(1000),
    });
    assert_eq!(canvas.gesture().transform(), Transform::new(100.0, 50.0, 1.0));
    // Held still for half a second before release: no fling.
    assert!(!canvas.gesture().has_inertia());

    // Logical (140, 60)..(360, 160) on screen.
    let selected = canvas.marquee_select(Rect::new(240.0, 110.0, 460.0, 210.0), false);
    assert_eq!(selected.len(), 3);
    assert_eq!(selected[0], ids[0]);
    assert!(selected.contains(&ids[2]) && selected.contains(&ids[3]));
    assert!(!canvas.is_selected(ids[1]));
}

#[test]
fn test_hidden_and_locked_layers_filter_results() {
    let (mut canvas, ids) = diagram();
    let on_feeder = Point::new(203.0, 200.0);
    assert_eq!(canvas.objects_at(on_feeder)[0].object.id, ids[2]);

    canvas.set_layer_locked("connections", true);
    assert!(canvas.objects_at(on_feeder).is_empty());
    assert!(canvas.visible_objects_in_view().contains(&ids[2]));

    canvas.set_layer_visibility("connections", false);
    assert!(!canvas.visible_objects_in_view().contains(&ids[2]));
}

#[test]
fn test_custom_layer_deletion_falls_back() {
    let (mut canvas, _) = diagram();
    canvas
        .create_layer("protection", "Protection", LayerOptions::default())
        .unwrap();
    let relay = DrawableObject::rectangle(Point::new(500.0, 500.0), 20.0, 20.0);
    let fuse = DrawableObject::rectangle(Point::new(540.0, 500.0), 20.0, 20.0);
    let (r, f) = (relay.id, fuse.id);
    canvas.add_objects([relay, fuse], Some("protection"));

    assert_eq!(canvas.delete_layer("protection"), Some(Vec::new()));
    let components = canvas.layers().get_objects_in_layer("components");
    assert!(components.contains(&r) && components.contains(&f));
    assert_eq!(canvas.select_at(Point::new(510.0, 510.0), false), Some(r));
}

#[test]
fn test_pinch_then_fit_and_persist() {
    let (mut canvas, _) = diagram();
    let touch = |id, x, y| TouchPoint {
        id,
        position: Point::new(x, y),
    };
    let gesture = canvas.gesture_mut();
    gesture.handle_touch(TouchEvent::Start {
        touches: vec![touch(1, 400.0, 400.0), touch(2, 500.0, 400.0)],
        time: ms(0),
    });
    gesture.handle_touch(TouchEvent::Move {
        touches: vec![touch(1, 350.0, 400.0), touch(2, 550.0, 400.0)],
        time: ms(16),
    });
    gesture.handle_touch(TouchEvent::End {
        touches: vec![touch(1, 350.0, 400.0), touch(2, 550.0, 400.0)],
        time: ms(32),
    });
    assert!((canvas.gesture().transform().zoom - 2.0).abs() < 1e-9);

    canvas.fit_to_content(20.0);
    let mut now = ms(100);
    while canvas.gesture().is_animating() {
        now += ms(16);
        canvas.gesture_mut().tick(now);
    }
    let view = canvas.gesture().calculate_view_box();
    let content = canvas.index().bounds().unwrap();
    assert!(view.contains(content.origin()));
    assert!(view.contains(Point::new(content.x1, content.y1)));

    let json = canvas.snapshot().to_json().unwrap();
    let mut restored = Canvas::with_config(&EngineConfig::default());
    restored
        .gesture_mut()
        .set_container(Rect::new(0.0, 0.0, 1000.0, 800.0));
    assert!(restored.restore(CanvasSnapshot::from_json(&json).unwrap()).is_empty());
    assert_eq!(restored.gesture().transform(), canvas.gesture().transform());
    assert_eq!(restored.visible_objects_in_view(), canvas.visible_objects_in_view());
}

#[test]
fn test_inverted_zoom_range_builds_a_working_canvas() {
    let mut config = EngineConfig::default();
    config.viewport.min_zoom = 5.0;
    config.viewport.max_zoom = 2.0;
    assert!(config.validate().is_err());

    let mut canvas = Canvas::with_config(&config);
    assert!((canvas.gesture().transform().zoom - 2.0).abs() < 1e-9);
    canvas
        .gesture_mut()
        .set_transform(Transform::new(0.0, 0.0, 0.5));
    assert!((canvas.gesture().transform().zoom - 2.0).abs() < 1e-9);
    canvas.gesture_mut().zoom_in();
    let mut now = ms(0);
    while canvas.gesture().is_animating() {
        now += ms(16);
        canvas.gesture_mut().tick(now);
    }
    assert!((canvas.gesture().transform().zoom - 2.4).abs() < 1e-9);
}
