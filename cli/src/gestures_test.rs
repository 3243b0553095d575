use super::*;
use wire::Shape;

fn engine_with(shapes: Vec<Shape>) -> EngineCore {
    let mut engine = EngineCore::new("abc");
    engine.seed(shapes);
    engine
}

fn rect(id: &str, x: f64, y: f64) -> Shape {
    Shape::Rect { id: id.into(), x, y, width: 50.0, height: 50.0 }
}

#[test]
fn draw_rect_sends_one_normalised_draw() {
    let mut engine = engine_with(Vec::new());
    let (id, messages) = draw_rect(&mut engine, 60.0, 60.0, -50.0, -50.0).unwrap();

    assert_eq!(
        messages,
        vec![ClientMessage::Draw {
            room_id: "abc".into(),
            shape: Shape::Rect { id: id.clone(), x: 10.0, y: 10.0, width: 50.0, height: 50.0 },
        }]
    );
    assert!(engine.shape(&id).is_some());
}

#[test]
fn draw_rect_without_extent_is_rejected() {
    let mut engine = engine_with(Vec::new());
    assert_eq!(draw_rect(&mut engine, 5.0, 5.0, 0.0, 20.0), Err(GestureError::EmptyRect));
    assert!(engine.shapes().is_empty());
}

#[test]
fn move_shape_sends_translated_geometry() {
    let mut engine = engine_with(vec![rect("s1", 10.0, 10.0)]);
    let messages = move_shape(&mut engine, "s1", 30.0, -5.0).unwrap();

    assert_eq!(
        messages,
        vec![ClientMessage::MoveShape { room_id: "abc".into(), shape: rect("s1", 40.0, 5.0) }]
    );
    assert_eq!(engine.shape("s1"), Some(&rect("s1", 40.0, 5.0)));
    assert!(engine.selection().is_none());
}

#[test]
fn zero_move_sends_nothing() {
    let mut engine = engine_with(vec![rect("s1", 10.0, 10.0)]);
    assert!(move_shape(&mut engine, "s1", 0.0, 0.0).unwrap().is_empty());
}

#[test]
fn erase_shape_sends_delete() {
    let mut engine = engine_with(vec![rect("s1", 10.0, 10.0), rect("s2", 200.0, 200.0)]);
    let messages = erase_shape(&mut engine, "s1").unwrap();

    assert_eq!(messages, vec![ClientMessage::DeleteShape { room_id: "abc".into(), shape_id: "s1".into() }]);
    assert!(engine.shape("s1").is_none());
    assert_eq!(engine.shapes().len(), 1);
}

#[test]
fn unknown_shape_is_rejected() {
    let mut engine = engine_with(Vec::new());
    assert_eq!(move_shape(&mut engine, "ghost", 1.0, 1.0), Err(GestureError::UnknownShape("ghost".into())));
    assert_eq!(erase_shape(&mut engine, "ghost"), Err(GestureError::UnknownShape("ghost".into())));
}

#[test]
fn covered_shape_is_left_alone() {
    // s2 is drawn later and overlaps s1's top-left corner.
    let mut engine = engine_with(vec![rect("s1", 10.0, 10.0), rect("s2", 0.0, 0.0)]);
    assert_eq!(erase_shape(&mut engine, "s1"), Err(GestureError::Covered("s1".into())));
    assert_eq!(engine.shapes().len(), 2);
}

#[test]
fn outbound_drops_render_requests() {
    let message = ClientMessage::LeaveRoom { room_id: "abc".into() };
    let actions = vec![Action::RenderNeeded, Action::Send(message.clone()), Action::RenderNeeded];
    assert_eq!(outbound(actions), vec![message]);
}
