//! Integration tests: snapshot history over the scene (fb-editor).
//!
//! Covers the history laws on their own and through the controller:
//! one snapshot per completed action, restore equality, capacity bounds,
//! and gesture aborts that leave no trace.

use fb_core::config::EditorConfig;
use fb_core::geometry::Point;
use fb_core::model::ElementKind;
use fb_core::scene::Scene;
use fb_editor::{Controller, History, InputEvent, Modifiers};
use pretty_assertions::assert_eq;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn free_config() -> EditorConfig {
    EditorConfig {
        snap_to_grid: false,
        ..EditorConfig::default()
    }
}

fn key(ctl: &mut Controller, key: &str, modifiers: Modifiers) -> bool {
    ctl.handle(&InputEvent::key(key, modifiers))
}

fn drag(ctl: &mut Controller, from: (f64, f64), to: &[(f64, f64)]) {
    ctl.handle(&InputEvent::pointer_down(from.0, from.1, Modifiers::NONE));
    for (x, y) in to {
        ctl.handle(&InputEvent::pointer_move(*x, *y));
    }
    let (x, y) = to.last().copied().unwrap_or(from);
    ctl.handle(&InputEvent::pointer_up(x, y));
}

// ─── History laws ───────────────────────────────────────────────────────

#[test]
fn connect_scenario_undoes_the_connection_first() {
    init_logs();
    let mut scene = Scene::new();
    let mut history = History::new(50);
    history.reset(&scene);

    let start = scene.add_element(ElementKind::Start, Point::new(100.0, 100.0)).id;
    history.snapshot(&scene);
    let action = scene.add_element(ElementKind::Action, Point::new(100.0, 250.0)).id;
    history.snapshot(&scene);
    let conn = scene.create_connection(start, action).cloned().unwrap();
    history.snapshot(&scene);

    assert_eq!(scene.elements().len(), 2);
    assert_eq!(scene.connections().len(), 1);
    // Start S (160, 160) and action N (170, 250) are the closest pair.
    assert_eq!(conn.start_point, Point::new(160.0, 160.0));
    assert_eq!(conn.end_point, Point::new(170.0, 250.0));

    let undone = history.undo().unwrap();
    assert_eq!(undone.elements().len(), 2);
    assert!(undone.connections().is_empty());

    let redone = history.redo().unwrap();
    assert_eq!(redone, scene);
}

#[test]
fn undo_then_redo_round_trips_deep_state() {
    let mut scene = Scene::new();
    let id = scene.add_element(ElementKind::Decision, Point::new(40.0, 40.0)).id;
    let mut history = History::new(50);
    history.reset(&scene);
    let before = scene.clone();

    scene.resize_element(id, 300.0, 10.0);
    history.snapshot(&scene);
    let after = scene.clone();

    assert_eq!(history.undo().unwrap(), before);
    assert_eq!(history.redo().unwrap(), after);
}

#[test]
fn capacity_plus_k_keeps_capacity() {
    let capacity = 50;
    let mut scene = Scene::new();
    let mut history = History::new(capacity);
    history.reset(&scene);
    for i in 0..capacity + 7 {
        scene.add_element(ElementKind::Note, Point::new(i as f64 * 10.0, 0.0));
        history.snapshot(&scene);
    }
    assert_eq!(history.len(), capacity);

    let mut undos = 0;
    while history.undo().is_some() {
        undos += 1;
    }
    assert_eq!(undos, capacity - 1);
    // The oldest reachable state already has the first eight notes.
    assert_eq!(history.current().map(|s| s.elements().len()), Some(8));
}

// ─── Through the controller ─────────────────────────────────────────────

#[test]
fn keyboard_undo_redo_of_a_nudge() {
    init_logs();
    let mut scene = Scene::new();
    let id = scene.add_element(ElementKind::Action, Point::new(100.0, 100.0)).id;
    let mut ctl = Controller::with_scene(scene, free_config(), 800.0, 600.0);

    // Select with a click that does not move anything.
    drag(&mut ctl, (150.0, 120.0), &[]);
    assert_eq!(ctl.history().len(), 1);

    key(&mut ctl, "ArrowRight", Modifiers::NONE);
    key(&mut ctl, "ArrowDown", Modifiers::SHIFT);
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(101.0, 110.0));
    assert_eq!(ctl.history().len(), 3);

    key(&mut ctl, "z", Modifiers::CTRL);
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(101.0, 100.0));
    let ctrl_shift = Modifiers {
        shift: true,
        ..Modifiers::CTRL
    };
    key(&mut ctl, "Z", ctrl_shift);
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(101.0, 110.0));
    key(&mut ctl, "z", Modifiers::CTRL);
    key(&mut ctl, "z", Modifiers::CTRL);
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(100.0, 100.0));
    assert!(!key(&mut ctl, "z", Modifiers::CTRL));
    key(&mut ctl, "y", Modifiers::CTRL);
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(101.0, 100.0));
}

#[test]
fn drag_gesture_commits_one_snapshot() {
    let mut scene = Scene::new();
    let id = scene.add_element(ElementKind::Action, Point::new(100.0, 100.0)).id;
    let mut ctl = Controller::with_scene(scene, free_config(), 800.0, 600.0);

    drag(&mut ctl, (150.0, 130.0), &[(155.0, 131.0), (170.0, 140.0), (180.0, 150.0)]);
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(130.0, 120.0));
    assert_eq!(ctl.history().len(), 2);

    ctl.undo();
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(100.0, 100.0));
}

#[test]
fn drag_snaps_to_grid_from_the_origin() {
    let mut scene = Scene::new();
    let id = scene.add_element(ElementKind::Action, Point::new(100.0, 100.0)).id;
    let mut ctl = Controller::with_scene(scene, EditorConfig::default(), 800.0, 600.0);

    drag(&mut ctl, (150.0, 130.0), &[(183.0, 142.0)]);
    // (133, 112) snaps to (140, 120) on the 20-unit grid.
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(140.0, 120.0));
}

#[test]
fn escape_aborts_a_drag_without_history() {
    let mut scene = Scene::new();
    let id = scene.add_element(ElementKind::Action, Point::new(100.0, 100.0)).id;
    let mut ctl = Controller::with_scene(scene, free_config(), 800.0, 600.0);

    ctl.handle(&InputEvent::pointer_down(150.0, 130.0, Modifiers::NONE));
    ctl.handle(&InputEvent::pointer_move(250.0, 230.0));
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(200.0, 200.0));

    key(&mut ctl, "Escape", Modifiers::NONE);
    ctl.handle(&InputEvent::pointer_up(250.0, 230.0));
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(100.0, 100.0));
    assert!(ctl.selection().is_empty());
    assert_eq!(ctl.history().len(), 1);
}

#[test]
fn delete_during_a_drag_keeps_both_steps_undoable() {
    let mut scene = Scene::new();
    let id = scene.add_element(ElementKind::Action, Point::new(100.0, 100.0)).id;
    let mut ctl = Controller::with_scene(scene, free_config(), 800.0, 600.0);

    ctl.handle(&InputEvent::pointer_down(150.0, 130.0, Modifiers::NONE));
    ctl.handle(&InputEvent::pointer_move(180.0, 160.0));
    key(&mut ctl, "Delete", Modifiers::NONE);
    ctl.handle(&InputEvent::pointer_up(180.0, 160.0));
    assert!(ctl.scene().is_empty());
    assert_eq!(ctl.history().len(), 3);

    assert!(ctl.undo());
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(130.0, 130.0));
    assert!(ctl.undo());
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(100.0, 100.0));
}

#[test]
fn second_press_commits_the_unfinished_drag() {
    let mut scene = Scene::new();
    let id = scene.add_element(ElementKind::Action, Point::new(100.0, 100.0)).id;
    let mut ctl = Controller::with_scene(scene, free_config(), 800.0, 600.0);

    ctl.handle(&InputEvent::pointer_down(150.0, 130.0, Modifiers::NONE));
    ctl.handle(&InputEvent::pointer_move(180.0, 160.0));
    // No release: the next press lands on empty canvas.
    drag(&mut ctl, (700.0, 500.0), &[]);
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(130.0, 130.0));
    assert!(ctl.history().can_undo());
    assert_eq!(ctl.history().len(), 2);

    assert!(ctl.undo());
    assert_eq!(ctl.scene().element(id).unwrap().position(), Point::new(100.0, 100.0));
}

#[test]
fn a_new_edit_drops_the_redo_branch() {
    let mut ctl = Controller::new(free_config(), 800.0, 600.0);
    ctl.drop_element(ElementKind::Start, Point::new(200.0, 200.0));
    ctl.drop_element(ElementKind::End, Point::new(400.0, 200.0));
    assert!(ctl.undo());
    assert!(ctl.history().can_redo());

    ctl.drop_element(ElementKind::Timer, Point::new(400.0, 400.0));
    assert!(!ctl.history().can_redo());
    let kinds: Vec<ElementKind> = ctl.scene().elements().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ElementKind::Start, ElementKind::Timer]);
}

#[test]
fn import_is_one_undo_step() {
    let mut ctl = Controller::new(EditorConfig::default(), 800.0, 600.0);
    let warnings = ctl
        .import_markdown(
            include_str!("fixtures/password_reset.md"),
            &Default::default(),
        )
        .unwrap();
    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(ctl.scene().elements().len(), 2);
    assert_eq!(ctl.scene().connections().len(), 1);
    assert_eq!(ctl.scene().elements()[0].kind, ElementKind::Start);
    assert_eq!(ctl.scene().metadata.flow_title, "Password Reset");

    assert!(ctl.undo());
    assert!(ctl.scene().is_empty());
    assert!(ctl.import_markdown("   ", &Default::default()).is_err());
}
