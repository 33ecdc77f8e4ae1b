//! Integration tests: JSON documents.
//!
//! Loads the fixture document, checks the repaired invariants, and verifies
//! that save → load reproduces the scene exactly.

use fb_core::document::{DocumentError, load_document, save_document};
use fb_core::geometry::Point;
use fb_core::id::ObjectId;
use fb_core::model::*;
use fb_core::parser::{ParseOptions, parse_markdown};
use pretty_assertions::assert_eq;

#[test]
fn fixture_loads_with_layers_and_outcomes() {
    let scene = load_document(include_str!("fixtures/approval_board.json")).unwrap();
    assert_eq!(scene.metadata.flow_title, "Approval Board");
    assert_eq!(scene.metadata.methodology_subtitle(), "Specification-Driven");
    assert_eq!(scene.active_layer(), ObjectId::intern("review"));
    assert_eq!(scene.layers().len(), 2);
    assert!(!scene.is_editable(ObjectId::intern("end_1")));
    assert!(scene.is_editable(ObjectId::intern("start_1")));

    let end = scene.element(ObjectId::intern("end_1")).unwrap();
    assert_eq!(end.annotation.as_deref(), Some("Approved"));
    assert_eq!(end.style.opacity, 80);

    // Cached endpoints are recomputed from the closest point pair.
    let conn = &scene.connections()[0];
    assert_eq!(conn.label, "sign off");
    assert_eq!(conn.line_style, LineStyle::Dashed);
    assert_eq!(conn.arrow_kind, ArrowKind::Arrow);
    assert_eq!(conn.start_point, Point::new(160.0, 160.0));
    assert_eq!(conn.end_point, Point::new(140.0, 300.0));
}

#[test]
fn fixture_save_load_is_lossless() {
    let scene = load_document(include_str!("fixtures/approval_board.json")).unwrap();
    let saved = save_document(&scene).unwrap();
    let reloaded = load_document(&saved).unwrap();
    assert_eq!(reloaded, scene);
    assert_eq!(save_document(&reloaded).unwrap(), saved);
}

#[test]
fn imported_markdown_saves_and_loads() {
    let result = parse_markdown(
        include_str!("fixtures/support_ticket.md"),
        &ParseOptions::default(),
    )
    .unwrap();
    let saved = save_document(&result.scene).unwrap();
    let reloaded = load_document(&saved).unwrap();
    assert_eq!(reloaded, result.scene);
}

#[test]
fn duplicate_ids_are_rejected() {
    let text = include_str!("fixtures/approval_board.json").replace("\"end_1\"", "\"start_1\"");
    match load_document(&text) {
        Err(DocumentError::DuplicateId(id)) => assert_eq!(id, "start_1"),
        other => panic!("expected a duplicate id error, got {other:?}"),
    }
}
