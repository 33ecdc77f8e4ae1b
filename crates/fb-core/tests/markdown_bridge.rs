//! Integration tests: markdown → Scene → markdown.
//!
//! Imports the fixture documents, checks the reconstructed structure, and
//! verifies that emitting, re-importing and emitting again is stable.

use fb_core::emitter::{emit_markdown, emit_mermaid};
use fb_core::geometry::Point;
use fb_core::model::*;
use fb_core::parser::{ParseOptions, parse_markdown};
use fb_core::scene::Scene;
use pretty_assertions::assert_eq;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn import(text: &str) -> Scene {
    parse_markdown(text, &ParseOptions::default())
        .expect("import failed")
        .scene
}

fn kinds(scene: &Scene) -> Vec<ElementKind> {
    scene.elements().iter().map(|e| e.kind).collect()
}

fn labels(scene: &Scene) -> Vec<&str> {
    scene.elements().iter().map(|e| e.label.as_str()).collect()
}

/// Edges as (from index, to index, label) in paint-order indices.
fn topology(scene: &Scene) -> Vec<(usize, usize, String)> {
    let index = |id| {
        scene
            .elements()
            .iter()
            .position(|e| e.id == id)
            .expect("connection endpoint missing")
    };
    scene
        .connections()
        .iter()
        .map(|c| (index(c.start_element_id), index(c.end_element_id), c.label.clone()))
        .collect()
}

/// Emit → import → emit must reproduce the first emission exactly, and
/// the re-imported scene keeps kinds, labels, outcomes and topology.
fn assert_stable(scene: &Scene) {
    let first = emit_markdown(scene);
    let reimported = import(&first);
    assert_eq!(kinds(&reimported), kinds(scene), "kinds changed:\n{first}");
    assert_eq!(labels(&reimported), labels(scene), "labels changed:\n{first}");
    assert_eq!(reimported.metadata, scene.metadata);
    let outcome_names = |s: &Scene| s.outcomes().into_keys().collect::<Vec<_>>();
    assert_eq!(outcome_names(&reimported), outcome_names(scene));
    if scene.metadata.diagram_type == DiagramType::Flowchart {
        assert_eq!(topology(&reimported), topology(scene));
    }
    let second = emit_markdown(&reimported);
    assert_eq!(second, first);
}

// ─── Prose flow ──────────────────────────────────────────────────────────

#[test]
fn expense_prose_builds_flow() {
    let result = parse_markdown(
        include_str!("fixtures/expense_approval.md"),
        &ParseOptions::default(),
    )
    .unwrap();
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    let scene = &result.scene;

    assert_eq!(scene.metadata.flow_title, "Expense Approval");
    assert_eq!(scene.metadata.primary_outcomes, vec!["Paid", "Rejected"]);
    assert_eq!(scene.metadata.timers, vec!["Manager SLA"]);
    assert_eq!(
        kinds(scene),
        vec![
            ElementKind::Start,
            ElementKind::Action,
            ElementKind::Timer,
            ElementKind::Decision,
            ElementKind::End,
            ElementKind::End,
        ]
    );
    assert_eq!(
        topology(scene),
        vec![
            (0, 1, String::new()),
            (1, 2, String::new()),
            (2, 3, String::new()),
            (3, 4, String::new()),
            (3, 5, String::new()),
        ]
    );
    // The appendix step lies outside the Behavior Flow section.
    assert!(!labels(scene).contains(&"Not part of the flow"));
    assert_eq!(scene.elements()[0].position(), Point::new(200.0, 100.0));
}

#[test]
fn expense_prose_is_stable_through_markdown() {
    assert_stable(&import(include_str!("fixtures/expense_approval.md")));
}

// ─── Mermaid flowchart ───────────────────────────────────────────────────

#[test]
fn support_ticket_mermaid_shapes() {
    let scene = import(include_str!("fixtures/support_ticket.md"));
    assert_eq!(scene.metadata.methodology, "DDD");
    assert_eq!(
        kinds(&scene),
        vec![
            ElementKind::Start,
            ElementKind::Action,
            ElementKind::Decision,
            ElementKind::Timer,
            ElementKind::Action,
            ElementKind::End,
        ]
    );
    assert_eq!(labels(&scene)[4], "Escalate to \"L2\"");
    assert_eq!(scene.elements()[5].annotation.as_deref(), Some("Resolved"));

    let edges = topology(&scene);
    assert_eq!(edges.len(), 6);
    assert_eq!(edges[2], (2, 3, "yes".to_string()));
    assert_eq!(scene.connections()[3].line_style, LineStyle::Dashed);

    // Layered placement: the two branches share a row.
    assert_eq!(scene.elements()[3].position().y, scene.elements()[4].position().y);
    assert!(scene.elements()[5].position().y > scene.elements()[3].position().y);
}

#[test]
fn support_ticket_is_stable_through_markdown() {
    assert_stable(&import(include_str!("fixtures/support_ticket.md")));
}

#[test]
fn hand_built_scene_survives_markdown() {
    let mut scene = Scene::new();
    scene.metadata.flow_title = "Onboarding".into();
    scene.metadata.methodology = "TDD".into();
    let start = scene.add_element(ElementKind::Start, Point::new(0.0, 0.0)).id;
    let note = scene.add_element(ElementKind::Note, Point::new(300.0, 0.0)).id;
    let check = scene.add_element(ElementKind::Diamond, Point::new(0.0, 200.0)).id;
    scene.set_label(note, "Remember:\nbadge | laptop");
    scene.set_label(check, "Docs signed?");
    scene.create_connection(start, check);
    let link = scene.create_connection(check, note).map(|c| c.id).unwrap();
    scene.set_connection_label(link, "see \"notes\"");
    scene.set_connection_line(link, LineStyle::Dashed, ArrowKind::None);

    assert_stable(&scene);
    let mermaid = emit_mermaid(&scene);
    assert!(mermaid.contains("B[\"Remember:<br/>badge | laptop\"]:::note"));
    assert!(mermaid.contains("C -.-|see #quot;notes#quot;| B"));
}

// ─── Sequence ────────────────────────────────────────────────────────────

#[test]
fn checkout_sequence_layout() {
    let scene = import(include_str!("fixtures/checkout_sequence.md"));
    assert_eq!(scene.metadata.diagram_type, DiagramType::Sequence);
    let count = |k: ElementKind| scene.elements().iter().filter(|e| e.kind == k).count();
    assert_eq!(count(ElementKind::Participant), 3);
    assert_eq!(count(ElementKind::Lifeline), 3);
    assert_eq!(count(ElementKind::Message), 4);
    assert_eq!(count(ElementKind::Note), 1);
    assert!(scene.connections().is_empty());

    let mermaid = emit_mermaid(&scene);
    assert!(mermaid.starts_with("sequenceDiagram\n"));
    assert!(mermaid.contains("    participant P1 as Customer\n"));
    assert!(mermaid.contains("    P1->>P2: place order\n"));
    assert!(mermaid.contains("    P3->>P2: receipt\n"));
    assert!(mermaid.contains("    P2->>P1: confirmation\n"));
    assert!(mermaid.contains("    Note over P3: retries twice\n"));
}

#[test]
fn checkout_sequence_is_stable_through_markdown() {
    assert_stable(&import(include_str!("fixtures/checkout_sequence.md")));
}

#[test]
fn sequence_scene_with_connections_keeps_them() {
    let mut scene = Scene::new();
    scene.metadata.diagram_type = DiagramType::Sequence;
    scene.metadata.flow_title = "Payment timeout".into();
    let shop = scene.add_element(ElementKind::Participant, Point::new(0.0, 0.0)).id;
    let bank = scene.add_element(ElementKind::Participant, Point::new(400.0, 0.0)).id;
    let wait = scene.add_element(ElementKind::Timer, Point::new(200.0, 200.0)).id;
    scene.set_label(shop, "Shop");
    scene.set_label(bank, "Bank");
    scene.set_label(wait, "30s");
    scene.create_connection(shop, wait);
    let late = scene.create_connection(wait, bank).map(|c| c.id).unwrap();
    scene.set_connection_label(late, "expired");

    let mermaid = emit_mermaid(&scene);
    assert!(mermaid.starts_with("flowchart TD\n"), "{mermaid}");

    let reimported = import(&emit_markdown(&scene));
    assert_eq!(reimported.metadata.diagram_type, DiagramType::Sequence);
    assert_eq!(
        kinds(&reimported),
        vec![ElementKind::Participant, ElementKind::Participant, ElementKind::Timer]
    );
    assert_eq!(labels(&reimported), vec!["Shop", "Bank", "30s"]);
    assert_eq!(
        topology(&reimported),
        vec![(0, 2, String::new()), (2, 1, "expired".to_string())]
    );
    assert_stable(&scene);
}

#[test]
fn participants_without_lifelines_do_not_gain_them() {
    let mut scene = Scene::new();
    scene.metadata.diagram_type = DiagramType::Sequence;
    let a = scene.add_element(ElementKind::Participant, Point::new(0.0, 0.0)).id;
    let b = scene.add_element(ElementKind::Participant, Point::new(300.0, 0.0)).id;
    scene.set_label(a, "Client");
    scene.set_label(b, "Server");

    let reimported = import(&emit_markdown(&scene));
    assert_eq!(
        kinds(&reimported),
        vec![ElementKind::Participant, ElementKind::Participant]
    );
    assert_stable(&scene);
}

// ─── Degenerate input ────────────────────────────────────────────────────

#[test]
fn empty_scene_emits_and_reimports_empty() {
    let scene = Scene::new();
    let md = emit_markdown(&scene);
    assert!(md.starts_with("# BDD — Flowchart: Untitled Flow"));
    let result = parse_markdown(&md, &ParseOptions::default()).unwrap();
    assert!(result.is_empty());
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w == "no diagram structure recognized")
    );
}
