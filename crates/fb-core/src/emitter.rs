//! Markdown export: Scene → flow document.
//!
//! The document carries a heading, a mermaid block, a metadata translation
//! and Given/When/Then prose. [`crate::parser::parse_markdown`] reads the
//! mermaid block back, so kinds, labels, outcome tags and topology survive
//! a round trip; coordinates do not.

use crate::model::{ArrowKind, DiagramType, Element, ElementKind, LineStyle};
use crate::scene::Scene;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::fmt::Write;

/// Emit the full markdown document.
#[must_use]
pub fn emit_markdown(scene: &Scene) -> String {
    let meta = &scene.metadata;
    let mut out = String::with_capacity(2048);

    let _ = writeln!(
        out,
        "# {} — {}: {}\n",
        meta.methodology,
        meta.diagram_type.label(),
        meta.flow_title
    );
    out.push_str("## Diagram Input\n\n```mermaid\n");
    out.push_str(&emit_mermaid(scene));
    out.push_str("```\n\n## Translation\n\n");

    let _ = writeln!(out, "**Flow Title:** {}", meta.flow_title);
    let _ = writeln!(out, "**Methodology:** {}", meta.methodology);
    let _ = writeln!(out, "**Diagram Type:** {}", meta.diagram_type.label());
    if !meta.primary_outcomes.is_empty() {
        let _ = writeln!(out, "**Primary Outcomes:** {}", backtick_join(&meta.primary_outcomes));
    }
    if !meta.timers.is_empty() {
        let _ = writeln!(out, "**Timers:** {}", backtick_join(&meta.timers));
    }

    if !scene.elements().is_empty() {
        out.push_str("\n### Elements\n\n");
        for el in scene.elements() {
            let _ = write!(out, "- **{}** ({})", display_label(el), el.kind.name());
            if let Some(outcome) = &el.annotation {
                let _ = write!(out, ", outcome: {outcome}");
            }
            out.push('\n');
        }
    }

    if !scene.connections().is_empty() {
        out.push_str("\n### Connections\n\n");
        for conn in scene.connections() {
            let from = scene.element(conn.start_element_id).map_or("?", |e| e.label.as_str());
            let to = scene.element(conn.end_element_id).map_or("?", |e| e.label.as_str());
            let _ = write!(out, "- {from} → {to}");
            if !conn.label.is_empty() {
                let _ = write!(out, ": {}", conn.label);
            }
            out.push('\n');
        }
    }

    out.push_str("\n### Behavior Flow\n\n");
    out.push_str(&emit_behavior_flow(scene));
    out
}

fn backtick_join(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("`{s}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_label(el: &Element) -> &str {
    if el.label.trim().is_empty() {
        el.kind.spec().name
    } else {
        el.label.as_str()
    }
}

// ─── Mermaid ─────────────────────────────────────────────────────────────

/// Spreadsheet-style node ids: A..Z, AA..AZ, BA...
pub fn mermaid_node_id(index: usize) -> String {
    let mut n = index + 1;
    let mut id = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        id.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    id.reverse();
    String::from_utf8_lossy(&id).into_owned()
}

fn encode_label(text: &str) -> String {
    text.replace('"', "#quot;").replace('\n', "<br/>")
}

fn encode_edge_label(text: &str) -> String {
    encode_label(text).replace('|', "#124;")
}

/// Bracket pair drawing a kind in a mermaid flowchart.
fn brackets(kind: ElementKind) -> (&'static str, &'static str) {
    match kind {
        ElementKind::Start | ElementKind::End => ("([", "])"),
        ElementKind::Decision | ElementKind::Diamond => ("{", "}"),
        ElementKind::Timer | ElementKind::Circle => ("((", "))"),
        _ => ("[", "]"),
    }
}

/// Body of the mermaid block (without the fences).
#[must_use]
pub fn emit_mermaid(scene: &Scene) -> String {
    match scene.metadata.diagram_type {
        DiagramType::Sequence if sequence_block_fits(scene) => emit_mermaid_sequence(scene),
        _ => emit_mermaid_flowchart(scene),
    }
}

/// A sequence block rebuilds one lifeline per participant and has no
/// syntax for connections or other kinds. Scenes it cannot carry go out
/// as a flowchart block; the document keeps its declared type.
fn sequence_block_fits(scene: &Scene) -> bool {
    let count = |kind| scene.elements().iter().filter(|e| e.kind == kind).count();
    let participants = count(ElementKind::Participant);
    scene.connections().is_empty()
        && count(ElementKind::Lifeline) == participants
        && (participants > 0 || scene.elements().is_empty())
        && scene.elements().iter().all(|e| {
            matches!(
                e.kind,
                ElementKind::Participant
                    | ElementKind::Lifeline
                    | ElementKind::Message
                    | ElementKind::Note
            )
        })
}

fn emit_mermaid_flowchart(scene: &Scene) -> String {
    let meta = &scene.metadata;
    let mut out = String::from("flowchart TD\n");
    let _ = writeln!(out, "    %% Flow Title: {} ({})", meta.flow_title, meta.methodology);
    if !meta.primary_outcomes.is_empty() {
        let _ = writeln!(out, "    %% Primary Outcomes: {}", meta.primary_outcomes.join(", "));
    }

    let id_of = |id| {
        scene
            .elements()
            .iter()
            .position(|e| e.id == id)
            .map(mermaid_node_id)
    };

    for (i, el) in scene.elements().iter().enumerate() {
        let (open, close) = brackets(el.kind);
        let _ = writeln!(
            out,
            "    {}{open}\"{}\"{close}:::{}",
            mermaid_node_id(i),
            encode_label(&el.label),
            el.kind.name()
        );
    }
    for (i, el) in scene.elements().iter().enumerate() {
        if let Some(outcome) = &el.annotation {
            let _ = writeln!(out, "    %% outcome {}: {}", mermaid_node_id(i), outcome);
        }
    }

    for conn in scene.connections() {
        let (Some(from), Some(to)) = (id_of(conn.start_element_id), id_of(conn.end_element_id))
        else {
            continue;
        };
        let arrow = match (conn.line_style, conn.arrow_kind) {
            (LineStyle::Solid, ArrowKind::Arrow) => "-->",
            (LineStyle::Solid, ArrowKind::None) => "---",
            (LineStyle::Dashed, ArrowKind::Arrow) => "-.->",
            (LineStyle::Dashed, ArrowKind::None) => "-.-",
        };
        if conn.label.is_empty() {
            let _ = writeln!(out, "    {from} {arrow} {to}");
        } else {
            let _ = writeln!(out, "    {from} {arrow}|{}| {to}", encode_edge_label(&conn.label));
        }
    }
    out
}

/// Whether a message element points right to left.
fn is_reversed(el: &Element) -> bool {
    let angle = el.style.rotation.rem_euclid(360.0);
    angle > 90.0 && angle < 270.0
}

fn emit_mermaid_sequence(scene: &Scene) -> String {
    let meta = &scene.metadata;
    let mut out = String::from("sequenceDiagram\n");
    let _ = writeln!(out, "    %% Flow Title: {} ({})", meta.flow_title, meta.methodology);

    let mut participants: Vec<&Element> = scene
        .elements()
        .iter()
        .filter(|e| e.kind == ElementKind::Participant)
        .collect();
    participants.sort_by(|a, b| a.center().x.total_cmp(&b.center().x));
    for (i, p) in participants.iter().enumerate() {
        let _ = writeln!(out, "    participant P{} as {}", i + 1, one_line(&p.label));
    }

    let nearest = |x: f64| -> Option<String> {
        participants
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.center().x - x).abs().total_cmp(&(b.center().x - x).abs())
            })
            .map(|(i, _)| format!("P{}", i + 1))
    };

    let mut rows: Vec<&Element> = scene
        .elements()
        .iter()
        .filter(|e| matches!(e.kind, ElementKind::Message | ElementKind::Note))
        .collect();
    rows.sort_by(|a, b| {
        // Notes after messages, each group top to bottom.
        (a.kind == ElementKind::Note)
            .cmp(&(b.kind == ElementKind::Note))
            .then(a.position().y.total_cmp(&b.position().y))
    });

    for el in rows {
        let left = el.position().x;
        let right = left + el.width();
        match el.kind {
            ElementKind::Message => {
                let (start, end) = if is_reversed(el) { (right, left) } else { (left, right) };
                if let (Some(from), Some(to)) = (nearest(start), nearest(end)) {
                    let _ = writeln!(out, "    {from}->>{to}: {}", one_line(&el.label));
                }
            }
            _ => {
                if let Some(over) = nearest(left) {
                    let _ = writeln!(out, "    Note over {over}: {}", encode_label(&el.label));
                }
            }
        }
    }

    out
}

fn one_line(text: &str) -> String {
    text.replace('\n', " ")
}

// ─── Prose ───────────────────────────────────────────────────────────────

/// Elements in reading order: a depth-first walk from the start elements
/// (then any other roots) following connections in creation order, with
/// unreachable elements appended in paint order.
fn reading_order(scene: &Scene) -> Vec<usize> {
    let elements = scene.elements();
    let mut graph: DiGraph<usize, usize> = DiGraph::with_capacity(elements.len(), 0);
    let nodes: Vec<NodeIndex> = (0..elements.len()).map(|i| graph.add_node(i)).collect();
    for (ci, conn) in scene.connections().iter().enumerate() {
        let from = elements.iter().position(|e| e.id == conn.start_element_id);
        let to = elements.iter().position(|e| e.id == conn.end_element_id);
        if let (Some(a), Some(b)) = (from, to) {
            graph.add_edge(nodes[a], nodes[b], ci);
        }
    }

    let is_root = |n: NodeIndex| graph.edges_directed(n, Direction::Incoming).next().is_none();
    let mut seeds: Vec<NodeIndex> = nodes
        .iter()
        .copied()
        .filter(|n| elements[n.index()].kind == ElementKind::Start)
        .collect();
    seeds.extend(nodes.iter().copied().filter(|n| is_root(*n)));
    seeds.extend(nodes.iter().copied());

    let mut seen = vec![false; elements.len()];
    let mut order = Vec::with_capacity(elements.len());
    for seed in seeds {
        let mut stack = vec![seed];
        while let Some(n) = stack.pop() {
            if std::mem::replace(&mut seen[n.index()], true) {
                continue;
            }
            order.push(n.index());
            let mut out: Vec<(usize, NodeIndex)> = graph
                .edges_directed(n, Direction::Outgoing)
                .map(|e| (*e.weight(), e.target()))
                .collect();
            out.sort_by_key(|(w, _)| std::cmp::Reverse(*w));
            stack.extend(out.into_iter().map(|(_, t)| t));
        }
    }
    order
}

/// Given/When/Then prose for flowcharts; participant and message lists
/// for sequence diagrams.
#[must_use]
pub fn emit_behavior_flow(scene: &Scene) -> String {
    match scene.metadata.diagram_type {
        DiagramType::Flowchart => emit_flow_prose(scene),
        DiagramType::Sequence => emit_sequence_lists(scene),
    }
}

fn emit_flow_prose(scene: &Scene) -> String {
    let elements = scene.elements();
    let outgoing = |i: usize| -> Vec<&Element> {
        scene
            .connections()
            .iter()
            .filter(|c| c.start_element_id == elements[i].id)
            .filter_map(|c| scene.element(c.end_element_id))
            .collect()
    };

    let mut out = String::new();
    let mut emitted = vec![false; elements.len()];
    let mut step = 0;
    let mut previous: Option<&str> = None;

    for i in reading_order(scene) {
        if emitted[i] {
            continue;
        }
        let el = &elements[i];
        if el.label.trim().is_empty() || el.kind == ElementKind::Lifeline {
            emitted[i] = true;
            continue;
        }
        emitted[i] = true;
        match el.kind {
            ElementKind::End => {
                let _ = writeln!(out, "*Outcome →* **{}**\n", one_line(&el.label));
            }
            ElementKind::Decision | ElementKind::Diamond => {
                let _ = writeln!(out, "**Decision — {}**", one_line(&el.label));
                for target in outgoing(i) {
                    let Some(ti) = elements.iter().position(|e| e.id == target.id) else {
                        continue;
                    };
                    if target.kind == ElementKind::End && !emitted[ti] {
                        emitted[ti] = true;
                        let _ = writeln!(out, "*Outcome →* **{}**", one_line(&target.label));
                    }
                }
                out.push('\n');
                previous = Some(el.label.as_str());
            }
            _ => {
                step += 1;
                let _ = writeln!(out, "**Step {step} — {}**", one_line(&el.label));
                match previous {
                    Some(prev) => {
                        let _ = writeln!(out, "- *Given* \"{}\" is complete", one_line(prev));
                    }
                    None => out.push_str("- *Given* the flow has started\n"),
                }
                let _ = writeln!(out, "- *When* {}", one_line(&el.label).to_lowercase());
                match outgoing(i).first() {
                    Some(next) => {
                        let _ = writeln!(out, "- *Then* the flow continues to \"{}\"\n", one_line(&next.label));
                    }
                    None => out.push_str("- *Then* the flow is complete\n\n"),
                }
                previous = Some(el.label.as_str());
            }
        }
    }
    out
}

fn emit_sequence_lists(scene: &Scene) -> String {
    let mut participants: Vec<&Element> = scene
        .elements()
        .iter()
        .filter(|e| e.kind == ElementKind::Participant)
        .collect();
    participants.sort_by(|a, b| a.center().x.total_cmp(&b.center().x));
    let name_near = |x: f64| {
        participants
            .iter()
            .min_by(|a, b| (a.center().x - x).abs().total_cmp(&(b.center().x - x).abs()))
            .map(|p| one_line(&p.label))
    };

    let mut out = String::from("participants:\n");
    for p in &participants {
        let _ = writeln!(out, "- {}", one_line(&p.label));
    }
    out.push_str("\nmessages:\n");
    let mut messages: Vec<&Element> = scene
        .elements()
        .iter()
        .filter(|e| e.kind == ElementKind::Message)
        .collect();
    messages.sort_by(|a, b| a.position().y.total_cmp(&b.position().y));
    for m in messages {
        let left = m.position().x;
        let right = left + m.width();
        let (start, end) = if is_reversed(m) { (right, left) } else { (left, right) };
        if let (Some(from), Some(to)) = (name_near(start), name_near(end)) {
            let _ = writeln!(out, "- {from} -> {to}: {}", one_line(&m.label));
        }
    }
    out
}
