//! Markdown import: turns a flow document into a [`Scene`].
//!
//! Recognized input, in priority order:
//! 1. a fenced ```` ```mermaid ```` block (`flowchart`/`graph` or
//!    `sequenceDiagram`), which is what [`crate::emitter`] writes;
//! 2. for flowcharts, `**Step N — Title**`, `**Branch X — Title**`,
//!    `**Decision — Title**` and `*Outcome →* **Name**` lines inside a
//!    `Behavior Flow` section (or the whole document if there is none);
//! 3. for sequence diagrams, `participants:` / `messages:` lists.
//!
//! Metadata comes from a `# Methodology — Type: Title` heading and
//! `**Field:** value` lines. Anything unrecognized becomes a warning;
//! only empty input is an error.

use crate::geometry::Point;
use crate::id::ObjectId;
use crate::layout::{self, FlowColumn};
use crate::model::{
    ArrowKind, Color, DiagramType, ElementKind, LineStyle, Metadata, Swatch,
};
use crate::scene::Scene;
use std::collections::HashMap;
use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, rest, take_till, take_until, take_while};

// ─── Public API ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("the markdown document is empty")]
    Empty,
}

/// Knobs for [`parse_markdown`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Diagram type to assume when the document does not declare one.
    pub hint: DiagramType,
    /// Insert a small Start → Action → End flow when nothing is recognized.
    /// Off by default: an unrecognized document imports as an empty scene.
    pub placeholder_on_empty: bool,
}

impl ParseOptions {
    pub fn with_hint(hint: DiagramType) -> Self {
        Self {
            hint,
            ..Self::default()
        }
    }
}

/// A parsed document plus everything that was skipped along the way.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub scene: Scene,
    pub warnings: Vec<String>,
}

impl ImportResult {
    pub fn is_empty(&self) -> bool {
        self.scene.is_empty()
    }
}

/// Parse a markdown flow document.
///
/// # Errors
/// [`ParseError::Empty`] when the text is blank. Everything else degrades
/// to warnings and a partial (possibly empty) scene.
pub fn parse_markdown(text: &str, options: &ParseOptions) -> Result<ImportResult, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut warnings = Vec::new();
    let (mut metadata, declared) = extract_metadata(text, &mut warnings);

    let mut scene;
    if let Some(block) = mermaid_block(text) {
        let (body_type, body) = split_mermaid_header(block);
        let body_type = body_type.unwrap_or(declared.unwrap_or(options.hint));
        metadata.diagram_type = declared.unwrap_or(body_type);
        scene = Scene::with_metadata(metadata);
        match body_type {
            DiagramType::Flowchart => parse_mermaid_flowchart(body, &mut scene, &mut warnings),
            DiagramType::Sequence => parse_mermaid_sequence(body, &mut scene, &mut warnings),
        }
    } else {
        let body_type = declared.unwrap_or(options.hint);
        metadata.diagram_type = body_type;
        scene = Scene::with_metadata(metadata);
        match body_type {
            DiagramType::Flowchart => parse_behavior_flow(text, &mut scene, &mut warnings),
            DiagramType::Sequence => parse_sequence_lists(text, &mut scene, &mut warnings),
        }
    }

    if scene.is_empty() {
        warnings.push("no diagram structure recognized".to_string());
        if options.placeholder_on_empty {
            insert_placeholder(&mut scene);
            warnings.push("inserted a placeholder flow".to_string());
        }
    }

    log::debug!(
        "imported {} element(s), {} connection(s), {} warning(s)",
        scene.elements().len(),
        scene.connections().len(),
        warnings.len()
    );
    Ok(ImportResult { scene, warnings })
}

// ─── Metadata ────────────────────────────────────────────────────────────

/// Metadata from the heading and field lines, plus the diagram type if
/// the document states one.
fn extract_metadata(text: &str, warnings: &mut Vec<String>) -> (Metadata, Option<DiagramType>) {
    let mut meta = Metadata::default();
    let mut declared = None;
    let mut found = false;

    for line in text.lines().map(str::trim) {
        if let Ok((methodology, diagram, title)) = heading_line.parse(line) {
            meta.methodology = methodology.trim().to_string();
            declared = Some(DiagramType::detect(diagram));
            meta.flow_title = title.trim().to_string();
            found = true;
        } else if let Ok((name, value)) = field_line.parse(line) {
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "flow title" => meta.flow_title = value.to_string(),
                "methodology" => meta.methodology = value.to_string(),
                "diagram type" => declared = Some(DiagramType::detect(value)),
                "primary outcomes" => meta.primary_outcomes = backtick_list(value),
                "timers" => meta.timers = backtick_list(value),
                _ => continue,
            }
            found = true;
        }
    }

    if meta.flow_title.is_empty() {
        meta.flow_title = Metadata::default().flow_title;
    }
    if meta.methodology.is_empty() {
        meta.methodology = Metadata::default().methodology;
    }
    if !found {
        warnings.push("no heading or metadata fields found; using defaults".to_string());
    }
    (meta, declared)
}

/// `# BDD — Flowchart: Expense Approval`
fn heading_line<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str, &'a str)> {
    let _ = ('#', space1).parse_next(input)?;
    let methodology = take_till(1.., ['—', '–']).parse_next(input)?;
    let _ = (one_of(['—', '–']), space0).parse_next(input)?;
    let diagram = take_till(1.., ':').parse_next(input)?;
    let _ = (':', space0).parse_next(input)?;
    let title = rest.parse_next(input)?;
    Ok((methodology, diagram, title))
}

/// `**Flow Title:** Expense Approval`
fn field_line<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    let _ = "**".parse_next(input)?;
    let name = take_until(1.., ":**").parse_next(input)?;
    let _ = (":**", space0).parse_next(input)?;
    let value = rest.parse_next(input)?;
    Ok((name, value))
}

/// `` `Paid`, `Rejected` `` → `["Paid", "Rejected"]`. Falls back to
/// splitting on commas when there are no backticks.
fn backtick_list(value: &str) -> Vec<String> {
    let quoted: Vec<String> = value
        .split('`')
        .skip(1)
        .step_by(2)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if !quoted.is_empty() || value.contains('`') {
        return quoted;
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ─── Behavior Flow prose ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum FlowLine<'a> {
    Step(&'a str),
    Branch(&'a str),
    Decision(&'a str),
    Outcome(&'a str),
}

fn dash(input: &mut &str) -> ModalResult<()> {
    alt(("—", "–", "--", "-")).void().parse_next(input)
}

fn bold_title<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let title = take_until(1.., "**").parse_next(input)?;
    let _ = "**".parse_next(input)?;
    Ok(title)
}

/// `**Step 3 — Submit report**` / `**Branch A — Amount check**`
fn numbered_marker<'a>(keyword: &'static str) -> impl FnMut(&mut &'a str) -> ModalResult<&'a str> {
    move |input: &mut &'a str| {
        let _ = ("**", keyword, space1).parse_next(input)?;
        let _ = take_while(1.., |c: char| c.is_alphanumeric()).parse_next(input)?;
        let _ = (space0, dash, space0).parse_next(input)?;
        bold_title(input)
    }
}

/// `**Decision — Within budget?**`
fn decision_marker<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let _ = ("**Decision", space0, dash, space0).parse_next(input)?;
    bold_title(input)
}

/// `*Outcome →* **Paid**`
fn outcome_marker<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let _ = ("*Outcome", space0, alt(("→", "->")), "*", space0, "**").parse_next(input)?;
    bold_title(input)
}

fn flow_line<'a>(input: &mut &'a str) -> ModalResult<FlowLine<'a>> {
    alt((
        numbered_marker("Step").map(FlowLine::Step),
        numbered_marker("Branch").map(FlowLine::Branch),
        decision_marker.map(FlowLine::Decision),
        outcome_marker.map(FlowLine::Outcome),
    ))
    .parse_next(input)
}

/// Kind of a step from keywords in its title.
pub fn classify_step(title: &str) -> ElementKind {
    let lower = title.trim().to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |keys: &[&str]| words.iter().any(|w| keys.contains(w));

    if lower.contains("start") || has(&["begin"]) {
        ElementKind::Start
    } else if lower.contains("decision") || lower.ends_with('?') {
        ElementKind::Decision
    } else if has(&["sla", "review", "timer", "timeout", "wait"]) {
        ElementKind::Timer
    } else if has(&["end", "finish", "done"]) {
        ElementKind::End
    } else {
        ElementKind::Action
    }
}

/// Fill for an outcome element, by outcome name.
fn outcome_fill(name: &str) -> Swatch {
    let lower = name.to_lowercase();
    if ["paid", "approved", "scheduled", "success"]
        .iter()
        .any(|k| lower.contains(k))
    {
        Swatch::Solid(Color::rgb8(0x4c, 0xaf, 0x50))
    } else if ["rejected", "failed", "denied", "cancel"]
        .iter()
        .any(|k| lower.contains(k))
    {
        Swatch::Solid(Color::rgb8(0xf4, 0x43, 0x36))
    } else {
        Swatch::Solid(Color::rgb8(0xff, 0x98, 0x00))
    }
}

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].starts_with(' ')
}

/// Lines of the `Behavior Flow` section (an `Outcomes` heading right
/// after it counts as part of it), or `None` when there is no section.
fn behavior_section(text: &str) -> Option<Vec<&str>> {
    let mut lines = text.lines().map(str::trim);
    lines.find(|l| is_heading(l) && l.to_lowercase().contains("behavior flow"))?;
    let mut body = Vec::new();
    for line in lines {
        if is_heading(line) && !line.to_lowercase().contains("outcome") {
            break;
        }
        body.push(line);
    }
    Some(body)
}

fn parse_behavior_flow(text: &str, scene: &mut Scene, warnings: &mut Vec<String>) {
    let lines = match behavior_section(text) {
        Some(lines) => lines,
        None => {
            warnings.push("no `Behavior Flow` section found; scanning the whole document".into());
            text.lines().map(str::trim).collect()
        }
    };

    let mut column = FlowColumn::default();
    let mut previous: Option<ObjectId> = None;
    // Element outcomes attach to, with its position and outcome count.
    let mut branch: Option<(ObjectId, Point, usize)> = None;

    for line in lines {
        let line = line.strip_prefix("- ").unwrap_or(line);
        let Ok(parsed) = flow_line.parse(line) else {
            continue;
        };
        match parsed {
            FlowLine::Step(title) | FlowLine::Branch(title) | FlowLine::Decision(title) => {
                let kind = match parsed {
                    FlowLine::Step(_) => classify_step(title),
                    _ => ElementKind::Decision,
                };
                let at = column.next_step();
                let id = scene.add_element(kind, at).id;
                scene.set_label(id, title.trim());
                if let Some(prev) = previous {
                    scene.create_connection(prev, id);
                }
                previous = Some(id);
                branch = Some((id, at, 0));
            }
            FlowLine::Outcome(name) => {
                let Some((anchor, at, count)) = branch.as_mut() else {
                    warnings.push(format!("outcome `{}` has no preceding step", name.trim()));
                    continue;
                };
                let pos = column.outcome(*at, *count);
                *count += 1;
                let anchor = *anchor;
                let id = add_outcome(scene, name.trim(), pos);
                scene.create_connection(anchor, id);
            }
        }
    }
}

fn add_outcome(scene: &mut Scene, name: &str, at: Point) -> ObjectId {
    let id = scene.add_element(ElementKind::End, at).id;
    scene.set_label(id, name);
    scene.set_annotation(id, Some(name.to_string()));
    if let Some(el) = scene.element(id) {
        let mut style = el.style.clone();
        style.fill_color = outcome_fill(name);
        scene.set_style(id, style);
    }
    id
}

fn insert_placeholder(scene: &mut Scene) {
    let mut column = FlowColumn::default();
    let mut previous: Option<ObjectId> = None;
    for (kind, label) in [
        (ElementKind::Start, "Start"),
        (ElementKind::Action, "Describe the first step"),
        (ElementKind::End, "Done"),
    ] {
        let id = scene.add_element(kind, column.next_step()).id;
        scene.set_label(id, label);
        if let Some(prev) = previous {
            scene.create_connection(prev, id);
        }
        previous = Some(id);
    }
}

// ─── Mermaid ─────────────────────────────────────────────────────────────

/// Body of the first ```` ```mermaid ```` fence, if any.
fn mermaid_block(text: &str) -> Option<&str> {
    let start = text.find("```mermaid")?;
    let after = &text[start + "```mermaid".len()..];
    let body_start = after.find('\n').map_or(after.len(), |i| i + 1);
    let body = &after[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}

/// Diagram type from the first meaningful line, and the remaining body.
fn split_mermaid_header(block: &str) -> (Option<DiagramType>, &str) {
    let mut offset = 0;
    for line in block.split_inclusive('\n') {
        let trimmed = line.trim();
        offset += line.len();
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            continue;
        }
        let kind = if trimmed.starts_with("sequenceDiagram") {
            Some(DiagramType::Sequence)
        } else if trimmed.starts_with("flowchart") || trimmed.starts_with("graph") {
            Some(DiagramType::Flowchart)
        } else {
            return (None, block);
        };
        return (kind, &block[offset..]);
    }
    (None, block)
}

/// Mermaid text escapes used by the emitter.
pub(crate) fn decode_label(text: &str) -> String {
    text.replace("#quot;", "\"")
        .replace("#124;", "|")
        .replace("<br/>", "\n")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket {
    Stadium,
    Circle,
    Rhombus,
    Box,
    Round,
}

fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn bracketed<'a>(
    mut open: &'static str,
    mut close: &'static str,
) -> impl FnMut(&mut &'a str) -> ModalResult<String> {
    move |input: &mut &'a str| {
        let _ = open.parse_next(input)?;
        let text = if input.starts_with('"') {
            delimited('"', take_till(0.., '"'), '"').parse_next(input)?
        } else {
            take_until(0.., close).parse_next(input)?
        };
        let _ = close.parse_next(input)?;
        Ok(decode_label(text))
    }
}

fn node_shape(input: &mut &str) -> ModalResult<(Bracket, String)> {
    alt((
        bracketed("([", "])").map(|t| (Bracket::Stadium, t)),
        bracketed("((", "))").map(|t| (Bracket::Circle, t)),
        bracketed("{", "}").map(|t| (Bracket::Rhombus, t)),
        bracketed("[", "]").map(|t| (Bracket::Box, t)),
        bracketed("(", ")").map(|t| (Bracket::Round, t)),
    ))
    .parse_next(input)
}

#[derive(Debug, Clone, PartialEq)]
struct NodeRef<'a> {
    id: &'a str,
    shape: Option<(Bracket, String)>,
    class: Option<&'a str>,
}

fn node_ref<'a>(input: &mut &'a str) -> ModalResult<NodeRef<'a>> {
    let id = ident.parse_next(input)?;
    let shape = opt(node_shape).parse_next(input)?;
    let class = opt(preceded(":::", ident)).parse_next(input)?;
    Ok(NodeRef { id, shape, class })
}

fn edge_arrow(input: &mut &str) -> ModalResult<(LineStyle, ArrowKind)> {
    alt((
        "-.->".value((LineStyle::Dashed, ArrowKind::Arrow)),
        "-.-".value((LineStyle::Dashed, ArrowKind::None)),
        "==>".value((LineStyle::Solid, ArrowKind::Arrow)),
        "-->".value((LineStyle::Solid, ArrowKind::Arrow)),
        "---".value((LineStyle::Solid, ArrowKind::None)),
    ))
    .parse_next(input)
}

#[derive(Debug, Clone, PartialEq)]
struct EdgeHop<'a> {
    line: LineStyle,
    arrow: ArrowKind,
    label: Option<String>,
    to: NodeRef<'a>,
}

fn edge_hop<'a>(input: &mut &'a str) -> ModalResult<EdgeHop<'a>> {
    let _ = space0.parse_next(input)?;
    let (line, arrow) = edge_arrow.parse_next(input)?;
    let label = opt(delimited('|', take_till(0.., '|'), '|'))
        .map(|l: Option<&str>| l.map(decode_label))
        .parse_next(input)?;
    let _ = space0.parse_next(input)?;
    let to = node_ref.parse_next(input)?;
    Ok(EdgeHop {
        line,
        arrow,
        label,
        to,
    })
}

/// `A(["Start"]):::start --> B["Review"]:::timer -.->|late| C`
fn flowchart_line<'a>(input: &mut &'a str) -> ModalResult<(NodeRef<'a>, Vec<EdgeHop<'a>>)> {
    let first = node_ref.parse_next(input)?;
    let mut hops = Vec::new();
    while let Some(hop) = opt(edge_hop).parse_next(input)? {
        hops.push(hop);
    }
    let _ = (space0, opt(';')).parse_next(input)?;
    if !input.is_empty() {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    Ok((first, hops))
}

#[derive(Debug, Default)]
struct PendingNode {
    label: Option<String>,
    bracket: Option<Bracket>,
    class: Option<ElementKind>,
}

#[derive(Debug)]
struct PendingEdge {
    from: usize,
    to: usize,
    line: LineStyle,
    arrow: ArrowKind,
    label: Option<String>,
}

fn parse_mermaid_flowchart(body: &str, scene: &mut Scene, warnings: &mut Vec<String>) {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut names: Vec<String> = Vec::new();
    let mut nodes: Vec<PendingNode> = Vec::new();
    let mut edges: Vec<PendingEdge> = Vec::new();
    let mut outcomes: Vec<(String, String)> = Vec::new();

    let mut touch = |r: &NodeRef<'_>, nodes: &mut Vec<PendingNode>, warnings: &mut Vec<String>| {
        let i = *index.entry(r.id.to_string()).or_insert_with(|| {
            names.push(r.id.to_string());
            nodes.push(PendingNode::default());
            nodes.len() - 1
        });
        let node = &mut nodes[i];
        if let Some((bracket, label)) = &r.shape {
            node.bracket = Some(*bracket);
            node.label = Some(label.clone());
        }
        if let Some(class) = r.class {
            match ElementKind::from_name(class) {
                Some(kind) => node.class = Some(kind),
                None => warnings.push(format!("unknown node class `{class}` on `{}`", r.id)),
            }
        }
        i
    };

    for line in body.lines().map(str::trim) {
        if let Some(tag) = line.strip_prefix("%% outcome ")
            && let Some((node, outcome)) = tag.split_once(':')
        {
            outcomes.push((node.trim().to_string(), outcome.trim().to_string()));
            continue;
        }
        if line.is_empty()
            || line.starts_with("%%")
            || line.starts_with("classDef")
            || line.starts_with("class ")
            || line.starts_with("style ")
            || line.starts_with("linkStyle")
        {
            continue;
        }
        let Ok((first, hops)) = flowchart_line.parse_next(&mut &*line) else {
            warnings.push(format!("skipped mermaid line `{line}`"));
            continue;
        };
        let mut from = touch(&first, &mut nodes, warnings);
        for hop in hops {
            let to = touch(&hop.to, &mut nodes, warnings);
            edges.push(PendingEdge {
                from,
                to,
                line: hop.line,
                arrow: hop.arrow,
                label: hop.label,
            });
            from = to;
        }
    }

    let positions = layout::layered_positions(
        nodes.len(),
        &edges.iter().map(|e| (e.from, e.to)).collect::<Vec<_>>(),
    );

    let mut ids = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let has_out = edges.iter().any(|e| e.from == i);
        let has_in = edges.iter().any(|e| e.to == i);
        let kind = node.class.unwrap_or(match node.bracket {
            Some(Bracket::Stadium) if has_in && !has_out => ElementKind::End,
            Some(Bracket::Stadium) => ElementKind::Start,
            Some(Bracket::Rhombus) => ElementKind::Decision,
            Some(Bracket::Circle) => ElementKind::Timer,
            _ => ElementKind::Action,
        });
        let id = scene.add_element(kind, positions[i]).id;
        let label = node.label.clone().unwrap_or_else(|| names[i].clone());
        scene.set_label(id, &label);
        ids.push(id);
    }

    for (node, outcome) in outcomes {
        match index.get(&node) {
            Some(&i) => {
                scene.set_annotation(ids[i], Some(outcome));
            }
            None => warnings.push(format!("outcome tag on unknown node `{node}`")),
        }
    }

    for edge in edges {
        if edge.from == edge.to {
            warnings.push(format!("skipped self-loop on `{}`", names[edge.from]));
            continue;
        }
        let Some(conn) = scene.create_connection(ids[edge.from], ids[edge.to]).map(|c| c.id)
        else {
            continue;
        };
        scene.set_connection_line(conn, edge.line, edge.arrow);
        if let Some(label) = edge.label {
            scene.set_connection_label(conn, &label);
        }
    }
}

// ─── Sequence diagrams ───────────────────────────────────────────────────

/// Participants and messages collected before layout.
#[derive(Debug, Default)]
struct SequenceBuilder {
    participants: Vec<String>,
    aliases: HashMap<String, usize>,
    messages: Vec<(usize, usize, String)>,
    notes: Vec<(usize, String)>,
}

impl SequenceBuilder {
    fn participant(&mut self, key: &str, name: &str) -> usize {
        if let Some(i) = self.aliases.get(key) {
            return *i;
        }
        self.participants.push(name.to_string());
        let i = self.participants.len() - 1;
        self.aliases.insert(key.to_string(), i);
        i
    }

    fn message(&mut self, from: &str, to: &str, text: &str) {
        let a = self.participant(from, from);
        let b = self.participant(to, to);
        self.messages.push((a, b, text.trim().to_string()));
    }

    fn build(self, scene: &mut Scene) {
        let height = layout::lifeline_height(self.messages.len());
        let mut centers = Vec::with_capacity(self.participants.len());
        for (i, name) in self.participants.iter().enumerate() {
            let at = layout::participant_position(i);
            let id = scene.add_element(ElementKind::Participant, at).id;
            scene.set_label(id, name);
            let width = scene.element(id).map_or(120.0, |e| e.width());
            let center_x = at.x + width / 2.0;
            let line = scene
                .add_element(ElementKind::Lifeline, Point::new(center_x - 1.0, layout::LIFELINE_TOP))
                .id;
            scene.resize_element(line, 2.0, height);
            centers.push(center_x);
        }

        for (row, (from, to, text)) in self.messages.iter().enumerate() {
            let (x1, x2) = (centers[*from], centers[*to]);
            let y = layout::message_y(row);
            let (x, width) = if from == to {
                (x1, SELF_MESSAGE_WIDTH)
            } else {
                (x1.min(x2), (x2 - x1).abs())
            };
            let id = scene.add_element(ElementKind::Message, Point::new(x, y)).id;
            scene.resize_element(id, width, 20.0);
            scene.set_label(id, text);
            if x2 < x1
                && let Some(el) = scene.element(id)
            {
                let mut style = el.style.clone();
                style.rotation = 180.0;
                scene.set_style(id, style);
            }
        }

        for (row, (who, text)) in self.notes.iter().enumerate() {
            let x = centers[*who] + 10.0;
            let y = layout::message_y(self.messages.len() + row);
            let id = scene.add_element(ElementKind::Note, Point::new(x, y)).id;
            scene.set_label(id, text);
        }
    }
}

/// Width of a message from a participant to itself.
pub const SELF_MESSAGE_WIDTH: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
enum SequenceLine<'a> {
    Participant { key: &'a str, name: &'a str },
    Message { from: &'a str, to: &'a str, text: &'a str },
    Note { over: &'a str, text: &'a str },
}

fn participant_line<'a>(input: &mut &'a str) -> ModalResult<SequenceLine<'a>> {
    let _ = (alt(("participant", "actor")), space1).parse_next(input)?;
    let key = ident.parse_next(input)?;
    let alias = opt(preceded((space1, "as", space1), rest)).parse_next(input)?;
    Ok(SequenceLine::Participant {
        key,
        name: alias.map_or(key, str::trim),
    })
}

fn message_line<'a>(input: &mut &'a str) -> ModalResult<SequenceLine<'a>> {
    let from = ident.parse_next(input)?;
    let _ = space0.parse_next(input)?;
    let _ = alt(("-->>", "->>", "--x", "-x", "--)", "-)", "-->", "->")).parse_next(input)?;
    let _ = opt(one_of(['+', '-'])).parse_next(input)?;
    let _ = space0.parse_next(input)?;
    let to = ident.parse_next(input)?;
    let _ = (space0, ':', space0).parse_next(input)?;
    let text = rest.parse_next(input)?;
    Ok(SequenceLine::Message { from, to, text })
}

fn note_line<'a>(input: &mut &'a str) -> ModalResult<SequenceLine<'a>> {
    let _ = (
        alt(("Note", "note")),
        space1,
        alt(("over", "right of", "left of")),
        space1,
    )
        .parse_next(input)?;
    let over = ident.parse_next(input)?;
    let _ = (take_till(0.., ':'), ':', space0).parse_next(input)?;
    let text = rest.parse_next(input)?;
    Ok(SequenceLine::Note { over, text })
}

fn sequence_line<'a>(input: &mut &'a str) -> ModalResult<SequenceLine<'a>> {
    alt((participant_line, note_line, message_line)).parse_next(input)
}

fn parse_mermaid_sequence(body: &str, scene: &mut Scene, warnings: &mut Vec<String>) {
    let mut builder = SequenceBuilder::default();
    for line in body.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("%%") || line == "end" {
            continue;
        }
        match sequence_line.parse(line) {
            Ok(SequenceLine::Participant { key, name }) => {
                builder.participant(key, name);
            }
            Ok(SequenceLine::Message { from, to, text }) => builder.message(from, to, text),
            Ok(SequenceLine::Note { over, text }) => {
                let who = builder.participant(over, over);
                builder.notes.push((who, decode_label(text)));
            }
            Err(_) => warnings.push(format!("skipped mermaid line `{line}`")),
        }
    }
    builder.build(scene);
}

/// `- Alice -> Bob: hello`
fn list_message<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str, &'a str)> {
    let _ = ("-", space0).parse_next(input)?;
    let from = take_until(1.., "->").parse_next(input)?;
    let _ = "->".parse_next(input)?;
    let to = take_till(1.., ':').parse_next(input)?;
    let _ = ':'.parse_next(input)?;
    let text = rest.parse_next(input)?;
    Ok((from.trim(), to.trim(), text))
}

fn parse_sequence_lists(text: &str, scene: &mut Scene, warnings: &mut Vec<String>) {
    #[derive(PartialEq)]
    enum List {
        None,
        Participants,
        Messages,
    }

    let mut builder = SequenceBuilder::default();
    let mut list = List::None;
    for line in text.lines().map(str::trim) {
        let lower = line.to_lowercase();
        if lower.starts_with("participants:") {
            list = List::Participants;
        } else if lower.starts_with("messages:") {
            list = List::Messages;
        } else if let Some(item) = line.strip_prefix("- ") {
            match list {
                List::Participants => {
                    let name = item.trim();
                    builder.participant(name, name);
                }
                List::Messages => match list_message.parse(line) {
                    Ok((from, to, text)) => builder.message(from, to, text),
                    Err(_) => warnings.push(format!("skipped message `{item}`")),
                },
                List::None => {}
            }
        } else if !line.is_empty() {
            list = List::None;
        }
    }
    builder.build(scene);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds_and_labels(scene: &Scene) -> Vec<(ElementKind, String)> {
        scene
            .elements()
            .iter()
            .map(|e| (e.kind, e.label.clone()))
            .collect()
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = parse_markdown("  \n\t", &ParseOptions::default()).unwrap_err();
        assert_eq!(err, ParseError::Empty);
    }

    #[test]
    fn heading_and_fields() {
        let md = "# TDD — Sequence Diagram: Checkout\n\
                  **Primary Outcomes:** `Paid`, `Declined`\n\
                  **Timers:** `Payment SLA`\n";
        let result = parse_markdown(md, &ParseOptions::default()).unwrap();
        let meta = &result.scene.metadata;
        assert_eq!(meta.methodology, "TDD");
        assert_eq!(meta.flow_title, "Checkout");
        assert_eq!(meta.diagram_type, DiagramType::Sequence);
        assert_eq!(meta.primary_outcomes, vec!["Paid", "Declined"]);
        assert_eq!(meta.timers, vec!["Payment SLA"]);
    }

    #[test]
    fn two_steps_make_one_connection() {
        let md = "### Behavior Flow\n\
                  **Step 1 — Start request**\n\
                  **Step 2 — Fill in form**\n";
        let result = parse_markdown(md, &ParseOptions::default()).unwrap();
        let scene = &result.scene;
        assert_eq!(
            kinds_and_labels(scene),
            vec![
                (ElementKind::Start, "Start request".to_string()),
                (ElementKind::Action, "Fill in form".to_string()),
            ]
        );
        assert_eq!(scene.connections().len(), 1);
        let conn = &scene.connections()[0];
        assert_eq!(conn.start_element_id, scene.elements()[0].id);
        assert_eq!(conn.end_element_id, scene.elements()[1].id);
    }

    #[test]
    fn decisions_fan_out_to_outcomes() {
        let md = "## Behavior Flow\n\
                  **Step 1 — Submit expense**\n\
                  **Decision — Within budget?**\n\
                  *Outcome →* **Approved**\n\
                  *Outcome →* **Rejected**\n\
                  **Step 2 — Notify finance**\n\
                  ## Appendix\n\
                  **Step 9 — Ignored**\n";
        let result = parse_markdown(md, &ParseOptions::default()).unwrap();
        let scene = &result.scene;
        let kinds: Vec<ElementKind> = scene.elements().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Action,
                ElementKind::Decision,
                ElementKind::End,
                ElementKind::End,
                ElementKind::Action,
            ]
        );
        let decision = scene.elements()[1].id;
        let from_decision = scene
            .connections()
            .iter()
            .filter(|c| c.start_element_id == decision)
            .count();
        // Two outcomes plus the next step.
        assert_eq!(from_decision, 3);
        assert_eq!(scene.elements()[2].annotation.as_deref(), Some("Approved"));
        assert_eq!(
            scene.elements()[3].style.fill_color,
            Swatch::Solid(Color::rgb8(0xf4, 0x43, 0x36))
        );
        // Outcomes sit right of the decision; the next step clears them.
        let d = scene.elements()[1].position();
        assert_eq!(scene.elements()[2].position(), Point::new(d.x + 300.0, d.y));
        assert_eq!(scene.elements()[3].position(), Point::new(d.x + 300.0, d.y + 80.0));
        assert_eq!(scene.elements()[4].position().y, d.y + 80.0 + 150.0);
    }

    #[test]
    fn step_keywords() {
        assert_eq!(classify_step("Start onboarding"), ElementKind::Start);
        assert_eq!(classify_step("Is manager available?"), ElementKind::Decision);
        assert_eq!(classify_step("Manager review (48h SLA)"), ElementKind::Timer);
        assert_eq!(classify_step("End of flow"), ElementKind::End);
        assert_eq!(classify_step("Send reminder"), ElementKind::Action);
        assert_eq!(classify_step("Restart payment"), ElementKind::Start);
    }

    #[test]
    fn unrecognized_document_is_empty_with_warnings() {
        let md = "Just some notes about the process.";
        let result = parse_markdown(md, &ParseOptions::default()).unwrap();
        assert!(result.is_empty());
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w == "no diagram structure recognized")
        );

        let opts = ParseOptions {
            placeholder_on_empty: true,
            ..ParseOptions::default()
        };
        let result = parse_markdown(md, &opts).unwrap();
        assert_eq!(result.scene.elements().len(), 3);
        assert_eq!(result.scene.connections().len(), 2);
    }

    #[test]
    fn mermaid_flowchart_with_classes_and_labels() {
        let md = "```mermaid\n\
                  flowchart TD\n\
                  %% comment\n\
                  A([\"Begin\"]):::start --> B{\"Ok?\"}\n\
                  B -->|yes| C([Done])\n\
                  B -.->|no| D[\"Fix #quot;it#quot;\"]:::note\n\
                  D --- B\n\
                  ```\n";
        let result = parse_markdown(md, &ParseOptions::default()).unwrap();
        let scene = &result.scene;
        assert_eq!(
            kinds_and_labels(scene),
            vec![
                (ElementKind::Start, "Begin".to_string()),
                (ElementKind::Decision, "Ok?".to_string()),
                (ElementKind::End, "Done".to_string()),
                (ElementKind::Note, "Fix \"it\"".to_string()),
            ]
        );
        assert_eq!(scene.connections().len(), 4);
        let dashed = &scene.connections()[2];
        assert_eq!(dashed.label, "no");
        assert_eq!(dashed.line_style, LineStyle::Dashed);
        assert_eq!(scene.connections()[3].arrow_kind, ArrowKind::None);
        assert!(result.warnings.is_empty() || result.warnings[0].starts_with("no heading"));
    }

    #[test]
    fn mermaid_sequence_builds_lifelines_and_messages() {
        let md = "```mermaid\n\
                  sequenceDiagram\n\
                  participant C as Customer\n\
                  participant S as Shop\n\
                  C->>+S: order\n\
                  S-->>C: receipt\n\
                  Note over S: packs the box\n\
                  ```\n";
        let result = parse_markdown(md, &ParseOptions::default()).unwrap();
        let scene = &result.scene;
        assert_eq!(scene.metadata.diagram_type, DiagramType::Sequence);
        let count = |k: ElementKind| scene.elements().iter().filter(|e| e.kind == k).count();
        assert_eq!(count(ElementKind::Participant), 2);
        assert_eq!(count(ElementKind::Lifeline), 2);
        assert_eq!(count(ElementKind::Message), 2);
        assert_eq!(count(ElementKind::Note), 1);
        let reply = scene
            .elements()
            .iter()
            .find(|e| e.label == "receipt")
            .unwrap();
        assert_eq!(reply.style.rotation, 180.0);
        assert_eq!(reply.width(), 150.0);
    }

    #[test]
    fn sequence_lists() {
        let md = "participants:\n- Alice\n- Bob\n\nmessages:\n- Alice -> Bob: hi\n- Bob -> Bob: think\n";
        let result = parse_markdown(md, &ParseOptions::with_hint(DiagramType::Sequence)).unwrap();
        let scene = &result.scene;
        let messages: Vec<&str> = scene
            .elements()
            .iter()
            .filter(|e| e.kind == ElementKind::Message)
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(messages, vec!["hi", "think"]);
        let own = scene.elements().iter().find(|e| e.label == "think").unwrap();
        assert_eq!(own.width(), SELF_MESSAGE_WIDTH);
    }

    #[test]
    fn line_parsers() {
        assert_eq!(
            flow_line.parse("**Branch B — Validation: receipt**").ok(),
            Some(FlowLine::Branch("Validation: receipt"))
        );
        assert_eq!(
            flow_line.parse("*Outcome ->* **Paid**").ok(),
            Some(FlowLine::Outcome("Paid"))
        );
        assert!(flow_line.parse("**Flow Title:** x").is_err());
        assert_eq!(backtick_list("a, b ,c"), vec!["a", "b", "c"]);
    }
}
