//! Placement grids for imported diagrams.
//!
//! Imports never carry coordinates, so every element is placed here:
//! prose flows on a single top-down column with outcomes to the right,
//! mermaid flowcharts on a layered grid derived from the edge structure,
//! sequence diagrams on a participant row with messages stacked below.

use crate::geometry::Point;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::VecDeque;

// ─── Prose column ────────────────────────────────────────────────────────

/// X of the main column of a prose flow.
pub const FLOW_X: f64 = 200.0;
/// Y of the first step.
pub const FLOW_TOP: f64 = 100.0;
/// Vertical distance between consecutive steps.
pub const STEP_SPACING: f64 = 150.0;
/// Horizontal offset of outcomes from their decision.
pub const OUTCOME_OFFSET_X: f64 = 300.0;
/// Vertical distance between outcomes of one decision.
pub const OUTCOME_SPACING: f64 = 80.0;

/// Column cursor for prose imports.
#[derive(Debug, Clone)]
pub struct FlowColumn {
    next_y: f64,
}

impl Default for FlowColumn {
    fn default() -> Self {
        Self { next_y: FLOW_TOP }
    }
}

impl FlowColumn {
    /// Position for the next step, advancing the cursor.
    pub fn next_step(&mut self) -> Point {
        let p = Point::new(FLOW_X, self.next_y);
        self.next_y += STEP_SPACING;
        p
    }

    /// Position of the `index`-th outcome hanging off an element at `anchor`.
    /// Pushes the cursor down so the next step clears the outcome stack.
    pub fn outcome(&mut self, anchor: Point, index: usize) -> Point {
        let y = anchor.y + OUTCOME_SPACING * index as f64;
        self.next_y = self.next_y.max(y + STEP_SPACING);
        Point::new(anchor.x + OUTCOME_OFFSET_X, y)
    }
}

// ─── Layered grid ────────────────────────────────────────────────────────

pub const LAYER_X: f64 = 100.0;
pub const LAYER_TOP: f64 = 100.0;
pub const COLUMN_SPACING: f64 = 220.0;
pub const ROW_SPACING: f64 = 150.0;

/// Top-left positions for `count` nodes joined by `edges` (index pairs).
///
/// Each node sits on the row of its breadth-first distance from the
/// nearest root (a node with no incoming edges, in index order). Nodes a
/// root cannot reach start their own search. Within a row, nodes keep
/// their index order.
pub fn layered_positions(count: usize, edges: &[(usize, usize)]) -> Vec<Point> {
    let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(count, edges.len());
    let nodes: Vec<NodeIndex> = (0..count).map(|_| graph.add_node(())).collect();
    for &(a, b) in edges {
        if a < count && b < count && a != b {
            graph.add_edge(nodes[a], nodes[b], ());
        }
    }

    let mut rank: Vec<Option<usize>> = vec![None; count];
    let roots = nodes
        .iter()
        .copied()
        .filter(|n| graph.neighbors_directed(*n, Direction::Incoming).next().is_none());
    let seeds: Vec<NodeIndex> = roots.chain(nodes.iter().copied()).collect();

    for seed in seeds {
        if rank[seed.index()].is_some() {
            continue;
        }
        rank[seed.index()] = Some(0);
        let mut queue = VecDeque::from([seed]);
        while let Some(n) = queue.pop_front() {
            let r = rank[n.index()].unwrap_or(0);
            for next in graph.neighbors_directed(n, Direction::Outgoing) {
                if rank[next.index()].is_none() {
                    rank[next.index()] = Some(r + 1);
                    queue.push_back(next);
                }
            }
        }
    }

    let mut columns_used: Vec<usize> = Vec::new();
    rank.iter()
        .map(|r| {
            let row = r.unwrap_or(0);
            if columns_used.len() <= row {
                columns_used.resize(row + 1, 0);
            }
            let col = columns_used[row];
            columns_used[row] += 1;
            Point::new(
                LAYER_X + COLUMN_SPACING * col as f64,
                LAYER_TOP + ROW_SPACING * row as f64,
            )
        })
        .collect()
}

// ─── Sequence row ────────────────────────────────────────────────────────

pub const PARTICIPANT_X: f64 = 100.0;
pub const PARTICIPANT_Y: f64 = 50.0;
pub const PARTICIPANT_SPACING: f64 = 150.0;
pub const LIFELINE_TOP: f64 = 90.0;
pub const MESSAGE_TOP: f64 = 150.0;
pub const MESSAGE_SPACING: f64 = 40.0;
/// Minimum lifeline length.
pub const LIFELINE_MIN_HEIGHT: f64 = 400.0;

/// Top-left of the `index`-th participant box.
pub fn participant_position(index: usize) -> Point {
    Point::new(
        PARTICIPANT_X + PARTICIPANT_SPACING * index as f64,
        PARTICIPANT_Y,
    )
}

/// Y of the `index`-th message row.
pub fn message_y(index: usize) -> f64 {
    MESSAGE_TOP + MESSAGE_SPACING * index as f64
}

/// Lifeline length that clears `messages` rows.
pub fn lifeline_height(messages: usize) -> f64 {
    (message_y(messages) - LIFELINE_TOP + MESSAGE_SPACING).max(LIFELINE_MIN_HEIGHT)
}
