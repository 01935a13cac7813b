//! Turns a laid-out AST into flat geometry records: one labeled box per
//! node and one line segment per parent→kid edge, on a pixel grid derived
//! from the lattice coordinates. The rasterizer consumes these records and
//! owns every remaining pixel decision.

use crate::ast::Ast;
use crate::layout::Layout;

pub const NODE_WIDTH: i32 = 80;
pub const NODE_HEIGHT: i32 = 30;
pub const HORIZONTAL_SEP: i32 = 10;
pub const VERTICAL_SEP: i32 = 50;

/// Pixel stride between neighboring offsets / depths.
pub const HSTEP: i32 = NODE_WIDTH + HORIZONTAL_SEP;
pub const VSTEP: i32 = NODE_HEIGHT + VERTICAL_SEP;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeShape {
    pub label: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A straight edge from the bottom-center of a parent to the top-center of
/// one of its kids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub width: i32,
    pub height: i32,
    pub nodes: Vec<NodeShape>,
    pub edges: Vec<Edge>,
}

/// Emit geometry for every node in placement order. `counts` is the
/// per-depth census from the count pass and sizes the canvas vertically.
pub fn diagram(ast: &Ast, layout: &Layout, counts: &[usize]) -> Diagram {
    let width = (layout.max_offset() + 1) * HSTEP;
    let height = counts.len() as i32 * VSTEP;

    let mut nodes = Vec::with_capacity(layout.len());
    let mut edges = Vec::new();

    for (id, position) in layout.iter() {
        let x = position.offset * HSTEP + HORIZONTAL_SEP / 2;
        let y = position.depth * VSTEP + VERTICAL_SEP / 2;

        for &kid in ast.kids(id) {
            let kid_position = layout.position(kid);
            let kid_x = kid_position.offset * HSTEP + HORIZONTAL_SEP / 2;
            let kid_y = kid_position.depth * VSTEP + VERTICAL_SEP / 2;
            edges.push(Edge {
                x1: x + NODE_WIDTH / 2,
                y1: y + NODE_HEIGHT,
                x2: kid_x + NODE_WIDTH / 2,
                y2: kid_y,
            });
        }

        nodes.push(NodeShape {
            label: ast.label(id),
            x,
            y,
            width: NODE_WIDTH,
            height: NODE_HEIGHT,
        });
    }

    Diagram {
        width,
        height,
        nodes,
        edges,
    }
}
