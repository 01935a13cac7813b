//! Tidy-tree layout on an integer lattice.
//!
//! Two passes over the AST: a count pass that sizes each depth, and an
//! offset pass that assigns every node a `(offset, depth)` coordinate.
//! Nodes at the same depth end up at least 2 apart, and a parent sits at the
//! truncating midpoint of its first and last kids; when that midpoint would
//! collide with an already-placed node, the whole subtree is shifted right.

use crate::ast::{Ast, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: i32,
    pub depth: i32,
}

/// Number of nodes at each depth; index is the depth, so the length is one
/// more than the maximum depth.
pub fn node_counts(ast: &Ast) -> Vec<usize> {
    let mut counts = Vec::new();
    count_node(ast, ast.root(), 0, &mut counts);
    counts
}

fn count_node(ast: &Ast, id: NodeId, depth: usize, counts: &mut Vec<usize>) {
    if counts.len() <= depth {
        counts.resize(depth + 1, 0);
    }
    counts[depth] += 1;
    for &kid in ast.kids(id) {
        count_node(ast, kid, depth + 1, counts);
    }
}

/// The finished coordinate assignment: a position per node, plus the order
/// in which nodes were placed (post-order), which the draw pass follows.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    positions: Vec<Position>,
    order: Vec<NodeId>,
}

impl Layout {
    pub fn of(ast: &Ast) -> Self {
        let mut pass = OffsetPass {
            next_available: Vec::new(),
            positions: vec![Position { offset: 0, depth: 0 }; ast.len()],
            order: Vec::with_capacity(ast.len()),
        };
        pass.place(ast, ast.root(), 0);
        Self {
            positions: pass.positions,
            order: pass.order,
        }
    }

    pub fn position(&self, id: NodeId) -> Position {
        self.positions[id.index()]
    }

    /// Nodes in placement order, kids before parents.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Position)> + '_ {
        self.order.iter().map(|&id| (id, self.position(id)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn max_offset(&self) -> i32 {
        self.order
            .iter()
            .map(|&id| self.position(id).offset)
            .max()
            .unwrap_or(0)
    }
}

struct OffsetPass {
    next_available: Vec<i32>,
    positions: Vec<Position>,
    order: Vec<NodeId>,
}

impl OffsetPass {
    fn available_slot(&mut self, depth: usize) -> &mut i32 {
        if self.next_available.len() <= depth {
            self.next_available.resize(depth + 1, 0);
        }
        &mut self.next_available[depth]
    }

    fn place(&mut self, ast: &Ast, id: NodeId, depth: usize) {
        for &kid in ast.kids(id) {
            self.place(ast, kid, depth + 1);
        }

        let kids = ast.kids(id);
        if kids.is_empty() {
            let slot = self.available_slot(depth);
            let offset = *slot;
            *slot += 2;
            self.positions[id.index()] = Position {
                offset,
                depth: depth as i32,
            };
            self.order.push(id);
            return;
        }

        let first = self.positions[kids[0].index()].offset;
        let last = self.positions[kids[kids.len() - 1].index()].offset;
        let desired = (first + last) / 2;
        self.positions[id.index()] = Position {
            offset: desired,
            depth: depth as i32,
        };
        self.order.push(id);

        let available = *self.available_slot(depth);
        if desired < available {
            self.shift_subtree(ast, id, depth, available - desired);
        } else {
            *self.available_slot(depth) = desired + 2;
        }
    }

    /// Move a placed subtree right by `shift`, keeping every depth's next
    /// available slot ahead of the nodes moved through it.
    fn shift_subtree(&mut self, ast: &Ast, id: NodeId, depth: usize, shift: i32) {
        for &kid in ast.kids(id) {
            self.shift_subtree(ast, kid, depth + 1, shift);
        }
        self.positions[id.index()].offset += shift;
        let adjusted = self.positions[id.index()].offset;
        let slot = self.available_slot(depth);
        if *slot < adjusted + 2 {
            *slot = adjusted + 2;
        }
    }
}
