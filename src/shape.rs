//! Loop shapes and the per-shape element strategy.
//!
//! The three canonical shapes share one traversal; only what counts as a
//! "loop element" differs between them. That difference is a tag plus a few
//! dispatch methods on [`LoopDescriptor`], not a class hierarchy:
//!
//! - `Counted`: elements are subscripted accesses `base[i]` under the
//!   iteration variable;
//! - `IteratorRange`: elements are dereferences `*it` of the iterator;
//! - `ElementRange`: the loop variable itself is the element, writable only
//!   when bound by reference.

use crate::canon::{self, ElementAccess};
use crate::patterns::ELEMENT_PREFIX;
use crate::tree::{DeclId, Node, NodeId, OverloadedOp, Program, UnaryOp};
use serde::Serialize;

/// Candidate loop as matched by the host's structural pre-filter. The
/// normalizer validates header identity and turns this into a
/// [`LoopDescriptor`].
#[derive(Debug, Clone)]
pub enum CandidateLoop {
    /// `for (T i = start; i < end; ++i) body`
    Counted {
        loop_id: NodeId,
        init_var: DeclId,
        cond_var: DeclId,
        inc_var: DeclId,
        start: NodeId,
        end: NodeId,
        body: NodeId,
    },
    /// `for (it = c.begin(); it != c.end(); ++it) body`
    IteratorRange {
        loop_id: NodeId,
        init_var: DeclId,
        cond_var: DeclId,
        inc_var: DeclId,
        container: DeclId,
        container_expr: NodeId,
        body: NodeId,
    },
    /// `for (T x : c) body`
    ElementRange {
        loop_id: NodeId,
        loop_var: DeclId,
        container: DeclId,
        container_expr: NodeId,
        body: NodeId,
    },
}

impl CandidateLoop {
    pub fn loop_id(&self) -> NodeId {
        match self {
            CandidateLoop::Counted { loop_id, .. }
            | CandidateLoop::IteratorRange { loop_id, .. }
            | CandidateLoop::ElementRange { loop_id, .. } => *loop_id,
        }
    }

    pub fn body(&self) -> NodeId {
        match self {
            CandidateLoop::Counted { body, .. }
            | CandidateLoop::IteratorRange { body, .. }
            | CandidateLoop::ElementRange { body, .. } => *body,
        }
    }
}

/// Shape tag with the shape-specific header facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopShape {
    Counted {
        start: NodeId,
        end: NodeId,
    },
    IteratorRange {
        container: DeclId,
        container_expr: NodeId,
    },
    ElementRange {
        container: DeclId,
        container_expr: NodeId,
    },
}

/// A recognized per-iteration element expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementForm {
    /// `base[i]` in a counted loop (any spelling, canonicalized).
    Indexed(ElementAccess),
    /// `*it` in an iterator loop; `var_node` is the iterator reference.
    IteratorDeref { var_node: NodeId },
    /// The range element variable itself, bound by reference.
    ByRefElement { var_node: NodeId },
}

/// Canonicalized loop header. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopDescriptor {
    pub loop_id: NodeId,
    pub shape: LoopShape,
    /// Iteration variable identity (counter, iterator, or range element).
    pub induction: DeclId,
    pub body: NodeId,
}

impl LoopDescriptor {
    /// Literal `[start, end)` bounds of a counted loop. `None` for symbolic
    /// bounds or non-counted shapes.
    pub fn literal_bounds(&self, p: &Program) -> Option<(i64, i64)> {
        match self.shape {
            LoopShape::Counted { start, end } => {
                Some((p.int_literal(start)?, p.int_literal(end)?))
            }
            _ => None,
        }
    }

    /// Statically known trip count, when the bounds are literal.
    pub fn trip_count(&self, p: &Program) -> Option<u64> {
        let (start, end) = self.literal_bounds(p)?;
        Some(end.saturating_sub(start).max(0) as u64)
    }

    /// The container the loop traverses, for shapes that have one in the
    /// header. Counted loops name their containers at each write instead.
    pub fn container(&self) -> Option<DeclId> {
        match self.shape {
            LoopShape::Counted { .. } => None,
            LoopShape::IteratorRange { container, .. }
            | LoopShape::ElementRange { container, .. } => Some(container),
        }
    }

    /// Header expression referring to the container, used as the map output
    /// for iterator and element-range loops.
    pub fn container_expr(&self) -> Option<NodeId> {
        match self.shape {
            LoopShape::Counted { .. } => None,
            LoopShape::IteratorRange { container_expr, .. }
            | LoopShape::ElementRange { container_expr, .. } => Some(container_expr),
        }
    }

    /// Shape-specific recognition of a *writable* element expression.
    ///
    /// This is the structural half of the decision; counted-loop element
    /// accesses still have to pass the subscript tracker before they count.
    pub fn element_form(&self, p: &Program, expr: NodeId) -> Option<ElementForm> {
        let stripped = p.strip(expr);
        match self.shape {
            LoopShape::Counted { .. } => {
                canon::as_element_access(p, stripped).map(ElementForm::Indexed)
            }
            LoopShape::IteratorRange { .. } => {
                let operand = match p.node(stripped) {
                    Node::Unary { op: UnaryOp::Deref, expr } => *expr,
                    Node::OpCall { op: OverloadedOp::Deref, args } if args.len() == 1 => args[0],
                    _ => return None,
                };
                let operand = p.strip(operand);
                match p.node(operand) {
                    Node::VarRef(d) if *d == self.induction => {
                        Some(ElementForm::IteratorDeref { var_node: operand })
                    }
                    _ => None,
                }
            }
            LoopShape::ElementRange { .. } => match p.node(stripped) {
                Node::VarRef(d)
                    if *d == self.induction && p.is_reference(p.decl(*d).ty) =>
                {
                    Some(ElementForm::ByRefElement { var_node: stripped })
                }
                _ => None,
            },
        }
    }

    /// Parameter label for an element expression in the emitted plan.
    pub fn element_label(&self, p: &Program, expr: NodeId) -> Option<String> {
        let decl = match p.node(p.strip(expr)) {
            Node::VarRef(d) => Some(*d),
            _ => canon::base_decl(p, expr),
        }?;
        Some(format!("{}{}", ELEMENT_PREFIX, p.decl(decl).name))
    }
}
