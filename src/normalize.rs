//! Loop normalization.
//!
//! Candidates arrive pre-matched by the host, but two things are still
//! checked here before any analysis runs: the header must use one and the
//! same variable in its init/condition/increment positions, and the body
//! must stay inside the restricted statement language (no early exits, no
//! chained assignments, no bare dereference of a binary operator). A failed
//! check is a structural skip, not a safety finding: the loop is simply not
//! analyzed.

use crate::canon;
use crate::shape::{CandidateLoop, LoopDescriptor, LoopShape};
use crate::tree::{Node, NodeId, Program, UnaryOp};
use log::debug;
use thiserror::Error;

/// Why a candidate was skipped without analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Init/condition/increment do not all name the same variable.
    #[error("loop header variables do not agree")]
    HeaderMismatch,

    /// The body contains a construct outside the restricted language.
    #[error("loop body contains a restricted construct")]
    RestrictedBody,
}

/// String bridge for hosts that funnel skip reasons into plain text.
impl From<NormalizeError> for String {
    fn from(err: NormalizeError) -> Self {
        err.to_string()
    }
}

/// Validate a candidate and build its descriptor.
pub fn normalize(p: &Program, cand: &CandidateLoop) -> Result<LoopDescriptor, NormalizeError> {
    let desc = match *cand {
        CandidateLoop::Counted {
            loop_id,
            init_var,
            cond_var,
            inc_var,
            start,
            end,
            body,
        } => {
            if init_var != cond_var || init_var != inc_var {
                debug!("skipping counted loop: header variables differ");
                return Err(NormalizeError::HeaderMismatch);
            }
            LoopDescriptor {
                loop_id,
                shape: LoopShape::Counted { start, end },
                induction: init_var,
                body,
            }
        }
        CandidateLoop::IteratorRange {
            loop_id,
            init_var,
            cond_var,
            inc_var,
            container,
            container_expr,
            body,
        } => {
            if init_var != cond_var || init_var != inc_var {
                debug!("skipping iterator loop: header variables differ");
                return Err(NormalizeError::HeaderMismatch);
            }
            LoopDescriptor {
                loop_id,
                shape: LoopShape::IteratorRange {
                    container,
                    container_expr,
                },
                induction: init_var,
                body,
            }
        }
        CandidateLoop::ElementRange {
            loop_id,
            loop_var,
            container,
            container_expr,
            body,
        } => LoopDescriptor {
            loop_id,
            shape: LoopShape::ElementRange {
                container,
                container_expr,
            },
            induction: loop_var,
            body,
        },
    };

    if !satisfies_restrictions(p, desc.body) {
        debug!("skipping loop: body violates the restriction predicate");
        return Err(NormalizeError::RestrictedBody);
    }

    Ok(desc)
}

/// The restricted statement language for analyzable loop bodies.
pub fn satisfies_restrictions(p: &Program, root: NodeId) -> bool {
    match p.node(root) {
        Node::Goto | Node::Break | Node::Return { .. } => return false,
        Node::Assign { lhs, rhs, .. } => {
            // Chained assignment or embedded increment inside an assignment.
            let nested = |n: &Node| matches!(n, Node::Assign { .. } | Node::IncDec { .. });
            if p.subtree_contains(*lhs, &nested) || p.subtree_contains(*rhs, &nested) {
                return false;
            }
        }
        Node::Unary { op: UnaryOp::Deref, expr } => {
            // A dereferenced binary operator is only admissible when it is
            // the pointer-offset spelling of an element access.
            let inner = p.strip(*expr);
            if matches!(p.node(inner), Node::Binary { .. })
                && canon::as_element_access(p, root).is_none()
            {
                return false;
            }
        }
        _ => {}
    }
    p.children(root)
        .into_iter()
        .all(|c| satisfies_restrictions(p, c))
}
