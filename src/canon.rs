//! Canonical expression identity.
//!
//! Subscript-consistency checks must not be fooled by spelling: `p[i]` and
//! `*(p + i)` address the same element, and a parenthesized or cast index is
//! the same index. Comparisons therefore run over a canonical view that
//! strips wrappers and folds pointer-offset dereferences into indexed form.

use crate::tree::{BinOp, Node, NodeId, OverloadedOp, Program, UnaryOp};
use crate::tree::DeclId;

/// An indexed element access in canonical form: `base[index]`, whichever way
/// it was spelled. `origin` is the node the access was recognized at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementAccess {
    pub base: NodeId,
    pub index: NodeId,
    pub origin: NodeId,
}

/// Recognize an expression as an indexed element access.
///
/// Covers plain subscripts, overloaded `operator[]`, and the pointer-offset
/// form `*(p + i)` / `*(i + p)` where one addend is pointer- or array-typed.
pub fn as_element_access(p: &Program, expr: NodeId) -> Option<ElementAccess> {
    let stripped = p.strip(expr);
    match p.node(stripped) {
        Node::Index { base, index } => Some(ElementAccess {
            base: *base,
            index: *index,
            origin: stripped,
        }),
        Node::OpCall { op: OverloadedOp::Subscript, args } if args.len() == 2 => {
            Some(ElementAccess {
                base: args[0],
                index: args[1],
                origin: stripped,
            })
        }
        Node::Unary { op: UnaryOp::Deref, expr: inner } => {
            let inner = p.strip(*inner);
            if let Node::Binary { op: BinOp::Add, lhs, rhs } = p.node(inner) {
                let (base, index) = if is_addressable(p, *lhs) {
                    (*lhs, *rhs)
                } else if is_addressable(p, *rhs) {
                    (*rhs, *lhs)
                } else {
                    return None;
                };
                return Some(ElementAccess {
                    base,
                    index,
                    origin: stripped,
                });
            }
            None
        }
        _ => None,
    }
}

fn is_addressable(p: &Program, expr: NodeId) -> bool {
    p.expr_type(expr)
        .map(|ty| p.is_pointer(ty) || p.is_array(ty))
        .unwrap_or(false)
        || base_decl(p, expr)
            .map(|d| {
                let ty = p.decl(d).ty;
                p.is_pointer(ty) || p.is_array(ty)
            })
            .unwrap_or(false)
}

/// Structural equality of two expressions modulo parens, casts, and
/// pointer-offset normalization.
pub fn canonical_eq(p: &Program, a: NodeId, b: NodeId) -> bool {
    let a = p.strip(a);
    let b = p.strip(b);
    if a == b {
        return true;
    }
    // Element accesses compare componentwise so `p[i]` meets `*(p + i)`.
    if let (Some(ea), Some(eb)) = (as_element_access(p, a), as_element_access(p, b)) {
        return canonical_eq(p, ea.base, eb.base) && canonical_eq(p, ea.index, eb.index);
    }
    match (p.node(a), p.node(b)) {
        (Node::IntLit(x), Node::IntLit(y)) => x == y,
        (Node::FloatLit(x), Node::FloatLit(y)) => x == y,
        (Node::VarRef(x), Node::VarRef(y)) => x == y,
        (Node::This, Node::This) => true,
        (
            Node::Unary { op: oa, expr: ea },
            Node::Unary { op: ob, expr: eb },
        ) => oa == ob && canonical_eq(p, *ea, *eb),
        (
            Node::Binary { op: oa, lhs: la, rhs: ra },
            Node::Binary { op: ob, lhs: lb, rhs: rb },
        ) => oa == ob && canonical_eq(p, *la, *lb) && canonical_eq(p, *ra, *rb),
        (
            Node::Member { base: ba, member: ma },
            Node::Member { base: bb, member: mb },
        ) => ma == mb && canonical_eq(p, *ba, *bb),
        _ => false,
    }
}

/// Resolve the declaration an lvalue-ish expression ultimately names:
/// the variable itself, or the base of a chain of subscripts/dereferences
/// (in any spelling). `None` when the base is too complex to name a single
/// declaration.
pub fn base_decl(p: &Program, expr: NodeId) -> Option<DeclId> {
    let stripped = p.strip(expr);
    if let Some(access) = as_element_access(p, stripped) {
        return base_decl(p, access.base);
    }
    match p.node(stripped) {
        Node::VarRef(d) => Some(*d),
        Node::Unary { op: UnaryOp::Deref, expr } => base_decl(p, *expr),
        Node::OpCall { op: OverloadedOp::Deref, args } if !args.is_empty() => {
            base_decl(p, args[0])
        }
        _ => None,
    }
}
