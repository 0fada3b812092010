//! Raw-pointer base validation.
//!
//! A subscripted base that is a pointer rather than an array must be traced
//! to memory the loop may safely partition: a local declaration initialized
//! from an owning allocation, never reassigned or stepped afterwards.
//! Anything short of that disqualifies the loop. Each pointer is validated
//! once per loop instance and memoized in `explored_pointers`.

use crate::findings::SafetyReason;
use crate::shape::LoopDescriptor;
use crate::state::AnalysisState;
use crate::tree::{DeclId, Node, NodeId, Program, Storage};
use log::debug;

/// Validate a pointer base on first encounter.
pub fn check_pointer_base(
    p: &Program,
    desc: &LoopDescriptor,
    st: &mut AnalysisState,
    base: DeclId,
    origin: NodeId,
) {
    if !st.explored_pointers.insert(base) {
        return; // already validated
    }
    let decl = p.decl(base);

    if decl.storage == Storage::Global {
        st.record(SafetyReason::UnsafePointer, origin);
        return;
    }

    match decl.init {
        Some(init) => match p.node(p.strip(init)) {
            Node::Alloc { count, .. } => {
                // With a literal extent and a literal trip count the
                // allocation must cover the loop; symbolic on either side
                // resolves optimistically.
                let extent = count.and_then(|c| p.int_literal(c));
                if let (Some(extent), Some(trip)) = (extent, desc.trip_count(p)) {
                    if extent >= 0 && (extent as u64) < trip {
                        st.record(SafetyReason::UnsafePointer, origin);
                        return;
                    }
                }
            }
            _ => {
                st.record(SafetyReason::UnsafePointer, origin);
                return;
            }
        },
        None => {
            debug!("pointer '{}' has no initializer to trace", decl.name);
        }
    }

    // No reachable statement may repoint or step the pointer. The scan
    // covers the declaring function's body when known, else the loop body.
    let scan_root = decl
        .owner
        .and_then(|o| p.function(o))
        .and_then(|f| f.body)
        .unwrap_or(desc.body);
    if has_reassignment(p, scan_root, base) {
        st.record(SafetyReason::UnsafePointer, origin);
    }
}

fn has_reassignment(p: &Program, root: NodeId, base: DeclId) -> bool {
    match p.node(root) {
        Node::Assign { op, lhs, rhs } => {
            if matches!(p.node(p.strip(*lhs)), Node::VarRef(d) if *d == base) {
                // Re-pointing at a fresh allocation keeps ownership intact;
                // any other assignment (or a compound step) does not.
                let fresh_alloc =
                    op.is_none() && matches!(p.node(p.strip(*rhs)), Node::Alloc { .. });
                if !fresh_alloc {
                    return true;
                }
            }
        }
        Node::IncDec { target, .. } => {
            if matches!(p.node(p.strip(*target)), Node::VarRef(d) if *d == base) {
                return true;
            }
        }
        _ => {}
    }
    p.children(root)
        .into_iter()
        .any(|c| has_reassignment(p, c, base))
}
