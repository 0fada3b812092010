//! Plain write-target classification.
//!
//! Runs after reduce and map recognition have both declined. The target is
//! acceptable only when every path of its shape bottoms out in loop-local
//! or per-iteration storage.

use crate::findings::SafetyReason;
use crate::reduce;
use crate::shape::LoopDescriptor;
use crate::state::AnalysisState;
use crate::tree::{Node, NodeId, Program, Storage};

/// Decide whether a write target is safe. Unsafe targets record their
/// reason and clear `parallelizable`.
pub fn is_valid_write(
    p: &Program,
    desc: &LoopDescriptor,
    st: &mut AnalysisState,
    write: NodeId,
) -> bool {
    let w = p.strip(write);
    // A write that is itself a recognized element is a map concern, not a
    // plain write.
    if reduce::is_loop_element(p, desc, st, w) {
        return true;
    }
    match p.node(w) {
        Node::VarRef(d) => {
            if st.is_local(*d) {
                true
            } else {
                st.record(SafetyReason::NonLocalWrite, w);
                false
            }
        }
        Node::Member { base, member } => {
            let member_ok = if p.decl(*member).storage == Storage::Global {
                st.record(SafetyReason::GlobalWrite, w);
                false
            } else {
                true
            };
            let base_ok = is_valid_write(p, desc, st, *base);
            member_ok && base_ok
        }
        Node::This => {
            if st.is_this_valid {
                true
            } else {
                st.record(SafetyReason::GlobalWrite, w);
                false
            }
        }
        Node::OpCall { .. } => {
            // Overloaded-operator lvalue: semantics unknown, tolerated with
            // a soft note.
            st.record(SafetyReason::OverloadedOperator, w);
            true
        }
        _ => {
            st.record(SafetyReason::UnsafeWriteTarget, w);
            false
        }
    }
}
