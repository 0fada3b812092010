//! Conservative exploration of reachable callee bodies.
//!
//! A call inside the loop body may touch anything, so a callee with a
//! visible body is analyzed with the same traversal over a cloned child
//! state, and the verdict merges back by AND. Each callee is explored at
//! most once per loop analysis (`visited_functions`); a callee that cannot
//! be explored at all marks the loop unsafe without aborting the pass.
//!
//! Constructors and destructors reachable from a construct-expression get
//! the same treatment, except that writes through `this` are legitimate
//! inside them.

use crate::config::AnalysisConfig;
use crate::explorer::Explorer;
use crate::findings::SafetyReason;
use crate::shape::LoopDescriptor;
use crate::state::AnalysisState;
use crate::tree::{DeclId, FunctionKind, Node, NodeId, Program};
use log::debug;
use std::collections::HashSet;

/// Builtin-typed parameters are the only callee declarations pre-approved
/// as local inside the callee body.
fn builtin_params(p: &Program, callee: DeclId) -> HashSet<DeclId> {
    p.function(callee)
        .map(|f| {
            f.params
                .iter()
                .copied()
                .filter(|d| p.is_builtin(p.decl(*d).ty))
                .collect()
        })
        .unwrap_or_default()
}

/// Callee objects rooted in loop-local storage make `this`-writes inside a
/// method acceptable.
fn is_local_callee(p: &Program, st: &AnalysisState, base: NodeId) -> bool {
    match p.node(p.strip(base)) {
        Node::VarRef(d) => st.is_local(*d),
        Node::Member { base, .. } => is_local_callee(p, st, *base),
        _ => false,
    }
}

fn explore_body(
    p: &Program,
    desc: &LoopDescriptor,
    config: &AnalysisConfig,
    st: &mut AnalysisState,
    body: NodeId,
    locals: HashSet<DeclId>,
    is_this_valid: bool,
) -> bool {
    let mut child = st.child_for_call(locals, is_this_valid);
    Explorer::new(p, desc, config).visit_root(body, &mut child);
    let ok = child.parallelizable;
    st.absorb_child(child);
    ok
}

/// Analyze the callee of a call expression.
pub fn explore_call(
    p: &Program,
    desc: &LoopDescriptor,
    config: &AnalysisConfig,
    st: &mut AnalysisState,
    call: NodeId,
) {
    let Node::Call { callee, .. } = p.node(call) else {
        return;
    };
    let mut is_loc_callee = false;
    let target = match p.node(p.strip(*callee)) {
        Node::VarRef(d) if p.function(*d).is_some() => Some(*d),
        Node::Member { base, member } => {
            is_loc_callee = is_local_callee(p, st, *base);
            p.function(*member).map(|_| *member)
        }
        _ => None,
    };

    let body = target.and_then(|d| p.function(d)).and_then(|f| f.body);
    match (target, body) {
        (Some(decl), Some(body)) => {
            if !st.visited_functions.insert(decl) {
                debug!("callee '{}' already explored", p.decl(decl).name);
                return;
            }
            let locals = builtin_params(p, decl);
            if !explore_body(p, desc, config, st, body, locals, is_loc_callee) {
                st.record(SafetyReason::UnsafeCallee, call);
            }
        }
        _ => {
            // No visible body, or a callee expression that does not resolve
            // to a declaration.
            st.record(SafetyReason::UnexplorableCall, call);
        }
    }
}

/// Analyze the constructor named by a construct-expression, and the
/// destructor of the constructed record if it has one.
pub fn explore_construct(
    p: &Program,
    desc: &LoopDescriptor,
    config: &AnalysisConfig,
    st: &mut AnalysisState,
    node: NodeId,
    ctor: DeclId,
) {
    explore_special(p, desc, config, st, node, ctor);
    if let Some(f) = p.function(ctor) {
        if let FunctionKind::Constructor(ty) = f.kind {
            if let Some(dtor) = p.record_destructor(ty) {
                explore_special(p, desc, config, st, node, dtor);
            }
        }
    }
}

fn explore_special(
    p: &Program,
    desc: &LoopDescriptor,
    config: &AnalysisConfig,
    st: &mut AnalysisState,
    node: NodeId,
    callee: DeclId,
) {
    let Some(f) = p.function(callee) else {
        st.record(SafetyReason::UnexplorableCall, node);
        return;
    };
    let Some(body) = f.body else {
        st.record(SafetyReason::UnexplorableCall, node);
        return;
    };
    if !st.visited_functions.insert(callee) {
        return;
    }
    // Constructor/destructor bodies start with no pre-approved locals but
    // may write through `this`.
    explore_body(p, desc, config, st, body, HashSet::new(), true);
}
