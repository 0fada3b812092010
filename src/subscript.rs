//! Indexed-access tracking for counted loops.
//!
//! Every subscripted read and write against a tracked base is recorded, and
//! any base accessed under two selectors that are not canonically equal is
//! declared inconsistent, which disqualifies the loop. The one sanctioned
//! overlap is a read that is physically the write already on record (the
//! left-hand side of the defining assignment seen again on the read pass);
//! it deduplicates by node identity instead of being flagged.
//!
//! Selector classification:
//! - the iteration variable: a valid per-iteration element;
//! - an integer literal inside `[start, end)`: valid but iteration-
//!   independent, excluded from the per-iteration element set;
//! - an integer literal outside the bounds: a different iteration domain,
//!   ignored entirely;
//! - anything else with literal bounds: invalid, disqualifies the loop;
//! - any selector under symbolic bounds: undecidable, resolved
//!   optimistically.

use crate::canon::{self, ElementAccess};
use crate::findings::SafetyReason;
use crate::shape::LoopDescriptor;
use crate::state::{AccessRecord, AnalysisState, SelectorForm};
use crate::tree::{Node, NodeId, Program};
use log::debug;

/// Classification of one access's selector against the loop bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptClass {
    IterationVar,
    LiteralInRange(i64),
    LiteralOutOfRange(i64),
    /// Bounds are symbolic; range arithmetic is impossible.
    Undecidable,
    Invalid,
}

/// Classify a selector. Pure; recording the consequences of `Invalid` is
/// the caller's job.
pub fn classify(p: &Program, desc: &LoopDescriptor, access: &ElementAccess) -> SubscriptClass {
    let (start, end) = match desc.literal_bounds(p) {
        Some(bounds) => bounds,
        None => return SubscriptClass::Undecidable,
    };
    let index = p.strip(access.index);
    match p.node(index) {
        Node::IntLit(v) => {
            if *v < start || *v >= end {
                SubscriptClass::LiteralOutOfRange(*v)
            } else {
                SubscriptClass::LiteralInRange(*v)
            }
        }
        Node::VarRef(d) if *d == desc.induction => SubscriptClass::IterationVar,
        _ => SubscriptClass::Invalid,
    }
}

/// Selector shape as written, independent of the loop bounds.
pub fn selector_form(p: &Program, desc: &LoopDescriptor, index: NodeId) -> SelectorForm {
    match p.node(p.strip(index)) {
        Node::IntLit(v) => SelectorForm::IntegerLiteral(*v),
        Node::VarRef(d) if *d == desc.induction => SelectorForm::IterationVariable,
        _ => SelectorForm::Other,
    }
}

fn record_for(
    p: &Program,
    desc: &LoopDescriptor,
    access: &ElementAccess,
    base: crate::tree::DeclId,
) -> AccessRecord {
    AccessRecord {
        base,
        index: access.index,
        selector: selector_form(p, desc, access.index),
        origin: access.origin,
    }
}

/// Sanction the selector's iteration-variable reference, if it is one, so
/// the later visit of that reference is not a misuse.
fn sanction_selector(p: &Program, st: &mut AnalysisState, access: &ElementAccess) {
    let index = p.strip(access.index);
    if matches!(p.node(index), Node::VarRef(_)) {
        st.selector_uses.insert(index);
    }
}

/// Track a subscripted read. Returns whether the read counts as a
/// per-iteration input (and may therefore become a bound element).
pub fn add_read(
    p: &Program,
    desc: &LoopDescriptor,
    st: &mut AnalysisState,
    access: &ElementAccess,
) -> bool {
    let class = classify(p, desc, access);
    if matches!(class, SubscriptClass::LiteralOutOfRange(_)) {
        // Belongs to a different iteration domain; not part of this loop's
        // per-iteration traffic.
        return false;
    }
    if class == SubscriptClass::Invalid {
        st.record(SafetyReason::InvalidSubscript, access.origin);
    }
    let base = match canon::base_decl(p, access.base) {
        Some(d) => d,
        None => return false,
    };
    sanction_selector(p, st, access);
    for w in st
        .write_accesses
        .iter()
        .filter(|w| w.base == base)
        .copied()
        .collect::<Vec<_>>()
    {
        if !canon::canonical_eq(p, w.index, access.index) {
            if class != SubscriptClass::Undecidable {
                st.record(SafetyReason::InconsistentSubscript { base }, w.index);
                return false;
            }
        } else if w.origin == access.origin {
            // This read is the recorded write itself.
            return false;
        }
    }
    st.read_accesses.push(record_for(p, desc, access, base));
    true
}

/// Track a subscripted write. Returns whether the write was accepted into
/// the write set (a literal-in-range write is iteration-independent and is
/// not).
pub fn add_write(
    p: &Program,
    desc: &LoopDescriptor,
    st: &mut AnalysisState,
    access: &ElementAccess,
) -> bool {
    let class = classify(p, desc, access);
    if matches!(class, SubscriptClass::LiteralInRange(_)) {
        return false;
    }
    if class == SubscriptClass::Invalid {
        st.record(SafetyReason::InvalidSubscript, access.origin);
    }
    let base = match canon::base_decl(p, access.base) {
        Some(d) => d,
        None => return false,
    };
    sanction_selector(p, st, access);
    for r in st
        .read_accesses
        .iter()
        .filter(|r| r.base == base)
        .copied()
        .collect::<Vec<_>>()
    {
        if !canon::canonical_eq(p, r.index, access.index) && class != SubscriptClass::Undecidable {
            st.record(SafetyReason::InconsistentSubscript { base }, access.origin);
            return false;
        }
    }
    for w in st
        .write_accesses
        .iter()
        .filter(|w| w.base == base)
        .copied()
        .collect::<Vec<_>>()
    {
        if !canon::canonical_eq(p, w.index, access.index) {
            st.record(SafetyReason::InconsistentSubscript { base }, w.origin);
            return false;
        }
        // Same subscript at a different site; already on record.
        return true;
    }
    st.write_accesses.push(record_for(p, desc, access, base));
    true
}

/// Decide whether a subscripted write target is a valid map element.
///
/// Only non-local bases qualify; writes through loop-local bases fall back
/// to the plain write classifier. An undecidable selector is accepted
/// optimistically.
pub fn handle_map_write(
    p: &Program,
    desc: &LoopDescriptor,
    st: &mut AnalysisState,
    access: &ElementAccess,
) -> bool {
    let base = match canon::base_decl(p, access.origin) {
        Some(d) => d,
        None => {
            st.record(SafetyReason::UnsafeWriteTarget, access.origin);
            return false;
        }
    };
    if st.is_local(base) {
        return false;
    }
    add_write(p, desc, st, access);
    match classify(p, desc, access) {
        SubscriptClass::IterationVar => true,
        SubscriptClass::Undecidable => {
            debug!("subscript range not checkable; accepting optimistically");
            st.record(SafetyReason::UndecidableSubscript, access.origin);
            true
        }
        _ => false,
    }
}

/// Whether a node is on record as the selector of some tracked access.
pub fn is_subscript_use(p: &Program, st: &AnalysisState, node: NodeId) -> bool {
    if st.selector_uses.contains(&node) {
        return true;
    }
    st.read_accesses
        .iter()
        .chain(st.write_accesses.iter())
        .any(|rec| p.strip(rec.index) == node)
}
