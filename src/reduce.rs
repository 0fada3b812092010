//! Reduce and map-assignment recognition.
//!
//! Accepted reduce forms, for an accumulator `acc` that is arithmetic and
//! not loop-local:
//!
//! - `acc += e` and `acc *= e`;
//! - `acc = acc + e`, `acc = e + acc`, and the `*` equivalents;
//! - `acc = f(e, ...)` with one or two arguments, exactly one of which is a
//!   valid element; the combiner stays opaque and no identity is inferred.
//!
//! `-=` and every other compound operator never reduce; such writes fall
//! through to the plain write classifier, which rejects a non-local target.
//! A floating-point accumulator classifies like any other arithmetic one;
//! whether the precision change is acceptable is the plan consumer's call.

use crate::patterns::{Combiner, ReduceOp, ReducePattern};
use crate::shape::{ElementForm, LoopDescriptor};
use crate::state::AnalysisState;
use crate::subscript;
use crate::tree::{BinOp, Node, NodeId, Program};

/// Shape-dispatched element recognition with tracking side effects: counted
/// loops route through the subscript tracker, iterator/element-range loops
/// record the written element expression.
pub fn is_loop_element(
    p: &Program,
    desc: &LoopDescriptor,
    st: &mut AnalysisState,
    expr: NodeId,
) -> bool {
    match desc.element_form(p, expr) {
        Some(ElementForm::Indexed(access)) => subscript::handle_map_write(p, desc, st, &access),
        Some(ElementForm::IteratorDeref { var_node })
        | Some(ElementForm::ByRefElement { var_node }) => {
            st.selector_uses.insert(var_node);
            st.element_writes.push(var_node);
            true
        }
        None => false,
    }
}

fn reduce_op(op: BinOp) -> Option<ReduceOp> {
    match op {
        BinOp::Add => Some(ReduceOp::Add),
        BinOp::Mul => Some(ReduceOp::Mul),
        _ => None,
    }
}

/// The expression a recognized element contributes as reduce/map input:
/// the element access itself in a counted loop, the traversed container
/// otherwise.
pub fn element_input(desc: &LoopDescriptor, elem: NodeId) -> NodeId {
    desc.container_expr().unwrap_or(elem)
}

/// Try to classify an assignment as a reduce. Returns the pattern without
/// mutating the pattern lists; tracking side effects on element operands do
/// occur, exactly as if the operand had been visited.
pub fn match_reduce(
    p: &Program,
    desc: &LoopDescriptor,
    st: &mut AnalysisState,
    assign: NodeId,
) -> Option<ReducePattern> {
    let Node::Assign { op, lhs, rhs } = p.node(assign) else {
        return None;
    };
    let acc_node = p.strip(*lhs);
    let Node::VarRef(acc) = p.node(acc_node) else {
        return None;
    };
    let acc = *acc;
    let acc_ty = p.deref_reference(p.decl(acc).ty);
    if !p.is_arithmetic(acc_ty) || st.is_local(acc) {
        return None;
    }

    match op {
        // acc ⊕= e
        Some(bin) => {
            let rop = reduce_op(*bin)?;
            if is_loop_element(p, desc, st, *rhs) {
                return Some(ReducePattern {
                    inputs: vec![element_input(desc, *rhs)],
                    output: acc_node,
                    combiner: Combiner::Operator(rop),
                    site: assign,
                    elements: Vec::new(),
                });
            }
            None
        }
        None => {
            let rhs_stripped = p.strip(*rhs);

            // acc = f(e, ...): the combining function stays opaque.
            if let Node::Call { args, .. } = p.node(rhs_stripped) {
                if (1..=2).contains(&args.len()) {
                    let args = args.clone();
                    let elem_args: Vec<NodeId> = args
                        .iter()
                        .copied()
                        .filter(|a| is_loop_element(p, desc, st, *a))
                        .collect();
                    if elem_args.len() == 1 {
                        return Some(ReducePattern {
                            inputs: vec![element_input(desc, elem_args[0])],
                            output: acc_node,
                            combiner: Combiner::Opaque,
                            site: assign,
                            elements: args,
                        });
                    }
                }
                return None;
            }

            // acc = acc ⊕ e  /  acc = e ⊕ acc
            if let Node::Binary { op: bin, lhs: bl, rhs: br } = p.node(rhs_stripped) {
                let rop = reduce_op(*bin)?;
                let (bl, br) = (*bl, *br);
                let is_acc = |p: &Program, n: NodeId| {
                    matches!(p.node(p.strip(n)), Node::VarRef(d) if *d == acc)
                };
                if is_loop_element(p, desc, st, br) && is_acc(p, bl) {
                    return Some(ReducePattern {
                        inputs: vec![element_input(desc, br)],
                        output: acc_node,
                        combiner: Combiner::Operator(rop),
                        site: assign,
                        elements: Vec::new(),
                    });
                }
                if is_loop_element(p, desc, st, bl) && is_acc(p, br) {
                    return Some(ReducePattern {
                        inputs: vec![element_input(desc, bl)],
                        output: acc_node,
                        combiner: Combiner::Operator(rop),
                        site: assign,
                        elements: Vec::new(),
                    });
                }
            }
            None
        }
    }
}
