//! The traversal engine.
//!
//! One pre-order depth-first pass over the loop body, dispatching per node
//! kind into the write classifier, the subscript tracker, the pointer
//! checker, and the call explorer, all of which accumulate into a single
//! [`AnalysisState`]. The tree itself is never mutated.
//!
//! Pattern boundaries are positional: an assignment recognized as a map
//! opens a "map site", and element reads inside that site belong to the
//! map; element reads outside any site are pending and are claimed by the
//! next map assignment.

use crate::calls;
use crate::canon::{self, ElementAccess};
use crate::config::AnalysisConfig;
use crate::findings::SafetyReason;
use crate::patterns::{ElementBinding, MapPattern, ELEMENT_PREFIX};
use crate::reduce;
use crate::shape::{ElementForm, LoopDescriptor, LoopShape};
use crate::state::AnalysisState;
use crate::subscript;
use crate::tree::{Node, NodeId, Program, Storage, UnaryOp};
use crate::writes;

/// Traversal context threaded through the walk.
#[derive(Debug, Clone, Copy)]
struct Ctx {
    /// Inside the right-hand side of the most recent map assignment.
    in_map_site: bool,
}

pub struct Explorer<'a> {
    p: &'a Program,
    desc: &'a LoopDescriptor,
    config: &'a AnalysisConfig,
}

impl<'a> Explorer<'a> {
    pub fn new(p: &'a Program, desc: &'a LoopDescriptor, config: &'a AnalysisConfig) -> Self {
        Explorer { p, desc, config }
    }

    /// Walk the loop body.
    pub fn run(&self, st: &mut AnalysisState) {
        self.visit_root(self.desc.body, st);
    }

    /// Walk an arbitrary statement root (used for callee bodies).
    pub fn visit_root(&self, root: NodeId, st: &mut AnalysisState) {
        self.visit(root, st, Ctx { in_map_site: false });
    }

    fn visit(&self, id: NodeId, st: &mut AnalysisState, ctx: Ctx) {
        let p = self.p;
        match p.node(id) {
            Node::Block { stmts } => {
                for s in stmts {
                    self.visit(*s, st, ctx);
                }
            }
            Node::DeclStmt { decl } => {
                self.declare(*decl, id, st);
                if let Some(init) = p.decl(*decl).init {
                    self.visit(init, st, ctx);
                }
            }
            Node::ExprStmt { expr } => self.visit(*expr, st, ctx),
            Node::If { cond, then_body, else_body } => {
                self.visit(*cond, st, ctx);
                self.visit(*then_body, st, ctx);
                if let Some(e) = else_body {
                    self.visit(*e, st, ctx);
                }
            }
            Node::NestedLoop { init, cond, step, body } => {
                if !st.visited_loops.insert(id) {
                    st.record(SafetyReason::Recursion, id);
                }
                for part in [*init, *cond, *step].into_iter().flatten() {
                    self.visit(part, st, ctx);
                }
                self.visit(*body, st, ctx);
            }
            Node::Goto => st.record(SafetyReason::GotoStmt, id),
            Node::Break => {}
            Node::Return { value } => {
                if let Some(v) = value {
                    self.visit(*v, st, ctx);
                }
            }
            Node::Throw { value } => {
                st.record(SafetyReason::ThrowStmt, id);
                if let Some(v) = value {
                    self.visit(*v, st, ctx);
                }
            }
            Node::Lambda { .. } => {
                // Closures are rejected outright; their bodies are not
                // analyzed.
                st.record(SafetyReason::Closure, id);
            }
            Node::IntLit(_) | Node::FloatLit(_) | Node::This => {}
            Node::Paren(e) => self.visit(*e, st, ctx),
            Node::Cast { expr, .. } => self.visit(*expr, st, ctx),
            Node::VarRef(d) => self.visit_var_ref(id, *d, st, ctx),
            Node::Unary { op: UnaryOp::Deref, expr } => {
                self.visit_deref(id, st, ctx);
                self.visit(*expr, st, ctx);
            }
            Node::Unary { expr, .. } => self.visit(*expr, st, ctx),
            Node::IncDec { target, .. } => {
                writes::is_valid_write(p, self.desc, st, *target);
                self.visit(*target, st, ctx);
            }
            Node::Binary { lhs, rhs, .. } => {
                self.visit(*lhs, st, ctx);
                self.visit(*rhs, st, ctx);
            }
            Node::Assign { .. } => self.visit_assign(id, st, ctx),
            Node::Index { .. } => {
                self.visit_indexed(id, st, ctx);
                for c in p.children(id) {
                    self.visit(c, st, ctx);
                }
            }
            Node::OpCall { .. } => {
                self.visit_opcall(id, st, ctx);
                for c in p.children(id) {
                    self.visit(c, st, ctx);
                }
            }
            Node::Call { callee, args } => {
                calls::explore_call(p, self.desc, self.config, st, id);
                self.visit(*callee, st, ctx);
                for a in args {
                    self.visit(*a, st, ctx);
                }
            }
            Node::Construct { ctor, args } => {
                calls::explore_construct(p, self.desc, self.config, st, id, *ctor);
                for a in args {
                    self.visit(*a, st, ctx);
                }
            }
            Node::Alloc { count, .. } => {
                if let Some(c) = count {
                    self.visit(*c, st, ctx);
                }
            }
            Node::Member { base, .. } => self.visit(*base, st, ctx),
        }
    }

    fn declare(&self, decl: crate::tree::DeclId, site: NodeId, st: &mut AnalysisState) {
        let info = self.p.decl(decl);
        if info.storage != Storage::Global && !self.p.is_reference(info.ty) {
            st.local_variables.insert(decl);
        }
        if info.name.starts_with(ELEMENT_PREFIX) {
            st.record(SafetyReason::ReservedNameCollision, site);
        }
    }

    fn visit_var_ref(
        &self,
        id: NodeId,
        decl: crate::tree::DeclId,
        st: &mut AnalysisState,
        ctx: Ctx,
    ) {
        if self.p.decl(decl).name.starts_with(ELEMENT_PREFIX) {
            st.record(SafetyReason::ReservedNameCollision, id);
        }
        if decl != self.desc.induction {
            return;
        }
        match self.desc.shape {
            LoopShape::Counted { .. } => {
                if !subscript::is_subscript_use(self.p, st, id) {
                    st.record(SafetyReason::LoopVariableMisuse, id);
                }
            }
            LoopShape::IteratorRange { .. } => {
                // The iterator may only appear under a dereference.
                if !st.selector_uses.contains(&id) {
                    st.record(SafetyReason::LoopVariableMisuse, id);
                }
            }
            LoopShape::ElementRange { .. } => {
                // The range variable is itself the element; reads become
                // bound parameters unless this occurrence is the write.
                if !st.element_writes.contains(&id) {
                    self.attach_element(id, st, ctx, false);
                }
            }
        }
    }

    fn visit_assign(&self, id: NodeId, st: &mut AnalysisState, ctx: Ctx) {
        let Node::Assign { op, lhs, rhs } = self.p.node(id) else {
            return;
        };
        let (op, lhs, rhs) = (*op, *lhs, *rhs);

        if let Some(r) = reduce::match_reduce(self.p, self.desc, st, id) {
            st.reduce_list.push(r);
            self.visit(lhs, st, ctx);
            self.visit(rhs, st, ctx);
            return;
        }

        if reduce::is_loop_element(self.p, self.desc, st, lhs) {
            let elements = st
                .pending_elements
                .iter()
                .filter_map(|e| {
                    self.desc
                        .element_label(self.p, *e)
                        .map(|label| ElementBinding { node: *e, label })
                })
                .collect();
            let map = MapPattern {
                elements,
                inputs: st.pending_inputs.clone(),
                output: reduce::element_input(self.desc, lhs),
                site: id,
                accumulating: op,
            };
            st.map_list.push(map);
            self.visit(lhs, st, ctx);
            self.visit(rhs, st, Ctx { in_map_site: true });
            return;
        }

        writes::is_valid_write(self.p, self.desc, st, lhs);
        self.visit(lhs, st, ctx);
        self.visit(rhs, st, ctx);
    }

    fn visit_deref(&self, id: NodeId, st: &mut AnalysisState, ctx: Ctx) {
        match self.desc.shape {
            LoopShape::Counted { .. } => match canon::as_element_access(self.p, id) {
                // The pointer-offset spelling of an element access reads
                // like the subscript it is.
                Some(access) => self.track_indexed_read(access, true, st, ctx),
                None => st.record(SafetyReason::InvalidDereference, id),
            },
            LoopShape::IteratorRange { .. } => self.iterator_element_use(id, st, ctx),
            LoopShape::ElementRange { .. } => {}
        }
    }

    fn visit_indexed(&self, id: NodeId, st: &mut AnalysisState, ctx: Ctx) {
        if !matches!(self.desc.shape, LoopShape::Counted { .. }) {
            // Only counted loops track subscripts; elsewhere the write
            // classifier rejects what it cannot prove.
            return;
        }
        if let Some(access) = canon::as_element_access(self.p, id) {
            self.track_indexed_read(access, true, st, ctx);
        }
    }

    fn visit_opcall(&self, id: NodeId, st: &mut AnalysisState, ctx: Ctx) {
        let Node::OpCall { op, args } = self.p.node(id) else {
            return;
        };
        match self.desc.shape {
            LoopShape::Counted { .. } => {
                if *op == crate::tree::OverloadedOp::Subscript && args.len() == 2 {
                    let access = ElementAccess {
                        base: args[0],
                        index: args[1],
                        origin: id,
                    };
                    // Overloaded subscripts are tracked but exempt from the
                    // raw-pointer provenance check.
                    self.track_indexed_read(access, false, st, ctx);
                }
            }
            LoopShape::IteratorRange { .. } => self.iterator_element_use(id, st, ctx),
            LoopShape::ElementRange { .. } => {
                st.record(SafetyReason::OverloadedOperator, id);
            }
        }
    }

    fn iterator_element_use(&self, id: NodeId, st: &mut AnalysisState, ctx: Ctx) {
        match self.desc.element_form(self.p, id) {
            Some(ElementForm::IteratorDeref { var_node }) => {
                st.selector_uses.insert(var_node);
                if !st.element_writes.contains(&var_node) {
                    self.attach_element(var_node, st, ctx, false);
                }
            }
            _ => st.record(SafetyReason::InvalidDereference, id),
        }
    }

    fn track_indexed_read(
        &self,
        access: ElementAccess,
        check_pointer: bool,
        st: &mut AnalysisState,
        ctx: Ctx,
    ) {
        if check_pointer {
            match canon::base_decl(self.p, access.base) {
                None => {
                    st.record(SafetyReason::UnsafePointer, access.origin);
                    return;
                }
                Some(base) => {
                    if !self.p.is_array(self.p.decl(base).ty) {
                        crate::pointer::check_pointer_base(
                            self.p,
                            self.desc,
                            st,
                            base,
                            access.origin,
                        );
                    }
                }
            }
        }
        let is_input = subscript::add_read(self.p, self.desc, st, &access);
        // An in-range literal subscript is a valid read but does not vary
        // per iteration, so it never becomes a bound element.
        let iteration_varying = !matches!(
            subscript::classify(self.p, self.desc, &access),
            subscript::SubscriptClass::LiteralInRange(_)
        );
        if is_input && iteration_varying {
            self.attach_element(access.origin, st, ctx, true);
        }
    }

    /// Route an element read to the current map site or the pending set.
    fn attach_element(&self, node: NodeId, st: &mut AnalysisState, ctx: Ctx, with_input: bool) {
        if ctx.in_map_site && !st.map_list.is_empty() {
            let label = self.desc.element_label(self.p, node);
            let map = st.map_list.last_mut().expect("map site open");
            if let Some(label) = label {
                map.elements.push(ElementBinding { node, label });
            }
            if with_input {
                add_input(self.p, &mut map.inputs, node);
            }
        } else {
            st.pending_elements.push(node);
            if with_input {
                add_input(self.p, &mut st.pending_inputs, node);
            }
        }
    }
}

/// Add a read to an input list unless its base is already represented.
fn add_input(p: &Program, inputs: &mut Vec<NodeId>, expr: NodeId) {
    let base = canon::base_decl(p, expr);
    let repeated = base.is_some()
        && inputs
            .iter()
            .any(|existing| canon::base_decl(p, *existing) == base);
    if !repeated {
        inputs.push(expr);
    }
}
