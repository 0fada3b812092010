//! Pointer provenance and callee exploration, end to end.

use parloom::{
    AnalysisConfig, CandidateLoop, FunctionKind, LoopAnalyzer, SafetyReason,
    TransformationPlan, TreeBuilder, Type,
};

fn verbose() -> AnalysisConfig {
    AnalysisConfig {
        verbose: true,
        ..AnalysisConfig::default()
    }
}

/// `int *p = <init>; for (int i = 0; i < 10; ++i) p[i] = 0;`
fn analyze_pointer_loop(
    init: impl FnOnce(&mut TreeBuilder) -> Option<parloom::NodeId>,
) -> parloom::LoopAnalysis {
    let mut b = TreeBuilder::new();
    let int = b.int_type();
    let ptr = b.pointer_to(int);
    let i = b.local("i", int);
    let p = b.local("p", ptr);
    if let Some(init) = init(&mut b) {
        b.set_init(p, init);
    }

    let pv = b.var(p);
    let iv = b.var(i);
    let lhs = b.index(pv, iv);
    let zero = b.int(0);
    let w = b.assign(lhs, zero);
    let stmt = b.expr_stmt(w);
    let body = b.block(vec![stmt]);
    let start = b.int(0);
    let end = b.int(10);
    let loop_id = b.block(vec![body]);
    let program = b.finish();

    let cand = CandidateLoop::Counted {
        loop_id,
        init_var: i,
        cond_var: i,
        inc_var: i,
        start,
        end,
        body,
    };
    LoopAnalyzer::new(verbose()).analyze(&program, &cand)
}

#[test]
fn owning_allocation_keeps_the_map() {
    let result = analyze_pointer_loop(|b| {
        let int = b.int_type();
        let ten = b.int(10);
        Some(b.alloc(int, Some(ten)))
    });
    assert!(result.parallelizable, "findings: {:?}", result.findings);
    assert!(matches!(result.plans[0], TransformationPlan::Map(_)));
}

#[test]
fn call_initialized_pointer_disqualifies_despite_consistent_indexing() {
    let result = analyze_pointer_loop(|b| {
        let getter = b.function("make_buffer", vec![], None);
        let callee = b.var(getter);
        Some(b.call(callee, vec![]))
    });
    assert!(!result.parallelizable);
    assert_eq!(result.plans, vec![TransformationPlan::None]);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::UnsafePointer));
}

#[test]
fn undersized_allocation_disqualifies() {
    let result = analyze_pointer_loop(|b| {
        let int = b.int_type();
        let four = b.int(4);
        Some(b.alloc(int, Some(four)))
    });
    assert!(!result.parallelizable);
}

#[test]
fn array_typed_base_needs_no_provenance() {
    // int buf[10]; declared outside the loop: arrays carry their extent.
    let mut b = TreeBuilder::new();
    let int = b.int_type();
    let arr10 = b.array_of(int, Some(10));
    let i = b.local("i", int);
    let buf = b.local("buf", arr10);

    let bv = b.var(buf);
    let iv = b.var(i);
    let lhs = b.index(bv, iv);
    let zero = b.int(0);
    let w = b.assign(lhs, zero);
    let stmt = b.expr_stmt(w);
    let body = b.block(vec![stmt]);
    let start = b.int(0);
    let end = b.int(10);
    let loop_id = b.block(vec![body]);
    let program = b.finish();

    let cand = CandidateLoop::Counted {
        loop_id,
        init_var: i,
        cond_var: i,
        inc_var: i,
        start,
        end,
        body,
    };
    let result = LoopAnalyzer::new(verbose()).analyze(&program, &cand);
    assert!(result.parallelizable, "findings: {:?}", result.findings);
}

/// Helper: counted loop whose body is a single call `f()`.
fn analyze_call_loop(
    make_callee: impl FnOnce(&mut TreeBuilder) -> parloom::DeclId,
) -> parloom::LoopAnalysis {
    let mut b = TreeBuilder::new();
    let int = b.int_type();
    let i = b.local("i", int);
    let callee_decl = make_callee(&mut b);
    let callee = b.var(callee_decl);
    let call = b.call(callee, vec![]);
    let stmt = b.expr_stmt(call);
    let body = b.block(vec![stmt]);
    let start = b.int(0);
    let end = b.int(10);
    let loop_id = b.block(vec![body]);
    let program = b.finish();

    let cand = CandidateLoop::Counted {
        loop_id,
        init_var: i,
        cond_var: i,
        inc_var: i,
        start,
        end,
        body,
    };
    LoopAnalyzer::new(verbose()).analyze(&program, &cand)
}

#[test]
fn callee_with_harmless_body_is_fine() {
    let result = analyze_call_loop(|b| {
        let int = b.int_type();
        let x = b.local("x", int);
        let decl = b.decl_stmt(x);
        let xv = b.var(x);
        let one = b.int(1);
        let w = b.assign(xv, one);
        let stmt = b.expr_stmt(w);
        let body = b.block(vec![decl, stmt]);
        b.function("helper", vec![], Some(body))
    });
    assert!(result.parallelizable, "findings: {:?}", result.findings);
}

#[test]
fn callee_writing_an_outside_variable_disqualifies() {
    let result = analyze_call_loop(|b| {
        let int = b.int_type();
        let g = b.global("g", int);
        let gv = b.var(g);
        let one = b.int(1);
        let w = b.assign(gv, one);
        let stmt = b.expr_stmt(w);
        let body = b.block(vec![stmt]);
        b.function("bump", vec![], Some(body))
    });
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::UnsafeCallee));
}

#[test]
fn callee_without_visible_body_disqualifies() {
    let result = analyze_call_loop(|b| b.function("opaque", vec![], None));
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::UnexplorableCall));
}

#[test]
fn builtin_parameters_are_callee_local() {
    // void f(int x) { x = 1; } where writing the by-value parameter is safe.
    let result = analyze_call_loop(|b| {
        let int = b.int_type();
        let x = b.param("x", int);
        let xv = b.var(x);
        let one = b.int(1);
        let w = b.assign(xv, one);
        let stmt = b.expr_stmt(w);
        let body = b.block(vec![stmt]);
        b.function("f", vec![x], Some(body))
    });
    assert!(result.parallelizable, "findings: {:?}", result.findings);
}

#[test]
fn recursive_callee_is_explored_once() {
    // void f() { f(); } requires memoization to terminate.
    let result = analyze_call_loop(|b| {
        let f = b.function("f", vec![], None);
        let callee = b.var(f);
        let call = b.call(callee, vec![]);
        let stmt = b.expr_stmt(call);
        let body = b.block(vec![stmt]);
        b.set_function_body(f, body);
        f
    });
    // The self-call inside the (now visited) body is skipped, not recursed.
    assert!(result.parallelizable, "findings: {:?}", result.findings);
}

#[test]
fn constructor_writing_global_state_disqualifies() {
    let mut b = TreeBuilder::new();
    let int = b.int_type();
    let i = b.local("i", int);
    let g = b.global("g", int);
    let gv = b.var(g);
    let one = b.int(1);
    let w = b.assign(gv, one);
    let stmt = b.expr_stmt(w);
    let ctor_body = b.block(vec![stmt]);
    let rec = b.record("Widget", None);
    let ctor = b.function_with_kind("Widget", vec![], Some(ctor_body), FunctionKind::Constructor(rec));

    let construct = b.construct(ctor, vec![]);
    let cstmt = b.expr_stmt(construct);
    let body = b.block(vec![cstmt]);
    let start = b.int(0);
    let end = b.int(10);
    let loop_id = b.block(vec![body]);
    let program = b.finish();

    let cand = CandidateLoop::Counted {
        loop_id,
        init_var: i,
        cond_var: i,
        inc_var: i,
        start,
        end,
        body,
    };
    let result = LoopAnalyzer::new(verbose()).analyze(&program, &cand);
    assert!(!result.parallelizable);
}

#[test]
fn constructor_writing_this_is_permitted() {
    let mut b = TreeBuilder::new();
    let int = b.int_type();
    let i = b.local("i", int);
    let field = b.member("value", int);
    let this = b.push(parloom::Node::This);
    let access = b.member_access(this, field);
    let one = b.int(1);
    let w = b.assign(access, one);
    let stmt = b.expr_stmt(w);
    let ctor_body = b.block(vec![stmt]);
    let rec = b.record("Widget", None);
    let ctor = b.function_with_kind("Widget", vec![], Some(ctor_body), FunctionKind::Constructor(rec));

    let construct = b.construct(ctor, vec![]);
    let cstmt = b.expr_stmt(construct);
    let body = b.block(vec![cstmt]);
    let start = b.int(0);
    let end = b.int(10);
    let loop_id = b.block(vec![body]);
    let program = b.finish();

    let cand = CandidateLoop::Counted {
        loop_id,
        init_var: i,
        cond_var: i,
        inc_var: i,
        start,
        end,
        body,
    };
    let result = LoopAnalyzer::new(verbose()).analyze(&program, &cand);
    assert!(result.parallelizable, "findings: {:?}", result.findings);
}

#[test]
fn destructor_of_constructed_record_is_explored_too() {
    let mut b = TreeBuilder::new();
    let int = b.int_type();
    let i = b.local("i", int);

    // ~Widget() { g = 1; } so the destructor global write disqualifies.
    let g = b.global("g", int);
    let gv = b.var(g);
    let one = b.int(1);
    let w = b.assign(gv, one);
    let stmt = b.expr_stmt(w);
    let dtor_body = b.block(vec![stmt]);
    // Record type wired up after both special members exist.
    let rec_placeholder = b.record("Widget", None);
    let dtor = b.function_with_kind(
        "~Widget",
        vec![],
        Some(dtor_body),
        FunctionKind::Destructor(rec_placeholder),
    );
    let rec = b.add_type(Type::Record {
        name: "Widget".to_string(),
        destructor: Some(dtor),
    });
    let ctor_body = b.block(vec![]);
    let ctor =
        b.function_with_kind("Widget", vec![], Some(ctor_body), FunctionKind::Constructor(rec));

    let construct = b.construct(ctor, vec![]);
    let cstmt = b.expr_stmt(construct);
    let body = b.block(vec![cstmt]);
    let start = b.int(0);
    let end = b.int(10);
    let loop_id = b.block(vec![body]);
    let program = b.finish();

    let cand = CandidateLoop::Counted {
        loop_id,
        init_var: i,
        cond_var: i,
        inc_var: i,
        start,
        end,
        body,
    };
    let result = LoopAnalyzer::new(verbose()).analyze(&program, &cand);
    assert!(!result.parallelizable);
}
