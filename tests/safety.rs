//! Safety-violation table: every disqualifying construct ends in a `None`
//! plan, and verbose mode names the reason.

use parloom::{
    AnalysisConfig, AnalysisOutcome, BinOp, CandidateLoop, LoopAnalyzer, Node, SafetyReason,
    TransformationPlan, TreeBuilder,
};

fn verbose() -> AnalysisConfig {
    AnalysisConfig {
        verbose: true,
        ..AnalysisConfig::default()
    }
}

/// Builds `for (int i = 0; i < 10; ++i) { <stmts> }` around caller-built
/// statements and analyzes it.
fn analyze_counted_body(
    build: impl FnOnce(&mut TreeBuilder, parloom::DeclId) -> Vec<parloom::NodeId>,
    config: AnalysisConfig,
) -> (parloom::Program, parloom::LoopAnalysis) {
    let mut b = TreeBuilder::new();
    let int = b.int_type();
    let i = b.local("i", int);
    let stmts = build(&mut b, i);
    let body = b.block(stmts);
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
    let result = LoopAnalyzer::new(config).analyze(&program, &cand);
    (program, result)
}

#[test]
fn goto_break_return_always_yield_no_plan() {
    let nodes: [fn(&mut TreeBuilder) -> parloom::NodeId; 3] = [
        |b| b.push(Node::Goto),
        |b| b.push(Node::Break),
        |b| b.push(Node::Return { value: None }),
    ];
    for make in nodes {
        let (_, result) = analyze_counted_body(|b, _| vec![make(b)], AnalysisConfig::default());
        // These fail the restriction predicate before analysis starts.
        assert_eq!(result.outcome, AnalysisOutcome::StructuralMismatch);
        assert_eq!(result.plans, vec![TransformationPlan::None]);
    }
}

#[test]
fn goto_nested_under_an_if_still_yields_no_plan() {
    let (_, result) = analyze_counted_body(
        |b, _| {
            let cond = b.int(1);
            let goto = b.push(Node::Goto);
            let then_body = b.block(vec![goto]);
            vec![b.push(Node::If {
                cond,
                then_body,
                else_body: None,
            })]
        },
        AnalysisConfig::default(),
    );
    assert_eq!(result.outcome, AnalysisOutcome::StructuralMismatch);
    assert_eq!(result.plans, vec![TransformationPlan::None]);
}

#[test]
fn throw_in_body_disqualifies() {
    let (_, result) = analyze_counted_body(
        |b, _| {
            let t = b.push(Node::Throw { value: None });
            vec![t]
        },
        verbose(),
    );
    assert_eq!(result.outcome, AnalysisOutcome::Analyzed);
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::ThrowStmt));
}

#[test]
fn write_to_outside_variable_disqualifies() {
    let (_, result) = analyze_counted_body(
        |b, _| {
            let int = b.int_type();
            let x = b.local("x", int);
            let xv = b.var(x);
            let one = b.int(1);
            let w = b.assign(xv, one);
            vec![b.expr_stmt(w)]
        },
        verbose(),
    );
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::NonLocalWrite));
}

#[test]
fn write_to_loop_local_variable_is_fine() {
    let (_, result) = analyze_counted_body(
        |b, _| {
            let int = b.int_type();
            let x = b.local("x", int);
            let decl = b.decl_stmt(x);
            let xv = b.var(x);
            let one = b.int(1);
            let w = b.assign(xv, one);
            vec![decl, b.expr_stmt(w)]
        },
        AnalysisConfig::default(),
    );
    assert!(result.parallelizable);
    // Nothing to parallelize either: a loop of local writes has no pattern.
    assert_eq!(result.plans, vec![TransformationPlan::None]);
}

#[test]
fn loop_variable_outside_subscript_disqualifies() {
    let (_, result) = analyze_counted_body(
        |b, i| {
            let int = b.int_type();
            let x = b.local("x", int);
            let decl = b.decl_stmt(x);
            let xv = b.var(x);
            let iv = b.var(i);
            let w = b.assign(xv, iv);
            vec![decl, b.expr_stmt(w)]
        },
        verbose(),
    );
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::LoopVariableMisuse));
}

#[test]
fn inconsistent_subscripts_disqualify() {
    // out[i] = out[i + 0]? No: one write under `i`, one read under literal.
    let (_, result) = analyze_counted_body(
        |b, i| {
            let int = b.int_type();
            let ptr = b.pointer_to(int);
            let out = b.local("out", ptr);
            let o1 = b.var(out);
            let iv = b.var(i);
            let lhs = b.index(o1, iv);
            let o2 = b.var(out);
            let two = b.int(2);
            let rhs = b.index(o2, two);
            let w = b.assign(lhs, rhs);
            vec![b.expr_stmt(w)]
        },
        verbose(),
    );
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| matches!(f.reason, SafetyReason::InconsistentSubscript { .. })));
}

#[test]
fn non_literal_non_induction_subscript_disqualifies() {
    let (_, result) = analyze_counted_body(
        |b, i| {
            let int = b.int_type();
            let ptr = b.pointer_to(int);
            let out = b.local("out", ptr);
            let o1 = b.var(out);
            let iv = b.var(i);
            let one = b.int(1);
            let shifted = b.binary(BinOp::Add, iv, one);
            let lhs = b.index(o1, shifted);
            let zero = b.int(0);
            let w = b.assign(lhs, zero);
            vec![b.expr_stmt(w)]
        },
        verbose(),
    );
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::InvalidSubscript));
}

#[test]
fn reserved_prefix_declaration_disqualifies() {
    let (_, result) = analyze_counted_body(
        |b, _| {
            let int = b.int_type();
            let x = b.local("parloom_out", int);
            vec![b.decl_stmt(x)]
        },
        verbose(),
    );
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::ReservedNameCollision));
}

#[test]
fn closure_in_body_disqualifies() {
    let (_, result) = analyze_counted_body(
        |b, _| {
            let inner = b.block(vec![]);
            let lambda = b.push(Node::Lambda { body: inner });
            vec![b.expr_stmt(lambda)]
        },
        verbose(),
    );
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::Closure));
}

#[test]
fn bare_deref_read_disqualifies_a_counted_loop() {
    let (_, result) = analyze_counted_body(
        |b, _| {
            let int = b.int_type();
            let ptr = b.pointer_to(int);
            let p = b.local("p", ptr);
            let x = b.local("x", int);
            let decl = b.decl_stmt(x);
            let xv = b.var(x);
            let pv = b.var(p);
            let read = b.deref(pv);
            let w = b.assign(xv, read);
            vec![decl, b.expr_stmt(w)]
        },
        verbose(),
    );
    assert!(!result.parallelizable);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == SafetyReason::InvalidDereference));
}

#[test]
fn verbose_flag_only_controls_finding_collection() {
    let build = |b: &mut TreeBuilder, _i: parloom::DeclId| {
        let t = b.push(Node::Throw { value: None });
        vec![t]
    };
    let (_, quiet) = analyze_counted_body(build, AnalysisConfig::default());
    let (_, loud) = analyze_counted_body(build, verbose());
    assert_eq!(quiet.parallelizable, loud.parallelizable);
    assert!(quiet.findings.is_empty());
    assert!(!loud.findings.is_empty());
}
