//! Plans serialize for host-side export.

use parloom::{AnalysisConfig, CandidateLoop, LoopAnalyzer, TransformationPlan, TreeBuilder};

#[test]
fn map_plan_serializes_with_element_bindings() {
    let mut b = TreeBuilder::new();
    let int = b.int_type();
    let ptr = b.pointer_to(int);
    let i = b.local("i", int);
    let out = b.local("out", ptr);
    let inp = b.local("in", ptr);

    let outv = b.var(out);
    let i1 = b.var(i);
    let lhs = b.index(outv, i1);
    let inv = b.var(inp);
    let i2 = b.var(i);
    let rhs = b.index(inv, i2);
    let write = b.assign(lhs, rhs);
    let stmt = b.expr_stmt(write);
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
    let result = LoopAnalyzer::new(AnalysisConfig::default()).analyze(&program, &cand);
    assert!(matches!(result.plans[0], TransformationPlan::Map(_)));

    let json = serde_json::to_string(&result).expect("serializable result");
    assert!(json.contains("parloom_in"));
    assert!(json.contains("\"parallelizable\":true"));
}
