//! parloom: loop-dependence analysis and Map/Reduce pattern classification.
//!
//! Given one loop in one of three canonical shapes, parloom decides whether
//! its iterations are independent enough to re-express as a data-parallel
//! map, an associative reduce, or a fused map-reduce, and emits a
//! structured transformation plan for a downstream rewriter. The analysis
//! is conservative by construction: an unsafe loop is never classified as
//! safe, while an unprovable one degrades to "no plan".
//!
//! # Pipeline Flow
//! ```text
//! host tree → Normalizer → Traversal Engine → Pattern Aggregator → plan(s)
//!                 ↓              ↓                    ↓
//!          LoopDescriptor  AnalysisState      MapReduce fusion,
//!                          (writes, reads,    cross-loop fusion
//!                          pointers, calls)
//! ```
//!
//! # Module Organization
//!
//! ## Host Interface
//! - [`tree`]: expression/statement tree, declaration and type tables
//! - [`config`]: analysis configuration
//! - [`shape`]: loop shapes, candidates, and per-shape element strategy
//!
//! ## Analysis Core
//! - [`normalize`]: header validation and the restriction predicate
//! - [`explorer`]: the single depth-first traversal
//! - [`writes`]: write-target classification
//! - [`subscript`]: indexed-access tracking and consistency
//! - [`pointer`]: raw-pointer provenance validation
//! - [`reduce`]: reduce and map-assignment recognition
//! - [`calls`]: memoized callee/constructor/destructor exploration
//!
//! ## Results
//! - [`state`]: per-loop analysis state and merge semantics
//! - [`patterns`]: recognized patterns and transformation plans
//! - [`aggregate`]: plan emission and fusion, cross-loop session
//! - [`findings`]: structured safety findings
//! - [`analyzer`]: the per-candidate entry point
//!
//! # Example
//! ```
//! use parloom::{AnalysisConfig, CandidateLoop, LoopAnalyzer, TransformationPlan, TreeBuilder};
//!
//! // for (int i = 0; i < 10; ++i) out[i] = in[i];
//! let mut b = TreeBuilder::new();
//! let int = b.int_type();
//! let ptr = b.pointer_to(int);
//! let i = b.local("i", int);
//! let out = b.local("out", ptr);
//! let inp = b.local("in", ptr);
//! let outv = b.var(out);
//! let iv1 = b.var(i);
//! let lhs = b.index(outv, iv1);
//! let inv = b.var(inp);
//! let iv2 = b.var(i);
//! let rhs = b.index(inv, iv2);
//! let write = b.assign(lhs, rhs);
//! let stmt = b.expr_stmt(write);
//! let body = b.block(vec![stmt]);
//! let start = b.int(0);
//! let end = b.int(10);
//! let loop_id = b.block(vec![body]);
//! let program = b.finish();
//!
//! let candidate = CandidateLoop::Counted {
//!     loop_id,
//!     init_var: i,
//!     cond_var: i,
//!     inc_var: i,
//!     start,
//!     end,
//!     body,
//! };
//! let mut analyzer = LoopAnalyzer::new(AnalysisConfig::default());
//! let result = analyzer.analyze(&program, &candidate);
//! assert!(result.parallelizable);
//! assert!(matches!(result.plans[0], TransformationPlan::Map(_)));
//! ```

// ============================================================================
// Host Interface
// ============================================================================

pub mod config;
pub mod shape;
pub mod tree;

// ============================================================================
// Analysis Core
// ============================================================================

pub mod calls;
pub mod canon;
pub mod explorer;
pub mod normalize;
pub mod pointer;
pub mod reduce;
pub mod subscript;
pub mod writes;

// ============================================================================
// Results
// ============================================================================

pub mod aggregate;
pub mod analyzer;
pub mod findings;
pub mod patterns;
pub mod state;

pub use aggregate::AnalysisSession;
pub use analyzer::{AnalysisOutcome, LoopAnalysis, LoopAnalyzer};
pub use canon::{as_element_access, base_decl, canonical_eq, ElementAccess};
pub use config::AnalysisConfig;
pub use findings::{Finding, SafetyReason, Severity};
pub use normalize::{normalize, NormalizeError};
pub use patterns::{
    Combiner, CrossLoopFusion, ElementBinding, MapPattern, ReduceOp, ReducePattern,
    TransformationPlan, ELEMENT_PREFIX,
};
pub use shape::{CandidateLoop, ElementForm, LoopDescriptor, LoopShape};
pub use state::{AccessRecord, AnalysisState, SelectorForm};
pub use subscript::SubscriptClass;
pub use tree::{
    BinOp, DeclId, DeclInfo, FunctionInfo, FunctionKind, IncDecOp, Node, NodeId, OverloadedOp,
    Program, Storage, TreeBuilder, Type, TypeId, UnaryOp,
};
