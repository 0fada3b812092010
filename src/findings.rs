//! Structured analysis findings.
//!
//! The engine never renders diagnostics; it records *why* a loop lost its
//! parallelizable status (or why a site looked suspicious without being
//! disqualifying) as typed findings the host can format. Findings are only
//! collected when [`AnalysisConfig::verbose`](crate::config::AnalysisConfig)
//! is set; the verdict itself never depends on them.

use crate::tree::{DeclId, NodeId};
use serde::Serialize;

/// Severity of a finding.
///
/// `Error` findings are the ones that cleared `parallelizable`; `Warning`
/// and `Info` findings never affect the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Enumerated reasons a site was flagged during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SafetyReason {
    /// Write to a variable declared outside the loop.
    NonLocalWrite,
    /// Write to globally stored data (global member, `this` outside a
    /// constructor/destructor).
    GlobalWrite,
    /// Two accesses to one base under non-equal subscripts.
    InconsistentSubscript { base: DeclId },
    /// Subscript that is neither the iteration variable nor a literal.
    InvalidSubscript,
    /// Pointer base without a traceable owning allocation, or reassigned.
    UnsafePointer,
    /// The same loop was entered twice through a call chain.
    Recursion,
    ThrowStmt,
    GotoStmt,
    /// Callee body not visible or callee expression not resolvable.
    UnexplorableCall,
    /// Callee body itself failed the analysis.
    UnsafeCallee,
    /// Iteration variable used outside a recognized index/selector position.
    LoopVariableMisuse,
    /// Write target of a shape the classifier does not accept.
    UnsafeWriteTarget,
    /// Dereference that is not a recognized element access.
    InvalidDereference,
    /// A declaration collides with the reserved element-name prefix,
    /// indicating an already-rewritten loop.
    ReservedNameCollision,
    /// Closures are rejected, not analyzed.
    Closure,
    /// Known literal trip count below the configured minimum.
    BelowSizeThreshold,
    /// Overloaded operator semantics are not tracked.
    OverloadedOperator,
    /// Subscript range check skipped because a loop bound is symbolic.
    UndecidableSubscript,
}

impl SafetyReason {
    pub fn severity(&self) -> Severity {
        match self {
            SafetyReason::OverloadedOperator => Severity::Warning,
            SafetyReason::UndecidableSubscript => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// Short host-facing label. Stable across releases; hosts that need
    /// prose should map on the variant instead.
    pub fn label(&self) -> &'static str {
        match self {
            SafetyReason::NonLocalWrite => "write to variable declared outside loop",
            SafetyReason::GlobalWrite => "write to globally stored data",
            SafetyReason::InconsistentSubscript { .. } => "inconsistent array subscription",
            SafetyReason::InvalidSubscript => "subscript is not iteration variable or literal",
            SafetyReason::UnsafePointer => "pointer without traceable owning allocation",
            SafetyReason::Recursion => "loop re-entered through call chain",
            SafetyReason::ThrowStmt => "throw in loop body",
            SafetyReason::GotoStmt => "goto in loop body",
            SafetyReason::UnexplorableCall => "call cannot be explored",
            SafetyReason::UnsafeCallee => "called function body is unsafe",
            SafetyReason::LoopVariableMisuse => "iteration variable used outside subscript",
            SafetyReason::UnsafeWriteTarget => "unsupported write target",
            SafetyReason::InvalidDereference => "dereference is not an element access",
            SafetyReason::ReservedNameCollision => "reserved element name in scope",
            SafetyReason::Closure => "closure in loop body",
            SafetyReason::BelowSizeThreshold => "trip count below configured minimum",
            SafetyReason::OverloadedOperator => "overloaded operator semantics unknown",
            SafetyReason::UndecidableSubscript => "subscript range not checkable",
        }
    }
}

/// One recorded finding, anchored at the node that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub reason: SafetyReason,
    pub node: NodeId,
}

impl Finding {
    pub fn severity(&self) -> Severity {
        self.reason.severity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_reasons_are_errors() {
        assert_eq!(SafetyReason::GlobalWrite.severity(), Severity::Error);
        assert_eq!(SafetyReason::Recursion.severity(), Severity::Error);
        assert_eq!(
            SafetyReason::BelowSizeThreshold.severity(),
            Severity::Error
        );
    }

    #[test]
    fn soft_reasons_do_not_disqualify() {
        assert!(SafetyReason::OverloadedOperator.severity() < Severity::Error);
        assert!(SafetyReason::UndecidableSubscript.severity() < Severity::Error);
    }
}
