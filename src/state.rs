//! Mutable per-loop analysis state.
//!
//! One [`AnalysisState`] exists per loop instance under analysis. Exploring
//! a callee, constructor, or destructor clones a child state (visited-set
//! snapshots travel along, scalar facts start fresh), runs the same
//! traversal over the callee body, and merges the child back into the
//! parent: `parallelizable` combines by AND, visited sets by union, findings
//! by append. Nothing is ever merged by overwrite.

use crate::config::AnalysisConfig;
use crate::findings::{Finding, SafetyReason, Severity};
use crate::patterns::{MapPattern, ReducePattern};
use crate::tree::{DeclId, NodeId};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashSet;

/// Shape of an indexed access's selector, kept on every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectorForm {
    IterationVariable,
    IntegerLiteral(i64),
    Other,
}

/// One indexed access to a tracked base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessRecord {
    pub base: DeclId,
    /// The selector expression as written.
    pub index: NodeId,
    pub selector: SelectorForm,
    /// The access expression itself; node identity deduplicates a read that
    /// is really the write already on record.
    pub origin: NodeId,
}

#[derive(Debug, Clone)]
pub struct AnalysisState {
    /// Monotonic: once cleared, never set again.
    pub parallelizable: bool,

    /// Declarations seen so far in this lexical traversal. Append-only; a
    /// name is not removed when its inner block closes.
    pub local_variables: HashSet<DeclId>,

    /// Pointer bases already validated, so each is checked once.
    pub explored_pointers: HashSet<DeclId>,

    /// Callees already analyzed; guards recursion across calls,
    /// constructors, and destructors.
    pub visited_functions: HashSet<DeclId>,

    /// Loops already entered; re-entry through a call chain is recursion.
    pub visited_loops: HashSet<NodeId>,

    pub read_accesses: Vec<AccessRecord>,
    pub write_accesses: Vec<AccessRecord>,

    pub map_list: Vec<MapPattern>,
    pub reduce_list: Vec<ReducePattern>,

    /// Element reads seen outside any map site, waiting for the next map
    /// assignment to claim them.
    pub pending_elements: Vec<NodeId>,
    /// One representative read per base, paired with `pending_elements`.
    pub pending_inputs: Vec<NodeId>,

    /// Element expressions already written through (iterator/element-range
    /// shapes); a written element is not also an input element.
    pub element_writes: Vec<NodeId>,

    /// Iteration-variable references sanctioned by an enclosing recognized
    /// selector position (subscript index, iterator dereference). A
    /// reference outside this set is a misuse.
    pub selector_uses: HashSet<NodeId>,

    pub findings: Vec<Finding>,

    /// Writes through `this` are valid only inside constructor/destructor
    /// re-entry.
    pub is_this_valid: bool,

    verbose: bool,
}

impl AnalysisState {
    pub fn new(config: &AnalysisConfig) -> Self {
        AnalysisState {
            parallelizable: true,
            local_variables: HashSet::new(),
            explored_pointers: HashSet::new(),
            visited_functions: HashSet::new(),
            visited_loops: HashSet::new(),
            read_accesses: Vec::new(),
            write_accesses: Vec::new(),
            map_list: Vec::new(),
            reduce_list: Vec::new(),
            pending_elements: Vec::new(),
            pending_inputs: Vec::new(),
            element_writes: Vec::new(),
            selector_uses: HashSet::new(),
            findings: Vec::new(),
            is_this_valid: false,
            verbose: config.verbose,
        }
    }

    pub fn is_local(&self, decl: DeclId) -> bool {
        self.local_variables.contains(&decl)
    }

    /// Record a finding. `Error`-severity reasons clear `parallelizable`;
    /// the finding itself is kept only in verbose mode.
    pub fn record(&mut self, reason: SafetyReason, node: NodeId) {
        if reason.severity() == Severity::Error {
            if self.parallelizable {
                warn!("loop not parallelizable: {}", reason.label());
            }
            self.parallelizable = false;
        } else {
            debug!("soft finding: {}", reason.label());
        }
        if self.verbose {
            self.findings.push(Finding { reason, node });
        }
    }

    /// Child state for a callee/constructor/destructor sub-pass. Visited
    /// sets travel with the child so memoization holds across the boundary;
    /// locals are reset to the supplied seed (builtin-typed parameters for
    /// calls, nothing for constructors).
    pub fn child_for_call(&self, locals: HashSet<DeclId>, is_this_valid: bool) -> Self {
        AnalysisState {
            parallelizable: true,
            local_variables: locals,
            explored_pointers: HashSet::new(),
            visited_functions: self.visited_functions.clone(),
            visited_loops: self.visited_loops.clone(),
            read_accesses: Vec::new(),
            write_accesses: Vec::new(),
            map_list: Vec::new(),
            reduce_list: Vec::new(),
            pending_elements: Vec::new(),
            pending_inputs: Vec::new(),
            element_writes: Vec::new(),
            selector_uses: HashSet::new(),
            findings: Vec::new(),
            is_this_valid,
            verbose: self.verbose,
        }
    }

    /// Merge a finished sub-pass back into this state.
    pub fn absorb_child(&mut self, child: AnalysisState) {
        self.parallelizable &= child.parallelizable;
        self.visited_loops.extend(child.visited_loops);
        self.visited_functions.extend(child.visited_functions);
        self.findings.extend(child.findings);
    }
}
