//! Analysis entry point.
//!
//! [`LoopAnalyzer`] owns the configuration and the cross-loop session, and
//! runs the full pipeline for each candidate the host hands it: normalize
//! the header, walk the body, aggregate patterns into plans. Every outcome
//! is a value; nothing here aborts.

use crate::aggregate::{self, AnalysisSession};
use crate::config::AnalysisConfig;
use crate::explorer::Explorer;
use crate::findings::{Finding, SafetyReason};
use crate::normalize;
use crate::patterns::TransformationPlan;
use crate::shape::CandidateLoop;
use crate::state::AnalysisState;
use crate::tree::{NodeId, Program};
use log::debug;
use serde::Serialize;

/// How far a candidate got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisOutcome {
    /// Fully analyzed; `plans` holds the verdict.
    Analyzed,
    /// Header or body failed normalization; analysis was not attempted.
    StructuralMismatch,
    /// An earlier parallelizable analysis already covered this loop.
    AlreadyCovered,
}

/// Per-loop analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct LoopAnalysis {
    pub loop_id: NodeId,
    pub outcome: AnalysisOutcome,
    pub parallelizable: bool,
    /// One or more plans; always at least a `None` plan, so "nothing
    /// offered" looks the same for skipped and disqualified loops.
    pub plans: Vec<TransformationPlan>,
    /// Collected findings; empty unless the configuration is verbose.
    pub findings: Vec<Finding>,
}

/// The analyzer facade: configuration plus cross-loop session state.
pub struct LoopAnalyzer {
    config: AnalysisConfig,
    session: AnalysisSession,
}

impl LoopAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        LoopAnalyzer {
            config,
            session: AnalysisSession::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one candidate loop against the program it lives in.
    pub fn analyze(&mut self, p: &Program, candidate: &CandidateLoop) -> LoopAnalysis {
        let loop_id = candidate.loop_id();

        if self.session.was_covered(loop_id) {
            debug!("loop already covered by an earlier analysis");
            return LoopAnalysis {
                loop_id,
                outcome: AnalysisOutcome::AlreadyCovered,
                parallelizable: true,
                plans: vec![TransformationPlan::None],
                findings: Vec::new(),
            };
        }

        let desc = match normalize::normalize(p, candidate) {
            Ok(desc) => desc,
            Err(err) => {
                debug!("structural mismatch: {}", err);
                return LoopAnalysis {
                    loop_id,
                    outcome: AnalysisOutcome::StructuralMismatch,
                    parallelizable: false,
                    plans: vec![TransformationPlan::None],
                    findings: Vec::new(),
                };
            }
        };

        let mut st = AnalysisState::new(&self.config);
        st.visited_loops.insert(loop_id);

        if let Some(trip) = desc.trip_count(p) {
            if trip < self.config.integer_loop_size_min {
                st.record(SafetyReason::BelowSizeThreshold, loop_id);
            }
        }

        Explorer::new(p, &desc, &self.config).run(&mut st);

        let parallelizable = st.parallelizable;
        let findings = std::mem::take(&mut st.findings);
        let plans = aggregate::aggregate(p, &desc, st, &mut self.session);

        LoopAnalysis {
            loop_id,
            outcome: AnalysisOutcome::Analyzed,
            parallelizable,
            plans,
            findings,
        }
    }
}
