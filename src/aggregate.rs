//! Plan aggregation and fusion.
//!
//! After traversal the recognized patterns combine into plans:
//!
//! - exactly one map and one reduce, with the reduce consuming the map's
//!   output, fuse into a single `MapReduce`;
//! - otherwise each map and each reduce becomes its own plan;
//! - a loop that lost its parallelizable status emits a single `None` plan.
//!
//! Across loops, the session keeps the most recent loop's plan: a reduce
//! loop whose input is the immediately preceding map loop's output fuses
//! into one `FusedAcrossLoops` plan spanning both, replacing the separate
//! emissions. The session also remembers every loop covered by a completed
//! parallelizable analysis so the host can skip re-offering plans for it.

use crate::canon;
use crate::patterns::{CrossLoopFusion, MapPattern, ReducePattern, TransformationPlan};
use crate::shape::LoopDescriptor;
use crate::state::AnalysisState;
use crate::tree::{NodeId, Program};
use log::{debug, info};
use std::collections::HashSet;

/// Cross-loop context, threaded by the caller through every analysis in a
/// translation unit. Replaces any notion of global "already seen" state.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    covered_loops: HashSet<NodeId>,
    previous: Option<(NodeId, TransformationPlan)>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a loop was already covered by an earlier parallelizable
    /// analysis (directly or through a callee body).
    pub fn was_covered(&self, loop_id: NodeId) -> bool {
        self.covered_loops.contains(&loop_id)
    }
}

fn same_base(p: &Program, a: NodeId, b: NodeId) -> bool {
    match (canon::base_decl(p, a), canon::base_decl(p, b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn fusable(p: &Program, map: &MapPattern, reduce: &ReducePattern) -> bool {
    reduce
        .inputs
        .first()
        .map(|input| same_base(p, map.output, *input))
        .unwrap_or(false)
}

/// Combine the state's pattern lists into plans and update the session.
pub fn aggregate(
    p: &Program,
    desc: &LoopDescriptor,
    st: AnalysisState,
    session: &mut AnalysisSession,
) -> Vec<TransformationPlan> {
    let mut plans = Vec::new();

    if st.parallelizable {
        let mut map_list = st.map_list;
        let mut reduce_list = st.reduce_list;

        if map_list.len() == 1 && reduce_list.len() == 1 && fusable(p, &map_list[0], &reduce_list[0])
        {
            info!("map-reduce pattern detected");
            plans.push(TransformationPlan::MapReduce(
                map_list.remove(0),
                reduce_list.remove(0),
            ));
        } else {
            for m in map_list {
                info!("map pattern detected");
                plans.push(TransformationPlan::Map(m));
            }
            for r in reduce_list {
                info!("reduce pattern detected");
                plans.push(TransformationPlan::Reduce(r));
            }
            if plans.is_empty() {
                plans.push(TransformationPlan::None);
            }
        }

        session.covered_loops.insert(desc.loop_id);
        session.covered_loops.extend(st.visited_loops);
    } else {
        debug!("loop not parallelizable; no plan offered");
        plans.push(TransformationPlan::None);
    }

    // Cross-loop fusion: this loop is a lone reduce over the previous
    // loop's map output.
    let fused = match plans.as_slice() {
        [TransformationPlan::Reduce(reduce)] => match &session.previous {
            Some((prev_loop, TransformationPlan::Map(map))) if fusable(p, map, reduce) => {
                Some(TransformationPlan::FusedAcrossLoops(Box::new(
                    CrossLoopFusion {
                        previous_loop: *prev_loop,
                        map: map.clone(),
                        current_loop: desc.loop_id,
                        reduce: reduce.clone(),
                    },
                )))
            }
            _ => None,
        },
        _ => None,
    };
    if let Some(plan) = fused {
        info!("fusing reduce with preceding map loop");
        plans = vec![plan];
    }

    session.previous = Some((desc.loop_id, plans[0].clone()));
    plans
}
