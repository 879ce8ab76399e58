mod cbs;
mod closedlist;
mod meeting;
mod openlist;

pub use cbs::{ExpansionMode, SearchOutcome, SearchReport, CBS, NO_SOLUTION_COST, TIMEOUT_COST};
pub use meeting::MeetingPointOracle;

use crate::common::{ConstraintSet, JointPlan};
use crate::scenario::Instance;
use crate::stat::Stats;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSolution {
    pub plan: JointPlan,
    pub cost: usize,
}

/// Low-level solver behind the constraint tree. Must behave as a pure
/// function of the instance and the constraint set within one run; `None`
/// means no joint plan satisfies the constraints.
pub trait JointPlanOracle {
    fn solve(
        &self,
        instance: &Instance,
        constraints: &ConstraintSet,
        stats: &mut Stats,
    ) -> Option<OracleSolution>;
}
