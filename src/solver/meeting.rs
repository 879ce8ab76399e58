use super::{JointPlanOracle, OracleSolution};
use crate::algorithm::space_time_a_star;
use crate::common::{ConstraintSet, CostFunction, JointPlan};
use crate::scenario::Instance;
use crate::stat::Stats;

use tracing::{debug, trace};

/// Tries every free cell as the meeting point and keeps the cheapest one.
/// Each agent gets its own shortest constrained path there; collisions
/// between agents are left to the constraint tree above.
///
/// Bound to the instance it was built from: `solve` must be called with that
/// same instance.
#[derive(Debug, Clone)]
pub struct MeetingPointOracle {
    cost_function: CostFunction,
    // Unconstrained distances from every agent's start, indexed by agent id.
    distances: Vec<Vec<Vec<usize>>>,
}

impl MeetingPointOracle {
    pub fn new(instance: &Instance, cost_function: CostFunction) -> Self {
        let distances = instance
            .agents
            .iter()
            .map(|agent| instance.map.distances_from(agent.start))
            .collect();

        MeetingPointOracle {
            cost_function,
            distances,
        }
    }

    /// Cost if no constraint got in the way; `None` when some agent cannot
    /// reach the cell at all.
    fn lower_bound(&self, cell: (usize, usize)) -> Option<usize> {
        let mut steps = Vec::with_capacity(self.distances.len());
        for distances in &self.distances {
            let distance = distances[cell.0][cell.1];
            if distance == usize::MAX {
                return None;
            }
            steps.push(distance);
        }

        Some(match self.cost_function {
            CostFunction::SumOfCosts => steps.iter().sum(),
            CostFunction::Makespan => steps.iter().copied().max().unwrap_or(0),
        })
    }
}

impl JointPlanOracle for MeetingPointOracle {
    fn solve(
        &self,
        instance: &Instance,
        constraints: &ConstraintSet,
        stats: &mut Stats,
    ) -> Option<OracleSolution> {
        debug_assert_eq!(self.distances.len(), instance.agents.len());
        debug_assert!(self
            .distances
            .iter()
            .all(|grid| grid.len() == instance.map.height));
        let mut best: Option<OracleSolution> = None;

        'cells: for cell in instance.map.passable_cells() {
            let Some(bound) = self.lower_bound(cell) else {
                continue;
            };
            // Ties keep the earlier cell in row-major order.
            if best.as_ref().is_some_and(|best| bound >= best.cost) {
                continue;
            }

            let mut paths = Vec::with_capacity(instance.agents.len());
            for agent in &instance.agents {
                match space_time_a_star(&instance.map, agent, cell, constraints, stats) {
                    Some(path) => paths.push(path),
                    None => {
                        trace!("agent {} cannot reach {cell:?}", agent.id);
                        continue 'cells;
                    }
                }
            }

            let plan = JointPlan {
                paths,
                meeting_point: cell,
            };
            let cost = plan.cost(self.cost_function);
            if best.as_ref().map_or(true, |best| cost < best.cost) {
                trace!("new best meeting point {cell:?} with cost {cost}");
                best = Some(OracleSolution { plan, cost });
            }
        }

        match &best {
            Some(solution) => debug!(
                "meeting point {:?}, cost {}, {} constraints",
                solution.plan.meeting_point,
                solution.cost,
                constraints.len()
            ),
            None => debug!("no meeting point under {} constraints", constraints.len()),
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Agent, Constraint};
    use crate::map::Map;

    fn instance(rows: &[&str], starts: &[(usize, usize)]) -> Instance {
        let map = Map::from_rows(rows).unwrap();
        let agents = starts
            .iter()
            .enumerate()
            .map(|(id, &start)| Agent { id, start })
            .collect();
        Instance::new(map, agents).unwrap()
    }

    #[test]
    fn test_corridor_meets_in_the_middle() {
        let instance = instance(&["..."], &[(0, 0), (0, 2)]);
        let oracle = MeetingPointOracle::new(&instance, CostFunction::SumOfCosts);
        let stats = &mut Stats::default();

        let solution = oracle.solve(&instance, &ConstraintSet::new(), stats).unwrap();
        // (0, 0), (0, 1) and (0, 2) all cost 2; row-major order picks (0, 0).
        assert_eq!(solution.cost, 2);
        assert_eq!(solution.plan.meeting_point, (0, 0));
        assert_eq!(solution.plan.soc(), 2);
    }

    #[test]
    fn test_makespan_prefers_the_middle() {
        let instance = instance(&["..."], &[(0, 0), (0, 2)]);
        let oracle = MeetingPointOracle::new(&instance, CostFunction::Makespan);
        let stats = &mut Stats::default();

        let solution = oracle.solve(&instance, &ConstraintSet::new(), stats).unwrap();
        assert_eq!(solution.cost, 1);
        assert_eq!(solution.plan.meeting_point, (0, 1));
        assert_eq!(
            solution.plan.paths,
            vec![vec![(0, 0), (0, 1)], vec![(0, 2), (0, 1)]]
        );
        assert!(solution.plan.verify(&instance.map, &instance.agents));
    }

    #[test]
    fn test_constraints_raise_the_cost() {
        let instance = instance(&["..."], &[(0, 0), (0, 2)]);
        let oracle = MeetingPointOracle::new(&instance, CostFunction::Makespan);
        let stats = &mut Stats::default();

        let constraints: ConstraintSet = [Constraint::new(0, (0, 1), 1)].into_iter().collect();
        let solution = oracle.solve(&instance, &constraints, stats).unwrap();
        // Agent 0 cannot arrive at (0, 1) at time 1; meeting at either end costs 2.
        assert_eq!(solution.cost, 2);
        assert_eq!(solution.plan.meeting_point, (0, 0));
    }

    #[test]
    fn test_infeasible_when_start_is_forbidden() {
        let instance = instance(&["..."], &[(0, 0), (0, 2)]);
        let oracle = MeetingPointOracle::new(&instance, CostFunction::SumOfCosts);
        let stats = &mut Stats::default();

        let constraints: ConstraintSet = [Constraint::new(1, (0, 2), 0)].into_iter().collect();
        assert!(oracle.solve(&instance, &constraints, stats).is_none());
    }

    #[test]
    fn test_unreachable_agents_have_no_meeting_point() {
        let instance = instance(&[".@."], &[(0, 0), (0, 2)]);
        let oracle = MeetingPointOracle::new(&instance, CostFunction::SumOfCosts);
        let stats = &mut Stats::default();
        assert!(oracle.solve(&instance, &ConstraintSet::new(), stats).is_none());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_foreign_instance_is_rejected() {
        let corridor = instance(&["..."], &[(0, 0), (0, 2)]);
        let oracle = MeetingPointOracle::new(&corridor, CostFunction::SumOfCosts);
        let other = instance(&["...", "..."], &[(0, 0), (0, 2), (1, 1)]);
        oracle.solve(&other, &ConstraintSet::new(), &mut Stats::default());
    }
}
