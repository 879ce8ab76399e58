mod highlevel;
mod lowlevel;

pub use highlevel::{
    detect_conflicts, Conflict, ConflictChoice, Constraint, ConstraintSet, Direction, Side,
};
pub(crate) use highlevel::{ConstraintTree, ExpansionState, NodeId};
pub(crate) use lowlevel::LowLevelNode;

use crate::map::Map;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub type Path = Vec<(usize, usize)>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: (usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum CostFunction {
    #[default]
    #[serde(rename = "soc")]
    #[value(name = "soc")]
    SumOfCosts,
    #[serde(rename = "makespan")]
    #[value(name = "makespan")]
    Makespan,
}

/// Per-agent paths that all end at one shared meeting point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JointPlan {
    pub paths: Vec<Path>,
    pub meeting_point: (usize, usize),
}

impl JointPlan {
    // Notice: path include start position, so an agent already standing at the
    // meeting point costs nothing.
    pub fn soc(&self) -> usize {
        self.paths
            .iter()
            .map(|path| path.len().saturating_sub(1))
            .sum()
    }

    pub fn makespan(&self) -> usize {
        self.paths
            .iter()
            .map(|path| path.len().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }

    pub fn cost(&self, cost_function: CostFunction) -> usize {
        match cost_function {
            CostFunction::SumOfCosts => self.soc(),
            CostFunction::Makespan => self.makespan(),
        }
    }

    /// Checks that every path is a legal walk from its agent's start to the
    /// meeting point and that no two agents collide on the way.
    pub fn verify(&self, map: &Map, agents: &[Agent]) -> bool {
        if self.paths.len() != agents.len() {
            return false;
        }

        for (agent, path) in agents.iter().zip(&self.paths) {
            let (Some(first), Some(last)) = (path.first(), path.last()) else {
                return false;
            };
            if *first != agent.start || *last != self.meeting_point {
                return false;
            }
            if path.iter().any(|&(x, y)| !map.in_bounds(x, y) || !map.is_passable(x, y)) {
                return false;
            }
            if path
                .windows(2)
                .any(|step| !map.get_neighbors(step[0].0, step[0].1).contains(&step[1]))
            {
                return false;
            }
        }

        detect_conflicts(&self.paths).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map() -> Map {
        Map::from_rows(&["...", "...", "..."]).unwrap()
    }

    #[test]
    fn test_plan_costs() {
        let plan = JointPlan {
            paths: vec![
                vec![(0, 0), (0, 1), (1, 1)],
                vec![(1, 1)],
                vec![(2, 2), (2, 1), (2, 1), (1, 1)],
            ],
            meeting_point: (1, 1),
        };
        assert_eq!(plan.soc(), 5);
        assert_eq!(plan.makespan(), 3);
        assert_eq!(plan.cost(CostFunction::SumOfCosts), 5);
        assert_eq!(plan.cost(CostFunction::Makespan), 3);
    }

    #[test]
    fn test_verify_accepts_legal_plan() {
        let map = open_map();
        let agents = vec![
            Agent { id: 0, start: (0, 0) },
            Agent { id: 1, start: (2, 2) },
        ];
        let plan = JointPlan {
            paths: vec![vec![(0, 0), (0, 1), (1, 1)], vec![(2, 2), (2, 1), (1, 1)]],
            meeting_point: (1, 1),
        };
        assert!(plan.verify(&map, &agents));
    }

    #[test]
    fn test_verify_rejects_teleport_and_wrong_start() {
        let map = open_map();
        let agents = vec![Agent { id: 0, start: (0, 0) }];

        let teleport = JointPlan {
            paths: vec![vec![(0, 0), (2, 2)]],
            meeting_point: (2, 2),
        };
        assert!(!teleport.verify(&map, &agents));

        let wrong_start = JointPlan {
            paths: vec![vec![(0, 1), (1, 1)]],
            meeting_point: (1, 1),
        };
        assert!(!wrong_start.verify(&map, &agents));
    }

    #[test]
    fn test_verify_rejects_collision_en_route() {
        let map = open_map();
        let agents = vec![
            Agent { id: 0, start: (0, 0) },
            Agent { id: 1, start: (0, 2) },
        ];
        let plan = JointPlan {
            paths: vec![
                vec![(0, 0), (0, 1), (1, 1), (2, 1)],
                vec![(0, 2), (0, 1), (1, 1), (2, 1)],
            ],
            meeting_point: (2, 1),
        };
        assert!(!plan.verify(&map, &agents));
    }
}
