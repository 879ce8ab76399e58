use super::{construct_path, heuristic_manhattan};
use crate::common::{Agent, Constraint, ConstraintSet, LowLevelNode, Path};
use crate::map::Map;
use crate::stat::Stats;

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument, trace};

/// Shortest constrained walk from the agent's start to `target`, waiting in
/// place where needed. Arrival at `target` ends the walk.
#[instrument(skip_all, name = "space_time_a_star", fields(agent = agent.id, start = format!("{:?}", agent.start), target = format!("{:?}", target)), level = "debug")]
pub(crate) fn space_time_a_star(
    map: &Map,
    agent: &Agent,
    target: (usize, usize),
    constraints: &ConstraintSet,
    stats: &mut Stats,
) -> Option<Path> {
    let constraints: Vec<&Constraint> = constraints.for_agent(agent.id).collect();
    let constraint_limit_time_step = constraints
        .iter()
        .map(|constraint| constraint.time_step)
        .max()
        .unwrap_or(0);
    trace!("constraints: {constraints:?}, limit time step: {constraint_limit_time_step:?}");

    // Nothing can move the agent off its start at time 0.
    if constraints.iter().any(|constraint| {
        constraint.time_step == 0
            && constraint.position == agent.start
            && constraint.direction.is_none()
    }) {
        debug!("start is forbidden at time 0");
        return None;
    }

    if !map.is_passable(target.0, target.1) {
        return None;
    }

    let mut open_list = BTreeSet::new();
    let mut closed_list = HashSet::new();
    let mut trace = HashMap::new();

    open_list.insert(LowLevelNode {
        position: agent.start,
        f_cost: heuristic_manhattan(agent.start, target),
        g_cost: 0,
        time_step: 0,
    });

    while let Some(current) = open_list.pop_first() {
        if !closed_list.insert((current.position, current.time_step)) {
            continue;
        }
        trace!("expand node: {current:?}");
        stats.low_level_expand_nodes += 1;

        if current.position == target {
            return Some(construct_path(
                &trace,
                (current.position, current.g_cost),
            ));
        }

        let exceed_constraints_limit_time_step = current.time_step > constraint_limit_time_step;
        let tentative_g_cost = current.g_cost + 1;

        // Tricky: after the last constraint time step the time is frozen at
        // T + 1, so the search space stays finite and waiting becomes useless.
        let tentative_time_step = if exceed_constraints_limit_time_step {
            current.time_step
        } else {
            current.time_step + 1
        };

        for &neighbor in &map.grid[current.position.0][current.position.1].neighbors {
            if exceed_constraints_limit_time_step && neighbor == current.position {
                continue;
            }

            if closed_list.contains(&(neighbor, tentative_time_step)) {
                continue;
            }

            if constraints.iter().any(|constraint| {
                constraint.is_violated(current.position, neighbor, tentative_g_cost)
            }) {
                continue;
            }

            // If this node has already in the open list, we ignore this update.
            if open_list.insert(LowLevelNode {
                position: neighbor,
                f_cost: tentative_g_cost + heuristic_manhattan(neighbor, target),
                g_cost: tentative_g_cost,
                time_step: tentative_time_step,
            }) {
                trace.insert(
                    (neighbor, tentative_g_cost),
                    (current.position, current.g_cost),
                );
            }
        }
    }

    debug!("cannot find path");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Direction;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    fn open_map() -> Map {
        Map::from_rows(&["...", "...", "..."]).unwrap()
    }

    fn agent() -> Agent {
        Agent {
            id: 0,
            start: (2, 2),
        }
    }

    // Ideal Path
    // [(2, 2), (1, 2), (0, 2), (0, 1), (0, 0)]
    // or
    // [(2, 2), (2, 1), (2, 0), (1, 0), (0, 0)]
    #[test]
    fn test_a_star_no_constraint() {
        init_tracing();
        let map = open_map();
        let stats = &mut Stats::default();
        let path = space_time_a_star(&map, &agent(), (0, 0), &ConstraintSet::new(), stats).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&(2, 2)));
        assert_eq!(path.last(), Some(&(0, 0)));
        assert!(stats.low_level_expand_nodes > 0);
    }

    #[test]
    fn test_a_star_start_is_target() {
        init_tracing();
        let map = open_map();
        let stats = &mut Stats::default();
        let path = space_time_a_star(&map, &agent(), (2, 2), &ConstraintSet::new(), stats).unwrap();
        assert_eq!(path, vec![(2, 2)]);
    }

    #[test]
    fn test_a_star_waits_when_boxed_in() {
        init_tracing();
        let map = open_map();
        let constraints: ConstraintSet = [
            Constraint::new(0, (1, 2), 1),
            Constraint::new(0, (2, 1), 1),
        ]
        .into_iter()
        .collect();
        let stats = &mut Stats::default();
        let path = space_time_a_star(&map, &agent(), (0, 0), &constraints, stats).unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(path[1], (2, 2));
    }

    #[test]
    fn test_a_star_target_constraint_delays_arrival() {
        init_tracing();
        let map = open_map();
        let constraints: ConstraintSet = [Constraint::new(0, (0, 0), 4)].into_iter().collect();
        let stats = &mut Stats::default();
        let path = space_time_a_star(&map, &agent(), (0, 0), &constraints, stats).unwrap();
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_a_star_ignores_other_agents_constraints() {
        init_tracing();
        let map = open_map();
        let constraints: ConstraintSet = [
            Constraint::new(1, (1, 2), 1),
            Constraint::new(1, (2, 1), 1),
        ]
        .into_iter()
        .collect();
        let stats = &mut Stats::default();
        let path = space_time_a_star(&map, &agent(), (0, 0), &constraints, stats).unwrap();
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_a_star_direction_constraint() {
        init_tracing();
        let map = Map::from_rows(&["..."]).unwrap();
        let agent = Agent {
            id: 0,
            start: (0, 0),
        };
        // Entering (0, 1) from the west at time 1 is forbidden, waiting first is fine.
        let constraints: ConstraintSet = [Constraint::new(0, (0, 1), 1).with_direction(Direction::East)]
            .into_iter()
            .collect();
        let stats = &mut Stats::default();
        let path = space_time_a_star(&map, &agent, (0, 2), &constraints, stats).unwrap();
        assert_eq!(path, vec![(0, 0), (0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn test_a_star_infeasible() {
        init_tracing();
        let map = Map::from_rows(&[".@."]).unwrap();
        let agent = Agent {
            id: 0,
            start: (0, 0),
        };
        let stats = &mut Stats::default();
        assert!(space_time_a_star(&map, &agent, (0, 2), &ConstraintSet::new(), stats).is_none());

        let map = open_map();
        let constraints: ConstraintSet = [Constraint::new(0, (0, 0), 0)].into_iter().collect();
        assert!(space_time_a_star(&map, &agent, (1, 1), &constraints, stats).is_none());
    }
}
