mod astar;

pub(crate) use astar::space_time_a_star;

use std::collections::HashMap;

use crate::common::Path;

type Trace = HashMap<((usize, usize), usize), ((usize, usize), usize)>;

fn heuristic_manhattan(position: (usize, usize), target: (usize, usize)) -> usize {
    position.0.abs_diff(target.0) + position.1.abs_diff(target.1)
}

fn construct_path(trace: &Trace, mut current: ((usize, usize), usize)) -> Path {
    let mut path = vec![current.0];
    while let Some(&(pos, g_cost)) = trace.get(&current) {
        path.push(pos);
        current = (pos, g_cost);
    }
    path.reverse();
    path
}
