use serde::Serialize;
use tracing::info;

/// Counters for one search run. Only ever incremented while solving.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub costs: i64,
    pub time_us: usize,
    pub solution_depth: i64,
    pub high_level_expand_nodes: usize,
    pub high_level_generate_nodes: usize,
    pub closed_list_hits: usize,
    pub infeasible_nodes: usize,
    pub nodes_pushed_back: usize,
    pub nodes_expanded_with_goal_cost: usize,
    pub low_level_expand_nodes: usize,
}

impl Stats {
    pub fn print(&self) {
        info!(
            "Cost {:?} Time(microseconds) {:?} High level expand nodes number: {:?} generate nodes number: {:?} closed list hits: {:?} Low level expand nodes number {:?}",
            self.costs,
            self.time_us,
            self.high_level_expand_nodes,
            self.high_level_generate_nodes,
            self.closed_list_hits,
            self.low_level_expand_nodes
        );
    }
}
