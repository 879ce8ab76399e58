use super::closedlist::{ClosedEntry, ClosedList};
use super::openlist::OpenList;
use super::JointPlanOracle;
use crate::common::{Conflict, ConstraintTree, ExpansionState, JointPlan, NodeId, Side};
use crate::config::Config;
use crate::scenario::Instance;
use crate::stat::Stats;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Reported cost when the time budget ran out.
pub const TIMEOUT_COST: i64 = -1;
/// Reported cost when the constraint tree was exhausted without a goal.
pub const NO_SOLUTION_COST: i64 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionMode {
    /// Generate both children every time a node is expanded.
    #[default]
    Full,
    /// Generate one child per expansion and push the parent back for the other.
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchOutcome {
    NotStarted,
    Running,
    Solved { cost: usize },
    Unsolvable,
    Timeout,
}

/// Everything the driver needs to report one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport<'a> {
    pub outcome: SearchOutcome,
    pub cost: i64,
    pub plan: Option<&'a JointPlan>,
    pub stats: &'a Stats,
}

enum Step {
    Continue,
    Done(bool),
}

enum Expansion {
    Finished,
    TimedOut,
}

/// Conflict-based search over constraint sets for the multi-agent meeting
/// problem.
pub struct CBS<O: JointPlanOracle> {
    instance: Instance,
    oracle: O,
    config: Config,
    tree: ConstraintTree,
    open: OpenList,
    closed: ClosedList,
    stats: Stats,
    outcome: SearchOutcome,
    solution: Option<JointPlan>,
    root_cost: Option<usize>,
    current_cost: Option<usize>,
    start_time: Instant,
}

impl<O: JointPlanOracle> CBS<O> {
    pub fn new(instance: Instance, oracle: O, config: &Config) -> Self {
        CBS {
            instance,
            oracle,
            config: config.clone(),
            tree: ConstraintTree::new(),
            open: OpenList::new(),
            closed: ClosedList::new(),
            stats: Stats::default(),
            outcome: SearchOutcome::NotStarted,
            solution: None,
            root_cost: None,
            current_cost: None,
            start_time: Instant::now(),
        }
    }

    /// Solves the root and seeds the open and closed lists. A root without a
    /// joint plan, or above the cost ceiling, is dropped and the following
    /// `solve` reports the instance as unsolvable.
    pub fn setup(&mut self) {
        self.start_time = Instant::now();
        self.tree = ConstraintTree::new();
        self.open.clear();
        self.closed.clear();
        self.stats = Stats::default();
        self.outcome = SearchOutcome::Running;
        self.solution = None;
        self.root_cost = None;
        self.current_cost = None;

        let root = self.tree.add_root();
        if !self
            .tree
            .solve(root, &self.instance, &self.oracle, &mut self.stats)
        {
            info!("root has no joint plan");
            return;
        }

        let cost = self.tree[root].cost;
        if self.exceeds_cost_ceiling(cost) {
            info!("root cost {cost} exceeds the cost ceiling");
            return;
        }

        self.root_cost = Some(cost);
        self.closed.insert(
            self.tree.constraint_set(root).clone(),
            ClosedEntry {
                node: root,
                cost: Some(cost),
            },
        );
        self.open.push(root, cost);
        self.stats.high_level_generate_nodes += 1;
        debug!(
            "root cost {cost}, conflicts: {:?}",
            self.tree[root].conflicts
        );
    }

    /// Runs until a goal is found, the tree is exhausted or the time budget
    /// is spent. The search cannot be resumed afterwards.
    pub fn solve(&mut self) -> bool {
        match self.outcome {
            SearchOutcome::NotStarted => self.setup(),
            SearchOutcome::Running => {}
            _ => return self.is_solved(),
        }

        loop {
            if let Step::Done(solved) = self.step() {
                return solved;
            }
        }
    }

    fn step(&mut self) -> Step {
        if self.open.is_empty() {
            self.finish(SearchOutcome::Unsolvable);
            return Step::Done(false);
        }

        if self.time_exceeded() {
            info!("Out of time");
            self.finish(SearchOutcome::Timeout);
            return Step::Done(false);
        }

        let Some(current) = self.open.pop() else {
            return Step::Continue;
        };
        let cost = self.tree[current].cost;

        // Costs are not monotone over pops, so the goal check below trusts
        // the popped node's own cost.
        match self.current_cost {
            Some(current_cost) if cost == current_cost => {
                self.stats.nodes_expanded_with_goal_cost += 1;
            }
            Some(current_cost) if cost < current_cost => {}
            _ => {
                self.current_cost = Some(cost);
                self.stats.nodes_expanded_with_goal_cost = 0;
            }
        }

        if self.tree[current].is_goal() {
            self.solution = self.tree[current].plan.take();
            self.finish(SearchOutcome::Solved { cost });
            return Step::Done(true);
        }

        self.tree[current].choose_conflict(self.config.conflict_choice);
        let was_unexpanded = self.tree[current].is_unexpanded();
        let expansion = self.expand(current);
        if was_unexpanded {
            self.stats.high_level_expand_nodes += 1;
        }
        if self.tree[current].is_fully_expanded() {
            self.tree[current].clear();
        }

        match expansion {
            Expansion::Finished => Step::Continue,
            Expansion::TimedOut => {
                info!("Out of time");
                self.finish(SearchOutcome::Timeout);
                Step::Done(false)
            }
        }
    }

    fn expand(&mut self, node: NodeId) -> Expansion {
        let Some(conflict) = self.tree[node].chosen_conflict else {
            return Expansion::Finished;
        };
        debug!("expand node {node} on conflict {conflict:?}");

        let mut generated = false;
        for side in Side::BOTH {
            if self.tree[node].expansion[side.index()] == ExpansionState::Expanded {
                debug!("{side:?} child of node {node} already generated before");
                continue;
            }

            if generated && self.config.expansion == ExpansionMode::Partial {
                self.tree[node].expansion[side.index()] = ExpansionState::Deferred;
                debug_assert!(!self.open.contains(node));
                self.open.push(node, self.tree[node].cost);
                self.stats.nodes_pushed_back += 1;
                debug!("defer {side:?} child of node {node}");
                break;
            }

            if self.time_exceeded() {
                return Expansion::TimedOut;
            }

            self.tree[node].expansion[side.index()] = ExpansionState::Expanded;
            self.generate_child(node, &conflict, side);
            generated = true;
        }

        Expansion::Finished
    }

    fn generate_child(&mut self, parent: NodeId, conflict: &Conflict, side: Side) {
        let constraint = conflict.constraint_for(side);
        let key = self.tree.constraint_set(parent).with(constraint);

        if let Some(entry) = self.closed.get(&key) {
            self.stats.closed_list_hits += 1;
            debug!(
                "{side:?} child of node {parent} is already in the closed list as node {} with cost {:?}, parent cost {}",
                entry.node, entry.cost, self.tree[parent].cost
            );
            return;
        }

        let child = self.tree.add_child(parent, constraint, key.clone());
        self.tree
            .solve(child, &self.instance, &self.oracle, &mut self.stats);
        let cost = (!self.tree[child].infeasible).then(|| self.tree[child].cost);
        self.closed.insert(key, ClosedEntry { node: child, cost });

        match cost {
            None => {
                self.stats.infeasible_nodes += 1;
                debug!("{side:?} child {child} of node {parent} has no joint plan");
            }
            Some(cost) if self.exceeds_cost_ceiling(cost) => {
                self.tree[child].clear();
                debug!("{side:?} child {child} of node {parent} exceeds the cost ceiling with {cost}");
            }
            Some(cost) => {
                debug!("{side:?} child {child} of node {parent} with {constraint:?}, cost {cost}");
                self.open.push(child, cost);
                self.stats.high_level_generate_nodes += 1;
            }
        }
    }

    fn finish(&mut self, outcome: SearchOutcome) {
        self.stats.time_us = self.start_time.elapsed().as_micros() as usize;
        self.stats.costs = match outcome {
            SearchOutcome::Solved { cost } => cost as i64,
            SearchOutcome::Timeout => TIMEOUT_COST,
            _ => NO_SOLUTION_COST,
        };
        let reached_cost = match outcome {
            SearchOutcome::Solved { cost } => Some(cost),
            // A minimum estimate.
            _ => self.open.peek().map(|(_, cost)| cost),
        };
        if let (Some(reached), Some(root)) = (reached_cost, self.root_cost) {
            self.stats.solution_depth = reached as i64 - root as i64;
        }
        self.outcome = outcome;
        debug!(
            "search finished with {:?}: tree nodes {}, closed sets {}, open nodes {}",
            outcome,
            self.tree.len(),
            self.closed.len(),
            self.open.len()
        );

        // Not resumable, so nothing needs to be retained.
        self.open.clear();
        self.closed.clear();
        self.tree = ConstraintTree::new();

        self.stats.print();
    }

    fn time_exceeded(&self) -> bool {
        self.start_time.elapsed() > self.config.time_limit()
    }

    fn exceeds_cost_ceiling(&self, cost: usize) -> bool {
        self.config.max_cost.is_some_and(|max_cost| cost > max_cost)
    }

    pub fn outcome(&self) -> SearchOutcome {
        self.outcome
    }

    pub fn is_solved(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Solved { .. })
    }

    /// The goal's cost after a successful solve, otherwise
    /// [`TIMEOUT_COST`] or [`NO_SOLUTION_COST`].
    pub fn solution_cost(&self) -> i64 {
        match self.outcome {
            SearchOutcome::Solved { cost } => cost as i64,
            SearchOutcome::Timeout => TIMEOUT_COST,
            _ => NO_SOLUTION_COST,
        }
    }

    pub fn plan(&self) -> Option<&JointPlan> {
        self.solution.as_ref()
    }

    pub fn plan_text(&self) -> Option<String> {
        let plan = self.solution.as_ref()?;
        let (x, y) = plan.meeting_point;
        let mut text = format!(
            "Meeting Point: ({x},{y})\nCost: {}\n\n",
            self.solution_cost()
        );
        for (index, path) in plan.paths.iter().enumerate() {
            let steps = path
                .iter()
                .map(|(x, y)| format!("({x},{y})"))
                .collect::<Vec<_>>()
                .join("->");
            text.push_str(&format!("s{index}: {steps}\n"));
        }
        Some(text)
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn report(&self) -> SearchReport<'_> {
        SearchReport {
            outcome: self.outcome,
            cost: self.solution_cost(),
            plan: self.plan(),
            stats: &self.stats,
        }
    }
}
