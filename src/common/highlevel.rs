use super::{JointPlan, Path};
use crate::scenario::Instance;
use crate::solver::{JointPlanOracle, OracleSolution};
use crate::stat::Stats;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::{BTreeSet, HashMap};
use std::ops::{Index, IndexMut};
use tracing::debug;

/// Direction an agent arrives from when it enters a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Direction {
    Wait,
    North,
    South,
    West,
    East,
}

impl Direction {
    /// Positions are `(row, column)`, so north decreases the row.
    pub fn between(from: (usize, usize), to: (usize, usize)) -> Option<Direction> {
        match (
            to.0 as isize - from.0 as isize,
            to.1 as isize - from.1 as isize,
        ) {
            (0, 0) => Some(Direction::Wait),
            (-1, 0) => Some(Direction::North),
            (1, 0) => Some(Direction::South),
            (0, -1) => Some(Direction::West),
            (0, 1) => Some(Direction::East),
            _ => None,
        }
    }
}

/// Agent `agent` may not be at `position` at `time_step`. With a direction
/// set, only arriving there by that move is forbidden.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Ord, PartialOrd, Serialize)]
pub struct Constraint {
    pub agent: usize,
    pub position: (usize, usize),
    pub time_step: usize,
    pub direction: Option<Direction>,
}

impl Constraint {
    pub fn new(agent: usize, position: (usize, usize), time_step: usize) -> Self {
        Constraint {
            agent,
            position,
            time_step,
            direction: None,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn is_violated(&self, from: (usize, usize), to: (usize, usize), time: usize) -> bool {
        if to != self.position || time != self.time_step {
            return false;
        }

        match self.direction {
            None => true,
            Some(direction) => Direction::between(from, to) == Some(direction),
        }
    }
}

/// Canonical, order-independent set of constraints. Two constraint tree
/// nodes are the same node iff their sets are equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConstraintSet(BTreeSet<Constraint>);

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, constraint: Constraint) -> bool {
        self.0.insert(constraint)
    }

    pub fn contains(&self, constraint: &Constraint) -> bool {
        self.0.contains(constraint)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.0.iter()
    }

    pub fn for_agent(&self, agent: usize) -> impl Iterator<Item = &Constraint> {
        self.0
            .iter()
            .filter(move |constraint| constraint.agent == agent)
    }

    /// A copy of this set with one more constraint.
    pub fn with(&self, constraint: Constraint) -> Self {
        let mut set = self.clone();
        set.insert(constraint);
        set
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        ConstraintSet(iter.into_iter().collect())
    }
}

impl Extend<Constraint> for ConstraintSet {
    fn extend<I: IntoIterator<Item = Constraint>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub(crate) fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// Two agents at the same cell at the same time, both still on their way to
/// the meeting point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Conflict {
    pub agent_1: usize,
    pub agent_2: usize,
    pub position: (usize, usize),
    pub time_step: usize,
}

impl Conflict {
    pub fn agent(&self, side: Side) -> usize {
        match side {
            Side::Left => self.agent_1,
            Side::Right => self.agent_2,
        }
    }

    /// The constraint that forbids `side`'s agent from its half of the conflict.
    pub fn constraint_for(&self, side: Side) -> Constraint {
        Constraint::new(self.agent(side), self.position, self.time_step)
    }
}

/// Scans a joint plan time step by time step. An agent only takes part while
/// it is en route: its final step is the meeting point, which every agent
/// shares.
pub fn detect_conflicts(paths: &[Path]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let horizon = paths.iter().map(|path| path.len()).max().unwrap_or(0);

    for time_step in 0..horizon.saturating_sub(1) {
        let mut occupied: HashMap<(usize, usize), usize> = HashMap::new();
        for (agent, path) in paths.iter().enumerate() {
            if time_step + 1 >= path.len() {
                continue;
            }

            let position = path[time_step];
            if let Some(&other) = occupied.get(&position) {
                conflicts.push(Conflict {
                    agent_1: agent,
                    agent_2: other,
                    position,
                    time_step,
                });
            } else {
                occupied.insert(position, agent);
            }
        }
    }

    conflicts
}

/// Rule used to pick the conflict a node branches on. Fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictChoice {
    /// First conflict in scan order.
    #[default]
    First,
    /// Conflict with the smallest time step, scan order breaks ties.
    Earliest,
}

impl ConflictChoice {
    pub fn select<'a>(&self, conflicts: &'a [Conflict]) -> Option<&'a Conflict> {
        match self {
            ConflictChoice::First => conflicts.first(),
            ConflictChoice::Earliest => conflicts.iter().min_by_key(|conflict| conflict.time_step),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ExpansionState {
    #[default]
    NotExpanded,
    Deferred,
    Expanded,
}

pub(crate) type NodeId = usize;

#[derive(Debug, Clone, Default)]
pub(crate) struct ConstraintTreeNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) own_constraint: Option<Constraint>,
    pub(crate) depth: usize,
    pub(crate) plan: Option<JointPlan>,
    pub(crate) cost: usize,
    pub(crate) conflicts: Vec<Conflict>,
    pub(crate) expansion: [ExpansionState; 2],
    pub(crate) chosen_conflict: Option<Conflict>,
    pub(crate) goal: bool,
    pub(crate) infeasible: bool,
    constraint_set: OnceCell<ConstraintSet>,
}

impl ConstraintTreeNode {
    pub(crate) fn is_goal(&self) -> bool {
        self.goal
    }

    pub(crate) fn is_fully_expanded(&self) -> bool {
        self.expansion
            .iter()
            .all(|state| *state == ExpansionState::Expanded)
    }

    pub(crate) fn is_unexpanded(&self) -> bool {
        self.expansion
            .iter()
            .all(|state| *state == ExpansionState::NotExpanded)
    }

    /// Picks the conflict to branch on, unless one is already chosen because
    /// the node was only partially expanded.
    pub(crate) fn choose_conflict(&mut self, choice: ConflictChoice) {
        if self.chosen_conflict.is_none() {
            self.chosen_conflict = choice.select(&self.conflicts).copied();
        }
    }

    /// Drops the joint plan and its conflicts. Cost, goal flag and constraint
    /// identity stay.
    pub(crate) fn clear(&mut self) {
        self.plan = None;
        self.conflicts = Vec::new();
    }
}

/// Arena holding every constraint tree node of one search.
#[derive(Debug, Default)]
pub(crate) struct ConstraintTree {
    nodes: Vec<ConstraintTreeNode>,
}

impl ConstraintTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn add_root(&mut self) -> NodeId {
        self.nodes.push(ConstraintTreeNode::default());
        self.nodes.len() - 1
    }

    /// `constraint_set` must be the parent's set plus `constraint`; it becomes
    /// the child's memoized set.
    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        constraint: Constraint,
        constraint_set: ConstraintSet,
    ) -> NodeId {
        let node = ConstraintTreeNode {
            parent: Some(parent),
            own_constraint: Some(constraint),
            depth: self.nodes[parent].depth + 1,
            constraint_set: OnceCell::from(constraint_set),
            ..Default::default()
        };
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Memoized on first call.
    pub(crate) fn constraint_set(&self, id: NodeId) -> &ConstraintSet {
        self.nodes[id]
            .constraint_set
            .get_or_init(|| self.collect_constraints(id))
    }

    // Walks up until the root or the first ancestor with a memoized set.
    fn collect_constraints(&self, id: NodeId) -> ConstraintSet {
        let mut pending = Vec::new();
        let mut current = Some(id);

        let mut set = loop {
            let Some(node_id) = current else {
                break ConstraintSet::new();
            };
            let node = &self.nodes[node_id];
            if node_id != id {
                if let Some(cached) = node.constraint_set.get() {
                    break cached.clone();
                }
            }
            if let Some(constraint) = node.own_constraint {
                pending.push(constraint);
            }
            current = node.parent;
        };

        set.extend(pending);
        set
    }

    /// Runs the oracle on the node's constraint set and records plan, cost and
    /// conflicts. Returns false when the oracle finds no joint plan; such a
    /// node is never expanded.
    pub(crate) fn solve<O: JointPlanOracle + ?Sized>(
        &mut self,
        id: NodeId,
        instance: &Instance,
        oracle: &O,
        stats: &mut Stats,
    ) -> bool {
        let solution = oracle.solve(instance, self.constraint_set(id), stats);
        let node = &mut self.nodes[id];

        match solution {
            Some(OracleSolution { plan, cost }) => {
                node.conflicts = detect_conflicts(&plan.paths);
                node.goal = node.conflicts.is_empty();
                node.cost = cost;
                node.plan = Some(plan);
                node.infeasible = false;
                debug!(
                    "solved node {id}: depth {}, cost {cost}, {} conflicts",
                    node.depth,
                    node.conflicts.len()
                );
                true
            }
            None => {
                node.conflicts.clear();
                node.goal = false;
                node.infeasible = true;
                debug!("node {id} is infeasible at depth {}", node.depth);
                false
            }
        }
    }
}

impl Index<NodeId> for ConstraintTree {
    type Output = ConstraintTreeNode;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for ConstraintTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id]
    }
}
