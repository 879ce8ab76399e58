use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LowLevelNode {
    pub(crate) position: (usize, usize),
    pub(crate) f_cost: usize,
    pub(crate) g_cost: usize, // uniform cost, so this is also the arrival time
    pub(crate) time_step: usize, // same as g_cost until the last constraint time step is passed
}

impl Ord for LowLevelNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_cost
            .cmp(&other.f_cost)
            // Higher g cost (time) has higher priority
            .then_with(|| other.g_cost.cmp(&self.g_cost))
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.time_step.cmp(&other.time_step))
    }
}

impl PartialOrd for LowLevelNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_open_order_prefers_low_f_then_deep_nodes() {
        let mut open = BTreeSet::new();
        open.insert(LowLevelNode {
            position: (0, 0),
            f_cost: 5,
            g_cost: 1,
            time_step: 1,
        });
        open.insert(LowLevelNode {
            position: (0, 1),
            f_cost: 4,
            g_cost: 1,
            time_step: 1,
        });
        open.insert(LowLevelNode {
            position: (1, 1),
            f_cost: 4,
            g_cost: 3,
            time_step: 3,
        });

        assert_eq!(open.pop_first().unwrap().position, (1, 1));
        assert_eq!(open.pop_first().unwrap().position, (0, 1));
        assert_eq!(open.pop_first().unwrap().position, (0, 0));
    }
}
