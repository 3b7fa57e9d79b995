use super::StateGraph;
use std::collections::{HashMap, HashSet};
use tabula_ir::{self as ir, util};

/// A maximal chain of states entered only at its head, where every state
/// but the last moves unconditionally to the next one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BB {
    pub index: usize,
    pub states: Vec<ir::StateIdx>,
}

impl BB {
    pub fn head(&self) -> ir::StateIdx {
        self.states[0]
    }

    pub fn tail(&self) -> ir::StateIdx {
        self.states[self.states.len() - 1]
    }
}

/// Partition of a table's states into basic blocks. Every state belongs to
/// exactly one block.
#[derive(Clone, Debug, Default)]
pub struct BBSet {
    pub bbs: Vec<BB>,
    state_to_bb: HashMap<ir::StateIdx, usize>,
}

impl BBSet {
    pub fn build(design: &ir::Design, table: ir::TableIdx) -> Self {
        let graph = StateGraph::build(design, table);
        let t = &design.tables[table];
        let is_jump = |st: ir::StateIdx| util::get_next_states(design, st).len() == 1;

        let mut leaders = HashSet::new();
        if let Some(init) = t.initial_state {
            leaders.insert(init);
        }
        for st in &t.states {
            let preds = graph.predecessors(*st);
            let single = match preds.as_slice() {
                [p] => *p != *st && is_jump(*p),
                _ => false,
            };
            if !single {
                leaders.insert(*st);
            }
        }

        let mut set = BBSet::default();
        let visit = |head: ir::StateIdx, set: &mut BBSet| {
            let index = set.bbs.len();
            let mut states = vec![head];
            set.state_to_bb.insert(head, index);
            let mut cur = head;
            while is_jump(cur) {
                let next = util::get_next_states(design, cur)[0];
                if leaders.contains(&next) || set.state_to_bb.contains_key(&next) {
                    break;
                }
                set.state_to_bb.insert(next, index);
                states.push(next);
                cur = next;
            }
            set.bbs.push(BB { index, states });
        };
        // Heads first, in table order, then chains only reachable through
        // cycles without a leader.
        for st in &t.states {
            if leaders.contains(st) {
                visit(*st, &mut set);
            }
        }
        for st in &t.states {
            if !set.state_to_bb.contains_key(st) {
                visit(*st, &mut set);
            }
        }
        log::debug!(
            "{}: {} states in {} basic blocks",
            design.table_label(table),
            t.states.len(),
            set.bbs.len()
        );
        set
    }

    pub fn bb_of(&self, state: ir::StateIdx) -> Option<&BB> {
        self.state_to_bb.get(&state).map(|i| &self.bbs[*i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_ir::Builder;

    #[test]
    fn splits_at_branches_and_joins() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let s = (0..5).map(|_| b.alloc_state(t)).collect::<Vec<_>>();
        let c = b.alloc_register(t, "c", 1);
        // s0 -> s1 -> (s2 | s3), s2 -> s3 -> s4 -> s0
        b.add_next_state(s[0], s[1]).unwrap();
        b.add_conditional_transition(s[1], c, s[2], s[3]).unwrap();
        b.add_next_state(s[2], s[3]).unwrap();
        b.add_next_state(s[3], s[4]).unwrap();
        b.add_next_state(s[4], s[0]).unwrap();

        let bbs = BBSet::build(&d, t);
        let chains = bbs.bbs.iter().map(|bb| bb.states.clone()).collect::<Vec<_>>();
        assert_eq!(chains, vec![vec![s[0], s[1]], vec![s[2]], vec![s[3], s[4]]]);
        assert_eq!(bbs.bb_of(s[4]).unwrap().head(), s[3]);
        assert_eq!(bbs.bb_of(s[1]).unwrap().tail(), s[1]);
    }

    #[test]
    fn self_loop_and_orphan_cycle() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let s0 = b.alloc_state(t);
        let s1 = b.alloc_state(t);
        let s2 = b.alloc_state(t);
        b.add_next_state(s0, s0).unwrap();
        b.add_next_state(s1, s2).unwrap();
        b.add_next_state(s2, s1).unwrap();

        let bbs = BBSet::build(&d, t);
        assert_eq!(bbs.bbs.len(), 2);
        assert_eq!(bbs.bbs[0].states, vec![s0]);
        assert_eq!(bbs.bbs[1].states, vec![s1, s2]);
    }
}
