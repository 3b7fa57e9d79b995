use crate::analysis::{BB, BBDataPath, DataPathSet, DelayInfo, PathEdgeType};
use crate::traversal::{ConstructPass, Named, ParseVal, PassOpt, Phase};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use tabula_ir::{self as ir, resource_class as rc, util};
use tabula_utils::{Error, TabulaResult};

/// Insns of one original state, scheduled as a unit so that the wires they
/// share stay in one state.
struct Group {
    insns: Vec<ir::InsnIdx>,
    /// Has to occupy a state of its own, in order with other barriers.
    barrier: bool,
    delay: i64,
    exclusive: Vec<ir::ResourceIdx>,
}

#[derive(Default)]
struct Slot {
    groups: usize,
    barrier: bool,
    delay: i64,
    resources: HashSet<ir::ResourceIdx>,
}

/// Reads whose value may change from cycle to cycle.
fn reads_outside_table(class: &str) -> bool {
    matches!(
        class,
        rc::EXT_INPUT
            | rc::SHARED_REG_READER
            | rc::FOREIGN_REG
            | rc::FIFO_READER
            | rc::EXT_TASK_WAIT
            | rc::EXT_FLOW_RESULT
            | rc::TICKER
            | rc::DATAFLOW_IN
            | rc::SUB_MODULE_TASK
            | rc::EXT_TASK
    )
}

/// Compacts the states of every basic block. The original states are
/// packed, in order, into as few states as their register dependencies,
/// exclusive resources and the delay budget allow.
pub struct BBScheduler {
    dinfo: DelayInfo,
    max_delay: i64,
    states_before: usize,
    states_after: usize,
}

impl Named for BBScheduler {
    fn name() -> &'static str {
        "sched"
    }

    fn description() -> &'static str {
        "packs the states of basic blocks into fewer states"
    }

    fn opts() -> Vec<PassOpt> {
        vec![PassOpt::new(
            "max-delay",
            "critical path limit per state in ps; MAX-DELAY-PS of the design when negative",
            ParseVal::Num(-1),
            PassOpt::parse_num,
        )]
    }
}

impl ConstructPass for BBScheduler {
    fn from(design: &ir::Design) -> TabulaResult<Self> {
        let opts = Self::get_opts(design);
        let max_delay = match opts[&"max-delay"].pos_num() {
            Some(ps) => ps as i64,
            None => design.params.max_delay_ps(),
        };
        Ok(BBScheduler {
            dinfo: DelayInfo::from_design(design),
            max_delay,
            states_before: 0,
            states_after: 0,
        })
    }

    fn clear_data(&mut self) {
        // Delay model and counters are design wide.
    }
}

impl BBScheduler {
    fn build_groups(
        &self,
        design: &ir::Design,
        dp: &BBDataPath,
    ) -> TabulaResult<(Vec<Group>, Vec<ir::InsnIdx>)> {
        let bb = &dp.bb;
        let last = bb.states.len() - 1;
        let mut groups = Vec::with_capacity(bb.states.len());
        let mut jumps = Vec::with_capacity(last);
        for (k, st) in bb.states.iter().enumerate() {
            let tr = util::find_transition_insn(design, *st);
            if k < last {
                let Some(tr) = tr else {
                    return Err(Error::malformed_design(format!(
                        "state {} falls through without a transition",
                        design.states[*st].id
                    )));
                };
                jumps.push(tr);
            }
            let insns = design.states[*st]
                .insns
                .iter()
                .copied()
                .filter(|i| k == last || Some(*i) != tr)
                .collect_vec();
            let barrier = insns.iter().any(|i| {
                let class = design.insn_class(*i);
                rc::is_multi_cycle(class)
                    || rc::has_side_effect(class)
                    || reads_outside_table(class)
            });
            let delay = insns
                .iter()
                .filter_map(|i| dp.node(*i))
                .map(|n| n.state_local_delay)
                .max()
                .unwrap_or(0);
            let exclusive = insns
                .iter()
                .map(|i| design.insns[*i].resource)
                .filter(|r| design.class_of(*r).is_exclusive)
                .unique()
                .collect_vec();
            groups.push(Group {
                insns,
                barrier,
                delay,
                exclusive,
            });
        }
        Ok((groups, jumps))
    }

    fn fits(&self, slot: Option<&Slot>, g: &Group) -> bool {
        let Some(slot) = slot else {
            return true;
        };
        if slot.groups == 0 {
            return true;
        }
        !(slot.barrier
            || g.barrier
            || g.exclusive.iter().any(|r| slot.resources.contains(r))
            || slot.delay.max(g.delay) > self.max_delay)
    }

    /// New state index of each group.
    fn place(&self, dp: &BBDataPath, groups: &[Group]) -> Vec<usize> {
        let group_of: HashMap<ir::InsnIdx, usize> = groups
            .iter()
            .enumerate()
            .flat_map(|(g, grp)| grp.insns.iter().map(move |i| (*i, g)))
            .collect();
        let mut placed: Vec<usize> = Vec::with_capacity(groups.len());
        let mut slots: Vec<Slot> = vec![];
        let mut floor = 0;
        for (g, grp) in groups.iter().enumerate() {
            let max_placed = placed.iter().copied().max();
            let mut earliest = floor;
            if let Some(m) = max_placed {
                if grp.barrier {
                    earliest = earliest.max(m + 1);
                }
                // The block's exit stays in its last state.
                if g == groups.len() - 1 {
                    earliest = earliest.max(m);
                }
            }
            for insn in &grp.insns {
                for e in dp.source_edges(*insn) {
                    let Some(h) = group_of.get(&e.source).copied() else {
                        continue;
                    };
                    if h >= g {
                        continue;
                    }
                    earliest = earliest.max(match e.kind {
                        PathEdgeType::WriteRead | PathEdgeType::WriteWrite => placed[h] + 1,
                        PathEdgeType::ReadWrite => placed[h],
                    });
                }
            }
            let mut slot = earliest;
            while !self.fits(slots.get(slot), grp) {
                slot += 1;
            }
            if slots.len() <= slot {
                slots.resize_with(slot + 1, Slot::default);
            }
            let s = &mut slots[slot];
            s.groups += 1;
            s.barrier |= grp.barrier;
            s.delay = s.delay.max(grp.delay);
            s.resources.extend(grp.exclusive.iter().copied());
            if grp.barrier {
                floor = slot + 1;
            }
            placed.push(slot);
        }
        placed
    }

    fn schedule_bb(
        &mut self,
        design: &mut ir::Design,
        table: ir::TableIdx,
        dp: &BBDataPath,
    ) -> TabulaResult<()> {
        let bb: &BB = &dp.bb;
        let n = bb.states.len();
        self.states_before += n;
        if n < 2 {
            self.states_after += n;
            return Ok(());
        }
        let (groups, jumps) = self.build_groups(design, dp)?;
        let placed = self.place(dp, &groups);
        let n_new = placed.iter().copied().max().map_or(1, |m| m + 1);
        self.states_after += n_new;

        let mut new_insns: Vec<Vec<ir::InsnIdx>> = vec![vec![]; n_new];
        for (grp, slot) in groups.into_iter().zip(placed.iter()) {
            new_insns[*slot].extend(grp.insns);
        }
        for k in 0..n_new - 1 {
            let tr = jumps[k];
            let i = &mut design.insns[tr];
            i.target_states.clear();
            i.target_states.push(bb.states[k + 1]);
            new_insns[k].push(tr);
        }
        for (k, insns) in new_insns.into_iter().enumerate() {
            design.states[bb.states[k]].insns = insns;
        }
        let dropped: HashSet<ir::StateIdx> = bb.states[n_new..].iter().copied().collect();
        design.tables[table].states.retain(|st| !dropped.contains(st));
        log::debug!(
            "{}: BB {} placed {:?}",
            design.table_label(table),
            bb.index,
            placed
        );
        Ok(())
    }
}

impl Phase for BBScheduler {
    fn apply_for_table(
        &mut self,
        table: ir::TableIdx,
        design: &mut ir::Design,
    ) -> TabulaResult<()> {
        let dps = DataPathSet::build(design, table, &self.dinfo);
        for dp in &dps.paths {
            if log::log_enabled!(log::Level::Debug) {
                log::debug!("{}", dp.dump(design));
            }
            self.schedule_bb(design, table, dp)?;
        }
        Ok(())
    }

    fn finish_design(&mut self, _design: &mut ir::Design) -> TabulaResult<()> {
        log::info!(
            "sched: {} states in basic blocks became {}",
            self.states_before,
            self.states_after
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_ir::Builder;

    struct Chain {
        design: ir::Design,
        table: ir::TableIdx,
        states: Vec<ir::StateIdx>,
    }

    fn chain(len: usize) -> Chain {
        let mut design = ir::Design::new();
        let m = design.add_module("m");
        let table = design.add_table(m);
        let mut b = Builder::new(&mut design);
        let states = (0..len).map(|_| b.alloc_state(table)).collect_vec();
        for (a, c) in states.iter().tuple_windows() {
            b.add_next_state(*a, *c).unwrap();
        }
        b.add_next_state(states[len - 1], states[0]).unwrap();
        Chain {
            design,
            table,
            states,
        }
    }

    #[test]
    fn packs_independent_states() {
        let Chain {
            mut design,
            table,
            states: s,
        } = chain(4);
        let mut b = Builder::new(&mut design);
        let [a, c, x, y, z] = ["a", "c", "x", "y", "z"].map(|n| b.alloc_register(table, n, 32));
        let add_a = b.create_resource(table, "add").unwrap();
        let add_b = b.create_resource(table, "add").unwrap();
        let print = b.create_resource(table, "print").unwrap();
        let i_x = b.insert_insn(s[0], add_a, &[a, c], &[x]);
        // Same adder as s0, can not share its state.
        let i_y = b.insert_insn(s[1], add_a, &[c, c], &[y]);
        let i_z = b.insert_insn(s[2], add_b, &[a, c], &[z]);
        let i_p = b.insert_insn(s[3], print, &[x], &[]);

        BBScheduler::do_pass_default(&mut design).unwrap();
        let d = &design;
        assert_eq!(d.tables[table].states, vec![s[0], s[1], s[2]]);
        let s0 = &d.states[s[0]].insns;
        assert!(s0.contains(&i_x) && s0.contains(&i_z));
        assert!(d.states[s[1]].insns.contains(&i_y));
        assert!(d.states[s[2]].insns.contains(&i_p));
        assert_eq!(util::get_next_states(d, s[0]), vec![s[1]]);
        assert_eq!(util::get_next_states(d, s[1]), vec![s[2]]);
        assert_eq!(util::get_next_states(d, s[2]), vec![s[0]]);
        assert!(d.check_references().is_ok());
    }

    #[test]
    fn respects_data_dependencies() {
        let Chain {
            mut design,
            table,
            states: s,
        } = chain(3);
        let mut b = Builder::new(&mut design);
        let [a, x, y] = ["a", "x", "y"].map(|n| b.alloc_register(table, n, 8));
        let set = b.create_resource(table, "set").unwrap();
        b.insert_insn(s[0], set, &[a], &[x]);
        b.insert_insn(s[1], set, &[x], &[y]);
        b.insert_insn(s[2], set, &[y], &[a]);

        BBScheduler::do_pass_default(&mut design).unwrap();
        assert_eq!(design.tables[table].states.len(), 3);
    }

    #[test]
    fn delay_budget_splits_states() {
        let build = |opts: Vec<String>| {
            let Chain {
                mut design,
                table,
                states: s,
            } = chain(2);
            design.extra_opts = opts;
            let mut b = Builder::new(&mut design);
            let [a, c, x] = ["a", "c", "x"].map(|n| b.alloc_register(table, n, 32));
            let w = b.alloc_wire(table, "w", 32);
            let add1 = b.create_resource(table, "add").unwrap();
            let add2 = b.create_resource(table, "add").unwrap();
            let add3 = b.create_resource(table, "add").unwrap();
            // 840ps + 840ps chained through a wire.
            b.insert_insn(s[0], add1, &[a, c], &[w]);
            b.insert_insn(s[0], add2, &[w, c], &[a]);
            b.insert_insn(s[1], add3, &[c, c], &[x]);
            BBScheduler::do_pass_default(&mut design).unwrap();
            design.tables[table].states.len()
        };
        assert_eq!(build(vec![]), 1);
        assert_eq!(build(vec!["sched:max-delay=1500".to_string()]), 2);
    }
}
