use crate::traversal::{Named, Phase};
use tabula_ir::{self as ir, util};
use tabula_utils::TabulaResult;

/// Bypasses states whose only insn is an unconditional transition:
/// transitions into such a state go straight to its successor.
#[derive(Default)]
pub struct CleanEmptyState;

impl Named for CleanEmptyState {
    fn name() -> &'static str {
        "clean-empty-state"
    }

    fn description() -> &'static str {
        "removes states that do nothing but move to the next state"
    }
}

impl CleanEmptyState {
    /// The successor of `st` if `st` only jumps there.
    fn bypass_target(design: &ir::Design, st: ir::StateIdx) -> Option<ir::StateIdx> {
        let insns = &design.states[st].insns;
        let [insn] = insns.as_slice() else {
            return None;
        };
        let i = &design.insns[*insn];
        if !ir::resource_class::is_transition(design.insn_class(*insn)) {
            return None;
        }
        match i.target_states.as_slice() {
            [next] if *next != st => Some(*next),
            _ => None,
        }
    }
}

impl Phase for CleanEmptyState {
    fn apply_for_table(
        &mut self,
        table: ir::TableIdx,
        design: &mut ir::Design,
    ) -> TabulaResult<()> {
        let init = design.tables[table].initial_state;
        loop {
            let states = design.tables[table].states.clone();
            let Some((empty, next)) = states
                .iter()
                .filter(|st| Some(**st) != init)
                .find_map(|st| Self::bypass_target(design, *st).map(|n| (*st, n)))
            else {
                break;
            };
            for st in &states {
                if let Some(tr) = util::find_transition_insn(design, *st) {
                    for target in design.insns[tr].target_states.iter_mut() {
                        if *target == empty {
                            *target = next;
                        }
                    }
                }
            }
            design.tables[table].states.retain(|st| *st != empty);
            log::debug!(
                "{}: bypassed state {}",
                design.table_label(table),
                design.states[empty].id
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_ir::Builder;

    #[test]
    fn bypasses_chain_of_empty_states() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let s0 = b.alloc_state(t);
        let e1 = b.alloc_state(t);
        let e2 = b.alloc_state(t);
        let s3 = b.alloc_state(t);
        let c = b.alloc_register(t, "c", 1);
        let add = b.create_resource(t, "add").unwrap();
        let x = b.alloc_register(t, "x", 1);
        b.insert_insn(s3, add, &[c, c], &[x]);
        b.add_conditional_transition(s0, c, e1, s3).unwrap();
        b.add_next_state(e1, e2).unwrap();
        b.add_next_state(e2, s3).unwrap();
        b.add_next_state(s3, s0).unwrap();

        CleanEmptyState::do_pass_default(&mut d).unwrap();
        assert_eq!(d.tables[t].states, vec![s0, s3]);
        assert_eq!(util::get_next_states(&d, s0), vec![s3, s3]);
    }

    #[test]
    fn keeps_initial_and_self_loops() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let s0 = b.alloc_state(t);
        let halt = b.alloc_state(t);
        b.add_next_state(s0, halt).unwrap();
        b.add_next_state(halt, halt).unwrap();

        CleanEmptyState::do_pass_default(&mut d).unwrap();
        assert_eq!(d.tables[t].states, vec![s0, halt]);
    }
}
