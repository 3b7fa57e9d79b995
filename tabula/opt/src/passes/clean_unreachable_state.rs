use crate::analysis::StateGraph;
use crate::traversal::{Named, Phase};
use std::collections::HashSet;
use tabula_ir::{self as ir, util};
use tabula_utils::TabulaResult;

/// Removes states that can not be reached from the initial state.
#[derive(Default)]
pub struct CleanUnreachableState;

impl Named for CleanUnreachableState {
    fn name() -> &'static str {
        "clean-unreachable-state"
    }

    fn description() -> &'static str {
        "removes states unreachable from the initial state"
    }
}

impl Phase for CleanUnreachableState {
    fn apply_for_table(
        &mut self,
        table: ir::TableIdx,
        design: &mut ir::Design,
    ) -> TabulaResult<()> {
        let Some(init) = util::find_initial_state(design, table) else {
            if !design.tables[table].states.is_empty() {
                log::warn!(
                    "{}: no initial state, keeping all states",
                    design.table_label(table)
                );
            }
            return Ok(());
        };
        let graph = StateGraph::build(design, table);
        let reachable: HashSet<_> = graph.reachable_from(init).into_iter().collect();
        let t = &mut design.tables[table];
        let before = t.states.len();
        t.states.retain(|st| reachable.contains(st));
        let removed = before - t.states.len();
        if removed > 0 {
            log::debug!(
                "{}: removed {removed} unreachable states",
                design.table_label(table)
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
    fn drops_orphans() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let s0 = b.alloc_state(t);
        let s1 = b.alloc_state(t);
        let orphan = b.alloc_state(t);
        b.add_next_state(s0, s1).unwrap();
        b.add_next_state(orphan, s1).unwrap();

        CleanUnreachableState::do_pass_default(&mut d).unwrap();
        assert_eq!(d.tables[t].states, vec![s0, s1]);
    }
}
