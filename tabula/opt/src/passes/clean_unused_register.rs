use crate::traversal::{ConstructPass, Named, Phase};
use std::collections::HashSet;
use tabula_ir as ir;
use tabula_utils::TabulaResult;

/// Removes registers that no insn reads or writes.
pub struct CleanUnusedRegister {
    /// Registers read from other tables through `foreign-reg` insns.
    foreign_reads: HashSet<ir::RegisterIdx>,
    removed: usize,
}

impl Named for CleanUnusedRegister {
    fn name() -> &'static str {
        "clean-unused-register"
    }

    fn description() -> &'static str {
        "removes registers that are never used"
    }
}

impl ConstructPass for CleanUnusedRegister {
    fn from(design: &ir::Design) -> TabulaResult<Self> {
        let conn = ir::Connection::build(design);
        let foreign_reads = design
            .registers
            .keys()
            .filter(|r| !conn.foreign_register_users(*r).is_empty())
            .collect();
        Ok(Self {
            foreign_reads,
            removed: 0,
        })
    }

    fn clear_data(&mut self) {
        // Foreign reads are design wide.
    }
}

impl Phase for CleanUnusedRegister {
    fn apply_for_table(
        &mut self,
        table: ir::TableIdx,
        design: &mut ir::Design,
    ) -> TabulaResult<()> {
        let t = &design.tables[table];
        let used: HashSet<ir::RegisterIdx> = t
            .states
            .iter()
            .flat_map(|st| design.states[*st].insns.iter())
            .flat_map(|i| {
                let insn = &design.insns[*i];
                insn.inputs.iter().chain(insn.outputs.iter()).copied()
            })
            .collect();
        let before = t.registers.len();
        let kept = t
            .registers
            .iter()
            .copied()
            .filter(|r| used.contains(r) || self.foreign_reads.contains(r))
            .collect::<Vec<_>>();
        let removed = before - kept.len();
        if removed > 0 {
            log::debug!(
                "{}: removed {removed} unused registers",
                design.table_label(table)
            );
        }
        self.removed += removed;
        design.tables[table].registers = kept;
        Ok(())
    }

    fn finish_design(&mut self, _design: &mut ir::Design) -> TabulaResult<()> {
        log::info!("clean-unused-register: {} registers removed", self.removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_ir::Builder;

    #[test]
    fn keeps_used_and_foreign_registers() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let t2 = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let st = b.alloc_state(t);
        let st2 = b.alloc_state(t2);
        let used = b.alloc_register(t, "used", 8);
        let dead = b.alloc_register(t, "dead", 8);
        let watched = b.alloc_register(t, "watched", 8);
        let one = b.alloc_const(t, 8, 1);
        let set = b.create_resource(t, "set").unwrap();
        b.insert_insn(st, set, &[one], &[used]);
        let fr = b.create_foreign_register(t2, watched).unwrap();
        let local = b.alloc_register(t2, "copy", 8);
        b.insert_insn(st2, fr, &[watched], &[local]);

        CleanUnusedRegister::do_pass_default(&mut d).unwrap();
        let regs = &d.tables[t].registers;
        assert!(regs.contains(&used));
        assert!(regs.contains(&one));
        assert!(regs.contains(&watched));
        assert!(!regs.contains(&dead));
        assert_eq!(d.tables[t2].registers, vec![local]);
    }
}
