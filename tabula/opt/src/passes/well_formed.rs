use crate::traversal::{Named, Phase};
use std::collections::HashSet;
use tabula_ir::{self as ir, resource_class as rc};
use tabula_utils::{Error, TabulaResult};

/// Checks the structural rules later passes and the writers rely on.
#[derive(Default)]
pub struct WellFormed;

impl Named for WellFormed {
    fn name() -> &'static str {
        "well-formed"
    }

    fn description() -> &'static str {
        "checks that the design is well formed"
    }
}

impl WellFormed {
    fn check_state(
        design: &ir::Design,
        table: ir::TableIdx,
        st: ir::StateIdx,
    ) -> TabulaResult<()> {
        let label = || format!("{}/state {}", design.table_label(table), design.states[st].id);
        let mut used = HashSet::new();
        let mut transitions = 0;
        for insn in &design.states[st].insns {
            let i = &design.insns[*insn];
            let class = design.class_of(i.resource);
            if class.is_exclusive && !used.insert(i.resource) {
                return Err(Error::malformed_design(format!(
                    "{}: resource {} of class `{}' is used twice",
                    label(),
                    design.resources[i.resource].id,
                    class.name
                )));
            }
            if rc::is_transition(&class.name) {
                transitions += 1;
                let conds = i.inputs.len();
                let ok = match i.target_states.len() {
                    0 | 1 => conds == 0,
                    2 => conds == 1,
                    _ => false,
                };
                if !ok {
                    return Err(Error::malformed_design(format!(
                        "{}: transition with {} targets and {conds} conditions",
                        label(),
                        i.target_states.len()
                    )));
                }
            }
        }
        if transitions > 1 {
            return Err(Error::malformed_design(format!(
                "{}: more than one transition",
                label()
            )));
        }
        Ok(())
    }

    fn check_parent(design: &ir::Design, res: ir::ResourceIdx) -> TabulaResult<()> {
        let class = design.class_name(res);
        let want: Option<fn(&str) -> bool> = if rc::is_shared_reg_accessor(class) {
            Some(rc::is_shared_reg)
        } else if rc::is_shared_memory_accessor(class) || rc::is_axi_port(class) {
            Some(rc::is_shared_memory)
        } else {
            None
        };
        let Some(want) = want else {
            return Ok(());
        };
        match design.resources[res].parent_resource {
            Some(p) if want(design.class_name(p)) => Ok(()),
            _ => Err(Error::malformed_design(format!(
                "{}: `{class}' resource {} lacks a valid parent resource",
                design.table_label(design.resources[res].table),
                design.resources[res].id
            ))),
        }
    }
}

impl Phase for WellFormed {
    fn start_design(&mut self, design: &mut ir::Design) -> TabulaResult<()> {
        design.check_references()
    }

    fn apply_for_table(
        &mut self,
        table: ir::TableIdx,
        design: &mut ir::Design,
    ) -> TabulaResult<()> {
        let t = &design.tables[table];
        if !t.states.is_empty() && t.initial_state.is_none() {
            return Err(Error::malformed_design(format!(
                "{}: has states but no initial state",
                design.table_label(table)
            )));
        }
        for st in &t.states {
            Self::check_state(design, table, *st)?;
        }
        for res in &t.resources {
            Self::check_parent(design, *res)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_ir::Builder;

    #[test]
    fn rejects_double_use_of_exclusive_resource() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let st = b.alloc_state(t);
        let x = b.alloc_register(t, "x", 8);
        let add = b.create_resource(t, "add").unwrap();
        b.insert_insn(st, add, &[x, x], &[x]);
        assert!(WellFormed::do_pass_default(&mut d).is_ok());
        b = Builder::new(&mut d);
        b.insert_insn(st, add, &[x, x], &[x]);
        let err = WellFormed::do_pass_default(&mut d).err().unwrap();
        assert!(err.to_string().contains("used twice"));
    }

    #[test]
    fn rejects_orphan_accessor() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        b.create_resource(t, "shared-reg-reader").unwrap();
        assert!(WellFormed::do_pass_default(&mut d).is_err());
    }
}
