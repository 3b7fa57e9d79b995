//! Deep copy of a table into another module.
use crate::structure::*;
use std::collections::HashMap;

/// Copies `src` with its registers, resources, states and insns into
/// `module`. References inside the table are redirected to the copies;
/// references leaving it (parent resources, callee tables, foreign
/// registers) keep pointing at the originals. New objects keep the ids of
/// their originals since ids are scoped per table.
pub fn copy_table(design: &mut Design, src: TableIdx, module: ModuleIdx) -> TableIdx {
    let orig = design.tables[src].clone();
    let dst = design.add_table(module);
    design.tables[dst].id = orig.id;
    design.tables[dst].name = orig.name.clone();

    let mut reg_map = HashMap::new();
    for r in &orig.registers {
        let reg = design.registers[*r].clone();
        let new = design.add_register(dst, &reg.name, reg.value_type, reg.kind);
        let n = &mut design.registers[new];
        n.id = reg.id;
        n.initial_value = reg.initial_value;
        reg_map.insert(*r, new);
    }

    let mut res_map = HashMap::new();
    for r in &orig.resources {
        let res = design.resources[*r].clone();
        let new = design.add_resource(dst, res.class);
        let n = &mut design.resources[new];
        n.id = res.id;
        n.params = res.params;
        n.input_types = res.input_types;
        n.output_types = res.output_types;
        n.array = res.array;
        n.callee_table = res.callee_table;
        n.parent_resource = res.parent_resource;
        res_map.insert(*r, new);
    }
    // Parents inside the copied table follow the copy.
    for new in res_map.values() {
        if let Some(p) = design.resources[*new].parent_resource {
            if let Some(np) = res_map.get(&p) {
                design.resources[*new].parent_resource = Some(*np);
            }
        }
    }

    let mut st_map = HashMap::new();
    for s in &orig.states {
        let st = design.states[*s].clone();
        let new = design.add_state(dst);
        design.states[new].id = st.id;
        design.states[new].profile = st.profile;
        st_map.insert(*s, new);
    }
    design.tables[dst].initial_state =
        orig.initial_state.and_then(|s| st_map.get(&s).copied());

    let mut insn_map = HashMap::new();
    for s in &orig.states {
        let insns = design.states[*s].insns.clone();
        for i in insns {
            let insn = design.insns[i].clone();
            let res = res_map.get(&insn.resource).copied().unwrap_or(insn.resource);
            let new = design.add_insn(res);
            let n = &mut design.insns[new];
            n.id = insn.id;
            n.operand = insn.operand;
            n.inputs = insn
                .inputs
                .iter()
                .map(|r| reg_map.get(r).copied().unwrap_or(*r))
                .collect();
            n.outputs = insn
                .outputs
                .iter()
                .map(|r| reg_map.get(r).copied().unwrap_or(*r))
                .collect();
            n.target_states = insn
                .target_states
                .iter()
                .map(|s| st_map.get(s).copied().unwrap_or(*s))
                .collect();
            n.depending_insns = insn.depending_insns;
            design.push_insn(st_map[s], new);
            insn_map.insert(i, new);
        }
    }
    for new in insn_map.values() {
        let deps = design.insns[*new]
            .depending_insns
            .iter()
            .map(|d| insn_map.get(d).copied().unwrap_or(*d))
            .collect();
        design.insns[*new].depending_insns = deps;
    }
    log::debug!(
        "copied {} into module `{}'",
        design.table_label(src),
        design.modules[module].name
    );
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Builder, validate_ids};

    #[test]
    fn copy_remaps_internal_references() {
        let mut d = Design::new();
        let m = d.add_module("m");
        let m2 = d.add_module("m2");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let s1 = b.alloc_state(t);
        let s2 = b.alloc_state(t);
        b.add_next_state(s1, s2).unwrap();
        b.add_next_state(s2, s1).unwrap();
        let r = b.alloc_register(t, "x", 8);
        let set = b.create_resource(t, "set").unwrap();
        let one = b.alloc_const(t, 8, 1);
        b.insert_insn(s2, set, &[one], &[r]);
        validate_ids(&mut d);

        let c = copy_table(&mut d, t, m2);
        let ct = &d.tables[c];
        assert_eq!(ct.module, m2);
        assert_eq!(ct.states.len(), 2);
        assert_eq!(ct.initial_state, Some(ct.states[0]));
        let cs2 = ct.states[1];
        let tr = d.states[ct.states[0]].insns[0];
        assert_eq!(d.insns[tr].target_states.as_slice(), &[cs2]);
        let set_insn = d.states[cs2].insns[1];
        assert_eq!(d.registers[d.insns[set_insn].outputs[0]].table, c);
        assert_eq!(d.resources[d.insns[set_insn].resource].table, c);
        assert_eq!(d.states[cs2].id, d.states[s2].id);
        assert!(d.check_references().is_ok());
    }
}
