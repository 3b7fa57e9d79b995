//! Queries over a design shared by the passes and writers.
use crate::resource_class as rc;
use crate::structure::*;

/// The transition insn of `state`, if it has one.
pub fn find_transition_insn(design: &Design, state: StateIdx) -> Option<InsnIdx> {
    design.states[state]
        .insns
        .iter()
        .copied()
        .find(|i| rc::is_transition(design.insn_class(*i)))
}

/// Successors of `state` in the order of the transition's targets.
pub fn get_next_states(design: &Design, state: StateIdx) -> Vec<StateIdx> {
    find_transition_insn(design, state)
        .map(|i| design.insns[i].target_states.to_vec())
        .unwrap_or_default()
}

/// Insns in `table` that use `res`, in state order.
pub fn insns_by_resource(design: &Design, res: ResourceIdx) -> Vec<InsnIdx> {
    let table = design.resources[res].table;
    design.tables[table]
        .states
        .iter()
        .flat_map(|st| design.states[*st].insns.iter().copied())
        .filter(|i| design.insns[*i].resource == res)
        .collect()
}

/// Resources of `table` with class `class`.
pub fn resources_of_class(design: &Design, table: TableIdx, class: &str) -> Vec<ResourceIdx> {
    design.tables[table]
        .resources
        .iter()
        .copied()
        .filter(|r| design.class_name(*r) == class)
        .collect()
}

/// `module` followed by its ancestors up to the root.
pub fn module_path_to_root(design: &Design, module: ModuleIdx) -> Vec<ModuleIdx> {
    let mut path = vec![module];
    let mut cur = design.modules[module].parent;
    while let Some(m) = cur {
        path.push(m);
        cur = design.modules[m].parent;
    }
    path
}

/// The nearest module that contains both `a` and `b`, or `None` when they
/// are in separate hierarchies.
pub fn common_root(design: &Design, a: ModuleIdx, b: ModuleIdx) -> Option<ModuleIdx> {
    let pa = module_path_to_root(design, a);
    module_path_to_root(design, b)
        .into_iter()
        .find(|m| pa.contains(m))
}

/// The root of the hierarchy containing `module`.
pub fn root_of(design: &Design, module: ModuleIdx) -> ModuleIdx {
    module_path_to_root(design, module)
        .last()
        .copied()
        .unwrap_or(module)
}

/// The initial state of `table` when it is one of the table's states.
pub fn find_initial_state(design: &Design, table: TableIdx) -> Option<StateIdx> {
    let t = &design.tables[table];
    t.initial_state.filter(|st| t.states.contains(st))
}

/// Largest state id used in `table`.
pub fn max_state_id(design: &Design, table: TableIdx) -> i32 {
    design.tables[table]
        .states
        .iter()
        .map(|s| design.states[*s].id)
        .max()
        .unwrap_or(0)
}

/// Insns of `table` that read or write `reg`.
pub fn register_users(design: &Design, table: TableIdx, reg: RegisterIdx) -> Vec<InsnIdx> {
    design.tables[table]
        .states
        .iter()
        .flat_map(|st| design.states[*st].insns.iter().copied())
        .filter(|i| {
            let insn = &design.insns[*i];
            insn.inputs.contains(&reg) || insn.outputs.contains(&reg)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    #[test]
    fn roots() {
        let mut d = Design::new();
        let top = d.add_module("top");
        let a = d.add_module("a");
        let b = d.add_module("b");
        let c = d.add_module("c");
        let lone = d.add_module("lone");
        d.set_parent_module(a, top).unwrap();
        d.set_parent_module(b, top).unwrap();
        d.set_parent_module(c, a).unwrap();
        assert_eq!(module_path_to_root(&d, c), vec![c, a, top]);
        assert_eq!(common_root(&d, c, b), Some(top));
        assert_eq!(common_root(&d, c, a), Some(a));
        assert_eq!(common_root(&d, a, a), Some(a));
        assert_eq!(common_root(&d, c, lone), None);
        assert_eq!(root_of(&d, c), top);
    }

    #[test]
    fn transitions_and_users() {
        let mut d = Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let s1 = b.alloc_state(t);
        let s2 = b.alloc_state(t);
        b.add_next_state(s1, s2).unwrap();
        let r = b.alloc_register(t, "r", 8);
        let set = b.create_resource(t, "set").unwrap();
        let insn = b.insert_insn(s2, set, &[], &[r]);
        assert_eq!(find_initial_state(&d, t), Some(s1));
        assert_eq!(get_next_states(&d, s1), vec![s2]);
        assert!(get_next_states(&d, s2).is_empty());
        assert_eq!(insns_by_resource(&d, set), vec![insn]);
        assert_eq!(register_users(&d, t, r), vec![insn]);
        assert_eq!(resources_of_class(&d, t, "tr").len(), 1);
    }
}
