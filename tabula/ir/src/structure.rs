//! The design hierarchy: modules, tables, states, insns, registers and
//! resources. All objects live in arenas owned by [Design] and refer to each
//! other through typed indices.
use crate::numeric::{Numeric, NumericWidth};
use crate::params::ResourceParams;
use crate::platform::Platform;
use crate::resource_class::{self, ResourceClass};
use smallvec::SmallVec;
use std::collections::HashMap;
use tabula_utils::{Error, IndexedMap, TabulaResult, impl_index};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleIdx(u32);
impl_index!(ModuleIdx);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableIdx(u32);
impl_index!(TableIdx);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateIdx(u32);
impl_index!(StateIdx);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InsnIdx(u32);
impl_index!(InsnIdx);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterIdx(u32);
impl_index!(RegisterIdx);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdx(u32);
impl_index!(ResourceIdx);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassIdx(u32);
impl_index!(ClassIdx);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayImageIdx(u32);
impl_index!(ArrayImageIdx);

/// Id of an object that has not been numbered yet.
pub const UNASSIGNED_ID: i32 = -1;

/// An HDL module.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: i32,
    pub name: String,
    pub parent: Option<ModuleIdx>,
    pub params: ResourceParams,
    pub tables: Vec<TableIdx>,
}

/// One FSM: resource columns by state rows.
#[derive(Debug, Clone)]
pub struct Table {
    pub id: i32,
    pub name: Option<String>,
    pub module: ModuleIdx,
    pub registers: Vec<RegisterIdx>,
    pub resources: Vec<ResourceIdx>,
    pub states: Vec<StateIdx>,
    pub initial_state: Option<StateIdx>,
}

/// Execution counts collected by a profiler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Profile {
    pub valid: bool,
    pub raw_count: i64,
    pub normalized_count: i64,
}

#[derive(Debug, Clone)]
pub struct State {
    pub id: i32,
    pub table: TableIdx,
    pub insns: Vec<InsnIdx>,
    pub profile: Profile,
}

/// A use of a resource within a state.
#[derive(Debug, Clone)]
pub struct Insn {
    pub id: i32,
    pub resource: ResourceIdx,
    pub operand: String,
    pub inputs: SmallVec<[RegisterIdx; 4]>,
    pub outputs: SmallVec<[RegisterIdx; 2]>,
    pub target_states: SmallVec<[StateIdx; 2]>,
    pub depending_insns: Vec<InsnIdx>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    /// Holds its value across states.
    Normal,
    /// Fixed value; never written.
    Const,
    /// Only valid within the state that writes it.
    StateLocal,
}

#[derive(Debug, Clone)]
pub struct Register {
    pub id: i32,
    pub name: String,
    pub table: TableIdx,
    pub value_type: NumericWidth,
    pub kind: RegisterKind,
    pub initial_value: Option<Numeric>,
}

impl Register {
    pub fn is_const(&self) -> bool {
        self.kind == RegisterKind::Const
    }

    pub fn is_state_local(&self) -> bool {
        self.kind == RegisterKind::StateLocal
    }

    pub fn is_normal(&self) -> bool {
        self.kind == RegisterKind::Normal
    }
}

/// Widest address an array may have.
pub const MAX_ADDRESS_WIDTH: u32 = 32;

/// Storage backing an array-like resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Array {
    pub address_width: u32,
    pub data_type: NumericWidth,
    pub is_external: bool,
    pub is_ram: bool,
    pub image: Option<ArrayImageIdx>,
}

/// Initial contents of an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayImage {
    pub id: i32,
    pub name: String,
    pub values: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub id: i32,
    pub class: ClassIdx,
    pub table: TableIdx,
    pub params: ResourceParams,
    pub input_types: Vec<NumericWidth>,
    pub output_types: Vec<NumericWidth>,
    pub array: Option<Array>,
    pub callee_table: Option<TableIdx>,
    pub parent_resource: Option<ResourceIdx>,
}

/// The whole design.
#[derive(Debug, Clone)]
pub struct Design {
    pub params: ResourceParams,
    pub modules: IndexedMap<ModuleIdx, Module>,
    pub tables: IndexedMap<TableIdx, Table>,
    pub states: IndexedMap<StateIdx, State>,
    pub insns: IndexedMap<InsnIdx, Insn>,
    pub registers: IndexedMap<RegisterIdx, Register>,
    pub resources: IndexedMap<ResourceIdx, Resource>,
    pub classes: IndexedMap<ClassIdx, ResourceClass>,
    pub array_images: IndexedMap<ArrayImageIdx, ArrayImage>,
    pub platforms: Vec<Platform>,
    /// Extra options for passes, `pass:opt[=value]`.
    pub extra_opts: Vec<String>,
    class_names: HashMap<String, ClassIdx>,
}

impl Default for Design {
    fn default() -> Self {
        Self::new()
    }
}

impl Design {
    /// An empty design with the builtin resource classes installed.
    pub fn new() -> Self {
        let mut design = Design {
            params: ResourceParams::new(),
            modules: IndexedMap::new(),
            tables: IndexedMap::new(),
            states: IndexedMap::new(),
            insns: IndexedMap::new(),
            registers: IndexedMap::new(),
            resources: IndexedMap::new(),
            classes: IndexedMap::new(),
            array_images: IndexedMap::new(),
            platforms: Vec::new(),
            extra_opts: Vec::new(),
            class_names: HashMap::new(),
        };
        for (name, is_exclusive) in resource_class::BUILTIN_CLASSES {
            design.install_class(name, *is_exclusive);
        }
        design
    }

    /// Adds a resource class, or returns the existing one with that name.
    pub fn install_class(&mut self, name: &str, is_exclusive: bool) -> ClassIdx {
        if let Some(idx) = self.class_names.get(name) {
            return *idx;
        }
        let idx = self.classes.push(ResourceClass {
            name: name.to_string(),
            is_exclusive,
        });
        self.class_names.insert(name.to_string(), idx);
        idx
    }

    pub fn find_class(&self, name: &str) -> TabulaResult<ClassIdx> {
        self.class_names
            .get(name)
            .copied()
            .ok_or_else(|| Error::unknown_class(name))
    }

    pub fn add_module<S: ToString>(&mut self, name: S) -> ModuleIdx {
        self.modules.push(Module {
            id: UNASSIGNED_ID,
            name: name.to_string(),
            parent: None,
            params: ResourceParams::new(),
            tables: Vec::new(),
        })
    }

    /// Makes `parent` the parent of `child`. Rejects cycles.
    pub fn set_parent_module(
        &mut self,
        child: ModuleIdx,
        parent: ModuleIdx,
    ) -> TabulaResult<()> {
        let mut cur = Some(parent);
        while let Some(m) = cur {
            if m == child {
                return Err(Error::malformed_design(format!(
                    "module `{}' can not be an ancestor of itself",
                    self.modules[child].name
                )));
            }
            cur = self.modules[m].parent;
        }
        self.modules[child].parent = Some(parent);
        Ok(())
    }

    pub fn add_table(&mut self, module: ModuleIdx) -> TableIdx {
        let idx = self.tables.push(Table {
            id: UNASSIGNED_ID,
            name: None,
            module,
            registers: Vec::new(),
            resources: Vec::new(),
            states: Vec::new(),
            initial_state: None,
        });
        self.modules[module].tables.push(idx);
        idx
    }

    pub fn add_state(&mut self, table: TableIdx) -> StateIdx {
        let idx = self.states.push(State {
            id: UNASSIGNED_ID,
            table,
            insns: Vec::new(),
            profile: Profile::default(),
        });
        self.tables[table].states.push(idx);
        idx
    }

    pub fn set_initial_state(&mut self, table: TableIdx, state: StateIdx) {
        self.tables[table].initial_state = Some(state);
    }

    pub fn add_register<S: ToString>(
        &mut self,
        table: TableIdx,
        name: S,
        value_type: NumericWidth,
        kind: RegisterKind,
    ) -> RegisterIdx {
        let idx = self.registers.push(Register {
            id: UNASSIGNED_ID,
            name: name.to_string(),
            table,
            value_type,
            kind,
            initial_value: None,
        });
        self.tables[table].registers.push(idx);
        idx
    }

    pub fn add_resource(&mut self, table: TableIdx, class: ClassIdx) -> ResourceIdx {
        let idx = self.resources.push(Resource {
            id: UNASSIGNED_ID,
            class,
            table,
            params: ResourceParams::new(),
            input_types: Vec::new(),
            output_types: Vec::new(),
            array: None,
            callee_table: None,
            parent_resource: None,
        });
        self.tables[table].resources.push(idx);
        idx
    }

    /// A fresh insn using `resource`. It belongs to no state until pushed.
    pub fn add_insn(&mut self, resource: ResourceIdx) -> InsnIdx {
        self.insns.push(Insn {
            id: UNASSIGNED_ID,
            resource,
            operand: String::new(),
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
            target_states: SmallVec::new(),
            depending_insns: Vec::new(),
        })
    }

    pub fn push_insn(&mut self, state: StateIdx, insn: InsnIdx) {
        self.states[state].insns.push(insn);
    }

    pub fn set_parent_resource(&mut self, res: ResourceIdx, parent: ResourceIdx) {
        self.resources[res].parent_resource = Some(parent);
    }

    pub fn set_callee_table(&mut self, res: ResourceIdx, callee: TableIdx) {
        self.resources[res].callee_table = Some(callee);
    }

    pub fn set_array(&mut self, res: ResourceIdx, array: Array) {
        self.resources[res].array = Some(array);
    }

    pub fn add_array_image<S: ToString>(
        &mut self,
        name: S,
        values: Vec<u64>,
    ) -> ArrayImageIdx {
        self.array_images.push(ArrayImage {
            id: UNASSIGNED_ID,
            name: name.to_string(),
            values,
        })
    }

    pub fn class_of(&self, res: ResourceIdx) -> &ResourceClass {
        &self.classes[self.resources[res].class]
    }

    /// Class name of a resource.
    pub fn class_name(&self, res: ResourceIdx) -> &str {
        &self.class_of(res).name
    }

    /// Class name of the resource an insn uses.
    pub fn insn_class(&self, insn: InsnIdx) -> &str {
        self.class_name(self.insns[insn].resource)
    }

    pub fn insn_table(&self, insn: InsnIdx) -> TableIdx {
        self.resources[self.insns[insn].resource].table
    }

    pub fn resource_module(&self, res: ResourceIdx) -> ModuleIdx {
        self.tables[self.resources[res].table].module
    }

    /// Modules whose parent is `module`, in creation order.
    pub fn child_modules(&self, module: ModuleIdx) -> Vec<ModuleIdx> {
        self.modules
            .iter()
            .filter(|(_, m)| m.parent == Some(module))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Modules without a parent.
    pub fn root_modules(&self) -> Vec<ModuleIdx> {
        self.modules
            .iter()
            .filter(|(_, m)| m.parent.is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn find_module(&self, name: &str) -> Option<ModuleIdx> {
        self.modules
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(idx, _)| idx)
    }

    /// The state that holds `insn`, if any.
    pub fn state_of_insn(&self, insn: InsnIdx) -> Option<StateIdx> {
        let table = self.insn_table(insn);
        self.tables[table]
            .states
            .iter()
            .copied()
            .find(|st| self.states[*st].insns.contains(&insn))
    }

    /// Checks that every reference in the design stays inside the table or
    /// design it belongs to.
    pub fn check_references(&self) -> TabulaResult<()> {
        for (tidx, table) in self.tables.iter() {
            let tname = self.table_label(tidx);
            if let Some(init) = table.initial_state {
                if !table.states.contains(&init) {
                    return Err(Error::malformed_design(format!(
                        "{tname}: initial state is not in the table"
                    )));
                }
            }
            for st in &table.states {
                for insn in &self.states[*st].insns {
                    let i = &self.insns[*insn];
                    if self.resources[i.resource].table != tidx {
                        return Err(Error::malformed_design(format!(
                            "{tname}: insn {} uses a resource of another table",
                            i.id
                        )));
                    }
                    for target in &i.target_states {
                        if self.states[*target].table != tidx {
                            return Err(Error::malformed_design(format!(
                                "{tname}: insn {} jumps out of the table",
                                i.id
                            )));
                        }
                    }
                    for reg in i.inputs.iter().chain(i.outputs.iter()) {
                        if self.registers[*reg].table != tidx
                            && self.insn_class(*insn) != resource_class::FOREIGN_REG
                        {
                            return Err(Error::malformed_design(format!(
                                "{tname}: insn {} uses register `{}' of another table",
                                i.id, self.registers[*reg].name
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Human readable name of a table for diagnostics.
    pub fn table_label(&self, table: TableIdx) -> String {
        let t = &self.tables[table];
        format!("{}/table {}", self.modules[t.module].name, t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_classes_installed() {
        let d = Design::new();
        let tr = d.find_class("tr").unwrap();
        assert!(d.classes[tr].is_exclusive);
        let set = d.find_class("set").unwrap();
        assert!(!d.classes[set].is_exclusive);
        assert!(matches!(
            d.find_class("no-such-class"),
            Err(Error::UnknownResourceClass(_))
        ));
    }

    #[test]
    fn hierarchy() {
        let mut d = Design::new();
        let top = d.add_module("top");
        let a = d.add_module("a");
        let b = d.add_module("b");
        d.set_parent_module(a, top).unwrap();
        d.set_parent_module(b, a).unwrap();
        assert_eq!(d.root_modules(), vec![top]);
        assert_eq!(d.child_modules(top), vec![a]);
        assert!(d.set_parent_module(top, b).is_err());
        assert_eq!(d.find_module("b"), Some(b));
    }

    #[test]
    fn insn_lookup() {
        let mut d = Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let st = d.add_state(t);
        let tr = d.find_class("tr").unwrap();
        let res = d.add_resource(t, tr);
        let insn = d.add_insn(res);
        assert_eq!(d.state_of_insn(insn), None);
        d.push_insn(st, insn);
        assert_eq!(d.state_of_insn(insn), Some(st));
        assert_eq!(d.insn_class(insn), "tr");
        d.set_initial_state(t, st);
        assert!(d.check_references().is_ok());
    }
}
