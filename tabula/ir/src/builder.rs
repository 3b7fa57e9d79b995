//! Factory functions to construct designs programmatically.
use crate::numeric::{Numeric, NumericWidth};
use crate::resource_class as rc;
use crate::structure::*;
use itertools::Itertools;
use std::collections::HashSet;
use tabula_utils::{Error, TabulaResult};

/// Creates resources, registers and states in a [Design]. The builder
/// checks the relationships the writers depend on, like a shared register
/// reader pointing at a shared register.
pub struct Builder<'a> {
    pub design: &'a mut Design,
}

impl<'a> Builder<'a> {
    pub fn new(design: &'a mut Design) -> Self {
        Self { design }
    }

    /// A resource of class `class` in `table`.
    pub fn create_resource(
        &mut self,
        table: TableIdx,
        class: &str,
    ) -> TabulaResult<ResourceIdx> {
        let class = self.design.find_class(class)?;
        Ok(self.design.add_resource(table, class))
    }

    /// Returns a resource of `class` in `table`, creating it if the table
    /// has none.
    pub fn get_one_resource(
        &mut self,
        table: TableIdx,
        class: &str,
    ) -> TabulaResult<ResourceIdx> {
        let existing = self.design.tables[table]
            .resources
            .iter()
            .copied()
            .find(|r| self.design.class_name(*r) == class);
        match existing {
            Some(r) => Ok(r),
            None => self.create_resource(table, class),
        }
    }

    pub fn get_transition_resource(
        &mut self,
        table: TableIdx,
    ) -> TabulaResult<ResourceIdx> {
        self.get_one_resource(table, rc::TRANSITION)
    }

    fn expect_class(&self, res: ResourceIdx, pred: fn(&str) -> bool, what: &str) -> TabulaResult<()> {
        let name = self.design.class_name(res);
        if pred(name) {
            Ok(())
        } else {
            Err(Error::malformed_design(format!(
                "expected {what}, got a `{name}' resource"
            )))
        }
    }

    /// A register shared across tables. `name` is appended to its HDL name.
    pub fn create_shared_reg(
        &mut self,
        table: TableIdx,
        name: &str,
        width: u32,
    ) -> TabulaResult<ResourceIdx> {
        let res = self.create_resource(table, rc::SHARED_REG)?;
        let r = &mut self.design.resources[res];
        r.input_types.push(NumericWidth::unsigned(width));
        r.output_types.push(NumericWidth::unsigned(width));
        r.params.set_ext_output_port(name, width as i64);
        Ok(res)
    }

    fn create_accessor(
        &mut self,
        table: TableIdx,
        class: &str,
        parent: ResourceIdx,
    ) -> TabulaResult<ResourceIdx> {
        let res = self.create_resource(table, class)?;
        let types = self.design.resources[parent].output_types.clone();
        let r = &mut self.design.resources[res];
        if class.ends_with("reader") {
            r.output_types = types;
        } else {
            r.input_types = types;
        }
        self.design.set_parent_resource(res, parent);
        Ok(res)
    }

    pub fn create_shared_reg_reader(
        &mut self,
        table: TableIdx,
        shared_reg: ResourceIdx,
    ) -> TabulaResult<ResourceIdx> {
        self.expect_class(shared_reg, rc::is_shared_reg, "a shared register")?;
        self.create_accessor(table, rc::SHARED_REG_READER, shared_reg)
    }

    pub fn create_shared_reg_writer(
        &mut self,
        table: TableIdx,
        shared_reg: ResourceIdx,
    ) -> TabulaResult<ResourceIdx> {
        self.expect_class(shared_reg, rc::is_shared_reg, "a shared register")?;
        self.create_accessor(table, rc::SHARED_REG_WRITER, shared_reg)
    }

    pub fn create_ext_input(
        &mut self,
        table: TableIdx,
        name: &str,
        width: u32,
    ) -> TabulaResult<ResourceIdx> {
        let res = self.create_resource(table, rc::EXT_INPUT)?;
        let r = &mut self.design.resources[res];
        r.output_types.push(NumericWidth::unsigned(width));
        r.params.set_ext_input_port(name, width as i64);
        Ok(res)
    }

    pub fn create_ext_output(
        &mut self,
        table: TableIdx,
        name: &str,
        width: u32,
    ) -> TabulaResult<ResourceIdx> {
        let res = self.create_resource(table, rc::EXT_OUTPUT)?;
        let r = &mut self.design.resources[res];
        r.input_types.push(NumericWidth::unsigned(width));
        r.params.set_ext_output_port(name, width as i64);
        Ok(res)
    }

    /// An `array` resource: input types are (address, write data), the
    /// output type is the read data.
    pub fn create_array(
        &mut self,
        table: TableIdx,
        address_width: u32,
        data_type: NumericWidth,
        is_external: bool,
        is_ram: bool,
    ) -> TabulaResult<ResourceIdx> {
        check_address_width(address_width)?;
        let res = self.create_resource(table, rc::ARRAY)?;
        let r = &mut self.design.resources[res];
        r.input_types = vec![NumericWidth::unsigned(address_width), data_type];
        r.output_types = vec![data_type];
        self.design.set_array(
            res,
            Array {
                address_width,
                data_type,
                is_external,
                is_ram,
                image: None,
            },
        );
        Ok(res)
    }

    /// A memory other tables access through readers, writers and AXI ports.
    pub fn create_shared_memory(
        &mut self,
        table: TableIdx,
        address_width: u32,
        data_width: u32,
    ) -> TabulaResult<ResourceIdx> {
        check_address_width(address_width)?;
        let data_type = NumericWidth::unsigned(data_width);
        let res = self.create_resource(table, rc::SHARED_MEMORY)?;
        let r = &mut self.design.resources[res];
        r.input_types = vec![NumericWidth::unsigned(address_width), data_type];
        r.output_types = vec![data_type];
        self.design.set_array(
            res,
            Array {
                address_width,
                data_type,
                is_external: false,
                is_ram: true,
                image: None,
            },
        );
        Ok(res)
    }

    fn create_memory_accessor(
        &mut self,
        table: TableIdx,
        class: &str,
        mem: ResourceIdx,
    ) -> TabulaResult<ResourceIdx> {
        self.expect_class(mem, rc::is_shared_memory, "a shared memory")?;
        let res = self.create_resource(table, class)?;
        let (inputs, outputs) = {
            let m = &self.design.resources[mem];
            (m.input_types.clone(), m.output_types.clone())
        };
        let r = &mut self.design.resources[res];
        r.input_types = inputs;
        r.output_types = outputs;
        self.design.set_parent_resource(res, mem);
        Ok(res)
    }

    pub fn create_shared_memory_reader(
        &mut self,
        table: TableIdx,
        mem: ResourceIdx,
    ) -> TabulaResult<ResourceIdx> {
        self.create_memory_accessor(table, rc::SHARED_MEMORY_READER, mem)
    }

    pub fn create_shared_memory_writer(
        &mut self,
        table: TableIdx,
        mem: ResourceIdx,
    ) -> TabulaResult<ResourceIdx> {
        self.create_memory_accessor(table, rc::SHARED_MEMORY_WRITER, mem)
    }

    /// An AXI master transferring between `mem` and an external bus.
    pub fn create_axi_master_port(
        &mut self,
        table: TableIdx,
        mem: ResourceIdx,
    ) -> TabulaResult<ResourceIdx> {
        self.expect_class(mem, rc::is_shared_memory, "a shared memory")?;
        let res = self.create_resource(table, rc::AXI_MASTER_PORT)?;
        self.design.set_parent_resource(res, mem);
        Ok(res)
    }

    /// An AXI slave exposing `mem` to an external bus master.
    pub fn create_axi_slave_port(
        &mut self,
        table: TableIdx,
        mem: ResourceIdx,
    ) -> TabulaResult<ResourceIdx> {
        self.expect_class(mem, rc::is_shared_memory, "a shared memory")?;
        let res = self.create_resource(table, rc::AXI_SLAVE_PORT)?;
        self.design.set_parent_resource(res, mem);
        Ok(res)
    }

    /// An instance of a hand written Verilog module read from `file`.
    pub fn create_embedded(
        &mut self,
        table: TableIdx,
        module: &str,
        file: &str,
    ) -> TabulaResult<ResourceIdx> {
        let res = self.create_resource(table, rc::EMBEDDED)?;
        self.design.resources[res]
            .params
            .set_embedded_module(module, file);
        Ok(res)
    }

    /// A resource reading `reg`, which lives in another table.
    pub fn create_foreign_register(
        &mut self,
        table: TableIdx,
        reg: RegisterIdx,
    ) -> TabulaResult<ResourceIdx> {
        if self.design.registers[reg].table == table {
            return Err(Error::malformed_design(format!(
                "register `{}' is not foreign to its own table",
                self.design.registers[reg].name
            )));
        }
        let res = self.create_resource(table, rc::FOREIGN_REG)?;
        let ty = self.design.registers[reg].value_type;
        self.design.resources[res].output_types.push(ty);
        Ok(res)
    }

    pub fn alloc_register(
        &mut self,
        table: TableIdx,
        name: &str,
        width: u32,
    ) -> RegisterIdx {
        self.design.add_register(
            table,
            name,
            NumericWidth::unsigned(width),
            RegisterKind::Normal,
        )
    }

    pub fn alloc_wire(
        &mut self,
        table: TableIdx,
        name: &str,
        width: u32,
    ) -> RegisterIdx {
        self.design.add_register(
            table,
            name,
            NumericWidth::unsigned(width),
            RegisterKind::StateLocal,
        )
    }

    pub fn alloc_const(
        &mut self,
        table: TableIdx,
        width: u32,
        value: u64,
    ) -> RegisterIdx {
        let ty = NumericWidth::unsigned(width);
        let reg = self.design.add_register(table, "", ty, RegisterKind::Const);
        self.design.registers[reg].initial_value = Some(Numeric::from_u64(value, ty));
        reg
    }

    /// A new state. The first state of a table becomes its initial state.
    pub fn alloc_state(&mut self, table: TableIdx) -> StateIdx {
        let st = self.design.add_state(table);
        if self.design.tables[table].initial_state.is_none() {
            self.design.set_initial_state(table, st);
        }
        st
    }

    /// The transition insn of `state`, created if missing.
    pub fn find_or_create_transition(
        &mut self,
        state: StateIdx,
    ) -> TabulaResult<InsnIdx> {
        let table = self.design.states[state].table;
        let tr = self.get_transition_resource(table)?;
        let found = self.design.states[state]
            .insns
            .iter()
            .copied()
            .find(|i| self.design.insns[*i].resource == tr);
        Ok(match found {
            Some(i) => i,
            None => {
                let insn = self.design.add_insn(tr);
                self.design.push_insn(state, insn);
                insn
            }
        })
    }

    /// Unconditional transition from `from` to `to`.
    pub fn add_next_state(&mut self, from: StateIdx, to: StateIdx) -> TabulaResult<InsnIdx> {
        let insn = self.find_or_create_transition(from)?;
        let i = &mut self.design.insns[insn];
        i.target_states.clear();
        i.target_states.push(to);
        i.inputs.clear();
        Ok(insn)
    }

    /// Goes to `if_true` when `cond` is non zero and to `if_false`
    /// otherwise.
    pub fn add_conditional_transition(
        &mut self,
        from: StateIdx,
        cond: RegisterIdx,
        if_false: StateIdx,
        if_true: StateIdx,
    ) -> TabulaResult<InsnIdx> {
        let insn = self.find_or_create_transition(from)?;
        let i = &mut self.design.insns[insn];
        i.target_states.clear();
        i.target_states.push(if_false);
        i.target_states.push(if_true);
        i.inputs.clear();
        i.inputs.push(cond);
        Ok(insn)
    }

    /// An insn of `res` placed in `state`.
    pub fn insert_insn(
        &mut self,
        state: StateIdx,
        res: ResourceIdx,
        inputs: &[RegisterIdx],
        outputs: &[RegisterIdx],
    ) -> InsnIdx {
        let insn = self.design.add_insn(res);
        let i = &mut self.design.insns[insn];
        i.inputs.extend(inputs.iter().copied());
        i.outputs.extend(outputs.iter().copied());
        self.design.push_insn(state, insn);
        insn
    }
}

/// Hands out ids larger than any already used in one scope.
struct IdScope {
    used: HashSet<i32>,
    next: i32,
}

impl IdScope {
    fn new<I: IntoIterator<Item = i32>>(ids: I) -> Self {
        let used: HashSet<i32> = ids.into_iter().filter(|id| *id >= 0).collect();
        let next = used.iter().max().map_or(1, |m| m + 1);
        Self { used, next }
    }

    fn assign(&mut self, id: &mut i32) {
        if *id < 0 {
            *id = self.next;
            self.used.insert(self.next);
            self.next += 1;
        }
    }
}

/// Assigns an id to every object without one. Modules and array images are
/// numbered per design, tables per module and everything else per table.
fn check_address_width(width: u32) -> TabulaResult<()> {
    if width > MAX_ADDRESS_WIDTH {
        return Err(Error::malformed_design(format!(
            "address width {width} is wider than {MAX_ADDRESS_WIDTH} bits"
        )));
    }
    Ok(())
}

pub fn validate_ids(design: &mut Design) {
    let modules = design.modules.keys().collect_vec();
    let mut scope = IdScope::new(modules.iter().map(|m| design.modules[*m].id));
    for m in &modules {
        scope.assign(&mut design.modules[*m].id);
    }
    let images = design.array_images.keys().collect_vec();
    let mut scope = IdScope::new(images.iter().map(|i| design.array_images[*i].id));
    for i in &images {
        scope.assign(&mut design.array_images[*i].id);
    }
    for m in modules {
        let tables = design.modules[m].tables.clone();
        let mut scope = IdScope::new(tables.iter().map(|t| design.tables[*t].id));
        for t in &tables {
            scope.assign(&mut design.tables[*t].id);
        }
        for t in tables {
            validate_table_ids(design, t);
        }
    }
}

fn validate_table_ids(design: &mut Design, table: TableIdx) {
    let t = design.tables[table].clone();
    let mut scope = IdScope::new(t.states.iter().map(|s| design.states[*s].id));
    for s in &t.states {
        scope.assign(&mut design.states[*s].id);
    }
    let mut scope = IdScope::new(t.registers.iter().map(|r| design.registers[*r].id));
    for r in &t.registers {
        scope.assign(&mut design.registers[*r].id);
    }
    let mut scope = IdScope::new(t.resources.iter().map(|r| design.resources[*r].id));
    for r in &t.resources {
        scope.assign(&mut design.resources[*r].id);
    }
    let insns = t
        .states
        .iter()
        .flat_map(|s| design.states[*s].insns.clone())
        .collect_vec();
    let mut scope = IdScope::new(insns.iter().map(|i| design.insns[*i].id));
    for i in insns {
        scope.assign(&mut design.insns[i].id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design_with_table() -> (Design, ModuleIdx, TableIdx) {
        let mut d = Design::new();
        let m = d.add_module("mod");
        let t = d.add_table(m);
        (d, m, t)
    }

    #[test]
    fn shared_reg_accessors() {
        let (mut d, _, t) = design_with_table();
        let mut b = Builder::new(&mut d);
        let reg = b.create_shared_reg(t, "o", 32).unwrap();
        let reader = b.create_shared_reg_reader(t, reg).unwrap();
        let writer = b.create_shared_reg_writer(t, reg).unwrap();
        assert_eq!(d.resources[reader].parent_resource, Some(reg));
        assert_eq!(d.resources[reader].output_types[0].width(), 32);
        assert_eq!(d.resources[writer].input_types[0].width(), 32);
        assert_eq!(
            d.resources[reg].params.ext_output_port(),
            Some(("o".to_string(), 32))
        );
    }

    #[test]
    fn accessor_of_wrong_class() {
        let (mut d, _, t) = design_with_table();
        let mut b = Builder::new(&mut d);
        let adder = b.create_resource(t, "add").unwrap();
        assert!(b.create_shared_reg_reader(t, adder).is_err());
        assert!(b.create_axi_master_port(t, adder).is_err());
        assert!(matches!(
            b.create_resource(t, "adder"),
            Err(Error::UnknownResourceClass(_))
        ));
    }

    #[test]
    fn axi_ports_point_to_memory() {
        let (mut d, _, t) = design_with_table();
        let mut b = Builder::new(&mut d);
        let mem = b.create_shared_memory(t, 10, 32).unwrap();
        let master = b.create_axi_master_port(t, mem).unwrap();
        let slave = b.create_axi_slave_port(t, mem).unwrap();
        assert_eq!(d.class_name(master), "axi-master-port");
        assert_eq!(d.resources[slave].parent_resource, Some(mem));
        assert_eq!(d.resources[mem].array.as_ref().unwrap().address_width, 10);
    }

    #[test]
    fn address_width_limit() {
        let (mut d, _, t) = design_with_table();
        let mut b = Builder::new(&mut d);
        let ty = NumericWidth::unsigned(8);
        assert!(b.create_array(t, 32, ty, false, true).is_ok());
        assert!(matches!(
            b.create_array(t, 64, ty, false, true),
            Err(Error::MalformedDesign(_))
        ));
        assert!(b.create_shared_memory(t, 33, 32).is_err());
    }

    #[test]
    fn transitions() {
        let (mut d, _, t) = design_with_table();
        let mut b = Builder::new(&mut d);
        let s1 = b.alloc_state(t);
        let s2 = b.alloc_state(t);
        let s3 = b.alloc_state(t);
        let cond = b.alloc_register(t, "c", 0);
        let tr = b.add_next_state(s1, s2).unwrap();
        let cond_tr = b.add_conditional_transition(s2, cond, s3, s1).unwrap();
        assert_eq!(b.find_or_create_transition(s2).unwrap(), cond_tr);
        assert_eq!(d.tables[t].initial_state, Some(s1));
        assert_eq!(d.insns[tr].target_states.as_slice(), &[s2]);
        let tr2 = d.states[s2].insns[0];
        assert_eq!(d.insns[tr2].target_states.as_slice(), &[s3, s1]);
        assert_eq!(d.insns[tr2].inputs.as_slice(), &[cond]);
        assert_eq!(d.tables[t].resources.len(), 1);
    }

    #[test]
    fn ids_fill_gaps_per_scope() {
        let (mut d, m, t) = design_with_table();
        let m2 = d.add_module("other");
        d.modules[m2].id = 5;
        let t2 = d.add_table(m2);
        let mut b = Builder::new(&mut d);
        let s1 = b.alloc_state(t);
        let s2 = b.alloc_state(t);
        b.design.states[s2].id = 3;
        let s3 = b.alloc_state(t2);
        validate_ids(&mut d);
        assert_eq!(d.modules[m].id, 6);
        assert_eq!(d.modules[m2].id, 5);
        assert_eq!(d.tables[t].id, 1);
        assert_eq!(d.tables[t2].id, 1);
        assert_eq!(d.states[s1].id, 4);
        assert_eq!(d.states[s3].id, 1);
    }
}
