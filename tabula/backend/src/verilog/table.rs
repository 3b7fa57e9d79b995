//! One table becomes a state register, its declarations and an `always`
//! block with a `case` over the states.
use super::insn::{self, is_multi_cycle, state_name, state_var, value_width_spec};
use super::module::Emitter;
use super::template::Section;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use tabula_ir::{self as ir, resource_class as rc, util};
use tabula_utils::{Error, TabulaResult, state_bits};

/// Indent of code inside a state of the `case`.
pub const BODY: &str = "          ";
/// Indent of code that runs every cycle.
pub const EVERY_CYCLE: &str = "      ";

/// Text collected for a table before it goes into the module template.
#[derive(Debug, Default)]
pub struct TableSections {
    pub state_decl: String,
    pub registers: String,
    pub resources: String,
    pub insn_wire_decls: String,
    pub resource_values: String,
    pub insn_wire_values: String,
    pub embedded_instances: String,
    /// Assignments under reset.
    pub initials: String,
    /// Assignments made every cycle, before the `case`.
    pub state_output: String,
    bodies: HashMap<ir::StateIdx, String>,
}

pub struct TableWriter<'e, 'a> {
    pub em: &'e mut Emitter<'a>,
    pub design: &'a ir::Design,
    pub table: ir::TableIdx,
    pub module: ir::ModuleIdx,
    pub tid: i32,
    pub s: TableSections,
    insn_states: HashMap<ir::InsnIdx, ir::StateIdx>,
    /// Values a state-local register takes in each state that writes it.
    wire_writers: BTreeMap<ir::RegisterIdx, Vec<(ir::StateIdx, String)>>,
    /// Sub state registers a state waits for before leaving.
    multi_cycle: BTreeMap<ir::StateIdx, Vec<String>>,
}

impl<'e, 'a> TableWriter<'e, 'a> {
    pub fn new(em: &'e mut Emitter<'a>, table: ir::TableIdx) -> Self {
        let design = em.design;
        let t = &design.tables[table];
        let insn_states = t
            .states
            .iter()
            .flat_map(|st| design.states[*st].insns.iter().map(move |i| (*i, *st)))
            .collect();
        TableWriter {
            em,
            design,
            table,
            module: t.module,
            tid: t.id,
            s: TableSections::default(),
            insn_states,
            wire_writers: BTreeMap::new(),
            multi_cycle: BTreeMap::new(),
        }
    }

    pub fn build(mut self) -> TabulaResult<()> {
        let design = self.design;
        let t = &design.tables[self.table];
        self.build_state_decls()?;
        self.build_registers()?;
        self.build_insn_wires()?;
        for res in &t.resources {
            self.build_resource(*res)?;
        }
        for st in &t.states {
            for i in &design.states[*st].insns {
                self.write_insn(*st, *i)?;
            }
        }
        self.build_wire_values()?;
        self.flush()
    }

    fn build_state_decls(&mut self) -> TabulaResult<()> {
        let t = &self.design.tables[self.table];
        if t.states.is_empty() {
            return Ok(());
        }
        let sd = &mut self.s.state_decl;
        writeln!(sd, "  // state names")?;
        for st in &t.states {
            let id = self.design.states[*st].id;
            writeln!(sd, "  localparam {} = {id};", state_name(self.tid, id))?;
        }
        let max_id = util::max_state_id(self.design, self.table).max(0) as u64;
        writeln!(sd, "  reg [{}:0] {};", state_bits(max_id), state_var(self.tid))?;
        Ok(())
    }

    fn build_registers(&mut self) -> TabulaResult<()> {
        let design = self.design;
        for r in &design.tables[self.table].registers {
            let reg = &design.registers[*r];
            if reg.is_const() {
                continue;
            }
            let name = self.reg_value(*r);
            let kind = if reg.is_state_local() { "wire" } else { "reg" };
            writeln!(
                self.s.registers,
                "  {kind} {}{name};",
                value_width_spec(reg.value_type)
            )?;
            if let (true, Some(v)) = (reg.is_normal(), &reg.initial_value) {
                writeln!(
                    self.s.initials,
                    "{EVERY_CYCLE}{name} <= {};",
                    insn::const_literal(v)
                )?;
            }
        }
        Ok(())
    }

    fn build_insn_wires(&mut self) -> TabulaResult<()> {
        let design = self.design;
        for st in &design.tables[self.table].states {
            for i in &design.states[*st].insns {
                if !insn::has_output_wire(design.insn_class(*i)) {
                    continue;
                }
                for (n, out) in design.insns[*i].outputs.iter().enumerate() {
                    writeln!(
                        self.s.insn_wire_decls,
                        "  wire {}{};",
                        value_width_spec(design.registers[*out].value_type),
                        insn::insn_output_wire(design, *i, n)
                    )?;
                }
            }
        }
        Ok(())
    }

    fn build_resource(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let class = self.design.class_name(res);
        if is_multi_cycle(class) && !self.callers(res).is_empty() {
            let mc = insn::multi_cycle_state(self.design, res);
            writeln!(self.s.resources, "  reg [1:0] {mc};")?;
            writeln!(self.s.initials, "{EVERY_CYCLE}{mc} <= 0;")?;
        }
        match class {
            c if rc::is_exclusive_bin_op(c) => self.build_operator(res),
            rc::EXT_INPUT => self.build_ext_input(res),
            rc::EXT_OUTPUT => self.build_ext_output(res),
            rc::SHARED_REG => self.build_shared_reg(res),
            rc::SHARED_REG_READER => self.build_shared_reg_reader(res),
            rc::SHARED_REG_WRITER => self.build_shared_reg_writer(res),
            rc::ARRAY => self.build_array(res),
            rc::SHARED_MEMORY => self.build_shared_memory(res),
            rc::SHARED_MEMORY_READER | rc::SHARED_MEMORY_WRITER => {
                self.build_memory_accessor(res)
            }
            rc::AXI_MASTER_PORT | rc::AXI_SLAVE_PORT => self.build_axi_port(res),
            rc::EMBEDDED => self.build_embedded(res),
            _ => Ok(()),
        }
    }

    fn build_wire_values(&mut self) -> TabulaResult<()> {
        let writers = std::mem::take(&mut self.wire_writers);
        for (reg, values) in writers {
            let v = self.mux_by_state(&values, None);
            writeln!(
                self.s.insn_wire_values,
                "  assign {} = {v};",
                self.reg_value(reg)
            )?;
        }
        Ok(())
    }

    /// Insns of `res` with their states, in state order.
    pub fn callers(&self, res: ir::ResourceIdx) -> Vec<(ir::StateIdx, ir::InsnIdx)> {
        util::insns_by_resource(self.design, res)
            .into_iter()
            .filter_map(|i| self.insn_states.get(&i).map(|st| (*st, i)))
            .collect()
    }

    pub fn state_name(&self, st: ir::StateIdx) -> String {
        state_name(self.tid, self.design.states[st].id)
    }

    /// `st_1 == S_1_2`
    pub fn state_cond(&self, st: ir::StateIdx) -> String {
        format!("{} == {}", state_var(self.tid), self.state_name(st))
    }

    /// True in any of `states`, and only while `sub_state` is 0 if given.
    pub fn join_states(&self, states: &[ir::StateIdx], sub_state: Option<&str>) -> String {
        if states.is_empty() {
            return "0".to_string();
        }
        states
            .iter()
            .map(|st| match sub_state {
                Some(mc) => format!("(({}) && ({mc} == 0))", self.state_cond(*st)),
                None => format!("({})", self.state_cond(*st)),
            })
            .join(" || ")
    }

    /// Picks the value of the current state. Without a default, the last
    /// value is used for every other state.
    pub fn mux_by_state(&self, values: &[(ir::StateIdx, String)], default: Option<&str>) -> String {
        let mut it = values.iter().rev();
        let mut acc = match default {
            Some(d) => d.to_string(),
            None => match it.next() {
                Some((_, v)) => v.clone(),
                None => return "0".to_string(),
            },
        };
        for (st, v) in it {
            acc = format!("({}) ? {v} : ({acc})", self.state_cond(*st));
        }
        acc
    }

    /// Register name or constant literal.
    pub fn reg_value(&self, reg: ir::RegisterIdx) -> String {
        let r = &self.design.registers[reg];
        if r.is_const() {
            let v = r
                .initial_value
                .unwrap_or_else(|| ir::Numeric::zero(r.value_type));
            return insn::const_literal(&v);
        }
        let owner = self.design.tables[r.table].module;
        self.em.modules[owner].names.reg_name(self.design, reg)
    }

    /// Code that runs while the table is in `st`.
    pub fn body(&mut self, st: ir::StateIdx) -> &mut String {
        self.s.bodies.entry(st).or_default()
    }

    /// Writes `value` to `reg` in `st`. State-local registers collect their
    /// values into a single continuous assignment.
    pub fn assign_output(
        &mut self,
        st: ir::StateIdx,
        reg: ir::RegisterIdx,
        value: String,
    ) -> TabulaResult<()> {
        let r = &self.design.registers[reg];
        if r.is_const() {
            return Err(Error::malformed_design(format!(
                "{}: constant register {} is written",
                self.design.table_label(self.table),
                r.id
            )));
        }
        if r.is_state_local() {
            self.wire_writers.entry(reg).or_default().push((st, value));
        } else {
            let name = self.reg_value(reg);
            writeln!(self.body(st), "{BODY}{name} <= {value};")?;
        }
        Ok(())
    }

    /// Makes `st` wait until the sub state register `mc` reaches 3.
    pub fn wait_for(&mut self, st: ir::StateIdx, mc: String) {
        let list = self.multi_cycle.entry(st).or_default();
        if !list.contains(&mc) {
            list.push(mc);
        }
    }

    fn transition(&self, st: ir::StateIdx) -> TabulaResult<String> {
        let design = self.design;
        let sv = state_var(self.tid);
        let mut t = String::new();
        if let Some(tr) = util::find_transition_insn(design, st) {
            let insn = &design.insns[tr];
            match insn.target_states.as_slice() {
                [] => {}
                [next] => writeln!(t, "{BODY}{sv} <= {};", self.state_name(*next))?,
                [if_false, if_true] => {
                    let Some(cond) = insn.inputs.first() else {
                        return Err(Error::malformed_design(format!(
                            "{}: branch in state {} has no condition",
                            design.table_label(self.table),
                            design.states[st].id
                        )));
                    };
                    writeln!(t, "{BODY}if ({}) begin", self.reg_value(*cond))?;
                    writeln!(t, "{BODY}  {sv} <= {};", self.state_name(*if_true))?;
                    writeln!(t, "{BODY}end else begin")?;
                    writeln!(t, "{BODY}  {sv} <= {};", self.state_name(*if_false))?;
                    writeln!(t, "{BODY}end")?;
                }
                _ => {
                    return Err(Error::unsupported(format!(
                        "{}: state {} has more than two successors",
                        design.table_label(self.table),
                        design.states[st].id
                    )));
                }
            }
        }
        match self.multi_cycle.get(&st) {
            Some(mcs) if !mcs.is_empty() => {
                let cond = mcs.iter().map(|mc| format!("{mc} == 3")).join(" && ");
                let mut w = String::new();
                writeln!(w, "{BODY}if ({cond}) begin")?;
                for line in t.lines() {
                    writeln!(w, "  {line}")?;
                }
                for mc in mcs {
                    writeln!(w, "{BODY}  {mc} <= 0;")?;
                }
                writeln!(w, "{BODY}end")?;
                Ok(w)
            }
            _ => Ok(t),
        }
    }

    fn always_block(&self) -> TabulaResult<String> {
        let t = &self.design.tables[self.table];
        let ms = &self.em.modules[self.module];
        let mut os = String::new();
        if t.states.is_empty() && self.s.initials.is_empty() && self.s.state_output.is_empty() {
            return Ok(os);
        }
        let sv = state_var(self.tid);
        writeln!(os, "  // Table {}", self.tid)?;
        writeln!(os, "  always @(posedge {}) begin", ms.ports.clk())?;
        writeln!(os, "    if ({}) begin", ms.reset_cond())?;
        if let Some(init) = t.initial_state {
            writeln!(os, "{EVERY_CYCLE}{sv} <= {};", self.state_name(init))?;
        }
        os.push_str(&self.s.initials);
        writeln!(os, "    end else begin")?;
        os.push_str(&self.s.state_output);
        if !t.states.is_empty() {
            writeln!(os, "      case ({sv})")?;
            for st in &t.states {
                writeln!(os, "        {}: begin", self.state_name(*st))?;
                if let Some(body) = self.s.bodies.get(st) {
                    os.push_str(body);
                }
                os.push_str(&self.transition(*st)?);
                writeln!(os, "        end")?;
            }
            writeln!(os, "      endcase")?;
        }
        writeln!(os, "    end")?;
        writeln!(os, "  end")?;
        Ok(os)
    }

    fn flush(self) -> TabulaResult<()> {
        let block = self.always_block()?;
        let s = self.s;
        let tmpl = &mut self.em.modules[self.module].tmpl;
        tmpl.stream(Section::StateDecl).push_str(&s.state_decl);
        tmpl.stream(Section::Register).push_str(&s.registers);
        tmpl.stream(Section::Resource).push_str(&s.resources);
        tmpl.stream(Section::InsnWireDecl).push_str(&s.insn_wire_decls);
        tmpl.stream(Section::ResourceValue).push_str(&s.resource_values);
        tmpl.stream(Section::InsnWireValue).push_str(&s.insn_wire_values);
        tmpl.stream(Section::EmbeddedInstance)
            .push_str(&s.embedded_instances);
        tmpl.stream(Section::Table).push_str(&block);
        log::debug!("wrote {}", self.design.table_label(self.table));
        Ok(())
    }
}
