//! Insn code, and the names and literals every writer agrees on.
use super::ports::width_spec;
use super::table::{BODY, TableWriter};
use itertools::Itertools;
use std::fmt::Write;
use tabula_ir::{self as ir, resource_class as rc};
use tabula_utils::{Error, TabulaResult};

pub fn state_name(table_id: i32, state_id: i32) -> String {
    format!("S_{table_id}_{state_id}")
}

pub fn state_var(table_id: i32) -> String {
    format!("st_{table_id}")
}

/// Wire carrying output `n` of `insn`.
pub fn insn_output_wire(design: &ir::Design, insn: ir::InsnIdx, n: usize) -> String {
    let t = design.insn_table(insn);
    format!(
        "insn_o_{}_{}_{n}",
        design.tables[t].id, design.insns[insn].id
    )
}

/// Sub state register of a multi cycle resource: 0 idle, 3 done.
pub fn multi_cycle_state(design: &ir::Design, res: ir::ResourceIdx) -> String {
    let r = &design.resources[res];
    format!("mc_{}_{}", design.tables[r.table].id, r.id)
}

/// Whether insns of `class` may keep their state for several cycles. The
/// AXI slave port serves the bus on its own and never stalls a table.
pub fn is_multi_cycle(class: &str) -> bool {
    rc::is_multi_cycle(class) && class != rc::AXI_SLAVE_PORT
}

/// `signed [7:0] ` for a signed 8 bit value.
pub fn value_width_spec(ty: ir::NumericWidth) -> String {
    if ty.is_signed() {
        format!("signed {}", width_spec(ty.width()))
    } else {
        width_spec(ty.width())
    }
}

pub fn const_literal(n: &ir::Numeric) -> String {
    let ty = n.ty();
    let w = ty.bit_width();
    if ty.is_wide() {
        let text = n.format();
        return format!("{w}'h{}", text.trim_start_matches("0x"));
    }
    let v = n.as_i64();
    if ty.is_signed() && v < 0 {
        format!("-{w}'sd{}", v.unsigned_abs())
    } else {
        format!("{w}'d{}", n.value0())
    }
}

/// Literal of a parameter value, `width` bits wide.
pub fn const_literal_i64(v: i64, width: u32) -> String {
    let ty = if v < 0 {
        ir::NumericWidth::signed(width)
    } else {
        ir::NumericWidth::unsigned(width)
    };
    const_literal(&ir::Numeric::from_i64(v, ty))
}

/// Classes whose results pass through `insn_o` wires.
pub fn has_output_wire(class: &str) -> bool {
    rc::is_exclusive_bin_op(class)
        || rc::is_light_bin_op(class)
        || rc::is_light_uni_op(class)
        || rc::is_bit_arrange_op(class)
        || matches!(
            class,
            rc::SELECT
                | rc::FOREIGN_REG
                | rc::EXT_INPUT
                | rc::EXT_OUTPUT
                | rc::SHARED_REG
                | rc::SHARED_REG_READER
                | rc::EMBEDDED
        )
}

fn operator(class: &str) -> &'static str {
    match class {
        rc::ADD => "+",
        rc::SUB => "-",
        rc::MUL => "*",
        rc::GT => ">",
        rc::GTE => ">=",
        rc::EQ => "==",
        rc::BIT_AND => "&",
        rc::BIT_OR => "|",
        _ => "^",
    }
}

/// Prefix of the wires of a shared operator.
pub fn operator_name(design: &ir::Design, res: ir::ResourceIdx) -> String {
    let r = &design.resources[res];
    format!(
        "{}_{}_{}",
        design.class_name(res),
        design.tables[r.table].id,
        r.id
    )
}

impl TableWriter<'_, '_> {
    /// Writes `insn_o_*_n = value` for the insn.
    pub fn assign_insn_wire(
        &mut self,
        insn: ir::InsnIdx,
        n: usize,
        value: &str,
    ) -> TabulaResult<()> {
        writeln!(
            self.s.insn_wire_values,
            "  assign {} = {value};",
            insn_output_wire(self.design, insn, n)
        )?;
        Ok(())
    }

    /// Stores output `n` of the insn into its register.
    pub fn output_from_wire(
        &mut self,
        st: ir::StateIdx,
        insn: ir::InsnIdx,
        n: usize,
    ) -> TabulaResult<()> {
        if let Some(reg) = self.design.insns[insn].outputs.get(n) {
            let wire = insn_output_wire(self.design, insn, n);
            self.assign_output(st, *reg, wire)?;
        }
        Ok(())
    }

    /// Assigns `value` to the first output through the insn wire.
    pub fn computed(
        &mut self,
        st: ir::StateIdx,
        insn: ir::InsnIdx,
        value: &str,
    ) -> TabulaResult<()> {
        if self.design.insns[insn].outputs.is_empty() {
            return Ok(());
        }
        self.assign_insn_wire(insn, 0, value)?;
        self.output_from_wire(st, insn, 0)
    }

    fn input(&self, insn: ir::InsnIdx, n: usize) -> TabulaResult<String> {
        let i = &self.design.insns[insn];
        match i.inputs.get(n) {
            Some(r) => Ok(self.reg_value(*r)),
            None => Err(self.missing_operand(insn, n)),
        }
    }

    fn const_input(&self, insn: ir::InsnIdx, n: usize) -> TabulaResult<u64> {
        let i = &self.design.insns[insn];
        let Some(reg) = i.inputs.get(n) else {
            return Err(self.missing_operand(insn, n));
        };
        let r = &self.design.registers[*reg];
        match (&r.initial_value, r.is_const()) {
            (Some(v), true) => Ok(v.value0()),
            _ => Err(Error::unsupported(format!(
                "{}: `{}' insn {} needs a constant operand {n}",
                self.design.table_label(self.table),
                self.design.insn_class(insn),
                i.id
            ))),
        }
    }

    fn missing_operand(&self, insn: ir::InsnIdx, n: usize) -> Error {
        Error::malformed_design(format!(
            "{}: `{}' insn {} lacks operand {n}",
            self.design.table_label(self.table),
            self.design.insn_class(insn),
            self.design.insns[insn].id
        ))
    }

    pub fn write_insn(&mut self, st: ir::StateIdx, insn: ir::InsnIdx) -> TabulaResult<()> {
        let design = self.design;
        let class = design.insn_class(insn);
        if is_multi_cycle(class) {
            let mc = multi_cycle_state(design, design.insns[insn].resource);
            self.wait_for(st, mc);
        }
        match class {
            rc::TRANSITION | rc::PHI | rc::PSEUDO => Ok(()),
            rc::SET => {
                let v = self.input(insn, 0)?;
                match design.insns[insn].outputs.first() {
                    Some(out) => self.assign_output(st, *out, v),
                    None => Ok(()),
                }
            }
            rc::SELECT => {
                let v = format!(
                    "{} ? {} : {}",
                    self.input(insn, 0)?,
                    self.input(insn, 1)?,
                    self.input(insn, 2)?
                );
                self.computed(st, insn, &v)
            }
            c if rc::is_exclusive_bin_op(c) => {
                let res = design.insns[insn].resource;
                let v = format!("{}_d0", operator_name(design, res));
                self.computed(st, insn, &v)
            }
            c if rc::is_light_bin_op(c) => {
                let v = format!(
                    "{} {} {}",
                    self.input(insn, 0)?,
                    operator(c),
                    self.input(insn, 1)?
                );
                self.computed(st, insn, &v)
            }
            rc::BIT_INV => {
                let v = format!("~{}", self.input(insn, 0)?);
                self.computed(st, insn, &v)
            }
            rc::SHIFT => {
                let op = if design.insns[insn].operand == ir::operand::LEFT {
                    "<<"
                } else {
                    ">>"
                };
                let v = format!("{} {op} {}", self.input(insn, 0)?, self.const_input(insn, 1)?);
                self.computed(st, insn, &v)
            }
            rc::BIT_SEL => {
                let v = format!(
                    "{}[{}:{}]",
                    self.input(insn, 0)?,
                    self.const_input(insn, 1)?,
                    self.const_input(insn, 2)?
                );
                self.computed(st, insn, &v)
            }
            rc::BIT_CONCAT => {
                let args = design.insns[insn]
                    .inputs
                    .iter()
                    .map(|r| self.reg_value(*r))
                    .join(", ");
                self.computed(st, insn, &format!("{{{args}}}"))
            }
            rc::FOREIGN_REG => {
                let v = self.input(insn, 0)?;
                self.computed(st, insn, &v)
            }
            rc::PRINT => {
                let i = &design.insns[insn];
                let fmt = i.inputs.iter().map(|_| "%d").join(" ");
                let mut args = String::new();
                for r in &i.inputs {
                    write!(args, ", {}", self.reg_value(*r))?;
                }
                writeln!(self.body(st), "{BODY}$display(\"{fmt}\"{args});")?;
                Ok(())
            }
            rc::ASSERT => {
                let table_id = self.tid;
                let state_id = design.states[st].id;
                let conds = design.insns[insn]
                    .inputs
                    .iter()
                    .map(|r| self.reg_value(*r))
                    .collect::<Vec<_>>();
                for c in conds {
                    writeln!(
                        self.body(st),
                        "{BODY}if (!({c})) $display(\"ASSERTION FAILURE: table {table_id} state {state_id}\");"
                    )?;
                }
                Ok(())
            }
            rc::EXT_INPUT | rc::EXT_OUTPUT => self.ext_io_insn(st, insn),
            rc::SHARED_REG | rc::SHARED_REG_READER | rc::SHARED_REG_WRITER => {
                self.shared_reg_insn(st, insn)
            }
            rc::ARRAY => self.array_insn(st, insn),
            rc::SHARED_MEMORY | rc::SHARED_MEMORY_READER | rc::SHARED_MEMORY_WRITER => {
                self.shared_memory_insn(st, insn)
            }
            rc::AXI_MASTER_PORT => self.axi_master_insn(st, insn),
            rc::AXI_SLAVE_PORT => Ok(()),
            rc::EMBEDDED => self.embedded_insn(st, insn),
            c => Err(Error::unsupported(format!(
                "{}: no Verilog for `{c}' insns",
                design.table_label(self.table)
            ))),
        }
    }

    /// Wires of an exclusive operator shared by the insns of its table.
    /// Inputs are picked by the current state.
    pub fn build_operator(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let design = self.design;
        let callers = self.callers(res);
        let Some((_, first)) = callers.first() else {
            return Ok(());
        };
        let class = design.class_name(res);
        let name = operator_name(design, res);
        let mut types = [ir::NumericWidth::default(); 2];
        let mut args: [Vec<(ir::StateIdx, String)>; 2] = Default::default();
        for (st, i) in &callers {
            let insn = &design.insns[*i];
            for (k, slot) in types.iter_mut().enumerate() {
                let Some(r) = insn.inputs.get(k) else {
                    return Err(self.missing_operand(*i, k));
                };
                *slot = ir::NumericWidth::common_width(*slot, design.registers[*r].value_type);
                args[k].push((*st, self.reg_value(*r)));
            }
        }
        let out_type = match design.insns[*first].outputs.first() {
            Some(r) => design.registers[*r].value_type,
            None => types[0],
        };
        let rs = &mut self.s.resources;
        writeln!(rs, "  wire {}{name}_s0;", value_width_spec(types[0]))?;
        writeln!(rs, "  wire {}{name}_s1;", value_width_spec(types[1]))?;
        writeln!(rs, "  wire {}{name}_d0;", value_width_spec(out_type))?;
        let s0 = self.mux_by_state(&args[0], None);
        let s1 = self.mux_by_state(&args[1], None);
        let rv = &mut self.s.resource_values;
        writeln!(rv, "  assign {name}_s0 = {s0};")?;
        writeln!(rv, "  assign {name}_s1 = {s1};")?;
        writeln!(rv, "  assign {name}_d0 = {name}_s0 {} {name}_s1;", operator(class))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals() {
        let u8t = ir::NumericWidth::unsigned(8);
        assert_eq!(const_literal(&ir::Numeric::from_u64(10, u8t)), "8'd10");
        let s8 = ir::NumericWidth::signed(8);
        assert_eq!(const_literal(&ir::Numeric::from_i64(-3, s8)), "-8'sd3");
        let b = ir::NumericWidth::unsigned(0);
        assert_eq!(const_literal(&ir::Numeric::from_u64(1, b)), "1'd1");
        let wide = ir::NumericWidth::unsigned(72);
        let mut n = ir::Numeric::zero(wide);
        n.set_word(1, 1);
        assert_eq!(const_literal(&n), "72'h10000000000000000");
    }

    #[test]
    fn width_specs() {
        assert_eq!(value_width_spec(ir::NumericWidth::signed(16)), "signed [15:0] ");
        assert_eq!(value_width_spec(ir::NumericWidth::unsigned(0)), "");
        assert!(is_multi_cycle(rc::ARRAY));
        assert!(!is_multi_cycle(rc::AXI_SLAVE_PORT));
    }
}
