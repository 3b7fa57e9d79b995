//! Ports to the outside of the design. `DISTANCE` inserts that many
//! register stages between the port and the table.
use super::insn::const_literal_i64;
use super::ports::{PortKind, width_spec};
use super::table::{BODY, EVERY_CYCLE, TableWriter};
use std::fmt::Write;
use tabula_ir as ir;
use tabula_utils::{Error, TabulaResult};

fn buf_name(port: &str, i: i64, distance: i64) -> String {
    format!("{port}_buf{i}of{distance}")
}

impl TableWriter<'_, '_> {
    fn port_of(&self, res: ir::ResourceIdx, is_output: bool) -> TabulaResult<(String, u32, i64)> {
        let r = &self.design.resources[res];
        let port = if is_output {
            r.params.ext_output_port()
        } else {
            r.params.ext_input_port()
        };
        match port {
            Some((name, width)) => Ok((name, width.max(0) as u32, r.params.distance().max(0))),
            None => Err(Error::malformed_design(format!(
                "{}: external port of resource {} has no name",
                self.design.table_label(self.table),
                r.id
            ))),
        }
    }

    /// Register stages `buf0 .. buf(d-1)`, where `buf(d-1)` is nearest to
    /// the table for inputs and to the table's writes for outputs.
    fn build_buf_chain(&mut self, port: &str, width: u32, distance: i64) -> TabulaResult<()> {
        for i in 0..distance {
            let b = buf_name(port, i, distance);
            writeln!(self.s.resources, "  reg {}{b};", width_spec(width))?;
            writeln!(self.s.initials, "{EVERY_CYCLE}{b} <= 0;")?;
        }
        for i in 1..distance {
            writeln!(
                self.s.state_output,
                "{EVERY_CYCLE}{} <= {};",
                buf_name(port, i - 1, distance),
                buf_name(port, i, distance)
            )?;
        }
        Ok(())
    }

    pub fn build_ext_input(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let (port, width, distance) = self.port_of(res, false)?;
        self.em
            .add_port_to_top(&port, PortKind::Input, width, self.module);
        self.build_buf_chain(&port, width, distance)?;
        if distance > 0 {
            writeln!(
                self.s.state_output,
                "{EVERY_CYCLE}{} <= {port};",
                buf_name(&port, distance - 1, distance)
            )?;
        }
        Ok(())
    }

    /// Register the table writes: the port itself or the last stage.
    fn output_reg(port: &str, distance: i64) -> String {
        if distance > 0 {
            buf_name(port, distance - 1, distance)
        } else {
            port.to_string()
        }
    }

    pub fn build_ext_output(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let (port, width, distance) = self.port_of(res, true)?;
        self.em
            .add_port_to_top(&port, PortKind::OutputReg, width, self.module);
        self.build_buf_chain(&port, width, distance)?;
        let out = Self::output_reg(&port, distance);
        if distance > 0 {
            writeln!(self.s.initials, "{EVERY_CYCLE}{port} <= 0;")?;
            writeln!(
                self.s.state_output,
                "{EVERY_CYCLE}{port} <= {};",
                buf_name(&port, 0, distance)
            )?;
        } else {
            writeln!(self.s.initials, "{EVERY_CYCLE}{out} <= 0;")?;
        }
        if let Some(default) = self.design.resources[res].params.default_value() {
            let writes = self.output_writes(res);
            let v = self.mux_by_state(&writes, Some(&const_literal_i64(default, width)));
            writeln!(self.s.state_output, "{EVERY_CYCLE}{out} <= {v};")?;
        }
        Ok(())
    }

    /// Values written by the non peek insns of an output, by state.
    fn output_writes(&self, res: ir::ResourceIdx) -> Vec<(ir::StateIdx, String)> {
        let mut writes = Vec::new();
        for (st, i) in self.callers(res) {
            let insn = &self.design.insns[i];
            if !insn.outputs.is_empty() {
                continue;
            }
            if let Some(r) = insn.inputs.first() {
                writes.push((st, self.reg_value(*r)));
            }
        }
        writes
    }

    pub fn ext_io_insn(&mut self, st: ir::StateIdx, insn: ir::InsnIdx) -> TabulaResult<()> {
        let design = self.design;
        let res = design.insns[insn].resource;
        let is_output = design.class_name(res) == ir::resource_class::EXT_OUTPUT;
        let (port, _, distance) = self.port_of(res, is_output)?;
        if !is_output {
            let src = if distance > 0 { buf_name(&port, 0, distance) } else { port };
            return self.computed(st, insn, &src);
        }
        let out = Self::output_reg(&port, distance);
        let i = &design.insns[insn];
        if !i.outputs.is_empty() {
            return self.computed(st, insn, &out);
        }
        if design.resources[res].params.default_value().is_some() {
            return Ok(());
        }
        if let Some(r) = i.inputs.first() {
            let v = self.reg_value(*r);
            writeln!(self.body(st), "{BODY}{out} <= {v};")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tabula_ir as ir;

    #[test]
    fn output_buffer_chain() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = ir::Builder::new(&mut d);
        let led = b.create_ext_output(t, "led", 8).unwrap();
        let three = b.alloc_const(t, 8, 3);
        let st = b.alloc_state(t);
        b.insert_insn(st, led, &[three], &[]);
        b.add_next_state(st, st).unwrap();
        let params = &mut d.resources[led].params;
        params.set_distance(2);
        params.set_default_value(5);
        ir::validate_ids(&mut d);

        let text = super::super::generate_verilog(&d).unwrap();
        assert!(text.contains("  reg [7:0] led_buf0of2;"), "{text}");
        assert!(text.contains("  reg [7:0] led_buf1of2;"), "{text}");
        assert!(text.contains("led_buf0of2 <= led_buf1of2;"), "{text}");
        assert!(text.contains("led <= led_buf0of2;"), "{text}");
        // Written in its state, the default everywhere else.
        let default = text
            .lines()
            .find(|l| l.trim_start().starts_with("led_buf1of2 <= ("))
            .unwrap_or_else(|| panic!("{text}"));
        assert!(default.contains("? 8'd3 : (8'd5)"), "{default}");
    }

    #[test]
    fn input_buffer_chain() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = ir::Builder::new(&mut d);
        let sw = b.create_ext_input(t, "sw", 4).unwrap();
        let x = b.alloc_register(t, "x", 4);
        let st = b.alloc_state(t);
        b.insert_insn(st, sw, &[], &[x]);
        b.add_next_state(st, st).unwrap();
        d.resources[sw].params.set_distance(2);
        ir::validate_ids(&mut d);

        let text = super::super::generate_verilog(&d).unwrap();
        assert!(text.contains("  input [3:0] sw;"), "{text}");
        assert!(text.contains("sw_buf1of2 <= sw;"), "{text}");
        assert!(text.contains("sw_buf0of2 <= sw_buf1of2;"), "{text}");
        assert!(!text.contains("sw_buf2of2"), "{text}");
    }
}
