//! Arrays: an SRAM module instantiated in the table's module, or pins to an
//! SRAM outside the design. Reads take three cycles:
//! address, latch and capture.
use super::insn::multi_cycle_state;
use super::ports::{PortKind, width_spec};
use super::table::{BODY, EVERY_CYCLE, TableWriter};
use itertools::Itertools;
use std::fmt::Write;
use tabula_ir as ir;
use tabula_utils::{Error, TabulaResult};

/// Module text of an SRAM with `ports` read/write ports. Each port latches
/// its address on the clock and reads through the latched address.
pub fn sram_module(
    name: &str,
    addr_width: u32,
    data_width: u32,
    ports: usize,
    image: Option<&[u64]>,
) -> TabulaResult<String> {
    let depth = 1u64.checked_shl(addr_width).ok_or_else(|| {
        Error::malformed_design(format!(
            "{name}: address width {addr_width} is too wide"
        ))
    })?;
    let aw = width_spec(addr_width);
    let dw = width_spec(data_width);
    let mut os = String::new();
    let pins = (0..ports)
        .map(|p| format!("addr_{p}, rdata_{p}, wdata_{p}, wen_{p}"))
        .join(", ");
    writeln!(os, "module {name}(clk, {pins});")?;
    writeln!(os, "  input clk;")?;
    for p in 0..ports {
        writeln!(os, "  input {aw}addr_{p};")?;
        writeln!(os, "  output {dw}rdata_{p};")?;
        writeln!(os, "  input {dw}wdata_{p};")?;
        writeln!(os, "  input wen_{p};")?;
    }
    writeln!(os)?;
    writeln!(os, "  reg {dw}data [0:{}];", depth - 1)?;
    for p in 0..ports {
        writeln!(os, "  reg {aw}raddr_{p};")?;
        writeln!(os, "  assign rdata_{p} = data[raddr_{p}];")?;
    }
    if let Some(values) = image {
        writeln!(os)?;
        writeln!(os, "  initial begin")?;
        for (i, v) in values.iter().enumerate() {
            writeln!(os, "    data[{i}] = {v};")?;
        }
        writeln!(os, "  end")?;
    }
    writeln!(os)?;
    writeln!(os, "  always @(posedge clk) begin")?;
    for p in 0..ports {
        writeln!(os, "    raddr_{p} <= addr_{p};")?;
        writeln!(os, "    if (wen_{p}) begin")?;
        writeln!(os, "      data[addr_{p}] <= wdata_{p};")?;
        writeln!(os, "    end")?;
    }
    writeln!(os, "  end")?;
    writeln!(os, "endmodule")?;
    Ok(os)
}

/// Names of the pins of an array.
struct ArrayPins {
    addr: String,
    wdata: String,
    wen: String,
    rdata: String,
}

impl ArrayPins {
    fn new(design: &ir::Design, res: ir::ResourceIdx) -> Self {
        let r = &design.resources[res];
        let t = &design.tables[r.table];
        let prefix = if r.array.as_ref().is_some_and(|a| a.is_external) {
            r.params.port_name_prefix()
        } else {
            String::new()
        };
        let suffix = format!("{}_{}_{}", design.modules[t.module].id, t.id, r.id);
        let pin = |what: &str| format!("{prefix}sram_{what}_{suffix}");
        ArrayPins {
            addr: pin("addr"),
            wdata: pin("wdata"),
            wen: pin("wen"),
            rdata: pin("rdata"),
        }
    }
}

impl<'a> TableWriter<'_, 'a> {
    fn array_of(&self, res: ir::ResourceIdx) -> TabulaResult<&'a ir::Array> {
        let design = self.design;
        design.resources[res].array.as_ref().ok_or_else(|| {
            Error::malformed_design(format!(
                "{}: array resource {} has no array description",
                design.table_label(self.table),
                design.resources[res].id
            ))
        })
    }

    pub fn build_array(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let design = self.design;
        let array = self.array_of(res)?;
        let pins = ArrayPins::new(design, res);
        let aw = array.address_width;
        let dw = array.data_type.width();
        if array.is_external {
            for (name, kind, w) in [
                (&pins.addr, PortKind::OutputReg, aw),
                (&pins.wdata, PortKind::OutputReg, dw),
                (&pins.wen, PortKind::OutputReg, 0),
                (&pins.rdata, PortKind::Input, dw),
            ] {
                self.em.add_port_to_top(name, kind, w, self.module);
            }
        } else {
            let rs = &mut self.s.resources;
            writeln!(rs, "  reg {}{};", width_spec(aw), pins.addr)?;
            writeln!(rs, "  reg {}{};", width_spec(dw), pins.wdata)?;
            writeln!(rs, "  reg {};", pins.wen)?;
            writeln!(rs, "  wire {}{};", width_spec(dw), pins.rdata)?;
            let r = &design.resources[res];
            let t = &design.tables[r.table];
            let name = format!("sram_{}_{}_{}", design.modules[t.module].id, t.id, r.id);
            let image = array
                .image
                .map(|i| design.array_images[i].values.as_slice());
            self.em
                .embedded
                .request(&name, || sram_module(&name, aw, dw, 1, image))?;
            writeln!(
                self.s.embedded_instances,
                "  {name} inst_{name}(.clk({}), .addr_0({}), .rdata_0({}), .wdata_0({}), .wen_0({}));",
                self.em.modules[self.module].ports.clk(),
                pins.addr,
                pins.rdata,
                pins.wdata,
                pins.wen
            )?;
        }
        writeln!(self.s.initials, "{EVERY_CYCLE}{} <= 0;", pins.addr)?;
        writeln!(self.s.initials, "{EVERY_CYCLE}{} <= 0;", pins.wdata)?;
        writeln!(self.s.initials, "{EVERY_CYCLE}{} <= 0;", pins.wen)?;
        Ok(())
    }

    /// One input reads, two inputs (address, data) write.
    pub fn array_insn(&mut self, st: ir::StateIdx, insn: ir::InsnIdx) -> TabulaResult<()> {
        let design = self.design;
        let i = &design.insns[insn];
        let pins = ArrayPins::new(design, i.resource);
        let mc = multi_cycle_state(design, i.resource);
        let Some(addr) = i.inputs.first() else {
            return Err(Error::malformed_design(format!(
                "{}: array insn {} has no address",
                design.table_label(self.table),
                i.id
            )));
        };
        let addr = self.reg_value(*addr);
        let wdata = i.inputs.get(1).map(|r| self.reg_value(*r));
        let out = i.outputs.first().map(|r| self.reg_value(*r));
        let b = self.body(st);
        writeln!(b, "{BODY}if ({mc} == 0) begin")?;
        writeln!(b, "{BODY}  {} <= {addr};", pins.addr)?;
        if let Some(wdata) = wdata {
            writeln!(b, "{BODY}  {} <= {wdata};", pins.wdata)?;
            writeln!(b, "{BODY}  {} <= 1;", pins.wen)?;
        }
        writeln!(b, "{BODY}  {mc} <= 1;")?;
        writeln!(b, "{BODY}end")?;
        writeln!(b, "{BODY}if ({mc} == 1) begin")?;
        writeln!(b, "{BODY}  {} <= 0;", pins.wen)?;
        writeln!(b, "{BODY}  {mc} <= 2;")?;
        writeln!(b, "{BODY}end")?;
        writeln!(b, "{BODY}if ({mc} == 2) begin")?;
        if let Some(out) = out {
            writeln!(b, "{BODY}  {out} <= {};", pins.rdata)?;
        }
        writeln!(b, "{BODY}  {mc} <= 3;")?;
        writeln!(b, "{BODY}end")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_port_sram() {
        let text = sram_module("sram_x", 4, 8, 2, Some(&[1, 2][..])).unwrap();
        assert!(text.starts_with(
            "module sram_x(clk, addr_0, rdata_0, wdata_0, wen_0, addr_1, rdata_1, wdata_1, wen_1);"
        ));
        assert!(text.contains("  reg [7:0] data [0:15];"));
        assert!(text.contains("    data[1] = 2;"));
        assert!(text.contains("      data[addr_1] <= wdata_1;"));
        assert!(text.ends_with("endmodule\n"));
    }

    #[test]
    fn address_too_wide() {
        assert!(matches!(
            sram_module("sram_x", 64, 8, 1, None),
            Err(Error::MalformedDesign(_))
        ));

        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let res = ir::Builder::new(&mut d)
            .create_resource(t, tabula_ir::resource_class::ARRAY)
            .unwrap();
        d.set_array(
            res,
            ir::Array {
                address_width: 64,
                data_type: ir::NumericWidth::unsigned(8),
                is_external: false,
                is_ram: true,
                image: None,
            },
        );
        ir::validate_ids(&mut d);
        assert!(super::super::generate_verilog(&d).is_err());
    }
}
