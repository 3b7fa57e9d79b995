//! Memories shared between tables.
//!
//! The memory's table owns an SRAM. Port 0 is shared by the memory's own
//! table, its readers and writers and the AXI ports configured with
//! `SRAM-PORT-INDEX` 0, in that priority order. Another AXI port gets port 1
//! to itself. An accessor raises `req` with its address and waits for a one
//! cycle `ack`, in which `rdata` holds the word read.
use super::array::sram_module;
use super::insn::multi_cycle_state;
use super::ports::width_spec;
use super::table::{BODY, EVERY_CYCLE, TableWriter};
use itertools::Itertools;
use std::fmt::Write;
use tabula_ir::{self as ir, resource_class as rc};
use tabula_utils::{Error, TabulaResult};

fn id_suffix(design: &ir::Design, res: ir::ResourceIdx) -> String {
    let r = &design.resources[res];
    let t = &design.tables[r.table];
    format!("{}_{}_{}", design.modules[t.module].id, t.id, r.id)
}

/// `mem_<module>_<table>_<resource>`
pub fn memory_name(design: &ir::Design, mem: ir::ResourceIdx) -> String {
    format!("mem_{}", id_suffix(design, mem))
}

/// Prefix of the signals between an accessor and the memory.
pub fn accessor_name(design: &ir::Design, mem: ir::ResourceIdx, acc: ir::ResourceIdx) -> String {
    if acc == mem {
        memory_name(design, mem)
    } else {
        format!("{}_{}", memory_name(design, mem), id_suffix(design, acc))
    }
}

/// Read data of SRAM port `port`.
pub fn rdata_name(design: &ir::Design, mem: ir::ResourceIdx, port: usize) -> String {
    format!("{}_p{port}_rdata", memory_name(design, mem))
}

/// An AXI port that does not share port 0.
pub fn is_exclusive_port(design: &ir::Design, res: ir::ResourceIdx) -> bool {
    rc::is_axi_port(design.class_name(res))
        && design.resources[res].params.sram_port_index() != "0"
}

pub fn sram_port_of(design: &ir::Design, res: ir::ResourceIdx) -> usize {
    usize::from(is_exclusive_port(design, res))
}

/// Accessors of each SRAM port in priority order.
pub fn port_accessors(
    design: &ir::Design,
    conn: &ir::Connection,
    mem: ir::ResourceIdx,
) -> TabulaResult<Vec<Vec<ir::ResourceIdx>>> {
    let mut shared = vec![mem];
    shared.extend_from_slice(conn.shared_memory_accessors(mem));
    let (exclusive, rest): (Vec<_>, Vec<_>) = conn
        .axi_ports(mem)
        .iter()
        .copied()
        .partition(|p| is_exclusive_port(design, *p));
    shared.extend(rest);
    if exclusive.len() > 1 {
        return Err(Error::unsupported(format!(
            "shared memory {} has {} AXI ports needing a port of their own",
            memory_name(design, mem),
            exclusive.len()
        )));
    }
    let mut ports = vec![shared];
    if !exclusive.is_empty() {
        ports.push(exclusive);
    }
    Ok(ports)
}

/// Memory, or parent memory of an accessor.
pub fn memory_of(design: &ir::Design, res: ir::ResourceIdx) -> TabulaResult<ir::ResourceIdx> {
    if design.class_name(res) == rc::SHARED_MEMORY {
        return Ok(res);
    }
    design.resources[res]
        .parent_resource
        .filter(|p| design.class_name(*p) == rc::SHARED_MEMORY)
        .ok_or_else(|| {
            Error::malformed_design(format!(
                "`{}' resource {} is attached to no shared memory",
                design.class_name(res),
                design.resources[res].id
            ))
        })
}

/// Address and data widths.
pub fn memory_widths(design: &ir::Design, mem: ir::ResourceIdx) -> TabulaResult<(u32, u32)> {
    match &design.resources[mem].array {
        Some(a) => Ok((a.address_width, a.data_type.width())),
        None => Err(Error::malformed_design(format!(
            "shared memory {} has no array description",
            memory_name(design, mem)
        ))),
    }
}

/// Value of an accessor's write enable seen by the memory.
fn wen_of(design: &ir::Design, name: &str, acc: ir::ResourceIdx) -> String {
    match design.class_name(acc) {
        rc::SHARED_MEMORY_READER => "0".to_string(),
        rc::SHARED_MEMORY_WRITER => "1".to_string(),
        _ => format!("{name}_wen"),
    }
}

fn can_write(design: &ir::Design, acc: ir::ResourceIdx) -> bool {
    design.class_name(acc) != rc::SHARED_MEMORY_READER
}

impl TableWriter<'_, '_> {
    pub fn build_shared_memory(&mut self, mem: ir::ResourceIdx) -> TabulaResult<()> {
        let design = self.design;
        let ports = port_accessors(design, &self.em.conn, mem)?;
        let (aw, dw) = memory_widths(design, mem)?;
        let name = memory_name(design, mem);
        let sram = format!("sram_{}", id_suffix(design, mem));
        let image = design.resources[mem]
            .array
            .as_ref()
            .and_then(|a| a.image)
            .map(|i| design.array_images[i].values.as_slice());
        let n_ports = ports.len();
        self.em
            .embedded
            .request(&sram, || sram_module(&sram, aw, dw, n_ports, image))?;

        let mut pins = Vec::new();
        for (p, accessors) in ports.iter().enumerate() {
            let pn = format!("{name}_p{p}");
            let rdata = rdata_name(design, mem, p);
            let ms = &mut self.em.modules[self.module];
            ms.declare_wire(&format!("{pn}_addr"), aw)?;
            ms.declare_wire(&format!("{pn}_wdata"), dw)?;
            ms.declare_wire(&format!("{pn}_wen"), 0)?;
            let readers = accessors
                .iter()
                .map(|a| design.resource_module(*a))
                .unique()
                .collect::<Vec<_>>();
            self.em.route(&rdata, dw, self.module, &readers, false)?;

            let names = accessors
                .iter()
                .map(|a| accessor_name(design, mem, *a))
                .collect::<Vec<_>>();
            for (k, (acc, an)) in accessors.iter().zip(&names).enumerate() {
                let ack = format!("{an}_ack");
                writeln!(self.s.resources, "  reg {ack};")?;
                writeln!(self.s.initials, "{EVERY_CYCLE}{ack} <= 0;")?;
                let higher = names[..k].iter().map(|n| format!(" && !{n}_req")).join("");
                writeln!(
                    self.s.state_output,
                    "{EVERY_CYCLE}{ack} <= {an}_req && !{ack}{higher};"
                )?;
                let acc_module = design.resource_module(*acc);
                if acc_module != self.module {
                    self.em.route(&ack, 0, self.module, &[acc_module], true)?;
                }
            }

            let addr = chain(&names, |n| format!("{n}_addr"), None);
            let writers = accessors
                .iter()
                .zip(&names)
                .filter(|(a, _)| can_write(design, **a))
                .map(|(_, n)| n.clone())
                .collect::<Vec<_>>();
            let wdata = chain(&writers, |n| format!("{n}_wdata"), Some("0"));
            let wen_values = accessors
                .iter()
                .zip(&names)
                .map(|(a, n)| (n.clone(), wen_of(design, n, *a)))
                .collect::<Vec<_>>();
            let mut wen = "0".to_string();
            for (n, v) in wen_values.iter().rev() {
                wen = format!("{n}_req ? {v} : ({wen})");
            }
            let rv = &mut self.s.resource_values;
            writeln!(rv, "  assign {pn}_addr = {addr};")?;
            writeln!(rv, "  assign {pn}_wdata = {wdata};")?;
            writeln!(rv, "  assign {pn}_wen = {wen};")?;
            pins.push(format!(
                ".addr_{p}({pn}_addr), .rdata_{p}({rdata}), .wdata_{p}({pn}_wdata), .wen_{p}({pn}_wen)"
            ));
        }
        writeln!(
            self.s.embedded_instances,
            "  {sram} inst_{sram}(.clk({}), {});",
            self.em.modules[self.module].ports.clk(),
            pins.join(", ")
        )?;
        self.build_memory_accessor(mem)
    }

    /// Request registers of the memory's own table, a reader or a writer.
    pub fn build_memory_accessor(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let design = self.design;
        let mem = memory_of(design, res)?;
        let (aw, dw) = memory_widths(design, mem)?;
        let an = accessor_name(design, mem, res);
        let mem_module = design.resource_module(mem);
        let mut signals = vec![(format!("{an}_addr"), aw), (format!("{an}_req"), 0)];
        if can_write(design, res) {
            signals.push((format!("{an}_wdata"), dw));
        }
        if res == mem {
            signals.push((format!("{an}_wen"), 0));
        }
        for (sig, w) in &signals {
            writeln!(self.s.resources, "  reg {}{sig};", width_spec(*w))?;
            self.em.route(sig, *w, self.module, &[mem_module], true)?;
        }
        writeln!(self.s.initials, "{EVERY_CYCLE}{an}_req <= 0;")?;
        if res == mem {
            writeln!(self.s.initials, "{EVERY_CYCLE}{an}_wen <= 0;")?;
        }
        let states = self
            .callers(res)
            .into_iter()
            .map(|(st, _)| st)
            .collect::<Vec<_>>();
        if !states.is_empty() {
            let mc = multi_cycle_state(design, res);
            let active = self.join_states(&states, Some(&mc));
            writeln!(
                self.s.state_output,
                "{EVERY_CYCLE}{an}_req <= ({active}) && !{an}_ack;"
            )?;
        }
        Ok(())
    }

    pub fn shared_memory_insn(&mut self, st: ir::StateIdx, insn: ir::InsnIdx) -> TabulaResult<()> {
        let design = self.design;
        let i = &design.insns[insn];
        let res = i.resource;
        let mem = memory_of(design, res)?;
        let an = accessor_name(design, mem, res);
        let mc = multi_cycle_state(design, res);
        let rdata = rdata_name(design, mem, 0);
        let Some(addr) = i.inputs.first() else {
            return Err(Error::malformed_design(format!(
                "{}: memory insn {} has no address",
                design.table_label(self.table),
                i.id
            )));
        };
        let addr = self.reg_value(*addr);
        let wdata = i.inputs.get(1).map(|r| self.reg_value(*r));
        let out = i.outputs.first().map(|r| self.reg_value(*r));
        let b = self.body(st);
        writeln!(b, "{BODY}if ({mc} == 0) begin")?;
        writeln!(b, "{BODY}  {an}_addr <= {addr};")?;
        if let (true, Some(wdata)) = (can_write(design, res), &wdata) {
            writeln!(b, "{BODY}  {an}_wdata <= {wdata};")?;
        }
        if res == mem {
            writeln!(b, "{BODY}  {an}_wen <= {};", u8::from(wdata.is_some()))?;
        }
        writeln!(b, "{BODY}  if ({an}_ack) begin")?;
        if let Some(out) = out {
            writeln!(b, "{BODY}    {out} <= {rdata};")?;
        }
        writeln!(b, "{BODY}    {mc} <= 3;")?;
        writeln!(b, "{BODY}  end")?;
        writeln!(b, "{BODY}end")?;
        Ok(())
    }
}

/// `a_req ? a_x : (b_req ? b_x : c_x)`. Without a default the last
/// accessor's value is used when no request is raised.
fn chain<F: Fn(&str) -> String>(names: &[String], value: F, default: Option<&str>) -> String {
    let mut it = names.iter().rev();
    let mut acc = match default {
        Some(d) => d.to_string(),
        None => match it.next() {
            Some(n) => value(n),
            None => return "0".to_string(),
        },
    };
    for n in it {
        acc = format!("{n}_req ? {} : ({acc})", value(n));
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_chain() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(chain(&names, |n| format!("{n}_addr"), None), "a_req ? a_addr : (b_addr)");
        assert_eq!(
            chain(&names, |n| format!("{n}_wdata"), Some("0")),
            "a_req ? a_wdata : (b_req ? b_wdata : (0))"
        );
    }

    #[test]
    fn port_assignment() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = ir::Builder::new(&mut d);
        let mem = b.create_shared_memory(t, 4, 32).unwrap();
        let rd = b.create_shared_memory_reader(t, mem).unwrap();
        let shared_axi = b.create_axi_master_port(t, mem).unwrap();
        let own_axi = b.create_axi_slave_port(t, mem).unwrap();
        d.resources[shared_axi].params.set_sram_port_index("0");
        ir::validate_ids(&mut d);
        let conn = ir::Connection::build(&d);
        let ports = port_accessors(&d, &conn, mem).unwrap();
        assert_eq!(ports, vec![vec![mem, rd, shared_axi], vec![own_axi]]);
        assert_eq!(sram_port_of(&d, own_axi), 1);
        assert_eq!(accessor_name(&d, mem, mem), "mem_1_1_1");
        assert_eq!(accessor_name(&d, mem, rd), "mem_1_1_1_1_1_2");
    }
}
