//! AXI ports of shared memories.
//!
//! Each port instantiates a controller that moves whole bursts between the
//! bus and the memory, one SRAM word per `req`/`ack` handshake. A master
//! port is started by its table; a slave port serves the bus on its own.
use super::insn::multi_cycle_state;
use super::ports::{PortKind, PortSet};
use super::shared_memory::{accessor_name, memory_of, memory_widths, rdata_name, sram_port_of};
use super::table::{BODY, EVERY_CYCLE, TableWriter};
use itertools::Itertools;
use std::fmt::Write;
use tabula_ir::{self as ir, resource_class as rc};
use tabula_utils::{Error, TabulaResult};

#[derive(Debug, Clone, Copy)]
enum ChannelWidth {
    Fixed(u32),
    Addr,
    Data,
    Strobe,
}

/// AXI4 signals: name, whether the master drives it, width.
const CHANNELS: &[(&str, bool, ChannelWidth)] = &[
    ("ARADDR", true, ChannelWidth::Addr),
    ("ARVALID", true, ChannelWidth::Fixed(0)),
    ("ARREADY", false, ChannelWidth::Fixed(0)),
    ("ARLEN", true, ChannelWidth::Fixed(8)),
    ("ARSIZE", true, ChannelWidth::Fixed(3)),
    ("ARBURST", true, ChannelWidth::Fixed(2)),
    ("RVALID", false, ChannelWidth::Fixed(0)),
    ("RDATA", false, ChannelWidth::Data),
    ("RREADY", true, ChannelWidth::Fixed(0)),
    ("RLAST", false, ChannelWidth::Fixed(0)),
    ("RRESP", false, ChannelWidth::Fixed(2)),
    ("AWADDR", true, ChannelWidth::Addr),
    ("AWVALID", true, ChannelWidth::Fixed(0)),
    ("AWREADY", false, ChannelWidth::Fixed(0)),
    ("AWLEN", true, ChannelWidth::Fixed(8)),
    ("AWSIZE", true, ChannelWidth::Fixed(3)),
    ("AWBURST", true, ChannelWidth::Fixed(2)),
    ("WVALID", true, ChannelWidth::Fixed(0)),
    ("WREADY", false, ChannelWidth::Fixed(0)),
    ("WDATA", true, ChannelWidth::Data),
    ("WSTRB", true, ChannelWidth::Strobe),
    ("WLAST", true, ChannelWidth::Fixed(0)),
    ("BVALID", false, ChannelWidth::Fixed(0)),
    ("BREADY", true, ChannelWidth::Fixed(0)),
    ("BRESP", false, ChannelWidth::Fixed(2)),
];

/// Widths of a controller's buses.
#[derive(Debug, Clone, Copy)]
pub struct AxiConfig {
    pub axi_addr_width: u32,
    pub sram_addr_width: u32,
    pub data_width: u32,
    pub reset_polarity: bool,
}

impl AxiConfig {
    fn width(&self, w: ChannelWidth) -> u32 {
        match w {
            ChannelWidth::Fixed(n) => n,
            ChannelWidth::Addr => self.axi_addr_width,
            ChannelWidth::Data => self.data_width,
            ChannelWidth::Strobe => self.bytes(),
        }
    }

    fn bytes(&self) -> u32 {
        (self.data_width / 8).max(1)
    }

    /// Words per burst: the whole memory, at most 256.
    fn burst_len(&self) -> u64 {
        (1u64 << self.sram_addr_width.min(8)).max(1)
    }

    fn reset(&self) -> &'static str {
        if self.reset_polarity { "rst" } else { "rst_n" }
    }

    fn reset_cond(&self) -> String {
        if self.reset_polarity {
            "rst".to_string()
        } else {
            "!rst_n".to_string()
        }
    }

    pub fn controller_name(&self, is_master: bool) -> String {
        format!(
            "axi_{}_controller_a{}s{}d{}{}",
            if is_master { "master" } else { "slave" },
            self.axi_addr_width,
            self.sram_addr_width,
            self.data_width,
            if self.reset_polarity { "" } else { "_n" }
        )
    }

    fn sram_ports(&self, ports: &mut PortSet) {
        ports.add_port("sram_addr", PortKind::OutputReg, self.sram_addr_width);
        ports.add_port("sram_wdata", PortKind::OutputReg, self.data_width);
        ports.add_port("sram_rdata", PortKind::Input, self.data_width);
        ports.add_port("sram_wen", PortKind::OutputReg, 0);
        ports.add_port("sram_req", PortKind::OutputReg, 0);
        ports.add_port("sram_ack", PortKind::Input, 0);
    }

    /// Bus signals. Constant ones are tied off; the others are registers
    /// when this side drives them.
    fn channel_ports(&self, is_master: bool, ports: &mut PortSet) {
        let size = self.bytes().trailing_zeros() as i64;
        for (name, master_drives, w) in CHANNELS {
            let width = self.width(*w);
            if *master_drives != is_master {
                ports.add_port(*name, PortKind::Input, width);
                continue;
            }
            match *name {
                "ARSIZE" | "AWSIZE" => ports.add_fixed_output(*name, width, size),
                "ARBURST" | "AWBURST" => ports.add_fixed_output(*name, width, 1),
                "WSTRB" => ports.add_fixed_output(*name, width, -1),
                "RRESP" | "BRESP" => ports.add_fixed_output(*name, width, 0),
                _ => ports.add_port(*name, PortKind::OutputReg, width),
            }
        }
    }

    fn header(&self, name: &str, ports: &PortSet, os: &mut String) -> TabulaResult<()> {
        write!(os, "module {name}(")?;
        ports.write_names(os)?;
        writeln!(os, ");")?;
        ports.write_decls(os)?;
        Ok(())
    }

    /// A read copies a burst from the bus into the memory, a write copies
    /// the memory to the bus. `ack` pulses when the burst is done.
    pub fn master_controller(&self) -> TabulaResult<String> {
        let name = self.controller_name(true);
        let mut ports = PortSet::new("clk", self.reset());
        self.sram_ports(&mut ports);
        ports.add_port("addr", PortKind::Input, self.axi_addr_width);
        ports.add_port("wen", PortKind::Input, 0);
        ports.add_port("req", PortKind::Input, 0);
        ports.add_port("ack", PortKind::OutputReg, 0);
        self.channel_ports(true, &mut ports);
        let last = self.burst_len() - 1;
        let iw = self.sram_addr_width;
        let mut os = String::new();
        self.header(&name, &ports, &mut os)?;
        os.push_str(&format!(
            r#"
  localparam S_IDLE = 0;
  localparam S_READ_ADDR = 1;
  localparam S_READ_DATA = 2;
  localparam S_READ_STORE = 3;
  localparam S_WRITE_ADDR = 4;
  localparam S_WRITE_LOAD = 5;
  localparam S_WRITE_DATA = 6;
  localparam S_WRITE_RESP = 7;
  reg [2:0] st;
  reg [{iw}:0] idx;
  reg last;

  always @(posedge clk) begin
    if ({reset}) begin
      st <= S_IDLE;
      idx <= 0;
      last <= 0;
      ack <= 0;
      sram_req <= 0;
      sram_wen <= 0;
      ARVALID <= 0;
      RREADY <= 0;
      AWVALID <= 0;
      WVALID <= 0;
      WLAST <= 0;
      BREADY <= 0;
    end else begin
      ack <= 0;
      case (st)
        S_IDLE: begin
          if (req && !ack) begin
            idx <= 0;
            if (wen) begin
              ARADDR <= addr;
              ARLEN <= {last};
              ARVALID <= 1;
              st <= S_READ_ADDR;
            end else begin
              AWADDR <= addr;
              AWLEN <= {last};
              AWVALID <= 1;
              st <= S_WRITE_ADDR;
            end
          end
        end
        S_READ_ADDR: begin
          if (ARREADY) begin
            ARVALID <= 0;
            RREADY <= 1;
            st <= S_READ_DATA;
          end
        end
        S_READ_DATA: begin
          if (RVALID) begin
            RREADY <= 0;
            last <= RLAST;
            sram_addr <= idx;
            sram_wdata <= RDATA;
            sram_wen <= 1;
            sram_req <= 1;
            st <= S_READ_STORE;
          end
        end
        S_READ_STORE: begin
          if (sram_ack) begin
            sram_req <= 0;
            sram_wen <= 0;
            idx <= idx + 1;
            if (last) begin
              ack <= 1;
              st <= S_IDLE;
            end else begin
              RREADY <= 1;
              st <= S_READ_DATA;
            end
          end
        end
        S_WRITE_ADDR: begin
          if (AWREADY) begin
            AWVALID <= 0;
            sram_addr <= idx;
            sram_req <= 1;
            st <= S_WRITE_LOAD;
          end
        end
        S_WRITE_LOAD: begin
          if (sram_ack) begin
            sram_req <= 0;
            WDATA <= sram_rdata;
            WVALID <= 1;
            WLAST <= (idx == {last});
            st <= S_WRITE_DATA;
          end
        end
        S_WRITE_DATA: begin
          if (WREADY) begin
            WVALID <= 0;
            WLAST <= 0;
            if (idx == {last}) begin
              BREADY <= 1;
              st <= S_WRITE_RESP;
            end else begin
              idx <= idx + 1;
              sram_addr <= idx + 1;
              sram_req <= 1;
              st <= S_WRITE_LOAD;
            end
          end
        end
        S_WRITE_RESP: begin
          if (BVALID) begin
            BREADY <= 0;
            ack <= 1;
            st <= S_IDLE;
          end
        end
      endcase
    end
  end
endmodule
"#,
            reset = self.reset_cond()
        ));
        Ok(os)
    }

    /// Serves bursts from an external master. Addresses are word indices.
    pub fn slave_controller(&self) -> TabulaResult<String> {
        let name = self.controller_name(false);
        let mut ports = PortSet::new("clk", self.reset());
        self.sram_ports(&mut ports);
        self.channel_ports(false, &mut ports);
        let hi = self.sram_addr_width.max(1) - 1;
        let mut os = String::new();
        self.header(&name, &ports, &mut os)?;
        os.push_str(&format!(
            r#"
  localparam S_IDLE = 0;
  localparam S_READ_LOAD = 1;
  localparam S_READ_DATA = 2;
  localparam S_WRITE_DATA = 3;
  localparam S_WRITE_STORE = 4;
  localparam S_WRITE_RESP = 5;
  reg [2:0] st;
  reg [7:0] cnt;
  reg last;

  always @(posedge clk) begin
    if ({reset}) begin
      st <= S_IDLE;
      cnt <= 0;
      last <= 0;
      sram_req <= 0;
      sram_wen <= 0;
      ARREADY <= 0;
      RVALID <= 0;
      RLAST <= 0;
      AWREADY <= 0;
      WREADY <= 0;
      BVALID <= 0;
    end else begin
      ARREADY <= 0;
      AWREADY <= 0;
      case (st)
        S_IDLE: begin
          if (AWVALID) begin
            AWREADY <= 1;
            WREADY <= 1;
            sram_addr <= AWADDR[{hi}:0];
            st <= S_WRITE_DATA;
          end else if (ARVALID) begin
            ARREADY <= 1;
            sram_addr <= ARADDR[{hi}:0];
            sram_req <= 1;
            cnt <= ARLEN;
            st <= S_READ_LOAD;
          end
        end
        S_READ_LOAD: begin
          if (sram_ack) begin
            sram_req <= 0;
            RDATA <= sram_rdata;
            RVALID <= 1;
            RLAST <= (cnt == 0);
            st <= S_READ_DATA;
          end
        end
        S_READ_DATA: begin
          if (RREADY) begin
            RVALID <= 0;
            RLAST <= 0;
            if (cnt == 0) begin
              st <= S_IDLE;
            end else begin
              cnt <= cnt - 1;
              sram_addr <= sram_addr + 1;
              sram_req <= 1;
              st <= S_READ_LOAD;
            end
          end
        end
        S_WRITE_DATA: begin
          if (WVALID) begin
            WREADY <= 0;
            last <= WLAST;
            sram_wdata <= WDATA;
            sram_wen <= 1;
            sram_req <= 1;
            st <= S_WRITE_STORE;
          end
        end
        S_WRITE_STORE: begin
          if (sram_ack) begin
            sram_req <= 0;
            sram_wen <= 0;
            if (last) begin
              BVALID <= 1;
              st <= S_WRITE_RESP;
            end else begin
              sram_addr <= sram_addr + 1;
              WREADY <= 1;
              st <= S_WRITE_DATA;
            end
          end
        end
        S_WRITE_RESP: begin
          if (BREADY) begin
            BVALID <= 0;
            st <= S_IDLE;
          end
        end
      endcase
    end
  end
endmodule
"#,
            reset = self.reset_cond()
        ));
        Ok(os)
    }
}

/// Suffix of the per port signals: `<table>_<resource>`.
fn port_suffix(design: &ir::Design, res: ir::ResourceIdx) -> String {
    let r = &design.resources[res];
    format!("{}_{}", design.tables[r.table].id, r.id)
}

impl TableWriter<'_, '_> {
    fn axi_config(&self, res: ir::ResourceIdx) -> TabulaResult<AxiConfig> {
        let design = self.design;
        let mem = memory_of(design, res)?;
        let (aw, dw) = memory_widths(design, mem)?;
        let axi_addr_width = design.resources[res].params.addr_width();
        if axi_addr_width <= 0 {
            return Err(Error::malformed_design(format!(
                "{}: AXI port {} has address width {axi_addr_width}",
                design.table_label(self.table),
                design.resources[res].id
            )));
        }
        Ok(AxiConfig {
            axi_addr_width: axi_addr_width as u32,
            sram_addr_width: aw,
            data_width: dw,
            reset_polarity: self.em.modules[self.module].reset_polarity,
        })
    }

    pub fn build_axi_port(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let design = self.design;
        let is_master = design.class_name(res) == rc::AXI_MASTER_PORT;
        let cfg = self.axi_config(res)?;
        let mem = memory_of(design, res)?;
        let mem_module = design.resource_module(mem);
        let an = accessor_name(design, mem, res);
        let name = cfg.controller_name(is_master);
        self.em.embedded.request(&name, || {
            if is_master {
                cfg.master_controller()
            } else {
                cfg.slave_controller()
            }
        })?;

        // Nets driven by the controller toward the memory.
        for (sig, w) in [
            (format!("{an}_addr"), cfg.sram_addr_width),
            (format!("{an}_wdata"), cfg.data_width),
            (format!("{an}_wen"), 0),
            (format!("{an}_req"), 0),
        ] {
            self.em.route(&sig, w, self.module, &[mem_module], false)?;
        }

        let prefix = design.resources[res].params.port_name_prefix();
        for (ch, master_drives, w) in CHANNELS {
            let kind = if *master_drives == is_master {
                PortKind::Output
            } else {
                PortKind::Input
            };
            self.em
                .add_port_to_top(&format!("{prefix}{ch}"), kind, cfg.width(*w), self.module);
        }

        let ms = &self.em.modules[self.module];
        let mut conns = vec![
            format!(".clk({})", ms.ports.clk()),
            format!(".{}({})", cfg.reset(), ms.ports.reset()),
            format!(".sram_addr({an}_addr)"),
            format!(".sram_wdata({an}_wdata)"),
            format!(
                ".sram_rdata({})",
                rdata_name(design, mem, sram_port_of(design, res))
            ),
            format!(".sram_wen({an}_wen)"),
            format!(".sram_req({an}_req)"),
            format!(".sram_ack({an}_ack)"),
        ];
        if is_master {
            let sfx = port_suffix(design, res);
            let rs = &mut self.s.resources;
            writeln!(rs, "  reg [{}:0] axi_addr_{sfx};", cfg.axi_addr_width - 1)?;
            writeln!(rs, "  reg axi_wen_{sfx};")?;
            writeln!(rs, "  reg axi_req_{sfx};")?;
            writeln!(rs, "  wire axi_ack_{sfx};")?;
            writeln!(self.s.initials, "{EVERY_CYCLE}axi_wen_{sfx} <= 0;")?;
            writeln!(self.s.initials, "{EVERY_CYCLE}axi_req_{sfx} <= 0;")?;
            for p in ["addr", "wen", "req", "ack"] {
                conns.push(format!(".{p}(axi_{p}_{sfx})"));
            }
        }
        conns.extend(
            CHANNELS
                .iter()
                .map(|(ch, _, _)| format!(".{ch}({prefix}{ch})")),
        );
        writeln!(
            self.s.embedded_instances,
            "  {name} inst_axi_{}({});",
            port_suffix(design, res),
            conns.iter().join(", ")
        )?;
        Ok(())
    }

    /// `read` fills the memory from the bus, `write` sends it to the bus.
    pub fn axi_master_insn(&mut self, st: ir::StateIdx, insn: ir::InsnIdx) -> TabulaResult<()> {
        let design = self.design;
        let i = &design.insns[insn];
        let sfx = port_suffix(design, i.resource);
        let mc = multi_cycle_state(design, i.resource);
        let wen = match i.operand.as_str() {
            "read" => 1,
            "write" => 0,
            op => {
                return Err(Error::malformed_design(format!(
                    "{}: AXI insn {} has operand `{op}', expected read or write",
                    design.table_label(self.table),
                    i.id
                )));
            }
        };
        let addr = match i.inputs.first() {
            Some(r) => self.reg_value(*r),
            None => "0".to_string(),
        };
        let b = self.body(st);
        writeln!(b, "{BODY}if ({mc} == 0) begin")?;
        writeln!(b, "{BODY}  axi_addr_{sfx} <= {addr};")?;
        writeln!(b, "{BODY}  axi_wen_{sfx} <= {wen};")?;
        writeln!(b, "{BODY}  axi_req_{sfx} <= 1;")?;
        writeln!(b, "{BODY}  {mc} <= 1;")?;
        writeln!(b, "{BODY}end")?;
        writeln!(b, "{BODY}if ({mc} == 1 && axi_ack_{sfx}) begin")?;
        writeln!(b, "{BODY}  axi_req_{sfx} <= 0;")?;
        writeln!(b, "{BODY}  {mc} <= 3;")?;
        writeln!(b, "{BODY}end")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AxiConfig {
        AxiConfig {
            axi_addr_width: 32,
            sram_addr_width: 10,
            data_width: 32,
            reset_polarity: false,
        }
    }

    #[test]
    fn master_controller_ports() {
        let cfg = config();
        let text = cfg.master_controller().unwrap();
        assert!(text.starts_with("module axi_master_controller_a32s10d32_n(clk, rst_n, sram_addr,"));
        assert!(text.contains("  output reg [9:0] sram_addr;"));
        assert!(text.contains("  input [31:0] RDATA;"));
        assert!(text.contains("  output reg [31:0] ARADDR;"));
        assert!(text.contains("  assign ARSIZE = 2;"));
        assert!(text.contains("              ARLEN <= 255;"));
        assert!(text.contains("    if (!rst_n) begin"));
    }

    #[test]
    fn slave_controller_ports() {
        let mut cfg = config();
        cfg.reset_polarity = true;
        let text = cfg.slave_controller().unwrap();
        assert!(text.starts_with("module axi_slave_controller_a32s10d32(clk, rst, sram_addr,"));
        assert!(text.contains("  input [31:0] ARADDR;"));
        assert!(text.contains("  output reg RVALID;"));
        assert!(text.contains("  assign RRESP = 0;"));
        assert!(text.contains("            sram_addr <= ARADDR[9:0];"));
    }
}
