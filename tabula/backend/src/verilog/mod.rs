//! Verilog backend for the Tabula toolkit.
//!
//! Every module of the design becomes a Verilog module and every table an
//! `always` block driven by its own state register. Resources that connect
//! tables (shared registers, shared memories, AXI ports) are wired through
//! the module hierarchy by [Emitter::route].
mod array;
mod axi;
mod embed;
mod ext_io;
mod insn;
mod module;
mod names;
mod ports;
mod shared_memory;
mod shared_reg;
mod table;
mod template;
mod wires;

use crate::traits::Backend;
use module::Emitter;
use std::io::Write;
use std::time::Instant;
use tabula_ir::{self as ir, resource_class as rc};
use tabula_utils::{Error, OutputFile, TabulaResult};

/// Implements the Verilog backend.
#[derive(Default)]
pub struct VerilogBackend;

/// Classes the writer has no implementation for.
fn is_unsupported(class: &str) -> bool {
    matches!(
        class,
        rc::FIFO
            | rc::FIFO_READER
            | rc::FIFO_WRITER
            | rc::TICKER
            | rc::EXT_TASK
            | rc::EXT_TASK_CALL
            | rc::EXT_TASK_WAIT
            | rc::EXT_TASK_DONE
            | rc::EXT_FLOW_CALL
            | rc::EXT_FLOW_RESULT
            | rc::SUB_MODULE_TASK
            | rc::SUB_MODULE_TASK_CALL
            | rc::DATAFLOW_IN
            | rc::MAPPED
    )
}

fn validate_table(design: &ir::Design, table: ir::TableIdx) -> TabulaResult<()> {
    let t = &design.tables[table];
    let label = design.table_label(table);
    if !t.states.is_empty() && t.initial_state.is_none() {
        return Err(Error::malformed_design(format!(
            "{label}: no initial state"
        )));
    }
    for res in &t.resources {
        let class = design.class_name(*res);
        if is_unsupported(class) {
            return Err(Error::unsupported(format!(
                "{label}: `{class}' resources can not be written as Verilog"
            )));
        }
        let params = &design.resources[*res].params;
        if class == rc::EXT_INPUT && params.ext_input_port().is_none()
            || class == rc::EXT_OUTPUT && params.ext_output_port().is_none()
        {
            return Err(Error::malformed_design(format!(
                "{label}: `{class}' resource {} has no port name",
                design.resources[*res].id
            )));
        }
    }
    for st in &t.states {
        for i in &design.states[*st].insns {
            let insn = &design.insns[*i];
            let class = design.insn_class(*i);
            if class == rc::FOREIGN_REG {
                for r in &insn.inputs {
                    let owner = design.registers[*r].table;
                    if design.tables[owner].module != t.module {
                        return Err(Error::unsupported(format!(
                            "{label}: foreign register `{}' lives in another module",
                            design.registers[*r].name
                        )));
                    }
                }
            }
            if insn::is_multi_cycle(class)
                && insn
                    .outputs
                    .iter()
                    .any(|r| design.registers[*r].is_state_local())
            {
                return Err(Error::unsupported(format!(
                    "{label}: insn {} writes a wire from a multi cycle `{class}'",
                    insn.id
                )));
            }
        }
    }
    Ok(())
}

impl Backend for VerilogBackend {
    fn name(&self) -> &'static str {
        "verilog"
    }

    fn validate(design: &ir::Design) -> TabulaResult<()> {
        design.check_references()?;
        for t in design.tables.keys() {
            validate_table(design, t)?;
        }
        Ok(())
    }

    /// Copies the files of embedded modules after the generated code.
    fn link_externs(
        design: &ir::Design,
        file: &mut OutputFile,
    ) -> TabulaResult<()> {
        let mut w = file.get_write()?;
        embed::copy_embedded_files(design, &mut w)?;
        w.flush()?;
        Ok(())
    }

    fn emit(design: &ir::Design, file: &mut OutputFile) -> TabulaResult<()> {
        let time = Instant::now();
        let mut emitter = Emitter::new(design);
        emitter.build()?;
        let mut text = String::new();
        emitter.write(&mut text)?;
        let mut w = file.get_write()?;
        w.write_all(text.as_bytes())?;
        w.flush()?;
        log::info!(
            "Generated {} modules in {:?}",
            design.modules.len(),
            time.elapsed()
        );
        Ok(())
    }
}

/// Generates the Verilog text for `design` without embedded file contents.
pub fn generate_verilog(design: &ir::Design) -> TabulaResult<String> {
    VerilogBackend::validate(design)?;
    let mut emitter = Emitter::new(design);
    emitter.build()?;
    let mut text = String::new();
    emitter.write(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `o = a + 1` in three states, and a child module writing a register
    /// of its parent every cycle.
    fn adder() -> ir::Design {
        let mut d = ir::Design::new();
        let top = d.add_module("top");
        let sub = d.add_module("sub");
        d.set_parent_module(sub, top).unwrap();
        let t = d.add_table(top);
        let ts = d.add_table(sub);
        let mut b = ir::Builder::new(&mut d);
        let a = b.create_ext_input(t, "a", 8).unwrap();
        let o = b.create_ext_output(t, "o", 8).unwrap();
        let add = b.create_resource(t, rc::ADD).unwrap();
        let shared = b.create_shared_reg(t, "", 8).unwrap();
        let x = b.alloc_register(t, "x", 8);
        let y = b.alloc_register(t, "y", 8);
        let one = b.alloc_const(t, 8, 1);
        let s1 = b.alloc_state(t);
        let s2 = b.alloc_state(t);
        let s3 = b.alloc_state(t);
        b.insert_insn(s1, a, &[], &[x]);
        b.insert_insn(s2, add, &[x, one], &[y]);
        b.insert_insn(s3, o, &[y], &[]);
        b.add_next_state(s1, s2).unwrap();
        b.add_next_state(s2, s3).unwrap();
        b.add_next_state(s3, s1).unwrap();

        let writer = b.create_shared_reg_writer(ts, shared).unwrap();
        let five = b.alloc_const(ts, 8, 5);
        let w1 = b.alloc_state(ts);
        b.insert_insn(w1, writer, &[five], &[]);
        b.add_next_state(w1, w1).unwrap();
        ir::validate_ids(&mut d);
        d
    }

    #[test]
    fn adder_module() {
        let text = generate_verilog(&adder()).unwrap();
        assert!(text.contains("module top("), "{text}");
        assert!(text.contains("module sub("), "{text}");
        assert!(text.contains("  input [7:0] a;"), "{text}");
        assert!(text.contains("  output reg [7:0] o;"), "{text}");
        assert!(text.contains("  localparam S_1_1 = 1;"), "{text}");
        assert!(
            text.contains("  assign add_1_3_d0 = add_1_3_s0 + add_1_3_s1;"),
            "{text}"
        );
        assert!(text.contains("shared_reg_1_1_4_2_1_1_wen"), "{text}");
        assert!(text.contains("inst_sub("), "{text}");
        assert!(text.trim_end().ends_with("endmodule"), "{text}");
    }

    #[test]
    fn unsupported_class() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        ir::Builder::new(&mut d)
            .create_resource(t, rc::FIFO)
            .unwrap();
        ir::validate_ids(&mut d);
        assert!(matches!(
            generate_verilog(&d),
            Err(Error::Unsupported(_))
        ));
    }
}
