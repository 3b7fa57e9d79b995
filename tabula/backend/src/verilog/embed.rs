//! Modules written next to the design: generated helpers such as SRAMs and
//! AXI controllers, and hand written modules of `embedded` resources.
use super::table::TableWriter;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::io;
use tabula_ir::{self as ir, resource_class as rc};
use tabula_utils::{Error, TabulaResult};

/// Generated modules by name. Each is written once however many times it
/// is requested.
#[derive(Debug, Default)]
pub struct EmbeddedModules {
    texts: BTreeMap<String, String>,
}

impl EmbeddedModules {
    /// Registers the module `name`, generating its text on first request.
    pub fn request<F>(&mut self, name: &str, generate: F) -> TabulaResult<()>
    where
        F: FnOnce() -> TabulaResult<String>,
    {
        if !self.texts.contains_key(name) {
            let text = generate()?;
            self.texts.insert(name.to_string(), text);
        }
        Ok(())
    }

    pub fn write<W: Write>(&self, f: &mut W) -> TabulaResult<()> {
        for text in self.texts.values() {
            writeln!(f, "{text}")?;
        }
        Ok(())
    }
}

/// Appends each distinct file of the design's embedded modules to `w`.
pub fn copy_embedded_files<W: io::Write>(design: &ir::Design, w: &mut W) -> TabulaResult<()> {
    let mut files = BTreeSet::new();
    for (r, res) in design.resources.iter() {
        if design.class_name(r) != rc::EMBEDDED {
            continue;
        }
        let file = res.params.embedded_module_file();
        if file.is_empty() || !files.insert(file.clone()) {
            continue;
        }
        let text = std::fs::read_to_string(&file).map_err(|e| {
            Error::invalid_file(format!("embedded module file `{file}': {e}"))
        })?;
        log::info!("copying embedded module file `{file}'");
        writeln!(w, "// {file}")?;
        w.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            writeln!(w)?;
        }
    }
    Ok(())
}

fn instance_name(design: &ir::Design, res: ir::ResourceIdx) -> String {
    let r = &design.resources[res];
    format!("inst_{}_{}", design.tables[r.table].id, r.id)
}

/// Net connected to `port` of the instance.
fn pin_name(design: &ir::Design, res: ir::ResourceIdx, port: &str) -> String {
    let r = &design.resources[res];
    format!("emb_{}_{}_{port}", design.tables[r.table].id, r.id)
}

impl TableWriter<'_, '_> {
    fn embedded_width(&self, res: ir::ResourceIdx, n: usize, is_output: bool) -> ir::NumericWidth {
        let r = &self.design.resources[res];
        let types = if is_output { &r.output_types } else { &r.input_types };
        if let Some(t) = types.get(n) {
            return *t;
        }
        self.callers(res)
            .iter()
            .find_map(|(_, i)| {
                let insn = &self.design.insns[*i];
                let regs = if is_output {
                    insn.outputs.as_slice()
                } else {
                    insn.inputs.as_slice()
                };
                regs.get(n).map(|reg| self.design.registers[*reg].value_type)
            })
            .unwrap_or_default()
    }

    pub fn build_embedded(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let design = self.design;
        let params = &design.resources[res].params;
        let module = params.embedded_module_name();
        if module.is_empty() {
            return Err(Error::malformed_design(format!(
                "{}: embedded resource {} names no module",
                design.table_label(self.table),
                design.resources[res].id
            )));
        }
        let inputs = params.embedded_module_io(false);
        let outputs = params.embedded_module_io(true);
        let callers = self.callers(res);
        let ms = &self.em.modules[self.module];
        let mut conns = vec![
            format!(".{}({})", params.embedded_module_clock(), ms.ports.clk()),
            format!(".{}({})", params.embedded_module_reset(), ms.ports.reset()),
        ];
        for (n, port) in inputs.iter().enumerate() {
            let pin = pin_name(design, res, port);
            let ty = self.embedded_width(res, n, false);
            writeln!(
                self.s.resources,
                "  wire {}{pin};",
                super::insn::value_width_spec(ty)
            )?;
            let values = callers
                .iter()
                .filter_map(|(st, i)| {
                    design.insns[*i]
                        .inputs
                        .get(n)
                        .map(|r| (*st, self.reg_value(*r)))
                })
                .collect::<Vec<_>>();
            let v = self.mux_by_state(&values, Some("0"));
            writeln!(self.s.resource_values, "  assign {pin} = {v};")?;
            conns.push(format!(".{port}({pin})"));
        }
        for (n, port) in outputs.iter().enumerate() {
            let pin = pin_name(design, res, port);
            let ty = self.embedded_width(res, n, true);
            writeln!(
                self.s.resources,
                "  wire {}{pin};",
                super::insn::value_width_spec(ty)
            )?;
            conns.push(format!(".{port}({pin})"));
        }
        writeln!(
            self.s.embedded_instances,
            "  {module} {}({});",
            instance_name(design, res),
            conns.iter().join(", ")
        )?;
        Ok(())
    }

    pub fn embedded_insn(&mut self, st: ir::StateIdx, insn: ir::InsnIdx) -> TabulaResult<()> {
        let design = self.design;
        let i = &design.insns[insn];
        let params = &design.resources[i.resource].params;
        let inputs = params.embedded_module_io(false);
        let outputs = params.embedded_module_io(true);
        if i.inputs.len() > inputs.len() || i.outputs.len() > outputs.len() {
            return Err(Error::malformed_design(format!(
                "{}: embedded insn {} has more operands than `{}' has ports",
                design.table_label(self.table),
                i.id,
                params.embedded_module_name()
            )));
        }
        for (n, port) in outputs.iter().enumerate().take(i.outputs.len()) {
            let pin = pin_name(design, i.resource, port);
            self.assign_insn_wire(insn, n, &pin)?;
            self.output_from_wire(st, insn, n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_each_module_once() {
        let mut em = EmbeddedModules::default();
        em.request("m", || Ok("module m; endmodule\n".to_string()))
            .unwrap();
        em.request("m", || Err(Error::misc("regenerated")))
            .unwrap();
        let mut out = String::new();
        em.write(&mut out).unwrap();
        assert_eq!(out, "module m; endmodule\n\n");
    }

    #[test]
    fn pin_widths_follow_callers() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = ir::Builder::new(&mut d);
        let emb = b.create_embedded(t, "mod_x", "mod_x.v").unwrap();
        let x = b.alloc_register(t, "x", 8);
        let y = b.alloc_register(t, "y", 16);
        let st = b.alloc_state(t);
        b.insert_insn(st, emb, &[x], &[y]);
        b.add_next_state(st, st).unwrap();
        let params = &mut d.resources[emb].params;
        params.set_embedded_module_io(false, vec!["din".to_string()]);
        params.set_embedded_module_io(true, vec!["dout".to_string()]);
        ir::validate_ids(&mut d);

        let text = super::super::generate_verilog(&d).unwrap();
        assert!(text.contains("  wire [7:0] emb_1_1_din;"), "{text}");
        assert!(text.contains("  wire [15:0] emb_1_1_dout;"), "{text}");
        assert!(text.contains(".din(emb_1_1_din)"), "{text}");
    }

    #[test]
    fn missing_embedded_file() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = ir::Builder::new(&mut d);
        b.create_embedded(t, "mod_x", "/nonexistent/mod_x.v").unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            copy_embedded_files(&d, &mut out),
            Err(Error::InvalidFile(_))
        ));
    }
}
