//! Writer state of each module, and the module text itself.
use super::embed::EmbeddedModules;
use super::names::Names;
use super::ports::{PortSet, width_spec};
use super::table::TableWriter;
use super::template::{ModuleTemplate, Section};
use std::collections::HashSet;
use std::fmt::Write;
use tabula_ir::{self as ir, resource_class as rc};
use tabula_utils::{IndexedMap, TabulaResult};

/// Reset port name: `RESET-NAME` if given, else by polarity.
pub fn reset_name(params: &ir::ResourceParams) -> String {
    let name = params.reset_name();
    if !name.is_empty() {
        name
    } else if params.reset_polarity() {
        "rst".to_string()
    } else {
        "rst_n".to_string()
    }
}

pub struct ModuleState {
    /// Verilog module name with the design's prefix.
    pub name: String,
    pub ports: PortSet,
    pub tmpl: ModuleTemplate,
    pub names: Names,
    pub reset_polarity: bool,
    wires: HashSet<String>,
}

impl ModuleState {
    fn new(design: &ir::Design, module: ir::ModuleIdx, globals: &[String]) -> Self {
        let mut params = design.params.clone();
        params.merge(&design.modules[module].params);
        let mut names = Names::new(globals.iter().map(String::as_str));
        names.assign_reg_names(design, module);
        ModuleState {
            name: format!(
                "{}{}",
                params.module_name_prefix(),
                design.modules[module].name
            ),
            ports: PortSet::new("clk".to_string(), reset_name(&params)),
            tmpl: ModuleTemplate::default(),
            names,
            reset_polarity: params.reset_polarity(),
            wires: HashSet::new(),
        }
    }

    /// Condition that holds while the module is in reset.
    pub fn reset_cond(&self) -> String {
        if self.reset_polarity {
            self.ports.reset().to_string()
        } else {
            format!("!{}", self.ports.reset())
        }
    }

    /// Declares a module level wire unless the name is already a wire or a
    /// port of this module.
    pub fn declare_wire(&mut self, name: &str, width: u32) -> TabulaResult<()> {
        if self.ports.get(name).is_some() || !self.wires.insert(name.to_string()) {
            return Ok(());
        }
        writeln!(
            self.tmpl.stream(Section::Resource),
            "  wire {}{name};",
            width_spec(width)
        )?;
        Ok(())
    }
}

/// Names of external ports; registers must not take them.
fn port_names(design: &ir::Design) -> Vec<String> {
    let mut names = Vec::new();
    for (r, res) in design.resources.iter() {
        let port = match design.class_name(r) {
            rc::EXT_INPUT => res.params.ext_input_port(),
            rc::EXT_OUTPUT => res.params.ext_output_port(),
            _ => None,
        };
        if let Some((name, _)) = port {
            names.push(name);
        }
    }
    names
}

/// State of the whole Verilog generation.
pub struct Emitter<'a> {
    pub design: &'a ir::Design,
    pub conn: ir::Connection,
    pub modules: IndexedMap<ir::ModuleIdx, ModuleState>,
    pub embedded: EmbeddedModules,
}

impl<'a> Emitter<'a> {
    pub fn new(design: &'a ir::Design) -> Self {
        let globals = port_names(design);
        let mut modules = IndexedMap::new();
        for m in design.modules.keys() {
            modules.push(ModuleState::new(design, m, &globals));
        }
        Emitter {
            design,
            conn: ir::Connection::build(design),
            modules,
            embedded: EmbeddedModules::default(),
        }
    }

    /// Generates the code of every table.
    pub fn build(&mut self) -> TabulaResult<()> {
        let design = self.design;
        for m in design.modules.keys() {
            for t in &design.modules[m].tables {
                TableWriter::new(self, *t).build()?;
            }
        }
        Ok(())
    }

    pub fn write<W: Write>(&self, f: &mut W) -> TabulaResult<()> {
        for m in self.design.modules.keys() {
            self.write_module(m, f)?;
        }
        self.embedded.write(f)
    }

    fn write_module<W: Write>(&self, module: ir::ModuleIdx, f: &mut W) -> TabulaResult<()> {
        let ms = &self.modules[module];
        write!(f, "module {}(", ms.name)?;
        ms.ports.write_names(f)?;
        writeln!(f, ");")?;
        ms.ports.write_decls(f)?;
        ms.tmpl.write(f)?;
        for child in self.design.child_modules(module) {
            let cs = &self.modules[child];
            write!(
                f,
                "\n  {} inst_{}(",
                cs.name, self.design.modules[child].name
            )?;
            cs.ports
                .write_connections(ms.ports.clk(), ms.ports.reset(), f)?;
            writeln!(f, ");")?;
        }
        writeln!(f, "\nendmodule\n")?;
        Ok(())
    }
}
