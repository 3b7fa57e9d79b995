//! Resource usage summary of a design, written as JSON.
use crate::traits::Backend;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use tabula_ir as ir;
use tabula_utils::{Error, OutputFile, TabulaResult};

#[derive(Default)]
pub struct ResourcesBackend;

#[derive(Debug, Serialize, PartialEq, Eq)]
struct TableUsage {
    id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    states: usize,
    registers: usize,
    wires: usize,
    constants: usize,
    insns: usize,
    /// Number of resources of each class.
    resources: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ModuleUsage {
    id: i32,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    tables: Vec<TableUsage>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct DesignUsage {
    modules: Vec<ModuleUsage>,
    total_states: usize,
    total_insns: usize,
}

fn table_usage(design: &ir::Design, table: ir::TableIdx) -> TableUsage {
    let t = &design.tables[table];
    let mut resources = BTreeMap::new();
    for r in &t.resources {
        *resources
            .entry(design.class_name(*r).to_string())
            .or_insert(0) += 1;
    }
    let count_regs = |kind: ir::RegisterKind| {
        t.registers
            .iter()
            .filter(|r| design.registers[**r].kind == kind)
            .count()
    };
    TableUsage {
        id: t.id,
        name: t.name.clone(),
        states: t.states.len(),
        registers: count_regs(ir::RegisterKind::Normal),
        wires: count_regs(ir::RegisterKind::StateLocal),
        constants: count_regs(ir::RegisterKind::Const),
        insns: t.states.iter().map(|s| design.states[*s].insns.len()).sum(),
        resources,
    }
}

fn design_usage(design: &ir::Design) -> DesignUsage {
    let modules = design
        .modules
        .values()
        .map(|m| ModuleUsage {
            id: m.id,
            name: m.name.clone(),
            parent: m.parent.map(|p| design.modules[p].name.clone()),
            tables: m.tables.iter().map(|t| table_usage(design, *t)).collect(),
        })
        .collect::<Vec<_>>();
    let tables = modules.iter().flat_map(|m| m.tables.iter());
    let total_states = tables.clone().map(|t| t.states).sum();
    let total_insns = tables.map(|t| t.insns).sum();
    DesignUsage {
        modules,
        total_states,
        total_insns,
    }
}

impl Backend for ResourcesBackend {
    fn name(&self) -> &'static str {
        "resources"
    }

    fn validate(_design: &ir::Design) -> TabulaResult<()> {
        Ok(())
    }

    fn link_externs(
        _design: &ir::Design,
        _file: &mut OutputFile,
    ) -> TabulaResult<()> {
        Ok(())
    }

    fn emit(design: &ir::Design, file: &mut OutputFile) -> TabulaResult<()> {
        let usage = design_usage(design);
        let mut w = file.get_write()?;
        serde_json::to_writer_pretty(&mut w, &usage).map_err(|err| {
            Error::write_error(format!("failed to write {file}: {err}"))
        })?;
        writeln!(w)?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::Builder;

    #[test]
    fn counts_per_table() {
        let mut d = ir::Design::new();
        let m = d.add_module("top");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let s0 = b.alloc_state(t);
        let s1 = b.alloc_state(t);
        let x = b.alloc_register(t, "x", 8);
        let w = b.alloc_wire(t, "w", 8);
        let one = b.alloc_const(t, 8, 1);
        let add = b.create_resource(t, "add").unwrap();
        let set = b.create_resource(t, "set").unwrap();
        b.insert_insn(s0, add, &[x, one], &[w]);
        b.insert_insn(s0, set, &[w], &[x]);
        b.add_next_state(s0, s1).unwrap();
        ir::validate_ids(&mut d);

        let usage = design_usage(&d);
        assert_eq!(usage.total_states, 2);
        assert_eq!(usage.total_insns, 3);
        let tu = &usage.modules[0].tables[0];
        assert_eq!((tu.registers, tu.wires, tu.constants), (1, 1, 1));
        assert_eq!(tu.resources.get("add"), Some(&1));
        assert_eq!(tu.resources.get("tr"), Some(&1));

        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["modules"][0]["name"], "top");
        assert!(json["modules"][0].get("parent").is_none());
    }
}
