//! Register names in the generated Verilog.
//!
//! Generated names such as state variables or insn wires all start with
//! one of [GENERATED_PREFIXES] followed by an underscore. User supplied
//! register names are kept when they can not clash with those, otherwise
//! they get a kind prefix. Names without an underscore are always prefixed
//! so they can not hit a keyword.
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use tabula_ir as ir;
use tabula_utils::NameGenerator;

lazy_static! {
    static ref RESERVED: HashSet<&'static str> = [
        "always", "and", "assign", "automatic", "begin", "buf", "bufif0",
        "bufif1", "case", "casex", "casez", "cell", "cmos", "config",
        "deassign", "default", "defparam", "design", "disable", "edge",
        "else", "end", "endcase", "endconfig", "endfunction", "endgenerate",
        "endmodule", "endprimitive", "endspecify", "endtable", "endtask",
        "event", "for", "force", "forever", "fork", "function", "generate",
        "genvar", "highz0", "highz1", "if", "ifnone", "incdir", "include",
        "initial", "inout", "input", "instance", "integer", "join", "large",
        "liblist", "library", "localparam", "macromodule", "medium",
        "module", "nand", "negedge", "nmos", "nor", "noshowcancelled",
        "not", "notif0", "notif1", "or", "output", "parameter", "pmos",
        "posedge", "primitive", "pull0", "pull1", "pulldown", "pullup",
        "pulsestyle_onevent", "pulsestyle_ondetect", "rcmos", "real",
        "realtime", "reg", "release", "repeat", "rnmos", "rpmos", "rtran",
        "rtranif0", "rtranif1", "scalared", "showcancelled", "signed",
        "small", "specify", "specparam", "strong0", "strong1", "supply0",
        "supply1", "table", "task", "time", "tran", "tranif0", "tranif1",
        "tri", "tri0", "tri1", "triand", "trior", "trireg", "unsigned",
        "use", "uwire", "vectored", "wait", "wand", "weak0", "weak1",
        "while", "wire", "wor", "xnor", "xor", "clk", "rst", "rst_n",
    ]
    .into_iter()
    .collect();
}

/// Leading components of names the writer generates itself.
pub const GENERATED_PREFIXES: &[&str] = &[
    "S", "st", "insn", "mc", "op", "shared", "mem", "sram", "axi", "inst",
    "emb", "ext",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name)
}

/// Keeps letters, digits and underscores.
fn sanitize(raw: &str) -> String {
    let s: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{s}")
    } else {
        s
    }
}

/// Register names of one module.
#[derive(Debug, Default)]
pub struct Names {
    regs: HashMap<ir::RegisterIdx, String>,
    namegen: NameGenerator,
}

impl Names {
    /// `globals` are names used by ports of the module or its hierarchy.
    pub fn new<'s, I: IntoIterator<Item = &'s str>>(globals: I) -> Self {
        Names {
            regs: HashMap::new(),
            namegen: NameGenerator::with_prev_defined_names(globals),
        }
    }

    /// Names every non constant register of the tables in `module`.
    pub fn assign_reg_names(&mut self, design: &ir::Design, module: ir::ModuleIdx) {
        for t in &design.modules[module].tables {
            for r in &design.tables[*t].registers {
                let reg = &design.registers[*r];
                if reg.is_const() {
                    continue;
                }
                let name = self.namegen.gen_name(Self::candidate(design, reg));
                self.regs.insert(*r, name);
            }
        }
    }

    fn candidate(design: &ir::Design, reg: &ir::Register) -> String {
        let kind = if reg.is_state_local() { "w" } else { "r" };
        if reg.name.is_empty() {
            return format!("{kind}_{}_{}", design.tables[reg.table].id, reg.id);
        }
        let name = sanitize(&reg.name);
        let prefix = name.split('_').next().unwrap_or_default();
        if !name.contains('_')
            || is_reserved(&name)
            || GENERATED_PREFIXES.contains(&prefix)
            || (prefix.len() == 1 && matches!(prefix, "r" | "w"))
        {
            format!("{kind}_{name}")
        } else {
            name
        }
    }

    /// Name of a register assigned by [Names::assign_reg_names].
    pub fn reg_name(&self, design: &ir::Design, reg: ir::RegisterIdx) -> String {
        match self.regs.get(&reg) {
            Some(n) => n.clone(),
            None => {
                let r = &design.registers[reg];
                format!("r_{}_{}", design.tables[r.table].id, r.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::Builder;

    #[test]
    fn avoids_keywords_and_generated_names() {
        let mut d = ir::Design::new();
        let m = d.add_module("top");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let plain = b.alloc_register(t, "counter", 8);
        let kw = b.alloc_register(t, "begin", 1);
        let kept = b.alloc_register(t, "my_value", 8);
        let generated = b.alloc_register(t, "st_1", 8);
        let wire = b.alloc_wire(t, "tmp", 8);
        let dup = b.alloc_register(t, "counter", 8);
        let anon = b.alloc_register(t, "", 8);
        let odd = b.alloc_register(t, "a.b", 4);
        ir::validate_ids(&mut d);

        let mut names = Names::new(["r_port"]);
        names.assign_reg_names(&d, m);
        assert_eq!(names.reg_name(&d, plain), "r_counter");
        assert_eq!(names.reg_name(&d, kw), "r_begin");
        assert_eq!(names.reg_name(&d, kept), "my_value");
        assert_eq!(names.reg_name(&d, generated), "r_st_1");
        assert_eq!(names.reg_name(&d, wire), "w_tmp");
        assert_eq!(names.reg_name(&d, dup), "r_counter0");
        assert_eq!(names.reg_name(&d, anon), "r_1_7");
        assert_eq!(names.reg_name(&d, odd), "a_b");
        assert!(is_reserved("endmodule"));
    }
}
