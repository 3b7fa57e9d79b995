//! Writes a design in the S-expression exchange format. The output is read
//! back by `tabula_frontend`. Objects are referred to by their ids, so the
//! design should have gone through
//! [validate_ids](crate::builder::validate_ids).
use crate::numeric::NumericWidth;
use crate::params::ResourceParams;
use crate::platform::Platform;
use crate::structure::*;
use itertools::Itertools;
use std::io;

/// Printer for the IR.
pub struct Printer;

impl Printer {
    /// Quotes `s` unless it is a plain atom.
    pub fn format_atom(s: &str) -> String {
        let plain = !s.is_empty()
            && !s
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';'));
        if plain {
            s.to_string()
        } else {
            let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\"")
        }
    }

    /// `(UINT 32)` or `(INT 8)`.
    pub fn format_value_type(ty: &NumericWidth) -> String {
        let kind = if ty.is_signed() { "INT" } else { "UINT" };
        format!("({kind} {})", ty.width())
    }

    fn format_value_types(types: &[NumericWidth]) -> String {
        format!("({})", types.iter().map(Self::format_value_type).join(" "))
    }

    /// `(PARAMS (KEY v ...) ...)`
    pub fn format_params(params: &ResourceParams) -> String {
        let entries = params
            .iter()
            .map(|(k, vs)| {
                let mut items = vec![Self::format_atom(k)];
                items.extend(vs.iter().map(|v| Self::format_atom(v)));
                format!("({})", items.join(" "))
            })
            .collect_vec();
        if entries.is_empty() {
            "(PARAMS)".to_string()
        } else {
            format!("(PARAMS {})", entries.join(" "))
        }
    }

    fn format_ids<'a, I: IntoIterator<Item = &'a i32>>(ids: I) -> String {
        format!("({})", ids.into_iter().join(" "))
    }

    /// Prints the whole design.
    pub fn write_design<F: io::Write>(design: &Design, f: &mut F) -> io::Result<()> {
        if !design.params.is_empty() {
            writeln!(f, "{}", Self::format_params(&design.params))?;
        }
        for img in design.array_images.values() {
            writeln!(
                f,
                "(ARRAY-IMAGE {} {} ({}))",
                img.id,
                Self::format_atom(&img.name),
                img.values.iter().join(" ")
            )?;
        }
        for platform in &design.platforms {
            Self::write_platform(platform, f)?;
        }
        for m in design.modules.keys() {
            Self::write_module(design, m, f)?;
        }
        Ok(())
    }

    pub fn write_platform<F: io::Write>(platform: &Platform, f: &mut F) -> io::Result<()> {
        writeln!(f, "(PLATFORM {}", Self::format_atom(&platform.name))?;
        for def in &platform.definitions {
            let cond = def.condition.children().iter().join(" ");
            let value = def.value.children().iter().join(" ");
            writeln!(f, "  (DEF (COND {cond}) (VALUE {value}))")?;
        }
        writeln!(f, ")")
    }

    pub fn write_module<F: io::Write>(
        design: &Design,
        module: ModuleIdx,
        f: &mut F,
    ) -> io::Result<()> {
        let m = &design.modules[module];
        writeln!(f, "(MODULE {} {}", m.id, Self::format_atom(&m.name))?;
        writeln!(f, "  {}", Self::format_params(&m.params))?;
        if let Some(parent) = m.parent {
            writeln!(f, "  (PARENT {})", design.modules[parent].id)?;
        }
        for t in &m.tables {
            Self::write_table(design, *t, f)?;
        }
        writeln!(f, ")")
    }

    pub fn write_table<F: io::Write>(
        design: &Design,
        table: TableIdx,
        f: &mut F,
    ) -> io::Result<()> {
        let t = &design.tables[table];
        match &t.name {
            Some(name) => writeln!(f, "  (TABLE {} (NAME {})", t.id, Self::format_atom(name))?,
            None => writeln!(f, "  (TABLE {}", t.id)?,
        }
        writeln!(f, "    (REGISTERS")?;
        for r in &t.registers {
            Self::write_register(&design.registers[*r], f)?;
        }
        writeln!(f, "    )")?;
        writeln!(f, "    (RESOURCES")?;
        for r in &t.resources {
            Self::write_resource(design, *r, f)?;
        }
        writeln!(f, "    )")?;
        if let Some(init) = t.initial_state {
            writeln!(f, "    (INITIAL {})", design.states[init].id)?;
        }
        for st in &t.states {
            Self::write_state(design, *st, f)?;
        }
        writeln!(f, "  )")
    }

    fn write_register<F: io::Write>(reg: &Register, f: &mut F) -> io::Result<()> {
        let kind = match reg.kind {
            RegisterKind::Normal => "REG",
            RegisterKind::Const => "CONST",
            RegisterKind::StateLocal => "WIRE",
        };
        let value = reg
            .initial_value
            .map_or_else(|| "()".to_string(), |v| v.format());
        writeln!(
            f,
            "      (REGISTER {} {} {kind} {} {value})",
            reg.id,
            Self::format_atom(&reg.name),
            Self::format_value_type(&reg.value_type)
        )
    }

    fn write_resource<F: io::Write>(
        design: &Design,
        res: ResourceIdx,
        f: &mut F,
    ) -> io::Result<()> {
        let r = &design.resources[res];
        write!(
            f,
            "      (RESOURCE {} {} {} {} {}",
            r.id,
            design.class_name(res),
            Self::format_value_types(&r.input_types),
            Self::format_value_types(&r.output_types),
            Self::format_params(&r.params)
        )?;
        if let Some(array) = &r.array {
            write!(
                f,
                "\n        (ARRAY {} {} {} {}",
                array.address_width,
                Self::format_value_type(&array.data_type),
                if array.is_external { "EXTERNAL" } else { "INTERNAL" },
                if array.is_ram { "RAM" } else { "ROM" }
            )?;
            if let Some(img) = array.image {
                write!(f, " {}", design.array_images[img].id)?;
            }
            write!(f, ")")?;
        }
        if let Some(callee) = r.callee_table {
            let t = &design.tables[callee];
            write!(
                f,
                "\n        (CALLEE-TABLE {} {})",
                design.modules[t.module].id, t.id
            )?;
        }
        if let Some(parent) = r.parent_resource {
            let p = &design.resources[parent];
            let t = &design.tables[p.table];
            write!(
                f,
                "\n        (PARENT-RESOURCE {} {} {})",
                design.modules[t.module].id, t.id, p.id
            )?;
        }
        writeln!(f, ")")
    }

    fn write_state<F: io::Write>(
        design: &Design,
        state: StateIdx,
        f: &mut F,
    ) -> io::Result<()> {
        let st = &design.states[state];
        writeln!(f, "    (STATE {}", st.id)?;
        if st.profile.valid {
            writeln!(
                f,
                "      (PROFILE {} {})",
                st.profile.raw_count, st.profile.normalized_count
            )?;
        }
        for insn in &st.insns {
            Self::write_insn(design, *insn, f)?;
        }
        writeln!(f, "    )")
    }

    fn write_insn<F: io::Write>(design: &Design, insn: InsnIdx, f: &mut F) -> io::Result<()> {
        let i = &design.insns[insn];
        let operand = if i.operand.is_empty() {
            "()".to_string()
        } else {
            format!("({})", Self::format_atom(&i.operand))
        };
        write!(
            f,
            "      (INSN {} {} {} {operand} {} {} {}",
            i.id,
            design.insn_class(insn),
            design.resources[i.resource].id,
            Self::format_ids(i.target_states.iter().map(|s| &design.states[*s].id)),
            Self::format_ids(i.inputs.iter().map(|r| &design.registers[*r].id)),
            Self::format_ids(i.outputs.iter().map(|r| &design.registers[*r].id)),
        )?;
        if !i.depending_insns.is_empty() {
            write!(
                f,
                " (DEPS {})",
                i.depending_insns.iter().map(|d| design.insns[*d].id).join(" ")
            )?;
        }
        writeln!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Builder, validate_ids};

    #[test]
    fn atoms() {
        assert_eq!(Printer::format_atom("abc"), "abc");
        assert_eq!(Printer::format_atom(""), "\"\"");
        assert_eq!(Printer::format_atom("a b"), "\"a b\"");
        assert_eq!(Printer::format_atom("q\""), "\"q\\\"\"");
    }

    #[test]
    fn prints_table() {
        let mut d = Design::new();
        let m = d.add_module("top");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let st = b.alloc_state(t);
        let r = b.alloc_register(t, "counter", 32);
        let one = b.alloc_const(t, 32, 1);
        let add = b.create_resource(t, "add").unwrap();
        b.insert_insn(st, add, &[r, one], &[r]);
        b.add_next_state(st, st).unwrap();
        validate_ids(&mut d);

        let mut out = Vec::new();
        Printer::write_design(&d, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(MODULE 1 top"));
        assert!(text.contains("(REGISTER 1 counter REG (UINT 32) ())"));
        assert!(text.contains("(REGISTER 2 \"\" CONST (UINT 32) 1)"));
        assert!(text.contains("(RESOURCE 1 add () () (PARAMS))"));
        assert!(text.contains("(INITIAL 1)"));
        assert!(text.contains("(INSN 1 add 1 () () (1 2) (1))"));
        assert!(text.contains("(INSN 2 tr 2 () (1) () ())"));
    }
}
