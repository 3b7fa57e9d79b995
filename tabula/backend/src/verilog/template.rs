//! Text of a module body, kept in sections that are filled in any order
//! and written out in a fixed one.
use std::collections::BTreeMap;
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    StateDecl,
    Register,
    Resource,
    InsnWireDecl,
    ResourceValue,
    InsnWireValue,
    EmbeddedInstance,
    Table,
}

#[derive(Debug, Default, Clone)]
pub struct ModuleTemplate {
    sections: BTreeMap<Section, String>,
}

impl ModuleTemplate {
    pub fn stream(&mut self, section: Section) -> &mut String {
        self.sections.entry(section).or_default()
    }

    #[cfg(test)]
    pub fn contents(&self, section: Section) -> &str {
        self.sections.get(&section).map_or("", String::as_str)
    }

    /// Non empty sections in order, separated by blank lines.
    pub fn write<W: Write>(&self, f: &mut W) -> fmt::Result {
        for text in self.sections.values().filter(|s| !s.is_empty()) {
            writeln!(f)?;
            f.write_str(text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_in_order() {
        let mut t = ModuleTemplate::default();
        t.stream(Section::Table).push_str("  always;\n");
        t.stream(Section::StateDecl).push_str("  localparam S = 0;\n");
        t.stream(Section::Register);
        let mut out = String::new();
        t.write(&mut out).unwrap();
        assert_eq!(out, "\n  localparam S = 0;\n\n  always;\n");
        assert_eq!(t.contents(Section::Resource), "");
    }
}
