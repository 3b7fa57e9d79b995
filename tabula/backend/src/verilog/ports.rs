//! Ports of a generated module.
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Input,
    /// Driven by a net or by a `reg` declared separately.
    Output,
    /// `output reg`, assigned in the module's always blocks.
    OutputReg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub kind: PortKind,
    /// 0 declares a scalar.
    pub width: u32,
    /// Output tied to a constant.
    pub fixed_value: Option<i64>,
}

/// `[w-1:0] ` or nothing for a scalar.
pub fn width_spec(width: u32) -> String {
    if width == 0 {
        String::new()
    } else {
        format!("[{}:0] ", width - 1)
    }
}

/// Clock, reset and the other ports of a module in declaration order.
#[derive(Debug, Clone)]
pub struct PortSet {
    clk: String,
    reset: String,
    ports: Vec<Port>,
}

impl PortSet {
    pub fn new<S: ToString>(clk: S, reset: S) -> Self {
        PortSet {
            clk: clk.to_string(),
            reset: reset.to_string(),
            ports: Vec::new(),
        }
    }

    pub fn clk(&self) -> &str {
        &self.clk
    }

    pub fn reset(&self) -> &str {
        &self.reset
    }

    pub fn get(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Adds a port. A port that already exists keeps its first
    /// declaration, except that `OutputReg` wins over `Output`.
    pub fn add_port<S: ToString>(&mut self, name: S, kind: PortKind, width: u32) {
        let name = name.to_string();
        if let Some(p) = self.ports.iter_mut().find(|p| p.name == name) {
            if p.kind == PortKind::Output && kind == PortKind::OutputReg {
                p.kind = kind;
            }
            return;
        }
        self.ports.push(Port {
            name,
            kind,
            width,
            fixed_value: None,
        });
    }

    /// An output driven by a constant.
    pub fn add_fixed_output<S: ToString>(&mut self, name: S, width: u32, value: i64) {
        self.add_port(name.to_string(), PortKind::Output, width);
        let name = name.to_string();
        if let Some(p) = self.ports.iter_mut().find(|p| p.name == name) {
            p.fixed_value = Some(value);
        }
    }

    /// `clk, rst, a, b`
    pub fn write_names<W: Write>(&self, f: &mut W) -> fmt::Result {
        write!(f, "{}, {}", self.clk, self.reset)?;
        for p in &self.ports {
            write!(f, ", {}", p.name)?;
        }
        Ok(())
    }

    /// One declaration per line.
    pub fn write_decls<W: Write>(&self, f: &mut W) -> fmt::Result {
        writeln!(f, "  input {};", self.clk)?;
        writeln!(f, "  input {};", self.reset)?;
        for p in &self.ports {
            let kind = match p.kind {
                PortKind::Input => "input",
                PortKind::Output => "output",
                PortKind::OutputReg => "output reg",
            };
            writeln!(f, "  {kind} {}{};", width_spec(p.width), p.name)?;
        }
        for p in &self.ports {
            if let Some(v) = p.fixed_value {
                writeln!(f, "  assign {} = {v};", p.name)?;
            }
        }
        Ok(())
    }

    /// Connections of an instance inside a parent that uses the same names.
    pub fn write_connections<W: Write>(
        &self,
        parent_clk: &str,
        parent_reset: &str,
        f: &mut W,
    ) -> fmt::Result {
        write!(f, ".{}({parent_clk}), .{}({parent_reset})", self.clk, self.reset)?;
        for p in &self.ports {
            write!(f, ", .{}({})", p.name, p.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations() {
        let mut ps = PortSet::new("clk", "rst_n");
        ps.add_port("data_in", PortKind::Input, 32);
        ps.add_port("led", PortKind::Output, 0);
        ps.add_port("led", PortKind::OutputReg, 0);
        ps.add_port("data_in", PortKind::Output, 8);
        ps.add_fixed_output("ready", 0, 1);

        let mut names = String::new();
        ps.write_names(&mut names).unwrap();
        assert_eq!(names, "clk, rst_n, data_in, led, ready");

        let mut decls = String::new();
        ps.write_decls(&mut decls).unwrap();
        assert_eq!(
            decls,
            "  input clk;\n  input rst_n;\n  input [31:0] data_in;\n  \
             output reg led;\n  output ready;\n  assign ready = 1;\n"
        );

        let mut conn = String::new();
        ps.write_connections("clk", "rst_n", &mut conn).unwrap();
        assert_eq!(
            conn,
            ".clk(clk), .rst_n(rst_n), .data_in(data_in), .led(led), .ready(ready)"
        );
    }
}
