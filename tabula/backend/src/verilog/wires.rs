//! Signals between modules.
//!
//! A signal keeps its name in every module it passes through, so a parent
//! connects a child instance port to the net of the same name. Modules
//! between the driver and the nearest common ancestor of all endpoints get
//! output ports, modules between that ancestor and a reader get input ports
//! and the ancestor itself holds the net.
use super::module::Emitter;
use super::ports::PortKind;
use tabula_ir::{self as ir, util};
use tabula_utils::{Error, TabulaResult};

impl Emitter<'_> {
    /// Routes `name`, driven in module `from`, to the modules in `to`. When
    /// `from_declares` is set the driver declares the net itself, e.g. as a
    /// `reg`.
    pub fn route(
        &mut self,
        name: &str,
        width: u32,
        from: ir::ModuleIdx,
        to: &[ir::ModuleIdx],
        from_declares: bool,
    ) -> TabulaResult<()> {
        let design = self.design;
        let mut root = from;
        for m in to {
            root = util::common_root(design, root, *m).ok_or_else(|| {
                Error::unsupported(format!(
                    "`{name}' connects `{}' and `{}' which have no common ancestor",
                    design.modules[from].name, design.modules[*m].name
                ))
            })?;
        }
        let mut upward = Vec::new();
        let mut cur = from;
        while cur != root {
            self.modules[cur].ports.add_port(name, PortKind::Output, width);
            upward.push(cur);
            let Some(parent) = design.modules[cur].parent else {
                break;
            };
            cur = parent;
        }
        if root != from || !from_declares {
            self.modules[root].declare_wire(name, width)?;
        }
        for m in to {
            let mut cur = *m;
            while cur != root {
                if !upward.contains(&cur) {
                    self.modules[cur].ports.add_port(name, PortKind::Input, width);
                }
                let Some(parent) = design.modules[cur].parent else {
                    break;
                };
                cur = parent;
            }
        }
        log::debug!(
            "routed `{name}' from `{}' through `{}'",
            design.modules[from].name,
            design.modules[root].name
        );
        Ok(())
    }

    /// Makes `name` a port of `module` and of each of its ancestors. The
    /// port of `module` itself is declared as `kind`.
    pub fn add_port_to_top(
        &mut self,
        name: &str,
        kind: PortKind,
        width: u32,
        module: ir::ModuleIdx,
    ) {
        let outer = match kind {
            PortKind::Input => PortKind::Input,
            PortKind::Output | PortKind::OutputReg => PortKind::Output,
        };
        for m in util::module_path_to_root(self.design, module) {
            let k = if m == module { kind } else { outer };
            self.modules[m].ports.add_port(name, k, width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verilog::template::Section;

    fn hierarchy() -> (ir::Design, [ir::ModuleIdx; 4]) {
        let mut d = ir::Design::new();
        let top = d.add_module("top");
        let a = d.add_module("a");
        let b = d.add_module("b");
        let c = d.add_module("c");
        d.set_parent_module(a, top).unwrap();
        d.set_parent_module(b, top).unwrap();
        d.set_parent_module(c, a).unwrap();
        ir::validate_ids(&mut d);
        (d, [top, a, b, c])
    }

    #[test]
    fn routes_through_common_ancestor() {
        let (d, [top, a, b, c]) = hierarchy();
        let mut em = Emitter::new(&d);
        em.route("sig", 8, c, &[b, a], false).unwrap();
        let kind = |em: &Emitter, m: ir::ModuleIdx| em.modules[m].ports.get("sig").map(|p| p.kind);
        assert_eq!(kind(&em, c), Some(PortKind::Output));
        assert_eq!(kind(&em, a), Some(PortKind::Output));
        assert_eq!(kind(&em, b), Some(PortKind::Input));
        assert_eq!(kind(&em, top), None);
        assert!(
            em.modules[top]
                .tmpl
                .contents(Section::Resource)
                .contains("wire [7:0] sig;")
        );
    }

    #[test]
    fn driver_owned_net_in_ancestor() {
        let (d, [top, a, _, c]) = hierarchy();
        let mut em = Emitter::new(&d);
        em.route("req", 0, a, &[c], true).unwrap();
        assert_eq!(em.modules[c].ports.get("req").map(|p| p.kind), Some(PortKind::Input));
        assert!(em.modules[a].ports.get("req").is_none());
        assert_eq!(em.modules[a].tmpl.contents(Section::Resource), "");
        assert!(em.modules[top].ports.get("req").is_none());
    }

    #[test]
    fn separate_hierarchies() {
        let mut d = ir::Design::new();
        let x = d.add_module("x");
        let y = d.add_module("y");
        let mut em = Emitter::new(&d);
        assert!(matches!(
            em.route("s", 1, x, &[y], false),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn ports_to_top() {
        let (d, [top, a, _, c]) = hierarchy();
        let mut em = Emitter::new(&d);
        em.add_port_to_top("led", PortKind::OutputReg, 4, c);
        assert_eq!(em.modules[c].ports.get("led").map(|p| p.kind), Some(PortKind::OutputReg));
        assert_eq!(em.modules[a].ports.get("led").map(|p| p.kind), Some(PortKind::Output));
        assert_eq!(em.modules[top].ports.get("led").map(|p| p.width), Some(4));
    }
}
