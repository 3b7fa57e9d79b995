use tabula_ir::{self as ir, resource_class as rc};

/// Estimated combinational delay of insns in picoseconds. Values come from
/// the design's platform when it defines them, and from a generic model
/// otherwise.
#[derive(Clone, Debug, Default)]
pub struct DelayInfo {
    platform: Option<ir::Platform>,
}

impl DelayInfo {
    /// Uses the platform named by the design's `PLATFORM-NAME` param.
    pub fn from_design(design: &ir::Design) -> Self {
        let name = design.params.platform_name();
        let platform = design.platforms.iter().find(|p| p.name == name).cloned();
        if platform.is_none() && !name.is_empty() {
            log::warn!("Platform `{name}' is not defined; using default delays");
        }
        Self { platform }
    }

    pub fn with_platform(platform: ir::Platform) -> Self {
        Self {
            platform: Some(platform),
        }
    }

    /// Delay of `class` on operands `width` bits wide.
    pub fn class_delay(&self, class: &str, width: u32) -> i64 {
        if let Some(d) = self
            .platform
            .as_ref()
            .and_then(|p| p.lookup_delay(class, width))
        {
            return d;
        }
        let w = i64::from(width.max(1));
        match class {
            rc::ADD | rc::SUB => 200 + 20 * w,
            rc::MUL => 1000 + 60 * w,
            rc::GT | rc::GTE => 200 + 15 * w,
            rc::EQ => 150 + 5 * w,
            rc::SELECT => 150,
            c if rc::is_light_bin_op(c) || rc::is_light_uni_op(c) => 100,
            c if rc::is_bit_arrange_op(c) => 0,
            rc::SET | rc::PHI | rc::PSEUDO | rc::TRANSITION => 0,
            rc::ARRAY => 1000,
            _ => 100,
        }
    }

    /// Delay of `insn`; the width is the widest input or output.
    pub fn insn_delay(&self, design: &ir::Design, insn: ir::InsnIdx) -> i64 {
        let i = &design.insns[insn];
        let width = i
            .inputs
            .iter()
            .chain(i.outputs.iter())
            .map(|r| design.registers[*r].value_type.width())
            .max()
            .unwrap_or(0);
        self.class_delay(design.insn_class(insn), width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_ir::{Definition, PlatformNode};

    fn pair(k: &str, v: &str) -> PlatformNode {
        PlatformNode::List(vec![PlatformNode::atom(k), PlatformNode::atom(v)])
    }

    #[test]
    fn platform_overrides_model() {
        let mut p = ir::Platform::new("fast");
        p.definitions.push(Definition {
            condition: PlatformNode::List(vec![pair("CLASS", "add"), pair("WIDTH", "32")]),
            value: PlatformNode::List(vec![pair("DELAY", "77")]),
        });
        let mut d = ir::Design::new();
        d.platforms.push(p);
        d.params.set_platform_name("fast");
        let info = DelayInfo::from_design(&d);
        assert_eq!(info.class_delay("add", 16), 77);
        // Not covered by the 32 bit definition.
        assert_eq!(info.class_delay("add", 64), 200 + 20 * 64);
        assert_eq!(info.class_delay("mul", 8), 1000 + 60 * 8);
    }

    #[test]
    fn wiring_is_free() {
        let info = DelayInfo::default();
        assert_eq!(info.class_delay("bit-sel", 32), 0);
        assert_eq!(info.class_delay("set", 32), 0);
        assert!(info.class_delay("mul", 32) > info.class_delay("add", 32));
    }
}
