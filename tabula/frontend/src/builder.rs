//! Builds a [Design] from parsed expressions.
//!
//! Errors do not stop the build: every problem found is recorded with its
//! line and all of them are reported together.
use crate::exp::Exp;
use crate::parser::ExpParser;
use std::collections::HashMap;
use std::path::Path;
use tabula_ir::{
    self as ir, Array, ArrayImageIdx, Design, InsnIdx, ModuleIdx, Numeric,
    NumericWidth, Platform, PlatformNode, RegisterIdx, RegisterKind,
    ResourceIdx, ResourceParams, StateIdx, TableIdx,
};
use tabula_utils::{Error, TabulaResult};

/// A reference that can only be resolved once the whole input is read.
enum Pending {
    Parent { module: ModuleIdx, parent: i32, line: usize },
    Callee { res: ResourceIdx, module: i32, table: i32, line: usize },
    ParentResource {
        res: ResourceIdx,
        module: i32,
        table: i32,
        resource: i32,
        line: usize,
    },
    Image { res: ResourceIdx, image: i32, line: usize },
}

/// Per table id maps used while the table's insns are built.
#[derive(Default)]
struct TableScope {
    registers: HashMap<i32, RegisterIdx>,
    resources: HashMap<i32, ResourceIdx>,
    states: HashMap<i32, StateIdx>,
    insns: HashMap<i32, InsnIdx>,
}

pub struct DesignBuilder {
    design: Design,
    errors: Vec<String>,
    modules: HashMap<i32, ModuleIdx>,
    tables: HashMap<(i32, i32), TableIdx>,
    resources: HashMap<(i32, i32, i32), ResourceIdx>,
    images: HashMap<i32, ArrayImageIdx>,
    pending: Vec<Pending>,
}

impl Default for DesignBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DesignBuilder {
    pub fn new() -> Self {
        Self {
            design: Design::new(),
            errors: Vec::new(),
            modules: HashMap::new(),
            tables: HashMap::new(),
            resources: HashMap::new(),
            images: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Reads a design file.
    pub fn read_file(path: &Path) -> TabulaResult<Design> {
        let exps = ExpParser::parse_file(path)?;
        Self::new().build(&exps)
    }

    /// Reads a design from text.
    pub fn read_str(content: &str) -> TabulaResult<Design> {
        let exps = ExpParser::parse_str(content, "<string>")?;
        Self::new().build(&exps)
    }

    /// Reads a design from a stream.
    pub fn read<R: std::io::Read>(r: R) -> TabulaResult<Design> {
        let exps = ExpParser::parse_reader(r)?;
        Self::new().build(&exps)
    }

    /// Builds a design out of top level expressions.
    pub fn build(mut self, exps: &[Exp]) -> TabulaResult<Design> {
        for exp in exps {
            match exp.head() {
                Some("PARAMS") => {
                    let params = self.build_params(exp);
                    self.design.params.merge(&params);
                }
                Some("ARRAY-IMAGE") => self.build_array_image(exp),
                Some("PLATFORM") => self.build_platform(exp),
                Some("MODULE") => self.build_module(exp),
                _ => self.error(exp, format!("unknown top level form {}", exp.describe())),
            }
        }
        self.resolve_pending();
        if self.errors.is_empty() {
            self.design.check_references()?;
            Ok(self.design)
        } else {
            Err(Error::parse_error(self.errors.join("\n")))
        }
    }

    fn error<S: AsRef<str>>(&mut self, exp: &Exp, msg: S) {
        self.errors.push(format!("line {}: {}", exp.line, msg.as_ref()));
    }

    fn int(&mut self, exp: Option<&Exp>, what: &str, ctx: &Exp) -> Option<i64> {
        match exp.and_then(Exp::atom).and_then(|a| a.parse::<i64>().ok()) {
            Some(v) => Some(v),
            None => {
                self.error(ctx, format!("expected an integer {what} in {}", ctx.describe()));
                None
            }
        }
    }

    fn id(&mut self, exp: Option<&Exp>, what: &str, ctx: &Exp) -> Option<i32> {
        let v = self.int(exp, what, ctx)?;
        match i32::try_from(v) {
            Ok(id) => Some(id),
            Err(_) => {
                self.error(ctx, format!("{what} {v} is out of range"));
                None
            }
        }
    }

    /// Ids of a list like `(1 2 3)`.
    fn id_list(&mut self, exp: Option<&Exp>, what: &str, ctx: &Exp) -> Vec<i32> {
        let Some(list) = exp.filter(|e| e.is_list()) else {
            self.error(ctx, format!("expected a list of {what} in {}", ctx.describe()));
            return Vec::new();
        };
        list.items()
            .iter()
            .filter_map(|e| self.id(Some(e), what, ctx))
            .collect()
    }

    fn build_params(&mut self, exp: &Exp) -> ResourceParams {
        let mut params = ResourceParams::new();
        for entry in exp.items().iter().skip(1) {
            let Some(key) = entry.items().first().and_then(Exp::atom) else {
                self.error(entry, "malformed parameter");
                continue;
            };
            let mut values = Vec::new();
            for v in &entry.items()[1..] {
                match v.atom() {
                    Some(s) => values.push(s.to_string()),
                    None => self.error(v, format!("malformed value of parameter `{key}'")),
                }
            }
            params.set_values(key, values);
        }
        params
    }

    fn build_value_type(&mut self, exp: &Exp) -> Option<NumericWidth> {
        let signed = match exp.head() {
            Some("UINT") => false,
            Some("INT") => true,
            _ => {
                self.error(exp, format!("bad value type {}", exp.describe()));
                return None;
            }
        };
        let width = self.int(exp.items().get(1), "width", exp)?;
        if !(0..=ir::numeric::MAX_WIDTH as i64).contains(&width) {
            self.error(exp, format!("width {width} is out of range"));
            return None;
        }
        Some(NumericWidth::new(signed, width as u32))
    }

    fn build_value_types(&mut self, exp: Option<&Exp>, ctx: &Exp) -> Vec<NumericWidth> {
        let Some(list) = exp.filter(|e| e.is_list()) else {
            self.error(ctx, format!("expected a list of value types in {}", ctx.describe()));
            return Vec::new();
        };
        list.items()
            .iter()
            .filter_map(|e| self.build_value_type(e))
            .collect()
    }

    fn build_array_image(&mut self, exp: &Exp) {
        let items = exp.items();
        let Some(id) = self.id(items.get(1), "image id", exp) else {
            return;
        };
        let name = items.get(2).and_then(Exp::atom).unwrap_or("").to_string();
        let mut values = Vec::new();
        for v in items.get(3).map(Exp::items).unwrap_or(&[]) {
            match v.atom().and_then(|a| a.parse::<u64>().ok()) {
                Some(n) => values.push(n),
                None => self.error(v, format!("bad image value {}", v.describe())),
            }
        }
        let idx = self.design.add_array_image(name, values);
        self.design.array_images[idx].id = id;
        if self.images.insert(id, idx).is_some() {
            self.error(exp, format!("duplicated array image {id}"));
        }
    }

    fn platform_node(exp: &Exp) -> PlatformNode {
        match exp.atom() {
            Some(a) => PlatformNode::atom(a),
            None => PlatformNode::List(exp.items().iter().map(Self::platform_node).collect()),
        }
    }

    fn build_platform(&mut self, exp: &Exp) {
        let items = exp.items();
        let name = items.get(1).and_then(Exp::atom).unwrap_or("").to_string();
        let mut platform = Platform::new(name);
        for def in items.iter().skip(2) {
            if def.head() != Some("DEF") {
                self.error(def, format!("expected (DEF ...), got {}", def.describe()));
                continue;
            }
            let find = |head: &str| {
                def.items()
                    .iter()
                    .find(|e| e.head() == Some(head))
                    .map(|e| PlatformNode::List(e.items()[1..].iter().map(Self::platform_node).collect()))
            };
            match (find("COND"), find("VALUE")) {
                (Some(condition), Some(value)) => {
                    platform.definitions.push(ir::Definition { condition, value })
                }
                _ => self.error(def, "DEF needs a COND and a VALUE"),
            }
        }
        self.design.platforms.push(platform);
    }

    fn build_module(&mut self, exp: &Exp) {
        let items = exp.items();
        let Some(id) = self.id(items.get(1), "module id", exp) else {
            return;
        };
        let Some(name) = items.get(2).and_then(Exp::atom) else {
            self.error(exp, "module without a name");
            return;
        };
        let module = self.design.add_module(name);
        self.design.modules[module].id = id;
        if self.modules.insert(id, module).is_some() {
            self.error(exp, format!("duplicated module id {id}"));
        }
        for e in items.iter().skip(3) {
            match e.head() {
                Some("PARAMS") => {
                    let params = self.build_params(e);
                    self.design.modules[module].params.merge(&params);
                }
                Some("PARENT") => {
                    if let Some(parent) = self.id(e.items().get(1), "parent id", e) {
                        self.pending.push(Pending::Parent {
                            module,
                            parent,
                            line: e.line,
                        });
                    }
                }
                Some("TABLE") => self.build_table(module, id, e),
                _ => self.error(e, format!("unexpected {} in module `{name}'", e.describe())),
            }
        }
    }

    fn build_table(&mut self, module: ModuleIdx, module_id: i32, exp: &Exp) {
        let items = exp.items();
        let Some(id) = self.id(items.get(1), "table id", exp) else {
            return;
        };
        let table = self.design.add_table(module);
        self.design.tables[table].id = id;
        if self.tables.insert((module_id, id), table).is_some() {
            self.error(exp, format!("duplicated table id {id}"));
        }
        let mut scope = TableScope::default();
        let forms = &items[2..];
        // Registers, resources and states first so insns may refer forward.
        for e in forms {
            match e.head() {
                Some("NAME") => {
                    self.design.tables[table].name =
                        e.items().get(1).and_then(Exp::atom).map(str::to_string);
                }
                Some("REGISTERS") => {
                    for r in &e.items()[1..] {
                        self.build_register(table, &mut scope, r);
                    }
                }
                Some("RESOURCES") => {
                    for r in &e.items()[1..] {
                        self.build_resource(table, module_id, id, &mut scope, r);
                    }
                }
                Some("STATE") => {
                    if let Some(sid) = self.id(e.items().get(1), "state id", e) {
                        let st = self.design.add_state(table);
                        self.design.states[st].id = sid;
                        if scope.states.insert(sid, st).is_some() {
                            self.error(e, format!("duplicated state id {sid}"));
                        }
                    }
                }
                Some("INITIAL") => {}
                _ => self.error(e, format!("unexpected {} in table {id}", e.describe())),
            }
        }
        let mut deps = Vec::new();
        for e in forms {
            match e.head() {
                Some("INITIAL") => {
                    if let Some(sid) = self.id(e.items().get(1), "state id", e) {
                        match scope.states.get(&sid) {
                            Some(st) => self.design.set_initial_state(table, *st),
                            None => self.error(e, format!("unknown initial state {sid}")),
                        }
                    }
                }
                Some("STATE") => self.build_state(&mut scope, e, &mut deps),
                _ => {}
            }
        }
        for (insn, ids, line_exp) in deps {
            for d in ids {
                match scope.insns.get(&d) {
                    Some(dep) => self.design.insns[insn].depending_insns.push(*dep),
                    None => self.error(&line_exp, format!("unknown insn {d} in DEPS")),
                }
            }
        }
    }

    fn build_register(&mut self, table: TableIdx, scope: &mut TableScope, exp: &Exp) {
        if exp.head() != Some("REGISTER") {
            self.error(exp, format!("expected (REGISTER ...), got {}", exp.describe()));
            return;
        }
        let items = exp.items();
        let Some(id) = self.id(items.get(1), "register id", exp) else {
            return;
        };
        let name = items.get(2).and_then(Exp::atom).unwrap_or("").to_string();
        let kind = match items.get(3).and_then(Exp::atom) {
            Some("REG") => RegisterKind::Normal,
            Some("CONST") => RegisterKind::Const,
            Some("WIRE") => RegisterKind::StateLocal,
            _ => {
                self.error(exp, format!("register {id} has no kind (REG, CONST or WIRE)"));
                return;
            }
        };
        let Some(ty) = items.get(4).and_then(|e| self.build_value_type(e)) else {
            return;
        };
        let reg = self.design.add_register(table, name, ty, kind);
        self.design.registers[reg].id = id;
        if let Some(v) = items.get(5).and_then(Exp::atom) {
            match Numeric::parse(v, ty) {
                Some(n) => self.design.registers[reg].initial_value = Some(n),
                None => self.error(exp, format!("bad value `{v}' for register {id}")),
            }
        } else if kind == RegisterKind::Const {
            self.error(exp, format!("constant {id} has no value"));
        }
        if scope.registers.insert(id, reg).is_some() {
            self.error(exp, format!("duplicated register id {id}"));
        }
    }

    fn build_resource(
        &mut self,
        table: TableIdx,
        module_id: i32,
        table_id: i32,
        scope: &mut TableScope,
        exp: &Exp,
    ) {
        if exp.head() != Some("RESOURCE") {
            self.error(exp, format!("expected (RESOURCE ...), got {}", exp.describe()));
            return;
        }
        let items = exp.items();
        let Some(id) = self.id(items.get(1), "resource id", exp) else {
            return;
        };
        let Some(class_name) = items.get(2).and_then(Exp::atom) else {
            self.error(exp, format!("resource {id} has no class"));
            return;
        };
        let class = match self.design.find_class(class_name) {
            Ok(c) => c,
            Err(e) => {
                self.error(exp, e.to_string());
                return;
            }
        };
        let inputs = self.build_value_types(items.get(3), exp);
        let outputs = self.build_value_types(items.get(4), exp);
        let res = self.design.add_resource(table, class);
        {
            let r = &mut self.design.resources[res];
            r.id = id;
            r.input_types = inputs;
            r.output_types = outputs;
        }
        for e in items.iter().skip(5) {
            match e.head() {
                Some("PARAMS") => {
                    let params = self.build_params(e);
                    self.design.resources[res].params.merge(&params);
                }
                Some("ARRAY") => self.build_array(res, e),
                Some("CALLEE-TABLE") => {
                    let module = self.id(e.items().get(1), "module id", e);
                    let table = self.id(e.items().get(2), "table id", e);
                    if let (Some(module), Some(table)) = (module, table) {
                        self.pending.push(Pending::Callee {
                            res,
                            module,
                            table,
                            line: e.line,
                        });
                    }
                }
                Some("PARENT-RESOURCE") => {
                    let module = self.id(e.items().get(1), "module id", e);
                    let table = self.id(e.items().get(2), "table id", e);
                    let resource = self.id(e.items().get(3), "resource id", e);
                    if let (Some(module), Some(table), Some(resource)) = (module, table, resource) {
                        self.pending.push(Pending::ParentResource {
                            res,
                            module,
                            table,
                            resource,
                            line: e.line,
                        });
                    }
                }
                _ => self.error(e, format!("unexpected {} in resource {id}", e.describe())),
            }
        }
        if scope.resources.insert(id, res).is_some() {
            self.error(exp, format!("duplicated resource id {id}"));
        }
        self.resources.insert((module_id, table_id, id), res);
    }

    fn build_array(&mut self, res: ResourceIdx, exp: &Exp) {
        let items = exp.items();
        let Some(address_width) = self.int(items.get(1), "address width", exp) else {
            return;
        };
        if !(0..=ir::MAX_ADDRESS_WIDTH as i64).contains(&address_width) {
            self.error(exp, format!("address width {address_width} is out of range"));
            return;
        }
        let Some(data_type) = items.get(2).and_then(|e| self.build_value_type(e)) else {
            return;
        };
        let is_external = match items.get(3).and_then(Exp::atom) {
            Some("EXTERNAL") => true,
            Some("INTERNAL") => false,
            _ => {
                self.error(exp, "array must be EXTERNAL or INTERNAL");
                return;
            }
        };
        let is_ram = match items.get(4).and_then(Exp::atom) {
            Some("RAM") => true,
            Some("ROM") => false,
            _ => {
                self.error(exp, "array must be RAM or ROM");
                return;
            }
        };
        if let Some(image) = items.get(5) {
            if let Some(image) = self.id(Some(image), "image id", exp) {
                self.pending.push(Pending::Image {
                    res,
                    image,
                    line: exp.line,
                });
            }
        }
        self.design.set_array(
            res,
            Array {
                address_width: address_width as u32,
                data_type,
                is_external,
                is_ram,
                image: None,
            },
        );
    }

    fn build_state(
        &mut self,
        scope: &mut TableScope,
        exp: &Exp,
        deps: &mut Vec<(InsnIdx, Vec<i32>, Exp)>,
    ) {
        let items = exp.items();
        let Some(st) = items
            .get(1)
            .and_then(Exp::atom)
            .and_then(|a| a.parse::<i32>().ok())
            .and_then(|sid| scope.states.get(&sid).copied())
        else {
            return;
        };
        for e in items.iter().skip(2) {
            match e.head() {
                Some("PROFILE") => {
                    let raw = self.int(e.items().get(1), "raw count", e);
                    let normalized = self.int(e.items().get(2), "normalized count", e);
                    if let (Some(raw_count), Some(normalized_count)) = (raw, normalized) {
                        self.design.states[st].profile = ir::Profile {
                            valid: true,
                            raw_count,
                            normalized_count,
                        };
                    }
                }
                Some("INSN") => {
                    if let Some((insn, d)) = self.build_insn(scope, e) {
                        self.design.push_insn(st, insn);
                        if !d.is_empty() {
                            deps.push((insn, d, e.clone()));
                        }
                    }
                }
                _ => self.error(e, format!("unexpected {} in state", e.describe())),
            }
        }
    }

    fn build_insn(&mut self, scope: &mut TableScope, exp: &Exp) -> Option<(InsnIdx, Vec<i32>)> {
        let items = exp.items();
        let id = self.id(items.get(1), "insn id", exp)?;
        let class = items.get(2).and_then(Exp::atom).unwrap_or("").to_string();
        let res_id = self.id(items.get(3), "resource id", exp)?;
        let Some(res) = scope.resources.get(&res_id).copied() else {
            self.error(exp, format!("insn {id} uses unknown resource {res_id}"));
            return None;
        };
        if self.design.class_name(res) != class {
            self.error(
                exp,
                format!(
                    "insn {id} says `{class}' but resource {res_id} is `{}'",
                    self.design.class_name(res)
                ),
            );
        }
        let operand = match items.get(4) {
            Some(e) if e.is_list() => e
                .items()
                .first()
                .and_then(Exp::atom)
                .unwrap_or("")
                .to_string(),
            _ => {
                self.error(exp, format!("insn {id} needs an operand list"));
                String::new()
            }
        };
        let targets = self.id_list(items.get(5), "target states", exp);
        let inputs = self.id_list(items.get(6), "input registers", exp);
        let outputs = self.id_list(items.get(7), "output registers", exp);
        let deps = match items.get(8) {
            Some(e) if e.head() == Some("DEPS") => e.items()[1..]
                .iter()
                .filter_map(|d| self.id(Some(d), "insn id", exp))
                .collect(),
            Some(e) => {
                self.error(e, format!("unexpected {} in insn {id}", e.describe()));
                Vec::new()
            }
            None => Vec::new(),
        };

        let insn = self.design.add_insn(res);
        let lookup_regs = |ids: Vec<i32>, this: &mut Self| {
            ids.into_iter()
                .filter_map(|r| match scope.registers.get(&r) {
                    Some(reg) => Some(*reg),
                    None => {
                        this.error(exp, format!("insn {id} uses unknown register {r}"));
                        None
                    }
                })
                .collect::<Vec<_>>()
        };
        let inputs = lookup_regs(inputs, self);
        let outputs = lookup_regs(outputs, self);
        let mut target_states = Vec::new();
        for t in targets {
            match scope.states.get(&t) {
                Some(st) => target_states.push(*st),
                None => self.error(exp, format!("insn {id} jumps to unknown state {t}")),
            }
        }
        let i = &mut self.design.insns[insn];
        i.id = id;
        i.operand = operand;
        i.inputs.extend(inputs);
        i.outputs.extend(outputs);
        i.target_states.extend(target_states);
        if scope.insns.insert(id, insn).is_some() {
            self.error(exp, format!("duplicated insn id {id}"));
        }
        Some((insn, deps))
    }

    fn resolve_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for p in pending {
            match p {
                Pending::Parent { module, parent, line } => match self.modules.get(&parent) {
                    Some(pm) => {
                        if let Err(e) = self.design.set_parent_module(module, *pm) {
                            self.errors.push(format!("line {line}: {}", e.message()));
                        }
                    }
                    None => self.errors.push(format!("line {line}: unknown parent module {parent}")),
                },
                Pending::Callee { res, module, table, line } => match self.tables.get(&(module, table)) {
                    Some(t) => self.design.set_callee_table(res, *t),
                    None => self
                        .errors
                        .push(format!("line {line}: unknown callee table {module}/{table}")),
                },
                Pending::ParentResource { res, module, table, resource, line } => {
                    match self.resources.get(&(module, table, resource)) {
                        Some(p) => self.design.set_parent_resource(res, *p),
                        None => self.errors.push(format!(
                            "line {line}: unknown parent resource {module}/{table}/{resource}"
                        )),
                    }
                }
                Pending::Image { res, image, line } => match self.images.get(&image) {
                    Some(img) => {
                        if let Some(array) = self.design.resources[res].array.as_mut() {
                            array.image = Some(*img);
                        }
                    }
                    None => self.errors.push(format!("line {line}: unknown array image {image}")),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"
(PARAMS (RESET-POLARITY true))
(ARRAY-IMAGE 1 init (1 2 3))
(PLATFORM generic (DEF (COND (CLASS add)) (VALUE (DELAY 800))))
(MODULE 2 sub
  (PARENT 1)
  (TABLE 1
    (REGISTERS)
    (RESOURCES
      (RESOURCE 1 array () () (PARAMS) (ARRAY 4 (UINT 8) INTERNAL ROM 1)))))
(MODULE 1 top
  (PARAMS (RESET-NAME reset))
  (TABLE 1 (NAME main)
    (REGISTERS
      (REGISTER 1 count REG (UINT 32) 0)
      (REGISTER 2 "" CONST (UINT 32) 1))
    (RESOURCES
      (RESOURCE 1 tr () () (PARAMS))
      (RESOURCE 2 add ((UINT 32) (UINT 32)) ((UINT 32)) (PARAMS)))
    (INITIAL 1)
    (STATE 1
      (PROFILE 10 2)
      (INSN 1 add 2 () () (1 2) (1))
      (INSN 2 tr 1 () (1) () () (DEPS 1)))))
"#;

    #[test]
    fn builds_counter() {
        let d = DesignBuilder::read_str(COUNTER).unwrap();
        assert!(d.params.reset_polarity());
        let top = d.find_module("top").unwrap();
        let sub = d.find_module("sub").unwrap();
        assert_eq!(d.modules[sub].parent, Some(top));
        assert_eq!(d.modules[top].params.reset_name(), "reset");
        let t = d.modules[top].tables[0];
        assert_eq!(d.tables[t].name.as_deref(), Some("main"));
        let st = d.tables[t].initial_state.unwrap();
        assert!(d.states[st].profile.valid);
        let insns = &d.states[st].insns;
        assert_eq!(insns.len(), 2);
        assert_eq!(d.insns[insns[1]].depending_insns, vec![insns[0]]);
        assert_eq!(d.insns[insns[1]].target_states.as_slice(), &[st]);
        let c = d.insns[insns[0]].inputs[1];
        assert_eq!(d.registers[c].initial_value.unwrap().value0(), 1);
        let st_sub = d.modules[sub].tables[0];
        let arr = d.tables[st_sub].resources[0];
        assert!(d.resources[arr].array.as_ref().unwrap().image.is_some());
        assert_eq!(d.platforms[0].lookup_delay("add", 32), Some(800));
    }

    #[test]
    fn reports_all_errors() {
        let err = DesignBuilder::read_str(
            r#"
(MODULE 1 top
  (TABLE 1
    (REGISTERS)
    (RESOURCES (RESOURCE 1 frobnicate () () (PARAMS)))
    (STATE 1 (INSN 1 tr 9 () (7) () ()))))
(BOGUS)
"#,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("frobnicate"), "{msg}");
        assert!(msg.contains("unknown resource 9"), "{msg}");
        assert!(msg.contains("line 7: unknown top level form (BOGUS ...)"), "{msg}");
    }

    #[test]
    fn dangling_parent() {
        let err = DesignBuilder::read_str("(MODULE 1 top (PARENT 4))").unwrap_err();
        assert!(err.to_string().contains("unknown parent module 4"));
    }

    #[test]
    fn ids_out_of_range() {
        let err = DesignBuilder::read_str("(MODULE 1 top)\n(MODULE 4294967297 sub)").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("module id 4294967297 is out of range"), "{msg}");
        assert!(!msg.contains("duplicated"), "{msg}");
    }

    #[test]
    fn array_address_width_range() {
        for width in ["64", "-1"] {
            let src = format!(
                "(MODULE 1 top (TABLE 1 (REGISTERS) (RESOURCES \
                 (RESOURCE 1 array () () (PARAMS) (ARRAY {width} (UINT 8) INTERNAL RAM)))))"
            );
            let err = DesignBuilder::read_str(&src).unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains(&format!("address width {width} is out of range")), "{msg}");
        }
    }
}
