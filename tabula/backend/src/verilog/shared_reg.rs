//! Registers owned by one table and read or written by others.
//!
//! Accessors may also synchronize through the register. A writer insn with
//! operand `notify` pulses `<base>_notify` for one cycle after its write, and
//! a reader insn with `wait_notify` waits for that pulse. With
//! `put_mailbox` and `get_mailbox` the register works as a one-entry
//! mailbox: a put waits until the mailbox is empty, a get waits until it is
//! full. Puts and gets are granted with a one cycle ack, lower accessor
//! indices first.
use super::insn::{const_literal_i64, multi_cycle_state};
use super::ports::width_spec;
use super::table::{BODY, EVERY_CYCLE, TableWriter};
use itertools::Itertools;
use std::fmt::Write;
use tabula_ir::{self as ir, operand, resource_class as rc, util};
use tabula_utils::{Error, TabulaResult};

/// `shared_reg_<module>_<table>_<resource>`
pub fn base_name(design: &ir::Design, res: ir::ResourceIdx) -> String {
    let r = &design.resources[res];
    let t = &design.tables[r.table];
    format!(
        "shared_reg_{}_{}_{}",
        design.modules[t.module].id, t.id, r.id
    )
}

/// Name of the register itself. An output port name is appended.
pub fn reg_name(design: &ir::Design, res: ir::ResourceIdx) -> String {
    let base = base_name(design, res);
    match design.resources[res].params.ext_output_port() {
        Some((port, _)) if !port.is_empty() => format!("{base}_{port}"),
        _ => base,
    }
}

pub fn width(design: &ir::Design, res: ir::ResourceIdx) -> u32 {
    let r = &design.resources[res];
    if let Some((_, w)) = r.params.ext_output_port() {
        return w.max(0) as u32;
    }
    let w = r.params.width();
    if w > 0 {
        return w as u32;
    }
    r.output_types.first().map_or(32, |t| t.width())
}

/// Prefix of the signals between an accessor and the register:
/// `<base>_<module>_<table>_<res>`.
fn accessor_name(design: &ir::Design, reg: ir::ResourceIdx, acc: ir::ResourceIdx) -> String {
    let a = &design.resources[acc];
    let t = &design.tables[a.table];
    format!(
        "{}_{}_{}_{}",
        base_name(design, reg),
        design.modules[t.module].id,
        t.id,
        a.id
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Plain,
    Notify,
    Mailbox,
}

fn access_of(design: &ir::Design, insn: ir::InsnIdx) -> Access {
    let is_writer = design.insn_class(insn) == rc::SHARED_REG_WRITER;
    match (is_writer, design.insns[insn].operand.as_str()) {
        (true, operand::NOTIFY) | (false, operand::WAIT_NOTIFY) => Access::Notify,
        (true, operand::PUT_MAILBOX) | (false, operand::GET_MAILBOX) => Access::Mailbox,
        _ => Access::Plain,
    }
}

/// True if any insn of `acc` accesses the register the `access` way.
fn uses(design: &ir::Design, acc: ir::ResourceIdx, access: Access) -> bool {
    util::insns_by_resource(design, acc)
        .into_iter()
        .any(|i| access_of(design, i) == access)
}

/// Condition under which the writer updates the register.
fn write_enable(design: &ir::Design, reg: ir::ResourceIdx, writer: ir::ResourceIdx) -> String {
    let p = accessor_name(design, reg, writer);
    let mut terms = vec![format!("{p}_wen")];
    if uses(design, writer, Access::Notify) {
        terms.push(format!("{p}_notify"));
    }
    if uses(design, writer, Access::Mailbox) {
        terms.push(format!("{p}_put_ack"));
    }
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        format!("({})", terms.join(" || "))
    }
}

fn any_of(signals: &[String]) -> String {
    if signals.is_empty() {
        "0".to_string()
    } else {
        signals.join(" || ")
    }
}

impl TableWriter<'_, '_> {
    fn shared_reg_parent(&self, res: ir::ResourceIdx) -> TabulaResult<ir::ResourceIdx> {
        let r = &self.design.resources[res];
        r.parent_resource
            .filter(|p| self.design.class_name(*p) == rc::SHARED_REG)
            .ok_or_else(|| {
                Error::malformed_design(format!(
                    "{}: accessor {} has no shared register",
                    self.design.table_label(self.table),
                    r.id
                ))
            })
    }

    fn needs_arbitration(&self, res: ir::ResourceIdx) -> bool {
        !self.em.conn.shared_reg_writers(res).is_empty()
            || self.design.resources[res].params.default_value().is_some()
    }

    /// Sub state register of an accessor whose insns wait.
    fn declare_sub_state(&mut self, res: ir::ResourceIdx) -> TabulaResult<String> {
        let mc = multi_cycle_state(self.design, res);
        writeln!(self.s.resources, "  reg [1:0] {mc};")?;
        writeln!(self.s.initials, "{EVERY_CYCLE}{mc} <= 0;")?;
        Ok(mc)
    }

    /// A one bit request register of an accessor, routed to the register's
    /// module. It is raised while a waiting insn runs and lowered on `ack`.
    fn accessor_request(
        &mut self,
        res: ir::ResourceIdx,
        req: &str,
        ack: &str,
        access: Access,
    ) -> TabulaResult<()> {
        let design = self.design;
        let reg = self.shared_reg_parent(res)?;
        let mc = multi_cycle_state(design, res);
        writeln!(self.s.resources, "  reg {req};")?;
        writeln!(self.s.initials, "{EVERY_CYCLE}{req} <= 0;")?;
        self.em
            .route(req, 0, self.module, &[design.resource_module(reg)], true)?;
        let states = self
            .callers(res)
            .into_iter()
            .filter(|(_, i)| access_of(design, *i) == access)
            .map(|(st, _)| st)
            .collect::<Vec<_>>();
        let active = self.join_states(&states, Some(&mc));
        writeln!(
            self.s.state_output,
            "{EVERY_CYCLE}{req} <= ({active}) && !{ack};"
        )?;
        Ok(())
    }

    pub fn build_shared_reg(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let design = self.design;
        let params = &design.resources[res].params;
        let name = reg_name(design, res);
        let base = base_name(design, res);
        let w = width(design, res);
        let readers = self.em.conn.shared_reg_readers(res).to_vec();
        let writers = self.em.conn.shared_reg_writers(res).to_vec();
        let accessors = readers.iter().chain(&writers).copied().collect::<Vec<_>>();
        let use_notify = accessors.iter().any(|a| uses(design, *a, Access::Notify));
        let use_mailbox = accessors.iter().any(|a| uses(design, *a, Access::Mailbox));

        if use_notify || use_mailbox {
            let mut features = String::new();
            if use_notify {
                features.push_str(" use-notify");
            }
            if use_mailbox {
                features.push_str(" use-mailbox");
            }
            writeln!(self.s.registers, "  // shared-reg{features}")?;
        }
        writeln!(self.s.registers, "  reg {}{name};", width_spec(w))?;
        let reset = params
            .initial_value()
            .or(params.default_value())
            .unwrap_or(0);
        writeln!(
            self.s.initials,
            "{EVERY_CYCLE}{name} <= {};",
            const_literal_i64(reset, w)
        )?;

        if !readers.is_empty() {
            let to = readers
                .iter()
                .map(|r| design.resource_module(*r))
                .unique()
                .collect::<Vec<_>>();
            let rn = format!("{base}_r");
            self.em.route(&rn, w, self.module, &to, false)?;
            writeln!(self.s.resource_values, "  assign {rn} = {name};")?;
        }
        if use_notify {
            self.build_notifier(res, &readers, &writers)?;
        }
        if use_mailbox {
            self.build_mailbox(res, &readers, &writers)?;
        }

        if !self.needs_arbitration(res) {
            return Ok(());
        }
        let fallback = match params.default_value() {
            Some(v) => const_literal_i64(v, w),
            None => name.clone(),
        };
        let own = self
            .callers(res)
            .into_iter()
            .filter_map(|(st, i)| {
                design.insns[i]
                    .inputs
                    .first()
                    .map(|r| (st, self.reg_value(*r)))
            })
            .collect::<Vec<_>>();
        let value = if writers.is_empty() {
            fallback
        } else {
            let wen = format!("{base}_wen");
            let wd = format!("{base}_w");
            writeln!(self.s.resources, "  wire {wen};")?;
            writeln!(self.s.resources, "  wire {}{wd};", width_spec(w))?;
            let enables = writers
                .iter()
                .map(|wr| {
                    (
                        write_enable(design, res, *wr),
                        accessor_name(design, res, *wr),
                    )
                })
                .collect::<Vec<_>>();
            let en = enables.iter().map(|(e, _)| e).join(" || ");
            let mut data = format!("{}_w", enables[enables.len() - 1].1);
            for (e, n) in enables.iter().rev().skip(1) {
                data = format!("{e} ? {n}_w : {data}");
            }
            writeln!(self.s.resource_values, "  assign {wen} = {en};")?;
            writeln!(self.s.resource_values, "  assign {wd} = {data};")?;
            format!("({wen}) ? {wd} : ({fallback})")
        };
        let v = self.mux_by_state(&own, Some(&value));
        writeln!(self.s.state_output, "{EVERY_CYCLE}{name} <= {v};")?;
        Ok(())
    }

    /// `<base>_notify` is high in the cycle after a notifying write.
    fn build_notifier(
        &mut self,
        res: ir::ResourceIdx,
        readers: &[ir::ResourceIdx],
        writers: &[ir::ResourceIdx],
    ) -> TabulaResult<()> {
        let design = self.design;
        let notify = format!("{}_notify", base_name(design, res));
        writeln!(self.s.resources, "  reg {notify};")?;
        writeln!(self.s.initials, "{EVERY_CYCLE}{notify} <= 0;")?;
        let sources = writers
            .iter()
            .filter(|wr| uses(design, **wr, Access::Notify))
            .map(|wr| format!("{}_notify", accessor_name(design, res, *wr)))
            .collect::<Vec<_>>();
        writeln!(
            self.s.state_output,
            "{EVERY_CYCLE}{notify} <= {};",
            any_of(&sources)
        )?;
        let to = readers
            .iter()
            .filter(|r| uses(design, **r, Access::Notify))
            .map(|r| design.resource_module(*r))
            .unique()
            .collect::<Vec<_>>();
        if !to.is_empty() {
            self.em.route(&notify, 0, self.module, &to, true)?;
        }
        Ok(())
    }

    /// `<base>_mailbox` is set by a granted put and cleared by a granted get.
    fn build_mailbox(
        &mut self,
        res: ir::ResourceIdx,
        readers: &[ir::ResourceIdx],
        writers: &[ir::ResourceIdx],
    ) -> TabulaResult<()> {
        let design = self.design;
        let mailbox = format!("{}_mailbox", base_name(design, res));
        writeln!(self.s.resources, "  reg {mailbox};")?;
        writeln!(self.s.initials, "{EVERY_CYCLE}{mailbox} <= 0;")?;
        let mailbox_users = |accs: &[ir::ResourceIdx]| {
            accs.iter()
                .copied()
                .filter(|a| uses(design, *a, Access::Mailbox))
                .collect::<Vec<_>>()
        };
        let putters = mailbox_users(writers);
        let getters = mailbox_users(readers);
        let put_acks = self.grant(res, &putters, "put", &format!("!{mailbox}"))?;
        let get_acks = self.grant(res, &getters, "get", &mailbox)?;
        let so = &mut self.s.state_output;
        writeln!(so, "{EVERY_CYCLE}if ({mailbox}) begin")?;
        writeln!(so, "{EVERY_CYCLE}  {mailbox} <= !({});", any_of(&get_acks))?;
        writeln!(so, "{EVERY_CYCLE}end else begin")?;
        writeln!(so, "{EVERY_CYCLE}  {mailbox} <= {};", any_of(&put_acks))?;
        writeln!(so, "{EVERY_CYCLE}end")?;
        Ok(())
    }

    /// Ack registers for the `<what>_req` of each accessor, granted while
    /// `ready` holds and no other ack of the same kind is high. Returns the
    /// ack names.
    fn grant(
        &mut self,
        res: ir::ResourceIdx,
        accessors: &[ir::ResourceIdx],
        what: &str,
        ready: &str,
    ) -> TabulaResult<Vec<String>> {
        let design = self.design;
        let names = accessors
            .iter()
            .map(|a| accessor_name(design, res, *a))
            .collect::<Vec<_>>();
        let acks = names
            .iter()
            .map(|n| format!("{n}_{what}_ack"))
            .collect::<Vec<_>>();
        let busy = any_of(&acks);
        for (k, (acc, n)) in accessors.iter().zip(&names).enumerate() {
            let ack = &acks[k];
            writeln!(self.s.resources, "  reg {ack};")?;
            writeln!(self.s.initials, "{EVERY_CYCLE}{ack} <= 0;")?;
            let higher = names[..k]
                .iter()
                .map(|h| format!(" && !{h}_{what}_req"))
                .join("");
            writeln!(
                self.s.state_output,
                "{EVERY_CYCLE}{ack} <= {n}_{what}_req && {ready} && !({busy}){higher};"
            )?;
            let acc_module = design.resource_module(*acc);
            if acc_module != self.module {
                self.em.route(ack, 0, self.module, &[acc_module], true)?;
            }
        }
        Ok(acks)
    }

    /// Drives `_w`, `_wen` and the signals of notifying and mailbox writes
    /// toward the register's module.
    pub fn build_shared_reg_writer(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let design = self.design;
        let reg = self.shared_reg_parent(res)?;
        let prefix = accessor_name(design, reg, res);
        let w = width(design, reg);
        let reg_module = design.resource_module(reg);
        let wd = format!("{prefix}_w");
        let wen = format!("{prefix}_wen");
        self.em.route(&wd, w, self.module, &[reg_module], false)?;
        self.em.route(&wen, 0, self.module, &[reg_module], false)?;
        let callers = self.callers(res);
        let values = callers
            .iter()
            .filter_map(|(st, i)| {
                design.insns[*i]
                    .inputs
                    .first()
                    .map(|r| (*st, self.reg_value(*r)))
            })
            .collect::<Vec<_>>();
        let states_of = |access: Access| {
            callers
                .iter()
                .filter(|(_, i)| access_of(design, *i) == access)
                .map(|(st, _)| *st)
                .collect::<Vec<_>>()
        };
        let data = self.mux_by_state(&values, Some("0"));
        let en = self.join_states(&states_of(Access::Plain), None);
        writeln!(self.s.resource_values, "  assign {wd} = {data};")?;
        writeln!(self.s.resource_values, "  assign {wen} = {en};")?;
        if uses(design, res, Access::Notify) {
            let notify = format!("{prefix}_notify");
            self.em.route(&notify, 0, self.module, &[reg_module], false)?;
            let en = self.join_states(&states_of(Access::Notify), None);
            writeln!(self.s.resource_values, "  assign {notify} = {en};")?;
        }
        if uses(design, res, Access::Mailbox) {
            self.declare_sub_state(res)?;
            let req = format!("{prefix}_put_req");
            let ack = format!("{prefix}_put_ack");
            self.accessor_request(res, &req, &ack, Access::Mailbox)?;
        }
        Ok(())
    }

    /// Request and sub state registers of a reader whose insns wait.
    pub fn build_shared_reg_reader(&mut self, res: ir::ResourceIdx) -> TabulaResult<()> {
        let design = self.design;
        let notify = uses(design, res, Access::Notify);
        let mailbox = uses(design, res, Access::Mailbox);
        if notify || mailbox {
            self.declare_sub_state(res)?;
        }
        if mailbox {
            let reg = self.shared_reg_parent(res)?;
            let prefix = accessor_name(design, reg, res);
            let req = format!("{prefix}_get_req");
            let ack = format!("{prefix}_get_ack");
            self.accessor_request(res, &req, &ack, Access::Mailbox)?;
        }
        Ok(())
    }

    /// Waits in `st` until `cond`, then stores `value` to the insn's output.
    fn read_when(
        &mut self,
        st: ir::StateIdx,
        insn: ir::InsnIdx,
        cond: &str,
        value: &str,
    ) -> TabulaResult<()> {
        let design = self.design;
        let i = &design.insns[insn];
        let mc = multi_cycle_state(design, i.resource);
        let out = match i.outputs.first() {
            Some(r) if design.registers[*r].is_state_local() => {
                return Err(Error::unsupported(format!(
                    "{}: insn {} waits for a shared register but writes a wire",
                    design.table_label(self.table),
                    i.id
                )));
            }
            Some(r) => Some(self.reg_value(*r)),
            None => None,
        };
        self.wait_for(st, mc.clone());
        let b = self.body(st);
        writeln!(b, "{BODY}if ({mc} == 0 && {cond}) begin")?;
        if let Some(out) = out {
            writeln!(b, "{BODY}  {out} <= {value};")?;
        }
        writeln!(b, "{BODY}  {mc} <= 3;")?;
        writeln!(b, "{BODY}end")?;
        Ok(())
    }

    pub fn shared_reg_insn(&mut self, st: ir::StateIdx, insn: ir::InsnIdx) -> TabulaResult<()> {
        let design = self.design;
        let i = &design.insns[insn];
        let res = i.resource;
        match design.class_name(res) {
            rc::SHARED_REG => {
                let name = reg_name(design, res);
                if !self.needs_arbitration(res) && i.inputs.len() == 1 {
                    let v = self.reg_value(i.inputs[0]);
                    writeln!(self.body(st), "{BODY}{name} <= {v};")?;
                }
                self.computed(st, insn, &name)
            }
            rc::SHARED_REG_READER => {
                let reg = self.shared_reg_parent(res)?;
                let base = base_name(design, reg);
                let rn = format!("{base}_r");
                match access_of(design, insn) {
                    Access::Plain => self.computed(st, insn, &rn),
                    Access::Notify => self.read_when(st, insn, &format!("{base}_notify"), &rn),
                    Access::Mailbox => {
                        let ack = format!("{}_get_ack", accessor_name(design, reg, res));
                        self.read_when(st, insn, &ack, &rn)
                    }
                }
            }
            rc::SHARED_REG_WRITER if access_of(design, insn) == Access::Mailbox => {
                let reg = self.shared_reg_parent(res)?;
                let ack = format!("{}_put_ack", accessor_name(design, reg, res));
                let mc = multi_cycle_state(design, res);
                self.wait_for(st, mc.clone());
                let b = self.body(st);
                writeln!(b, "{BODY}if ({mc} == 0 && {ack}) begin")?;
                writeln!(b, "{BODY}  {mc} <= 3;")?;
                writeln!(b, "{BODY}end")?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let class = d.find_class(rc::SHARED_REG).unwrap();
        let r = d.add_resource(t, class);
        ir::validate_ids(&mut d);
        assert_eq!(reg_name(&d, r), "shared_reg_1_1_1");
        d.resources[r].params.set_ext_output_port("led", 4);
        assert_eq!(reg_name(&d, r), "shared_reg_1_1_1_led");
        assert_eq!(base_name(&d, r), "shared_reg_1_1_1");
        assert_eq!(width(&d, r), 4);
    }

    /// `top` owns the register. A writer in `sub` puts and notifies, a
    /// reader in a second table of `top` gets and waits for notifications.
    fn mailbox_design() -> ir::Design {
        let mut d = ir::Design::new();
        let top = d.add_module("top");
        let sub = d.add_module("sub");
        d.set_parent_module(sub, top).unwrap();
        let owner = d.add_table(top);
        let rt = d.add_table(top);
        let wt = d.add_table(sub);
        let mut b = ir::Builder::new(&mut d);
        let reg = b.create_shared_reg(owner, "", 8).unwrap();

        let writer = b.create_shared_reg_writer(wt, reg).unwrap();
        let v = b.alloc_const(wt, 8, 7);
        let w1 = b.alloc_state(wt);
        let w2 = b.alloc_state(wt);
        let put = b.insert_insn(w1, writer, &[v], &[]);
        let notify = b.insert_insn(w2, writer, &[v], &[]);
        b.add_next_state(w1, w2).unwrap();
        b.add_next_state(w2, w1).unwrap();

        let reader = b.create_shared_reg_reader(rt, reg).unwrap();
        let x = b.alloc_register(rt, "x", 8);
        let r1 = b.alloc_state(rt);
        let r2 = b.alloc_state(rt);
        let get = b.insert_insn(r1, reader, &[], &[x]);
        let wait = b.insert_insn(r2, reader, &[], &[x]);
        b.add_next_state(r1, r2).unwrap();
        b.add_next_state(r2, r1).unwrap();

        d.insns[put].operand = operand::PUT_MAILBOX.to_string();
        d.insns[notify].operand = operand::NOTIFY.to_string();
        d.insns[get].operand = operand::GET_MAILBOX.to_string();
        d.insns[wait].operand = operand::WAIT_NOTIFY.to_string();
        ir::validate_ids(&mut d);
        d
    }

    #[test]
    fn mailbox_and_notifier() {
        let text = super::super::generate_verilog(&mailbox_design()).unwrap();
        let w = "shared_reg_1_1_1_2_1_1";
        let r = "shared_reg_1_1_1_1_2_1";
        assert!(text.contains("  // shared-reg use-notify use-mailbox"), "{text}");
        assert!(text.contains("  reg shared_reg_1_1_1_mailbox;"), "{text}");
        assert!(
            text.contains(&format!(
                "{w}_put_ack <= {w}_put_req && !shared_reg_1_1_1_mailbox && !({w}_put_ack);"
            )),
            "{text}"
        );
        assert!(
            text.contains(&format!(
                "{r}_get_ack <= {r}_get_req && shared_reg_1_1_1_mailbox && !({r}_get_ack);"
            )),
            "{text}"
        );
        assert!(
            text.contains(&format!("shared_reg_1_1_1_notify <= {w}_notify;")),
            "{text}"
        );
        assert!(
            text.contains(&format!(
                "assign shared_reg_1_1_1_wen = ({w}_wen || {w}_notify || {w}_put_ack);"
            )),
            "{text}"
        );
        assert!(text.contains(&format!("  input {w}_put_ack;")), "{text}");
        assert!(text.contains(&format!("  output {w}_put_req;")), "{text}");
        assert!(
            text.contains(&format!("if (mc_2_1 == 0 && {r}_get_ack) begin")),
            "{text}"
        );
        assert!(
            text.contains("if (mc_2_1 == 0 && shared_reg_1_1_1_notify) begin"),
            "{text}"
        );
        assert!(text.contains(&format!("if (mc_1_1 == 0 && {w}_put_ack) begin")), "{text}");
    }

    #[test]
    fn plain_accessors_have_no_handshake() {
        let mut d = mailbox_design();
        let insns = d.insns.keys().collect::<Vec<_>>();
        for i in insns {
            d.insns[i].operand.clear();
        }
        let text = super::super::generate_verilog(&d).unwrap();
        assert!(!text.contains("mailbox"), "{text}");
        assert!(!text.contains("notify"), "{text}");
        assert!(text.contains("assign shared_reg_1_1_1_wen = shared_reg_1_1_1_2_1_1_wen;"), "{text}");
    }
}
