//! Index of the resources that access other resources across tables.
use crate::resource_class as rc;
use crate::structure::*;
use std::collections::BTreeMap;

/// Accessors grouped by the resource they point at through
/// `parent_resource`.
#[derive(Debug, Default, Clone)]
pub struct Connection {
    shared_reg_readers: BTreeMap<ResourceIdx, Vec<ResourceIdx>>,
    shared_reg_writers: BTreeMap<ResourceIdx, Vec<ResourceIdx>>,
    shared_memory_accessors: BTreeMap<ResourceIdx, Vec<ResourceIdx>>,
    axi_ports: BTreeMap<ResourceIdx, Vec<ResourceIdx>>,
    foreign_users: BTreeMap<RegisterIdx, Vec<ResourceIdx>>,
}

impl Connection {
    pub fn build(design: &Design) -> Self {
        let mut conn = Connection::default();
        for m in design.modules.keys() {
            for t in &design.modules[m].tables {
                for res in &design.tables[*t].resources {
                    conn.add_resource(design, *t, *res);
                }
            }
        }
        conn
    }

    fn add_resource(&mut self, design: &Design, table: TableIdx, res: ResourceIdx) {
        let class = design.class_name(res);
        if class == rc::FOREIGN_REG {
            // The foreign register is named by the insns using the resource.
            for st in &design.tables[table].states {
                for insn in &design.states[*st].insns {
                    let i = &design.insns[*insn];
                    if i.resource == res {
                        for reg in &i.inputs {
                            let users = self.foreign_users.entry(*reg).or_default();
                            if !users.contains(&res) {
                                users.push(res);
                            }
                        }
                    }
                }
            }
            return;
        }
        let Some(parent) = design.resources[res].parent_resource else {
            return;
        };
        let map = match class {
            rc::SHARED_REG_READER => &mut self.shared_reg_readers,
            rc::SHARED_REG_WRITER => &mut self.shared_reg_writers,
            rc::SHARED_MEMORY_READER | rc::SHARED_MEMORY_WRITER => {
                &mut self.shared_memory_accessors
            }
            rc::AXI_MASTER_PORT | rc::AXI_SLAVE_PORT => &mut self.axi_ports,
            _ => return,
        };
        map.entry(parent).or_default().push(res);
    }

    pub fn shared_reg_readers(&self, reg: ResourceIdx) -> &[ResourceIdx] {
        self.shared_reg_readers.get(&reg).map_or(&[], Vec::as_slice)
    }

    pub fn shared_reg_writers(&self, reg: ResourceIdx) -> &[ResourceIdx] {
        self.shared_reg_writers.get(&reg).map_or(&[], Vec::as_slice)
    }

    pub fn shared_memory_accessors(&self, mem: ResourceIdx) -> &[ResourceIdx] {
        self.shared_memory_accessors.get(&mem).map_or(&[], Vec::as_slice)
    }

    pub fn axi_ports(&self, mem: ResourceIdx) -> &[ResourceIdx] {
        self.axi_ports.get(&mem).map_or(&[], Vec::as_slice)
    }

    /// `foreign-reg` resources reading `reg`.
    pub fn foreign_register_users(&self, reg: RegisterIdx) -> &[ResourceIdx] {
        self.foreign_users.get(&reg).map_or(&[], Vec::as_slice)
    }

    /// A shared register written from another table or through a writer
    /// needs write enable arbitration.
    pub fn has_external_writers(&self, reg: ResourceIdx) -> bool {
        !self.shared_reg_writers(reg).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    #[test]
    fn groups_accessors() {
        let mut d = Design::new();
        let top = d.add_module("top");
        let sub = d.add_module("sub");
        d.set_parent_module(sub, top).unwrap();
        let tt = d.add_table(top);
        let ts = d.add_table(sub);
        let mut b = Builder::new(&mut d);
        let reg = b.create_shared_reg(ts, "o", 8).unwrap();
        let r1 = b.create_shared_reg_reader(tt, reg).unwrap();
        let w1 = b.create_shared_reg_writer(tt, reg).unwrap();
        let mem = b.create_shared_memory(tt, 4, 8).unwrap();
        let mr = b.create_shared_memory_reader(ts, mem).unwrap();
        let axi = b.create_axi_slave_port(tt, mem).unwrap();
        let conn = Connection::build(&d);
        assert_eq!(conn.shared_reg_readers(reg), &[r1]);
        assert_eq!(conn.shared_reg_writers(reg), &[w1]);
        assert!(conn.has_external_writers(reg));
        assert_eq!(conn.shared_memory_accessors(mem), &[mr]);
        assert_eq!(conn.axi_ports(mem), &[axi]);
        assert!(conn.shared_reg_readers(mem).is_empty());
    }
}
