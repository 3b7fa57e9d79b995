use super::{BB, BBSet, DelayInfo};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use tabula_ir as ir;

/// Kinds of register dependencies between insns of a basic block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathEdgeType {
    /// The sink reads a value the source writes.
    WriteRead,
    /// Both write the same register; the sink's value must win.
    WriteWrite,
    /// The sink overwrites a value the source reads.
    ReadWrite,
}

#[derive(Clone, Debug)]
pub struct PathEdge {
    pub id: usize,
    pub kind: PathEdgeType,
    pub source: ir::InsnIdx,
    pub sink: ir::InsnIdx,
    pub reg: ir::RegisterIdx,
}

#[derive(Clone, Debug)]
pub struct PathNode {
    pub insn: ir::InsnIdx,
    /// Position of the insn's state in the basic block.
    pub st_index: usize,
    pub node_delay: i64,
    /// Delay of the longest W->R chain ending at this node.
    pub accumulated_delay_from_leaf: i64,
    /// Like the accumulated delay, restricted to sources in the same
    /// state, i.e. the combinational path within one cycle.
    pub state_local_delay: i64,
    pub source_edges: Vec<usize>,
    pub sink_edges: Vec<usize>,
}

/// Dependency graph of the insns of one basic block.
#[derive(Clone, Debug)]
pub struct BBDataPath {
    pub bb: BB,
    nodes: BTreeMap<ir::InsnIdx, PathNode>,
    edges: Vec<PathEdge>,
}

impl BBDataPath {
    pub fn build(design: &ir::Design, bb: &BB) -> Self {
        let mut dp = BBDataPath {
            bb: bb.clone(),
            nodes: BTreeMap::new(),
            edges: vec![],
        };
        for (st_index, st) in bb.states.iter().enumerate() {
            for insn in &design.states[*st].insns {
                dp.nodes.insert(
                    *insn,
                    PathNode {
                        insn: *insn,
                        st_index,
                        node_delay: 0,
                        accumulated_delay_from_leaf: 0,
                        state_local_delay: 0,
                        source_edges: vec![],
                        sink_edges: vec![],
                    },
                );
            }
        }

        let mut last_writer: HashMap<ir::RegisterIdx, ir::InsnIdx> = HashMap::new();
        let mut readers: HashMap<ir::RegisterIdx, Vec<ir::InsnIdx>> = HashMap::new();
        for st in &bb.states {
            let insns = &design.states[*st].insns;
            // Wires are visible to every insn of their state.
            for insn in insns {
                for o in &design.insns[*insn].outputs {
                    if design.registers[*o].is_state_local() {
                        last_writer.insert(*o, *insn);
                    }
                }
            }
            for insn in insns {
                let i = &design.insns[*insn];
                for r in &i.inputs {
                    if let Some(src) = last_writer.get(r) {
                        dp.add_edge(PathEdgeType::WriteRead, *src, *insn, *r);
                    }
                }
                for o in &i.outputs {
                    if let Some(src) = last_writer.get(o) {
                        dp.add_edge(PathEdgeType::WriteWrite, *src, *insn, *o);
                    }
                }
            }
            for insn in insns {
                for r in &design.insns[*insn].inputs {
                    if design.registers[*r].is_normal() {
                        readers.entry(*r).or_default().push(*insn);
                    }
                }
            }
            for insn in insns {
                for o in &design.insns[*insn].outputs {
                    if !design.registers[*o].is_normal() {
                        continue;
                    }
                    for src in readers.remove(o).unwrap_or_default() {
                        dp.add_edge(PathEdgeType::ReadWrite, src, *insn, *o);
                    }
                }
            }
            for insn in insns {
                for o in &design.insns[*insn].outputs {
                    if !design.registers[*o].is_state_local() {
                        last_writer.insert(*o, *insn);
                    }
                }
            }
        }
        dp
    }

    fn add_edge(
        &mut self,
        kind: PathEdgeType,
        source: ir::InsnIdx,
        sink: ir::InsnIdx,
        reg: ir::RegisterIdx,
    ) {
        if source == sink {
            return;
        }
        let id = self.edges.len();
        self.edges.push(PathEdge {
            id,
            kind,
            source,
            sink,
            reg,
        });
        if let Some(n) = self.nodes.get_mut(&sink) {
            n.source_edges.push(id);
        }
        if let Some(n) = self.nodes.get_mut(&source) {
            n.sink_edges.push(id);
        }
    }

    /// Fills node delays and the delays accumulated along W->R edges.
    pub fn set_delay(&mut self, design: &ir::Design, dinfo: &DelayInfo) {
        for n in self.nodes.values_mut() {
            n.node_delay = dinfo.insn_delay(design, n.insn);
        }
        let keys = self.nodes.keys().copied().collect::<Vec<_>>();
        let mut done = HashMap::new();
        let mut visiting = HashSet::new();
        for k in keys {
            self.accumulate(k, &mut done, &mut visiting);
        }
        for (k, (acc, local)) in done {
            if let Some(n) = self.nodes.get_mut(&k) {
                n.accumulated_delay_from_leaf = acc;
                n.state_local_delay = local;
            }
        }
    }

    fn accumulate(
        &self,
        insn: ir::InsnIdx,
        done: &mut HashMap<ir::InsnIdx, (i64, i64)>,
        visiting: &mut HashSet<ir::InsnIdx>,
    ) -> (i64, i64) {
        if let Some(d) = done.get(&insn) {
            return *d;
        }
        if !visiting.insert(insn) {
            log::warn!("Combinational loop through insn {insn}");
            return (0, 0);
        }
        let node = &self.nodes[&insn];
        let (mut acc, mut local) = (0, 0);
        for e in &node.source_edges {
            let edge = &self.edges[*e];
            if edge.kind != PathEdgeType::WriteRead {
                continue;
            }
            let (a, l) = self.accumulate(edge.source, done, visiting);
            acc = acc.max(a);
            if self.nodes[&edge.source].st_index == node.st_index {
                local = local.max(l);
            }
        }
        visiting.remove(&insn);
        let res = (acc + node.node_delay, local + node.node_delay);
        done.insert(insn, res);
        res
    }

    pub fn nodes(&self) -> &BTreeMap<ir::InsnIdx, PathNode> {
        &self.nodes
    }

    pub fn node(&self, insn: ir::InsnIdx) -> Option<&PathNode> {
        self.nodes.get(&insn)
    }

    pub fn edges(&self) -> &[PathEdge] {
        &self.edges
    }

    /// Edges into `insn`.
    pub fn source_edges(&self, insn: ir::InsnIdx) -> impl Iterator<Item = &PathEdge> {
        self.nodes
            .get(&insn)
            .into_iter()
            .flat_map(|n| n.source_edges.iter().map(|e| &self.edges[*e]))
    }

    pub fn dump(&self, design: &ir::Design) -> String {
        let mut out = format!("DataPath BB: {}\n", self.bb.index);
        for n in self.nodes.values() {
            let _ = writeln!(
                out,
                "Node: {}@{} {} {} {}",
                design.insns[n.insn].id,
                n.st_index,
                n.node_delay,
                n.accumulated_delay_from_leaf,
                n.state_local_delay
            );
            for e in self.source_edges(n.insn) {
                let _ = writeln!(
                    out,
                    "  {:?} from {} via `{}'",
                    e.kind, design.insns[e.source].id, design.registers[e.reg].name
                );
            }
        }
        out
    }
}

/// Data paths of every basic block of a table.
#[derive(Clone, Debug)]
pub struct DataPathSet {
    pub bbs: BBSet,
    pub paths: Vec<BBDataPath>,
}

impl DataPathSet {
    pub fn build(design: &ir::Design, table: ir::TableIdx, dinfo: &DelayInfo) -> Self {
        let bbs = BBSet::build(design, table);
        let paths = bbs
            .bbs
            .iter()
            .map(|bb| {
                let mut dp = BBDataPath::build(design, bb);
                dp.set_delay(design, dinfo);
                dp
            })
            .collect();
        Self { bbs, paths }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_ir::Builder;

    #[test]
    fn edges_and_delays() {
        let mut d = ir::Design::new();
        let m = d.add_module("m");
        let t = d.add_table(m);
        let mut b = Builder::new(&mut d);
        let s0 = b.alloc_state(t);
        let s1 = b.alloc_state(t);
        b.add_next_state(s0, s1).unwrap();
        let x = b.alloc_register(t, "x", 8);
        let y = b.alloc_register(t, "y", 8);
        let w = b.alloc_wire(t, "w", 8);
        let add = b.create_resource(t, "add").unwrap();
        let inv = b.create_resource(t, "bit-inv").unwrap();
        let set = b.create_resource(t, "set").unwrap();
        // s0: w = x + y; y = ~w
        let i_add = b.insert_insn(s0, add, &[x, y], &[w]);
        let i_inv = b.insert_insn(s0, inv, &[w], &[y]);
        // s1: x = y
        let i_set = b.insert_insn(s1, set, &[y], &[x]);

        let bb = BB {
            index: 0,
            states: vec![s0, s1],
        };
        let mut dp = BBDataPath::build(&d, &bb);
        dp.set_delay(&d, &DelayInfo::default());

        let kinds = |insn| {
            dp.source_edges(insn)
                .map(|e| (e.kind, e.source))
                .collect::<Vec<_>>()
        };
        // add reads y before inv overwrites it in the same state.
        assert_eq!(kinds(i_inv), vec![
            (PathEdgeType::WriteRead, i_add),
            (PathEdgeType::ReadWrite, i_add),
        ]);
        assert_eq!(kinds(i_set), vec![
            (PathEdgeType::WriteRead, i_inv),
            (PathEdgeType::ReadWrite, i_add),
        ]);

        let add_delay = 200 + 20 * 8;
        let inv_node = dp.node(i_inv).unwrap();
        assert_eq!(inv_node.state_local_delay, add_delay + 100);
        let set_node = dp.node(i_set).unwrap();
        assert_eq!(set_node.state_local_delay, 0);
        assert_eq!(set_node.accumulated_delay_from_leaf, add_delay + 100);
    }
}
