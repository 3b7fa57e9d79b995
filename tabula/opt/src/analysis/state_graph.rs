use petgraph::{
    Direction::{Incoming, Outgoing},
    graph::{DiGraph, NodeIndex},
    visit::Dfs,
};
use std::collections::HashMap;
use tabula_ir::{self as ir, util};

/// The transition graph of a table: one node per state and an edge for
/// every target of a state's transition insn.
#[derive(Clone, Default, Debug)]
pub struct StateGraph {
    nodes: HashMap<ir::StateIdx, NodeIndex>,
    graph: DiGraph<ir::StateIdx, ()>,
}

impl StateGraph {
    pub fn build(design: &ir::Design, table: ir::TableIdx) -> Self {
        let mut sg = StateGraph::default();
        let states = &design.tables[table].states;
        for st in states {
            let n = sg.graph.add_node(*st);
            sg.nodes.insert(*st, n);
        }
        for st in states {
            for next in util::get_next_states(design, *st) {
                // Targets outside the table are rejected by check_references.
                if let Some(to) = sg.nodes.get(&next) {
                    sg.graph.update_edge(sg.nodes[st], *to, ());
                }
            }
        }
        sg
    }

    /// Distinct successors of `state`.
    pub fn successors(&self, state: ir::StateIdx) -> Vec<ir::StateIdx> {
        self.neighbors(state, Outgoing)
    }

    /// Distinct predecessors of `state`.
    pub fn predecessors(&self, state: ir::StateIdx) -> Vec<ir::StateIdx> {
        self.neighbors(state, Incoming)
    }

    fn neighbors(&self, state: ir::StateIdx, dir: petgraph::Direction) -> Vec<ir::StateIdx> {
        let Some(n) = self.nodes.get(&state) else {
            return vec![];
        };
        let mut out = self
            .graph
            .neighbors_directed(*n, dir)
            .map(|m| self.graph[m])
            .collect::<Vec<_>>();
        out.sort();
        out
    }

    /// States reachable from `from`, `from` included.
    pub fn reachable_from(&self, from: ir::StateIdx) -> Vec<ir::StateIdx> {
        let Some(start) = self.nodes.get(&from) else {
            return vec![];
        };
        let mut dfs = Dfs::new(&self.graph, *start);
        let mut out = vec![];
        while let Some(n) = dfs.next(&self.graph) {
            out.push(self.graph[n]);
        }
        out
    }
}
