//! Instruction-level control-flow graph.
//!
//! The builder is brief: it models fallthrough and explicit jumps, not
//! exceptional edges. Hand-built graphs (extra entry nodes, pruned edges) can
//! be assembled with [`ControlFlowGraph::builder`].

use super::{InstrId, MethodBody};
use std::collections::{HashMap, HashSet, VecDeque};

/// Successor relation over the instructions of one method body.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    /// Instructions in program order with their tagged lines
    order: Vec<(InstrId, Option<u32>)>,
    successors: HashMap<InstrId, Vec<InstrId>>,
    entries: Vec<InstrId>,
}

impl ControlFlowGraph {
    /// Build the graph of a method body
    #[must_use]
    pub fn from_body(body: &MethodBody) -> Self {
        let mut builder = Self::builder();
        let instrs = &body.instructions;
        for (idx, instr) in instrs.iter().enumerate() {
            builder = builder.node(instr.id, instr.tagged_line());
            if let Some(target) = instr.jump_target() {
                builder = builder.edge(instr.id, target);
            }
            if !instr.is_terminator() {
                if let Some(next) = instrs.get(idx + 1) {
                    builder = builder.edge(instr.id, next.id);
                }
            }
        }
        if let Some(first) = instrs.first() {
            builder = builder.entry(first.id);
        }
        builder.build()
    }

    /// Start a hand-built graph
    #[must_use]
    pub fn builder() -> CfgBuilder {
        CfgBuilder::default()
    }

    /// Nodes in program order with their tagged lines
    #[must_use]
    pub fn nodes(&self) -> &[(InstrId, Option<u32>)] {
        &self.order
    }

    /// Entry nodes
    #[must_use]
    pub fn entries(&self) -> &[InstrId] {
        &self.entries
    }

    /// Successors of a node
    #[must_use]
    pub fn successors(&self, id: InstrId) -> &[InstrId] {
        self.successors.get(&id).map_or(&[][..], Vec::as_slice)
    }

    /// Every node reachable from an entry (entries included)
    #[must_use]
    pub fn reachable(&self) -> HashSet<InstrId> {
        let mut seen: HashSet<InstrId> = HashSet::new();
        let mut queue: VecDeque<InstrId> = VecDeque::new();
        for entry in &self.entries {
            if seen.insert(*entry) {
                queue.push_back(*entry);
            }
        }
        while let Some(id) = queue.pop_front() {
            for succ in self.successors(id) {
                if seen.insert(*succ) {
                    queue.push_back(*succ);
                }
            }
        }
        seen
    }

    /// BFS from the entries, stopping as soon as `target` is found
    #[must_use]
    pub fn is_reachable(&self, target: InstrId) -> bool {
        let mut seen: HashSet<InstrId> = HashSet::new();
        let mut queue: VecDeque<InstrId> = self.entries.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if id == target {
                return true;
            }
            if seen.insert(id) {
                queue.extend(self.successors(id).iter().copied());
            }
        }
        false
    }
}

/// Builder for [`ControlFlowGraph`]
#[derive(Debug, Default)]
pub struct CfgBuilder {
    graph: ControlFlowGraph,
}

impl CfgBuilder {
    /// Add a node; nodes are kept in insertion order
    #[must_use]
    pub fn node(mut self, id: InstrId, line: Option<u32>) -> Self {
        self.graph.order.push((id, line));
        self
    }

    /// Add a successor edge
    #[must_use]
    pub fn edge(mut self, from: InstrId, to: InstrId) -> Self {
        let succs = self.graph.successors.entry(from).or_default();
        if !succs.contains(&to) {
            succs.push(to);
        }
        self
    }

    /// Mark a node as an entry
    #[must_use]
    pub fn entry(mut self, id: InstrId) -> Self {
        if !self.graph.entries.contains(&id) {
            self.graph.entries.push(id);
        }
        self
    }

    /// Finish the graph
    #[must_use]
    pub fn build(self) -> ControlFlowGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, InstrKind, Type};

    fn id(n: u32) -> InstrId {
        InstrId::new(n)
    }

    #[test]
    fn test_fallthrough_and_jumps() {
        let mut body = MethodBody::new();
        body.push(
            1,
            InstrKind::Branch {
                condition: Expr::local("c", Type::Boolean),
                target: id(3),
            },
        );
        body.push(2, InstrKind::Goto { target: id(4) });
        body.push(3, InstrKind::Nop);
        body.push(4, InstrKind::Nop);
        body.push(5, InstrKind::Return(None));

        let cfg = ControlFlowGraph::from_body(&body);
        assert_eq!(cfg.entries(), &[id(0)]);
        assert_eq!(cfg.successors(id(0)), &[id(3), id(1)]);
        assert_eq!(cfg.successors(id(1)), &[id(4)]);
        assert!(cfg.successors(id(4)).is_empty());
        // position 2 sits after a goto and is never a jump target
        assert!(!cfg.is_reachable(id(2)));
        assert!(cfg.is_reachable(id(4)));
        assert_eq!(cfg.reachable().len(), 4);
    }

    #[test]
    fn test_empty_body_has_no_entries() {
        let cfg = ControlFlowGraph::from_body(&MethodBody::new());
        assert!(cfg.entries().is_empty());
        assert!(cfg.reachable().is_empty());
    }

    #[test]
    fn test_builder_multiple_entries() {
        let cfg = ControlFlowGraph::builder()
            .node(id(0), Some(1))
            .node(id(1), Some(2))
            .node(id(2), Some(3))
            .entry(id(0))
            .entry(id(2))
            .build();
        assert!(cfg.is_reachable(id(2)));
        assert!(!cfg.is_reachable(id(1)));
    }
}
