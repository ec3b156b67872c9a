//! Anchor resolution for requested source lines.
//!
//! Order of preference: the first instruction tagged with the line itself,
//! then the first reachable instruction (program order) tagged with a later
//! line, then the last reachable instruction tagged with an earlier line.

use crate::ir::{ControlFlowGraph, InstrId, LineIndex};
use std::collections::HashSet;

/// Resolve `target` to an anchor, running a fresh reachability search for
/// every candidate
#[must_use]
pub fn resolve(cfg: &ControlFlowGraph, index: &LineIndex, target: u32) -> Option<InstrId> {
    resolve_with(cfg, index, target, |id| cfg.is_reachable(id))
}

fn resolve_with(
    cfg: &ControlFlowGraph,
    index: &LineIndex,
    target: u32,
    reachable: impl Fn(InstrId) -> bool,
) -> Option<InstrId> {
    if let Some(exact) = index.first(target) {
        return Some(exact);
    }
    let forward = cfg
        .nodes()
        .iter()
        .find(|(id, line)| line.is_some_and(|l| l > target) && reachable(*id));
    if let Some((id, _)) = forward {
        return Some(*id);
    }
    cfg.nodes()
        .iter()
        .rev()
        .find(|(id, line)| line.is_some_and(|l| l < target) && reachable(*id))
        .map(|(id, _)| *id)
}

/// Resolver for one method body that computes the reachable set once.
///
/// Picks the same anchors as [`resolve`].
#[derive(Debug)]
pub struct StatementResolver<'a> {
    cfg: &'a ControlFlowGraph,
    index: &'a LineIndex,
    reachable: HashSet<InstrId>,
}

impl<'a> StatementResolver<'a> {
    /// Build a resolver over `cfg` and `index`
    #[must_use]
    pub fn new(cfg: &'a ControlFlowGraph, index: &'a LineIndex) -> Self {
        Self {
            cfg,
            index,
            reachable: cfg.reachable(),
        }
    }

    /// Anchor for `target`, if any
    #[must_use]
    pub fn resolve(&self, target: u32) -> Option<InstrId> {
        resolve_with(self.cfg, self.index, target, |id| {
            self.reachable.contains(&id)
        })
    }
}
