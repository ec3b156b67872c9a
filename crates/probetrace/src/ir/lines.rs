//! Source line → instruction index.

use super::{InstrId, MethodBody};
use std::collections::BTreeMap;

/// Instructions of one body grouped by tagged source line, program order
/// preserved within each line.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    by_line: BTreeMap<u32, Vec<InstrId>>,
}

impl LineIndex {
    /// Index every tagged instruction of `body`
    #[must_use]
    pub fn from_body(body: &MethodBody) -> Self {
        let mut index = Self::default();
        for instr in &body.instructions {
            if let Some(line) = instr.tagged_line() {
                index.insert(line, instr.id);
            }
        }
        index
    }

    /// Record that `id` carries `line`
    pub fn insert(&mut self, line: u32, id: InstrId) {
        self.by_line.entry(line).or_default().push(id);
    }

    /// Instructions tagged with `line`
    #[must_use]
    pub fn for_line(&self, line: u32) -> &[InstrId] {
        self.by_line.get(&line).map_or(&[][..], Vec::as_slice)
    }

    /// First instruction tagged with `line`
    #[must_use]
    pub fn first(&self, line: u32) -> Option<InstrId> {
        self.for_line(line).first().copied()
    }

    /// Whether any instruction carries `line`
    #[must_use]
    pub fn contains(&self, line: u32) -> bool {
        self.by_line.contains_key(&line)
    }

    /// Tagged lines in ascending order
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_line.keys().copied()
    }
}
