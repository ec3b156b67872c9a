//! Programs, classes, methods and mutable method bodies.

use super::{CallTarget, Expr, FieldRef, Literal, Local, Type};
use crate::probe::Probe;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Prefix of instrumenter-created temporaries
pub const TEMP_PREFIX: &str = "__autogen_";

/// Name of the static initializer method
pub const STATIC_INITIALIZER: &str = "<clinit>";

/// Type-safe instruction identifier
///
/// Unique within one method body and stable across insertions; jump targets
/// refer to instructions by id, never by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrId(u32);

impl InstrId {
    /// Create a new instruction ID
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the inner value
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Assignment destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    /// Local slot
    Local(Local),
    /// Static field
    StaticField(FieldRef),
}

/// Instruction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrKind {
    /// `target = value`
    Assign {
        /// Destination
        target: Place,
        /// Right-hand side
        value: Expr,
    },
    /// `if condition goto target`
    Branch {
        /// Boolean condition
        condition: Expr,
        /// Jump target taken when the condition holds
        target: InstrId,
    },
    /// Unconditional jump
    Goto {
        /// Jump target
        target: InstrId,
    },
    /// Call evaluated for its side effects
    Invoke {
        /// Callee
        target: CallTarget,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Return from the method
    Return(Option<Expr>),
    /// Call into the trace recorder
    Probe(Probe),
    /// No operation
    Nop,
}

/// One IR operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Body-unique id
    pub id: InstrId,
    /// Source line tag; values ≤ 0 mean "no tag"
    #[serde(default)]
    pub line: i32,
    /// Payload
    pub kind: InstrKind,
}

impl Instruction {
    /// Tagged source line, if any
    #[must_use]
    pub fn tagged_line(&self) -> Option<u32> {
        u32::try_from(self.line).ok().filter(|line| *line > 0)
    }

    /// Conditional jump
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(self.kind, InstrKind::Branch { .. })
    }

    /// Instructions control never falls through
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(self.kind, InstrKind::Return(_) | InstrKind::Goto { .. })
    }

    /// Explicit jump target of a branch or goto
    #[must_use]
    pub const fn jump_target(&self) -> Option<InstrId> {
        match self.kind {
            InstrKind::Branch { target, .. } | InstrKind::Goto { target } => Some(target),
            _ => None,
        }
    }

    fn redirect(&mut self, from: InstrId, to: InstrId) {
        match &mut self.kind {
            InstrKind::Branch { target, .. } | InstrKind::Goto { target } if *target == from => {
                *target = to;
            }
            _ => {}
        }
    }
}

/// Ordered instruction sequence of one method plus its declared locals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodBody {
    /// Declared locals, temporaries included
    #[serde(default)]
    pub locals: Vec<Local>,
    /// Instructions in program order
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    /// Create an empty body
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the body has no instructions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Declare a local
    pub fn declare(&mut self, local: Local) {
        if !self.locals.iter().any(|l| l.name == local.name) {
            self.locals.push(local);
        }
    }

    /// Append an instruction tagged with `line` and return its id
    pub fn push(&mut self, line: i32, kind: InstrKind) -> InstrId {
        let id = self.next_id();
        self.instructions.push(Instruction { id, line, kind });
        id
    }

    /// Id the next inserted instruction will receive.
    ///
    /// One past the largest id in use; when that would overflow, the lowest
    /// unused id.
    #[must_use]
    pub fn next_id(&self) -> InstrId {
        let max = self.instructions.iter().map(|i| i.id.as_u32()).max();
        match max.map(|max| max.checked_add(1)) {
            None => InstrId::new(0),
            Some(Some(next)) => InstrId::new(next),
            Some(None) => self.lowest_free_id(),
        }
    }

    fn lowest_free_id(&self) -> InstrId {
        let used: HashSet<u32> = self.instructions.iter().map(|i| i.id.as_u32()).collect();
        (0..=u32::MAX)
            .find(|n| !used.contains(n))
            .map_or(InstrId::new(0), InstrId::new)
    }

    /// Program-order position of an instruction
    #[must_use]
    pub fn position(&self, id: InstrId) -> Option<usize> {
        self.instructions.iter().position(|i| i.id == id)
    }

    /// Look up an instruction by id
    #[must_use]
    pub fn get(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.id == id)
    }

    /// Mutable lookup by id
    pub fn get_mut(&mut self, id: InstrId) -> Option<&mut Instruction> {
        self.instructions.iter_mut().find(|i| i.id == id)
    }

    /// Insert an untagged instruction immediately before `anchor`.
    ///
    /// Jumps that targeted `anchor` are redirected to the new instruction, so
    /// every path into the anchor passes through it.
    pub fn insert_before(&mut self, anchor: InstrId, kind: InstrKind) -> ProbeResult<InstrId> {
        let pos = self
            .position(anchor)
            .ok_or_else(|| ProbeError::malformed(format!("anchor {anchor} not in body")))?;
        let id = self.next_id();
        for instr in &mut self.instructions {
            instr.redirect(anchor, id);
        }
        self.instructions.insert(pos, Instruction { id, line: 0, kind });
        Ok(id)
    }

    /// Insert an untagged instruction at the start of the body without
    /// redirecting jumps, so it runs once per entry
    pub fn insert_entry(&mut self, kind: InstrKind) -> InstrId {
        let id = self.next_id();
        self.instructions.insert(0, Instruction { id, line: 0, kind });
        id
    }

    /// Append an untagged instruction at the end of the body
    pub fn push_back(&mut self, kind: InstrKind) -> InstrId {
        self.push(0, kind)
    }

    /// Declare a fresh temporary of the given type
    pub fn add_temp(&mut self, ty: Type) -> Local {
        let taken: HashSet<&str> = self.locals.iter().map(|l| l.name.as_str()).collect();
        let mut n = self
            .locals
            .iter()
            .filter(|l| l.name.starts_with(TEMP_PREFIX))
            .count();
        let mut name = format!("{TEMP_PREFIX}{n}");
        while taken.contains(name.as_str()) {
            n += 1;
            name = format!("{TEMP_PREFIX}{n}");
        }
        let local = Local::new(name, ty);
        self.locals.push(local.clone());
        local
    }

    /// Distinct tagged source lines present in the body
    #[must_use]
    pub fn lines(&self) -> BTreeSet<u32> {
        self.instructions
            .iter()
            .filter_map(Instruction::tagged_line)
            .collect()
    }

    /// Check that ids are unique and every jump lands inside the body
    pub fn validate(&self) -> ProbeResult<()> {
        let mut ids = HashSet::new();
        for instr in &self.instructions {
            if !ids.insert(instr.id) {
                return Err(ProbeError::malformed(format!(
                    "duplicate instruction id {}",
                    instr.id
                )));
            }
        }
        for instr in &self.instructions {
            if let Some(target) = instr.jump_target() {
                if !ids.contains(&target) {
                    return Err(ProbeError::malformed(format!(
                        "{} jumps to missing instruction {target}",
                        instr.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Method declaration with its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Parameters, bound as locals on entry
    #[serde(default)]
    pub params: Vec<Local>,
    /// Declared return type
    pub return_type: Type,
    /// Body
    pub body: MethodBody,
}

impl Method {
    /// Create a method with an empty body
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<Local>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            body: MethodBody::new(),
        }
    }

    /// `<Class: ret name(p1,p2)>`
    #[must_use]
    pub fn signature(&self, class: &str) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.ty.to_string()).collect();
        format!(
            "<{class}: {} {}({})>",
            self.return_type,
            self.name,
            params.join(",")
        )
    }

    /// `<clinit>`
    #[must_use]
    pub fn is_static_initializer(&self) -> bool {
        self.name == STATIC_INITIALIZER
    }
}

/// Static field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: Type,
    /// Initial value; defaults to the type's zero
    #[serde(default)]
    pub initial: Option<Literal>,
}

/// Class with static fields and methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    /// Fully qualified name
    pub name: String,
    /// Source file path relative to the source root
    #[serde(default)]
    pub source_file: Option<String>,
    /// Static fields
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    /// Methods
    #[serde(default)]
    pub methods: Vec<Method>,
}

impl Class {
    /// Create an empty class
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_file: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Source path used in trace events: `source_file`, or the class name
    /// with `.` → `/` plus `.java`
    #[must_use]
    pub fn source_path(&self) -> String {
        self.source_file
            .clone()
            .unwrap_or_else(|| format!("{}.java", self.name.replace('.', "/")))
    }

    /// Class name without its package
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Find a method by name
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A set of classes loaded together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Classes
    pub classes: Vec<Class>,
}

impl Program {
    /// Create a program
    #[must_use]
    pub fn new(classes: Vec<Class>) -> Self {
        Self { classes }
    }

    /// Find a class by fully qualified name
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.name == name)
    }
}
