//! Textual IR dump, used by the CLI's `text` output mode.

use super::{Class, Expr, InstrKind, Instruction, Method, Place};
use std::fmt::{self, Write as _};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Local(local) => write!(f, "{}", local.name),
            Self::Unary { op, operand } => write!(f, "{}{operand}", op.symbol()),
            Self::Binary { op, left, right } => write!(f, "{left} {} {right}", op.symbol()),
            Self::Call { target, args } => {
                write!(f, "{}.{}(", target.class, target.method)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Self::FieldRead(field) => write!(f, "<{}: {} {}>", field.class, field.ty, field.name),
            Self::Opaque { description, .. } => write!(f, "opaque[{description}]"),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(local) => write!(f, "{}", local.name),
            Self::StaticField(field) => {
                write!(f, "<{}: {} {}>", field.class, field.ty, field.name)
            }
        }
    }
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { target, value } => write!(f, "{target} = {value}"),
            Self::Branch { condition, target } => write!(f, "if {condition} goto {target}"),
            Self::Goto { target } => write!(f, "goto {target}"),
            Self::Invoke { target, args } => {
                write!(f, "invoke {}.{}(", target.class, target.method)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Self::Return(Some(value)) => write!(f, "return {value}"),
            Self::Return(None) => write!(f, "return"),
            Self::Probe(probe) => write!(f, "probe {probe}"),
            Self::Nop => write!(f, "nop"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.to_string();
        match self.tagged_line() {
            Some(line) => write!(f, "{id:>5}: {line:>4}  {}", self.kind),
            None => write!(f, "{id:>5}:       {}", self.kind),
        }
    }
}

/// Render one method, locals first
#[must_use]
pub fn render_method(class: &str, method: &Method) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "    {} {{", method.signature(class));
    for local in &method.body.locals {
        let _ = writeln!(out, "        {} {};", local.ty, local.name);
    }
    if !method.body.locals.is_empty() {
        out.push('\n');
    }
    for instr in &method.body.instructions {
        let _ = writeln!(out, "      {instr}");
    }
    out.push_str("    }\n");
    out
}

/// Render a whole class
#[must_use]
pub fn render_class(class: &Class) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// source: {}", class.source_path());
    let _ = writeln!(out, "class {} {{", class.name);
    for field in &class.fields {
        let _ = write!(out, "    static {} {}", field.ty, field.name);
        if let Some(initial) = &field.initial {
            let _ = write!(out, " = {initial}");
        }
        out.push_str(";\n");
    }
    for method in &class.methods {
        out.push('\n');
        out.push_str(&render_method(&class.name, method));
    }
    out.push_str("}\n");
    out
}
