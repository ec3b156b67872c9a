//! Expression trees.
//!
//! Expressions are a closed sum type. The instrumenter matches on every
//! variant; `FieldRead` and `Opaque` are the IR-boundary kinds it refuses
//! inside conditions.

use super::{Literal, Type};
use serde::{Deserialize, Serialize};

/// A named local slot (parameter, declared variable, or temporary).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Local {
    /// Local name, unique within a method body
    pub name: String,
    /// Declared type
    pub ty: Type,
}

impl Local {
    /// Create a local
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Reference to a static field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// Declaring class (fully qualified)
    pub class: String,
    /// Field name
    pub name: String,
    /// Field type
    pub ty: Type,
}

impl FieldRef {
    /// Create a field reference
    #[must_use]
    pub fn new(class: impl Into<String>, name: impl Into<String>, ty: Type) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            ty,
        }
    }

    /// `Class.field` form used by FIELD_ACCESSED events
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class, self.name)
    }

    /// Declaring class without its package
    #[must_use]
    pub fn class_simple_name(&self) -> &str {
        self.class.rsplit('.').next().unwrap_or(&self.class)
    }
}

/// Static call target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallTarget {
    /// Class declaring the callee
    pub class: String,
    /// Method name
    pub method: String,
    /// Declared return type
    pub return_type: Type,
}

impl CallTarget {
    /// Create a call target
    #[must_use]
    pub fn new(class: impl Into<String>, method: impl Into<String>, return_type: Type) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            return_type,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    Ushr,
    /// Three-way compare of longs
    Cmp,
    /// Three-way compare of floating values, NaN → -1
    Cmpl,
    /// Three-way compare of floating values, NaN → 1
    Cmpg,
}

impl BinOp {
    /// Operator symbol as written in CONDITION events
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Ushr => ">>>",
            Self::Cmp => "cmp",
            Self::Cmpl => "cmpl",
            Self::Cmpg => "cmpg",
        }
    }

    /// Relational operators yield `boolean`
    #[must_use]
    pub const fn is_relational(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne
        )
    }

    /// Shift operators take the left operand's type
    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::Shr | Self::Ushr)
    }

    /// Operators the expression instrumenter can rebuild
    #[must_use]
    pub const fn is_instrumentable(self) -> bool {
        !matches!(self, Self::Cmp | Self::Cmpl | Self::Cmpg)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Logical negation
    Not,
    /// Bitwise complement
    BitNot,
}

impl UnaryOp {
    /// Operator symbol
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "neg ",
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Constant
    Literal(Literal),
    /// Read of a local slot
    Local(Local),
    /// `op operand`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// `left op right`
    Binary {
        /// Operator
        op: BinOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Static call
    Call {
        /// Callee
        target: CallTarget,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Read of a static field
    FieldRead(FieldRef),
    /// A node the IR loader could not map onto this model
    Opaque {
        /// Human-readable description of the node
        description: String,
        /// Static type reported by the loader
        ty: Type,
    },
}

impl Expr {
    /// Local read
    #[must_use]
    pub fn local(name: impl Into<String>, ty: Type) -> Self {
        Self::Local(Local::new(name, ty))
    }

    /// `int` constant
    #[must_use]
    pub const fn int(value: i32) -> Self {
        Self::Literal(Literal::Int(value))
    }

    /// `boolean` constant
    #[must_use]
    pub const fn bool(value: bool) -> Self {
        Self::Literal(Literal::Bool(value))
    }

    /// Binary node
    #[must_use]
    pub fn binary(op: BinOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Unary node
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Static call node
    #[must_use]
    pub fn call(target: CallTarget, args: Vec<Self>) -> Self {
        Self::Call { target, args }
    }

    /// Static type of the expression
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Self::Literal(lit) => lit.ty(),
            Self::Local(local) => local.ty.clone(),
            Self::Unary { op, operand } => match op {
                UnaryOp::Not => Type::Boolean,
                UnaryOp::Neg | UnaryOp::BitNot => Type::promote_unary(&operand.ty()),
            },
            Self::Binary { op, left, right } => {
                if op.is_relational() {
                    Type::Boolean
                } else if matches!(op, BinOp::Cmp | BinOp::Cmpl | BinOp::Cmpg) {
                    Type::Int
                } else if op.is_shift() {
                    Type::promote_unary(&left.ty())
                } else {
                    Type::promote(&left.ty(), &right.ty())
                }
            }
            Self::Call { target, .. } => target.return_type.clone(),
            Self::FieldRead(field) => field.ty.clone(),
            Self::Opaque { ty, .. } => ty.clone(),
        }
    }

    /// Literals and local reads: side-effect free, cheap to re-read
    #[must_use]
    pub const fn is_atom(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::Local(_))
    }

    /// Static fields read anywhere in this tree
    #[must_use]
    pub fn field_reads(&self) -> Vec<&FieldRef> {
        let mut out = Vec::new();
        self.collect_field_reads(&mut out);
        out
    }

    fn collect_field_reads<'a>(&'a self, out: &mut Vec<&'a FieldRef>) {
        match self {
            Self::FieldRead(field) => out.push(field),
            Self::Unary { operand, .. } => operand.collect_field_reads(out),
            Self::Binary { left, right, .. } => {
                left.collect_field_reads(out);
                right.collect_field_reads(out);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_field_reads(out);
                }
            }
            Self::Literal(_) | Self::Local(_) | Self::Opaque { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relational_is_boolean() {
        let e = Expr::binary(BinOp::Lt, Expr::local("a", Type::Int), Expr::int(3));
        assert_eq!(e.ty(), Type::Boolean);
    }

    #[test]
    fn test_arithmetic_promotes() {
        let e = Expr::binary(
            BinOp::Add,
            Expr::local("a", Type::Int),
            Expr::local("b", Type::Long),
        );
        assert_eq!(e.ty(), Type::Long);
        let shift = Expr::binary(
            BinOp::Shl,
            Expr::local("a", Type::Byte),
            Expr::local("n", Type::Long),
        );
        assert_eq!(shift.ty(), Type::Int);
    }

    #[test]
    fn test_three_way_compare_not_instrumentable() {
        assert!(!BinOp::Cmpl.is_instrumentable());
        assert!(BinOp::Ushr.is_instrumentable());
        assert_eq!(BinOp::Ushr.symbol(), ">>>");
    }

    #[test]
    fn test_field_reads_are_collected_through_calls() {
        let field = FieldRef::new("com.acme.Foo", "count", Type::Int);
        let e = Expr::call(
            CallTarget::new("Math", "abs", Type::Int),
            vec![Expr::binary(
                BinOp::Sub,
                Expr::FieldRead(field.clone()),
                Expr::int(1),
            )],
        );
        assert_eq!(e.field_reads(), vec![&field]);
        assert_eq!(field.qualified_name(), "com.acme.Foo.count");
        assert_eq!(field.class_simple_name(), "Foo");
    }
}
