//! Run-time values and operator semantics.

use crate::event::UNSUPPORTED_VALUE;
use crate::ir::{BinOp, Literal, Type, UnaryOp};
use std::cmp::Ordering;
use std::fmt;

/// A run-time value. `byte` and `short` are carried as `Int`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Boolean
    Bool(bool),
    /// Character
    Char(char),
    /// String reference
    Str(String),
    /// Null reference
    Null,
}

impl Value {
    /// Value of a literal
    #[must_use]
    pub fn from_literal(lit: &Literal) -> Self {
        match lit {
            Literal::Int(v) => Self::Int(*v),
            Literal::Long(v) => Self::Long(*v),
            Literal::Float(v) => Self::Float(*v),
            Literal::Double(v) => Self::Double(*v),
            Literal::Bool(v) => Self::Bool(*v),
            Literal::Char(v) => Self::Char(*v),
            Literal::Str(v) => Self::Str(v.clone()),
            Literal::Null => Self::Null,
        }
    }

    /// Default value of a field of type `ty`
    #[must_use]
    pub fn zero(ty: &Type) -> Self {
        Self::from_literal(&ty.zero())
    }

    /// Text logged by VAR probes for a local of static type `ty`
    #[must_use]
    pub fn render(&self, ty: &Type) -> String {
        if ty.has_value_rendering() {
            self.to_string()
        } else {
            UNSUPPORTED_VALUE.to_string()
        }
    }

    /// Boolean view, for branch conditions
    pub fn as_bool(&self) -> Result<bool, String> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int(v) => Ok(*v != 0),
            other => Err(format!("expected boolean, found {other:?}")),
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Self::Int(v) => Some(Numeric::Int(*v)),
            Self::Char(c) => Some(Numeric::Int(*c as i32)),
            Self::Long(v) => Some(Numeric::Long(*v)),
            Self::Float(v) => Some(Numeric::Float(*v)),
            Self::Double(v) => Some(Numeric::Double(*v)),
            _ => None,
        }
    }

    /// Apply a binary operator
    pub fn binary(op: BinOp, left: &Self, right: &Self) -> Result<Self, String> {
        if op.is_relational() {
            return relational(op, left, right).map(Self::Bool);
        }
        match op {
            BinOp::And | BinOp::Or | BinOp::Xor => {
                if let (Self::Bool(l), Self::Bool(r)) = (left, right) {
                    return Ok(Self::Bool(match op {
                        BinOp::And => l & r,
                        BinOp::Or => l | r,
                        _ => l ^ r,
                    }));
                }
                integral(op, left, right)
            }
            BinOp::Shl | BinOp::Shr | BinOp::Ushr => shift(op, left, right),
            BinOp::Cmp | BinOp::Cmpl | BinOp::Cmpg => three_way(op, left, right),
            _ => arithmetic(op, left, right),
        }
    }

    /// Apply a unary operator
    pub fn unary(op: UnaryOp, operand: &Self) -> Result<Self, String> {
        match (op, operand.numeric(), operand) {
            (UnaryOp::Not, _, Self::Bool(b)) => Ok(Self::Bool(!b)),
            (UnaryOp::Neg, Some(n), _) => Ok(match n {
                Numeric::Int(v) => Self::Int(v.wrapping_neg()),
                Numeric::Long(v) => Self::Long(v.wrapping_neg()),
                Numeric::Float(v) => Self::Float(-v),
                Numeric::Double(v) => Self::Double(-v),
            }),
            (UnaryOp::BitNot, Some(Numeric::Int(v)), _) => Ok(Self::Int(!v)),
            (UnaryOp::BitNot, Some(Numeric::Long(v)), _) => Ok(Self::Long(!v)),
            _ => Err(format!("cannot apply {} to {operand:?}", op.symbol().trim())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Numeric {
    const fn rank(self) -> u8 {
        match self {
            Self::Int(_) => 0,
            Self::Long(_) => 1,
            Self::Float(_) => 2,
            Self::Double(_) => 3,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v as i64,
            Self::Long(v) => v,
            Self::Float(v) => v as i64,
            Self::Double(v) => v as i64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Long(v) => v as f64,
            Self::Float(v) => v as f64,
            Self::Double(v) => v,
        }
    }
}

fn operands(left: &Value, right: &Value, op: BinOp) -> Result<(Numeric, Numeric), String> {
    match (left.numeric(), right.numeric()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(format!(
            "operator {} needs numeric operands, found {left:?} and {right:?}",
            op.symbol()
        )),
    }
}

fn relational(op: BinOp, left: &Value, right: &Value) -> Result<bool, String> {
    let ordering = match (left.numeric(), right.numeric()) {
        (Some(l), Some(r)) if l.rank().max(r.rank()) >= 2 => l.as_f64().partial_cmp(&r.as_f64()),
        (Some(l), Some(r)) => Some(l.as_i64().cmp(&r.as_i64())),
        _ => {
            return match op {
                BinOp::Eq => Ok(left == right),
                BinOp::Ne => Ok(left != right),
                _ => Err(format!(
                    "operator {} needs numeric operands, found {left:?} and {right:?}",
                    op.symbol()
                )),
            };
        }
    };
    // NaN compares false except under !=
    let Some(ordering) = ordering else {
        return Ok(op == BinOp::Ne);
    };
    Ok(match op {
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::Le => ordering != Ordering::Greater,
        BinOp::Gt => ordering == Ordering::Greater,
        BinOp::Ge => ordering != Ordering::Less,
        BinOp::Eq => ordering == Ordering::Equal,
        _ => ordering != Ordering::Equal,
    })
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, String> {
    let (l, r) = operands(left, right, op)?;
    match l.rank().max(r.rank()) {
        0 | 1 => {
            let (a, b) = (l.as_i64(), r.as_i64());
            if matches!(op, BinOp::Div | BinOp::Rem) && b == 0 {
                return Err("ArithmeticException: / by zero".to_string());
            }
            let wide = l.rank().max(r.rank()) == 1;
            if wide {
                Ok(Value::Long(long_op(op, a, b)))
            } else {
                let (a, b) = (a as i32, b as i32);
                Ok(Value::Int(int_op(op, a, b)))
            }
        }
        2 => {
            let (a, b) = (l.as_f64() as f32, r.as_f64() as f32);
            Ok(Value::Float(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                _ => a % b,
            }))
        }
        _ => {
            let (a, b) = (l.as_f64(), r.as_f64());
            Ok(Value::Double(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                _ => a % b,
            }))
        }
    }
}

fn int_op(op: BinOp, a: i32, b: i32) -> i32 {
    match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => a.wrapping_div(b),
        _ => a.wrapping_rem(b),
    }
}

fn long_op(op: BinOp, a: i64, b: i64) -> i64 {
    match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => a.wrapping_div(b),
        _ => a.wrapping_rem(b),
    }
}

fn integral(op: BinOp, left: &Value, right: &Value) -> Result<Value, String> {
    let (l, r) = operands(left, right, op)?;
    let apply = |a: i64, b: i64| match op {
        BinOp::And => a & b,
        BinOp::Or => a | b,
        _ => a ^ b,
    };
    match l.rank().max(r.rank()) {
        0 => Ok(Value::Int(apply(l.as_i64(), r.as_i64()) as i32)),
        1 => Ok(Value::Long(apply(l.as_i64(), r.as_i64()))),
        _ => Err(format!("operator {} needs integral operands", op.symbol())),
    }
}

fn shift(op: BinOp, left: &Value, right: &Value) -> Result<Value, String> {
    let (l, r) = operands(left, right, op)?;
    let distance = r.as_i64();
    match l {
        Numeric::Int(v) => {
            let n = (distance & 31) as u32;
            Ok(Value::Int(match op {
                BinOp::Shl => v.wrapping_shl(n),
                BinOp::Shr => v.wrapping_shr(n),
                _ => ((v as u32) >> n) as i32,
            }))
        }
        Numeric::Long(v) => {
            let n = (distance & 63) as u32;
            Ok(Value::Long(match op {
                BinOp::Shl => v.wrapping_shl(n),
                BinOp::Shr => v.wrapping_shr(n),
                _ => ((v as u64) >> n) as i64,
            }))
        }
        _ => Err(format!("operator {} needs an integral left operand", op.symbol())),
    }
}

fn three_way(op: BinOp, left: &Value, right: &Value) -> Result<Value, String> {
    let (l, r) = operands(left, right, op)?;
    let ordering = if op == BinOp::Cmp {
        Some(l.as_i64().cmp(&r.as_i64()))
    } else {
        l.as_f64().partial_cmp(&r.as_f64())
    };
    Ok(Value::Int(match ordering {
        Some(Ordering::Less) => -1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Greater) => 1,
        None if op == BinOp::Cmpg => 1,
        None => -1,
    }))
}
