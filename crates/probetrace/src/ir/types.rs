//! Static types and literal values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Static type of a value in the IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Boolean
    Boolean,
    /// UTF-16 code unit (modelled as a Rust `char`)
    Char,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// No value
    Void,
    /// Reference to an object of the named class
    Ref(String),
    /// Array of the element type
    Array(Box<Type>),
}

impl Type {
    /// The `java.lang.String` reference type
    #[must_use]
    pub fn string() -> Self {
        Self::Ref("java.lang.String".to_string())
    }

    /// Integral primitive types (including `char`)
    #[must_use]
    pub const fn is_integral(&self) -> bool {
        matches!(
            self,
            Self::Int | Self::Long | Self::Byte | Self::Short | Self::Char
        )
    }

    /// Numeric primitive types
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.is_integral() || matches!(self, Self::Float | Self::Double)
    }

    /// Primitive types have a textual value rendering in VAR events;
    /// references and arrays are logged as `[unsupported type]`.
    #[must_use]
    pub const fn has_value_rendering(&self) -> bool {
        !matches!(self, Self::Ref(_) | Self::Array(_) | Self::Void)
    }

    /// Binary numeric promotion of two operand types.
    #[must_use]
    pub fn promote(left: &Self, right: &Self) -> Self {
        match (left, right) {
            (Self::Boolean, Self::Boolean) => Self::Boolean,
            (Self::Double, _) | (_, Self::Double) => Self::Double,
            (Self::Float, _) | (_, Self::Float) => Self::Float,
            (Self::Long, _) | (_, Self::Long) => Self::Long,
            _ => Self::Int,
        }
    }

    /// Unary numeric promotion.
    #[must_use]
    pub fn promote_unary(ty: &Self) -> Self {
        match ty {
            Self::Long | Self::Float | Self::Double | Self::Boolean => ty.clone(),
            _ => Self::Int,
        }
    }

    /// The zero value used when logical negation is rewritten as `x == zero`.
    #[must_use]
    pub fn zero(&self) -> Literal {
        match self {
            Self::Boolean => Literal::Bool(false),
            Self::Long => Literal::Long(0),
            Self::Float => Literal::Float(0.0),
            Self::Double => Literal::Double(0.0),
            Self::Ref(_) | Self::Array(_) | Self::Void => Literal::Null,
            _ => Literal::Int(0),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Long => write!(f, "long"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::Boolean => write!(f, "boolean"),
            Self::Char => write!(f, "char"),
            Self::Byte => write!(f, "byte"),
            Self::Short => write!(f, "short"),
            Self::Void => write!(f, "void"),
            Self::Ref(name) => write!(f, "{name}"),
            Self::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

/// Constant value appearing in an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Literal {
    /// `int` constant
    Int(i32),
    /// `long` constant
    Long(i64),
    /// `float` constant
    Float(f32),
    /// `double` constant
    Double(f64),
    /// `boolean` constant
    Bool(bool),
    /// `char` constant
    Char(char),
    /// String constant
    Str(String),
    /// `null`
    Null,
}

impl Literal {
    /// Static type of the literal
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Self::Int(_) => Type::Int,
            Self::Long(_) => Type::Long,
            Self::Float(_) => Type::Float,
            Self::Double(_) => Type::Double,
            Self::Bool(_) => Type::Boolean,
            Self::Char(_) => Type::Char,
            Self::Str(_) => Type::string(),
            Self::Null => Type::Ref("java.lang.Object".to_string()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{v:?}F"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(c) => write!(f, "{c:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::Int.to_string(), "int");
        assert_eq!(Type::string().to_string(), "java.lang.String");
        assert_eq!(Type::Array(Box::new(Type::Long)).to_string(), "long[]");
    }

    #[test]
    fn test_promotion() {
        assert_eq!(Type::promote(&Type::Int, &Type::Long), Type::Long);
        assert_eq!(Type::promote(&Type::Byte, &Type::Short), Type::Int);
        assert_eq!(Type::promote(&Type::Float, &Type::Long), Type::Float);
        assert_eq!(Type::promote(&Type::Boolean, &Type::Boolean), Type::Boolean);
        assert_eq!(Type::promote_unary(&Type::Char), Type::Int);
    }

    #[test]
    fn test_zero_matches_type() {
        assert_eq!(Type::Boolean.zero(), Literal::Bool(false));
        assert_eq!(Type::Long.zero(), Literal::Long(0));
        assert_eq!(Type::Short.zero(), Literal::Int(0));
    }

    #[test]
    fn test_value_rendering() {
        assert!(Type::Int.has_value_rendering());
        assert!(!Type::string().has_value_rendering());
    }

    #[test]
    fn test_literal_serde_shape() {
        let json = serde_json::to_string(&Literal::Int(7)).unwrap();
        assert_eq!(json, r#"{"int":7}"#);
        let back: Literal = serde_json::from_str(r#"{"bool":true}"#).unwrap();
        assert_eq!(back, Literal::Bool(true));
    }
}
