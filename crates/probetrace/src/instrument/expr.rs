//! Recursive condition rewriting with value-capture probes.
//!
//! Every sub-expression of a branch condition is evaluated once into a local
//! before the branch, a VAR probe records that local, and each binary node
//! gets a CONDITION probe naming its two operand locals. The rebuilt
//! condition reads only those locals, so it yields the same value as the
//! original while the trace shows how it was reached.

use crate::ir::{BinOp, Expr, InstrId, InstrKind, Local, MethodBody, Place, UnaryOp};
use crate::probe::{Probe, ValueSource};
use crate::result::{ProbeError, ProbeResult};

/// Source position attached to every probe emitted for one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeContext {
    /// Source file of the declaring class
    pub file: String,
    /// Line of the branch
    pub line: u32,
    /// Subcondition index of the branch
    pub index: u32,
}

/// Rewrites one expression, inserting instructions immediately before a
/// fixed anchor in program order.
#[derive(Debug)]
pub struct ExpressionInstrumenter<'a> {
    body: &'a mut MethodBody,
    anchor: InstrId,
    context: &'a ProbeContext,
    method: &'a str,
}

impl<'a> ExpressionInstrumenter<'a> {
    /// Instrumenter inserting before `anchor`; `method` names the enclosing
    /// method in errors
    pub fn new(
        body: &'a mut MethodBody,
        anchor: InstrId,
        context: &'a ProbeContext,
        method: &'a str,
    ) -> Self {
        Self {
            body,
            anchor,
            context,
            method,
        }
    }

    /// Rewrite `expr`, returning an equivalent expression over locals
    pub fn instrument(&mut self, expr: &Expr) -> ProbeResult<Expr> {
        match expr {
            Expr::Local(local) => {
                self.capture(local, ValueSource::Variable)?;
                Ok(expr.clone())
            }
            Expr::Literal(_) => {
                let temp = self.materialize(expr.clone(), ValueSource::Constant)?;
                Ok(Expr::Local(temp))
            }
            Expr::Call { .. } => {
                let temp = self.materialize(expr.clone(), ValueSource::Variable)?;
                Ok(Expr::Local(temp))
            }
            Expr::Binary { op, left, right } => {
                if !op.is_instrumentable() {
                    return Err(self.unsupported(format!("operator {}", op.symbol())));
                }
                let left = self.operand(left)?;
                let right = self.operand(right)?;
                self.emit(Probe::Condition {
                    file: self.context.file.clone(),
                    line: self.context.line,
                    index: self.context.index,
                    left: left.name.clone(),
                    op: *op,
                    right: right.name.clone(),
                })?;
                Ok(Expr::binary(*op, Expr::Local(left), Expr::Local(right)))
            }
            Expr::Unary { op, operand } => {
                let inner = self.operand(operand)?;
                let rebuilt = match op {
                    UnaryOp::Not => {
                        let zero = Expr::Literal(inner.ty.zero());
                        Expr::binary(BinOp::Eq, Expr::Local(inner), zero)
                    }
                    UnaryOp::Neg | UnaryOp::BitNot => Expr::unary(*op, Expr::Local(inner)),
                };
                let temp = self.materialize(rebuilt, ValueSource::Variable)?;
                Ok(Expr::Local(temp))
            }
            Expr::FieldRead(field) => {
                Err(self.unsupported(format!("field read {}", field.qualified_name())))
            }
            Expr::Opaque { description, .. } => {
                Err(self.unsupported(format!("opaque expression {description}")))
            }
        }
    }

    /// Instrument `expr` and make sure the result sits in a local
    fn operand(&mut self, expr: &Expr) -> ProbeResult<Local> {
        match self.instrument(expr)? {
            Expr::Local(local) => Ok(local),
            composite => self.materialize(composite, ValueSource::Variable),
        }
    }

    /// `temp = value` followed by a VAR probe on `temp`
    fn materialize(&mut self, value: Expr, source: ValueSource) -> ProbeResult<Local> {
        let temp = self.body.add_temp(value.ty());
        self.body.insert_before(
            self.anchor,
            InstrKind::Assign {
                target: Place::Local(temp.clone()),
                value,
            },
        )?;
        self.capture(&temp, source)?;
        Ok(temp)
    }

    fn capture(&mut self, local: &Local, source: ValueSource) -> ProbeResult<()> {
        self.emit(Probe::Var {
            file: self.context.file.clone(),
            line: self.context.line,
            var: local.clone(),
            source,
        })
    }

    fn emit(&mut self, probe: Probe) -> ProbeResult<()> {
        self.body
            .insert_before(self.anchor, InstrKind::Probe(probe))
            .map(|_| ())
    }

    fn unsupported(&self, node: String) -> ProbeError {
        ProbeError::unsupported(self.method, node)
    }
}
