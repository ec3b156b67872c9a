//! Reference interpreter for instrumented programs.
//!
//! Executes IR bodies directly so that instrumentation can be checked end to
//! end: probes are dispatched to a shared [`TraceRecorder`], calls resolve to
//! program methods or registered natives, and static fields live in one
//! table per interpreter.
//!
//! ```text
//! ┌──────────┐  invoke   ┌───────────────┐  record   ┌───────────────┐
//! │  caller  │──────────►│  Interpreter  │──────────►│ TraceRecorder │
//! └──────────┘           │  frame / pc   │           └───────────────┘
//!                        │  statics      │
//!                        │  natives      │
//!                        └───────────────┘
//! ```

mod value;

pub use value::Value;

use crate::config::InstrumentConfig;
use crate::event::TraceEvent;
use crate::ir::{
    BinOp, CallTarget, Class, Expr, InstrId, InstrKind, Method, Place, Program, Type, UnaryOp,
};
use crate::probe::Probe;
use crate::recorder::TraceRecorder;
use crate::result::{ProbeError, ProbeResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Host function callable from IR
pub type NativeFn = Box<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// Default instruction budget per top-level invocation
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

const MAX_CALL_DEPTH: usize = 256;

type MethodKey = (String, String);

fn key(class: &str, method: &str) -> MethodKey {
    (class.to_string(), method.to_string())
}

/// Outcome of one test method run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRun {
    /// Test method signature
    pub signature: String,
    /// Whether the test completed without error
    pub passed: bool,
    /// Error message of a failed test
    pub error: Option<String>,
}

/// IR interpreter
pub struct Interpreter<'a> {
    program: &'a Program,
    recorder: &'a TraceRecorder,
    statics: HashMap<MethodKey, Value>,
    natives: HashMap<MethodKey, NativeFn>,
    call_counts: HashMap<MethodKey, usize>,
    step_limit: usize,
    steps: usize,
    initialized: bool,
}

impl fmt::Debug for Interpreter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("classes", &self.program.classes.len())
            .field("statics", &self.statics)
            .field("natives", &self.natives.len())
            .field("step_limit", &self.step_limit)
            .finish_non_exhaustive()
    }
}

struct Frame {
    signature: String,
    locals: HashMap<String, Value>,
}

impl<'a> Interpreter<'a> {
    /// Interpreter over `program` with statics set to their declared values
    #[must_use]
    pub fn new(program: &'a Program, recorder: &'a TraceRecorder) -> Self {
        let mut statics = HashMap::new();
        for class in &program.classes {
            for field in &class.fields {
                let value = field
                    .initial
                    .as_ref()
                    .map_or_else(|| Value::zero(&field.ty), Value::from_literal);
                statics.insert(key(&class.name, &field.name), value);
            }
        }
        Self {
            program,
            recorder,
            statics,
            natives: HashMap::new(),
            call_counts: HashMap::new(),
            step_limit: DEFAULT_STEP_LIMIT,
            steps: 0,
            initialized: false,
        }
    }

    /// Set the instruction budget per top-level invocation
    #[must_use]
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit.max(1);
        self
    }

    /// Register `Assert.assertTrue/assertFalse/assertEquals` and
    /// `Math.abs/max/min`, under both simple and `java.lang`/`org.junit` names
    #[must_use]
    pub fn with_builtins(mut self) -> Self {
        for class in ["Assert", "org.junit.Assert"] {
            self.register_native(class, "assertTrue", |args| match args {
                [v] if v.as_bool()? => Ok(Value::Null),
                [_] => Err("assertion failed: expected true".to_string()),
                _ => Err("assertTrue takes one argument".to_string()),
            });
            self.register_native(class, "assertFalse", |args| match args {
                [v] if !v.as_bool()? => Ok(Value::Null),
                [_] => Err("assertion failed: expected false".to_string()),
                _ => Err("assertFalse takes one argument".to_string()),
            });
            self.register_native(class, "assertEquals", |args| match args {
                [expected, actual] => {
                    let equal = Value::binary(BinOp::Eq, expected, actual)?;
                    if equal.as_bool()? {
                        Ok(Value::Null)
                    } else {
                        Err(format!(
                            "assertion failed: expected {expected} but was {actual}"
                        ))
                    }
                }
                _ => Err("assertEquals takes two arguments".to_string()),
            });
        }
        for class in ["Math", "java.lang.Math"] {
            self.register_native(class, "abs", |args| match args {
                [v] if Value::binary(BinOp::Lt, v, &Value::Int(0))?.as_bool()? => {
                    Value::unary(UnaryOp::Neg, v)
                }
                [v] => Ok(v.clone()),
                _ => Err("abs takes one argument".to_string()),
            });
            self.register_native(class, "max", |args| match args {
                [a, b] => Ok(if Value::binary(BinOp::Ge, a, b)?.as_bool()? {
                    a.clone()
                } else {
                    b.clone()
                }),
                _ => Err("max takes two arguments".to_string()),
            });
            self.register_native(class, "min", |args| match args {
                [a, b] => Ok(if Value::binary(BinOp::Le, a, b)?.as_bool()? {
                    a.clone()
                } else {
                    b.clone()
                }),
                _ => Err("min takes two arguments".to_string()),
            });
        }
        self
    }

    /// Register a host function under `class.method`
    pub fn register_native<F>(&mut self, class: &str, method: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.natives.insert(key(class, method), Box::new(f));
    }

    /// Times `class.method` was called
    #[must_use]
    pub fn call_count(&self, class: &str, method: &str) -> usize {
        self.call_counts
            .get(&key(class, method))
            .copied()
            .unwrap_or(0)
    }

    /// Current value of a static field
    #[must_use]
    pub fn static_value(&self, class: &str, field: &str) -> Option<&Value> {
        self.statics.get(&key(class, field))
    }

    /// Run every `<clinit>` once, in class order
    pub fn initialize(&mut self) -> ProbeResult<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        let program = self.program;
        for class in &program.classes {
            for method in class.methods.iter().filter(|m| m.is_static_initializer()) {
                self.steps = 0;
                self.execute(class, method, Vec::new(), 0)?;
            }
        }
        Ok(())
    }

    /// Invoke `class.method` with `args`
    pub fn invoke(
        &mut self,
        class: &str,
        method: &str,
        args: Vec<Value>,
    ) -> ProbeResult<Option<Value>> {
        self.steps = 0;
        self.call(&CallTarget::new(class, method, Type::Void), args, 0)
    }

    /// Run every parameterless test method of `program`, one after another.
    ///
    /// A failing test is reported and the run moves on to the next one.
    pub fn run_tests(&mut self, config: &InstrumentConfig) -> ProbeResult<Vec<TestRun>> {
        self.initialize()?;
        let program = self.program;
        let mut runs = Vec::new();
        for class in &program.classes {
            for method in &class.methods {
                if !method.params.is_empty()
                    || method.is_static_initializer()
                    || !config.is_test_method(&class.name, &method.name)
                {
                    continue;
                }
                let signature = method.signature(&class.name);
                self.steps = 0;
                let run = match self.execute(class, method, Vec::new(), 0) {
                    Ok(_) => TestRun {
                        signature,
                        passed: true,
                        error: None,
                    },
                    Err(e) => {
                        warn!(test = %signature, error = %e, "test failed");
                        TestRun {
                            signature,
                            passed: false,
                            error: Some(e.to_string()),
                        }
                    }
                };
                runs.push(run);
            }
        }
        info!(
            tests = runs.len(),
            failed = runs.iter().filter(|r| !r.passed).count(),
            "test run finished"
        );
        Ok(runs)
    }

    fn call(
        &mut self,
        target: &CallTarget,
        args: Vec<Value>,
        depth: usize,
    ) -> ProbeResult<Option<Value>> {
        let id = key(&target.class, &target.method);
        *self.call_counts.entry(id.clone()).or_insert(0) += 1;
        if let Some(native) = self.natives.get(&id) {
            return native(&args)
                .map(Some)
                .map_err(|message| ProbeError::execution(format!("{}.{}", id.0, id.1), message));
        }
        let program = self.program;
        let class = program
            .class(&target.class)
            .ok_or_else(|| unresolved(target))?;
        let method = class.method(&target.method).ok_or_else(|| unresolved(target))?;
        self.execute(class, method, args, depth)
    }

    fn execute(
        &mut self,
        class: &'a Class,
        method: &'a Method,
        args: Vec<Value>,
        depth: usize,
    ) -> ProbeResult<Option<Value>> {
        let signature = method.signature(&class.name);
        if depth > MAX_CALL_DEPTH {
            return Err(ProbeError::execution(signature, "call depth exceeded"));
        }
        if args.len() != method.params.len() {
            return Err(ProbeError::execution(
                signature,
                format!("expected {} arguments, got {}", method.params.len(), args.len()),
            ));
        }
        let locals = method
            .params
            .iter()
            .map(|p| p.name.clone())
            .zip(args)
            .collect();
        let mut frame = Frame {
            signature,
            locals,
        };
        let positions: HashMap<InstrId, usize> = method
            .body
            .instructions
            .iter()
            .enumerate()
            .map(|(pos, instr)| (instr.id, pos))
            .collect();
        let jump = |frame: &Frame, target: InstrId| {
            positions.get(&target).copied().ok_or_else(|| {
                ProbeError::execution(frame.signature.clone(), format!("no instruction {target}"))
            })
        };

        let mut pc = 0;
        while let Some(instr) = method.body.instructions.get(pc) {
            self.steps += 1;
            if self.steps > self.step_limit {
                return Err(ProbeError::execution(
                    frame.signature,
                    format!("step limit {} exceeded", self.step_limit),
                ));
            }
            match &instr.kind {
                InstrKind::Assign { target, value } => {
                    let value = self.eval(value, &frame, depth)?;
                    match target {
                        Place::Local(local) => {
                            frame.locals.insert(local.name.clone(), value);
                        }
                        Place::StaticField(field) => {
                            self.statics.insert(key(&field.class, &field.name), value);
                        }
                    }
                    pc += 1;
                }
                InstrKind::Branch { condition, target } => {
                    let taken = self
                        .eval(condition, &frame, depth)?
                        .as_bool()
                        .map_err(|m| ProbeError::execution(frame.signature.clone(), m))?;
                    pc = if taken { jump(&frame, *target)? } else { pc + 1 };
                }
                InstrKind::Goto { target } => pc = jump(&frame, *target)?,
                InstrKind::Invoke { target, args } => {
                    let args = self.eval_args(args, &frame, depth)?;
                    self.call(target, args, depth + 1)?;
                    pc += 1;
                }
                InstrKind::Return(value) => {
                    return match value {
                        Some(expr) => self.eval(expr, &frame, depth).map(Some),
                        None => Ok(None),
                    };
                }
                InstrKind::Probe(probe) => {
                    self.fire(probe, &frame)?;
                    pc += 1;
                }
                InstrKind::Nop => pc += 1,
            }
        }
        debug!(method = %frame.signature, "fell off the end of the body");
        Ok(None)
    }

    fn eval_args(&mut self, args: &[Expr], frame: &Frame, depth: usize) -> ProbeResult<Vec<Value>> {
        args.iter().map(|a| self.eval(a, frame, depth)).collect()
    }

    fn eval(&mut self, expr: &Expr, frame: &Frame, depth: usize) -> ProbeResult<Value> {
        let failed = |message: String| ProbeError::execution(frame.signature.clone(), message);
        match expr {
            Expr::Literal(lit) => Ok(Value::from_literal(lit)),
            Expr::Local(local) => frame
                .locals
                .get(&local.name)
                .cloned()
                .ok_or_else(|| failed(format!("read of unassigned local {}", local.name))),
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, frame, depth)?;
                Value::unary(*op, &operand).map_err(failed)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, frame, depth)?;
                let right = self.eval(right, frame, depth)?;
                Value::binary(*op, &left, &right).map_err(failed)
            }
            Expr::Call { target, args } => {
                let args = self.eval_args(args, frame, depth)?;
                self.call(target, args, depth + 1)?
                    .ok_or_else(|| failed(format!("{}.{} returned no value", target.class, target.method)))
            }
            Expr::FieldRead(field) => self
                .statics
                .get(&key(&field.class, &field.name))
                .cloned()
                .ok_or_else(|| failed(format!("unknown static field {}", field.qualified_name()))),
            Expr::Opaque { description, .. } => {
                Err(failed(format!("cannot evaluate opaque expression `{description}`")))
            }
        }
    }

    fn fire(&self, probe: &Probe, frame: &Frame) -> ProbeResult<()> {
        let event = match probe {
            Probe::LineExercised { file, line } => TraceEvent::LineExercised {
                file: file.clone(),
                line: *line,
            },
            Probe::SubconditionChecked { file, line, index } => TraceEvent::SubconditionChecked {
                file: file.clone(),
                line: *line,
                index: *index,
            },
            Probe::Condition {
                file,
                line,
                index,
                left,
                op,
                right,
            } => TraceEvent::Condition {
                file: file.clone(),
                line: *line,
                index: *index,
                left: left.clone(),
                operator: op.symbol().to_string(),
                right: right.clone(),
            },
            Probe::Var {
                file,
                line,
                var,
                source,
            } => {
                let value = frame.locals.get(&var.name).ok_or_else(|| {
                    ProbeError::execution(
                        frame.signature.clone(),
                        format!("probe reads unassigned local {}", var.name),
                    )
                })?;
                TraceEvent::Var {
                    file: file.clone(),
                    line: *line,
                    name: var.name.clone(),
                    ty: var.ty.to_string(),
                    source: source.as_str().to_string(),
                    value: value.render(&var.ty),
                }
            }
            Probe::FieldAccessed { file, line, field } => TraceEvent::FieldAccessed {
                file: file.clone(),
                line: *line,
                field: field.clone(),
            },
            Probe::TestStart { test } => {
                self.recorder.begin_test(test);
                return Ok(());
            }
            Probe::TestEnd { test } => {
                // flush failures are logged by the recorder, which keeps the batch
                if let Err(e) = self.recorder.end_test(test) {
                    debug!(test = %test, error = %e, "end-of-test flush deferred");
                }
                return Ok(());
            }
        };
        self.recorder.record(&event);
        Ok(())
    }
}

fn unresolved(target: &CallTarget) -> ProbeError {
    ProbeError::execution(
        format!("{}.{}", target.class, target.method),
        "no such method or native",
    )
}
