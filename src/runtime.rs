use std::rc::Rc;

use crate::{
    ast::{BinaryOp, Expr, ExprKind, Literal, Program, Stmt, StmtKind, UnaryOp},
    diagnostics::{Diagnostic, OleanderError, Result, SourceSpan},
    namespace::{Namespace, NamespaceRef},
    value::{ScriptFunction, Value, ValueKind},
};

/// Executes compiled programs against a shared namespace. The root
/// namespace is created once, pre-loaded with the prelude, and mutated in
/// place by everything that runs; there is no rollback. Blocks do not open
/// scopes (only function calls do), so a name assigned inside an `if` or
/// loop body lands in the surrounding namespace, as console users expect.
pub struct Interpreter {
    namespace: NamespaceRef,
}

enum Flow {
    Next,
    Value(Value),
    Return(Value),
    Break,
    Continue,
}

impl Interpreter {
    pub fn new() -> Self {
        let namespace = Namespace::root();
        crate::stdlib::install(&namespace);
        Self { namespace }
    }

    pub fn namespace(&self) -> &NamespaceRef {
        &self.namespace
    }

    /// Run a program to completion. Statements execute in textual order;
    /// a runtime failure propagates immediately, leaving all side effects
    /// of already-executed statements in place. The produced value is the
    /// last expression statement's value (or the `return` value), so a
    /// console can echo it.
    pub fn run(&mut self, program: &Program) -> Result<Value> {
        let ns = Rc::clone(&self.namespace);
        let mut last = Value::unit();
        for stmt in &program.stmts {
            match self.exec(stmt, &ns)? {
                Flow::Next => {}
                Flow::Value(value) => last = value,
                Flow::Return(value) => return Ok(value),
                Flow::Break => return Err(fail("`break` outside loop", stmt.span)),
                Flow::Continue => return Err(fail("`continue` outside loop", stmt.span)),
            }
        }
        Ok(last)
    }

    fn exec(&mut self, stmt: &Stmt, ns: &NamespaceRef) -> Result<Flow> {
        match &stmt.kind {
            StmtKind::Function { name, params, body } => {
                let function = ScriptFunction {
                    name: Some(name.clone()),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    captured: Rc::clone(ns),
                };
                Namespace::bind(ns, name, Value::new(ValueKind::Function(function)));
                Ok(Flow::Next)
            }
            StmtKind::Expr(expr) => Ok(Flow::Value(self.eval(expr, ns)?)),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition, ns)?.is_truthy() {
                    self.exec_block(then_branch, ns)
                } else if let Some(branch) = else_branch {
                    self.exec_block(branch, ns)
                } else {
                    Ok(Flow::Next)
                }
            }
            StmtKind::While { condition, body } => {
                while self.eval(condition, ns)?.is_truthy() {
                    match self.exec_block(body, ns)? {
                        Flow::Next | Flow::Value(_) | Flow::Continue => {}
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
                Ok(Flow::Next)
            }
            StmtKind::For {
                binding,
                iterable,
                body,
            } => {
                let source = self.eval(iterable, ns)?;
                for item in iterate(&source, iterable.span)? {
                    Namespace::bind(ns, binding, item);
                    match self.exec_block(body, ns)? {
                        Flow::Next | Flow::Value(_) | Flow::Continue => {}
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
                Ok(Flow::Next)
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, ns)?,
                    None => Value::unit(),
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], ns: &NamespaceRef) -> Result<Flow> {
        let mut last = Flow::Next;
        for stmt in stmts {
            match self.exec(stmt, ns)? {
                Flow::Next => last = Flow::Next,
                Flow::Value(value) => last = Flow::Value(value),
                other => return Ok(other),
            }
        }
        Ok(last)
    }

    fn eval(&mut self, expr: &Expr, ns: &NamespaceRef) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(literal_value(lit)),
            ExprKind::Variable(name) => Namespace::lookup(ns, name)
                .ok_or_else(|| fail(format!("undefined name `{name}`"), expr.span)),
            ExprKind::Binary { op, left, right } => self.binary(*op, left, right, ns, expr.span),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand, ns)?;
                match op {
                    UnaryOp::Negate => match value.kind() {
                        ValueKind::Int(n) => Ok(Value::int(-n)),
                        ValueKind::Float(n) => Ok(Value::float(-n)),
                        _ => Err(fail(
                            format!("unary `-` expects a number, found {}", value.type_name()),
                            expr.span,
                        )),
                    },
                    UnaryOp::Not => Ok(Value::bool(!value.is_truthy())),
                }
            }
            ExprKind::Assign { target, value } => {
                let value = self.eval(value, ns)?;
                self.assign(target, value, ns)?;
                Ok(Value::unit())
            }
            ExprKind::Call { callee, args } => {
                let callee_value = self.eval(callee, ns)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval(arg, ns)?);
                }
                self.call(&callee_value, &arg_values, expr.span)
            }
            ExprKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element, ns)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::Map(entries) => {
                let mut map = indexmap::IndexMap::new();
                for (key, value_expr) in entries {
                    let value = self.eval(value_expr, ns)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::map(map))
            }
            ExprKind::Index { target, index } => {
                let target_value = self.eval(target, ns)?;
                let index_value = self.eval(index, ns)?;
                index_get(&target_value, &index_value, expr.span)
            }
            ExprKind::Field { target, field } => {
                let target_value = self.eval(target, ns)?;
                field_get(&target_value, field, expr.span)
            }
            ExprKind::Function { params, body } => {
                let function = ScriptFunction {
                    name: None,
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    captured: Rc::clone(ns),
                };
                Ok(Value::new(ValueKind::Function(function)))
            }
        }
    }

    fn call(&mut self, callee: &Value, args: &[Value], span: SourceSpan) -> Result<Value> {
        match callee.kind() {
            ValueKind::Native(native) => native.call(args),
            ValueKind::Function(function) => {
                if args.len() != function.params.len() {
                    return Err(fail(
                        format!(
                            "function `{}` expected {} argument(s) but received {}",
                            function.name.as_deref().unwrap_or("anonymous"),
                            function.params.len(),
                            args.len()
                        ),
                        span,
                    ));
                }
                let scope = Namespace::child_of(&function.captured);
                for (param, value) in function.params.iter().zip(args) {
                    scope.borrow_mut().define(param.clone(), value.clone());
                }
                let body = Rc::clone(&function.body);
                match self.exec_block(&body, &scope)? {
                    Flow::Return(value) | Flow::Value(value) => Ok(value),
                    Flow::Next => Ok(Value::unit()),
                    Flow::Break | Flow::Continue => {
                        Err(fail("loop control flow cannot escape a function", span))
                    }
                }
            }
            _ => Err(fail(
                format!("value of type {} is not callable", callee.type_name()),
                span,
            )),
        }
    }

    fn assign(&mut self, target: &Expr, value: Value, ns: &NamespaceRef) -> Result<()> {
        match &target.kind {
            ExprKind::Variable(name) => {
                Namespace::bind(ns, name, value);
                Ok(())
            }
            ExprKind::Field {
                target: owner,
                field,
            } => {
                let owner_value = self.eval(owner, ns)?;
                match owner_value.kind() {
                    ValueKind::Map(map) => {
                        map.borrow_mut().insert(field.clone(), value);
                        Ok(())
                    }
                    ValueKind::Module(_) => Err(fail(
                        format!("module exports are read-only, cannot assign `{field}`"),
                        target.span,
                    )),
                    _ => Err(fail(
                        format!(
                            "field assignment expects a map, found {}",
                            owner_value.type_name()
                        ),
                        target.span,
                    )),
                }
            }
            ExprKind::Index {
                target: owner,
                index,
            } => {
                let owner_value = self.eval(owner, ns)?;
                let index_value = self.eval(index, ns)?;
                match (owner_value.kind(), index_value.kind()) {
                    (ValueKind::Array(values), ValueKind::Int(idx)) => {
                        let mut values = values.borrow_mut();
                        let idx = array_index(*idx, values.len(), index.span)?;
                        values[idx] = value;
                        Ok(())
                    }
                    (ValueKind::Map(map), ValueKind::Str(key)) => {
                        map.borrow_mut().insert(key.clone(), value);
                        Ok(())
                    }
                    (ValueKind::Array(_), _) => Err(fail(
                        format!(
                            "array index must be Int, found {}",
                            index_value.type_name()
                        ),
                        index.span,
                    )),
                    _ => Err(fail(
                        format!(
                            "index assignment expects an array or map, found {}",
                            owner_value.type_name()
                        ),
                        target.span,
                    )),
                }
            }
            // The parser rejects every other target shape.
            _ => Err(fail("cannot assign to this expression", target.span)),
        }
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        ns: &NamespaceRef,
        span: SourceSpan,
    ) -> Result<Value> {
        // Short-circuit forms return the deciding operand itself.
        if op == BinaryOp::And {
            let left_value = self.eval(left, ns)?;
            return if left_value.is_truthy() {
                self.eval(right, ns)
            } else {
                Ok(left_value)
            };
        }
        if op == BinaryOp::Or {
            let left_value = self.eval(left, ns)?;
            return if left_value.is_truthy() {
                Ok(left_value)
            } else {
                self.eval(right, ns)
            };
        }

        let lhs = self.eval(left, ns)?;
        let rhs = self.eval(right, ns)?;
        match op {
            BinaryOp::Equal => Ok(Value::bool(lhs.loosely_equals(&rhs))),
            BinaryOp::NotEqual => Ok(Value::bool(!lhs.loosely_equals(&rhs))),
            BinaryOp::Add => match (lhs.kind(), rhs.kind()) {
                (ValueKind::Str(a), ValueKind::Str(b)) => {
                    Ok(Value::string(format!("{a}{b}")))
                }
                _ => arithmetic(op, &lhs, &rhs, span),
            },
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                arithmetic(op, &lhs, &rhs, span)
            }
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                comparison(op, &lhs, &rhs, span)
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(n) => Value::int(*n),
        Literal::Float(n) => Value::float(*n),
        Literal::Bool(b) => Value::bool(*b),
        Literal::Str(s) => Value::string(s.clone()),
        Literal::Nil => Value::unit(),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value, span: SourceSpan) -> Result<Value> {
    match (lhs.kind(), rhs.kind()) {
        (ValueKind::Int(a), ValueKind::Int(b)) => int_arithmetic(op, *a, *b, span),
        (ValueKind::Int(a), ValueKind::Float(b)) => float_arithmetic(op, *a as f64, *b, span),
        (ValueKind::Float(a), ValueKind::Int(b)) => float_arithmetic(op, *a, *b as f64, span),
        (ValueKind::Float(a), ValueKind::Float(b)) => float_arithmetic(op, *a, *b, span),
        _ => Err(fail(
            format!(
                "operator expects numbers, found {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ),
            span,
        )),
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64, span: SourceSpan) -> Result<Value> {
    let overflow = || fail("integer overflow", span);
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::int).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::int).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::int).ok_or_else(overflow),
        // Division always yields a float, the way a calculator-style
        // console reads best; use std.math helpers for integer division.
        BinaryOp::Div => {
            if b == 0 {
                Err(fail("division by zero", span))
            } else {
                Ok(Value::float(a as f64 / b as f64))
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                Err(fail("modulo by zero", span))
            } else {
                Ok(Value::int(a.rem_euclid(b)))
            }
        }
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64, span: SourceSpan) -> Result<Value> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(fail("division by zero", span));
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(fail("modulo by zero", span));
            }
            a.rem_euclid(b)
        }
        _ => unreachable!("not an arithmetic operator"),
    };
    Ok(Value::float(result))
}

fn comparison(op: BinaryOp, lhs: &Value, rhs: &Value, span: SourceSpan) -> Result<Value> {
    let ordering = match (lhs.kind(), rhs.kind()) {
        (ValueKind::Str(a), ValueKind::Str(b)) => a.partial_cmp(b),
        (ValueKind::Int(a), ValueKind::Int(b)) => a.partial_cmp(b),
        (ValueKind::Int(a), ValueKind::Float(b)) => (*a as f64).partial_cmp(b),
        (ValueKind::Float(a), ValueKind::Int(b)) => a.partial_cmp(&(*b as f64)),
        (ValueKind::Float(a), ValueKind::Float(b)) => a.partial_cmp(b),
        _ => {
            return Err(fail(
                format!(
                    "cannot compare {} with {}",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                span,
            ));
        }
    };
    let Some(ordering) = ordering else {
        return Ok(Value::bool(false));
    };
    let result = match op {
        BinaryOp::Less => ordering.is_lt(),
        BinaryOp::LessEqual => ordering.is_le(),
        BinaryOp::Greater => ordering.is_gt(),
        BinaryOp::GreaterEqual => ordering.is_ge(),
        _ => unreachable!("not a comparison operator"),
    };
    Ok(Value::bool(result))
}

fn index_get(target: &Value, index: &Value, span: SourceSpan) -> Result<Value> {
    match (target.kind(), index.kind()) {
        (ValueKind::Array(values), ValueKind::Int(idx)) => {
            let values = values.borrow();
            let idx = array_index(*idx, values.len(), span)?;
            Ok(values[idx].clone())
        }
        (ValueKind::Str(text), ValueKind::Int(idx)) => {
            let chars: Vec<char> = text.chars().collect();
            let idx = array_index(*idx, chars.len(), span)?;
            Ok(Value::string(chars[idx].to_string()))
        }
        (ValueKind::Map(map), ValueKind::Str(key)) => {
            map.borrow().get(key).cloned().ok_or_else(|| {
                fail(format!("missing key `{key}`"), span)
            })
        }
        _ => Err(fail(
            format!(
                "cannot index {} with {}",
                target.type_name(),
                index.type_name()
            ),
            span,
        )),
    }
}

/// Negative indices count from the end.
fn array_index(raw: i64, len: usize, span: SourceSpan) -> Result<usize> {
    let resolved = if raw < 0 { raw + len as i64 } else { raw };
    if resolved < 0 || resolved as usize >= len {
        Err(fail(
            format!("index {raw} out of bounds (length {len})"),
            span,
        ))
    } else {
        Ok(resolved as usize)
    }
}

fn field_get(target: &Value, field: &str, span: SourceSpan) -> Result<Value> {
    match target.kind() {
        ValueKind::Map(map) => map.borrow().get(field).cloned().ok_or_else(|| {
            fail(format!("missing field `{field}`"), span)
        }),
        ValueKind::Module(module) => module.exports.get(field).cloned().ok_or_else(|| {
            fail(
                format!("module `{}` has no export `{field}`", module.name),
                span,
            )
        }),
        _ => Err(fail(
            format!(
                "field access expects a map or module, found {}",
                target.type_name()
            ),
            span,
        )),
    }
}

fn iterate(value: &Value, span: SourceSpan) -> Result<Vec<Value>> {
    match value.kind() {
        ValueKind::Array(values) => Ok(values.borrow().clone()),
        ValueKind::Str(text) => Ok(text
            .chars()
            .map(|ch| Value::string(ch.to_string()))
            .collect()),
        ValueKind::Map(map) => Ok(map
            .borrow()
            .iter()
            .map(|(key, value)| Value::array(vec![Value::string(key.clone()), value.clone()]))
            .collect()),
        _ => Err(fail(
            format!("value of type {} is not iterable", value.type_name()),
            span,
        )),
    }
}

fn fail(message: impl Into<String>, span: SourceSpan) -> OleanderError {
    Diagnostic::runtime(message).with_span(span).into()
}
