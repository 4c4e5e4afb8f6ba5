use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::Stmt,
    diagnostics::{Diagnostic, OleanderError},
    namespace::NamespaceRef,
};

/// A live object in the session. Cheap to clone; arrays and maps share
/// their backing storage, so two names bound to the same collection see
/// each other's mutations, the way an interactive console expects.
#[derive(Clone)]
pub struct Value(Rc<ValueKind>);

#[derive(Clone)]
pub enum ValueKind {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(RefCell<Vec<Value>>),
    Map(RefCell<IndexMap<String, Value>>),
    Module(ModuleValue),
    Function(ScriptFunction),
    Native(NativeFunction),
}

/// A named bundle of exports, as produced by a host's module registry or
/// the built-in prelude.
#[derive(Clone)]
pub struct ModuleValue {
    pub name: String,
    pub exports: IndexMap<String, Value>,
}

#[derive(Clone)]
pub struct ScriptFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Vec<Stmt>>,
    /// The namespace the function was created in; calls chain off it.
    pub captured: NamespaceRef,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    /// `None` accepts any number of arguments.
    pub arity: Option<usize>,
    pub callback: fn(&[Value]) -> Result<Value, OleanderError>,
}

impl NativeFunction {
    pub fn call(&self, args: &[Value]) -> Result<Value, OleanderError> {
        if let Some(arity) = self.arity {
            if args.len() != arity {
                return Err(Diagnostic::runtime(format!(
                    "`{}` expected {} argument(s) but received {}",
                    self.name,
                    arity,
                    args.len()
                ))
                .into());
            }
        }
        (self.callback)(args)
    }
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn unit() -> Self {
        Self::new(ValueKind::Unit)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::Str(value.into()))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(RefCell::new(values)))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Self {
        Self::new(ValueKind::Map(RefCell::new(entries)))
    }

    pub fn module(name: impl Into<String>, exports: IndexMap<String, Value>) -> Self {
        Self::new(ValueKind::Module(ModuleValue {
            name: name.into(),
            exports,
        }))
    }

    pub fn kind(&self) -> &ValueKind {
        &self.0
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.kind(), ValueKind::Unit)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind() {
            ValueKind::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind() {
            ValueKind::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.kind() {
            ValueKind::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.kind() {
            ValueKind::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self.kind() {
            ValueKind::Unit => false,
            ValueKind::Bool(b) => *b,
            ValueKind::Int(n) => *n != 0,
            ValueKind::Float(n) => *n != 0.0,
            ValueKind::Str(s) => !s.is_empty(),
            ValueKind::Array(values) => !values.borrow().is_empty(),
            ValueKind::Map(map) => !map.borrow().is_empty(),
            ValueKind::Module(_) | ValueKind::Function(_) | ValueKind::Native(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            ValueKind::Unit => "Unit",
            ValueKind::Bool(_) => "Bool",
            ValueKind::Int(_) => "Int",
            ValueKind::Float(_) => "Float",
            ValueKind::Str(_) => "Str",
            ValueKind::Array(_) => "Array",
            ValueKind::Map(_) => "Map",
            ValueKind::Module(_) => "Module",
            ValueKind::Function(_) | ValueKind::Native(_) => "Function",
        }
    }

    /// Structural equality; collections compare element-wise, functions
    /// never compare equal to anything but being the same object.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self.kind(), other.kind()) {
            (ValueKind::Unit, ValueKind::Unit) => true,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Int(b)) => a == b,
            (ValueKind::Float(a), ValueKind::Float(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Float(b)) | (ValueKind::Float(b), ValueKind::Int(a)) => {
                *a as f64 == *b
            }
            (ValueKind::Str(a), ValueKind::Str(b)) => a == b,
            (ValueKind::Array(a), ValueKind::Array(b)) => {
                if Rc::ptr_eq(&self.0, &other.0) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(l, r)| l.loosely_equals(r))
            }
            (ValueKind::Map(a), ValueKind::Map(b)) => {
                if Rc::ptr_eq(&self.0, &other.0) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.get(key).map(|rhs| value.loosely_equals(rhs)).unwrap_or(false)
                    })
            }
            _ => Rc::ptr_eq(&self.0, &other.0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ValueKind::Unit => write!(f, "unit"),
            ValueKind::Bool(b) => write!(f, "{b}"),
            ValueKind::Int(n) => write!(f, "{n}"),
            ValueKind::Float(n) => write!(f, "{n}"),
            ValueKind::Str(s) => write!(f, "{s}"),
            ValueKind::Array(values) => {
                write!(f, "[")?;
                for (idx, value) in values.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            ValueKind::Map(map) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in map.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            ValueKind::Module(module) => write!(f, "<module {}>", module.name),
            ValueKind::Function(fun) => write!(
                f,
                "<fn {}>",
                fun.name.as_deref().unwrap_or("anonymous")
            ),
            ValueKind::Native(fun) => write!(f, "<native fn {}>", fun.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ValueKind::Str(s) => write!(f, "{s:?}"),
            ValueKind::Array(values) => f.debug_list().entries(values.borrow().iter()).finish(),
            ValueKind::Map(map) => f.debug_map().entries(map.borrow().iter()).finish(),
            _ => write!(f, "{self}"),
        }
    }
}
