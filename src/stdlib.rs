use indexmap::IndexMap;

use crate::{
    diagnostics::{Diagnostic, Result},
    namespace::NamespaceRef,
    value::{NativeFunction, Value, ValueKind},
};

/// Install the prelude into a fresh root namespace. Runs before session
/// bootstrap, so auto-imports, the host binding, and the startup script
/// may all shadow anything defined here.
pub fn install(ns: &NamespaceRef) {
    let mut scope = ns.borrow_mut();
    scope.define("print", native("print", None, io_print));
    scope.define("println", native("println", None, io_println));
    scope.define("len", native("len", Some(1), len));
    scope.define("str", native("str", Some(1), stringify));
    scope.define("type_of", native("type_of", Some(1), type_of));
    scope.define("push", native("push", Some(2), array_push));
    scope.define("range", native("range", None, range));
    scope.define("raise", native("raise", Some(1), raise));

    let mut math = IndexMap::new();
    math.insert("abs".into(), native("abs", Some(1), math_abs));
    math.insert("floor".into(), native("floor", Some(1), math_floor));
    math.insert("ceil".into(), native("ceil", Some(1), math_ceil));
    math.insert("sqrt".into(), native("sqrt", Some(1), math_sqrt));

    let mut strings = IndexMap::new();
    strings.insert("trim".into(), native("trim", Some(1), string_trim));
    strings.insert("split".into(), native("split", Some(2), string_split));
    strings.insert("to_upper".into(), native("to_upper", Some(1), string_to_upper));
    strings.insert("to_lower".into(), native("to_lower", Some(1), string_to_lower));
    strings.insert("contains".into(), native("contains", Some(2), string_contains));

    let mut exports = IndexMap::new();
    exports.insert("math".into(), Value::module("std.math", math));
    exports.insert("strings".into(), Value::module("std.strings", strings));
    scope.define("std", Value::module("std", exports));
}

fn native(
    name: &'static str,
    arity: Option<usize>,
    callback: fn(&[Value]) -> Result<Value>,
) -> Value {
    Value::new(ValueKind::Native(NativeFunction {
        name,
        arity,
        callback,
    }))
}

fn argument_error(name: &str, expected: &str, found: &Value) -> crate::diagnostics::OleanderError {
    Diagnostic::runtime(format!(
        "`{name}` expected {expected}, found {}",
        found.type_name()
    ))
    .into()
}

fn expect_string(value: &Value, name: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| argument_error(name, "Str", value))
}

fn expect_int(value: &Value, name: &str) -> Result<i64> {
    value
        .as_int()
        .ok_or_else(|| argument_error(name, "Int", value))
}

fn expect_number(value: &Value, name: &str) -> Result<f64> {
    match value.kind() {
        ValueKind::Int(n) => Ok(*n as f64),
        ValueKind::Float(n) => Ok(*n),
        _ => Err(argument_error(name, "a number", value)),
    }
}

fn io_print(args: &[Value]) -> Result<Value> {
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            print!(" ");
        }
        print!("{arg}");
    }
    Ok(Value::unit())
}

fn io_println(args: &[Value]) -> Result<Value> {
    io_print(args)?;
    println!();
    Ok(Value::unit())
}

fn len(args: &[Value]) -> Result<Value> {
    let count = match args[0].kind() {
        ValueKind::Str(s) => s.chars().count(),
        ValueKind::Array(values) => values.borrow().len(),
        ValueKind::Map(map) => map.borrow().len(),
        _ => return Err(argument_error("len", "Str, Array, or Map", &args[0])),
    };
    Ok(Value::int(count as i64))
}

fn stringify(args: &[Value]) -> Result<Value> {
    Ok(Value::string(args[0].to_string()))
}

fn type_of(args: &[Value]) -> Result<Value> {
    Ok(Value::string(args[0].type_name()))
}

/// Appends in place: every name bound to the same array sees the change.
fn array_push(args: &[Value]) -> Result<Value> {
    match args[0].kind() {
        ValueKind::Array(values) => {
            values.borrow_mut().push(args[1].clone());
            Ok(Value::unit())
        }
        _ => Err(argument_error("push", "Array", &args[0])),
    }
}

fn range(args: &[Value]) -> Result<Value> {
    let (start, end) = match args {
        [end] => (0, expect_int(end, "range")?),
        [start, end] => (expect_int(start, "range")?, expect_int(end, "range")?),
        _ => {
            return Err(Diagnostic::runtime(format!(
                "`range` expected 1 or 2 arguments but received {}",
                args.len()
            ))
            .into());
        }
    };
    Ok(Value::array((start..end).map(Value::int).collect()))
}

/// The script-level way to fail: surfaces as an uncaught runtime error.
fn raise(args: &[Value]) -> Result<Value> {
    Err(Diagnostic::runtime(args[0].to_string()).into())
}

fn math_abs(args: &[Value]) -> Result<Value> {
    match args[0].kind() {
        ValueKind::Int(n) => Ok(Value::int(n.abs())),
        ValueKind::Float(n) => Ok(Value::float(n.abs())),
        _ => Err(argument_error("std.math.abs", "a number", &args[0])),
    }
}

fn math_floor(args: &[Value]) -> Result<Value> {
    let number = expect_number(&args[0], "std.math.floor")?;
    Ok(Value::int(number.floor() as i64))
}

fn math_ceil(args: &[Value]) -> Result<Value> {
    let number = expect_number(&args[0], "std.math.ceil")?;
    Ok(Value::int(number.ceil() as i64))
}

fn math_sqrt(args: &[Value]) -> Result<Value> {
    let number = expect_number(&args[0], "std.math.sqrt")?;
    if number < 0.0 {
        return Err(Diagnostic::runtime("sqrt expects a non-negative input").into());
    }
    Ok(Value::float(number.sqrt()))
}

fn string_trim(args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.strings.trim")?;
    Ok(Value::string(text.trim()))
}

fn string_split(args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.strings.split")?;
    let separator = expect_string(&args[1], "std.strings.split")?;
    if separator.is_empty() {
        return Err(Diagnostic::runtime("split separator must not be empty").into());
    }
    let parts = text.split(&separator).map(Value::string).collect();
    Ok(Value::array(parts))
}

fn string_to_upper(args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.strings.to_upper")?;
    Ok(Value::string(text.to_uppercase()))
}

fn string_to_lower(args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.strings.to_lower")?;
    Ok(Value::string(text.to_lowercase()))
}

fn string_contains(args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.strings.contains")?;
    let needle = expect_string(&args[1], "std.strings.contains")?;
    Ok(Value::bool(text.contains(&needle)))
}
