use crate::callable::{Arity, NativeFunction};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::Value;
use rand::Rng;
use std::cmp::Ordering;

type NativeResult = Result<Value, RuntimeError>;

macro_rules! native {
    ($name:ident, $arity:expr) => {
        NativeFunction {
            name: stringify!($name),
            arity: $arity,
            call: $name,
        }
    };
}

static NATIVES: &[NativeFunction] = &[
    // Math
    native!(abs, Arity::Exact(1)),
    native!(ceil, Arity::Exact(1)),
    native!(floor, Arity::Exact(1)),
    native!(round, Arity::Exact(1)),
    native!(sqrt, Arity::Exact(1)),
    native!(rnd, Arity::Exact(1)),
    native!(parse_num, Arity::Exact(1)),
    native!(to_string, Arity::Exact(1)),
    // Strings
    native!(len, Arity::Exact(1)),
    native!(lower, Arity::Exact(1)),
    native!(upper, Arity::Exact(1)),
    native!(split, Arity::Exact(2)),
    native!(join, Arity::Exact(2)),
    native!(replace, Arity::Exact(3)),
    // Lists
    native!(range, Arity::Between(2, 3)),
    native!(push, Arity::Exact(2)),
    native!(pop, Arity::Exact(1)),
    native!(insert, Arity::Exact(3)),
    native!(remove, Arity::Exact(2)),
    native!(sort, Arity::Exact(1)),
    // System
    native!(print, Arity::Exact(1)),
    native!(println, Arity::Exact(1)),
    native!(read, Arity::Exact(0)),
    native!(stacktrace, Arity::Exact(0)),
    // Higher-order
    native!(map, Arity::Exact(2)),
    native!(filter, Arity::Exact(2)),
    native!(reduce, Arity::Exact(3)),
    native!(each, Arity::Exact(2)),
];

/// A fresh global environment holding every native function.
pub fn global_environment() -> Environment {
    let mut environment = Environment::new();
    for native in NATIVES {
        environment.define(native.name, Value::NativeFunction(*native));
    }
    environment
}

fn number(function: &str, value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Number(x) => Ok(*x),
        other => Err(RuntimeError::InvalidArgument(format!(
            "{}() expects a number, got {}",
            function,
            other.type_name()
        ))),
    }
}

fn string<'v>(function: &str, value: &'v Value) -> Result<&'v str, RuntimeError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(RuntimeError::InvalidArgument(format!(
            "{}() expects a string, got {}",
            function,
            other.type_name()
        ))),
    }
}

fn list(function: &str, value: Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(RuntimeError::InvalidArgument(format!(
            "{}() expects a list, got {}",
            function,
            other.type_name()
        ))),
    }
}

fn callable(function: &str, value: &Value) -> Result<(), RuntimeError> {
    if value.is_callable() {
        Ok(())
    } else {
        Err(RuntimeError::InvalidArgument(format!(
            "{}() expects a function, got {}",
            function,
            value.type_name()
        )))
    }
}

/// Arity is checked before dispatch, so the argument list has the expected
/// length here.
fn take<const N: usize>(arguments: Vec<Value>) -> [Value; N] {
    let mut taken: [Value; N] = std::array::from_fn(|_| Value::Nil);
    for (slot, argument) in taken.iter_mut().zip(arguments) {
        *slot = argument;
    }
    taken
}

fn list_index(function: &str, index: f64, length: usize) -> Result<usize, RuntimeError> {
    let index = index as i64;
    let adjusted = if index < 0 {
        index + length as i64
    } else {
        index
    };
    if adjusted < 0 || adjusted as usize > length {
        return Err(RuntimeError::InvalidArgument(format!(
            "{}() index {} out of range for length {}",
            function, index, length
        )));
    }
    Ok(adjusted as usize)
}

fn abs(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    Ok(Value::Number(number("abs", &arguments[0])?.abs()))
}

fn ceil(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    Ok(Value::Number(number("ceil", &arguments[0])?.ceil()))
}

fn floor(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    Ok(Value::Number(number("floor", &arguments[0])?.floor()))
}

fn round(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    Ok(Value::Number(number("round", &arguments[0])?.round()))
}

fn sqrt(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let x = number("sqrt", &arguments[0])?;
    if x < 0.0 {
        return Err(RuntimeError::InvalidArgument(
            "sqrt() argument must be non-negative".to_string(),
        ));
    }
    Ok(Value::Number(x.sqrt()))
}

fn rnd(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let max = number("rnd", &arguments[0])? as i64;
    if max <= 0 {
        return Err(RuntimeError::InvalidArgument(
            "rnd() argument must be positive".to_string(),
        ));
    }
    Ok(Value::Number(rand::thread_rng().gen_range(0..max) as f64))
}

fn parse_num(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let text = string("parse_num", &arguments[0])?;
    Ok(text
        .trim()
        .parse::<f64>()
        .map(Value::Number)
        .unwrap_or(Value::Nil))
}

fn to_string(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let x = number("to_string", &arguments[0])?;
    Ok(Value::String(format!("{:.6}", x)))
}

fn len(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    match &arguments[0] {
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::List(items) => Ok(Value::Number(items.len() as f64)),
        other => Err(RuntimeError::InvalidArgument(format!(
            "len() expects a string or list, got {}",
            other.type_name()
        ))),
    }
}

fn lower(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    Ok(Value::String(string("lower", &arguments[0])?.to_lowercase()))
}

fn upper(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    Ok(Value::String(string("upper", &arguments[0])?.to_uppercase()))
}

fn split(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let text = string("split", &arguments[0])?;
    let delimiter = string("split", &arguments[1])?;
    let parts = if delimiter.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(delimiter)
            .map(|part| Value::String(part.to_string()))
            .collect()
    };
    Ok(Value::List(parts))
}

fn join(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [items, delimiter] = take::<2>(arguments);
    let delimiter = string("join", &delimiter)?;
    let items = list("join", items)?;
    let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
    Ok(Value::String(parts.join(delimiter)))
}

fn replace(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let text = string("replace", &arguments[0])?;
    let old = string("replace", &arguments[1])?;
    let new = string("replace", &arguments[2])?;
    if old.is_empty() {
        return Ok(Value::String(text.to_string()));
    }
    Ok(Value::String(text.replace(old, new)))
}

fn range(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let start = number("range", &arguments[0])?;
    let end = number("range", &arguments[1])?;
    let step = match arguments.get(2) {
        Some(step) => number("range", step)?,
        None => 1.0,
    };
    if step == 0.0 {
        return Err(RuntimeError::InvalidArgument(
            "range() step cannot be zero".to_string(),
        ));
    }
    let mut items = Vec::new();
    let mut i = start;
    while (step > 0.0 && i < end) || (step < 0.0 && i > end) {
        items.push(Value::Number(i));
        i += step;
    }
    Ok(Value::List(items))
}

fn push(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [items, item] = take::<2>(arguments);
    let mut items = list("push", items)?;
    items.push(item);
    Ok(Value::List(items))
}

fn pop(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [items] = take::<1>(arguments);
    list("pop", items)?
        .pop()
        .ok_or_else(|| RuntimeError::InvalidArgument("pop() on an empty list".to_string()))
}

fn insert(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [items, index, item] = take::<3>(arguments);
    let mut items = list("insert", items)?;
    let index = list_index("insert", number("insert", &index)?, items.len())?;
    items.insert(index, item);
    Ok(Value::List(items))
}

fn remove(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [items, index] = take::<2>(arguments);
    let mut items = list("remove", items)?;
    let index = list_index("remove", number("remove", &index)?, items.len())?;
    if index == items.len() {
        return Err(RuntimeError::InvalidArgument(format!(
            "remove() index {} out of range for length {}",
            index,
            items.len()
        )));
    }
    items.remove(index);
    Ok(Value::List(items))
}

fn sort(_: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [items] = take::<1>(arguments);
    let items = list("sort", items)?;
    if items.iter().all(|item| matches!(item, Value::Number(_))) {
        let mut numbers: Vec<f64> = items
            .iter()
            .filter_map(|item| match item {
                Value::Number(x) => Some(*x),
                _ => None,
            })
            .collect();
        numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        return Ok(Value::List(numbers.into_iter().map(Value::Number).collect()));
    }
    if items.iter().all(|item| matches!(item, Value::String(_))) {
        let mut strings: Vec<String> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect();
        strings.sort();
        return Ok(Value::List(strings.into_iter().map(Value::String).collect()));
    }
    Err(RuntimeError::InvalidArgument(
        "sort() requires a list of only numbers or only strings".to_string(),
    ))
}

fn print(interpreter: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    interpreter.write_output(&arguments[0].to_string())?;
    Ok(Value::Nil)
}

fn println(interpreter: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let mut text = arguments[0].to_string();
    text.push('\n');
    interpreter.write_output(&text)?;
    Ok(Value::Nil)
}

fn read(interpreter: &mut Interpreter<'_>, _: Vec<Value>) -> NativeResult {
    Ok(Value::String(interpreter.read_line()?))
}

fn stacktrace(interpreter: &mut Interpreter<'_>, _: Vec<Value>) -> NativeResult {
    let mut trace = String::from("Stack trace:\n");
    let mut empty = true;
    for (depth, name) in interpreter.call_stack().enumerate() {
        trace.push_str(&format!("  {}: {}\n", depth + 1, name));
        empty = false;
    }
    if empty {
        trace.push_str("  <empty stack>\n");
    }
    Ok(Value::String(trace))
}

fn map(interpreter: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [function, items] = take::<2>(arguments);
    callable("map", &function)?;
    let items = list("map", items)?;
    let mut mapped = Vec::with_capacity(items.len());
    for item in items {
        mapped.push(interpreter.call_value(&function, vec![item])?);
    }
    Ok(Value::List(mapped))
}

fn filter(interpreter: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [function, items] = take::<2>(arguments);
    callable("filter", &function)?;
    let items = list("filter", items)?;
    let mut kept = Vec::new();
    for item in items {
        let keep = interpreter.call_value(&function, vec![item.clone()])?;
        if let Value::Boolean(true) = keep {
            kept.push(item);
        }
    }
    Ok(Value::List(kept))
}

fn reduce(interpreter: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [function, items, initial] = take::<3>(arguments);
    callable("reduce", &function)?;
    let items = list("reduce", items)?;
    let mut accumulator = initial;
    for item in items {
        accumulator = interpreter.call_value(&function, vec![accumulator, item])?;
    }
    Ok(accumulator)
}

fn each(interpreter: &mut Interpreter<'_>, arguments: Vec<Value>) -> NativeResult {
    let [function, items] = take::<2>(arguments);
    callable("each", &function)?;
    for item in list("each", items)? {
        interpreter.call_value(&function, vec![item])?;
    }
    Ok(Value::Nil)
}
