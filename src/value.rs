use crate::ast::FunctionDeclaration;
use crate::callable::NativeFunction;
use std::fmt;
use std::fmt::Formatter;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Function(Rc<FunctionDeclaration>),
    NativeFunction(NativeFunction),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::NativeFunction(_) => "native function",
        }
    }
    /// Coercion used by `and`/`or`: only `false` and `nil` are falsey.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(x) => *x,
            Value::Nil => false,
            _ => true,
        }
    }
    pub fn is_callable(&self) -> bool {
        match self {
            Value::Function(_) | Value::NativeFunction(_) => true,
            _ => false,
        }
    }
    /// Display form used inside a list: strings are quoted and escaped.
    fn fmt_nested(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        _ => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            _ => write!(f, "{}", self),
        }
    }
}

/// Whole numbers print without a fractional part; anything else is rounded to
/// two decimals with trailing zeros dropped.
pub fn format_number(x: f64) -> String {
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == x.trunc() {
        if x == 0.0 {
            // Also covers -0.
            return "0".to_string();
        }
        return format!("{}", x);
    }
    let mut s = format!("{:.2}", x);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(x) => write!(f, "{}", x),
            Value::Number(x) => write!(f, "{}", format_number(*x)),
            Value::String(x) => write!(f, "{}", x),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                write!(f, "]")
            }
            Value::Function(_) => write!(f, "<function>"),
            Value::NativeFunction(_) => write!(f, "<native function>"),
        }
    }
}
