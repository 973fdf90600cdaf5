use crate::ast::{BinaryOperator, Block, Expression, Statement, UnaryOperator, Visitor};
use crate::builtins;
use crate::callable::Callable;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::value::Value;
use log::{debug, trace};
use std::cmp::Ordering;
use std::io::{BufRead, Write};

/// How a statement finished. Anything but `Normal` unwinds to the nearest
/// loop (`Break`, `Continue`) or function call (`Return`).
#[derive(Debug)]
pub enum Completion {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter<'io> {
    pub(crate) environment: Environment,
    call_stack: Vec<String>,
    input: &'io mut dyn BufRead,
    output: &'io mut dyn Write,
}

impl<'io> Interpreter<'io> {
    pub fn new(input: &'io mut dyn BufRead, output: &'io mut dyn Write) -> Interpreter<'io> {
        Interpreter::with_environment(builtins::global_environment(), input, output)
    }
    /// Runs against existing globals, e.g. those left by a previous prompt line.
    pub fn with_environment(
        environment: Environment,
        input: &'io mut dyn BufRead,
        output: &'io mut dyn Write,
    ) -> Interpreter<'io> {
        Interpreter {
            environment,
            call_stack: Vec::new(),
            input,
            output,
        }
    }
    pub fn into_environment(self) -> Environment {
        self.environment
    }

    /// Runs a program, reporting a runtime error as an `Error: ...` line on
    /// the output. Output written before the error is kept.
    pub fn interpret(&mut self, program: &Block) -> bool {
        match self.execute_program(program) {
            Ok(()) => true,
            Err(e) => {
                debug!("runtime error: {}", e);
                let _ = writeln!(self.output, "Error: {}", e);
                let _ = self.output.flush();
                false
            }
        }
    }
    pub fn execute_program(&mut self, program: &Block) -> Result<(), RuntimeError> {
        let completion = self.execute_block(program);
        self.environment.reset();
        self.call_stack.clear();
        self.output.flush()?;
        match completion? {
            Completion::Normal => Ok(()),
            Completion::Break => Err(RuntimeError::BreakOutsideLoop),
            Completion::Continue => Err(RuntimeError::ContinueOutsideLoop),
            Completion::Return(_) => Err(RuntimeError::ReturnOutsideFunction),
        }
    }

    pub(crate) fn evaluate(&mut self, expr: &Expression) -> Result<Value, RuntimeError> {
        expr.accept(self)
    }
    pub(crate) fn execute(&mut self, stmt: &Statement) -> Result<Completion, RuntimeError> {
        stmt.accept(self)
    }
    pub(crate) fn execute_block(&mut self, block: &Block) -> Result<Completion, RuntimeError> {
        for stmt in &block.statements {
            match self.execute(stmt)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    pub(crate) fn enter_function(&mut self, name: &str) {
        trace!("call {} (depth {})", name, self.call_stack.len() + 1);
        self.call_stack.push(name.to_string());
        self.environment.start_call();
    }
    pub(crate) fn leave_function(&mut self) {
        self.environment.end_scope();
        self.call_stack.pop();
    }
    /// Innermost call first.
    pub(crate) fn call_stack(&self) -> impl Iterator<Item = &str> {
        self.call_stack.iter().rev().map(|name| name.as_str())
    }
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(decl) => decl.call(self, arguments),
            Value::NativeFunction(native) => native.call(self, arguments),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }
    pub(crate) fn write_output(&mut self, text: &str) -> Result<(), RuntimeError> {
        self.output.write_all(text.as_bytes())?;
        Ok(())
    }
    /// One line of input without its line terminator; empty at end of input.
    pub(crate) fn read_line(&mut self) -> Result<String, RuntimeError> {
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }

    fn condition(
        &mut self,
        expr: &Expression,
        construct: &'static str,
    ) -> Result<bool, RuntimeError> {
        match self.evaluate(expr)? {
            Value::Boolean(x) => Ok(x),
            other => Err(RuntimeError::NonBooleanCondition {
                construct,
                found: other.type_name(),
            }),
        }
    }
    /// Runs one loop iteration's body. `None` means keep looping; otherwise
    /// the loop stops with the given completion.
    fn loop_body(&mut self, body: &Block) -> Result<Option<Completion>, RuntimeError> {
        match self.execute_block(body)? {
            Completion::Normal | Completion::Continue => Ok(None),
            Completion::Break => Ok(Some(Completion::Normal)),
            Completion::Return(value) => Ok(Some(Completion::Return(value))),
        }
    }
    fn numeric_for(
        &mut self,
        variable: &str,
        start: f64,
        end: f64,
        step: f64,
        body: &Block,
    ) -> Result<Completion, RuntimeError> {
        let mut i = start;
        while (step > 0.0 && i < end) || (step < 0.0 && i > end) {
            self.environment.define(variable, Value::Number(i));
            if let Some(completion) = self.loop_body(body)? {
                return Ok(completion);
            }
            i += step;
        }
        Ok(Completion::Normal)
    }
    fn for_each(
        &mut self,
        variable: &str,
        items: Vec<Value>,
        body: &Block,
    ) -> Result<Completion, RuntimeError> {
        for item in items {
            self.environment.define(variable, item);
            if let Some(completion) = self.loop_body(body)? {
                return Ok(completion);
            }
        }
        Ok(Completion::Normal)
    }
    fn range_bound(&mut self, expr: &Expression) -> Result<f64, RuntimeError> {
        match self.evaluate(expr)? {
            Value::Number(x) => Ok(x),
            _ => Err(RuntimeError::NonNumericRange),
        }
    }
    fn slice_bound(&mut self, expr: &Option<Box<Expression>>) -> Result<Option<i64>, RuntimeError> {
        match expr {
            None => Ok(None),
            Some(expr) => match self.evaluate(expr)? {
                Value::Number(x) => Ok(Some(x as i64)),
                other => Err(RuntimeError::NonNumericIndex(other.type_name())),
            },
        }
    }
}

impl<'io> Visitor<Expression, Result<Value, RuntimeError>> for Interpreter<'io> {
    fn visit(&mut self, expr: &Expression) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Number(x) => Ok(Value::Number(*x)),
            Expression::String(x) => Ok(Value::String(x.clone())),
            Expression::Boolean(x) => Ok(Value::Boolean(*x)),
            Expression::Nil => Ok(Value::Nil),
            Expression::Identifier(name) => self.environment.get(name),
            Expression::Unary { operator, operand } => {
                let value = self.evaluate(operand)?;
                unary_operation(*operator, value)
            }
            Expression::Binary {
                left,
                operator: BinaryOperator::And,
                right,
            } => {
                let result = self.evaluate(left)?.is_truthy() && self.evaluate(right)?.is_truthy();
                Ok(Value::Boolean(result))
            }
            Expression::Binary {
                left,
                operator: BinaryOperator::Or,
                right,
            } => {
                let result = self.evaluate(left)?.is_truthy() || self.evaluate(right)?.is_truthy();
                Ok(Value::Boolean(result))
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary_operation(*operator, left, right)
            }
            Expression::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::List(items))
            }
            Expression::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                index_value(object, index)
            }
            Expression::Slice { object, start, end } => {
                let object = self.evaluate(object)?;
                let start = self.slice_bound(start)?;
                let end = self.slice_bound(end)?;
                slice_value(object, start, end)
            }
            Expression::Call { callee, arguments } => {
                let callee = self.evaluate(callee)?;
                if !callee.is_callable() {
                    return Err(RuntimeError::NotCallable(callee.type_name()));
                }
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }
                self.call_value(&callee, values)
            }
            Expression::AnonymousFunction(decl) => Ok(Value::Function(decl.clone())),
        }
    }
}

impl<'io> Visitor<Statement, Result<Completion, RuntimeError>> for Interpreter<'io> {
    fn visit(&mut self, stmt: &Statement) -> Result<Completion, RuntimeError> {
        match stmt {
            Statement::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Completion::Normal)
            }
            Statement::Assignment { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.define(name, value);
                Ok(Completion::Normal)
            }
            Statement::Block(block) => self.execute_block(block),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.condition(condition, "If")? {
                    self.execute_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Statement::While { condition, body } => {
                while self.condition(condition, "While")? {
                    if let Some(completion) = self.loop_body(body)? {
                        return Ok(completion);
                    }
                }
                Ok(Completion::Normal)
            }
            Statement::For {
                variable,
                start,
                end,
                step,
                body,
            } => {
                let start = self.range_bound(start)?;
                let end = self.range_bound(end)?;
                let step = self.range_bound(step)?;
                if step == 0.0 {
                    return Err(RuntimeError::ZeroStep);
                }
                self.environment.start_loop();
                let result = self.numeric_for(variable, start, end, step, body);
                self.environment.end_scope();
                result
            }
            Statement::ForEach {
                variable,
                iterable,
                body,
            } => {
                let items = match self.evaluate(iterable)? {
                    Value::List(items) => items,
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    other => return Err(RuntimeError::NotIterable(other.type_name())),
                };
                self.environment.start_loop();
                let result = self.for_each(variable, items, body);
                self.environment.end_scope();
                result
            }
            Statement::Break => Ok(Completion::Break),
            Statement::Continue => Ok(Completion::Continue),
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Completion::Return(value))
            }
            Statement::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.write_output(&value.to_string())?;
                Ok(Completion::Normal)
            }
            Statement::Function(decl) => {
                self.environment
                    .define(&decl.name, Value::Function(decl.clone()));
                Ok(Completion::Normal)
            }
        }
    }
}

fn unary_operation(operator: UnaryOperator, value: Value) -> Result<Value, RuntimeError> {
    match (operator, value) {
        (UnaryOperator::Not, Value::Boolean(x)) => Ok(Value::Boolean(!x)),
        (UnaryOperator::Not, Value::Nil) => Ok(Value::Boolean(true)),
        (UnaryOperator::Not, _) => Ok(Value::Boolean(false)),
        (UnaryOperator::Negate, Value::Number(x)) => Ok(Value::Number(-x)),
        (UnaryOperator::Negate, other) => Err(RuntimeError::UnsupportedUnary {
            operator: operator.to_string(),
            operand: other.type_name(),
        }),
    }
}

/// Upper bound on the element or byte count a repetition may produce.
const MAX_REPEATED_LENGTH: usize = 1 << 28;

/// How many copies of a `unit`-long operand `n` asks for. Non-positive and
/// NaN counts give zero copies.
fn repeat_count(unit: usize, n: f64) -> Result<usize, RuntimeError> {
    if unit == 0 || n.is_nan() || n <= 0.0 {
        return Ok(0);
    }
    let count = n as usize;
    match unit.checked_mul(count) {
        Some(length) if length <= MAX_REPEATED_LENGTH => Ok(count),
        _ => Err(RuntimeError::RepetitionTooLarge),
    }
}

fn compare(operator: BinaryOperator, ordering: Option<Ordering>) -> Option<bool> {
    let result = match operator {
        BinaryOperator::Equal => ordering == Some(Ordering::Equal),
        BinaryOperator::NotEqual => ordering != Some(Ordering::Equal),
        BinaryOperator::Less => ordering == Some(Ordering::Less),
        BinaryOperator::LessEqual => {
            ordering == Some(Ordering::Less) || ordering == Some(Ordering::Equal)
        }
        BinaryOperator::Greater => ordering == Some(Ordering::Greater),
        BinaryOperator::GreaterEqual => {
            ordering == Some(Ordering::Greater) || ordering == Some(Ordering::Equal)
        }
        _ => return None,
    };
    Some(result)
}

/// Operand types decide which operators are legal; everything not listed
/// below is an error.
pub fn binary_operation(
    operator: BinaryOperator,
    left: Value,
    right: Value,
) -> Result<Value, RuntimeError> {
    let unsupported = RuntimeError::UnsupportedOperation {
        operator: operator.to_string(),
        left: left.type_name(),
        right: right.type_name(),
    };
    let both_nil = matches!((&left, &right), (Value::Nil, Value::Nil));
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match operator {
            BinaryOperator::Add => Ok(Value::Number(l + r)),
            BinaryOperator::Subtract => Ok(Value::Number(l - r)),
            BinaryOperator::Multiply => Ok(Value::Number(l * r)),
            BinaryOperator::Divide if r == 0.0 => Err(RuntimeError::DivisionByZero),
            BinaryOperator::Divide => Ok(Value::Number(l / r)),
            BinaryOperator::Modulo if r == 0.0 => Err(RuntimeError::ModuloByZero),
            BinaryOperator::Modulo => Ok(Value::Number(l % r)),
            BinaryOperator::Power => Ok(Value::Number(l.powf(r))),
            _ => compare(operator, l.partial_cmp(&r))
                .map(Value::Boolean)
                .ok_or(unsupported),
        },
        (Value::List(mut l), Value::List(r)) if operator == BinaryOperator::Add => {
            l.extend(r);
            Ok(Value::List(l))
        }
        (Value::List(items), Value::Number(n)) | (Value::Number(n), Value::List(items))
            if operator == BinaryOperator::Multiply =>
        {
            let count = repeat_count(items.len(), n)?;
            let mut repeated = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::List(repeated))
        }
        (Value::String(l), Value::String(r)) => match operator {
            BinaryOperator::Add => Ok(Value::String(l + &r)),
            BinaryOperator::Subtract => match l.strip_suffix(r.as_str()) {
                Some(stripped) => Ok(Value::String(stripped.to_string())),
                None => Ok(Value::String(l)),
            },
            _ => compare(operator, Some(l.cmp(&r)))
                .map(Value::Boolean)
                .ok_or(unsupported),
        },
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s))
            if operator == BinaryOperator::Multiply =>
        {
            let count = repeat_count(s.len(), n)?;
            Ok(Value::String(s.repeat(count)))
        }
        (Value::Nil, _) | (_, Value::Nil) => match operator {
            BinaryOperator::Equal => Ok(Value::Boolean(both_nil)),
            BinaryOperator::NotEqual => Ok(Value::Boolean(!both_nil)),
            _ => Err(unsupported),
        },
        _ => Err(unsupported),
    }
}

/// Maps a possibly negative index onto `0..length`.
fn resolve_index(
    index: i64,
    length: usize,
    container: &'static str,
) -> Result<usize, RuntimeError> {
    let adjusted = if index < 0 {
        index + length as i64
    } else {
        index
    };
    if adjusted < 0 || adjusted >= length as i64 {
        Err(RuntimeError::IndexOutOfRange {
            container,
            index,
            length,
        })
    } else {
        Ok(adjusted as usize)
    }
}

fn index_value(object: Value, index: Value) -> Result<Value, RuntimeError> {
    let index = match index {
        Value::Number(x) => x as i64,
        other => return Err(RuntimeError::NonNumericIndex(other.type_name())),
    };
    match object {
        Value::List(mut items) => {
            let i = resolve_index(index, items.len(), "List")?;
            Ok(items.swap_remove(i))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = resolve_index(index, chars.len(), "String")?;
            Ok(Value::String(chars[i].to_string()))
        }
        other => Err(RuntimeError::NotIndexable(other.type_name())),
    }
}

/// Clamps both bounds into `0..=length`; an inverted range is empty.
fn slice_bounds(start: Option<i64>, end: Option<i64>, length: usize) -> (usize, usize) {
    let len = length as i64;
    let clamp = |i: i64| {
        let i = if i < 0 { i + len } else { i };
        i.max(0).min(len) as usize
    };
    let start = start.map_or(0, clamp);
    let end = end.map_or(length, clamp);
    (start, end.max(start))
}

fn slice_value(object: Value, start: Option<i64>, end: Option<i64>) -> Result<Value, RuntimeError> {
    match object {
        Value::List(items) => {
            let (start, end) = slice_bounds(start, end, items.len());
            Ok(Value::List(items[start..end].to_vec()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(start, end, chars.len());
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        other => Err(RuntimeError::NotIndexable(other.type_name())),
    }
}

#[cfg(test)]
mod interpreter_tests {
    use crate::ast::{BinaryOperator, Block, Expression, Statement};
    use crate::error::RuntimeError;
    use crate::interpreter::{binary_operation, slice_bounds, Interpreter};
    use crate::value::Value;

    fn number(x: f64) -> Value {
        Value::Number(x)
    }
    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn arithmetic() {
        let result = binary_operation(BinaryOperator::Power, number(2.0), number(10.0)).unwrap();
        assert_eq!(result.to_string(), "1024");
        let result = binary_operation(BinaryOperator::Modulo, number(7.5), number(2.0)).unwrap();
        assert_eq!(result.to_string(), "1.5");
        assert!(matches!(
            binary_operation(BinaryOperator::Divide, number(1.0), number(0.0)),
            Err(RuntimeError::DivisionByZero)
        ));
        assert!(matches!(
            binary_operation(BinaryOperator::Modulo, number(1.0), number(0.0)),
            Err(RuntimeError::ModuloByZero)
        ));
    }

    #[test]
    fn string_operations() {
        let result = binary_operation(
            BinaryOperator::Subtract,
            string("hello world"),
            string("world"),
        );
        assert_eq!(result.unwrap().to_string(), "hello ");
        let result = binary_operation(BinaryOperator::Subtract, string("abc"), string("x"));
        assert_eq!(result.unwrap().to_string(), "abc");
        let result = binary_operation(BinaryOperator::Multiply, number(3.0), string("ab"));
        assert_eq!(result.unwrap().to_string(), "ababab");
        let result = binary_operation(BinaryOperator::Multiply, string("ab"), number(-1.0));
        assert_eq!(result.unwrap().to_string(), "");
        let result = binary_operation(BinaryOperator::Less, string("apple"), string("banana"));
        assert!(matches!(result, Ok(Value::Boolean(true))));
    }

    #[test]
    fn list_operations() {
        let list = Value::List(vec![number(1.0), number(2.0)]);
        let result = binary_operation(BinaryOperator::Add, list.clone(), list.clone());
        assert_eq!(result.unwrap().to_string(), "[1, 2, 1, 2]");
        let result = binary_operation(BinaryOperator::Multiply, list.clone(), number(2.0));
        assert_eq!(result.unwrap().to_string(), "[1, 2, 1, 2]");
        let result = binary_operation(BinaryOperator::Multiply, number(0.0), list.clone());
        assert_eq!(result.unwrap().to_string(), "[]");
        assert!(binary_operation(BinaryOperator::Subtract, list.clone(), list).is_err());
    }

    #[test]
    fn oversized_repetition_is_an_error() {
        let list = Value::List(vec![number(1.0), number(2.0)]);
        assert!(matches!(
            binary_operation(BinaryOperator::Multiply, list, number(1e19)),
            Err(RuntimeError::RepetitionTooLarge)
        ));
        assert!(matches!(
            binary_operation(BinaryOperator::Multiply, string("ab"), number(f64::INFINITY)),
            Err(RuntimeError::RepetitionTooLarge)
        ));
        let empty = Value::List(vec![]);
        let result = binary_operation(BinaryOperator::Multiply, empty, number(1e19));
        assert_eq!(result.unwrap().to_string(), "[]");
        let result = binary_operation(BinaryOperator::Multiply, string("ab"), number(f64::NAN));
        assert_eq!(result.unwrap().to_string(), "");
    }

    #[test]
    fn nil_only_compares_for_equality() {
        assert!(matches!(
            binary_operation(BinaryOperator::Equal, Value::Nil, Value::Nil),
            Ok(Value::Boolean(true))
        ));
        assert!(matches!(
            binary_operation(BinaryOperator::NotEqual, Value::Nil, number(1.0)),
            Ok(Value::Boolean(true))
        ));
        assert!(binary_operation(BinaryOperator::Less, Value::Nil, Value::Nil).is_err());
    }

    #[test]
    fn mixed_types_are_rejected() {
        let err = binary_operation(BinaryOperator::Add, number(1.0), string("a")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported operation for given types: number + string"
        );
        assert!(binary_operation(
            BinaryOperator::Equal,
            Value::Boolean(true),
            Value::Boolean(true)
        )
        .is_err());
    }

    #[test]
    fn slice_clamping() {
        assert_eq!(slice_bounds(None, None, 5), (0, 5));
        assert_eq!(slice_bounds(Some(-2), None, 5), (3, 5));
        assert_eq!(slice_bounds(Some(-10), Some(100), 5), (0, 5));
        assert_eq!(slice_bounds(Some(4), Some(1), 5), (4, 4));
    }

    #[test]
    fn print_statement_writes_display_form() {
        let program = Block {
            statements: vec![
                Statement::Print(Expression::Array(vec![
                    Expression::String("a".to_string()),
                    Expression::Number(2.5),
                ])),
                Statement::Print(Expression::String("!".to_string())),
            ],
        };
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        assert!(Interpreter::new(&mut input, &mut output).interpret(&program));
        assert_eq!(String::from_utf8(output).unwrap(), "[\"a\", 2.5]!");
    }

    #[test]
    fn runtime_error_is_reported_on_output() {
        let program = Block {
            statements: vec![
                Statement::Print(Expression::Number(1.0)),
                Statement::Break,
                Statement::Print(Expression::Number(2.0)),
            ],
        };
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        assert!(!Interpreter::new(&mut input, &mut output).interpret(&program));
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "1Error: Break statement outside loop\n"
        );
    }

    #[test]
    fn globals_survive_into_environment() {
        let program = Block {
            statements: vec![Statement::Assignment {
                name: "x".to_string(),
                value: Expression::Number(3.0),
            }],
        };
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut input, &mut output);
        assert!(interpreter.interpret(&program));
        let environment = interpreter.into_environment();
        assert!(matches!(environment.get("x"), Ok(Value::Number(x)) if x == 3.0));
        assert!(environment.get("print").is_ok());
    }
}
