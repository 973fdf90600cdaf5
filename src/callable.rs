use crate::ast::FunctionDeclaration;
use crate::error::RuntimeError;
use crate::interpreter::{Completion, Interpreter};
use crate::value::Value;
use log::trace;
use std::fmt;
use std::fmt::Debug;

pub trait Callable {
    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Between(min, max) => min <= count && count <= max,
        }
    }
    pub fn check(self, name: &str, count: usize) -> Result<(), RuntimeError> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(RuntimeError::WrongArgumentCount {
                name: name.to_string(),
                expected: self.to_string(),
                got: count,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(0) => write!(f, "no arguments"),
            Arity::Exact(1) => write!(f, "exactly 1 argument"),
            Arity::Exact(n) => write!(f, "exactly {} arguments", n),
            Arity::Between(min, max) => write!(f, "between {} and {} arguments", min, max),
        }
    }
}

/// User functions run in a fresh environment seeded from the globals as they
/// are at call time, never from the caller's locals.
impl Callable for FunctionDeclaration {
    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        Arity::Exact(self.parameters.len()).check(self.display_name(), arguments.len())?;

        interpreter.enter_function(self.display_name());
        for (parameter, argument) in self.parameters.iter().zip(arguments.into_iter()) {
            interpreter.environment.define(parameter, argument);
        }
        let result = interpreter.execute_block(&self.body);
        interpreter.leave_function();

        match result? {
            Completion::Return(value) => Ok(value),
            Completion::Normal => Ok(Value::Nil),
            Completion::Break => Err(RuntimeError::BreakOutsideLoop),
            Completion::Continue => Err(RuntimeError::ContinueOutsideLoop),
        }
    }
}

pub type NativeCall = fn(&mut Interpreter<'_>, Vec<Value>) -> Result<Value, RuntimeError>;

#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: Arity,
    pub call: NativeCall,
}

impl Callable for NativeFunction {
    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        self.arity.check(self.name, arguments.len())?;
        trace!("native call {}() with {} argument(s)", self.name, arguments.len());
        (self.call)(interpreter, arguments)
    }
}

impl Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

#[cfg(test)]
mod callable_tests {
    use crate::callable::Arity;
    use crate::error::RuntimeError;

    #[test]
    fn arity_messages() {
        assert_eq!(Arity::Exact(0).to_string(), "no arguments");
        assert_eq!(Arity::Exact(1).to_string(), "exactly 1 argument");
        assert_eq!(Arity::Exact(3).to_string(), "exactly 3 arguments");
        assert_eq!(
            Arity::Between(2, 3).to_string(),
            "between 2 and 3 arguments"
        );
    }

    #[test]
    fn arity_check() {
        assert!(Arity::Between(2, 3).check("range", 2).is_ok());
        assert!(Arity::Between(2, 3).check("range", 3).is_ok());
        match Arity::Exact(1).check("abs", 2) {
            Err(e @ RuntimeError::WrongArgumentCount { .. }) => {
                assert_eq!(e.to_string(), "abs() expects exactly 1 argument, got 2")
            }
            other => panic!("expected arity error, got {:?}", other),
        }
    }
}
