use crate::error::RuntimeError;
use crate::value::Value;
use std::collections::BTreeMap;

/// The global bindings plus a stack of frames. Only the innermost frame is
/// visible: there is no parent-scope lookup. A function frame starts as a
/// copy of the globals and a loop frame as a copy of the frame it runs in.
#[derive(Debug, Clone)]
pub struct Environment {
    values: Vec<BTreeMap<String, Value>>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            values: vec![BTreeMap::new()],
        }
    }
    pub fn start_call(&mut self) {
        let globals = self.values.first().cloned().unwrap_or_default();
        self.values.push(globals);
    }
    pub fn start_loop(&mut self) {
        let current = self.values.last().cloned().unwrap_or_default();
        self.values.push(current);
    }
    pub fn end_scope(&mut self) {
        if self.values.len() > 1 {
            self.values.pop();
        }
    }
    /// Drops every frame, leaving only the globals.
    pub fn reset(&mut self) {
        self.values.truncate(1);
    }
    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.values.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }
    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.values
            .last()
            .and_then(|scope| scope.get(name))
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }
}

#[cfg(test)]
mod environment_tests {
    use crate::environment::Environment;
    use crate::error::RuntimeError;
    use crate::value::Value;

    fn number(env: &Environment, name: &str) -> f64 {
        match env.get(name) {
            Ok(Value::Number(n)) => n,
            other => panic!("expected number for {}, got {:?}", name, other),
        }
    }

    #[test]
    fn call_frame_copies_globals_and_discards_writes() {
        let mut env = Environment::new();
        env.define("x", Value::Number(10.0));
        env.start_call();
        assert_eq!(number(&env, "x"), 10.0);
        env.define("x", Value::Number(5.0));
        env.define("local", Value::Nil);
        assert_eq!(number(&env, "x"), 5.0);
        env.end_scope();
        assert_eq!(number(&env, "x"), 10.0);
        assert!(matches!(
            env.get("local"),
            Err(RuntimeError::UndefinedVariable(_))
        ));
    }

    #[test]
    fn call_frame_ignores_caller_locals() {
        let mut env = Environment::new();
        env.define("g", Value::Boolean(true));
        env.start_call();
        env.define("caller_local", Value::Nil);
        env.start_call();
        assert!(env.get("g").is_ok());
        assert!(env.get("caller_local").is_err());
        env.reset();
        env.define("after_reset", Value::Nil);
        env.start_call();
        assert!(env.get("after_reset").is_ok());
    }

    #[test]
    fn loop_frame_copies_current_frame() {
        let mut env = Environment::new();
        env.start_call();
        env.define("local", Value::Number(1.0));
        env.start_loop();
        assert_eq!(number(&env, "local"), 1.0);
        env.define("local", Value::Number(2.0));
        env.end_scope();
        assert_eq!(number(&env, "local"), 1.0);
    }

    #[test]
    fn globals_frame_is_never_popped() {
        let mut env = Environment::new();
        env.define("x", Value::Nil);
        env.end_scope();
        assert!(env.get("x").is_ok());
    }
}
