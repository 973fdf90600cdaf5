pub mod ast;
pub mod builtins;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod value;

pub use crate::environment::Environment;
pub use crate::error::Error;
pub use crate::interpreter::Interpreter;
pub use crate::value::Value;

use std::io::{BufRead, Write};

/// Lexes and parses a whole program.
pub fn parse_source(source: &str) -> Result<ast::Block, Error> {
    let tokens = scanner::tokenize(source)?;
    Ok(parser::parse(&tokens)?)
}

/// Runs `source` with a fresh global environment, failing on the first
/// error of any phase.
pub fn run(source: &str, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<(), Error> {
    let program = parse_source(source)?;
    Interpreter::new(input, output).execute_program(&program)?;
    Ok(())
}

/// Like [`run`], but reports any error as an `Error: <message>` line on
/// `output` and returns whether the program succeeded.
pub fn interpret(source: &str, input: &mut dyn BufRead, output: &mut dyn Write) -> bool {
    match parse_source(source) {
        Ok(program) => Interpreter::new(input, output).interpret(&program),
        Err(e) => {
            let _ = writeln!(output, "Error: {}", e);
            false
        }
    }
}
