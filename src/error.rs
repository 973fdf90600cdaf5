use crate::token::Position;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexError {
    #[error("[line {position}] Invalid character: '{character}'")]
    UnexpectedCharacter { character: char, position: Position },
    #[error("[line {position}] Unterminated string literal")]
    UnterminatedString { position: Position },
    #[error("[line {position}] Invalid number format: {reason}")]
    InvalidNumber {
        reason: &'static str,
        position: Position,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("[line {position}] Expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: Position,
    },
    #[error("[line {position}] Invalid number literal '{text}'")]
    InvalidNumber { text: String, position: Position },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("{name}() expects {expected}, got {got}")]
    WrongArgumentCount {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Modulo by zero")]
    ModuloByZero,
    #[error("Cannot call a non-function value of type {0}")]
    NotCallable(&'static str),
    #[error("{construct} condition must be a boolean, got {found}")]
    NonBooleanCondition {
        construct: &'static str,
        found: &'static str,
    },
    #[error("For loop range values must be numbers")]
    NonNumericRange,
    #[error("For loop step cannot be zero")]
    ZeroStep,
    #[error("Cannot iterate over a value of type {0}")]
    NotIterable(&'static str),
    #[error("Index must be a number, got {0}")]
    NonNumericIndex(&'static str),
    #[error("{container} index {index} out of range for length {length}")]
    IndexOutOfRange {
        container: &'static str,
        index: i64,
        length: usize,
    },
    #[error("Cannot index a value of type {0}")]
    NotIndexable(&'static str),
    #[error("Unsupported operation for given types: {left} {operator} {right}")]
    UnsupportedOperation {
        operator: String,
        left: &'static str,
        right: &'static str,
    },
    #[error("Unary {operator} is not supported for type {operand}")]
    UnsupportedUnary {
        operator: String,
        operand: &'static str,
    },
    #[error("Repeat count too large")]
    RepetitionTooLarge,
    #[error("Break statement outside loop")]
    BreakOutsideLoop,
    #[error("Continue statement outside loop")]
    ContinueOutsideLoop,
    #[error("Return statement outside function")]
    ReturnOutsideFunction,
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
}

/// Any failure of the source → tokens → AST → output pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Lex(#[from] LexError),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}
