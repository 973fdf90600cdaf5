use num_enum::IntoPrimitive;
use std::rc::Rc;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "^")]
    Power,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(to_string = "and", serialize = "&&")]
    And,
    #[strum(to_string = "or", serialize = "||")]
    Or,
}

/// Binding power of binary operators; larger binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Precedence {
    Logical = 0,
    Comparison = 1,
    Term = 5,
    Factor = 10,
    Power = 15,
}

impl BinaryOperator {
    pub fn precedence(self) -> Precedence {
        match self {
            BinaryOperator::And | BinaryOperator::Or => Precedence::Logical,
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => Precedence::Comparison,
            BinaryOperator::Add | BinaryOperator::Subtract => Precedence::Term,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => {
                Precedence::Factor
            }
            BinaryOperator::Power => Precedence::Power,
        }
    }
    /// Operators allowed in front of `=` as compound assignment.
    pub fn compounds(self) -> bool {
        match self {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo
            | BinaryOperator::Power => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum UnaryOperator {
    #[strum(serialize = "not")]
    Not,
    #[strum(serialize = "-")]
    Negate,
}

#[derive(Debug, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

/// Shared by every function value that refers to it; never mutated after parsing.
/// Anonymous functions have an empty name.
#[derive(Debug)]
pub struct FunctionDeclaration {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Block,
}

impl FunctionDeclaration {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<anonymous>"
        } else {
            &self.name
        }
    }
}

#[derive(Debug)]
pub enum Expression {
    Number(f64),
    String(String),
    Boolean(bool),
    Nil,
    Identifier(String),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    Array(Vec<Expression>),
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    Slice {
        object: Box<Expression>,
        start: Option<Box<Expression>>,
        end: Option<Box<Expression>>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    /// `function(params) return expr end function`; the body is always a Block.
    AnonymousFunction(Rc<FunctionDeclaration>),
}

pub trait Visitor<T, Output> {
    fn visit(&mut self, n: &T) -> Output;
}

impl Expression {
    pub fn accept<T>(&self, v: &mut dyn Visitor<Expression, T>) -> T {
        v.visit(self)
    }
}

#[derive(Debug)]
pub enum Statement {
    Expression(Expression),
    Assignment {
        name: String,
        value: Expression,
    },
    Block(Block),
    If {
        condition: Expression,
        then_branch: Block,
        /// Either a nested `If` (from `else if`) or a `Block`.
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Block,
    },
    For {
        variable: String,
        start: Expression,
        end: Expression,
        step: Expression,
        body: Block,
    },
    ForEach {
        variable: String,
        iterable: Expression,
        body: Block,
    },
    Break,
    Continue,
    Return(Option<Expression>),
    Print(Expression),
    Function(Rc<FunctionDeclaration>),
}

impl Statement {
    pub fn accept<T>(&self, v: &mut dyn Visitor<Statement, T>) -> T {
        v.visit(self)
    }
}

pub struct AstPrinter {}

impl AstPrinter {
    pub fn print_program(&mut self, program: &Block) -> String {
        program
            .statements
            .iter()
            .map(|stmt| stmt.accept(self))
            .collect::<Vec<String>>()
            .join("\n")
    }
    fn parenthesize(&mut self, name: &str, parts: Vec<String>) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for part in parts {
            x.push(' ');
            x.push_str(part.as_str());
        }
        x.push(')');
        x
    }
    fn block(&mut self, block: &Block) -> String {
        let parts = block
            .statements
            .iter()
            .map(|stmt| stmt.accept(self))
            .collect();
        self.parenthesize("block", parts)
    }
    fn optional(&mut self, expr: &Option<Box<Expression>>) -> String {
        match expr {
            Some(expr) => expr.accept(self),
            None => "_".to_string(),
        }
    }
    fn function(&mut self, decl: &FunctionDeclaration) -> String {
        let params = format!("({})", decl.parameters.join(" "));
        let body = self.block(&decl.body);
        if decl.name.is_empty() {
            self.parenthesize("function", vec![params, body])
        } else {
            self.parenthesize("function", vec![decl.name.clone(), params, body])
        }
    }
}

impl Visitor<Expression, String> for AstPrinter {
    fn visit(&mut self, n: &Expression) -> String {
        match n {
            Expression::Number(x) => format!("{}", x),
            Expression::String(x) => format!("{:?}", x),
            Expression::Boolean(x) => format!("{}", x),
            Expression::Nil => "nil".to_string(),
            Expression::Identifier(name) => name.clone(),
            Expression::Unary { operator, operand } => {
                let operand = operand.accept(self);
                self.parenthesize(&operator.to_string(), vec![operand])
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let parts = vec![left.accept(self), right.accept(self)];
                self.parenthesize(&operator.to_string(), parts)
            }
            Expression::Array(elements) => {
                let parts = elements.iter().map(|e| e.accept(self)).collect();
                self.parenthesize("list", parts)
            }
            Expression::Index { object, index } => {
                let parts = vec![object.accept(self), index.accept(self)];
                self.parenthesize("index", parts)
            }
            Expression::Slice { object, start, end } => {
                let parts = vec![object.accept(self), self.optional(start), self.optional(end)];
                self.parenthesize("slice", parts)
            }
            Expression::Call { callee, arguments } => {
                let mut parts = vec![callee.accept(self)];
                parts.extend(arguments.iter().map(|a| a.accept(self)));
                self.parenthesize("call", parts)
            }
            Expression::AnonymousFunction(decl) => self.function(decl),
        }
    }
}

impl Visitor<Statement, String> for AstPrinter {
    fn visit(&mut self, n: &Statement) -> String {
        match n {
            Statement::Expression(expr) => expr.accept(self),
            Statement::Assignment { name, value } => {
                let value = value.accept(self);
                self.parenthesize("assign", vec![name.clone(), value])
            }
            Statement::Block(block) => self.block(block),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut parts = vec![condition.accept(self), self.block(then_branch)];
                if let Some(else_branch) = else_branch {
                    parts.push(else_branch.accept(self));
                }
                self.parenthesize("if", parts)
            }
            Statement::While { condition, body } => {
                let parts = vec![condition.accept(self), self.block(body)];
                self.parenthesize("while", parts)
            }
            Statement::For {
                variable,
                start,
                end,
                step,
                body,
            } => {
                let parts = vec![
                    variable.clone(),
                    start.accept(self),
                    end.accept(self),
                    step.accept(self),
                    self.block(body),
                ];
                self.parenthesize("for", parts)
            }
            Statement::ForEach {
                variable,
                iterable,
                body,
            } => {
                let parts = vec![variable.clone(), iterable.accept(self), self.block(body)];
                self.parenthesize("for-each", parts)
            }
            Statement::Break => "(break)".to_string(),
            Statement::Continue => "(continue)".to_string(),
            Statement::Return(None) => "(return)".to_string(),
            Statement::Return(Some(expr)) => {
                let expr = expr.accept(self);
                self.parenthesize("return", vec![expr])
            }
            Statement::Print(expr) => {
                let expr = expr.accept(self);
                self.parenthesize("print", vec![expr])
            }
            Statement::Function(decl) => self.function(decl),
        }
    }
}
