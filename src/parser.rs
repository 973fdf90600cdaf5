use crate::ast::{BinaryOperator, Block, Expression, FunctionDeclaration, Statement, UnaryOperator};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};
use log::debug;
use std::rc::Rc;

pub fn parse(tokens: &[Token]) -> Result<Block, ParseError> {
    let end = match tokens.last() {
        Some(end) => end,
        None => return Ok(Block::default()),
    };
    let mut parser = Parser {
        tokens,
        current: 0,
        end,
    };
    let program = parser.block()?;
    if !parser.is_at_end() {
        return Err(parser.error("end of input"));
    }
    debug!("parsed {} top-level statements", program.statements.len());
    Ok(program)
}

struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    // Returned by peek once the tokens run out.
    end: &'a Token,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &'a Token {
        self.peek_at(0)
    }
    fn peek_at(&self, offset: usize) -> &'a Token {
        self.tokens.get(self.current + offset).unwrap_or(self.end)
    }
    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }
    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.peek().kind == TokenKind::EndOfInput
    }
    fn check(&self, kind: TokenKind, text: &str) -> bool {
        self.peek().is(kind, text)
    }
    fn match_token(&mut self, kind: TokenKind, text: &str) -> bool {
        if self.check(kind, text) {
            self.advance();
            true
        } else {
            false
        }
    }
    fn consume(&mut self, kind: TokenKind, text: &str) -> Result<&'a Token, ParseError> {
        if self.check(kind, text) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("'{}'", text)))
        }
    }
    fn consume_end(&mut self, construct: &str) -> Result<(), ParseError> {
        self.consume(TokenKind::Keyword, "end")?;
        self.consume(TokenKind::Keyword, construct)?;
        Ok(())
    }
    fn identifier(&mut self, what: &str) -> Result<String, ParseError> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.advance().text.clone())
        } else {
            Err(self.error(what))
        }
    }
    fn error(&self, expected: impl Into<String>) -> ParseError {
        let found = self.peek();
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.to_string(),
            position: found.position,
        }
    }

    fn skip_separators(&mut self) {
        while self.match_token(TokenKind::Symbol, ";") || self.match_token(TokenKind::Symbol, ",")
        {}
    }
    fn at_block_end(&self) -> bool {
        self.is_at_end()
            || self.check(TokenKind::Keyword, "end")
            || self.check(TokenKind::Keyword, "else")
    }
    fn block(&mut self) -> Result<Block, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.at_block_end() {
                break;
            }
            statements.push(self.statement()?);
        }
        Ok(Block { statements })
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Keyword => match token.text.as_str() {
                "break" => {
                    self.advance();
                    Ok(Statement::Break)
                }
                "continue" => {
                    self.advance();
                    Ok(Statement::Continue)
                }
                "for" => {
                    self.advance();
                    self.for_statement()
                }
                "while" => {
                    self.advance();
                    self.while_statement()
                }
                "if" => {
                    self.advance();
                    self.if_statement()
                }
                "function" if !self.peek_at(1).is(TokenKind::Symbol, "(") => {
                    self.advance();
                    let name = self.identifier("function name")?;
                    Ok(Statement::Function(self.function_rest(name)?))
                }
                "return" => {
                    self.advance();
                    self.return_statement()
                }
                _ => self.expression_statement(),
            },
            TokenKind::Identifier => self.identifier_statement(),
            _ => self.expression_statement(),
        }
    }
    fn identifier_statement(&mut self) -> Result<Statement, ParseError> {
        let name = self.peek().text.clone();
        if self.peek_at(1).is(TokenKind::Operator, "=") {
            if self.peek_at(2).is(TokenKind::Keyword, "function") {
                self.current += 3;
                return Ok(Statement::Function(self.function_rest(name)?));
            }
            self.current += 2;
            let value = self.expression()?;
            self.match_token(TokenKind::Symbol, ";");
            return Ok(Statement::Assignment { name, value });
        }
        if let Some((operator, width)) = self.compound_operator() {
            self.current += 1 + width;
            let right = self.expression()?;
            self.match_token(TokenKind::Symbol, ";");
            let value = Expression::Binary {
                left: Box::new(Expression::Identifier(name.clone())),
                operator,
                right: Box::new(right),
            };
            return Ok(Statement::Assignment { name, value });
        }
        self.expression_statement()
    }
    /// Recognises `op=` after an identifier. `%=` is a single token; every
    /// other compound operator arrives as the operator followed by `=`.
    fn compound_operator(&self) -> Option<(BinaryOperator, usize)> {
        let next = self.peek_at(1);
        if next.is(TokenKind::Operator, "%=") {
            return Some((BinaryOperator::Modulo, 1));
        }
        if next.kind != TokenKind::Operator || !self.peek_at(2).is(TokenKind::Operator, "=") {
            return None;
        }
        match next.text.parse::<BinaryOperator>() {
            Ok(operator) if operator.compounds() => Some((operator, 2)),
            _ => None,
        }
    }
    fn expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expr = self.expression()?;
        self.match_token(TokenKind::Symbol, ";");
        Ok(Statement::Expression(expr))
    }
    fn return_statement(&mut self) -> Result<Statement, ParseError> {
        if self.at_block_end() || self.check(TokenKind::Symbol, ";") {
            self.match_token(TokenKind::Symbol, ";");
            return Ok(Statement::Return(None));
        }
        let value = self.expression()?;
        self.match_token(TokenKind::Symbol, ";");
        Ok(Statement::Return(Some(value)))
    }
    fn while_statement(&mut self) -> Result<Statement, ParseError> {
        let condition = self.expression()?;
        let body = self.block()?;
        self.consume_end("while")?;
        Ok(Statement::While { condition, body })
    }
    fn if_statement(&mut self) -> Result<Statement, ParseError> {
        let condition = self.expression()?;
        self.consume(TokenKind::Keyword, "then")?;
        let then_branch = self.block()?;
        let else_branch = if self.match_token(TokenKind::Keyword, "else") {
            if self.match_token(TokenKind::Keyword, "if") {
                // The nested if owns the closing `end if`.
                let nested = self.if_statement()?;
                return Ok(Statement::If {
                    condition,
                    then_branch,
                    else_branch: Some(Box::new(nested)),
                });
            }
            Some(Box::new(Statement::Block(self.block()?)))
        } else {
            None
        };
        self.consume_end("if")?;
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }
    fn for_statement(&mut self) -> Result<Statement, ParseError> {
        let variable = self.identifier("loop variable name")?;
        if self.match_token(TokenKind::Operator, "=") {
            let start = self.expression()?;
            self.consume(TokenKind::Symbol, ",")?;
            let end = self.expression()?;
            self.consume(TokenKind::Symbol, ",")?;
            let step = self.expression()?;
            let body = self.block()?;
            self.consume_end("for")?;
            return Ok(Statement::For {
                variable,
                start,
                end,
                step,
                body,
            });
        }
        self.consume(TokenKind::Keyword, "in")?;

        if self.check(TokenKind::Identifier, "range") && self.peek_at(1).is(TokenKind::Symbol, "(")
        {
            let callee = self.advance().text.clone();
            self.advance();
            let mut arguments = self.arguments()?;
            let followed_by_postfix =
                self.check(TokenKind::Symbol, "[") || self.check(TokenKind::Symbol, "(");
            if arguments.len() == 3 && !followed_by_postfix {
                let step = arguments.remove(2);
                let end = arguments.remove(1);
                let start = arguments.remove(0);
                let body = self.block()?;
                self.consume_end("for")?;
                return Ok(Statement::For {
                    variable,
                    start,
                    end,
                    step,
                    body,
                });
            }
            let call = Expression::Call {
                callee: Box::new(Expression::Identifier(callee)),
                arguments,
            };
            let iterable = self.postfix(call)?;
            return self.for_each_rest(variable, iterable);
        }

        let iterable = self.expression()?;
        self.for_each_rest(variable, iterable)
    }
    fn for_each_rest(
        &mut self,
        variable: String,
        iterable: Expression,
    ) -> Result<Statement, ParseError> {
        let body = self.block()?;
        self.consume_end("for")?;
        Ok(Statement::ForEach {
            variable,
            iterable,
            body,
        })
    }
    fn parameters(&mut self) -> Result<Vec<String>, ParseError> {
        self.consume(TokenKind::Symbol, "(")?;
        let mut parameters = Vec::new();
        if !self.match_token(TokenKind::Symbol, ")") {
            loop {
                parameters.push(self.identifier("parameter name")?);
                if !self.match_token(TokenKind::Symbol, ",") {
                    break;
                }
            }
            self.consume(TokenKind::Symbol, ")")?;
        }
        Ok(parameters)
    }
    /// Everything after `function name` up to and including `end function`.
    fn function_rest(&mut self, name: String) -> Result<Rc<FunctionDeclaration>, ParseError> {
        let parameters = self.parameters()?;
        let body = self.block()?;
        self.consume_end("function")?;
        Ok(Rc::new(FunctionDeclaration {
            name,
            parameters,
            body,
        }))
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        self.binary(0)
    }
    fn binary(&mut self, min: u8) -> Result<Expression, ParseError> {
        let mut left = self.unary()?;
        while let Some(operator) = self.binary_operator() {
            let precedence: u8 = operator.precedence().into();
            if precedence < min {
                break;
            }
            self.advance();
            let right = self.binary(precedence + 1)?;
            left = Expression::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }
    fn binary_operator(&self) -> Option<BinaryOperator> {
        let token = self.peek();
        match token.kind {
            TokenKind::Operator => token.text.parse().ok(),
            TokenKind::Keyword if token.text == "and" || token.text == "or" => {
                token.text.parse().ok()
            }
            _ => None,
        }
    }
    fn unary(&mut self) -> Result<Expression, ParseError> {
        let operator = if self.match_token(TokenKind::Keyword, "not") {
            UnaryOperator::Not
        } else if self.match_token(TokenKind::Operator, "-") {
            UnaryOperator::Negate
        } else {
            let primary = self.primary()?;
            return self.postfix(primary);
        };
        let operand = self.unary()?;
        Ok(Expression::Unary {
            operator,
            operand: Box::new(operand),
        })
    }
    fn primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek();
        let expr = match token.kind {
            TokenKind::Number => match token.text.parse::<f64>() {
                Ok(x) => Expression::Number(x),
                Err(_) => {
                    return Err(ParseError::InvalidNumber {
                        text: token.text.clone(),
                        position: token.position,
                    })
                }
            },
            TokenKind::String => Expression::String(token.text.clone()),
            TokenKind::Boolean => Expression::Boolean(token.text == "true"),
            TokenKind::Nil => Expression::Nil,
            TokenKind::Identifier => Expression::Identifier(token.text.clone()),
            TokenKind::Keyword if token.text == "function" => {
                self.advance();
                return self.anonymous_function();
            }
            TokenKind::Symbol if token.text == "(" => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::Symbol, ")")?;
                return Ok(expr);
            }
            TokenKind::Symbol if token.text == "[" => {
                self.advance();
                return self.array();
            }
            _ => return Err(self.error("expression")),
        };
        self.advance();
        Ok(expr)
    }
    fn anonymous_function(&mut self) -> Result<Expression, ParseError> {
        let parameters = self.parameters()?;
        self.consume(TokenKind::Keyword, "return")?;
        let value = self.expression()?;
        self.consume_end("function")?;
        Ok(Expression::AnonymousFunction(Rc::new(FunctionDeclaration {
            name: String::new(),
            parameters,
            body: Block {
                statements: vec![Statement::Return(Some(value))],
            },
        })))
    }
    fn array(&mut self) -> Result<Expression, ParseError> {
        let mut elements = Vec::new();
        while !self.check(TokenKind::Symbol, "]") {
            elements.push(self.expression()?);
            if !self.match_token(TokenKind::Symbol, ",") {
                break;
            }
        }
        self.consume(TokenKind::Symbol, "]")?;
        Ok(Expression::Array(elements))
    }
    /// Comma-separated arguments after an opening `(`, consuming the `)`.
    fn arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut arguments = Vec::new();
        if self.match_token(TokenKind::Symbol, ")") {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.expression()?);
            if !self.match_token(TokenKind::Symbol, ",") {
                break;
            }
        }
        self.consume(TokenKind::Symbol, ")")?;
        Ok(arguments)
    }
    fn postfix(&mut self, mut expr: Expression) -> Result<Expression, ParseError> {
        loop {
            if self.match_token(TokenKind::Symbol, "[") {
                expr = self.subscript(expr)?;
            } else if self.match_token(TokenKind::Symbol, "(") {
                let arguments = self.arguments()?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else {
                return Ok(expr);
            }
        }
    }
    fn slice_end(&mut self) -> Result<Option<Box<Expression>>, ParseError> {
        if self.check(TokenKind::Symbol, "]") {
            Ok(None)
        } else {
            Ok(Some(Box::new(self.expression()?)))
        }
    }
    /// `[i]`, `[s:e]`, `[:e]`, `[s:]` or `[:]` after the opening bracket.
    fn subscript(&mut self, object: Expression) -> Result<Expression, ParseError> {
        let object = Box::new(object);
        if self.match_token(TokenKind::Operator, ":") {
            let end = self.slice_end()?;
            self.consume(TokenKind::Symbol, "]")?;
            return Ok(Expression::Slice {
                object,
                start: None,
                end,
            });
        }
        if self.check(TokenKind::Symbol, "]") {
            return Err(self.error("index or slice"));
        }
        let start = Box::new(self.expression()?);
        if self.match_token(TokenKind::Operator, ":") {
            let end = self.slice_end()?;
            self.consume(TokenKind::Symbol, "]")?;
            return Ok(Expression::Slice {
                object,
                start: Some(start),
                end,
            });
        }
        self.consume(TokenKind::Symbol, "]")?;
        Ok(Expression::Index {
            object,
            index: start,
        })
    }
}
