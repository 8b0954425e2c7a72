use std::mem;

use tracing::trace;

use crate::{
    ast::{ArrayItem, AssignOp, BinOp, CastType, ClosureExpr, Expr, Parameter, Token, UnaryOp},
    error::ParseError,
    value::Value,
    visitor::VariableUsage,
};

/// Keywords that start constructs with no expression node. Hitting one is a
/// parse error, never a silent fallback.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "if", "else", "elseif", "while", "do", "for", "foreach", "switch", "match", "case",
    "break", "continue", "try", "catch", "finally", "throw", "goto", "yield", "global",
    "static", "echo", "print", "unset", "isset", "list", "include", "include_once",
    "require", "require_once", "declare", "clone", "instanceof",
];

/// How deeply expressions may nest before parsing gives up.
const MAX_NESTING: usize = 128;

fn unsupported_keyword(name: &str) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    UNSUPPORTED_KEYWORDS
        .contains(&lower.as_str())
        .then_some(lower)
}

/// Parses one function's token stream into a [`ClosureExpr`].
///
/// The parser is a pure structural translation: it evaluates nothing and
/// keeps parameter order, bound variable names and statement order exactly
/// as they appear in the stream.
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    current_token: Token,
    depth: usize,
}

/// Convenience for `Parser::new(tokens).parse()`.
pub fn parse_closure(tokens: Vec<Token>) -> Result<ClosureExpr, ParseError> {
    Parser::new(tokens).parse()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let current_token = tokens.first().cloned().unwrap_or(Token::Eof);
        Parser {
            tokens,
            index: 0,
            current_token,
            depth: 0,
        }
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.deepen()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Goes one level deeper inside a left-associative chain. The caller
    /// restores `depth` once the chain ends.
    fn deepen(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::UnsupportedConstruct(
                "nesting too deep".to_string(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn advance(&mut self) {
        self.index += 1;
        self.current_token = self.tokens.get(self.index).cloned().unwrap_or(Token::Eof);
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens.get(self.index + offset).unwrap_or(&Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match &self.current_token {
            Token::Eof => ParseError::UnexpectedEof(expected.to_string()),
            found => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: format!("{:?}", found),
            },
        }
    }

    fn expect(&mut self, expected: Token, description: &str) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(description));
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self, description: &str) -> Result<String, ParseError> {
        match &self.current_token {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(description)),
        }
    }

    /// Parse the complete stream: exactly one closure or arrow function.
    pub fn parse(&mut self) -> Result<ClosureExpr, ParseError> {
        // `static function` / `static fn` only changes binding of `$this`
        if matches!(&self.current_token, Token::Identifier(s) if s.eq_ignore_ascii_case("static"))
            && matches!(self.peek(1), Token::Function | Token::Fn)
        {
            self.advance();
        }

        let closure = match &self.current_token {
            Token::Function | Token::Fn => self.parse_closure()?,
            _ => return Err(self.unexpected("`function` or `fn`")),
        };

        if self.check(&Token::Semicolon) {
            self.advance();
        }
        self.expect(Token::Eof, "end of input")?;

        trace!(
            parameters = closure.parameters.len(),
            statements = closure.body.len(),
            "parsed closure"
        );
        Ok(closure)
    }

    /// Parse a single expression that must span the whole stream.
    pub fn parse_standalone_expression(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        if self.check(&Token::Semicolon) {
            self.advance();
        }
        self.expect(Token::Eof, "end of input")?;
        Ok(expr)
    }

    fn parse_closure(&mut self) -> Result<ClosureExpr, ParseError> {
        let is_arrow = self.check(&Token::Fn);
        self.advance(); // consume `function` / `fn`

        if self.check(&Token::Ampersand) {
            return Err(ParseError::UnsupportedConstruct(
                "by-reference return".to_string(),
            ));
        }

        // Named functions keep their body; the name is irrelevant here
        if !is_arrow && matches!(self.current_token, Token::Identifier(_)) {
            self.advance();
        }

        let parameters = self.parse_parameters()?;

        let mut bound_variables = vec![];
        if !is_arrow && self.check(&Token::Use) {
            self.advance();
            self.expect(Token::LParen, "`(` after `use`")?;
            while !self.check(&Token::RParen) {
                match &self.current_token {
                    Token::Variable(name) => {
                        bound_variables.push(name.clone());
                        self.advance();
                    }
                    Token::Ampersand => {
                        return Err(ParseError::UnsupportedConstruct(
                            "by-reference bound variable".to_string(),
                        ));
                    }
                    _ => return Err(self.unexpected("bound variable")),
                }
                if !self.check(&Token::RParen) {
                    self.expect(Token::Comma, "`,` or `)`")?;
                }
            }
            self.expect(Token::RParen, "`)`")?;
        }

        if self.check(&Token::Colon) {
            self.advance();
            self.parse_type_hint()?;
        }

        let body = if is_arrow {
            self.expect(Token::FatArrow, "`=>`")?;
            vec![Expr::returning(self.parse_expression()?)]
        } else {
            self.parse_block()?
        };

        let mut closure = ClosureExpr {
            parameters,
            bound_variables,
            body,
        };
        if is_arrow {
            // Arrow functions capture by value whatever they read
            closure.bound_variables = VariableUsage::analyze(&closure)
                .free_variables()
                .map(str::to_string)
                .collect();
        }
        Ok(closure)
    }

    fn parse_parameters(&mut self) -> Result<Vec<Parameter>, ParseError> {
        self.expect(Token::LParen, "`(` before parameters")?;
        let mut parameters = vec![];

        while !self.check(&Token::RParen) {
            let type_hint = match &self.current_token {
                Token::Identifier(_) | Token::Question | Token::Backslash => {
                    Some(self.parse_type_hint()?)
                }
                _ => None,
            };

            match &self.current_token {
                Token::Variable(name) => {
                    let name = name.clone();
                    self.advance();
                    let default = if self.check(&Token::Assign) {
                        self.advance();
                        Some(self.parse_expression()?)
                    } else {
                        None
                    };
                    parameters.push(Parameter {
                        name,
                        type_hint,
                        default,
                    });
                }
                Token::Ampersand => {
                    return Err(ParseError::UnsupportedConstruct(
                        "by-reference parameter".to_string(),
                    ));
                }
                Token::Dot => {
                    return Err(ParseError::UnsupportedConstruct(
                        "variadic parameter".to_string(),
                    ));
                }
                _ => return Err(self.unexpected("parameter")),
            }

            if !self.check(&Token::RParen) {
                self.expect(Token::Comma, "`,` or `)`")?;
            }
        }
        self.expect(Token::RParen, "`)` after parameters")?;
        Ok(parameters)
    }

    fn parse_type_hint(&mut self) -> Result<String, ParseError> {
        let mut hint = String::new();
        if self.check(&Token::Question) {
            self.advance();
            hint.push('?');
        }
        hint.push_str(&self.parse_qualified_name()?);
        Ok(hint)
    }

    fn parse_qualified_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        if self.check(&Token::Backslash) {
            self.advance();
            name.push('\\');
        }
        name.push_str(&self.expect_identifier("name")?);
        while self.check(&Token::Backslash) {
            self.advance();
            name.push('\\');
            name.push_str(&self.expect_identifier("name after `\\`")?);
        }
        Ok(name)
    }

    fn parse_block(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LBrace, "`{`")?;
        let mut statements = vec![];
        while !self.check(&Token::RBrace) {
            if self.check(&Token::Eof) {
                return Err(self.unexpected("`}`"));
            }
            if let Some(statement) = self.parse_statement()? {
                statements.push(statement);
            }
        }
        self.expect(Token::RBrace, "`}`")?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Option<Expr>, ParseError> {
        match &self.current_token {
            Token::Semicolon => {
                self.advance();
                Ok(None)
            }
            Token::Return => {
                self.advance();
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                self.expect(Token::Semicolon, "`;` after return")?;
                Ok(Some(Expr::Return(value)))
            }
            Token::LBrace => Err(ParseError::UnsupportedConstruct(
                "nested block".to_string(),
            )),
            Token::Identifier(name) if unsupported_keyword(name).is_some() => Err(
                ParseError::UnsupportedConstruct(name.to_ascii_lowercase()),
            ),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(Token::Semicolon, "`;`")?;
                Ok(Some(expr))
            }
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_low_or)
    }

    // `and` / `or` bind looser than assignment
    fn parse_low_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_low_and()?;
        let outer = self.depth;
        while self.check(&Token::Or) {
            self.advance();
            self.deepen()?;
            let right = self.parse_low_and()?;
            left = Expr::binary(BinOp::Or, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_low_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_assignment()?;
        let outer = self.depth;
        while self.check(&Token::And) {
            self.advance();
            self.deepen()?;
            let right = self.parse_assignment()?;
            left = Expr::binary(BinOp::And, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_ternary()?;

        let op = match &self.current_token {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::Add,
            Token::MinusAssign => AssignOp::Subtract,
            Token::StarAssign => AssignOp::Multiply,
            Token::SlashAssign => AssignOp::Divide,
            Token::PercentAssign => AssignOp::Modulo,
            Token::DotAssign => AssignOp::Concat,
            Token::CoalesceAssign => AssignOp::NullCoalesce,
            _ => return Ok(target),
        };

        if !matches!(
            target,
            Expr::Variable { .. } | Expr::Field { .. } | Expr::Index { .. }
        ) {
            return Err(ParseError::InvalidAssignmentTarget(format!("{:?}", target)));
        }

        self.advance();
        if self.check(&Token::Ampersand) {
            return Err(ParseError::UnsupportedConstruct(
                "assignment by reference".to_string(),
            ));
        }
        let value = self.nested(Self::parse_assignment)?; // Right-associative

        Ok(Expr::Assignment {
            target: Box::new(target),
            op,
            value: Box::new(value),
        })
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_coalesce()?;

        if !self.check(&Token::Question) {
            return Ok(condition);
        }
        self.advance();

        let if_true = if self.check(&Token::Colon) {
            None
        } else {
            Some(Box::new(self.nested(Self::parse_assignment)?))
        };
        self.expect(Token::Colon, "`:` in ternary")?;
        let if_false = self.nested(Self::parse_assignment)?;

        Ok(Expr::Ternary {
            condition: Box::new(condition),
            if_true,
            if_false: Box::new(if_false),
        })
    }

    fn parse_coalesce(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_or()?;
        if self.check(&Token::Coalesce) {
            self.advance();
            let right = self.nested(Self::parse_coalesce)?; // Right-associative
            return Ok(Expr::binary(BinOp::NullCoalesce, left, right));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        let outer = self.depth;
        while self.check(&Token::OrOr) {
            self.advance();
            self.deepen()?;
            let right = self.parse_and()?;
            left = Expr::binary(BinOp::Or, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        let outer = self.depth;
        while self.check(&Token::AndAnd) {
            self.advance();
            self.deepen()?;
            let right = self.parse_equality()?;
            left = Expr::binary(BinOp::And, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        let outer = self.depth;

        loop {
            let op = match &self.current_token {
                Token::EqEq => BinOp::Equal,
                Token::NotEq => BinOp::NotEqual,
                Token::Identical => BinOp::Identical,
                Token::NotIdentical => BinOp::NotIdentical,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_comparison()?;
            left = Expr::binary(op, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        let outer = self.depth;

        loop {
            let op = match &self.current_token {
                Token::Lt => BinOp::LessThan,
                Token::Gt => BinOp::GreaterThan,
                Token::LtEq => BinOp::LessEqual,
                Token::GtEq => BinOp::GreaterEqual,
                Token::Identifier(name) if name.eq_ignore_ascii_case("instanceof") => {
                    return Err(ParseError::UnsupportedConstruct("instanceof".to_string()));
                }
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        let outer = self.depth;

        loop {
            let op = match &self.current_token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Subtract,
                Token::Dot => BinOp::Concat,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        let outer = self.depth;

        loop {
            let op = match &self.current_token {
                Token::Star => BinOp::Multiply,
                Token::Slash => BinOp::Divide,
                Token::Percent => BinOp::Modulo,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match &self.current_token {
            Token::Exclamation => Some(UnaryOp::Not),
            Token::Minus => Some(UnaryOp::Negate),
            Token::Plus => Some(UnaryOp::Plus),
            Token::Increment | Token::Decrement => {
                return Err(ParseError::UnsupportedConstruct(
                    "increment/decrement".to_string(),
                ));
            }
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = self.nested(Self::parse_unary)?; // Right-associative
            return Ok(Expr::UnaryOp {
                op,
                operand: Box::new(operand),
            });
        }

        // `(type) operand`
        if self.check(&Token::LParen)
            && let Token::Identifier(name) = self.peek(1)
            && matches!(self.peek(2), Token::RParen)
        {
            let name = name.clone();
            let target =
                CastType::from_name(&name).ok_or(ParseError::InvalidCastType(name))?;
            self.advance_by(3);
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expr::Cast {
                target,
                operand: Box::new(operand),
            });
        }

        self.parse_postfix()
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        let outer = self.depth;

        loop {
            match &self.current_token {
                Token::LBracket => {
                    self.deepen()?;
                    self.advance(); // Consume '['
                    let index = if self.check(&Token::RBracket) {
                        None
                    } else {
                        Some(Box::new(self.parse_expression()?))
                    };
                    self.expect(Token::RBracket, "`]`")?;
                    expr = Expr::Index {
                        subject: Box::new(expr),
                        index,
                    };
                }
                Token::Arrow => {
                    self.deepen()?;
                    self.advance(); // consume '->'
                    let name = match &self.current_token {
                        Token::Identifier(n) => n.clone(),
                        // Keywords are valid member names
                        Token::Empty => "empty".to_string(),
                        Token::New => "new".to_string(),
                        Token::Use => "use".to_string(),
                        Token::Return => "return".to_string(),
                        Token::Variable(_) | Token::LBrace => {
                            return Err(ParseError::UnsupportedConstruct(
                                "dynamic member access".to_string(),
                            ));
                        }
                        _ => return Err(self.unexpected("member name after `->`")),
                    };
                    self.advance();

                    if self.check(&Token::LParen) {
                        let args = self.parse_arguments()?;
                        expr = Expr::MethodCall {
                            receiver: Box::new(expr),
                            name,
                            args,
                        };
                    } else {
                        expr = Expr::Field {
                            object: Box::new(expr),
                            name,
                        };
                    }
                }
                Token::LParen => {
                    self.deepen()?;
                    let args = self.parse_arguments()?;
                    expr = Expr::FunctionCall {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Token::Increment | Token::Decrement => {
                    return Err(ParseError::UnsupportedConstruct(
                        "increment/decrement".to_string(),
                    ));
                }
                _ => break,
            }
        }
        self.depth = outer;
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LParen, "`(`")?;
        let mut args = vec![];

        while !self.check(&Token::RParen) {
            if self.check(&Token::Dot) {
                return Err(ParseError::UnsupportedConstruct(
                    "argument unpacking".to_string(),
                ));
            }
            args.push(self.parse_expression()?);
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma, "`,` or `)`")?;
            }
        }

        self.expect(Token::RParen, "`)`")?;
        Ok(args)
    }

    fn parse_array_literal(&mut self, close: Token) -> Result<Expr, ParseError> {
        let mut items = vec![];

        while !self.check(&close) {
            if self.check(&Token::Ampersand) {
                return Err(ParseError::UnsupportedConstruct(
                    "by-reference array element".to_string(),
                ));
            }
            let first = self.parse_expression()?;
            let item = if self.check(&Token::FatArrow) {
                self.advance();
                ArrayItem {
                    key: Some(first),
                    value: self.parse_expression()?,
                }
            } else {
                ArrayItem {
                    key: None,
                    value: first,
                }
            };
            items.push(item);

            if !self.check(&close) {
                self.expect(Token::Comma, "`,` in array literal")?;
            }
        }

        self.expect(close, "end of array literal")?;
        Ok(Expr::Array(items))
    }

    /// Parse primary expressions (atoms)
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            // Literals
            Token::Float(n) => {
                self.advance();
                Ok(Expr::Value(Value::Float(n)))
            }
            Token::Integer(n) => {
                self.advance();
                Ok(Expr::Value(Value::Integer(n)))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::Value(Value::String(s)))
            }
            Token::Boolean(b) => {
                self.advance();
                Ok(Expr::Value(Value::Boolean(b)))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Value(Value::Null))
            }

            // Variables
            Token::Variable(name) => {
                self.advance();
                Ok(Expr::variable(&name))
            }
            Token::Dollar => {
                self.advance();
                // `$$name` or `${expr}`
                let name = if self.check(&Token::LBrace) {
                    self.advance();
                    let name = self.parse_expression()?;
                    self.expect(Token::RBrace, "`}`")?;
                    name
                } else {
                    self.nested(Self::parse_primary)?
                };
                Ok(Expr::Variable {
                    name: Box::new(name),
                })
            }

            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(expr)
            }

            Token::LBracket => {
                self.advance();
                self.parse_array_literal(Token::RBracket)
            }

            token @ (Token::Function | Token::Fn) => {
                self.current_token = token;
                Ok(Expr::Closure(self.nested(Self::parse_closure)?))
            }

            Token::Empty => {
                self.advance();
                self.expect(Token::LParen, "`(` after empty")?;
                let operand = self.parse_expression()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(Expr::Empty(Box::new(operand)))
            }

            Token::New => {
                self.advance();
                let class = match &self.current_token {
                    Token::Variable(name) => {
                        let name = name.clone();
                        self.advance();
                        Expr::variable(&name)
                    }
                    Token::Identifier(_) | Token::Backslash => {
                        Expr::Value(Value::String(self.parse_qualified_name()?))
                    }
                    _ => return Err(self.unexpected("class name after `new`")),
                };
                let args = if self.check(&Token::LParen) {
                    self.parse_arguments()?
                } else {
                    vec![]
                };
                Ok(Expr::New {
                    class: Box::new(class),
                    args,
                })
            }

            token @ (Token::Identifier(_) | Token::Backslash) => {
                self.current_token = token;
                self.parse_named()
            }

            token => {
                self.current_token = token;
                Err(self.unexpected("expression"))
            }
        }
    }

    /// Function calls, `array(...)`, static calls; anything else that starts
    /// with a bare name is unsupported.
    fn parse_named(&mut self) -> Result<Expr, ParseError> {
        if let Token::Identifier(name) = &self.current_token {
            if let Some(keyword) = unsupported_keyword(name) {
                return Err(ParseError::UnsupportedConstruct(keyword));
            }
            if name.eq_ignore_ascii_case("array") && matches!(self.peek(1), Token::LParen) {
                self.advance_by(2);
                return self.parse_array_literal(Token::RParen);
            }
        }

        let name = self.parse_qualified_name()?;

        match &self.current_token {
            Token::LParen => {
                let args = self.parse_arguments()?;
                Ok(Expr::FunctionCall {
                    callee: Box::new(Expr::Value(Value::String(name))),
                    args,
                })
            }
            Token::DoubleColon => {
                self.advance();
                let method = match &self.current_token {
                    Token::Identifier(m) if matches!(self.peek(1), Token::LParen) => m.clone(),
                    _ => {
                        return Err(ParseError::UnsupportedConstruct(
                            "static property or class constant".to_string(),
                        ));
                    }
                };
                self.advance();
                let args = self.parse_arguments()?;
                Ok(Expr::StaticMethodCall {
                    class: name,
                    name: method,
                    args,
                })
            }
            _ => Err(ParseError::UnsupportedConstruct(format!("constant {}", name))),
        }
    }
}
