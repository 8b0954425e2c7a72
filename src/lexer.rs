use crate::{ast::Token, error::LexError};

/// Location of a character in the source text (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Splits the whole input into tokens, ending with [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    pub fn position(&self) -> Position {
        Position {
            offset: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            position: self.position(),
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.current_char() == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match (self.current_char(), self.peek_char(1)) {
                (Some(ch), _) if ch.is_whitespace() => self.advance(),
                (Some('/'), Some('/')) | (Some('#'), _) => {
                    while let Some(ch) = self.current_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.position();
                    self.advance_by(2);
                    loop {
                        match (self.current_char(), self.peek_char(1)) {
                            (Some('*'), Some('/')) => {
                                self.advance_by(2);
                                break;
                            }
                            (Some(_), _) => self.advance(),
                            (None, _) => {
                                return Err(LexError {
                                    message: "Unterminated block comment".to_string(),
                                    position: start,
                                });
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match (quote, self.current_char()) {
                        (_, Some(c)) if c == quote || c == '\\' => result.push(c),
                        ('"', Some('n')) => result.push('\n'),
                        ('"', Some('t')) => result.push('\t'),
                        ('"', Some('r')) => result.push('\r'),
                        ('"', Some('$')) => result.push('$'),
                        ('"', Some('0')) => result.push('\0'),
                        // Single quoted strings keep unknown escapes verbatim
                        (_, Some(c)) => {
                            result.push('\\');
                            result.push(c);
                        }
                        (_, None) => {
                            return Err(self.error("Unterminated string: unexpected end after backslash"));
                        }
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error("Unterminated string: missing closing quote"))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '_' && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.error(format!("Invalid float literal '{}'", number)))
        } else {
            number
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| self.error(format!("Integer literal '{}' out of range", number)))
        }
    }

    /// Picks the longest operator starting at the current character.
    fn read_operator(&mut self) -> Option<Token> {
        const OPERATORS: &[(&str, Token)] = &[
            ("===", Token::Identical),
            ("!==", Token::NotIdentical),
            ("??=", Token::CoalesceAssign),
            ("==", Token::EqEq),
            ("!=", Token::NotEq),
            ("<>", Token::NotEq),
            ("<=", Token::LtEq),
            (">=", Token::GtEq),
            ("&&", Token::AndAnd),
            ("||", Token::OrOr),
            ("??", Token::Coalesce),
            ("++", Token::Increment),
            ("--", Token::Decrement),
            ("+=", Token::PlusAssign),
            ("-=", Token::MinusAssign),
            ("*=", Token::StarAssign),
            ("/=", Token::SlashAssign),
            ("%=", Token::PercentAssign),
            (".=", Token::DotAssign),
            ("->", Token::Arrow),
            ("=>", Token::FatArrow),
            ("::", Token::DoubleColon),
            ("=", Token::Assign),
            ("<", Token::Lt),
            (">", Token::Gt),
            ("+", Token::Plus),
            ("-", Token::Minus),
            ("*", Token::Star),
            ("/", Token::Slash),
            ("%", Token::Percent),
            (".", Token::Dot),
            ("!", Token::Exclamation),
            ("?", Token::Question),
            (":", Token::Colon),
            ("&", Token::Ampersand),
            ("\\", Token::Backslash),
            ("(", Token::LParen),
            (")", Token::RParen),
            ("[", Token::LBracket),
            ("]", Token::RBracket),
            ("{", Token::LBrace),
            ("}", Token::RBrace),
            (",", Token::Comma),
            (";", Token::Semicolon),
        ];

        for (text, token) in OPERATORS {
            let matches = text
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_char(i) == Some(c));
            if matches {
                self.advance_by(text.chars().count());
                return Some(token.clone());
            }
        }
        None
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;

        match self.current_char() {
            None => Ok(Token::Eof),
            Some('$') => {
                if self
                    .peek_char(1)
                    .is_some_and(|c| c.is_alphabetic() || c == '_')
                {
                    self.advance();
                    Ok(Token::Variable(self.read_identifier()))
                } else {
                    self.advance();
                    Ok(Token::Dollar)
                }
            }
            Some('"') => self.read_string('"').map(Token::String),
            Some('\'') => self.read_string('\'').map(Token::String),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                Ok(match ident.to_ascii_lowercase().as_str() {
                    "function" => Token::Function,
                    "fn" => Token::Fn,
                    "use" => Token::Use,
                    "return" => Token::Return,
                    "new" => Token::New,
                    "empty" => Token::Empty,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" => Token::Null,
                    _ => Token::Identifier(ident),
                })
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            // `.5` style floats
            Some('.') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()
            }
            Some(ch) => match self.read_operator() {
                Some(token) => Ok(token),
                None => Err(self.error(format!("Unexpected character '{}'", ch))),
            },
        }
    }
}
