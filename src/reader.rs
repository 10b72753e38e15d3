use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, MallowError, Result, SourceSpan},
    lexer::{Lexer, Token, TokenKind},
    value::Value,
};

/// Reads the first form of `source`. Blank or comment-only input fails with
/// `EmptyInput` so callers can tell "nothing to read" from malformed text.
pub fn read(source: &str) -> Result<Value> {
    let tokens = Lexer::new(source).tokenize();
    let mut reader = Reader::new(tokens);
    if reader.check(TokenKind::Eof) {
        return Err(MallowError::from(Diagnostic::new(
            DiagnosticKind::EmptyInput,
            "no form to read",
        )));
    }
    reader.read_form()
}

struct Reader {
    tokens: Vec<Token>,
    current: usize,
}

impl Reader {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    fn read_form(&mut self) -> Result<Value> {
        let token = self.advance();
        match token.kind {
            TokenKind::LParen => {
                let items = self.read_sequence(&token, TokenKind::RParen)?;
                Ok(Value::list(items))
            }
            TokenKind::LBracket => {
                let items = self.read_sequence(&token, TokenKind::RBracket)?;
                Ok(Value::vector(items))
            }
            TokenKind::LBrace => {
                let items = self.read_sequence(&token, TokenKind::RBrace)?;
                Value::hash_map(items).map_err(|err| with_span(err, token.span))
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                self.fail(&token, DiagnosticKind::UnexpectedToken, "unexpected")
            }
            TokenKind::Quote => self.read_prefixed("quote"),
            TokenKind::Quasiquote => self.read_prefixed("quasiquote"),
            TokenKind::Unquote => self.read_prefixed("unquote"),
            TokenKind::SpliceUnquote => self.read_prefixed("splice-unquote"),
            TokenKind::Deref => self.read_prefixed("deref"),
            TokenKind::Caret => Ok(Value::symbol(token.lexeme)),
            TokenKind::String => Ok(Value::string(unescape(
                &token.lexeme[1..token.lexeme.len() - 1],
            ))),
            TokenKind::UnterminatedString => self.fail(
                &token,
                DiagnosticKind::UnbalancedString,
                "unbalanced string literal",
            ),
            TokenKind::Atom => self.read_atom(&token),
            TokenKind::Eof => self.fail(
                &token,
                DiagnosticKind::Syntax,
                "expected a form but reached end of input",
            ),
        }
    }

    fn read_sequence(&mut self, open: &Token, closing: TokenKind) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            let next = self.peek().clone();
            match &next.kind {
                kind if *kind == closing => {
                    self.advance();
                    return Ok(items);
                }
                TokenKind::Eof => {
                    let diag = self
                        .error(
                            open,
                            DiagnosticKind::UnbalancedCollection,
                            format!(
                                "unbalanced `{}`: expected {}",
                                open.lexeme,
                                closer(&closing)
                            ),
                        )
                        .with_note("reached end of input");
                    return Err(MallowError::from(diag));
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    return self.fail(
                        &next,
                        DiagnosticKind::UnbalancedCollection,
                        format!(
                            "mismatched `{}`: expected {} to close `{}`",
                            next.lexeme,
                            closer(&closing),
                            open.lexeme
                        ),
                    );
                }
                _ => items.push(self.read_form()?),
            }
        }
    }

    fn read_prefixed(&mut self, name: &str) -> Result<Value> {
        let form = self.read_form()?;
        Ok(Value::list(vec![Value::symbol(name), form]))
    }

    fn read_atom(&self, token: &Token) -> Result<Value> {
        let lexeme = token.lexeme.as_str();
        if is_integer(lexeme) {
            return lexeme.parse::<i64>().map(Value::int).map_err(|_| {
                MallowError::from(self.error(
                    token,
                    DiagnosticKind::Syntax,
                    format!("integer literal `{lexeme}` is out of range"),
                ))
            });
        }
        if is_float(lexeme) {
            return lexeme.parse::<f64>().map(Value::float).map_err(|_| {
                MallowError::from(self.error(
                    token,
                    DiagnosticKind::Syntax,
                    format!("invalid float literal `{lexeme}`"),
                ))
            });
        }
        let value = match lexeme {
            "nil" => Value::nil(),
            "true" => Value::bool(true),
            "false" => Value::bool(false),
            _ => match lexeme.strip_prefix(':') {
                Some(name) => Value::keyword(name),
                None => Value::symbol(lexeme),
            },
        };
        Ok(value)
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with `Eof`.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn error(
        &self,
        token: &Token,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic::new(kind, message).with_span(token.span)
    }

    fn fail<T>(
        &self,
        token: &Token,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Result<T> {
        Err(MallowError::from(self.error(token, kind, message)))
    }
}

fn with_span(err: MallowError, span: SourceSpan) -> MallowError {
    match err {
        MallowError::Diagnostic(diag) => MallowError::Diagnostic(diag.with_span(span)),
        other => other,
    }
}

fn closer(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::RParen => "`)`",
        TokenKind::RBracket => "`]`",
        TokenKind::RBrace => "`}`",
        _ => "a closing bracket",
    }
}

fn split_sign(lexeme: &str) -> &str {
    lexeme
        .strip_prefix('+')
        .or_else(|| lexeme.strip_prefix('-'))
        .unwrap_or(lexeme)
}

fn all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// `[+-]?digits`
fn is_integer(lexeme: &str) -> bool {
    all_digits(split_sign(lexeme))
}

/// `[+-]?digits.digits`
fn is_float(lexeme: &str) -> bool {
    match split_sign(lexeme).split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => false,
    }
}

fn unescape(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('"') => value.push('"'),
            Some('\\') => value.push('\\'),
            Some(other) => {
                value.push('\\');
                value.push(other);
            }
            None => value.push('\\'),
        }
    }
    value
}
