use crate::diagnostics::SourceSpan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Quote,
    Quasiquote,
    Unquote,
    SpliceUnquote,
    Deref,
    Caret,
    String,
    /// A string literal that reached end of input before its closing quote.
    UnterminatedString,
    /// Any maximal run of non-delimiter characters: numbers, symbols, keywords.
    Atom,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = if let Some((idx, ch)) = self.peeked.take() {
            Some((idx, ch))
        } else {
            self.chars.next()
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            Some((idx, ch))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn match_next(&mut self, expected: char) -> bool {
        if let Some((idx, ch)) = self.peek() {
            if ch == expected {
                self.peeked = None;
                self.current = idx + ch.len_utf8();
                true
            } else {
                false
            }
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some((_, ch)) = self.peek() {
            if ch.is_whitespace() || ch == ',' {
                self.bump();
            } else if ch == ';' {
                while let Some((_, ch)) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn atom(&mut self, start: usize) -> Token {
        while let Some((_, ch)) = self.peek() {
            if is_delimiter(ch) {
                break;
            }
            self.bump();
        }
        self.simple_token(start, TokenKind::Atom)
    }

    fn string_literal(&mut self, start: usize) -> Token {
        while let Some((_, ch)) = self.bump() {
            match ch {
                '"' => return self.simple_token(start, TokenKind::String),
                '\\' => {
                    if self.bump().is_none() {
                        break;
                    }
                }
                _ => {}
            }
        }
        self.simple_token(start, TokenKind::UnterminatedString)
    }

    fn simple_token(&mut self, start: usize, kind: TokenKind) -> Token {
        let end = self.current;
        Token {
            kind,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan::new(start, end),
        }
    }

    /// Splits the whole source into tokens, always ending with `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let (start, ch) = match self.bump() {
                Some(pair) => pair,
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        lexeme: String::new(),
                        span: SourceSpan::new(self.current, self.current),
                    });
                    break;
                }
            };

            let token = match ch {
                '(' => self.simple_token(start, TokenKind::LParen),
                ')' => self.simple_token(start, TokenKind::RParen),
                '[' => self.simple_token(start, TokenKind::LBracket),
                ']' => self.simple_token(start, TokenKind::RBracket),
                '{' => self.simple_token(start, TokenKind::LBrace),
                '}' => self.simple_token(start, TokenKind::RBrace),
                '\'' => self.simple_token(start, TokenKind::Quote),
                '`' => self.simple_token(start, TokenKind::Quasiquote),
                '~' => {
                    if self.match_next('@') {
                        self.simple_token(start, TokenKind::SpliceUnquote)
                    } else {
                        self.simple_token(start, TokenKind::Unquote)
                    }
                }
                '@' => self.simple_token(start, TokenKind::Deref),
                '^' => self.simple_token(start, TokenKind::Caret),
                '"' => self.string_literal(start),
                _ => self.atom(start),
            };
            tokens.push(token);
        }
        tokens
    }
}

/// Characters that end a bare atom. `~`, `@` and `^` only start tokens of
/// their own; inside a run they are ordinary characters.
fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '[' | ']' | '{' | '}' | '(' | ')' | '\'' | '"' | '`' | ',' | ';'
        )
}

/// Convenience wrapper returning the raw lexemes, without the trailing `Eof`.
pub fn tokenize(source: &str) -> Vec<String> {
    Lexer::new(source)
        .tokenize()
        .into_iter()
        .filter(|token| token.kind != TokenKind::Eof)
        .map(|token| token.lexeme)
        .collect()
}
