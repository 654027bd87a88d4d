//! Tokenisation.
//!
//! `>` sequences are emitted as individual `Gt` tokens so nested type
//! arguments close naturally; the parser re-combines adjacent `Gt`s into
//! shift operators by span adjacency.

use crate::ParseError;
use jess_core::Span;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TokenKind {
    Ident,
    IntLit,
    LongLit,
    FloatLit,
    DoubleLit,
    CharLit,
    StringLit,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Ellipsis,
    At,
    ColonColon,
    Colon,
    Question,
    Arrow,

    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    PlusEq,
    PlusPlus,
    Minus,
    MinusEq,
    MinusMinus,
    Star,
    StarEq,
    Slash,
    SlashEq,
    Percent,
    PercentEq,
    Amp,
    AmpAmp,
    AmpEq,
    Pipe,
    PipePipe,
    PipeEq,
    Caret,
    CaretEq,
    Bang,
    Tilde,
    Shl,
    ShlEq,

    Eof,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

/// Tokenises `text`, appending a final `Eof` token.
pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        text,
        bytes: text.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    loop {
        lexer.skip_trivia()?;
        let start = lexer.pos;
        if lexer.pos >= lexer.bytes.len() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::point(start),
            });
            return Ok(tokens);
        }
        let kind = lexer.next_token()?;
        tokens.push(Token {
            kind,
            span: Span::new(start, lexer.pos),
        });
    }
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.text, Span::point(self.pos), message)
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match self.peek() {
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(_) => self.pos += 1,
                            None => {
                                return Err(ParseError::new(
                                    self.text,
                                    Span::point(start),
                                    "unterminated block comment",
                                ))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<TokenKind, ParseError> {
        let b = self.bump().ok_or_else(|| self.error_here("unexpected end of input"))?;
        let kind = match b {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b';' => TokenKind::Semi,
            b',' => TokenKind::Comma,
            b'@' => TokenKind::At,
            b'?' => TokenKind::Question,
            b'~' => TokenKind::Tilde,
            b'.' => {
                if self.peek() == Some(b'.') && self.peek_at(1) == Some(b'.') {
                    self.pos += 2;
                    TokenKind::Ellipsis
                } else if self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos -= 1;
                    return self.lex_number();
                } else {
                    TokenKind::Dot
                }
            }
            b':' => {
                if self.eat(b':') {
                    TokenKind::ColonColon
                } else {
                    TokenKind::Colon
                }
            }
            b'=' => {
                if self.eat(b'=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.eat(b'=') {
                    TokenKind::LtEq
                } else if self.eat(b'<') {
                    if self.eat(b'=') {
                        TokenKind::ShlEq
                    } else {
                        TokenKind::Shl
                    }
                } else {
                    TokenKind::Lt
                }
            }
            // `>` is never combined here; see the module docs.
            b'>' => {
                if self.eat(b'=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            b'+' => {
                if self.eat(b'=') {
                    TokenKind::PlusEq
                } else if self.eat(b'+') {
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                if self.eat(b'=') {
                    TokenKind::MinusEq
                } else if self.eat(b'-') {
                    TokenKind::MinusMinus
                } else if self.eat(b'>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                if self.eat(b'=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            b'/' => {
                if self.eat(b'=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => {
                if self.eat(b'=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            b'&' => {
                if self.eat(b'&') {
                    TokenKind::AmpAmp
                } else if self.eat(b'=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            b'|' => {
                if self.eat(b'|') {
                    TokenKind::PipePipe
                } else if self.eat(b'=') {
                    TokenKind::PipeEq
                } else {
                    TokenKind::Pipe
                }
            }
            b'^' => {
                if self.eat(b'=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }
            b'\'' => return self.lex_char(),
            b'"' => return self.lex_string(),
            b'0'..=b'9' => {
                self.pos -= 1;
                return self.lex_number();
            }
            _ => {
                self.pos -= 1;
                return self.lex_ident();
            }
        };
        Ok(kind)
    }

    fn lex_ident(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let mut chars = self.text[self.pos..].chars();
        match chars.next() {
            Some(ch) if unicode_ident::is_xid_start(ch) || ch == '_' || ch == '$' => {
                self.pos += ch.len_utf8();
            }
            Some(ch) => {
                return Err(self.error_here(format!("unexpected character `{ch}`")));
            }
            None => return Err(self.error_here("unexpected end of input")),
        }
        for ch in chars {
            if unicode_ident::is_xid_continue(ch) || ch == '$' {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        debug_assert!(self.pos > start);
        Ok(TokenKind::Ident)
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let mut is_float = false;

        if self.peek() == Some(b'0')
            && matches!(self.peek_at(1), Some(b'x') | Some(b'X') | Some(b'b') | Some(b'B'))
        {
            self.pos += 2;
            while self
                .peek()
                .is_some_and(|b| b.is_ascii_hexdigit() || b == b'_')
            {
                self.pos += 1;
            }
        } else {
            while self.peek().is_some_and(|b| b.is_ascii_digit() || b == b'_') {
                self.pos += 1;
            }
            if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                self.pos += 1;
                while self.peek().is_some_and(|b| b.is_ascii_digit() || b == b'_') {
                    self.pos += 1;
                }
            } else if self.peek() == Some(b'.')
                && self.bytes.get(start) != Some(&b'.')
                && !self.peek_at(1).is_some_and(|b| b.is_ascii_alphabetic())
            {
                // `1.` style literal.
                is_float = true;
                self.pos += 1;
            }
            if matches!(self.peek(), Some(b'e') | Some(b'E')) {
                let mut lookahead = 1;
                if matches!(self.peek_at(1), Some(b'+') | Some(b'-')) {
                    lookahead = 2;
                }
                if self.peek_at(lookahead).is_some_and(|b| b.is_ascii_digit()) {
                    is_float = true;
                    self.pos += lookahead;
                    while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                        self.pos += 1;
                    }
                }
            }
        }

        match self.peek() {
            Some(b'l') | Some(b'L') => {
                self.pos += 1;
                Ok(TokenKind::LongLit)
            }
            Some(b'f') | Some(b'F') => {
                self.pos += 1;
                Ok(TokenKind::FloatLit)
            }
            Some(b'd') | Some(b'D') => {
                self.pos += 1;
                Ok(TokenKind::DoubleLit)
            }
            _ => {
                if is_float {
                    Ok(TokenKind::DoubleLit)
                } else {
                    Ok(TokenKind::IntLit)
                }
            }
        }
    }

    fn lex_char(&mut self) -> Result<TokenKind, ParseError> {
        // Opening quote already consumed.
        loop {
            match self.bump() {
                Some(b'\\') => {
                    self.bump();
                }
                Some(b'\'') => return Ok(TokenKind::CharLit),
                Some(b'\n') | None => {
                    return Err(self.error_here("unterminated character literal"))
                }
                Some(_) => {}
            }
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind, ParseError> {
        loop {
            match self.bump() {
                Some(b'\\') => {
                    self.bump();
                }
                Some(b'"') => return Ok(TokenKind::StringLit),
                Some(b'\n') | None => return Err(self.error_here("unterminated string literal")),
                Some(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn basic_tokens() {
        assert_eq!(
            kinds("foo.bar(1, 2L);"),
            vec![
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::IntLit,
                TokenKind::Comma,
                TokenKind::LongLit,
                TokenKind::RParen,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn gt_is_never_combined() {
        assert_eq!(
            kinds("Map<String, List<String>>"),
            vec![
                TokenKind::Ident,
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::Gt,
                TokenKind::Gt,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn method_reference_and_arrow() {
        assert_eq!(
            kinds("String[]::new x -> y"),
            vec![
                TokenKind::Ident,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::ColonColon,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn float_suffixes() {
        assert_eq!(
            kinds("1.5f 2.0 3d 4L 0x1F"),
            vec![
                TokenKind::FloatLit,
                TokenKind::DoubleLit,
                TokenKind::DoubleLit,
                TokenKind::LongLit,
                TokenKind::IntLit,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_trivia() {
        assert_eq!(
            kinds("a // line\n /* block */ b"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn escapes_in_literals() {
        assert_eq!(
            kinds(r#"'\'' "a\"b""#),
            vec![TokenKind::CharLit, TokenKind::StringLit, TokenKind::Eof]
        );
    }
}
