use super::SignatureError;
use crate::source_location::{SourceLocation, SourceSpan};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub span: SourceSpan,
    pub kind: TokenKind<'a>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind<'a> {
    KeywordIf,
    KeywordThrows,

    Identifier(&'a str),
    Ellipsis,

    ParenOpen,
    ParenClose,
    BraceOpen,
    BraceClose,

    Comma,
    Semicolon,
}

impl TokenKind<'_> {
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::KeywordIf => "`if`",
            TokenKind::KeywordThrows => "`throws`",
            TokenKind::Identifier(_) => "identifier",
            TokenKind::Ellipsis => "`...`",
            TokenKind::ParenOpen => "`(`",
            TokenKind::ParenClose => "`)`",
            TokenKind::BraceOpen => "`{`",
            TokenKind::BraceClose => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Semicolon => "`;`",
        }
    }
}

pub struct Tokenizer<'a> {
    source: &'a str,
    iter: Peekable<Chars<'a>>,
    loc: SourceLocation,
    offset: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer {
            source,
            iter: source.chars().peekable(),
            loc: SourceLocation::start_of_source(),
            offset: 0,
        }
    }

    fn advance(&mut self) -> Option<(usize, SourceLocation, char)> {
        let c = self.iter.next()?;

        let offset = self.offset;
        let loc = self.loc;

        if c == '\n' {
            self.loc.line += 1;
            self.loc.col = 1;
        } else {
            self.loc.col += 1;
        }

        self.offset += c.len_utf8();

        Some((offset, loc, c))
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&c) = self.iter.peek() {
            if c == '#' {
                self.read_while(self.loc, |c| c != '\n');
            } else if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    // Returns the str offset one past the run and the location of its last character, which is
    // `last` when the run is empty.
    fn read_while<P: Fn(char) -> bool>(
        &mut self,
        mut last: SourceLocation,
        predicate: P,
    ) -> (usize, SourceLocation) {
        while let Some(&c) = self.iter.peek() {
            if !predicate(c) {
                break;
            }

            if let Some((_, loc, _)) = self.advance() {
                last = loc;
            }
        }

        (self.offset, last)
    }
}

fn is_identifier_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_rest_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, SignatureError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace_and_comments();

        let source = self.source;
        let (offset, start, c) = self.advance()?;

        #[rustfmt::skip]
        let kind = match c {
            _ if is_identifier_start_char(c) => {
                let (end_offset, end) = self.read_while(start, is_identifier_rest_char);
                let span = SourceSpan { start, end };

                let kind = match &source[offset..end_offset] {
                    "if"     => TokenKind::KeywordIf,
                    "throws" => TokenKind::KeywordThrows,
                    identifier => TokenKind::Identifier(identifier),
                };

                return Some(Ok(Token { span, kind }));
            }

            '.' => {
                let (end_offset, end) = self.read_while(start, |c| c == '.');

                if end_offset - offset != 3 {
                    return Some(Err(SignatureError::UnrecognizedCharacter { loc: start, ch: c }));
                }

                return Some(Ok(Token { span: SourceSpan { start, end }, kind: TokenKind::Ellipsis }));
            }

            '(' => TokenKind::ParenOpen,
            ')' => TokenKind::ParenClose,
            '{' => TokenKind::BraceOpen,
            '}' => TokenKind::BraceClose,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,

            _ => return Some(Err(SignatureError::UnrecognizedCharacter { loc: start, ch: c })),
        };

        Some(Ok(Token {
            span: SourceSpan::single(start),
            kind,
        }))
    }
}
