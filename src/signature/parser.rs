use super::tokenizer::{Token, TokenKind, Tokenizer};
use super::{Arg, ReturnType, Signature, SignatureError, ValueType};
use crate::source_location::SourceSpan;
use std::iter::Peekable;
use std::vec::IntoIter;

type Result<T> = std::result::Result<T, SignatureError>;

macro_rules! expect_token {
    ($parser:expr, $expected:expr, $(|)? $( $pattern:pat_param )|+ $(,)?) => {
        match $parser.tokens.next() {
            Some(tok) if matches!(tok.kind, $( $pattern )|+) => Ok(tok),
            Some(tok) => Err(SignatureError::UnexpectedToken {
                span: tok.span,
                expected: $expected,
                found: tok.kind.describe(),
            }),
            None => Err(SignatureError::UnexpectedEnd {
                line: $parser.last_line,
                expected: $expected,
            }),
        }
    };
}

struct Parser<'a> {
    tokens: Peekable<IntoIter<Token<'a>>>,
    // Open `if` blocks, innermost last.
    defines: Vec<(&'a str, SourceSpan)>,
    last_line: usize,
}

/// Parses a signature table.
///
/// ```text
/// filc_ptr zgc_alloc(size_t);
/// throws int _Unwind_RaiseException(filc_ptr);
/// if FILC_MUSL {
///     int zsys_isatty(int);
/// }
/// ```
pub fn parse_table(source: &str) -> Result<Vec<Signature>> {
    let tokens = Tokenizer::new(source).collect::<Result<Vec<_>>>()?;

    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        defines: Vec::new(),
        last_line: source.lines().count().max(1),
    };

    parser.parse_items()
}

impl<'a> Parser<'a> {
    fn parse_items(&mut self) -> Result<Vec<Signature>> {
        use TokenKind::*;

        let mut signatures = Vec::new();

        while let Some(token) = self.tokens.next() {
            match token.kind {
                KeywordIf => {
                    let define = expect_token!(self, "define name", Identifier(_))?;
                    let Identifier(name) = define.kind else {
                        unreachable!()
                    };

                    expect_token!(self, "`{`", BraceOpen)?;

                    self.defines.push((name, token.span.extend(&define.span)));
                }
                BraceClose if !self.defines.is_empty() => {
                    self.defines.pop();
                }
                KeywordThrows | Identifier(_) => {
                    let signature = self.parse_declaration(token)?;
                    signatures.push(signature);
                }
                _ => {
                    return Err(SignatureError::UnexpectedToken {
                        span: token.span,
                        expected: "declaration",
                        found: token.kind.describe(),
                    })
                }
            }
        }

        if let Some((define, span)) = self.defines.last() {
            return Err(SignatureError::UnclosedBlock {
                span: *span,
                define: define.to_string(),
            });
        }

        Ok(signatures)
    }

    // Collects consecutive identifiers, so `unsigned long long` comes back as one type name.
    fn parse_words(&mut self, first: Token<'a>) -> Vec<(&'a str, SourceSpan)> {
        let mut words = Vec::new();

        if let TokenKind::Identifier(word) = first.kind {
            words.push((word, first.span));
        }

        while let Some(&Token {
            kind: TokenKind::Identifier(word),
            span,
        }) = self.tokens.peek()
        {
            words.push((word, span));
            self.tokens.next();
        }

        words
    }

    fn parse_declaration(&mut self, first: Token<'a>) -> Result<Signature> {
        let throws = first.kind == TokenKind::KeywordThrows;

        let first = if throws {
            expect_token!(self, "return type", TokenKind::Identifier(_))?
        } else {
            first
        };

        let mut words = self.parse_words(first);

        // The last word is the function name and everything before it is the return type.
        let (name, name_span) = match words.pop() {
            Some(word) if !words.is_empty() => word,
            _ => {
                return Err(SignatureError::UnexpectedToken {
                    span: first.span,
                    expected: "return type and name",
                    found: "identifier",
                })
            }
        };

        let ret = match join_words(&words).as_str() {
            "void" => ReturnType::Void,
            ret => ReturnType::Value(resolve_type(ret, first.span.extend(&name_span))?),
        };

        expect_token!(self, "`(`", TokenKind::ParenOpen)?;

        let args = self.parse_args(name)?;

        expect_token!(self, "`;`", TokenKind::Semicolon)?;

        Ok(Signature {
            name: name.to_string(),
            ret,
            throws,
            args,
            defines: self.defines.iter().map(|(d, _)| d.to_string()).collect(),
        })
    }

    fn parse_args(&mut self, function: &str) -> Result<Vec<Arg>> {
        use TokenKind::*;

        let mut args = Vec::new();

        if let Some(Token {
            kind: ParenClose, ..
        }) = self.tokens.peek()
        {
            self.tokens.next();
            return Ok(args);
        }

        loop {
            let token = expect_token!(self, "argument type", Identifier(_) | Ellipsis)?;

            let arg = if token.kind == Ellipsis {
                Arg::Variadic
            } else {
                let words = self.parse_words(token);
                let span = token.span.extend(&words[words.len() - 1].1);
                Arg::Value(resolve_type(&join_words(&words), span)?)
            };

            let separator = expect_token!(self, "`,` or `)`", Comma | ParenClose)?;

            if let Some(Arg::Variadic) = args.last() {
                return Err(SignatureError::MisplacedVariadic {
                    span: token.span,
                    function: function.to_string(),
                });
            }

            args.push(arg);

            if separator.kind == ParenClose {
                return Ok(args);
            }
        }
    }
}

fn join_words(words: &[(&str, SourceSpan)]) -> String {
    words
        .iter()
        .map(|(word, _)| *word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_type(name: &str, span: SourceSpan) -> Result<ValueType> {
    ValueType::from_c_name(name).ok_or_else(|| SignatureError::UnknownType {
        span,
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_location::SourceLocation;

    #[test]
    fn parses_declarations_and_blocks() {
        let source = "
filc_ptr zgc_alloc(size_t);
void zfence();
if FILC_MUSL {
    unsigned long long zfoo(filc_ptr, unsigned long, ...);
    if FILC_EXTRA {
        throws void zbar(filc_ptr);
    }
}
bool zlast(bool);
";

        let signatures = parse_table(source).unwrap();

        assert_eq!(signatures.len(), 5);

        assert_eq!(signatures[1].name, "zfence");
        assert_eq!(signatures[1].ret, ReturnType::Void);
        assert!(signatures[1].args.is_empty());

        let foo = &signatures[2];
        assert_eq!(foo.ret, ReturnType::Value(ValueType::UnsignedLongLong));
        assert_eq!(
            foo.args,
            vec![
                Arg::Value(ValueType::FilcPtr),
                Arg::Value(ValueType::UnsignedLong),
                Arg::Variadic
            ]
        );
        assert_eq!(foo.defines, vec!["FILC_MUSL"]);

        let bar = &signatures[3];
        assert!(bar.throws);
        assert_eq!(bar.defines, vec!["FILC_MUSL", "FILC_EXTRA"]);

        assert!(signatures[4].defines.is_empty());
    }

    #[test]
    fn rejects_unknown_types() {
        let error = parse_table("int zok(int);\nint zbad(char);").unwrap_err();

        assert_eq!(
            error,
            SignatureError::UnknownType {
                span: SourceSpan {
                    start: SourceLocation { line: 2, col: 10 },
                    end: SourceLocation { line: 2, col: 13 },
                },
                name: "char".to_string(),
            }
        );
        assert_eq!(error.to_string(), "line 2:10: bad type `char`");
    }

    #[test]
    fn rejects_void_arguments() {
        assert!(matches!(
            parse_table("int zfoo(void);"),
            Err(SignatureError::UnknownType { .. })
        ));
    }

    #[test]
    fn rejects_variadic_before_the_end() {
        let error = parse_table("int zfoo(..., int);").unwrap_err();

        assert!(matches!(error, SignatureError::MisplacedVariadic { .. }));
        assert_eq!(
            error.to_string(),
            "line 1:15: `...` must be the last argument of `zfoo`"
        );
    }

    #[test]
    fn rejects_unclosed_blocks() {
        let error = parse_table("if FILC_MUSL {\nint zfoo();").unwrap_err();

        assert_eq!(
            error.to_string(),
            "line 1:1: `if FILC_MUSL` block is never closed"
        );
    }

    #[test]
    fn rejects_unbalanced_close() {
        assert!(matches!(
            parse_table("int zfoo();\n}"),
            Err(SignatureError::UnexpectedToken {
                expected: "declaration",
                found: "`}`",
                ..
            })
        ));
    }

    #[test]
    fn rejects_missing_name() {
        assert!(parse_table("int (int);").is_err());
        assert!(matches!(
            parse_table("int zfoo(int)"),
            Err(SignatureError::UnexpectedEnd {
                line: 1,
                expected: "`;`"
            })
        ));
    }
}
