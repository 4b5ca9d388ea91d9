use crate::strings::{build_string, BuildError};
use crate::symbol::Symbol;
use crate::tokens::{next_token, skip_whitespace, Bracket, Prefix, Token, TokenizerError};
use crate::types::Expression;
use std::fmt;

/// A form read from the front of a buffer, plus how many bytes it used up (including the
/// whitespace after it). `None` means the buffer held nothing but whitespace and comments.
pub type Result<T = (Option<Expression>, usize)> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq)]
pub enum Error {
    Tokenizer(TokenizerError),
    BadString { error: BuildError, start: usize },
    UnterminatedList { open: Bracket, start: usize },
    MismatchedBracket { open: Bracket, close: Bracket, position: usize },
    UnmatchedClose { close: Bracket, position: usize },
    MisplacedDot { position: usize },
    BadPairTail { position: usize },
    DanglingPrefix { prefix: Prefix, position: usize },
}

impl Error {
    /// Would more text have turned this into a complete form?
    pub fn is_incomplete(&self) -> bool {
        match self {
            Error::Tokenizer(e) => e.is_incomplete(),
            Error::UnterminatedList { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Tokenizer(e) => write!(f, "{}", e),
            Error::BadString { error, start } => {
                write!(f, "in string literal at offset {}: {}", start, error)
            }
            Error::UnterminatedList { open, start } => write!(
                f,
                "'{}' at offset {} is never closed",
                open.open(),
                start
            ),
            Error::MismatchedBracket {
                open,
                close,
                position,
            } => write!(
                f,
                "expected '{}' but found '{}' at offset {}",
                open.close(),
                close.close(),
                position
            ),
            Error::UnmatchedClose { close, position } => {
                write!(f, "unmatched '{}' at offset {}", close.close(), position)
            }
            Error::MisplacedDot { position } => {
                write!(f, "'.' at offset {} must follow at least one list element", position)
            }
            Error::BadPairTail { position } => write!(
                f,
                "'.' at offset {} must be followed by exactly one form and a closing bracket",
                position
            ),
            Error::DanglingPrefix { prefix, position } => write!(
                f,
                "'{}' at offset {} is not followed by a form",
                prefix.character(),
                position
            ),
        }
    }
}

impl From<TokenizerError> for Error {
    fn from(e: TokenizerError) -> Self {
        Error::Tokenizer(e)
    }
}

/// What a single step of the reader can see. Closing brackets and dots are only meaningful to the
/// list being read around them, so they are handed back rather than consumed.
enum Form {
    Expression(Expression),
    Close(Bracket, usize),
    Dot(usize),
    End,
}

/// Read the first complete form of `text` starting at byte `offset`.
pub fn read(text: &str, offset: usize) -> Result {
    match read_form(text, offset)? {
        (Form::Expression(expr), consumed) => Ok((Some(expr), consumed)),
        (Form::End, consumed) => Ok((None, consumed)),
        (Form::Close(close, position), _) => Err(Error::UnmatchedClose { close, position }),
        (Form::Dot(position), _) => Err(Error::MisplacedDot { position }),
    }
}

/// Read just the first form of `text`.
pub fn read_str(text: &str) -> Result<Option<Expression>> {
    read(text, 0).map(|(expr, _)| expr)
}

/// Read every form in `text`, in order.
pub fn read_all(text: &str) -> Result<Vec<Expression>> {
    let mut offset = 0;
    let mut forms = Vec::new();
    loop {
        match read(text, offset)? {
            (Some(expr), consumed) => {
                forms.push(expr);
                offset += consumed;
            }
            (None, _) => return Ok(forms),
        }
    }
}

fn read_form(text: &str, offset: usize) -> Result<(Form, usize)> {
    let lexeme = match next_token(text, offset)? {
        Some(lexeme) => lexeme,
        None => return Ok((Form::End, text.len() - offset)),
    };
    let (expr, end) = match lexeme.token {
        Token::Close(bracket) => {
            return Ok((Form::Close(bracket, lexeme.start), lexeme.start - offset));
        }
        Token::Dot => return Ok((Form::Dot(lexeme.start), lexeme.end - offset)),
        Token::Open(bracket) => read_list(text, bracket, lexeme.start, lexeme.end)?,
        Token::Prefix(prefix) => read_prefixed(text, prefix, lexeme.start, lexeme.end)?,
        Token::Number(n) => (Expression::Number(n), lexeme.end),
        Token::Boolean(b) => (Expression::Boolean(b), lexeme.end),
        Token::Symbol(name) => (Expression::Symbol(Symbol::new(name)), lexeme.end),
        Token::StringLiteral(payload) => {
            let decoded = build_string(payload).map_err(|error| Error::BadString {
                error,
                start: lexeme.start,
            })?;
            (Expression::string(&decoded), lexeme.end)
        }
    };
    let end = skip_whitespace(text, end);
    Ok((Form::Expression(expr), end - offset))
}

fn read_prefixed(
    text: &str,
    prefix: Prefix,
    start: usize,
    after: usize,
) -> Result<(Expression, usize)> {
    match read_form(text, after)? {
        (Form::Expression(quoted), consumed) => {
            let wrapped = Expression::list(vec![Expression::symbol(prefix.symbol_name()), quoted]);
            Ok((wrapped, after + consumed))
        }
        (Form::End, _) | (Form::Close(..), _) | (Form::Dot(_), _) => Err(Error::DanglingPrefix {
            prefix,
            position: start,
        }),
    }
}

fn read_list(text: &str, open: Bracket, start: usize, after: usize) -> Result<(Expression, usize)> {
    let mut elements = Vec::new();
    let mut i = after;
    loop {
        let (form, advance) = read_form(text, i)?;
        i += advance;
        match form {
            Form::Expression(expr) => elements.push(expr),
            Form::Close(close, position) => {
                return close_list(open, close, position).map(|end| (Expression::list(elements), end))
            }
            Form::End => return Err(Error::UnterminatedList { open, start }),
            Form::Dot(position) => {
                if elements.is_empty() {
                    return Err(Error::MisplacedDot { position });
                }
                let tail = match read_form(text, i)? {
                    (Form::Expression(tail), advance) => {
                        i += advance;
                        tail
                    }
                    (Form::End, _) => return Err(Error::UnterminatedList { open, start }),
                    _ => return Err(Error::BadPairTail { position }),
                };
                return match read_form(text, i)? {
                    (Form::Close(close, at), _) => {
                        close_list(open, close, at).map(|end| (dotted(elements, tail), end))
                    }
                    (Form::End, _) => Err(Error::UnterminatedList { open, start }),
                    _ => Err(Error::BadPairTail { position }),
                };
            }
        }
    }
}

/// Check the closing bracket and return the offset just past it.
fn close_list(open: Bracket, close: Bracket, position: usize) -> Result<usize> {
    match open == close {
        true => Ok(position + close.close().len_utf8()),
        false => Err(Error::MismatchedBracket {
            open,
            close,
            position,
        }),
    }
}

/// `(a b . (c d))` is just `(a b c d)`; anything else after the dot chains pairs.
fn dotted(mut elements: Vec<Expression>, tail: Expression) -> Expression {
    match tail {
        Expression::List(rest) => {
            elements.extend(rest.iter().cloned());
            Expression::list(elements)
        }
        other => elements
            .into_iter()
            .rev()
            .fold(other, |cdr, car| Expression::pair(car, cdr)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Expression {
        Expression::Number(n)
    }

    fn sym(name: &str) -> Expression {
        Expression::symbol(name)
    }

    fn list(elements: Vec<Expression>) -> Expression {
        Expression::list(elements)
    }

    fn read_one(text: &str) -> Expression {
        read_str(text).unwrap().unwrap()
    }

    #[test]
    fn reads_numbers() {
        assert_eq!(read_one("123"), num(123.0));
        assert_eq!(read_one("123.123"), num(123.123));
        assert_eq!(read_one(".123"), num(0.123));
        assert_eq!(read_one("-123"), num(-123.0));
        assert_eq!(read_one("+123"), num(123.0));
        assert_eq!(read_one("  123"), num(123.0));
    }

    #[test]
    fn reads_symbols_by_identity() {
        assert_eq!(read_one("hello"), read_one("hello"));
        assert_eq!(read_one("  helloA"), sym("helloA"));
        assert_ne!(read_one("hello"), read_one("\"hello\""));
        assert_eq!(read_one("+one"), sym("+one"));
        assert_eq!(read_one("1.hello"), sym("1.hello"));
        assert_eq!(read_one("..."), sym("..."));
    }

    #[test]
    fn reads_strings_with_escapes() {
        assert_eq!(read_one(r#""a\"b\\c\n""#), Expression::string("a\"b\\c\n"));
        assert!(matches!(
            read(r#""bad \q escape""#, 0),
            Err(Error::BadString { start: 0, .. })
        ));
    }

    #[test]
    fn reads_empty_lists_at_any_depth() {
        assert_eq!(read_one("()"), Expression::empty_list());
        assert_eq!(
            read_one("(1 2 3 ())"),
            list(vec![num(1.0), num(2.0), num(3.0), Expression::empty_list()])
        );
        assert_eq!(
            read_one("[(()) {}]"),
            list(vec![
                list(vec![Expression::empty_list()]),
                Expression::empty_list()
            ])
        );
    }

    #[test]
    fn reads_reader_macros() {
        assert_eq!(read_one("'1"), list(vec![sym("quote"), num(1.0)]));
        assert_eq!(
            read_one("(1 '2 3)"),
            list(vec![num(1.0), list(vec![sym("quote"), num(2.0)]), num(3.0)])
        );
        assert_eq!(
            read_one("`(a ,b)"),
            list(vec![
                sym("quasiquote"),
                list(vec![sym("a"), list(vec![sym("unquote"), sym("b")])])
            ])
        );
        assert_eq!(read_one("''x"), list(vec![sym("quote"), list(vec![sym("quote"), sym("x")])]));
    }

    #[test]
    fn quote_without_a_form() {
        assert!(matches!(read("'", 0), Err(Error::DanglingPrefix { .. })));
        assert!(matches!(read("(')", 0), Err(Error::DanglingPrefix { .. })));
    }

    #[test]
    fn brackets_must_match_in_kind() {
        assert_eq!(
            read("(1 2 3}", 0),
            Err(Error::MismatchedBracket {
                open: Bracket::Round,
                close: Bracket::Brace,
                position: 6
            })
        );
        assert_eq!(read_one("[1 {2}]"), list(vec![num(1.0), list(vec![num(2.0)])]));
    }

    #[test]
    fn unbalanced_brackets() {
        assert_eq!(
            read("(1 (2)", 0),
            Err(Error::UnterminatedList {
                open: Bracket::Round,
                start: 0
            })
        );
        assert_eq!(
            read("  )", 0),
            Err(Error::UnmatchedClose {
                close: Bracket::Round,
                position: 2
            })
        );
        assert!(read("(1 (2)", 0).unwrap_err().is_incomplete());
        assert!(!read("  )", 0).unwrap_err().is_incomplete());
    }

    #[test]
    fn dotted_pairs() {
        assert_eq!(read_one("(1 . 2)"), Expression::pair(num(1.0), num(2.0)));
        assert_eq!(
            read_one("(1 2 . 3)"),
            Expression::pair(num(1.0), Expression::pair(num(2.0), num(3.0)))
        );
        assert_eq!(read_one("(1 . (2 3))"), list(vec![num(1.0), num(2.0), num(3.0)]));
        assert_eq!(read_one("(1 . ())"), list(vec![num(1.0)]));
        assert_eq!(
            read_one("(1 . (2 . 3))"),
            Expression::pair(num(1.0), Expression::pair(num(2.0), num(3.0)))
        );
    }

    #[test]
    fn malformed_dotted_pairs() {
        assert!(matches!(read("(. 1)", 0), Err(Error::MisplacedDot { position: 1 })));
        assert!(matches!(read("(1 . 2 3)", 0), Err(Error::BadPairTail { .. })));
        assert!(matches!(read("(1 . )", 0), Err(Error::BadPairTail { .. })));
        assert!(matches!(read("(1 . 2 . 3)", 0), Err(Error::BadPairTail { .. })));
        assert!(matches!(read(".", 0), Err(Error::MisplacedDot { .. })));
    }

    #[test]
    fn consumed_count_drives_repeated_reads() {
        let text = "(a b) 12 ; comment\n \"s\"";
        let (first, consumed) = read(text, 0).unwrap();
        assert_eq!(first, Some(list(vec![sym("a"), sym("b")])));
        assert_eq!(consumed, 6);
        let (second, consumed2) = read(text, consumed).unwrap();
        assert_eq!(second, Some(num(12.0)));
        let (third, _) = read(text, consumed + consumed2).unwrap();
        assert_eq!(third, Some(Expression::string("s")));
    }

    #[test]
    fn end_of_input_reads_nothing() {
        assert_eq!(read("", 0), Ok((None, 0)));
        assert_eq!(read("   ; just a comment", 0), Ok((None, 19)));
        assert_eq!(read_str("#| block |#"), Ok(None));
    }

    #[test]
    fn read_all_collects_every_form() {
        assert_eq!(
            read_all("1 two \"three\" (4)").unwrap(),
            vec![
                num(1.0),
                sym("two"),
                Expression::string("three"),
                list(vec![num(4.0)])
            ]
        );
        assert_eq!(read_all("  ").unwrap(), vec![]);
    }

    #[test]
    fn booleans() {
        assert_eq!(read_one("#t"), Expression::Boolean(true));
        assert_eq!(read_one("#F"), Expression::Boolean(false));
        assert_eq!(
            read_one("(#t #f)"),
            list(vec![Expression::Boolean(true), Expression::Boolean(false)])
        );
    }
}
