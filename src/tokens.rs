use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Bracket {
    Round,
    Square,
    Brace,
}

impl Bracket {
    fn opened_by(c: char) -> Option<Self> {
        match c {
            '(' => Some(Bracket::Round),
            '[' => Some(Bracket::Square),
            '{' => Some(Bracket::Brace),
            _ => None,
        }
    }

    fn closed_by(c: char) -> Option<Self> {
        match c {
            ')' => Some(Bracket::Round),
            ']' => Some(Bracket::Square),
            '}' => Some(Bracket::Brace),
            _ => None,
        }
    }

    pub fn open(self) -> char {
        match self {
            Bracket::Round => '(',
            Bracket::Square => '[',
            Bracket::Brace => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Bracket::Round => ')',
            Bracket::Square => ']',
            Bracket::Brace => '}',
        }
    }
}

/// The reader macros `'x`, `` `x `` and `,x`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Prefix {
    Quote,
    Quasiquote,
    Unquote,
}

impl Prefix {
    pub fn symbol_name(self) -> &'static str {
        match self {
            Prefix::Quote => "quote",
            Prefix::Quasiquote => "quasiquote",
            Prefix::Unquote => "unquote",
        }
    }

    pub fn character(self) -> char {
        match self {
            Prefix::Quote => '\'',
            Prefix::Quasiquote => '`',
            Prefix::Unquote => ',',
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Token<'a> {
    Open(Bracket),
    Close(Bracket),
    Prefix(Prefix),
    /// Contents between the quotes, escapes not yet decoded.
    StringLiteral(&'a str),
    Boolean(bool),
    Number(f64),
    Symbol(&'a str),
    /// A lone `.` inside a list.
    Dot,
}

/// A token with the byte range it was read from.
#[derive(Debug, PartialEq)]
pub struct Lexeme<'a> {
    pub token: Token<'a>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, PartialEq)]
pub enum TokenizerError {
    UnexpectedCharacter { found: char, position: usize },
    UnterminatedString { start: usize },
    UnterminatedBlockComment { start: usize },
}

impl TokenizerError {
    pub fn is_incomplete(&self) -> bool {
        match self {
            TokenizerError::UnexpectedCharacter { .. } => false,
            TokenizerError::UnterminatedString { .. }
            | TokenizerError::UnterminatedBlockComment { .. } => true,
        }
    }
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizerError::UnexpectedCharacter { found, position } => {
                write!(f, "unexpected character {:?} at offset {}", found, position)
            }
            TokenizerError::UnterminatedString { start } => {
                write!(f, "string literal starting at offset {} is never closed", start)
            }
            TokenizerError::UnterminatedBlockComment { start } => {
                write!(f, "block comment starting at offset {} is never closed", start)
            }
        }
    }
}

lazy_static! {
    static ref ATOM_RE: Regex = Regex::new(
        r#"(?x)                 # ignore whitespace in this pattern & allow comments
            ^[^\s()\[\]{}"'`,;]+ # everything up to a delimiter or reader macro
        "#
    )
    .unwrap();
    static ref NUMBER_RE: Regex = Regex::new(
        r#"(?x)
            ^[+-]?              # optional sign
            (?:
                [0-9]+(?:\.[0-9]*)? # digits, then maybe a decimal point and more digits
                |\.[0-9]+           # or a leading decimal point
            )$
        "#
    )
    .unwrap();
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || "!$%&*+-./:<=>?@^_~|#".contains(c)
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == ';' || Bracket::opened_by(c).is_some() || Bracket::closed_by(c).is_some()
}

/// Skip whitespace only, returning the offset of the next significant character.
pub(crate) fn skip_whitespace(text: &str, offset: usize) -> usize {
    let rest = &text[offset..];
    offset + (rest.len() - rest.trim_start().len())
}

/// Skip whitespace, `;` line comments and `#| |#` block comments.
fn skip_trivia(text: &str, mut offset: usize) -> Result<usize, TokenizerError> {
    loop {
        offset = skip_whitespace(text, offset);
        let rest = &text[offset..];
        if rest.starts_with(';') {
            offset = match rest.find('\n') {
                Some(newline) => offset + newline + 1,
                None => text.len(),
            };
        } else if rest.starts_with("#|") {
            let end = rest[2..]
                .find("|#")
                .ok_or(TokenizerError::UnterminatedBlockComment { start: offset })?;
            offset += 2 + end + 2;
        } else {
            return Ok(offset);
        }
    }
}

/// Find the next token at or after `offset`. `None` means only trivia remained.
pub(crate) fn next_token(text: &str, offset: usize) -> Result<Option<Lexeme>, TokenizerError> {
    let start = skip_trivia(text, offset)?;
    let first = match text[start..].chars().next() {
        Some(c) => c,
        None => return Ok(None),
    };
    let single = |token| {
        Ok(Some(Lexeme {
            token,
            start,
            end: start + first.len_utf8(),
        }))
    };
    if let Some(bracket) = Bracket::opened_by(first) {
        return single(Token::Open(bracket));
    }
    if let Some(bracket) = Bracket::closed_by(first) {
        return single(Token::Close(bracket));
    }
    match first {
        '\'' => single(Token::Prefix(Prefix::Quote)),
        '`' => single(Token::Prefix(Prefix::Quasiquote)),
        ',' => single(Token::Prefix(Prefix::Unquote)),
        '"' => tokenize_string_literal(text, start).map(Some),
        '#' => tokenize_boolean(text, start).map(Some),
        _ => tokenize_atom(text, start).map(Some),
    }
}

fn tokenize_string_literal(text: &str, start: usize) -> Result<Lexeme, TokenizerError> {
    let bytes = text.as_bytes();
    let body_start = start + 1;
    let mut search_from = body_start;
    while let Some(found) = text[search_from..].find('"') {
        let quote = search_from + found;
        let trailing_backslashes = bytes[body_start..quote]
            .iter()
            .rev()
            .take_while(|&&byte| byte == b'\\')
            .count();
        if trailing_backslashes % 2 == 0 {
            return Ok(Lexeme {
                token: Token::StringLiteral(&text[body_start..quote]),
                start,
                end: quote + 1,
            });
        }
        search_from = quote + 1;
    }
    Err(TokenizerError::UnterminatedString { start })
}

fn tokenize_boolean(text: &str, start: usize) -> Result<Lexeme, TokenizerError> {
    let mut chars = text[start + 1..].char_indices();
    let value = match chars.next() {
        Some((_, 't')) | Some((_, 'T')) => true,
        Some((_, 'f')) | Some((_, 'F')) => false,
        Some((i, found)) => {
            return Err(TokenizerError::UnexpectedCharacter {
                found,
                position: start + 1 + i,
            })
        }
        None => {
            return Err(TokenizerError::UnexpectedCharacter {
                found: '#',
                position: start,
            })
        }
    };
    let end = start + 2;
    match text[end..].chars().next() {
        Some(found) if !is_delimiter(found) => Err(TokenizerError::UnexpectedCharacter {
            found,
            position: end,
        }),
        _ => Ok(Lexeme {
            token: Token::Boolean(value),
            start,
            end,
        }),
    }
}

fn tokenize_atom(text: &str, start: usize) -> Result<Lexeme, TokenizerError> {
    let rest = &text[start..];
    let atom = ATOM_RE.find(rest).map(|m| m.as_str()).unwrap_or("");
    if let Some((i, found)) = atom.char_indices().find(|&(_, c)| !is_symbol_char(c)) {
        return Err(TokenizerError::UnexpectedCharacter {
            found,
            position: start + i,
        });
    }
    let end = start + atom.len();
    // Whatever stopped the atom must be able to separate it from the next token.
    if let Some(found) = text[end..].chars().next().filter(|&c| !is_delimiter(c)) {
        return Err(TokenizerError::UnexpectedCharacter {
            found,
            position: end,
        });
    }
    let token = if atom == "." {
        Token::Dot
    } else if NUMBER_RE.is_match(atom) {
        match atom.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Symbol(atom),
        }
    } else {
        Token::Symbol(atom)
    };
    Ok(Lexeme { token, start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        let mut offset = 0;
        let mut result = Vec::new();
        while let Some(lexeme) = next_token(text, offset).unwrap() {
            offset = lexeme.end;
            result.push(lexeme.token);
        }
        result
    }

    #[test]
    fn numbers_and_symbols_share_leading_characters() {
        assert_eq!(
            tokens("1 -2 +3.5 .25 1. + - ... +one 1.hello 1.2.3"),
            vec![
                Token::Number(1.0),
                Token::Number(-2.0),
                Token::Number(3.5),
                Token::Number(0.25),
                Token::Number(1.0),
                Token::Symbol("+"),
                Token::Symbol("-"),
                Token::Symbol("..."),
                Token::Symbol("+one"),
                Token::Symbol("1.hello"),
                Token::Symbol("1.2.3"),
            ]
        );
    }

    #[test]
    fn brackets_prefixes_and_dot() {
        use Bracket::*;
        assert_eq!(
            tokens("([{ . }]) 'a `b ,c"),
            vec![
                Token::Open(Round),
                Token::Open(Square),
                Token::Open(Brace),
                Token::Dot,
                Token::Close(Brace),
                Token::Close(Square),
                Token::Close(Round),
                Token::Prefix(Prefix::Quote),
                Token::Symbol("a"),
                Token::Prefix(Prefix::Quasiquote),
                Token::Symbol("b"),
                Token::Prefix(Prefix::Unquote),
                Token::Symbol("c"),
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            tokens("a ; the rest of the line\n b #| block\n comment |# c"),
            vec![Token::Symbol("a"), Token::Symbol("b"), Token::Symbol("c")]
        );
        assert_eq!(tokens("; only a comment"), vec![]);
    }

    #[test]
    fn unterminated_block_comment() {
        assert_eq!(
            next_token("  #| never closed", 0),
            Err(TokenizerError::UnterminatedBlockComment { start: 2 })
        );
    }

    #[test]
    fn booleans_ignore_case() {
        assert_eq!(
            tokens("#t #F #T #f"),
            vec![
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Boolean(true),
                Token::Boolean(false),
            ]
        );
        assert!(next_token("#x", 0).is_err());
        assert!(next_token("#true", 0).is_err());
    }

    #[test]
    fn string_literal_respects_escaped_quotes() {
        let lexeme = next_token(r#""a \"quoted\" word" rest"#, 0).unwrap().unwrap();
        assert_eq!(lexeme.token, Token::StringLiteral(r#"a \"quoted\" word"#));
        assert_eq!(lexeme.end, 19);

        let lexeme = next_token(r#""ends in backslash\\" x"#, 0).unwrap().unwrap();
        assert_eq!(lexeme.token, Token::StringLiteral(r#"ends in backslash\\"#));
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(
            next_token(r#" "abc\""#, 0),
            Err(TokenizerError::UnterminatedString { start: 1 })
        );
    }

    #[test]
    fn unexpected_characters() {
        assert_eq!(
            next_token(r"ab\c", 0),
            Err(TokenizerError::UnexpectedCharacter {
                found: '\\',
                position: 2
            })
        );
        assert_eq!(
            next_token(r#"abc"def""#, 0),
            Err(TokenizerError::UnexpectedCharacter {
                found: '"',
                position: 3
            })
        );
    }
}
