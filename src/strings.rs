// String literals use the usual escapes: \" \\ \/ \b \f \n \r \t and \uXXXX.
// The single-character escapes live in one table so that reading and printing
// stay mutually inverse.

use bimap::BiMap;
use std::fmt;
use std::str::Chars;

lazy_static! {
    static ref ESCAPES: BiMap<char, char> = {
        let mut m = BiMap::new();
        m.insert('\\', '\\');
        m.insert('"', '"');
        m.insert('/', '/');
        m.insert('b', '\u{8}');
        m.insert('f', '\u{c}');
        m.insert('n', '\n');
        m.insert('r', '\r');
        m.insert('t', '\t');
        m
    };
}

struct StringBuilder<'a> {
    chars: Chars<'a>,
}

impl<'a> StringBuilder<'a> {
    fn new(src: &'a str) -> Self {
        Self { chars: src.chars() }
    }

    fn unicode_escape(&mut self) -> Result<char, BuildError> {
        let digits: String = self.chars.by_ref().take(4).collect();
        if digits.chars().count() != 4 {
            return Err(BuildError::BadUnicodeEscape(digits));
        }
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(std::char::from_u32)
            .ok_or(BuildError::BadUnicodeEscape(digits))
    }
}

#[derive(Debug, PartialEq)]
pub enum BuildError {
    UnknownEscape(char),
    BadUnicodeEscape(String),
    UnexpectedSingleBackslash,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnknownEscape(c) => write!(f, "unknown escape sequence \\{}", c),
            BuildError::BadUnicodeEscape(digits) => {
                write!(f, "bad unicode escape sequence \\u{}", digits)
            }
            BuildError::UnexpectedSingleBackslash => write!(f, "lone backslash at end of string"),
        }
    }
}

impl Iterator for StringBuilder<'_> {
    type Item = std::result::Result<char, BuildError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.chars.next()? {
            '\\' => match self.chars.next() {
                None => Err(BuildError::UnexpectedSingleBackslash),
                Some('u') => self.unicode_escape(),
                Some(c) => ESCAPES
                    .get_by_left(&c)
                    .copied()
                    .ok_or(BuildError::UnknownEscape(c)),
            },
            c => Ok(c),
        };
        Some(result)
    }
}

/// Decode the contents of a string literal, without its surrounding quotes.
pub(crate) fn build_string(src: &str) -> Result<String, BuildError> {
    StringBuilder::new(src).collect()
}

struct StringPrinter<'a> {
    chars: Chars<'a>,
}

impl<'a> StringPrinter<'a> {
    fn new(src: &'a str) -> Self {
        Self { chars: src.chars() }
    }
}

impl Iterator for StringPrinter<'_> {
    type Item = (char, Option<char>);

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.chars.next()?;
        // '/' needs no escaping on the way out
        let charseq = match ESCAPES.get_by_right(&next) {
            Some(&l) if l != '/' => ('\\', Some(l)),
            _ => (next, None),
        };
        Some(charseq)
    }
}

pub(crate) fn string_repr(src: &str) -> String {
    let mut output = String::new();
    output.push('"');
    for (char1, char2) in StringPrinter::new(src) {
        output.push(char1);
        if let Some(char2) = char2 {
            output.push(char2)
        };
    }
    output.push('"');
    output
}
