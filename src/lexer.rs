use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use log::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: Rc<str>,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Integer,
    Str,
    Label,
    EndStmt,
    If,
    Goto,
    Call,
    End,
    Assign,
    Lt,
    Gt,
    Lte,
    Gte,
    Eq,
    Neq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

const KEYWORDS: [(&str, TokenKind); 4] = [
    ("if", TokenKind::If),
    ("goto", TokenKind::Goto),
    ("call", TokenKind::Call),
    ("end", TokenKind::End),
];

// Two-character operators come first so they win over their prefixes.
const OPERATORS: [(&str, TokenKind); 13] = [
    ("<=", TokenKind::Lte),
    (">=", TokenKind::Gte),
    ("==", TokenKind::Eq),
    ("!=", TokenKind::Neq),
    ("=", TokenKind::Assign),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("+", TokenKind::Add),
    ("-", TokenKind::Sub),
    ("*", TokenKind::Mul),
    ("/", TokenKind::Div),
    ("%", TokenKind::Mod),
    ("^", TokenKind::Pow),
];

const OPERATOR_CHARS: &str = "=<>!+-*/%^";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Identifier spelling, decimal value of an integer, unescaped string contents,
    /// label name without the colon, or operator spelling.
    pub text: String,
    /// Source bytes consumed by this token.
    pub length: usize,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexingError {
    InvalidInteger {
        position: Position
    },
    IntegerOutOfRange {
        position: Position
    },
    InvalidLabel {
        position: Position
    },
    InvalidOperator {
        position: Position
    },
    UnterminatedString {
        position: Position
    },
    InvalidEscape {
        escape: char,
        position: Position
    },
    UnexpectedCharacter {
        character: char,
        position: Position
    },
}

impl LexingError {
    pub fn position(&self) -> &Position {
        match self {
            LexingError::InvalidInteger { position }
            | LexingError::IntegerOutOfRange { position }
            | LexingError::InvalidLabel { position }
            | LexingError::InvalidOperator { position }
            | LexingError::UnterminatedString { position }
            | LexingError::InvalidEscape { position, .. }
            | LexingError::UnexpectedCharacter { position, .. } => position,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            LexingError::InvalidInteger { .. } | LexingError::IntegerOutOfRange { .. } => {
                Some("integer literals must be in decimal or hexadecimal (0x) format")
            }
            LexingError::InvalidEscape { .. } => Some("supported escapes are \\\" \\\\ \\n \\t \\r and \\0"),
            _ => None,
        }
    }
}

impl Display for LexingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LexingError::InvalidInteger { .. } => write!(f, "invalid integer literal"),
            LexingError::IntegerOutOfRange { .. } => write!(f, "integer literal does not fit in 64 bits"),
            LexingError::InvalidLabel { .. } => write!(f, "invalid label"),
            LexingError::InvalidOperator { .. } => write!(f, "invalid operator"),
            LexingError::UnterminatedString { .. } => write!(f, "unterminated string literal"),
            LexingError::InvalidEscape { escape, .. } => write!(f, "invalid escape sequence '\\{escape}'"),
            LexingError::UnexpectedCharacter { character, .. } => write!(f, "unexpected character: {character:?}"),
        }
    }
}

impl Error for LexingError {}

pub fn tokenize(source: &str, file: &str) -> Result<Vec<Token>, LexingError> {
    let mut lexer = Lexer {
        source,
        file: Rc::from(file),
        offset: 0,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    if tokens.last().is_some_and(|token| token.kind != TokenKind::EndStmt) {
        tokens.push(Token {
            kind: TokenKind::EndStmt,
            text: String::new(),
            length: 0,
            position: lexer.position(),
        });
    }
    trace!("lexed {} tokens from {file}", tokens.len());
    Ok(tokens)
}

struct Lexer<'a> {
    source: &'a str,
    file: Rc<str>,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn position(&self) -> Position {
        Position {
            file: Rc::clone(&self.file),
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexingError> {
        loop {
            let Some(current) = self.rest().chars().next() else {
                return Ok(None);
            };
            let position = self.position();
            let token = match current {
                ' ' | '\t' | '\r' => {
                    self.offset += 1;
                    self.column += 1;
                    continue;
                }
                '\n' => {
                    self.offset += 1;
                    self.line += 1;
                    self.column = 1;
                    return Ok(Some(Token { kind: TokenKind::EndStmt, text: String::new(), length: 1, position }));
                }
                '0'..='9' => integer(self.rest(), position)?,
                'a'..='z' | 'A'..='Z' | '_' => identifier(self.rest(), position),
                ':' => label(self.rest(), position)?,
                '"' => string(self.rest(), position)?,
                c if OPERATOR_CHARS.contains(c) => operator(self.rest(), position)?,
                character => return Err(LexingError::UnexpectedCharacter { character, position }),
            };
            self.offset += token.length;
            // Tokens never span lines, so the column advances by the characters consumed.
            self.column += self.source[token.position.offset..self.offset].chars().count();
            return Ok(Some(token));
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn word_len(code: &str) -> usize {
    code.find(|c: char| !is_word_char(c)).unwrap_or(code.len())
}

fn integer(code: &str, position: Position) -> Result<Token, LexingError> {
    let (digits, radix, prefix) = match code.strip_prefix("0x") {
        Some(hex) => {
            let len = hex.find(|c: char| !c.is_ascii_hexdigit()).unwrap_or(hex.len());
            (&hex[..len], 16, 2)
        }
        None => {
            let len = code.find(|c: char| !c.is_ascii_digit()).unwrap_or(code.len());
            (&code[..len], 10, 0)
        }
    };
    let length = prefix + digits.len();
    if digits.is_empty() || code[length..].starts_with(is_word_char) {
        return Err(LexingError::InvalidInteger { position });
    }
    let value = i64::from_str_radix(digits, radix).map_err(|_| LexingError::IntegerOutOfRange { position: position.clone() })?;
    Ok(Token { kind: TokenKind::Integer, text: value.to_string(), length, position })
}

fn identifier(code: &str, position: Position) -> Token {
    let word = &code[..word_len(code)];
    let kind = KEYWORDS
        .iter()
        .find(|(keyword, _)| *keyword == word)
        .map_or(TokenKind::Identifier, |(_, kind)| *kind);
    Token { kind, text: word.to_string(), length: word.len(), position }
}

fn label(code: &str, position: Position) -> Result<Token, LexingError> {
    let name = &code[1..];
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(LexingError::InvalidLabel { position });
    }
    let name = &name[..word_len(name)];
    Ok(Token { kind: TokenKind::Label, text: name.to_string(), length: name.len() + 1, position })
}

fn operator(code: &str, position: Position) -> Result<Token, LexingError> {
    OPERATORS
        .iter()
        .find(|(op, _)| code.starts_with(op))
        .map(|(op, kind)| Token { kind: *kind, text: op.to_string(), length: op.len(), position: position.clone() })
        .ok_or(LexingError::InvalidOperator { position })
}

fn string(code: &str, position: Position) -> Result<Token, LexingError> {
    let mut text = String::new();
    let mut chars = code.char_indices().skip(1);
    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Ok(Token { kind: TokenKind::Str, text, length: index + 1, position }),
            '\n' => break,
            '\\' => match chars.next() {
                Some((_, '"')) => text.push('"'),
                Some((_, '\\')) => text.push('\\'),
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, 'r')) => text.push('\r'),
                Some((_, '0')) => text.push('\0'),
                Some((_, '\n')) | None => break,
                Some((_, escape)) => return Err(LexingError::InvalidEscape { escape, position }),
            },
            c => text.push(c),
        }
    }
    Err(LexingError::UnterminatedString { position })
}

#[cfg(test)]
mod tests {
    use crate::lexer::{LexingError, tokenize, TokenKind};

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, "test.ez").unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn assignment() {
        let tokens = tokenize("x = 1\n", "test.ez").unwrap();
        assert_eq!(tokens.iter().map(|t| t.kind).collect::<Vec<_>>(), vec![TokenKind::Identifier, TokenKind::Assign, TokenKind::Integer, TokenKind::EndStmt]);
        assert_eq!(tokens[0].text, "x");
        assert_eq!(tokens[2].text, "1");
        assert_eq!((tokens[2].position.line, tokens[2].position.column, tokens[2].position.offset), (1, 5, 4));
    }

    #[test]
    fn integer_literals() {
        let tokens = tokenize("0x1A 26 0xff 0\n", "test.ez").unwrap();
        let values = tokens.iter().filter(|t| t.kind == TokenKind::Integer).map(|t| t.text.as_str()).collect::<Vec<_>>();
        assert_eq!(values, vec!["26", "26", "255", "0"]);
        assert_eq!(tokens[0].length, 4);
        assert_eq!(tokens[1].position.column, 6);
    }

    #[test]
    fn malformed_integers() {
        assert!(matches!(tokenize("x = 12ab\n", "test.ez"), Err(LexingError::InvalidInteger { .. })));
        assert!(matches!(tokenize("x = 0x\n", "test.ez"), Err(LexingError::InvalidInteger { .. })));
        assert!(matches!(tokenize("x = 0x1g\n", "test.ez"), Err(LexingError::InvalidInteger { .. })));
        assert!(matches!(tokenize("x = 99999999999999999999\n", "test.ez"), Err(LexingError::IntegerOutOfRange { .. })));
        let err = tokenize("x = 12ab\n", "test.ez").unwrap_err();
        assert!(err.hint().is_some());
        assert_eq!(err.position().column, 5);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(kinds("if goto call end iff _x1\n"), vec![TokenKind::If, TokenKind::Goto, TokenKind::Call, TokenKind::End, TokenKind::Identifier, TokenKind::Identifier, TokenKind::EndStmt]);
    }

    #[test]
    fn operators_longest_match() {
        assert_eq!(kinds("<= < >= > == = != + - * / % ^"), vec![
            TokenKind::Lte, TokenKind::Lt, TokenKind::Gte, TokenKind::Gt, TokenKind::Eq, TokenKind::Assign,
            TokenKind::Neq, TokenKind::Add, TokenKind::Sub, TokenKind::Mul, TokenKind::Div, TokenKind::Mod,
            TokenKind::Pow, TokenKind::EndStmt,
        ]);
        assert!(matches!(tokenize("if x ! 1\n", "test.ez"), Err(LexingError::InvalidOperator { .. })));
    }

    #[test]
    fn labels() {
        let tokens = tokenize(":loop_1\n", "test.ez").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Label);
        assert_eq!(tokens[0].text, "loop_1");
        assert_eq!(tokens[0].length, 7);
        assert!(matches!(tokenize(":1\n", "test.ez"), Err(LexingError::InvalidLabel { .. })));
        assert!(matches!(tokenize(": x\n", "test.ez"), Err(LexingError::InvalidLabel { .. })));
    }

    #[test]
    fn strings() {
        let tokens = tokenize("read_file \"a \\\"b\\\"\\n.txt\" 0 n\n", "test.ez").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Str);
        assert_eq!(tokens[1].text, "a \"b\"\n.txt");
        assert_eq!(tokens[2].position.column, 27);
        assert!(matches!(tokenize("x = \"abc\n", "test.ez"), Err(LexingError::UnterminatedString { .. })));
        assert!(matches!(tokenize("x = \"abc", "test.ez"), Err(LexingError::UnterminatedString { .. })));
        assert!(matches!(tokenize("x = \"a\\q\"\n", "test.ez"), Err(LexingError::InvalidEscape { escape: 'q', .. })));
    }

    #[test]
    fn lines_and_whitespace() {
        let tokens = tokenize("x = 1\r\n\ty = 2\n", "test.ez").unwrap();
        assert_eq!(tokens.len(), 8);
        assert_eq!((tokens[4].position.line, tokens[4].position.column), (2, 2));
        assert_eq!(&*tokens[4].position.file, "test.ez");
    }

    #[test]
    fn missing_trailing_newline() {
        assert_eq!(kinds("shown 1"), vec![TokenKind::Identifier, TokenKind::Integer, TokenKind::EndStmt]);
        assert!(tokenize("", "test.ez").unwrap().is_empty());
    }

    #[test]
    fn unexpected_character() {
        let err = tokenize("x = 1\ny = $\n", "test.ez").unwrap_err();
        assert_eq!(err, LexingError::UnexpectedCharacter { character: '$', position: err.position().clone() });
        assert_eq!((err.position().line, err.position().column), (2, 5));
    }
}
